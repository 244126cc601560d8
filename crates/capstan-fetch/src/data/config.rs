use std::time::Duration;

/// Tunables for [`HttpExecutor`](crate::HttpExecutor).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use capstan_fetch::ExecutorConfig;
///
/// let config = ExecutorConfig::default()
///     .max_retries(5)
///     .retry_backoff(Duration::from_millis(200))
///     .attempt_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Redirect hops followed before giving up.
    ///
    /// Default: 10
    pub max_redirects: u32,

    /// Retries after the initial attempt, for transient transport
    /// failures only. Responses with a terminal status are never retried.
    ///
    /// Default: 3
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries. The delay for
    /// retry N is `retry_backoff * 2^N`.
    ///
    /// Default: 500ms
    pub retry_backoff: Duration,

    /// Hard deadline for a single attempt to produce a response. Attempts
    /// that exceed it count as transient timeouts. Disabled when `None`.
    ///
    /// Default: None
    pub attempt_timeout: Option<Duration>,

    /// `User-Agent` sent when the caller does not provide one.
    pub user_agent: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            attempt_timeout: None,
            user_agent: concat!("capstan/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ExecutorConfig {
    #[must_use]
    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    #[must_use]
    pub fn attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = Some(attempt_timeout);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
