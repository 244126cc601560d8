/// A point-in-time report of download activity.
///
/// Passed by reference to progress callbacks. Across the reports of one
/// download, `transferred` never decreases and the final report (emitted
/// when the stream ends) lands exactly on `total` whenever the total size
/// was known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Total expected bytes, when the server sent a usable Content-Length.
    ///
    /// `None` with chunked transfer encoding or a malformed header.
    pub total: Option<u64>,

    /// Bytes received so far.
    pub transferred: u64,

    /// Bytes received since the previous report.
    pub delta: u64,

    /// Transfer rate in bytes per second, smoothed over the reporting
    /// window rather than sampled per chunk.
    pub bytes_per_second: u64,
}

impl Progress {
    /// Completion percentage, when the total size is known.
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        self.total.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.transferred as f64 / total as f64) * 100.0
            }
        })
    }

    /// Returns `true` once every expected byte has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|total| self.transferred >= total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_requires_known_total() {
        let progress = Progress {
            total: None,
            transferred: 512,
            delta: 512,
            bytes_per_second: 0,
        };
        assert_eq!(progress.percent(), None);
        assert!(!progress.is_complete());
    }

    #[test]
    fn percent_of_known_total() {
        let progress = Progress {
            total: Some(200),
            transferred: 50,
            delta: 50,
            bytes_per_second: 0,
        };
        assert_eq!(progress.percent(), Some(25.0));
    }

    #[test]
    fn empty_download_is_complete() {
        let progress = Progress {
            total: Some(0),
            transferred: 0,
            delta: 0,
            bytes_per_second: 0,
        };
        assert_eq!(progress.percent(), Some(100.0));
        assert!(progress.is_complete());
    }
}
