//! Status classification and redirect hop derivation.

use url::Url;

use crate::data::request::Method;
use crate::error::{FetchError, Result};

/// Returns `true` for the redirect codes the executor follows.
///
/// Recognized: 301, 302, 303, 307, 308. 300 (Multiple Choices) and 304
/// (Not Modified) are not followed.
pub fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Returns `true` for 2xx codes.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Method for the next redirect hop.
///
/// 303 (See Other) always demotes to GET; the other redirect codes
/// preserve the original method.
pub fn redirect_method(status: u16, method: Method) -> Method {
    if status == 303 { Method::Get } else { method }
}

/// Resolve a `Location` header value against the URL that produced it, so
/// relative redirects work.
pub fn resolve_location(base: &Url, location: &str) -> Result<Url> {
    base.join(location)
        .map_err(|e| FetchError::InvalidUrl(format!("{location}: {e}")))
}
