//! Pure transformations: no I/O, testable with plain values.

pub mod backoff;
pub mod rate;
pub mod redirect;

pub use backoff::backoff_delay;
pub use rate::{DEFAULT_PROGRESS_INTERVAL, ProgressCounter};
pub use redirect::{is_redirect, is_success, redirect_method, resolve_location};
