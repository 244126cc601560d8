//! Side-effecting layer: network exchanges and filesystem writes.

pub mod digest;
pub mod executor;
pub mod progress;
pub mod transport;

pub use digest::DigestStream;
pub use executor::{HttpExecutor, parse_json};
pub use progress::ProgressStream;
pub use transport::{BoxStream, Transport, TransportError, TransportErrorKind, TransportResponse};

#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
