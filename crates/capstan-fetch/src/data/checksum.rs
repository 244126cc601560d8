//! Expected-digest configuration for download verification.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{FetchError, Result};

/// Hash algorithms understood by the download verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub fn digest_length(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the expected digest value is written.
///
/// Artifact feeds are split on this: lockfiles and checksum files usually
/// carry hex, release manifests usually carry base64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumEncoding {
    /// Case-insensitive hexadecimal.
    Hex,
    /// Standard base64 with padding.
    Base64,
}

/// An expected digest for a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    algorithm: HashAlgorithm,
    expected: String,
    encoding: ChecksumEncoding,
}

impl Checksum {
    /// Build a checksum from its parts. Hex values are normalized to
    /// lowercase so later comparisons are case-insensitive.
    pub fn new(
        algorithm: HashAlgorithm,
        expected: impl Into<String>,
        encoding: ChecksumEncoding,
    ) -> Self {
        let expected = expected.into();
        let expected = match encoding {
            ChecksumEncoding::Hex => expected.to_ascii_lowercase(),
            ChecksumEncoding::Base64 => expected,
        };
        Self {
            algorithm,
            expected,
            encoding,
        }
    }

    /// Parse a checksum literal.
    ///
    /// Accepts `"<algorithm>:<value>"` where the value is hex or base64
    /// (e.g. `"sha256:6ca13d..."`, `"sha512:T3BlbkFJ...=="`), or a bare hex
    /// digest whose length picks the algorithm.
    pub fn parse(s: &str) -> Result<Self> {
        if let Some((algo, value)) = s.split_once(':') {
            let algorithm = match algo.to_ascii_lowercase().as_str() {
                "sha256" => HashAlgorithm::Sha256,
                "sha512" => HashAlgorithm::Sha512,
                other => {
                    return Err(FetchError::InvalidChecksum(format!(
                        "unsupported hash algorithm: {other}"
                    )));
                }
            };
            Self::with_value(algorithm, value)
        } else if s.len() == HashAlgorithm::Sha256.digest_length() * 2 {
            Self::with_value(HashAlgorithm::Sha256, s)
        } else if s.len() == HashAlgorithm::Sha512.digest_length() * 2 {
            Self::with_value(HashAlgorithm::Sha512, s)
        } else {
            Err(FetchError::InvalidChecksum(format!(
                "cannot infer algorithm from a {}-character digest",
                s.len()
            )))
        }
    }

    fn with_value(algorithm: HashAlgorithm, value: &str) -> Result<Self> {
        if value.len() == algorithm.digest_length() * 2
            && value.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Ok(Self::new(algorithm, value, ChecksumEncoding::Hex));
        }
        let decoded = BASE64.decode(value).map_err(|_| {
            FetchError::InvalidChecksum(format!("digest value is neither hex nor base64: {value}"))
        })?;
        if decoded.len() != algorithm.digest_length() {
            return Err(FetchError::InvalidChecksum(format!(
                "decoded digest is {} bytes, {} requires {}",
                decoded.len(),
                algorithm,
                algorithm.digest_length()
            )));
        }
        Ok(Self::new(algorithm, value, ChecksumEncoding::Base64))
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The expected digest value as configured.
    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn encoding(&self) -> ChecksumEncoding {
        self.encoding
    }

    /// Encode a raw digest the way this checksum writes its value.
    pub fn encode(&self, digest: &[u8]) -> String {
        match self.encoding {
            ChecksumEncoding::Hex => hex::encode(digest),
            ChecksumEncoding::Base64 => BASE64.encode(digest),
        }
    }

    /// Compare a raw digest against the expected value.
    pub fn matches(&self, digest: &[u8]) -> bool {
        self.encode(digest) == self.expected
    }
}

impl FromStr for Checksum {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";

    #[test]
    fn parses_prefixed_hex() {
        let checksum = Checksum::parse(&format!("sha256:{HELLO_SHA256}")).unwrap();
        assert_eq!(checksum.algorithm(), HashAlgorithm::Sha256);
        assert_eq!(checksum.encoding(), ChecksumEncoding::Hex);
        assert_eq!(checksum.expected(), HELLO_SHA256);
    }

    #[test]
    fn parses_bare_hex_by_length() {
        let sha256 = Checksum::parse(HELLO_SHA256).unwrap();
        assert_eq!(sha256.algorithm(), HashAlgorithm::Sha256);

        let sha512 = Checksum::parse(&"ab".repeat(64)).unwrap();
        assert_eq!(sha512.algorithm(), HashAlgorithm::Sha512);
    }

    #[test]
    fn parses_base64_value() {
        let digest = [7u8; 32];
        let literal = format!("sha256:{}", BASE64.encode(digest));
        let checksum = Checksum::parse(&literal).unwrap();
        assert_eq!(checksum.encoding(), ChecksumEncoding::Base64);
        assert!(checksum.matches(&digest));
    }

    #[test]
    fn hex_comparison_is_case_insensitive() {
        let upper = format!("sha256:{}", HELLO_SHA256.to_ascii_uppercase());
        let checksum = Checksum::parse(&upper).unwrap();
        let digest = hex::decode(HELLO_SHA256).unwrap();
        assert!(checksum.matches(&digest));
    }

    #[test]
    fn mismatched_digest_is_rejected() {
        let checksum = Checksum::parse(HELLO_SHA256).unwrap();
        assert!(!checksum.matches(&[0u8; 32]));
    }

    #[test]
    fn rejects_unknown_algorithm() {
        assert!(matches!(
            Checksum::parse("md5:abcdef"),
            Err(FetchError::InvalidChecksum(_))
        ));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Checksum::parse("sha256:abc123").is_err());
        assert!(Checksum::parse("abc123").is_err());
        // Base64 of the wrong digest size.
        let literal = format!("sha512:{}", BASE64.encode([1u8; 32]));
        assert!(Checksum::parse(&literal).is_err());
    }

    #[test]
    fn from_str_round_trip() {
        let checksum: Checksum = format!("sha256:{HELLO_SHA256}").parse().unwrap();
        assert_eq!(checksum.to_string(), format!("sha256:{HELLO_SHA256}"));
    }
}
