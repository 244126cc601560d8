use digest::Digest;

/// Incremental hash computation over streamed chunks.
///
/// `finalize` consumes the hasher, so a digest can only be produced once.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

/// Adapter exposing any RustCrypto digest through [`Hasher`].
pub struct DigestHasher<D: Digest + Send>(D);

impl<D: Digest + Send> DigestHasher<D> {
    pub fn new() -> Self { Self(D::new()) }
}

impl<D: Digest + Send> Default for DigestHasher<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Digest + Send> Hasher for DigestHasher<D> {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

#[cfg(feature = "sha256")]
pub struct Sha256Hasher(sha2::Sha256);

#[cfg(feature = "sha256")]
impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

#[cfg(feature = "sha256")]
impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "sha256")]
impl Sha256Hasher {
    pub fn new() -> Self { Self(sha2::Sha256::new()) }

    /// One-shot digest of a complete buffer.
    pub fn digest(data: &[u8]) -> Vec<u8> { sha2::Sha256::digest(data).to_vec() }
}

#[cfg(feature = "sha512")]
pub struct Sha512Hasher(sha2::Sha512);

#[cfg(feature = "sha512")]
impl Hasher for Sha512Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

#[cfg(feature = "sha512")]
impl Default for Sha512Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "sha512")]
impl Sha512Hasher {
    pub fn new() -> Self { Self(sha2::Sha512::new()) }

    /// One-shot digest of a complete buffer.
    pub fn digest(data: &[u8]) -> Vec<u8> { sha2::Sha512::digest(data).to_vec() }
}
