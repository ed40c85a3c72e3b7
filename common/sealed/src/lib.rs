use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

#[derive(Debug, Error)]
pub enum SealError {
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("blob too short to carry a nonce")]
    TruncatedBlob,
    #[error("seal failure")]
    SealFailure,
    #[error("open failure")]
    OpenFailure,
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

/// Symmetric key protecting locally persisted session state at rest.
/// Blobs are AES-256-GCM with a random nonce prefixed to the ciphertext,
/// so tampering or a wrong key fails authentication on open.
#[derive(Clone)]
pub struct SealKey(Zeroizing<[u8; KEY_LENGTH]>);

impl SealKey {
    /// Construct a key from a base64-encoded string.
    pub fn from_base64(value: &str) -> Result<Self, SealError> {
        let decoded = BASE64_STANDARD.decode(value.trim())?;
        Self::from_bytes(decoded)
    }

    /// Construct a key from raw bytes.
    pub fn from_bytes<B>(bytes: B) -> Result<Self, SealError>
    where
        B: AsRef<[u8]>,
    {
        let slice = bytes.as_ref();
        if slice.len() != KEY_LENGTH {
            return Err(SealError::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: slice.len(),
            });
        }
        let mut array = [0u8; KEY_LENGTH];
        array.copy_from_slice(slice);
        Ok(Self(Zeroizing::new(array)))
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self(Zeroizing::new(bytes))
    }

    /// Encrypt a plaintext blob. Output is nonce || ciphertext.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, SealError> {
        let cipher =
            Aes256Gcm::new_from_slice(self.0.as_ref()).map_err(|_| SealError::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: self.0.len(),
            })?;
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| SealError::SealFailure)?;
        let mut output = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.append(&mut ciphertext);
        Ok(output)
    }

    /// Decrypt a blob previously produced by `seal` with the same key.
    pub fn open(&self, blob: &[u8]) -> Result<Vec<u8>, SealError> {
        if blob.len() <= NONCE_LENGTH {
            return Err(SealError::TruncatedBlob);
        }
        let (nonce_bytes, encrypted) = blob.split_at(NONCE_LENGTH);
        let cipher =
            Aes256Gcm::new_from_slice(self.0.as_ref()).map_err(|_| SealError::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: self.0.len(),
            })?;
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), encrypted)
            .map_err(|_| SealError::OpenFailure)
    }
}

impl std::fmt::Debug for SealKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealKey")
            .field("bytes", &"***redacted***")
            .finish()
    }
}
