use super::*;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported key type {0:?}")]
    UnsupportedKeyType(Box<str>),

    #[error("Key types must expose a non-empty type tag")]
    InvalidKeyType,

    #[error("Not a valid JWK set")]
    InvalidKeySet,

    #[error("Unsupported algorithm {0:?}")]
    UnsupportedAlgorithm(Box<str>),

    #[error("Unsupported key size {0:?}")]
    InvalidKeySize(KeySize),

    #[error("Missing key material field {0:?}")]
    MissingKeyMaterial(&'static str),

    #[error("Malformed key material field {0:?}")]
    InvalidKeyMaterial(&'static str),

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Integrity check failed")]
    IntegrityCheckFailed,

    #[cfg(feature = "oct")]
    #[error(transparent)]
    KeyWrap(#[from] aes_kw::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
