pub mod convert;
pub mod error;
pub mod jwk;
pub mod key;
pub mod registry;
pub mod store;

#[cfg(feature = "oct")]
pub mod oct;

use std::sync::Arc;
use trace_err::*;
use tracing::{instrument, trace};

// Re-export for consistency
pub use async_trait::async_trait;

pub use convert::{as_key, as_key_store, as_key_store_json};
pub use error::{Error, Result};
pub use jwk::{Jwk, JwkSet, Operation};
pub use key::{CipherText, Key, KeyOps, KeySize, KeyType};
pub use registry::Registry;
pub use store::{Filter, KeyStore};
