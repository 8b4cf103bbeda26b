//! Domain helpers available to source-context templates.

pub mod helpers;
pub mod network;
pub mod secrets;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use helpers::{EXTENSION_HELPERS, register_extensions};
pub use network::{INDEX_OUT_OF_RANGE, NETMASK_UNKNOWN, netmask, subnet};
pub use secrets::{
    DEFAULT_HASH_ROUNDS, PASSWORD_ALPHABET, SshKeyPair, generate_password, generate_ssh_keypair,
    hash_password, verify_password,
};

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("failed to generate RSA key: {0}")]
    KeyGeneration(String),
    #[error("failed to encode RSA private key: {0}")]
    KeyEncoding(String),
}

/// Process-wide knobs for the extension helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    #[serde(default = "default_hash_rounds")]
    pub hash_rounds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_comment: Option<String>,
}

fn default_hash_rounds() -> u32 {
    DEFAULT_HASH_ROUNDS
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            hash_rounds: DEFAULT_HASH_ROUNDS,
            ssh_key_comment: None,
        }
    }
}
