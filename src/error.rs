use thiserror::Error;

/// Errors raised while provisioning keys or assembling an [`EncryptedSessionStore`].
///
/// Storage failures are not represented here: they travel as
/// [`session_store::Error`](tower_sessions_core::session_store::Error) values straight from the
/// wrapped engine.
///
/// [`EncryptedSessionStore`]: crate::EncryptedSessionStore
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Secure randomness source unavailable: {0}")]
    Randomness(#[from] rand::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
