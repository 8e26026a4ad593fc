//! Error types for tyrantkv
//!
//! Provides a unified error type for all operations.
//!
//! The wire-level and container-level taxonomies are kept distinct:
//! [`TyrantError::Server`] carries the raw status byte exactly as the server
//! reported it, while [`TyrantError::KeyNotFound`] and
//! [`TyrantError::KeyExists`] are produced only by the map facade when it
//! recognizes the failure status of a specific operation.

use thiserror::Error;

/// Result type alias using TyrantError
pub type Result<T> = std::result::Result<T, TyrantError>;

/// Unified error type for tyrantkv operations
#[derive(Debug, Error)]
pub enum TyrantError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Non-zero status byte in a response. The code is the server's, verbatim.
    #[error("server reported failure (status 0x{code:02x})")]
    Server { code: u8 },

    /// Response bytes that do not form a valid payload for the operation.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operand does not fit the u32 length field of its frame. Raised before
    /// any bytes are written to the wire.
    #[error("operand of {len} bytes exceeds the frame length field")]
    TooLarge { len: usize },

    // -------------------------------------------------------------------------
    // Container Errors
    // -------------------------------------------------------------------------
    #[error("key not found")]
    KeyNotFound,

    #[error("key already exists")]
    KeyExists,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}

impl TyrantError {
    /// The raw status byte, when this error is a server-reported failure.
    pub fn server_code(&self) -> Option<u8> {
        match self {
            TyrantError::Server { code } => Some(*code),
            _ => None,
        }
    }
}
