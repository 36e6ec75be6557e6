//! Unified error handling for the client stores.

use crate::documents::DocumentError;
use crate::gateway::GatewayError;

/// Store-level error type.
///
/// Loads and void mutations silently no-op when signed out; only operations
/// that must hand something back, like `create`, surface [`StoreError::AuthRequired`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Sign-in required")]
    AuthRequired,

    #[error("Room {0} is already occupied")]
    RoomOccupied(String),

    #[error("Document store error: {0}")]
    Documents(#[from] DocumentError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
