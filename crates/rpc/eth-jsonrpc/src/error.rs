//! JSON-RPC error types following Ethereum error code conventions.

use jsonrpsee::types::ErrorObjectOwned;
use kortana_rpc_types::RetentionWindow;
use thiserror::Error;

/// Standard Ethereum JSON-RPC error codes.
pub mod codes {
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;

    // Ethereum-specific error codes (in server error range -32000 to -32099)

    /// Resource not found
    pub const RESOURCE_NOT_FOUND: i32 = -32001;
    /// Resource unavailable
    pub const RESOURCE_UNAVAILABLE: i32 = -32002;
}

/// RPC-specific errors.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Filter not found: {0}")]
    FilterNotFound(String),

    #[error("Block {requested} is outside the retention window (oldest available: {oldest_available})")]
    RetentionExpired { requested: u64, oldest_available: u64 },
}

impl From<RpcError> for ErrorObjectOwned {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::InvalidParams(msg) => {
                ErrorObjectOwned::owned(codes::INVALID_PARAMS, msg, None::<()>)
            }
            RpcError::InternalError(msg) => {
                ErrorObjectOwned::owned(codes::INTERNAL_ERROR, msg, None::<()>)
            }
            RpcError::FilterNotFound(id) => ErrorObjectOwned::owned(
                codes::RESOURCE_NOT_FOUND,
                format!("filter not found: {id}"),
                None::<()>,
            ),
            RpcError::RetentionExpired {
                requested,
                oldest_available,
            } => ErrorObjectOwned::owned(
                codes::RESOURCE_UNAVAILABLE,
                format!("block {requested} is outside the retention window"),
                Some(RetentionWindow::new(requested, oldest_available)),
            ),
        }
    }
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_not_found_code() {
        let obj: ErrorObjectOwned = RpcError::FilterNotFound("0x01".to_string()).into();
        assert_eq!(obj.code(), codes::RESOURCE_NOT_FOUND);
        assert!(obj.message().contains("0x01"));
        assert!(obj.data().is_none());
    }

    #[test]
    fn test_retention_expired_carries_window() {
        let obj: ErrorObjectOwned = RpcError::RetentionExpired {
            requested: 3,
            oldest_available: 10,
        }
        .into();
        assert_eq!(obj.code(), codes::RESOURCE_UNAVAILABLE);

        let data: serde_json::Value = serde_json::from_str(obj.data().unwrap().get()).unwrap();
        assert_eq!(
            data,
            serde_json::json!({ "requested": "0x3", "oldestAvailable": "0xa" })
        );
    }
}
