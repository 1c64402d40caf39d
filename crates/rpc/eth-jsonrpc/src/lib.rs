//! Ethereum-style JSON-RPC server for the Kortana indexing subsystem.
//!
//! This crate exposes the address history index and the block filters over
//! JSON-RPC, so standard wallets and tooling can poll for new blocks and page
//! through an address's transactions.
//!
//! # Example
//!
//! ```rust,no_run
//! use kortana_eth_jsonrpc::{RpcServerConfig, NoopStateProvider, start_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RpcServerConfig {
//!         chain_id: 1,
//!         ..Default::default()
//!     };
//!     let (_addr, handle) = start_server(config, NoopStateProvider).await.unwrap();
//!     handle.stopped().await;
//! }
//! ```

pub mod api;
pub mod error;
pub mod server;

// Re-export key types for convenience
pub use api::{EthApiServer, KortanaApiServer, NetApiServer, Web3ApiServer};
pub use error::{RpcError, RpcResult};
pub use jsonrpsee::server::ServerHandle;
pub use server::{
    start_server, EthRpcServer, NoopStateProvider, RpcServerConfig, StateProvider, CLIENT_VERSION,
    DEFAULT_MAX_HISTORY_RESULTS,
};
