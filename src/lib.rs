//! Offline-first time-and-attendance client.
//!
//! Writes always land in the local sqlite store first; the sync engine pushes
//! them to the remote authority when it can and replays the rest later.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod gateway;
pub mod model;
pub mod store;
pub mod sync;

pub use connectivity::{ConnectivityEvent, ConnectivityMonitor};
pub use error::{GatewayError, StoreError, SyncError};
pub use gateway::{HttpGateway, RemoteGateway};
pub use store::LocalStore;
pub use sync::SyncCoordinator;
