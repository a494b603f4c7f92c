pub mod client;
pub mod clock;
pub mod config;
pub mod interpolation;

pub use client::{NetworkClient, NetworkEvent};
pub use config::ClientConfig;
pub use interpolation::SnapshotBuffer;
