pub mod delta;
pub mod state;

pub use delta::{BallChange, DeltaConfig, DeltaDecoder, DeltaEncoder, SnapshotError, change_mask};
pub use state::{BallSnapshot, TableSnapshot};
