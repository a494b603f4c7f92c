pub mod tick;

pub use tick::{FixedTimestep, PHYSICS_TICK_RATE, run_until_stationary};
