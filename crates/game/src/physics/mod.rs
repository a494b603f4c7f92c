pub mod aim;
pub mod ball;
pub mod collision;
pub mod cushion;
pub mod geometry;
pub mod knuckle;
pub mod outcome;
pub mod params;
pub mod pocket;
pub mod rack;
pub mod table;

pub use aim::{AimState, cue_to_spin};
pub use ball::{Ball, BallState};
pub use cushion::CushionModel;
pub use geometry::{Knuckle, Pocket, Rail, TableGeometry};
pub use outcome::Outcome;
pub use params::PhysicsParams;
pub use rack::Rack;
pub use table::{PhysicsError, ShortState, Table};
