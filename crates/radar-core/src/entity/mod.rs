mod model;
mod snapshot;
mod vector;

pub use model::{Entity, EntityId, TeamId};
pub use snapshot::{EntitySnapshot, SnapshotHandle};
pub use vector::{Vector2, Vector3};
