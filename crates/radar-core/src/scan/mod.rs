//! Periodic entity scanning.
//!
//! - **Layout**: versioned binary layout of one entity record per target
//! - **Walker**: discovers record addresses in the target's entity collection
//! - **Manager**: decodes, validates and publishes one snapshot per tick

mod layout;
mod manager;
mod walker;

pub use layout::{DecodedRecord, EntityLayout};
pub use manager::EntityManager;
pub use walker::{EntityWalker, PointerListWalker, Walk};
