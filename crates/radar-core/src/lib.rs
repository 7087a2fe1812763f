//! # radar-core
//!
//! Core library for the radar overlay.
//!
//! This crate provides:
//! - Memory access contract and an offline memory image provider
//! - Entity model, layout decoding and periodic scanning
//! - Atomic snapshot publication and spatial queries
//! - Fixed-cadence task scheduling
//! - Crash-safe configuration and affiliation cache persistence
//! - Single-instance enforcement and the renderer boundary

pub mod context;
pub mod entity;
pub mod error;
pub mod instance;
pub mod memory;
pub mod render;
pub mod scan;
pub mod scheduler;
pub mod spatial;
pub mod storage;

pub use context::{RadarContext, SharedConfig};
pub use entity::{Entity, EntityId, EntitySnapshot, SnapshotHandle, TeamId, Vector2, Vector3};
pub use error::{Error, Result};
pub use instance::InstanceLock;
pub use memory::{
    MemoryImage, MemoryImageBuilder, MemoryProvider, ReadMemory, ReadMemoryExt,
    format_hex_address, parse_hex_address,
};
pub use render::{Renderer, render_snapshot};
pub use scan::{EntityLayout, EntityManager, EntityWalker, PointerListWalker};
pub use scheduler::{ShutdownSignal, SleepMode, TaskScheduler};
pub use storage::{AppConfig, AtomicJsonFile, ConfigStore, PersistentCache};
