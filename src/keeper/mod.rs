//! Keeper Module
//!
//! Background memory-residency task for the embedding table.

mod residency;

pub use residency::{KeeperConfig, KeeperCycleError, KeeperStatus, ResidencyKeeper};
