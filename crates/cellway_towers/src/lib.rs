pub mod coverage;
pub mod tower_store;

pub use coverage::{CoverageProfile, SignalStats, TowerOnRoute, associate_towers, estimate_signal};
pub use tower_store::{TowerQuery, TowerStore, TowerStoreParams};
