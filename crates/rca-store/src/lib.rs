//! Everything around a monitor that touches the outside world: contract
//! files, `rca.toml`, followed sample logs, random sample harnesses and the
//! SQLite run archive.

pub mod config;
pub mod contract_file;
pub mod error;
pub mod follower;
pub mod harness;
pub mod schema;
pub mod store;

pub use config::{DATA_DIR_ENV, DriverConfig, RcaConfig, data_dir, load_config};
pub use contract_file::{load_contract, save_contract_json};
pub use error::{Result, StoreError};
pub use follower::LogFollower;
pub use harness::RandomHarness;
pub use store::{RunRecord, RunStore, StepRecord};
