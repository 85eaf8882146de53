//! Chain-spec loading, CLI, and dependency-ordered wiring of the
//! node's crates into a running process (spec §9's `node` ambient
//! layer): everything the core library crates deliberately leave as
//! an "external collaborator" — CLI, configuration loading, logging
//! init, disk storage, and socket I/O — lives here.

pub mod chain_spec;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod network;
pub mod node;
pub mod storage;
pub mod sync_task;

pub use chain_spec::ChainSpec;
pub use config::NodeConfig;
pub use error::NodeError;
pub use node::Node;
