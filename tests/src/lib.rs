//! # Workspace integration tests
//!
//! Cross-crate end-to-end scenarios that no single crate's own
//! `#[cfg(test)]` module covers in combination: genesis determinism,
//! a full single-transaction state transition, and block-tree
//! canonical selection across competing branches.
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── genesis.rs      # chain-spec -> genesis block determinism
//!     ├── transition.rs   # sender recovery -> execution -> receipt
//!     └── fork_choice.rs  # competing branches -> canonical head
//! ```
//!
//! Run with `cargo test -p ethcore-tests`.

pub mod integration;
