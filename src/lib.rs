//! # ethbuild
//!
//! Build orchestration for Solidity projects.
//!
//! This meta crate re-exports the two member crates:
//!
//! - [`solc`]: source resolution, dependency graphs, incremental build
//!   caching and compiler invocation.
//! - [`providers`]: a composable Ethereum JSON-RPC provider middleware stack
//!   (accounts, gas, gas price, chain-id validation).

/// Solidity project compilation: resolver, dependency graph, cache, artifacts.
pub mod solc {
    pub use ethbuild_solc::*;
}

/// Ethereum JSON-RPC providers and middleware.
pub mod providers {
    pub use ethbuild_providers::*;
}
