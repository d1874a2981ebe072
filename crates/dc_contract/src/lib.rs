#![doc = include_str!("../README.md")]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod capability;
pub mod classify;
pub mod contract;
pub mod names;
pub mod primitive;
pub mod resolver;

mod binder;
mod cache;
mod config;
mod error;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Exports

pub use cache::{CacheStats, ContractCache};
pub use config::CacheConfig;
pub use contract::{Category, ContractRef, DataContract};
pub use error::{CollectionContext, ContractError, DefinitionReason, VisibilityIssue};
