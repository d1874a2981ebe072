#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod key_map;
mod once_cell;

pub mod hash;

// -----------------------------------------------------------------------------
// Top-level exports

pub use key_map::KeyMap;
pub use once_cell::TryOnceCell;
