#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use dc_contract as contract;
pub use dc_types as types;
pub use dc_utils as utils;
