//! Derived wire-format metadata.
//!
//! ## Menu
//!
//! - [`DataContract`]: the contract of one type, shared as a [`ContractRef`].
//!     - identity: the type, its stable [`QualifiedName`](dc_types::xml::QualifiedName) and a [`ContractId`].
//!     - [`Category`]: one of `Primitive`, `Enum`, `Collection`, `Class`, `XmlSpecial`
//!       and `GenericParameter`, fixed at construction.
//!     - [`ContractKind`]: the category-specific payload.
//!
//! - Payloads:
//!     - [`PrimitiveContract`]: the primitive kind, names come from the primitive table.
//!     - [`EnumContract`]: underlying kind and `(name, value)` members in declaration order.
//!     - [`CollectionContract`]: collection kind, item naming, mutation capability.
//!     - [`ClassContract`]: ordered [`DataMember`]s.
//!     - [`XmlContract`]: root and schema information of self-describing types.
//!
//! - [`ContractLink`]: a strong or weak edge between contracts; bound contract
//!   graphs keep their back-edges weak.
//!
//! - [`ContractSummary`]: a serializable snapshot for logging or export.

// -----------------------------------------------------------------------------
// Modules

mod class_contract;
mod collection_contract;
mod data_contract;
mod enum_contract;
mod summary;
mod xml_contract;

// -----------------------------------------------------------------------------
// Internal API

pub(crate) use class_contract::build as build_class;
pub(crate) use collection_contract::{CollectionBuild, build as build_collection};
pub(crate) use data_contract::check_member_access;
pub(crate) use enum_contract::build as build_enum;
pub(crate) use xml_contract::build as build_xml;

// -----------------------------------------------------------------------------
// Exports

pub use class_contract::{ClassContract, DataMember};
pub use collection_contract::{CollectionContract, KeyValueNames, MethodSource, Mutability};
pub use data_contract::{Category, ContractId, ContractKind, ContractLink, ContractRef};
pub use data_contract::{DataContract, PrimitiveContract};
pub use enum_contract::{EnumContract, EnumMember};
pub use summary::{CollectionSummary, ContractSummary};
pub use xml_contract::XmlContract;
