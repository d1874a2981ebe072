#![doc = include_str!("../README.md")]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod attrs;
pub mod known;
pub mod registry;
pub mod xml;

mod builder;
mod desc;
mod generic;
mod key;

// -----------------------------------------------------------------------------
// Exports

pub use builder::TypeBuilder;
pub use desc::{CtorDesc, FieldDesc, Members, MethodDesc};
pub use desc::{Generic, PrimitiveKind, TypeShape, Visibility};
pub use desc::{TypeDesc, TypeRef};
pub use generic::{TypeError, array_of, instantiate, substitute};
pub use key::TypeKey;
pub use known::{KnownTypes, known};

#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use inventory;
}
