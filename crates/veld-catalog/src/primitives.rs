//! Well-known built-in type handles.
//!
//! Handles are deterministic name hashes, so they can be computed before
//! the catalog exists. [`crate::Catalog::with_builtins`] registers the
//! matching `TypeDef`s.

use veld_core::TypeId;

pub fn void() -> TypeId {
    TypeId::from_name("void")
}

pub fn bool_ty() -> TypeId {
    TypeId::from_name("bool")
}

pub fn char_ty() -> TypeId {
    TypeId::from_name("char")
}

pub fn byte() -> TypeId {
    TypeId::from_name("byte")
}

pub fn short() -> TypeId {
    TypeId::from_name("short")
}

pub fn int() -> TypeId {
    TypeId::from_name("int")
}

pub fn long() -> TypeId {
    TypeId::from_name("long")
}

pub fn float() -> TypeId {
    TypeId::from_name("float")
}

pub fn double() -> TypeId {
    TypeId::from_name("double")
}

pub fn string() -> TypeId {
    TypeId::from_name("string")
}

/// The root reference type every value boxes/upcasts to.
pub fn object() -> TypeId {
    TypeId::from_name("object")
}
