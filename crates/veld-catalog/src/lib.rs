//! Type/method catalog for the Veld compiler.
//!
//! The catalog is the closed query surface the compiler core talks to:
//! assignability and implicit-conversion checks, member lookup by name,
//! and idempotent generic instantiation. It owns every `TypeDef`,
//! `MethodDef`, and `FieldDef`; the core only holds id handles.
//!
//! The catalog is not thread-safe. It is populated during registration
//! and early compilation, and read-only afterwards; callers needing
//! concurrent access wrap it themselves.

mod catalog;
pub mod primitives;

pub use catalog::Catalog;
