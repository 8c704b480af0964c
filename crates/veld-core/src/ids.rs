//! Deterministic hash-based identity for types and members.
//!
//! Types, methods, and fields are identified by 64-bit hashes computed
//! from their names and signatures rather than sequential ids. Hashes are
//! stable across runs and independent of registration order, so handles
//! can be computed before the catalog entry exists (forward references,
//! generic instances, synthesized members).
//!
//! Domain-separation constants keep a type named `x` from colliding with
//! a method named `x`.

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Mixing constants separating identity domains.
mod domain {
    /// Path component separator (namespace / declaring type).
    pub const SEP: u64 = 0x8d4e_2f1a_c5b3_7906;
    /// Type identity.
    pub const TYPE: u64 = 0x1f6b_a2d9_43e8_5c07;
    /// Method identity.
    pub const METHOD: u64 = 0x6c91_e4f2_0a7d_3b58;
    /// Field identity.
    pub const FIELD: u64 = 0xb305_78cd_91ae_f642;
    /// Generic instantiation of a type or method.
    pub const INSTANCE: u64 = 0x2e84_d01f_b697_ca53;
    /// Compiler-synthesized member (bridge, adapter, hoisted lambda).
    pub const SYNTH: u64 = 0x74af_c368_5d02_e9b1;
}

fn mix(seed: u64, data: &[u8]) -> u64 {
    xxh64(data, seed)
}

fn mix_id(seed: u64, id: u64) -> u64 {
    xxh64(&id.to_le_bytes(), seed)
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#018x})"), self.0)
            }
        }
    };
}

id_type! {
    /// Identity of a type known to the catalog.
    TypeId
}

id_type! {
    /// Identity of a method (declared, instantiated, or synthesized).
    MethodId
}

id_type! {
    /// Identity of a field.
    FieldId
}

impl TypeId {
    /// Hash a qualified type name.
    pub fn from_name(name: &str) -> Self {
        Self(mix(domain::TYPE, name.as_bytes()))
    }

    /// Hash a generic type instance: source type plus argument list.
    pub fn instance(source: TypeId, args: &[TypeId]) -> Self {
        let mut h = mix_id(domain::INSTANCE, source.0);
        for (i, a) in args.iter().enumerate() {
            h = mix_id(h ^ domain::SEP.wrapping_add(i as u64), a.0);
        }
        Self(h)
    }

    /// Hash a synthesized nested type inside `encloser`.
    pub fn synthesized(encloser: TypeId, name: &str) -> Self {
        Self(mix(mix_id(domain::SYNTH, encloser.0), name.as_bytes()))
    }
}

impl MethodId {
    /// Hash a method from its declaring type, name, and parameter types.
    pub fn from_signature(declaring: TypeId, name: &str, params: &[TypeId]) -> Self {
        let mut h = mix(mix_id(domain::METHOD, declaring.0), name.as_bytes());
        for (i, p) in params.iter().enumerate() {
            h = mix_id(h ^ domain::SEP.wrapping_add(i as u64), p.0);
        }
        Self(h)
    }

    /// Hash a generic method instance: source method plus type arguments.
    pub fn instance(source: MethodId, args: &[TypeId]) -> Self {
        let mut h = mix_id(domain::INSTANCE, source.0);
        for (i, a) in args.iter().enumerate() {
            h = mix_id(h ^ domain::SEP.wrapping_add(i as u64), a.0);
        }
        Self(h)
    }

    /// Hash a synthesized method (accessor bridge, hoisted lambda body).
    pub fn synthesized(encloser: TypeId, name: &str) -> Self {
        Self(mix(mix_id(domain::SYNTH, encloser.0), name.as_bytes()))
    }
}

impl FieldId {
    /// Hash a field from its declaring type and name.
    pub fn from_name(declaring: TypeId, name: &str) -> Self {
        Self(mix(mix_id(domain::FIELD, declaring.0), name.as_bytes()))
    }
}

/// Identity of a tree node within one method body.
///
/// Allocated by the parser; the annotation store keys off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Identity of a resolved local variable or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_hash_is_deterministic() {
        assert_eq!(TypeId::from_name("int"), TypeId::from_name("int"));
        assert_ne!(TypeId::from_name("int"), TypeId::from_name("long"));
    }

    #[test]
    fn domains_do_not_collide() {
        let t = TypeId::from_name("x");
        let f = FieldId::from_name(t, "x");
        let m = MethodId::from_signature(t, "x", &[]);
        assert_ne!(t.0, f.0);
        assert_ne!(t.0, m.0);
        assert_ne!(f.0, m.0);
    }

    #[test]
    fn signature_includes_parameter_order() {
        let t = TypeId::from_name("C");
        let a = TypeId::from_name("int");
        let b = TypeId::from_name("string");
        let m1 = MethodId::from_signature(t, "f", &[a, b]);
        let m2 = MethodId::from_signature(t, "f", &[b, a]);
        assert_ne!(m1, m2);
    }

    #[test]
    fn instance_hash_is_idempotent() {
        let src = MethodId::from_signature(TypeId::from_name("C"), "first", &[]);
        let s = TypeId::from_name("string");
        assert_eq!(MethodId::instance(src, &[s]), MethodId::instance(src, &[s]));
        assert_ne!(
            MethodId::instance(src, &[s]),
            MethodId::instance(src, &[TypeId::from_name("int")])
        );
    }
}
