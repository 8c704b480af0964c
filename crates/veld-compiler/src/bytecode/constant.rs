//! Module-level constant pool.

use rustc_hash::FxHashMap;

use veld_core::{FieldId, MethodId, TypeId};

/// A value referenced by bytecode through a pool index.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Signed integer; covers int and long immediates.
    Int(i64),
    Float32(f32),
    Float64(f64),
    Str(String),
    Type(TypeId),
    Method(MethodId),
    Field(FieldId),
}

/// Deduplicating constant pool shared by every function in a module.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<ConstantKey, u32>,
}

/// Hashable mirror of [`Constant`]; floats key by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Int(i64),
    Float32(u32),
    Float64(u64),
    Str(String),
    Type(TypeId),
    Method(MethodId),
    Field(FieldId),
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or find a constant, returning its index.
    pub fn add(&mut self, constant: Constant) -> u32 {
        let key = Self::to_key(&constant);
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.constants.len() as u32;
        self.constants.push(constant);
        self.index.insert(key, idx);
        idx
    }

    pub fn add_int(&mut self, value: i64) -> u32 {
        self.add(Constant::Int(value))
    }

    pub fn add_f32(&mut self, value: f32) -> u32 {
        self.add(Constant::Float32(value))
    }

    pub fn add_f64(&mut self, value: f64) -> u32 {
        self.add(Constant::Float64(value))
    }

    pub fn add_str(&mut self, value: &str) -> u32 {
        self.add(Constant::Str(value.to_string()))
    }

    pub fn add_type(&mut self, ty: TypeId) -> u32 {
        self.add(Constant::Type(ty))
    }

    pub fn add_method(&mut self, method: MethodId) -> u32 {
        self.add(Constant::Method(method))
    }

    pub fn add_field(&mut self, field: FieldId) -> u32 {
        self.add(Constant::Field(field))
    }

    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    fn to_key(constant: &Constant) -> ConstantKey {
        match constant {
            Constant::Int(v) => ConstantKey::Int(*v),
            Constant::Float32(v) => ConstantKey::Float32(v.to_bits()),
            Constant::Float64(v) => ConstantKey::Float64(v.to_bits()),
            Constant::Str(s) => ConstantKey::Str(s.clone()),
            Constant::Type(t) => ConstantKey::Type(*t),
            Constant::Method(m) => ConstantKey::Method(*m),
            Constant::Field(f) => ConstantKey::Field(*f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_identical_values() {
        let mut pool = ConstantPool::new();
        let a = pool.add_int(100);
        let b = pool.add_int(200);
        let c = pool.add_int(100);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(c, a);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn floats_dedupe_by_bits() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.add_f64(1.0), pool.add_f64(1.0));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn handles_share_slots() {
        let mut pool = ConstantPool::new();
        let m = MethodId::from_signature(TypeId::from_name("C"), "f", &[]);
        assert_eq!(pool.add_method(m), pool.add_method(m));
        assert_eq!(pool.get(0), Some(&Constant::Method(m)));
    }

    #[test]
    fn get_out_of_bounds() {
        let pool = ConstantPool::new();
        assert_eq!(pool.get(0), None);
    }
}
