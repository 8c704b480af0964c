//! Descriptor entries for types and members.
//!
//! These are the immutable value handles the compiler core holds onto:
//! [`TypeDef`], [`MethodDef`], and [`FieldDef`]. They are owned by the
//! catalog and compared by identity ([`TypeId`]/[`MethodId`]/[`FieldId`]);
//! the core never mutates one after registration.

use bitflags::bitflags;

use crate::ids::{FieldId, MethodId, TypeId};

/// The closed set of type shapes the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Bool,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Str,
    Class,
    Interface,
    Enum,
    Array,
    Delegate,
    /// An unfixed generic parameter; the index is its position in the
    /// declaring method's or type's parameter list.
    GenericParam(u32),
}

impl TypeKind {
    /// Whether values of this kind live unboxed on the operand stack.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeKind::Bool
                | TypeKind::Char
                | TypeKind::Byte
                | TypeKind::Short
                | TypeKind::Int
                | TypeKind::Long
                | TypeKind::Float
                | TypeKind::Double
        )
    }

    /// Whether this kind participates in numeric promotion.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeKind::Char
                | TypeKind::Byte
                | TypeKind::Short
                | TypeKind::Int
                | TypeKind::Long
                | TypeKind::Float
                | TypeKind::Double
        )
    }

    /// Whether this kind is an integral numeric.
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            TypeKind::Char | TypeKind::Byte | TypeKind::Short | TypeKind::Int | TypeKind::Long
        )
    }

    /// Whether values of this kind are references (null-assignable).
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            TypeKind::Str
                | TypeKind::Class
                | TypeKind::Interface
                | TypeKind::Array
                | TypeKind::Delegate
        )
    }

    /// The operand-stack width this kind promotes to.
    ///
    /// byte/char/short/int share the 32-bit integer width; everything
    /// narrower than `int` is widened before arithmetic.
    pub fn width(&self) -> Option<Width> {
        match self {
            TypeKind::Bool
            | TypeKind::Char
            | TypeKind::Byte
            | TypeKind::Short
            | TypeKind::Int
            | TypeKind::Enum => Some(Width::I32),
            TypeKind::Long => Some(Width::I64),
            TypeKind::Float => Some(Width::F32),
            TypeKind::Double => Some(Width::F64),
            _ => None,
        }
    }
}

/// Operand-stack width classes, ordered by the widening lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Width {
    I32,
    I64,
    F32,
    F64,
}

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    /// Visible within the declaring type's namespace.
    Internal,
    Private,
}

bitflags! {
    /// Modifier flags on a method.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MethodFlags: u8 {
        const STATIC = 1 << 0;
        const VARARGS = 1 << 1;
        const ABSTRACT = 1 << 2;
        const VIRTUAL = 1 << 3;
        /// Compiler-synthesized (bridge, adapter body, hoisted lambda).
        const SYNTHETIC = 1 << 4;
        /// Extension-style candidate; skips declaring-type tie-breaking.
        const EXTENSION = 1 << 5;
    }
}

bitflags! {
    /// Modifier flags on a field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u8 {
        const STATIC = 1 << 0;
        const READONLY = 1 << 1;
        const SYNTHETIC = 1 << 2;
    }
}

/// A registered type.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub id: TypeId,
    pub name: String,
    /// Namespace path, empty for the global namespace.
    pub namespace: Vec<String>,
    pub kind: TypeKind,
    /// Base class, if any.
    pub base: Option<TypeId>,
    /// Implemented interfaces.
    pub interfaces: Vec<TypeId>,
    /// Lexically enclosing type for nested types.
    pub enclosing: Option<TypeId>,
    pub visibility: Visibility,
    /// Generic parameter names on an open generic declaration.
    pub generic_params: Vec<String>,
    /// For instantiations: the open declaration this was built from.
    pub generic_source: Option<TypeId>,
    /// For instantiations: the concrete type arguments.
    pub generic_args: Vec<TypeId>,
    /// Array element type or enum underlying type.
    pub element: Option<TypeId>,
    /// Single invokable shape: delegate `invoke` or an interface's single
    /// abstract method, when it has exactly one.
    pub invoke: Option<MethodId>,
}

impl TypeDef {
    /// Create a type with the given kind and no members.
    pub fn new(name: &str, kind: TypeKind) -> Self {
        Self {
            id: TypeId::from_name(name),
            name: name.to_string(),
            namespace: Vec::new(),
            kind,
            base: None,
            interfaces: Vec::new(),
            enclosing: None,
            visibility: Visibility::Public,
            generic_params: Vec::new(),
            generic_source: None,
            generic_args: Vec::new(),
            element: None,
            invoke: None,
        }
    }

    pub fn with_base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_interface(mut self, iface: TypeId) -> Self {
        self.interfaces.push(iface);
        self
    }

    pub fn with_enclosing(mut self, encloser: TypeId) -> Self {
        self.enclosing = Some(encloser);
        self
    }

    pub fn with_namespace(mut self, path: &[&str]) -> Self {
        self.namespace = path.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Whether this is an open generic declaration with unfixed parameters.
    pub fn is_open_generic(&self) -> bool {
        !self.generic_params.is_empty() && self.generic_args.is_empty()
    }
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub ty: TypeId,
}

impl ParamDef {
    pub fn new(name: &str, ty: TypeId) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

/// A registered method.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub id: MethodId,
    pub name: String,
    pub declaring: TypeId,
    pub params: Vec<ParamDef>,
    pub return_type: TypeId,
    /// Generic parameter names on an open generic method.
    pub generic_params: Vec<String>,
    /// For instantiations: the open declaration this was built from.
    pub generic_source: Option<MethodId>,
    /// For instantiations: the concrete type arguments.
    pub generic_args: Vec<TypeId>,
    pub flags: MethodFlags,
    pub visibility: Visibility,
}

impl MethodDef {
    /// Create a method with an identity derived from its signature.
    pub fn new(declaring: TypeId, name: &str, params: Vec<ParamDef>, return_type: TypeId) -> Self {
        let param_ids: Vec<TypeId> = params.iter().map(|p| p.ty).collect();
        Self {
            id: MethodId::from_signature(declaring, name, &param_ids),
            name: name.to_string(),
            declaring,
            params,
            return_type,
            generic_params: Vec::new(),
            generic_source: None,
            generic_args: Vec::new(),
            flags: MethodFlags::default(),
            visibility: Visibility::Public,
        }
    }

    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_generic_params(mut self, names: &[&str]) -> Self {
        self.generic_params = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    pub fn is_varargs(&self) -> bool {
        self.flags.contains(MethodFlags::VARARGS)
    }

    pub fn is_synthetic(&self) -> bool {
        self.flags.contains(MethodFlags::SYNTHETIC)
    }

    pub fn is_extension(&self) -> bool {
        self.flags.contains(MethodFlags::EXTENSION)
    }

    /// Whether generic parameters remain unfixed.
    pub fn is_open_generic(&self) -> bool {
        !self.generic_params.is_empty() && self.generic_args.is_empty()
    }

    /// Declared parameter count, counting a vararg array as one.
    pub fn fixed_arity(&self) -> usize {
        self.params.len()
    }
}

/// A registered field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub id: FieldId,
    pub name: String,
    pub declaring: TypeId,
    pub ty: TypeId,
    pub flags: FieldFlags,
    pub visibility: Visibility,
}

impl FieldDef {
    pub fn new(declaring: TypeId, name: &str, ty: TypeId) -> Self {
        Self {
            id: FieldId::from_name(declaring, name),
            name: name.to_string(),
            declaring,
            ty,
            flags: FieldFlags::default(),
            visibility: Visibility::Public,
        }
    }

    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldFlags::STATIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_the_lattice() {
        assert!(Width::I32 < Width::I64);
        assert!(Width::I64 < Width::F32);
        assert!(Width::F32 < Width::F64);
        assert_eq!(TypeKind::Byte.width(), Some(Width::I32));
        assert_eq!(TypeKind::Char.width(), Some(Width::I32));
        assert_eq!(TypeKind::Double.width(), Some(Width::F64));
        assert_eq!(TypeKind::Str.width(), None);
    }

    #[test]
    fn method_identity_tracks_signature() {
        let c = TypeId::from_name("C");
        let int = TypeId::from_name("int");
        let long = TypeId::from_name("long");
        let m1 = MethodDef::new(c, "f", vec![ParamDef::new("x", int)], int);
        let m2 = MethodDef::new(c, "f", vec![ParamDef::new("x", long)], int);
        assert_ne!(m1.id, m2.id);
    }

    #[test]
    fn open_generic_detection() {
        let c = TypeId::from_name("C");
        let int = TypeId::from_name("int");
        let m = MethodDef::new(c, "first", vec![], int).with_generic_params(&["T"]);
        assert!(m.is_open_generic());
    }
}
