//! Central type and member storage.

use rustc_hash::FxHashMap;

use veld_core::{
    CompileError, FieldDef, FieldId, MethodDef, MethodFlags, MethodId, ParamDef, TypeDef, TypeId,
    TypeKind, Width,
};

use crate::primitives;

/// Per-type member index.
#[derive(Debug, Default, Clone)]
struct TypeMembers {
    methods: Vec<MethodId>,
    fields: Vec<FieldId>,
}

/// Unified type and member catalog.
///
/// Storage is keyed by hash identity; ids are computable before the entry
/// exists, so registration order never matters. Generic instantiation is
/// the only mutating query the compiler core issues, and it is idempotent:
/// the same source and argument list always yields the same handle.
#[derive(Default)]
pub struct Catalog {
    types: FxHashMap<TypeId, TypeDef>,
    methods: FxHashMap<MethodId, MethodDef>,
    fields: FxHashMap<FieldId, FieldDef>,
    members: FxHashMap<TypeId, TypeMembers>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the built-in primitive types, `string`, and
    /// the `object` root registered.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for (name, kind) in [
            ("void", TypeKind::Void),
            ("bool", TypeKind::Bool),
            ("char", TypeKind::Char),
            ("byte", TypeKind::Byte),
            ("short", TypeKind::Short),
            ("int", TypeKind::Int),
            ("long", TypeKind::Long),
            ("float", TypeKind::Float),
            ("double", TypeKind::Double),
            ("string", TypeKind::Str),
            ("object", TypeKind::Class),
        ] {
            catalog.register_type(TypeDef::new(name, kind));
        }
        catalog
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a type. Returns its id.
    pub fn register_type(&mut self, def: TypeDef) -> TypeId {
        let id = def.id;
        self.members.entry(id).or_default();
        self.types.insert(id, def);
        id
    }

    /// Register a method on its declaring type. Returns its id.
    pub fn register_method(&mut self, def: MethodDef) -> MethodId {
        let id = def.id;
        self.members.entry(def.declaring).or_default().methods.push(id);
        self.methods.insert(id, def);
        id
    }

    /// Register a field on its declaring type. Returns its id.
    pub fn register_field(&mut self, def: FieldDef) -> FieldId {
        let id = def.id;
        self.members.entry(def.declaring).or_default().fields.push(id);
        self.fields.insert(id, def);
        id
    }

    /// Register a compiler-synthesized method (accessor bridge, adapter
    /// body, hoisted lambda). Idempotent on the method id.
    pub fn declare_synthetic_method(&mut self, def: MethodDef) -> MethodId {
        let id = def.id;
        if !self.methods.contains_key(&id) {
            let flags = def.flags | MethodFlags::SYNTHETIC;
            self.register_method(def.with_flags(flags));
        }
        id
    }

    /// Register a compiler-synthesized nested type. Idempotent on the id.
    pub fn declare_synthetic_type(&mut self, def: TypeDef) -> TypeId {
        let id = def.id;
        if !self.types.contains_key(&id) {
            self.register_type(def);
        }
        id
    }

    /// Register a compiler-synthesized field. Idempotent on the id.
    pub fn declare_synthetic_field(&mut self, def: FieldDef) -> FieldId {
        let id = def.id;
        if !self.fields.contains_key(&id) {
            self.register_field(def);
        }
        id
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn get_type(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(&id)
    }

    pub fn get_method(&self, id: MethodId) -> Option<&MethodDef> {
        self.methods.get(&id)
    }

    pub fn get_field(&self, id: FieldId) -> Option<&FieldDef> {
        self.fields.get(&id)
    }

    /// Fetch a type or fault; an unknown handle here is a core bug.
    pub fn expect_type(&self, id: TypeId) -> Result<&TypeDef, CompileError> {
        self.types
            .get(&id)
            .ok_or_else(|| CompileError::internal(format!("unknown type handle {id:?}")))
    }

    /// Fetch a method or fault.
    pub fn expect_method(&self, id: MethodId) -> Result<&MethodDef, CompileError> {
        self.methods
            .get(&id)
            .ok_or_else(|| CompileError::internal(format!("unknown method handle {id:?}")))
    }

    /// Fetch a field or fault.
    pub fn expect_field(&self, id: FieldId) -> Result<&FieldDef, CompileError> {
        self.fields
            .get(&id)
            .ok_or_else(|| CompileError::internal(format!("unknown field handle {id:?}")))
    }

    /// The kind of a type, or `GenericParam(0)` is never assumed: unknown
    /// handles fault.
    pub fn kind_of(&self, id: TypeId) -> Result<TypeKind, CompileError> {
        Ok(self.expect_type(id)?.kind)
    }

    /// Operand-stack width of a type, when it has one.
    pub fn width_of(&self, id: TypeId) -> Option<Width> {
        self.get_type(id).and_then(|t| t.kind.width())
    }

    /// Readable type name for diagnostics.
    pub fn type_name(&self, id: TypeId) -> String {
        self.get_type(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("{id:?}"))
    }

    /// All methods named `name` on `ty`, walking the base-class chain.
    pub fn methods_named(&self, ty: TypeId, name: &str) -> Vec<MethodId> {
        let mut found = Vec::new();
        let mut cursor = Some(ty);
        while let Some(t) = cursor {
            if let Some(members) = self.members.get(&t) {
                for &m in &members.methods {
                    if self.methods[&m].name == name {
                        found.push(m);
                    }
                }
            }
            cursor = self.get_type(t).and_then(|d| d.base);
        }
        found
    }

    /// The field named `name` on `ty` or a base class.
    pub fn field_named(&self, ty: TypeId, name: &str) -> Option<FieldId> {
        let mut cursor = Some(ty);
        while let Some(t) = cursor {
            if let Some(members) = self.members.get(&t) {
                for &f in &members.fields {
                    if self.fields[&f].name == name {
                        return Some(f);
                    }
                }
            }
            cursor = self.get_type(t).and_then(|d| d.base);
        }
        None
    }

    /// Methods declared directly on `ty`.
    pub fn methods_of(&self, ty: TypeId) -> &[MethodId] {
        self.members
            .get(&ty)
            .map(|m| m.methods.as_slice())
            .unwrap_or(&[])
    }

    /// Fields declared directly on `ty`.
    pub fn fields_of(&self, ty: TypeId) -> &[FieldId] {
        self.members
            .get(&ty)
            .map(|m| m.fields.as_slice())
            .unwrap_or(&[])
    }

    /// The single invokable shape of a delegate or single-method
    /// interface: the delegate's `invoke`, or an interface's one abstract
    /// method.
    pub fn single_invokable(&self, ty: TypeId) -> Option<&MethodDef> {
        let def = self.get_type(ty)?;
        if let Some(invoke) = def.invoke {
            return self.get_method(invoke);
        }
        if def.kind != TypeKind::Interface {
            return None;
        }
        let mut only = None;
        for &m in self.methods_of(ty) {
            let method = &self.methods[&m];
            if method.flags.contains(MethodFlags::ABSTRACT) {
                if only.is_some() {
                    return None;
                }
                only = Some(method);
            }
        }
        only
    }

    // =========================================================================
    // Hierarchy and conversion queries
    // =========================================================================

    /// Whether `ty` is `ancestor` or derives from it.
    pub fn is_same_or_derived(&self, ty: TypeId, ancestor: TypeId) -> bool {
        let mut cursor = Some(ty);
        while let Some(t) = cursor {
            if t == ancestor {
                return true;
            }
            cursor = self.get_type(t).and_then(|d| d.base);
        }
        false
    }

    /// Whether `ty` (or a base of it) implements `iface`.
    pub fn implements(&self, ty: TypeId, iface: TypeId) -> bool {
        let mut cursor = Some(ty);
        while let Some(t) = cursor {
            if let Some(def) = self.get_type(t) {
                for &i in &def.interfaces {
                    if i == iface || self.implements(i, iface) {
                        return true;
                    }
                }
                cursor = def.base;
            } else {
                cursor = None;
            }
        }
        false
    }

    /// Steps from `ty` up to `ancestor` along the base chain, if related.
    ///
    /// Used by overload tie-breaking to prefer the most-derived declarer.
    pub fn derivation_depth(&self, ty: TypeId, ancestor: TypeId) -> Option<u32> {
        let mut cursor = Some(ty);
        let mut depth = 0;
        while let Some(t) = cursor {
            if t == ancestor {
                return Some(depth);
            }
            depth += 1;
            cursor = self.get_type(t).and_then(|d| d.base);
        }
        None
    }

    /// Whether a value of `source` is assignable to a slot of `target`
    /// without representation change: identity or a reference upcast.
    pub fn is_assignable_from(&self, target: TypeId, source: TypeId) -> bool {
        if target == source {
            return true;
        }
        let Some(src) = self.get_type(source) else {
            return false;
        };
        if src.kind.is_reference() {
            return self.is_same_or_derived(source, target) || self.implements(source, target);
        }
        false
    }

    /// Whether an implicit conversion exists from `from` to `to`:
    /// identity, numeric widening, reference upcast, or boxing to the
    /// `object` root.
    pub fn has_implicit_conversion(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        let (Some(f), Some(t)) = (self.get_type(from), self.get_type(to)) else {
            return false;
        };
        if f.kind.is_numeric() && t.kind.is_numeric() {
            return implicit_numeric(f.kind, t.kind);
        }
        if f.kind == TypeKind::Enum {
            // Enums convert explicitly only.
            return false;
        }
        if (f.kind.is_primitive() || f.kind == TypeKind::Enum) && to == primitives::object() {
            return true;
        }
        self.is_assignable_from(to, from)
    }

    // =========================================================================
    // Arrays
    // =========================================================================

    /// The array type with the given element, creating it on first use.
    pub fn array_of(&mut self, element: TypeId) -> TypeId {
        let name = format!("{}[]", self.type_name(element));
        let id = TypeId::from_name(&name);
        if !self.types.contains_key(&id) {
            let mut def = TypeDef::new(&name, TypeKind::Array);
            def.element = Some(element);
            def.base = Some(primitives::object());
            self.register_type(def);
        }
        id
    }

    // =========================================================================
    // Generic instantiation
    // =========================================================================

    /// Placeholder type standing for one unfixed generic parameter.
    ///
    /// Deterministic in (owner, scope, name); registering twice is a
    /// no-op, so signatures can be built before or after this call.
    pub fn generic_param(&mut self, owner: TypeId, scope: &str, name: &str, index: u32) -> TypeId {
        let id = generic_param_id(owner, scope, name);
        if !self.types.contains_key(&id) {
            let mut def = TypeDef::new(name, TypeKind::GenericParam(index));
            def.id = id;
            self.register_type(def);
        }
        id
    }

    /// The placeholder handles of an open generic method's parameters.
    pub fn placeholders_of(&self, method: &MethodDef) -> Vec<TypeId> {
        method
            .generic_params
            .iter()
            .map(|n| generic_param_id(method.declaring, &method.name, n))
            .collect()
    }

    /// Whether a type still contains unfixed generic parameters.
    pub fn is_open(&self, ty: TypeId) -> bool {
        let Some(def) = self.get_type(ty) else {
            return false;
        };
        match def.kind {
            TypeKind::GenericParam(_) => true,
            TypeKind::Array => def.element.is_some_and(|e| self.is_open(e)),
            _ => def.generic_args.iter().any(|&a| self.is_open(a)),
        }
    }

    /// Substitute placeholder types throughout `ty`, creating array and
    /// generic-instance types as needed.
    pub fn substitute(
        &mut self,
        ty: TypeId,
        map: &FxHashMap<TypeId, TypeId>,
    ) -> Result<TypeId, CompileError> {
        if let Some(&replacement) = map.get(&ty) {
            return Ok(replacement);
        }
        let def = self.expect_type(ty)?;
        match def.kind {
            TypeKind::Array => {
                let element = def
                    .element
                    .ok_or_else(|| CompileError::internal("array type without element"))?;
                let substituted = self.substitute(element, map)?;
                Ok(if substituted == element {
                    ty
                } else {
                    self.array_of(substituted)
                })
            }
            _ if !def.generic_args.is_empty() => {
                let source = def
                    .generic_source
                    .ok_or_else(|| CompileError::internal("generic instance without source"))?;
                let args = def.generic_args.clone();
                let mut changed = false;
                let mut new_args = Vec::with_capacity(args.len());
                for a in args {
                    let s = self.substitute(a, map)?;
                    changed |= s != a;
                    new_args.push(s);
                }
                if changed {
                    self.instantiate_type(source, &new_args)
                } else {
                    Ok(ty)
                }
            }
            _ => Ok(ty),
        }
    }

    /// Instantiate an open generic type with concrete arguments.
    ///
    /// Idempotent: the instance id is a pure function of source and
    /// arguments, and an existing instance is returned as-is. Member
    /// signatures are cloned with the substitution applied, following the
    /// instance's identity.
    pub fn instantiate_type(
        &mut self,
        source: TypeId,
        args: &[TypeId],
    ) -> Result<TypeId, CompileError> {
        let instance = TypeId::instance(source, args);
        if self.types.contains_key(&instance) {
            return Ok(instance);
        }

        let def = self.expect_type(source)?.clone();
        if def.generic_params.len() != args.len() {
            return Err(CompileError::internal(format!(
                "type {} expects {} generic arguments, got {}",
                def.name,
                def.generic_params.len(),
                args.len()
            )));
        }

        let mut map = FxHashMap::default();
        for (i, name) in def.generic_params.iter().enumerate() {
            map.insert(generic_param_id(source, &def.name, name), args[i]);
        }

        let arg_names: Vec<String> = args.iter().map(|&a| self.type_name(a)).collect();
        let mut inst = def.clone();
        inst.id = instance;
        inst.name = format!("{}<{}>", def.name, arg_names.join(", "));
        inst.generic_params = Vec::new();
        inst.generic_source = Some(source);
        inst.generic_args = args.to_vec();
        if let Some(base) = def.base {
            inst.base = Some(self.substitute(base, &map)?);
        }
        if let Some(element) = def.element {
            inst.element = Some(self.substitute(element, &map)?);
        }
        self.register_type(inst);

        // Instance members mirror the source with substituted signatures.
        for m in self.methods_of(source).to_vec() {
            let method = self.methods[&m].clone();
            let mut params = Vec::with_capacity(method.params.len());
            for p in &method.params {
                params.push(ParamDef::new(&p.name, self.substitute(p.ty, &map)?));
            }
            let return_type = self.substitute(method.return_type, &map)?;
            let inst_method = MethodDef::new(instance, &method.name, params, return_type)
                .with_flags(method.flags)
                .with_visibility(method.visibility);
            self.register_method(inst_method);
        }
        for f in self.fields_of(source).to_vec() {
            let field = self.fields[&f].clone();
            let ty = self.substitute(field.ty, &map)?;
            let inst_field = FieldDef::new(instance, &field.name, ty)
                .with_flags(field.flags)
                .with_visibility(field.visibility);
            self.register_field(inst_field);
        }
        Ok(instance)
    }

    /// Instantiate an open generic method with concrete arguments.
    ///
    /// Idempotent on (source, args).
    pub fn instantiate_method(
        &mut self,
        source: MethodId,
        args: &[TypeId],
    ) -> Result<MethodId, CompileError> {
        let instance = MethodId::instance(source, args);
        if self.methods.contains_key(&instance) {
            return Ok(instance);
        }

        let def = self.expect_method(source)?.clone();
        if def.generic_params.len() != args.len() {
            return Err(CompileError::internal(format!(
                "method {} expects {} type arguments, got {}",
                def.name,
                def.generic_params.len(),
                args.len()
            )));
        }

        let mut map = FxHashMap::default();
        for (placeholder, &arg) in self.placeholders_of(&def).iter().zip(args) {
            map.insert(*placeholder, arg);
        }

        let mut params = Vec::with_capacity(def.params.len());
        for p in &def.params {
            params.push(ParamDef::new(&p.name, self.substitute(p.ty, &map)?));
        }
        let return_type = self.substitute(def.return_type, &map)?;

        let mut inst = MethodDef::new(def.declaring, &def.name, params, return_type)
            .with_flags(def.flags)
            .with_visibility(def.visibility);
        inst.id = instance;
        inst.generic_source = Some(source);
        inst.generic_args = args.to_vec();
        // Instances do not join name lookup; resolution already happened.
        self.methods.insert(instance, inst);
        Ok(instance)
    }

    // =========================================================================
    // Lexical nesting and namespaces
    // =========================================================================

    /// The outermost lexically enclosing type of `ty` (itself if
    /// top-level).
    pub fn top_level_of(&self, ty: TypeId) -> TypeId {
        let mut current = ty;
        while let Some(encloser) = self.get_type(current).and_then(|d| d.enclosing) {
            current = encloser;
        }
        current
    }

    /// Enclosing types of `ty`, innermost first, including `ty` itself.
    pub fn enclosing_chain(&self, ty: TypeId) -> Vec<TypeId> {
        let mut chain = vec![ty];
        let mut current = ty;
        while let Some(encloser) = self.get_type(current).and_then(|d| d.enclosing) {
            chain.push(encloser);
            current = encloser;
        }
        chain
    }

    /// Whether two types live in the same namespace (compared on their
    /// top-level enclosers).
    pub fn same_namespace(&self, a: TypeId, b: TypeId) -> bool {
        let na = self.get_type(self.top_level_of(a)).map(|d| &d.namespace);
        let nb = self.get_type(self.top_level_of(b)).map(|d| &d.namespace);
        matches!((na, nb), (Some(x), Some(y)) if x == y)
    }
}

/// Deterministic placeholder identity shared by registration and lookup.
fn generic_param_id(owner: TypeId, scope: &str, name: &str) -> TypeId {
    TypeId::synthesized(owner, &format!("{scope}!{name}"))
}

/// The numeric widening lattice: byte/char/short/int < long < float <
/// double, with the sub-int integrals widening among themselves.
fn implicit_numeric(from: TypeKind, to: TypeKind) -> bool {
    use TypeKind::*;
    matches!(
        (from, to),
        (Byte, Short | Int | Long | Float | Double)
            | (Short, Int | Long | Float | Double)
            | (Char, Int | Long | Float | Double)
            | (Int, Long | Float | Double)
            | (Long, Float | Double)
            | (Float, Double)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_core::Visibility;

    fn class(catalog: &mut Catalog, name: &str) -> TypeId {
        catalog.register_type(TypeDef::new(name, TypeKind::Class).with_base(primitives::object()))
    }

    #[test]
    fn builtins_are_queryable() {
        let catalog = Catalog::with_builtins();
        assert_eq!(
            catalog.kind_of(primitives::int()).unwrap(),
            TypeKind::Int
        );
        assert_eq!(catalog.type_name(primitives::string()), "string");
    }

    #[test]
    fn numeric_widening_is_one_way() {
        let catalog = Catalog::with_builtins();
        assert!(catalog.has_implicit_conversion(primitives::int(), primitives::long()));
        assert!(catalog.has_implicit_conversion(primitives::byte(), primitives::double()));
        assert!(catalog.has_implicit_conversion(primitives::char_ty(), primitives::int()));
        assert!(!catalog.has_implicit_conversion(primitives::long(), primitives::int()));
        assert!(!catalog.has_implicit_conversion(primitives::double(), primitives::float()));
    }

    #[test]
    fn boxing_reaches_object_only() {
        let mut catalog = Catalog::with_builtins();
        let c = class(&mut catalog, "C");
        assert!(catalog.has_implicit_conversion(primitives::int(), primitives::object()));
        assert!(!catalog.has_implicit_conversion(primitives::int(), c));
    }

    #[test]
    fn upcasts_follow_the_hierarchy() {
        let mut catalog = Catalog::with_builtins();
        let animal = class(&mut catalog, "Animal");
        let dog = catalog.register_type(TypeDef::new("Dog", TypeKind::Class).with_base(animal));
        assert!(catalog.is_assignable_from(animal, dog));
        assert!(!catalog.is_assignable_from(dog, animal));
        assert!(catalog.is_assignable_from(primitives::object(), dog));
        assert_eq!(catalog.derivation_depth(dog, animal), Some(1));
        assert_eq!(catalog.derivation_depth(animal, dog), None);
    }

    #[test]
    fn interface_implementation_is_transitive() {
        let mut catalog = Catalog::with_builtins();
        let base_iface = catalog.register_type(TypeDef::new("IBase", TypeKind::Interface));
        let iface = catalog
            .register_type(TypeDef::new("IDerived", TypeKind::Interface).with_interface(base_iface));
        let c = catalog.register_type(
            TypeDef::new("C", TypeKind::Class)
                .with_base(primitives::object())
                .with_interface(iface),
        );
        assert!(catalog.implements(c, iface));
        assert!(catalog.implements(c, base_iface));
        assert!(catalog.is_assignable_from(base_iface, c));
    }

    #[test]
    fn member_lookup_walks_bases() {
        let mut catalog = Catalog::with_builtins();
        let base = class(&mut catalog, "Base");
        let derived = catalog.register_type(TypeDef::new("Derived", TypeKind::Class).with_base(base));
        let m = catalog.register_method(MethodDef::new(base, "f", vec![], primitives::void()));
        assert_eq!(catalog.methods_named(derived, "f"), vec![m]);
        assert!(catalog.methods_named(derived, "g").is_empty());
    }

    #[test]
    fn array_types_are_memoized() {
        let mut catalog = Catalog::with_builtins();
        let a = catalog.array_of(primitives::int());
        let b = catalog.array_of(primitives::int());
        assert_eq!(a, b);
        assert_eq!(catalog.get_type(a).unwrap().element, Some(primitives::int()));
    }

    #[test]
    fn method_instantiation_is_idempotent() {
        let mut catalog = Catalog::with_builtins();
        let c = class(&mut catalog, "Seq");
        let t = catalog.generic_param(c, "first", "T", 0);
        let t_array = catalog.array_of(t);
        let m = catalog.register_method(
            MethodDef::new(c, "first", vec![ParamDef::new("items", t_array)], t)
                .with_generic_params(&["T"]),
        );
        let a = catalog.instantiate_method(m, &[primitives::string()]).unwrap();
        let b = catalog.instantiate_method(m, &[primitives::string()]).unwrap();
        assert_eq!(a, b);
        let inst = catalog.get_method(a).unwrap();
        assert_eq!(inst.return_type, primitives::string());
        assert_eq!(inst.generic_source, Some(m));
    }

    #[test]
    fn type_instantiation_substitutes_members() {
        let mut catalog = Catalog::with_builtins();
        let mut list = TypeDef::new("List", TypeKind::Class).with_base(primitives::object());
        list.generic_params = vec!["T".into()];
        let list = catalog.register_type(list);
        let t = catalog.generic_param(list, "List", "T", 0);
        catalog.register_method(MethodDef::new(list, "head", vec![], t));

        let list_str = catalog
            .instantiate_type(list, &[primitives::string()])
            .unwrap();
        let again = catalog
            .instantiate_type(list, &[primitives::string()])
            .unwrap();
        assert_eq!(list_str, again);
        let head = catalog.methods_named(list_str, "head");
        assert_eq!(head.len(), 1);
        assert_eq!(
            catalog.get_method(head[0]).unwrap().return_type,
            primitives::string()
        );
    }

    #[test]
    fn single_invokable_requires_exactly_one() {
        let mut catalog = Catalog::with_builtins();
        let iface = catalog.register_type(TypeDef::new("Runnable", TypeKind::Interface));
        catalog.register_method(
            MethodDef::new(iface, "run", vec![], primitives::void())
                .with_flags(MethodFlags::ABSTRACT),
        );
        assert_eq!(catalog.single_invokable(iface).unwrap().name, "run");

        let iface2 = catalog.register_type(TypeDef::new("Pair", TypeKind::Interface));
        catalog.register_method(
            MethodDef::new(iface2, "a", vec![], primitives::void())
                .with_flags(MethodFlags::ABSTRACT),
        );
        catalog.register_method(
            MethodDef::new(iface2, "b", vec![], primitives::void())
                .with_flags(MethodFlags::ABSTRACT),
        );
        assert!(catalog.single_invokable(iface2).is_none());
    }

    #[test]
    fn namespaces_compare_on_top_level_enclosers() {
        let mut catalog = Catalog::with_builtins();
        let outer = catalog.register_type(
            TypeDef::new("Outer", TypeKind::Class).with_namespace(&["app", "web"]),
        );
        let nested = catalog.register_type(
            TypeDef::new("Outer.Inner", TypeKind::Class)
                .with_enclosing(outer)
                .with_visibility(Visibility::Private),
        );
        let other = catalog
            .register_type(TypeDef::new("Other", TypeKind::Class).with_namespace(&["app", "web"]));
        let elsewhere =
            catalog.register_type(TypeDef::new("Far", TypeKind::Class).with_namespace(&["lib"]));
        assert_eq!(catalog.top_level_of(nested), outer);
        assert!(catalog.same_namespace(nested, other));
        assert!(!catalog.same_namespace(nested, elsewhere));
    }
}
