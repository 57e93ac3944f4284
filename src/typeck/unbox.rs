//! Box unwrapping.
//!
//! A boxed definition is a nominal wrapper around an inner type. Unboxing
//! replaces a reference to the wrapper with its inner type, with the
//! definition's parameters substituted by the reference's arguments.
//!
//! Whether a box opens depends on where the question is asked from:
//! isomorphic boxes open anywhere, protected and opaque boxes only inside
//! their defining module. The subtyping fallback and shape inspection both
//! go through here, so module boundaries are enforced in one place.

use super::ty::{Registry, Symbol, Type, TypeKind};

/// Unwrap one box layer, if `ty` is a reference to a boxed definition
/// visible from `from_module`.
///
/// Returns the inner type with parameters substituted, or `None` when `ty`
/// is not a box reference or the box does not open from this module.
pub fn unbox(registry: &Registry, ty: &Type, from_module: Symbol) -> Option<Type> {
    let (def, args) = match ty.kind() {
        TypeKind::Ref { def, args } => (*def, args),
        _ => return None,
    };
    if !registry.is_type(def) {
        return None;
    }
    let type_def = registry.type_def(def);
    let (kind, _weak, inner) = type_def.as_boxed()?;
    if kind.is_module_private() && type_def.module != from_module {
        return None;
    }
    Some(inner.substitute_params(type_def.param_owner, args))
}

/// Unwrap box layers until the type no longer opens from `from_module`.
///
/// Strong box cycles are rejected during registration, but weak cycles are
/// legal, so the walk is capped at the registry size instead of trusting
/// termination.
pub fn unbox_all(registry: &Registry, ty: &Type, from_module: Symbol) -> Type {
    let mut current = ty.clone();
    for _ in 0..=registry.len() {
        match unbox(registry, &current, from_module) {
            Some(inner) => current = inner,
            None => return current,
        }
    }
    current
}
