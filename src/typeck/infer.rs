//! Inference state for generic parameter solving.
//!
//! An [`InferringState`] tracks a set of target parameters and the best
//! binding found so far for each. The assignment algorithm consults it when
//! it meets a target `Param` and may move a binding up or down; everything
//! else in the checker treats the state as opaque.
//!
//! The bindings map lives behind an `Arc`, so cloning a state is cheap and
//! copy-on-write: speculative assignment attempts fork the state, and only
//! a successful attempt's fork is kept. The empty state doubles as
//! "inference disabled", which is how invariant argument slots switch
//! solving off without a separate flag.

use std::collections::HashMap;
use std::sync::Arc;

use super::ty::{ParamRef, Registry, Type, TypeKind};

/// How a binding is still allowed to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flex {
    /// Pinned; later encounters must fit it exactly as it stands.
    Fixed,
    /// May be replaced by a supertype of the current binding.
    CanWiden,
    /// May be replaced by a subtype of the current binding.
    CanNarrow,
}

/// The binding slot of one target parameter.
#[derive(Debug, Clone)]
struct Binding {
    /// Current best type, absent until the first encounter or seed.
    ty: Option<Type>,
    /// Movement permission; absent until the first binding is adopted.
    flex: Option<Flex>,
}

/// Copy-on-write solving state for a set of target parameters.
#[derive(Debug, Clone, Default)]
pub struct InferringState {
    bindings: Arc<HashMap<ParamRef, Binding>>,
}

impl InferringState {
    /// The empty state: no targets, inference disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// A state targeting the given parameters, each seeded from its
    /// declared bounds. An upper bound wins over a lower bound when both
    /// are declared: it seeds the binding with `CanNarrow`, a lower bound
    /// alone seeds with `CanWiden`, and an unbounded target starts empty.
    pub fn targeting(registry: &Registry, targets: &[ParamRef]) -> Self {
        let mut bindings = HashMap::with_capacity(targets.len());
        for &target in targets {
            let decl = registry.param_def(target);
            let binding = if let Some(upper) = &decl.upper_bound {
                Binding {
                    ty: Some(upper.clone()),
                    flex: Some(Flex::CanNarrow),
                }
            } else if let Some(lower) = &decl.lower_bound {
                Binding {
                    ty: Some(lower.clone()),
                    flex: Some(Flex::CanWiden),
                }
            } else {
                Binding {
                    ty: None,
                    flex: None,
                }
            };
            bindings.insert(target, binding);
        }
        Self {
            bindings: Arc::new(bindings),
        }
    }

    /// Whether any parameters are being solved.
    pub fn is_enabled(&self) -> bool {
        !self.bindings.is_empty()
    }

    /// Whether `p` is one of this state's targets.
    pub fn is_target(&self, p: ParamRef) -> bool {
        self.bindings.contains_key(&p)
    }

    /// The current binding of a target, if one has been adopted.
    pub fn binding(&self, p: ParamRef) -> Option<&Type> {
        self.bindings.get(&p)?.ty.as_ref()
    }

    /// The movement permission of a target's binding.
    pub fn flex(&self, p: ParamRef) -> Option<Flex> {
        self.bindings.get(&p)?.flex
    }

    /// Adopt or replace a target's binding.
    ///
    /// The incoming type must be target-free: the assignment algorithm
    /// resolves targets before binding, so a target inside `ty` here is a
    /// checker bug, not an input error.
    pub fn bind(&mut self, p: ParamRef, ty: Type, flex: Flex) {
        assert!(
            !ty.mentions_param(&mut |q| self.is_target(q)),
            "binding for a target may not mention another target"
        );
        let bindings = Arc::make_mut(&mut self.bindings);
        let slot = bindings
            .get_mut(&p)
            .expect("bind called for a non-target parameter");
        slot.ty = Some(ty);
        slot.flex = Some(flex);
    }

    /// Finish solving: every target must have a binding.
    ///
    /// On failure returns the unresolved targets, in deterministic order.
    pub fn finish(self) -> Result<Resolution, Vec<ParamRef>> {
        let mut unresolved: Vec<ParamRef> = self
            .bindings
            .iter()
            .filter(|(_, b)| b.ty.is_none())
            .map(|(&p, _)| p)
            .collect();
        if !unresolved.is_empty() {
            unresolved.sort_by_key(|p| (p.owner, p.index));
            return Err(unresolved);
        }
        let resolved = self
            .bindings
            .iter()
            .map(|(&p, b)| (p, b.ty.clone().expect("checked above")))
            .collect();
        Ok(Resolution { resolved })
    }
}

/// A completed solution: every target mapped to a concrete type.
#[derive(Debug, Clone)]
pub struct Resolution {
    resolved: HashMap<ParamRef, Type>,
}

impl Resolution {
    /// Substitute every resolved target in `ty`.
    pub fn apply(&self, ty: &Type) -> Type {
        ty.map(&mut |t| match t.kind() {
            TypeKind::Param(p) => self.resolved.get(p).cloned(),
            _ => None,
        })
    }

    /// The solved type for a target.
    pub fn get(&self, p: ParamRef) -> Option<&Type> {
        self.resolved.get(&p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;
    use crate::typeck::ty::{DeclKind, DefId, ParamDef, TypeDef, TypeDefContent};
    use crate::typeck::variance::Variance;

    fn registry_with_params(bounds: &[(Option<Type>, Option<Type>)]) -> (Registry, DefId) {
        let mut registry = Registry::new();
        let name = registry.interner.get_or_intern("Host");
        let module = registry.interner.get_or_intern("m");
        let params = bounds
            .iter()
            .enumerate()
            .map(|(i, (lower, upper))| ParamDef {
                name: registry.interner.get_or_intern(format!("P{i}")),
                variance: Variance::Invariant,
                lower_bound: lower.clone(),
                upper_bound: upper.clone(),
                default: None,
                span: Span::dummy(),
            })
            .collect();
        let fq = registry.interner.get_or_intern("m.Host");
        let id = DefId::new(0);
        registry.alloc_type(
            fq,
            TypeDef {
                name,
                module,
                span: Span::dummy(),
                kind: DeclKind::Native,
                params,
                param_owner: id,
                implements: Vec::new(),
                content: TypeDefContent::Native,
                case_info: None,
            },
        );
        (registry, id)
    }

    #[test]
    fn test_disabled_state() {
        let state = InferringState::disabled();
        assert!(!state.is_enabled());
        assert!(!state.is_target(ParamRef::new(DefId::new(0), 0)));
    }

    #[test]
    fn test_seeding_from_bounds() {
        let (registry, host) = registry_with_params(&[
            (None, None),
            (Some(Type::bottom()), None),
            (None, Some(Type::top())),
            (Some(Type::bottom()), Some(Type::top())),
        ]);
        let targets: Vec<ParamRef> = (0..4).map(|i| registry.param_ref(host, i)).collect();
        let state = InferringState::targeting(&registry, &targets);

        assert!(state.is_enabled());
        assert!(state.binding(targets[0]).is_none());
        assert!(state.binding(targets[1]).unwrap().equal(&Type::bottom()));
        assert_eq!(state.flex(targets[1]), Some(Flex::CanWiden));
        assert!(state.binding(targets[2]).unwrap().equal(&Type::top()));
        assert_eq!(state.flex(targets[2]), Some(Flex::CanNarrow));
        // Upper bound wins when both are declared
        assert!(state.binding(targets[3]).unwrap().equal(&Type::top()));
        assert_eq!(state.flex(targets[3]), Some(Flex::CanNarrow));
    }

    #[test]
    fn test_fork_is_copy_on_write() {
        let (registry, host) = registry_with_params(&[(None, None)]);
        let target = registry.param_ref(host, 0);
        let original = InferringState::targeting(&registry, &[target]);

        let mut fork = original.clone();
        fork.bind(target, Type::unit(), Flex::Fixed);

        assert!(original.binding(target).is_none());
        assert!(fork.binding(target).unwrap().equal(&Type::unit()));
    }

    #[test]
    fn test_rebinding_moves() {
        let (registry, host) = registry_with_params(&[(None, None)]);
        let target = registry.param_ref(host, 0);
        let mut state = InferringState::targeting(&registry, &[target]);

        state.bind(target, Type::unit(), Flex::CanWiden);
        assert_eq!(state.flex(target), Some(Flex::CanWiden));
        state.bind(target, Type::top(), Flex::CanWiden);
        assert!(state.binding(target).unwrap().equal(&Type::top()));
    }

    #[test]
    #[should_panic(expected = "may not mention another target")]
    fn test_binding_with_target_inside_panics() {
        let (registry, host) = registry_with_params(&[(None, None), (None, None)]);
        let a = registry.param_ref(host, 0);
        let b = registry.param_ref(host, 1);
        let mut state = InferringState::targeting(&registry, &[a, b]);

        state.bind(a, Type::param(b), Flex::Fixed);
    }

    #[test]
    fn test_finish_reports_unresolved() {
        let (registry, host) = registry_with_params(&[(None, None), (None, None)]);
        let a = registry.param_ref(host, 0);
        let b = registry.param_ref(host, 1);
        let mut state = InferringState::targeting(&registry, &[a, b]);
        state.bind(a, Type::unit(), Flex::Fixed);

        let unresolved = state.finish().unwrap_err();
        assert_eq!(unresolved, vec![b]);
    }

    #[test]
    fn test_resolution_apply() {
        let (registry, host) = registry_with_params(&[(None, None)]);
        let target = registry.param_ref(host, 0);
        let mut state = InferringState::targeting(&registry, &[target]);
        state.bind(target, Type::unit(), Flex::Fixed);

        let resolution = state.finish().unwrap();
        let ty = Type::tuple(vec![Type::param(target), Type::top()]);
        let applied = resolution.apply(&ty);
        assert!(applied.equal(&Type::tuple(vec![Type::unit(), Type::top()])));
    }
}
