//! Assignment compatibility.
//!
//! [`Assigner::assign`] answers the one question the rest of the checker
//! asks: can a value of type `from` be used where type `to` is required?
//! The check runs in three tiers:
//!
//! 1. **Inference short-circuit**: a target parameter on either side is
//!    resolved against the [`InferringState`], possibly moving its binding
//!    up (on the `to` side) or down (on the `from` side).
//! 2. **Direct structural match**: same-shaped types recurse pairwise.
//!    Nominal argument slots follow their declared variance: covariant
//!    slots keep direction, contravariant slots swap sides, invariant
//!    slots recurse with subtyping switched off, bivariant slots are
//!    skipped outright.
//! 3. **Subtyping fallback**: `Top` absorbs on the left, `Bottom` on the
//!    right, a lone non-target parameter stands in for its bound (upper
//!    on the receiving side, lower on the providing side), and a `from`
//!    box visible from the viewpoint module is unwrapped one layer and
//!    retried. Unwrapping never runs on the `to` side: raw content does
//!    not become the box.
//!
//! The whole check is pure: failure leaves no trace, and callers fork the
//! inference state before speculative attempts.

use super::infer::{Flex, InferringState};
use super::ty::{ParamRef, Registry, Symbol, Type, TypeKind};
use super::unbox::unbox;
use super::variance::Variance;
use crate::span::Span;
use crate::typeck::error::{TypeError, TypeErrorKind, TypeResult};

/// Recursion cap. Strong box cycles are rejected at registration, but weak
/// cycles are legal and must not hang the checker.
const MAX_DEPTH: usize = 256;

/// Assignment checker for one viewpoint module.
pub struct Assigner<'a> {
    registry: &'a Registry,
    /// Module the check runs in; controls which boxes open.
    module: Symbol,
}

impl<'a> Assigner<'a> {
    pub fn new(registry: &'a Registry, module: Symbol) -> Self {
        Self { registry, module }
    }

    /// Check that `from` is assignable to `to`, with subtyping.
    pub fn assign(&self, to: &Type, from: &Type, state: &mut InferringState) -> bool {
        self.assign_inner(to, from, state, true, 0)
    }

    /// Check that `from` matches `to` exactly, still driving inference.
    pub fn assign_exact(&self, to: &Type, from: &Type, state: &mut InferringState) -> bool {
        self.assign_inner(to, from, state, false, 0)
    }

    /// Like [`assign`], but produce a diagnostic-ready error on failure.
    ///
    /// [`assign`]: Assigner::assign
    pub fn require_assign(
        &self,
        to: &Type,
        from: &Type,
        state: &mut InferringState,
        span: Span,
    ) -> TypeResult<()> {
        if self.assign(to, from, state) {
            Ok(())
        } else {
            TypeError::new(
                TypeErrorKind::NotAssignable {
                    to: self.registry.display_type(to),
                    from: self.registry.display_type(from),
                },
                span,
            )
            .into_err()
        }
    }

    /// Side-effect-free check used while weighing a binding movement.
    fn recheck(&self, to: &Type, from: &Type, subtyping: bool, depth: usize) -> bool {
        let mut disabled = InferringState::disabled();
        self.assign_inner(to, from, &mut disabled, subtyping, depth)
    }

    /// Transactional wrapper: a failed attempt leaves `state` untouched,
    /// so partially-bound forks never leak out of a rejected branch.
    fn assign_inner(
        &self,
        to: &Type,
        from: &Type,
        state: &mut InferringState,
        subtyping: bool,
        depth: usize,
    ) -> bool {
        let mut fork = state.clone();
        if self.attempt(to, from, &mut fork, subtyping, depth) {
            *state = fork;
            true
        } else {
            false
        }
    }

    fn attempt(
        &self,
        to: &Type,
        from: &Type,
        state: &mut InferringState,
        subtyping: bool,
        depth: usize,
    ) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        if to.is_unknown() || from.is_unknown() {
            return false;
        }
        if to.equal(from) {
            return true;
        }

        // Tier 1: target parameters
        let to_target = as_target(to, state);
        let from_target = as_target(from, state);
        match (to_target, from_target) {
            // Distinct targets cannot constrain each other; identical ones
            // were already accepted by the equality fast path.
            (Some(_), Some(_)) => return false,
            (Some(p), None) => return self.bind_to_side(p, from, state, subtyping, depth),
            (None, Some(p)) => return self.bind_from_side(p, to, state, subtyping, depth),
            (None, None) => {}
        }

        // Tier 2: direct structural match. A failed same-shape match still
        // falls through with a clean state: unboxing may reconcile two
        // uses of the same box.
        let mut fork = state.clone();
        if self.direct_match(to, from, &mut fork, subtyping, depth) == Some(true) {
            *state = fork;
            return true;
        }

        // Tier 3: subtyping fallback
        if !subtyping {
            return false;
        }
        if matches!(to.kind(), TypeKind::Top) || matches!(from.kind(), TypeKind::Bottom) {
            return true;
        }
        // A bound stands in for a lone parameter: the receiving side's
        // upper bound, the providing side's lower bound. Both sides being
        // parameters was already settled by identity above.
        let to_param = matches!(to.kind(), TypeKind::Param(_));
        let from_param = matches!(from.kind(), TypeKind::Param(_));
        if let TypeKind::Param(p) = to.kind() {
            if !from_param {
                if let Some(upper) = &self.registry.param_def(*p).upper_bound {
                    if self.assign_inner(upper, from, state, subtyping, depth + 1) {
                        return true;
                    }
                }
            }
        }
        if let TypeKind::Param(p) = from.kind() {
            if !to_param {
                if let Some(lower) = &self.registry.param_def(*p).lower_bound {
                    if self.assign_inner(to, lower, state, subtyping, depth + 1) {
                        return true;
                    }
                }
            }
        }
        // Only the providing side unwraps: a box yields its content where
        // the content is required, but raw content never becomes the box.
        if let Some(inner) = unbox(self.registry, from, self.module) {
            if self.assign_inner(to, &inner, state, subtyping, depth + 1) {
                return true;
            }
        }
        false
    }

    /// Pairwise recursion when both sides have the same shape. `None`
    /// means the shapes differ and the fallback tier should decide.
    fn direct_match(
        &self,
        to: &Type,
        from: &Type,
        state: &mut InferringState,
        subtyping: bool,
        depth: usize,
    ) -> Option<bool> {
        let matched = match (to.kind(), from.kind()) {
            (TypeKind::Unit, TypeKind::Unit)
            | (TypeKind::Top, TypeKind::Top)
            | (TypeKind::Bottom, TypeKind::Bottom) => true,
            (TypeKind::Param(a), TypeKind::Param(b)) => a == b,
            (
                TypeKind::Ref { def: d1, args: a1 },
                TypeKind::Ref { def: d2, args: a2 },
            ) => {
                if d1 != d2 {
                    return None;
                }
                assert_eq!(
                    a1.len(),
                    a2.len(),
                    "argument count mismatch for {d1:?}: arity is enforced at construction"
                );
                let mut ok = true;
                for (i, (to_arg, from_arg)) in a1.iter().zip(a2).enumerate() {
                    let declared =
                        self.registry.param_def(self.registry.param_ref(*d1, i)).variance;
                    let slot_ok = match declared {
                        Variance::Bivariant => true,
                        Variance::Covariant => {
                            self.assign_inner(to_arg, from_arg, state, subtyping, depth + 1)
                        }
                        Variance::Contravariant => {
                            self.assign_inner(from_arg, to_arg, state, subtyping, depth + 1)
                        }
                        Variance::Invariant => {
                            self.assign_inner(to_arg, from_arg, state, false, depth + 1)
                        }
                    };
                    if !slot_ok {
                        ok = false;
                        break;
                    }
                }
                ok
            }
            (TypeKind::Tuple(a), TypeKind::Tuple(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(t, f)| self.assign_inner(t, f, state, subtyping, depth + 1))
            }
            (TypeKind::Record(a), TypeKind::Record(b)) => {
                a.fields().len() == b.fields().len()
                    && a.fields().iter().zip(b.fields()).all(|(t, f)| {
                        t.name == f.name
                            && self.assign_inner(&t.ty, &f.ty, state, subtyping, depth + 1)
                    })
            }
            (
                TypeKind::Lambda {
                    input: to_in,
                    output: to_out,
                },
                TypeKind::Lambda {
                    input: from_in,
                    output: from_out,
                },
            ) => {
                self.assign_inner(from_in, to_in, state, subtyping, depth + 1)
                    && self.assign_inner(to_out, from_out, state, subtyping, depth + 1)
            }
            _ => return None,
        };
        Some(matched)
    }

    /// A target on the receiving side. Adoption takes the incoming type
    /// with permission to narrow later; a binding that arrived from the
    /// providing side may instead widen to cover a new incoming value.
    fn bind_to_side(
        &self,
        p: ParamRef,
        from: &Type,
        state: &mut InferringState,
        subtyping: bool,
        depth: usize,
    ) -> bool {
        if from.mentions_param(&mut |q| state.is_target(q)) {
            return false;
        }
        match state.binding(p).cloned() {
            None => {
                let flex = if subtyping { Flex::CanNarrow } else { Flex::Fixed };
                state.bind(p, from.clone(), flex);
                true
            }
            Some(current) => {
                if self.recheck(&current, from, subtyping, depth + 1) {
                    return true;
                }
                if subtyping
                    && state.flex(p) == Some(Flex::CanWiden)
                    && self.recheck(from, &current, subtyping, depth + 1)
                {
                    state.bind(p, from.clone(), Flex::CanWiden);
                    return true;
                }
                false
            }
        }
    }

    /// A target on the providing side. Adoption takes the required type
    /// with permission to widen later; a binding that arrived from the
    /// receiving side may instead narrow to fit a new requirement.
    fn bind_from_side(
        &self,
        p: ParamRef,
        to: &Type,
        state: &mut InferringState,
        subtyping: bool,
        depth: usize,
    ) -> bool {
        if to.mentions_param(&mut |q| state.is_target(q)) {
            return false;
        }
        match state.binding(p).cloned() {
            None => {
                let flex = if subtyping { Flex::CanWiden } else { Flex::Fixed };
                state.bind(p, to.clone(), flex);
                true
            }
            Some(current) => {
                if self.recheck(to, &current, subtyping, depth + 1) {
                    return true;
                }
                if subtyping
                    && state.flex(p) == Some(Flex::CanNarrow)
                    && self.recheck(&current, to, subtyping, depth + 1)
                {
                    state.bind(p, to.clone(), Flex::CanNarrow);
                    return true;
                }
                false
            }
        }
    }
}

fn as_target(ty: &Type, state: &InferringState) -> Option<ParamRef> {
    match ty.kind() {
        TypeKind::Param(p) if state.is_target(*p) => Some(*p),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeck::ty::{
        BoxKind, DeclKind, DefId, ParamDef, TypeDef, TypeDefContent,
    };

    struct Fixture {
        registry: Registry,
        home: Symbol,
        away: Symbol,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = Registry::new();
            let home = registry.interner.get_or_intern("home");
            let away = registry.interner.get_or_intern("away");
            Self {
                registry,
                home,
                away,
            }
        }

        fn add_def(
            &mut self,
            name: &str,
            variances: &[Variance],
            content: impl FnOnce(DefId) -> TypeDefContent,
        ) -> DefId {
            let id = DefId::new(self.registry.len() as u32);
            let content = content(id);
            let kind = match &content {
                TypeDefContent::Boxed { .. } => DeclKind::Boxed,
                _ => DeclKind::Native,
            };
            let name_sym = self.registry.interner.get_or_intern(name);
            let fq = self.registry.interner.get_or_intern(format!("home.{name}"));
            let params = variances
                .iter()
                .enumerate()
                .map(|(i, &variance)| ParamDef {
                    name: self.registry.interner.get_or_intern(format!("T{i}")),
                    variance,
                    lower_bound: None,
                    upper_bound: None,
                    default: None,
                    span: Span::dummy(),
                })
                .collect();
            self.registry.alloc_type(
                fq,
                TypeDef {
                    name: name_sym,
                    module: self.home,
                    span: Span::dummy(),
                    kind,
                    params,
                    param_owner: id,
                    implements: Vec::new(),
                    content,
                    case_info: None,
                },
            )
        }

        fn native(&mut self, name: &str, variances: &[Variance]) -> DefId {
            self.add_def(name, variances, |_| TypeDefContent::Native)
        }

        fn assigner(&self) -> Assigner<'_> {
            Assigner::new(&self.registry, self.away)
        }
    }

    fn ok(fx: &Fixture, to: &Type, from: &Type) -> bool {
        fx.assigner().assign(to, from, &mut InferringState::disabled())
    }

    // ============================================================
    // Sentinels and Reflexivity
    // ============================================================

    #[test]
    fn test_reflexive() {
        let mut fx = Fixture::new();
        let a = fx.native("A", &[]);
        let ty = Type::reference(a, vec![]);
        assert!(ok(&fx, &ty, &ty));
        assert!(ok(&fx, &Type::unit(), &Type::unit()));
    }

    #[test]
    fn test_unknown_rejects_both_sides() {
        let fx = Fixture::new();
        assert!(!ok(&fx, &Type::unknown(), &Type::unknown()));
        assert!(!ok(&fx, &Type::top(), &Type::unknown()));
        assert!(!ok(&fx, &Type::unknown(), &Type::bottom()));
    }

    #[test]
    fn test_top_and_bottom_absorption() {
        let mut fx = Fixture::new();
        let a = fx.native("A", &[]);
        let ty = Type::reference(a, vec![]);

        assert!(ok(&fx, &Type::top(), &ty));
        assert!(ok(&fx, &ty, &Type::bottom()));
        assert!(!ok(&fx, &ty, &Type::top()));
        assert!(!ok(&fx, &Type::bottom(), &ty));
    }

    // ============================================================
    // Variance-Directed Slots
    // ============================================================

    #[test]
    fn test_covariant_slot_widens() {
        let mut fx = Fixture::new();
        let list = fx.native("List", &[Variance::Covariant]);

        let wide = Type::reference(list, vec![Type::top()]);
        let narrow = Type::reference(list, vec![Type::bottom()]);
        assert!(ok(&fx, &wide, &narrow));
        assert!(!ok(&fx, &narrow, &wide));
    }

    #[test]
    fn test_contravariant_slot_swaps() {
        let mut fx = Fixture::new();
        let sink = fx.native("Sink", &[Variance::Contravariant]);

        let of_top = Type::reference(sink, vec![Type::top()]);
        let of_bottom = Type::reference(sink, vec![Type::bottom()]);
        assert!(ok(&fx, &of_bottom, &of_top));
        assert!(!ok(&fx, &of_top, &of_bottom));
    }

    #[test]
    fn test_invariant_slot_requires_equality() {
        let mut fx = Fixture::new();
        let cell = fx.native("Cell", &[Variance::Invariant]);

        let of_top = Type::reference(cell, vec![Type::top()]);
        let of_bottom = Type::reference(cell, vec![Type::bottom()]);
        assert!(ok(&fx, &of_top, &of_top));
        assert!(!ok(&fx, &of_top, &of_bottom));
        assert!(!ok(&fx, &of_bottom, &of_top));
    }

    #[test]
    fn test_bivariant_slot_ignored() {
        let mut fx = Fixture::new();
        let tag = fx.native("Tag", &[Variance::Bivariant]);

        let of_top = Type::reference(tag, vec![Type::top()]);
        let of_unit = Type::reference(tag, vec![Type::unit()]);
        assert!(ok(&fx, &of_top, &of_unit));
        assert!(ok(&fx, &of_unit, &of_top));
    }

    #[test]
    fn test_lambda_input_contravariant() {
        let fx = Fixture::new();
        // &(Bottom)=>(Top) accepts less and returns more than &(Top)=>(Bottom)
        let general = Type::lambda(Type::top(), Type::bottom());
        let specific = Type::lambda(Type::bottom(), Type::top());
        assert!(ok(&fx, &specific, &general));
        assert!(!ok(&fx, &general, &specific));
    }

    #[test]
    fn test_tuple_and_record_pairwise() {
        let mut fx = Fixture::new();
        let x = fx.registry.interner.get_or_intern("x");

        let wide = Type::tuple(vec![Type::top(), Type::top()]);
        let narrow = Type::tuple(vec![Type::bottom(), Type::unit()]);
        assert!(ok(&fx, &wide, &narrow));
        assert!(!ok(&fx, &narrow, &wide));

        let rec_wide = Type::record(vec![(x, Type::top())]);
        let rec_narrow = Type::record(vec![(x, Type::unit())]);
        assert!(ok(&fx, &rec_wide, &rec_narrow));
    }

    // ============================================================
    // Parameter Bounds
    // ============================================================

    #[test]
    fn test_param_upper_bound_on_to_side() {
        let mut fx = Fixture::new();
        let host = fx.add_def("Host", &[Variance::Invariant], |_| TypeDefContent::Native);
        {
            let def = fx.registry.type_def_mut(host);
            def.params[0].upper_bound = Some(Type::top());
        }
        let p = Type::param(fx.registry.param_ref(host, 0));

        // Receiving side: the parameter stands in for its upper bound
        assert!(ok(&fx, &p, &Type::unit()));
        // Its lower bound is absent, so nothing flows out of it
        assert!(!ok(&fx, &Type::unit(), &p));
    }

    #[test]
    fn test_param_lower_bound_on_from_side() {
        let mut fx = Fixture::new();
        let host = fx.add_def("Host", &[Variance::Invariant], |_| TypeDefContent::Native);
        {
            let def = fx.registry.type_def_mut(host);
            def.params[0].lower_bound = Some(Type::unit());
        }
        let p = Type::param(fx.registry.param_ref(host, 0));

        // Providing side: the parameter stands in for its lower bound
        assert!(ok(&fx, &Type::unit(), &p));
        assert!(!ok(&fx, &p, &Type::unit()));
    }

    #[test]
    fn test_unbounded_param_only_matches_itself() {
        let mut fx = Fixture::new();
        let host = fx.native("Host", &[Variance::Invariant]);
        let p = Type::param(fx.registry.param_ref(host, 0));

        assert!(ok(&fx, &p, &p));
        assert!(!ok(&fx, &p, &Type::unit()));
        assert!(!ok(&fx, &Type::unit(), &p));
    }

    // ============================================================
    // Unboxing Fallback
    // ============================================================

    #[test]
    fn test_isomorphic_box_opens_one_way() {
        let mut fx = Fixture::new();
        let meters = fx.add_def("Meters", &[], |_| TypeDefContent::Boxed {
            kind: BoxKind::Isomorphic,
            weak: false,
            inner: Type::unit(),
        });
        let boxed = Type::reference(meters, vec![]);

        // The box yields its content, but the content is not the box
        assert!(ok(&fx, &Type::unit(), &boxed));
        assert!(!ok(&fx, &boxed, &Type::unit()));
    }

    #[test]
    fn test_raw_inner_not_adopted_as_box() {
        // Meters = box Scalar: a bare Scalar where Meters is required must
        // be rejected, even though Meters unwraps to Scalar the other way.
        let mut fx = Fixture::new();
        let scalar = fx.native("Scalar", &[]);
        let raw = Type::reference(scalar, vec![]);
        let inner = raw.clone();
        let meters = fx.add_def("Meters", &[], |_| TypeDefContent::Boxed {
            kind: BoxKind::Isomorphic,
            weak: false,
            inner,
        });
        let boxed = Type::reference(meters, vec![]);

        assert!(!ok(&fx, &boxed, &raw));
        assert!(ok(&fx, &raw, &boxed));
    }

    #[test]
    fn test_opaque_box_closed_away_from_home() {
        let mut fx = Fixture::new();
        let token = fx.add_def("Token", &[], |_| TypeDefContent::Boxed {
            kind: BoxKind::Opaque,
            weak: false,
            inner: Type::unit(),
        });
        let boxed = Type::reference(token, vec![]);

        // Viewpoint is `away`: the box does not open
        assert!(!ok(&fx, &boxed, &Type::unit()));
        assert!(!ok(&fx, &Type::unit(), &boxed));

        // From `home` it unwraps, in the providing direction only
        let home_assigner = Assigner::new(&fx.registry, fx.home);
        let mut state = InferringState::disabled();
        assert!(home_assigner.assign(&Type::unit(), &boxed, &mut state));
        assert!(!home_assigner.assign(&boxed, &Type::unit(), &mut state));
    }

    // ============================================================
    // Inference
    // ============================================================

    #[test]
    fn test_target_adopts_on_to_side_then_narrows() {
        let mut fx = Fixture::new();
        let host = fx.native("Host", &[Variance::Invariant]);
        let target = fx.registry.param_ref(host, 0);
        let p = Type::param(target);
        let mut state = InferringState::targeting(&fx.registry, &[target]);

        let assigner = fx.assigner();
        // First incoming value is adopted as-is
        assert!(assigner.assign(&p, &Type::top(), &mut state));
        assert!(state.binding(target).unwrap().equal(&Type::top()));

        // A narrower incoming value already fits the binding
        assert!(assigner.assign(&p, &Type::unit(), &mut state));
        assert!(state.binding(target).unwrap().equal(&Type::top()));

        // A later requirement on the providing side narrows the binding
        assert!(assigner.assign(&Type::unit(), &p, &mut state));
        assert!(state.binding(target).unwrap().equal(&Type::unit()));
    }

    #[test]
    fn test_target_adopts_on_from_side_then_widens() {
        let mut fx = Fixture::new();
        let host = fx.native("Host", &[Variance::Invariant]);
        let target = fx.registry.param_ref(host, 0);
        let p = Type::param(target);
        let mut state = InferringState::targeting(&fx.registry, &[target]);

        let assigner = fx.assigner();
        // The uninstantiated result must fit into Unit: adopt Unit
        assert!(assigner.assign(&Type::unit(), &p, &mut state));
        assert!(state.binding(target).unwrap().equal(&Type::unit()));

        // A wider requirement is already satisfied
        assert!(assigner.assign(&Type::top(), &p, &mut state));
        assert!(state.binding(target).unwrap().equal(&Type::unit()));

        // A wider incoming value on the receiving side widens the binding
        assert!(assigner.assign(&p, &Type::top(), &mut state));
        assert!(state.binding(target).unwrap().equal(&Type::top()));
    }

    #[test]
    fn test_to_side_adoption_cannot_widen() {
        let mut fx = Fixture::new();
        let host = fx.native("Host", &[Variance::Invariant]);
        let target = fx.registry.param_ref(host, 0);
        let p = Type::param(target);
        let mut state = InferringState::targeting(&fx.registry, &[target]);

        let assigner = fx.assigner();
        assert!(assigner.assign(&p, &Type::unit(), &mut state));
        // Adopted with CanNarrow: a wider incoming value is rejected
        assert!(!assigner.assign(&p, &Type::top(), &mut state));
        assert!(state.binding(target).unwrap().equal(&Type::unit()));
    }

    #[test]
    fn test_target_fixed_without_subtyping() {
        let mut fx = Fixture::new();
        let cell = fx.native("Cell", &[Variance::Invariant]);
        let host = fx.native("Host", &[Variance::Invariant]);
        let target = fx.registry.param_ref(host, 0);
        let p = Type::param(target);
        let mut state = InferringState::targeting(&fx.registry, &[target]);

        // The target sits in an invariant slot: adoption pins it
        let to = Type::reference(cell, vec![p]);
        let of_unit = Type::reference(cell, vec![Type::unit()]);
        let of_top = Type::reference(cell, vec![Type::top()]);

        let assigner = fx.assigner();
        assert!(assigner.assign(&to, &of_unit, &mut state));
        assert!(state.binding(target).unwrap().equal(&Type::unit()));
        assert!(!assigner.assign(&to, &of_top, &mut state));
    }

    #[test]
    fn test_distinct_targets_do_not_unify() {
        let mut fx = Fixture::new();
        let host = fx.native("Host", &[Variance::Invariant, Variance::Invariant]);
        let a = fx.registry.param_ref(host, 0);
        let b = fx.registry.param_ref(host, 1);
        let mut state = InferringState::targeting(&fx.registry, &[a, b]);

        let assigner = fx.assigner();
        assert!(!assigner.assign(&Type::param(a), &Type::param(b), &mut state));
        assert!(assigner.assign(&Type::param(a), &Type::param(a), &mut state));
    }

    #[test]
    fn test_seeded_upper_bound_blocks_widening() {
        let mut fx = Fixture::new();
        let host = fx.native("Host", &[Variance::Invariant]);
        {
            let def = fx.registry.type_def_mut(host);
            def.params[0].upper_bound = Some(Type::unit());
        }
        let target = fx.registry.param_ref(host, 0);
        let p = Type::param(target);
        let mut state = InferringState::targeting(&fx.registry, &[target]);

        let assigner = fx.assigner();
        // Within the bound: fine. Above it: the seeded binding cannot widen.
        assert!(assigner.assign(&p, &Type::bottom(), &mut state));
        assert!(!assigner.assign(&p, &Type::top(), &mut state));
    }

    #[test]
    fn test_failed_attempt_fork_is_discarded() {
        let mut fx = Fixture::new();
        let host = fx.native("Host", &[Variance::Invariant]);
        let target = fx.registry.param_ref(host, 0);
        let p = Type::param(target);
        let state = InferringState::targeting(&fx.registry, &[target]);

        let assigner = fx.assigner();
        let mut attempt = state.clone();
        assert!(assigner.assign(&p, &Type::unit(), &mut attempt));
        // The failed path's fork is dropped; the original is untouched
        assert!(state.binding(target).is_none());
    }
}
