//! Variance Lattice and Deduction
//!
//! Variance describes how the subtyping of a generic type tracks the
//! subtyping of its arguments.
//!
//! - **Covariant** (`+T`): if `A <: B`, then `F[A] <: F[B]`
//! - **Contravariant** (`-T`): if `A <: B`, then `F[B] <: F[A]`
//! - **Invariant** (`T`): arguments must match exactly
//! - **Bivariant** (`*T`): any relationship holds; the parameter is unused
//!
//! Two binary operations drive everything here:
//!
//! - [`Variance::combine`] merges two observations of the same parameter
//!   into one requirement (meet towards `Invariant`).
//! - [`Variance::compose`] threads an occurrence through an enclosing
//!   position, such as a lambda input or a declared-variance argument slot.
//!
//! [`deduce`] walks a type and computes, per parameter slot of one owner,
//! the combined variance of every occurrence. Declared variance is then
//! valid iff it absorbs the deduction under `combine`.

use super::ty::{DefId, Registry, Type, TypeKind};

/// Variance of a type parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variance {
    /// Covariant: `F[A] <: F[B]` when `A <: B`.
    Covariant,
    /// Contravariant: `F[A] <: F[B]` when `B <: A`.
    Contravariant,
    /// Invariant: no subtyping between distinct arguments.
    Invariant,
    /// Bivariant: unused parameter, any relationship holds.
    Bivariant,
}

impl Variance {
    /// Combine two observations of the same parameter.
    ///
    /// Truth table:
    /// ```text
    ///           | Bivariant | Covariant | Contravariant | Invariant
    /// ----------+-----------+-----------+---------------+----------
    /// Bivariant | Bivariant | Covariant | Contravariant | Invariant
    /// Covariant |           | Covariant | Invariant     | Invariant
    /// Contra... |           |           | Contravariant | Invariant
    /// Invariant |           |           |               | Invariant
    /// ```
    pub fn combine(self, other: Variance) -> Variance {
        match (self, other) {
            // Bivariant is the identity
            (Variance::Bivariant, v) | (v, Variance::Bivariant) => v,

            (Variance::Covariant, Variance::Covariant) => Variance::Covariant,
            (Variance::Contravariant, Variance::Contravariant) => Variance::Contravariant,

            // Mixed directions collapse to invariant
            (Variance::Covariant, Variance::Contravariant)
            | (Variance::Contravariant, Variance::Covariant) => Variance::Invariant,

            (Variance::Invariant, _) | (_, Variance::Invariant) => Variance::Invariant,
        }
    }

    /// Thread what sits inside a slot through the slot's declared variance.
    ///
    /// `self` is the slot's declaration, `inner` what flows through it. A
    /// covariant slot passes `inner` through unchanged, a contravariant slot
    /// flips it, an invariant slot forces invariance, and a bivariant slot
    /// passes it through unchanged as well. A bivariant `inner` stays
    /// bivariant under any slot: an unused parameter does not become
    /// constrained by where the unused slot sits.
    pub fn compose(self, inner: Variance) -> Variance {
        if inner == Variance::Bivariant {
            return Variance::Bivariant;
        }
        match self {
            Variance::Covariant | Variance::Bivariant => inner,
            Variance::Contravariant => inner.flip(),
            Variance::Invariant => Variance::Invariant,
        }
    }

    /// Flip covariant and contravariant, keep invariant and bivariant.
    pub fn flip(self) -> Variance {
        match self {
            Variance::Covariant => Variance::Contravariant,
            Variance::Contravariant => Variance::Covariant,
            Variance::Invariant => Variance::Invariant,
            Variance::Bivariant => Variance::Bivariant,
        }
    }

    /// Whether a declared variance satisfies a deduced requirement: the
    /// declaration must absorb the requirement under [`combine`].
    ///
    /// [`combine`]: Variance::combine
    pub fn admits(self, required: Variance) -> bool {
        self.combine(required) == self
    }

    /// Whether this variance permits widening of the argument.
    pub fn is_covariant(self) -> bool {
        matches!(self, Variance::Covariant | Variance::Bivariant)
    }

    /// Whether this variance permits narrowing of the argument.
    pub fn is_contravariant(self) -> bool {
        matches!(self, Variance::Contravariant | Variance::Bivariant)
    }

    pub fn is_invariant(self) -> bool {
        matches!(self, Variance::Invariant)
    }

    /// The source annotation for this variance.
    pub fn annotation(&self) -> &'static str {
        match self {
            Variance::Covariant => "+",
            Variance::Contravariant => "-",
            Variance::Invariant => "",
            Variance::Bivariant => "*",
        }
    }
}

impl std::fmt::Display for Variance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variance::Covariant => write!(f, "covariant"),
            Variance::Contravariant => write!(f, "contravariant"),
            Variance::Invariant => write!(f, "invariant"),
            Variance::Bivariant => write!(f, "bivariant"),
        }
    }
}

/// Deduce, for each of `owner`'s parameter slots, the combined variance of
/// its occurrences in `ty`.
///
/// `ty` is walked in covariant position. Nominal argument slots compose
/// the slot's declared variance; lambda inputs flip direction; tuples,
/// records, and lambda outputs preserve it. A slot that never occurs stays
/// `Bivariant`.
pub fn deduce(registry: &Registry, ty: &Type, owner: DefId, param_count: usize) -> Vec<Variance> {
    let mut out = vec![Variance::Bivariant; param_count];
    walk(registry, ty, owner, Variance::Covariant, &mut out);
    out
}

fn walk(
    registry: &Registry,
    ty: &Type,
    owner: DefId,
    position: Variance,
    out: &mut Vec<Variance>,
) {
    match ty.kind() {
        TypeKind::Param(p) if p.owner == owner => {
            let i = p.index as usize;
            if i < out.len() {
                out[i] = out[i].combine(position);
            }
        }
        TypeKind::Ref { def, args } => {
            for (i, arg) in args.iter().enumerate() {
                let declared = registry.param_def(registry.param_ref(*def, i)).variance;
                walk(registry, arg, owner, declared.compose(position), out);
            }
        }
        TypeKind::Tuple(elements) => {
            for element in elements {
                walk(registry, element, owner, position, out);
            }
        }
        TypeKind::Record(record) => {
            for field in record.fields() {
                walk(registry, &field.ty, owner, position, out);
            }
        }
        TypeKind::Lambda { input, output } => {
            walk(registry, input, owner, position.flip(), out);
            walk(registry, output, owner, position, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;
    use crate::typeck::ty::{DeclKind, ParamDef, TypeDef, TypeDefContent};

    const ALL: [Variance; 4] = [
        Variance::Covariant,
        Variance::Contravariant,
        Variance::Invariant,
        Variance::Bivariant,
    ];

    // ============================================================
    // Lattice Laws
    // ============================================================

    #[test]
    fn test_combine_table() {
        use Variance::*;

        assert_eq!(Bivariant.combine(Covariant), Covariant);
        assert_eq!(Bivariant.combine(Contravariant), Contravariant);
        assert_eq!(Bivariant.combine(Invariant), Invariant);

        assert_eq!(Covariant.combine(Covariant), Covariant);
        assert_eq!(Contravariant.combine(Contravariant), Contravariant);

        assert_eq!(Covariant.combine(Contravariant), Invariant);
        assert_eq!(Contravariant.combine(Covariant), Invariant);

        assert_eq!(Invariant.combine(Covariant), Invariant);
        assert_eq!(Invariant.combine(Contravariant), Invariant);
    }

    #[test]
    fn test_combine_commutative_and_idempotent() {
        for a in ALL {
            assert_eq!(a.combine(a), a);
            for b in ALL {
                assert_eq!(a.combine(b), b.combine(a));
            }
        }
    }

    #[test]
    fn test_combine_associative() {
        for a in ALL {
            for b in ALL {
                for c in ALL {
                    assert_eq!(a.combine(b).combine(c), a.combine(b.combine(c)));
                }
            }
        }
    }

    #[test]
    fn test_compose_table() {
        use Variance::*;

        // Covariant slot preserves
        assert_eq!(Covariant.compose(Covariant), Covariant);
        assert_eq!(Covariant.compose(Contravariant), Contravariant);
        assert_eq!(Covariant.compose(Invariant), Invariant);

        // Contravariant slot flips
        assert_eq!(Contravariant.compose(Covariant), Contravariant);
        assert_eq!(Contravariant.compose(Contravariant), Covariant);
        assert_eq!(Contravariant.compose(Invariant), Invariant);

        // Invariant slot erases direction
        assert_eq!(Invariant.compose(Covariant), Invariant);
        assert_eq!(Invariant.compose(Contravariant), Invariant);

        // A bivariant slot passes through unchanged
        assert_eq!(Bivariant.compose(Covariant), Covariant);
        assert_eq!(Bivariant.compose(Contravariant), Contravariant);
        assert_eq!(Bivariant.compose(Invariant), Invariant);

        // A bivariant occurrence stays bivariant under any slot
        for declared in ALL {
            assert_eq!(declared.compose(Bivariant), Bivariant);
        }
    }

    #[test]
    fn test_flip_involution() {
        for v in ALL {
            assert_eq!(v.flip().flip(), v);
        }
        assert_eq!(Variance::Covariant.flip(), Variance::Contravariant);
        assert_eq!(Variance::Invariant.flip(), Variance::Invariant);
    }

    #[test]
    fn test_admits() {
        use Variance::*;

        // Invariant admits everything
        for required in ALL {
            assert!(Invariant.admits(required));
        }
        // Any declaration admits an unused parameter
        for declared in ALL {
            assert!(declared.admits(Bivariant));
        }
        assert!(Covariant.admits(Covariant));
        assert!(!Covariant.admits(Contravariant));
        assert!(!Covariant.admits(Invariant));
        assert!(!Bivariant.admits(Covariant));
    }

    // ============================================================
    // Deduction
    // ============================================================

    fn test_registry(variances: &[Variance]) -> (Registry, DefId) {
        let mut registry = Registry::new();
        let name = registry.interner.get_or_intern("Host");
        let module = registry.interner.get_or_intern("m");
        let params = variances
            .iter()
            .enumerate()
            .map(|(i, &variance)| ParamDef {
                name: registry.interner.get_or_intern(format!("P{i}")),
                variance,
                lower_bound: None,
                upper_bound: None,
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
    fn test_deduce_direct_occurrence() {
        let (registry, host) = test_registry(&[Variance::Covariant]);
        let p = Type::param(registry.param_ref(host, 0));

        assert_eq!(deduce(&registry, &p, host, 1), vec![Variance::Covariant]);
    }

    #[test]
    fn test_deduce_unused_is_bivariant() {
        let (registry, host) = test_registry(&[Variance::Covariant]);
        assert_eq!(
            deduce(&registry, &Type::unit(), host, 1),
            vec![Variance::Bivariant]
        );
    }

    #[test]
    fn test_deduce_lambda_positions() {
        let (registry, host) = test_registry(&[Variance::Covariant, Variance::Covariant]);
        let p0 = Type::param(registry.param_ref(host, 0));
        let p1 = Type::param(registry.param_ref(host, 1));

        let lambda = Type::lambda(p0.clone(), p1);
        assert_eq!(
            deduce(&registry, &lambda, host, 2),
            vec![Variance::Contravariant, Variance::Covariant]
        );

        // Both sides: the parameter becomes invariant
        let both = Type::lambda(p0.clone(), p0);
        assert_eq!(deduce(&registry, &both, host, 2)[0], Variance::Invariant);
    }

    #[test]
    fn test_deduce_through_declared_slot() {
        // Host's slot 0 is whatever the test asks; a reference to Host
        // composes that declaration onto occurrences inside the argument.
        // A bivariant slot does not hide the occurrence: the direct
        // (covariant) use inside the argument still counts.
        for (declared, expected) in [
            (Variance::Covariant, Variance::Covariant),
            (Variance::Contravariant, Variance::Contravariant),
            (Variance::Invariant, Variance::Invariant),
            (Variance::Bivariant, Variance::Covariant),
        ] {
            let (registry, host) = test_registry(&[declared]);
            let p = Type::param(registry.param_ref(host, 0));
            let ty = Type::reference(host, vec![p]);
            assert_eq!(deduce(&registry, &ty, host, 1), vec![expected]);
        }
    }

    #[test]
    fn test_deduce_nested_flip() {
        // Host[-T]: Host[P] places P contravariantly, and a lambda input
        // around that flips it back.
        let (registry, host) = test_registry(&[Variance::Contravariant]);
        let p = Type::param(registry.param_ref(host, 0));
        let ty = Type::lambda(Type::reference(host, vec![p]), Type::unit());

        assert_eq!(deduce(&registry, &ty, host, 1), vec![Variance::Covariant]);
    }
}
