//! Interface dispatch resolution.
//!
//! After the registry is built, every concrete definition's implemented
//! interfaces are resolved to the functions realizing their methods. The
//! result lands in the definition's [`DispatchTable`]s, which the
//! expression checker consults to answer "which function backs this
//! method call".
//!
//! A concrete type implements the transitive closure of its declared
//! interfaces. For each required method, every function registered under
//! the method's name is tried as a candidate; exactly one must match.

use std::collections::HashMap;

use super::error::{TypeError, TypeErrorKind};
use super::infer::InferringState;
use super::ty::{DefId, DispatchTable, ParamRef, Registry, Symbol, Type, TypeDefContent, TypeKind};
use super::unify::Assigner;

/// Resolve dispatch tables for every concrete definition in the registry.
///
/// Tables are written back onto the definitions; all resolution failures
/// are accumulated and returned together.
pub fn resolve(registry: &mut Registry) -> Vec<TypeError> {
    let mut resolver = Resolver {
        registry,
        closures: HashMap::new(),
        errors: Vec::new(),
    };
    resolver.run();
    resolver.errors
}

struct Resolver<'a> {
    registry: &'a mut Registry,
    /// Memoized interface closures, keyed by the definition they belong to.
    closures: HashMap<DefId, Vec<DefId>>,
    errors: Vec<TypeError>,
}

impl Resolver<'_> {
    fn run(&mut self) {
        let mut concrete: Vec<DefId> = self
            .registry
            .item_ids()
            .filter(|&id| self.registry.is_type(id) && !self.registry.type_def(id).is_interface())
            .collect();
        concrete.sort_by_key(|&id| {
            let def = self.registry.type_def(id);
            (
                self.registry.name_str(def.module).to_string(),
                self.registry.name_str(def.name).to_string(),
            )
        });
        for id in concrete {
            self.resolve_definition(id);
        }
    }

    fn resolve_definition(&mut self, concrete: DefId) {
        let closure = self.closure(concrete);
        if closure.is_empty() {
            return;
        }
        let mut tables = Vec::with_capacity(closure.len());
        for interface in closure {
            let mut table = DispatchTable::new(interface);
            for (method, signature) in self.methods_of(interface) {
                match self.resolve_method(concrete, interface, method, &signature) {
                    Ok(target) => {
                        table.methods.insert(method, target);
                    }
                    Err(err) => self.errors.push(*err),
                }
            }
            tables.push(table);
        }
        self.registry.type_def_mut(concrete).implements = tables;
    }

    /// Transitive closure of implemented interfaces, each interface's own
    /// included interfaces first. Memoized per definition.
    fn closure(&mut self, def: DefId) -> Vec<DefId> {
        if let Some(cached) = self.closures.get(&def) {
            return cached.clone();
        }
        let direct: Vec<DefId> = self
            .registry
            .type_def(def)
            .implements
            .iter()
            .map(|t| t.interface)
            .collect();
        let mut out = Vec::new();
        for interface in direct {
            for included in self.closure(interface) {
                if !out.contains(&included) {
                    out.push(included);
                }
            }
            if !out.contains(&interface) {
                out.push(interface);
            }
        }
        self.closures.insert(def, out.clone());
        out
    }

    /// An interface's required methods in declared order.
    fn methods_of(&self, interface: DefId) -> Vec<(Symbol, Type)> {
        match &self.registry.type_def(interface).content {
            TypeDefContent::Interface { methods } => match methods.kind() {
                TypeKind::Record(record) => record
                    .fields()
                    .iter()
                    .map(|f| (f.name, f.ty.clone()))
                    .collect(),
                _ => Vec::new(),
            },
            // Interfaces with failed content construction have nothing
            // to dispatch
            _ => Vec::new(),
        }
    }

    fn resolve_method(
        &self,
        concrete: DefId,
        interface: DefId,
        method: Symbol,
        signature: &Type,
    ) -> Result<DefId, Box<TypeError>> {
        let candidates = self.registry.functions_named(method);
        let mut matches = Vec::new();
        for &candidate in candidates {
            // Implicit-context requirements make a function ineligible
            if !self.registry.fn_def(candidate).implicits.is_empty() {
                continue;
            }
            if self.candidate_matches(concrete, interface, candidate, signature) {
                matches.push(candidate);
            }
        }
        let span = self.registry.type_def(concrete).span;
        match matches.as_slice() {
            [single] => Ok(*single),
            [] => TypeError::new(
                TypeErrorKind::MethodMissing {
                    ty: self.display_def(concrete),
                    interface: self.display_def(interface),
                    method: self.registry.name_str(method).to_string(),
                },
                span,
            )
            .into_err(),
            many => TypeError::new(
                TypeErrorKind::MethodAmbiguous {
                    ty: self.display_def(concrete),
                    interface: self.display_def(interface),
                    method: self.registry.name_str(method).to_string(),
                    candidates: many.iter().map(|&id| self.display_fn(id)).collect(),
                },
                span,
            )
            .into_err(),
        }
    }

    /// A candidate matches when, in one non-subtyping session targeting
    /// the concrete type's parameters, its input unifies with the
    /// concrete self-reference and its output then unifies with the
    /// method's declared return type. The return type is first rewritten
    /// to use the concrete type's parameters, matched up by position
    /// with the interface's.
    fn candidate_matches(
        &self,
        concrete: DefId,
        interface: DefId,
        candidate: DefId,
        signature: &Type,
    ) -> bool {
        let TypeKind::Lambda { output: declared, .. } = signature.kind() else {
            return false;
        };
        let fn_def = self.registry.fn_def(candidate);
        let targets: Vec<ParamRef> = self
            .registry
            .params_of(concrete)
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        let mut state = InferringState::targeting(self.registry, &targets);
        // Unboxing during unification sees what the candidate's module sees
        let assigner = Assigner::new(self.registry, fn_def.module);

        let self_ref = self.registry.self_type(concrete);
        if !assigner.assign_exact(&fn_def.input, &self_ref, &mut state) {
            return false;
        }

        let iface_def = self.registry.type_def(interface);
        let iface_owner = iface_def.param_owner;
        let concrete_args: Vec<Type> = targets
            .iter()
            .take(iface_def.params.len())
            .map(|&p| Type::param(p))
            .collect();
        let expected = declared.substitute_params(iface_owner, &concrete_args);
        assigner.assign_exact(&expected, &fn_def.output, &mut state)
    }

    fn display_def(&self, id: DefId) -> String {
        let def = self.registry.type_def(id);
        crate::modules::fqn(
            self.registry.name_str(def.module),
            self.registry.name_str(def.name),
        )
    }

    fn display_fn(&self, id: DefId) -> String {
        let def = self.registry.fn_def(id);
        crate::modules::fqn(
            self.registry.name_str(def.module),
            self.registry.name_str(def.name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        FnDecl, MethodDecl, ModuleDecl, ParamDecl, TypeDecl, TypeDeclBody, TypeExpr,
    };
    use crate::modules::ModuleScope;
    use crate::span::Span;
    use crate::typeck::registry;

    fn native(name: &str) -> TypeDecl {
        TypeDecl {
            name: name.to_string(),
            span: Span::dummy(),
            params: Vec::new(),
            implements: Vec::new(),
            body: TypeDeclBody::Native,
        }
    }

    fn interface(name: &str, methods: Vec<(&str, TypeExpr, TypeExpr)>) -> TypeDecl {
        TypeDecl {
            name: name.to_string(),
            span: Span::dummy(),
            params: Vec::new(),
            implements: Vec::new(),
            body: TypeDeclBody::Interface {
                methods: methods
                    .into_iter()
                    .map(|(n, input, output)| MethodDecl {
                        name: n.to_string(),
                        signature: TypeExpr::lambda(input, output, Span::dummy()),
                        span: Span::dummy(),
                    })
                    .collect(),
            },
        }
    }

    fn function(name: &str, input: TypeExpr, output: TypeExpr) -> FnDecl {
        FnDecl {
            name: name.to_string(),
            span: Span::dummy(),
            params: Vec::new(),
            implicits: Vec::new(),
            input,
            output,
        }
    }

    fn name(n: &str) -> TypeExpr {
        TypeExpr::name(n, Span::dummy())
    }

    /// Builds the registry and runs the resolver, returning both.
    fn resolve_modules(modules: Vec<ModuleDecl>) -> (Registry, Vec<TypeError>) {
        let scope = ModuleScope::build(&modules);
        let mut registry = registry::build(&modules, &scope).expect("registration succeeds");
        let errors = resolve(&mut registry);
        (registry, errors)
    }

    /// A module with interface `Show { show: &(Unit)=>(Str) }`, concrete
    /// `Num` implementing it, and the given functions.
    fn show_module(functions: Vec<FnDecl>) -> ModuleDecl {
        let mut num = native("Num");
        num.implements.push(name("Show"));
        ModuleDecl {
            name: "core".to_string(),
            imports: Vec::new(),
            aliases: Vec::new(),
            types: vec![
                native("Str"),
                interface("Show", vec![("show", TypeExpr::Unit(Span::dummy()), name("Str"))]),
                num,
            ],
            functions,
        }
    }

    // ============================================================
    // Uniqueness
    // ============================================================

    #[test]
    fn test_unique_candidate_recorded() {
        let (registry, errors) = resolve_modules(vec![show_module(vec![function(
            "show",
            name("Num"),
            name("Str"),
        )])]);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");

        let num = registry.lookup_type_str("core.Num").unwrap();
        let show = registry.lookup_type_str("core.Show").unwrap();
        let method = registry.interner.get("show").unwrap();
        let table = &registry.type_def(num).implements[0];
        assert_eq!(table.interface, show);
        let target = table.methods[&method];
        assert_eq!(registry.name_str(registry.fn_def(target).module), "core");
    }

    #[test]
    fn test_missing_implementation_reported() {
        let (_, errors) = resolve_modules(vec![show_module(Vec::new())]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0].kind,
            TypeErrorKind::MethodMissing { ty, interface, method }
                if ty == "core.Num" && interface == "core.Show" && method == "show"
        ));
    }

    #[test]
    fn test_ambiguous_implementation_reported() {
        let f = function("show", name("Num"), name("Str"));
        let (_, errors) = resolve_modules(vec![show_module(vec![f.clone(), f])]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0].kind,
            TypeErrorKind::MethodAmbiguous { ty, method, candidates, .. }
                if ty == "core.Num" && method == "show" && candidates.len() == 2
        ));
    }

    // ============================================================
    // Eligibility and Matching
    // ============================================================

    #[test]
    fn test_candidate_with_implicits_ineligible() {
        let mut f = function("show", name("Num"), name("Str"));
        f.implicits
            .push(("ctx".to_string(), name("Str")));
        let (_, errors) = resolve_modules(vec![show_module(vec![f])]);
        assert!(matches!(
            &errors[0].kind,
            TypeErrorKind::MethodMissing { .. }
        ));
    }

    #[test]
    fn test_wrong_input_type_does_not_match() {
        let (_, errors) = resolve_modules(vec![show_module(vec![function(
            "show",
            name("Str"),
            name("Str"),
        )])]);
        assert!(matches!(
            &errors[0].kind,
            TypeErrorKind::MethodMissing { .. }
        ));
    }

    #[test]
    fn test_wrong_output_type_does_not_match() {
        let (_, errors) = resolve_modules(vec![show_module(vec![function(
            "show",
            name("Num"),
            name("Num"),
        )])]);
        assert!(matches!(
            &errors[0].kind,
            TypeErrorKind::MethodMissing { .. }
        ));
    }

    #[test]
    fn test_generic_candidate_matches_generic_implementor() {
        // Wrap[T] implements Peek { peek: &(Unit)=>(T) } via
        // first[U]: &(Wrap[U])=>(U)
        let peek = TypeDecl {
            name: "Peek".to_string(),
            span: Span::dummy(),
            params: vec![ParamDecl::plain("T", Span::dummy())],
            implements: Vec::new(),
            body: TypeDeclBody::Interface {
                methods: vec![MethodDecl {
                    name: "peek".to_string(),
                    signature: TypeExpr::lambda(
                        TypeExpr::Unit(Span::dummy()),
                        name("T"),
                        Span::dummy(),
                    ),
                    span: Span::dummy(),
                }],
            },
        };
        let mut wrap = native("Wrap");
        wrap.params.push(ParamDecl::plain("T", Span::dummy()));
        wrap.implements.push(name("Peek"));
        let first = FnDecl {
            name: "peek".to_string(),
            span: Span::dummy(),
            params: vec![ParamDecl::plain("U", Span::dummy())],
            implicits: Vec::new(),
            input: TypeExpr::Name {
                name: "Wrap".to_string(),
                args: vec![name("U")],
                span: Span::dummy(),
            },
            output: name("U"),
        };
        let module = ModuleDecl {
            name: "core".to_string(),
            imports: Vec::new(),
            aliases: Vec::new(),
            types: vec![peek, wrap],
            functions: vec![first],
        };
        let (registry, errors) = resolve_modules(vec![module]);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");

        let wrap = registry.lookup_type_str("core.Wrap").unwrap();
        let method = registry.interner.get("peek").unwrap();
        assert!(registry.type_def(wrap).implements[0]
            .methods
            .contains_key(&method));
    }

    #[test]
    fn test_generic_candidate_with_mismatched_output_rejected() {
        // same as above but the function returns Unit instead of U
        let peek = TypeDecl {
            name: "Peek".to_string(),
            span: Span::dummy(),
            params: vec![ParamDecl::plain("T", Span::dummy())],
            implements: Vec::new(),
            body: TypeDeclBody::Interface {
                methods: vec![MethodDecl {
                    name: "peek".to_string(),
                    signature: TypeExpr::lambda(
                        TypeExpr::Unit(Span::dummy()),
                        name("T"),
                        Span::dummy(),
                    ),
                    span: Span::dummy(),
                }],
            },
        };
        let mut wrap = native("Wrap");
        wrap.params.push(ParamDecl::plain("T", Span::dummy()));
        wrap.implements.push(name("Peek"));
        let bad = FnDecl {
            name: "peek".to_string(),
            span: Span::dummy(),
            params: vec![ParamDecl::plain("U", Span::dummy())],
            implicits: Vec::new(),
            input: TypeExpr::Name {
                name: "Wrap".to_string(),
                args: vec![name("U")],
                span: Span::dummy(),
            },
            output: TypeExpr::Unit(Span::dummy()),
        };
        let module = ModuleDecl {
            name: "core".to_string(),
            imports: Vec::new(),
            aliases: Vec::new(),
            types: vec![peek, wrap],
            functions: vec![bad],
        };
        let (_, errors) = resolve_modules(vec![module]);
        assert!(matches!(
            &errors[0].kind,
            TypeErrorKind::MethodMissing { method, .. } if method == "peek"
        ));
    }

    // ============================================================
    // Interface Closure
    // ============================================================

    #[test]
    fn test_included_interface_methods_required_transitively() {
        // Ord includes Eq; Num implements Ord, so it needs eq too
        let eq = interface("Eq", vec![("eq", name("Num"), name("Num"))]);
        let mut ord = interface("Ord", vec![("cmp", name("Num"), name("Num"))]);
        ord.implements.push(name("Eq"));
        let mut num = native("Num");
        num.implements.push(name("Ord"));
        let module = ModuleDecl {
            name: "core".to_string(),
            imports: Vec::new(),
            aliases: Vec::new(),
            types: vec![eq, ord, num],
            functions: vec![
                function("cmp", name("Num"), name("Num")),
                function("eq", name("Num"), name("Num")),
            ],
        };
        let (registry, errors) = resolve_modules(vec![module]);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");

        let num = registry.lookup_type_str("core.Num").unwrap();
        let eq = registry.lookup_type_str("core.Eq").unwrap();
        let ord = registry.lookup_type_str("core.Ord").unwrap();
        let tables = &registry.type_def(num).implements;
        // included interfaces come first in the closure
        assert_eq!(tables[0].interface, eq);
        assert_eq!(tables[1].interface, ord);
    }

    #[test]
    fn test_missing_included_method_reported_against_included_interface() {
        let eq = interface("Eq", vec![("eq", name("Num"), name("Num"))]);
        let mut ord = interface("Ord", vec![("cmp", name("Num"), name("Num"))]);
        ord.implements.push(name("Eq"));
        let mut num = native("Num");
        num.implements.push(name("Ord"));
        let module = ModuleDecl {
            name: "core".to_string(),
            imports: Vec::new(),
            aliases: Vec::new(),
            types: vec![eq, ord, num],
            functions: vec![function("cmp", name("Num"), name("Num"))],
        };
        let (_, errors) = resolve_modules(vec![module]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0].kind,
            TypeErrorKind::MethodMissing { interface, method, .. }
                if interface == "core.Eq" && method == "eq"
        ));
    }
}
