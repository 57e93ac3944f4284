//! Registration and validation pipeline.
//!
//! Type checking starts here: every module's declarations are folded into
//! one [`Registry`] through a fixed sequence of stages, each of which runs
//! over every definition before the next begins.
//!
//! 1. **Registration**: every type declaration (and every enum case, as
//!    its own definition) gets a `DefId` keyed by fully-qualified name.
//! 2. **Ordering**: definitions are ordered by (module, item) name, so all
//!    later stages and their diagnostics are reproducible.
//! 3. **Alias conflicts**: a type sharing a name with a module alias.
//! 4. **Implements fill**: resolve each implements clause to an interface
//!    and check parameter-count and variance compatibility.
//! 5. **Bounds and defaults**: elaborate parameter bound and default
//!    expressions, written per definition in one batch.
//! 6. **Content construction**: elaborate box inner types and interface
//!    method records.
//! 7. **Global checks**: circular boxes, circular interface inclusion,
//!    and declared-variance validation, each accumulated over the whole
//!    registry.
//!
//! Functions are registered after stage 7, once every type they mention
//! exists. Stages never stop at the first failure: errors accumulate and
//! the caller receives the complete batch.

use std::collections::{HashMap, HashSet};

use crate::ast::{
    FnDecl, ModuleDecl, ParamDecl, TypeDecl, TypeDeclBody, TypeExpr, VarianceAnnot,
};
use crate::modules::{fqn, NameService};
use crate::span::Span;

use super::error::{TypeError, TypeErrorKind, TypeResult};
use super::ty::{
    BoxKind, CaseInfo, DeclKind, DefId, DispatchTable, FnDef, ParamDef, Registry, Type,
    TypeDef, TypeDefContent, TypeKind,
};
use super::variance::{self, Variance};

/// Structural size caps, enforced during registration.
pub const MAX_TYPE_PARAMS: usize = 16;
pub const MAX_IMPLEMENTS: usize = 16;
pub const MAX_TUPLE_ELEMS: usize = 64;
pub const MAX_RECORD_FIELDS: usize = 64;
pub const MAX_ENUM_CASES: usize = 256;

/// Run the whole pipeline over a set of modules.
///
/// Returns the finished registry, or every error found across all stages.
pub fn build(modules: &[ModuleDecl], names: &dyn NameService) -> Result<Registry, Vec<TypeError>> {
    let mut builder = Builder::new(names);
    builder.register_all(modules);
    builder.order_definitions();
    builder.check_alias_conflicts(modules);
    builder.fill_implements();
    builder.elaborate_bounds_and_defaults();
    builder.construct_contents();
    builder.check_circular_boxes();
    builder.check_circular_interfaces();
    builder.check_declared_variance();
    builder.register_functions(modules);
    builder.finish()
}

struct Builder<'a> {
    registry: Registry,
    names: &'a dyn NameService,
    errors: Vec<TypeError>,
    /// Declaration backing each registered type definition.
    decls: HashMap<DefId, &'a TypeDecl>,
    /// Module name (as a string) of each definition.
    module_names: HashMap<DefId, &'a str>,
    /// Parameter name scope of each definition.
    param_scopes: HashMap<DefId, HashMap<String, super::ty::ParamRef>>,
    /// Deterministic (module, item) processing order, set by stage 2.
    order: Vec<DefId>,
}

impl<'a> Builder<'a> {
    fn new(names: &'a dyn NameService) -> Self {
        Self {
            registry: Registry::new(),
            names,
            errors: Vec::new(),
            decls: HashMap::new(),
            module_names: HashMap::new(),
            param_scopes: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn error(&mut self, kind: TypeErrorKind, span: Span) {
        self.errors.push(TypeError::new(kind, span));
    }

    fn finish(self) -> Result<Registry, Vec<TypeError>> {
        if self.errors.is_empty() {
            Ok(self.registry)
        } else {
            Err(self.errors)
        }
    }

    // ------------------------------------------------------------
    // Stage 1: registration
    // ------------------------------------------------------------

    fn register_all(&mut self, modules: &'a [ModuleDecl]) {
        for module in modules {
            for alias in &module.aliases {
                if self.names.alias_target(&alias.target).is_some() {
                    self.error(
                        TypeErrorKind::AliasToAlias {
                            name: alias.name.clone(),
                            target: alias.target.clone(),
                        },
                        alias.span,
                    );
                }
            }
            let mut seen_aliases = HashSet::new();
            for alias in &module.aliases {
                if !seen_aliases.insert(alias.name.as_str()) {
                    self.error(
                        TypeErrorKind::DuplicateAlias {
                            name: alias.name.clone(),
                        },
                        alias.span,
                    );
                }
            }
            for decl in &module.types {
                self.register_type(module, decl);
            }
        }
    }

    fn register_type(&mut self, module: &'a ModuleDecl, decl: &'a TypeDecl) {
        let full = fqn(&module.name, &decl.name);
        if self.registry.lookup_type_str(&full).is_some() {
            self.error(
                TypeErrorKind::DuplicateType { name: full },
                decl.span,
            );
            return;
        }
        let Some(params) = self.check_params(&decl.params) else {
            return;
        };

        let kind = match &decl.body {
            TypeDeclBody::Native => DeclKind::Native,
            TypeDeclBody::Boxed { .. } => DeclKind::Boxed,
            TypeDeclBody::Interface { .. } => DeclKind::Interface,
            TypeDeclBody::Enum { .. } => DeclKind::Enum,
        };

        let id = DefId::new(self.registry.len() as u32);
        let name = self.registry.interner.get_or_intern(&decl.name);
        let module_sym = self.registry.interner.get_or_intern(&module.name);
        let fq_sym = self.registry.interner.get_or_intern(&full);
        let param_defs = self.intern_params(&params);
        self.registry.alloc_type(
            fq_sym,
            TypeDef {
                name,
                module: module_sym,
                span: decl.span,
                kind,
                params: param_defs.clone(),
                param_owner: id,
                implements: Vec::new(),
                content: TypeDefContent::Pending,
                case_info: None,
            },
        );
        self.decls.insert(id, decl);
        self.module_names.insert(id, module.name.as_str());
        self.param_scopes.insert(
            id,
            params
                .iter()
                .enumerate()
                .map(|(i, p)| (p.name.clone(), self.registry.param_ref(id, i)))
                .collect(),
        );

        if let TypeDeclBody::Enum { cases } = &decl.body {
            self.register_cases(module, decl, id, &param_defs, cases);
        }
    }

    /// Enum cases become their own definitions. They inherit the enum's
    /// parameter list verbatim, with identity staying the enum's via
    /// `param_owner`; declaring explicit parameters on a case is an error.
    fn register_cases(
        &mut self,
        module: &'a ModuleDecl,
        decl: &'a TypeDecl,
        owner: DefId,
        params: &[ParamDef],
        cases: &[crate::ast::CaseDecl],
    ) {
        if cases.len() > MAX_ENUM_CASES {
            self.error(
                TypeErrorKind::LimitExceeded {
                    what: "enum cases",
                    count: cases.len(),
                    limit: MAX_ENUM_CASES,
                },
                decl.span,
            );
            return;
        }
        let mut seen = HashSet::new();
        let mut case_ids = Vec::with_capacity(cases.len());
        for (index, case) in cases.iter().enumerate() {
            if !case.params.is_empty() {
                self.error(
                    TypeErrorKind::ExplicitCaseParams {
                        case: case.name.clone(),
                    },
                    case.span,
                );
                continue;
            }
            if !seen.insert(case.name.as_str()) {
                self.error(
                    TypeErrorKind::DuplicateCase {
                        name: case.name.clone(),
                    },
                    case.span,
                );
                continue;
            }
            let full = format!("{}.{}.{}", module.name, decl.name, case.name);
            let id = DefId::new(self.registry.len() as u32);
            let name = self.registry.interner.get_or_intern(&case.name);
            let module_sym = self.registry.interner.get_or_intern(&module.name);
            let fq_sym = self.registry.interner.get_or_intern(&full);
            self.registry.alloc_type(
                fq_sym,
                TypeDef {
                    name,
                    module: module_sym,
                    span: case.span,
                    kind: DeclKind::Case,
                    params: params.to_vec(),
                    param_owner: owner,
                    implements: Vec::new(),
                    content: TypeDefContent::Native,
                    case_info: Some(CaseInfo {
                        owner,
                        index: index as u32,
                    }),
                },
            );
            self.module_names.insert(id, module.name.as_str());
            case_ids.push(id);
        }
        self.registry.type_def_mut(owner).content = TypeDefContent::Enum { cases: case_ids };
    }

    /// Validate a declaration's parameter list; `None` aborts the decl.
    fn check_params(&mut self, params: &'a [ParamDecl]) -> Option<Vec<&'a ParamDecl>> {
        if params.len() > MAX_TYPE_PARAMS {
            self.error(
                TypeErrorKind::LimitExceeded {
                    what: "type parameters",
                    count: params.len(),
                    limit: MAX_TYPE_PARAMS,
                },
                params[0].span,
            );
            return None;
        }
        let mut seen = HashSet::new();
        let mut ok = true;
        for param in params {
            if !seen.insert(param.name.as_str()) {
                self.error(
                    TypeErrorKind::DuplicateParam {
                        name: param.name.clone(),
                    },
                    param.span,
                );
                ok = false;
            }
        }
        ok.then(|| params.iter().collect())
    }

    fn intern_params(&mut self, params: &[&ParamDecl]) -> Vec<ParamDef> {
        params
            .iter()
            .map(|p| ParamDef {
                name: self.registry.interner.get_or_intern(&p.name),
                variance: declared_variance(p.variance),
                lower_bound: None,
                upper_bound: None,
                default: None,
                span: p.span,
            })
            .collect()
    }

    // ------------------------------------------------------------
    // Stage 2: deterministic ordering
    // ------------------------------------------------------------

    fn order_definitions(&mut self) {
        let mut order: Vec<DefId> = self
            .registry
            .item_ids()
            .filter(|&id| self.registry.is_type(id))
            .collect();
        order.sort_by_key(|&id| {
            let def = self.registry.type_def(id);
            (
                self.registry.name_str(def.module).to_string(),
                self.registry.name_str(def.name).to_string(),
                id,
            )
        });
        self.order = order;
    }

    // ------------------------------------------------------------
    // Stage 3: alias conflicts
    // ------------------------------------------------------------

    fn check_alias_conflicts(&mut self, modules: &[ModuleDecl]) {
        for module in modules {
            let alias_names: HashSet<&str> =
                module.aliases.iter().map(|a| a.name.as_str()).collect();
            for decl in &module.types {
                if alias_names.contains(decl.name.as_str()) {
                    self.error(
                        TypeErrorKind::NameCollision {
                            name: fqn(&module.name, &decl.name),
                        },
                        decl.span,
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------
    // Stage 4: implemented-interface fill
    // ------------------------------------------------------------

    fn fill_implements(&mut self) {
        for &id in &self.order.clone() {
            let Some(decl) = self.decls.get(&id).copied() else {
                continue;
            };
            if decl.implements.len() > MAX_IMPLEMENTS {
                self.error(
                    TypeErrorKind::LimitExceeded {
                        what: "implemented interfaces",
                        count: decl.implements.len(),
                        limit: MAX_IMPLEMENTS,
                    },
                    decl.span,
                );
                continue;
            }
            let mut tables = Vec::new();
            let mut seen = HashSet::new();
            for clause in &decl.implements {
                match self.resolve_implements(id, clause) {
                    Ok(interface) => {
                        if seen.insert(interface) {
                            tables.push(DispatchTable::new(interface));
                        } else {
                            let name = self.display_def(interface);
                            self.error(
                                TypeErrorKind::DuplicateType { name },
                                clause.span(),
                            );
                        }
                    }
                    Err(err) => self.errors.push(*err),
                }
            }
            self.registry.type_def_mut(id).implements = tables;
        }
    }

    fn resolve_implements(&mut self, implementor: DefId, clause: &TypeExpr) -> TypeResult<DefId> {
        let (name, args, span) = match clause {
            TypeExpr::Name { name, args, span } => (name, args, *span),
            other => {
                return TypeError::new(
                    TypeErrorKind::UnresolvedImplements {
                        name: "<structural type>".to_string(),
                    },
                    other.span(),
                )
                .into_err();
            }
        };
        if !args.is_empty() {
            // Correspondence is positional, the clause takes no arguments
            return TypeError::new(
                TypeErrorKind::WrongTypeArity {
                    name: name.clone(),
                    expected: 0,
                    found: args.len(),
                },
                span,
            )
            .into_err();
        }
        let module = self.module_names[&implementor];
        let full = self.names.resolve(module, name).ok_or_else(|| {
            Box::new(TypeError::new(
                TypeErrorKind::UnresolvedImplements { name: name.clone() },
                span,
            ))
        })?;
        let interface = self.registry.lookup_type_str(&full).ok_or_else(|| {
            Box::new(TypeError::new(
                TypeErrorKind::UnresolvedImplements { name: full.clone() },
                span,
            ))
        })?;
        if !self.registry.type_def(interface).is_interface() {
            return TypeError::new(TypeErrorKind::NotAnInterface { name: full }, span).into_err();
        }
        self.check_interface_params(implementor, interface, span)?;
        Ok(interface)
    }

    /// Parameter correspondence between an implementor and an interface is
    /// positional over the interface's (shorter or equal) parameter list.
    /// The interface's declared variance on a slot must be no stricter
    /// than the implementor's own.
    fn check_interface_params(
        &self,
        implementor: DefId,
        interface: DefId,
        span: Span,
    ) -> TypeResult<()> {
        let impl_def = self.registry.type_def(implementor);
        let iface_def = self.registry.type_def(interface);
        if iface_def.params.len() > impl_def.params.len() {
            return TypeError::new(
                TypeErrorKind::InterfaceParamMismatch {
                    ty: self.display_def(implementor),
                    interface: self.display_def(interface),
                },
                span,
            )
            .into_err();
        }
        for (impl_param, iface_param) in impl_def.params.iter().zip(&iface_def.params) {
            let compatible = iface_param.variance == impl_param.variance
                || iface_param.variance == Variance::Bivariant
                || impl_param.variance == Variance::Invariant;
            if !compatible {
                return TypeError::new(
                    TypeErrorKind::InvalidVariance {
                        ty: self.display_def(implementor),
                        param: self.registry.name_str(impl_param.name).to_string(),
                        declared: impl_param.variance.to_string(),
                        required: iface_param.variance.to_string(),
                    },
                    span,
                )
                .into_err();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------
    // Stage 5: parameter bounds and defaults
    // ------------------------------------------------------------

    /// Elaborated now rather than at registration so bounds and defaults
    /// may reference later-declared types. Results are written per
    /// definition in one batch, never observed half-done.
    fn elaborate_bounds_and_defaults(&mut self) {
        for &id in &self.order.clone() {
            let Some(decl) = self.decls.get(&id).copied() else {
                continue;
            };
            let mut updates: Vec<(usize, Option<Type>, Option<Type>, Option<Type>)> = Vec::new();
            let mut failed = false;
            for (index, param) in decl.params.iter().enumerate() {
                let lower = self.elaborate_slot(id, param.lower_bound.as_ref(), &mut failed);
                let upper = self.elaborate_slot(id, param.upper_bound.as_ref(), &mut failed);
                let default = self.elaborate_slot(id, param.default.as_ref(), &mut failed);
                updates.push((index, lower, upper, default));
            }
            if failed {
                continue;
            }
            let case_ids = self.case_ids(id);
            let def = self.registry.type_def_mut(id);
            for (index, lower, upper, default) in &updates {
                def.params[*index].lower_bound = lower.clone();
                def.params[*index].upper_bound = upper.clone();
                def.params[*index].default = default.clone();
            }
            // Case definitions carry a verbatim copy of the enum's list
            for case in case_ids {
                let case_def = self.registry.type_def_mut(case);
                for (index, lower, upper, default) in &updates {
                    case_def.params[*index].lower_bound = lower.clone();
                    case_def.params[*index].upper_bound = upper.clone();
                    case_def.params[*index].default = default.clone();
                }
            }
        }
    }

    fn elaborate_slot(
        &mut self,
        id: DefId,
        expr: Option<&TypeExpr>,
        failed: &mut bool,
    ) -> Option<Type> {
        let expr = expr?;
        match self.elaborate_for(id, expr) {
            Ok(ty) => Some(ty),
            Err(err) => {
                self.errors.push(*err);
                *failed = true;
                None
            }
        }
    }

    fn case_ids(&self, id: DefId) -> Vec<DefId> {
        match &self.registry.type_def(id).content {
            TypeDefContent::Enum { cases } => cases.clone(),
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------
    // Stage 6: content construction
    // ------------------------------------------------------------

    fn construct_contents(&mut self) {
        for &id in &self.order.clone() {
            let Some(decl) = self.decls.get(&id).copied() else {
                continue;
            };
            match &decl.body {
                TypeDeclBody::Native => {
                    self.registry.type_def_mut(id).content = TypeDefContent::Native;
                }
                TypeDeclBody::Enum { .. } => {
                    // Built structurally during registration
                }
                TypeDeclBody::Boxed { kind, weak, inner } => {
                    match self.elaborate_for(id, inner) {
                        Ok(inner) => {
                            self.registry.type_def_mut(id).content = TypeDefContent::Boxed {
                                kind: declared_box_kind(*kind),
                                weak: *weak,
                                inner,
                            };
                        }
                        Err(err) => self.errors.push(*err),
                    }
                }
                TypeDeclBody::Interface { methods } => {
                    if let Some(record) = self.build_method_record(id, decl, methods) {
                        self.registry.type_def_mut(id).content =
                            TypeDefContent::Interface { methods: record };
                    }
                }
            }
        }
    }

    fn build_method_record(
        &mut self,
        id: DefId,
        decl: &TypeDecl,
        methods: &[crate::ast::MethodDecl],
    ) -> Option<Type> {
        if methods.len() > MAX_RECORD_FIELDS {
            self.error(
                TypeErrorKind::LimitExceeded {
                    what: "interface methods",
                    count: methods.len(),
                    limit: MAX_RECORD_FIELDS,
                },
                decl.span,
            );
            return None;
        }
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(methods.len());
        let mut ok = true;
        for method in methods {
            if !seen.insert(method.name.as_str()) {
                self.error(
                    TypeErrorKind::DuplicateMethod {
                        name: method.name.clone(),
                    },
                    method.span,
                );
                ok = false;
                continue;
            }
            match self.elaborate_for(id, &method.signature) {
                Ok(signature) => {
                    if !matches!(signature.kind(), TypeKind::Lambda { .. }) {
                        self.error(
                            TypeErrorKind::InvalidInterfaceBody {
                                name: decl.name.clone(),
                            },
                            method.span,
                        );
                        ok = false;
                        continue;
                    }
                    let name = self.registry.interner.get_or_intern(&method.name);
                    fields.push((name, signature));
                }
                Err(err) => {
                    self.errors.push(*err);
                    ok = false;
                }
            }
        }
        ok.then(|| Type::record(fields))
    }

    // ------------------------------------------------------------
    // Stage 7a/7b: circularity (Kahn in-degree reduction)
    // ------------------------------------------------------------

    /// A strong box whose inner type is a reference to another strong box
    /// forms an edge; survivors of the in-degree reduction are exactly the
    /// cycle members, reported together in one error. Weak boxes are the
    /// sanctioned way to close a recursive shape, so they contribute no
    /// edge.
    fn check_circular_boxes(&mut self) {
        let edges = |registry: &Registry, id: DefId| -> Vec<DefId> {
            let def = registry.type_def(id);
            match &def.content {
                TypeDefContent::Boxed {
                    weak: false, inner, ..
                } => match inner.kind() {
                    TypeKind::Ref { def: target, .. }
                        if matches!(
                            registry.type_def(*target).content,
                            TypeDefContent::Boxed { weak: false, .. }
                        ) =>
                    {
                        vec![*target]
                    }
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            }
        };
        if let Some(cycle) = self.kahn_survivors(&edges) {
            let names: Vec<String> = cycle.iter().map(|&id| self.display_def(id)).collect();
            let span = self.registry.type_def(cycle[0]).span;
            self.error(TypeErrorKind::CircularBoxes { names }, span);
        }
    }

    fn check_circular_interfaces(&mut self) {
        let edges = |registry: &Registry, id: DefId| -> Vec<DefId> {
            let def = registry.type_def(id);
            if !def.is_interface() {
                return Vec::new();
            }
            def.implements.iter().map(|t| t.interface).collect()
        };
        if let Some(cycle) = self.kahn_survivors(&edges) {
            let names: Vec<String> = cycle.iter().map(|&id| self.display_def(id)).collect();
            let span = self.registry.type_def(cycle[0]).span;
            self.error(TypeErrorKind::CircularInterfaces { names }, span);
        }
    }

    /// In-degree reduction over the given edge function. Returns the
    /// surviving definitions (cycle members) in deterministic order, or
    /// `None` when the graph is acyclic.
    fn kahn_survivors(
        &self,
        edges: &dyn Fn(&Registry, DefId) -> Vec<DefId>,
    ) -> Option<Vec<DefId>> {
        let mut out: HashMap<DefId, Vec<DefId>> = HashMap::new();
        let mut in_degree: HashMap<DefId, usize> = HashMap::new();
        for &id in &self.order {
            in_degree.entry(id).or_insert(0);
            for target in edges(&self.registry, id) {
                out.entry(id).or_default().push(target);
                *in_degree.entry(target).or_insert(0) += 1;
            }
        }
        let mut queue: Vec<DefId> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        while let Some(id) = queue.pop() {
            for &target in out.get(&id).into_iter().flatten() {
                let d = in_degree.get_mut(&target).expect("target was seeded");
                *d -= 1;
                if *d == 0 {
                    queue.push(target);
                }
            }
            in_degree.remove(&id);
        }
        if in_degree.is_empty() {
            return None;
        }
        let mut survivors: Vec<DefId> = self
            .order
            .iter()
            .copied()
            .filter(|id| in_degree.contains_key(id))
            .collect();
        survivors.dedup();
        Some(survivors)
    }

    // ------------------------------------------------------------
    // Stage 7c: declared-variance validation
    // ------------------------------------------------------------

    fn check_declared_variance(&mut self) {
        for &id in &self.order.clone() {
            let def = self.registry.type_def(id);
            let content_ty = match &def.content {
                TypeDefContent::Boxed { inner, .. } => inner.clone(),
                TypeDefContent::Interface { methods } => methods.clone(),
                _ => continue,
            };
            let param_count = def.params.len();
            let deduced = variance::deduce(&self.registry, &content_ty, id, param_count);
            for (index, &required) in deduced.iter().enumerate() {
                let declared = self.registry.type_def(id).params[index].variance;
                if !declared.admits(required) {
                    let def = self.registry.type_def(id);
                    let param = self.registry.name_str(def.params[index].name).to_string();
                    let kind = TypeErrorKind::InvalidVariance {
                        ty: self.display_def(id),
                        param,
                        declared: declared.to_string(),
                        required: required.to_string(),
                    };
                    let span = self.registry.type_def(id).params[index].span;
                    self.error(kind, span);
                }
            }
        }
    }

    // ------------------------------------------------------------
    // Function registration
    // ------------------------------------------------------------

    fn register_functions(&mut self, modules: &'a [ModuleDecl]) {
        for module in modules {
            for decl in &module.functions {
                self.register_function(module, decl);
            }
        }
    }

    fn register_function(&mut self, module: &'a ModuleDecl, decl: &'a FnDecl) {
        let Some(params) = self.check_params(&decl.params) else {
            return;
        };
        // The id is fixed before elaboration so the signature can mention
        // the function's own parameters.
        let id = DefId::new(self.registry.len() as u32);
        let scope: HashMap<String, super::ty::ParamRef> = params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), super::ty::ParamRef::new(id, i as u32)))
            .collect();

        let mut failed = false;
        let mut elaborate = |builder: &mut Self, expr: &TypeExpr, failed: &mut bool| match builder
            .elaborate(&module.name, &scope, expr)
        {
            Ok(ty) => ty,
            Err(err) => {
                builder.errors.push(*err);
                *failed = true;
                Type::unknown()
            }
        };
        let param_defs: Vec<ParamDef> = params
            .iter()
            .map(|p| {
                let lower = p
                    .lower_bound
                    .as_ref()
                    .map(|e| elaborate(self, e, &mut failed));
                let upper = p
                    .upper_bound
                    .as_ref()
                    .map(|e| elaborate(self, e, &mut failed));
                let default = p.default.as_ref().map(|e| elaborate(self, e, &mut failed));
                ParamDef {
                    name: self.registry.interner.get_or_intern(&p.name),
                    variance: declared_variance(p.variance),
                    lower_bound: lower,
                    upper_bound: upper,
                    default,
                    span: p.span,
                }
            })
            .collect();
        let implicits: Vec<(super::ty::Symbol, Type)> = decl
            .implicits
            .iter()
            .map(|(name, expr)| {
                let ty = elaborate(self, expr, &mut failed);
                (self.registry.interner.get_or_intern(name), ty)
            })
            .collect();
        let input = elaborate(self, &decl.input, &mut failed);
        let output = elaborate(self, &decl.output, &mut failed);
        if failed {
            return;
        }
        let name = self.registry.interner.get_or_intern(&decl.name);
        let module_sym = self.registry.interner.get_or_intern(&module.name);
        let allocated = self.registry.alloc_fn(FnDef {
            name,
            module: module_sym,
            span: decl.span,
            params: param_defs,
            implicits,
            input,
            output,
        });
        debug_assert_eq!(allocated, id, "function id fixed before elaboration");
    }

    // ------------------------------------------------------------
    // Type expression elaboration
    // ------------------------------------------------------------

    fn elaborate_for(&mut self, id: DefId, expr: &TypeExpr) -> TypeResult<Type> {
        let module = self.module_names[&id].to_string();
        let scope = self.param_scopes.get(&id).cloned().unwrap_or_default();
        self.elaborate(&module, &scope, expr)
    }

    /// Turn a syntactic type expression into a semantic type.
    ///
    /// Bare parameter names win over type names. Missing trailing type
    /// arguments are filled from the definition's parameter defaults,
    /// with the definition's earlier parameters substituted by the
    /// arguments already present.
    fn elaborate(
        &mut self,
        module: &str,
        params: &HashMap<String, super::ty::ParamRef>,
        expr: &TypeExpr,
    ) -> TypeResult<Type> {
        match expr {
            TypeExpr::Unit(_) => Ok(Type::unit()),
            TypeExpr::Top(_) => Ok(Type::top()),
            TypeExpr::Bottom(_) => Ok(Type::bottom()),
            TypeExpr::Name { name, args, span } => {
                if let Some(&p) = params.get(name) {
                    if !args.is_empty() {
                        return TypeError::new(
                            TypeErrorKind::WrongTypeArity {
                                name: name.clone(),
                                expected: 0,
                                found: args.len(),
                            },
                            *span,
                        )
                        .into_err();
                    }
                    return Ok(Type::param(p));
                }
                let full = self.names.resolve(module, name).ok_or_else(|| {
                    Box::new(TypeError::new(
                        TypeErrorKind::UnknownType { name: name.clone() },
                        *span,
                    ))
                })?;
                let def = self.registry.lookup_type_str(&full).ok_or_else(|| {
                    Box::new(TypeError::new(
                        TypeErrorKind::UnknownType { name: full.clone() },
                        *span,
                    ))
                })?;
                let expected = self.registry.type_def(def).params.len();
                if args.len() > expected {
                    return TypeError::new(
                        TypeErrorKind::WrongTypeArity {
                            name: full,
                            expected,
                            found: args.len(),
                        },
                        *span,
                    )
                    .into_err();
                }
                let mut elaborated = Vec::with_capacity(expected);
                for arg in args {
                    elaborated.push(self.elaborate(module, params, arg)?);
                }
                let owner = self.registry.type_def(def).param_owner;
                for index in args.len()..expected {
                    let default = self.registry.type_def(def).params[index].default.clone();
                    match default {
                        Some(default) => {
                            elaborated.push(default.substitute_params(owner, &elaborated));
                        }
                        None => {
                            return TypeError::new(
                                TypeErrorKind::WrongTypeArity {
                                    name: full,
                                    expected,
                                    found: args.len(),
                                },
                                *span,
                            )
                            .into_err();
                        }
                    }
                }
                Ok(Type::reference(def, elaborated))
            }
            TypeExpr::Tuple { elements, span } => {
                if elements.len() > MAX_TUPLE_ELEMS {
                    return TypeError::new(
                        TypeErrorKind::LimitExceeded {
                            what: "tuple elements",
                            count: elements.len(),
                            limit: MAX_TUPLE_ELEMS,
                        },
                        *span,
                    )
                    .into_err();
                }
                let elements = elements
                    .iter()
                    .map(|e| self.elaborate(module, params, e))
                    .collect::<TypeResult<Vec<_>>>()?;
                Ok(Type::tuple(elements))
            }
            TypeExpr::Record { fields, span } => {
                if fields.len() > MAX_RECORD_FIELDS {
                    return TypeError::new(
                        TypeErrorKind::LimitExceeded {
                            what: "record fields",
                            count: fields.len(),
                            limit: MAX_RECORD_FIELDS,
                        },
                        *span,
                    )
                    .into_err();
                }
                let mut seen = HashSet::new();
                let mut elaborated = Vec::with_capacity(fields.len());
                for (field_name, field_expr) in fields {
                    if !seen.insert(field_name.as_str()) {
                        return TypeError::new(
                            TypeErrorKind::DuplicateField {
                                name: field_name.clone(),
                            },
                            *span,
                        )
                        .into_err();
                    }
                    let ty = self.elaborate(module, params, field_expr)?;
                    let sym = self.registry.interner.get_or_intern(field_name);
                    elaborated.push((sym, ty));
                }
                Ok(Type::record(elaborated))
            }
            TypeExpr::Lambda { input, output, .. } => {
                let input = self.elaborate(module, params, input)?;
                let output = self.elaborate(module, params, output)?;
                Ok(Type::lambda(input, output))
            }
        }
    }

    fn display_def(&self, id: DefId) -> String {
        let def = self.registry.type_def(id);
        fqn(
            self.registry.name_str(def.module),
            self.registry.name_str(def.name),
        )
    }
}

fn declared_variance(annot: VarianceAnnot) -> Variance {
    match annot {
        VarianceAnnot::Invariant => Variance::Invariant,
        VarianceAnnot::Covariant => Variance::Covariant,
        VarianceAnnot::Contravariant => Variance::Contravariant,
        VarianceAnnot::Bivariant => Variance::Bivariant,
    }
}

fn declared_box_kind(kind: crate::ast::BoxKindDecl) -> BoxKind {
    match kind {
        crate::ast::BoxKindDecl::Isomorphic => BoxKind::Isomorphic,
        crate::ast::BoxKindDecl::Protected => BoxKind::Protected,
        crate::ast::BoxKindDecl::Opaque => BoxKind::Opaque,
    }
}
