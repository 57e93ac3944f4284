//! Semantic type representation for Sable.
//!
//! This module defines the checker's type graph. Unlike the syntactic
//! [`TypeExpr`](crate::ast::TypeExpr), these types are fully resolved:
//! names have become [`DefId`]s into the registry arena and generic
//! parameters have become identity-carrying [`ParamRef`]s.
//!
//! # Type Structure
//!
//! - **Sentinels**: `Unknown`, `Unit`, `Top`, `Bottom`
//! - **Parameters**: references to a declared generic parameter slot
//! - **Structural types**: tuples, records, lambdas
//! - **Nominal types**: uses of a named definition with arguments
//!
//! Types are immutable after construction and shared via `Arc`, so cloning
//! is cheap and the inference state can fork freely.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::span::Span;

use super::variance::Variance;

/// A symbol interned by the registry's interner.
pub type Symbol = DefaultSymbol;

/// A globally unique identifier for a definition (type or function).
///
/// DefIds are assigned during registration and index the registry's item
/// arena. Using ids instead of references lets a definition's content
/// mention its own `Ref` without ownership cycles.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId {
    /// Arena index for this definition.
    pub index: u32,
}

impl DefId {
    /// Create a new DefId with the given index.
    pub const fn new(index: u32) -> Self {
        Self { index }
    }

    /// The index of this definition.
    pub const fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Debug for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefId({})", self.index)
    }
}

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def{}", self.index)
    }
}

/// The identity of one generic parameter slot.
///
/// Two `Param` types denote the same parameter iff their `ParamRef`s are
/// equal. Nothing in the checker ever compares parameters by name; the
/// (owner, index) pair is the unit of comparison throughout inference and
/// variance deduction. For enum case definitions `owner` is the enum's
/// DefId, so a case shares its enum's parameter identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamRef {
    /// The definition whose parameter list owns this slot.
    pub owner: DefId,
    /// Position in that parameter list.
    pub index: u32,
}

impl ParamRef {
    pub const fn new(owner: DefId, index: u32) -> Self {
        Self { owner, index }
    }
}

/// A semantic type.
///
/// The `Arc` wrapper makes clones cheap; structural equality is the
/// explicit [`Type::equal`] operation, not `==`, because `Unknown` is not
/// equal to anything including itself.
#[derive(Debug, Clone)]
pub struct Type {
    kind: Arc<TypeKind>,
}

/// The kind of a type.
#[derive(Debug)]
pub enum TypeKind {
    /// Placeholder for an unresolved expression. Assigns to and from
    /// nothing, not even itself.
    Unknown,
    /// The unit type.
    Unit,
    /// The top type: accepts any value under subtyping.
    Top,
    /// The bottom type: assignable to anything under subtyping.
    Bottom,
    /// A reference to a generic parameter slot, by identity.
    Param(ParamRef),
    /// A use of a named definition with type arguments.
    Ref { def: DefId, args: Vec<Type> },
    /// A tuple type.
    Tuple(Vec<Type>),
    /// A record type with named fields in declared order.
    Record(RecordType),
    /// A lambda type `&(input)=>(output)`.
    Lambda { input: Type, output: Type },
}

impl Type {
    fn new(kind: TypeKind) -> Self {
        Self {
            kind: Arc::new(kind),
        }
    }

    /// Get the kind of this type.
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    // Constructors

    /// The unresolved placeholder type.
    pub fn unknown() -> Self {
        Self::new(TypeKind::Unknown)
    }

    /// The unit type.
    pub fn unit() -> Self {
        Self::new(TypeKind::Unit)
    }

    /// The top type.
    pub fn top() -> Self {
        Self::new(TypeKind::Top)
    }

    /// The bottom type.
    pub fn bottom() -> Self {
        Self::new(TypeKind::Bottom)
    }

    /// A generic parameter reference.
    pub fn param(p: ParamRef) -> Self {
        Self::new(TypeKind::Param(p))
    }

    /// A use of a named definition.
    pub fn reference(def: DefId, args: Vec<Type>) -> Self {
        Self::new(TypeKind::Ref { def, args })
    }

    /// A tuple type.
    pub fn tuple(elements: Vec<Type>) -> Self {
        Self::new(TypeKind::Tuple(elements))
    }

    /// A record type. Field order is declared order.
    pub fn record(fields: Vec<(Symbol, Type)>) -> Self {
        Self::new(TypeKind::Record(RecordType::new(fields)))
    }

    /// A lambda type.
    pub fn lambda(input: Type, output: Type) -> Self {
        Self::new(TypeKind::Lambda { input, output })
    }

    /// Check if this type is `Unknown`.
    pub fn is_unknown(&self) -> bool {
        matches!(self.kind(), TypeKind::Unknown)
    }

    /// Structural equality.
    ///
    /// Always false if either side is `Unknown`. `Ref` types require the
    /// same definition and pairwise-equal arguments; an argument-count
    /// mismatch against the same definition can only come from a registry
    /// bug, since arity is enforced at construction, and panics.
    pub fn equal(&self, other: &Type) -> bool {
        if self.is_unknown() || other.is_unknown() {
            return false;
        }
        if Arc::ptr_eq(&self.kind, &other.kind) {
            return true;
        }
        match (self.kind(), other.kind()) {
            (TypeKind::Unit, TypeKind::Unit)
            | (TypeKind::Top, TypeKind::Top)
            | (TypeKind::Bottom, TypeKind::Bottom) => true,
            (TypeKind::Param(a), TypeKind::Param(b)) => a == b,
            (
                TypeKind::Ref { def: d1, args: a1 },
                TypeKind::Ref { def: d2, args: a2 },
            ) => {
                if d1 != d2 {
                    return false;
                }
                assert_eq!(
                    a1.len(),
                    a2.len(),
                    "argument count mismatch for {d1:?}: arity is enforced at construction"
                );
                a1.iter().zip(a2).all(|(x, y)| x.equal(y))
            }
            (TypeKind::Tuple(a), TypeKind::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equal(y))
            }
            (TypeKind::Record(a), TypeKind::Record(b)) => {
                a.fields().len() == b.fields().len()
                    && a.fields()
                        .iter()
                        .zip(b.fields())
                        .all(|(x, y)| x.name == y.name && x.ty.equal(&y.ty))
            }
            (
                TypeKind::Lambda {
                    input: i1,
                    output: o1,
                },
                TypeKind::Lambda {
                    input: i2,
                    output: o2,
                },
            ) => i1.equal(i2) && o1.equal(o2),
            _ => false,
        }
    }

    /// Structural rewrite.
    ///
    /// Calls `f` at every reachable node; where it returns `Some` the
    /// result replaces that node and the walk does not descend further,
    /// otherwise the node is rebuilt from its mapped children. Used for
    /// parameter substitution, bound application, and inference-result
    /// application.
    pub fn map(&self, f: &mut dyn FnMut(&Type) -> Option<Type>) -> Type {
        if let Some(replaced) = f(self) {
            return replaced;
        }
        match self.kind() {
            TypeKind::Ref { def, args } => Type::reference(
                *def,
                args.iter().map(|a| a.map(f)).collect(),
            ),
            TypeKind::Tuple(elements) => {
                Type::tuple(elements.iter().map(|e| e.map(f)).collect())
            }
            TypeKind::Record(record) => Type::record(
                record
                    .fields()
                    .iter()
                    .map(|field| (field.name, field.ty.map(f)))
                    .collect(),
            ),
            TypeKind::Lambda { input, output } => {
                Type::lambda(input.map(f), output.map(f))
            }
            _ => self.clone(),
        }
    }

    /// Whether any reachable `Param` node satisfies the predicate.
    pub fn mentions_param(&self, pred: &mut dyn FnMut(ParamRef) -> bool) -> bool {
        match self.kind() {
            TypeKind::Param(p) => pred(*p),
            TypeKind::Ref { args, .. } => args.iter().any(|a| a.mentions_param(pred)),
            TypeKind::Tuple(elements) => {
                elements.iter().any(|e| e.mentions_param(pred))
            }
            TypeKind::Record(record) => record
                .fields()
                .iter()
                .any(|field| field.ty.mentions_param(pred)),
            TypeKind::Lambda { input, output } => {
                input.mentions_param(pred) || output.mentions_param(pred)
            }
            _ => false,
        }
    }

    /// Substitute a definition's parameters with concrete arguments.
    ///
    /// Replaces every `Param` owned by `owner` with `args[index]`.
    pub fn substitute_params(&self, owner: DefId, args: &[Type]) -> Type {
        self.map(&mut |ty| match ty.kind() {
            TypeKind::Param(p) if p.owner == owner => {
                Some(args[p.index as usize].clone())
            }
            _ => None,
        })
    }
}

/// A record type: fields in declared order plus a by-name index.
#[derive(Debug)]
pub struct RecordType {
    fields: Vec<RecordField>,
    index: HashMap<Symbol, usize>,
}

/// One field of a record type.
#[derive(Debug, Clone)]
pub struct RecordField {
    pub name: Symbol,
    pub ty: Type,
}

impl RecordType {
    /// Build a record from fields in declared order. Duplicate field names
    /// are rejected during elaboration, before this runs.
    pub fn new(fields: Vec<(Symbol, Type)>) -> Self {
        let mut index = HashMap::with_capacity(fields.len());
        let fields: Vec<RecordField> = fields
            .into_iter()
            .map(|(name, ty)| RecordField { name, ty })
            .collect();
        for (i, field) in fields.iter().enumerate() {
            let previous = index.insert(field.name, i);
            debug_assert!(previous.is_none(), "duplicate record field survived elaboration");
        }
        Self { fields, index }
    }

    /// Fields in declared order.
    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: Symbol) -> Option<(usize, &Type)> {
        let i = *self.index.get(&name)?;
        Some((i, &self.fields[i].ty))
    }
}

/// A declared generic parameter.
///
/// Owned by exactly one definition's parameter list; everything else
/// refers to it through [`ParamRef`]. Bounds and the default are written
/// once, in the batched elaboration stage, and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: Symbol,
    pub variance: Variance,
    pub lower_bound: Option<Type>,
    pub upper_bound: Option<Type>,
    pub default: Option<Type>,
    pub span: Span,
}

/// What kind of declaration a type definition came from.
///
/// Known from registration on, before content construction runs, so the
/// interface-fill stage can validate implements-references early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Native,
    Boxed,
    Interface,
    Enum,
    /// An enum case, registered as its own definition.
    Case,
}

/// Visibility kind of a boxed definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    /// Unboxes from any module.
    Isomorphic,
    /// Unboxes only within the defining module.
    Protected,
    /// Like protected, and additionally opaque to shape inspection.
    Opaque,
}

impl BoxKind {
    /// Whether unboxing is restricted to the defining module.
    pub fn is_module_private(self) -> bool {
        matches!(self, BoxKind::Protected | BoxKind::Opaque)
    }
}

/// Back-reference from an enum case definition to its enum.
#[derive(Debug, Clone, Copy)]
pub struct CaseInfo {
    /// The enum that owns this case.
    pub owner: DefId,
    /// Ordinal position among the enum's cases.
    pub index: u32,
}

/// The content of a type definition.
#[derive(Debug)]
pub enum TypeDefContent {
    /// Not yet constructed. Observed only between registration and the
    /// content-construction stage; reading it afterwards is a registry bug.
    Pending,
    /// An opaque primitive.
    Native,
    /// A newtype wrapper.
    Boxed {
        kind: BoxKind,
        weak: bool,
        inner: Type,
    },
    /// A method signature set: a record of method name to signature.
    Interface { methods: Type },
    /// A closed set of cases, each its own definition.
    Enum { cases: Vec<DefId> },
}

/// The resolved binding from one concrete type's implementation of one
/// interface to the functions realizing its methods.
#[derive(Debug)]
pub struct DispatchTable {
    /// The implemented interface.
    pub interface: DefId,
    /// Method name to realizing function, filled by dispatch resolution.
    pub methods: HashMap<Symbol, DefId>,
}

impl DispatchTable {
    pub fn new(interface: DefId) -> Self {
        Self {
            interface,
            methods: HashMap::new(),
        }
    }
}

/// A named, possibly-generic type definition.
///
/// Created exactly once during registration; all references are `DefId`s.
#[derive(Debug)]
pub struct TypeDef {
    /// Item name (without module prefix).
    pub name: Symbol,
    /// Defining module.
    pub module: Symbol,
    pub span: Span,
    pub kind: DeclKind,
    pub params: Vec<ParamDef>,
    /// Whose identity the parameter slots carry: self, or the enum for a
    /// case definition (cases inherit the enum's parameters verbatim).
    pub param_owner: DefId,
    /// Implemented interfaces. For an interface definition these are its
    /// included interfaces.
    pub implements: Vec<DispatchTable>,
    pub content: TypeDefContent,
    pub case_info: Option<CaseInfo>,
}

impl TypeDef {
    /// Whether this definition is an interface.
    pub fn is_interface(&self) -> bool {
        self.kind == DeclKind::Interface
    }

    /// The boxed content, if this is a boxed definition.
    pub fn as_boxed(&self) -> Option<(BoxKind, bool, &Type)> {
        match &self.content {
            TypeDefContent::Boxed { kind, weak, inner } => Some((*kind, *weak, inner)),
            _ => None,
        }
    }
}

/// A function declaration registered for dispatch resolution.
#[derive(Debug)]
pub struct FnDef {
    pub name: Symbol,
    pub module: Symbol,
    pub span: Span,
    /// The function's own generic parameters.
    pub params: Vec<ParamDef>,
    /// Implicit-context requirements. A function with any is not eligible
    /// as a dispatch candidate.
    pub implicits: Vec<(Symbol, Type)>,
    pub input: Type,
    pub output: Type,
}

/// An item in the registry arena.
#[derive(Debug)]
pub enum Item {
    Type(TypeDef),
    Fn(FnDef),
}

/// The global definition registry.
///
/// Write-once during the registration pipeline, read-only afterwards.
/// Shared by the assignment algorithm, the variance engine, unboxing, and
/// the dispatch resolver.
#[derive(Debug)]
pub struct Registry {
    items: Vec<Item>,
    /// Fully-qualified name to type definition.
    types_by_name: HashMap<Symbol, DefId>,
    /// Bare function name to every function registered under it.
    fns_by_name: HashMap<Symbol, Vec<DefId>>,
    /// The interner backing every Symbol in the graph.
    pub interner: DefaultStringInterner,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            types_by_name: HashMap::new(),
            fns_by_name: HashMap::new(),
            interner: DefaultStringInterner::default(),
        }
    }

    /// Number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Allocate a type definition, indexing it by fully-qualified name.
    pub(crate) fn alloc_type(&mut self, fq_name: Symbol, def: TypeDef) -> DefId {
        let id = DefId::new(self.items.len() as u32);
        self.items.push(Item::Type(def));
        self.types_by_name.insert(fq_name, id);
        id
    }

    /// Allocate a function definition, indexing it by bare name.
    pub(crate) fn alloc_fn(&mut self, def: FnDef) -> DefId {
        let id = DefId::new(self.items.len() as u32);
        self.fns_by_name.entry(def.name).or_default().push(id);
        self.items.push(Item::Fn(def));
        id
    }

    /// All item ids in allocation order.
    pub fn item_ids(&self) -> impl Iterator<Item = DefId> + '_ {
        (0..self.items.len() as u32).map(DefId::new)
    }

    /// The type definition behind `id`. Panics if `id` names a function;
    /// that can only happen from a registry bug.
    pub fn type_def(&self, id: DefId) -> &TypeDef {
        match &self.items[id.index as usize] {
            Item::Type(def) => def,
            Item::Fn(_) => panic!("{id:?} is a function, not a type definition"),
        }
    }

    pub(crate) fn type_def_mut(&mut self, id: DefId) -> &mut TypeDef {
        match &mut self.items[id.index as usize] {
            Item::Type(def) => def,
            Item::Fn(_) => panic!("{id:?} is a function, not a type definition"),
        }
    }

    /// The function definition behind `id`. Panics on a type id.
    pub fn fn_def(&self, id: DefId) -> &FnDef {
        match &self.items[id.index as usize] {
            Item::Fn(def) => def,
            Item::Type(_) => panic!("{id:?} is a type definition, not a function"),
        }
    }

    /// Whether `id` names a type definition.
    pub fn is_type(&self, id: DefId) -> bool {
        matches!(self.items[id.index as usize], Item::Type(_))
    }

    /// Look up a type definition by fully-qualified name.
    pub fn lookup_type(&self, fq_name: Symbol) -> Option<DefId> {
        self.types_by_name.get(&fq_name).copied()
    }

    /// Look up a type definition by fully-qualified name string.
    pub fn lookup_type_str(&self, fq_name: &str) -> Option<DefId> {
        let sym = self.interner.get(fq_name)?;
        self.lookup_type(sym)
    }

    /// Every function registered under `name`.
    pub fn functions_named(&self, name: Symbol) -> &[DefId] {
        self.fns_by_name.get(&name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The identity of a definition's parameter slot. For enum cases this
    /// is the enum's slot, preserving inherited identity.
    pub fn param_ref(&self, def: DefId, index: usize) -> ParamRef {
        let owner = match &self.items[def.index as usize] {
            Item::Type(t) => t.param_owner,
            Item::Fn(_) => def,
        };
        ParamRef::new(owner, index as u32)
    }

    /// The declaration of a parameter slot.
    pub fn param_def(&self, p: ParamRef) -> &ParamDef {
        let params = match &self.items[p.owner.index as usize] {
            Item::Type(t) => &t.params,
            Item::Fn(f) => &f.params,
        };
        &params[p.index as usize]
    }

    /// The parameters of a definition paired with their identities.
    pub fn params_of(&self, def: DefId) -> Vec<(ParamRef, &ParamDef)> {
        let params = match &self.items[def.index as usize] {
            Item::Type(t) => &t.params,
            Item::Fn(f) => &f.params,
        };
        params
            .iter()
            .enumerate()
            .map(|(i, p)| (self.param_ref(def, i), p))
            .collect()
    }

    /// A definition's reference to itself with its own parameters as
    /// arguments: `Def[P0, P1, ...]`.
    pub fn self_type(&self, def: DefId) -> Type {
        let args = (0..self.type_def(def).params.len())
            .map(|i| Type::param(self.param_ref(def, i)))
            .collect();
        Type::reference(def, args)
    }

    /// Resolve a symbol interned by this registry.
    pub fn name_str(&self, sym: Symbol) -> &str {
        self.interner
            .resolve(sym)
            .expect("symbol was interned by this registry")
    }

    /// Render a type with real names for diagnostics.
    pub fn display_type(&self, ty: &Type) -> String {
        match ty.kind() {
            TypeKind::Unknown => "{unknown}".to_string(),
            TypeKind::Unit => "Unit".to_string(),
            TypeKind::Top => "Top".to_string(),
            TypeKind::Bottom => "Bottom".to_string(),
            TypeKind::Param(p) => self.name_str(self.param_def(*p).name).to_string(),
            TypeKind::Ref { def, args } => {
                let name = self.name_str(self.type_def(*def).name);
                if args.is_empty() {
                    name.to_string()
                } else {
                    let args: Vec<String> =
                        args.iter().map(|a| self.display_type(a)).collect();
                    format!("{}[{}]", name, args.join(", "))
                }
            }
            TypeKind::Tuple(elements) => {
                let elements: Vec<String> =
                    elements.iter().map(|e| self.display_type(e)).collect();
                format!("({})", elements.join(", "))
            }
            TypeKind::Record(record) => {
                let fields: Vec<String> = record
                    .fields()
                    .iter()
                    .map(|f| {
                        format!("{}: {}", self.name_str(f.name), self.display_type(&f.ty))
                    })
                    .collect();
                format!("{{{}}}", fields.join(", "))
            }
            TypeKind::Lambda { input, output } => format!(
                "&({})=>({})",
                self.display_type(input),
                self.display_type(output)
            ),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
