//! Declaration trees consumed from the syntax layer.
//!
//! The checker does not lex or parse. The syntax layer hands it
//! already-built declaration nodes: modules containing type declarations,
//! function declarations, and alias declarations, with every node carrying
//! a [`Span`]. These trees are read-only inputs; the checker never rewrites
//! them, it elaborates them into the semantic [`Type`](crate::typeck::Type)
//! graph.

use crate::span::Span;

/// A module as delivered by the syntax layer.
#[derive(Debug, Clone)]
pub struct ModuleDecl {
    /// Fully-qualified module name.
    pub name: String,
    /// Names of directly imported modules.
    pub imports: Vec<String>,
    /// Module-level alias declarations.
    pub aliases: Vec<AliasDecl>,
    /// Type declarations in source order.
    pub types: Vec<TypeDecl>,
    /// Function declarations in source order.
    pub functions: Vec<FnDecl>,
}

/// An alias declaration: a module-level shorthand for another name.
///
/// The module-resolution layer guarantees an alias never points to
/// another alias.
#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub name: String,
    /// Fully-qualified target name.
    pub target: String,
    pub span: Span,
}

/// A type declaration.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub span: Span,
    /// Generic parameters with variance markers, bounds, and defaults.
    pub params: Vec<ParamDecl>,
    /// Interfaces this type declares it implements. For an interface
    /// declaration this is the list of included interfaces.
    pub implements: Vec<TypeExpr>,
    pub body: TypeDeclBody,
}

/// The body of a type declaration.
#[derive(Debug, Clone)]
pub enum TypeDeclBody {
    /// An opaque primitive with no structure.
    Native,
    /// A newtype wrapper around an inner type.
    Boxed {
        kind: BoxKindDecl,
        weak: bool,
        inner: TypeExpr,
    },
    /// A method signature set.
    Interface { methods: Vec<MethodDecl> },
    /// A closed set of cases.
    Enum { cases: Vec<CaseDecl> },
}

/// Visibility kind of a boxed declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKindDecl {
    /// Unboxes from any module.
    Isomorphic,
    /// Unboxes only within the defining module.
    Protected,
    /// Like protected, and additionally opaque to pattern matching.
    Opaque,
}

/// One required method in an interface declaration.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    /// The method signature, normally a lambda type.
    pub signature: TypeExpr,
    pub span: Span,
}

/// One case of an enum declaration.
///
/// Cases may not declare their own parameters; they inherit the enum's.
#[derive(Debug, Clone)]
pub struct CaseDecl {
    pub name: String,
    pub span: Span,
    /// Explicit parameters are a hard error; carried so the checker can
    /// report them at the right span.
    pub params: Vec<ParamDecl>,
}

/// A generic parameter declaration.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub variance: VarianceAnnot,
    pub lower_bound: Option<TypeExpr>,
    pub upper_bound: Option<TypeExpr>,
    pub default: Option<TypeExpr>,
    pub span: Span,
}

impl ParamDecl {
    /// A plain invariant parameter with no bounds or default.
    pub fn plain(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            variance: VarianceAnnot::Invariant,
            lower_bound: None,
            upper_bound: None,
            default: None,
            span,
        }
    }
}

/// Declared variance marker on a generic parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarianceAnnot {
    Invariant,
    Covariant,
    Contravariant,
    Bivariant,
}

/// A function declaration.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub span: Span,
    /// Generic parameters of the function itself.
    pub params: Vec<ParamDecl>,
    /// Implicit-context requirements (name, type). A function with a
    /// non-empty implicit record is not eligible for interface dispatch.
    pub implicits: Vec<(String, TypeExpr)>,
    /// Input type (a single type; multi-argument functions take a tuple).
    pub input: TypeExpr,
    /// Output type.
    pub output: TypeExpr,
}

/// A type expression as written in source.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// The unit type.
    Unit(Span),
    /// The top type, accepting any value.
    Top(Span),
    /// The bottom type, assignable to anything.
    Bottom(Span),
    /// A use of a named definition or generic parameter, possibly with
    /// type arguments.
    Name {
        name: String,
        args: Vec<TypeExpr>,
        span: Span,
    },
    /// A tuple type.
    Tuple { elements: Vec<TypeExpr>, span: Span },
    /// A record type with named fields in declared order.
    Record {
        fields: Vec<(String, TypeExpr)>,
        span: Span,
    },
    /// A lambda type `&(input)=>(output)`.
    Lambda {
        input: Box<TypeExpr>,
        output: Box<TypeExpr>,
        span: Span,
    },
}

impl TypeExpr {
    /// The source span of this expression.
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Unit(span)
            | TypeExpr::Top(span)
            | TypeExpr::Bottom(span)
            | TypeExpr::Name { span, .. }
            | TypeExpr::Tuple { span, .. }
            | TypeExpr::Record { span, .. }
            | TypeExpr::Lambda { span, .. } => *span,
        }
    }

    /// A bare name with no arguments.
    pub fn name(name: impl Into<String>, span: Span) -> Self {
        TypeExpr::Name {
            name: name.into(),
            args: Vec::new(),
            span,
        }
    }

    /// A lambda `&(input)=>(output)`.
    pub fn lambda(input: TypeExpr, output: TypeExpr, span: Span) -> Self {
        TypeExpr::Lambda {
            input: Box::new(input),
            output: Box::new(output),
            span,
        }
    }
}
