//! Type checking errors.

use std::fmt;

use crate::diagnostics::Diagnostic;
use crate::span::Span;

/// Result type alias for type checking operations.
///
/// `TypeError` is boxed to keep the Err path at pointer size.
pub type TypeResult<T> = Result<T, Box<TypeError>>;

/// A type error.
#[derive(Debug, Clone)]
pub struct TypeError {
    /// The kind of error.
    pub kind: TypeErrorKind,
    /// The source span.
    pub span: Span,
    /// Optional help message.
    pub help: Option<String>,
}

impl TypeError {
    /// Create a new type error.
    pub fn new(kind: TypeErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            help: None,
        }
    }

    /// Wrap this error in a `Box` and return as `Err`.
    pub fn into_err<T>(self) -> TypeResult<T> {
        Err(Box::new(self))
    }

    /// Add a help message.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Convert to a diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        // Error code ranges per the header in diagnostics.rs:
        // - E0200..E0229: names and resolution
        // - E0230..E0259: arity and shape
        // - E0260..E0279: compatibility and dispatch
        // - E0280..E0289: definition graph
        // - E0290..E0299: inference
        let (code, message) = match &self.kind {
            // Names and resolution
            TypeErrorKind::DuplicateType { name } => (
                "E0201",
                format!("the type `{name}` is defined multiple times"),
            ),
            TypeErrorKind::DuplicateAlias { name } => (
                "E0202",
                format!("the alias `{name}` is defined multiple times"),
            ),
            TypeErrorKind::AliasToAlias { name, target } => (
                "E0203",
                format!("alias `{name}` points at alias `{target}`; aliases must name a type directly"),
            ),
            TypeErrorKind::NameCollision { name } => (
                "E0204",
                format!("the name `{name}` is declared as both a type and an alias"),
            ),
            TypeErrorKind::UnknownType { name } => (
                "E0205",
                format!("cannot find type `{name}` in this scope"),
            ),
            TypeErrorKind::UnresolvedImplements { name } => (
                "E0206",
                format!("cannot find interface `{name}` in this scope"),
            ),
            TypeErrorKind::NotAnInterface { name } => (
                "E0207",
                format!("`{name}` is not an interface"),
            ),
            TypeErrorKind::ExplicitCaseParams { case } => (
                "E0208",
                format!("enum case `{case}` declares its own type parameters; cases inherit the enum's parameters"),
            ),

            // Arity and shape
            TypeErrorKind::WrongTypeArity { name, expected, found } => (
                "E0230",
                format!("wrong number of type arguments for `{name}`: expected {expected}, found {found}"),
            ),
            TypeErrorKind::DuplicateField { name } => (
                "E0231",
                format!("duplicate record field `{name}`"),
            ),
            TypeErrorKind::DuplicateCase { name } => (
                "E0232",
                format!("duplicate enum case `{name}`"),
            ),
            TypeErrorKind::DuplicateParam { name } => (
                "E0233",
                format!("duplicate type parameter `{name}`"),
            ),
            TypeErrorKind::DuplicateMethod { name } => (
                "E0234",
                format!("duplicate interface method `{name}`"),
            ),
            TypeErrorKind::LimitExceeded { what, count, limit } => (
                "E0235",
                format!("too many {what}: {count} exceeds the limit of {limit}"),
            ),
            TypeErrorKind::InvalidInterfaceBody { name } => (
                "E0236",
                format!("interface `{name}` body must be a record of method signatures"),
            ),

            // Compatibility and dispatch
            TypeErrorKind::NotAssignable { to, from } => (
                "E0260",
                format!("`{from}` is not assignable to `{to}`"),
            ),
            TypeErrorKind::InvalidVariance { ty, param, declared, required } => (
                "E0262",
                format!("parameter `{param}` of `{ty}` is declared {declared} but its uses require {required}"),
            ),
            TypeErrorKind::InterfaceParamMismatch { ty, interface } => (
                "E0263",
                format!("`{ty}` has fewer type parameters than interface `{interface}` requires"),
            ),
            TypeErrorKind::MethodMissing { ty, interface, method } => (
                "E0270",
                format!("no function implements method `{method}` of interface `{interface}` for type `{ty}`"),
            ),
            TypeErrorKind::MethodAmbiguous { ty, interface, method, candidates } => (
                "E0271",
                format!(
                    "multiple functions implement method `{method}` of interface `{interface}` for type `{ty}`: {}",
                    candidates.join(", ")
                ),
            ),

            // Definition graph
            TypeErrorKind::CircularBoxes { names } => (
                "E0280",
                format!("circular box definitions: {}", names.join(", ")),
            ),
            TypeErrorKind::CircularInterfaces { names } => (
                "E0281",
                format!("circular interface inclusions: {}", names.join(", ")),
            ),

            // Inference
            TypeErrorKind::AnnotationRequired { params } => (
                "E0290",
                format!(
                    "type annotations needed: cannot infer {}",
                    params
                        .iter()
                        .map(|p| format!("`{p}`"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ),
        };

        let mut diag = Diagnostic::error(message, self.span).with_code(code);
        if let Some(help) = &self.help {
            diag = diag.with_suggestion(help.clone());
        }
        diag
    }
}

/// The kind of type error.
///
/// Types are rendered to display strings at construction so errors carry
/// no registry borrows.
#[derive(Debug, Clone)]
pub enum TypeErrorKind {
    /// A fully-qualified type name registered twice.
    DuplicateType { name: String },
    /// An alias name declared twice in one module.
    DuplicateAlias { name: String },
    /// An alias whose target is itself an alias.
    AliasToAlias { name: String, target: String },
    /// A name declared as both a type and an alias.
    NameCollision { name: String },
    /// A type name that resolves to nothing.
    UnknownType { name: String },
    /// An implements clause naming an unknown type.
    UnresolvedImplements { name: String },
    /// An implements clause naming a non-interface.
    NotAnInterface { name: String },
    /// An enum case with its own parameter list.
    ExplicitCaseParams { case: String },
    /// Wrong number of type arguments.
    WrongTypeArity {
        name: String,
        expected: usize,
        found: usize,
    },
    /// Duplicate record field name.
    DuplicateField { name: String },
    /// Duplicate enum case name.
    DuplicateCase { name: String },
    /// Duplicate type parameter name.
    DuplicateParam { name: String },
    /// Duplicate interface method name.
    DuplicateMethod { name: String },
    /// A declaration exceeds a structural size cap.
    LimitExceeded {
        what: &'static str,
        count: usize,
        limit: usize,
    },
    /// Interface body is not a record of lambda signatures.
    InvalidInterfaceBody { name: String },
    /// Assignment rejected after the subtyping fallback.
    NotAssignable { to: String, from: String },
    /// Declared variance weaker than the deduced requirement.
    InvalidVariance {
        ty: String,
        param: String,
        declared: String,
        required: String,
    },
    /// Implementor has fewer parameters than the interface.
    InterfaceParamMismatch { ty: String, interface: String },
    /// No eligible function matches an interface method.
    MethodMissing {
        ty: String,
        interface: String,
        method: String,
    },
    /// More than one eligible function matches an interface method.
    MethodAmbiguous {
        ty: String,
        interface: String,
        method: String,
        candidates: Vec<String>,
    },
    /// Boxed definitions that unbox to each other forever.
    CircularBoxes { names: Vec<String> },
    /// Interface inclusions forming a cycle.
    CircularInterfaces { names: Vec<String> },
    /// Inference finished with unresolved parameters.
    AnnotationRequired { params: Vec<String> },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_diagnostic().message)
    }
}

impl std::error::Error for TypeError {}
