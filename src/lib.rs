//! # Sable Type Checker Library
//!
//! The front-end type system of the Sable language: a recursive type
//! model with declaration-site variance, module-scoped newtype unboxing,
//! copy-on-write parameter inference, and interface dispatch resolution.
//!
//! ## Checking Pipeline
//!
//! ```text
//! Module declarations -> Registration -> Validation -> Dispatch -> Registry
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use sablec::ast::{ModuleDecl, TypeDecl, TypeDeclBody};
//! use sablec::span::Span;
//!
//! let module = ModuleDecl {
//!     name: "core".to_string(),
//!     imports: Vec::new(),
//!     aliases: Vec::new(),
//!     types: vec![TypeDecl {
//!         name: "Int".to_string(),
//!         span: Span::dummy(),
//!         params: Vec::new(),
//!         implements: Vec::new(),
//!         body: TypeDeclBody::Native,
//!     }],
//!     functions: Vec::new(),
//! };
//!
//! let registry = sablec::check(&[module]).unwrap();
//! assert!(registry.lookup_type_str("core.Int").is_some());
//! ```
//!
//! After a successful check the [`Registry`] is read-only: the expression
//! checker queries it for definitions, runs assignments through
//! [`typeck::Assigner`], and looks up interface method implementations in
//! each definition's dispatch tables.

pub mod ast;
pub mod diagnostics;
pub mod modules;
pub mod span;
pub mod typeck;

pub use diagnostics::{Diagnostic, DiagnosticEmitter, DiagnosticKind};
pub use modules::{ModuleScope, NameService};
pub use span::Span;
pub use typeck::{Assigner, InferringState, Registry, Type, TypeError};

use ast::ModuleDecl;

/// A failed check: the full batch of diagnostics, never just the first.
#[derive(Debug, thiserror::Error)]
#[error("type checking failed with {} error(s)", .diagnostics.len())]
pub struct CheckFailure {
    pub diagnostics: Vec<Diagnostic>,
}

/// Check a set of modules and produce the type registry.
///
/// Builds the module name scope, runs the registration pipeline, and
/// resolves interface dispatch. All accumulated errors come back as
/// rendered diagnostics.
pub fn check(modules: &[ModuleDecl]) -> Result<Registry, CheckFailure> {
    let scope = ModuleScope::build(modules);
    typeck::check_modules(modules, &scope).map_err(|errors| CheckFailure {
        diagnostics: errors.iter().map(TypeError::to_diagnostic).collect(),
    })
}
