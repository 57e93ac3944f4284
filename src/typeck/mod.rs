//! The Sable type system core.
//!
//! Key components:
//!
//! - [`Registry`] - Arena of all type and function definitions
//! - [`Assigner`] - The assignment and subtyping algorithm
//! - [`InferringState`] - Copy-on-write parameter inference
//!
//! # Checking Process
//!
//! 1. **Registration** - Every declaration gets a [`DefId`], enum cases
//!    included
//! 2. **Validation** - Implements clauses, bounds, defaults, contents,
//!    then the global graph and variance checks
//! 3. **Dispatch** - Each concrete type's interfaces are resolved to the
//!    functions realizing their methods
//!
//! Errors accumulate across all phases and are reported together; only
//! a clean registry proceeds to dispatch resolution.

pub mod dispatch;
pub mod error;
pub mod infer;
pub mod registry;
pub mod ty;
pub mod unbox;
pub mod unify;
pub mod variance;

pub use error::{TypeError, TypeErrorKind, TypeResult};
pub use infer::{Flex, InferringState, Resolution};
pub use registry::build;
pub use ty::{
    BoxKind, DeclKind, DefId, DispatchTable, FnDef, ParamDef, ParamRef, Registry, Type, TypeDef,
    TypeDefContent, TypeKind,
};
pub use unbox::{unbox, unbox_all};
pub use unify::Assigner;
pub use variance::Variance;

use crate::ast::ModuleDecl;
use crate::modules::NameService;
use crate::span::Span;

/// Check a set of modules end to end.
///
/// Runs the registration pipeline and, on a clean registry, dispatch
/// resolution. Returns the finished registry or every error found.
pub fn check_modules(
    modules: &[ModuleDecl],
    names: &dyn NameService,
) -> Result<Registry, Vec<TypeError>> {
    let mut registry = registry::build(modules, names)?;
    let errors = dispatch::resolve(&mut registry);
    if errors.is_empty() {
        Ok(registry)
    } else {
        Err(errors)
    }
}

/// Finish an inference session, requiring every target to be resolved.
///
/// Unresolved targets become an annotation-required error naming the
/// parameters that could not be pinned down from context.
pub fn finish_inference(
    registry: &Registry,
    state: InferringState,
    span: Span,
) -> TypeResult<Resolution> {
    state.finish().map_err(|unresolved| {
        let params = unresolved
            .into_iter()
            .map(|p| registry.name_str(registry.param_def(p).name).to_string())
            .collect();
        Box::new(TypeError::new(
            TypeErrorKind::AnnotationRequired { params },
            span,
        ))
    })
}
