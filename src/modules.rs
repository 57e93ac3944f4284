//! Module name resolution boundary.
//!
//! Import resolution proper belongs to the module loader, not the type
//! checker. The checker only needs one service from it: given a name as
//! written inside some module, which fully-qualified definition does it
//! refer to? [`NameService`] is that boundary, and [`ModuleScope`] is a
//! table-driven implementation built straight from the declaration lists,
//! used by the pipeline and the tests.
//!
//! Fully-qualified names are `module.Item`. An alias resolves directly to
//! its target; the loader guarantees an alias never points to another
//! alias, so resolution is a single table lookup.

use std::collections::HashMap;

use crate::ast::ModuleDecl;

/// Name-resolution service consumed by the registry.
pub trait NameService {
    /// Resolve a name as written inside `module` to a fully-qualified
    /// name, following import shorthands and aliases.
    fn resolve(&self, module: &str, name: &str) -> Option<String>;

    /// The target of an alias, if `fqn` names one.
    fn alias_target(&self, fqn: &str) -> Option<&str>;
}

/// Per-module visibility tables built from declaration lists.
#[derive(Debug, Default)]
pub struct ModuleScope {
    /// module name -> (visible name -> fully-qualified target).
    visible: HashMap<String, HashMap<String, String>>,
    /// fully-qualified alias name -> target.
    aliases: HashMap<String, String>,
}

impl ModuleScope {
    /// Build visibility tables for a set of modules.
    ///
    /// A module sees its own types bare and qualified, its aliases bare,
    /// and imported modules' types under their qualified names.
    pub fn build(modules: &[ModuleDecl]) -> Self {
        let by_name: HashMap<&str, &ModuleDecl> =
            modules.iter().map(|m| (m.name.as_str(), m)).collect();

        let mut scope = ModuleScope::default();

        for module in modules {
            for alias in &module.aliases {
                scope
                    .aliases
                    .insert(fqn(&module.name, &alias.name), alias.target.clone());
            }
        }

        for module in modules {
            let table = scope.visible.entry(module.name.clone()).or_default();

            for decl in &module.types {
                let full = fqn(&module.name, &decl.name);
                table.insert(decl.name.clone(), full.clone());
                table.insert(full.clone(), full);
            }
            for alias in &module.aliases {
                table.insert(alias.name.clone(), alias.target.clone());
            }
            for import in &module.imports {
                if let Some(imported) = by_name.get(import.as_str()) {
                    for decl in &imported.types {
                        let full = fqn(import, &decl.name);
                        table.insert(full.clone(), full);
                    }
                    for alias in &imported.aliases {
                        table.insert(fqn(import, &alias.name), alias.target.clone());
                    }
                }
            }
        }

        scope
    }
}

impl NameService for ModuleScope {
    fn resolve(&self, module: &str, name: &str) -> Option<String> {
        self.visible.get(module)?.get(name).cloned()
    }

    fn alias_target(&self, fqn: &str) -> Option<&str> {
        self.aliases.get(fqn).map(String::as_str)
    }
}

/// Join a module name and item name into a fully-qualified name.
pub fn fqn(module: &str, item: &str) -> String {
    format!("{module}.{item}")
}
