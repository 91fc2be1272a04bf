//! Transform options.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `(exportName, resourceFile, rawCss) -> scopedName`
pub type ScopedNameFn = Arc<dyn Fn(&str, &str, &str) -> String + Send + Sync>;

/// How scoped names are produced.
#[derive(Clone)]
pub enum ScopedNameGenerator {
    /// Template with `[name]`, `[local]`, `[hash]` and `[hash:N]` placeholders.
    Template(String),
    /// Called once per local name; must be deterministic for identical input.
    Function(ScopedNameFn),
}

impl fmt::Debug for ScopedNameGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopedNameGenerator::Template(template) => {
                f.debug_tuple("Template").field(template).finish()
            }
            ScopedNameGenerator::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<&str> for ScopedNameGenerator {
    fn from(template: &str) -> Self {
        ScopedNameGenerator::Template(template.to_string())
    }
}

/// Default scoping mode for bare selectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeBehaviour {
    #[default]
    Local,
    Global,
}

/// Options recognized by every transformer backend.
#[derive(Debug, Clone, Default)]
pub struct ModuleOptions {
    /// `None` selects the backend's own default pattern.
    pub generate_scoped_name: Option<ScopedNameGenerator>,
    /// Salts the hash component of generated names.
    pub hash_prefix: String,
    pub scope_behaviour: ScopeBehaviour,
    /// Export classes that stay global under their literal names.
    pub export_globals: bool,
    /// Files matching any pattern are processed in global mode.
    pub global_module_paths: Vec<Regex>,
}

impl ModuleOptions {
    /// Whether `id` matches one of the `global_module_paths` patterns.
    pub fn is_global_module(&self, id: &str) -> bool {
        self.global_module_paths.iter().any(|re| re.is_match(id))
    }

    /// Effective scoping mode for `id`.
    pub fn mode_for(&self, id: &str) -> ScopeBehaviour {
        if self.is_global_module(id) {
            ScopeBehaviour::Global
        } else {
            self.scope_behaviour
        }
    }

    /// Forced-global files still export their classes, under literal names.
    pub fn exports_globals_for(&self, id: &str) -> bool {
        self.export_globals || self.is_global_module(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_module_paths_force_global() {
        let options = ModuleOptions {
            global_module_paths: vec![Regex::new(r"vendor/").unwrap()],
            ..Default::default()
        };
        assert_eq!(options.mode_for("src/vendor/reset.css"), ScopeBehaviour::Global);
        assert_eq!(options.mode_for("src/app.css"), ScopeBehaviour::Local);
        assert!(options.exports_globals_for("src/vendor/reset.css"));
        assert!(!options.exports_globals_for("src/app.css"));
    }

    #[test]
    fn test_generator_debug_hides_closure() {
        let generator = ScopedNameGenerator::Function(Arc::new(|name, _, _| name.to_string()));
        assert_eq!(format!("{generator:?}"), "Function(..)");
    }
}
