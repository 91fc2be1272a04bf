//! Export naming: modes, conventions, targets and binding identifiers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_grout::convention::{camel_case, dashes_camel_case};
use tessera_grout::ident::{is_identifier_name, is_valid_identifier, quote, sanitize_identifier};
use tessera_grout::{FxHashSet, IndexSet};

use crate::model::Exports;

/// Which export statements the generated module carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    #[default]
    Both,
    Named,
    Default,
}

impl ExportMode {
    pub fn has_named(self) -> bool {
        matches!(self, ExportMode::Both | ExportMode::Named)
    }

    pub fn has_default(self) -> bool {
        matches!(self, ExportMode::Both | ExportMode::Default)
    }
}

impl FromStr for ExportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" => Ok(ExportMode::Both),
            "named" => Ok(ExportMode::Named),
            "default" => Ok(ExportMode::Default),
            other => Err(format!(
                "unknown export mode \"{other}\" (expected both, named or default)"
            )),
        }
    }
}

/// JavaScript language target of the generated module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Es2015,
    Es2016,
    Es2017,
    Es2018,
    Es2019,
    Es2020,
    Es2021,
    Es2022,
    Es2023,
    Es2024,
    #[default]
    Esnext,
}

impl Target {
    /// Arbitrary module namespace names (`export { a as "b-c" }`) are ES2022.
    pub fn allows_arbitrary_names(self) -> bool {
        self >= Target::Es2022
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let target = match s.to_ascii_lowercase().as_str() {
            "es2015" | "es6" => Target::Es2015,
            "es2016" => Target::Es2016,
            "es2017" => Target::Es2017,
            "es2018" => Target::Es2018,
            "es2019" => Target::Es2019,
            "es2020" => Target::Es2020,
            "es2021" => Target::Es2021,
            "es2022" => Target::Es2022,
            "es2023" => Target::Es2023,
            "es2024" => Target::Es2024,
            "esnext" => Target::Esnext,
            other => return Err(format!("unknown target \"{other}\"")),
        };
        Ok(target)
    }
}

/// `(originalName, scopedName, file) -> exportName`
pub type LocalsConventionFn = Arc<dyn Fn(&str, &str, &str) -> String + Send + Sync>;

/// Which aliases an exported class is surfaced under.
#[derive(Clone, Default)]
pub enum LocalsConvention {
    /// Original name only.
    #[default]
    AsIs,
    CamelCase,
    CamelCaseOnly,
    Dashes,
    DashesOnly,
    /// Custom mapping; replaces the original name.
    Function(LocalsConventionFn),
}

impl fmt::Debug for LocalsConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalsConvention::AsIs => f.write_str("AsIs"),
            LocalsConvention::CamelCase => f.write_str("CamelCase"),
            LocalsConvention::CamelCaseOnly => f.write_str("CamelCaseOnly"),
            LocalsConvention::Dashes => f.write_str("Dashes"),
            LocalsConvention::DashesOnly => f.write_str("DashesOnly"),
            LocalsConvention::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl FromStr for LocalsConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asIs" => Ok(LocalsConvention::AsIs),
            "camelCase" => Ok(LocalsConvention::CamelCase),
            "camelCaseOnly" => Ok(LocalsConvention::CamelCaseOnly),
            "dashes" => Ok(LocalsConvention::Dashes),
            "dashesOnly" => Ok(LocalsConvention::DashesOnly),
            other => Err(format!("unknown locals convention \"{other}\"")),
        }
    }
}

impl LocalsConvention {
    /// Names `original` is exported under, original first when kept.
    pub fn export_names(&self, original: &str, scoped: &str, file: &str) -> IndexSet<String> {
        let mut names = IndexSet::default();
        match self {
            LocalsConvention::AsIs => {
                names.insert(original.to_string());
            }
            LocalsConvention::CamelCase => {
                names.insert(original.to_string());
                names.insert(camel_case(original));
            }
            LocalsConvention::CamelCaseOnly => {
                names.insert(camel_case(original));
            }
            LocalsConvention::Dashes => {
                names.insert(original.to_string());
                names.insert(dashes_camel_case(original));
            }
            LocalsConvention::DashesOnly => {
                names.insert(dashes_camel_case(original));
            }
            LocalsConvention::Function(convert) => {
                names.insert(convert(original, scoped, file));
            }
        }
        names
    }
}

/// How one alias appears in a named export clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedExport {
    /// `local` or `local as alias`.
    Specifier(String),
    /// `default` under [`ExportMode::Both`]; left to the default object.
    ShadowedDefault,
    /// Not expressible for the target.
    Unrepresentable,
}

/// Named export specifier for exporting `local` as `alias`.
pub fn named_export(local: &str, alias: &str, mode: ExportMode, allow_arbitrary_names: bool) -> NamedExport {
    if alias == "default" && mode == ExportMode::Both {
        return NamedExport::ShadowedDefault;
    }
    if alias == local {
        return NamedExport::Specifier(local.to_string());
    }
    if is_valid_identifier(alias) {
        return NamedExport::Specifier(format!("{local} as {alias}"));
    }
    if allow_arbitrary_names {
        return NamedExport::Specifier(format!("{local} as {}", quote(alias)));
    }
    if is_identifier_name(alias) {
        return NamedExport::Specifier(format!("{local} as {alias}"));
    }
    NamedExport::Unrepresentable
}

/// Whether `name` can be imported with `import { name as x }`.
pub fn is_importable(name: &str, allow_arbitrary_names: bool) -> bool {
    name != "default" && (is_identifier_name(name) || allow_arbitrary_names)
}

/// Import specifier text for `name` (quoted when not an identifier name).
pub fn import_name(name: &str) -> String {
    if is_identifier_name(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

/// One local identifier per export, unique and distinct from `taken`.
///
/// Prefers the first alias that is already a valid identifier, otherwise a
/// sanitized form of the exported name.
pub fn binding_names<'a>(exports: &Exports, taken: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut used: FxHashSet<String> = taken.into_iter().map(str::to_string).collect();
    exports
        .iter()
        .map(|(name, export)| {
            let base = export
                .export_as
                .iter()
                .find(|alias| is_valid_identifier(alias))
                .cloned()
                .unwrap_or_else(|| sanitize_identifier(name));
            let mut candidate = base.clone();
            let mut suffix = 1;
            while used.contains(&candidate) {
                candidate = format!("{base}_{suffix}");
                suffix += 1;
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}
