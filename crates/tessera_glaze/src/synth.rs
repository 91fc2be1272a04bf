//! ESM binding module synthesis.

use std::fmt::Write as _;

use tessera_grout::ident::quote;
use tessera_grout::Diagnostic;

use crate::model::{ClassExpr, Exports, ImportBinding, Imports, Segment};
use crate::naming::{binding_names, import_name, is_importable, named_export, ExportMode, NamedExport};

/// Diagnostic code for an export named `default` dropped from named exports.
pub const SHADOWED_DEFAULT: &str = "shadowed-default-export";
/// Diagnostic code for an alias with no named export form on the target.
pub const UNREPRESENTABLE_NAME: &str = "unrepresentable-export-name";

/// Generated module text plus warning-grade diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthOutput {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// How an import binding is materialized in the module.
enum ImportForm {
    /// `import { name as _0 }`
    Named,
    /// `import _d0 from ...` and `_d0["name"]`
    DefaultMember(String),
    /// Resolved class string inlined; module imported for side effects only.
    Inline,
}

/// Generate the JavaScript module for one CSS module.
pub fn synthesize(
    imports: &Imports,
    exports: &Exports,
    mode: ExportMode,
    allow_arbitrary_names: bool,
) -> SynthOutput {
    let mut out = SynthOutput::default();
    let code = &mut out.code;

    let mut forms: Vec<ImportForm> = (0..imports.len()).map(|_| ImportForm::Inline).collect();
    let mut default_locals: Vec<String> = Vec::new();
    for (file, bindings) in imports.files() {
        let mut named: Vec<&ImportBinding> = Vec::new();
        let mut default_local: Option<String> = None;

        for (id, binding) in bindings {
            forms[id.index()] = if mode.has_named() && is_importable(&binding.name, allow_arbitrary_names) {
                named.push(binding);
                ImportForm::Named
            } else if mode.has_default() {
                let local = default_local
                    .get_or_insert_with(|| format!("_d{}", default_locals.len()))
                    .clone();
                ImportForm::DefaultMember(local)
            } else {
                ImportForm::Inline
            };
        }

        let file = quote(file);
        match (&default_local, named.is_empty()) {
            (Some(local), true) => {
                let _ = writeln!(code, "import {local} from {file};");
            }
            (Some(local), false) => {
                let _ = writeln!(code, "import {local}, {{ {} }} from {file};", specifiers(&named));
            }
            (None, false) => {
                let _ = writeln!(code, "import {{ {} }} from {file};", specifiers(&named));
            }
            (None, true) => {
                let _ = writeln!(code, "import {file};");
            }
        }
        if let Some(local) = default_local {
            default_locals.push(local);
        }
    }

    let locals = binding_names(
        exports,
        imports.locals().chain(default_locals.iter().map(String::as_str)),
    );

    for ((_, export), local) in exports.iter().zip(&locals) {
        let _ = writeln!(code, "const {local} = {};", expression(&export.code, imports, &forms));
    }

    if mode.has_named() {
        let mut specs = Vec::new();
        for ((name, export), local) in exports.iter().zip(&locals) {
            for alias in &export.export_as {
                match named_export(local, alias, mode, allow_arbitrary_names) {
                    NamedExport::Specifier(spec) => specs.push(spec),
                    NamedExport::ShadowedDefault => {
                        tracing::warn!(export = %name, "export named \"default\" is only available on the default export");
                        out.diagnostics.push(Diagnostic::warning(
                            SHADOWED_DEFAULT,
                            format!(
                                "class \"{name}\" is exported as \"default\", which collides with the default export; it is only available as a key of the default export"
                            ),
                        ));
                    }
                    NamedExport::Unrepresentable => {
                        tracing::debug!(export = %alias, "dropping unrepresentable named export");
                        out.diagnostics.push(Diagnostic::info(
                            UNREPRESENTABLE_NAME,
                            format!(
                                "\"{alias}\" is not a valid export name for the configured target; it is only available on the default export"
                            ),
                        ));
                    }
                }
            }
        }
        write_named_block(code, &specs);
    }

    if mode.has_default() {
        let mut entries = Vec::new();
        for ((_, export), local) in exports.iter().zip(&locals) {
            for alias in &export.export_as {
                entries.push(format!("{}: {local}", quote(alias)));
            }
        }
        if entries.is_empty() {
            code.push_str("export default {};\n");
        } else {
            code.push_str("export default {\n");
            for entry in entries {
                let _ = writeln!(code, "  {entry},");
            }
            code.push_str("};\n");
        }
    }

    out
}

fn specifiers(bindings: &[&ImportBinding]) -> String {
    bindings
        .iter()
        .map(|binding| format!("{} as {}", import_name(&binding.name), binding.local))
        .collect::<Vec<_>>()
        .join(", ")
}

fn expression(expr: &ClassExpr, imports: &Imports, forms: &[ImportForm]) -> String {
    if !expr.has_imports() {
        return quote(&expr.resolve(imports));
    }
    let mut out = String::from("`");
    for segment in expr.segments() {
        match segment {
            Segment::Text(text) => escape_template(&mut out, text),
            Segment::Import(id) => {
                let binding = imports.binding(*id);
                match &forms[id.index()] {
                    ImportForm::Named => {
                        let _ = write!(out, "${{{}}}", binding.local);
                    }
                    ImportForm::DefaultMember(local) => {
                        let _ = write!(out, "${{{local}[{}]}}", quote(&binding.name));
                    }
                    ImportForm::Inline => escape_template(&mut out, &binding.resolved),
                }
            }
        }
    }
    out.push('`');
    out
}

fn escape_template(out: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '`' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
}

fn write_named_block(code: &mut String, specs: &[String]) {
    if specs.is_empty() {
        code.push_str("export {};\n");
        return;
    }
    code.push_str("export {\n");
    for spec in specs {
        let _ = writeln!(code, "  {spec},");
    }
    code.push_str("};\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_template() {
        let mut out = String::new();
        escape_template(&mut out, "a`b\\c${d}$e");
        assert_eq!(out, "a\\`b\\\\c\\${d}$e");
    }
}
