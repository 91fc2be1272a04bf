//! TypeScript declaration generation.

use std::fmt::Write as _;

use tessera_grout::ident::quote;
use tessera_grout::source_map::{Mapping, SourceMapBuilder};
use tessera_tile::locate::class_positions;

use crate::model::Exports;
use crate::naming::{binding_names, named_export, ExportMode, NamedExport};

/// Fixed header of every generated declaration file.
pub const HEADER: &str = "/* eslint-disable */
/* prettier-ignore */
// @ts-nocheck
/**
 * Generated by tessera
 * Please do not edit this file manually
 */
";

const DECLARE: &str = "declare const ";
const DEFAULT_BINDING: &str = "__default_export__";

/// Inputs for the optional inline declaration map.
#[derive(Debug, Clone)]
pub struct DeclarationMap<'a> {
    /// Original CSS text; class selectors are located in it.
    pub css: &'a str,
    /// CSS path as recorded in `sources`, relative to the declaration file.
    pub source: String,
    /// Declaration file name recorded in `file`.
    pub file: Option<String>,
}

/// Tracks generated lines so mappings can be attached as text is written.
struct Writer {
    out: String,
    line: u32,
    mappings: Vec<Mapping>,
}

impl Writer {
    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
        self.line += 1;
    }

    fn mapped_line(&mut self, text: &str, column: u32, original: Option<(u32, u32)>) {
        if let Some((original_line, original_column)) = original {
            self.mappings.push(Mapping {
                generated_line: self.line,
                generated_column: column,
                source: 0,
                original_line,
                original_column,
            });
        }
        self.line(text);
    }
}

/// Generate `.d.ts` text for one CSS module.
pub fn generate_types(
    exports: &Exports,
    mode: ExportMode,
    allow_arbitrary_names: bool,
    map: Option<&DeclarationMap<'_>>,
) -> String {
    if exports.is_empty() {
        let mut out = String::from(HEADER);
        out.push_str("export {};\n");
        return out;
    }

    let positions = map.map(|map| class_positions(map.css)).unwrap_or_default();
    let locals = binding_names(exports, [DEFAULT_BINDING]);

    let mut writer = Writer {
        out: String::with_capacity(HEADER.len() + exports.len() * 48),
        line: HEADER.lines().count() as u32,
        mappings: Vec::new(),
    };
    writer.out.push_str(HEADER);

    for (name, local) in exports.keys().zip(&locals) {
        writer.mapped_line(
            &format!("{DECLARE}{local}: string;"),
            DECLARE.len() as u32,
            positions.get(name).copied(),
        );
    }

    if mode.has_named() {
        let mut specs = Vec::new();
        for ((name, export), local) in exports.iter().zip(&locals) {
            for alias in &export.export_as {
                if let NamedExport::Specifier(spec) =
                    named_export(local, alias, mode, allow_arbitrary_names)
                {
                    specs.push((spec, positions.get(name).copied()));
                }
            }
        }
        writer.line("");
        if specs.is_empty() {
            writer.line("export {};");
        } else {
            writer.line("export {");
            for (spec, original) in specs {
                writer.mapped_line(&format!("  {spec},"), 2, original);
            }
            writer.line("};");
        }
    }

    if mode.has_default() {
        writer.line("");
        writer.line(&format!("{DECLARE}{DEFAULT_BINDING}: {{"));
        for ((_, export), local) in exports.iter().zip(&locals) {
            for alias in &export.export_as {
                writer.line(&format!("  {}: typeof {local};", quote(alias)));
            }
        }
        writer.line("};");
        writer.line(&format!("export default {DEFAULT_BINDING};"));
    }

    let Writer {
        mut out, mappings, ..
    } = writer;
    if let Some(map) = map {
        let mut builder = SourceMapBuilder::new(map.file.clone());
        builder.add_source(map.source.clone(), None);
        for mapping in mappings {
            builder.add_mapping(mapping);
        }
        let _ = writeln!(out, "//# sourceMappingURL={}", builder.build().to_data_uri());
    }
    out
}
