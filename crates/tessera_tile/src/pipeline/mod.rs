//! ICSS pipeline backend.
//!
//! Five stages over the lightweight tree in [`crate::syntax`]:
//!
//! 1. `@value` inlining ([`values`])
//! 2. local/global mode resolution ([`local_by_default`])
//! 3. `composes ... from` extraction ([`extract_imports`])
//! 4. scoped name generation ([`scope`])
//! 5. ICSS extraction ([`crate::icss`])

pub mod extract_imports;
pub mod local_by_default;
pub mod scope;
pub mod values;

use tessera_grout::source_map::{Mapping, SourceMapBuilder};
use tessera_grout::LineIndex;

use crate::error::TransformResult;
use crate::icss;
use crate::options::{ModuleOptions, ScopedNameGenerator};
use crate::scoped_name::{clean_id, ScopedNames};
use crate::syntax::{self, Printed};
use crate::types::TransformOutput;
use crate::Transformer;

/// Default scoped name template of the ICSS backend.
pub const DEFAULT_SCOPED_NAME: &str = "[name]__[local]___[hash:5]";

/// Transformer running the five-stage ICSS pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcssTransformer;

impl Transformer for IcssTransformer {
    fn name(&self) -> &'static str {
        "icss"
    }

    fn transform(
        &self,
        code: &str,
        id: &str,
        options: &ModuleOptions,
        source_map: bool,
    ) -> TransformResult<TransformOutput> {
        let mut sheet = syntax::parse(code, id)?;

        values::inline_values(&mut sheet, code, id)?;
        let localized = local_by_default::localize(&mut sheet, options.mode_for(id));
        extract_imports::extract_composes_imports(&mut sheet);

        let default_generator;
        let generator = match &options.generate_scoped_name {
            Some(generator) => generator,
            None => {
                default_generator = ScopedNameGenerator::from(DEFAULT_SCOPED_NAME);
                &default_generator
            }
        };
        let mut names = ScopedNames::new(generator, options, id, code);
        scope::scope(
            &mut sheet,
            &mut names,
            &localized.globals,
            options.exports_globals_for(id),
            id,
        )?;

        let (imports, exports) = icss::take_icss(&mut sheet);
        let extracted = icss::extract(&imports, &exports, &names.local_classes());

        let printed = syntax::print(&sheet);
        let map = source_map.then(|| build_map(&printed, code, id));

        tracing::debug!(
            id,
            exports = extracted.exports.len(),
            references = extracted.references.len(),
            "icss transform"
        );

        Ok(TransformOutput {
            code: printed.code,
            map,
            exports: extracted.exports,
            references: extracted.references,
        })
    }
}

fn build_map(printed: &Printed, source: &str, id: &str) -> String {
    let index = LineIndex::new(source);
    let mut builder = SourceMapBuilder::new(None);
    let file = builder.add_source(clean_id(id), Some(source.to_string()));
    for &(generated_line, generated_column, offset) in &printed.mappings {
        let (original_line, original_column) = index.line_col(offset);
        builder.add_mapping(Mapping {
            generated_line,
            generated_column,
            source: file,
            original_line,
            original_column,
        });
    }
    builder.build().to_json()
}
