//! Source Map v3 support.
//!
//! Only what the pipeline needs: building a map from individual mappings,
//! decoding an existing map back into mappings, moving generated positions
//! after the generated text was edited, and embedding a map as a data URI.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::line_index::LineIndex;

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Serialized Source Map v3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

/// One decoded mapping segment. All positions are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: u32,
    pub original_line: u32,
    pub original_column: u32,
}

/// Errors raised while decoding a mappings string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMapError {
    InvalidBase64(char),
    TruncatedSegment,
    Json(String),
}

impl std::fmt::Display for SourceMapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceMapError::InvalidBase64(c) => write!(f, "invalid base64 VLQ character {c:?}"),
            SourceMapError::TruncatedSegment => write!(f, "truncated VLQ segment"),
            SourceMapError::Json(msg) => write!(f, "invalid source map JSON: {msg}"),
        }
    }
}

impl std::error::Error for SourceMapError {}

/// Incrementally builds a [`SourceMap`].
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    file: Option<String>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    mappings: Vec<Mapping>,
}

impl SourceMapBuilder {
    pub fn new(file: Option<String>) -> Self {
        Self {
            file,
            ..Default::default()
        }
    }

    /// Register a source and return its index.
    pub fn add_source(&mut self, name: impl Into<String>, content: Option<String>) -> u32 {
        self.sources.push(name.into());
        self.sources_content.push(content);
        (self.sources.len() - 1) as u32
    }

    pub fn add_mapping(&mut self, mapping: Mapping) {
        self.mappings.push(mapping);
    }

    pub fn build(self) -> SourceMap {
        let has_content = self.sources_content.iter().any(Option::is_some);
        SourceMap {
            version: 3,
            file: self.file,
            sources: self.sources,
            sources_content: has_content.then_some(self.sources_content),
            names: Vec::new(),
            mappings: encode_mappings(self.mappings),
        }
    }
}

impl SourceMap {
    pub fn from_json(json: &str) -> Result<Self, SourceMapError> {
        serde_json::from_str(json).map_err(|e| SourceMapError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// `sourceMappingURL` comment payload for inline maps.
    pub fn to_data_uri(&self) -> String {
        let mut uri = String::from("data:application/json;charset=utf-8;base64,");
        uri.push_str(&STANDARD.encode(self.to_json()));
        uri
    }

    pub fn decode(&self) -> Result<Vec<Mapping>, SourceMapError> {
        decode_mappings(&self.mappings)
    }

    /// Move every generated position after `old_text` was rewritten to `new_text`.
    ///
    /// `shift` maps a byte offset in `old_text` to the corresponding byte
    /// offset in `new_text`.
    pub fn remap_generated(
        &self,
        old_text: &str,
        new_text: &str,
        shift: impl Fn(usize) -> usize,
    ) -> Result<SourceMap, SourceMapError> {
        let old_index = LineIndex::new(old_text);
        let new_index = LineIndex::new(new_text);

        let mut mappings = self.decode()?;
        for mapping in &mut mappings {
            let Some(old_offset) =
                old_index.offset(mapping.generated_line, mapping.generated_column)
            else {
                continue;
            };
            let (line, column) = new_index.line_col(shift(old_offset));
            mapping.generated_line = line;
            mapping.generated_column = column;
        }

        Ok(SourceMap {
            mappings: encode_mappings(mappings),
            ..self.clone()
        })
    }
}

/// Encode mappings into the VLQ `mappings` string.
///
/// Mappings are sorted by generated position first.
pub fn encode_mappings(mut mappings: Vec<Mapping>) -> String {
    mappings.sort_by_key(|m| (m.generated_line, m.generated_column));

    let mut out = String::new();
    let mut line = 0u32;
    let mut prev_gen_col = 0i64;
    let mut prev_source = 0i64;
    let mut prev_orig_line = 0i64;
    let mut prev_orig_col = 0i64;
    let mut first_in_line = true;

    for m in mappings {
        while line < m.generated_line {
            out.push(';');
            line += 1;
            prev_gen_col = 0;
            first_in_line = true;
        }
        if !first_in_line {
            out.push(',');
        }
        first_in_line = false;

        encode_vlq(&mut out, m.generated_column as i64 - prev_gen_col);
        encode_vlq(&mut out, m.source as i64 - prev_source);
        encode_vlq(&mut out, m.original_line as i64 - prev_orig_line);
        encode_vlq(&mut out, m.original_column as i64 - prev_orig_col);

        prev_gen_col = m.generated_column as i64;
        prev_source = m.source as i64;
        prev_orig_line = m.original_line as i64;
        prev_orig_col = m.original_column as i64;
    }
    out
}

/// Decode a VLQ `mappings` string. Segments without a source are skipped.
pub fn decode_mappings(mappings: &str) -> Result<Vec<Mapping>, SourceMapError> {
    let mut out = Vec::new();
    let mut source = 0i64;
    let mut orig_line = 0i64;
    let mut orig_col = 0i64;

    for (line, group) in mappings.split(';').enumerate() {
        let mut gen_col = 0i64;
        for segment in group.split(',').filter(|s| !s.is_empty()) {
            let fields = decode_segment(segment)?;
            gen_col += fields[0];
            if fields.len() < 4 {
                continue;
            }
            source += fields[1];
            orig_line += fields[2];
            orig_col += fields[3];
            out.push(Mapping {
                generated_line: line as u32,
                generated_column: gen_col.max(0) as u32,
                source: source.max(0) as u32,
                original_line: orig_line.max(0) as u32,
                original_column: orig_col.max(0) as u32,
            });
        }
    }
    Ok(out)
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = (vlq & 0x1f) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0x20;
        }
        out.push(BASE64_CHARS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

fn decode_segment(segment: &str) -> Result<Vec<i64>, SourceMapError> {
    let mut fields = Vec::with_capacity(5);
    let mut value = 0i64;
    let mut shift = 0u32;

    for c in segment.chars() {
        let digit = BASE64_CHARS
            .iter()
            .position(|&b| b as char == c)
            .ok_or(SourceMapError::InvalidBase64(c))? as i64;
        value += (digit & 0x1f) << shift;
        if digit & 0x20 != 0 {
            shift += 5;
            continue;
        }
        let negative = value & 1 == 1;
        let magnitude = value >> 1;
        fields.push(if negative { -magnitude } else { magnitude });
        value = 0;
        shift = 0;
    }

    if shift != 0 || fields.is_empty() {
        return Err(SourceMapError::TruncatedSegment);
    }
    Ok(fields)
}
