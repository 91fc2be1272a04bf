//! Resolved export model consumed by the generators.

use tessera_grout::{IndexMap, IndexSet};

/// Handle to one imported `(file, export name)` pair in an [`Imports`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(usize);

impl BindingId {
    /// Position in registration order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One piece of a composed class string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Import(BindingId),
}

/// A class string whose parts may come from other modules.
///
/// Kept as segments until code generation so literal text never needs to be
/// escaped against placeholder syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassExpr {
    segments: Vec<Segment>,
}

impl ClassExpr {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Text(text.into())],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Append a space-separated part.
    pub fn push_text(&mut self, text: &str) {
        self.separate();
        match self.segments.last_mut() {
            Some(Segment::Text(last)) => last.push_str(text),
            _ => self.segments.push(Segment::Text(text.to_string())),
        }
    }

    pub fn push_import(&mut self, binding: BindingId) {
        self.separate();
        self.segments.push(Segment::Import(binding));
    }

    /// Append every segment of `other`.
    pub fn push_expr(&mut self, other: &ClassExpr) {
        for segment in &other.segments {
            match segment {
                Segment::Text(text) => self.push_text(text),
                Segment::Import(binding) => self.push_import(*binding),
            }
        }
    }

    fn separate(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Text(last)) => last.push(' '),
            _ => self.segments.push(Segment::Text(" ".to_string())),
        }
    }

    pub fn has_imports(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Import(_)))
    }

    /// Flatten to text, resolving every import through `imports`.
    pub fn resolve(&self, imports: &Imports) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Import(binding) => out.push_str(&imports.binding(*binding).resolved),
            }
        }
        out
    }
}

/// One imported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Module id the name is imported from.
    pub file: String,
    /// Export name inside that module.
    pub name: String,
    /// Local identifier (`_0`, `_1`, ...).
    pub local: String,
    /// Fully resolved class string of the import, for inlining.
    pub resolved: String,
}

/// Imports of one consuming module, deduplicated per `(file, name)`.
///
/// Local identifiers are numbered in registration order, so registering in
/// a deterministic order yields byte-identical output.
#[derive(Debug, Clone, Default)]
pub struct Imports {
    bindings: Vec<ImportBinding>,
    by_file: IndexMap<String, IndexMap<String, BindingId>>,
}

impl Imports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binding for `name` exported by `file`, created on first request.
    pub fn register(&mut self, file: &str, name: &str, resolved: &str) -> BindingId {
        if let Some(id) = self.by_file.get(file).and_then(|names| names.get(name)) {
            return *id;
        }
        let id = BindingId(self.bindings.len());
        self.bindings.push(ImportBinding {
            file: file.to_string(),
            name: name.to_string(),
            local: format!("_{}", id.0),
            resolved: resolved.to_string(),
        });
        self.by_file
            .entry(file.to_string())
            .or_default()
            .insert(name.to_string(), id);
        id
    }

    pub fn binding(&self, id: BindingId) -> &ImportBinding {
        &self.bindings[id.0]
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// `file -> bindings`, in first registration order.
    pub fn files(&self) -> Vec<(&str, Vec<(BindingId, &ImportBinding)>)> {
        self.by_file
            .iter()
            .map(|(file, names)| {
                let bindings = names
                    .values()
                    .map(|&id| (id, &self.bindings[id.0]))
                    .collect();
                (file.as_str(), bindings)
            })
            .collect()
    }

    pub fn locals(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.local.as_str())
    }
}

/// Final result for one exported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExport {
    /// Class string with imported parts still symbolic.
    pub code: ClassExpr,
    /// Fully resolved class string.
    pub resolved: String,
    /// Names this export is surfaced under. Never empty.
    pub export_as: IndexSet<String>,
}

/// `exported name -> resolved export`, in source declaration order.
pub type Exports = IndexMap<String, ResolvedExport>;
