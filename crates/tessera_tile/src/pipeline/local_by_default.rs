//! Local-by-default stage.
//!
//! Rewrites every class and id selector that is local in its context to a
//! `:local(.name)` marker, unwraps `:global(...)`/`:local(...)` and applies
//! the bare `:global`/`:local` mode switches. Keyframes declared locally get
//! a marker in their prelude, and so do references to them in `animation`
//! and `animation-name`.

use tessera_grout::{FxHashSet, IndexSet};

use crate::options::ScopeBehaviour;
use crate::syntax::scan::{ident_end, matching_close, replace_idents, split_top_level, string_end};
use crate::syntax::{AtRule, Node, Stylesheet};

/// Pseudo-classes whose argument is itself a selector list.
const SELECTOR_PSEUDOS: &[&str] = &[
    "not",
    "is",
    "where",
    "has",
    "matches",
    "any",
    "-webkit-any",
    "-moz-any",
    "host",
    "host-context",
    "slotted",
];

/// Names left global by this stage.
#[derive(Debug, Default)]
pub struct Localized {
    /// Global class and id names, first occurrence order.
    pub globals: IndexSet<String>,
}

/// Mark local names across the whole sheet.
pub fn localize(sheet: &mut Stylesheet, mode: ScopeBehaviour) -> Localized {
    let mut keyframes = FxHashSet::default();
    collect_local_keyframes(&sheet.nodes, mode, &mut keyframes);

    let mut localized = Localized::default();
    localize_nodes(&mut sheet.nodes, mode, &keyframes, &mut localized);
    localized
}

fn collect_local_keyframes(nodes: &[Node], mode: ScopeBehaviour, out: &mut FxHashSet<String>) {
    for node in nodes {
        match node {
            Node::AtRule(at_rule) if at_rule.is_keyframes() => {
                if let (name, ScopeBehaviour::Local) = keyframes_name(&at_rule.params, mode) {
                    out.insert(name.to_string());
                }
            }
            Node::AtRule(AtRule {
                nodes: Some(children),
                ..
            }) => collect_local_keyframes(children, mode, out),
            Node::Rule(rule) => collect_local_keyframes(&rule.nodes, mode, out),
            _ => {}
        }
    }
}

/// Keyframes name with its effective mode.
fn keyframes_name(params: &str, mode: ScopeBehaviour) -> (&str, ScopeBehaviour) {
    let params = params.trim();
    for (prefix, explicit) in [
        (":global(", ScopeBehaviour::Global),
        (":local(", ScopeBehaviour::Local),
    ] {
        if let Some(inner) = params.strip_prefix(prefix).and_then(|p| p.strip_suffix(')')) {
            return (inner.trim(), explicit);
        }
    }
    (params, mode)
}

fn localize_nodes(
    nodes: &mut [Node],
    mode: ScopeBehaviour,
    keyframes: &FxHashSet<String>,
    localized: &mut Localized,
) {
    for node in nodes {
        match node {
            Node::Rule(rule) if rule.is_icss() => {}
            Node::Rule(rule) => {
                rule.selector = localize_selector(&rule.selector, mode, localized);
                localize_nodes(&mut rule.nodes, mode, keyframes, localized);
            }
            Node::AtRule(at_rule) if at_rule.is_keyframes() => {
                let (name, effective) = keyframes_name(&at_rule.params, mode);
                at_rule.params = match effective {
                    ScopeBehaviour::Local => format!(":local({name})"),
                    ScopeBehaviour::Global => name.to_string(),
                };
            }
            Node::AtRule(at_rule) => {
                if let Some(children) = &mut at_rule.nodes {
                    localize_nodes(children, mode, keyframes, localized);
                }
            }
            Node::Decl(decl) if is_animation_property(&decl.prop) && !keyframes.is_empty() => {
                decl.value = replace_idents(&decl.value, |ident, _| {
                    keyframes
                        .contains(ident)
                        .then(|| format!(":local({ident})"))
                });
            }
            Node::Decl(_) | Node::Comment(_) => {}
        }
    }
}

fn is_animation_property(prop: &str) -> bool {
    let prop = prop.to_ascii_lowercase();
    let unprefixed = match prop.strip_prefix('-') {
        Some(rest) => rest.split_once('-').map_or(rest, |(_, p)| p),
        None => prop.as_str(),
    };
    unprefixed == "animation" || unprefixed == "animation-name"
}

/// Localize a comma-separated selector list; each part starts in `mode`.
pub fn localize_selector(selector: &str, mode: ScopeBehaviour, localized: &mut Localized) -> String {
    split_top_level(selector, b',')
        .into_iter()
        .map(|part| localize_part(part, mode, localized))
        .collect::<Vec<_>>()
        .join(",")
}

fn localize_part(part: &str, default: ScopeBehaviour, localized: &mut Localized) -> String {
    let bytes = part.as_bytes();
    let mut out = String::with_capacity(part.len() + 16);
    let mut mode = default;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                let end = (matching_close(bytes, i) + 1).min(bytes.len());
                out.push_str(&part[i..end]);
                i = end;
            }
            b'"' | b'\'' => {
                let end = string_end(bytes, i);
                out.push_str(&part[i..end]);
                i = end;
            }
            b':' => {
                let colons = if bytes.get(i + 1) == Some(&b':') { 2 } else { 1 };
                let name_start = i + colons;
                let name_end = ident_end(bytes, name_start);
                let name = part[name_start..name_end].to_ascii_lowercase();
                let has_args = bytes.get(name_end) == Some(&b'(');

                if colons == 1 && (name == "global" || name == "local") {
                    let switched = if name == "global" {
                        ScopeBehaviour::Global
                    } else {
                        ScopeBehaviour::Local
                    };
                    if has_args {
                        let close = matching_close(bytes, name_end);
                        let inner = &part[name_end + 1..close.min(bytes.len())];
                        out.push_str(&localize_selector(inner, switched, localized));
                        i = close + 1;
                    } else {
                        mode = switched;
                        i = name_end;
                        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                            i += 1;
                        }
                    }
                    continue;
                }

                out.push_str(&part[i..name_end]);
                i = name_end;
                if has_args {
                    let close = matching_close(bytes, name_end);
                    let inner = &part[name_end + 1..close.min(bytes.len())];
                    out.push('(');
                    if SELECTOR_PSEUDOS.contains(&name.as_str()) {
                        out.push_str(&localize_selector(inner, mode, localized));
                    } else {
                        out.push_str(inner);
                    }
                    out.push(')');
                    i = close + 1;
                }
            }
            sigil @ (b'.' | b'#') => {
                let end = ident_end(bytes, i + 1);
                if end == i + 1 {
                    out.push(sigil as char);
                    i += 1;
                    continue;
                }
                let name = &part[i + 1..end];
                match mode {
                    ScopeBehaviour::Local => {
                        out.push_str(":local(");
                        out.push_str(&part[i..end]);
                        out.push(')');
                    }
                    ScopeBehaviour::Global => {
                        out.push_str(&part[i..end]);
                        localized.globals.insert(name.to_string());
                    }
                }
                i = end;
            }
            b'\\' => {
                let end = ident_end(bytes, i);
                out.push_str(&part[i..end]);
                i = end;
            }
            _ => {
                let len = part[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&part[i..i + len]);
                i += len;
            }
        }
    }
    out
}
