//! Placeholder substitution for NXS template documents.
//!
//! Templates carry `$(name)` placeholders. A [`Variables`] table resolves
//! each placeholder from an explicit value, a computed special value or a
//! declared default; whatever stays unresolved triggers pruning of the
//! sub-trees that depend on it, so no dangling token ever reaches the
//! writer.

use std::collections::{BTreeMap, BTreeSet};

use nxs_xml::XmlDoc;
use thiserror::Error;
use tracing::debug;

/// Error type produced by template substitution.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The substituted template is not a well-formed artifact document.
    #[error(transparent)]
    Xml(#[from] nxs_xml::BuildError),
}

/// Final status of one placeholder after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarStatus {
    /// Replaced with an explicit or computed value.
    Resolved,
    /// Replaced with its declared default.
    Defaulted,
    /// Left unresolved; dependent nodes were pruned.
    Missing,
}

/// Value table for one substitution run.
///
/// Lookup precedence: explicit value, then computed special, then declared
/// default, then missing.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    explicit: BTreeMap<String, String>,
    special: BTreeMap<String, String>,
    defaults: BTreeMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Variables::default()
    }

    /// Record an explicit caller-supplied value.
    pub fn set(&mut self, name: &str, value: &str) {
        self.explicit.insert(name.to_string(), value.to_string());
    }

    /// Record a computed special value (bus host, store identity, ...).
    pub fn set_special(&mut self, name: &str, value: &str) {
        self.special.insert(name.to_string(), value.to_string());
    }

    /// Record a declared default.
    pub fn set_default(&mut self, name: &str, value: &str) {
        self.defaults.insert(name.to_string(), value.to_string());
    }

    fn resolve(&self, name: &str) -> (Option<&str>, VarStatus) {
        if let Some(value) = self.explicit.get(name) {
            return (Some(value), VarStatus::Resolved);
        }
        if let Some(value) = self.special.get(name) {
            return (Some(value), VarStatus::Resolved);
        }
        if let Some(value) = self.defaults.get(name) {
            return (Some(value), VarStatus::Defaulted);
        }
        (None, VarStatus::Missing)
    }
}

/// Outcome of one substitution run.
#[derive(Debug, Clone)]
pub struct Substitution {
    /// Rewritten template text with pruning applied.
    pub text: String,
    /// Final status per placeholder found in the template.
    pub statuses: BTreeMap<String, VarStatus>,
}

impl Substitution {
    /// Names of the placeholders left missing, for diagnostic printing.
    pub fn missing(&self) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|(_, status)| **status == VarStatus::Missing)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Collect the placeholder names referenced by `text`.
pub fn placeholders(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut rest = text;
    while let Some(start) = rest.find("$(") {
        let after = &rest[start + 2..];
        match after.find(')') {
            Some(end) => {
                out.insert(after[..end].to_string());
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    out
}

fn replace_token(text: &str, name: &str, value: &str) -> String {
    text.replace(&format!("$({name})"), value)
}

fn strip_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("$(") {
        let after = &rest[start + 2..];
        match after.find(')') {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Substitute `vars` into `template` and prune dead branches.
///
/// Every placeholder either appears resolved or defaulted in the output, or
/// is absent from the output entirely: nodes depending on a missing
/// placeholder are removed (`attribute`/`field`/`link` matched on text
/// content, `group` matched on its `name` attribute), residual tokens are
/// stripped defensively and now-blank text is dropped. The result does not
/// depend on placeholder processing order, and running the engine again on
/// its own output changes nothing.
pub fn substitute(template: &str, vars: &Variables) -> Result<Substitution, TemplateError> {
    let names = placeholders(template);
    let mut statuses = BTreeMap::new();
    let mut text = template.to_string();
    let mut missing: BTreeSet<String> = BTreeSet::new();

    for name in names {
        let (value, status) = vars.resolve(&name);
        if let Some(value) = value {
            text = replace_token(&text, &name, value);
        } else {
            missing.insert(name.clone());
        }
        statuses.insert(name, status);
    }

    if missing.is_empty() {
        return Ok(Substitution { text, statuses });
    }
    debug!(missing = ?missing, "pruning branches with unresolved placeholders");

    let tokens: Vec<String> = missing.iter().map(|name| format!("$({name})")).collect();
    let doc = XmlDoc::parse(&text)?;
    let pruned = doc.retain(|doc, id| {
        let Some(tag) = doc.tag(id) else { return true };
        match tag {
            "attribute" | "field" | "link" => {
                let content = doc.subtree_text(id);
                !tokens.iter().any(|token| content.contains(token.as_str()))
            }
            "group" => {
                let name = doc.attr(id, "name").unwrap_or_default();
                !tokens.iter().any(|token| name.contains(token.as_str()))
            }
            _ => true,
        }
    });
    let cleaned = pruned
        .rewrite_text(|content| {
            let stripped = strip_tokens(content);
            if stripped.trim().is_empty() {
                None
            } else {
                Some(stripped)
            }
        })
        .rewrite_attrs(|_, value| strip_tokens(value));

    Ok(Substitution {
        text: cleaned.to_xml(),
        statuses,
    })
}
