//! Nexus path parsing helpers.
//!
//! A Nexus path addresses a field inside nested NeXus groups using
//! `/`-separated segments with optional `name:NXtype` annotations, e.g.
//! `scan:NXentry/instrument/collection:NXcollection/position`. All segments
//! but the last describe group levels; the last segment names the field.

/// One group level of a parsed Nexus path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGroup {
    /// Group name, e.g. `instrument`.
    pub name: String,
    /// NeXus class of the group, always `NX`-prefixed, e.g. `NXinstrument`.
    pub nx_type: String,
}

/// A parsed Nexus path: ordered group levels plus the leaf field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NexusPath {
    /// Group levels from outermost to innermost.
    pub groups: Vec<PathGroup>,
    /// Leaf field name, `None` for an empty path (callers substitute their
    /// own default).
    pub field: Option<String>,
}

/// Parse a Nexus path string.
///
/// Annotation rules per segment:
/// - `name:NXtype` keeps both parts as given;
/// - `:NXfoo` infers the name from the type suffix, giving `("foo", "NXfoo")`;
/// - a bare `NXfoo` is split into `("foo", "NXfoo")`;
/// - a bare `foo` infers the type, giving `("foo", "NXfoo")`.
///
/// The last segment is taken verbatim as the field name (a `name:type`
/// annotation on it is reduced to the name). Empty segments from doubled or
/// trailing slashes are skipped. Parsing never fails; malformed input
/// degrades to a best-effort interpretation.
pub fn parse_path(path: &str) -> NexusPath {
    let segments: Vec<&str> = path
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut parsed = NexusPath::default();
    let Some((last, groups)) = segments.split_last() else {
        return parsed;
    };

    for segment in groups {
        parsed.groups.push(parse_group(segment));
    }
    parsed.field = Some(leaf_name(last));
    parsed
}

fn parse_group(segment: &str) -> PathGroup {
    if let Some((name, nx_type)) = segment.split_once(':') {
        let nx_type = nx_type.trim();
        let name = name.trim();
        if name.is_empty() {
            return PathGroup {
                name: nx_type.strip_prefix("NX").unwrap_or(nx_type).to_string(),
                nx_type: nx_type.to_string(),
            };
        }
        return PathGroup {
            name: name.to_string(),
            nx_type: nx_type.to_string(),
        };
    }
    if let Some(suffix) = segment.strip_prefix("NX") {
        return PathGroup {
            name: suffix.to_string(),
            nx_type: segment.to_string(),
        };
    }
    PathGroup {
        name: segment.to_string(),
        nx_type: format!("NX{segment}"),
    }
}

fn leaf_name(segment: &str) -> String {
    match segment.split_once(':') {
        Some((name, _)) if !name.trim().is_empty() => name.trim().to_string(),
        _ => segment.to_string(),
    }
}
