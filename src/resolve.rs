use std::sync::LazyLock;

use regex::Regex;

use crate::{level::LogLevel, package_tree::PackageTree};

/// A well-formed name segment. Anything else (closure markers, generic or
/// impl artifacts, empty segments) ends the usable portion of a caller name.
static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Splits a caller name into its usable segments.
///
/// Both `.` and `::` delimit, so Rust module paths and dotted package names
/// resolve through the same tree. The name is truncated at the first segment
/// that is not a plain identifier, reducing compiler-synthetic call sites
/// such as `app::worker::{{closure}}` to their nearest enclosing namespace.
pub(crate) fn segments(name: &str) -> impl Iterator<Item = &str> {
    name.split("::")
        .flat_map(|part| part.split('.'))
        .take_while(|segment| SEGMENT.is_match(segment))
}

/// Computes the configured level for `name`, or `None` when nothing along
/// its path is configured and the caller should fall back to the process
/// default.
///
/// Two passes. The descendant pass walks the exact segment chain down from
/// the root, remembering the deepest explicit level it crosses; it stops
/// quietly at the first missing segment. Only when that pass finds nothing
/// does the ancestor pass walk parent links up from the deepest node reached,
/// returning the first explicit level it meets (the root's own level, when
/// one is set).
pub fn resolve(tree: &PackageTree, name: &str) -> Option<LogLevel> {
    let mut remembered = None;
    let mut node = tree.root();
    for segment in segments(name) {
        match tree.child(node, segment) {
            Some(child) => {
                node = child;
                if let Some(level) = tree.level(child) {
                    remembered = Some(level);
                }
            }
            None => break,
        }
    }
    if remembered.is_some() {
        return remembered;
    }

    // Ancestor pass, from the node for the full name when it exists, else
    // from the deepest node the descent reached.
    let start = tree.get(segments(name)).unwrap_or(node);
    let mut current = Some(start);
    while let Some(id) = current {
        if let Some(level) = tree.level(id) {
            return Some(level);
        }
        current = tree.parent(id);
    }
    None
}
