/// Attribute that marks an element as an include host.
pub const DEFAULT_INCLUDE_ATTRIBUTE: &str = "data-include";

/// Elements serialized without a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr",
];

/// Elements whose text children are emitted verbatim, not entity-escaped.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Placeholder written into a host element once every candidate path has
/// failed. Shows up in page source, not in rendered output.
pub fn failure_comment(path: &str) -> String {
    format!(" error: unable to load {path} (check path & casing; see log) ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_comment_names_the_path() {
        let comment = failure_comment("partials/Nav.html");
        assert!(comment.contains("partials/Nav.html"));
    }
}
