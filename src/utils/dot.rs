//! DOT format utilities for graph visualization.
//!
//! Used by [`crate::analysis::cfg::FlowGraph::to_dot`]; render the output with
//! Graphviz.

/// Escapes a string for safe use in DOT format labels and identifiers.
///
/// Statement renderings contain quotes (string constants) and angle brackets
/// (`<invalid>`, `<return address>`); both must be escaped inside record labels.
///
/// # Examples
///
/// ```rust
/// use classscope::utils::escape_dot;
///
/// let escaped = escape_dot("l1 := \"a<b>\"");
/// assert_eq!(escaped, "l1 := \\\"a\\<b\\>\\\"");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_dot_plain() {
        assert_eq!(escape_dot("l1 := (l1 + 1)"), "l1 := (l1 + 1)");
    }

    #[test]
    fn test_escape_dot_quotes() {
        assert_eq!(escape_dot("eval \"hello\""), "eval \\\"hello\\\"");
    }

    #[test]
    fn test_escape_dot_newlines() {
        assert_eq!(escape_dot("line1\nline2"), "line1\\nline2");
        assert_eq!(escape_dot("line1\r\nline2"), "line1\\nline2");
    }

    #[test]
    fn test_escape_dot_angle_brackets() {
        assert_eq!(escape_dot("<invalid>"), "\\<invalid\\>");
    }

    #[test]
    fn test_escape_dot_statement() {
        assert_eq!(
            escape_dot("l0 := \"x\"\nreturn <address>"),
            "l0 := \\\"x\\\"\\nreturn \\<address\\>"
        );
    }
}
