//! Value and debug-line rendering (§6).
//!
//! [`Value`]'s own `Display` impl is the single source of truth for how a
//! value is rendered; this module only adds the debug-line wrapper format so
//! there's exactly one place that knows it.

use crate::value::Value;

/// Formats one `dbg` print: `dbg(u:<universe>,l:<line>): <rendered value>`.
///
/// Takes anything `Display`, not just [`Value`]: a `dbg` of a not-yet-
/// resolvable expression prints the expression's own syntactic rendering
/// (see `Expr`'s `Display` impl) rather than a value.
#[must_use]
pub fn debug_line(universe: &str, line: Option<u32>, value: impl std::fmt::Display) -> String {
    let line = line.map_or_else(String::new, |l| l.to_string());
    format!("dbg(u:{universe},l:{line}): {value}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn debug_line_matches_spec_format() {
        let line = debug_line("root", Some(3), &Value::Integer(5));
        assert_eq!(line, "dbg(u:root,l:3): 5");
    }

    #[test]
    fn debug_line_with_no_source_line() {
        let line = debug_line("root-0", None, &Value::Boolean(true));
        assert_eq!(line, "dbg(u:root-0,l:): true");
    }
}
