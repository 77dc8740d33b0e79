//! Splitting raw input into individual queries.

use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::template::TemplateRenderer;

/// Split input on `;` and drop blank statements. Whitespace around each
/// statement is trimmed.
pub fn split_queries(input: &str) -> Vec<&str> {
    input
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split input and render every statement as a template over `vars`.
///
/// Fails on the first statement that does not render; the error names its
/// position so the user can find it in a multi-statement file.
pub fn render_queries(
    input: &str,
    vars: &BTreeMap<String, String>,
) -> Result<Vec<String>, CoreError> {
    let renderer = TemplateRenderer::new();
    split_queries(input)
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            renderer.render_query(raw, vars).map_err(|e| {
                CoreError::Template(format!("could not render query #{}: {}", i + 1, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drops_empty_statements() {
        let input = "SELECT 1;\n\n  SELECT 2 ;;\n  ;";
        assert_eq!(split_queries(input), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn split_without_semicolon() {
        assert_eq!(split_queries("  SELECT 1\n"), vec!["SELECT 1"]);
        assert!(split_queries("  \n\t").is_empty());
    }

    #[test]
    fn render_all_statements() {
        let mut vars = BTreeMap::new();
        vars.insert("TABLE".to_string(), "events".to_string());

        let queries = render_queries("SELECT 1 FROM {{ TABLE }}; SELECT 2", &vars).unwrap();
        assert_eq!(queries, vec!["SELECT 1 FROM events", "SELECT 2"]);
    }

    #[test]
    fn render_error_names_statement() {
        let err = render_queries("SELECT 1; SELECT '{{ MISSING }}'", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("query #2"));
    }
}
