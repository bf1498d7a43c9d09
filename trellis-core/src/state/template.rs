//! Template Tags
//!
//! Text templates reference state with `{{ dotted.path }}` tags. A tag is
//! `{{`, optional whitespace, one or more word characters or dots, optional
//! whitespace, then `}}`. Anything else, including expressions, is left as
//! literal text.

use std::sync::OnceLock;

use regex::Regex;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("tag pattern is valid"))
}

/// Check whether text contains at least one tag.
pub fn has_tags(text: &str) -> bool {
    tag_pattern().is_match(text)
}

/// The trimmed paths of every tag in `text`, in order, duplicates included.
pub fn tag_paths(text: &str) -> Vec<&str> {
    tag_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Substitute every tag in `template` with `resolve(path)`.
pub fn render<F>(template: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> String,
{
    tag_pattern()
        .replace_all(template, |caps: &regex::Captures<'_>| resolve(&caps[1]))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_tags_with_and_without_whitespace() {
        let paths = tag_paths("{{a.b}} and {{  c  }} and {{a.b}}");
        assert_eq!(paths, vec!["a.b", "c", "a.b"]);
    }

    #[test]
    fn ignores_expressions_and_partial_tags() {
        assert!(!has_tags("{{ a + b }}"));
        assert!(!has_tags("{{a"));
        assert!(!has_tags("{ {a} }"));
        assert!(has_tags("x{{a}}y"));
    }

    #[test]
    fn render_replaces_every_tag() {
        let out = render("Hello {{user.name}} ({{ user.role }})", |path| match path {
            "user.name" => "Alice".to_string(),
            "user.role" => "admin".to_string(),
            _ => String::new(),
        });
        assert_eq!(out, "Hello Alice (admin)");
    }
}
