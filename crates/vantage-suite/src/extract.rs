//! Static extraction of coverage elements and semantic features from test
//! source text.
//!
//! This is lexical, not instrumented: identifiers that appear in a test body
//! stand in for the code elements it exercises. Callers with real coverage
//! data should build `TestCase::coverage` themselves and skip this module.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::SemanticFeatures;

/// Source of symbolic coverage for a single test body.
pub trait CoverageExtractor {
    fn extract(&self, source: &str) -> BTreeSet<String>;
}

const DEFAULT_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "False", "finally", "for", "from", "global", "if", "import", "in", "is",
    "lambda", "None", "nonlocal", "not", "or", "pass", "raise", "return", "True", "try",
    "while", "with", "yield",
];

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("static regex"))
}

/// Comments and string literals, matched in one left-to-right pass so a
/// quote inside a comment (or a `#` inside a string) is never misread.
/// Triple-quoted strings come first and may span lines; the others may not.
fn noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r#"(?s:"""(?:[^\\]|\\.)*?""")"#,
            r#"|(?s:'''(?:[^\\]|\\.)*?''')"#,
            r#"|#[^\n]*"#,
            r#"|"(?:[^"\\\n]|\\.)*""#,
            r#"|'(?:[^'\\\n]|\\.)*'"#,
        ))
        .expect("static regex")
    })
}

fn method_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.([A-Za-z_][A-Za-z0-9_]*)\(").expect("static regex"))
}

/// Blank out `#` comments and string literals.
fn strip_noise(source: &str) -> String {
    noise_re().replace_all(source, " ").into_owned()
}

/// Collects call names and variable names, minus language keywords.
#[derive(Debug, Clone)]
pub struct LexicalExtractor {
    keywords: BTreeSet<String>,
}

impl LexicalExtractor {
    pub fn new() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Replace the keyword set that is filtered out of the element set.
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for LexicalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageExtractor for LexicalExtractor {
    fn extract(&self, source: &str) -> BTreeSet<String> {
        let cleaned = strip_noise(source);
        identifier_re()
            .find_iter(&cleaned)
            .map(|m| m.as_str())
            .filter(|ident| !self.keywords.contains(*ident))
            .map(str::to_string)
            .collect()
    }
}

/// Compute semantic features for a test.
///
/// `known_functions` is the list of library functions a test name may
/// target; the first one contained in `test_name` wins.
pub fn extract_features(
    test_name: &str,
    source: &str,
    known_functions: &[String],
) -> SemanticFeatures {
    let cleaned = strip_noise(source);

    let assertion_count = identifier_re()
        .find_iter(&cleaned)
        .filter(|m| m.as_str() == "assert")
        .count() as u32;

    let target_function = known_functions
        .iter()
        .find(|f| test_name.contains(f.as_str()))
        .cloned();

    let unique_calls = method_call_re()
        .captures_iter(&cleaned)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| name != "raises")
        .collect();

    SemanticFeatures {
        assertion_count,
        raises_exception: cleaned.contains(".raises("),
        target_function,
        unique_calls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIVIDE_TEST: &str = r#"
def test_divide(self, calculator):
    # division by zero must raise
    assert calculator.divide(6, 3) == 2
    with pytest.raises(ValueError, match="Cannot divide"):
        calculator.divide(1, 0)
"#;

    #[test]
    fn test_lexical_extractor_collects_identifiers() {
        let elements = LexicalExtractor::new().extract(DIVIDE_TEST);
        assert!(elements.contains("calculator"));
        assert!(elements.contains("divide"));
        assert!(elements.contains("pytest"));
        assert!(elements.contains("ValueError"));
    }

    #[test]
    fn test_lexical_extractor_skips_keywords_comments_and_strings() {
        let elements = LexicalExtractor::new().extract(DIVIDE_TEST);
        assert!(!elements.contains("def"));
        assert!(!elements.contains("assert"));
        assert!(!elements.contains("must"));
        assert!(!elements.contains("Cannot"));
    }

    #[test]
    fn test_custom_keywords() {
        let elements = LexicalExtractor::with_keywords(["x"]).extract("x = y + z");
        let expected: BTreeSet<String> = ["y", "z"].iter().map(|s| s.to_string()).collect();
        assert_eq!(elements, expected);
    }

    #[test]
    fn test_extract_features() {
        let known = vec!["add".to_string(), "divide".to_string()];
        let features = extract_features("test_divide", DIVIDE_TEST, &known);
        assert_eq!(features.assertion_count, 1);
        assert!(features.raises_exception);
        assert_eq!(features.target_function.as_deref(), Some("divide"));
        assert_eq!(features.unique_calls.len(), 1);
        assert!(features.unique_calls.contains("divide"));
    }

    #[test]
    fn test_extract_features_without_target() {
        let features = extract_features("test_misc", "assert True\nassert 1", &[]);
        assert_eq!(features.assertion_count, 2);
        assert!(!features.raises_exception);
        assert!(features.target_function.is_none());
    }

    #[test]
    fn test_apostrophe_in_comment_does_not_hide_code() {
        let source = "# don't divide by zero\nresult = calculator.divide(6, 3)\nassert result == 2\nname = 'x'\n";
        let elements = LexicalExtractor::new().extract(source);
        assert!(elements.contains("divide"));
        assert!(elements.contains("result"));
        assert!(!elements.contains("don"));
        assert!(!elements.contains("x"));

        let features = extract_features("test_divide", source, &[]);
        assert_eq!(features.assertion_count, 1);
        assert!(features.unique_calls.contains("divide"));
    }

    #[test]
    fn test_hash_inside_string_is_not_a_comment() {
        let elements = LexicalExtractor::new().extract("label = \"#1\"; total = add(1, 2)");
        assert!(elements.contains("total"));
        assert!(elements.contains("add"));
    }

    #[test]
    fn test_triple_quoted_docstring_is_stripped() {
        let source = "def test_power(calc):\n    \"\"\"Power isn't\n    negative.\"\"\"\n    assert calc.power(2, 3) == 8\n";
        let elements = LexicalExtractor::new().extract(source);
        assert!(elements.contains("power"));
        assert!(!elements.contains("negative"));
        assert!(!elements.contains("isn"));
        assert_eq!(extract_features("test_power", source, &[]).assertion_count, 1);
    }
}
