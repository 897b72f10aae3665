use crate::types::{Category, Priority};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// A single marker found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    /// Pattern label, e.g. `TODO`, `FIXME`, `Unchecked Task`.
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    /// Path relative to the scan root, always `/`-separated.
    pub file: String,
    /// 1-based line containing the start of the match.
    pub line: usize,
    pub priority: Priority,
    pub category: Category,
    pub raw_text: String,
}

impl TodoItem {
    /// Stable identity used to diff scans: MD5 of `file:line:type:content`.
    pub fn hash(&self) -> String {
        let mut hasher = Md5::new();
        hasher.update(
            format!("{}:{}:{}:{}", self.file, self.line, self.kind, self.content).as_bytes(),
        );
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

pub const UNCHECKED_TASK: &str = "Unchecked Task";

/// State of a leading markdown checkbox: `Some(true)` for `- [x]`,
/// `Some(false)` for `- [ ]`, `None` if the text doesn't start with one.
pub fn checkbox_state(text: &str) -> Option<bool> {
    let rest = text.trim_start();
    let rest = rest
        .strip_prefix('-')
        .or_else(|| rest.strip_prefix('*'))
        .or_else(|| rest.strip_prefix('+'))?;
    let rest = rest.trim_start();
    let inner = rest.strip_prefix('[')?;
    let mut chars = inner.chars();
    let mark = chars.next()?;
    if chars.next()? != ']' {
        return None;
    }
    match mark {
        'x' | 'X' => Some(true),
        ' ' => Some(false),
        _ => None,
    }
}

/// Collapse a captured marker body into a single tidy line: drop trailing
/// comment closers, squeeze whitespace.
pub fn normalize_content(raw: &str) -> String {
    let mut text = raw.trim();
    for closer in ["*/", "-->"] {
        if let Some(stripped) = text.strip_suffix(closer) {
            text = stripped.trim_end();
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn item(file: &str, line: usize, content: &str) -> TodoItem {
        TodoItem {
            kind: "TODO".to_string(),
            content: content.to_string(),
            file: file.to_string(),
            line,
            priority: Priority::Medium,
            category: Category::Code,
            raw_text: format!("// TODO: {content}"),
        }
    }

    #[test]
    fn hash_is_md5_of_identity_fields() {
        let todo = item("src/a.ts", 5, "fix this");
        let mut hasher = Md5::new();
        hasher.update(b"src/a.ts:5:TODO:fix this");
        let expected: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        assert_eq!(todo.hash(), expected);
        assert_eq!(todo.hash().len(), 32);
    }

    #[test]
    fn hash_ignores_raw_text_and_priority() {
        let a = item("src/a.ts", 5, "fix this");
        let mut b = a.clone();
        b.raw_text = "#   TODO   fix this".to_string();
        b.priority = Priority::High;
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), item("src/a.ts", 6, "fix this").hash());
    }

    #[test]
    fn checkbox_detection() {
        assert_eq!(checkbox_state("- [x] Ship it"), Some(true));
        assert_eq!(checkbox_state("  * [X] Ship it"), Some(true));
        assert_eq!(checkbox_state("- [ ] Ship it"), Some(false));
        assert_eq!(checkbox_state("- Ship [x] it"), None);
        assert_eq!(checkbox_state("// TODO: [x]"), None);
    }

    #[test]
    fn normalize_strips_closers_and_whitespace() {
        assert_eq!(normalize_content("  clean   up  */"), "clean up");
        assert_eq!(normalize_content("remove banner -->"), "remove banner");
        assert_eq!(normalize_content("fix this\r"), "fix this");
    }

    #[test]
    fn serializes_with_type_key() {
        let json = serde_json::to_value(item("a.rs", 1, "x")).unwrap();
        assert_eq!(json["type"], "TODO");
        assert_eq!(json["rawText"], "// TODO: x");
        assert_eq!(json["priority"], "medium");
    }
}
