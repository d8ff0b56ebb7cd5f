//! Shared search machinery: shell-glob compilation and line scanning.
//!
//! Memory Store, Disk Store, and the sandbox relay all search through the
//! helpers here, so pattern semantics are defined once: `*` matches within
//! a path component, `**` spans components, `?` matches one character.

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;

use crate::error::{BackendError, BackendResult};
use crate::record::SearchMatch;

/// Compile a shell glob with component-aware `*`.
pub fn compile_glob(pattern: &str) -> BackendResult<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| BackendError::invalid_pattern(format!("bad glob {pattern:?}: {e}")))
}

/// Compile a grep pattern, surfacing the regex diagnostic on failure.
pub fn compile_pattern(pattern: &str) -> BackendResult<Regex> {
    Regex::new(pattern).map_err(|e| BackendError::invalid_pattern(e.to_string()))
}

/// Scan one file's content, appending a [`SearchMatch`] per matching line.
pub fn scan_lines(re: &Regex, path: &str, content: &str, out: &mut Vec<SearchMatch>) {
    for (idx, line) in content.lines().enumerate() {
        if re.is_match(line) {
            out.push(SearchMatch {
                path: path.to_string(),
                line: idx + 1,
                text: line.to_string(),
            });
        }
    }
}

/// Order matches by path, then line number.
pub fn sort_matches(matches: &mut [SearchMatch]) {
    matches.sort_by(|a, b| a.path.cmp(&b.path).then(a.line.cmp(&b.line)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_stays_within_component() {
        let m = compile_glob("*.py").unwrap();
        assert!(m.is_match("main.py"));
        assert!(!m.is_match("src/main.py"));
    }

    #[test]
    fn double_star_spans_components() {
        let m = compile_glob("**/*.py").unwrap();
        assert!(m.is_match("main.py"));
        assert!(m.is_match("src/deep/main.py"));
        assert!(!m.is_match("main.rs"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        let m = compile_glob("file?.txt").unwrap();
        assert!(m.is_match("file1.txt"));
        assert!(!m.is_match("file12.txt"));
    }

    #[test]
    fn invalid_pattern_is_a_diagnostic() {
        let err = compile_pattern("[invalid").unwrap_err();
        assert!(matches!(err, BackendError::InvalidPattern(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn scan_reports_one_indexed_lines() {
        let re = compile_pattern("world").unwrap();
        let mut out = Vec::new();
        scan_lines(&re, "/f.txt", "hello world\nnothing\ngoodbye world", &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].line, 1);
        assert_eq!(out[1].line, 3);
        assert_eq!(out[1].text, "goodbye world");
    }

    #[test]
    fn matches_sort_by_path_then_line() {
        let mut matches = vec![
            SearchMatch { path: "/b".into(), line: 1, text: String::new() },
            SearchMatch { path: "/a".into(), line: 2, text: String::new() },
            SearchMatch { path: "/a".into(), line: 1, text: String::new() },
        ];
        sort_matches(&mut matches);
        assert_eq!(matches[0].path, "/a");
        assert_eq!(matches[0].line, 1);
        assert_eq!(matches[2].path, "/b");
    }
}
