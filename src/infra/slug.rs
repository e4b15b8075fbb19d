//! File name and URI helpers.

use std::path::{Component, Path};

/// Longest file name (in bytes) produced by [`valid_file_name`].
const MAX_FILE_NAME_BYTES: usize = 240;

/// Characters rejected by common file systems.
const ILLEGAL_CHARS: &[char] = &['/', '\\', '?', '*', ':', '|', '"', '<', '>'];

/// Lower-cases a title and collapses whitespace runs into single dashes.
///
/// ```
/// use mdnotes::infra::dash_title;
///
/// assert_eq!(dash_title("Climate Change  Report"), "climate-change-report");
/// ```
pub fn dash_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Makes an arbitrary string safe to use as a file name.
///
/// - Drops characters illegal on common file systems
/// - Replaces control characters (newlines, tabs) with spaces
/// - Trims surrounding whitespace and leading dots
/// - Truncates overly long names at a character boundary
/// - Returns "untitled" for empty results
///
/// ```
/// use mdnotes::infra::valid_file_name;
///
/// assert_eq!(valid_file_name("Q&A: what/why?"), "Q&A whatwhy");
/// assert_eq!(valid_file_name("..."), "untitled");
/// ```
pub fn valid_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    let trimmed = cleaned.trim().trim_start_matches('.').trim_start();
    if trimmed.is_empty() {
        return "untitled".to_string();
    }

    if trimmed.len() <= MAX_FILE_NAME_BYTES {
        return trimmed.to_string();
    }

    let mut end = MAX_FILE_NAME_BYTES;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].trim_end().to_string()
}

/// Converts an absolute path to a `file://` URI, percent-encoding each segment.
///
/// ```
/// use std::path::Path;
/// use mdnotes::infra::path_to_file_uri;
///
/// assert_eq!(
///     path_to_file_uri(Path::new("/papers/My Report.pdf")),
///     "file:///papers/My%20Report.pdf"
/// );
/// ```
pub fn path_to_file_uri(path: &Path) -> String {
    let mut uri = String::from("file://");
    for component in path.components() {
        match component {
            Component::RootDir => {}
            Component::Prefix(prefix) => {
                uri.push('/');
                uri.push_str(&prefix.as_os_str().to_string_lossy());
            }
            other => {
                uri.push('/');
                uri.push_str(&urlencoding::encode(&other.as_os_str().to_string_lossy()));
            }
        }
    }
    uri
}

/// Percent-encodes a file name for use inside a URI query.
pub fn encode_file_path(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_title_lowercases_and_dashes() {
        assert_eq!(dash_title("Climate Change Report"), "climate-change-report");
        assert_eq!(dash_title("  Tabs\tand\nNewlines "), "tabs-and-newlines");
    }

    #[test]
    fn dash_title_keeps_punctuation() {
        assert_eq!(dash_title("Q&A: Notes"), "q&a:-notes");
    }

    #[test]
    fn valid_file_name_removes_illegal_characters() {
        assert_eq!(valid_file_name("a/b\\c?d*e:f|g\"h<i>j"), "abcdefghij");
    }

    #[test]
    fn valid_file_name_replaces_control_characters() {
        assert_eq!(valid_file_name("line\nbreak\ttab"), "line break tab");
    }

    #[test]
    fn valid_file_name_strips_leading_dots() {
        assert_eq!(valid_file_name(".hidden"), "hidden");
        assert_eq!(valid_file_name("  ..name "), "name");
    }

    #[test]
    fn valid_file_name_preserves_case_and_spaces() {
        assert_eq!(valid_file_name("Climate Change Report"), "Climate Change Report");
    }

    #[test]
    fn valid_file_name_empty_returns_untitled() {
        assert_eq!(valid_file_name(""), "untitled");
        assert_eq!(valid_file_name("///"), "untitled");
    }

    #[test]
    fn valid_file_name_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let result = valid_file_name(&long);
        assert!(result.len() <= MAX_FILE_NAME_BYTES);
        assert!(result.chars().all(|c| c == 'é'));
    }

    #[test]
    fn file_uri_encodes_segments() {
        assert_eq!(
            path_to_file_uri(Path::new("/a b/c#d.pdf")),
            "file:///a%20b/c%23d.pdf"
        );
    }

    #[test]
    fn encode_file_path_escapes_spaces() {
        assert_eq!(encode_file_path("My Note - Reading"), "My%20Note%20-%20Reading");
    }
}
