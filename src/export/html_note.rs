//! Conversion of HTML note bodies to Markdown.
//!
//! The first block of a note is its title. Every later block is rewritten:
//! anchors become Markdown links, then the configured tag table is applied in
//! one pass over the block's inner markup, and the resulting text is emitted
//! according to the block's shape (heading quote, quote, list, paragraph).

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex, RegexBuilder};
use scraper::{ElementRef, Html, Node};

use super::config::ExportConfig;

/// Marker used for ordered list items.
const ORDERED_MARKER: &str = "1.";

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("valid parenthesis pattern"));

/// A note body converted to Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkdownNote {
    pub title: String,
    pub body: String,
}

/// Literal tag replacements applied in a single case-insensitive pass.
#[derive(Debug, Clone)]
pub struct TagReplacer {
    pattern: Option<Regex>,
    tokens: HashMap<String, String>,
}

impl TagReplacer {
    /// Compiles the table into one alternation, longest tags first so that
    /// `<br><br>` wins over a shorter tag starting at the same position.
    pub fn new(table: &[(String, String)]) -> Self {
        let mut tags: Vec<&str> = table
            .iter()
            .map(|(tag, _)| tag.as_str())
            .filter(|tag| !tag.is_empty())
            .collect();
        tags.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        tags.dedup();

        let tokens = table
            .iter()
            .map(|(tag, token)| (tag.to_lowercase(), token.clone()))
            .collect();

        let pattern = if tags.is_empty() {
            None
        } else {
            let alternation = tags
                .iter()
                .map(|tag| regex::escape(tag))
                .collect::<Vec<_>>()
                .join("|");
            RegexBuilder::new(&alternation)
                .case_insensitive(true)
                .build()
                .ok()
        };

        Self { pattern, tokens }
    }

    pub fn replace(&self, markup: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern
                .replace_all(markup, |caps: &Captures| {
                    self.tokens
                        .get(&caps[0].to_lowercase())
                        .cloned()
                        .unwrap_or_default()
                })
                .into_owned(),
            None => markup.to_string(),
        }
    }
}

/// Converts note HTML to Markdown using the run's tag table and bullet.
#[derive(Debug, Clone)]
pub struct NoteNormalizer {
    replacer: TagReplacer,
    bullet: String,
}

impl NoteNormalizer {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            replacer: TagReplacer::new(&config.html_to_md),
            bullet: config.bullet.clone(),
        }
    }

    /// Splits a note into its formatted title and Markdown body.
    pub fn normalize(&self, html: &str) -> MarkdownNote {
        let fragment = Html::parse_fragment(html);
        let mut blocks = top_level_blocks(&fragment).into_iter();

        let title = blocks
            .next()
            .map(|block| format_note_title(block.text().trim()))
            .unwrap_or_default();

        let body = blocks
            .filter_map(|block| match block {
                Block::Element(el) => Some(self.render_block(el)),
                Block::Text(_) => None,
            })
            .collect();

        MarkdownNote { title, body }
    }

    fn render_block(&self, block: ElementRef) -> String {
        let inner = serialize_children(block);
        if inner.is_empty() {
            return String::new();
        }

        let markup = self.replacer.replace(&inner);

        if markup.starts_with("\"#") {
            let text = fragment_text(&markup);
            return format!("{}\n\n", unwrap_quoted(&text));
        }

        if markup.starts_with('"') {
            return format!("> {}\n\n", fragment_text(&markup));
        }

        match block.value().name() {
            "ul" => render_list(&markup, &self.bullet),
            "ol" => render_list(&markup, ORDERED_MARKER),
            _ => format!("{}\n\n", fragment_text(&markup)),
        }
    }
}

/// Extracts only the formatted title of a note.
pub fn note_title(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    top_level_blocks(&fragment)
        .into_iter()
        .next()
        .map(|block| format_note_title(block.text().trim()))
        .unwrap_or_default()
}

/// Normalizes a note title for use as a file name.
///
/// A parenthesized date is rewritten as `YYYY-MM-DD`; a title with other
/// parenthesized text is kept as is; otherwise `/` and `:` become `-`.
///
/// ```
/// use mdnotes::export::format_note_title;
///
/// assert_eq!(format_note_title("Report (June 5, 2020) final"), "Report (2020-06-05) final");
/// assert_eq!(format_note_title("Findings (draft)"), "Findings (draft)");
/// assert_eq!(format_note_title("Q1/Q2: summary"), "Q1-Q2- summary");
/// ```
pub fn format_note_title(title: &str) -> String {
    let Some(caps) = PARENTHESIZED.captures(title) else {
        return title.replace(['/', ':'], "-");
    };

    let inner = &caps[1];
    match parse_calendar_date(inner) {
        Some(date) => title.replacen(inner, &date.format("%Y-%m-%d").to_string(), 1),
        None => title.to_string(),
    }
}

/// Parses the common human and ISO date spellings, keeping the written
/// calendar day regardless of any offset.
fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%B %d, %Y",
        "%B %d %Y",
        "%d %B %Y",
        "%d %B, %Y",
        "%A, %B %d, %Y",
        "%a %b %d %Y",
    ];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| NaiveDate::parse_from_str(&format!("1 {raw}"), "%d %B %Y").ok())
}

/// A top-level piece of a note.
enum Block<'a> {
    Text(String),
    Element(ElementRef<'a>),
}

impl Block<'_> {
    fn text(&self) -> String {
        match self {
            Block::Text(text) => text.clone(),
            Block::Element(el) => el.text().collect(),
        }
    }
}

/// Top-level blocks of a note, skipping blank text and comments.
///
/// A single wrapping `<div data-schema-version>` is unwrapped.
fn top_level_blocks(fragment: &Html) -> Vec<Block<'_>> {
    let blocks = child_blocks(fragment.root_element());

    if let [Block::Element(wrapper)] = blocks.as_slice()
        && wrapper.value().name() == "div"
        && wrapper.value().attr("data-schema-version").is_some()
    {
        return child_blocks(*wrapper);
    }

    blocks
}

fn child_blocks(parent: ElementRef<'_>) -> Vec<Block<'_>> {
    parent
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) if !text.trim().is_empty() => Some(Block::Text(text.to_string())),
            Node::Element(_) => ElementRef::wrap(child).map(Block::Element),
            _ => None,
        })
        .collect()
}

/// Inner markup of an element with anchors rewritten as `[text](href)`.
fn serialize_children(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    write_children(element, &mut out);
    out
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => escape_text(text, out),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    write_element(el, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    if name == "a" {
        let text: String = el.text().collect();
        let href = el.value().attr("href").unwrap_or("");
        escape_text(&format!("[{text}]({href})"), out);
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in el.value().attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&value.replace('&', "&amp;").replace('"', "&quot;"));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    write_children(el, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

/// Text content of a markup fragment.
fn fragment_text(markup: &str) -> String {
    Html::parse_fragment(markup).root_element().text().collect()
}

/// Each `<li>` on its own line behind the marker.
fn render_list(markup: &str, marker: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let items: Vec<String> = fragment
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "li")
        .map(|li| format!("{marker} {}", li.text().collect::<String>().trim()))
        .collect();

    if items.is_empty() {
        return format!("{}\n\n", fragment_text(markup));
    }
    format!("{}\n\n", items.join("\n"))
}

/// Text between the leading quote and the last quote.
fn unwrap_quoted(text: &str) -> &str {
    let rest = text.strip_prefix('"').unwrap_or(text);
    match rest.rfind('"') {
        Some(end) => &rest[..end],
        None => rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalizer() -> NoteNormalizer {
        NoteNormalizer::new(&ExportConfig::default())
    }

    fn normalizer_with_bullet(bullet: &str) -> NoteNormalizer {
        let config = ExportConfig {
            bullet: bullet.to_string(),
            ..ExportConfig::default()
        };
        NoteNormalizer::new(&config)
    }

    // ===========================================
    // Title formatting
    // ===========================================

    #[test]
    fn title_date_in_parentheses_becomes_iso() {
        assert_eq!(
            format_note_title("Report (June 5, 2020) final"),
            "Report (2020-06-05) final"
        );
    }

    #[test]
    fn title_with_non_date_parentheses_is_unchanged() {
        assert_eq!(format_note_title("Findings (draft)"), "Findings (draft)");
        assert_eq!(format_note_title("a/b (draft)"), "a/b (draft)");
    }

    #[test]
    fn title_without_parentheses_replaces_unsafe_characters() {
        assert_eq!(format_note_title("Notes: part 1/2"), "Notes- part 1-2");
    }

    #[test]
    fn title_accepts_iso_and_numeric_dates() {
        assert_eq!(format_note_title("Log (2021-03-04)"), "Log (2021-03-04)");
        assert_eq!(format_note_title("Log (3/4/2021)"), "Log (2021-03-04)");
        assert_eq!(format_note_title("Log (4 March 2021)"), "Log (2021-03-04)");
    }

    #[test]
    fn title_datetime_keeps_written_day() {
        assert_eq!(
            format_note_title("Call (2021-03-04T23:30:00-08:00)"),
            "Call (2021-03-04)"
        );
    }

    #[test]
    fn title_only_first_parenthesized_substring_is_considered() {
        assert_eq!(
            format_note_title("Minutes (draft) (June 5, 2020)"),
            "Minutes (draft) (June 5, 2020)"
        );
    }

    #[test]
    fn title_invalid_calendar_day_is_untouched() {
        assert_eq!(format_note_title("Plan (February 30, 2020)"), "Plan (February 30, 2020)");
    }

    // ===========================================
    // Tag replacement
    // ===========================================

    #[test]
    fn tag_replacer_is_case_insensitive() {
        let replacer = TagReplacer::new(&ExportConfig::default().html_to_md);
        assert_eq!(replacer.replace("<STRONG>x</Strong>"), "**x**");
    }

    #[test]
    fn tag_replacer_prefers_longest_match() {
        let table = vec![
            ("<br>".to_string(), " ".to_string()),
            ("<br><br>".to_string(), "\n\n".to_string()),
        ];
        let replacer = TagReplacer::new(&table);
        assert_eq!(replacer.replace("a<br><br>b<br>c"), "a\n\nb c");
    }

    #[test]
    fn tag_replacer_single_pass_does_not_rescan_output() {
        let table = vec![
            ("<em>".to_string(), "<strong>".to_string()),
            ("<strong>".to_string(), "**".to_string()),
        ];
        let replacer = TagReplacer::new(&table);
        assert_eq!(replacer.replace("<em>x"), "<strong>x");
    }

    #[test]
    fn empty_table_leaves_markup_alone() {
        let replacer = TagReplacer::new(&[]);
        assert_eq!(replacer.replace("<p>x</p>"), "<p>x</p>");
    }

    // ===========================================
    // Blocks
    // ===========================================

    #[test]
    fn first_block_is_title_not_body() {
        let note = normalizer().normalize("<p>My Title</p><p>Body text</p>");
        assert_eq!(note.title, "My Title");
        assert_eq!(note.body, "Body text\n\n");
    }

    #[test]
    fn inline_formatting_uses_tag_table() {
        let note = normalizer().normalize(
            "<h1>T</h1><p>Some <strong>bold</strong> and <em>italic</em> text</p>",
        );
        assert_eq!(note.body, "Some **bold** and *italic* text\n\n");
    }

    #[test]
    fn underline_becomes_heading_prefix() {
        let note = normalizer().normalize("<p>T</p><p><u>Section</u></p>");
        assert_eq!(note.body, "#### Section\n\n");
    }

    #[test]
    fn anchors_become_markdown_links() {
        let note = normalizer()
            .normalize(r#"<p>T</p><p>See <a href="https://example.com/x">the site</a>.</p>"#);
        assert_eq!(note.body, "See [the site](https://example.com/x).\n\n");
    }

    #[test]
    fn quoted_block_becomes_blockquote() {
        let note = normalizer().normalize("<p>T</p><p>\"A highlighted passage\" (p. 4)</p>");
        assert_eq!(note.body, "> \"A highlighted passage\" (p. 4)\n\n");
    }

    #[test]
    fn heading_quote_is_unwrapped() {
        let note = normalizer().normalize("<p>T</p><p>\"#Methods\" (p. 2)</p>");
        assert_eq!(note.body, "#Methods\n\n");
    }

    #[test]
    fn unordered_list_uses_bullet_per_line() {
        let note = normalizer_with_bullet("-").normalize("<p>T</p><ul><li>a</li><li>b</li></ul>");
        assert_eq!(note.body, "- a\n- b\n\n");
    }

    #[test]
    fn ordered_list_uses_literal_one() {
        let note = normalizer().normalize("<p>T</p><ol><li>first</li><li>second</li></ol>");
        assert_eq!(note.body, "1. first\n1. second\n\n");
    }

    #[test]
    fn list_items_keep_inline_formatting() {
        let note =
            normalizer_with_bullet("*").normalize("<p>T</p><ul><li><b>key</b> point</li></ul>");
        assert_eq!(note.body, "* **key** point\n\n");
    }

    #[test]
    fn double_break_becomes_paragraph_gap() {
        let note = normalizer().normalize("<p>T</p><div>one<br><br>two</div>");
        assert_eq!(note.body, "one\n\ntwo\n\n");
    }

    #[test]
    fn empty_blocks_contribute_nothing() {
        let note = normalizer().normalize("<p>T</p><p></p>\n<p>kept</p>");
        assert_eq!(note.body, "kept\n\n");
    }

    #[test]
    fn blocks_keep_original_order() {
        let note = normalizer().normalize("<p>T</p><p>one</p><p>two</p><p>three</p>");
        assert_eq!(note.body, "one\n\ntwo\n\nthree\n\n");
    }

    #[test]
    fn entities_are_decoded_in_output() {
        let note = normalizer().normalize("<p>T</p><p>R&amp;D &lt;draft&gt;</p>");
        assert_eq!(note.body, "R&D <draft>\n\n");
    }

    #[test]
    fn schema_wrapper_div_is_unwrapped() {
        let note = normalizer().normalize(
            r#"<div data-schema-version="8"><h1>Wrapped (June 5, 2020)</h1><p>Inside</p></div>"#,
        );
        assert_eq!(note.title, "Wrapped (2020-06-05)");
        assert_eq!(note.body, "Inside\n\n");
    }

    #[test]
    fn empty_note_has_empty_title_and_body() {
        assert_eq!(normalizer().normalize(""), MarkdownNote::default());
    }

    #[test]
    fn note_title_matches_normalized_title() {
        let html = "<p>Reading: chapter 1</p><p>Body</p>";
        assert_eq!(note_title(html), normalizer().normalize(html).title);
        assert_eq!(note_title(html), "Reading- chapter 1");
    }
}
