//! Mustache-style template rendering for exported files.
//!
//! Templates use logic-less mustache tags (plus the handlebars block helpers
//! templates written for the add-on rely on). They are translated to a
//! minijinja template whose only variable is `record`, rendered, and then
//! passed through the legacy `%(name)` wildcard substitution.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use minijinja::value::{Value, ValueKind};
use minijinja::{AutoEscape, Environment, UndefinedBehavior, context};
use regex::{Captures, Regex};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{MetadataRecord, UNDEFINED};
use crate::infra::{FileSystem, FsError};

static WILDCARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\((\w+)\)").expect("valid wildcard pattern"));

/// Default template for hub files.
pub const DEFAULT_HUB_TEMPLATE: &str = r#"# {{title}}

## Metadata

* Type: {{itemType}}
* Authors: {{authors}}
* Citekey: {{citekey}}
{{#DOI}}
* DOI: {{DOI}}
{{/DOI}}
{{#url}}
* URL: {{url}}
{{/url}}
* Local library: {{localLibrary}}
{{#cloudLibrary}}
* Cloud library: {{cloudLibrary}}
{{/cloudLibrary}}
{{#pdfAttachments}}
* PDF: {{.}}
{{/pdfAttachments}}
* Date added: {{dateAdded}}
* Tags: {{tags}}
{{#collections}}
* Collections: {{collections}}
{{/collections}}

{{#abstractNote}}
## Abstract

{{abstractNote}}

{{/abstractNote}}
{{#if noteLinks}}
## Notes

{{#each noteLinks}}
* {{this}}
{{/each}}

{{/if}}
{{#if relatedLinks}}
## Related

{{#each relatedLinks}}
* {{this}}
{{/each}}
{{/if}}
"#;

/// Default template for note files.
pub const DEFAULT_CHILD_TEMPLATE: &str = r#"# {{title}}

{{#hubLink}}
Source: {{hubLink}}

{{/hubLink}}
## Annotations

{{{noteContent}}}"#;

/// Errors resolving or rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unterminated tag at byte {offset}")]
    Unterminated { offset: usize },

    #[error("unsupported tag '{tag}'")]
    Unsupported { tag: String },

    #[error("section '{name}' is never closed")]
    Unclosed { name: String },

    #[error("closing tag '{found}' does not match open section '{expected}'")]
    Mismatched { found: String, expected: String },

    #[error("closing tag '{found}' has no open section")]
    UnexpectedClose { found: String },

    #[error("'else' outside of a section")]
    StrayElse,

    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("template rendering failed: {0}")]
    Render(#[from] minijinja::Error),
}

/// The two templates an export uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Hub,
    Child,
}

impl TemplateKind {
    /// Name looked up in the template directory, without extension.
    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::Hub => "Hub Note Template",
            TemplateKind::Child => "Child Note Template",
        }
    }

    pub fn builtin(self) -> &'static str {
        match self {
            TemplateKind::Hub => DEFAULT_HUB_TEMPLATE,
            TemplateKind::Child => DEFAULT_CHILD_TEMPLATE,
        }
    }
}

/// Returns the template text for `kind`.
///
/// A non-hidden `{name}.md` file in `dir` overrides the built-in default.
/// An unlistable directory falls back to the default.
pub fn resolve_template(
    fs: &dyn FileSystem,
    dir: Option<&Path>,
    kind: TemplateKind,
) -> Result<String, TemplateError> {
    let Some(dir) = dir else {
        return Ok(kind.builtin().to_string());
    };

    let file_name = format!("{}.md", kind.name());
    let entries = match fs.list_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "cannot list template directory, using default");
            return Ok(kind.builtin().to_string());
        }
    };

    let available = entries
        .iter()
        .any(|entry| !entry.is_dir && !entry.name.starts_with('.') && entry.name == file_name);
    if !available {
        debug!(template = kind.name(), "no override found, using default");
        return Ok(kind.builtin().to_string());
    }

    let path = dir.join(&file_name);
    debug!(path = %path.display(), "using template override");
    fs.read_to_string(&path)
        .map_err(|source| TemplateError::Read { path, source })
}

/// Renders mustache templates against metadata records.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_filter("text", text_filter);
        env.add_filter("section", section_filter);
        env.add_filter("entries", entries_filter);
        Self { env }
    }

    /// Renders `template`, then substitutes `%(name)` wildcards in the output.
    pub fn render(&self, template: &str, record: &MetadataRecord) -> Result<String, TemplateError> {
        let source = translate(template)?;
        let rendered = self.env.render_str(&source, context! { record => record })?;
        Ok(replace_wildcards(&rendered, record))
    }
}

/// Replaces every `%(name)` with the field's text, or `undefined`.
///
/// Runs over rendered output, so field values that themselves contain
/// `%(name)` are substituted too.
pub fn replace_wildcards(text: &str, record: &MetadataRecord) -> String {
    WILDCARD
        .replace_all(text, |caps: &Captures| {
            record.text(&caps[1]).unwrap_or_else(|| UNDEFINED.to_string())
        })
        .into_owned()
}

/// Prints a value; lists are joined with `", "`, missing values are empty.
fn text_filter(value: Value) -> String {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => String::new(),
        ValueKind::Seq | ValueKind::Iterable => match value.try_iter() {
            Ok(items) => items
                .map(text_filter)
                .collect::<Vec<_>>()
                .join(", "),
            Err(_) => value.to_string(),
        },
        _ => value.to_string(),
    }
}

/// Items a section iterates: the list itself, the value once when truthy,
/// nothing otherwise.
fn section_filter(value: Value) -> Vec<Value> {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Vec::new(),
        ValueKind::Seq | ValueKind::Iterable => value
            .try_iter()
            .map(|items| items.collect())
            .unwrap_or_default(),
        _ if value.is_true() => vec![value],
        _ => Vec::new(),
    }
}

/// `[key, value]` pairs an `each` block iterates: map entries, list items
/// keyed by index, or a truthy scalar once.
fn entries_filter(value: Value) -> Vec<Value> {
    if value.kind() == ValueKind::Map {
        return value
            .try_iter()
            .map(|keys| {
                keys.map(|key| {
                    let item = value.get_item(&key).unwrap_or(Value::UNDEFINED);
                    Value::from(vec![key, item])
                })
                .collect()
            })
            .unwrap_or_default();
    }
    section_filter(value)
        .into_iter()
        .enumerate()
        .map(|(index, item)| Value::from(vec![Value::from(index), item]))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Section,
    Inverted,
    Each,
    If,
    Unless,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tag {
    Var(String),
    Comment,
    Open(Block, String),
    Close(String),
    Else,
}

impl Tag {
    /// Tags that vanish together with their line when alone on it.
    fn is_standalone_kind(&self) -> bool {
        !matches!(self, Tag::Var(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Tag(Tag),
}

fn tokenize(template: &str) -> Result<Vec<Piece>, TemplateError> {
    let mut pieces = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            pieces.push(Piece::Text(rest[..start].to_string()));
        }
        let offset = template.len() - rest.len() + start;
        let after = &rest[start + 2..];

        if let Some(inner) = after.strip_prefix('{') {
            let end = inner
                .find("}}}")
                .ok_or(TemplateError::Unterminated { offset })?;
            pieces.push(Piece::Tag(Tag::Var(inner[..end].trim().to_string())));
            rest = &inner[end + 3..];
        } else {
            let end = after
                .find("}}")
                .ok_or(TemplateError::Unterminated { offset })?;
            pieces.push(Piece::Tag(parse_tag(after[..end].trim())?));
            rest = &after[end + 2..];
        }
    }

    if !rest.is_empty() {
        pieces.push(Piece::Text(rest.to_string()));
    }
    Ok(pieces)
}

fn parse_tag(body: &str) -> Result<Tag, TemplateError> {
    let Some(sigil) = body.chars().next() else {
        return Ok(Tag::Var(String::new()));
    };
    let rest = body[sigil.len_utf8()..].trim();

    let tag = match sigil {
        '!' => Tag::Comment,
        '#' => match rest.split_once(char::is_whitespace) {
            Some(("each", arg)) => Tag::Open(Block::Each, arg.trim().to_string()),
            Some(("if", arg)) => Tag::Open(Block::If, arg.trim().to_string()),
            Some(("unless", arg)) => Tag::Open(Block::Unless, arg.trim().to_string()),
            _ => Tag::Open(Block::Section, rest.to_string()),
        },
        '^' if rest.is_empty() => Tag::Else,
        '^' => Tag::Open(Block::Inverted, rest.to_string()),
        '/' => Tag::Close(rest.to_string()),
        '&' => Tag::Var(rest.to_string()),
        '>' | '=' => {
            return Err(TemplateError::Unsupported {
                tag: body.to_string(),
            });
        }
        _ if body == "else" => Tag::Else,
        _ => Tag::Var(body.to_string()),
    };
    Ok(tag)
}

/// Removes the surrounding whitespace and line break of block tags that
/// stand alone on their line.
fn strip_standalone_lines(pieces: &mut [Piece]) {
    let last = pieces.len().saturating_sub(1);
    let standalone: Vec<bool> = (0..pieces.len())
        .map(|i| {
            let Piece::Tag(tag) = &pieces[i] else {
                return false;
            };
            if !tag.is_standalone_kind() {
                return false;
            }
            let starts_line = match i.checked_sub(1).map(|p| &pieces[p]) {
                None => true,
                Some(Piece::Text(text)) => match text.rfind('\n') {
                    Some(nl) => is_blank(&text[nl + 1..]),
                    None => i == 1 && is_blank(text),
                },
                Some(Piece::Tag(_)) => false,
            };
            let ends_line = match pieces.get(i + 1) {
                None => true,
                Some(Piece::Text(text)) => match text.find('\n') {
                    Some(nl) => is_blank(&text[..nl]),
                    None => i + 1 == last && is_blank(text),
                },
                Some(Piece::Tag(_)) => false,
            };
            starts_line && ends_line
        })
        .collect();

    for (i, is_standalone) in standalone.into_iter().enumerate() {
        if !is_standalone {
            continue;
        }
        if i > 0
            && let Piece::Text(text) = &mut pieces[i - 1]
        {
            let kept = text.trim_end_matches([' ', '\t']).len();
            text.truncate(kept);
        }
        if let Some(Piece::Text(text)) = pieces.get_mut(i + 1) {
            let trimmed = text.trim_start_matches([' ', '\t']);
            let trimmed = trimmed
                .strip_prefix("\r\n")
                .or_else(|| trimmed.strip_prefix('\n'))
                .unwrap_or(trimmed);
            *text = trimmed.to_string();
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| c == ' ' || c == '\t' || c == '\r')
}

struct OpenBlock {
    block: Block,
    name: String,
    loop_var: Option<String>,
    key_var: Option<String>,
}

/// Translates a mustache template into minijinja source.
fn translate(template: &str) -> Result<String, TemplateError> {
    let mut pieces = tokenize(template)?;
    strip_standalone_lines(&mut pieces);

    let mut out = String::with_capacity(template.len() * 2);
    let mut stack: Vec<OpenBlock> = Vec::new();
    let mut loops = 0usize;

    for piece in pieces {
        match piece {
            Piece::Text(text) => push_literal(&mut out, &text),
            Piece::Tag(Tag::Comment) => {}
            Piece::Tag(Tag::Var(path)) => {
                let _ = write!(out, "{{{{ {}|text }}}}", lookup(&path, &stack));
            }
            Piece::Tag(Tag::Open(block, path)) => {
                let expr = lookup(&path, &stack);
                let (loop_var, key_var) = match block {
                    Block::Section => {
                        let var = format!("it{loops}");
                        loops += 1;
                        let _ = write!(out, "{{% for {var} in {expr}|section %}}");
                        (Some(var), None)
                    }
                    Block::Each => {
                        let var = format!("it{loops}");
                        let key = format!("key{loops}");
                        loops += 1;
                        let _ = write!(out, "{{% for {key}, {var} in {expr}|entries %}}");
                        (Some(var), Some(key))
                    }
                    Block::If => {
                        let _ = write!(out, "{{% if {expr}|section %}}");
                        (None, None)
                    }
                    Block::Inverted | Block::Unless => {
                        let _ = write!(out, "{{% if not ({expr}|section) %}}");
                        (None, None)
                    }
                };
                stack.push(OpenBlock {
                    block,
                    name: path,
                    loop_var,
                    key_var,
                });
            }
            Piece::Tag(Tag::Else) => {
                if stack.is_empty() {
                    return Err(TemplateError::StrayElse);
                }
                out.push_str("{% else %}");
            }
            Piece::Tag(Tag::Close(name)) => {
                let open = stack
                    .pop()
                    .ok_or_else(|| TemplateError::UnexpectedClose {
                        found: name.clone(),
                    })?;
                let expected = match open.block {
                    Block::Each => "each",
                    Block::If => "if",
                    Block::Unless => "unless",
                    Block::Section | Block::Inverted => open.name.as_str(),
                };
                if name != expected {
                    return Err(TemplateError::Mismatched {
                        found: name,
                        expected: expected.to_string(),
                    });
                }
                out.push_str(match open.block {
                    Block::Section | Block::Each => "{% endfor %}",
                    Block::Inverted | Block::If | Block::Unless => "{% endif %}",
                });
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(TemplateError::Unclosed { name: open.name });
    }
    Ok(out)
}

/// Expression for a tag path.
fn lookup(path: &str, stack: &[OpenBlock]) -> String {
    let current = || {
        stack
            .iter()
            .rev()
            .find_map(|open| open.loop_var.clone())
            .unwrap_or_else(|| "record".to_string())
    };

    match path {
        "" => "none".to_string(),
        "." | "this" => current(),
        "@index" => "loop.index0".to_string(),
        "@first" => "loop.first".to_string(),
        "@last" => "loop.last".to_string(),
        "@key" => stack
            .iter()
            .rev()
            .find_map(|open| open.key_var.clone())
            .unwrap_or_else(|| "none".to_string()),
        _ if path.starts_with('@') => "none".to_string(),
        _ => {
            let path = path.strip_prefix("this.").unwrap_or(path);
            let mut expr = String::from("record");
            for segment in path.split('.') {
                let _ = write!(expr, "[{}]", string_literal(segment));
            }
            expr
        }
    }
}

fn string_literal(s: &str) -> String {
    let mut lit = String::with_capacity(s.len() + 2);
    lit.push('"');
    for c in s.chars() {
        match c {
            '"' => lit.push_str("\\\""),
            '\\' => lit.push_str("\\\\"),
            '\n' => lit.push_str("\\n"),
            '\r' => lit.push_str("\\r"),
            '\t' => lit.push_str("\\t"),
            _ => lit.push(c),
        }
    }
    lit.push('"');
    lit
}

/// Appends template text; text minijinja would interpret is emitted as a
/// string expression.
fn push_literal(out: &mut String, text: &str) {
    if text.contains(['{', '}', '%', '#']) {
        let _ = write!(out, "{{{{ {} }}}}", string_literal(text));
    } else {
        out.push_str(text);
    }
}
