//! Renders templated source contexts into fieldset schemas.
//!
//! A source context is a YAML document with embedded Handlebars expressions.
//! Rendering is two-phase: the text is rendered against a working copy of the
//! answer context (every referenced but unanswered variable resolves to an
//! empty string), then the output is parsed as YAML. When either phase fails
//! the untouched source is parsed instead, so static documents keep working.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use handlebars::Handlebars;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::extensions::{EXTENSION_HELPERS, ExtensionConfig, register_extensions};
use crate::spec::{Context, Schema};

/// Helpers shipped with the handlebars registry itself.
const BUILTIN_HELPERS: [&str; 17] = [
    "if", "unless", "each", "with", "lookup", "raw", "log", "eq", "ne", "gt", "gte", "lt", "lte",
    "and", "or", "not", "len",
];

const LITERALS: [&str; 5] = ["true", "false", "null", "undefined", "else"];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template render failed: {0}")]
    Render(#[from] handlebars::RenderError),
    #[error("document is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Immutable renderer shared by every step and request.
pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRenderer").finish_non_exhaustive()
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(&ExtensionConfig::default())
    }
}

impl TemplateRenderer {
    pub fn new(config: &ExtensionConfig) -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_escape_fn(handlebars::no_escape);
        register_extensions(&mut registry, config);
        Self { registry }
    }

    /// Variables referenced by `text` that no helper provides.
    pub fn undeclared_variables(&self, text: &str) -> BTreeSet<String> {
        undeclared_variables(text, is_helper)
    }

    /// Renders `text` against `ctx` without touching the caller's context.
    pub fn render_text(&self, text: &str, ctx: &Context) -> Result<String, TemplateError> {
        let mut working = ctx.clone();
        for name in self.undeclared_variables(text) {
            if working.get(&name).is_none_or(Value::is_null) {
                working.insert(name, Value::String(String::new()));
            }
        }
        Ok(self.registry.render_template(text, &working)?)
    }

    /// Renders and parses a source context; never fails.
    ///
    /// Anything other than a sequence of fieldsets yields an empty schema.
    pub fn render(&self, text: &str, ctx: &Context) -> Schema {
        let rendered = self
            .render_text(text, ctx)
            .and_then(|rendered| parse_document(&rendered));
        let document = match rendered {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(error = %err, "source context did not render; parsing it verbatim");
                match parse_document(text) {
                    Ok(document) => document,
                    Err(err) => {
                        tracing::warn!(error = %err, "source context is not structured data");
                        return Vec::new();
                    }
                }
            }
        };
        into_schema(document)
    }
}

fn is_helper(name: &str) -> bool {
    BUILTIN_HELPERS.contains(&name) || EXTENSION_HELPERS.contains(&name)
}

fn parse_document(text: &str) -> Result<Value, TemplateError> {
    Ok(serde_yaml::from_str(text)?)
}

fn into_schema(document: Value) -> Schema {
    match document {
        Value::Array(_) => serde_json::from_value(document).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "rendered document is not a list of fieldsets");
            Vec::new()
        }),
        Value::Null => Vec::new(),
        other => {
            tracing::warn!(kind = value_kind(&other), "rendered document is not a sequence");
            Vec::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{~?!--[\s\S]*?--~?\}\}|\{\{~?![\s\S]*?\}\}").expect("valid comment regex")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\{?([\s\S]*?)\}?\}\}").expect("valid tag regex"))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str,
    Eq,
    Open,
    Close,
    Pipe,
}

/// Statically collects root variable names referenced by mustache tags.
pub fn undeclared_variables(text: &str, is_helper: impl Fn(&str) -> bool) -> BTreeSet<String> {
    let stripped = comment_pattern().replace_all(text, "");
    let mut found = BTreeSet::new();
    let mut block_params = BTreeSet::new();

    for capture in tag_pattern().captures_iter(&stripped) {
        let inner = capture[1].trim_matches('~').trim();
        let body = match inner.chars().next() {
            None | Some('/' | '>' | '*' | '!') => continue,
            Some('#' | '^') => {
                let rest = &inner[1..];
                if rest.starts_with('>') || rest.starts_with('*') {
                    continue;
                }
                rest
            }
            Some('&') => &inner[1..],
            Some(_) => inner,
        };
        scan_tag(body, &is_helper, &mut found, &mut block_params);
    }

    found.retain(|name| !block_params.contains(name));
    found
}

fn scan_tag(
    body: &str,
    is_helper: &impl Fn(&str) -> bool,
    found: &mut BTreeSet<String>,
    block_params: &mut BTreeSet<String>,
) {
    let tokens = tokenize(body);
    let mut expect_head = true;
    let mut index = 0;

    while index < tokens.len() {
        match &tokens[index] {
            Token::Word(word) if word == "else" && expect_head => {}
            Token::Word(word) if word == "as" && tokens.get(index + 1) == Some(&Token::Pipe) => {
                index += 2;
                while let Some(Token::Word(name)) = tokens.get(index) {
                    block_params.insert(name.clone());
                    index += 1;
                }
            }
            Token::Word(_) if tokens.get(index + 1) == Some(&Token::Eq) => {
                // hash key
                index += 1;
                expect_head = false;
            }
            Token::Word(word) => {
                if !(expect_head && is_helper(word))
                    && let Some(root) = root_segment(word)
                {
                    found.insert(root);
                }
                expect_head = false;
            }
            Token::Open => expect_head = true,
            Token::Str | Token::Eq | Token::Close | Token::Pipe => expect_head = false,
        }
        index += 1;
    }
}

fn tokenize(body: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '"' | '\'' => {
                chars.next();
                for next in chars.by_ref() {
                    if next == ch {
                        break;
                    }
                }
                tokens.push(Token::Str);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            _ => {
                let mut word = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '[' {
                        for inner in chars.by_ref() {
                            word.push(inner);
                            if inner == ']' {
                                break;
                            }
                        }
                        continue;
                    }
                    if next.is_whitespace() || matches!(next, '(' | ')' | '|' | '=' | '"' | '\'')
                    {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    tokens
}

fn root_segment(word: &str) -> Option<String> {
    let path = match word.strip_prefix("@root") {
        Some(rest) => rest.strip_prefix(['.', '/'])?,
        None if word.starts_with('@') => return None,
        None => word,
    };
    if path.starts_with('.') || path == "this" || path.starts_with("this.") || path.starts_with("this/")
    {
        return None;
    }
    if LITERALS.contains(&path) || path.parse::<f64>().is_ok() {
        return None;
    }
    let root = path.split(['.', '/']).next()?;
    let root = root
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(root);
    (!root.is_empty()).then(|| root.to_string())
}
