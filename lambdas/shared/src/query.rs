//! Generated queries and their validation
//!
//! The inference API answers with free text. Before anything reaches the
//! database the answer is reduced to exactly one PartiQL statement of an
//! allowed kind that targets the selected table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};

/// PartiQL statement kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    pub const ALL: [QueryKind; 4] = [
        QueryKind::Select,
        QueryKind::Insert,
        QueryKind::Update,
        QueryKind::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SELECT" => Ok(QueryKind::Select),
            "INSERT" => Ok(QueryKind::Insert),
            "UPDATE" => Ok(QueryKind::Update),
            "DELETE" => Ok(QueryKind::Delete),
            other => Err(Error::StatementNotAllowed(other.to_string())),
        }
    }
}

/// A statement ready to run against one table on behalf of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// SQS message id of the originating record
    pub message_id: Option<String>,
    /// Position of the originating record in the event
    pub record_index: usize,
    pub table_name: String,
    pub statement: String,
    pub kind: QueryKind,
}

/// Reduce a model answer to a single validated statement
///
/// Strips Markdown code fences and one trailing `;`, then checks that exactly
/// one statement remains, that it starts with an allowed keyword and that its
/// target table is exactly `table_name`.
pub fn prepare_statement(
    raw: &str,
    table_name: &str,
    allowed: &[QueryKind],
) -> Result<(String, QueryKind)> {
    let statement = strip_code_fence(raw.trim()).trim();
    let statement = statement.strip_suffix(';').unwrap_or(statement).trim();

    if statement.is_empty() {
        return Err(Error::InvalidQuery("empty statement".to_string()));
    }

    if has_unquoted_semicolon(statement) {
        return Err(Error::InvalidQuery(
            "multiple statements are not allowed".to_string(),
        ));
    }

    let keyword = statement
        .split_whitespace()
        .next()
        .unwrap_or_default();
    let kind: QueryKind = keyword.parse()?;
    if !allowed.contains(&kind) {
        return Err(Error::StatementNotAllowed(kind.to_string()));
    }

    match target_table(statement, kind) {
        Some(target) if target == table_name => Ok((statement.to_string(), kind)),
        Some(target) => Err(Error::InvalidQuery(format!(
            "statement targets table {}, expected {}",
            target, table_name
        ))),
        None => Err(Error::InvalidQuery("statement has no target table".to_string())),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop the info string (```sql, ```partiql, ...)
    match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => strip_fence_language(rest),
    }
}

/// One-line fences carry the language before the statement
fn strip_fence_language(text: &str) -> &str {
    let text = text.trim_start();
    let word_end = text.find(char::is_whitespace).unwrap_or(text.len());
    let word = &text[..word_end];
    if word.eq_ignore_ascii_case("sql") || word.eq_ignore_ascii_case("partiql") {
        &text[word_end..]
    } else {
        text
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    /// Unquoted word: keyword or bare identifier
    Word(String),
    /// Double-quoted identifier
    Ident(String),
    /// Single-quoted literal, punctuation, operators
    Other,
}

fn tokenize(statement: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = statement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '\'' => {
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                }
                tokens.push(Token::Other);
            }
            '"' => {
                let mut ident = String::new();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    ident.push(c);
                }
                tokens.push(Token::Ident(ident));
            }
            c if is_word_char(c) => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !is_word_char(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
            _ => tokens.push(Token::Other),
        }
    }

    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Table a statement operates on: after FROM (SELECT, DELETE), INTO (INSERT)
/// or UPDATE. Keywords inside literals and quoted identifiers are ignored.
fn target_table(statement: &str, kind: QueryKind) -> Option<String> {
    let keyword = match kind {
        QueryKind::Select | QueryKind::Delete => "FROM",
        QueryKind::Insert => "INTO",
        QueryKind::Update => "UPDATE",
    };

    let tokens = tokenize(statement);
    let position = tokens
        .iter()
        .position(|t| matches!(t, Token::Word(w) if w.eq_ignore_ascii_case(keyword)))?;

    match tokens.get(position + 1)? {
        Token::Word(name) | Token::Ident(name) => Some(name.clone()),
        Token::Other => None,
    }
}

fn has_unquoted_semicolon(statement: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in statement.chars() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ';') => return true,
            _ => {}
        }
    }
    false
}
