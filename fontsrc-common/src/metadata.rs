//! Metadata store: `METADATA.pb` files in protobuf text format.
//!
//! Only the `source { repository_url archive_url }` message matters to the
//! pipeline, but the whole document is validated so that a malformed file is
//! reported as unparseable rather than silently yielding partial facts.

use crate::types::{DeclaredSource, RecordLocator};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Failure reading a record's metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

/// Source of metadata-declared repository/archive URLs.
pub trait MetadataStore {
    fn read_source(&self, record: &RecordLocator) -> Result<DeclaredSource, MetadataError>;
}

/// Reads `METADATA.pb` from the record directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMetadataStore;

impl MetadataStore for FsMetadataStore {
    fn read_source(&self, record: &RecordLocator) -> Result<DeclaredSource, MetadataError> {
        read_metadata_file(&record.metadata_path())
    }
}

pub fn read_metadata_file(path: &Path) -> Result<DeclaredSource, MetadataError> {
    let text = fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_source(&text)
}

/// Parse a text-format document and pull out the declared source.
pub fn parse_source(text: &str) -> Result<DeclaredSource, MetadataError> {
    let doc = TextParser::new(text).parse_document()?;
    let source = doc.iter().rev().find_map(|(name, value)| match value {
        TextValue::Message(fields) if name == "source" => Some(fields),
        _ => None,
    });
    let Some(source) = source else {
        return Ok(DeclaredSource::default());
    };

    let scalar = |key: &str| {
        source.iter().rev().find_map(|(name, value)| match value {
            TextValue::Str(s) if name == key => Some(s.clone()),
            _ => None,
        })
    };
    Ok(DeclaredSource::new(
        scalar("repository_url"),
        scalar("archive_url"),
    ))
}

// ── Text format parsing ────────────────────────────────────────────────────

type Fields = Vec<(String, TextValue)>;

#[derive(Debug, Clone, PartialEq)]
enum TextValue {
    Str(String),
    /// Numbers, enum identifiers and booleans.
    Atom,
    List,
    Message(Fields),
}

struct TextParser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> TextParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> MetadataError {
        MetadataError::Syntax {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn parse_document(mut self) -> Result<Fields, MetadataError> {
        let fields = self.parse_fields(None)?;
        self.skip_trivia();
        match self.peek() {
            None => Ok(fields),
            Some(c) => Err(self.error(format!("unexpected '{c}'"))),
        }
    }

    /// Fields until `close` (or end of input at top level).
    fn parse_fields(&mut self, close: Option<char>) -> Result<Fields, MetadataError> {
        let mut fields = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None if close.is_none() => return Ok(fields),
                None => return Err(self.error("unexpected end of input, unbalanced braces")),
                Some(c) if Some(c) == close => {
                    self.bump();
                    return Ok(fields);
                }
                Some(c) if is_ident_start(c) => {
                    let name = self.ident();
                    let value = self.parse_field_value()?;
                    fields.push((name, value));
                    self.skip_trivia();
                    if matches!(self.peek(), Some(';' | ',')) {
                        self.bump();
                    }
                }
                Some('[') => {
                    // Extension field names: [pkg.ext]
                    self.bump();
                    let mut name = String::new();
                    while let Some(c) = self.bump() {
                        if c == ']' {
                            break;
                        }
                        name.push(c);
                    }
                    let value = self.parse_field_value()?;
                    fields.push((name, value));
                }
                Some(c) => return Err(self.error(format!("expected field name, found '{c}'"))),
            }
        }
    }

    fn parse_field_value(&mut self) -> Result<TextValue, MetadataError> {
        self.skip_trivia();
        let had_colon = if self.peek() == Some(':') {
            self.bump();
            self.skip_trivia();
            true
        } else {
            false
        };
        match self.peek() {
            Some('{') => {
                self.bump();
                Ok(TextValue::Message(self.parse_fields(Some('}'))?))
            }
            Some('<') => {
                self.bump();
                Ok(TextValue::Message(self.parse_fields(Some('>'))?))
            }
            _ if !had_colon => Err(self.error("expected ':' or '{' after field name")),
            _ => self.parse_scalar_or_list(),
        }
    }

    fn parse_scalar_or_list(&mut self) -> Result<TextValue, MetadataError> {
        match self.peek() {
            Some('[') => {
                self.bump();
                loop {
                    self.skip_trivia();
                    match self.peek() {
                        Some(']') => {
                            self.bump();
                            return Ok(TextValue::List);
                        }
                        Some(',') => {
                            self.bump();
                        }
                        Some('{') => {
                            self.bump();
                            self.parse_fields(Some('}'))?;
                        }
                        Some('<') => {
                            self.bump();
                            self.parse_fields(Some('>'))?;
                        }
                        None => return Err(self.error("unterminated list")),
                        Some(_) => {
                            self.parse_scalar()?;
                        }
                    }
                }
            }
            _ => self.parse_scalar(),
        }
    }

    fn parse_scalar(&mut self) -> Result<TextValue, MetadataError> {
        match self.peek() {
            Some('"' | '\'') => {
                // Adjacent string literals concatenate.
                let mut value = String::new();
                while let Some(quote @ ('"' | '\'')) = self.peek() {
                    self.bump();
                    value.push_str(&self.string_body(quote)?);
                    self.skip_trivia();
                }
                Ok(TextValue::Str(value))
            }
            Some('-') => {
                // The sign may be separated from its number by whitespace.
                self.bump();
                self.skip_trivia();
                match self.peek() {
                    Some(c) if c == '.' || c.is_ascii_alphanumeric() || c == '_' => {
                        self.parse_scalar()
                    }
                    Some(c) => Err(self.error(format!("expected number after '-', found '{c}'"))),
                    None => Err(self.error("expected number after '-', found end of input")),
                }
            }
            Some(c) if c == '.' || c.is_ascii_alphanumeric() || c == '_' => {
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.') {
                        self.bump();
                    } else {
                        break;
                    }
                }
                Ok(TextValue::Atom)
            }
            Some(c) => Err(self.error(format!("expected value, found '{c}'"))),
            None => Err(self.error("expected value, found end of input")),
        }
    }

    fn string_body(&mut self, quote: char) -> Result<String, MetadataError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn ident(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
