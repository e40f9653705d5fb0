//! Named-placeholder templates
//!
//! `$key` and `${key}` are substituted from a closed key → value map; `$$` is
//! a literal dollar sign. Keys are ASCII identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
//! A key missing from the map fails the render instead of being left in place.

use crate::records::Attributes;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template {template:?} references unknown key '{key}'")]
    MissingKey { template: String, key: String },

    #[error("template {template:?} is malformed at byte {position}")]
    Malformed { template: String, position: usize },
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Literal(&'a str),
    Key(&'a str),
}

/// Substitute `values` into `template`
pub fn render(template: &str, values: &Attributes) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());

    for token in tokenize(template)? {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Key(key) => {
                let value = values.get(key).ok_or_else(|| TemplateError::MissingKey {
                    template: template.to_string(),
                    key: key.to_string(),
                })?;
                out.push_str(value);
            }
        }
    }

    Ok(out)
}

/// Keys referenced by `template`, in order of appearance (duplicates kept)
pub fn placeholders(template: &str) -> Result<Vec<String>, TemplateError> {
    Ok(tokenize(template)?
        .into_iter()
        .filter_map(|token| match token {
            Token::Key(key) => Some(key.to_string()),
            Token::Literal(_) => None,
        })
        .collect())
}

fn tokenize(template: &str) -> Result<Vec<Token<'_>>, TemplateError> {
    let bytes = template.as_bytes();
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }

        if start < i {
            tokens.push(Token::Literal(&template[start..i]));
        }

        let position = i;
        let malformed = move || TemplateError::Malformed {
            template: template.to_string(),
            position,
        };

        match bytes.get(i + 1) {
            Some(b'$') => {
                tokens.push(Token::Literal("$"));
                i += 2;
            }
            Some(b'{') => {
                let close = template[i + 2..].find('}').ok_or_else(malformed)? + i + 2;
                let key = &template[i + 2..close];
                if identifier_len(key) != key.len() || key.is_empty() {
                    return Err(malformed());
                }
                tokens.push(Token::Key(key));
                i = close + 1;
            }
            Some(_) => {
                let len = identifier_len(&template[i + 1..]);
                if len == 0 {
                    return Err(malformed());
                }
                tokens.push(Token::Key(&template[i + 1..i + 1 + len]));
                i += 1 + len;
            }
            None => return Err(malformed()),
        }

        start = i;
    }

    if start < bytes.len() {
        tokens.push(Token::Literal(&template[start..]));
    }

    Ok(tokens)
}

fn identifier_len(text: &str) -> usize {
    let mut len = 0;
    for (idx, b) in text.bytes().enumerate() {
        let ok = b == b'_' || b.is_ascii_alphabetic() || (idx > 0 && b.is_ascii_digit());
        if !ok {
            break;
        }
        len += 1;
    }
    len
}
