use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};
use log::debug;
use thiserror::Error;

/// Failure to split a line into arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("Too many arguments.")]
    TooManyTokens,
    #[error("Unmatched \".")]
    UnterminatedQuote,
    #[error("Unmatched \\.")]
    UnterminatedEscape,
}

/// Lexer position relative to quoting.
///
/// `Escape` remembers whether it was entered from inside a quoted string so
/// the lexer returns to the right place after the escaped character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal { arg_started: bool },
    InQuote,
    InEscape { in_quote: bool },
}

/// Ordered argv-style arguments of a single line.
///
/// All argument bytes live in one contiguous buffer; each token is a range
/// into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenList {
    storage: Bytes,
    tokens: Vec<Range<usize>>,
}

impl TokenList {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(|range| self.slice(range))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|range| self.slice(range))
    }

    /// Owned copies of every token, in order.
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    fn slice(&self, range: &Range<usize>) -> &str {
        // Storage only ever receives whole UTF-8 encoded chars.
        std::str::from_utf8(&self.storage[range.clone()]).unwrap_or_default()
    }
}

/// Splits a command line into at most `max_tokens` arguments.
///
/// Whitespace (space, tab, newline) separates arguments unless it is inside
/// double quotes or preceded by a backslash. Inside an escape `t` and `n`
/// become tab and newline; any other character is taken literally. Quote and
/// backslash delimiters are consumed and never stored. Quotes may start in
/// the middle of an argument, so `a"b c"d` is the single argument `ab cd`.
///
/// # Example
/// ```
/// let args = tinysh::tokenize("echo \"hello world\"", 16).unwrap();
/// assert_eq!(args.to_vec(), vec!["echo", "hello world"]);
/// ```
pub fn tokenize(line: &str, max_tokens: usize) -> Result<TokenList, TokenizeError> {
    let mut storage = BytesMut::with_capacity(line.len());
    let mut tokens: Vec<Range<usize>> = Vec::new();
    let mut state = State::Normal { arg_started: false };
    let mut utf8 = [0u8; 4];

    for c in line.chars() {
        state = match state {
            State::InEscape { in_quote } => {
                let literal = match c {
                    't' => '\t',
                    'n' => '\n',
                    other => other,
                };
                storage.put_slice(literal.encode_utf8(&mut utf8).as_bytes());
                if in_quote {
                    State::InQuote
                } else {
                    State::Normal { arg_started: true }
                }
            }
            State::InQuote => match c {
                '\\' => State::InEscape { in_quote: true },
                '"' => State::Normal { arg_started: true },
                other => {
                    storage.put_slice(other.encode_utf8(&mut utf8).as_bytes());
                    State::InQuote
                }
            },
            State::Normal { arg_started } if is_separator(c) => {
                if arg_started {
                    close_token(&mut tokens, storage.len());
                }
                State::Normal { arg_started: false }
            }
            State::Normal { arg_started } => {
                if !arg_started {
                    if tokens.len() == max_tokens {
                        return Err(TokenizeError::TooManyTokens);
                    }
                    tokens.push(storage.len()..storage.len());
                }
                match c {
                    '\\' => State::InEscape { in_quote: false },
                    '"' => State::InQuote,
                    other => {
                        storage.put_slice(other.encode_utf8(&mut utf8).as_bytes());
                        State::Normal { arg_started: true }
                    }
                }
            }
        };
    }

    match state {
        State::InEscape { .. } => return Err(TokenizeError::UnterminatedEscape),
        State::InQuote => return Err(TokenizeError::UnterminatedQuote),
        State::Normal { arg_started: true } => close_token(&mut tokens, storage.len()),
        State::Normal { arg_started: false } => {}
    }

    let list = TokenList {
        storage: storage.freeze(),
        tokens,
    };
    debug!("tokenized {:?} into {:?}", line, list.to_vec());
    Ok(list)
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n')
}

fn close_token(tokens: &mut [Range<usize>], end: usize) {
    if let Some(last) = tokens.last_mut() {
        last.end = end;
    }
}
