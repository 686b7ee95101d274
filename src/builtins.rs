use crate::parser::TokenList;
use log::debug;
use std::str::FromStr;
use thiserror::Error;

/// Token that marks a command for background execution.
pub const BACKGROUND_MARKER: &str = "&";

/// Process identifier handed out by process creation.
pub type Pid = i32;

/// Enumeration of all supported builtin commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Halt,
    Join,
}

impl FromStr for Builtin {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exit" => Ok(Builtin::Exit),
            "halt" => Ok(Builtin::Halt),
            "join" => Ok(Builtin::Join),
            _ => Err(()),
        }
    }
}

/// A builtin was called with the wrong number of arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{command}: Expression Syntax.")]
pub struct SyntaxError {
    pub command: &'static str,
}

/// What the shell should do with one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing to run.
    Empty,
    /// Leave the shell with the given status.
    Exit(i32),
    /// Ask the host to shut down.
    Halt,
    /// Wait for an existing child.
    Join(Pid),
    /// Start `program` with `args`, where `args[0]` is the name as typed.
    Launch {
        program: String,
        args: Vec<String>,
        background: bool,
    },
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Halt => "halt",
            Builtin::Join => "join",
        }
    }

    /// Checks the argument count and builds the matching action.
    ///
    /// `args` excludes the builtin's own name.
    pub fn action(&self, args: &[&str]) -> Result<Action, SyntaxError> {
        let syntax_error = SyntaxError {
            command: self.name(),
        };
        match (self, args) {
            (Builtin::Exit, []) => Ok(Action::Exit(0)),
            (Builtin::Exit, [code]) => Ok(Action::Exit(parse_int(code))),
            (Builtin::Halt, []) => Ok(Action::Halt),
            (Builtin::Join, [pid]) => Ok(Action::Join(parse_int(pid))),
            _ => Err(syntax_error),
        }
    }
}

/// Decides how a tokenized line is handled.
///
/// A trailing `&` is stripped and requests background execution; it only
/// affects launched programs. `exe_suffix` is appended to the first token to
/// form the program that gets resolved. The result depends only on the
/// arguments.
pub fn interpret(tokens: &TokenList, exe_suffix: &str) -> Result<Action, SyntaxError> {
    let mut words: Vec<&str> = tokens.iter().collect();

    let background = words.last() == Some(&BACKGROUND_MARKER);
    if background {
        words.pop();
    }

    let Some((&name, rest)) = words.split_first() else {
        return Ok(Action::Empty);
    };

    let action = match name.parse::<Builtin>() {
        Ok(builtin) => builtin.action(rest)?,
        Err(_) => Action::Launch {
            program: format!("{}{}", name, exe_suffix),
            args: words.iter().map(|s| s.to_string()).collect(),
            background,
        },
    };
    debug!("interpreted {:?} as {:?}", words, action);
    Ok(action)
}

/// Reads a leading decimal integer the lenient way C's `atoi` does.
///
/// Leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit and a string without digits yields 0. Overflow wraps.
pub fn parse_int(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, d| {
            acc.wrapping_mul(10).wrapping_add(i32::from(d - b'0'))
        });

    if negative { value.wrapping_neg() } else { value }
}
