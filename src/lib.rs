//! A small interactive shell.
//!
//! Each line is split into arguments by [`tokenize`], classified by
//! [`interpret`] as a builtin (`exit`, `halt`, `join`) or a program launch,
//! and carried out by a [`Supervisor`] on top of a [`ProcessHost`].

use std::io::{self, Write};
use thiserror::Error;

pub mod builtins;
pub mod config;
pub mod line;
pub mod parser;
pub mod process;

pub use builtins::{Action, Builtin, Pid, SyntaxError, interpret};
pub use config::ShellConfig;
pub use line::LineSource;
pub use parser::{TokenList, TokenizeError, tokenize};
pub use process::{LaunchError, ProcessHost, Supervisor, SystemHost, WaitStatus};

/// Result of a command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellStatus {
    /// The shell should continue running.
    Continue,
    /// The shell should exit with the provided code.
    Exit(i32),
}

/// Reasons a line is discarded before anything runs.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// The read-eval loop.
pub struct Shell<H> {
    config: ShellConfig,
    supervisor: Supervisor<H>,
}

impl<H: ProcessHost> Shell<H> {
    pub fn new(config: ShellConfig, host: H) -> Self {
        Self {
            config,
            supervisor: Supervisor::new(host),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        self.supervisor.host()
    }

    /// Splits and classifies one line without running it.
    pub fn parse_line(&self, line: &str) -> Result<Action, ShellError> {
        let tokens = tokenize(line, self.config.max_tokens)?;
        Ok(interpret(&tokens, &self.config.exe_suffix)?)
    }

    /// Handles one line, reporting any problem with it to `out`.
    pub fn run_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<ShellStatus> {
        let action = match self.parse_line(line) {
            Ok(action) => action,
            Err(e) => {
                log::debug!("discarding line {:?}: {}", line, e);
                writeln!(out, "{}", e)?;
                Action::Empty
            }
        };
        let status = self.supervisor.execute(action, out)?;
        out.flush()?;
        Ok(status)
    }

    /// Prompts, reads and runs lines until `exit`.
    ///
    /// Running out of input counts as `exit` with status 0.
    pub fn run<S, W>(&mut self, source: &mut S, out: &mut W) -> io::Result<i32>
    where
        S: LineSource + ?Sized,
        W: Write,
    {
        loop {
            write!(out, "{}", self.config.prompt)?;
            out.flush()?;

            let Some(line) = source.read_line(self.config.line_capacity)? else {
                log::info!("end of input");
                return Ok(0);
            };

            if let ShellStatus::Exit(code) = self.run_line(&line, out)? {
                return Ok(code);
            }
        }
    }
}
