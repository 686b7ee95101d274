//! Launching, joining and halting on behalf of the shell.
//!
//! The [`ProcessHost`] trait is the boundary to whatever actually creates and
//! waits for processes. [`SystemHost`] implements it for Unix hosts and
//! [`Supervisor`] turns an [`Action`] into calls on a host plus the
//! messages the user sees.

use crate::ShellStatus;
use crate::builtins::{Action, Pid};
use log::{info, warn};
use std::io::{self, Write};
use std::os::unix::process::CommandExt;
use std::process::Command;
use thiserror::Error;

/// Environment variable set on every child, holding the parent shell's pid.
pub const PARENT_ENV: &str = "TINYSH_PARENT";

/// How a waited-for process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// The pid does not name a child of this shell.
    Invalid,
    /// The child was terminated abnormally.
    Unhandled,
    /// The child exited with a status.
    Done(i32),
}

/// Process creation failed.
#[derive(Debug, Error)]
#[error("{name}: exec failed.")]
pub struct LaunchError {
    /// Command name as the user typed it.
    pub name: String,
    #[source]
    pub source: io::Error,
}

pub trait ProcessHost {
    /// Starts `program` with `args`, where `args[0]` is the command name.
    fn create_process(&mut self, program: &str, args: &[String]) -> Result<Pid, LaunchError>;

    /// Blocks until `pid` terminates.
    fn wait_for(&mut self, pid: Pid) -> WaitStatus;

    /// Shuts down if the caller is allowed to; otherwise returns.
    fn halt(&mut self);
}

/// [`ProcessHost`] backed by the operating system.
#[derive(Debug, Default)]
pub struct SystemHost;

impl SystemHost {
    pub fn new() -> Self {
        SystemHost
    }

    /// Only a shell that was not started by another shell may halt.
    pub fn is_root_process() -> bool {
        std::env::var_os(PARENT_ENV).is_none()
    }
}

impl ProcessHost for SystemHost {
    fn create_process(&mut self, program: &str, args: &[String]) -> Result<Pid, LaunchError> {
        let name = args.first().map(String::as_str).unwrap_or(program);
        let child = Command::new(program)
            .arg0(name)
            .args(args.iter().skip(1))
            .env(PARENT_ENV, std::process::id().to_string())
            .spawn()
            .map_err(|source| LaunchError {
                name: name.to_string(),
                source,
            })?;

        // Dropping `child` neither kills nor reaps it; `wait_for` does the reaping.
        Pid::try_from(child.id()).map_err(|_| LaunchError {
            name: name.to_string(),
            source: io::Error::other("pid out of range"),
        })
    }

    fn wait_for(&mut self, pid: Pid) -> WaitStatus {
        // waitpid treats pid <= 0 as "any child" or a process group.
        if pid <= 0 {
            return WaitStatus::Invalid;
        }

        let mut status: libc::c_int = 0;
        loop {
            let ret = unsafe { libc::waitpid(pid, &mut status, 0) };
            if ret == pid {
                break;
            }
            if ret == -1 && io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return WaitStatus::Invalid;
        }

        if libc::WIFEXITED(status) {
            WaitStatus::Done(libc::WEXITSTATUS(status))
        } else {
            WaitStatus::Unhandled
        }
    }

    fn halt(&mut self) {
        if !Self::is_root_process() {
            warn!("halt refused: started by another shell");
            return;
        }
        info!("halting");
        let _ = io::stdout().flush();
        std::process::exit(0);
    }
}

/// Carries out actions against a [`ProcessHost`].
pub struct Supervisor<H> {
    host: H,
}

impl<H: ProcessHost> Supervisor<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Performs `action`, writing every outcome message to `out`.
    ///
    /// Only I/O errors on `out` are returned; failures of the action itself
    /// are reported to the user and the shell carries on.
    pub fn execute<W: Write>(&mut self, action: Action, out: &mut W) -> io::Result<ShellStatus> {
        match action {
            Action::Empty => {}
            Action::Exit(code) => return Ok(ShellStatus::Exit(code)),
            Action::Halt => {
                self.host.halt();
                writeln!(out, "Not the root process!")?;
            }
            Action::Join(pid) => {
                info!("joining {}", pid);
                let status = self.host.wait_for(pid);
                report(pid, status, out)?;
            }
            Action::Launch {
                program,
                args,
                background,
            } => match self.host.create_process(&program, &args) {
                Ok(pid) => {
                    info!("launched {} as {} (background: {})", program, pid, background);
                    if background {
                        // Never reaped unless the user joins it.
                        write!(out, "\n[{}]\n", pid)?;
                    } else {
                        let status = self.host.wait_for(pid);
                        report(pid, status, out)?;
                    }
                }
                Err(e) => {
                    warn!("launching {} failed: {}", program, e.source);
                    writeln!(out, "{}", e)?;
                }
            },
        }
        Ok(ShellStatus::Continue)
    }
}

fn report<W: Write>(pid: Pid, status: WaitStatus, out: &mut W) -> io::Result<()> {
    match status {
        WaitStatus::Invalid => writeln!(out, "join: Invalid process ID."),
        WaitStatus::Unhandled => write!(out, "\n[{}] Unhandled exception\n", pid),
        WaitStatus::Done(code) => write!(out, "\n[{}] Done ({})\n", pid, code),
    }
}
