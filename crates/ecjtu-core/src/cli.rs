//! Command-line surface of the `ecjtu` binary.

use crate::boundary::Interrupted;
use crate::session::LogSession;
use crate::signals::InterruptFlag;
use anyhow::Context as _;
use ecjtu_storage::StorageResolver;
use std::io::{BufRead, Write};

pub const USAGE: &str = "\
ecjtu - per-user storage and logging

Usage:
  ecjtu                      Print the current log file
  ecjtu path [SUBDIR]        Print (and create) the storage directory for SUBDIR
  ecjtu log [MESSAGE...]     Record MESSAGE, or each line of stdin, at INFO
  ecjtu raise <KIND>         Fail on purpose: panic | error | interrupt | interrupt-panic

Options:
  --version         Print version
  --help            Print this help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Path { subdir: String },
    Log { message: Option<String> },
    Raise(RaiseKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaiseKind {
    Panic,
    Error,
    Interrupt,
    InterruptPanic,
}

impl RaiseKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "panic" => Some(RaiseKind::Panic),
            "error" => Some(RaiseKind::Error),
            "interrupt" => Some(RaiseKind::Interrupt),
            "interrupt-panic" => Some(RaiseKind::InterruptPanic),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("'raise' needs one of: panic, error, interrupt, interrupt-panic")]
    MissingRaiseKind,
    #[error("unknown failure kind '{0}'")]
    UnknownRaiseKind(String),
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
}

/// Error returned by `ecjtu raise error`.
#[derive(Debug, thiserror::Error)]
#[error("deliberate failure requested from the command line")]
pub struct DeliberateFailure;

/// Parse arguments (without the program name). `--help`/`--version` are
/// handled by the caller.
pub fn parse_args(args: &[String]) -> Result<Command, UsageError> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Command::Status);
    };
    match first.as_str() {
        "path" => match rest {
            [] => Ok(Command::Path {
                subdir: String::new(),
            }),
            [subdir] => Ok(Command::Path {
                subdir: subdir.clone(),
            }),
            [_, extra, ..] => Err(UsageError::UnexpectedArgument(extra.clone())),
        },
        "log" => {
            let message = if rest.is_empty() {
                None
            } else {
                Some(rest.join(" "))
            };
            Ok(Command::Log { message })
        }
        "raise" => match rest {
            [] => Err(UsageError::MissingRaiseKind),
            [kind] => RaiseKind::parse(kind)
                .map(Command::Raise)
                .ok_or_else(|| UsageError::UnknownRaiseKind(kind.clone())),
            [_, extra, ..] => Err(UsageError::UnexpectedArgument(extra.clone())),
        },
        other => Err(UsageError::UnknownCommand(other.to_string())),
    }
}

/// What a command needs from the entry point.
pub struct Context<'a> {
    pub resolver: &'a StorageResolver,
    pub session: &'a LogSession,
    pub interrupt: &'a InterruptFlag,
}

pub fn execute<R, W>(
    command: &Command,
    ctx: &Context<'_>,
    input: R,
    mut out: W,
) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
{
    match command {
        Command::Status => {
            writeln!(out, "{}", ctx.session.current_file().display())?;
        }
        Command::Path { subdir } => {
            let dir = ctx
                .resolver
                .resolve(subdir)
                .with_context(|| format!("resolving storage for '{subdir}'"))?;
            tracing::debug!(subdir = %subdir, fallback = dir.is_fallback(), "resolved {dir}");
            writeln!(out, "{dir}")?;
        }
        Command::Log {
            message: Some(message),
        } => {
            tracing::info!("{message}");
        }
        Command::Log { message: None } => {
            let mut recorded = 0_usize;
            for line in input.lines() {
                ctx.interrupt.check()?;
                let line = line.context("reading stdin")?;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                tracing::info!("{line}");
                recorded += 1;
            }
            tracing::debug!(recorded, "stdin exhausted");
        }
        Command::Raise(kind) => raise(*kind)?,
    }
    Ok(())
}

fn raise(kind: RaiseKind) -> anyhow::Result<()> {
    tracing::debug!(?kind, "raising on request");
    match kind {
        RaiseKind::Panic => panic!("deliberate panic requested from the command line"),
        RaiseKind::Error => Err(DeliberateFailure.into()),
        RaiseKind::Interrupt => Err(Interrupted.into()),
        RaiseKind::InterruptPanic => std::panic::panic_any(Interrupted),
    }
}
