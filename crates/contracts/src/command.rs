//! CommandLine - structured program invocation
//!
//! Commands are kept as a program plus an ordered argument vector and are
//! serialized to a shell string only at the submission boundary (worker
//! stdin, batch script). Lines that already arrive as shell text are kept
//! verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A command to execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    /// Program path followed by its arguments
    Argv { program: String, args: Vec<String> },
    /// Pre-formed shell line, passed through untouched
    Shell(String),
}

impl CommandLine {
    /// Start a structured command for `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self::Argv {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Wrap an already formed shell line
    pub fn shell(line: impl Into<String>) -> Self {
        Self::Shell(line.into())
    }

    /// Append one argument
    ///
    /// Has no effect on a raw shell line.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        if let Self::Argv { args, .. } = &mut self {
            args.push(arg.into());
        }
        self
    }

    /// Append several arguments
    pub fn args<I, S>(self, iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        iter.into_iter().fold(self, |cmd, a| cmd.arg(a))
    }

    /// Append `--name value`
    pub fn flag(self, name: &str, value: impl fmt::Display) -> Self {
        self.arg(format!("--{name}")).arg(value.to_string())
    }

    /// Append a bare `--name`
    pub fn switch(self, name: &str) -> Self {
        self.arg(format!("--{name}"))
    }

    /// Program path, if structured
    pub fn program(&self) -> Option<&str> {
        match self {
            Self::Argv { program, .. } => Some(program),
            Self::Shell(_) => None,
        }
    }

    /// Arguments, if structured
    pub fn argv(&self) -> Option<&[String]> {
        match self {
            Self::Argv { args, .. } => Some(args),
            Self::Shell(_) => None,
        }
    }

    /// Whether the command has nothing to run
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Argv { program, .. } => program.is_empty(),
            Self::Shell(line) => line.trim().is_empty(),
        }
    }

    /// Serialize for a POSIX shell
    pub fn to_shell_string(&self) -> String {
        match self {
            Self::Shell(line) => line.clone(),
            Self::Argv { program, args } => std::iter::once(program)
                .chain(args)
                .map(|token| shell_quote(token))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_string())
    }
}

/// Quote a single token for `/bin/sh`.
///
/// Tokens made only of safe characters are returned as-is.
pub fn shell_quote(token: &str) -> String {
    if token.is_empty() {
        return "''".to_string();
    }

    let safe = token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        return token.to_string();
    }

    format!("'{}'", token.replace('\'', r"'\''"))
}
