use std::str::FromStr;

use serde_json::Value;

use crate::Error;
use crate::Result;

/// One step of a command sequence
///
/// | Syntax       | Command |
/// |--------------|---------|
/// | `PATH`       | get     |
/// | `PATH=VALUE` | set, `VALUE` is JSON |
/// | `PATH=`      | clear the retained value |
/// | `PATH?`      | list, then get every leaf |
/// | `PATH!`      | dump |
///
/// Paths are kept as written; resolving relative paths is up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Get(String),
    Set(String, Value),
    Clear(String),
    List(String),
    Dump(String),
}

impl Command {
    pub fn parse(arg: &str) -> Result<Self> {
        if let Some(path) = arg.strip_suffix('?') {
            return Ok(Self::List(path.to_string()));
        }
        if let Some(path) = arg.strip_suffix('!') {
            return Ok(Self::Dump(path.to_string()));
        }
        match arg.split_once('=') {
            Some((path, "")) => Ok(Self::Clear(path.to_string())),
            Some((path, value)) => {
                let value = serde_json::from_str(value)
                    .map_err(|e| Error::InvalidCommand(format!("{arg}: value is not JSON ({e})")))?;
                Ok(Self::Set(path.to_string(), value))
            }
            None => Ok(Self::Get(arg.to_string())),
        }
    }

    /// Path as written in the command
    pub fn path(&self) -> &str {
        match self {
            Self::Get(path)
            | Self::Set(path, _)
            | Self::Clear(path)
            | Self::List(path)
            | Self::Dump(path) => path,
        }
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
