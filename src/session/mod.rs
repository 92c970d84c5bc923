//! Running sequences of textual commands against a [`Client`].
//!
//! A session resolves relative paths with a [`PathCursor`] and turns every
//! command into a structured [`Outcome`]. Rendering is left to the caller.
//!
//! ```no_run
//! # async fn demo(client: miniconf_mqtt_client::Client) -> miniconf_mqtt_client::Result<()> {
//! use miniconf_mqtt_client::CommandSession;
//!
//! let mut session = CommandSession::new(client).retain(true);
//! for outcome in session.run(["/afe/0=\"G10\"", "1", "/stream?"]).await? {
//!     println!("{outcome:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod command;
mod path;

pub use command::*;
pub use path::*;


use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::constants::SEPARATOR;
use crate::Client;
use crate::Error;
use crate::RequestError;
use crate::Result;

/// Result of a `PATH?` command
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    /// The path is a leaf; the device answered the list with its value.
    ///
    /// Told apart from a single child path only by the missing leading `/`.
    Leaf(String),
    /// Every leaf below the path with the outcome of reading it
    Paths(Vec<(String, std::result::Result<Value, RequestError>)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value {
        path: String,
        value: Value,
    },
    Set {
        path: String,
        value: Value,
        ack: String,
    },
    /// Retained value cleared; `value` is the device's current value
    Cleared {
        path: String,
        value: Option<Value>,
    },
    Listed {
        path: String,
        listing: Listing,
    },
    Dumped {
        path: String,
    },
}

pub struct CommandSession {
    client: Client,
    cursor: PathCursor,
    retain: bool,
}

impl CommandSession {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cursor: PathCursor::new(),
            retain: false,
        }
    }

    /// Retain set values on the broker (default: false)
    pub fn retain(
        mut self,
        retain: bool,
    ) -> Self {
        self.retain = retain;
        self
    }

    pub fn cursor(&self) -> &PathCursor {
        &self.cursor
    }

    /// Execute one command.
    ///
    /// Only the per-leaf reads of a `PATH?` listing tolerate failures; they
    /// are recorded in the [`Listing`]. Any other failure is returned.
    pub async fn execute(
        &mut self,
        arg: &str,
    ) -> Result<Outcome> {
        let command = Command::parse(arg)?;
        let path = self.cursor.normalize(command.path());
        debug!("executing {:?} on {}", command, path);
        self.apply(command, path).await
    }

    /// Execute commands in order, stopping at the first failed command.
    ///
    /// Commands after the failed one are not sent.
    pub async fn run<I, S>(
        &mut self,
        commands: I,
    ) -> Result<Vec<Outcome>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcomes = Vec::new();
        for command in commands {
            let command = command.as_ref();
            match self.execute(command).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("{}: {}", command, e);
                    return Err(e);
                }
            }
        }
        Ok(outcomes)
    }

    async fn apply(
        &self,
        command: Command,
        path: String,
    ) -> Result<Outcome> {
        match command {
            Command::Get(_) => {
                let value = self.client.get(&path).await?;
                Ok(Outcome::Value { path, value })
            }
            Command::Set(_, value) => {
                let ack = self.client.set(&path, &value, self.retain).await?;
                Ok(Outcome::Set { path, value, ack })
            }
            Command::Clear(_) => {
                let value = self.client.clear(&path, true).await?;
                Ok(Outcome::Cleared { path, value })
            }
            Command::List(_) => {
                let listing = self.list_get(&path).await?;
                Ok(Outcome::Listed { path, listing })
            }
            Command::Dump(_) => {
                self.client.dump(&path).await?;
                Ok(Outcome::Dumped { path })
            }
        }
    }

    async fn list_get(
        &self,
        path: &str,
    ) -> Result<Listing> {
        let mut paths = self.client.list(path).await?;
        if paths.len() == 1 && !paths[0].starts_with(SEPARATOR) {
            return Ok(Listing::Leaf(paths.remove(0)));
        }

        let mut leaves = Vec::with_capacity(paths.len());
        for leaf in paths {
            let value = match self.client.get::<Value>(&leaf).await {
                Ok(value) => Ok(value),
                Err(Error::Request(e)) => Err(e),
                Err(e) => return Err(e),
            };
            leaves.push((leaf, value));
        }
        Ok(Listing::Paths(leaves))
    }
}
