use std::fmt;

use anyhow::Result;

use crate::constants::DEFAULT_COMMAND;
use crate::core::controller::Context;

/// Signature shared by plain-function command handlers. The returned integer
/// is the command's process-visible exit status.
pub type HandlerFn = fn(&mut Context<'_>, &[String]) -> Result<i32>;

/// One row of a declarative command table.
///
/// A controller attaches a table wholesale via
/// [`Controller::attach`](crate::core::controller::Controller::attach); the
/// table is the single source of truth for the commands an object defines.
#[derive(Debug, Clone, Copy)]
pub struct CommandDef {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: HandlerFn,
}

pub(crate) enum Action {
    /// Executed by the owning controller: print its command listing.
    Help,
    Callback(Box<dyn Fn(&mut Context<'_>, &[String]) -> Result<i32>>),
}

/// A leaf unit of the command tree: a name, an optional description, and the
/// action to run. Owned by exactly one controller's command index.
pub struct Command {
    name: String,
    description: Option<String>,
    pub(crate) action: Action,
}

impl Command {
    /// Builds a command around a callback. An empty `description` is treated
    /// as absent.
    pub fn new<F>(name: &str, description: &str, callback: F) -> Self
    where
        F: Fn(&mut Context<'_>, &[String]) -> Result<i32> + 'static,
    {
        Self {
            name: name.to_string(),
            description: if description.is_empty() {
                None
            } else {
                Some(description.to_string())
            },
            action: Action::Callback(Box::new(callback)),
        }
    }

    /// The built-in listing command every controller registers.
    pub(crate) fn help() -> Self {
        Self {
            name: DEFAULT_COMMAND.to_string(),
            description: Some("Print a listing of the available commands.".to_string()),
            action: Action::Help,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl From<&CommandDef> for Command {
    fn from(def: &CommandDef) -> Self {
        Self::new(def.name, def.description, def.handler)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
