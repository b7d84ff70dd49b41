//! Command dispatch.
//!
//! Turns a raw line or argument vector into a handler call:
//! tokenize, resolve the command, bind its arguments, invoke the handler.
//! Each stage's failure is reported to the caller and stops processing of
//! that input only. The registry is read-only here, so one `Dispatcher`
//! can serve any number of concurrent callers.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::debug;

use crate::bind::{bind, BoundArgs};
use crate::commands::{split_command, tokenize, CommandRegistry, Handler};
use crate::error::DispatchError;

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The input held no tokens; nothing ran.
    Empty,
    /// The named command's handler ran to completion.
    Invoked { command: String },
}

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
}

impl Dispatcher {
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Tokenize and run one interactive line.
    ///
    /// Async handlers are driven to completion on the calling thread; use
    /// `dispatch_line_async` from inside an async runtime.
    pub fn dispatch_line(&self, line: &str) -> Result<Dispatched, DispatchError> {
        self.dispatch_argv(&tokenize(line))
    }

    /// Run a pre-split argument vector, e.g. the process arguments.
    pub fn dispatch_argv<S: AsRef<str>>(&self, argv: &[S]) -> Result<Dispatched, DispatchError> {
        let Some((command, handler, args)) = self.prepare(argv)? else {
            return Ok(Dispatched::Empty);
        };
        let result = match handler {
            Handler::Sync(handler) => handler(args),
            Handler::Async(handler) => futures::executor::block_on(handler(args)),
        };
        finish(command, result)
    }

    pub async fn dispatch_line_async(&self, line: &str) -> Result<Dispatched, DispatchError> {
        self.dispatch_argv_async(&tokenize(line)).await
    }

    pub async fn dispatch_argv_async<S: AsRef<str>>(
        &self,
        argv: &[S],
    ) -> Result<Dispatched, DispatchError> {
        let Some((command, handler, args)) = self.prepare(argv)? else {
            return Ok(Dispatched::Empty);
        };
        let result = match handler {
            Handler::Sync(handler) => handler(args),
            Handler::Async(handler) => handler(args).await,
        };
        finish(command, result)
    }

    /// Resolve and bind; `None` for empty input.
    fn prepare<S: AsRef<str>>(
        &self,
        argv: &[S],
    ) -> Result<Option<(String, Handler, BoundArgs)>, DispatchError> {
        let Some((name, rest)) = split_command(argv) else {
            return Ok(None);
        };
        let command = self
            .registry
            .resolve(name)
            .ok_or_else(|| DispatchError::UnknownCommand {
                command: name.to_string(),
            })?;

        let tokens: Vec<String> = rest.iter().map(|token| token.as_ref().to_string()).collect();
        let args = bind(command, &tokens).map_err(|source| DispatchError::Binding {
            command: command.name().to_string(),
            source,
        })?;

        debug!(command = command.name(), arguments = args.len(), "dispatching");
        Ok(Some((
            command.name().to_string(),
            command.handler().clone(),
            args,
        )))
    }
}

impl From<CommandRegistry> for Dispatcher {
    fn from(registry: CommandRegistry) -> Self {
        Self::new(registry)
    }
}

fn finish(command: String, result: anyhow::Result<()>) -> Result<Dispatched, DispatchError> {
    result.map_err(DispatchError::Handler)?;
    Ok(Dispatched::Invoked { command })
}
