//! Command definitions, lookup and input parsing.
//!
//! - Spec: command and parameter descriptors (spec.rs)
//! - Registry: name/alias lookup and help text (registry.rs)
//! - Parsing: tokenizing and completing input (parse.rs)

mod parse;
mod registry;
mod spec;

pub use parse::{complete_input, join, quote, split_command, tokenize};
pub use registry::CommandRegistry;
pub use spec::{Command, CommandSpec, Handler, ParameterSpec};
