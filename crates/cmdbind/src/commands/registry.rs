//! Command registry and metadata.
//!
//! Maps command names and aliases to registered commands. Used for
//! dispatch, autocompletion, and help display.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::spec::{is_valid_command_name, Command, CommandSpec, ParameterSpec};
use crate::convert::ConverterRegistry;
use crate::error::RegistrationError;

/// Registered commands, keyed by name and alias.
///
/// Case-sensitive commands are stored verbatim; case-insensitive ones under
/// their lowercased name, and incoming names are lowercased to match.
pub struct CommandRegistry {
    converters: ConverterRegistry,
    default_case_sensitive: bool,
    commands: Vec<Arc<Command>>,
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// A registry using the builtin converters.
    pub fn new() -> Self {
        Self::with_converters(ConverterRegistry::with_defaults())
    }

    pub fn with_converters(converters: ConverterRegistry) -> Self {
        Self {
            converters,
            default_case_sensitive: false,
            commands: Vec::new(),
            exact: HashMap::new(),
            folded: HashMap::new(),
        }
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    /// Converters must be in place before the commands that use them are
    /// registered.
    pub fn converters_mut(&mut self) -> &mut ConverterRegistry {
        &mut self.converters
    }

    /// Case mode for commands that don't choose one. Defaults to insensitive.
    pub fn set_default_case_sensitive(&mut self, case_sensitive: bool) {
        self.default_case_sensitive = case_sensitive;
    }

    pub fn default_case_sensitive(&self) -> bool {
        self.default_case_sensitive
    }

    /// Validate and register a command under its name and aliases.
    pub fn register(&mut self, spec: CommandSpec) -> Result<Arc<Command>, RegistrationError> {
        let command = Command::build(spec, &self.converters, self.default_case_sensitive)?;
        let case_sensitive = command.is_case_sensitive();

        let mut names = vec![command.name().to_string()];
        names.extend(command.aliases().iter().cloned());
        for (i, name) in names.iter().enumerate() {
            if self.is_taken(name, case_sensitive) || names[..i].contains(name) {
                return Err(RegistrationError::DuplicateCommand { name: name.clone() });
            }
        }

        let command = Arc::new(command);
        let index = self.commands.len();
        for name in names {
            self.insert_key(name, case_sensitive, index);
        }
        debug!(
            command = command.name(),
            parameters = command.parameters().len(),
            case_sensitive,
            "registered command"
        );
        self.commands.push(Arc::clone(&command));
        Ok(command)
    }

    /// Add an extra name for an already registered command.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> Result<(), RegistrationError> {
        if !is_valid_command_name(alias) {
            return Err(RegistrationError::InvalidCommandName {
                name: alias.to_string(),
            });
        }
        let index = self
            .resolve_index(target)
            .ok_or_else(|| RegistrationError::UnknownAliasTarget {
                alias: alias.to_string(),
                target: target.to_string(),
            })?;
        let case_sensitive = self.commands[index].is_case_sensitive();
        if self.is_taken(alias, case_sensitive) {
            return Err(RegistrationError::DuplicateCommand {
                name: alias.to_string(),
            });
        }
        self.insert_key(alias.to_string(), case_sensitive, index);
        debug!(alias, target, "registered alias");
        Ok(())
    }

    /// Look up a command by name or alias.
    pub fn resolve(&self, name: &str) -> Option<&Arc<Command>> {
        self.resolve_index(name).map(|index| &self.commands[index])
    }

    fn resolve_index(&self, name: &str) -> Option<usize> {
        self.exact
            .get(name)
            .or_else(|| self.folded.get(&name.to_lowercase()))
            .copied()
    }

    fn is_taken(&self, name: &str, case_sensitive: bool) -> bool {
        let lowered = name.to_lowercase();
        if case_sensitive {
            self.exact.contains_key(name) || self.folded.contains_key(&lowered)
        } else {
            self.folded.contains_key(&lowered)
                || self.exact.keys().any(|key| key.to_lowercase() == lowered)
        }
    }

    fn insert_key(&mut self, name: String, case_sensitive: bool, index: usize) {
        if case_sensitive {
            self.exact.insert(name, index);
        } else {
            self.folded.insert(name.to_lowercase(), index);
        }
    }

    /// Every name and alias a command can be invoked by.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.exact.keys().chain(self.folded.keys()).map(String::as_str)
    }

    /// Registered commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Generate help lines for all commands, sorted by name.
    pub fn help_lines(&self) -> Vec<String> {
        let mut commands: Vec<&Arc<Command>> = self.commands.iter().collect();
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        format_lines(&commands)
    }

    /// Generate help lines for commands whose name starts with `prefix`.
    ///
    /// Used for command-mode hint display.
    pub fn hint_lines(&self, prefix: &str, max: usize) -> Vec<String> {
        let query = prefix.trim().to_lowercase();
        let mut matches: Vec<&Arc<Command>> = self
            .commands
            .iter()
            .filter(|command| command.name().to_lowercase().starts_with(&query))
            .collect();
        matches.sort_by(|a, b| a.name().cmp(b.name()));
        matches.truncate(max);
        format_lines(&matches)
    }

    /// Usage line for one command, e.g. `run <image> [-n|--name <name>]`.
    pub fn usage(&self, name: &str) -> Option<String> {
        let command = self.resolve(name)?;
        let mut parts = vec![command.name().to_string()];
        parts.extend(command.parameters().iter().map(usage_part));
        Some(parts.join(" "))
    }
}

fn usage_part(parameter: &ParameterSpec) -> String {
    let switch = match parameter.short_name() {
        Some(short) => format!("-{short}|--{}", parameter.name()),
        None => format!("--{}", parameter.name()),
    };
    if parameter.is_array() {
        // Arrays also absorb every remaining positional value.
        format!("[[{switch}] <{}>...]", parameter.name())
    } else if !parameter.has_default() {
        format!("<{}>", parameter.name())
    } else if parameter.bare_default().is_some() {
        format!("[{switch}]")
    } else {
        format!("[{switch} <{}>]", parameter.name())
    }
}

fn format_lines(commands: &[&Arc<Command>]) -> Vec<String> {
    let labels: Vec<String> = commands
        .iter()
        .map(|command| {
            let mut label = command.name().to_string();
            for alias in command.aliases() {
                label.push_str(", ");
                label.push_str(alias);
            }
            label
        })
        .collect();
    let longest = labels.iter().map(String::len).max().unwrap_or(0);
    labels
        .iter()
        .zip(commands)
        .map(|(label, command)| {
            format!(
                "{:<width$} {}",
                label,
                command.description().unwrap_or_default(),
                width = longest
            )
            .trim_end()
            .to_string()
        })
        .collect()
}
