//! Configuration loading and merging.
//!
//! Config is loaded from two sources with the project taking precedence:
//! 1. User-level: `$XDG_CONFIG_HOME/cmdbind/config.toml` (or `~/.config/...`)
//! 2. Project-level: `<root>/.cmdbind/config.toml`
//!
//! Controls the default command case mode, extra command aliases and
//! how many hint lines are shown. Uses TOML format with serde.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::commands::CommandRegistry;
use crate::error::RegistrationError;

const DEFAULT_HINT_LIMIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub commands: CommandsConfig,
    pub help: HelpConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandsConfig {
    pub case_sensitive: bool,
    /// alias -> command name
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpConfig {
    pub hint_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        merge_config(None, None)
    }
}

impl Config {
    /// An empty registry using the configured default case mode.
    pub fn registry(&self) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.set_default_case_sensitive(self.commands.case_sensitive);
        registry
    }

    /// Add the configured aliases; call after the commands are registered.
    pub fn apply_aliases(&self, registry: &mut CommandRegistry) -> Result<(), RegistrationError> {
        for (alias, target) in &self.commands.aliases {
            registry.add_alias(alias, target)?;
        }
        Ok(())
    }

    /// Hint lines for a partially typed command, capped at `hint_limit`.
    pub fn hints(&self, registry: &CommandRegistry, prefix: &str) -> Vec<String> {
        registry.hint_lines(prefix, self.help.hint_limit)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    commands: Option<RawCommands>,
    help: Option<RawHelp>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCommands {
    #[serde(alias = "caseSensitive")]
    case_sensitive: Option<bool>,
    aliases: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawHelp {
    #[serde(alias = "hintLimit")]
    hint_limit: Option<usize>,
}

fn read_toml(path: &Path) -> Option<RawConfig> {
    let contents = fs::read_to_string(path).ok()?;
    if contents.trim().is_empty() {
        return None;
    }
    match toml::from_str::<RawConfig>(&contents) {
        Ok(config) => Some(config),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable config");
            None
        }
    }
}

fn merge_config(user: Option<RawConfig>, project: Option<RawConfig>) -> Config {
    let project_commands = project.as_ref().and_then(|c| c.commands.as_ref());
    let user_commands = user.as_ref().and_then(|c| c.commands.as_ref());
    let case_sensitive = project_commands
        .and_then(|c| c.case_sensitive)
        .or_else(|| user_commands.and_then(|c| c.case_sensitive))
        .unwrap_or(false);

    let mut aliases = BTreeMap::new();
    for commands in [user_commands, project_commands].into_iter().flatten() {
        if let Some(entries) = &commands.aliases {
            aliases.extend(entries.clone());
        }
    }

    let project_help = project.as_ref().and_then(|c| c.help.as_ref());
    let user_help = user.as_ref().and_then(|c| c.help.as_ref());
    let hint_limit = project_help
        .and_then(|h| h.hint_limit)
        .or_else(|| user_help.and_then(|h| h.hint_limit))
        .unwrap_or(DEFAULT_HINT_LIMIT);

    Config {
        commands: CommandsConfig {
            case_sensitive,
            aliases,
        },
        help: HelpConfig { hint_limit },
    }
}

fn project_config_path(root: &Path) -> PathBuf {
    root.join(".cmdbind").join("config.toml")
}

fn user_config_path() -> Option<PathBuf> {
    let base = match env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()?.join(".config"),
    };
    Some(base.join("cmdbind").join("config.toml"))
}

pub fn load_config(root: &Path) -> Config {
    let project_config = read_toml(&project_config_path(root));
    let user_config = user_config_path().and_then(|path| read_toml(&path));

    merge_config(user_config, project_config)
}

#[cfg(test)]
mod tests;
