use super::{load_config, user_config_path, Config};
use crate::commands::CommandSpec;
use crate::error::RegistrationError;
use crate::test_utils::{env_lock, EnvVarGuard};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create config dir");
    }
    fs::write(path, contents).expect("write config");
}

#[test]
fn load_config_uses_defaults_when_missing() {
    let _lock = env_lock();
    let home = TempDir::new().expect("temp home");
    let config_home = TempDir::new().expect("temp config");
    let _home = EnvVarGuard::set("HOME", home.path());
    let _config_home = EnvVarGuard::set("XDG_CONFIG_HOME", config_home.path());

    let project = TempDir::new().expect("temp project");
    let config = load_config(project.path());

    assert_eq!(config, Config::default());
    assert!(!config.commands.case_sensitive);
    assert!(config.commands.aliases.is_empty());
    assert_eq!(config.help.hint_limit, 8);
}

#[test]
fn load_config_merges_user_and_project() {
    let _lock = env_lock();
    let config_home = TempDir::new().expect("temp config");
    let _config_home = EnvVarGuard::set("XDG_CONFIG_HOME", config_home.path());

    write_config(
        &config_home.path().join("cmdbind").join("config.toml"),
        r#"
[commands]
case_sensitive = true

[commands.aliases]
ps = "stats"
get = "pull"

[help]
hint_limit = 3
"#,
    );

    let project = TempDir::new().expect("temp project");
    write_config(
        &project.path().join(".cmdbind").join("config.toml"),
        r#"
[commands]
caseSensitive = false

[commands.aliases]
get = "fetch"
"#,
    );

    let config = load_config(project.path());

    assert!(!config.commands.case_sensitive);
    assert_eq!(config.commands.aliases.get("ps").map(String::as_str), Some("stats"));
    assert_eq!(config.commands.aliases.get("get").map(String::as_str), Some("fetch"));
    assert_eq!(config.help.hint_limit, 3);
}

#[test]
fn unreadable_config_falls_back_to_defaults() {
    let _lock = env_lock();
    let config_home = TempDir::new().expect("temp config");
    let _config_home = EnvVarGuard::set("XDG_CONFIG_HOME", config_home.path());
    write_config(
        &config_home.path().join("cmdbind").join("config.toml"),
        "[commands\ncase_sensitive = ",
    );

    let project = TempDir::new().expect("temp project");
    write_config(&project.path().join(".cmdbind").join("config.toml"), "  \n");

    assert_eq!(load_config(project.path()), Config::default());
}

#[test]
fn user_config_path_falls_back_to_home() {
    let _lock = env_lock();
    let home = TempDir::new().expect("temp home");
    let _home = EnvVarGuard::set("HOME", home.path());
    let _config_home = EnvVarGuard::set("XDG_CONFIG_HOME", "");

    let path = user_config_path().expect("config path");
    assert_eq!(
        path,
        home.path().join(".config").join("cmdbind").join("config.toml")
    );
}

#[test]
fn config_builds_registry_and_aliases() {
    let mut config = Config::default();
    config.commands.case_sensitive = true;
    config
        .commands
        .aliases
        .insert("ps".to_string(), "stats".to_string());

    let mut registry = config.registry();
    assert!(registry.default_case_sensitive());
    registry
        .register(CommandSpec::new("stats", |_| Ok(())))
        .expect("register stats");
    config.apply_aliases(&mut registry).expect("aliases");

    assert_eq!(registry.resolve("ps").expect("ps").name(), "stats");
    assert!(registry.resolve("STATS").is_none());
}

#[test]
fn aliases_to_unknown_commands_are_rejected() {
    let mut config = Config::default();
    config
        .commands
        .aliases
        .insert("get".to_string(), "pull".to_string());

    let mut registry = config.registry();
    let err = config.apply_aliases(&mut registry).unwrap_err();
    assert_eq!(
        err,
        RegistrationError::UnknownAliasTarget {
            alias: "get".to_string(),
            target: "pull".to_string(),
        }
    );
}

#[test]
fn hints_respect_hint_limit() {
    let mut config = Config::default();
    config.help.hint_limit = 2;
    let mut registry = config.registry();
    for name in ["start", "stats", "stop"] {
        registry
            .register(CommandSpec::new(name, |_| Ok(())))
            .expect("register");
    }
    assert_eq!(
        config.hints(&registry, "st"),
        vec!["start".to_string(), "stats".to_string()]
    );
}
