//! Error types for registration, binding and dispatch.
//!
//! Registration errors are configuration bugs and should abort startup.
//! Everything else is recoverable per input line.

use thiserror::Error;

use crate::value::TypeKey;

/// A converter rejected a raw token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Problems found while registering commands or converters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Two parameters share a full or short switch name.
    #[error("command '{command}': parameter '{parameter}' conflicts with parameter '{conflicts_with}'")]
    ParameterNameConflict {
        command: String,
        parameter: String,
        conflicts_with: String,
    },

    #[error("command '{command}': switch name '{name}' of parameter '{parameter}' must be non-empty, without whitespace or a leading '-'")]
    InvalidParameterName {
        command: String,
        parameter: String,
        name: String,
    },

    #[error("command '{command}': short name '{short}' of parameter '{parameter}' must be a single letter or digit")]
    InvalidShortName {
        command: String,
        parameter: String,
        short: String,
    },

    /// A parameter's converter produces a different type than the parameter declares.
    #[error("command '{command}': converter '{converter}' for parameter '{parameter}' produces {found}, expected {expected}")]
    ConverterTypeInvalid {
        command: String,
        parameter: String,
        converter: String,
        expected: TypeKey,
        found: TypeKey,
    },

    #[error("command '{command}': converter '{converter}' for parameter '{parameter}' could not be constructed: {reason}")]
    ConverterNotConstructible {
        command: String,
        parameter: String,
        converter: String,
        reason: String,
    },

    /// A parameter default has a different type than the parameter declares.
    #[error("command '{command}': default for parameter '{parameter}' is {found}, expected {expected}")]
    DefaultTypeInvalid {
        command: String,
        parameter: String,
        expected: TypeKey,
        found: TypeKey,
    },

    #[error("command '{command}': no converter registered for type {type_key} of parameter '{parameter}'")]
    MissingConverter {
        command: String,
        parameter: String,
        type_key: TypeKey,
    },

    #[error("invalid command name '{name}'")]
    InvalidCommandName { name: String },

    /// A command name or alias is already taken.
    #[error("command name '{name}' is already registered")]
    DuplicateCommand { name: String },

    #[error("alias '{alias}' points at unknown command '{target}'")]
    UnknownAliasTarget { alias: String, target: String },
}

/// Problems binding tokens to a command's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("missing required argument '{parameter}'")]
    MissingRequiredArgument { parameter: String },

    #[error("unknown argument '{argument}'")]
    UnknownArgument { argument: String },

    #[error("unexpected argument '{value}' (expected at most {expected} positional arguments)")]
    TooManyPositionalArguments { value: String, expected: usize },

    #[error("argument '{parameter}' was given more than once")]
    DuplicateArgument { parameter: String },

    #[error("invalid value '{value}' for argument '{parameter}': {source}")]
    ArgumentConversionError {
        parameter: String,
        value: String,
        #[source]
        source: ConversionError,
    },

    /// A handler asked for a bound argument with the wrong type or position.
    #[error("argument {position} is {found}, not {expected}")]
    ArgumentTypeMismatch {
        position: String,
        expected: &'static str,
        found: String,
    },
}

/// Failure of a single dispatch call.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Command \"{command}\" not found.")]
    UnknownCommand { command: String },

    #[error("{command}: {source}")]
    Binding {
        command: String,
        #[source]
        source: BindingError,
    },

    /// The handler's own error, passed through untouched.
    #[error(transparent)]
    Handler(anyhow::Error),
}

impl DispatchError {
    pub fn binding(&self) -> Option<&BindingError> {
        match self {
            DispatchError::Binding { source, .. } => Some(source),
            _ => None,
        }
    }
}
