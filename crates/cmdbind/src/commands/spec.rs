//! Command and parameter descriptors.
//!
//! `CommandSpec` and `ParameterSpec` are builders filled in by the
//! application at startup. Registering a spec validates it and freezes it
//! into a `Command`, which the binder and dispatcher read from.

use std::any::type_name;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::bind::BoundArgs;
use crate::convert::{Converter, ConverterRegistry, ErasedConverter};
use crate::error::{ConversionError, RegistrationError};
use crate::value::{TypeKey, Value};

type SyncHandlerFn = dyn Fn(BoundArgs) -> anyhow::Result<()> + Send + Sync;
type AsyncHandlerFn = dyn Fn(BoundArgs) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;
type CollectFn = fn(Vec<Value>) -> Result<Value, ConversionError>;

/// The function a command runs once its arguments are bound.
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<SyncHandlerFn>),
    Async(Arc<AsyncHandlerFn>),
}

impl Handler {
    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }
}

#[derive(Clone)]
enum DeclaredConverter {
    Instance(ErasedConverter),
    Named(String),
}

#[derive(Clone)]
struct TypedDefault {
    key: TypeKey,
    make: Arc<dyn Fn() -> Value + Send + Sync>,
}

/// Describes one parameter of a command.
#[derive(Clone)]
pub struct ParameterSpec {
    identifier: String,
    full_name: String,
    short_name: Option<String>,
    description: Option<String>,
    element: TypeKey,
    value: TypeKey,
    collect: Option<CollectFn>,
    default_literal: Option<String>,
    default_value: Option<TypedDefault>,
    converter: Option<DeclaredConverter>,
}

impl ParameterSpec {
    /// A single-valued parameter of type `T`.
    ///
    /// `bool` parameters start with a bare-switch default of `"true"`, so
    /// `--flag` alone turns them on.
    pub fn new<T: Send + 'static>(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let element = TypeKey::of::<T>();
        let default_literal = element.is::<bool>().then(|| "true".to_string());
        Self {
            full_name: identifier.clone(),
            identifier,
            short_name: None,
            description: None,
            element,
            value: element,
            collect: None,
            default_literal,
            default_value: None,
            converter: None,
        }
    }

    /// An array parameter binding to `Vec<T>`. Every occurrence of its
    /// switch appends one converted element; a bare `bool` switch appends
    /// `true`.
    pub fn array<T: Send + 'static>(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let default_literal = TypeKey::of::<T>().is::<bool>().then(|| "true".to_string());
        Self {
            full_name: identifier.clone(),
            identifier,
            short_name: None,
            description: None,
            element: TypeKey::of::<T>(),
            value: TypeKey::of::<Vec<T>>(),
            collect: Some(collect_values::<T>),
            default_literal,
            default_value: None,
            converter: None,
        }
    }

    /// Switch name used as `--name`. Defaults to the identifier.
    pub fn full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = name.into();
        self
    }

    /// Switch name used as `-s`; must be one ASCII letter or digit.
    pub fn short(mut self, name: impl Into<String>) -> Self {
        self.short_name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Literal used when the switch is present without a value.
    pub fn default_literal(mut self, literal: impl Into<String>) -> Self {
        self.default_literal = Some(literal.into());
        self
    }

    /// Typed value used when the argument is absent altogether.
    /// For array parameters this is the whole `Vec<T>`.
    pub fn default_value<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.default_value = Some(TypedDefault {
            key: TypeKey::of::<T>(),
            make: Arc::new(move || Value::new(value.clone())),
        });
        self
    }

    /// Use a `C` built with `Default` instead of the registry's converter.
    pub fn converter<C: Converter + Default>(self) -> Self {
        self.converter_with(C::default())
    }

    pub fn converter_with<C: Converter>(mut self, converter: C) -> Self {
        self.converter = Some(DeclaredConverter::Instance(ErasedConverter::of(converter)));
        self
    }

    /// Use the converter factory registered under `name`.
    pub fn converter_named(mut self, name: impl Into<String>) -> Self {
        self.converter = Some(DeclaredConverter::Named(name.into()));
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        &self.full_name
    }

    pub fn short_name(&self) -> Option<&str> {
        self.short_name.as_deref()
    }

    pub fn describe(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_array(&self) -> bool {
        self.collect.is_some()
    }

    pub fn element_type(&self) -> TypeKey {
        self.element
    }

    pub fn bare_default(&self) -> Option<&str> {
        self.default_literal.as_deref()
    }

    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }

    pub(crate) fn make_default(&self) -> Option<Value> {
        self.default_value.as_ref().map(|default| (default.make)())
    }

    pub(crate) fn collect(&self, values: Vec<Value>) -> Result<Value, ConversionError> {
        match self.collect {
            Some(collect) => collect(values),
            None => values
                .into_iter()
                .next()
                .ok_or_else(|| ConversionError::new("no value")),
        }
    }
}

fn collect_values<T: Send + 'static>(values: Vec<Value>) -> Result<Value, ConversionError> {
    let mut items = Vec::with_capacity(values.len());
    for value in values {
        let found = value.type_key();
        let item = value.downcast::<T>().map_err(|_| {
            ConversionError::new(format!(
                "converter produced {found}, expected {}",
                type_name::<T>()
            ))
        })?;
        items.push(item);
    }
    Ok(Value::new(items))
}

/// Describes a command before registration.
#[derive(Clone)]
pub struct CommandSpec {
    name: String,
    aliases: Vec<String>,
    case_sensitive: Option<bool>,
    description: Option<String>,
    parameters: Vec<ParameterSpec>,
    handler: Handler,
}

impl CommandSpec {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(BoundArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::with_handler(name, Handler::Sync(Arc::new(handler)))
    }

    pub fn new_async<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::with_handler(
            name,
            Handler::Async(Arc::new(move |args: BoundArgs| handler(args).boxed())),
        )
    }

    pub fn with_handler(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            case_sensitive: None,
            description: None,
            parameters: Vec::new(),
            handler,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Unset means the registry default applies.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A validated, registered command.
pub struct Command {
    name: String,
    aliases: Vec<String>,
    case_sensitive: bool,
    description: Option<String>,
    parameters: Vec<ParameterSpec>,
    converters: Vec<ErasedConverter>,
    switches: HashMap<String, usize>,
    handler: Handler,
}

impl Command {
    pub(crate) fn build(
        spec: CommandSpec,
        converters: &ConverterRegistry,
        default_case_sensitive: bool,
    ) -> Result<Self, RegistrationError> {
        for name in std::iter::once(&spec.name).chain(&spec.aliases) {
            if !is_valid_command_name(name) {
                return Err(RegistrationError::InvalidCommandName { name: name.clone() });
            }
        }

        let case_sensitive = spec.case_sensitive.unwrap_or(default_case_sensitive);
        let command = spec.name.clone();

        // Full names and short names share one namespace.
        let mut taken: HashMap<String, usize> = HashMap::new();
        let mut switches = HashMap::new();
        let mut resolved = Vec::with_capacity(spec.parameters.len());

        for (index, parameter) in spec.parameters.iter().enumerate() {
            if !is_valid_command_name(&parameter.full_name) {
                return Err(RegistrationError::InvalidParameterName {
                    command,
                    parameter: parameter.identifier.clone(),
                    name: parameter.full_name.clone(),
                });
            }
            let full = fold(&parameter.full_name, case_sensitive);
            let mut names = vec![(full.clone(), format!("--{full}"))];
            if let Some(short) = &parameter.short_name {
                if !is_valid_short_name(short) {
                    return Err(RegistrationError::InvalidShortName {
                        command,
                        parameter: parameter.identifier.clone(),
                        short: short.clone(),
                    });
                }
                names.push((short.clone(), format!("-{short}")));
            }
            for (name, switch) in names {
                if let Some(&other) = taken.get(&name) {
                    return Err(RegistrationError::ParameterNameConflict {
                        command,
                        parameter: parameter.identifier.clone(),
                        conflicts_with: spec.parameters[other].identifier.clone(),
                    });
                }
                taken.insert(name, index);
                switches.insert(switch, index);
            }

            if let Some(default) = &parameter.default_value {
                if default.key != parameter.value {
                    return Err(RegistrationError::DefaultTypeInvalid {
                        command,
                        parameter: parameter.identifier.clone(),
                        expected: parameter.value,
                        found: default.key,
                    });
                }
            }

            resolved.push(resolve_converter(&command, parameter, converters)?);
        }

        Ok(Self {
            name: spec.name,
            aliases: spec.aliases,
            case_sensitive,
            description: spec.description,
            parameters: spec.parameters,
            converters: resolved,
            switches,
            handler: spec.handler,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub(crate) fn converter(&self, index: usize) -> &ErasedConverter {
        &self.converters[index]
    }

    /// Parameter index named by a `--full` or `-s` token, if any.
    pub fn switch_index(&self, token: &str) -> Option<usize> {
        if token.starts_with("--") && !self.case_sensitive {
            return self.switches.get(&token.to_lowercase()).copied();
        }
        self.switches.get(token).copied()
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("case_sensitive", &self.case_sensitive)
            .field(
                "parameters",
                &self
                    .parameters
                    .iter()
                    .map(|parameter| parameter.full_name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn resolve_converter(
    command: &str,
    parameter: &ParameterSpec,
    converters: &ConverterRegistry,
) -> Result<ErasedConverter, RegistrationError> {
    let converter = match &parameter.converter {
        Some(DeclaredConverter::Instance(converter)) => converter.clone(),
        Some(DeclaredConverter::Named(name)) => converters.construct(name).map_err(|reason| {
            RegistrationError::ConverterNotConstructible {
                command: command.to_string(),
                parameter: parameter.identifier.clone(),
                converter: name.clone(),
                reason,
            }
        })?,
        None => converters
            .override_for(command, &parameter.full_name)
            .or_else(|| converters.get(&parameter.element))
            .cloned()
            .ok_or_else(|| RegistrationError::MissingConverter {
                command: command.to_string(),
                parameter: parameter.identifier.clone(),
                type_key: parameter.element,
            })?,
    };

    if converter.output() != parameter.element {
        return Err(RegistrationError::ConverterTypeInvalid {
            command: command.to_string(),
            parameter: parameter.identifier.clone(),
            converter: converter.name().to_string(),
            expected: parameter.element,
            found: converter.output(),
        });
    }
    Ok(converter)
}

fn fold(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

pub(crate) fn is_valid_command_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('-') && !name.chars().any(char::is_whitespace)
}

fn is_valid_short_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some(ch), None) if ch.is_ascii_alphanumeric())
}
