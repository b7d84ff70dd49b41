//! String-to-value converters.
//!
//! Every parameter type needs exactly one converter. The registry holds the
//! per-type defaults, named factories that parameters can opt into, and
//! per-parameter overrides keyed by `(command, parameter)`.

mod builtin;

pub use builtin::{BoolConverter, ParseConverter, StringConverter};


use std::collections::HashMap;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::error::ConversionError;
use crate::value::{TypeKey, Value};

/// Converts one raw token into a typed value.
///
/// Implementations must be pure functions of the input string. Converters
/// declared on a parameter by type must also implement `Default`.
pub trait Converter: Send + Sync + 'static {
    type Output: Send + 'static;

    fn convert(&self, raw: &str) -> Result<Self::Output, ConversionError>;
}

/// Adapts a plain function or closure into a `Converter`.
pub struct FnConverter<F, T> {
    f: F,
    _output: PhantomData<fn() -> T>,
}

impl<F, T> FnConverter<F, T> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _output: PhantomData,
        }
    }
}

impl<F, T, E> Converter for FnConverter<F, T>
where
    F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Display,
{
    type Output = T;

    fn convert(&self, raw: &str) -> Result<T, ConversionError> {
        (self.f)(raw).map_err(|err| ConversionError::new(err.to_string()))
    }
}

type ConvertFn = dyn Fn(&str) -> Result<Value, ConversionError> + Send + Sync;
type FactoryFn = dyn Fn() -> Result<ErasedConverter, String> + Send + Sync;

/// A converter with its output type erased, ready to be stored per parameter.
#[derive(Clone)]
pub struct ErasedConverter {
    name: String,
    output: TypeKey,
    convert: Arc<ConvertFn>,
}

impl ErasedConverter {
    pub fn new<C: Converter>(name: impl Into<String>, converter: C) -> Self {
        Self {
            name: name.into(),
            output: TypeKey::of::<C::Output>(),
            convert: Arc::new(move |raw: &str| converter.convert(raw).map(Value::new)),
        }
    }

    pub fn of<C: Converter>(converter: C) -> Self {
        Self::new(std::any::type_name::<C>(), converter)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output(&self) -> TypeKey {
        self.output
    }

    pub fn convert(&self, raw: &str) -> Result<Value, ConversionError> {
        (self.convert)(raw)
    }
}

impl std::fmt::Debug for ErasedConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasedConverter")
            .field("name", &self.name)
            .field("output", &self.output)
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct ConverterRegistry {
    defaults: HashMap<TypeKey, ErasedConverter>,
    factories: HashMap<String, Arc<FactoryFn>>,
    overrides: HashMap<(String, String), ErasedConverter>,
}

impl ConverterRegistry {
    /// An empty registry, without even the builtin converters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with converters for strings, booleans, numbers,
    /// `char` and `PathBuf`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    /// Set the default converter for `C::Output`, replacing any earlier one.
    pub fn register<C: Converter>(&mut self, converter: C) -> &mut Self {
        self.insert_default(ErasedConverter::of(converter))
    }

    pub fn register_fn<T, E, F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        T: Send + 'static,
        E: Display,
    {
        let name = std::any::type_name::<T>();
        self.insert_default(ErasedConverter::new(name, FnConverter::<F, T>::new(f)))
    }

    fn insert_default(&mut self, converter: ErasedConverter) -> &mut Self {
        debug!(output = %converter.output(), converter = converter.name(), "registered converter");
        self.defaults.insert(converter.output(), converter);
        self
    }

    /// Register a named converter factory that parameters can refer to with
    /// `ParameterSpec::converter_named`. The factory runs once per parameter
    /// at command registration.
    pub fn register_factory<C, E, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        C: Converter,
        E: Display,
        F: Fn() -> Result<C, E> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        self.factories.insert(
            name,
            Arc::new(move || {
                factory()
                    .map(|converter| ErasedConverter::new(label.clone(), converter))
                    .map_err(|err| err.to_string())
            }),
        );
        self
    }

    /// Override the converter of one parameter of one command.
    ///
    /// Must happen before the command is registered.
    pub fn register_override<C: Converter>(
        &mut self,
        command: impl Into<String>,
        parameter: impl Into<String>,
        converter: C,
    ) -> &mut Self {
        self.overrides.insert(
            (command.into(), parameter.into()),
            ErasedConverter::of(converter),
        );
        self
    }

    pub fn get(&self, key: &TypeKey) -> Option<&ErasedConverter> {
        self.defaults.get(key)
    }

    pub(crate) fn override_for(&self, command: &str, parameter: &str) -> Option<&ErasedConverter> {
        self.overrides
            .get(&(command.to_string(), parameter.to_string()))
    }

    /// Build a converter from a named factory.
    ///
    /// The error is a human-readable reason, reported by the caller as
    /// `ConverterNotConstructible`.
    pub(crate) fn construct(&self, name: &str) -> Result<ErasedConverter, String> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| format!("no converter factory named '{name}'"))?;
        factory()
    }

    /// Convert a raw string with the default converter for `key`.
    pub fn convert(&self, key: &TypeKey, raw: &str) -> Result<Value, ConversionError> {
        let converter = self
            .get(key)
            .ok_or_else(|| ConversionError::new(format!("no converter for type {key}")))?;
        converter.convert(raw)
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.defaults.keys().map(TypeKey::name).collect();
        types.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("types", &types)
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("overrides", &self.overrides.len())
            .finish()
    }
}
