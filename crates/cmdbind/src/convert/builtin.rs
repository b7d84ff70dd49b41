use std::any::type_name;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use super::{Converter, ConverterRegistry};
use crate::error::ConversionError;

/// Converter for any type with a `FromStr` implementation.
pub struct ParseConverter<T>(std::marker::PhantomData<fn() -> T>);

impl<T> Default for ParseConverter<T> {
    fn default() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<T> Converter for ParseConverter<T>
where
    T: FromStr + Send + 'static,
    T::Err: Display,
{
    type Output = T;

    fn convert(&self, raw: &str) -> Result<T, ConversionError> {
        raw.parse::<T>().map_err(|err| {
            ConversionError::new(format!("expected {}: {err}", short_type_name::<T>()))
        })
    }
}

/// Accepts `true/false`, `yes/no`, `on/off` and `1/0`, ignoring case.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoolConverter;

impl Converter for BoolConverter {
    type Output = bool;

    fn convert(&self, raw: &str) -> Result<bool, ConversionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(ConversionError::new("expected true or false")),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl Converter for StringConverter {
    type Output = String;

    fn convert(&self, raw: &str) -> Result<String, ConversionError> {
        Ok(raw.to_string())
    }
}

fn short_type_name<T>() -> &'static str {
    let name = type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

macro_rules! register_parsed {
    ($registry:expr, $($ty:ty),+ $(,)?) => {
        $( $registry.register(ParseConverter::<$ty>::default()); )+
    };
}

pub(super) fn register_builtins(registry: &mut ConverterRegistry) {
    registry.register(StringConverter);
    registry.register(BoolConverter);
    register_parsed!(
        registry, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char,
        PathBuf,
    );
}
