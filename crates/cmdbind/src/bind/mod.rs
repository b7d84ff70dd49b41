//! Argument binding.
//!
//! Matches the tokens after a command name against the command's
//! parameters, converts them, and fills in defaults.
//!
//! Tokens are scanned left to right:
//! - `--full` or `-s` naming a parameter is a switch. It takes the next
//!   token as its value unless that token is itself one of the command's
//!   switches; a bare switch falls back to the parameter's default literal.
//!   Array switches may repeat, each occurrence appending one element.
//! - Anything else is positional and fills the next slot not already taken
//!   by a switch. An array slot absorbs every remaining positional value.
//!
//! Slots left empty take the parameter's typed default, or the bind fails.


use std::any::type_name;

use tracing::trace;

use crate::commands::Command;
use crate::error::BindingError;
use crate::value::Value;

/// Per-slot scratch state, discarded once binding finishes.
#[derive(Debug, Default)]
struct ParsedArgument {
    /// Raw value for a single-valued slot.
    raw: Option<String>,
    /// Raw elements for an array slot.
    elements: Vec<String>,
    /// Set once a switch has named this slot; positional values skip it.
    named: bool,
}

impl ParsedArgument {
    fn accepts_positional(&self, is_array: bool) -> bool {
        !self.named && (is_array || self.raw.is_none())
    }
}

/// Bind `tokens` (the arguments after the command name) to `command`'s
/// parameters.
pub fn bind(command: &Command, tokens: &[String]) -> Result<BoundArgs, BindingError> {
    let parameters = command.parameters();
    let mut slots: Vec<ParsedArgument> = parameters
        .iter()
        .map(|_| ParsedArgument::default())
        .collect();
    let mut cursor = 0;

    let mut index = 0;
    while index < tokens.len() {
        let token = &tokens[index];
        index += 1;

        if let Some(slot_index) = command.switch_index(token) {
            let parameter = &parameters[slot_index];
            let value = match tokens.get(index) {
                Some(next) if command.switch_index(next).is_none() => {
                    index += 1;
                    Some(next.clone())
                }
                _ => parameter.bare_default().map(str::to_string),
            };
            trace!(switch = %token, parameter = parameter.name(), ?value, "matched switch");

            let slot = &mut slots[slot_index];
            if parameter.is_array() {
                slot.elements.extend(value);
            } else if slot.named || slot.raw.is_some() {
                return Err(BindingError::DuplicateArgument {
                    parameter: parameter.name().to_string(),
                });
            } else {
                slot.raw = value;
            }
            slot.named = true;
            continue;
        }

        if is_switch_shaped(token) {
            return Err(BindingError::UnknownArgument {
                argument: token.trim_start_matches('-').to_string(),
            });
        }

        while cursor < slots.len()
            && !slots[cursor].accepts_positional(parameters[cursor].is_array())
        {
            cursor += 1;
        }
        let Some(slot) = slots.get_mut(cursor) else {
            return Err(BindingError::TooManyPositionalArguments {
                value: token.clone(),
                expected: parameters.len(),
            });
        };
        trace!(value = %token, parameter = parameters[cursor].name(), "matched positional");
        if parameters[cursor].is_array() {
            slot.elements.push(token.clone());
        } else {
            slot.raw = Some(token.clone());
        }
    }

    // Required arguments are checked before anything is converted.
    for (parameter, slot) in parameters.iter().zip(&slots) {
        if !parameter.is_array() && slot.raw.is_none() && !parameter.has_default() {
            return Err(BindingError::MissingRequiredArgument {
                parameter: parameter.name().to_string(),
            });
        }
    }

    let mut values = Vec::with_capacity(slots.len());
    for (position, (parameter, slot)) in parameters.iter().zip(slots).enumerate() {
        let converter = command.converter(position);
        let conversion_error = |value: &str, source| BindingError::ArgumentConversionError {
            parameter: parameter.name().to_string(),
            value: value.to_string(),
            source,
        };

        let value = if parameter.is_array() {
            if slot.elements.is_empty() && parameter.has_default() {
                parameter.make_default()
            } else {
                let mut elements = Vec::with_capacity(slot.elements.len());
                for raw in &slot.elements {
                    let element = converter
                        .convert(raw)
                        .map_err(|err| conversion_error(raw, err))?;
                    elements.push(element);
                }
                let joined = slot.elements.join(" ");
                Some(
                    parameter
                        .collect(elements)
                        .map_err(|err| conversion_error(&joined, err))?,
                )
            }
        } else {
            match &slot.raw {
                Some(raw) => Some(
                    converter
                        .convert(raw)
                        .map_err(|err| conversion_error(raw, err))?,
                ),
                None => parameter.make_default(),
            }
        };

        let value = value.ok_or_else(|| BindingError::MissingRequiredArgument {
            parameter: parameter.name().to_string(),
        })?;
        values.push(value);
    }

    trace!(command = command.name(), arguments = values.len(), "bound arguments");
    Ok(BoundArgs {
        names: parameters
            .iter()
            .map(|parameter| parameter.name().to_string())
            .collect(),
        values: values.into_iter().map(Some).collect(),
    })
}

/// `--name`, or `-c` with a single letter. Unmatched `-<digit>` tokens are
/// left to bind positionally so negative numbers work.
fn is_switch_shaped(token: &str) -> bool {
    if let Some(name) = token.strip_prefix("--") {
        return !name.is_empty();
    }
    let Some(name) = token.strip_prefix('-') else {
        return false;
    };
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some(ch), None) if ch.is_ascii_alphabetic())
}

/// Converted arguments in declaration order.
#[derive(Debug)]
pub struct BoundArgs {
    names: Vec<String>,
    values: Vec<Option<Value>>,
}

impl BoundArgs {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get<T: 'static>(&self, index: usize) -> Result<&T, BindingError> {
        let value = self.values.get(index).and_then(Option::as_ref);
        value
            .and_then(Value::downcast_ref::<T>)
            .ok_or_else(|| mismatch::<T>(index.to_string(), value))
    }

    pub fn get_named<T: 'static>(&self, name: &str) -> Result<&T, BindingError> {
        match self.position(name) {
            Some(index) => self.get(index),
            None => Err(mismatch::<T>(name.to_string(), None)),
        }
    }

    /// Move a value out. Later calls for the same index fail.
    pub fn take<T: 'static>(&mut self, index: usize) -> Result<T, BindingError> {
        let Some(value) = self.values.get_mut(index).and_then(Option::take) else {
            return Err(mismatch::<T>(index.to_string(), None));
        };
        value.downcast::<T>().map_err(|value| {
            let err = mismatch::<T>(index.to_string(), Some(&value));
            self.values[index] = Some(value);
            err
        })
    }

    pub fn take_named<T: 'static>(&mut self, name: &str) -> Result<T, BindingError> {
        match self.position(name) {
            Some(index) => self.take(index),
            None => Err(mismatch::<T>(name.to_string(), None)),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }
}

fn mismatch<T>(position: String, found: Option<&Value>) -> BindingError {
    BindingError::ArgumentTypeMismatch {
        position,
        expected: type_name::<T>(),
        found: found
            .map(|value| value.type_key().name().to_string())
            .unwrap_or_else(|| "missing".to_string()),
    }
}
