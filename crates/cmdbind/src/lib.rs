//! Command dispatch with typed argument binding.
//!
//! Applications declare commands once at startup through [`CommandSpec`] and
//! [`ParameterSpec`], register them in a [`CommandRegistry`], and hand the
//! registry to a [`Dispatcher`]. Each input line is tokenized, resolved to a
//! command, bound to typed values by the registered converters and passed to
//! the command's handler.
//!
//! ```no_run
//! use cmdbind::{CommandRegistry, CommandSpec, Dispatcher, ParameterSpec};
//!
//! let mut registry = CommandRegistry::new();
//! registry
//!     .register(
//!         CommandSpec::new("greet", |args| {
//!             let name = args.get::<String>(0)?;
//!             let times = args.get::<u32>(1)?;
//!             for _ in 0..*times {
//!                 println!("hello {name}");
//!             }
//!             Ok(())
//!         })
//!         .parameter(ParameterSpec::new::<String>("name"))
//!         .parameter(ParameterSpec::new::<u32>("times").short('t').default_value(1_u32)),
//!     )
//!     .expect("valid command");
//!
//! let dispatcher = Dispatcher::new(registry);
//! dispatcher.dispatch_line("greet \"Ada Lovelace\" -t 2").expect("dispatch");
//! ```

pub mod bind;
pub mod commands;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod value;

#[cfg(test)]
mod test_utils;

pub use bind::{bind, BoundArgs};
pub use commands::{
    complete_input, tokenize, Command, CommandRegistry, CommandSpec, Handler, ParameterSpec,
};
pub use config::{load_config, Config};
pub use convert::{Converter, ConverterRegistry};
pub use dispatch::{Dispatched, Dispatcher};
pub use error::{BindingError, ConversionError, DispatchError, RegistrationError};
pub use value::{TypeKey, Value};
