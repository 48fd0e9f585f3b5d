//! optset - POSIX/GNU-style option parsing with typed option handles.
//!
//! This library provides a registry of declared options, a parser that
//! turns argument vectors into an [`OptionSet`], typed value conversion
//! through [`OptionSpec`] handles, help text generation, and exporting
//! parsed values as shell statements.

pub mod config;
pub mod convert;
pub mod descriptor;
pub mod help;
pub mod option_set;
pub mod output;
pub mod parser;
pub mod registry;
pub mod tokenizer;

pub use config::{ConfigError, DeclaredRegistry, RegistryConfig};
pub use convert::{
    ArgumentType, ConversionError, FnConverter, FromStrConverter, ValueConversionError,
    ValueConverter,
};
pub use descriptor::{ArgumentPolicy, OptionBuilder, OptionDescriptor, OptionSpec};
pub use help::{generate_help, help_rows, HelpRow};
pub use option_set::{OptionKey, OptionSet};
pub use output::{export_properties, generate_output, generate_output_string, VariableCollision};
pub use parser::{parse, ParseError};
pub use registry::{Registry, RegistryId};
pub use tokenizer::SpecTokenizer;
