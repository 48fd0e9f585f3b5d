//! Configuration errors and the JSON declaration front-end.

use crate::convert::{ArgumentType, ConversionError, ValueConversionError, ValueConverter};
use crate::descriptor::{ArgumentPolicy, OptionBuilder, OptionSpec};
use crate::option_set::OptionSet;
use crate::registry::Registry;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Default environment variable prefix for shell output.
pub const DEFAULT_PREFIX: &str = "OPT_";

/// Errors raised while declaring options, before any parse happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("option spelling '{0}' is already registered")]
    DuplicateSpelling(String),

    #[error("illegal option spelling '{0}': must be non-empty, not start with '-', and use only letters, digits or '?._-'")]
    IllegalSpelling(String),

    #[error("an option needs at least one spelling")]
    EmptySpellings,

    #[error("malformed option specification '{spec}' at position {position}: {reason}")]
    MalformedSpec {
        spec: String,
        position: usize,
        reason: &'static str,
    },

    #[error("option [{0}] takes no argument but declares a type or default values")]
    ConflictingArgumentPolicy(String),

    #[error("option [{option}] depends on unregistered option '{dependency}'")]
    UnknownDependency { option: String, dependency: String },
}

/// Argument policy as written in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    #[default]
    None,
    Optional,
    Required,
}

impl From<ArgumentKind> for ArgumentPolicy {
    fn from(kind: ArgumentKind) -> Self {
        match kind {
            ArgumentKind::None => ArgumentPolicy::None,
            ArgumentKind::Optional => ArgumentPolicy::Optional,
            ArgumentKind::Required => ArgumentPolicy::Required,
        }
    }
}

/// Value type used to validate arguments declared in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Any string value (default, no validation)
    #[default]
    String,
    /// Signed 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// Boolean (strict "true" or "false" only)
    Bool,
    /// Filesystem path
    Path,
}

impl ValueType {
    /// Check that `raw` converts to this type.
    pub fn check(self, raw: &str) -> Result<(), ValueConversionError> {
        match self {
            ValueType::String => Ok(()),
            ValueType::Int => i64::converter().convert(raw).map(drop),
            ValueType::Float => f64::converter().convert(raw).map(drop),
            ValueType::Bool => bool::converter().convert(raw).map(drop),
            ValueType::Path => PathBuf::converter().convert(raw).map(drop),
        }
    }

    fn name(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Int => "i64",
            ValueType::Float => "f64",
            ValueType::Bool => "bool",
            ValueType::Path => "path",
        }
    }

    /// Raw strings are kept; declared types only validate and label them.
    fn apply(self, builder: OptionBuilder) -> OptionBuilder {
        match self {
            ValueType::String => builder,
            _ => builder.with_values_converted_by(Checked(self)),
        }
    }
}

/// String converter that validates against a [`ValueType`] first.
struct Checked(ValueType);

impl ValueConverter<String> for Checked {
    fn convert(&self, raw: &str) -> Result<String, ValueConversionError> {
        self.0.check(raw).map(|()| raw.to_string())
    }

    fn value_type(&self) -> &'static str {
        self.0.name()
    }
}

/// Declaration of a single option.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionConfig {
    /// Short and long spellings sharing this option
    pub spellings: Vec<String>,
    /// Argument policy: "none", "optional" or "required"
    #[serde(default)]
    pub argument: ArgumentKind,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub default: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub required_if: Vec<String>,
    #[serde(default)]
    pub required_unless: Vec<String>,
    #[serde(default)]
    pub available_if: Vec<String>,
    #[serde(default)]
    pub available_unless: Vec<String>,
    #[serde(default)]
    pub for_help: bool,
    /// Help text for this option
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub argument_description: String,
}

impl OptionConfig {
    fn into_builder(self) -> OptionBuilder {
        let mut builder = OptionBuilder::synonyms(self.spellings)
            .with_policy(self.argument.into())
            .required_if(self.required_if)
            .required_unless(self.required_unless)
            .available_if(self.available_if)
            .available_unless(self.available_unless)
            .described_as(self.description)
            .argument_description(self.argument_description);
        if !self.default.is_empty() {
            builder = builder.defaults_to(self.default);
        }
        if self.required {
            builder = builder.required();
        }
        if self.for_help {
            builder = builder.for_help();
        }
        self.value_type.apply(builder)
    }
}

/// Declaration of the positional arguments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NonOptionConfig {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub value_type: ValueType,
}

/// Top-level JSON declaration of a registry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    /// Name shown in help output
    pub name: Option<String>,
    /// Short-option specification string such as "ab:c::"
    pub spec: Option<String>,
    #[serde(default)]
    pub allow_unrecognized: bool,
    pub allow_abbreviations: Option<bool>,
    #[serde(default)]
    pub posixly_correct: bool,
    /// Environment variable prefix (default: "OPT_")
    pub prefix: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionConfig>,
    pub non_options: Option<NonOptionConfig>,
}

impl RegistryConfig {
    /// Parse a JSON string into a RegistryConfig.
    pub fn from_json(json: &str) -> Result<RegistryConfig, ConfigError> {
        let config: RegistryConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn effective_prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    /// Build a registry, running every declaration through the same checks
    /// as hand-written registrations.
    pub fn to_registry(&self) -> Result<DeclaredRegistry, ConfigError> {
        let mut registry = Registry::new();
        registry
            .allow_unrecognized(self.allow_unrecognized)
            .posixly_correct(self.posixly_correct);
        if let Some(allow) = self.allow_abbreviations {
            registry.allow_abbreviations(allow);
        }

        let mut options = Vec::new();
        if let Some(ref spec) = self.spec {
            options.extend(registry.register_spec(spec)?);
        }
        for option in &self.options {
            options.push(registry.register(option.clone().into_builder())?);
        }

        let non_options = match self.non_options {
            Some(ref declared) => {
                registry.describe_non_options(declared.description.as_str());
                match declared.value_type {
                    ValueType::String => registry.non_options(),
                    value_type => registry.non_options_converted_by(Checked(value_type)),
                }
            }
            None => registry.non_options(),
        };

        Ok(DeclaredRegistry {
            registry,
            options,
            non_options,
        })
    }
}

/// A registry built from JSON, with raw-string handles to what it declares.
#[derive(Debug)]
pub struct DeclaredRegistry {
    pub registry: Registry,
    pub options: Vec<OptionSpec<String>>,
    pub non_options: OptionSpec<String>,
}

impl DeclaredRegistry {
    /// Check every argument in `set` against its declared value type.
    pub fn check_values(&self, set: &OptionSet) -> Result<(), ConversionError> {
        for spec in &self.options {
            set.values(spec)?;
        }
        set.values(&self.non_options)?;
        Ok(())
    }
}
