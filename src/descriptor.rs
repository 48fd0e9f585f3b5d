//! Option descriptors and the builder that produces them.

use crate::config::ConfigError;
use crate::convert::{
    type_indicator, ArgumentType, ConversionError, SharedConverter, ValueConverter,
};
use crate::option_set::OptionSet;
use crate::registry::RegistryId;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Whether an option consumes an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgumentPolicy {
    /// Plain flag; an inline argument is an error.
    #[default]
    None,
    /// Argument only when attached (`--opt=value`, `-ovalue`).
    Optional,
    /// Argument attached or taken from the next token.
    Required,
}

impl ArgumentPolicy {
    pub fn accepts_argument(self) -> bool {
        self != ArgumentPolicy::None
    }

    pub fn requires_argument(self) -> bool {
        self == ArgumentPolicy::Required
    }
}

/// Immutable description of one logical option and all of its spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDescriptor {
    spellings: Vec<String>,
    policy: ArgumentPolicy,
    defaults: Vec<String>,
    required: bool,
    required_if: Vec<String>,
    required_unless: Vec<String>,
    available_if: Vec<String>,
    available_unless: Vec<String>,
    for_help: bool,
    description: String,
    argument_description: String,
    type_indicator: Option<String>,
    non_options: bool,
}

impl OptionDescriptor {
    pub(crate) fn non_options(description: String, type_indicator: Option<String>) -> Self {
        Self {
            spellings: Vec::new(),
            policy: ArgumentPolicy::Optional,
            defaults: Vec::new(),
            required: false,
            required_if: Vec::new(),
            required_unless: Vec::new(),
            available_if: Vec::new(),
            available_unless: Vec::new(),
            for_help: false,
            description,
            argument_description: String::new(),
            type_indicator,
            non_options: true,
        }
    }

    /// Short spellings first, then long ones, each group sorted.
    pub fn spellings(&self) -> &[String] {
        &self.spellings
    }

    pub fn policy(&self) -> ArgumentPolicy {
        self.policy
    }

    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn required_if(&self) -> &[String] {
        &self.required_if
    }

    pub fn required_unless(&self) -> &[String] {
        &self.required_unless
    }

    pub fn available_if(&self) -> &[String] {
        &self.available_if
    }

    pub fn available_unless(&self) -> &[String] {
        &self.available_unless
    }

    pub fn is_for_help(&self) -> bool {
        self.for_help
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn argument_description(&self) -> &str {
        &self.argument_description
    }

    /// Converter pattern or type name, if a type was declared.
    pub fn type_indicator(&self) -> Option<&str> {
        self.type_indicator.as_deref()
    }

    pub fn represents_non_options(&self) -> bool {
        self.non_options
    }

    /// Preferred long spelling, falling back to the first spelling.
    pub fn primary_spelling(&self) -> Option<&str> {
        self.spellings
            .iter()
            .find(|s| s.chars().count() > 1)
            .or_else(|| self.spellings.first())
            .map(String::as_str)
    }

    pub(crate) fn has_conditions(&self) -> bool {
        !(self.required_if.is_empty()
            && self.required_unless.is_empty()
            && self.available_if.is_empty()
            && self.available_unless.is_empty())
    }

    pub(crate) fn dependencies(&self) -> impl Iterator<Item = &String> {
        self.required_if
            .iter()
            .chain(&self.required_unless)
            .chain(&self.available_if)
            .chain(&self.available_unless)
    }
}

impl fmt::Display for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.non_options {
            return f.write_str("[non-option arguments]");
        }
        write!(f, "[{}]", self.spellings.join(", "))
    }
}

/// Check that a spelling may name an option.
pub fn validate_spelling(spelling: &str) -> Result<(), ConfigError> {
    if spelling.is_empty() || spelling.starts_with('-') {
        return Err(ConfigError::IllegalSpelling(spelling.to_string()));
    }
    let legal = spelling
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '?' | '.' | '_' | '-'));
    if !legal {
        return Err(ConfigError::IllegalSpelling(spelling.to_string()));
    }
    Ok(())
}

fn arrange_spellings(spellings: Vec<String>) -> Vec<String> {
    let (mut short, mut long): (Vec<String>, Vec<String>) =
        spellings.into_iter().partition(|s| s.chars().count() == 1);
    short.sort();
    long.sort();
    short.extend(long);
    short
}

fn collect_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

/// Fluent declaration of an option, consumed by `Registry::register`.
pub struct OptionBuilder<T = String> {
    spellings: Vec<String>,
    policy: ArgumentPolicy,
    converter: SharedConverter<T>,
    typed: bool,
    defaults: Vec<String>,
    required: bool,
    required_if: Vec<String>,
    required_unless: Vec<String>,
    available_if: Vec<String>,
    available_unless: Vec<String>,
    for_help: bool,
    description: String,
    argument_description: String,
}

impl OptionBuilder<String> {
    /// Declare an option with a single spelling.
    pub fn new(spelling: impl Into<String>) -> Self {
        Self::synonyms([spelling.into()])
    }

    /// Declare one option answering to every given spelling.
    pub fn synonyms<I, S>(spellings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            spellings: collect_strings(spellings),
            policy: ArgumentPolicy::None,
            converter: String::converter(),
            typed: false,
            defaults: Vec::new(),
            required: false,
            required_if: Vec::new(),
            required_unless: Vec::new(),
            available_if: Vec::new(),
            available_unless: Vec::new(),
            for_help: false,
            description: String::new(),
            argument_description: String::new(),
        }
    }
}

impl<T: 'static> OptionBuilder<T> {
    pub fn with_required_arg(mut self) -> Self {
        self.policy = ArgumentPolicy::Required;
        self
    }

    pub fn with_optional_arg(mut self) -> Self {
        self.policy = ArgumentPolicy::Optional;
        self
    }

    pub(crate) fn with_policy(mut self, policy: ArgumentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Convert arguments with the built-in converter for `U`.
    pub fn of_type<U: ArgumentType>(self) -> OptionBuilder<U> {
        self.retype(U::converter())
    }

    /// Convert arguments with a caller-supplied converter.
    pub fn with_values_converted_by<U, C>(self, converter: C) -> OptionBuilder<U>
    where
        C: ValueConverter<U> + Send + Sync + 'static,
    {
        self.retype(Arc::new(converter))
    }

    fn retype<U>(self, converter: SharedConverter<U>) -> OptionBuilder<U> {
        OptionBuilder {
            spellings: self.spellings,
            policy: self.policy,
            converter,
            typed: true,
            defaults: self.defaults,
            required: self.required,
            required_if: self.required_if,
            required_unless: self.required_unless,
            available_if: self.available_if,
            available_unless: self.available_unless,
            for_help: self.for_help,
            description: self.description,
            argument_description: self.argument_description,
        }
    }

    /// Raw values used when the option never appears.
    pub fn defaults_to<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults = collect_strings(values);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Required whenever any of `others` is present.
    pub fn required_if<I, S>(mut self, others: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_if.extend(collect_strings(others));
        self
    }

    /// Required unless at least one of `others` is present.
    pub fn required_unless<I, S>(mut self, others: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_unless.extend(collect_strings(others));
        self
    }

    /// Only allowed when all of `others` are present.
    pub fn available_if<I, S>(mut self, others: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_if.extend(collect_strings(others));
        self
    }

    /// Not allowed together with any of `others`.
    pub fn available_unless<I, S>(mut self, others: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_unless.extend(collect_strings(others));
        self
    }

    pub fn for_help(mut self) -> Self {
        self.for_help = true;
        self
    }

    pub fn described_as(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn argument_description(mut self, description: impl Into<String>) -> Self {
        self.argument_description = description.into();
        self
    }

    pub(crate) fn build(self) -> Result<(OptionDescriptor, SharedConverter<T>), ConfigError> {
        if self.spellings.is_empty() {
            return Err(ConfigError::EmptySpellings);
        }
        let mut seen = HashSet::new();
        for spelling in &self.spellings {
            validate_spelling(spelling)?;
            if !seen.insert(spelling.as_str()) {
                return Err(ConfigError::DuplicateSpelling(spelling.clone()));
            }
        }
        for dependency in self
            .required_if
            .iter()
            .chain(&self.required_unless)
            .chain(&self.available_if)
            .chain(&self.available_unless)
        {
            validate_spelling(dependency)?;
        }

        if self.policy == ArgumentPolicy::None && (self.typed || !self.defaults.is_empty()) {
            return Err(ConfigError::ConflictingArgumentPolicy(self.spellings.join(", ")));
        }

        let type_indicator = self.typed.then(|| type_indicator(self.converter.as_ref()));
        let descriptor = OptionDescriptor {
            spellings: arrange_spellings(self.spellings),
            policy: self.policy,
            defaults: self.defaults,
            required: self.required,
            required_if: self.required_if,
            required_unless: self.required_unless,
            available_if: self.available_if,
            available_unless: self.available_unless,
            for_help: self.for_help,
            description: self.description,
            argument_description: self.argument_description,
            type_indicator,
            non_options: false,
        };
        Ok((descriptor, self.converter))
    }
}

/// Typed handle to a registered option.
///
/// Handles remember the registry that issued them; an [`OptionSet`] produced
/// by any other registry treats the handle as never matched.
pub struct OptionSpec<T> {
    pub(crate) registry: RegistryId,
    pub(crate) slot: usize,
    pub(crate) descriptor: Arc<OptionDescriptor>,
    pub(crate) converter: SharedConverter<T>,
}

impl<T> Clone for OptionSpec<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry,
            slot: self.slot,
            descriptor: Arc::clone(&self.descriptor),
            converter: Arc::clone(&self.converter),
        }
    }
}

impl<T> fmt::Debug for OptionSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSpec")
            .field("registry", &self.registry)
            .field("slot", &self.slot)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl<T> OptionSpec<T> {
    pub fn descriptor(&self) -> &OptionDescriptor {
        &self.descriptor
    }

    pub fn spellings(&self) -> &[String] {
        self.descriptor.spellings()
    }

    /// Run one raw argument through this option's converter.
    pub fn convert(&self, raw: &str) -> Result<T, ConversionError> {
        self.converter.convert(raw).map_err(|source| ConversionError {
            spellings: self.descriptor.spellings().to_vec(),
            argument: raw.to_string(),
            source,
        })
    }

    /// Last value of this option in `set`, converted.
    pub fn value(&self, set: &OptionSet) -> Result<Option<T>, ConversionError> {
        set.value(self)
    }

    /// Every value of this option in `set`, converted.
    pub fn values(&self, set: &OptionSet) -> Result<Vec<T>, ConversionError> {
        set.values(self)
    }
}
