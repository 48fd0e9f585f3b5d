//! The table of declared options that parsing runs against.
//!
//! A [`Registry`] is built up during configuration through
//! [`Registry::register`] (fluent builders) or [`Registry::register_spec`]
//! (getopt-style spec strings). Both paths share the same validation, so a
//! spelling can never be owned by two descriptors.
//!
//! Once configured, a registry is only read by the parser and may be shared
//! across threads to parse several argument vectors. Mutating it while a
//! parse borrows it is ruled out by the borrow checker; callers that wrap it
//! in their own interior mutability are responsible for not doing so.

use crate::config::ConfigError;
use crate::convert::{type_indicator, ArgumentType, SharedConverter, ValueConverter};
use crate::descriptor::{OptionBuilder, OptionDescriptor, OptionSpec};
use crate::tokenizer::SpecTokenizer;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Slot of the reserved non-option descriptor.
pub(crate) const NON_OPTIONS_SLOT: usize = 0;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

impl RegistryId {
    fn next() -> Self {
        RegistryId(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Outcome of resolving a long option name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LongMatch {
    Exact(usize),
    Abbreviated(usize),
    Ambiguous,
    Missing,
}

/// Declared options, indexed by every spelling they answer to.
#[derive(Debug)]
pub struct Registry {
    id: RegistryId,
    descriptors: Vec<Arc<OptionDescriptor>>,
    by_spelling: BTreeMap<String, usize>,
    allow_unrecognized: bool,
    allow_abbreviations: bool,
    posixly_correct: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            id: RegistryId::next(),
            descriptors: vec![Arc::new(OptionDescriptor::non_options(String::new(), None))],
            by_spelling: BTreeMap::new(),
            allow_unrecognized: false,
            allow_abbreviations: true,
            posixly_correct: false,
        }
    }

    /// Build a registry from a getopt-style spec string such as `"ab:c::"`.
    pub fn from_spec(spec: &str) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        registry.register_spec(spec)?;
        Ok(registry)
    }

    /// Record unknown option-like tokens as non-option arguments instead of failing.
    pub fn allow_unrecognized(&mut self, allow: bool) -> &mut Self {
        self.allow_unrecognized = allow;
        self
    }

    /// Accept unique prefixes of long options (on by default).
    pub fn allow_abbreviations(&mut self, allow: bool) -> &mut Self {
        self.allow_abbreviations = allow;
        self
    }

    /// Stop option processing at the first non-option argument.
    pub fn posixly_correct(&mut self, enabled: bool) -> &mut Self {
        self.posixly_correct = enabled;
        self
    }

    pub fn allows_unrecognized(&self) -> bool {
        self.allow_unrecognized
    }

    pub fn allows_abbreviations(&self) -> bool {
        self.allow_abbreviations
    }

    pub fn is_posixly_correct(&self) -> bool {
        self.posixly_correct
    }

    /// Register one option, returning a typed handle to it.
    pub fn register<T: 'static>(
        &mut self,
        builder: OptionBuilder<T>,
    ) -> Result<OptionSpec<T>, ConfigError> {
        let (descriptor, converter) = builder.build()?;

        for spelling in descriptor.spellings() {
            if self.by_spelling.contains_key(spelling) {
                return Err(ConfigError::DuplicateSpelling(spelling.clone()));
            }
        }
        for dependency in descriptor.dependencies() {
            let known = self.by_spelling.contains_key(dependency)
                || descriptor.spellings().contains(dependency);
            if !known {
                return Err(ConfigError::UnknownDependency {
                    option: descriptor.spellings().join(", "),
                    dependency: dependency.clone(),
                });
            }
        }

        let slot = self.descriptors.len();
        for spelling in descriptor.spellings() {
            self.by_spelling.insert(spelling.clone(), slot);
        }
        log::debug!("registered option {} in slot {}", descriptor, slot);

        let descriptor = Arc::new(descriptor);
        self.descriptors.push(Arc::clone(&descriptor));
        Ok(OptionSpec {
            registry: self.id,
            slot,
            descriptor,
            converter,
        })
    }

    /// Register a plain flag.
    pub fn accepts(&mut self, spelling: impl Into<String>) -> Result<OptionSpec<String>, ConfigError> {
        self.register(OptionBuilder::new(spelling))
    }

    /// Register a plain flag answering to several synonyms.
    pub fn accepts_all<I, S>(&mut self, spellings: I) -> Result<OptionSpec<String>, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(OptionBuilder::synonyms(spellings))
    }

    /// Register every option in a getopt-style spec string, in order.
    pub fn register_spec(&mut self, spec: &str) -> Result<Vec<OptionSpec<String>>, ConfigError> {
        SpecTokenizer::new(spec)
            .map(|builder| builder.and_then(|b| self.register(b)))
            .collect()
    }

    /// Set the description shown in help for non-option arguments.
    pub fn describe_non_options(&mut self, description: impl Into<String>) -> &mut Self {
        let current = &self.descriptors[NON_OPTIONS_SLOT];
        let indicator = current.type_indicator().map(str::to_string);
        self.descriptors[NON_OPTIONS_SLOT] =
            Arc::new(OptionDescriptor::non_options(description.into(), indicator));
        self
    }

    /// Raw-string handle to the non-option arguments.
    pub fn non_options(&self) -> OptionSpec<String> {
        self.handle(NON_OPTIONS_SLOT, String::converter())
    }

    /// Typed handle to the non-option arguments.
    pub fn non_options_of_type<U: ArgumentType>(&mut self) -> OptionSpec<U> {
        self.non_options_converted_by_shared(U::converter())
    }

    /// Handle converting non-option arguments with a caller-supplied converter.
    pub fn non_options_converted_by<U, C>(&mut self, converter: C) -> OptionSpec<U>
    where
        C: ValueConverter<U> + Send + Sync + 'static,
    {
        self.non_options_converted_by_shared(Arc::new(converter))
    }

    fn non_options_converted_by_shared<U>(&mut self, converter: SharedConverter<U>) -> OptionSpec<U> {
        let description = self.descriptors[NON_OPTIONS_SLOT].description().to_string();
        let indicator = type_indicator(converter.as_ref());
        self.descriptors[NON_OPTIONS_SLOT] =
            Arc::new(OptionDescriptor::non_options(description, Some(indicator)));
        self.handle(NON_OPTIONS_SLOT, converter)
    }

    /// Raw-string handle to the option owning `spelling`.
    pub fn spec(&self, spelling: &str) -> Option<OptionSpec<String>> {
        let slot = *self.by_spelling.get(spelling)?;
        Some(self.handle(slot, String::converter()))
    }

    fn handle<U>(&self, slot: usize, converter: SharedConverter<U>) -> OptionSpec<U> {
        OptionSpec {
            registry: self.id,
            slot,
            descriptor: Arc::clone(&self.descriptors[slot]),
            converter,
        }
    }

    /// Descriptor owning `spelling`.
    pub fn descriptor(&self, spelling: &str) -> Option<&OptionDescriptor> {
        self.by_spelling
            .get(spelling)
            .map(|&slot| self.descriptors[slot].as_ref())
    }

    /// Declared options in registration order, excluding non-options.
    pub fn descriptors(&self) -> impl Iterator<Item = &OptionDescriptor> {
        self.descriptors[NON_OPTIONS_SLOT + 1..]
            .iter()
            .map(Arc::as_ref)
    }

    pub fn id(&self) -> RegistryId {
        self.id
    }

    pub(crate) fn slot_of(&self, spelling: &str) -> Option<usize> {
        self.by_spelling.get(spelling).copied()
    }

    pub(crate) fn slot_of_short(&self, c: char) -> Option<usize> {
        let mut buf = [0u8; 4];
        self.slot_of(c.encode_utf8(&mut buf))
    }

    pub(crate) fn descriptor_at(&self, slot: usize) -> &OptionDescriptor {
        &self.descriptors[slot]
    }

    pub(crate) fn shared_descriptors(&self) -> Vec<Arc<OptionDescriptor>> {
        self.descriptors.clone()
    }

    pub(crate) fn spelling_index(&self) -> BTreeMap<String, usize> {
        self.by_spelling.clone()
    }

    /// Whether `name` (longer than one character) is a registered spelling.
    pub(crate) fn is_long_spelling(&self, name: &str) -> bool {
        name.chars().count() > 1 && self.by_spelling.contains_key(name)
    }

    /// Resolve a long option name, falling back to a unique prefix.
    pub(crate) fn resolve_long(&self, name: &str) -> LongMatch {
        if let Some(slot) = self.slot_of(name) {
            return LongMatch::Exact(slot);
        }
        if !self.allow_abbreviations || name.is_empty() {
            return LongMatch::Missing;
        }

        let mut found: Option<usize> = None;
        let candidates = self
            .by_spelling
            .range::<str, _>((Bound::Included(name), Bound::Unbounded))
            .take_while(|(spelling, _)| spelling.starts_with(name))
            .filter(|(spelling, _)| spelling.chars().count() > 1);
        for (_, &slot) in candidates {
            match found {
                None => found = Some(slot),
                Some(existing) if existing == slot => {}
                Some(_) => return LongMatch::Ambiguous,
            }
        }
        found.map_or(LongMatch::Missing, LongMatch::Abbreviated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ArgumentPolicy;

    #[test]
    fn test_register_indexes_every_synonym() {
        let mut registry = Registry::new();
        let spec = registry
            .register(OptionBuilder::synonyms(["message", "blurb", "m"]).with_required_arg())
            .unwrap();
        assert_eq!(spec.spellings(), ["m", "blurb", "message"]);
        for s in ["message", "blurb", "m"] {
            assert_eq!(registry.slot_of(s), Some(spec.slot));
        }
        assert_eq!(registry.descriptors().count(), 1);
    }

    #[test]
    fn test_error_on_duplicate_spelling() {
        let mut registry = Registry::new();
        registry.accepts_all(["v", "verbose"]).unwrap();
        let result = registry.accepts_all(["verbose", "loud"]);
        assert!(matches!(result, Err(ConfigError::DuplicateSpelling(s)) if s == "verbose"));
        // The failed registration leaves no trace.
        assert!(registry.descriptor("loud").is_none());
    }

    #[test]
    fn test_error_on_unknown_dependency() {
        let mut registry = Registry::new();
        let result = registry.register(
            OptionBuilder::new("username")
                .with_required_arg()
                .required_if(["ftp"]),
        );
        assert!(matches!(
            result,
            Err(ConfigError::UnknownDependency { dependency, .. }) if dependency == "ftp"
        ));
    }

    #[test]
    fn test_dependency_on_registered_option() {
        let mut registry = Registry::new();
        registry.accepts("ftp").unwrap();
        let username = registry
            .register(
                OptionBuilder::new("username")
                    .with_required_arg()
                    .required_if(["ftp"]),
            )
            .unwrap();
        assert_eq!(username.descriptor().required_if(), ["ftp"]);
    }

    #[test]
    fn test_from_spec_registers_in_order() {
        let registry = Registry::from_spec("ab:c::").unwrap();
        let policies: Vec<_> = registry.descriptors().map(|d| d.policy()).collect();
        assert_eq!(
            policies,
            [
                ArgumentPolicy::None,
                ArgumentPolicy::Required,
                ArgumentPolicy::Optional
            ]
        );
    }

    #[test]
    fn test_from_spec_rejects_duplicates() {
        let result = Registry::from_spec("ab:a");
        assert!(matches!(result, Err(ConfigError::DuplicateSpelling(s)) if s == "a"));
    }

    #[test]
    fn test_from_spec_then_builder_conflict() {
        let mut registry = Registry::from_spec("x:").unwrap();
        let result = registry.register(OptionBuilder::synonyms(["x", "extract"]));
        assert!(matches!(result, Err(ConfigError::DuplicateSpelling(_))));
    }

    #[test]
    fn test_resolve_long_exact_and_abbreviated() {
        let mut registry = Registry::new();
        registry.accepts("verbose").unwrap();
        registry.accepts("version").unwrap();
        registry.accepts("quiet").unwrap();

        assert!(matches!(registry.resolve_long("verbose"), LongMatch::Exact(_)));
        assert!(matches!(registry.resolve_long("q"), LongMatch::Abbreviated(_)));
        assert!(matches!(registry.resolve_long("verb"), LongMatch::Abbreviated(_)));
        assert_eq!(registry.resolve_long("ver"), LongMatch::Ambiguous);
        assert_eq!(registry.resolve_long("loud"), LongMatch::Missing);

        registry.allow_abbreviations(false);
        assert_eq!(registry.resolve_long("verb"), LongMatch::Missing);
    }

    #[test]
    fn test_abbreviation_of_synonyms_is_not_ambiguous() {
        let mut registry = Registry::new();
        registry.accepts_all(["colour", "color"]).unwrap();
        assert!(matches!(registry.resolve_long("col"), LongMatch::Abbreviated(_)));
    }

    #[test]
    fn test_abbreviation_ignores_short_spellings() {
        let mut registry = Registry::new();
        registry.accepts("x").unwrap();
        assert_eq!(registry.resolve_long(""), LongMatch::Missing);
        assert!(matches!(registry.resolve_long("x"), LongMatch::Exact(_)));
    }

    #[test]
    fn test_non_options_description_and_type() {
        let mut registry = Registry::new();
        registry.describe_non_options("input files");
        let files = registry.non_options_of_type::<std::path::PathBuf>();
        assert!(files.descriptor().represents_non_options());
        assert_eq!(files.descriptor().description(), "input files");
        assert_eq!(files.descriptor().type_indicator(), Some("path"));
    }

    #[test]
    fn test_registries_have_distinct_ids() {
        assert_ne!(Registry::new().id(), Registry::new().id());
    }
}
