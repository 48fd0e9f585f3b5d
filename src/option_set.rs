//! The result of a successful parse.

use crate::convert::ConversionError;
use crate::descriptor::{OptionDescriptor, OptionSpec};
use crate::registry::{RegistryId, NON_OPTIONS_SLOT};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

/// Something an [`OptionSet`] can be queried with.
///
/// Spellings are looked up in the registry the set was parsed with; handles
/// only match when that same registry issued them.
pub trait OptionKey {
    fn slot_in(&self, set: &OptionSet) -> Option<usize>;
}

impl OptionKey for str {
    fn slot_in(&self, set: &OptionSet) -> Option<usize> {
        set.by_spelling.get(self).copied()
    }
}

impl OptionKey for String {
    fn slot_in(&self, set: &OptionSet) -> Option<usize> {
        self.as_str().slot_in(set)
    }
}

impl<T> OptionKey for OptionSpec<T> {
    fn slot_in(&self, set: &OptionSet) -> Option<usize> {
        if self.registry != set.registry {
            return None;
        }
        let owned = set.descriptors.get(self.slot)?;
        let same = Arc::ptr_eq(owned, &self.descriptor)
            || (owned.spellings() == self.descriptor.spellings()
                && owned.represents_non_options() == self.descriptor.represents_non_options());
        same.then_some(self.slot)
    }
}

impl<K: OptionKey + ?Sized> OptionKey for &K {
    fn slot_in(&self, set: &OptionSet) -> Option<usize> {
        (**self).slot_in(set)
    }
}

/// Options detected in one argument vector, with their raw arguments.
///
/// An `OptionSet` is a read-only snapshot; it shares only immutable
/// descriptors with the registry that produced it.
#[derive(Debug, Clone)]
pub struct OptionSet {
    registry: RegistryId,
    descriptors: Vec<Arc<OptionDescriptor>>,
    by_spelling: BTreeMap<String, usize>,
    detected: Vec<Option<Vec<String>>>,
}

impl OptionSet {
    pub(crate) fn new(
        registry: RegistryId,
        descriptors: Vec<Arc<OptionDescriptor>>,
        by_spelling: BTreeMap<String, usize>,
    ) -> Self {
        let detected = vec![None; descriptors.len()];
        Self {
            registry,
            descriptors,
            by_spelling,
            detected,
        }
    }

    pub(crate) fn add(&mut self, slot: usize) {
        self.detected[slot].get_or_insert_with(Vec::new);
    }

    pub(crate) fn add_with_argument(&mut self, slot: usize, argument: impl Into<String>) {
        self.detected[slot]
            .get_or_insert_with(Vec::new)
            .push(argument.into());
    }

    pub(crate) fn add_non_option(&mut self, argument: impl Into<String>) {
        self.add_with_argument(NON_OPTIONS_SLOT, argument);
    }

    pub(crate) fn is_detected(&self, slot: usize) -> bool {
        self.detected[slot].is_some()
    }

    pub(crate) fn descriptor_at(&self, slot: usize) -> &OptionDescriptor {
        &self.descriptors[slot]
    }

    /// Whether any of `spellings` was matched.
    pub(crate) fn any_detected(&self, spellings: &[String]) -> bool {
        spellings
            .iter()
            .any(|s| s.slot_in(self).is_some_and(|slot| self.is_detected(slot)))
    }

    /// Whether the option was matched at least once.
    pub fn has<K: OptionKey + ?Sized>(&self, key: &K) -> bool {
        key.slot_in(self).is_some_and(|slot| self.is_detected(slot))
    }

    /// Whether the option was matched with at least one non-empty argument.
    pub fn has_argument<K: OptionKey + ?Sized>(&self, key: &K) -> bool {
        key.slot_in(self)
            .and_then(|slot| self.detected[slot].as_ref())
            .is_some_and(|args| args.iter().any(|a| !a.is_empty()))
    }

    /// Raw arguments in encounter order, the defaults when never matched,
    /// or nothing for unknown keys.
    pub fn values_of<K: OptionKey + ?Sized>(&self, key: &K) -> &[String] {
        let Some(slot) = key.slot_in(self) else {
            return &[];
        };
        match &self.detected[slot] {
            Some(args) => args,
            None => self.descriptors[slot].defaults(),
        }
    }

    /// Last raw argument, or the last default.
    pub fn value_of<K: OptionKey + ?Sized>(&self, key: &K) -> Option<&str> {
        self.values_of(key).last().map(String::as_str)
    }

    /// Positional arguments in encounter order.
    pub fn non_option_arguments(&self) -> &[String] {
        self.detected[NON_OPTIONS_SLOT].as_deref().unwrap_or_default()
    }

    /// Last argument converted through the handle's converter.
    pub fn value<T>(&self, spec: &OptionSpec<T>) -> Result<Option<T>, ConversionError> {
        self.value_of(spec).map(|raw| spec.convert(raw)).transpose()
    }

    /// Every argument converted through the handle's converter.
    pub fn values<T>(&self, spec: &OptionSpec<T>) -> Result<Vec<T>, ConversionError> {
        self.values_of(spec)
            .iter()
            .map(|raw| spec.convert(raw))
            .collect()
    }

    /// Matched options in registration order.
    pub fn specs(&self) -> Vec<&OptionDescriptor> {
        self.option_slots()
            .filter(|&slot| self.is_detected(slot))
            .map(|slot| self.descriptor_at(slot))
            .collect()
    }

    /// Every declared, non-help option with its effective values.
    pub fn as_map(&self) -> Vec<(&OptionDescriptor, &[String])> {
        self.option_slots()
            .map(|slot| (self.descriptor_at(slot), self.effective_values(slot)))
            .filter(|(d, _)| !d.is_for_help())
            .collect()
    }

    fn effective_values(&self, slot: usize) -> &[String] {
        match &self.detected[slot] {
            Some(args) => args,
            None => self.descriptors[slot].defaults(),
        }
    }

    /// Slots of declared options, excluding non-options.
    pub(crate) fn option_slots(&self) -> Range<usize> {
        NON_OPTIONS_SLOT + 1..self.descriptors.len()
    }

    pub fn registry(&self) -> RegistryId {
        self.registry
    }
}
