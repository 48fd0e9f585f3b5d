//! Tokenizer for getopt-style option specification strings.
//!
//! Grammar, per option: a letter, an optional `*` marking it as a help
//! option, then `::` (optional argument), `:` or `;` (required argument), or
//! nothing (no argument).

use crate::config::ConfigError;
use crate::descriptor::{validate_spelling, ArgumentPolicy, OptionBuilder};
use std::iter::Peekable;
use std::str::CharIndices;

const HELP_MARKER: char = '*';
const ARGUMENT_MARKER: char = ':';
const ALTERNATIVE_LONG_MARKER: char = ';';

/// Lazily yields one option builder per letter of a spec string.
///
/// The first error ends the sequence.
pub struct SpecTokenizer<'a> {
    spec: &'a str,
    chars: Peekable<CharIndices<'a>>,
    failed: bool,
}

impl<'a> SpecTokenizer<'a> {
    pub fn new(spec: &'a str) -> Self {
        Self {
            spec,
            chars: spec.char_indices().peekable(),
            failed: false,
        }
    }

    fn malformed(&mut self, position: usize, reason: &'static str) -> ConfigError {
        self.failed = true;
        ConfigError::MalformedSpec {
            spec: self.spec.to_string(),
            position,
            reason,
        }
    }

    fn next_token(&mut self) -> Option<Result<OptionBuilder, ConfigError>> {
        let (position, letter) = self.chars.next()?;
        if matches!(letter, HELP_MARKER | ARGUMENT_MARKER | ALTERNATIVE_LONG_MARKER) {
            return Some(Err(self.malformed(position, "modifier without a preceding option")));
        }

        let spelling = letter.to_string();
        if let Err(e) = validate_spelling(&spelling) {
            self.failed = true;
            return Some(Err(e));
        }

        let for_help = self.chars.next_if(|&(_, c)| c == HELP_MARKER).is_some();

        let policy = if self.chars.next_if(|&(_, c)| c == ARGUMENT_MARKER).is_some() {
            if self.chars.next_if(|&(_, c)| c == ARGUMENT_MARKER).is_some() {
                ArgumentPolicy::Optional
            } else {
                ArgumentPolicy::Required
            }
        } else if self
            .chars
            .next_if(|&(_, c)| c == ALTERNATIVE_LONG_MARKER)
            .is_some()
        {
            ArgumentPolicy::Required
        } else {
            ArgumentPolicy::None
        };

        let mut builder = OptionBuilder::new(spelling).with_policy(policy);
        if for_help {
            builder = builder.for_help();
        }
        log::trace!("spec token '{}' at {}: {:?}", letter, position, policy);
        Some(Ok(builder))
    }
}

impl Iterator for SpecTokenizer<'_> {
    type Item = Result<OptionBuilder, ConfigError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.next_token()
    }
}
