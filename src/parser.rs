//! Argument-vector parsing against a [`Registry`].

use crate::descriptor::{ArgumentPolicy, OptionDescriptor};
use crate::option_set::OptionSet;
use crate::registry::{LongMatch, Registry};
use thiserror::Error;

/// Errors that can occur during argument parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unrecognized option: {0}")]
    UnrecognizedOption(String),

    #[error("option {0:?} requires an argument")]
    MissingArgument(Vec<String>),

    #[error("option {spellings:?} does not take an argument, got '{argument}'")]
    UnexpectedArgument {
        spellings: Vec<String>,
        argument: String,
    },

    #[error("missing required option(s) {0:?}")]
    MissingRequiredOptions(Vec<Vec<String>>),

    #[error("option(s) {0:?} not allowed in this combination")]
    UnavailableOption(Vec<Vec<String>>),
}

/// Parse `args` (without the program name) against `registry`.
///
/// Either every token is accounted for and all requirements hold, or an
/// error is returned and nothing of the partial result escapes.
pub fn parse<S: AsRef<str>>(registry: &Registry, args: &[S]) -> Result<OptionSet, ParseError> {
    log::debug!("parsing {} argument(s)", args.len());
    let mut parser = Parser::new(registry, args);
    parser.scan()?;
    let detected = parser.finish()?;
    log::debug!(
        "parsed {} option(s) and {} non-option argument(s)",
        detected.specs().len(),
        detected.non_option_arguments().len()
    );
    Ok(detected)
}

impl Registry {
    /// Parse `args` against this registry. See [`parse`].
    pub fn parse<S: AsRef<str>>(&self, args: &[S]) -> Result<OptionSet, ParseError> {
        parse(self, args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    /// After `--`, or after the first non-option when posixly correct.
    Terminated,
}

/// Internal parser state.
struct Parser<'r, 'a, S> {
    registry: &'r Registry,
    args: &'a [S],
    position: usize,
    state: State,
    detected: OptionSet,
}

impl<'r, 'a, S: AsRef<str>> Parser<'r, 'a, S> {
    fn new(registry: &'r Registry, args: &'a [S]) -> Self {
        Self {
            registry,
            args,
            position: 0,
            state: State::Scanning,
            detected: OptionSet::new(
                registry.id(),
                registry.shared_descriptors(),
                registry.spelling_index(),
            ),
        }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        let args = self.args;
        let token = args.get(self.position)?.as_ref();
        self.position += 1;
        Some(token)
    }

    fn scan(&mut self) -> Result<(), ParseError> {
        while let Some(token) = self.next_token() {
            log::trace!("token {:?} in state {:?}", token, self.state);
            match self.state {
                State::Terminated => self.detected.add_non_option(token),
                State::Scanning if token == "--" => self.state = State::Terminated,
                State::Scanning if token.starts_with("--") => self.handle_long(token, &token[2..])?,
                State::Scanning if token.len() > 1 && token.starts_with('-') => {
                    self.handle_short(token)?
                }
                State::Scanning => self.handle_non_option(token),
            }
        }
        Ok(())
    }

    fn handle_non_option(&mut self, token: &str) {
        self.detected.add_non_option(token);
        if self.registry.is_posixly_correct() {
            self.state = State::Terminated;
        }
    }

    fn unrecognized(&mut self, token: &str, option: &str) -> Result<(), ParseError> {
        if self.registry.allows_unrecognized() {
            log::debug!("keeping unrecognized option {:?} as a non-option argument", token);
            self.handle_non_option(token);
            Ok(())
        } else {
            Err(ParseError::UnrecognizedOption(option.to_string()))
        }
    }

    /// Handle `--name[=arg]`, or `-name[=arg]` when `name` is a long spelling.
    fn handle_long(&mut self, token: &str, body: &str) -> Result<(), ParseError> {
        let (name, inline) = match body.split_once('=') {
            Some((name, arg)) => (name, Some(arg)),
            None => (body, None),
        };

        let slot = match self.registry.resolve_long(name) {
            LongMatch::Exact(slot) | LongMatch::Abbreviated(slot) => slot,
            LongMatch::Ambiguous | LongMatch::Missing => return self.unrecognized(token, name),
        };
        let registry = self.registry;
        let descriptor = registry.descriptor_at(slot);

        match descriptor.policy() {
            ArgumentPolicy::None => {
                if let Some(argument) = inline {
                    return Err(ParseError::UnexpectedArgument {
                        spellings: descriptor.spellings().to_vec(),
                        argument: argument.to_string(),
                    });
                }
                self.detected.add(slot);
            }
            ArgumentPolicy::Optional => match inline {
                Some(argument) => self.detected.add_with_argument(slot, argument),
                None => self.detected.add(slot),
            },
            ArgumentPolicy::Required => {
                let argument = match inline {
                    Some(argument) => argument,
                    None => self.required_argument(descriptor)?,
                };
                self.detected.add_with_argument(slot, argument);
            }
        }
        Ok(())
    }

    fn required_argument(&mut self, descriptor: &OptionDescriptor) -> Result<&'a str, ParseError> {
        self.next_token()
            .ok_or_else(|| ParseError::MissingArgument(descriptor.spellings().to_vec()))
    }

    /// Handle a single-dash token: a long spelling or a cluster.
    fn handle_short(&mut self, token: &str) -> Result<(), ParseError> {
        let body = &token[1..];
        let name = body.split_once('=').map_or(body, |(name, _)| name);
        if self.registry.is_long_spelling(name) {
            return self.handle_long(token, body);
        }
        self.handle_cluster(body)
    }

    fn handle_cluster(&mut self, cluster: &str) -> Result<(), ParseError> {
        let registry = self.registry;
        for (index, c) in cluster.char_indices() {
            let rest = &cluster[index + c.len_utf8()..];
            let Some(slot) = registry.slot_of_short(c) else {
                let remaining = format!("-{}", &cluster[index..]);
                return self.unrecognized(&remaining, &c.to_string());
            };
            let descriptor = registry.descriptor_at(slot);

            match descriptor.policy() {
                ArgumentPolicy::None => self.detected.add(slot),
                ArgumentPolicy::Optional => {
                    if rest.is_empty() {
                        self.detected.add(slot);
                    } else {
                        self.detected.add_with_argument(slot, rest);
                    }
                    return Ok(());
                }
                ArgumentPolicy::Required => {
                    let argument = if rest.is_empty() {
                        self.required_argument(descriptor)?
                    } else {
                        rest
                    };
                    self.detected.add_with_argument(slot, argument);
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Validate requirements and hand out the finished set.
    fn finish(self) -> Result<OptionSet, ParseError> {
        let detected = self.detected;
        let slots = detected.option_slots();

        let help_requested = slots
            .clone()
            .any(|slot| detected.is_detected(slot) && detected.descriptor_at(slot).is_for_help());

        if !help_requested {
            let missing: Vec<Vec<String>> = slots
                .clone()
                .filter(|&slot| !detected.is_detected(slot))
                .map(|slot| detected.descriptor_at(slot))
                .filter(|d| is_required(d, &detected))
                .map(|d| d.spellings().to_vec())
                .collect();
            if !missing.is_empty() {
                return Err(ParseError::MissingRequiredOptions(missing));
            }
        }

        let unavailable: Vec<Vec<String>> = slots
            .filter(|&slot| detected.is_detected(slot))
            .map(|slot| detected.descriptor_at(slot))
            .filter(|d| d.has_conditions() && !is_available(d, &detected))
            .map(|d| d.spellings().to_vec())
            .collect();
        if !unavailable.is_empty() {
            return Err(ParseError::UnavailableOption(unavailable));
        }

        Ok(detected)
    }
}

fn is_required(descriptor: &OptionDescriptor, detected: &OptionSet) -> bool {
    if descriptor.is_required() {
        return true;
    }
    if detected.any_detected(descriptor.required_if()) {
        return true;
    }
    !descriptor.required_unless().is_empty() && !detected.any_detected(descriptor.required_unless())
}

fn is_available(descriptor: &OptionDescriptor, detected: &OptionSet) -> bool {
    let present_if = descriptor
        .available_if()
        .iter()
        .all(|s| detected.has(s.as_str()));
    let absent_unless = !detected.any_detected(descriptor.available_unless());
    present_if && absent_unless
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::OptionBuilder;

    const NO_ARGS: [&str; 0] = [];

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    fn fox() -> Registry {
        let mut registry = Registry::new();
        registry.accepts("f").unwrap();
        registry
            .register(OptionBuilder::new("o").with_optional_arg())
            .unwrap();
        registry
            .register(OptionBuilder::new("x").with_required_arg())
            .unwrap();
        registry
    }

    #[test]
    fn test_parse_flag_long() {
        let mut registry = Registry::new();
        registry.accepts("flag").unwrap();
        registry.accepts("verbose").unwrap();
        let result = parse(&registry, &args(&["--flag"])).unwrap();
        assert!(result.has("flag"));
        assert!(!result.has("verbose"));
    }

    #[test]
    fn test_parse_combined_short_flags() {
        let registry = Registry::from_spec("abc").unwrap();
        let result = parse(&registry, &["-abc"]).unwrap();
        assert!(result.has("a") && result.has("b") && result.has("c"));
        assert!(result.non_option_arguments().is_empty());
    }

    #[test]
    fn test_parse_short_punctuation() {
        let registry = Registry::from_spec("aB?*.").unwrap();
        let result = parse(&registry, &["-a", "-B", "-?"]).unwrap();
        assert!(result.has("a"));
        assert!(result.has("B"));
        assert!(result.has("?"));
        assert!(!result.has("."));
    }

    #[test]
    fn test_parse_required_long_space_and_equals() {
        let mut registry = Registry::new();
        registry
            .register(OptionBuilder::new("output").with_required_arg())
            .unwrap();

        let result = parse(&registry, &["--output", "a.txt", "--output=b.txt"]).unwrap();
        assert_eq!(result.values_of("output"), ["a.txt", "b.txt"]);
        assert_eq!(result.value_of("output"), Some("b.txt"));
    }

    #[test]
    fn test_required_argument_may_look_like_an_option() {
        let registry = Registry::from_spec("x:f").unwrap();
        let result = parse(&registry, &["-x", "-f"]).unwrap();
        assert_eq!(result.values_of("x"), ["-f"]);
        assert!(!result.has("f"));
    }

    #[test]
    fn test_option_equals_empty() {
        let mut registry = Registry::new();
        registry
            .register(OptionBuilder::new("value").with_required_arg())
            .unwrap();
        let result = parse(&registry, &["--value="]).unwrap();
        assert_eq!(result.values_of("value"), [""]);
        assert!(!result.has_argument("value"));
    }

    #[test]
    fn test_error_missing_argument_long() {
        let mut registry = Registry::new();
        registry
            .register(OptionBuilder::synonyms(["o", "output"]).with_required_arg())
            .unwrap();
        let result = parse(&registry, &["--output"]);
        assert_eq!(
            result.unwrap_err(),
            ParseError::MissingArgument(vec!["o".into(), "output".into()])
        );
    }

    #[test]
    fn test_error_missing_argument_short() {
        let result = parse(&fox(), &["-fx"]);
        assert!(matches!(result, Err(ParseError::MissingArgument(_))));
    }

    #[test]
    fn test_error_argument_on_flag() {
        let mut registry = Registry::new();
        registry.accepts("verbose").unwrap();
        let result = parse(&registry, &["--verbose=yes"]);
        assert!(matches!(
            result,
            Err(ParseError::UnexpectedArgument { argument, .. }) if argument == "yes"
        ));
    }

    #[test]
    fn test_optional_long_is_not_greedy() {
        let mut registry = Registry::new();
        registry
            .register(OptionBuilder::new("level").with_optional_arg())
            .unwrap();
        let result = parse(&registry, &["--level", "3"]).unwrap();
        assert!(result.has("level"));
        assert!(result.values_of("level").is_empty());
        assert_eq!(result.non_option_arguments(), ["3"]);

        let result = parse(&registry, &["--level=3"]).unwrap();
        assert_eq!(result.values_of("level"), ["3"]);
    }

    #[test]
    fn test_optional_short_is_not_greedy() {
        let result = parse(&fox(), &["-o", "bar"]).unwrap();
        assert!(result.has("o"));
        assert!(result.values_of("o").is_empty());
        assert_eq!(result.non_option_arguments(), ["bar"]);
    }

    #[test]
    fn test_single_dash_long_option() {
        let mut registry = Registry::from_spec("fo").unwrap();
        registry
            .register(OptionBuilder::new("foo").with_required_arg())
            .unwrap();
        let result = parse(&registry, &["-foo=1", "-foo", "2", "-of"]).unwrap();
        assert_eq!(result.values_of("foo"), ["1", "2"]);
        assert!(result.has("o") && result.has("f"));
    }

    #[test]
    fn test_abbreviated_long_option() {
        let mut registry = Registry::new();
        registry
            .register(OptionBuilder::new("count").with_required_arg())
            .unwrap();
        registry.accepts("verbose").unwrap();
        registry.accepts("version").unwrap();

        let result = parse(&registry, &["--cou=3", "--verb"]).unwrap();
        assert_eq!(result.value_of("count"), Some("3"));
        assert!(result.has("verbose"));

        let result = parse(&registry, &["--ver"]);
        assert_eq!(result.unwrap_err(), ParseError::UnrecognizedOption("ver".into()));
    }

    #[test]
    fn test_abbreviations_disabled() {
        let mut registry = Registry::new();
        registry.accepts("verbose").unwrap();
        registry.allow_abbreviations(false);
        assert!(parse(&registry, &["--verb"]).is_err());
    }

    #[test]
    fn test_lone_dash_is_a_non_option() {
        let registry = Registry::from_spec("a").unwrap();
        let result = parse(&registry, &["-", "-a"]).unwrap();
        assert_eq!(result.non_option_arguments(), ["-"]);
        assert!(result.has("a"));
    }

    #[test]
    fn test_negative_numbers_are_unrecognized_digits() {
        let mut registry = Registry::from_spec("n:f").unwrap();
        assert_eq!(
            parse(&registry, &["-5"]).unwrap_err(),
            ParseError::UnrecognizedOption("5".into())
        );
        assert_eq!(
            parse(&registry, &["-f", "-2.5"]).unwrap_err(),
            ParseError::UnrecognizedOption("2".into())
        );

        registry.allow_unrecognized(true);
        let result = parse(&registry, &["-5", "-n", "-3", "-2.5"]).unwrap();
        assert_eq!(result.non_option_arguments(), ["-5", "-2.5"]);
        assert_eq!(result.values_of("n"), ["-3"]);
    }

    #[test]
    fn test_registered_digit_is_an_option() {
        let registry = Registry::from_spec("1").unwrap();
        let result = parse(&registry, &["-1"]).unwrap();
        assert!(result.has("1"));
        assert!(result.non_option_arguments().is_empty());
    }

    #[test]
    fn test_terminator() {
        let registry = Registry::from_spec("f").unwrap();
        let result = parse(&registry, &["-f", "--", "-d", "--", "--x"]).unwrap();
        assert!(result.has("f"));
        assert_eq!(result.non_option_arguments(), ["-d", "--", "--x"]);
    }

    #[test]
    fn test_options_after_positionals() {
        let registry = Registry::from_spec("o:").unwrap();
        let result = parse(&registry, &["input.txt", "-o", "out.txt"]).unwrap();
        assert_eq!(result.non_option_arguments(), ["input.txt"]);
        assert_eq!(result.value_of("o"), Some("out.txt"));
    }

    #[test]
    fn test_posixly_correct_stops_at_first_non_option() {
        let mut registry = Registry::from_spec("o:").unwrap();
        registry.posixly_correct(true);
        let result = parse(&registry, &["input.txt", "-o", "out.txt"]).unwrap();
        assert_eq!(result.non_option_arguments(), ["input.txt", "-o", "out.txt"]);
        assert!(!result.has("o"));
    }

    #[test]
    fn test_posixly_correct_stops_at_kept_unrecognized_option() {
        let mut registry = Registry::from_spec("fo:").unwrap();
        registry.posixly_correct(true).allow_unrecognized(true);
        let result = parse(&registry, &["-f", "-d", "-o", "out.txt"]).unwrap();
        assert!(result.has("f"));
        assert!(!result.has("o"));
        assert_eq!(result.non_option_arguments(), ["-d", "-o", "out.txt"]);
    }

    #[test]
    fn test_error_unrecognized_short_and_long() {
        let registry = Registry::from_spec("f").unwrap();
        assert_eq!(
            parse(&registry, &["-d"]).unwrap_err(),
            ParseError::UnrecognizedOption("d".into())
        );
        assert_eq!(
            parse(&registry, &["--unknown"]).unwrap_err(),
            ParseError::UnrecognizedOption("unknown".into())
        );
    }

    #[test]
    fn test_unrecognized_allowed() {
        let mut registry = Registry::from_spec("f").unwrap();
        registry.allow_unrecognized(true);
        let result = parse(&registry, &["-f", "-d", "--unknown=1"]).unwrap();
        assert!(result.has("f"));
        assert!(!result.has("d"));
        assert_eq!(result.non_option_arguments(), ["-d", "--unknown=1"]);
    }

    #[test]
    fn test_unrecognized_inside_cluster_keeps_remainder() {
        let mut registry = Registry::from_spec("f").unwrap();
        registry.allow_unrecognized(true);
        let result = parse(&registry, &["-fzf"]).unwrap();
        assert!(result.has("f"));
        assert_eq!(result.non_option_arguments(), ["-zf"]);
    }

    #[test]
    fn test_error_missing_required_lists_all() {
        let mut registry = Registry::new();
        registry.register(OptionBuilder::new("a").required()).unwrap();
        registry
            .register(OptionBuilder::new("b").with_required_arg().required())
            .unwrap();
        registry.accepts("c").unwrap();
        let result = parse(&registry, &["-c"]);
        assert_eq!(
            result.unwrap_err(),
            ParseError::MissingRequiredOptions(vec![vec!["a".into()], vec!["b".into()]])
        );
    }

    #[test]
    fn test_required_if() {
        let mut registry = Registry::new();
        registry.accepts("ftp").unwrap();
        for name in ["username", "password"] {
            registry
                .register(OptionBuilder::new(name).with_required_arg().required_if(["ftp"]))
                .unwrap();
        }

        assert!(parse(&registry, &NO_ARGS).is_ok());
        let err = parse(&registry, &["--ftp"]).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingRequiredOptions(vec![
                vec!["username".into()],
                vec!["password".into()]
            ])
        );
        assert!(parse(&registry, &["--ftp", "--username", "u", "--password", "p"]).is_ok());
    }

    #[test]
    fn test_required_unless() {
        let mut registry = Registry::new();
        registry.accepts("anonymous").unwrap();
        registry
            .register(
                OptionBuilder::new("username")
                    .with_required_arg()
                    .required_unless(["anonymous"]),
            )
            .unwrap();

        assert!(parse(&registry, &["--anonymous"]).is_ok());
        assert!(parse(&registry, &["--username", "me"]).is_ok());
        assert!(matches!(
            parse(&registry, &NO_ARGS),
            Err(ParseError::MissingRequiredOptions(_))
        ));
    }

    #[test]
    fn test_help_option_skips_requirements() {
        let mut registry = Registry::from_spec("h*").unwrap();
        registry.register(OptionBuilder::new("input").with_required_arg().required()).unwrap();
        let result = parse(&registry, &["-h"]).unwrap();
        assert!(result.has("h"));
        assert!(matches!(
            parse(&registry, &NO_ARGS),
            Err(ParseError::MissingRequiredOptions(_))
        ));
    }

    #[test]
    fn test_available_unless_is_mutually_exclusive() {
        let mut registry = Registry::new();
        registry.accepts("json").unwrap();
        registry
            .register(OptionBuilder::new("yaml").available_unless(["json"]))
            .unwrap();

        assert!(parse(&registry, &["--yaml"]).is_ok());
        assert_eq!(
            parse(&registry, &["--json", "--yaml"]).unwrap_err(),
            ParseError::UnavailableOption(vec![vec!["yaml".into()]])
        );
    }

    #[test]
    fn test_available_if() {
        let mut registry = Registry::new();
        registry.accepts("remote").unwrap();
        registry
            .register(OptionBuilder::new("port").with_required_arg().available_if(["remote"]))
            .unwrap();

        assert!(parse(&registry, &["--remote", "--port", "22"]).is_ok());
        assert!(matches!(
            parse(&registry, &["--port", "22"]),
            Err(ParseError::UnavailableOption(_))
        ));
    }

    #[test]
    fn test_registry_parse_method() {
        let registry = Registry::from_spec("v").unwrap();
        let result = registry.parse(&["-v", "file"]).unwrap();
        assert!(result.has("v"));
        assert_eq!(result.non_option_arguments(), ["file"]);
    }
}
