//! Help text for a registry, rendered through Clap.

use crate::descriptor::{ArgumentPolicy, OptionDescriptor};
use crate::registry::Registry;
use clap::{Arg, ArgAction, Command};

/// The three help fields of one declared option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpRow {
    /// Spellings with their dashes, e.g. `-c, --count`
    pub spellings: String,
    /// Argument indicator, e.g. `<i32>` or `[path]`, empty for flags
    pub indicator: String,
    pub description: String,
}

fn dashed(spelling: &str) -> String {
    if spelling.chars().count() == 1 {
        format!("-{}", spelling)
    } else {
        format!("--{}", spelling)
    }
}

fn argument_label(descriptor: &OptionDescriptor) -> String {
    if !descriptor.argument_description().is_empty() {
        return descriptor.argument_description().to_string();
    }
    descriptor.type_indicator().unwrap_or("value").to_string()
}

fn indicator(descriptor: &OptionDescriptor) -> String {
    match descriptor.policy() {
        ArgumentPolicy::None => String::new(),
        ArgumentPolicy::Optional => format!("[{}]", argument_label(descriptor)),
        ArgumentPolicy::Required => format!("<{}>", argument_label(descriptor)),
    }
}

/// Help fields for every option, in registration order.
pub fn help_rows(registry: &Registry) -> Vec<HelpRow> {
    registry
        .descriptors()
        .map(|d| HelpRow {
            spellings: d
                .spellings()
                .iter()
                .map(|s| dashed(s))
                .collect::<Vec<_>>()
                .join(", "),
            indicator: indicator(d),
            description: d.description().to_string(),
        })
        .collect()
}

/// Build a Clap Arg from an OptionDescriptor.
fn build_arg(descriptor: &OptionDescriptor) -> Arg {
    let spellings = descriptor.spellings();
    let mut arg = Arg::new(spellings[0].clone());

    let (short, long): (Vec<&String>, Vec<&String>) =
        spellings.iter().partition(|s| s.chars().count() == 1);
    let mut shorts = short.iter().filter_map(|s| s.chars().next());
    if let Some(first) = shorts.next() {
        arg = arg.short(first);
    }
    let rest: Vec<char> = shorts.collect();
    if !rest.is_empty() {
        arg = arg.visible_short_aliases(rest);
    }
    let mut longs = long.into_iter();
    if let Some(first) = longs.next() {
        arg = arg.long(first.clone());
    }
    let aliases: Vec<String> = longs.cloned().collect();
    if !aliases.is_empty() {
        arg = arg.visible_aliases(aliases);
    }

    arg = match descriptor.policy() {
        ArgumentPolicy::None => arg.action(ArgAction::SetTrue),
        ArgumentPolicy::Optional => arg
            .action(ArgAction::Append)
            .num_args(0..=1)
            .value_name(argument_label(descriptor)),
        ArgumentPolicy::Required => arg
            .action(ArgAction::Append)
            .num_args(1)
            .value_name(argument_label(descriptor)),
    };

    if descriptor.is_required() {
        arg = arg.required(true);
    }

    if !descriptor.defaults().is_empty() {
        arg = arg.default_values(descriptor.defaults().to_vec());
    }

    if !descriptor.description().is_empty() {
        arg = arg.help(descriptor.description().to_string());
    }

    arg
}

/// Build a Clap Command from a Registry (for help generation only).
fn build_command(registry: &Registry, name: &str) -> Command {
    let mut cmd = Command::new(name.to_string())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true);

    for descriptor in registry.descriptors() {
        cmd = cmd.arg(build_arg(descriptor));
    }

    let non_options = registry.non_options();
    let non_options = non_options.descriptor();
    let mut positional = Arg::new("-non-options")
        .action(ArgAction::Append)
        .num_args(0..)
        .value_name(non_options.type_indicator().unwrap_or("ARGS").to_string());
    if !non_options.description().is_empty() {
        positional = positional.help(non_options.description().to_string());
    }
    cmd.arg(positional)
}

/// Generate the full help text for a registry.
pub fn generate_help(registry: &Registry, name: &str) -> String {
    let mut cmd = build_command(registry, name);
    cmd.render_help().to_string()
}
