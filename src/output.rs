//! Exporting parsed options as properties and sourceable shell files.

use crate::option_set::OptionSet;
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Two options that would export into the same shell variable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("options '{first}' and '{second}' both export as {variable}")]
pub struct VariableCollision {
    pub variable: String,
    pub first: String,
    pub second: String,
}

/// Terminator of the heredoc that carries help text.
const HELP_DELIMITER: &str = "OPTSET_HELP";

/// Backslash escape for characters that are live inside double quotes.
fn shell_escape_of(c: char) -> Option<&'static str> {
    Some(match c {
        '$' => "\\$",
        '`' => "\\`",
        '\\' => "\\\\",
        '"' => "\\\"",
        '!' => "\\!",
        '\n' => "\\n",
        '\r' => "\\r",
        '\t' => "\\t",
        _ => return None,
    })
}

/// Quote `value` for a double-quoted shell word.
fn escape_shell_value(value: &str) -> String {
    value.chars().fold(String::with_capacity(value.len()), |mut out, c| {
        match shell_escape_of(c) {
            Some(escape) => out.push_str(escape),
            None => out.push(c),
        }
        out
    })
}

/// `output-dir` becomes `OUTPUT_DIR`.
fn to_shell_var_name(spelling: &str) -> String {
    spelling
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c.to_ascii_uppercase(),
            _ => '_',
        })
        .collect()
}

/// Flatten an option set into `spelling -> value` properties.
///
/// Each declared option is keyed by its preferred spelling. Options with
/// values export them joined by commas; plain flags export `true`/`false`.
pub fn export_properties(set: &OptionSet) -> BTreeMap<String, String> {
    set.as_map()
        .into_iter()
        .filter_map(|(descriptor, values)| {
            let key = descriptor.primary_spelling()?.to_string();
            let value = if values.is_empty() {
                set.has(key.as_str()).to_string()
            } else {
                values.join(",")
            };
            Some((key, value))
        })
        .collect()
}

/// Render the sourceable shell script for an option set.
///
/// Every option becomes an `export` line (sorted by variable); the
/// non-option arguments replace the script's positional parameters. Fails
/// when two spellings map to the same variable, e.g. `a.b` and `a-b`.
pub fn generate_output_string(
    set: &OptionSet,
    prefix: &str,
) -> Result<String, VariableCollision> {
    let mut exports: BTreeMap<String, (String, String)> = BTreeMap::new();
    for (name, value) in export_properties(set) {
        let variable = format!("{}{}", prefix, to_shell_var_name(&name));
        if let Some((first, _)) = exports.get(&variable) {
            return Err(VariableCollision {
                variable,
                first: first.clone(),
                second: name,
            });
        }
        exports.insert(variable, (name, value));
    }

    let mut script: String = exports
        .iter()
        .map(|(variable, (_, value))| {
            format!("export {}=\"{}\"\n", variable, escape_shell_value(value))
        })
        .collect();

    script.push_str("set --");
    for argument in set.non_option_arguments() {
        script.push_str(" \"");
        script.push_str(&escape_shell_value(argument));
        script.push('"');
    }
    script.push('\n');
    Ok(script)
}

/// Write the export script for `set` to a kept temporary file.
pub fn generate_output(set: &OptionSet, prefix: &str) -> Result<PathBuf> {
    persist_script(&generate_output_string(set, prefix)?)
}

/// Script that reports `message` on stderr and fails the sourcing shell.
pub fn generate_error_string(message: &str) -> String {
    format!("echo \"optset: {}\" >&2\nexit 1\n", escape_shell_value(message))
}

pub fn generate_error_output(message: &str) -> Result<PathBuf> {
    persist_script(&generate_error_string(message))
}

/// Script that prints `help_text` verbatim and ends the sourcing shell.
pub fn generate_help_output_string(help_text: &str) -> String {
    format!("cat <<'{HELP_DELIMITER}'\n{help_text}{HELP_DELIMITER}\nexit 0\n")
}

pub fn generate_help_output(help_text: &str) -> Result<PathBuf> {
    persist_script(&generate_help_output_string(help_text))
}

/// Store `script` in a temporary file that outlives this process.
pub fn persist_script(script: &str) -> Result<PathBuf> {
    let mut file = NamedTempFile::new()?;
    file.write_all(script.as_bytes())?;
    Ok(file.into_temp_path().keep()?)
}
