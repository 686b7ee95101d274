use log::warn;
use std::env;
use std::str::FromStr;

pub const PROMPT_VAR: &str = "TINYSH_PROMPT";
pub const MAX_ARGS_VAR: &str = "TINYSH_MAX_ARGS";
pub const LINE_MAX_VAR: &str = "TINYSH_LINE_MAX";
pub const EXE_SUFFIX_VAR: &str = "TINYSH_EXE_SUFFIX";

/// Settings for one shell session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Printed before every line is read.
    pub prompt: String,
    /// Largest number of arguments a line may split into.
    pub max_tokens: usize,
    /// Size of the line buffer; a line holds at most `line_capacity - 1` characters.
    pub line_capacity: usize,
    /// Appended to a command name to form the program that is started.
    pub exe_suffix: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "tinysh% ".to_string(),
            max_tokens: 16,
            line_capacity: 64,
            exe_suffix: env::consts::EXE_SUFFIX.to_string(),
        }
    }
}

impl ShellConfig {
    /// Builds a configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// Unset variables keep their default; malformed numbers are logged and
    /// ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            prompt: lookup(PROMPT_VAR).unwrap_or(defaults.prompt),
            max_tokens: positive(&lookup, MAX_ARGS_VAR).unwrap_or(defaults.max_tokens),
            line_capacity: line_capacity(&lookup).unwrap_or(defaults.line_capacity),
            exe_suffix: lookup(EXE_SUFFIX_VAR).unwrap_or(defaults.exe_suffix),
        }
    }
}

/// The line buffer must leave room for at least one character.
fn line_capacity<F>(lookup: &F) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let n = positive(lookup, LINE_MAX_VAR)?;
    if n < 2 {
        warn!("ignoring {}={}: must be at least 2", LINE_MAX_VAR, n);
        return None;
    }
    Some(n)
}

fn positive<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match usize::from_str(raw.trim()) {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!("ignoring {}={:?}: expected a positive integer", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ShellConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ShellConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), ShellConfig::default());
        assert_eq!(ShellConfig::default().max_tokens, 16);
        assert_eq!(ShellConfig::default().line_capacity, 64);
    }

    #[test]
    fn reads_every_variable() {
        let cfg = config(&[
            (PROMPT_VAR, "> "),
            (MAX_ARGS_VAR, "4"),
            (LINE_MAX_VAR, " 128 "),
            (EXE_SUFFIX_VAR, ".coff"),
        ]);
        assert_eq!(cfg.prompt, "> ");
        assert_eq!(cfg.max_tokens, 4);
        assert_eq!(cfg.line_capacity, 128);
        assert_eq!(cfg.exe_suffix, ".coff");
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let cfg = config(&[(MAX_ARGS_VAR, "0"), (LINE_MAX_VAR, "lots")]);
        assert_eq!(cfg.max_tokens, 16);
        assert_eq!(cfg.line_capacity, 64);
    }

    #[test]
    fn line_max_without_room_for_a_character_falls_back() {
        assert_eq!(config(&[(LINE_MAX_VAR, "1")]).line_capacity, 64);
        assert_eq!(config(&[(LINE_MAX_VAR, "2")]).line_capacity, 2);
    }
}
