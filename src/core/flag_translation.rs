// src/core/flag_translation.rs

use crate::core::arg_parser::{FlagValue, ParsedFlag};

/// How translated flags are laid out in the child's argument vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationMode {
    /// One token per flag, value JSON-quoted: `--model "x"`. The tokens are later
    /// joined into a shell command line.
    ShellQuoted,
    /// Flag and value as two discrete argv entries: `--model`, `x`.
    SeparateTokens,
}

impl TranslationMode {
    /// Interactive launches go through the shell; automation launches do not.
    pub fn for_non_interactive(non_interactive: bool) -> Self {
        if non_interactive {
            Self::SeparateTokens
        } else {
            Self::ShellQuoted
        }
    }
}

/// Returns `-k` for single-character keys and `--key` otherwise.
pub fn flag_name(key: &str) -> String {
    if key.chars().count() == 1 {
        format!("-{}", key)
    } else {
        format!("--{}", key)
    }
}

/// Re-serializes parsed flags into argv tokens for the target executable.
///
/// `true` flags become a bare flag, `false` flags are dropped, every other value
/// is kept. See [`TranslationMode`] for the token layout.
pub fn translate_flags(flags: &[ParsedFlag], mode: TranslationMode) -> Vec<String> {
    let mut tokens = Vec::with_capacity(flags.len() * 2);

    for flag in flags {
        let name = flag_name(&flag.key);
        match &flag.value {
            FlagValue::Bool(false) => {}
            FlagValue::Bool(true) => tokens.push(name),
            FlagValue::Text(value) => match mode {
                TranslationMode::ShellQuoted => {
                    tokens.push(format!("{} {}", name, json_quote(value)));
                }
                TranslationMode::SeparateTokens => {
                    tokens.push(name);
                    tokens.push(value.clone());
                }
            },
        }
    }

    tokens
}

// Double-quotes a value the way `JSON.stringify` would.
fn json_quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.replace('"', "\\\"")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arg_parser::parse_flags;

    fn to_cli_params(params: &[&str]) -> Vec<String> {
        params.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shell_quoted_combines_flag_and_value() {
        let flags = parse_flags(&to_cli_params(&["--model", "x", "-v"]));
        let tokens = translate_flags(&flags, TranslationMode::ShellQuoted);
        assert_eq!(tokens, vec!["--model \"x\"".to_string(), "-v".to_string()]);
    }

    #[test]
    fn test_separate_tokens_split_flag_and_value() {
        let flags = parse_flags(&to_cli_params(&["--model", "x"]));
        let tokens = translate_flags(&flags, TranslationMode::SeparateTokens);
        assert_eq!(tokens, vec!["--model".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_true_flags_are_bare_in_both_modes() {
        let flags = parse_flags(&to_cli_params(&["--verbose", "-c"]));
        for mode in [TranslationMode::ShellQuoted, TranslationMode::SeparateTokens] {
            assert_eq!(
                translate_flags(&flags, mode),
                vec!["--verbose".to_string(), "-c".to_string()]
            );
        }
    }

    #[test]
    fn test_false_flags_are_dropped() {
        let flags = parse_flags(&to_cli_params(&["--no-color", "--debug", "false", "-p", "hi"]));
        let tokens = translate_flags(&flags, TranslationMode::SeparateTokens);
        assert_eq!(tokens, vec!["-p".to_string(), "hi".to_string()]);
        assert!(!tokens.iter().any(|t| t.contains("color") || t.contains("debug")));
    }

    #[test]
    fn test_shell_quoted_escapes_embedded_quotes() {
        let flags = parse_flags(&to_cli_params(&["--append-system-prompt", "say \"hi\""]));
        let tokens = translate_flags(&flags, TranslationMode::ShellQuoted);
        assert_eq!(tokens, vec![r#"--append-system-prompt "say \"hi\"""#.to_string()]);
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(
            TranslationMode::for_non_interactive(true),
            TranslationMode::SeparateTokens
        );
        assert_eq!(
            TranslationMode::for_non_interactive(false),
            TranslationMode::ShellQuoted
        );
    }
}
