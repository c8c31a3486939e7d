// src/core/arg_parser.rs

/// The value attached to a parsed flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Text(String),
    Bool(bool),
}

/// A single named argument recovered from the raw argument sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFlag {
    pub key: String,
    pub value: FlagValue,
}

impl ParsedFlag {
    fn new(key: impl Into<String>, value: FlagValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Parses raw CLI arguments into flags, permissively.
///
/// # Logic:
/// - `--` ends flag parsing; everything after it is positional.
/// - `--key=value` and `-k=value` carry their value inline.
/// - `--no-key` sets `key` to `false`.
/// - `--key` takes the next token as its value unless that token looks like a
///   flag (`-x...` or `--x...`) or is `--`, in which case (or at the end of
///   input) it is `true`. A lone `-` is a value. A literal `true`/`false` value
///   becomes a boolean.
/// - `-abc` sets `a` and `b` to `true`; `c` follows the `--key` rule.
///   `-n5` sets `n` to `"5"`, and a non-word character after a letter starts
///   that letter's value (`-a/x` sets `a` to `"/x"`).
/// - Anything else, including a bare `-`, is positional and is dropped.
///
/// Flags are returned in input order; a repeated flag appears once per occurrence.
pub fn parse_flags(args: &[String]) -> Vec<ParsedFlag> {
    let mut flags = Vec::new();
    let mut iter = args.iter().map(String::as_str).peekable();

    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        if let Some(long) = arg.strip_prefix("--") {
            if let Some((key, value)) = long.split_once('=') {
                flags.push(ParsedFlag::new(key, FlagValue::Text(value.to_string())));
            } else if let Some(negated) = long.strip_prefix("no-") {
                flags.push(ParsedFlag::new(negated, FlagValue::Bool(false)));
            } else {
                let value = take_value(&mut iter);
                flags.push(ParsedFlag::new(long, value));
            }
            continue;
        }

        let Some(short) = arg.strip_prefix('-') else {
            continue; // positional
        };
        if short.is_empty() {
            continue; // a bare `-` is positional
        }

        parse_short_cluster(short, &mut iter, &mut flags);
    }

    flags
}

/// Expands a cluster like `abc` (from `-abc`) into individual flags.
fn parse_short_cluster<'a, I>(
    cluster: &str,
    iter: &mut std::iter::Peekable<I>,
    flags: &mut Vec<ParsedFlag>,
) where
    I: Iterator<Item = &'a str>,
{
    for (idx, letter) in cluster.char_indices() {
        let rest = cluster.get(idx + letter.len_utf8()..).unwrap_or_default();
        let text = |value: &str| ParsedFlag::new(letter.to_string(), FlagValue::Text(value.into()));

        if rest.is_empty() {
            // The last letter of the cluster may take the following token.
            if letter != '-' {
                let value = take_value(iter);
                flags.push(ParsedFlag::new(letter.to_string(), value));
            }
            return;
        }

        if rest == "-" {
            flags.push(text(rest));
            continue;
        }

        if letter.is_ascii_alphabetic() {
            if let Some(inline) = rest.strip_prefix('=') {
                flags.push(text(inline));
                return;
            }
            if looks_numeric(rest) {
                flags.push(text(rest));
                return;
            }
        }

        if rest.starts_with(|c: char| !(c.is_alphanumeric() || c == '_')) {
            flags.push(text(rest));
            return;
        }

        flags.push(ParsedFlag::new(letter.to_string(), FlagValue::Bool(true)));
    }
}

/// Consumes the next token as a flag value if it is not itself a flag.
fn take_value<'a, I>(iter: &mut std::iter::Peekable<I>) -> FlagValue
where
    I: Iterator<Item = &'a str>,
{
    match iter.next_if(|next| *next != "--" && !looks_like_flag(next)) {
        Some("true") => FlagValue::Bool(true),
        Some("false") => FlagValue::Bool(false),
        Some(value) => FlagValue::Text(value.to_string()),
        None => FlagValue::Bool(true),
    }
}

/// `-x...` or `--x...` where `x` is not a dash.
fn looks_like_flag(token: &str) -> bool {
    let starts_flag = |s: &str| s.starts_with(|c: char| c != '-');
    match token.strip_prefix('-') {
        Some(rest) => starts_flag(rest) || rest.strip_prefix('-').is_some_and(starts_flag),
        None => false,
    }
}

fn looks_numeric(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.starts_with(|c: char| c.is_ascii_digit()) && digits.parse::<f64>().is_ok()
}
