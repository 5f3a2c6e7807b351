//! Filter expression AST and its rendering to the engine's filter language.
//!
//! Grammar emitted here:
//!
//! ```text
//! filter    := name [ "=" arg { ":" arg } ]
//! arg       := value | key "=" value
//! value     := raw | quoted
//! fragment  := filter { ", " filter }
//! chain     := fragment { "," fragment }
//! ```
//!
//! The engine tokenizes a graph twice: once to split filters (`[],;` end a
//! token) and once more to split a filter's options (`:` ends a token). Both
//! passes strip one layer of quoting and backslash escapes. A quoted value is
//! escaped for the option pass first and then quoted for the graph pass, so
//! it reaches the filter as exactly one literal value.

use std::fmt;

use serde::Serialize;

/// A single argument value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    /// Emitted verbatim. Only for values this crate generates itself.
    Raw(String),
    /// Emitted inside single quotes with escaping. Required for user text
    /// and for expressions containing `,`.
    Quoted(String),
}

impl ArgValue {
    fn render_into(&self, out: &mut String) {
        match self {
            Self::Raw(raw) => out.push_str(raw),
            Self::Quoted(text) => out.push_str(&escape_quoted(text)),
        }
    }
}

/// A positional or `key=value` argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterArg {
    pub key: Option<&'static str>,
    pub value: ArgValue,
}

/// One engine filter such as `crop` or `drawtext`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Filter {
    pub name: &'static str,
    pub args: Vec<FilterArg>,
    /// Number of video streams the filter consumes.
    pub inputs: usize,
}

impl Filter {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
            inputs: 1,
        }
    }

    /// Mark the filter as consuming `count` input streams.
    pub fn with_inputs(mut self, count: usize) -> Self {
        self.inputs = count;
        self
    }

    /// Positional raw argument.
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.args.push(FilterArg {
            key: None,
            value: ArgValue::Raw(value.to_string()),
        });
        self
    }

    /// Positional quoted argument.
    pub fn quoted_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(FilterArg {
            key: None,
            value: ArgValue::Quoted(value.into()),
        });
        self
    }

    /// `key=value` raw argument.
    pub fn option(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.args.push(FilterArg {
            key: Some(key),
            value: ArgValue::Raw(value.to_string()),
        });
        self
    }

    /// `key='value'` quoted argument.
    pub fn quoted_option(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.args.push(FilterArg {
            key: Some(key),
            value: ArgValue::Quoted(value.into()),
        });
        self
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(self.name);
        for (idx, arg) in self.args.iter().enumerate() {
            out.push(if idx == 0 { '=' } else { ':' });
            if let Some(key) = arg.key {
                out.push_str(key);
                out.push('=');
            }
            arg.value.render_into(out);
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }
}

/// A self-contained unit of filter expression, e.g. one crop or one grade.
///
/// A fragment may expand to more than one engine filter (a grade can be an
/// `eq` followed by a `colorbalance`); it is still placed as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterFragment {
    filters: Vec<Filter>,
}

impl FilterFragment {
    pub fn new(filter: Filter) -> Self {
        Self {
            filters: vec![filter],
        }
    }

    /// Append another filter to this fragment.
    pub fn then(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Number of streams this fragment consumes.
    pub fn input_count(&self) -> usize {
        self.filters.first().map(|f| f.inputs).unwrap_or(1)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        for (idx, filter) in self.filters.iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            filter.render_into(out);
        }
    }
}

impl fmt::Display for FilterFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// An ordered sequence of fragments applied to one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FilterChain {
    fragments: Vec<FilterFragment>,
}

/// Identity filter used when a chain must exist but has nothing to do.
pub const PASSTHROUGH_FILTER: &str = "null";

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: FilterFragment) {
        self.fragments.push(fragment);
    }

    pub fn fragments(&self) -> &[FilterFragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Streams consumed by the first fragment.
    pub fn input_count(&self) -> usize {
        self.fragments
            .first()
            .map(FilterFragment::input_count)
            .unwrap_or(1)
    }

    /// Render with `,` between fragments. Empty chains render as `""`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (idx, fragment) in self.fragments.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            fragment.render_into(&mut out);
        }
        out
    }

    /// Like [`render`](Self::render) but never empty.
    pub fn render_or_passthrough(&self) -> String {
        if self.is_empty() {
            PASSTHROUGH_FILTER.to_string()
        } else {
            self.render()
        }
    }
}

impl FromIterator<FilterFragment> for FilterChain {
    fn from_iter<I: IntoIterator<Item = FilterFragment>>(iter: I) -> Self {
        Self {
            fragments: iter.into_iter().collect(),
        }
    }
}

/// Whitespace the engine's tokenizer skips or trims around a token.
const TOKEN_WHITESPACE: [char; 4] = [' ', '\n', '\t', '\r'];

/// Terminators of the graph pass: a filter's option string ends at any of these.
pub const GRAPH_TERMINATORS: [char; 4] = ['[', ']', ',', ';'];

/// Terminator of the option pass.
pub const OPTION_TERMINATORS: [char; 1] = [':'];

/// Render `text` as a single-quoted filter value that survives both
/// tokenizer passes unchanged.
///
/// Option pass: `\`, `'` and `:` get a backslash, as does whitespace at
/// either end. Graph pass: the result is wrapped in `'...'` and every `'`
/// inside becomes `'\''` (close, escaped quote, reopen). Text without those
/// characters renders as plain `'text'`.
pub fn escape_quoted(text: &str) -> String {
    let option_level = escape_option_value(text);
    let mut out = String::with_capacity(option_level.len() + 2);
    out.push('\'');
    for ch in option_level.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

/// Inverse of [`escape_quoted`]: what the filter finally receives.
pub fn unescape_quoted(rendered: &str) -> String {
    let (option_level, _) = read_token(rendered, &[]);
    let (value, _) = read_token(&option_level, &[]);
    value
}

fn escape_option_value(text: &str) -> String {
    let last = text.chars().count().saturating_sub(1);
    let mut out = String::with_capacity(text.len());
    for (idx, ch) in text.chars().enumerate() {
        let edge_space = (idx == 0 || idx == last) && TOKEN_WHITESPACE.contains(&ch);
        if matches!(ch, '\\' | '\'' | ':') || edge_space {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Read one token the way the engine's tokenizer does.
///
/// Leading whitespace is skipped; `'...'` is literal up to the next `'`;
/// outside quotes `\x` yields `x`; the token ends at an unquoted terminator;
/// trailing unquoted, unescaped whitespace is dropped. Returns the token and
/// the unread rest, which starts at the terminator.
pub fn read_token<'a>(input: &'a str, terminators: &[char]) -> (String, &'a str) {
    let mut rest = input.trim_start_matches(TOKEN_WHITESPACE);
    let mut out = String::new();
    // Length of `out` that trailing-whitespace trimming must not cut into.
    let mut kept = 0;

    while let Some(ch) = rest.chars().next() {
        if terminators.contains(&ch) {
            break;
        }
        rest = &rest[ch.len_utf8()..];
        match ch {
            '\\' if !rest.is_empty() => {
                let next = rest.chars().next().unwrap_or_default();
                rest = &rest[next.len_utf8()..];
                out.push(next);
                kept = out.len();
            }
            '\'' => match rest.find('\'') {
                Some(close) => {
                    out.push_str(&rest[..close]);
                    rest = &rest[close + 1..];
                    kept = out.len();
                }
                None => {
                    out.push_str(rest);
                    rest = "";
                }
            },
            _ => out.push(ch),
        }
    }

    let trimmed = out[kept..].trim_end_matches(TOKEN_WHITESPACE).len();
    out.truncate(kept + trimmed);
    (out, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_without_args_renders_bare_name() {
        assert_eq!(Filter::new("null").render(), "null");
    }

    #[test]
    fn test_mixed_args_render() {
        let filter = Filter::new("scale")
            .arg(1280)
            .arg(-2)
            .option("flags", "lanczos");
        assert_eq!(filter.render(), "scale=1280:-2:flags=lanczos");
    }

    #[test]
    fn test_quoted_values_are_escaped() {
        let filter = Filter::new("drawtext").quoted_option("text", r"it's a\b");
        assert_eq!(filter.render(), r"drawtext=text='it\'\''s a\\b'");
    }

    #[test]
    fn test_multi_filter_fragment_uses_comma_space() {
        let fragment = FilterFragment::new(Filter::new("eq").option("contrast", 1.1))
            .then(Filter::new("colorbalance").option("rs", 0.05));
        assert_eq!(fragment.render(), "eq=contrast=1.1, colorbalance=rs=0.05");
    }

    #[test]
    fn test_chain_joins_with_comma_and_passthrough() {
        let empty = FilterChain::new();
        assert_eq!(empty.render(), "");
        assert_eq!(empty.render_or_passthrough(), "null");

        let chain: FilterChain = [
            FilterFragment::new(Filter::new("hflip")),
            FilterFragment::new(Filter::new("hue").option("s", 0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(chain.render(), "hflip,hue=s=0");
    }

    #[test]
    fn test_unescape_tolerates_trailing_backslash() {
        assert_eq!(unescape_quoted("abc\\"), "abc\\");
    }

    #[test]
    fn test_read_token_quoting_rules() {
        // Backslash is literal inside quotes; the quote closes right after it.
        assert_eq!(read_token(r"'a\'b'", &[]), (r"a\b".to_string(), ""));
        assert_eq!(read_token(r"a\,b,c", &[',']), ("a,b".to_string(), ",c"));
        assert_eq!(read_token("  x y  :z", &[':']), ("x y".to_string(), ":z"));
        assert_eq!(read_token(r"'x '", &[]), ("x ".to_string(), ""));
        assert_eq!(read_token(r"x\ ", &[]), ("x ".to_string(), ""));
    }

    #[test]
    fn test_plain_text_renders_as_plain_quotes() {
        assert_eq!(escape_quoted("Hi there"), "'Hi there'");
        assert_eq!(escape_quoted("min(iw,ih)"), "'min(iw,ih)'");
    }

    #[test]
    fn test_apostrophe_survives_both_passes() {
        let rendered = escape_quoted("Let's go");
        assert_eq!(rendered, r"'Let\'\''s go'");
        assert_eq!(unescape_quoted(&rendered), "Let's go");
    }

    #[test]
    fn test_colon_and_edge_spaces_are_escaped_for_options() {
        assert_eq!(escape_quoted("a:b"), r"'a\:b'");
        assert_eq!(escape_quoted(" pad "), r"'\ pad\ '");
        assert_eq!(unescape_quoted(&escape_quoted(" pad ")), " pad ");
    }

    proptest::proptest! {
        #[test]
        fn prop_escape_round_trips(text in ".*") {
            proptest::prop_assert_eq!(unescape_quoted(&escape_quoted(&text)), text);
        }

        #[test]
        fn prop_quoted_value_is_one_token_at_both_levels(text in "[a-z':,;\\[\\] \\\\]{0,24}") {
            let rendered = escape_quoted(&text);
            let (option_level, rest) = read_token(&rendered, &GRAPH_TERMINATORS);
            proptest::prop_assert_eq!(rest, "");
            let (value, rest) = read_token(&option_level, &OPTION_TERMINATORS);
            proptest::prop_assert_eq!(rest, "");
            proptest::prop_assert_eq!(value, text);
        }
    }
}
