//! Parses rendered chains the way the engine does and checks that captions
//! reach `drawtext` as one literal value.

use nexus_edit_model::{AspectRatio, ColorPreset, EditSpec, TextOverlay};
use nexus_filter_graph::{
    compile_graph, read_token, text_fragment, FilterGraph, GRAPH_TERMINATORS, OPTION_TERMINATORS,
};
use proptest::prelude::*;

/// One parsed filter: name and `(key, value)` options.
#[derive(Debug)]
struct ParsedFilter {
    name: String,
    options: Vec<(Option<String>, String)>,
}

impl ParsedFilter {
    fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Split a `,`-joined chain into filters, then each option string into
/// options, stripping quoting at both passes.
fn parse_chain(chain: &str) -> Vec<ParsedFilter> {
    let mut filters = Vec::new();
    let mut rest = chain;
    loop {
        rest = rest.trim_start();
        let name_len = rest
            .find(|c: char| c == '=' || GRAPH_TERMINATORS.contains(&c) || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..name_len].to_string();
        rest = &rest[name_len..];

        let mut options = Vec::new();
        if let Some(after_eq) = rest.strip_prefix('=') {
            let (args, after) = read_token(after_eq, &GRAPH_TERMINATORS);
            options = parse_options(&args);
            rest = after;
        }
        filters.push(ParsedFilter { name, options });

        match rest.trim_start().strip_prefix(',') {
            Some(next) => rest = next,
            None => break,
        }
    }
    filters
}

fn parse_options(args: &str) -> Vec<(Option<String>, String)> {
    let mut options = Vec::new();
    let mut rest = args;
    loop {
        let key_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let (key, value_start) = match rest[key_len..].strip_prefix('=') {
            Some(value) if key_len > 0 => (Some(rest[..key_len].to_string()), value),
            _ => (None, rest),
        };
        let (value, after) = read_token(value_start, &OPTION_TERMINATORS);
        options.push((key, value));
        match after.strip_prefix(':') {
            Some(next) => rest = next,
            None => break,
        }
    }
    options
}

/// What `drawtext` draws for an already tokenized `text` value.
fn drawn_text(value: &str) -> String {
    let mut out = String::new();
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.extend(chars.next()),
            _ => out.push(ch),
        }
    }
    out
}

fn caption_filters(caption: &str) -> Vec<ParsedFilter> {
    let fragment = text_fragment(&TextOverlay::new(caption, 40, 60, 44)).expect("caption");
    parse_chain(&fragment.render())
}

#[test]
fn quote_in_caption_cannot_open_new_filters() {
    let caption = "x',hflip,drawtext=text='y";
    let filters = caption_filters(caption);
    assert_eq!(filters.len(), 1, "{filters:?}");
    assert_eq!(filters[0].name, "drawtext");
    assert_eq!(drawn_text(filters[0].option("text").unwrap()), caption);
    assert_eq!(filters[0].option("fontcolor"), Some("white"));
}

#[test]
fn quote_in_caption_cannot_override_options() {
    let caption = "a':fontcolor=red:x='0";
    let filters = caption_filters(caption);
    assert_eq!(filters.len(), 1);
    assert_eq!(drawn_text(filters[0].option("text").unwrap()), caption);
    assert_eq!(filters[0].option("fontcolor"), Some("white"));
    assert_eq!(filters[0].option("x"), Some("40"));
}

#[test]
fn everyday_punctuation_is_kept() {
    for caption in ["Let's go", "100% real", r"C:\path", "a;b[c]", "time: 10:30"] {
        let filters = caption_filters(caption);
        assert_eq!(filters.len(), 1, "{caption}");
        assert_eq!(drawn_text(filters[0].option("text").unwrap()), caption);
    }
}

#[test]
fn full_chain_parses_into_expected_filters() {
    let spec = EditSpec::default()
        .with_aspect_ratio(AspectRatio::R16x9)
        .with_color_preset(ColorPreset::Warm)
        .with_text(TextOverlay::new("it's, fine", 10, 10, 20));
    let FilterGraph::Simple { chain } = compile_graph(&spec) else {
        panic!("expected a simple chain");
    };

    let filters = parse_chain(&chain.render());
    let names: Vec<_> = filters.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["crop", "eq", "colorbalance", "drawtext"]);
    assert_eq!(
        filters[0].options,
        vec![
            (None, "if(gt(a,16/9),ih*16/9,iw)".to_string()),
            (None, "if(gt(a,16/9),ih,iw*9/16)".to_string()),
        ]
    );
    assert_eq!(drawn_text(filters[3].option("text").unwrap()), "it's, fine");
}

proptest! {
    #[test]
    fn any_caption_stays_one_drawtext(caption in "[ -~]{1,32}") {
        let overlay = TextOverlay::new(caption, 0, 0, 12);
        let Some(fragment) = text_fragment(&overlay) else {
            return Ok(());
        };
        let filters = parse_chain(&fragment.render());
        prop_assert_eq!(filters.len(), 1);
        prop_assert_eq!(filters[0].name.as_str(), "drawtext");
        prop_assert_eq!(filters[0].options.len(), 8);
        let text = filters[0].option("text").map(drawn_text);
        prop_assert_eq!(text.as_deref(), Some(overlay.trimmed_content()));
    }
}
