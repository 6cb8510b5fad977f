//! Text cleanup and link facets for the destination's rich-text format

use regex::Regex;
use std::sync::LazyLock;

use crate::model::LinkFacet;

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid link regex"));

fn is_stripped_control(c: char) -> bool {
    matches!(c,
        '\u{0000}'..='\u{0008}'
        | '\u{000B}'
        | '\u{000C}'
        | '\u{000E}'..='\u{001F}'
        | '\u{007F}'..='\u{009F}')
}

fn is_invisible(c: char) -> bool {
    matches!(c,
        '\u{200B}'..='\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2060}'..='\u{206F}'
        | '\u{FEFF}')
}

fn is_horizontal_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{00A0}')
}

/// Clean text for the destination.
///
/// Line endings become `\n`, control characters (other than tab and line
/// breaks) and invisible formatting characters are dropped, runs of two or
/// more spaces/tabs/NBSPs collapse to one space, and the result is trimmed.
/// `clean(clean(s)) == clean(s)` for every input.
pub fn clean(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(normalized.len());
    let mut run: Vec<char> = Vec::new();

    for c in normalized
        .chars()
        .filter(|c| !is_stripped_control(*c) && !is_invisible(*c))
    {
        if is_horizontal_space(c) {
            run.push(c);
            continue;
        }
        flush_space_run(&mut out, &mut run);
        out.push(c);
    }
    flush_space_run(&mut out, &mut run);

    out.trim().to_string()
}

fn flush_space_run(out: &mut String, run: &mut Vec<char>) {
    match run.len() {
        0 => {}
        1 => out.push(run[0]),
        _ => out.push(' '),
    }
    run.clear();
}

/// Locate every `http(s)://` link and report UTF-8 byte offsets.
///
/// Links are non-overlapping runs without whitespace, scanned left to right.
pub fn build_link_facets(text: &str) -> Vec<LinkFacet> {
    LINK.find_iter(text)
        .map(|m| LinkFacet {
            byte_start: m.start(),
            byte_end: m.end(),
            uri: m.as_str().to_string(),
        })
        .collect()
}
