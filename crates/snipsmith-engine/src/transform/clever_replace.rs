//! TextMate-style replacement templates.
//!
//! Stages run in a fixed order, each over the output of the previous one:
//! `$N` interpolation, `\u`/`\l` folding, `\U..\E`/`\L..\E` folding,
//! `(?N:then:else)` conditionals, then escape decoding.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn dollar_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$(\d+)").expect("Invalid group regex"))
}

fn short_fold_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\\([ul].)").expect("Invalid case folding regex"))
}

fn long_fold_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\\([UL].*?)\\E").expect("Invalid case folding regex"))
}

fn conditional_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\?(\d+):").expect("Invalid conditional regex"))
}

fn literal_escape_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\\([^ntrab])").expect("Invalid unescape regex"))
}

/// A compiled replacement template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleverReplace {
    template: String,
}

impl CleverReplace {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expands the template against one regex match.
    pub fn replace(&self, caps: &Captures<'_>) -> String {
        let text = dollar_regex().replace_all(&self.template, |m: &Captures<'_>| {
            group_text(caps, &m[1]).to_string()
        });
        let text = short_fold_regex().replace_all(&text, |m: &Captures<'_>| fold_short(&m[1]));
        let text = long_fold_regex().replace_all(&text, |m: &Captures<'_>| fold_long(&m[1]));
        let text = replace_conditionals(caps, &text);
        unescape_literals(&decode_escapes(&text))
    }
}

/// Text of group `number`, empty when it is out of range or did not take
/// part in the match.
fn group_text<'h>(caps: &Captures<'h>, number: &str) -> &'h str {
    number
        .parse::<usize>()
        .ok()
        .and_then(|n| caps.get(n))
        .map_or("", |m| m.as_str())
}

/// `u<c>` or `l<c>`
fn fold_short(marker: &str) -> String {
    let mut chars = marker.chars();
    match (chars.next(), chars.next()) {
        (Some('u'), Some(c)) => c.to_uppercase().collect(),
        (Some(_), Some(c)) => c.to_lowercase().collect(),
        _ => String::new(),
    }
}

/// `U<run>` or `L<run>`
fn fold_long(marker: &str) -> String {
    match marker.split_at(1) {
        ("U", run) => run.to_uppercase(),
        (_, run) => run.to_lowercase(),
    }
}

fn replace_conditionals(caps: &Captures<'_>, text: &str) -> String {
    let mut text = text.to_string();
    while let Some(m) = conditional_regex().captures(&text) {
        let (Some(whole), Some(number)) = (m.get(0), m.get(1)) else {
            break;
        };
        let Some(end) = find_closing_paren(&text, whole.end()) else {
            // Unterminated: leave it for the caller to see.
            break;
        };

        let branches = split_branches(&text[whole.end()..end - 1]);
        let chosen = if !group_text(caps, number.as_str()).is_empty() {
            branches.first()
        } else {
            branches.get(1)
        };
        let expanded = chosen
            .map(|branch| unescape_literals(&replace_conditionals(caps, branch)))
            .unwrap_or_default();

        text = format!("{}{}{}", &text[..whole.start()], expanded, &text[end..]);
    }
    text
}

/// Byte index just past the `)` closing a paren opened before `from`.
fn find_closing_paren(text: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut prev = text[..from].chars().next_back();
    for (idx, c) in text[from..].char_indices() {
        let escaped = prev == Some('\\');
        match c {
            '(' if !escaped => depth += 1,
            ')' if !escaped => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + idx + 1);
                }
            }
            _ => {}
        }
        prev = Some(c);
    }
    None
}

/// Splits a conditional body on `:` at paren depth 0, skipping `\:`.
fn split_branches(body: &str) -> Vec<String> {
    let mut branches = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut prev = None;
    for c in body.chars() {
        let escaped = prev == Some('\\');
        match c {
            '(' if !escaped => depth += 1,
            ')' if !escaped => depth = depth.saturating_sub(1),
            ':' if !escaped && depth == 0 => {
                branches.push(std::mem::take(&mut current));
                prev = Some(c);
                continue;
            }
            _ => {}
        }
        current.push(c);
        prev = Some(c);
    }
    branches.push(current);
    branches
}

/// Decodes `\n`-style escapes, `\xNN` hex escapes and one to three digit
/// octal escapes. Unknown or malformed escapes are kept, backslash included.
fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let simple = match chars.peek() {
            Some('\\') => Some('\\'),
            Some('\'') => Some('\''),
            Some('"') => Some('"'),
            Some('a') => Some('\x07'),
            Some('b') => Some('\x08'),
            Some('f') => Some('\x0c'),
            Some('n') => Some('\n'),
            Some('r') => Some('\r'),
            Some('t') => Some('\t'),
            Some('v') => Some('\x0b'),
            _ => None,
        };
        if let Some(d) = simple {
            chars.next();
            out.push(d);
            continue;
        }

        match chars.peek() {
            // Escaped line break joins the lines.
            Some('\n') => {
                chars.next();
            }
            Some('x') => {
                let digits: String = chars.clone().skip(1).take(2).collect();
                match u8::from_str_radix(&digits, 16) {
                    Ok(byte) if digits.len() == 2 && !digits.starts_with('+') => {
                        chars.nth(2);
                        out.push(char::from(byte));
                    }
                    _ => out.push('\\'),
                }
            }
            Some('0'..='7') => {
                let mut value = 0u32;
                for _ in 0..3 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                // Three octal digits go up to 0o777; keep to one byte.
                out.push(char::from((value & 0xff) as u8));
            }
            _ => out.push('\\'),
        }
    }
    out
}

/// Drops the backslash of `\c` for any `c` outside `ntrab`.
fn unescape_literals(text: &str) -> String {
    literal_escape_regex().replace_all(text, "${1}").into_owned()
}
