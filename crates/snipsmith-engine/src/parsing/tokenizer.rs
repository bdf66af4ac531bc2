//! Single-pass tokenizer for one template scope.
//!
//! Recognition order is fixed and the first match wins: escape,
//! transformation, tabstop, mirror, program, script, shell. Anything else is
//! literal text and produces no token.

use log::trace;

use super::cursor::Cursor;
use super::kinds::{Escape, Fragment, Placeholder};
use super::token::{Token, TokenKind};
use crate::error::{Construct, ParseError};
use crate::eval::FragmentKind;
use crate::geometry::{Position, Span};

/// Characters of lookahead every recognition check gets to see.
const LOOKAHEAD: usize = 10;

type Result<T> = std::result::Result<T, ParseError>;

/// Tokenizes `text`, one scope deep. Tabstop defaults come back as raw text;
/// the parser recurses into them itself.
///
/// `indent` is the base indent of the line the snippet expands on; program
/// fragment lines after the first are dedented by its length.
pub fn tokenize(text: &str, indent: &str) -> Result<Vec<Token>> {
    let mut cur = Cursor::new(text);
    let mut tokens = Vec::new();

    while !cur.eof() {
        let start = cur.pos();
        let lookahead = cur.peek_n(LOOKAHEAD);

        let kind = if Escape::check(lookahead, Escape::SPECIALS) {
            cur.bump();
            cur.bump().map(TokenKind::Escape)
        } else if Placeholder::is_transformation(lookahead) {
            Some(transformation(&mut cur, start)?)
        } else if Placeholder::is_tabstop(lookahead) {
            Some(tabstop(&mut cur, start)?)
        } else if Placeholder::is_mirror(lookahead) {
            cur.bump();
            Some(TokenKind::Mirror {
                number: number(&mut cur)?,
            })
        } else if let Some(fragment) = Fragment::kind(lookahead) {
            Some(code_fragment(&mut cur, start, fragment, indent)?)
        } else {
            cur.bump();
            None
        };

        if let Some(kind) = kind {
            tokens.push(Token {
                kind,
                span: Span::new(start, cur.pos()),
            });
        }
    }

    trace!("tokenized {} token(s) from {:?}", tokens.len(), text);
    Ok(tokens)
}

/// `${N:default}` or `${N}`
fn tabstop(cur: &mut Cursor<'_>, start: Position) -> Result<TokenKind> {
    cur.bump_n(Placeholder::OPEN.chars().count());
    let number = number(cur)?;
    if cur.peek() == Some(Placeholder::DEFAULT_SEP) {
        cur.bump();
    }
    let default = till_closing_brace(cur, Construct::TabStop, start)?;
    Ok(TokenKind::TabStop { number, default })
}

/// `${N/search/replace/options}`
fn transformation(cur: &mut Cursor<'_>, start: Position) -> Result<TokenKind> {
    cur.bump_n(Placeholder::OPEN.chars().count());
    let number = number(cur)?;
    cur.bump();

    let construct = Construct::Transformation;
    let search = till_unescaped(cur, Placeholder::SEGMENT_SEP, construct, start)?;
    let replace = till_unescaped(cur, Placeholder::SEGMENT_SEP, construct, start)?;
    let options = till_closing_brace(cur, construct, start)?;
    Ok(TokenKind::Transformation {
        number,
        search,
        replace,
        options,
    })
}

fn code_fragment(
    cur: &mut Cursor<'_>,
    start: Position,
    kind: FragmentKind,
    indent: &str,
) -> Result<TokenKind> {
    let construct = Construct::Fragment(kind);
    match kind {
        FragmentKind::Shell => {
            cur.bump();
            let code = till_unescaped(cur, Fragment::TICK, construct, start)?;
            Ok(TokenKind::Shell { code })
        }
        FragmentKind::Program => {
            cur.bump_n(Fragment::PROGRAM_TAG.chars().count());
            if matches!(cur.peek(), Some(' ' | '\t')) {
                cur.bump();
            }
            let raw = till_unescaped(cur, Fragment::TICK, construct, start)?;
            Ok(TokenKind::Program {
                code: dedent(&raw, indent).trim().to_string(),
                indent: indent.to_string(),
            })
        }
        FragmentKind::Script => {
            // Tag plus the whitespace that made it a tag.
            cur.bump_n(Fragment::SCRIPT_TAG.chars().count() + 1);
            let code = till_unescaped(cur, Fragment::TICK, construct, start)?;
            Ok(TokenKind::Script {
                code: code.trim().to_string(),
            })
        }
    }
}

/// Strips the expansion's base indent from every line but the first, so
/// program code written at the snippet's indentation parses as a block.
fn dedent(code: &str, indent: &str) -> String {
    if indent.is_empty() {
        return code.to_string();
    }
    let width = indent.chars().count();
    let mut lines = code.split('\n');
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        out.extend(line.chars().skip(width));
    }
    out
}

fn number(cur: &mut Cursor<'_>) -> Result<usize> {
    let at = cur.pos();
    let mut digits = String::new();
    while let Some(c) = cur.peek().filter(char::is_ascii_digit) {
        digits.push(c);
        cur.bump();
    }
    digits.parse().map_err(|_| ParseError::InvalidNumber { at })
}

/// Reads up to the brace closing an already consumed `{`, tracking nested
/// unescaped braces. The closing brace is consumed but not returned.
fn till_closing_brace(
    cur: &mut Cursor<'_>,
    construct: Construct,
    start: Position,
) -> Result<String> {
    let mut out = String::new();
    let mut depth = 1usize;
    loop {
        if Escape::check(cur.peek_n(2), Escape::BRACES) {
            out.extend(cur.bump());
            out.extend(cur.bump());
            continue;
        }
        let c = cur
            .bump()
            .ok_or(ParseError::Unterminated { construct, at: start })?;
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
        if depth == 0 {
            return Ok(out);
        }
        out.push(c);
    }
}

/// Reads up to the next `end` not preceded by a backslash. Escaped `end`s
/// stay in the result as `\end`; the terminator itself is consumed.
fn till_unescaped(
    cur: &mut Cursor<'_>,
    end: char,
    construct: Construct,
    start: Position,
) -> Result<String> {
    let mut buf = [0u8; 4];
    let end_str: &str = end.encode_utf8(&mut buf);
    let mut out = String::new();
    loop {
        if Escape::check(cur.peek_n(2), end_str) {
            out.extend(cur.bump());
            out.extend(cur.bump());
            continue;
        }
        let c = cur
            .bump()
            .ok_or(ParseError::Unterminated { construct, at: start })?;
        if c == end {
            return Ok(out);
        }
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text, "")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn pos(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    #[test]
    fn plain_text_has_no_tokens() {
        assert_eq!(kinds("hello world"), vec![]);
        assert_eq!(kinds("cost: $ 5 and {braces}"), vec![]);
    }

    #[test]
    fn tabstop_with_default_and_span() {
        let tokens = tokenize("a ${1:foo} b", "").unwrap();
        assert_eq!(
            tokens,
            vec![Token {
                kind: TokenKind::TabStop {
                    number: 1,
                    default: "foo".into()
                },
                span: Span::new(pos(0, 2), pos(0, 10)),
            }]
        );
    }

    #[test]
    fn tabstop_without_default() {
        assert_eq!(
            kinds("${2}"),
            vec![TokenKind::TabStop {
                number: 2,
                default: String::new()
            }]
        );
    }

    #[test]
    fn nested_default_is_left_raw() {
        assert_eq!(
            kinds("${1:outer ${2:inner} done}"),
            vec![TokenKind::TabStop {
                number: 1,
                default: "outer ${2:inner} done".into()
            }]
        );
    }

    #[test]
    fn escaped_braces_do_not_count_for_depth() {
        assert_eq!(
            kinds(r"${1:a\}b}"),
            vec![TokenKind::TabStop {
                number: 1,
                default: r"a\}b".into()
            }]
        );
    }

    #[test]
    fn mirror_and_escape() {
        assert_eq!(
            kinds(r"\$1 $12"),
            vec![TokenKind::Escape('$'), TokenKind::Mirror { number: 12 }]
        );
    }

    #[test]
    fn transformation_segments() {
        assert_eq!(
            kinds(r"${1/a\/b/(?1:x)/gi}"),
            vec![TokenKind::Transformation {
                number: 1,
                search: r"a\/b".into(),
                replace: "(?1:x)".into(),
                options: "gi".into(),
            }]
        );
    }

    #[test]
    fn code_fragments() {
        assert_eq!(
            kinds(r"`echo \`hi\``"),
            vec![TokenKind::Shell {
                code: r"echo \`hi\`".into()
            }]
        );
        assert_eq!(
            kinds("`!v  strftime('%Y') `"),
            vec![TokenKind::Script {
                code: "strftime('%Y')".into()
            }]
        );
        assert_eq!(
            kinds("`!p snip.rv = t[1] `"),
            vec![TokenKind::Program {
                code: "snip.rv = t[1]".into(),
                indent: String::new(),
            }]
        );
    }

    #[test]
    fn program_lines_lose_base_indent() {
        let tokens = tokenize("`!p a = 1\n    b = 2\n      c = 3`", "    ").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Program {
                code: "a = 1\nb = 2\n  c = 3".into(),
                indent: "    ".into(),
            }
        );
        assert_eq!(tokens[0].span.end, pos(2, 12));
    }

    #[test]
    fn spans_follow_line_breaks() {
        let tokens = tokenize("x\n  $3", "").unwrap();
        assert_eq!(tokens[0].span, Span::new(pos(1, 2), pos(1, 4)));
    }

    #[test]
    fn unterminated_constructs_are_errors() {
        let cases = [
            ("ab ${1:foo", Construct::TabStop, pos(0, 3)),
            ("${1/a/b", Construct::Transformation, pos(0, 0)),
            ("`date", Construct::Fragment(FragmentKind::Shell), pos(0, 0)),
            ("x\n`!p code", Construct::Fragment(FragmentKind::Program), pos(1, 0)),
        ];
        for (text, construct, at) in cases {
            match tokenize(text, "") {
                Err(ParseError::Unterminated { construct: c, at: a }) => {
                    assert_eq!((c, a), (construct, at), "{text}");
                }
                other => panic!("{text}: expected unterminated error, got {other:?}"),
            }
        }
    }

    #[test]
    fn oversized_number_is_invalid() {
        assert!(matches!(
            tokenize("$99999999999999999999999", ""),
            Err(ParseError::InvalidNumber { at }) if at == pos(0, 1)
        ));
    }
}
