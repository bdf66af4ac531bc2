use anyhow::Context;
use pretty_assertions::assert_eq;
use snipsmith_engine::{
    Construct, EvalContext, Evaluator, ExpandOptions, FragmentKind, Globals, NullEvaluator,
    ParseError, Position, SnippetError, SnippetInstance, Span, TabStopInfo,
};

/// Deterministic evaluator with a tiny command language for program
/// fragments. Shell fragments echo their code, scripts upper-case it.
#[derive(Default)]
struct Scripted {
    calls: usize,
}

impl Evaluator for Scripted {
    fn evaluate(
        &mut self,
        kind: FragmentKind,
        code: &str,
        ctx: &mut EvalContext<'_>,
    ) -> anyhow::Result<String> {
        self.calls += 1;
        let mut words = code.split_whitespace();
        let command = words.next();
        let mut number = || -> anyhow::Result<usize> {
            Ok(words.next().context("missing tabstop number")?.parse()?)
        };

        match (kind, command) {
            (FragmentKind::Shell, Some("preamble")) => Ok(ctx
                .take_preamble()
                .map(|lines| lines.join(";"))
                .unwrap_or_else(|| "-".to_string())),
            (FragmentKind::Shell, _) => Ok(format!("{code}\n")),
            (FragmentKind::Script, _) => Ok(code.to_uppercase()),
            (FragmentKind::Program, Some("upper")) => {
                let n = number()?;
                Ok(ctx.tab(n).unwrap_or_default().to_uppercase())
            }
            (FragmentKind::Program, Some("reject")) => {
                let text = ctx.tab(number()?).unwrap_or_default();
                if text == "bad" {
                    anyhow::bail!("rejected {text:?}");
                }
                Ok(text.len().to_string())
            }
            (FragmentKind::Program, Some("match")) => {
                Ok(ctx.locals().get("match").cloned().unwrap_or_default())
            }
            (FragmentKind::Program, Some("lines")) => {
                let util = ctx.util_mut();
                util.set_rv("a");
                util.shift(1);
                util.push_line("b");
                Ok(String::new())
            }
            _ => anyhow::bail!("unknown command {code:?}"),
        }
    }
}

fn expand(template: &str) -> SnippetInstance {
    let (snippet, failures) =
        SnippetInstance::new(template, ExpandOptions::default(), &mut Scripted::default())
            .unwrap();
    assert!(failures.is_empty(), "{template}: {failures:?}");
    snippet
}

fn expand_err(template: &str) -> SnippetError {
    SnippetInstance::new(template, ExpandOptions::default(), &mut Scripted::default()).unwrap_err()
}

fn set(snippet: &mut SnippetInstance, number: usize, text: &str) {
    snippet
        .set_tabstop_text(number, text, &mut Scripted::default())
        .unwrap();
}

fn pos(line: usize, col: usize) -> Position {
    Position::new(line, col)
}

fn numbers(infos: impl IntoIterator<Item = Option<TabStopInfo>>) -> Vec<Option<usize>> {
    infos.into_iter().map(|i| i.map(|i| i.number)).collect()
}

#[test]
fn plain_template_round_trips() {
    let template = "if (x) {\n\treturn 1; // $ and ` alone\n}";
    let snippet = expand("if (x) {\n\treturn 1; // \\$ and \\` alone\n}");
    assert_eq!(snippet.text(), template);
    assert!(!snippet.has_tabs());
}

#[test]
fn template_without_markup_is_one_node() {
    let snippet = expand("just text");
    assert_eq!(snippet.text(), "just text");
    let root = snippet.tree().get(snippet.root()).unwrap();
    // Only the synthesized $0.
    assert_eq!(root.children.len(), 1);
    assert_eq!(snippet.tabstop(0).unwrap().span, Span::new(pos(0, 9), pos(0, 9)));
}

#[test]
fn mirrors_follow_their_tabstop_through_edits() {
    let mut snippet = expand("${2:x} ${1:foo} $1 ${3:y}");
    assert_eq!(snippet.text(), "x foo foo y");

    set(&mut snippet, 2, "long text");
    assert_eq!(snippet.text(), "long text foo foo y");

    set(&mut snippet, 3, "z");
    set(&mut snippet, 1, "a\nb");
    assert_eq!(snippet.text(), "long text a\nb a\nb z");

    set(&mut snippet, 1, "");
    assert_eq!(snippet.text(), "long text   z");
}

#[test]
fn update_twice_changes_nothing() {
    let mut snippet = expand("${1:a ${2:b}} $2 ${2/b/c/} `!p upper 1`");
    let text = snippet.text();
    let dump = snippet.tree().dump(snippet.root());

    snippet.update(&mut Scripted::default()).unwrap();
    snippet.update(&mut Scripted::default()).unwrap();

    assert_eq!(snippet.text(), text);
    assert_eq!(snippet.tree().dump(snippet.root()), dump);
}

#[test]
fn forward_and_backward_references_agree() {
    assert_eq!(expand("$1${1:abc}").text(), "abcabc");
    assert_eq!(expand("${1:abc}$1").text(), "abcabc");
}

#[test]
fn mirror_of_a_tabstop_with_nested_content_settles() {
    assert_eq!(expand("$1 ${1:a${2:b}}").text(), "ab ab");
    let mut snippet = expand("$2 ${1:<${2:in}>}");
    assert_eq!(snippet.text(), "in <in>");
    set(&mut snippet, 2, "X");
    assert_eq!(snippet.text(), "X <X>");
}

#[test]
fn transformation_with_and_without_global_flag() {
    assert_eq!(expand("${1:hello} ${1/l/L/g}").text(), "hello heLLo");
    assert_eq!(expand("${1:hello} ${1/l/L/}").text(), "hello heLlo");
}

#[test]
fn transformation_case_folding() {
    assert_eq!(expand(r"${1:bar} ${1/(\w+)/\u$1/}").text(), "bar Bar");
    assert_eq!(expand(r"${1:bar} ${1/(\w+)/\U$1\E/}").text(), "bar BAR");
}

#[test]
fn transformation_conditional_follows_edits() {
    let mut snippet = expand("${1:x} ${1/(x)?.*/(?1:yes:no)/}");
    assert_eq!(snippet.text(), "x yes");
    set(&mut snippet, 1, "abc");
    assert_eq!(snippet.text(), "abc no");
}

#[test]
fn navigation_visits_numbers_then_zero() {
    let mut snippet = expand("${1:a} ${2:b} ${3:c} ${0:end}");
    let order = numbers([
        snippet.select_next_tab(),
        snippet.select_next_tab(),
        snippet.select_next_tab(),
        snippet.select_next_tab(),
        snippet.select_next_tab(),
        snippet.select_previous_tab(),
    ]);
    assert_eq!(order, vec![Some(1), Some(2), Some(3), Some(0), None, None]);
}

#[test]
fn navigation_from_two_goes_to_three() {
    let mut snippet = expand("${3:c} ${1:a} ${2:b}");
    snippet.select_next_tab();
    snippet.select_next_tab();
    assert_eq!(snippet.current_tabstop().map(|t| t.number), Some(2));
    let three = snippet.select_next_tab().unwrap();
    assert_eq!(three.number, 3);
    assert_eq!(three.text, "c");
    assert_eq!(three.span, Span::new(pos(0, 0), pos(0, 1)));
}

#[test]
fn previous_stops_at_the_first_tabstop() {
    let mut snippet = expand("${1:a} ${2:b}");
    let order = numbers([
        snippet.select_next_tab(),
        snippet.select_next_tab(),
        snippet.select_previous_tab(),
        snippet.select_previous_tab(),
    ]);
    assert_eq!(order, vec![Some(1), Some(2), Some(1), Some(1)]);
}

#[test]
fn synthesized_zero_sits_at_the_end() {
    let mut snippet = expand("(${1:a})");
    assert_eq!(snippet.select_next_tab().unwrap().number, 1);
    let zero = snippet.select_next_tab().unwrap();
    assert_eq!(zero.number, 0);
    assert_eq!(zero.span, Span::new(pos(0, 3), pos(0, 3)));
    assert_eq!(snippet.select_next_tab(), None);
}

#[test]
fn edits_shift_later_siblings() {
    let options = ExpandOptions {
        start: pos(5, 4),
        ..Default::default()
    };
    let mut ev = Scripted::default();
    let (mut snippet, _) = SnippetInstance::new("${1:a} ${2:b}\n${3:c}", options, &mut ev).unwrap();
    assert_eq!(snippet.text(), "a b\nc");

    snippet.set_tabstop_text(1, "abcd", &mut ev).unwrap();
    assert_eq!(snippet.tabstop(1).unwrap().span, Span::new(pos(5, 4), pos(5, 8)));
    assert_eq!(snippet.tabstop(2).unwrap().span, Span::new(pos(5, 9), pos(5, 10)));
    assert_eq!(snippet.tabstop(3).unwrap().span, Span::new(pos(6, 0), pos(6, 1)));

    snippet.set_tabstop_text(1, "a\nbc", &mut ev).unwrap();
    assert_eq!(snippet.text(), "a\nbc b\nc");
    assert_eq!(snippet.tabstop(2).unwrap().span, Span::new(pos(6, 3), pos(6, 4)));
    assert_eq!(snippet.tabstop(3).unwrap().span, Span::new(pos(7, 0), pos(7, 1)));
    assert_eq!(snippet.tabstop(0).unwrap().span.start, pos(7, 1));
    assert_eq!(snippet.abs_span(), Span::new(pos(5, 4), pos(7, 1)));
}

#[test]
fn overwriting_a_tabstop_empties_mirrors_of_its_children() {
    let mut snippet = expand("${1:outer ${2:inner}} [$2]");
    assert_eq!(snippet.text(), "outer inner [inner]");

    set(&mut snippet, 1, "typed");
    assert_eq!(snippet.text(), "typed []");
    assert_eq!(snippet.tabstop(2), None);

    snippet.update(&mut Scripted::default()).unwrap();
    assert_eq!(snippet.text(), "typed []");
}

#[test]
fn unknown_tabstop_cannot_be_set() {
    let mut snippet = expand("${1:a}");
    assert!(matches!(
        snippet.set_tabstop_text(7, "x", &mut Scripted::default()),
        Err(SnippetError::UnknownTabStop(7))
    ));
}

#[test]
fn unresolved_transformation_rejects_the_template() {
    assert!(matches!(
        expand_err("${1/a/b/} ${2:x}"),
        SnippetError::Parse(ParseError::UnresolvedReference { number: 1 })
    ));
}

#[test]
fn unterminated_constructs_reject_before_any_evaluation() {
    let cases = [
        ("`echo hi` ${1:abc", Construct::TabStop),
        ("`echo hi` ${1/a/b", Construct::Transformation),
        ("`echo hi` `!p snip", Construct::Fragment(FragmentKind::Program)),
    ];
    for (template, construct) in cases {
        let mut ev = Scripted::default();
        let err = SnippetInstance::new(template, ExpandOptions::default(), &mut ev).unwrap_err();
        match err {
            SnippetError::Parse(ParseError::Unterminated { construct: c, .. }) => {
                assert_eq!(c, construct, "{template}")
            }
            other => panic!("{template}: unexpected {other:?}"),
        }
        assert_eq!(ev.calls, 0, "{template}");
    }
}

#[test]
fn failing_fragment_leaves_its_node_empty() {
    let (snippet, failures) =
        SnippetInstance::new("ab\n  `date`", ExpandOptions::default(), &mut NullEvaluator)
            .unwrap();
    assert_eq!(snippet.text(), "ab\n  ");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FragmentKind::Shell);
    assert_eq!(failures[0].at, pos(1, 2));
}

#[test]
fn program_failing_on_expansion_keeps_the_snippet() {
    let mut ev = Scripted::default();
    let (mut snippet, failures) =
        SnippetInstance::new("${1:bad} `!p reject 1`", ExpandOptions::default(), &mut ev).unwrap();
    assert_eq!(snippet.text(), "bad ");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FragmentKind::Program);
    assert_eq!(failures[0].at, pos(0, 4));

    snippet.set_tabstop_text(1, "ok", &mut ev).unwrap();
    assert_eq!(snippet.text(), "ok 2");
}

#[test]
fn failing_program_shows_empty_text_and_reports() {
    let mut snippet = expand("${1:ok} `!p reject 1`");
    assert_eq!(snippet.text(), "ok 2");

    let err = snippet
        .set_tabstop_text(1, "bad", &mut Scripted::default())
        .unwrap_err();
    assert!(matches!(&err, SnippetError::Evaluation(f) if f.len() == 1));
    assert_eq!(snippet.text(), "bad ");

    set(&mut snippet, 1, "fine");
    assert_eq!(snippet.text(), "fine 4");
}

#[test]
fn programs_run_once_per_update() {
    for template in ["${1:a} `!p upper 1`", "`!p upper 1` ${1:a}"] {
        let mut ev = Scripted::default();
        let (mut snippet, _) =
            SnippetInstance::new(template, ExpandOptions::default(), &mut ev).unwrap();
        assert_eq!(ev.calls, 1, "{template}");

        snippet.set_tabstop_text(1, "b", &mut ev).unwrap();
        assert_eq!(ev.calls, 2, "{template}");
        assert!(snippet.text().contains('B'), "{template}");
    }
}

#[test]
fn programs_read_tabstops_in_either_direction() {
    let mut snippet = expand("${1:abc} `!p upper 1`");
    assert_eq!(snippet.text(), "abc ABC");
    set(&mut snippet, 1, "xy");
    assert_eq!(snippet.text(), "xy XY");

    assert_eq!(expand("`!p upper 1` ${1:abc}").text(), "ABC abc");
}

#[test]
fn shell_and_script_fragments_run_once() {
    assert_eq!(expand(r"[`a \`b\``]").text(), "[a `b`]");
    assert_eq!(expand("`!v strftime('%Y')`").text(), "STRFTIME('%Y')");
}

#[test]
fn locals_and_preamble_reach_fragments() {
    let mut globals = Globals::new();
    globals.insert(FragmentKind::Shell, vec!["set -e".into(), "cd /".into()]);
    let options = ExpandOptions {
        trigger_match: Some("foo".into()),
        globals,
        ..Default::default()
    };
    let (snippet, _) = SnippetInstance::new(
        "`!p match` `preamble`|`preamble`",
        options,
        &mut Scripted::default(),
    )
    .unwrap();
    assert_eq!(snippet.text(), "foo set -e;cd /|-");
    assert_eq!(snippet.locals().get("match").map(String::as_str), Some("foo"));
}

#[test]
fn snippet_util_output_replaces_return_value() {
    assert_eq!(expand("`!p lines`").text(), "a\n    b");
}

#[test]
fn nested_expansion_has_its_own_tab_order() {
    let mut ev = Scripted::default();
    let (mut snippet, _) =
        SnippetInstance::new("${1:x} ${2:y}", ExpandOptions::default(), &mut ev).unwrap();
    assert_eq!(snippet.select_next_tab().unwrap().number, 1);

    let first = snippet
        .expand_nested("<${1:in} ${0:z}>", &mut ev)
        .unwrap()
        .unwrap();
    assert_eq!(first.number, 1);
    assert_eq!(first.text, "in");
    assert_eq!(first.span, Span::new(pos(0, 1), pos(0, 3)));
    assert_eq!(snippet.text(), "<in > y");

    snippet.set_tabstop_text(1, "IN", &mut ev).unwrap();
    assert_eq!(snippet.text(), "<IN > y");

    let order = numbers([
        snippet.select_next_tab(),
        snippet.select_next_tab(),
        snippet.select_next_tab(),
    ]);
    assert_eq!(order, vec![Some(2), Some(0), None]);
}

#[test]
fn nested_expansion_in_zero_keeps_its_zero() {
    let mut ev = Scripted::default();
    let (mut snippet, _) = SnippetInstance::new("a ${0}", ExpandOptions::default(), &mut ev).unwrap();
    assert_eq!(snippet.current_tabstop().map(|t| t.number), Some(0));

    let first = snippet.expand_nested("${1:p}-${0:q}", &mut ev).unwrap();
    assert_eq!(first.map(|t| t.number), Some(1));
    assert_eq!(snippet.text(), "a p-q");
    assert_eq!(snippet.select_next_tab().map(|t| t.text), Some("q".to_string()));
}

#[test]
fn nested_expansion_needs_focus() {
    let mut ev = Scripted::default();
    let (mut snippet, _) = SnippetInstance::new("${1:a}", ExpandOptions::default(), &mut ev).unwrap();
    snippet.select_next_tab();
    snippet.select_next_tab();
    snippet.select_next_tab();
    assert!(matches!(
        snippet.expand_nested("x", &mut ev),
        Err(SnippetError::NoFocusedTabStop)
    ));
}

#[test]
fn failing_nested_expansion_still_takes_place() {
    let mut snippet = expand("<${1:a}> ${2:b}");
    assert_eq!(snippet.select_next_tab().unwrap().number, 1);

    let err = snippet
        .expand_nested("[`date`]", &mut NullEvaluator)
        .unwrap_err();
    assert!(matches!(&err, SnippetError::Evaluation(f) if f.len() == 1));
    assert_eq!(snippet.text(), "<[]> b");
    assert_eq!(snippet.tabstop(1).unwrap().text, "[]");
    assert_eq!(snippet.current_tabstop().map(|t| t.number), Some(2));

    snippet.update(&mut NullEvaluator).unwrap();
    assert_eq!(snippet.text(), "<[]> b");
}
