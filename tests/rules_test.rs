//! Rule configuration parsing and engine behavior.

use khmer_segmenter::dictionary::Dictionary;
use khmer_segmenter::rules::{Action, RuleEngine, RuleSpec};
use khmer_segmenter::Segmenter;

fn rules(json: &str) -> Vec<RuleSpec> {
    serde_json::from_str(json).unwrap()
}

/// The dictionary doubles as the engine's predicate provider.
fn preds() -> Dictionary {
    Dictionary::build("បង\n", None)
}

fn seq(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn rule_spec_defaults() {
    let specs = rules(
        r#"[{"name":"r","trigger":{"type":"exact_match","value":"x"},"action":"keep"}]"#,
    );
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].priority, 0);
    assert!(specs[0].checks.is_empty());
    assert_eq!(specs[0].action, Action::Keep);
}

#[test]
fn full_rule_spec_parses() {
    let specs = rules(
        r#"[{
            "name": "snap",
            "priority": 10,
            "trigger": {"type": "complexity_check", "value": "is_invalid_single"},
            "checks": [
                {"target": "prev", "check": "is_separator", "value": false},
                {"target": "next", "exists": true},
                {"target": "context", "check": "is_isolated", "value": false}
            ],
            "action": "merge_prev"
        }]"#,
    );
    assert_eq!(specs[0].priority, 10);
    assert_eq!(specs[0].checks.len(), 3);
}

#[test]
fn exact_match_merge_next() {
    let engine = RuleEngine::compile(rules(
        r#"[{"name":"join-x","trigger":{"type":"exact_match","value":"x"},"action":"merge_next"}]"#,
    ));
    assert_eq!(engine.apply(seq(&["x", "y", "z"]), &preds()), seq(&["xy", "z"]));
}

#[test]
fn merge_next_at_end_advances() {
    let engine = RuleEngine::compile(rules(
        r#"[{"name":"join-x","trigger":{"type":"exact_match","value":"x"},"action":"merge_next"}]"#,
    ));
    assert_eq!(engine.apply(seq(&["a", "x"]), &preds()), seq(&["a", "x"]));
}

#[test]
fn regex_trigger_is_anchored() {
    let engine = RuleEngine::compile(rules(
        r#"[{"name":"ab","trigger":{"type":"regex","value":"ab+"},"action":"merge_next"}]"#,
    ));
    // "abb..." matches at the start, "cab" must not
    assert_eq!(engine.apply(seq(&["abb", "x"]), &preds()), seq(&["abbx"]));
    assert_eq!(engine.apply(seq(&["cab", "x"]), &preds()), seq(&["cab", "x"]));
}

#[test]
fn invalid_single_merges_into_previous_word() {
    // Stranded sign after a word, not preceded by a separator
    let engine = RuleEngine::compile(rules(
        r#"[{"name":"snap-sign",
            "trigger":{"type":"complexity_check","value":"is_invalid_single"},
            "checks":[{"target":"prev","check":"is_separator","value":false}],
            "action":"merge_prev"}]"#,
    ));
    assert_eq!(
        engine.apply(seq(&["បង", "\u{17C6}"]), &preds()),
        seq(&["បង\u{17C6}"])
    );
    // After a separator the rule must not fire
    assert_eq!(
        engine.apply(seq(&[" ", "\u{17C6}"]), &preds()),
        seq(&[" ", "\u{17C6}"])
    );
}

#[test]
fn separator_check_ignores_multichar_tokens() {
    // A token that merely starts with a separator is not a separator
    let engine = RuleEngine::compile(rules(
        r#"[{"name":"snap-sign",
            "trigger":{"type":"complexity_check","value":"is_invalid_single"},
            "checks":[{"target":"prev","check":"is_separator","value":false}],
            "action":"merge_prev"}]"#,
    ));
    assert_eq!(
        engine.apply(seq(&[" ក", "\u{17C6}"]), &preds()),
        seq(&[" ក\u{17C6}"])
    );
}

#[test]
fn exists_check_fails_on_missing_target() {
    let engine = RuleEngine::compile(rules(
        r#"[{"name":"needs-next",
            "trigger":{"type":"exact_match","value":"x"},
            "checks":[{"target":"next","exists":true}],
            "action":"merge_prev"}]"#,
    ));
    // "x" is last: check fails, nothing merges
    assert_eq!(engine.apply(seq(&["a", "x"]), &preds()), seq(&["a", "x"]));
    assert_eq!(engine.apply(seq(&["a", "x", "b"]), &preds()), seq(&["ax", "b"]));
}

#[test]
fn content_check_on_missing_target_fails() {
    let engine = RuleEngine::compile(rules(
        r#"[{"name":"prev-sep",
            "trigger":{"type":"exact_match","value":"x"},
            "checks":[{"target":"prev","check":"is_separator","value":true}],
            "action":"keep"}]"#,
    ));
    // At index 0 there is no prev: the check fails, rule does not fire
    assert_eq!(engine.apply(seq(&["x"]), &preds()), seq(&["x"]));
}

#[test]
fn is_isolated_check() {
    let engine = RuleEngine::compile(rules(
        r#"[{"name":"isolated-keep",
            "trigger":{"type":"complexity_check","value":"is_invalid_single"},
            "checks":[{"target":"current","check":"is_isolated","value":true}],
            "action":"keep"}]"#,
    ));
    // Surrounded by separators: isolated, kept as-is
    assert_eq!(
        engine.apply(seq(&[" ", "\u{17C6}", " "]), &preds()),
        seq(&[" ", "\u{17C6}", " "])
    );
}

#[test]
fn priority_orders_rules() {
    let keep_first = RuleEngine::compile(rules(
        r#"[
            {"name":"merge","priority":1,"trigger":{"type":"exact_match","value":"x"},"action":"merge_next"},
            {"name":"keep","priority":5,"trigger":{"type":"exact_match","value":"x"},"action":"keep"}
        ]"#,
    ));
    assert_eq!(keep_first.apply(seq(&["x", "y"]), &preds()), seq(&["x", "y"]));
}

#[test]
fn malformed_rules_are_dropped() {
    let engine = RuleEngine::compile(rules(
        r#"[
            {"name":"bad-re","trigger":{"type":"regex","value":"("},"action":"keep"},
            {"name":"bad-type","trigger":{"type":"lookup","value":"x"},"action":"keep"},
            {"name":"bad-complexity","trigger":{"type":"complexity_check","value":"is_odd"},"action":"keep"}
        ]"#,
    ));
    assert!(engine.is_empty());
}

#[test]
fn merge_prev_cascades() {
    // Two stranded signs in a row collapse into the word one by one
    let engine = RuleEngine::compile(rules(
        r#"[{"name":"snap",
            "trigger":{"type":"complexity_check","value":"is_invalid_single"},
            "action":"merge_prev"}]"#,
    ));
    assert_eq!(
        engine.apply(seq(&["បង", "\u{17C6}", "\u{17C7}"]), &preds()),
        seq(&["បង\u{17C6}\u{17C7}"])
    );
}

#[test]
fn malformed_rules_leave_a_working_segmenter() {
    let specs = rules(
        r#"[
            {"name":"bad-regex","trigger":{"type":"regex","value":"("},"action":"keep"},
            {"name":"bad-trigger","trigger":{"type":"frobnicate","value":"x"},"action":"keep"}
        ]"#,
    );
    let s = Segmenter::new("បង\n", None, specs);
    assert_eq!(s.segment("បង"), vec!["បង"]);
}

#[test]
fn unknown_check_kind_passes() {
    // The unknown check is logged at compile time and evaluates to pass,
    // so the merge still fires.
    let specs = rules(
        r#"[{
            "name": "merge-x",
            "trigger": {"type": "exact_match", "value": "x"},
            "checks": [{"target": "current", "check": "is_haunted", "value": true}],
            "action": "merge_next"
        }]"#,
    );
    let s = Segmenter::new("បង\n", None, specs);
    // The rule fires and pulls the following word in, proving the unknown
    // check did not veto it.
    let tokens = s.segment("xបង");
    assert_eq!(tokens, vec!["xបង"]);
}

#[test]
fn keep_rule_shields_token_from_later_rules() {
    let specs = rules(
        r#"[
            {"name":"protect","priority":5,
             "trigger":{"type":"exact_match","value":"ំ"},
             "checks":[{"target":"current","check":"is_isolated","value":true}],
             "action":"keep"},
            {"name":"snap","priority":1,
             "trigger":{"type":"complexity_check","value":"is_invalid_single"},
             "action":"merge_prev"}
        ]"#,
    );
    let s = Segmenter::new("បង\n", None, specs);
    // Isolated sign between separators: the high-priority keep wins and
    // the merge never runs.
    let tokens = s.segment(" \u{17C6} ");
    assert_eq!(tokens, vec![" ", "\u{17C6}", " "]);
}

#[test]
fn regex_trigger_merges_matching_tokens() {
    // A lone capital letter pulls its neighbor in; the merged pair no
    // longer matches, so the rule stops there.
    let specs = rules(
        r#"[{
            "name": "join-caps-pair",
            "trigger": {"type": "regex", "value": "[A-Z]$"},
            "checks": [{"target": "next", "exists": true}],
            "action": "merge_next"
        }]"#,
    );
    let s = Segmenter::new("បង\n", None, specs);
    let tokens = s.segment("ABបង");
    assert_eq!(tokens, vec!["AB", "បង"]);
}
