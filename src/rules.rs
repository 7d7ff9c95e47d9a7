//! Rule-based post-processing of the raw segmentation.
//!
//! Rules come from config as an ordered list of
//! `{name, priority, trigger, checks, action}` objects. Compilation sorts
//! them by descending priority and precompiles regex triggers; application
//! walks the token sequence with merge/keep re-entry semantics.

use std::cmp::Reverse;

use log::{error, trace, warn};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Token predicates the engine needs but does not own. Implemented by the
/// dictionary so the engine never holds a back-reference to the segmenter.
pub trait SegmentPredicates {
    fn is_separator(&self, segment: &str) -> bool;
    fn is_invalid_single(&self, segment: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("unknown trigger type `{0}`")]
    UnknownTrigger(String),
    #[error("unknown complexity check `{0}`")]
    UnknownComplexityCheck(String),
    #[error("invalid trigger pattern: {0}")]
    BadPattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    pub trigger: TriggerSpec,
    #[serde(default)]
    pub checks: Vec<Check>,
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Check {
    pub target: Target,
    #[serde(default)]
    pub exists: Option<bool>,
    #[serde(default)]
    pub check: Option<String>,
    #[serde(default)]
    pub value: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Prev,
    Next,
    Current,
    /// Accepted alias for `current`.
    Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MergeNext,
    MergePrev,
    Keep,
}

enum Trigger {
    ExactMatch(String),
    Regex(Regex),
    InvalidSingle,
}

struct CompiledRule {
    name: String,
    trigger: Trigger,
    checks: Vec<Check>,
    action: Action,
}

pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Compiles a rule list. Malformed rules are logged and dropped; an
    /// engine with zero rules is valid and leaves sequences untouched.
    pub fn compile(specs: Vec<RuleSpec>) -> Self {
        let mut specs = specs;
        // Stable sort keeps config order within equal priorities
        specs.sort_by_key(|spec| Reverse(spec.priority));

        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            match CompiledRule::compile(spec) {
                Ok(rule) => rules.push(rule),
                Err((name, err)) => error!("dropping rule `{name}`: {err}"),
            }
        }
        RuleEngine { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies the rules over `segments`. Each merge re-evaluates the
    /// merged token from the top of the rule list; `keep` and non-firing
    /// positions advance, so the walk terminates.
    pub fn apply<P: SegmentPredicates>(
        &self,
        mut segments: Vec<String>,
        preds: &P,
    ) -> Vec<String> {
        let mut i = 0;
        while i < segments.len() {
            match self.first_firing_action(&segments, i, preds) {
                Some(Action::MergeNext) if i + 1 < segments.len() => {
                    let next = segments.remove(i + 1);
                    segments[i].push_str(&next);
                    // stay on the merged token
                }
                Some(Action::MergePrev) if i > 0 => {
                    let curr = segments.remove(i);
                    i -= 1;
                    segments[i].push_str(&curr);
                    // re-evaluate the merged token
                }
                _ => i += 1, // keep, edge merge with nothing to join, or no rule fired
            }
        }
        segments
    }

    fn first_firing_action<P: SegmentPredicates>(
        &self,
        segments: &[String],
        i: usize,
        preds: &P,
    ) -> Option<Action> {
        let rule = self.rules.iter().find(|rule| rule.fires(segments, i, preds))?;
        trace!("rule `{}` fires at position {i}", rule.name);
        Some(rule.action)
    }
}

impl CompiledRule {
    fn compile(spec: RuleSpec) -> Result<Self, (String, RuleError)> {
        let trigger = match spec.trigger.kind.as_str() {
            "exact_match" => Trigger::ExactMatch(spec.trigger.value),
            "regex" => {
                // Triggers match at the start of the segment
                let anchored = format!("^(?:{})", spec.trigger.value);
                match Regex::new(&anchored) {
                    Ok(re) => Trigger::Regex(re),
                    Err(e) => return Err((spec.name, RuleError::BadPattern(e))),
                }
            }
            "complexity_check" => {
                if spec.trigger.value != "is_invalid_single" {
                    return Err((
                        spec.name,
                        RuleError::UnknownComplexityCheck(spec.trigger.value),
                    ));
                }
                Trigger::InvalidSingle
            }
            other => {
                return Err((spec.name, RuleError::UnknownTrigger(other.to_string())));
            }
        };

        for check in &spec.checks {
            if let Some(kind) = check.check.as_deref() {
                if kind != "is_separator" && kind != "is_isolated" {
                    warn!(
                        "rule `{}`: unknown check `{kind}` will always pass",
                        spec.name
                    );
                }
            }
        }

        Ok(CompiledRule {
            name: spec.name,
            trigger,
            checks: spec.checks,
            action: spec.action,
        })
    }

    fn fires<P: SegmentPredicates>(&self, segments: &[String], i: usize, preds: &P) -> bool {
        let segment = segments[i].as_str();
        let triggered = match &self.trigger {
            Trigger::ExactMatch(value) => segment == value,
            Trigger::Regex(re) => re.is_match(segment),
            Trigger::InvalidSingle => preds.is_invalid_single(segment),
        };
        triggered
            && self
                .checks
                .iter()
                .all(|check| check.passes(segments, i, preds))
    }
}

impl Check {
    fn passes<P: SegmentPredicates>(&self, segments: &[String], i: usize, preds: &P) -> bool {
        let target_idx = match self.target {
            Target::Prev => i.checked_sub(1),
            Target::Next => {
                let j = i + 1;
                (j < segments.len()).then_some(j)
            }
            Target::Current | Target::Context => Some(i),
        };

        let Some(j) = target_idx else {
            if self.exists == Some(true) {
                return false;
            }
            // Any content check against a missing segment fails
            return self.check.is_none() && self.value.is_none();
        };

        let expected = self.value.unwrap_or(true);
        match self.check.as_deref() {
            Some("is_separator") => preds.is_separator(segments[j].as_str()) == expected,
            Some("is_isolated") => {
                let prev_clear = j == 0 || preds.is_separator(segments[j - 1].as_str());
                let next_clear =
                    j + 1 >= segments.len() || preds.is_separator(segments[j + 1].as_str());
                (prev_clear && next_clear) == expected
            }
            // Unknown kinds pass (warned at compile time)
            Some(_) => true,
            None => true,
        }
    }
}
