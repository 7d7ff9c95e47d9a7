use std::collections::HashMap;

use crate::constants::*;
use crate::dictionary::Dictionary;
use crate::grouper::{group_unknowns, is_known_token};
use crate::normalizer::normalize;
use crate::rules::{RuleEngine, RuleSpec};

const SEPARATOR_COST: f64 = 0.1;
const DIGIT_RUN_COST: f64 = 1.0;
const REPAIR_PENALTY: f64 = 50.0;
const INVALID_SINGLE_PENALTY: f64 = 10.0;

/// Immutable after construction; `segment` is a pure function of the input
/// text, so one instance can be shared read-only across threads.
pub struct Segmenter {
    dictionary: Dictionary,
    rules: RuleEngine,
}

impl Segmenter {
    /// Builds a segmenter from newline-separated dictionary words, an
    /// optional `word -> count` frequency map, and a rule list. Malformed
    /// rules are logged and dropped; construction itself never fails.
    pub fn new(
        dict_text: &str,
        frequencies: Option<&HashMap<String, f64>>,
        rules: Vec<RuleSpec>,
    ) -> Self {
        Segmenter {
            dictionary: Dictionary::build(dict_text, frequencies),
            rules: RuleEngine::compile(rules),
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Segments `text` into tokens: normalize, minimum-cost cover, rule
    /// rewriting, unknown grouping. Concatenating the result reproduces
    /// the normalized input.
    pub fn segment(&self, text: &str) -> Vec<String> {
        self.segment_impl(text, false)
    }

    /// Like [`segment`](Self::segment) but stops after the DP backtrack,
    /// skipping rule post-processing and unknown grouping.
    pub fn segment_raw(&self, text: &str) -> Vec<String> {
        self.segment_impl(text, true)
    }

    /// True unless the token is accounted for by the dictionary or by a
    /// structural class (digit run, single base, single separator, dotted
    /// acronym).
    pub fn is_unknown(&self, token: &str) -> bool {
        !is_known_token(&self.dictionary, token)
    }

    fn segment_impl(&self, text: &str, disable_post_processing: bool) -> Vec<String> {
        let text = normalize(text);
        if text.is_empty() {
            return Vec::new();
        }

        let cps: Vec<char> = text.chars().collect();
        let raw = self.best_cover(&cps);

        if disable_post_processing {
            return raw;
        }

        let rewritten = self.rules.apply(raw, &self.dictionary);
        group_unknowns(rewritten, &self.dictionary)
    }

    /// Shortest-path cover of the codepoint sequence. Every reachable
    /// position proposes its applicable transitions; relaxation is strict,
    /// so earlier proposals win ties.
    fn best_cover(&self, cps: &[char]) -> Vec<String> {
        let n = cps.len();

        // DP Array: (cost, parent index)
        let mut dp: Vec<(f64, isize)> = vec![(f64::INFINITY, -1); n + 1];
        dp[0] = (0.0, -1);

        for i in 0..n {
            if dp[i].0 == f64::INFINITY {
                continue;
            }

            let c = cps[i];
            let base_cost = dp[i].0;

            // Stranded diacritic: a position after a coeng, or sitting on
            // a dependent vowel, cannot start anything valid. Absorb one
            // char with a heavy penalty so the cover always completes.
            let after_coeng = i > 0 && cps[i - 1] == COENG;
            if after_coeng || is_dependent_vowel(c) {
                let repair_cost = base_cost + self.dictionary.unknown_cost + REPAIR_PENALTY;
                if repair_cost < dp[i + 1].0 {
                    dp[i + 1] = (repair_cost, i as isize);
                }
                continue;
            }

            // 1. Digit runs (with interior , or . kept inside the number)
            if is_digit(c) {
                let len = number_run_length(cps, i);
                let next = i + len;
                if next <= n && base_cost + DIGIT_RUN_COST < dp[next].0 {
                    dp[next] = (base_cost + DIGIT_RUN_COST, i as isize);
                }
            }

            // 2. Separators
            if is_separator(c) {
                if base_cost + SEPARATOR_COST < dp[i + 1].0 {
                    dp[i + 1] = (base_cost + SEPARATOR_COST, i as isize);
                }
            }

            // 3. Acronym chains (cluster + '.' repeated)
            if is_acronym_start(cps, i) {
                let len = acronym_length(cps, i);
                let next = i + len;
                let cost = base_cost + self.dictionary.default_cost;
                if next <= n && cost < dp[next].0 {
                    dp[next] = (cost, i as isize);
                }
            }

            // 4. Dictionary words via incremental trie walk
            let end_limit = (i + self.dictionary.max_word_length).min(n);
            for j in (i + 1)..=end_limit {
                if let Some(word_cost) = self.dictionary.lookup_codepoints(cps, i, j) {
                    let cost = base_cost + word_cost;
                    if cost < dp[j].0 {
                        dp[j] = (cost, i as isize);
                    }
                }
            }

            // 5. Unknown fallback
            if is_khmer_char(c) {
                let len = cluster_length(cps, i);
                let mut cost = base_cost + self.dictionary.unknown_cost;
                if len == 1 && !is_valid_single(c) {
                    cost += INVALID_SINGLE_PENALTY;
                }
                let next = i + len;
                if next <= n && cost < dp[next].0 {
                    dp[next] = (cost, i as isize);
                }
            } else {
                let cost = base_cost + self.dictionary.unknown_cost;
                if cost < dp[i + 1].0 {
                    dp[i + 1] = (cost, i as isize);
                }
            }
        }

        // Backtrack. The unknown fallback makes every cell reachable, but
        // an unreached cell still has a one-character escape.
        let mut segments: Vec<String> = Vec::new();
        let mut curr = n;
        while curr > 0 {
            let prev = dp[curr].1;
            let start = if prev >= 0 { prev as usize } else { curr - 1 };
            segments.push(cps[start..curr].iter().collect());
            curr = start;
        }
        segments.reverse();
        segments
    }
}

// Codepoint scanners shared by the DP transitions

/// Length of the Khmer orthographic cluster starting at `start`: a base,
/// then coeng+consonant subscripts and dependent vowels/signs. Non-base
/// starts count as a single character.
pub fn cluster_length(cps: &[char], start: usize) -> usize {
    if start >= cps.len() {
        return 0;
    }

    if !is_base(cps[start]) {
        return 1;
    }

    let mut len = 1;
    let mut i = start + 1;

    while i < cps.len() {
        let c = cps[i];

        if is_coeng(c) {
            if i + 1 < cps.len() && is_consonant(cps[i + 1]) {
                len += 2;
                i += 2;
                continue;
            }
            break;
        }

        if is_dependent_vowel(c) || is_sign(c) {
            len += 1;
            i += 1;
            continue;
        }

        break;
    }

    len
}

/// Maximal digit run from `start`. A `,` or `.` stays inside the run only
/// when a digit follows it.
fn number_run_length(cps: &[char], start: usize) -> usize {
    if start >= cps.len() || !is_digit(cps[start]) {
        return 0;
    }

    let mut last_valid_len = 1;
    let mut i = start + 1;

    while i < cps.len() {
        let c = cps[i];

        if is_digit(c) {
            last_valid_len = i - start + 1;
            i += 1;
            continue;
        }

        if (c == ',' || c == '.') && i + 1 < cps.len() && is_digit(cps[i + 1]) {
            last_valid_len = i - start + 2;
            i += 2;
            continue;
        }

        break;
    }

    last_valid_len
}

fn is_acronym_start(cps: &[char], start: usize) -> bool {
    if start >= cps.len() || !is_base(cps[start]) {
        return false;
    }

    let len = cluster_length(cps, start);
    let dot_index = start + len;
    dot_index < cps.len() && cps[dot_index] == '.'
}

/// Total length of a chain of cluster-plus-period groups.
fn acronym_length(cps: &[char], start: usize) -> usize {
    let mut current = start;

    while current < cps.len() && is_base(cps[current]) {
        let len = cluster_length(cps, current);
        let dot_index = current + len;
        if dot_index < cps.len() && cps[dot_index] == '.' {
            current = dot_index + 1;
        } else {
            break;
        }
    }

    current - start
}
