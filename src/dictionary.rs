use std::collections::{HashMap, HashSet};

use fxhash::FxHashMap;
use log::{debug, info};

use crate::constants::{self, is_valid_single, COENG, REPETITION_SIGN, RO, ZERO_WIDTH};
use crate::rules::SegmentPredicates;

const MIN_FREQ_FLOOR: f64 = 5.0;
const NO_FREQ_DEFAULT_COST: f64 = 10.0;
const NO_FREQ_UNKNOWN_COST: f64 = 20.0;

#[derive(Default)]
pub struct TrieNode {
    children: FxHashMap<char, Box<TrieNode>>,
    is_word: bool,
    cost: f64,
}

impl TrieNode {
    #[inline]
    fn get_child(&self, c: char) -> Option<&TrieNode> {
        self.children.get(&c).map(|b| b.as_ref())
    }

    fn get_or_create_child(&mut self, c: char) -> &mut TrieNode {
        self.children.entry(c).or_insert_with(|| Box::new(TrieNode::default()))
    }
}

pub struct Dictionary {
    pub words: FxHashMap<String, usize>, // Maps word -> index
    pub costs: Vec<f64>,                 // Maps index -> cost
    pub trie: TrieNode,                  // Trie for fast codepoint-based lookups
    pub max_word_length: usize,          // Max word length in codepoints
    pub default_cost: f64,
    pub unknown_cost: f64,
}

impl Dictionary {
    /// Builds the dictionary from newline-separated words and an optional
    /// `word -> count` frequency map.
    pub fn build(dict_text: &str, frequencies: Option<&HashMap<String, f64>>) -> Self {
        // 1. Load words (with variants and the entry filters)
        let temp_words = Dictionary::load_words(dict_text);

        // 2. Derive costs from frequencies
        let (word_costs_map, default_cost, unknown_cost) =
            Dictionary::calculate_costs(frequencies, &temp_words);

        // 3. Build HashMap and Trie
        let mut words_map = FxHashMap::default();
        let mut costs_vec = Vec::with_capacity(temp_words.len());
        let mut trie = TrieNode::default();
        let mut max_word_length = 0;

        for (i, word) in temp_words.into_iter().enumerate() {
            let cost = *word_costs_map.get(&word).unwrap_or(&default_cost);
            let word_char_len = word.chars().count();
            if word_char_len > max_word_length {
                max_word_length = word_char_len;
            }

            let mut node = &mut trie;
            for c in word.chars() {
                node = node.get_or_create_child(c);
            }
            node.is_word = true;
            node.cost = cost;

            words_map.insert(word, i);
            costs_vec.push(cost);
        }

        info!(
            "dictionary ready: {} entries, max word length {}",
            words_map.len(),
            max_word_length
        );

        Dictionary {
            words: words_map,
            costs: costs_vec,
            trie,
            max_word_length,
            default_cost,
            unknown_cost,
        }
    }

    fn load_words(dict_text: &str) -> HashSet<String> {
        let mut words_set: HashSet<String> = HashSet::new();

        for line in dict_text.lines() {
            let word: String = line.trim().chars().filter(|c| !ZERO_WIDTH.contains(c)).collect();
            if word.is_empty() {
                continue;
            }

            // Filter single chars
            if word.chars().count() == 1 {
                let c = word.chars().next().unwrap();
                if !is_valid_single(c) {
                    continue;
                }
            }

            // Generate variants before moving the word in
            let variants = Dictionary::generate_variants(&word);
            words_set.insert(word);
            words_set.extend(variants);
        }

        // Filter logic over the final set
        let mut words_to_remove = HashSet::new();
        for word in words_set.iter() {
            if word.contains('ឬ') && word.chars().count() > 1 {
                if let Some(suffix) = word.strip_prefix('ឬ') {
                    if words_set.contains(suffix) {
                        words_to_remove.insert(word.clone());
                    }
                } else if let Some(prefix) = word.strip_suffix('ឬ') {
                    if words_set.contains(prefix) {
                        words_to_remove.insert(word.clone());
                    }
                } else {
                    let parts: Vec<&str> = word.split('ឬ').collect();
                    if parts.iter().all(|p| p.is_empty() || words_set.contains(*p)) {
                        words_to_remove.insert(word.clone());
                    }
                }
            }
            if word.contains(REPETITION_SIGN) {
                words_to_remove.insert(word.clone());
            }
            if word.starts_with(COENG) {
                words_to_remove.insert(word.clone());
            }
        }

        if !words_to_remove.is_empty() {
            debug!("dropping {} spurious dictionary entries", words_to_remove.len());
        }
        for w in &words_to_remove {
            words_set.remove(w);
        }

        words_set
    }

    fn calculate_costs(
        frequencies: Option<&HashMap<String, f64>>,
        words_set: &HashSet<String>,
    ) -> (HashMap<String, f64>, f64, f64) {
        let mut word_costs = HashMap::new();

        let data = match frequencies {
            Some(map) if !map.is_empty() => map,
            _ => {
                info!("no frequency data supplied, using default costs");
                return (word_costs, NO_FREQ_DEFAULT_COST, NO_FREQ_UNKNOWN_COST);
            }
        };

        // Effective counts with the floor applied; variants inherit the
        // count of their source word and contribute to the total.
        let mut total_tokens = 0.0;
        let mut effective_counts: HashMap<String, f64> = HashMap::new();

        for (word, &count) in data {
            let eff = count.max(MIN_FREQ_FLOOR);
            effective_counts.insert(word.clone(), eff);
            total_tokens += eff;

            for v in Dictionary::generate_variants(word) {
                if !effective_counts.contains_key(&v) {
                    effective_counts.insert(v, eff);
                    total_tokens += eff;
                }
            }
        }

        let mut default_cost = NO_FREQ_DEFAULT_COST;
        let mut unknown_cost = NO_FREQ_UNKNOWN_COST;

        if total_tokens > 0.0 {
            let min_prob = MIN_FREQ_FLOOR / total_tokens;
            default_cost = -min_prob.log10();
            unknown_cost = default_cost + 5.0;

            for (word, count) in effective_counts {
                // Only the intersection with the dictionary matters
                if words_set.contains(&word) {
                    let prob = count / total_tokens;
                    if prob > 0.0 {
                        word_costs.insert(word, -prob.log10());
                    }
                }
            }
        }

        (word_costs, default_cost, unknown_cost)
    }

    /// Orthographic equivalents of `word`, excluding `word` itself:
    /// coeng-ta/coeng-da swaps and coeng-Ro subscript reordering.
    pub fn generate_variants(word: &str) -> HashSet<String> {
        let mut variants = HashSet::new();
        let coeng_ta = "\u{17D2}\u{178F}";
        let coeng_da = "\u{17D2}\u{178A}";

        // 1. Ta/Da Swapping
        if word.contains(coeng_ta) {
            variants.insert(word.replace(coeng_ta, coeng_da));
        }
        if word.contains(coeng_da) {
            variants.insert(word.replace(coeng_da, coeng_ta));
        }

        // 2. Coeng Ro Ordering
        // (Coeng Ro)(Other Coeng) <-> (Other Coeng)(Coeng Ro), swapped once
        // globally, over the original plus its Ta/Da variants.
        let mut base_set = variants.clone();
        base_set.insert(word.to_string());

        for w in base_set {
            let chars: Vec<char> = w.chars().collect();
            if chars.len() < 4 {
                continue;
            }

            // Pass 1: Ro + Other -> Other + Ro
            if let Some(swapped) = swap_ro_subscripts(&chars, true) {
                variants.insert(swapped);
            }
            // Pass 2: Other + Ro -> Ro + Other
            if let Some(swapped) = swap_ro_subscripts(&chars, false) {
                variants.insert(swapped);
            }
        }

        variants.remove(word);
        variants
    }

    pub fn get_word_cost(&self, word: &str) -> f64 {
        if let Some(&idx) = self.words.get(word) {
            if let Some(&cost) = self.costs.get(idx) {
                return cost;
            }
            return self.default_cost;
        }
        self.unknown_cost
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    #[inline]
    pub fn lookup_codepoints(&self, cps: &[char], start: usize, end: usize) -> Option<f64> {
        let mut node = &self.trie;
        for &c in &cps[start..end] {
            match node.get_child(c) {
                Some(child) => node = child,
                None => return None,
            }
        }
        if node.is_word {
            Some(node.cost)
        } else {
            None
        }
    }
}

/// Swaps adjacent subscript pairs where one side is coeng-Ro. `ro_first`
/// selects the [Coeng, Ro, Coeng, NotRo] pattern; otherwise the mirror.
/// All non-overlapping matches are swapped in one pass.
fn swap_ro_subscripts(chars: &[char], ro_first: bool) -> Option<String> {
    let mut out = chars.to_vec();
    let mut modified = false;
    let mut i = 0;
    while i + 3 < out.len() {
        let c0 = out[i];
        let c1 = out[i + 1];
        let c2 = out[i + 2];
        let c3 = out[i + 3];

        let matches_pattern = if ro_first {
            c0 == COENG && c1 == RO && c2 == COENG && c3 != RO
        } else {
            c0 == COENG && c1 != RO && c2 == COENG && c3 == RO
        };

        if matches_pattern {
            out.swap(i, i + 2);
            out.swap(i + 1, i + 3);
            modified = true;
            i += 4;
        } else {
            i += 1;
        }
    }

    if modified {
        Some(out.into_iter().collect())
    } else {
        None
    }
}

impl SegmentPredicates for Dictionary {
    fn is_separator(&self, segment: &str) -> bool {
        let mut chars = segment.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => constants::is_separator(c),
            _ => false,
        }
    }

    fn is_invalid_single(&self, segment: &str) -> bool {
        let mut chars = segment.chars();
        let first = match chars.next() {
            Some(c) => c,
            None => return false,
        };
        if chars.next().is_some() {
            return false;
        }
        constants::is_khmer_char(first)
            && !is_valid_single(first)
            && !constants::is_digit(first)
            && !constants::is_separator(first)
            && !self.contains(segment)
    }
}
