//! Canonicalizes Khmer orthographic clusters.
//!
//! Rendering-equivalent inputs (split vowels, shuffled modifier order,
//! zero-width joiners) are rewritten to a single canonical form so that
//! dictionary lookups see one spelling per word.

use crate::constants::{
    is_base, is_coeng, is_dependent_vowel, is_register, is_sign, RO, ZERO_WIDTH,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Base,
    Coeng,
    Register,
    DepVowel,
    Sign,
    Other,
}

fn classify(c: char) -> CharClass {
    if is_base(c) {
        CharClass::Base
    } else if is_coeng(c) {
        CharClass::Coeng
    } else if is_register(c) {
        CharClass::Register
    } else if is_dependent_vowel(c) {
        CharClass::DepVowel
    } else if is_sign(c) {
        CharClass::Sign
    } else {
        CharClass::Other
    }
}

/// One attached unit of a cluster: a single modifier, or a coeng plus the
/// base it subscripts.
#[derive(Clone, Copy)]
struct ClusterPart {
    c1: char,
    c2: Option<char>,
    class: CharClass,
}

impl ClusterPart {
    /// Serialization priority within a cluster. Ro subscripts sort after
    /// the other subscripts, before registers.
    fn priority(&self) -> u8 {
        match self.class {
            CharClass::Coeng => match self.c2 {
                Some(sub) if sub == RO => 3,
                Some(_) => 1,
                None => 2, // stray coeng
            },
            CharClass::Register => 4,
            CharClass::DepVowel => 5,
            CharClass::Sign => 6,
            _ => 7,
        }
    }
}

fn flush_cluster(out: &mut String, cluster: &mut Vec<ClusterPart>) {
    if cluster.is_empty() {
        return;
    }
    // Base stays first; only the modifiers get reordered, and only when
    // there are at least two of them. Vec::sort_by_key is stable.
    if cluster.len() > 2 {
        let base = cluster.remove(0);
        cluster.sort_by_key(|part| part.priority());
        cluster.insert(0, base);
    }
    for part in cluster.iter() {
        out.push(part.c1);
        if let Some(c2) = part.c2 {
            out.push(c2);
        }
    }
    cluster.clear();
}

/// Normalizes `text`: strips zero-width characters, fuses the split vowel
/// digraphs, and rewrites every cluster with its modifiers in canonical
/// order. Idempotent, and never longer than the input.
pub fn normalize(text: &str) -> String {
    // Pass 1: strip zero-width marks and fuse composite vowels.
    let mut fused = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if ZERO_WIDTH.contains(&c) {
            continue;
        }
        if c == '\u{17C1}' {
            match chars.peek() {
                Some('\u{17B8}') => {
                    fused.push('\u{17BE}');
                    chars.next();
                    continue;
                }
                Some('\u{17B6}') => {
                    fused.push('\u{17C4}');
                    chars.next();
                    continue;
                }
                _ => {}
            }
        }
        fused.push(c);
    }

    // Pass 2: group clusters and emit each with sorted modifiers.
    let mut out = String::with_capacity(fused.len());
    let mut cluster: Vec<ClusterPart> = Vec::with_capacity(8);

    let mut iter = fused.chars().peekable();
    while let Some(c) = iter.next() {
        match classify(c) {
            CharClass::Base => {
                flush_cluster(&mut out, &mut cluster);
                cluster.push(ClusterPart { c1: c, c2: None, class: CharClass::Base });
            }
            CharClass::Coeng => {
                let sub = match iter.peek() {
                    Some(&next) if is_base(next) => {
                        iter.next();
                        Some(next)
                    }
                    _ => None,
                };
                cluster.push(ClusterPart { c1: c, c2: sub, class: CharClass::Coeng });
            }
            class @ (CharClass::Register | CharClass::DepVowel | CharClass::Sign) => {
                if cluster.is_empty() {
                    out.push(c);
                } else {
                    cluster.push(ClusterPart { c1: c, c2: None, class });
                }
            }
            CharClass::Other => {
                flush_cluster(&mut out, &mut cluster);
                out.push(c);
            }
        }
    }
    flush_cluster(&mut out, &mut cluster);
    out
}
