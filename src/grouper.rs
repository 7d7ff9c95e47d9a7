//! Coalesces adjacent unknown tokens after rule-based post-processing.

use crate::constants::{is_digit, is_khmer_char, is_separator, is_valid_single};
use crate::dictionary::Dictionary;

/// A token is known when the dictionary or one of the structural
/// classifications (digit run, single base, single separator, dotted
/// acronym) accounts for it. Everything else is unknown and eligible for
/// grouping.
pub fn is_known_token(dictionary: &Dictionary, token: &str) -> bool {
    let mut chars = token.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    let single = chars.next().is_none();

    if is_digit(first) {
        return true;
    }
    if dictionary.contains(token) {
        return true;
    }
    if single {
        return is_valid_single(first) || is_separator(first);
    }
    // Rudimentary acronym check
    token.contains('.')
}

/// Merges runs of adjacent unknown tokens into single tokens. A run is
/// flushed early when the script class flips between Khmer and non-Khmer,
/// so Latin debris never fuses with an unknown Khmer cluster.
pub fn group_unknowns(segments: Vec<String>, dictionary: &Dictionary) -> Vec<String> {
    let mut grouped = Vec::with_capacity(segments.len());
    let mut unknown_buffer: Vec<String> = Vec::new();

    for seg in segments {
        if is_known_token(dictionary, &seg) {
            if !unknown_buffer.is_empty() {
                grouped.push(unknown_buffer.concat());
                unknown_buffer.clear();
            }
            grouped.push(seg);
        } else {
            if let Some(tail) = unknown_buffer.last() {
                let tail_khmer = tail.chars().next().map_or(false, is_khmer_char);
                let seg_khmer = seg.chars().next().map_or(false, is_khmer_char);
                if tail_khmer != seg_khmer {
                    grouped.push(unknown_buffer.concat());
                    unknown_buffer.clear();
                }
            }
            unknown_buffer.push(seg);
        }
    }

    if !unknown_buffer.is_empty() {
        grouped.push(unknown_buffer.concat());
    }

    grouped
}
