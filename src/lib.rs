//! Dictionary-driven Khmer word segmentation.
//!
//! The pipeline is strictly one-way: raw text is normalized into canonical
//! orthographic clusters, covered by a minimum-cost dynamic program over
//! the dictionary, rewritten by a declarative rule set, and finally has
//! adjacent unknown tokens grouped.
//!
//! ```
//! use khmer_segmenter::Segmenter;
//!
//! let segmenter = Segmenter::new("សួស្តី\nបង\n", None, Vec::new());
//! let tokens = segmenter.segment("សួស្តីបង");
//! assert_eq!(tokens, vec!["សួស្តី", "បង"]);
//! assert!(!segmenter.is_unknown(&tokens[0]));
//! ```

pub mod constants;
pub mod dictionary;
pub mod grouper;
pub mod normalizer;
pub mod rules;
pub mod segmenter;

pub use normalizer::normalize;
pub use rules::{Action, RuleEngine, RuleSpec};
pub use segmenter::Segmenter;
