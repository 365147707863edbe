//! Multi-pattern signature scanning core for NIDS rulesets.
//!
//! Four classical multi-pattern matchers are implemented behind one contract
//! and instrumented for side-by-side benchmarking over the same inputs:
//! - Aho-Corasick: trie + failure links, linear-time scan.
//! - Wu-Manber: block-hashed shift table with a deterministic prefix hash or
//!   a probabilistic Bloom prefix filter.
//! - Set-Horspool: unified bad-character shifts with per-end-byte buckets.
//! - Boyer-Moore: per-pattern bad-character and good-suffix tables.
//!
//! High-level flow:
//! 1) Parse a Snort-style ruleset into a [`SignatureSet`].
//! 2) Build one engine from the set (tables are immutable afterwards).
//! 3) Scan a capture buffer; matches stream to a callback and a [`ScanStats`]
//!    record comes back with per-scan counters and elapsed time.
//!
//! Engines agree on a strict output contract: for any signature set and
//! input, all of them report the same multiset of `(pattern, offset)` pairs,
//! overlaps included.

pub mod capture;
pub mod engines;
pub mod errors;
pub mod rules;
pub mod signature;
pub mod stats;

pub use engines::aho_corasick::AhoCorasickEngine;
pub use engines::boyer_moore::BoyerMooreEngine;
pub use engines::set_horspool::SetHorspoolEngine;
pub use engines::wu_manber::{PrefixMode, WmOptions, WuManberEngine};
pub use engines::{build_engine, Algorithm, Match, MatchSink, Matcher};
pub use errors::BuildError;
pub use signature::{Signature, SignatureMeta, SignatureSet, SignatureSpec};
pub use stats::ScanStats;
