//! The four matching engines and their shared contract.
//!
//! Every engine is built once from a [`SignatureSet`] and owns immutable
//! tables from then on; scans borrow the input buffer read-only and stream
//! matches to a caller-supplied sink. The engines are independent of each
//! other and must agree on the output contract: the same multiset of
//! `(pattern id, start offset)` pairs for any set and input, overlapping
//! occurrences included.
//!
//! # Invariants
//! - Tables are immutable after build; concurrent scans from distinct
//!   threads are safe because all per-scan state lives on the scan's stack.
//! - Scans are infallible. They always return a well-formed [`ScanStats`],
//!   including for empty input and canceled scans.
//! - Cancellation is cooperative: a sink returning [`ControlFlow::Break`]
//!   stops the scan at the engine's next safe point.

use std::ops::ControlFlow;

use crate::errors::BuildError;
use crate::signature::SignatureSet;
use crate::stats::ScanStats;

pub mod aho_corasick;
mod bloom;
pub mod boyer_moore;
pub mod set_horspool;
pub mod wu_manber;

#[cfg(test)]
mod tests;

use aho_corasick::AhoCorasickEngine;
use boyer_moore::BoyerMooreEngine;
use set_horspool::SetHorspoolEngine;
use wu_manber::{PrefixMode, WmOptions, WuManberEngine};

/// Engine selector, mirroring the CLI's single-letter choices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    AhoCorasick,
    WuManberDet,
    WuManberProb,
    SetHorspool,
    BoyerMoore,
}

impl Algorithm {
    /// Human-readable engine label used in stats output.
    pub fn label(self) -> &'static str {
        match self {
            Self::AhoCorasick => "Aho-Corasick",
            Self::WuManberDet => "Wu-Manber (Deterministic)",
            Self::WuManberProb => "Wu-Manber (Probabilistic)",
            Self::SetHorspool => "Set-Horspool",
            Self::BoyerMoore => "Boyer-Moore",
        }
    }

    /// Parses the CLI selector: `a`/`d`/`p`/`h`/`b`.
    pub fn from_selector(sel: &str) -> Option<Self> {
        match sel {
            "a" => Some(Self::AhoCorasick),
            "d" => Some(Self::WuManberDet),
            "p" => Some(Self::WuManberProb),
            "h" => Some(Self::SetHorspool),
            "b" => Some(Self::BoyerMoore),
            _ => None,
        }
    }
}

/// One reported occurrence.
///
/// `start + pattern length <= buffer length` is guaranteed by every engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Match {
    pub pid: u32,
    pub start: u64,
}

/// Match sink. Return [`ControlFlow::Break`] to cancel the scan.
pub type MatchSink<'a> = dyn FnMut(Match) -> ControlFlow<()> + 'a;

/// Common scan contract implemented by all four engines.
///
/// Engines are `Send + Sync`: tables are immutable after build, so distinct
/// threads may scan the same engine concurrently, each with its own sink and
/// stats.
pub trait Matcher: Send + Sync {
    /// The engine's selector value.
    fn algorithm(&self) -> Algorithm;

    /// Scans `hay`, streaming matches to `sink`.
    ///
    /// The stats record is returned even when zero matches occurred or the
    /// sink canceled the scan.
    fn scan(&self, hay: &[u8], sink: &mut MatchSink<'_>) -> ScanStats;

    /// Convenience wrapper collecting the match stream into a `Vec`.
    fn scan_collect(&self, hay: &[u8]) -> (Vec<Match>, ScanStats) {
        let mut out = Vec::new();
        let stats = self.scan(hay, &mut |m| {
            out.push(m);
            ControlFlow::Continue(())
        });
        (out, stats)
    }
}

/// Builds the engine selected by `alg` over `set`.
pub fn build_engine(alg: Algorithm, set: &SignatureSet) -> Result<Box<dyn Matcher>, BuildError> {
    Ok(match alg {
        Algorithm::AhoCorasick => Box::new(AhoCorasickEngine::build(set)?),
        Algorithm::WuManberDet => Box::new(WuManberEngine::build(set, WmOptions::default())?),
        Algorithm::WuManberProb => Box::new(WuManberEngine::build(
            set,
            WmOptions {
                prefix_filter: PrefixMode::Bloom,
                ..WmOptions::default()
            },
        )?),
        Algorithm::SetHorspool => Box::new(SetHorspoolEngine::build(set)?),
        Algorithm::BoyerMoore => Box::new(BoyerMooreEngine::build(set)?),
    })
}

/// ASCII-only case fold used by every engine.
///
/// Folding never applies outside the ASCII letter ranges, so arbitrary byte
/// signatures survive untouched.
#[inline(always)]
pub(crate) fn fold(b: u8) -> u8 {
    b.to_ascii_lowercase()
}

/// 32-bit FNV-1a over `bytes` starting from `seed`, with wrapping multiply.
///
/// Seeded with the offset basis for prefix hashing and with the FNV prime as
/// the second Bloom base hash.
#[inline]
pub(crate) fn fnv1a(seed: u32, bytes: &[u8]) -> u32 {
    let mut h = seed;
    for &b in bytes {
        h = (h ^ b as u32).wrapping_mul(0x0100_0193);
    }
    h
}

/// FNV-1a offset basis.
pub(crate) const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
/// FNV-1a prime, doubling as the second Bloom hash seed.
pub(crate) const FNV_PRIME: u32 = 0x0100_0193;
