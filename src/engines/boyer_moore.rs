//! Per-pattern Boyer-Moore with bad-character and strong good-suffix rules.
//!
//! There is no cross-pattern sharing: the engine simply runs the classic
//! single-pattern search once per signature. It exists as the comparison
//! baseline for the set-oriented engines and must still be exactly correct,
//! overlaps included.
//!
//! # Invariants
//! - `good` and `border` are sized `L + 1`; `good[k]` is the safe shift after
//!   a mismatch with suffix `P[k..L)` already matched.
//! - After a full match the pattern advances by `good[0]`, its period, which
//!   visits every overlapping occurrence.
//! - `nocase` patterns are folded once at build time; the scan folds each
//!   text byte before both the compare and the bad-character lookup.

use std::ops::ControlFlow;
use std::time::Instant;

use crate::errors::BuildError;
use crate::signature::SignatureSet;
use crate::stats::ScanStats;

use super::{fold, Algorithm, Match, MatchSink, Matcher};

struct BmPattern {
    /// Pattern bytes, folded when `nocase`.
    pat: Box<[u8]>,
    nocase: bool,
    /// Last occurrence index of each byte in `pat`, -1 when absent.
    bad: [i32; 256],
    good: Box<[u32]>,
}

impl BmPattern {
    fn build(bytes: &[u8], nocase: bool) -> Self {
        let pat: Box<[u8]> = if nocase {
            bytes.iter().map(|&b| fold(b)).collect()
        } else {
            bytes.into()
        };

        let mut bad = [-1i32; 256];
        for (j, &b) in pat.iter().enumerate() {
            bad[b as usize] = j as i32;
        }

        let good = build_good_suffix(&pat);
        Self {
            pat,
            nocase,
            bad,
            good,
        }
    }
}

/// Strong good-suffix preprocessing.
///
/// `border[i]` is the start of the widest border of `pat[i..]`; the derived
/// shift table covers both the matched-suffix-reoccurs case and the
/// border-only fallback.
fn build_good_suffix(pat: &[u8]) -> Box<[u32]> {
    let l = pat.len();
    let mut border = vec![0usize; l + 1];
    let mut good = vec![0u32; l + 1];

    let mut i = l;
    let mut j = l + 1;
    border[i] = j;
    while i > 0 {
        while j <= l && pat[i - 1] != pat[j - 1] {
            if good[j] == 0 {
                good[j] = (j - i) as u32;
            }
            j = border[j];
        }
        i -= 1;
        j -= 1;
        border[i] = j;
    }

    j = border[0];
    for (k, g) in good.iter_mut().enumerate() {
        if *g == 0 {
            *g = j as u32;
        }
        if k == j {
            j = border[j];
        }
    }
    good.into_boxed_slice()
}

pub struct BoyerMooreEngine {
    pats: Vec<BmPattern>,
}

impl BoyerMooreEngine {
    pub fn build(set: &SignatureSet) -> Result<Self, BuildError> {
        let pats = set
            .iter()
            .map(|sig| BmPattern::build(sig.bytes(), sig.nocase()))
            .collect();
        Ok(Self { pats })
    }

    /// Runs the classic right-to-left scan for one pattern.
    fn scan_one(
        &self,
        pid: u32,
        hay: &[u8],
        stats: &mut ScanStats,
        sink: &mut MatchSink<'_>,
    ) -> ControlFlow<()> {
        let bp = &self.pats[pid as usize];
        let pat = &bp.pat;
        let l = pat.len();
        let n = hay.len();
        if l > n {
            return ControlFlow::Continue(());
        }

        let mut shift = 0usize;
        while shift + l <= n {
            let mut j = l as i64 - 1;
            while j >= 0 {
                stats.comparisons += 1;
                let t = hay[shift + j as usize];
                let t = if bp.nocase { fold(t) } else { t };
                if pat[j as usize] != t {
                    break;
                }
                j -= 1;
            }

            if j < 0 {
                stats.exact_matches += 1;
                stats.matches += 1;
                if sink(Match {
                    pid,
                    start: shift as u64,
                })
                .is_break()
                {
                    return ControlFlow::Break(());
                }
                let step = (bp.good[0] as usize).max(1);
                stats.shifts += 1;
                stats.sum_shift += step as u64;
                shift += step;
            } else {
                let t = hay[shift + j as usize];
                let t = if bp.nocase { fold(t) } else { t };
                // bad[t] == -1 yields j + 1, stepping the mismatch byte past
                // the whole pattern.
                let bad_skip = j - bp.bad[t as usize] as i64;
                let good_skip = bp.good[(j + 1) as usize] as i64;
                let step = bad_skip.max(good_skip).max(1) as usize;
                stats.shifts += 1;
                stats.sum_shift += step as u64;
                shift += step;
            }
        }
        ControlFlow::Continue(())
    }
}

impl Matcher for BoyerMooreEngine {
    fn algorithm(&self) -> Algorithm {
        Algorithm::BoyerMoore
    }

    fn scan(&self, hay: &[u8], sink: &mut MatchSink<'_>) -> ScanStats {
        let mut stats = ScanStats::new(self.algorithm().label(), hay.len());
        let timer = Instant::now();

        for pid in 0..self.pats.len() as u32 {
            if self.scan_one(pid, hay, &mut stats, sink).is_break() {
                break;
            }
        }

        stats.elapsed_sec = timer.elapsed().as_secs_f64();
        stats
    }
}
