//! Set-Horspool multi-pattern matcher.
//!
//! A single bad-character shift table is unified across the whole set over
//! the shortest-pattern window `m`: each byte's shift is the minimum distance
//! from its last in-window occurrence in any pattern. The window-end position
//! contributes distance zero, so a byte that ends any pattern's window always
//! forces verification; without that entry the skip rule below would jump
//! over end-of-window alignments and drop matches. When the window's end byte
//! shifts by at most one, only the patterns bucketed under that end byte are
//! verified, which keeps the zero-shift positions from re-scanning the entire
//! set.
//!
//! `nocase` patterns contribute both letter cases to the shift table and the
//! buckets; verification folds per pattern.

use std::time::Instant;

use crate::errors::BuildError;
use crate::signature::SignatureSet;
use crate::stats::ScanStats;

use super::{fold, Algorithm, Match, MatchSink, Matcher};

pub struct SetHorspoolEngine {
    m: usize,
    shift: Box<[u32; 256]>,
    /// Pattern ids whose byte at window position `m - 1` equals the bucket
    /// byte (both cases for `nocase` patterns).
    buckets: Vec<Vec<u32>>,
    pat_len: Vec<u32>,
    nocase: Vec<bool>,
    pat_bytes: Vec<u8>,
    pat_off: Vec<u32>,
}

impl SetHorspoolEngine {
    pub fn build(set: &SignatureSet) -> Result<Self, BuildError> {
        let m = set.min_len();
        let mut shift = Box::new([m as u32; 256]);
        let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); 256];

        let n = set.len();
        let mut pat_len = vec![0u32; n];
        let mut nocase = vec![false; n];
        let mut pat_bytes = Vec::with_capacity(set.iter().map(|s| s.len()).sum());
        let mut pat_off = Vec::with_capacity(n + 1);
        pat_off.push(0u32);

        for sig in set {
            let pid = sig.id() as usize;
            let p = sig.bytes();
            pat_len[pid] = p.len() as u32;
            nocase[pid] = sig.nocase();
            pat_bytes.extend_from_slice(p);
            pat_off.push(pat_bytes.len() as u32);

            for i in 0..m {
                let d = (m - 1 - i) as u32;
                let c = p[i];
                if d < shift[c as usize] {
                    shift[c as usize] = d;
                }
                if sig.nocase() && c.is_ascii_alphabetic() {
                    let alt = other_case(c);
                    if d < shift[alt as usize] {
                        shift[alt as usize] = d;
                    }
                }
            }

            let end = p[m - 1];
            buckets[end as usize].push(sig.id());
            if sig.nocase() && end.is_ascii_alphabetic() {
                let alt = other_case(end);
                if alt != end {
                    buckets[alt as usize].push(sig.id());
                }
            }
        }

        Ok(Self {
            m,
            shift,
            buckets,
            pat_len,
            nocase,
            pat_bytes,
            pat_off,
        })
    }

    pub fn window_len(&self) -> usize {
        self.m
    }

    #[inline]
    fn pattern(&self, pid: usize) -> &[u8] {
        &self.pat_bytes[self.pat_off[pid] as usize..self.pat_off[pid + 1] as usize]
    }
}

#[inline]
fn other_case(c: u8) -> u8 {
    c ^ 0x20
}

impl Matcher for SetHorspoolEngine {
    fn algorithm(&self) -> Algorithm {
        Algorithm::SetHorspool
    }

    fn scan(&self, hay: &[u8], sink: &mut MatchSink<'_>) -> ScanStats {
        let mut stats = ScanStats::new(self.algorithm().label(), hay.len());
        let timer = Instant::now();

        let (m, n) = (self.m, hay.len());
        let mut pos = 0usize;
        'windows: while pos + m <= n {
            stats.windows += 1;
            let end = hay[pos + m - 1];
            let shift = self.shift[end as usize];

            if shift > 1 {
                stats.shifts += 1;
                stats.sum_shift += shift as u64;
                pos += shift as usize;
                continue;
            }

            let mut found = false;
            let mut canceled = false;
            for &pid in &self.buckets[end as usize] {
                let p = pid as usize;
                if pos + self.pat_len[p] as usize > n {
                    continue;
                }
                let pat = self.pattern(p);
                let win = &hay[pos..pos + pat.len()];
                let mut matched = true;
                for (&a, &b) in pat.iter().zip(win) {
                    stats.comparisons += 1;
                    let ok = if self.nocase[p] {
                        fold(a) == fold(b)
                    } else {
                        a == b
                    };
                    if !ok {
                        matched = false;
                        break;
                    }
                }
                if matched {
                    stats.matches += 1;
                    found = true;
                    if sink(Match {
                        pid,
                        start: pos as u64,
                    })
                    .is_break()
                    {
                        canceled = true;
                        break;
                    }
                }
            }
            if canceled {
                break 'windows;
            }

            if found {
                // Step one byte so overlapping occurrences surface.
                pos += 1;
            } else {
                let step = shift.max(1);
                stats.shifts += 1;
                stats.sum_shift += step as u64;
                pos += step as usize;
            }
        }

        stats.elapsed_sec = timer.elapsed().as_secs_f64();
        stats
    }
}
