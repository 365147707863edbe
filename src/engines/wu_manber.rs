//! Wu-Manber multi-pattern matcher with deterministic and probabilistic
//! prefix filtering.
//!
//! Purpose: skip ahead through the input using a shift table keyed on B-byte
//! blocks, verifying candidates only where the shift collapses to zero.
//!
//! # Algorithm
//! 1. Pick the block size `B` from the set's length profile, window
//!    `m = max(B, min pattern length)`.
//! 2. For every pattern, each B-block inside the window lowers the shift for
//!    that block's key; the block ending the window gets shift zero and the
//!    pattern joins that key's hash chain.
//! 3. Scan right-to-left window ends: nonzero shift advances immediately;
//!    zero shift walks the chain, filtering by a FNV-1a prefix hash (or a
//!    Bloom probe first, in probabilistic mode) before the full compare.
//!
//! # Invariants
//! - Table keys, prefix hashes, and Bloom content are computed over
//!   case-folded bytes for every pattern and every text window. Folding both
//!   sides uniformly keeps a single instance sound for sets that mix case
//!   sensitivities, Bloom filtering included; verification restores
//!   exactness by comparing verbatim for case-sensitive patterns.
//! - Verification always uses the pattern's true length, never the window
//!   length, and bounds-checks the tail against the buffer.
//! - Every pattern is at least `B` bytes long (enforced at build), so block
//!   keys never need zero padding and the prefix hash always covers `B`
//!   bytes.
//!
//! # Performance
//! - Tables are direct-indexed for `B <= 3`; `B = 4` masks keys to 24 bits.
//!   Key collisions only shrink shifts and lengthen chains, never drop
//!   matches.

use std::time::Instant;

use crate::errors::BuildError;
use crate::signature::SignatureSet;
use crate::stats::ScanStats;

use super::bloom::BloomFilter;
use super::{fnv1a, fold, Algorithm, Match, MatchSink, Matcher, FNV_OFFSET_BASIS};

/// Target false-positive rate for the Bloom prefix filter.
const BLOOM_FP_RATE: f64 = 0.01;

/// Chain-head sentinel for empty hash buckets.
const NO_PATTERN: i32 = -1;

/// Table index width cap: `B = 4` would otherwise need a 2^32-entry table.
const MAX_TABLE_BITS: u32 = 24;

/// Prefix verification mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrefixMode {
    /// Deterministic FNV-1a prefix hash only.
    #[default]
    Hash,
    /// Bloom filter probe before the prefix hash.
    Bloom,
}

/// Build-time options for the Wu-Manber engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct WmOptions {
    pub prefix_filter: PrefixMode,
    /// Permits the 24-bit tables that `B = 4` requires. Without this the
    /// block-size heuristic falls back to `B = 3`; the fallback is this
    /// explicit option, never a silent clamp at scan time.
    pub wide_blocks: bool,
}

/// Picks the block size from the set's length profile.
///
/// Two-byte blocks keep the tables at 2^16 entries when short patterns or
/// sheer pattern count would overload wider tables; four-byte blocks pay off
/// only for long patterns.
fn choose_block_size(set: &SignatureSet, opts: &WmOptions) -> usize {
    if set.min_len() < 4 || set.len() > 5000 {
        2
    } else if set.avg_len() > 30.0 && opts.wide_blocks {
        4
    } else {
        3
    }
}

#[derive(Debug)]
pub struct WuManberEngine {
    b: usize,
    m: usize,
    mask: u32,
    shift: Vec<u32>,
    hash: Vec<i32>,
    next: Vec<i32>,
    prefix_hash: Vec<u32>,
    pat_len: Vec<u32>,
    nocase: Vec<bool>,
    /// Pattern bytes packed back-to-back; `pat_off` is the prefix-sum table.
    pat_bytes: Vec<u8>,
    pat_off: Vec<u32>,
    bloom: Option<BloomFilter>,
}

impl WuManberEngine {
    /// Builds shift/hash/prefix tables (and the Bloom filter in
    /// probabilistic mode) over `set`.
    ///
    /// # Errors
    /// - [`BuildError::PatternShorterThanBlock`] when the shortest pattern
    ///   does not span a full block.
    /// - [`BuildError::Allocation`] when the index tables cannot be
    ///   allocated.
    pub fn build(set: &SignatureSet, opts: WmOptions) -> Result<Self, BuildError> {
        let b = choose_block_size(set, &opts);
        for sig in set {
            if sig.len() < b {
                return Err(BuildError::PatternShorterThanBlock {
                    id: sig.id(),
                    len: sig.len(),
                    block: b,
                });
            }
        }

        let m = b.max(set.min_len());
        let table_bits = ((b * 8) as u32).min(MAX_TABLE_BITS);
        let table_len = 1usize << table_bits;
        let mask = (table_len - 1) as u32;
        let default_shift = (m - b + 1) as u32;

        let mut shift: Vec<u32> = Vec::new();
        shift
            .try_reserve_exact(table_len)
            .map_err(|_| BuildError::Allocation {
                bytes: table_len * std::mem::size_of::<u32>(),
            })?;
        shift.resize(table_len, default_shift);

        let mut hash: Vec<i32> = Vec::new();
        hash.try_reserve_exact(table_len)
            .map_err(|_| BuildError::Allocation {
                bytes: table_len * std::mem::size_of::<i32>(),
            })?;
        hash.resize(table_len, NO_PATTERN);

        let n = set.len();
        let mut next = vec![NO_PATTERN; n];
        let mut prefix_hash = vec![0u32; n];
        let mut pat_len = vec![0u32; n];
        let mut nocase = vec![false; n];
        let mut pat_bytes = Vec::with_capacity(set.iter().map(|s| s.len()).sum());
        let mut pat_off = Vec::with_capacity(n + 1);
        pat_off.push(0u32);

        let mut bloom = match opts.prefix_filter {
            PrefixMode::Hash => None,
            PrefixMode::Bloom => Some(BloomFilter::with_expected_items(n, BLOOM_FP_RATE)),
        };

        let mut folded_block = vec![0u8; b];
        for sig in set {
            let pid = sig.id() as usize;
            let p = sig.bytes();

            pat_len[pid] = p.len() as u32;
            nocase[pid] = sig.nocase();
            pat_bytes.extend_from_slice(p);
            pat_off.push(pat_bytes.len() as u32);

            fold_into(&p[..b], &mut folded_block);
            prefix_hash[pid] = fnv1a(FNV_OFFSET_BASIS, &folded_block);
            if let Some(bf) = bloom.as_mut() {
                bf.insert(&folded_block);
            }

            for j in 0..=(m - b) {
                let idx = (block_key(&p[j..j + b]) & mask) as usize;
                let new_shift = (m - j - b) as u32;
                if new_shift < shift[idx] {
                    shift[idx] = new_shift;
                }
            }

            let sfx = (block_key(&p[m - b..m]) & mask) as usize;
            next[pid] = hash[sfx];
            hash[sfx] = pid as i32;
        }

        Ok(Self {
            b,
            m,
            mask,
            shift,
            hash,
            next,
            prefix_hash,
            pat_len,
            nocase,
            pat_bytes,
            pat_off,
            bloom,
        })
    }

    pub fn block_size(&self) -> usize {
        self.b
    }

    pub fn window_len(&self) -> usize {
        self.m
    }

    #[inline]
    fn pattern(&self, pid: usize) -> &[u8] {
        &self.pat_bytes[self.pat_off[pid] as usize..self.pat_off[pid + 1] as usize]
    }

    #[inline]
    fn verify(&self, hay: &[u8], start: usize, pid: usize) -> bool {
        let pat = self.pattern(pid);
        let win = &hay[start..start + pat.len()];
        if self.nocase[pid] {
            pat.iter().zip(win).all(|(&a, &b)| fold(a) == fold(b))
        } else {
            pat == win
        }
    }
}

/// Little-endian fold of a case-folded block into its table key.
#[inline]
fn block_key(block: &[u8]) -> u32 {
    let mut key = 0u32;
    for (i, &b) in block.iter().enumerate() {
        key |= (fold(b) as u32) << (8 * i);
    }
    key
}

#[inline]
fn fold_into(src: &[u8], dst: &mut [u8]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = fold(s);
    }
}

impl Matcher for WuManberEngine {
    fn algorithm(&self) -> Algorithm {
        if self.bloom.is_some() {
            Algorithm::WuManberProb
        } else {
            Algorithm::WuManberDet
        }
    }

    fn scan(&self, hay: &[u8], sink: &mut MatchSink<'_>) -> ScanStats {
        let mut stats = ScanStats::new(self.algorithm().label(), hay.len());
        let timer = Instant::now();

        let (b, m, n) = (self.b, self.m, hay.len());
        let mut folded_prefix = vec![0u8; b];
        let mut i = m - 1;

        'windows: while i < n {
            stats.windows += 1;

            let key = (block_key(&hay[i + 1 - b..=i]) & self.mask) as usize;
            let shift = self.shift[key];
            stats.sum_shift += shift as u64;
            if shift > 0 {
                i += shift as usize;
                continue;
            }

            stats.hash_hits += 1;
            let start = i + 1 - m;
            fold_into(&hay[start..start + b], &mut folded_prefix);

            if let Some(bf) = &self.bloom {
                stats.bloom_checks += 1;
                if !bf.contains(&folded_prefix) {
                    i += 1;
                    continue;
                }
                stats.bloom_pass += 1;
            }

            let h = fnv1a(FNV_OFFSET_BASIS, &folded_prefix);
            let mut pid = self.hash[key];
            let mut canceled = false;
            while pid != NO_PATTERN {
                stats.chain_steps += 1;
                let p = pid as usize;
                if self.prefix_hash[p] == h
                    && start + self.pat_len[p] as usize <= n
                    && self.verify(hay, start, p)
                {
                    stats.exact_matches += 1;
                    stats.matches += 1;
                    if sink(Match {
                        pid: pid as u32,
                        start: start as u64,
                    })
                    .is_break()
                    {
                        canceled = true;
                        break;
                    }
                }
                pid = self.next[p];
            }
            if canceled {
                break 'windows;
            }
            i += 1;
        }

        stats.elapsed_sec = timer.elapsed().as_secs_f64();
        stats
    }
}
