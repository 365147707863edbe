//! Aho-Corasick automaton over the whole signature set.
//!
//! Purpose: linear-time multi-pattern scan via a trie with failure links and
//! failure-closed output sets.
//!
//! # Algorithm
//! 1. Insert each pattern as a chain of transitions from the root.
//! 2. BFS from the root assigns failure links: a node reached from parent `p`
//!    via byte `c` fails to `delta*(fail(p), c)`, which is already total for
//!    ancestors. Output sets merge with the failure node's set as links are
//!    assigned, so arriving at a state observes every suffix signature.
//! 3. Root transitions are gap-filled with self-loops; non-root gaps stay
//!    sentinels and the scan follows failure links at runtime.
//!
//! # Invariants
//! - Nodes live in a contiguous arena indexed by `u32`; failure links form a
//!   rooted tree, so the runtime failure walk always terminates.
//! - Output sets hold pattern ids only, never pattern bytes; merging under
//!   failure closure copies 4-byte ids, not strings.
//! - Case sensitivity splits the set across at most two automatons: one over
//!   verbatim bytes, one over folded bytes. Both advance in lockstep per
//!   input byte, which keeps emission in nondecreasing end position.

use std::ops::ControlFlow;
use std::time::Instant;

use crate::errors::BuildError;
use crate::signature::SignatureSet;
use crate::stats::ScanStats;

use super::{fold, Algorithm, Match, MatchSink, Matcher};

/// Transition sentinel used before `build_links` runs.
const NO_STATE: u32 = u32::MAX;
const ROOT: u32 = 0;

struct Node {
    next: [u32; 256],
    fail: u32,
    out: Vec<u32>,
}

impl Node {
    fn new() -> Self {
        Self {
            next: [NO_STATE; 256],
            fail: ROOT,
            out: Vec::new(),
        }
    }
}

/// One trie + failure-link automaton over a case-uniform slice of the set.
struct Automaton {
    nodes: Vec<Node>,
    /// Folds every inserted and scanned byte when set.
    folded: bool,
}

impl Automaton {
    fn new(folded: bool) -> Self {
        Self {
            nodes: vec![Node::new()],
            folded,
        }
    }

    fn insert(&mut self, pid: u32, pattern: &[u8]) {
        let mut state = ROOT;
        for &raw in pattern {
            let c = if self.folded { fold(raw) } else { raw } as usize;
            let next = self.nodes[state as usize].next[c];
            state = if next == NO_STATE {
                let id = self.nodes.len() as u32;
                self.nodes.push(Node::new());
                self.nodes[state as usize].next[c] = id;
                id
            } else {
                next
            };
        }
        self.nodes[state as usize].out.push(pid);
    }

    /// BFS failure-link construction, output closure, and root gap-fill.
    fn build_links(&mut self) {
        let mut queue = Vec::with_capacity(self.nodes.len());
        for c in 0..256 {
            let next = self.nodes[ROOT as usize].next[c];
            if next == NO_STATE {
                self.nodes[ROOT as usize].next[c] = ROOT;
            } else {
                self.nodes[next as usize].fail = ROOT;
                queue.push(next);
            }
        }

        let mut head = 0;
        while head < queue.len() {
            let state = queue[head];
            head += 1;

            for c in 0..256 {
                let next = self.nodes[state as usize].next[c];
                if next == NO_STATE {
                    continue;
                }
                queue.push(next);

                // delta* is already total for the parent's failure chain:
                // root is gap-filled and ancestors were processed first.
                let mut f = self.nodes[state as usize].fail;
                while self.nodes[f as usize].next[c] == NO_STATE {
                    f = self.nodes[f as usize].fail;
                }
                let fail = self.nodes[f as usize].next[c];
                self.nodes[next as usize].fail = fail;

                if !self.nodes[fail as usize].out.is_empty() {
                    let merged = self.nodes[fail as usize].out.clone();
                    self.nodes[next as usize].out.extend(merged);
                }
            }
        }
    }

    /// Advances one byte, emitting the new state's output set.
    #[inline]
    fn step(
        &self,
        state: &mut u32,
        raw: u8,
        index: usize,
        pat_len: &[u32],
        stats: &mut ScanStats,
        sink: &mut MatchSink<'_>,
    ) -> ControlFlow<()> {
        let c = if self.folded { fold(raw) } else { raw } as usize;
        stats.transitions += 1;

        let mut s = *state;
        while self.nodes[s as usize].next[c] == NO_STATE && s != ROOT {
            s = self.nodes[s as usize].fail;
            stats.fail_steps += 1;
        }
        s = self.nodes[s as usize].next[c];
        *state = s;

        for &pid in &self.nodes[s as usize].out {
            stats.matches += 1;
            let start = (index + 1 - pat_len[pid as usize] as usize) as u64;
            if sink(Match { pid, start }).is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

/// Aho-Corasick engine; see the module docs for construction details.
pub struct AhoCorasickEngine {
    /// Automaton over verbatim bytes for case-sensitive signatures.
    exact: Option<Automaton>,
    /// Automaton over folded bytes for `nocase` signatures.
    folded: Option<Automaton>,
    pat_len: Vec<u32>,
}

impl AhoCorasickEngine {
    pub fn build(set: &SignatureSet) -> Result<Self, BuildError> {
        let mut exact: Option<Automaton> = None;
        let mut folded: Option<Automaton> = None;
        let mut pat_len = Vec::with_capacity(set.len());

        for sig in set {
            pat_len.push(sig.len() as u32);
            let target = if sig.nocase() {
                folded.get_or_insert_with(|| Automaton::new(true))
            } else {
                exact.get_or_insert_with(|| Automaton::new(false))
            };
            target.insert(sig.id(), sig.bytes());
        }

        if let Some(a) = exact.as_mut() {
            a.build_links();
        }
        if let Some(a) = folded.as_mut() {
            a.build_links();
        }

        Ok(Self {
            exact,
            folded,
            pat_len,
        })
    }

    /// Number of trie nodes across both automatons, for table-size reporting.
    pub fn node_count(&self) -> usize {
        self.exact.as_ref().map_or(0, |a| a.nodes.len())
            + self.folded.as_ref().map_or(0, |a| a.nodes.len())
    }
}

impl Matcher for AhoCorasickEngine {
    fn algorithm(&self) -> Algorithm {
        Algorithm::AhoCorasick
    }

    fn scan(&self, hay: &[u8], sink: &mut MatchSink<'_>) -> ScanStats {
        let mut stats = ScanStats::new(self.algorithm().label(), hay.len());
        let start = Instant::now();

        let mut state_exact = ROOT;
        let mut state_folded = ROOT;

        'bytes: for (i, &b) in hay.iter().enumerate() {
            if let Some(a) = &self.exact {
                if a.step(&mut state_exact, b, i, &self.pat_len, &mut stats, sink)
                    .is_break()
                {
                    break 'bytes;
                }
            }
            if let Some(a) = &self.folded {
                if a.step(&mut state_folded, b, i, &self.pat_len, &mut stats, sink)
                    .is_break()
                {
                    break 'bytes;
                }
            }
        }

        stats.elapsed_sec = start.elapsed().as_secs_f64();
        stats
    }
}

#[cfg(test)]
mod ac_tests {
    use super::*;
    use crate::signature::SignatureSpec;

    fn set(patterns: &[&str]) -> SignatureSet {
        SignatureSet::build(patterns.iter().map(|p| SignatureSpec::literal(*p))).unwrap()
    }

    #[test]
    fn root_is_gap_filled() {
        let engine = AhoCorasickEngine::build(&set(&["ab"])).unwrap();
        let a = engine.exact.as_ref().unwrap();
        for c in 0..256usize {
            assert_ne!(a.nodes[ROOT as usize].next[c], NO_STATE);
        }
    }

    #[test]
    fn output_sets_close_under_failure() {
        // "hers" ends at a state whose failure chain passes through "he";
        // reaching the end of "hers" must also report "hers" and nothing
        // else, while reaching "he" inside "hers" reports "he".
        let set = set(&["he", "hers"]);
        let engine = AhoCorasickEngine::build(&set).unwrap();
        let (matches, _) = engine.scan_collect(b"hers");
        let mut got: Vec<(u32, u64)> = matches.iter().map(|m| (m.pid, m.start)).collect();
        got.sort_unstable();
        assert_eq!(got, vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn mixed_case_sensitivity_builds_two_automatons() {
        let set = SignatureSet::build([
            SignatureSpec::literal("AbC"),
            SignatureSpec::literal("xyz").nocase(),
        ])
        .unwrap();
        let engine = AhoCorasickEngine::build(&set).unwrap();
        assert!(engine.exact.is_some());
        assert!(engine.folded.is_some());

        let (matches, _) = engine.scan_collect(b"..AbC..XYZ..abc..");
        let mut got: Vec<(u32, u64)> = matches.iter().map(|m| (m.pid, m.start)).collect();
        got.sort_unstable();
        assert_eq!(got, vec![(0, 2), (1, 7)]);
    }

    #[test]
    fn counts_transitions_and_fail_steps() {
        let engine = AhoCorasickEngine::build(&set(&["abc"])).unwrap();
        let (_, stats) = engine.scan_collect(b"ababc");
        assert_eq!(stats.transitions, 5);
        assert!(stats.fail_steps > 0);
        assert_eq!(stats.matches, 1);
    }
}
