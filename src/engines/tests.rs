//! Cross-engine contract tests.
//!
//! Every engine must report the same multiset of `(pid, start)` pairs for
//! the same set and input. The scenarios here pin the contract with literal
//! inputs; a slow reference scanner backs the randomized checks.

use std::ops::ControlFlow;

use memchr::memmem;

use crate::signature::{SignatureSet, SignatureSpec};

use super::wu_manber::{PrefixMode, WmOptions};
use super::*;

/// Builds all five engine variants over `set`.
fn all_engines(set: &SignatureSet) -> Vec<Box<dyn Matcher>> {
    [
        Algorithm::AhoCorasick,
        Algorithm::WuManberDet,
        Algorithm::WuManberProb,
        Algorithm::SetHorspool,
        Algorithm::BoyerMoore,
    ]
    .into_iter()
    .map(|alg| build_engine(alg, set).unwrap())
    .collect()
}

fn sorted(matches: &[Match]) -> Vec<(u32, u64)> {
    let mut got: Vec<(u32, u64)> = matches.iter().map(|m| (m.pid, m.start)).collect();
    got.sort_unstable();
    got
}

/// Naive per-pattern scan used as the ground truth.
///
/// Case-insensitive patterns search a folded copy of the haystack; folding
/// is byte-wise, so offsets carry over unchanged.
fn reference_scan(set: &SignatureSet, hay: &[u8]) -> Vec<(u32, u64)> {
    let folded_hay: Vec<u8> = hay.iter().map(|&b| fold(b)).collect();
    let mut out = Vec::new();
    for sig in set {
        let (needle, stack): (Vec<u8>, &[u8]) = if sig.nocase() {
            (sig.bytes().iter().map(|&b| fold(b)).collect(), &folded_hay)
        } else {
            (sig.bytes().to_vec(), hay)
        };
        for start in memmem::find_iter(stack, &needle) {
            out.push((sig.id(), start as u64));
        }
    }
    out.sort_unstable();
    out
}

/// Asserts every engine agrees with the reference on `hay`.
fn assert_parity(set: &SignatureSet, hay: &[u8]) {
    let expect = reference_scan(set, hay);
    for engine in all_engines(set) {
        let (matches, stats) = engine.scan_collect(hay);
        assert_eq!(
            sorted(&matches),
            expect,
            "engine {:?} diverged on {:?}",
            engine.algorithm(),
            String::from_utf8_lossy(hay)
        );
        assert_eq!(stats.matches, matches.len() as u64);
        assert!(stats.elapsed_sec >= 0.0);
    }
}

fn set_of(patterns: &[&str]) -> SignatureSet {
    SignatureSet::build(patterns.iter().map(|p| SignatureSpec::literal(*p))).unwrap()
}

// --------------------------
// Concrete scenarios
// --------------------------

#[test]
fn scenario_classic_ushers() {
    let set = set_of(&["he", "she", "his", "hers"]);
    let expect = vec![(0, 2), (1, 1), (3, 2)];
    for engine in all_engines(&set) {
        let (matches, _) = engine.scan_collect(b"ushers");
        assert_eq!(sorted(&matches), expect, "{:?}", engine.algorithm());
    }
}

#[test]
fn scenario_malware_strings() {
    let set = set_of(&["MALWARE", "EVIL", "BAD"]);
    let hay = b"THISBADFILEHASAVIRUSEVILMALWAREINSIDE";
    let expect = vec![(0, 24), (1, 20), (2, 4)];
    for engine in all_engines(&set) {
        let (matches, _) = engine.scan_collect(hay);
        assert_eq!(sorted(&matches), expect, "{:?}", engine.algorithm());
    }
}

#[test]
fn scenario_overlap() {
    let set = set_of(&["aa"]);
    let expect = vec![(0, 0), (0, 1), (0, 2)];
    for engine in all_engines(&set) {
        let (matches, _) = engine.scan_collect(b"aaaa");
        assert_eq!(sorted(&matches), expect, "{:?}", engine.algorithm());
    }
}

#[test]
fn scenario_nocase_variants() {
    let set = SignatureSet::build([SignatureSpec::literal("abc").nocase()]).unwrap();
    let expect = vec![(0, 2), (0, 7)];
    for engine in all_engines(&set) {
        let (matches, _) = engine.scan_collect(b"xxABcyyabCzz");
        assert_eq!(sorted(&matches), expect, "{:?}", engine.algorithm());
    }
}

#[test]
fn scenario_binary_bytes() {
    let set = SignatureSet::build([SignatureSpec::literal(vec![0x00, 0x01, 0x02])]).unwrap();
    let hay = [0xff, 0x00, 0x01, 0x02, 0x00, 0x01, 0x02];
    let expect = vec![(0, 1), (0, 4)];
    for engine in all_engines(&set) {
        let (matches, _) = engine.scan_collect(&hay);
        assert_eq!(sorted(&matches), expect, "{:?}", engine.algorithm());
    }
}

#[test]
fn scenario_http_request() {
    let set = set_of(&["/etc/passwd", "cmd.exe", "USER anonymous"]);
    let hay = b"GET /etc/passwd HTTP/1.0\r\nUSER anonymous\r\n";
    let expect = vec![(0, 4), (2, 26)];
    for engine in all_engines(&set) {
        let (matches, _) = engine.scan_collect(hay);
        assert_eq!(sorted(&matches), expect, "{:?}", engine.algorithm());
    }
}

// --------------------------
// Contract properties
// --------------------------

#[test]
fn boundary_matches() {
    let set = set_of(&["prefix", "suffix", "wholebuffer"]);

    assert_parity(&set, b"prefix tail");
    assert_parity(&set, b"head suffix");
    assert_parity(&set, b"wholebuffer");

    // Whole-buffer equality matches exactly once at offset zero.
    for engine in all_engines(&set_of(&["exact"])) {
        let (matches, _) = engine.scan_collect(b"exact");
        assert_eq!(sorted(&matches), vec![(0, 0)], "{:?}", engine.algorithm());
    }
}

#[test]
fn case_sensitive_pattern_requires_exact_case() {
    let set = set_of(&["AbC"]);
    for engine in all_engines(&set) {
        let (matches, _) = engine.scan_collect(b"abc AbC ABC aBc");
        assert_eq!(sorted(&matches), vec![(0, 4)], "{:?}", engine.algorithm());
    }
}

#[test]
fn empty_input_yields_no_matches_and_valid_stats() {
    let set = set_of(&["anything", "at"]);
    for engine in all_engines(&set) {
        let (matches, stats) = engine.scan_collect(b"");
        assert!(matches.is_empty());
        assert_eq!(stats.matches, 0);
        assert_eq!(stats.input_len, 0);
        assert!(stats.elapsed_sec >= 0.0);
    }
}

#[test]
fn pattern_longer_than_input_never_matches() {
    let set = set_of(&["needle", "ne"]);
    assert_parity(&set, b"need");
}

#[test]
fn repeated_scans_are_deterministic() {
    let set = set_of(&["ab", "babc", "bc"]);
    let hay = b"abcbabcababc";
    for engine in all_engines(&set) {
        let (first, first_stats) = engine.scan_collect(hay);
        for _ in 0..3 {
            let (again, again_stats) = engine.scan_collect(hay);
            assert_eq!(first, again, "{:?} match stream changed", engine.algorithm());
            assert_eq!(
                first_stats.counters(),
                again_stats.counters(),
                "{:?} counters changed",
                engine.algorithm()
            );
        }
    }
}

#[test]
fn cancellation_stops_the_stream_and_returns_stats() {
    let set = set_of(&["aa"]);
    let hay = b"aaaaaaaa";
    for engine in all_engines(&set) {
        let mut seen = 0u32;
        let stats = engine.scan(hay, &mut |_m| {
            seen += 1;
            if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(seen, 2, "{:?} ignored cancellation", engine.algorithm());
        assert!(stats.elapsed_sec >= 0.0);
        assert_eq!(stats.input_len, hay.len() as u64);
    }
}

#[test]
fn concurrent_scans_share_one_engine() {
    let set = set_of(&["ab", "bc", "abc"]);
    let hay = b"zababcbcab".repeat(50);
    let expect = reference_scan(&set, &hay);

    for engine in all_engines(&set) {
        let engine = &*engine;
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        let (matches, stats) = engine.scan_collect(&hay);
                        (sorted(&matches), stats)
                    })
                })
                .collect();
            for handle in handles {
                let (got, stats) = handle.join().unwrap();
                assert_eq!(got, expect, "{:?}", engine.algorithm());
                assert_eq!(stats.matches, expect.len() as u64);
            }
        });
    }
}

#[test]
fn match_offsets_stay_in_bounds() {
    let set = set_of(&["ab", "abcde", "e"]);
    let hay = b"xxabcdeyyabcde";
    for engine in all_engines(&set) {
        let (matches, _) = engine.scan_collect(hay);
        for m in matches {
            let len = set.get(m.pid).len() as u64;
            assert!(m.start + len <= hay.len() as u64);
        }
    }
}

// --------------------------
// Randomized parity
// --------------------------

/// Splitmix-style generator; deterministic across runs.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

#[test]
fn randomized_parity_small_alphabet() {
    // Small alphabet maximizes overlaps and shift-table collisions.
    let mut rng = XorShift64::new(0x5EED);
    for _ in 0..40 {
        let npat = 2 + (rng.next_u64() % 5) as usize;
        let mut specs = Vec::new();
        for _ in 0..npat {
            let len = 2 + (rng.next_u64() % 5) as usize;
            let bytes: Vec<u8> = (0..len).map(|_| b'a' + (rng.next_u64() % 3) as u8).collect();
            let spec = if rng.next_u64() % 4 == 0 {
                SignatureSpec::literal(bytes).nocase()
            } else {
                SignatureSpec::literal(bytes)
            };
            specs.push(spec);
        }
        let set = SignatureSet::build(specs).unwrap();

        let hay_len = (rng.next_u64() % 200) as usize;
        let hay: Vec<u8> = (0..hay_len)
            .map(|_| {
                let v = rng.next_u64() % 6;
                match v {
                    0..=2 => b'a' + v as u8,
                    3 => b'A',
                    4 => b'B',
                    _ => b'C',
                }
            })
            .collect();
        assert_parity(&set, &hay);
    }
}

#[test]
fn randomized_parity_binary_input() {
    let mut rng = XorShift64::new(0xBEEF);
    for _ in 0..20 {
        let npat = 2 + (rng.next_u64() % 4) as usize;
        let mut specs = Vec::new();
        for _ in 0..npat {
            let len = 2 + (rng.next_u64() % 6) as usize;
            let bytes: Vec<u8> = (0..len).map(|_| (rng.next_u64() % 8) as u8).collect();
            specs.push(SignatureSpec::literal(bytes));
        }
        let set = SignatureSet::build(specs).unwrap();

        let hay_len = (rng.next_u64() % 300) as usize;
        let hay: Vec<u8> = (0..hay_len).map(|_| (rng.next_u64() % 8) as u8).collect();
        assert_parity(&set, &hay);
    }
}

#[test]
fn bloom_variant_never_misses_planted_signatures() {
    let mut rng = XorShift64::new(0xB100);
    let specs: Vec<SignatureSpec> = (0..32)
        .map(|i| {
            let len = 4 + (rng.next_u64() % 8) as usize;
            let bytes: Vec<u8> = (0..len)
                .map(|_| b'a' + (rng.next_u64() % 26) as u8)
                .collect();
            if i % 3 == 0 {
                SignatureSpec::literal(bytes).nocase()
            } else {
                SignatureSpec::literal(bytes)
            }
        })
        .collect();
    let set = SignatureSet::build(specs).unwrap();

    // Plant every signature in noise and require the probabilistic engine to
    // report each planted offset.
    let mut hay = Vec::new();
    let mut planted = Vec::new();
    for sig in &set {
        for _ in 0..10 {
            hay.push((rng.next_u64() % 256) as u8);
        }
        planted.push((sig.id(), hay.len() as u64));
        hay.extend_from_slice(sig.bytes());
    }

    let engine = super::wu_manber::WuManberEngine::build(
        &set,
        WmOptions {
            prefix_filter: PrefixMode::Bloom,
            ..WmOptions::default()
        },
    )
    .unwrap();
    let (matches, stats) = engine.scan_collect(&hay);
    let got = sorted(&matches);
    for want in &planted {
        assert!(got.contains(want), "bloom variant missed {want:?}");
    }
    assert!(stats.bloom_checks > 0);
    assert_eq!(got, reference_scan(&set, &hay));
}
