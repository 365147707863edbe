//! Per-scan instrumentation record shared by every engine.
//!
//! Each scan produces one [`ScanStats`] value owned by the caller; there is
//! no process-wide counter state, so concurrent scans over the same tables
//! need no locking. Counters are populated only where semantically meaningful
//! for the engine that ran: AC fills `transitions`/`fail_steps`/`matches`,
//! WM fills the window/hash/bloom family, SH and BM fill the
//! comparison/shift family. The `Display` impl prints the populated subset
//! plus derived throughput.

use serde::Serialize;
use std::fmt;

/// Floor applied to elapsed time when deriving throughput, so near-zero
/// durations do not produce physically meaningless MB/s figures. The raw
/// `elapsed_sec` is never floored.
const THROUGHPUT_FLOOR_SEC: f64 = 1e-3;

/// Per-scan counters and timing for one engine run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScanStats {
    /// Engine label, e.g. `"Aho-Corasick"`.
    pub algorithm: &'static str,
    /// Input buffer length in bytes.
    pub input_len: u64,

    /// Windows examined (WM, SH).
    pub windows: u64,
    /// Total distance shifted across the scan (WM, SH).
    pub sum_shift: u64,
    /// Windows whose block shift was zero (WM).
    pub hash_hits: u64,
    /// Hash-chain links walked (WM).
    pub chain_steps: u64,
    /// Full verifications that succeeded (WM, BM).
    pub exact_matches: u64,
    /// Bloom filter probes (WM probabilistic).
    pub bloom_checks: u64,
    /// Bloom probes that passed (WM probabilistic).
    pub bloom_pass: u64,
    /// Byte comparisons during verification (SH, BM).
    pub comparisons: u64,
    /// State transitions taken (AC).
    pub transitions: u64,
    /// Failure links followed (AC).
    pub fail_steps: u64,
    /// Shift-table advances (SH, BM).
    pub shifts: u64,
    /// Matches reported.
    pub matches: u64,

    /// Wall-clock scan time from a monotonic clock, in seconds.
    pub elapsed_sec: f64,
}

impl ScanStats {
    pub(crate) fn new(algorithm: &'static str, input_len: usize) -> Self {
        Self {
            algorithm,
            input_len: input_len as u64,
            ..Self::default()
        }
    }

    /// Derived scan throughput in MB/s (see [`THROUGHPUT_FLOOR_SEC`]).
    pub fn throughput_mb_s(&self) -> f64 {
        let secs = self.elapsed_sec.max(THROUGHPUT_FLOOR_SEC);
        (self.input_len as f64 / (1024.0 * 1024.0)) / secs
    }

    /// All counters except timing, for determinism checks and baselines.
    pub fn counters(&self) -> [u64; 13] {
        [
            self.windows,
            self.sum_shift,
            self.hash_hits,
            self.chain_steps,
            self.exact_matches,
            self.bloom_checks,
            self.bloom_pass,
            self.comparisons,
            self.transitions,
            self.fail_steps,
            self.shifts,
            self.matches,
            self.input_len,
        ]
    }

    /// Mean shift distance per examined window, when windows were counted.
    pub fn avg_shift(&self) -> f64 {
        if self.windows == 0 {
            0.0
        } else {
            self.sum_shift as f64 / self.windows as f64
        }
    }
}

fn counter(f: &mut fmt::Formatter<'_>, label: &str, v: u64) -> fmt::Result {
    if v != 0 {
        writeln!(f, "  {label:<21}: {v}")?;
    }
    Ok(())
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Search Stats: {}]", self.algorithm)?;
        writeln!(f, "  Input length         : {} bytes", self.input_len)?;

        counter(f, "Windows examined", self.windows)?;
        if self.windows != 0 {
            writeln!(f, "  Avg shift distance   : {:.3}", self.avg_shift())?;
        }
        counter(f, "Hash hits", self.hash_hits)?;
        counter(f, "Chain traversals", self.chain_steps)?;
        counter(f, "Bloom checks", self.bloom_checks)?;
        counter(f, "Bloom positives", self.bloom_pass)?;
        counter(f, "Comparisons", self.comparisons)?;
        counter(f, "State transitions", self.transitions)?;
        counter(f, "Fail link traversals", self.fail_steps)?;
        counter(f, "Shifts", self.shifts)?;
        counter(f, "Exact matches", self.exact_matches)?;
        writeln!(f, "  Matches found        : {}", self.matches)?;
        writeln!(f, "  Elapsed time         : {:.6} sec", self.elapsed_sec)?;
        write!(f, "  Throughput           : {:.2} MB/s", self.throughput_mb_s())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_floors_tiny_durations() {
        let mut s = ScanStats::new("test", 1024 * 1024);
        s.elapsed_sec = 1e-9;
        assert!((s.throughput_mb_s() - 1000.0).abs() < 1e-6);
        assert!(s.elapsed_sec < 1e-3, "raw elapsed must stay unfloored");
    }

    #[test]
    fn display_skips_zero_counters() {
        let mut s = ScanStats::new("Aho-Corasick", 10);
        s.transitions = 10;
        s.matches = 2;
        let text = s.to_string();
        assert!(text.contains("State transitions"));
        assert!(!text.contains("Bloom checks"));
        assert!(text.contains("Matches found        : 2"));
    }

    #[test]
    fn counters_exclude_timing() {
        let mut a = ScanStats::new("x", 5);
        let mut b = ScanStats::new("x", 5);
        a.elapsed_sec = 0.5;
        b.elapsed_sec = 0.9;
        a.matches = 3;
        b.matches = 3;
        assert_eq!(a.counters(), b.counters());
    }
}
