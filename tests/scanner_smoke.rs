//! End-to-end smoke test: ruleset file -> parser -> engines -> matches.

use std::io::Write;
use std::ops::ControlFlow;
use std::path::PathBuf;

use sigscan::capture::CaptureBuffer;
use sigscan::rules::load_ruleset;
use sigscan::{build_engine, Algorithm};

const RULESET: &str = r#"
# Minimal community-style ruleset for the smoke test.
alert tcp any any -> any any (msg:"LFI attempt"; content:"/etc/passwd"; sid:1001; rev:1;)
alert tcp any any -> any any (msg:"Windows shell"; content:"cmd.exe"; nocase; sid:1002; rev:1;)
alert tcp any any -> any any (msg:"FTP anonymous"; content:"USER anonymous"; sid:1003; rev:1;)
alert tcp any any -> any any (msg:"Binary marker"; content:"|de ad be ef|"; sid:1004; rev:1;)
"#;

const ALGORITHMS: [Algorithm; 5] = [
    Algorithm::AhoCorasick,
    Algorithm::WuManberDet,
    Algorithm::WuManberProb,
    Algorithm::SetHorspool,
    Algorithm::BoyerMoore,
];

fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("sigscan-{}-{}", std::process::id(), name));
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents).unwrap();
    path
}

#[test]
fn ruleset_to_matches_end_to_end() {
    let rules_path = temp_file("smoke.rules", RULESET.as_bytes());

    let mut payload = Vec::new();
    payload.extend_from_slice(b"GET /etc/passwd HTTP/1.0\r\n");
    payload.extend_from_slice(b"X: CMD.EXE\r\n");
    payload.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
    payload.extend_from_slice(b"USER anonymous\r\n");
    let capture_path = temp_file("smoke.pcap", &payload);

    let set = load_ruleset(&rules_path).unwrap();
    assert_eq!(set.len(), 4);
    assert_eq!(set.get(3).bytes(), &[0xde, 0xad, 0xbe, 0xef]);
    assert!(set.get(1).nocase());
    assert_eq!(set.get(0).meta().unwrap().sid, Some(1001));

    let buffer = CaptureBuffer::open(&capture_path).unwrap();

    let mut expect = vec![
        (0u32, 4u64),  // /etc/passwd
        (1, 29),       // CMD.EXE, nocase
        (2, 42),       // USER anonymous
        (3, 38),       // de ad be ef
    ];
    expect.sort_unstable();

    for alg in ALGORITHMS {
        let engine = build_engine(alg, &set).unwrap();
        let (matches, stats) = engine.scan_collect(&buffer);
        let mut got: Vec<(u32, u64)> = matches.iter().map(|m| (m.pid, m.start)).collect();
        got.sort_unstable();
        assert_eq!(got, expect, "{:?}", alg);
        assert_eq!(stats.matches, 4);
        assert_eq!(stats.input_len, payload.len() as u64);
    }

    std::fs::remove_file(&rules_path).unwrap();
    std::fs::remove_file(&capture_path).unwrap();
}

#[test]
fn canceled_scan_still_reports_stats() {
    let rules_path = temp_file("cancel.rules", RULESET.as_bytes());
    let set = load_ruleset(&rules_path).unwrap();

    let mut payload = Vec::new();
    for _ in 0..8 {
        payload.extend_from_slice(b"cmd.exe ");
    }

    for alg in ALGORITHMS {
        let engine = build_engine(alg, &set).unwrap();
        let mut seen = 0;
        let stats = engine.scan(&payload, &mut |_m| {
            seen += 1;
            ControlFlow::Break(())
        });
        assert_eq!(seen, 1, "{:?}", alg);
        assert_eq!(stats.input_len, payload.len() as u64);
        assert!(stats.elapsed_sec >= 0.0);
    }

    std::fs::remove_file(&rules_path).unwrap();
}

#[test]
fn unreadable_ruleset_is_an_error() {
    assert!(load_ruleset(std::path::Path::new("/nonexistent/sigscan.rules")).is_err());
}
