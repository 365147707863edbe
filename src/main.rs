//! Scanner CLI: run one engine over one capture file.
//!
//! ```text
//! sigscan <alg> <capture> [--rules <path>] [--quiet] [--json]
//! ```
//!
//! `<alg>` is `a` (Aho-Corasick), `d` (Wu-Manber deterministic), `p`
//! (Wu-Manber probabilistic), `h` (Set-Horspool) or `b` (Boyer-Moore).
//! Matches print as `[MATCH] pid <n> at <offset>` lines followed by the
//! stats dump. Exit code 0 on success, 1 on argument errors or unreadable
//! ruleset/capture.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;

use sigscan::capture::CaptureBuffer;
use sigscan::rules::load_ruleset;
use sigscan::{build_engine, Algorithm};

const DEFAULT_RULESET: &str = "data/ruleset/snort3-community.rules";

struct Args {
    alg: Algorithm,
    capture: PathBuf,
    rules: PathBuf,
    quiet: bool,
    json: bool,
}

fn usage(exe: &str) -> String {
    format!(
        "usage: {exe} <alg> <capture> [--rules <path>] [--quiet] [--json]\n\
         \n\
         alg:\n\
         \x20 a  Aho-Corasick automaton\n\
         \x20 d  Wu-Manber (deterministic prefix hash)\n\
         \x20 p  Wu-Manber (probabilistic Bloom filter)\n\
         \x20 h  Set-Horspool multi-pattern search\n\
         \x20 b  Boyer-Moore, per pattern\n\
         \n\
         options:\n\
         \x20 --rules <path>  ruleset file (default: {DEFAULT_RULESET})\n\
         \x20 --quiet         suppress per-match lines\n\
         \x20 --json          emit stats as JSON instead of text"
    )
}

/// Exit with an argument error.
fn die(exe: &str, msg: &str) -> ! {
    eprintln!("error: {msg}");
    eprintln!("{}", usage(exe));
    std::process::exit(1);
}

fn parse_args() -> Args {
    let mut args = std::env::args();
    let exe = args.next().unwrap_or_else(|| "sigscan".into());

    let mut alg = None;
    let mut capture = None;
    let mut rules = PathBuf::from(DEFAULT_RULESET);
    let mut quiet = false;
    let mut json = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--rules" => match args.next() {
                Some(path) => rules = PathBuf::from(path),
                None => die(&exe, "--rules needs a path"),
            },
            "--quiet" => quiet = true,
            "--json" => json = true,
            "--help" | "-h" => {
                println!("{}", usage(&exe));
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => die(&exe, &format!("unknown flag: {flag}")),
            positional => {
                if alg.is_none() {
                    match Algorithm::from_selector(positional) {
                        Some(a) => alg = Some(a),
                        None => die(&exe, &format!("unknown algorithm: {positional}")),
                    }
                } else if capture.is_none() {
                    capture = Some(PathBuf::from(positional));
                } else {
                    die(&exe, &format!("unexpected argument: {positional}"));
                }
            }
        }
    }

    let Some(alg) = alg else {
        die(&exe, "missing <alg>");
    };
    let Some(capture) = capture else {
        die(&exe, "missing <capture>");
    };
    Args {
        alg,
        capture,
        rules,
        quiet,
        json,
    }
}

fn main() -> ExitCode {
    let args = parse_args();

    let set = match load_ruleset(&args.rules) {
        Ok(set) => set,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    eprintln!(
        "[*] Loaded {} signatures (min {} / avg {:.1} bytes)",
        set.len(),
        set.min_len(),
        set.avg_len()
    );

    let engine = match build_engine(args.alg, &set) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("error: building {}: {err}", args.alg.label());
            return ExitCode::FAILURE;
        }
    };

    let buffer = match CaptureBuffer::open(&args.capture) {
        Ok(buffer) => buffer,
        Err(err) => {
            eprintln!("error: cannot read capture {}: {err}", args.capture.display());
            return ExitCode::FAILURE;
        }
    };
    eprintln!(
        "[*] Scanning {} ({} bytes) with {}",
        args.capture.display(),
        buffer.len(),
        args.alg.label()
    );

    let quiet = args.quiet;
    let stats = engine.scan(&buffer, &mut |m| {
        if !quiet {
            println!("[MATCH] pid {} at {}", m.pid, m.start);
        }
        ControlFlow::Continue(())
    });

    if args.json {
        match serde_json::to_string_pretty(&stats) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("error: stats serialization: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("\n{stats}");
    }
    ExitCode::SUCCESS
}
