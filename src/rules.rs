//! Snort-style rule parsing: `content:"..."` extraction.
//!
//! The parser pulls literal content patterns out of rule lines and leaves
//! everything else alone. Per content it honors the `nocase` modifier and
//! decodes `|41 42|` hex runs into raw bytes; `msg:"..."` and `sid:<n>` ride
//! along as opaque metadata. Rule options beyond literal content (negated
//! contents, offsets, pcre, ...) are skipped, not errors: malformed or
//! unsupported rules simply contribute no signatures, and the scanning core
//! only ever sees the filtered set.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::BuildError;
use crate::signature::{SignatureMeta, SignatureSet, SignatureSpec};

/// Errors from loading a ruleset file.
#[derive(Debug)]
#[non_exhaustive]
pub enum RulesetError {
    /// The ruleset file could not be read.
    Io { path: PathBuf, source: io::Error },
    /// No content pattern survived parsing.
    NoPatterns { path: PathBuf },
    /// The extracted signatures failed set validation.
    Build(BuildError),
}

impl fmt::Display for RulesetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read ruleset {}: {source}", path.display())
            }
            Self::NoPatterns { path } => {
                write!(f, "no content patterns in ruleset {}", path.display())
            }
            Self::Build(err) => write!(f, "ruleset rejected: {err}"),
        }
    }
}

impl std::error::Error for RulesetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Build(err) => Some(err),
            _ => None,
        }
    }
}

/// Reads `path` and builds a [`SignatureSet`] from every extracted content.
pub fn load_ruleset(path: &Path) -> Result<SignatureSet, RulesetError> {
    let text = fs::read_to_string(path).map_err(|source| RulesetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let specs = parse_ruleset(&text);
    if specs.is_empty() {
        return Err(RulesetError::NoPatterns {
            path: path.to_path_buf(),
        });
    }
    SignatureSet::build(specs).map_err(RulesetError::Build)
}

/// Extracts signature specs from a whole ruleset text.
pub fn parse_ruleset(text: &str) -> Vec<SignatureSpec> {
    let mut specs = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.len() < 5 {
            continue;
        }
        parse_rule_line(line, &mut specs);
    }
    specs
}

/// Extracts every content literal from one rule line into `specs`.
pub fn parse_rule_line(rule: &str, specs: &mut Vec<SignatureSpec>) {
    let meta = SignatureMeta {
        msg: extract_quoted(rule, "msg:").map(Box::from),
        sid: extract_sid(rule),
        rule: Some(Box::from(rule)),
    };

    let mut rest = rule;
    while let Some(at) = rest.find("content:") {
        rest = &rest[at + "content:".len()..];
        let body = rest.trim_start();
        if let Some(stripped) = body.strip_prefix('!') {
            // Negated content is a rule semantic the matcher does not model.
            rest = stripped;
            continue;
        }
        let Some(body) = body.strip_prefix('"') else {
            continue;
        };
        let Some(close) = body.find('"') else {
            break;
        };
        let literal = &body[..close];
        rest = &body[close + 1..];

        let bytes = decode_content(literal);
        if bytes.is_empty() {
            continue;
        }

        // The modifier window for this content runs until the next content
        // keyword, so a later content's nocase does not leak backwards.
        let window = match rest.find("content:") {
            Some(next) => &rest[..next],
            None => rest,
        };
        let nocase = window.contains("nocase");

        let mut spec = SignatureSpec::literal(bytes).with_meta(meta.clone());
        if nocase {
            spec = spec.nocase();
        }
        specs.push(spec);
    }
}

/// Decodes a content literal: plain text with `|..|` hex runs.
fn decode_content(literal: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(literal.len());
    let mut bytes = literal.bytes().peekable();
    let mut in_hex = false;

    while let Some(b) = bytes.next() {
        if b == b'|' {
            in_hex = !in_hex;
            continue;
        }
        if !in_hex {
            out.push(b);
            continue;
        }
        if b == b' ' {
            continue;
        }
        let hi = hex_val(b);
        let lo = bytes.peek().copied().and_then(|n| {
            if n != b'|' && n != b' ' {
                hex_val(n)
            } else {
                None
            }
        });
        match (hi, lo) {
            (Some(hi), Some(lo)) => {
                bytes.next();
                out.push((hi << 4) | lo);
            }
            (Some(hi), None) => out.push(hi),
            // A stray non-hex byte inside a hex run is kept verbatim, the
            // way lenient rule loaders treat it.
            (None, _) => out.push(b),
        }
    }
    out
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Extracts the quoted value following `key`, e.g. `msg:"..."`.
fn extract_quoted<'a>(rule: &'a str, key: &str) -> Option<&'a str> {
    let at = rule.find(key)?;
    let rest = rule[at + key.len()..].trim_start();
    let rest = rest.strip_prefix('"')?;
    let close = rest.find('"')?;
    Some(&rest[..close])
}

fn extract_sid(rule: &str) -> Option<u32> {
    let at = rule.find("sid:")?;
    let rest = rule[at + "sid:".len()..].trim_start();
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
