//! Build-time error taxonomy for signature sets and engines.
//!
//! Errors are surfaced when a set or an engine is built; scans themselves are
//! infallible and malformed input is benign ("no match"). The enum is
//! `#[non_exhaustive]` so new failure modes can be added without breaking
//! callers; consumers should include a fallback match arm.

use std::fmt;

/// Errors from building a [`crate::SignatureSet`] or an engine on top of one.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    /// The signature set is empty.
    EmptySet,
    /// A signature has zero length.
    BadSignature { id: u32 },
    /// The set exceeds the implementation limit on signature count.
    TooManySignatures { count: usize, max: usize },
    /// A signature is shorter than the engine's block size.
    ///
    /// Wu-Manber keys its shift and hash tables on `B`-byte blocks; a pattern
    /// shorter than `B` has no full block and cannot be located soundly.
    PatternShorterThanBlock { id: u32, len: usize, block: usize },
    /// Table allocation failed. Fatal for that engine only.
    Allocation { bytes: usize },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySet => write!(f, "signature set is empty"),
            Self::BadSignature { id } => write!(f, "signature {id} has zero length"),
            Self::TooManySignatures { count, max } => {
                write!(f, "too many signatures: {count} (max: {max})")
            }
            Self::PatternShorterThanBlock { id, len, block } => {
                write!(
                    f,
                    "signature {id} is {len} bytes, shorter than block size {block}"
                )
            }
            Self::Allocation { bytes } => {
                write!(f, "table allocation of {bytes} bytes failed")
            }
        }
    }
}

impl std::error::Error for BuildError {}
