//! Signature records and the canonical set container.
//!
//! Purpose: hold the literal byte patterns extracted from a ruleset, together
//! with their per-pattern flags, in the shape every engine preprocesses from.
//!
//! # Invariants
//! - A built set is nonempty and every signature has length >= 1.
//! - `Signature::id` equals the signature's position in the set.
//! - Pattern bytes are retained verbatim; no case folding happens at build
//!   time. Engines fold at compare time according to each pattern's `nocase`.

use crate::errors::BuildError;

/// Hard cap on signatures per set.
///
/// Engines pack pattern ids into `u32`/`i32` chain links; the cap keeps those
/// representations comfortably in range.
pub const MAX_SIGNATURES: usize = 1 << 24;

/// Opaque rule metadata carried through to match reporting, untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureMeta {
    /// `msg:"..."` text from the originating rule.
    pub msg: Option<Box<str>>,
    /// `sid:<n>` from the originating rule.
    pub sid: Option<u32>,
    /// The raw rule line the signature was extracted from.
    pub rule: Option<Box<str>>,
}

/// Input record for [`SignatureSet::build`].
#[derive(Clone, Debug)]
pub struct SignatureSpec {
    pub bytes: Vec<u8>,
    pub nocase: bool,
    pub meta: Option<SignatureMeta>,
}

impl SignatureSpec {
    /// A case-sensitive literal with no metadata.
    pub fn literal(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            nocase: false,
            meta: None,
        }
    }

    /// Marks the literal as case-insensitive.
    pub fn nocase(mut self) -> Self {
        self.nocase = true;
        self
    }

    /// Attaches rule metadata.
    pub fn with_meta(mut self, meta: SignatureMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// One immutable literal signature.
///
/// Bytes are arbitrary, not restricted to printable text. When `nocase` is
/// set, compares fold both sides; folding applies only to ASCII letters.
#[derive(Clone, Debug)]
pub struct Signature {
    bytes: Box<[u8]>,
    nocase: bool,
    id: u32,
    meta: Option<SignatureMeta>,
}

impl Signature {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        false // length >= 1 is enforced at build time
    }

    pub fn nocase(&self) -> bool {
        self.nocase
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn meta(&self) -> Option<&SignatureMeta> {
        self.meta.as_ref()
    }
}

/// Ordered, validated collection of signatures.
///
/// Built once per ruleset and shared read-only by every engine. Length
/// aggregates are precomputed here because the Wu-Manber block-size heuristic
/// and the Set-Horspool window both derive from them.
#[derive(Clone, Debug)]
pub struct SignatureSet {
    sigs: Vec<Signature>,
    min_len: usize,
    max_len: usize,
    avg_len: f64,
}

impl SignatureSet {
    /// Validates the specs and builds the set.
    ///
    /// # Errors
    /// - [`BuildError::EmptySet`] when no specs are given.
    /// - [`BuildError::BadSignature`] for a zero-length pattern.
    /// - [`BuildError::TooManySignatures`] past [`MAX_SIGNATURES`].
    pub fn build(specs: impl IntoIterator<Item = SignatureSpec>) -> Result<Self, BuildError> {
        let specs: Vec<SignatureSpec> = specs.into_iter().collect();
        if specs.is_empty() {
            return Err(BuildError::EmptySet);
        }
        if specs.len() > MAX_SIGNATURES {
            return Err(BuildError::TooManySignatures {
                count: specs.len(),
                max: MAX_SIGNATURES,
            });
        }

        let mut sigs = Vec::with_capacity(specs.len());
        let mut min_len = usize::MAX;
        let mut max_len = 0usize;
        let mut total = 0u64;
        for (id, spec) in specs.into_iter().enumerate() {
            if spec.bytes.is_empty() {
                return Err(BuildError::BadSignature { id: id as u32 });
            }
            min_len = min_len.min(spec.bytes.len());
            max_len = max_len.max(spec.bytes.len());
            total += spec.bytes.len() as u64;
            sigs.push(Signature {
                bytes: spec.bytes.into_boxed_slice(),
                nocase: spec.nocase,
                id: id as u32,
                meta: spec.meta,
            });
        }

        let avg_len = total as f64 / sigs.len() as f64;
        Ok(Self {
            sigs,
            min_len,
            max_len,
            avg_len,
        })
    }

    pub fn len(&self) -> usize {
        self.sigs.len()
    }

    pub fn is_empty(&self) -> bool {
        false // nonempty by construction
    }

    pub fn get(&self, pid: u32) -> &Signature {
        &self.sigs[pid as usize]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signature> {
        self.sigs.iter()
    }

    /// Length of the shortest signature; the scan window for WM and SH.
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn avg_len(&self) -> f64 {
        self.avg_len
    }

    /// True when every signature is case-insensitive.
    pub fn all_nocase(&self) -> bool {
        self.sigs.iter().all(|s| s.nocase)
    }

    /// True when every signature is case-sensitive.
    pub fn all_case_sensitive(&self) -> bool {
        self.sigs.iter().all(|s| !s.nocase)
    }
}

impl<'a> IntoIterator for &'a SignatureSet {
    type Item = &'a Signature;
    type IntoIter = std::slice::Iter<'a, Signature>;

    fn into_iter(self) -> Self::IntoIter {
        self.sigs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_computes_length_aggregates() {
        let set = SignatureSet::build([
            SignatureSpec::literal("he"),
            SignatureSpec::literal("hers"),
            SignatureSpec::literal("she"),
        ])
        .unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.min_len(), 2);
        assert_eq!(set.max_len(), 4);
        assert!((set.avg_len() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ids_match_positions() {
        let set = SignatureSet::build([
            SignatureSpec::literal("a0"),
            SignatureSpec::literal("b1"),
        ])
        .unwrap();
        for (i, sig) in set.iter().enumerate() {
            assert_eq!(sig.id() as usize, i);
        }
    }

    #[test]
    fn rejects_empty_set() {
        let err = SignatureSet::build(std::iter::empty::<SignatureSpec>()).unwrap_err();
        assert_eq!(err, BuildError::EmptySet);
    }

    #[test]
    fn rejects_zero_length_signature() {
        let err = SignatureSet::build([
            SignatureSpec::literal("ok"),
            SignatureSpec::literal(Vec::new()),
        ])
        .unwrap_err();
        assert_eq!(err, BuildError::BadSignature { id: 1 });
    }

    #[test]
    fn retains_bytes_verbatim() {
        let set = SignatureSet::build([SignatureSpec::literal(vec![0x00, 0xff, 0x41]).nocase()])
            .unwrap();
        assert_eq!(set.get(0).bytes(), &[0x00, 0xff, 0x41]);
        assert!(set.get(0).nocase());
    }
}
