//! Word shingles and MinHash signatures.

use crate::config::SimilarityConfig;
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::SystemTime;

/// 2^61 - 1, the prime modulus of the permutation family.
const MERSENNE_61: u64 = (1 << 61) - 1;

/// Fixed-width MinHash signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(Vec<u64>);

impl Signature {
    pub fn slots(&self) -> &[u64] {
        &self.0
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// Fraction of equal slots. Signatures of different widths share nothing.
    pub fn jaccard(&self, other: &Signature) -> f64 {
        if self.0.is_empty() || self.0.len() != other.0.len() {
            return 0.0;
        }
        let equal = self.0.iter().zip(&other.0).filter(|(a, b)| a == b).count();
        equal as f64 / self.0.len() as f64
    }
}

impl From<Vec<u64>> for Signature {
    fn from(slots: Vec<u64>) -> Self {
        Signature(slots)
    }
}

/// `width` universal hash permutations `(a*x + b) mod P` with coefficients
/// drawn from the blake3 output stream of the seed.
#[derive(Debug, Clone)]
pub struct MinHasher {
    perms: Vec<(u64, u64)>,
}

impl MinHasher {
    pub fn new(width: usize, seed: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"casefile minhash permutations");
        hasher.update(&seed.to_le_bytes());
        let mut stream = hasher.finalize_xof();
        let mut next = |nonzero: bool| loop {
            let mut buf = [0u8; 8];
            stream.fill(&mut buf);
            let v = u64::from_le_bytes(buf) % MERSENNE_61;
            if !nonzero || v != 0 {
                break v;
            }
        };
        let perms = (0..width).map(|_| (next(true), next(false))).collect();
        Self { perms }
    }

    pub fn width(&self) -> usize {
        self.perms.len()
    }

    /// `None` for an empty shingle set.
    pub fn signature<'a, I>(&self, shingles: I) -> Option<Signature>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut slots = vec![u64::MAX; self.perms.len()];
        let mut seen_any = false;
        for shingle in shingles {
            seen_any = true;
            let x = base_hash(shingle) as u128;
            for (slot, (a, b)) in slots.iter_mut().zip(&self.perms) {
                let h = ((*a as u128 * x + *b as u128) % MERSENNE_61 as u128) as u64;
                if h < *slot {
                    *slot = h;
                }
            }
        }
        seen_any.then_some(Signature(slots))
    }
}

fn base_hash(shingle: &str) -> u64 {
    let digest = blake3::hash(shingle.as_bytes());
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(buf) % MERSENNE_61
}

/// Sliding windows of `k` tokens joined by single spaces.
pub fn shingles(tokens: &[&str], k: usize) -> HashSet<String> {
    if k == 0 || tokens.len() < k {
        return HashSet::new();
    }
    tokens.windows(k).map(|w| w.join(" ")).collect()
}

/// A document as seen by the duplicate finder.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub text: String,
    pub shingles: HashSet<String>,
    pub signature: Signature,
}

/// Turns extracted text into a `DocumentRecord`.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    word: Regex,
    shingle_size: usize,
    hasher: MinHasher,
}

impl Fingerprinter {
    pub fn from_config(cfg: &SimilarityConfig) -> Result<Self> {
        let word = Regex::new(r"\w+").map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            word,
            shingle_size: cfg.shingle_size,
            hasher: MinHasher::new(cfg.signature_width, cfg.seed),
        })
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.word
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    pub fn shingles(&self, text: &str) -> HashSet<String> {
        let tokens = self.tokenize(text);
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        shingles(&refs, self.shingle_size)
    }

    pub fn signature(&self, shingles: &HashSet<String>) -> Option<Signature> {
        self.hasher.signature(shingles)
    }

    /// `None` when the text is too short to yield a single shingle.
    pub fn fingerprint(
        &self,
        path: PathBuf,
        modified: SystemTime,
        text: String,
    ) -> Option<DocumentRecord> {
        let shingles = self.shingles(&text);
        let signature = self.signature(&shingles)?;
        Some(DocumentRecord {
            path,
            modified,
            text,
            shingles,
            signature,
        })
    }
}

/// Exact Jaccard similarity of two shingle sets.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    inter as f64 / union as f64
}
