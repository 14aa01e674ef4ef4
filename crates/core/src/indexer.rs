//! LSH banding index over MinHash signatures.

use crate::config::SimilarityConfig;
use crate::shingle::Signature;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("id is already indexed")]
    DuplicateId,
    #[error("signature has {found} slots, index expects {expected}")]
    WidthMismatch { expected: usize, found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LshParams {
    pub bands: usize,
    pub rows: usize,
}

/// Probability that two signatures with Jaccard `s` share at least one band.
pub fn collision_probability(s: f64, bands: usize, rows: usize) -> f64 {
    1.0 - (1.0 - s.powi(rows as i32)).powi(bands as i32)
}

/// Area under the collision curve below the threshold.
fn false_positive_area(threshold: f64, bands: usize, rows: usize) -> f64 {
    const STEPS: usize = 1000;
    let dx = threshold / STEPS as f64;
    (0..STEPS)
        .map(|i| {
            let x0 = i as f64 * dx;
            let x1 = x0 + dx;
            (collision_probability(x0, bands, rows) + collision_probability(x1, bands, rows)) * dx
                / 2.0
        })
        .sum()
}

impl LshParams {
    /// Among every `rows` in `1..=width` with `bands = width / rows`, keeps
    /// those that catch pairs at `threshold` with at least `target_recall`
    /// and picks the one with the least false-positive area. When none
    /// reaches the target, the highest-recall choice wins.
    pub fn for_threshold(width: usize, threshold: f64, target_recall: f64) -> Self {
        let mut best: Option<(f64, LshParams)> = None;
        let mut best_recall = LshParams { bands: width.max(1), rows: 1 };
        let mut best_recall_p = f64::MIN;
        for rows in 1..=width {
            let bands = width / rows;
            let p = collision_probability(threshold, bands, rows);
            let params = LshParams { bands, rows };
            if p > best_recall_p {
                best_recall_p = p;
                best_recall = params;
            }
            if p < target_recall {
                continue;
            }
            let area = false_positive_area(threshold, bands, rows);
            if best.map_or(true, |(a, _)| area < a) {
                best = Some((area, params));
            }
        }
        best.map(|(_, p)| p).unwrap_or(best_recall)
    }

    pub fn from_config(cfg: &SimilarityConfig) -> Self {
        match (cfg.bands, cfg.rows) {
            (Some(bands), Some(rows)) => LshParams { bands, rows },
            _ => Self::for_threshold(cfg.signature_width, cfg.content_threshold, cfg.target_recall),
        }
    }
}

/// Insert-only; ids are never removed.
#[derive(Debug)]
pub struct SimilarityIndex<K> {
    params: LshParams,
    width: usize,
    tables: Vec<HashMap<Box<[u64]>, Vec<K>>>,
    signatures: HashMap<K, Signature>,
}

impl<K: Clone + Eq + Hash> SimilarityIndex<K> {
    pub fn new(width: usize, params: LshParams) -> Self {
        Self {
            params,
            width,
            tables: (0..params.bands).map(|_| HashMap::new()).collect(),
            signatures: HashMap::new(),
        }
    }

    pub fn params(&self) -> LshParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn insert(&mut self, id: K, signature: Signature) -> Result<(), IndexError> {
        self.check_width(&signature)?;
        if self.signatures.contains_key(&id) {
            return Err(IndexError::DuplicateId);
        }
        for (table, band) in self.tables.iter_mut().zip(bands(&signature, self.params)) {
            table.entry(band.into()).or_default().push(id.clone());
        }
        self.signatures.insert(id, signature);
        Ok(())
    }

    /// Every id sharing at least one band bucket with `signature`.
    pub fn query(&self, signature: &Signature) -> Result<HashSet<K>, IndexError> {
        self.check_width(signature)?;
        let mut found = HashSet::new();
        for (table, band) in self.tables.iter().zip(bands(signature, self.params)) {
            if let Some(ids) = table.get(band) {
                found.extend(ids.iter().cloned());
            }
        }
        Ok(found)
    }

    /// Candidates of an indexed id, never including the id itself.
    pub fn candidates(&self, id: &K) -> HashSet<K> {
        let Some(signature) = self.signatures.get(id) else {
            return HashSet::new();
        };
        let mut found = self.query(signature).unwrap_or_default();
        found.remove(id);
        found
    }

    fn check_width(&self, signature: &Signature) -> Result<(), IndexError> {
        if signature.width() != self.width {
            return Err(IndexError::WidthMismatch {
                expected: self.width,
                found: signature.width(),
            });
        }
        Ok(())
    }
}

fn bands(signature: &Signature, params: LshParams) -> impl Iterator<Item = &[u64]> {
    signature
        .slots()
        .chunks_exact(params.rows)
        .take(params.bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shingle::MinHasher;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn default_params_reach_target_recall() {
        let params = LshParams::for_threshold(128, 0.95, 0.999);
        assert_eq!(params, LshParams { bands: 10, rows: 12 });
        assert!(collision_probability(0.95, params.bands, params.rows) >= 0.999);
        assert!(collision_probability(0.5, params.bands, params.rows) < 0.01);
    }

    #[test]
    fn explicit_bands_override_derivation() {
        let cfg = SimilarityConfig {
            bands: Some(16),
            rows: Some(8),
            ..SimilarityConfig::default()
        };
        assert_eq!(LshParams::from_config(&cfg), LshParams { bands: 16, rows: 8 });
    }

    #[test]
    fn unreachable_recall_falls_back_to_best_available() {
        let params = LshParams::for_threshold(4, 0.3, 0.9999);
        assert_eq!(params, LshParams { bands: 4, rows: 1 });
    }

    #[test]
    fn rejects_duplicates_and_wrong_width() {
        let mut index = SimilarityIndex::new(4, LshParams { bands: 2, rows: 2 });
        index.insert("a", Signature::from(vec![1, 2, 3, 4])).unwrap();
        assert_eq!(
            index.insert("a", Signature::from(vec![1, 2, 3, 4])),
            Err(IndexError::DuplicateId)
        );
        assert_eq!(
            index.insert("b", Signature::from(vec![1, 2, 3])),
            Err(IndexError::WidthMismatch { expected: 4, found: 3 })
        );
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn candidates_share_a_band_and_exclude_self() {
        let mut index = SimilarityIndex::new(4, LshParams { bands: 2, rows: 2 });
        index.insert("a", Signature::from(vec![1, 2, 3, 4])).unwrap();
        index.insert("b", Signature::from(vec![9, 9, 3, 4])).unwrap();
        index.insert("c", Signature::from(vec![1, 9, 9, 4])).unwrap();
        assert_eq!(index.candidates(&"a"), HashSet::from(["b"]));
        assert_eq!(index.candidates(&"c"), HashSet::new());
        assert_eq!(index.candidates(&"missing"), HashSet::new());
        assert_eq!(
            index.query(&Signature::from(vec![1, 2, 0, 0])).unwrap(),
            HashSet::from(["a"])
        );
    }

    fn shingle_set(tokens: &[u32]) -> Vec<String> {
        tokens
            .windows(5)
            .map(|w| w.iter().map(u32::to_string).collect::<Vec<_>>().join(" "))
            .collect()
    }

    #[test]
    fn near_duplicates_are_found_with_high_recall() {
        let params = LshParams::for_threshold(128, 0.95, 0.999);
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 200;
        let mut found = 0;
        for trial in 0..trials {
            let hasher = MinHasher::new(128, trial);
            let original: Vec<u32> = (0..2000).map(|_| rng.gen()).collect();
            let mut edited = original.clone();
            // eight spread-out substitutions keep Jaccard near 0.96
            for i in 0..8 {
                edited[100 + i * 230] = rng.gen();
            }
            let a = hasher.signature(&shingle_set(&original)).unwrap();
            let b = hasher.signature(&shingle_set(&edited)).unwrap();
            let mut index = SimilarityIndex::new(128, params);
            index.insert(0u8, a).unwrap();
            index.insert(1u8, b).unwrap();
            if index.candidates(&0).contains(&1) {
                found += 1;
            }
        }
        let recall = found as f64 / trials as f64;
        assert!(recall >= 0.99, "recall {recall}");
    }
}
