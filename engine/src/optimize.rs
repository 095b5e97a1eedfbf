use crate::classify::QueryCategory;
use crate::error::EngineError;
use crate::index::HybridIndex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// A ground-truth retrieval example for alpha tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledQuery {
    pub text: String,
    pub dense: Vec<f32>,
    pub expected_id: String,
    pub category: QueryCategory,
}

/// Evenly spaced alpha candidates over [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlphaGrid {
    pub step: f32,
}

impl Default for AlphaGrid {
    fn default() -> Self {
        Self { step: 0.1 }
    }
}

impl AlphaGrid {
    pub fn new(step: f32) -> Self {
        Self {
            step: step.clamp(0.01, 1.0),
        }
    }

    pub fn values(&self) -> Vec<f32> {
        let steps = (1.0 / self.step).round() as u32;
        (0..=steps)
            .map(|i| ((i as f32 * self.step) * 1000.0).round() / 1000.0)
            .map(|a| a.min(1.0))
            .collect()
    }
}

/// Offline grid search for the best per-category fusion weight.
///
/// For every grid alpha, each labeled query is run against the index and the
/// rank of its expected passage recorded (a miss counts as `top_k + 1`). Per
/// category, the alpha with the lowest mean rank wins; ties prefer the alpha
/// nearest 0.5, the prior that balanced fusion generalizes best. Not meant
/// for the request path.
pub struct AlphaOptimizer {
    grid: AlphaGrid,
    top_k: usize,
}

impl Default for AlphaOptimizer {
    fn default() -> Self {
        Self {
            grid: AlphaGrid::default(),
            top_k: 10,
        }
    }
}

impl AlphaOptimizer {
    pub fn new(grid: AlphaGrid, top_k: usize) -> Self {
        Self {
            grid,
            top_k: top_k.max(1),
        }
    }

    pub fn optimize(
        &self,
        labeled: &[LabeledQuery],
        index: &HybridIndex,
    ) -> Result<BTreeMap<QueryCategory, f32>, EngineError> {
        if labeled.is_empty() {
            return Ok(BTreeMap::new());
        }
        let alphas = self.grid.values();
        let penalty = (self.top_k + 1) as u32;

        // Embarrassingly parallel over (alpha, query) pairs; queries never
        // mutate the index, so the scan is safe to fan out.
        let evaluations: Result<Vec<(f32, Vec<(QueryCategory, u32)>)>, EngineError> = alphas
            .par_iter()
            .map(|&alpha| {
                let ranks = labeled
                    .iter()
                    .map(|query| {
                        let hits =
                            index.query(&query.text, &query.dense, Some(alpha), self.top_k, None)?;
                        let rank = hits
                            .iter()
                            .position(|h| h.id == query.expected_id)
                            .map_or(penalty, |p| p as u32 + 1);
                        Ok((query.category, rank))
                    })
                    .collect::<Result<Vec<_>, EngineError>>()?;
                Ok((alpha, ranks))
            })
            .collect();
        let evaluations = evaluations?;

        // category -> (best alpha so far, its mean rank)
        let mut best: BTreeMap<QueryCategory, (f32, f32)> = BTreeMap::new();
        for (alpha, ranks) in &evaluations {
            let mut per_category: BTreeMap<QueryCategory, (u32, u32)> = BTreeMap::new();
            for &(category, rank) in ranks {
                let entry = per_category.entry(category).or_insert((0, 0));
                entry.0 += rank;
                entry.1 += 1;
            }
            for (category, (sum, count)) in per_category {
                let mean = sum as f32 / count as f32;
                let candidate = (*alpha, mean);
                best.entry(category)
                    .and_modify(|cur| {
                        if prefer(candidate, *cur) {
                            *cur = candidate;
                        }
                    })
                    .or_insert(candidate);
            }
        }

        let result: BTreeMap<QueryCategory, f32> =
            best.into_iter().map(|(c, (alpha, _))| (c, alpha)).collect();
        for (category, alpha) in &result {
            info!(%category, alpha, "optimized fusion weight");
        }
        Ok(result)
    }
}

// Lower mean rank wins; near-equal means prefer the alpha closest to 0.5.
fn prefer(candidate: (f32, f32), current: (f32, f32)) -> bool {
    let (cand_alpha, cand_mean) = candidate;
    let (cur_alpha, cur_mean) = current;
    if (cand_mean - cur_mean).abs() < 1e-6 {
        (cand_alpha - 0.5).abs() < (cur_alpha - 0.5).abs()
    } else {
        cand_mean < cur_mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_covers_unit_interval() {
        let values = AlphaGrid::default().values();
        assert_eq!(values.len(), 11);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[10], 1.0);
        assert!((values[6] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn coarse_grid() {
        let values = AlphaGrid::new(0.5).values();
        assert_eq!(values, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn tie_prefers_balanced_alpha() {
        assert!(prefer((0.5, 2.0), (0.9, 2.0)));
        assert!(!prefer((0.9, 2.0), (0.5, 2.0)));
        assert!(prefer((0.9, 1.0), (0.5, 2.0)));
    }
}
