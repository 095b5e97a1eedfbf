use engine::{
    AlphaGrid, AlphaOptimizer, EngineConfig, HybridIndex, LabeledQuery, QueryCategory,
};
use std::collections::HashMap;

/// Synthetic corpus engineered so the labeled queries rank their expected
/// passage first only around alpha 0.6: a lexical distractor dominates the
/// sparse signal below that band and a semantic distractor dominates the
/// dense signal above it.
///
/// With the query tokens [12 (OOV), weltanschauungen, gedanke]:
/// - "exp" shares one term (weltanschauungen, df 2) and has rescaled dense
///   similarity 0.765 against the query vector [1, 0];
/// - "lex" shares both in-vocabulary terms (dense similarity 0.1);
/// - "sem" shares none but has dense similarity ~0.866.
/// The crossover points land near alpha 0.55 and 0.65, so 0.6 is the only
/// grid point where "exp" is rank 1.
fn tuned_index() -> HybridIndex {
    let index = HybridIndex::new(2, EngineConfig::default());
    index
        .upsert(
            "exp",
            "Steiner Weltanschauungen",
            vec![0.53, 0.848],
            HashMap::new(),
        )
        .unwrap();
    index
        .upsert(
            "lex",
            "Weltanschauungen Gedanke",
            vec![-0.8, 0.6],
            HashMap::new(),
        )
        .unwrap();
    index
        .upsert(
            "sem",
            "Musik Geschichte",
            vec![0.7314, 0.6819],
            HashMap::new(),
        )
        .unwrap();
    index
}

#[test]
fn optimizer_recovers_planted_alpha() {
    let index = tuned_index();
    let labeled: Vec<LabeledQuery> = (0..10)
        .map(|_| LabeledQuery {
            text: "Die 12 Weltanschauungen Gedanke".to_string(),
            dense: vec![1.0, 0.0],
            expected_id: "exp".to_string(),
            category: QueryCategory::ContainsDigit,
        })
        .collect();
    let optimizer = AlphaOptimizer::new(AlphaGrid::default(), 10);
    let tuned = optimizer.optimize(&labeled, &index).unwrap();
    let alpha = tuned[&QueryCategory::ContainsDigit];
    // within one grid step of the planted optimum
    assert!(
        (alpha - 0.6).abs() < 0.1001,
        "expected alpha near 0.6, got {alpha}"
    );
    assert_eq!(tuned.len(), 1, "only the labeled category is tuned");
}

#[test]
fn tuned_alphas_feed_the_serving_profile() {
    let index = tuned_index();
    let labeled = vec![LabeledQuery {
        text: "Die 12 Weltanschauungen Gedanke".to_string(),
        dense: vec![1.0, 0.0],
        expected_id: "exp".to_string(),
        category: QueryCategory::ContainsDigit,
    }];
    let tuned = AlphaOptimizer::default().optimize(&labeled, &index).unwrap();
    index.apply_tuned_alphas(&tuned);
    let profile = index.alpha_profile();
    assert_eq!(
        profile.alpha_for(QueryCategory::ContainsDigit),
        tuned[&QueryCategory::ContainsDigit]
    );
    // untouched categories keep their priors
    assert_eq!(profile.alpha_for(QueryCategory::ConceptMatch), 0.7);
}

#[test]
fn no_labeled_queries_means_no_recommendations() {
    let index = tuned_index();
    let tuned = AlphaOptimizer::default().optimize(&[], &index).unwrap();
    assert!(tuned.is_empty());
}

#[test]
fn missing_expected_id_uses_penalty_rank() {
    // the expected id never appears, so every alpha has the same mean rank
    // and the tie-break settles on the most balanced alpha
    let index = tuned_index();
    let labeled = vec![LabeledQuery {
        text: "Die 12 Weltanschauungen Gedanke".to_string(),
        dense: vec![1.0, 0.0],
        expected_id: "nicht-vorhanden".to_string(),
        category: QueryCategory::General,
    }];
    let tuned = AlphaOptimizer::default().optimize(&labeled, &index).unwrap();
    assert_eq!(tuned[&QueryCategory::General], 0.5);
}
