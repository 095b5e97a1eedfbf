use engine::persist::{load_meta, load_snapshot, save_snapshot, SnapshotPaths, SNAPSHOT_VERSION};
use engine::{EngineConfig, HybridIndex, QueryCategory};
use std::collections::HashMap;
use tempfile::tempdir;

fn sample_index() -> HybridIndex {
    let index = HybridIndex::new(3, EngineConfig::default());
    index
        .upsert(
            "ga151",
            "Die 12 Weltanschauungen nach Rudolf Steiner",
            vec![0.1, 0.2, 0.3],
            HashMap::from([("category".to_string(), "Realismus".to_string())]),
        )
        .unwrap();
    index
        .upsert(
            "garten",
            "Pflanzen und ihre Ernährung im Garten",
            vec![0.9, 0.1, 0.0],
            HashMap::new(),
        )
        .unwrap();
    index
}

#[test]
fn snapshot_round_trip_preserves_ranking() {
    let dir = tempdir().unwrap();
    let paths = SnapshotPaths::new(dir.path());
    let index = sample_index();
    save_snapshot(&paths, &index, "2026-08-29T00:00:00Z".into()).unwrap();

    let restored = load_snapshot(&paths, EngineConfig::default()).unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(restored.dimension(), 3);
    assert_eq!(restored.vocabulary_size(), index.vocabulary_size());
    assert_eq!(restored.avg_passage_len(), index.avg_passage_len());

    let query = ("zwölf Weltanschauungen", vec![0.1, 0.2, 0.3]);
    let before = index.query(query.0, &query.1, Some(0.5), 5, None).unwrap();
    let after = restored.query(query.0, &query.1, Some(0.5), 5, None).unwrap();
    let pairs = |hits: &[engine::QueryHit]| {
        hits.iter()
            .map(|h| (h.id.clone(), h.score))
            .collect::<Vec<_>>()
    };
    assert_eq!(pairs(&before), pairs(&after));
}

#[test]
fn meta_file_describes_snapshot() {
    let dir = tempdir().unwrap();
    let paths = SnapshotPaths::new(dir.path());
    save_snapshot(&paths, &sample_index(), "2026-08-29T00:00:00Z".into()).unwrap();

    let meta = load_meta(&paths).unwrap();
    assert_eq!(meta.num_passages, 2);
    assert_eq!(meta.dimension, 3);
    assert_eq!(meta.version, SNAPSHOT_VERSION);
    assert_eq!(meta.created_at, "2026-08-29T00:00:00Z");
}

#[test]
fn tuned_profile_survives_restart() {
    let dir = tempdir().unwrap();
    let paths = SnapshotPaths::new(dir.path());
    let index = sample_index();
    index.apply_tuned_alphas(&std::collections::BTreeMap::from([(
        QueryCategory::ContainsDigit,
        0.6,
    )]));
    save_snapshot(&paths, &index, "2026-08-29T00:00:00Z".into()).unwrap();

    let restored = load_snapshot(&paths, EngineConfig::default()).unwrap();
    assert_eq!(
        restored.alpha_profile().alpha_for(QueryCategory::ContainsDigit),
        0.6
    );
}
