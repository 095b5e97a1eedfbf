use criterion::{criterion_group, criterion_main, Criterion};
use engine::{Normalizer, NormalizerConfig};

const SAMPLE: &str = "Der menschliche und der kosmische Gedanke: es gibt zwölf \
Weltanschauungen, nämlich Materialismus, Spiritualismus, Realismus, Idealismus, \
Mathematismus, Rationalismus, Psychismus, Pneumatismus, Monadismus, Dynamismus, \
Phänomenalismus und Sensualismus. Diese 12 Weltanschauungen stehen im Tierkreis \
der Begriffe einander gegenüber, und die Erkenntnistheorie hat siebenundzwanzig \
weitere Nuancen zu unterscheiden.";

fn bench_normalize(c: &mut Criterion) {
    let normalizer = Normalizer::new(NormalizerConfig::default());
    c.bench_function("normalize_sample", |b| {
        b.iter(|| normalizer.normalize(SAMPLE))
    });
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
