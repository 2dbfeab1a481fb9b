use criterion::{criterion_group, criterion_main, Criterion};

use study_flow::{decode_payload, encode_payload, RatingMap, StudyPayload, Timing};

fn sample_payload() -> StudyPayload {
    let categories: Vec<String> = (0..24).map(|i| format!("category_{i:02}")).collect();
    let mut ratings = RatingMap::with_buckets(["appropriateness", "cringe"]);
    for (i, key) in categories.iter().enumerate() {
        ratings = ratings.merge("appropriateness", key, (i % 7) as i64 + 1);
        ratings = ratings.merge("cringe", key, (i % 5) as i64 + 1);
    }
    StudyPayload {
        pid: "P-0001-Zoë".into(),
        cond: "0,3".into(),
        dv_order: vec!["cringe".into(), "appropriateness".into()],
        block1_category_order: categories.clone(),
        block2_category_order: categories.into_iter().rev().collect(),
        ratings,
        timing: Timing {
            total_ms: 612_000,
            block1_ms: 240_500,
            block2_ms: 198_250,
        },
        completed: true,
        age: Some("29".into()),
        gender: Some("Prefer not to say".into()),
    }
}

fn bench_codec(c: &mut Criterion) {
    let payload = sample_payload();
    let encoded = encode_payload(&payload).unwrap();

    c.bench_function("encode_payload_24x2", |b| {
        b.iter(|| encode_payload(&payload).unwrap())
    });
    c.bench_function("decode_payload_24x2", |b| {
        b.iter(|| decode_payload(&encoded).unwrap())
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
