use audit_log::AuditLog;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use serde_json::json;

fn bench_append(c: &mut Criterion) {
    c.bench_function("append_chained_jsonl", |b| {
        b.iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().join("audit.jsonl");
                let log = AuditLog::open("bench-salt", &path).unwrap();
                (dir, log)
            },
            |(_dir, log)| {
                let _ = log.log_decision(
                    Some("org"),
                    "RULE",
                    "ALLOW",
                    None,
                    &json!({"message": "benchmark payload", "purpose": "bench"}),
                    &[],
                );
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("append_chained_memory", |b| {
        let log = AuditLog::in_memory("bench-salt");
        b.iter(|| {
            let _ = log.log_decision(None, "RULE", "ALLOW", None, &json!({"n": 1}), &[]);
        })
    });
}

criterion_group!(benches, bench_append);
criterion_main!(benches);
