use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use reactive_models::operators::{map_to_value, where_field};
use reactive_models::{FieldSpec, FieldType, Model, ModelSchema, Registry};

fn make_model(registry: &Registry) -> Model {
    let schema = ModelSchema::builder("Counter")
        .field(FieldSpec::new("value", FieldType::Int).default_value(0))
        .field(FieldSpec::new("label", FieldType::String).default_value(""))
        .build()
        .unwrap();
    registry.register_model_type(schema).unwrap().create_default().unwrap()
}

fn bench_set_unobserved(c: &mut Criterion) {
    let registry = Registry::new();
    let counter = make_model(&registry);
    let mut next = 0i64;

    c.bench_function("emit/set_unobserved", |b| {
        b.iter(|| {
            next += 1;
            counter.set("value", black_box(next)).unwrap();
        });
    });
}

fn bench_set_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit/set_fanout");
    group.throughput(Throughput::Elements(1));

    for subscribers in [1usize, 8, 64] {
        let registry = Registry::new();
        let counter = make_model(&registry);
        let model_type = counter.model_type().clone();

        // Half field-scoped, half instance-scoped, all filtering the same emission.
        let mut subs = Vec::with_capacity(subscribers);
        for i in 0..subscribers {
            let sub = if i % 2 == 0 {
                model_type.observe_field("value").unwrap().subscribe(|e| {
                    black_box(e);
                })
            } else {
                counter.observe_instance().subscribe(|e| {
                    black_box(e);
                })
            };
            subs.push(sub);
        }

        let mut next = 0i64;
        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &subscribers, |b, _| {
            b.iter(|| {
                next += 1;
                counter.set("value", black_box(next)).unwrap();
            });
        });
        drop(subs);
    }
    group.finish();
}

fn bench_operator_chain(c: &mut Criterion) {
    let registry = Registry::new();
    let counter = make_model(&registry);
    let _sub = counter
        .model_type()
        .observe_model()
        .pipe(where_field("value"))
        .pipe(map_to_value())
        .subscribe(|v| {
            black_box(v);
        });
    let mut next = 0i64;

    c.bench_function("emit/operator_chain", |b| {
        b.iter(|| {
            next += 1;
            counter.set("value", black_box(next)).unwrap();
        });
    });
}

criterion_group!(benches, bench_set_unobserved, bench_set_fanout, bench_operator_chain);
criterion_main!(benches);
