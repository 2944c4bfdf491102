use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reify_core::mop::name_codec;
use reify_core::runtime::{MethodBuilder, TypeBuilder};
use reify_core::{Reifier, StubFactory, SynchronousDispatcher, TargetType, TypeRegistry, Value};

fn registry() -> Arc<TypeRegistry> {
    let registry = Arc::new(TypeRegistry::new());
    registry
        .define(
            TypeBuilder::class("bench.Service")
                .method(MethodBuilder::new("ping").returns("int").body(|_, _| Ok(Value::Int(1))))
                .method(MethodBuilder::new("name").returns("String").cached()),
        )
        .unwrap();
    registry
        .define(
            TypeBuilder::class("bench.Pair")
                .type_param("A")
                .type_param("B")
                .method(MethodBuilder::new("first").returns("A")),
        )
        .unwrap();
    registry
}

fn bench_get_or_create(c: &mut Criterion) {
    let factory = StubFactory::new(registry());
    let plain = TargetType::plain("bench.Service");
    let generic = TargetType::new("bench.Pair", &["String", "Integer"]);
    factory.get_or_create(&plain).unwrap();
    factory.get_or_create(&generic).unwrap();

    let mut group = c.benchmark_group("get_or_create");
    for target in [&plain, &generic] {
        group.bench_with_input(BenchmarkId::new("cached", target), target, |b, target| {
            b.iter(|| factory.get_or_create(black_box(target)).unwrap());
        });
    }
    group.finish();
}

fn bench_name_codec(c: &mut Criterion) {
    let target = TargetType::new("bench.Pair", &["String", "java_like.Name"]);
    let encoded = name_codec::encode(&target);

    c.bench_function("encode_generic", |b| {
        b.iter(|| name_codec::encode(black_box(&target)));
    });
    c.bench_function("decode_generic", |b| {
        b.iter(|| name_codec::decode(black_box(&encoded)).unwrap());
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let reifier = Reifier::with_registry(registry());
    let stub = reifier
        .create_reified_instance("bench.Service", &[], &[], SynchronousDispatcher::NAME, &[])
        .unwrap();
    reifier.invoke(&stub, "ping", &[]).unwrap();

    c.bench_function("dispatch_sync", |b| {
        b.iter(|| reifier.invoke(black_box(&stub), "ping", &[]).unwrap());
    });
    c.bench_function("dispatch_memoized", |b| {
        b.iter(|| reifier.invoke(black_box(&stub), "name", &[]).unwrap());
    });
}

criterion_group!(benches, bench_get_or_create, bench_name_codec, bench_dispatch);
criterion_main!(benches);
