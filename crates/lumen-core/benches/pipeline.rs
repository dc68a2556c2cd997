//! Benchmarks for the Lumen operations and decode stage.
//!
//! Run with: cargo bench -p lumen-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use lumen_core::config::{Config, LimitsConfig};
use lumen_core::operation::{OperationKind, OperationRegistry};

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

fn benchmark_operations(c: &mut Criterion) {
    let registry = OperationRegistry::new();
    let config = Config::default();
    let img = gradient(512, 512);

    for kind in registry.kinds() {
        let params = registry
            .resolve(*kind, &config.operations.params_for(*kind))
            .unwrap();
        c.bench_function(&format!("{}_512px", kind), |b| {
            b.iter(|| {
                let _ = registry.apply(black_box(&params), black_box(&img));
            })
        });
    }
}

fn benchmark_decode(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.png");
    gradient(1024, 768).save(&path).unwrap();

    let decoder = lumen_core::pipeline::ImageDecoder::new(LimitsConfig::default());
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("decode_png_1024", |b| {
        b.iter(|| {
            let _ = rt.block_on(decoder.decode(black_box(&path)));
        })
    });
}

fn benchmark_rotate_arbitrary(c: &mut Criterion) {
    let registry = OperationRegistry::new();
    let img = gradient(1024, 768);
    let mut named = lumen_core::operation::NamedParams::new();
    named.insert(
        "angle".to_string(),
        lumen_core::operation::ParamValue::Number(30.0),
    );
    let params = registry.resolve(OperationKind::Rotate, &named).unwrap();

    c.bench_function("rotate_30deg_1024", |b| {
        b.iter(|| {
            let _ = registry.apply(black_box(&params), black_box(&img));
        })
    });
}

criterion_group!(
    benches,
    benchmark_operations,
    benchmark_decode,
    benchmark_rotate_arbitrary,
);
criterion_main!(benches);
