//! Benchmarks for the stream filters.
//!
//! These target the hot path of stream generation: encode chains pushing
//! into a memory sink and decode chains pulling from a memory source, at
//! payload sizes typical for content streams and images.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use orinoco_core::{
    ChunkPool, Compression, DecodeFilter, EncodeFilter, HexCase, MemorySink, MemorySource,
    PredictorKind, PredictorParams, StreamNode, make_decoder, make_encoder,
};

/// Generate raw bytes for testing (repeating pattern - compresses well).
fn generate_raw_bytes(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Generate random bytes for testing (doesn't compress well).
/// Uses simple PRNG for reproducibility.
fn generate_random_bytes(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut seed: u64 = 42;
    for _ in 0..size {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((seed >> 16) as u8);
    }
    data
}

fn encode_chain(filter: EncodeFilter, data: &[u8]) -> Vec<u8> {
    let pool = ChunkPool::new();
    let sink = MemorySink::new();
    let bottom = StreamNode::from_sink(&pool, sink.clone()).unwrap();
    let mut node = make_encoder(&pool, bottom, filter).unwrap();
    node.write(data).unwrap();
    node.close().unwrap();
    sink.take()
}

fn decode_chain(filter: DecodeFilter, data: &[u8]) -> Vec<u8> {
    let pool = ChunkPool::new();
    let src = StreamNode::from_source(&pool, MemorySource::new(data.to_vec())).unwrap();
    let mut node = make_decoder(&pool, src, filter).unwrap();
    let mut out = Vec::new();
    loop {
        let n = node.read(4096).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(node.data());
        node.consume(n);
    }
    node.close().unwrap();
    out
}

fn bench_ascii85(c: &mut Criterion) {
    let mut group = c.benchmark_group("ascii85");
    for size in [1024usize, 65536] {
        let raw = generate_random_bytes(size);
        let encoded = encode_chain(EncodeFilter::Base85 { wrap: None }, &raw);
        group.bench_with_input(BenchmarkId::new("encode", size), &raw, |b, data| {
            b.iter(|| black_box(encode_chain(EncodeFilter::Base85 { wrap: None }, data)));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, data| {
            b.iter(|| black_box(decode_chain(DecodeFilter::Base85, data)));
        });
    }
    group.finish();
}

fn bench_asciihex(c: &mut Criterion) {
    let mut group = c.benchmark_group("asciihex");
    let raw = generate_random_bytes(65536);
    let encoded = encode_chain(
        EncodeFilter::Hex {
            case: HexCase::Lower,
            wrap: None,
        },
        &raw,
    );
    group.bench_function("decode/65536", |b| {
        b.iter(|| black_box(decode_chain(DecodeFilter::Hex, &encoded)));
    });
    group.finish();
}

fn bench_runlength(c: &mut Criterion) {
    let mut group = c.benchmark_group("runlength");
    // Alternating runs and literals, the encoder's worst case for choices.
    let mut raw = Vec::with_capacity(65536);
    while raw.len() < 65536 {
        raw.extend_from_slice(&generate_random_bytes(64));
        raw.extend_from_slice(&[0u8; 192]);
    }
    let encoded = encode_chain(EncodeFilter::RunLength, &raw);
    group.bench_function("encode/65536", |b| {
        b.iter(|| black_box(encode_chain(EncodeFilter::RunLength, &raw)));
    });
    group.bench_function("decode/65536", |b| {
        b.iter(|| black_box(decode_chain(DecodeFilter::RunLength, &encoded)));
    });
    group.finish();
}

fn bench_predictor_flate(c: &mut Criterion) {
    let mut group = c.benchmark_group("predictor_flate");
    let params = PredictorParams {
        kind: PredictorKind::Up,
        colors: 3,
        bits_per_component: 8,
        columns: 512,
    };
    // A smooth gradient, the case predictors exist for.
    let raw = generate_raw_bytes(512 * 3 * 64);
    group.bench_function("encode/image", |b| {
        b.iter(|| {
            let pool = ChunkPool::new();
            let sink = MemorySink::new();
            let bottom = StreamNode::from_sink(&pool, sink.clone()).unwrap();
            let flate = make_encoder(
                &pool,
                bottom,
                EncodeFilter::Flate {
                    level: Compression::default(),
                },
            )
            .unwrap();
            let mut head = make_encoder(&pool, flate, EncodeFilter::Predictor(params)).unwrap();
            head.write(&raw).unwrap();
            head.close().unwrap();
            black_box(sink.take())
        });
    });
    group.finish();
}

fn bench_rc4(c: &mut Criterion) {
    let mut group = c.benchmark_group("rc4");
    let raw = generate_random_bytes(65536);
    group.bench_function("crypt/65536", |b| {
        b.iter(|| {
            black_box(encode_chain(
                EncodeFilter::Arcfour {
                    key: b"0123456789abcdef".to_vec(),
                },
                &raw,
            ))
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_ascii85,
    bench_asciihex,
    bench_runlength,
    bench_predictor_flate,
    bench_rc4
);
criterion_main!(benches);
