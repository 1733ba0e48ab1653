use orinoco_core::{
    ChunkPool, DecodeFilter, EncodeFilter, MemorySink, MemorySource, PredictorKind,
    PredictorParams, StreamNode, make_decoder, make_encoder,
};

fn lcg_bytes(len: usize, mut seed: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(len);
    for _ in 0..len {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((seed >> 16) as u8);
    }
    data
}

fn apply(params: PredictorParams, data: &[u8]) -> Vec<u8> {
    let pool = ChunkPool::new();
    let sink = MemorySink::new();
    let bottom = StreamNode::from_sink(&pool, sink.clone()).unwrap();
    let mut node = make_encoder(&pool, bottom, EncodeFilter::Predictor(params)).unwrap();
    node.write(data).unwrap();
    node.close().unwrap();
    sink.take()
}

fn undo(params: PredictorParams, data: &[u8]) -> Vec<u8> {
    let pool = ChunkPool::new();
    let src = StreamNode::from_source(&pool, MemorySource::new(data.to_vec())).unwrap();
    let mut node = make_decoder(&pool, src, DecodeFilter::Predictor(params)).unwrap();
    let n = node.load().unwrap();
    let out = node.data().to_vec();
    node.consume(n);
    node.close().unwrap();
    out
}

#[test]
fn test_up_differences_against_previous_row() {
    let params = PredictorParams {
        kind: PredictorKind::Up,
        colors: 1,
        bits_per_component: 8,
        columns: 3,
    };
    // First row diffs against zeros, second against the first.
    let encoded = apply(params, &[10, 10, 10, 12, 10, 8]);
    assert_eq!(encoded, [10, 10, 10, 2, 0, 254]);
    assert_eq!(undo(params, &encoded), [10, 10, 10, 12, 10, 8]);
}

#[test]
fn test_horizontal_differences_within_row() {
    let params = PredictorParams {
        kind: PredictorKind::Horizontal,
        colors: 1,
        bits_per_component: 8,
        columns: 4,
    };
    assert_eq!(apply(params, &[1, 2, 3, 4]), [1, 1, 1, 1]);
    // Each row restarts the left-neighbor chain.
    assert_eq!(apply(params, &[1, 2, 3, 4, 4, 3, 2, 1]), [
        1, 1, 1, 1, 4, 255, 255, 255
    ]);
}

#[test]
fn test_horizontal_respects_component_interleave() {
    let params = PredictorParams {
        kind: PredictorKind::Horizontal,
        colors: 3,
        bits_per_component: 8,
        columns: 2,
    };
    // RGB RGB: each channel diffs against its own previous sample.
    assert_eq!(
        apply(params, &[10, 20, 30, 13, 19, 31]),
        [10, 20, 30, 3, 255, 1]
    );
}

#[test]
fn test_sixteen_bit_samples_wrap_per_component() {
    let params = PredictorParams {
        kind: PredictorKind::Horizontal,
        colors: 1,
        bits_per_component: 16,
        columns: 2,
    };
    // 0x0100 then 0x00ff: delta is -1 mod 65536 = 0xffff.
    assert_eq!(
        apply(params, &[0x01, 0x00, 0x00, 0xff]),
        [0x01, 0x00, 0xff, 0xff]
    );
}

#[test]
fn test_roundtrip_all_depths_and_components() {
    for kind in [PredictorKind::Up, PredictorKind::Horizontal] {
        for colors in [1usize, 3] {
            for bits in [1usize, 2, 4, 8, 16] {
                let params = PredictorParams {
                    kind,
                    colors,
                    bits_per_component: bits,
                    columns: 11,
                };
                for len in [0usize, 1, 7, 64, 333, 1024] {
                    let data = lcg_bytes(len, (bits * 31 + colors) as u64);
                    let encoded = apply(params, &data);
                    assert_eq!(encoded.len(), data.len());
                    assert_eq!(
                        undo(params, &encoded),
                        data,
                        "kind={kind:?} colors={colors} bits={bits} len={len}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_partial_final_row_roundtrips() {
    let params = PredictorParams {
        kind: PredictorKind::Up,
        colors: 3,
        bits_per_component: 8,
        columns: 5,
    };
    // Two full 15-byte rows plus a 7-byte stub.
    let data = lcg_bytes(37, 5);
    let encoded = apply(params, &data);
    assert_eq!(undo(params, &encoded), data);
}
