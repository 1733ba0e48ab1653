use orinoco_core::{
    ChunkPool, Compression, DecodeFilter, EncodeFilter, MemorySink, MemorySource, StreamError,
    StreamNode, make_decoder, make_encoder,
};

fn lcg_bytes(len: usize, mut seed: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(len);
    for _ in 0..len {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((seed >> 16) as u8);
    }
    data
}

fn decode(filter: DecodeFilter, data: &[u8]) -> orinoco_core::Result<Vec<u8>> {
    let pool = ChunkPool::new();
    let src = StreamNode::from_source(&pool, MemorySource::new(data.to_vec()))?;
    let mut node = make_decoder(&pool, src, filter)?;
    let n = node.load()?;
    let out = node.data().to_vec();
    node.consume(n);
    node.close()?;
    Ok(out)
}

fn encode(filter: EncodeFilter, data: &[u8]) -> Vec<u8> {
    let pool = ChunkPool::new();
    let sink = MemorySink::new();
    let bottom = StreamNode::from_sink(&pool, sink.clone()).unwrap();
    let mut node = make_encoder(&pool, bottom, filter).unwrap();
    node.write(data).unwrap();
    node.close().unwrap();
    sink.take()
}

#[test]
fn test_flate_compresses_repetitive_data() {
    let data = vec![b'Q'; 20_000];
    let wire = encode(
        EncodeFilter::Flate {
            level: Compression::default(),
        },
        &data,
    );
    assert!(wire.len() < data.len() / 10);
    assert_eq!(decode(DecodeFilter::Flate, &wire).unwrap(), data);
}

#[test]
fn test_flate_roundtrips_incompressible_data() {
    let data = lcg_bytes(8192, 17);
    let wire = encode(
        EncodeFilter::Flate {
            level: Compression::best(),
        },
        &data,
    );
    assert_eq!(decode(DecodeFilter::Flate, &wire).unwrap(), data);
}

#[test]
fn test_flate_truncated_stream_is_premature() {
    let data = lcg_bytes(4096, 23);
    let wire = encode(
        EncodeFilter::Flate {
            level: Compression::default(),
        },
        &data,
    );
    let err = decode(DecodeFilter::Flate, &wire[..wire.len() / 2]).unwrap_err();
    assert!(matches!(err, StreamError::PrematureEnd { filter: "Flate" }));
}

#[test]
fn test_flate_garbage_is_malformed() {
    let err = decode(DecodeFilter::Flate, b"this is not a zlib stream").unwrap_err();
    assert!(matches!(
        err,
        StreamError::MalformedInput {
            filter: "Flate",
            ..
        }
    ));
}

#[test]
fn test_lzw_roundtrip() {
    for len in [0usize, 1, 100, 5000] {
        let data = lcg_bytes(len, len as u64 + 1);
        let wire = encode(EncodeFilter::Lzw, &data);
        assert_eq!(
            decode(DecodeFilter::Lzw { early_change: true }, &wire).unwrap(),
            data,
            "len {len}"
        );
    }
}

#[test]
fn test_lzw_compresses_repetitive_data() {
    let data = vec![b'Z'; 10_000];
    let wire = encode(EncodeFilter::Lzw, &data);
    assert!(wire.len() < data.len() / 4);
    assert_eq!(
        decode(DecodeFilter::Lzw { early_change: true }, &wire).unwrap(),
        data
    );
}
