use orinoco_core::{
    ChunkPool, DecodeFilter, EncodeFilter, HexCase, LineWrap, MemorySink, MemorySource,
    StreamError, StreamNode, make_decoder, make_encoder,
};

fn decode(data: &[u8]) -> orinoco_core::Result<Vec<u8>> {
    let pool = ChunkPool::new();
    let src = StreamNode::from_source(&pool, MemorySource::new(data.to_vec()))?;
    let mut node = make_decoder(&pool, src, DecodeFilter::Hex)?;
    let n = node.load()?;
    let out = node.data().to_vec();
    node.consume(n);
    node.close()?;
    Ok(out)
}

fn encode(data: &[u8], case: HexCase, wrap: Option<LineWrap>) -> Vec<u8> {
    let pool = ChunkPool::new();
    let sink = MemorySink::new();
    let bottom = StreamNode::from_sink(&pool, sink.clone()).unwrap();
    let mut node = make_encoder(&pool, bottom, EncodeFilter::Hex { case, wrap }).unwrap();
    node.write(data).unwrap();
    node.close().unwrap();
    sink.take()
}

#[test]
fn test_decode_with_whitespace() {
    assert_eq!(decode(b"61 62 2e6364   65").unwrap(), b"ab.cde");
}

#[test]
fn test_decode_mixed_case() {
    assert_eq!(decode(b"4AbC").unwrap(), [0x4a, 0xbc]);
}

#[test]
fn test_decode_odd_digit_completes_with_zero() {
    assert_eq!(decode(b"617").unwrap(), b"ap");
    // A single digit at flush decodes as the high nibble.
    assert_eq!(decode(b"1").unwrap(), [0x10]);
}

#[test]
fn test_decode_rejects_garbage() {
    let err = decode(b"6g").unwrap_err();
    assert!(matches!(
        err,
        StreamError::MalformedInput {
            filter: "ASCIIHex",
            offset: 1,
            ..
        }
    ));
}

#[test]
fn test_encode_both_cases() {
    assert_eq!(encode(b"Hello", HexCase::Upper, None), b"48656C6C6F");
    assert_eq!(encode(b"Hello", HexCase::Lower, None), b"48656c6c6f");
}

#[test]
fn test_encode_wraps_before_crossing_width() {
    let wrap = LineWrap {
        line_start_offset: 0,
        max_line_width: 8,
    };
    assert_eq!(
        encode(&[0u8; 10], HexCase::Lower, Some(wrap)),
        b"00000000\n00000000\n0000"
    );
}

#[test]
fn test_encode_honors_line_start_offset() {
    let wrap = LineWrap {
        line_start_offset: 6,
        max_line_width: 8,
    };
    // One pair fits after the preamble column, the rest wrap.
    assert_eq!(encode(&[0u8; 3], HexCase::Lower, Some(wrap)), b"00\n0000");
}
