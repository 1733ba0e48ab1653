use orinoco_core::{
    ChunkPool, DecodeFilter, EncodeFilter, LineWrap, MemorySink, MemorySource, StreamError,
    StreamNode, make_decoder, make_encoder,
};

fn decode(data: &[u8]) -> orinoco_core::Result<Vec<u8>> {
    let pool = ChunkPool::new();
    let src = StreamNode::from_source(&pool, MemorySource::new(data.to_vec()))?;
    let mut node = make_decoder(&pool, src, DecodeFilter::Base64)?;
    let n = node.load()?;
    let out = node.data().to_vec();
    node.consume(n);
    node.close()?;
    Ok(out)
}

fn encode(data: &[u8], wrap: Option<LineWrap>) -> Vec<u8> {
    let pool = ChunkPool::new();
    let sink = MemorySink::new();
    let bottom = StreamNode::from_sink(&pool, sink.clone()).unwrap();
    let mut node = make_encoder(&pool, bottom, EncodeFilter::Base64 { wrap }).unwrap();
    node.write(data).unwrap();
    node.close().unwrap();
    sink.take()
}

#[test]
fn test_encode_with_padding() {
    assert_eq!(encode(b"a", None), b"YQ==");
    assert_eq!(encode(b"Ma", None), b"TWE=");
    assert_eq!(encode(b"Man", None), b"TWFu");
}

#[test]
fn test_decode_with_padding() {
    assert_eq!(decode(b"YQ==").unwrap(), b"a");
    assert_eq!(decode(b"TWE=").unwrap(), b"Ma");
    assert_eq!(decode(b"TWFu").unwrap(), b"Man");
}

#[test]
fn test_decode_unpadded_final_group() {
    // End of input is as good a terminator as '='.
    assert_eq!(decode(b"TQ").unwrap(), b"M");
    assert_eq!(decode(b"TWE").unwrap(), b"Ma");
}

#[test]
fn test_decode_ignores_line_breaks() {
    assert_eq!(decode(b"TWFu\r\nTWFu\nTWE=").unwrap(), b"ManManMa");
}

#[test]
fn test_stray_padding_is_an_error() {
    let err = decode(b"=").unwrap_err();
    assert!(matches!(
        err,
        StreamError::MalformedInput {
            filter: "Base64",
            ..
        }
    ));
}

#[test]
fn test_invalid_character_is_an_error() {
    let err = decode(b"TW!u").unwrap_err();
    assert!(matches!(
        err,
        StreamError::MalformedInput { offset: 2, .. }
    ));
}

#[test]
fn test_encode_wraps_whole_quads() {
    let wrap = LineWrap {
        line_start_offset: 0,
        max_line_width: 8,
    };
    assert_eq!(encode(b"aaabbbccc", Some(wrap)), b"YWFhYmJi\nY2Nj");
}
