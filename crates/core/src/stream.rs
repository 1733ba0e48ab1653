//! Stream nodes: the chain links of the filter pipeline.
//!
//! A decode chain pulls: the caller reads from the head node, each filter
//! node pulls ciphertext/encoded bytes from its upstream link, and the bottom
//! node pulls from a [`RawSource`]. An encode chain pushes: the caller writes
//! into the head, each node pushes encoded bytes downstream, and the bottom
//! node pushes into a [`RawSink`]. Nodes never block; backpressure is the
//! FULL/EMPTY protocol of the codec layer, driven here.
//!
//! File and buffer plumbing stays outside the pipeline: anything that can
//! produce or swallow bytes plugs in through the two seam traits.

use std::cell::RefCell;
use std::fmt;
use std::io;
use std::rc::Rc;

use crate::buffer::{ChunkPool, StreamBuf};
use crate::codec::{Codec, Step};
use crate::error::Result;

/// Raw byte source: the upstream seam of a decode chain.
pub trait RawSource {
    /// Pull up to `buf.len()` bytes. Returning 0 means permanent end of
    /// input.
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Raw byte sink: the downstream seam of an encode chain.
pub trait RawSink {
    fn push(&mut self, buf: &[u8]) -> Result<()>;

    /// Called once when the chain flushes.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Adapts any `std::io::Read` into a raw source.
pub struct IoSource<R>(pub R);

impl<R: io::Read> RawSource for IoSource<R> {
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.0.read(buf)?)
    }
}

/// Adapts any `std::io::Write` into a raw sink.
pub struct IoSink<W>(pub W);

impl<W: io::Write> RawSink for IoSink<W> {
    fn push(&mut self, buf: &[u8]) -> Result<()> {
        self.0.write_all(buf)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.0.flush()?;
        Ok(())
    }
}

/// In-memory source over an owned byte vector.
pub struct MemorySource {
    data: Vec<u8>,
    pos: usize,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl RawSource for MemorySource {
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// In-memory sink whose contents stay reachable after the chain closes.
#[derive(Clone, Default)]
pub struct MemorySink {
    data: Rc<RefCell<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }

    /// Take everything written so far.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut self.data.borrow_mut())
    }
}

impl RawSink for MemorySink {
    fn push(&mut self, buf: &[u8]) -> Result<()> {
        self.data.borrow_mut().extend_from_slice(buf);
        Ok(())
    }
}

/// Shared handle to a node reachable from more than one chain.
pub type SharedNode = Rc<RefCell<StreamNode>>;

/// Ownership of the next node in a chain.
pub enum Link {
    /// Sole owner; close destroys the target.
    Owned(Box<StreamNode>),
    /// Reference-counted; close drops this reference and only closes the
    /// target when it held the last one.
    Shared(SharedNode),
}

impl Link {
    fn with<R>(&mut self, f: impl FnOnce(&mut StreamNode) -> R) -> R {
        match self {
            Link::Owned(node) => f(node),
            Link::Shared(node) => f(&mut node.borrow_mut()),
        }
    }
}

impl From<StreamNode> for Link {
    fn from(node: StreamNode) -> Self {
        Link::Owned(Box::new(node))
    }
}

impl From<SharedNode> for Link {
    fn from(node: SharedNode) -> Self {
        Link::Shared(node)
    }
}

/// What a node does when stepped. The set is closed, so dispatch is a match
/// rather than a per-node function pointer.
enum NodeMode {
    /// Bottom of a decode chain: refills from a raw source.
    Source(Box<dyn RawSource>),
    /// Bottom of an encode chain: drains into a raw sink.
    Sink(Box<dyn RawSink>),
    /// Pulls from its link through a codec.
    Decoder { codec: Codec, link: Link },
    /// Pushes to its link through a codec.
    Encoder { codec: Codec, link: Link },
}

impl fmt::Debug for StreamNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamNode")
            .field("eof", &self.eof)
            .field("flush", &self.flush)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// One link of a filter chain: a buffer, a mode, and flow-control flags.
pub struct StreamNode {
    buf: StreamBuf,
    mode: NodeMode,
    pool: ChunkPool,
    /// Decode side: the codec reached its terminal condition.
    /// Encode side: the codec finalized after flush.
    eof: bool,
    /// No more input will ever arrive.
    flush: bool,
    closed: bool,
}

impl StreamNode {
    /// Bottom node of a decode chain.
    pub fn from_source<S: RawSource + 'static>(pool: &ChunkPool, source: S) -> Result<Self> {
        Ok(Self {
            buf: StreamBuf::pooled(pool)?,
            mode: NodeMode::Source(Box::new(source)),
            pool: pool.clone(),
            eof: false,
            flush: false,
            closed: false,
        })
    }

    /// Bottom node of an encode chain.
    pub fn from_sink<S: RawSink + 'static>(pool: &ChunkPool, sink: S) -> Result<Self> {
        Ok(Self {
            buf: StreamBuf::pooled(pool)?,
            mode: NodeMode::Sink(Box::new(sink)),
            pool: pool.clone(),
            eof: false,
            flush: false,
            closed: false,
        })
    }

    pub(crate) fn decoder(pool: &ChunkPool, codec: Codec, link: Link) -> Result<Self> {
        Ok(Self {
            buf: StreamBuf::pooled(pool)?,
            mode: NodeMode::Decoder { codec, link },
            pool: pool.clone(),
            eof: false,
            flush: false,
            closed: false,
        })
    }

    pub(crate) fn encoder(pool: &ChunkPool, codec: Codec, link: Link) -> Result<Self> {
        Ok(Self {
            buf: StreamBuf::pooled(pool)?,
            mode: NodeMode::Encoder { codec, link },
            pool: pool.clone(),
            eof: false,
            flush: false,
            closed: false,
        })
    }

    /// Wrap into a shared handle so two chains can link the same node.
    pub fn into_shared(self) -> SharedNode {
        Rc::new(RefCell::new(self))
    }

    /// Bytes currently available without another read.
    pub fn data(&self) -> &[u8] {
        self.buf.readable()
    }

    pub fn available(&self) -> usize {
        self.buf.available()
    }

    /// Mark `n` available bytes as consumed.
    pub fn consume(&mut self, n: usize) {
        self.buf.consume(n);
    }

    /// True once no further bytes will ever become available.
    pub fn at_eof(&self) -> bool {
        self.eof && self.buf.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Pull up to `max` new bytes into the buffer, keeping unread bytes.
    /// Returns the bytes now available; 0 only at permanent end of input.
    pub fn read(&mut self, max: usize) -> Result<usize> {
        assert!(!self.closed, "read on a closed node");
        self.buf.compact();
        let want = max.min(self.buf.space());
        let StreamNode {
            buf,
            mode,
            eof,
            flush,
            ..
        } = self;
        match mode {
            NodeMode::Source(source) => {
                if !*eof && want > 0 {
                    let n = buf.fill_from(source.as_mut(), want)?;
                    if n == 0 {
                        *eof = true;
                    }
                }
            }
            NodeMode::Decoder { codec, link } => {
                let mut gained = 0usize;
                while !*eof && gained < want && buf.space() > 0 {
                    let status = link.with(|up| -> Result<Step> {
                        if up.available() == 0 && !*flush {
                            let n = up.read(up.buf.capacity())?;
                            if n == 0 {
                                *flush = true;
                            }
                        }
                        let before = buf.available();
                        let status = codec.step(&mut up.buf, buf, *flush)?;
                        gained += buf.available() - before;
                        Ok(status)
                    })?;
                    match status {
                        Step::Full => break,
                        Step::Eof => *eof = true,
                        Step::Empty => {
                            debug_assert!(!*flush, "codec returned Empty while flushing");
                        }
                    }
                }
            }
            NodeMode::Sink(_) | NodeMode::Encoder { .. } => {
                panic!("read on an encode-side node")
            }
        }
        Ok(self.buf.available())
    }

    /// Read until the source is exhausted, growing the buffer by doubling.
    /// Used when a filter needs the entire payload in one piece. Returns the
    /// total bytes available.
    pub fn load(&mut self) -> Result<usize> {
        while !self.eof {
            if self.buf.space() == 0 {
                self.buf.grow()?;
            }
            let before = self.buf.available();
            self.read(self.buf.space())?;
            if self.buf.available() == before && self.eof {
                break;
            }
        }
        Ok(self.buf.available())
    }

    /// Push bytes into an encode-side node, draining downstream as needed.
    pub fn write(&mut self, mut data: &[u8]) -> Result<()> {
        assert!(!self.closed, "write on a closed node");
        assert!(!self.flush, "write after flush");
        if let NodeMode::Source(_) | NodeMode::Decoder { .. } = self.mode {
            panic!("write on a decode-side node");
        }
        while !data.is_empty() {
            let n = data.len().min(self.buf.space());
            if n == 0 {
                self.drain()?;
                continue;
            }
            self.buf.extend_from_slice(&data[..n]);
            data = &data[n..];
        }
        Ok(())
    }

    /// Push accumulated output toward the sink.
    pub fn drain(&mut self) -> Result<()> {
        assert!(!self.closed, "drain on a closed node");
        let StreamNode {
            buf,
            mode,
            eof,
            flush,
            ..
        } = self;
        match mode {
            NodeMode::Sink(sink) => {
                if buf.available() > 0 {
                    sink.push(buf.readable())?;
                    buf.consume(buf.available());
                }
            }
            NodeMode::Encoder { codec, link } => {
                link.with(|down| -> Result<()> {
                    while !*eof {
                        match codec.step(buf, &mut down.buf, *flush)? {
                            Step::Full => down.drain()?,
                            Step::Empty => break,
                            Step::Eof => *eof = true,
                        }
                    }
                    Ok(())
                })?;
            }
            NodeMode::Source(_) | NodeMode::Decoder { .. } => {
                panic!("drain on a decode-side node")
            }
        }
        Ok(())
    }

    /// Finalize: no more input will arrive. Forces trailing groups out of
    /// every codec below and flushes down to the sink.
    pub fn flush(&mut self) -> Result<()> {
        assert!(!self.closed, "flush on a closed node");
        self.flush = true;
        self.drain()?;
        match &mut self.mode {
            NodeMode::Sink(sink) => {
                sink.finish()?;
                self.eof = true;
            }
            NodeMode::Encoder { link, .. } => {
                debug_assert!(self.eof, "codec did not finalize on flush");
                link.with(|down| down.flush())?;
            }
            NodeMode::Source(_) | NodeMode::Decoder { .. } => {
                panic!("flush on a decode-side node")
            }
        }
        Ok(())
    }

    /// Close the chain. Idempotent. Encode-side nodes flush first; the
    /// buffer returns to its pool (or is freed if it grew private); the
    /// linked node is released according to its ownership.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if matches!(self.mode, NodeMode::Sink(_) | NodeMode::Encoder { .. }) && !self.flush {
            self.flush()?;
        }
        self.closed = true;
        match &mut self.mode {
            NodeMode::Decoder { link, .. } | NodeMode::Encoder { link, .. } => match link {
                Link::Owned(node) => node.close()?,
                Link::Shared(node) => {
                    // Last holder closes; everyone else just lets go.
                    if Rc::strong_count(node) == 1 {
                        node.borrow_mut().close()?;
                    }
                }
            },
            NodeMode::Source(_) | NodeMode::Sink(_) => {}
        }
        self.buf.release(&self.pool);
        Ok(())
    }
}

impl Drop for StreamNode {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}
