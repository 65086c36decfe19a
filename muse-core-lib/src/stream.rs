use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::error::DecodeError;
use crate::estimate::estimate_len;
use crate::message::{Packet, decode_stream};
use crate::packet::{SYNC_MARKER, find_sync};

/// Buffers telemetry bytes from a lossy link and recovers from corruption.
///
/// Bytes are appended with [`PacketStream::extend`] as they arrive and
/// [`PacketStream::poll`] hands out every packet that can be decoded. When the
/// front of the buffer cannot be a valid packet the stream skips ahead to the
/// next sync marker.
#[derive(Debug, Default)]
pub struct PacketStream {
    buf: BytesMut,
    resyncs: usize,
    discarded: usize,
}

impl PacketStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes waiting for the rest of their packet.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Number of times corrupt data forced a skip.
    pub fn resyncs(&self) -> usize {
        self.resyncs
    }

    /// Total bytes thrown away while resynchronizing.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Decodes everything currently buffered, returning how many packets were
    /// delivered to `on_packet`.
    pub fn poll<F>(&mut self, mut on_packet: F) -> usize
    where
        F: FnMut(Packet),
    {
        let mut delivered = 0;
        loop {
            let outcome = decode_stream(&self.buf, &mut on_packet);
            delivered += outcome.packets;
            self.buf.advance(outcome.consumed);

            match outcome.error {
                None => return delivered,
                Some(DecodeError::NeedMoreData) if estimate_len(&self.buf) > self.buf.len() => {
                    return delivered;
                }
                Some(error) => self.resync(error),
            }
        }
    }

    /// Drops the corrupt lead byte and everything up to the next sync marker.
    /// Without a visible marker the last few bytes are kept, since they may be
    /// the start of one.
    fn resync(&mut self, error: DecodeError) {
        let skip = match find_sync(&self.buf[1..]) {
            Some(offset) => 1 + offset,
            None => self.buf.len().saturating_sub(SYNC_MARKER.len() - 1).max(1),
        };
        debug!(skip, buffered = self.buf.len(), %error, "resynchronizing packet stream");
        self.buf.advance(skip);
        self.resyncs += 1;
        self.discarded += skip;
    }
}
