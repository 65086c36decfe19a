//! Packing of 10-bit sensor samples.
//!
//! Samples are concatenated most-significant-bit first into one contiguous
//! bitstream. The unused low bits of the final byte are zero.

use crate::error::DecodeError;

/// Width of a single EEG/accelerometer/DRL/REF sample on the wire.
pub const SAMPLE_BITS: usize = 10;

/// Largest value a sample can hold.
pub const SAMPLE_MAX: u16 = (1 << SAMPLE_BITS) - 1;

/// Number of bytes occupied by `n` packed samples.
pub const fn packed_len(n: usize) -> usize {
    (n * SAMPLE_BITS).div_ceil(8)
}

/// Position inside a byte run: byte index plus bit offset from the MSB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitCursor {
    byte: usize,
    bit: u8,
}

impl BitCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn byte_index(&self) -> usize {
        self.byte
    }

    pub fn bit_offset(&self) -> u8 {
        self.bit
    }

    /// Bytes touched so far, counting a partially filled byte.
    pub fn bytes_touched(&self) -> usize {
        self.byte + usize::from(self.bit != 0)
    }

    fn step(&mut self) {
        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.byte += 1;
        }
    }

    /// Reads `width` bits starting at the cursor.
    ///
    /// # Panics
    ///
    /// Panics if the bits run past the end of `buf`.
    pub fn read(&mut self, buf: &[u8], width: usize) -> u16 {
        let mut value = 0u16;
        for _ in 0..width {
            let bit = (buf[self.byte] >> (7 - self.bit)) & 1;
            value = (value << 1) | u16::from(bit);
            self.step();
        }
        value
    }

    /// Writes the low `width` bits of `value` at the cursor. Target bits must
    /// already be zero.
    ///
    /// # Panics
    ///
    /// Panics if the bits run past the end of `buf`.
    pub fn write(&mut self, buf: &mut [u8], width: usize, value: u16) {
        for i in (0..width).rev() {
            let bit = ((value >> i) & 1) as u8;
            buf[self.byte] |= bit << (7 - self.bit);
            self.step();
        }
    }
}

/// Packs `samples` into `packed_len(samples.len())` bytes.
///
/// # Panics
///
/// Panics if any sample exceeds [`SAMPLE_MAX`].
pub fn encode_samples(samples: &[u16]) -> Vec<u8> {
    let mut out = vec![0u8; packed_len(samples.len())];
    let mut cursor = BitCursor::new();
    for &sample in samples {
        assert!(sample <= SAMPLE_MAX, "sample {sample} does not fit in {SAMPLE_BITS} bits");
        cursor.write(&mut out, SAMPLE_BITS, sample);
    }
    out
}

/// Unpacks `out.len()` samples from the front of `buf`, returning the number
/// of bytes they occupied.
pub fn decode_samples_into(buf: &[u8], out: &mut [u16]) -> Result<usize, DecodeError> {
    let needed = packed_len(out.len());
    if buf.len() < needed {
        return Err(DecodeError::NeedMoreData);
    }
    let mut cursor = BitCursor::new();
    for slot in out.iter_mut() {
        *slot = cursor.read(buf, SAMPLE_BITS);
    }
    debug_assert_eq!(cursor.bytes_touched(), needed);
    Ok(needed)
}

/// Unpacks exactly `N` samples from the front of `buf`.
pub fn decode_samples<const N: usize>(buf: &[u8]) -> Result<[u16; N], DecodeError> {
    let mut samples = [0u16; N];
    decode_samples_into(buf, &mut samples)?;
    Ok(samples)
}
