use crate::packet::PacketHeader;

/// Estimate shown for a buffer that does not yet reveal a type code.
pub const MIN_ESTIMATE: usize = 4;

/// Advisory length of the packet at the front of `buf`.
///
/// Looks only at the lead byte. Returns 0 once the type code is known to be
/// invalid; an empty buffer, or one whose type code is still 0 (idle link),
/// yields [`MIN_ESTIMATE`]. Whenever [`decode_one`](crate::message::decode_one)
/// succeeds the estimate equals the bytes it consumed, so a caller holding at
/// least `estimate_len(buf)` bytes that still cannot decode is looking at a
/// corrupt stream.
pub fn estimate_len(buf: &[u8]) -> usize {
    let Some(&lead) = buf.first() else {
        return MIN_ESTIMATE;
    };
    let header = PacketHeader::from_lead_byte(lead);
    if header.type_code() == 0 {
        return MIN_ESTIMATE;
    }
    header.frame_len().unwrap_or(0)
}
