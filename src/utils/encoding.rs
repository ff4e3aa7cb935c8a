use std::io::{self, Write};

/// Encode a u64 as a variable-length integer
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        if value < 0x80 {
            buf.push(value as u8);
            break;
        }
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
}

/// Decode a variable-length integer from a slice
/// Returns (value, bytes_consumed)
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if shift >= 64 {
            return None; // Overflow
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }

        shift += 7;
    }

    None // Incomplete
}

/// Delta-encode an ascending list of offsets
pub fn delta_encode(values: &[u64], buf: &mut Vec<u8>) {
    let mut prev = 0u64;
    for &value in values {
        encode_varint(value - prev, buf);
        prev = value;
    }
}

/// Delta-decode a list of offsets
///
/// Returns `None` if the buffer ends inside a varint or a value overflows.
pub fn delta_decode(buf: &[u8]) -> Option<Vec<u64>> {
    let mut iter = DeltaIter::new(buf);
    let values: Vec<u64> = iter.by_ref().collect();
    (!iter.is_corrupt()).then_some(values)
}

/// Lazy decoder over a delta-encoded list
///
/// Stops at the first malformed varint or overflowing value; check
/// [`DeltaIter::is_corrupt`] once it is exhausted.
pub struct DeltaIter<'a> {
    buf: &'a [u8],
    pos: usize,
    prev: u64,
    corrupt: bool,
}

impl<'a> DeltaIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            prev: 0,
            corrupt: false,
        }
    }

    pub fn is_corrupt(&self) -> bool {
        self.corrupt
    }
}

impl Iterator for DeltaIter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.corrupt || self.pos >= self.buf.len() {
            return None;
        }
        let decoded = decode_varint(&self.buf[self.pos..])
            .and_then(|(delta, consumed)| Some((self.prev.checked_add(delta)?, consumed)));
        match decoded {
            Some((value, consumed)) => {
                self.prev = value;
                self.pos += consumed;
                Some(value)
            }
            None => {
                self.corrupt = true;
                None
            }
        }
    }
}

/// Decode only the first value of a delta-encoded list (it is stored absolute)
#[inline]
pub fn delta_first(buf: &[u8]) -> Option<u64> {
    decode_varint(buf).map(|(value, _)| value)
}

/// Write a u32 in little-endian format
pub fn write_u32_le<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Write a u64 in little-endian format
pub fn write_u64_le<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a little-endian u32 at `pos`; the caller guarantees the bounds
#[inline]
pub fn u32_at(buf: &[u8], pos: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[pos..pos + 4]);
    u32::from_le_bytes(bytes)
}

/// Read a little-endian u64 at `pos`; the caller guarantees the bounds
#[inline]
pub fn u64_at(buf: &[u8], pos: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[pos..pos + 8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_boundaries() {
        let values = [0, 1, 127, 128, 16383, 16384, u32::MAX as u64, u64::MAX];
        for value in values {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            let (decoded, consumed) = decode_varint(&buf).unwrap();
            assert_eq!(value, decoded);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn test_delta_encoding() {
        let values = vec![6, 19, 20, 1000, 5_000_000_000];
        let mut buf = Vec::new();
        delta_encode(&values, &mut buf);
        assert_eq!(delta_decode(&buf), Some(values));
        assert_eq!(delta_first(&buf), Some(6));
    }

    #[test]
    fn test_truncated_postings_rejected() {
        let mut buf = Vec::new();
        delta_encode(&[300], &mut buf);
        buf.pop();
        assert_eq!(delta_decode(&buf), None);
        assert_eq!(delta_first(&[]), None);
    }

    #[test]
    fn test_fixed_width_reads() {
        let mut buf = Vec::new();
        write_u32_le(&mut buf, 0x5049_4458).unwrap();
        write_u64_le(&mut buf, 42).unwrap();
        assert_eq!(u32_at(&buf, 0), 0x5049_4458);
        assert_eq!(u64_at(&buf, 4), 42);
    }

    #[test]
    fn test_delta_iter_is_lazy_and_flags_corruption() {
        let mut buf = Vec::new();
        delta_encode(&[5, 9, 300], &mut buf);

        let mut iter = DeltaIter::new(&buf);
        assert_eq!(iter.next(), Some(5));
        assert_eq!(iter.find(|&v| v > 5), Some(9));
        assert!(!iter.is_corrupt());

        // Dangling continuation byte
        buf.push(0x80);
        let mut iter = DeltaIter::new(&buf);
        assert_eq!(iter.by_ref().collect::<Vec<_>>(), vec![5, 9, 300]);
        assert!(iter.is_corrupt());
        assert_eq!(delta_decode(&buf), None);
    }
}
