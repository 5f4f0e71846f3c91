use crate::error::{PackError, PackResult};

/// Encode a u64 as a variable-length integer.
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer. Returns (value, bytes_consumed).
pub(crate) fn decode_varint(data: &[u8]) -> PackResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(PackError::Corrupt {
                offset: i,
                reason: "varint overflow".into(),
            });
        }
    }
    Err(PackError::Corrupt {
        offset: data.len(),
        reason: "truncated varint".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_small() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 42);
        assert_eq!(buf.len(), 1);
        assert_eq!(decode_varint(&buf).unwrap(), (42, 1));
    }

    #[test]
    fn varint_max_u64() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, u64::MAX);
        let (val, consumed) = decode_varint(&buf).unwrap();
        assert_eq!(val, u64::MAX);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn varint_truncated() {
        let err = decode_varint(&[0x80, 0x80]).unwrap_err();
        assert!(matches!(err, PackError::Corrupt { .. }));
    }
}
