//! Bounds-checked big-endian cursor over class file bytes.

use crate::error::ParseError;

pub struct ClassReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ClassReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        if self.remaining() < len {
            return Err(ParseError::Truncated {
                offset: self.position,
                needed: len - self.remaining(),
            });
        }
        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ParseError> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ParseError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ParseError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }
}

/// Decodes the JVM's modified UTF-8: `NUL` is encoded as `C0 80` and
/// supplementary characters as surrogate pairs of 3-byte sequences.
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            if b == 0 {
                return None;
            }
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1)?;
            if b2 & 0xC0 != 0x80 {
                return None;
            }
            units.push(((b as u16 & 0x1F) << 6) | (b2 as u16 & 0x3F));
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1)?;
            let b3 = *bytes.get(i + 2)?;
            if b2 & 0xC0 != 0x80 || b3 & 0xC0 != 0x80 {
                return None;
            }
            units.push(((b as u16 & 0x0F) << 12) | ((b2 as u16 & 0x3F) << 6) | (b3 as u16 & 0x3F));
            i += 3;
        } else {
            return None;
        }
    }

    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_values_in_sequence() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34, 0x07];
        let mut reader = ClassReader::new(&data);
        assert_eq!(reader.read_u32().unwrap(), 0xCAFEBABE);
        assert_eq!(reader.read_u16().unwrap(), 52);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn truncated_read_reports_offset_and_shortfall() {
        let data = [0x00, 0x01, 0x02];
        let mut reader = ClassReader::new(&data);
        reader.skip(2).unwrap();
        match reader.read_u32() {
            Err(ParseError::Truncated { offset, needed }) => {
                assert_eq!(offset, 2);
                assert_eq!(needed, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn modified_utf8_handles_nul_and_supplementary_characters() {
        assert_eq!(decode_modified_utf8(b"java/lang/Object").as_deref(), Some("java/lang/Object"));
        assert_eq!(decode_modified_utf8(&[0x61, 0xC0, 0x80, 0x62]).as_deref(), Some("a\u{0}b"));
        // U+1F600 as a surrogate pair, each half in 3-byte form.
        let smile = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(decode_modified_utf8(&smile).as_deref(), Some("\u{1F600}"));
    }

    #[test]
    fn modified_utf8_rejects_raw_nul_and_broken_sequences() {
        assert!(decode_modified_utf8(&[0x61, 0x00]).is_none());
        assert!(decode_modified_utf8(&[0xC3]).is_none());
        assert!(decode_modified_utf8(&[0xF0, 0x9F, 0x98, 0x80]).is_none());
    }
}
