use crate::buffer::{BufferError, ByteReader};

/// Reads numGlyphs from a [maxp table](https://learn.microsoft.com/en-us/typography/opentype/spec/maxp).
///
/// The field sits right after the 4 byte version in both the 0.5 and 1.0
/// layouts.
pub fn num_glyphs(data: &[u8]) -> Result<u16, BufferError> {
    ByteReader::new(data).read_u16_at(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_glyph_count() {
        assert_eq!(num_glyphs(&[0x00, 0x00, 0x50, 0x00, 0x01, 0x2C]).unwrap(), 300);
        assert!(num_glyphs(&[0x00, 0x00, 0x50, 0x00, 0x01]).is_err());
    }
}
