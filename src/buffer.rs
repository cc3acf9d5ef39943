use thiserror::Error;

use crate::tables::Tag;

macro_rules! impl_read {
    ($fn_name:ident, $fn_at:ident, $typ:ty) => {
        pub fn $fn_name(&mut self) -> Result<$typ, BufferError> {
            let mut buf = [0u8; size_of::<$typ>()];
            buf.copy_from_slice(self.take(size_of::<$typ>())?);

            Ok(<$typ>::from_be_bytes(buf))
        }

        pub fn $fn_at(&mut self, pos: usize) -> Result<$typ, BufferError> {
            self.seek_to(pos);
            self.$fn_name()
        }
    };
}

macro_rules! impl_write {
    ($fn_name:ident, $typ:ty) => {
        pub fn $fn_name(&mut self, value: $typ) -> Result<(), BufferError> {
            let bytes = value.to_be_bytes();
            self.write_bytes_at(self.pos, &bytes)?;
            self.pos += bytes.len();

            Ok(())
        }
    };
}

/// Represents the possible errors that can occur when reading or writing
/// through a `ByteReader` or `ByteWriter`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// An access of `len` bytes at `offset` does not fit in the buffer.
    /// Never clamped: the input is structurally malformed.
    #[error("out of bounds: {len} bytes at offset {offset} in a buffer of {buffer_len} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },
}

/// A cursor based big-endian reader over a borrowed, immutable byte span.
///
/// Every typed read comes in two flavours: `read_u16` reads at the cursor,
/// `read_u16_at` jumps the cursor to an absolute position first. Both leave
/// the cursor just past the value that was read.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The current cursor position, from the start of the buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor to an absolute position.
    ///
    /// Seeking never fails by itself, the next read reports a position
    /// that lies past the end of the buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use sfnt_remap::buffer::ByteReader;
    ///
    /// let data = [0, 0, 0, 10, 0, 0, 0, 20]; // two u32 values: 10 and 20
    /// let mut reader = ByteReader::new(&data);
    ///
    /// reader.seek_to(4);
    /// assert_eq!(reader.read_u32().unwrap(), 20);
    /// assert!(reader.read_u32().is_err());
    /// ```
    pub fn seek_to(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Runs `f` and puts the cursor back where it was before the call,
    /// whether `f` succeeded or not.
    ///
    /// Nested table decoders are reached through offsets from varying bases
    /// and may run in the middle of another decoder's traversal, so every one
    /// of them goes through here.
    pub fn restoring<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        let saved = self.pos;
        let result = f(self);
        self.pos = saved;
        result
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], BufferError> {
        let data = self.data;
        let bytes = self
            .pos
            .checked_add(len)
            .and_then(|end| data.get(self.pos..end))
            .ok_or(BufferError::OutOfBounds {
                offset: self.pos,
                len,
                buffer_len: data.len(),
            })?;
        self.pos += len;

        Ok(bytes)
    }

    /// Reads `len` bytes at the cursor
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BufferError> {
        self.take(len)
    }

    pub fn read_bytes_at(&mut self, pos: usize, len: usize) -> Result<&'a [u8], BufferError> {
        self.seek_to(pos);
        self.take(len)
    }

    /// Reads a 4 byte table, feature or script tag
    pub fn read_tag(&mut self) -> Result<Tag, BufferError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);

        Ok(Tag::new(&buf))
    }

    pub fn read_tag_at(&mut self, pos: usize) -> Result<Tag, BufferError> {
        self.seek_to(pos);
        self.read_tag()
    }

    impl_read!(read_i32, read_i32_at, i32);
    impl_read!(read_u32, read_u32_at, u32);
    impl_read!(read_i16, read_i16_at, i16);
    impl_read!(read_u16, read_u16_at, u16);
    impl_read!(read_i8, read_i8_at, i8);
    impl_read!(read_u8, read_u8_at, u8);
}

/// A fixed size big-endian writer.
///
/// The whole output size has to be known up front: sfnt offsets are
/// absolute, so nothing is written before the layout is complete.
#[derive(Debug)]
pub struct ByteWriter {
    data: Vec<u8>,
    pos: usize,
}

impl ByteWriter {
    /// Returns a zero filled writer of exactly `len` bytes
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0; len],
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Copies `bytes` to an absolute offset without moving the cursor
    pub fn write_bytes_at(&mut self, offset: usize, bytes: &[u8]) -> Result<(), BufferError> {
        let buffer_len = self.data.len();
        let target = offset
            .checked_add(bytes.len())
            .and_then(|end| self.data.get_mut(offset..end))
            .ok_or(BufferError::OutOfBounds {
                offset,
                len: bytes.len(),
                buffer_len,
            })?;
        target.copy_from_slice(bytes);

        Ok(())
    }

    pub fn write_tag(&mut self, tag: Tag) -> Result<(), BufferError> {
        self.write_bytes_at(self.pos, &tag.to_bytes())?;
        self.pos += 4;

        Ok(())
    }

    impl_write!(write_u32, u32);
    impl_write!(write_u16, u16);
    impl_write!(write_i16, i16);
    impl_write!(write_u8, u8);

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_and_advances() {
        let data = [0x12, 0x34, 0xFF, 0xFE, 0x00, 0x01, 0x00, 0x00];
        let mut reader = ByteReader::new(&data);

        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_i16().unwrap(), -2);
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.read_u32().unwrap(), 0x0001_0000);
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn positioned_read_moves_the_cursor() {
        let data = [0, 1, 2, 3, 4, 5];
        let mut reader = ByteReader::new(&data);

        assert_eq!(reader.read_u8_at(4).unwrap(), 4);
        assert_eq!(reader.read_u8().unwrap(), 5);
        assert_eq!(reader.read_u16_at(1).unwrap(), 0x0102);
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn reads_past_the_end_fail() {
        let data = [0, 1, 2];
        let mut reader = ByteReader::new(&data);

        assert_eq!(
            reader.read_u32(),
            Err(BufferError::OutOfBounds {
                offset: 0,
                len: 4,
                buffer_len: 3
            })
        );
        assert!(reader.read_u16_at(2).is_err());
        assert!(reader.read_bytes_at(usize::MAX, 2).is_err());
        assert!(reader.read_tag_at(1).is_err());
    }

    #[test]
    fn reads_tags_and_bytes() {
        let data = *b"GSUBxyz";
        let mut reader = ByteReader::new(&data);

        assert_eq!(reader.read_tag().unwrap(), Tag::new(b"GSUB"));
        assert_eq!(reader.read_bytes(3).unwrap(), b"xyz");
    }

    #[test]
    fn restoring_puts_the_cursor_back_on_error() {
        let data = [0, 1];
        let mut reader = ByteReader::new(&data);
        reader.seek_to(1);

        let result = reader.restoring(|r| r.read_u32_at(0));

        assert!(result.is_err());
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn writer_writes_big_endian_within_capacity() {
        let mut writer = ByteWriter::new(8);
        writer.write_u16(0x0102).unwrap();
        writer.write_tag(Tag::new(b"cmap")).unwrap();
        writer.write_i16(-1).unwrap();

        assert!(writer.write_u8(0).is_err());
        assert_eq!(writer.into_inner(), vec![1, 2, b'c', b'm', b'a', b'p', 0xFF, 0xFF]);
    }
}
