use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::{
    Error as CrateError,
    buffer::{BufferError, ByteReader, ByteWriter},
};

pub mod cmap;
pub mod colr;
pub mod coverage;
pub mod cpal;
pub mod gsub;
pub mod lookup;
pub mod maxp;

/// The size of the sfnt header which precedes the table directory
pub const OFFSET_TABLE_SIZE: usize = 12;

/// The size of a single table directory entry
pub const TABLE_RECORD_SIZE: usize = 16;

/// A 4 byte identifier used for tables, features and scripts
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag([u8; 4]);

impl Tag {
    pub const CMAP: Tag = Tag::new(b"cmap");
    pub const COLR: Tag = Tag::new(b"COLR");
    pub const CPAL: Tag = Tag::new(b"CPAL");
    pub const DSIG: Tag = Tag::new(b"DSIG");
    pub const GDEF: Tag = Tag::new(b"GDEF");
    pub const GPOS: Tag = Tag::new(b"GPOS");
    pub const GSUB: Tag = Tag::new(b"GSUB");
    pub const HEAD: Tag = Tag::new(b"head");
    pub const MAXP: Tag = Tag::new(b"maxp");

    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl FromStr for Tag {
    type Err = CrateError;

    /// Parses 1 to 4 printable ASCII characters, padding short tags with spaces
    /// the way the OpenType registry does (e.g. `"cvt"` becomes `"cvt "`).
    fn from_str(s: &str) -> Result<Self, CrateError> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 || !bytes.iter().all(|b| (0x20..=0x7E).contains(b)) {
            return Err(CrateError::InvalidTag(s.to_string()));
        }

        let mut tag = [b' '; 4];
        tag[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(tag))
    }
}

/// Non-fatal decoding conditions.
///
/// These are never returned as errors: the affected table or subtable
/// decodes to an empty or partial result, the condition is logged and kept
/// next to the decoded data, and sibling tables keep working.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unsupported {
    #[error("unsupported coverage format: {0}")]
    CoverageFormat(u16),

    #[error("unsupported lookup type: {0}")]
    LookupType(u16),

    #[error("unsupported format {format} for lookup type {lookup_type}")]
    SubtableFormat { lookup_type: u16, format: u16 },

    #[error("unsupported cmap subtable format: {0}")]
    CmapFormat(u16),

    #[error("unsupported COLR table version: {0}")]
    ColrVersion(u16),

    #[error("unsupported CPAL table version: {0}")]
    CpalVersion(u16),
}

impl Unsupported {
    /// Logs the condition and hands it back so it can be stored
    pub(crate) fn report(self) -> Self {
        log::warn!("{self}");
        self
    }
}

/// Represents the sfnt header preceding the table directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    pub sfnt_version: u32,
    pub num_tables: u16,
    pub search_range: u16,
    pub entry_selector: u16,
    pub range_shift: u16,
}

impl OffsetTable {
    pub fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, BufferError> {
        Ok(Self {
            sfnt_version: reader.read_u32_at(0)?,
            num_tables: reader.read_u16()?,
            search_range: reader.read_u16()?,
            entry_selector: reader.read_u16()?,
            range_shift: reader.read_u16()?,
        })
    }

    /// Builds a header for `num_tables` tables with the binary search hints
    /// filled in: the largest power of two not above the table count, times 16.
    pub fn for_tables(sfnt_version: u32, num_tables: u16) -> Self {
        let entry_selector = num_tables.checked_ilog2().unwrap_or(0) as u16;
        let search_range = (1u16 << entry_selector).wrapping_mul(TABLE_RECORD_SIZE as u16);
        let range_shift = num_tables
            .wrapping_mul(TABLE_RECORD_SIZE as u16)
            .wrapping_sub(search_range);

        Self {
            sfnt_version,
            num_tables,
            search_range,
            entry_selector,
            range_shift,
        }
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<(), BufferError> {
        writer.write_u32(self.sfnt_version)?;
        writer.write_u16(self.num_tables)?;
        writer.write_u16(self.search_range)?;
        writer.write_u16(self.entry_selector)?;
        writer.write_u16(self.range_shift)
    }
}

/// A single table directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub tag: Tag,
    pub checksum: u32,
    /// Offset of the table from the beginning of the font
    pub offset: u32,
    /// Length of the table in bytes, without padding
    pub length: u32,
}

impl TableRecord {
    pub fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, BufferError> {
        Ok(Self {
            tag: reader.read_tag()?,
            checksum: reader.read_u32()?,
            offset: reader.read_u32()?,
            length: reader.read_u32()?,
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<(), BufferError> {
        writer.write_tag(self.tag)?;
        writer.write_u32(self.checksum)?;
        writer.write_u32(self.offset)?;
        writer.write_u32(self.length)
    }
}

/// The sfnt header plus every directory entry, in file order
#[derive(Debug, Clone)]
pub struct TableDirectory {
    pub header: OffsetTable,
    pub records: Vec<TableRecord>,
}

impl TableDirectory {
    pub fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, BufferError> {
        let header = OffsetTable::from_reader(reader)?;

        reader.seek_to(OFFSET_TABLE_SIZE);
        let records = (0..header.num_tables)
            .map(|_| TableRecord::from_reader(reader))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { header, records })
    }

    pub fn find(&self, tag: Tag) -> Option<&TableRecord> {
        self.records.iter().find(|record| record.tag == tag)
    }
}

/// The standard sfnt table checksum: the sum of the table's big-endian u32
/// words, the last one zero padded.
pub fn table_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}
