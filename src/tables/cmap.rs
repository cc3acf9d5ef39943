use crate::buffer::{BufferError, ByteReader, ByteWriter};

use super::Unsupported;

/// Size of the cmap built by [`synthesize`]: a 4 byte header, one 8 byte
/// encoding record, a 28 byte format 12 subtable with a single group and
/// 4 trailing zero bytes.
pub const SYNTHETIC_CMAP_SIZE: usize = 44;

const FORMAT_12_HEADER_SIZE: u32 = 2 * 2 + 3 * 4;
const SEQUENTIAL_MAP_GROUP_SIZE: u32 = 3 * 4;

/// A representation of the [cmap table](https://learn.microsoft.com/en-us/typography/opentype/spec/cmap)
/// decoding only format 12 subtables, which is what the private use remapping produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmap {
    /// The version of the cmap table, always zero in practice
    pub version: u16,

    pub encoding_records: Vec<EncodingRecord>,

    /// Decoded subtables, parallel to `encoding_records`. `None` where the
    /// format is not supported.
    pub subtables: Vec<Option<Cmap12>>,

    pub unsupported: Vec<Unsupported>,
}

/// A cmap encoding record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingRecord {
    /// The platform identifier
    pub platform_id: u16,

    /// The platform specific encoding identifier
    pub encoding_id: u16,

    /// The offset of the mapping subtable from the start of the cmap
    pub offset: u32,
}

/// A segmented coverage (format 12) subtable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmap12 {
    pub language: u32,
    pub groups: Vec<SequentialMapGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialMapGroup {
    pub start_char_code: u32,
    pub end_char_code: u32,
    pub start_glyph_id: u32,
}

impl Cmap {
    pub fn from_bytes(data: &[u8]) -> Result<Self, BufferError> {
        let mut reader = ByteReader::new(data);

        let version = reader.read_u16()?;
        let num_tables = reader.read_u16()?;
        let encoding_records = (0..num_tables)
            .map(|_| -> Result<_, BufferError> {
                Ok(EncodingRecord {
                    platform_id: reader.read_u16()?,
                    encoding_id: reader.read_u16()?,
                    offset: reader.read_u32()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut subtables = Vec::with_capacity(encoding_records.len());
        let mut unsupported = Vec::new();
        for record in &encoding_records {
            let offset = record.offset as usize;
            match reader.read_u16_at(offset)? {
                12 => subtables.push(Some(Cmap12::from_reader(&mut reader, offset)?)),
                format => {
                    unsupported.push(Unsupported::CmapFormat(format).report());
                    subtables.push(None);
                }
            }
        }

        Ok(Self {
            version,
            encoding_records,
            subtables,
            unsupported,
        })
    }

    /// Maps a code point through the first format 12 subtable that covers it
    pub fn map(&self, code_point: u32) -> Option<u32> {
        self.subtables
            .iter()
            .flatten()
            .find_map(|subtable| subtable.map(code_point))
    }
}

impl Cmap12 {
    fn from_reader(reader: &mut ByteReader<'_>, offset: usize) -> Result<Self, BufferError> {
        reader.restoring(|reader| {
            // format, reserved, length
            reader.seek_to(offset + 8);
            let language = reader.read_u32()?;
            let num_groups = reader.read_u32()?;

            let mut groups = Vec::new();
            for _ in 0..num_groups {
                groups.push(SequentialMapGroup {
                    start_char_code: reader.read_u32()?,
                    end_char_code: reader.read_u32()?,
                    start_glyph_id: reader.read_u32()?,
                });
            }

            Ok(Self { language, groups })
        })
    }

    pub fn map(&self, code_point: u32) -> Option<u32> {
        self.groups
            .iter()
            .find(|group| (group.start_char_code..=group.end_char_code).contains(&code_point))
            .and_then(|group| group.start_glyph_id.checked_add(code_point - group.start_char_code))
    }
}

/// Builds a cmap mapping `pua_base..pua_base + num_glyphs` one to one onto
/// glyph ids `0..num_glyphs`, through a single Unicode full repertoire
/// (platform 0, encoding 4) format 12 subtable.
pub fn synthesize(pua_base: u32, num_glyphs: u16) -> Result<Vec<u8>, BufferError> {
    let mut cmap = ByteWriter::new(SYNTHETIC_CMAP_SIZE);

    // header
    cmap.write_u16(0)?; // version
    cmap.write_u16(1)?; // numTables

    // encoding record
    cmap.write_u16(0)?; // platformID
    cmap.write_u16(4)?; // encodingID
    cmap.write_u32(cmap.position() as u32 + 4)?; // subtableOffset

    // format 12 subtable
    cmap.write_u16(12)?; // format
    cmap.write_u16(0)?; // reserved
    cmap.write_u32(FORMAT_12_HEADER_SIZE + SEQUENTIAL_MAP_GROUP_SIZE)?; // length
    cmap.write_u32(0)?; // language
    cmap.write_u32(1)?; // numGroups

    // sequential map group
    cmap.write_u32(pua_base)?;
    cmap.write_u32(pua_base.saturating_add(u32::from(num_glyphs).saturating_sub(1)))?;
    cmap.write_u32(0)?;

    Ok(cmap.into_inner())
}
