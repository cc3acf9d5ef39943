//! Reading the table directory of an sfnt font and writing it back with a
//! synthetic private use cmap.
//!
//! Some rendering surfaces can only address characters, never glyph
//! indices. Giving every glyph its own private use code point
//! (`PUA_BASE + glyph id`) makes any glyph reachable through plain text.

use indexmap::IndexMap;

use crate::{
    Error, Result,
    buffer::{ByteReader, ByteWriter},
    tables::{
        OFFSET_TABLE_SIZE, OffsetTable, TABLE_RECORD_SIZE, TableDirectory, TableRecord, Tag,
        cmap, maxp, table_checksum,
    },
};

/// Layout tables that only make sense for the original cmap, plus the
/// signature, which rewriting would invalidate anyway.
pub const DEFAULT_DROP_TABLES: [Tag; 4] = [Tag::GSUB, Tag::GPOS, Tag::GDEF, Tag::DSIG];

/// First code point of Supplementary Private Use Area-A
pub const PUA_BASE: u32 = 0xF0000;

/// Offset of checkSumAdjustment inside the head table
const HEAD_CHECKSUM_ADJUSTMENT: usize = 8;

/// What to put in the checksum field of each written directory entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumMode {
    /// Copy the checksum read from the source font. The cmap and the
    /// offsets change, so checksum validating consumers will complain.
    #[default]
    Preserve,
    /// Compute the checksum of the bytes actually written
    Recompute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapOptions {
    /// Code point mapped to glyph 0
    pub pua_base: u32,
    pub checksums: ChecksumMode,
}

impl Default for RemapOptions {
    fn default() -> Self {
        Self {
            pua_base: PUA_BASE,
            checksums: ChecksumMode::default(),
        }
    }
}

/// A retained table: its directory entry and an owned copy of its bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub record: TableRecord,
    pub data: Vec<u8>,
}

/// The tables of an sfnt font, minus the dropped ones, in directory order.
///
/// Table bytes are copied out while reading, the source buffer is not
/// borrowed past construction.
#[derive(Debug, Clone)]
pub struct FontContainer {
    pub sfnt_version: u32,
    tables: IndexMap<Tag, Table>,
}

impl FontContainer {
    /// Reads `data`, dropping the [`DEFAULT_DROP_TABLES`]
    pub fn new(data: &[u8]) -> Result<Self> {
        Self::with_dropped(data, &[])
    }

    /// Reads `data`, dropping the [`DEFAULT_DROP_TABLES`] and every tag in `extra`
    pub fn with_dropped(data: &[u8], extra: &[Tag]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let directory = TableDirectory::from_reader(&mut reader)?;

        let mut tables = IndexMap::with_capacity(directory.records.len());
        for record in directory.records {
            if DEFAULT_DROP_TABLES.contains(&record.tag) || extra.contains(&record.tag) {
                log::debug!("dropping '{}' table", record.tag);
                continue;
            }

            let data = reader
                .read_bytes_at(record.offset as usize, record.length as usize)?
                .to_vec();
            // a repeated tag keeps its first position and its last contents
            if let Some(previous) = tables.insert(record.tag, Table { record, data }) {
                log::debug!("'{}' table listed more than once", previous.record.tag);
            }
        }

        Ok(Self {
            sfnt_version: directory.header.sfnt_version,
            tables,
        })
    }

    /// Retained table tags, in directory order
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.tables.keys().copied()
    }

    pub fn table(&self, tag: Tag) -> Option<&Table> {
        self.tables.get(&tag)
    }

    pub fn table_data(&self, tag: Tag) -> Option<&[u8]> {
        self.tables.get(&tag).map(|table| table.data.as_slice())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// The glyph count from the retained maxp table
    pub fn num_glyphs(&self) -> Result<u16> {
        let maxp = self.table_data(Tag::MAXP).ok_or(Error::MissingTable(Tag::MAXP))?;
        Ok(maxp::num_glyphs(maxp)?)
    }

    /// Replaces the cmap with one mapping `pua_base + i` to glyph `i` for
    /// every glyph of the font.
    pub fn remap_cmap(&mut self, pua_base: u32) -> Result<()> {
        let num_glyphs = self.num_glyphs()?;
        if num_glyphs == 0 {
            return Err(Error::NoGlyphs);
        }

        let data = cmap::synthesize(pua_base, num_glyphs)?;
        let table = self
            .tables
            .get_mut(&Tag::CMAP)
            .ok_or(Error::MissingTable(Tag::CMAP))?;
        // the synthetic table may be longer than the source cmap, so the
        // directory has to carry its own length or the layout would cut it off
        table.record.length = data.len() as u32;
        table.data = data;

        log::debug!(
            "mapped {num_glyphs} glyphs to U+{pua_base:X}..U+{:X}",
            pua_base.saturating_add(u32::from(num_glyphs) - 1)
        );
        Ok(())
    }

    /// [`remap_with`](Self::remap_with) using the default options
    pub fn remap(&mut self) -> Result<Vec<u8>> {
        self.remap_with(&RemapOptions::default())
    }

    /// Replaces the cmap and serializes the font.
    ///
    /// Tables keep their directory order and are laid out back to back
    /// right after the directory, each padded to a 4 byte boundary. The
    /// layout has to be complete before anything is written since the
    /// directory holds absolute offsets.
    pub fn remap_with(&mut self, options: &RemapOptions) -> Result<Vec<u8>> {
        self.remap_cmap(options.pua_base)?;

        let num_tables = self.tables.len();
        let mut offset = OFFSET_TABLE_SIZE + num_tables * TABLE_RECORD_SIZE;
        let mut records = Vec::with_capacity(num_tables);
        for table in self.tables.values() {
            let mut record = table.record.clone();
            record.offset = offset as u32;
            offset += padded_length(table.data.len());

            if options.checksums == ChecksumMode::Recompute {
                record.checksum = checksum(table);
            }
            log::debug!("'{}' at {} ({} bytes)", record.tag, record.offset, record.length);
            records.push(record);
        }

        let mut out = ByteWriter::new(offset);
        OffsetTable::for_tables(self.sfnt_version, num_tables as u16).write(&mut out)?;
        for record in &records {
            record.write(&mut out)?;
        }
        for (record, table) in records.iter().zip(self.tables.values()) {
            out.write_bytes_at(record.offset as usize, &table.data)?;
        }

        Ok(out.into_inner())
    }
}

fn padded_length(length: usize) -> usize {
    (length + 3) & !3
}

fn checksum(table: &Table) -> u32 {
    if table.record.tag == Tag::HEAD && table.data.len() >= HEAD_CHECKSUM_ADJUSTMENT + 4 {
        let mut head = table.data.clone();
        head[HEAD_CHECKSUM_ADJUSTMENT..HEAD_CHECKSUM_ADJUSTMENT + 4].fill(0);
        return table_checksum(&head);
    }
    table_checksum(&table.data)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tables::cmap::Cmap;

    /// Builds a font with the given tables laid out in order, checksums
    /// set to a recognisable dummy value.
    fn build_font(tables: &[(Tag, &[u8])]) -> Vec<u8> {
        let directory_size = OFFSET_TABLE_SIZE + tables.len() * TABLE_RECORD_SIZE;
        let size = directory_size + tables.iter().map(|(_, d)| padded_length(d.len())).sum::<usize>();

        let mut out = ByteWriter::new(size);
        OffsetTable::for_tables(0x0001_0000, tables.len() as u16)
            .write(&mut out)
            .unwrap();
        let mut offset = directory_size;
        for (i, (tag, data)) in tables.iter().enumerate() {
            TableRecord {
                tag: *tag,
                checksum: 0xC0DE_0000 + i as u32,
                offset: offset as u32,
                length: data.len() as u32,
            }
            .write(&mut out)
            .unwrap();
            out.write_bytes_at(offset, data).unwrap();
            offset += padded_length(data.len());
        }
        out.into_inner()
    }

    const MAXP: &[u8] = &[0x00, 0x00, 0x50, 0x00, 0x00, 0x05];
    const CMAP: &[u8] = &[0x00, 0x00, 0x00, 0x00];

    #[test]
    fn drops_default_and_extra_tables() {
        let font = build_font(&[
            (Tag::GDEF, &[1, 2][..]),
            (Tag::CMAP, CMAP),
            (Tag::new(b"kern"), &[3][..]),
            (Tag::MAXP, MAXP),
            (Tag::GSUB, &[4, 5, 6][..]),
        ]);

        let container = FontContainer::new(&font).unwrap();
        assert_eq!(
            container.tags().collect::<Vec<_>>(),
            vec![Tag::CMAP, Tag::new(b"kern"), Tag::MAXP]
        );

        let container = FontContainer::with_dropped(&font, &[Tag::new(b"kern")]).unwrap();
        assert_eq!(container.tags().collect::<Vec<_>>(), vec![Tag::CMAP, Tag::MAXP]);
        assert_eq!(container.table_data(Tag::MAXP), Some(MAXP));
        assert_eq!(container.table(Tag::CMAP).unwrap().record.checksum, 0xC0DE_0001);
        assert_eq!(container.num_glyphs().unwrap(), 5);
    }

    #[test]
    fn table_past_the_end_is_out_of_bounds() {
        let mut font = build_font(&[(Tag::MAXP, MAXP)]);
        font.truncate(font.len() - 4);
        assert!(matches!(FontContainer::new(&font), Err(Error::Buffer(_))));
    }

    #[test]
    fn remap_lays_out_tables_in_order() {
        let name: &[u8] = &[1, 2, 3, 4, 5, 6, 7];
        let font = build_font(&[
            (Tag::new(b"name"), name),
            (Tag::CMAP, CMAP),
            (Tag::GPOS, &[9, 9][..]),
            (Tag::MAXP, MAXP),
        ]);

        let out = FontContainer::new(&font).unwrap().remap().unwrap();
        let mut reader = ByteReader::new(&out);
        let directory = TableDirectory::from_reader(&mut reader).unwrap();

        assert_eq!(
            directory.header,
            OffsetTable {
                sfnt_version: 0x0001_0000,
                num_tables: 3,
                search_range: 32,
                entry_selector: 1,
                range_shift: 16,
            }
        );
        let layout: Vec<_> = directory
            .records
            .iter()
            .map(|r| (r.tag, r.checksum, r.offset, r.length))
            .collect();
        assert_eq!(
            layout,
            vec![
                (Tag::new(b"name"), 0xC0DE_0000, 60, 7),
                (Tag::CMAP, 0xC0DE_0001, 68, 44),
                (Tag::MAXP, 0xC0DE_0003, 112, 6),
            ]
        );
        assert_eq!(out.len(), 120);
        assert_eq!(&out[60..67], name);
        assert_eq!(out[67], 0);
        assert_eq!(&out[112..118], MAXP);

        let cmap = Cmap::from_bytes(&out[68..112]).unwrap();
        for glyph in 0..5 {
            assert_eq!(cmap.map(PUA_BASE + glyph), Some(glyph));
        }
        assert_eq!(cmap.map(PUA_BASE + 5), None);
    }

    #[test]
    fn recomputes_checksums_on_request() {
        #[rustfmt::skip]
        let head: &[u8] = &[
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            0xFF, 0xFF, 0xFF, 0xFF, // checkSumAdjustment, ignored
            0x5F, 0x0F, 0x3C, 0xF5,
        ];
        let font = build_font(&[(Tag::HEAD, head), (Tag::CMAP, CMAP), (Tag::MAXP, MAXP)]);
        let options = RemapOptions {
            checksums: ChecksumMode::Recompute,
            ..RemapOptions::default()
        };

        let out = FontContainer::new(&font).unwrap().remap_with(&options).unwrap();
        let directory = TableDirectory::from_reader(&mut ByteReader::new(&out)).unwrap();

        let checksums: Vec<_> = directory.records.iter().map(|r| r.checksum).collect();
        let cmap = cmap::synthesize(PUA_BASE, 5).unwrap();
        assert_eq!(
            checksums,
            vec![
                0x0001_0000 + 0x0000_0001 + 0x5F0F_3CF5,
                table_checksum(&cmap),
                table_checksum(MAXP),
            ]
        );
    }

    #[test]
    fn recomputing_leaves_source_checksums_alone() {
        let font = build_font(&[(Tag::CMAP, CMAP), (Tag::MAXP, MAXP)]);
        let mut container = FontContainer::new(&font).unwrap();
        let recompute = RemapOptions {
            checksums: ChecksumMode::Recompute,
            ..RemapOptions::default()
        };

        container.remap_with(&recompute).unwrap();
        let out = container.remap().unwrap();
        let directory = TableDirectory::from_reader(&mut ByteReader::new(&out)).unwrap();

        let checksums: Vec<_> = directory.records.iter().map(|r| r.checksum).collect();
        assert_eq!(checksums, vec![0xC0DE_0000, 0xC0DE_0001]);
        assert_eq!(container.table(Tag::CMAP).unwrap().record.checksum, 0xC0DE_0000);
    }

    #[test]
    fn remap_needs_cmap_and_maxp() {
        let font = build_font(&[(Tag::MAXP, MAXP)]);
        assert!(matches!(
            FontContainer::new(&font).unwrap().remap(),
            Err(Error::MissingTable(Tag::CMAP))
        ));

        let font = build_font(&[(Tag::CMAP, CMAP)]);
        assert!(matches!(
            FontContainer::new(&font).unwrap().remap(),
            Err(Error::MissingTable(Tag::MAXP))
        ));

        let font = build_font(&[(Tag::CMAP, CMAP), (Tag::MAXP, &[0, 0, 0x50, 0, 0, 0][..])]);
        assert!(matches!(
            FontContainer::new(&font).unwrap().remap(),
            Err(Error::NoGlyphs)
        ));
    }
}
