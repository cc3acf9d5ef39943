#![allow(dead_code)]

use sfnt_remap::{
    buffer::ByteWriter,
    tables::{OFFSET_TABLE_SIZE, OffsetTable, TABLE_RECORD_SIZE, TableRecord, Tag},
};

/// Assembles an sfnt blob from raw tables, in the given order, each padded
/// to 4 bytes. Checksums are `0xC0DE0000 + index` so pass-through is visible.
pub fn build_font(tables: &[(Tag, Vec<u8>)]) -> Vec<u8> {
    let padded = |len: usize| (len + 3) & !3;
    let directory_size = OFFSET_TABLE_SIZE + tables.len() * TABLE_RECORD_SIZE;
    let size = directory_size + tables.iter().map(|(_, data)| padded(data.len())).sum::<usize>();

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
        offset += padded(data.len());
    }

    out.into_inner()
}

/// A version 1.0 maxp header announcing `num_glyphs` glyphs
pub fn maxp(num_glyphs: u16) -> Vec<u8> {
    let mut data = vec![0x00, 0x01, 0x00, 0x00];
    data.extend(num_glyphs.to_be_bytes());
    data.extend([0u8; 26]);
    data
}

/// A minimal cmap with a single empty format 4 subtable
pub fn format_4_cmap() -> Vec<u8> {
    #[rustfmt::skip]
    let data = vec![
        0x00, 0x00, 0x00, 0x01,
        0x00, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0C,
        // format 4 with a single 0xFFFF end segment
        0x00, 0x04, 0x00, 0x18, 0x00, 0x00,
        0x00, 0x02, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
        0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x01, 0x00, 0x00,
    ];
    data
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
