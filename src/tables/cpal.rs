use std::fmt;

use crate::buffer::{BufferError, ByteReader};

use super::Unsupported;

/// An RGBA color. Stored on the wire as blue, green, red, alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, BufferError> {
        let blue = reader.read_u8()?;
        let green = reader.read_u8()?;
        let red = reader.read_u8()?;
        let alpha = reader.read_u8()?;

        Ok(Self { red, green, blue, alpha })
    }
}

/// Formats as `#rrggbbaa` in lowercase hex
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.red, self.green, self.blue, self.alpha
        )
    }
}

/// A [CPAL table](https://learn.microsoft.com/en-us/typography/opentype/spec/cpal),
/// versions 0 and 1. Only the palettes themselves are decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpalTable {
    pub version: u16,
    pub num_palette_entries: u16,
    pub unsupported: Option<Unsupported>,
    palettes: Vec<Vec<Color>>,
}

impl CpalTable {
    pub fn from_bytes(data: &[u8]) -> Result<Self, BufferError> {
        let mut reader = ByteReader::new(data);

        let version = reader.read_u16()?;
        if version > 1 {
            return Ok(Self {
                version,
                unsupported: Some(Unsupported::CpalVersion(version).report()),
                ..Self::default()
            });
        }

        let num_palette_entries = reader.read_u16()?;
        let num_palettes = reader.read_u16()?;
        let num_color_records = reader.read_u16()?;
        let color_records_offset = reader.read_u32()? as usize;
        let first_color_indices = (0..num_palettes)
            .map(|_| reader.read_u16().map(usize::from))
            .collect::<Result<Vec<_>, _>>()?;

        reader.seek_to(color_records_offset);
        let color_records = (0..num_color_records)
            .map(|_| Color::from_reader(&mut reader))
            .collect::<Result<Vec<_>, _>>()?;

        // each palette is numPaletteEntries records from its first index on
        let palettes = first_color_indices
            .into_iter()
            .map(|first| {
                let start = first.min(color_records.len());
                let end = (first + usize::from(num_palette_entries)).min(color_records.len());
                color_records[start..end].to_vec()
            })
            .collect();

        Ok(Self {
            version,
            num_palette_entries,
            unsupported: None,
            palettes,
        })
    }

    pub fn palettes(&self) -> &[Vec<Color>] {
        &self.palettes
    }

    pub fn palette(&self, index: usize) -> Option<&[Color]> {
        self.palettes.get(index).map(Vec::as_slice)
    }

    pub fn color(&self, palette: usize, entry: u16) -> Option<Color> {
        self.palette(palette)?.get(usize::from(entry)).copied()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[rustfmt::skip]
    static CPAL: &[u8] = &[
        0x00, 0x00,             // version
        0x00, 0x02,             // numPaletteEntries
        0x00, 0x02,             // numPalettes
        0x00, 0x04,             // numColorRecords
        0x00, 0x00, 0x00, 0x10, // colorRecordsArrayOffset
        0x00, 0x00, 0x00, 0x02, // colorRecordIndices
        // color records, BGRA
        0x11, 0x22, 0x33, 0xFF,
        0x00, 0x00, 0xFF, 0x80,
        0xFF, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0x00, 0x0A,
    ];

    #[test]
    fn reorders_bgra_records() {
        let cpal = CpalTable::from_bytes(CPAL).unwrap();
        let first = cpal.color(0, 0).unwrap();

        assert_eq!(first, Color { red: 0x33, green: 0x22, blue: 0x11, alpha: 0xFF });
        assert_eq!(first.to_string(), "#332211ff");
    }

    #[test]
    fn slices_palettes_from_their_first_index() {
        let cpal = CpalTable::from_bytes(CPAL).unwrap();
        let palettes: Vec<Vec<String>> = cpal
            .palettes()
            .iter()
            .map(|palette| palette.iter().map(Color::to_string).collect())
            .collect();

        assert_eq!(
            palettes,
            vec![
                vec!["#332211ff".to_string(), "#ff000080".to_string()],
                vec!["#0000ff00".to_string(), "#00ff000a".to_string()],
            ]
        );
        assert_eq!(cpal.color(2, 0), None);
        assert_eq!(cpal.color(0, 2), None);
    }

    #[test]
    fn version_1_trailing_arrays_are_skipped() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x01,             // version
            0x00, 0x02,             // numPaletteEntries
            0x00, 0x01,             // numPalettes
            0x00, 0x02,             // numColorRecords
            0x00, 0x00, 0x00, 0x1A, // colorRecordsArrayOffset
            0x00, 0x00,             // colorRecordIndices
            0x00, 0x00, 0x00, 0x22, // paletteTypesArrayOffset
            0x00, 0x00, 0x00, 0x26, // paletteLabelsArrayOffset
            0x00, 0x00, 0x00, 0x28, // paletteEntryLabelsArrayOffset
            // color records, BGRA
            0x10, 0x20, 0x30, 0x40,
            0x00, 0x00, 0x00, 0xFF,
            0x00, 0x00, 0x00, 0x01, // palette types: usable with light background
            0xFF, 0xFF,             // palette labels
            0xFF, 0xFF, 0xFF, 0xFF, // palette entry labels
        ];
        let cpal = CpalTable::from_bytes(&data).unwrap();

        assert_eq!(cpal.version, 1);
        assert_eq!(cpal.unsupported, None);
        assert_eq!(cpal.palettes().len(), 1);
        assert_eq!(cpal.color(0, 0).map(|c| c.to_string()), Some("#30201040".to_string()));
        assert_eq!(cpal.color(0, 1), Some(Color { red: 0, green: 0, blue: 0, alpha: 0xFF }));
    }

    #[test]
    fn later_versions_are_unsupported() {
        let cpal = CpalTable::from_bytes(&[0x00, 0x02]).unwrap();

        assert!(cpal.palettes().is_empty());
        assert_eq!(cpal.unsupported, Some(Unsupported::CpalVersion(2)));
    }

    #[test]
    fn truncated_records_are_out_of_bounds() {
        assert!(CpalTable::from_bytes(&CPAL[..20]).is_err());
    }
}
