use crate::buffer::{BufferError, ByteReader};

use super::Unsupported;

/// A decoded [Coverage table](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#coverage-table)
///
/// Position in the list is the coverage index. Well formed tables are
/// dense; ranges that leave holes on malformed input leave `None` slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageTable {
    glyphs: Vec<Option<u16>>,
    pub unsupported: Option<Unsupported>,
}

impl CoverageTable {
    /// Decodes the coverage table at the absolute `offset`, leaving the
    /// reader's cursor where it was.
    pub fn from_reader(reader: &mut ByteReader<'_>, offset: usize) -> Result<Self, BufferError> {
        reader.restoring(|reader| {
            let mut coverage = Self::default();

            match reader.read_u16_at(offset)? {
                1 => {
                    let glyph_count = reader.read_u16()?;
                    for _ in 0..glyph_count {
                        coverage.glyphs.push(Some(reader.read_u16()?));
                    }
                }
                2 => {
                    let range_count = reader.read_u16()?;
                    for _ in 0..range_count {
                        let start_glyph = reader.read_u16()?;
                        let end_glyph = reader.read_u16()?;
                        let start_index = usize::from(reader.read_u16()?);

                        for (i, glyph) in (start_glyph..=end_glyph).enumerate() {
                            coverage.set(start_index + i, glyph);
                        }
                    }
                }
                format => coverage.unsupported = Some(Unsupported::CoverageFormat(format).report()),
            }

            Ok(coverage)
        })
    }

    fn set(&mut self, index: usize, glyph: u16) {
        if self.glyphs.len() <= index {
            self.glyphs.resize(index + 1, None);
        }
        self.glyphs[index] = Some(glyph);
    }

    /// The glyph at a coverage index, `None` past the end or in a hole
    pub fn get(&self, index: usize) -> Option<u16> {
        self.glyphs.get(index).copied().flatten()
    }

    /// The number of coverage slots, holes included
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Every slot in coverage index order
    pub fn slots(&self) -> &[Option<u16>] {
        &self.glyphs
    }

    /// `(coverage index, glyph)` pairs, skipping holes
    pub fn iter(&self) -> impl Iterator<Item = (usize, u16)> + '_ {
        self.glyphs
            .iter()
            .enumerate()
            .filter_map(|(index, glyph)| glyph.map(|glyph| (index, glyph)))
    }
}
