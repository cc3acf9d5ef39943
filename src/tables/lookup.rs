use std::collections::{BTreeMap, btree_map};

use crate::buffer::{BufferError, ByteReader};

use super::{Unsupported, coverage::CoverageTable};

pub const SINGLE_SUBSTITUTION: u16 = 1;
pub const MULTIPLE_SUBSTITUTION: u16 = 2;
pub const ALTERNATE_SUBSTITUTION: u16 = 3;
pub const LIGATURE_SUBSTITUTION: u16 = 4;

/// Lookup flag bit announcing a trailing mark filtering set index
pub const USE_MARK_FILTERING_SET: u16 = 0x0010;

/// What a substitution applies to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LookupKey {
    Glyph(u16),
    /// An ordered glyph sequence, e.g. the components of a ligature
    Sequence(Vec<u16>),
}

/// What a substitution produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitute {
    Glyph(u16),
    /// Ordered candidates of an alternate substitution. Which one is used by
    /// default is up to the caller.
    Alternates(Vec<u16>),
}

/// A decoded GSUB [Lookup table](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#lookup-table)
/// flattened into a key to substitute mapping.
///
/// Single (type 1, formats 1 and 2), alternate (type 3) and ligature
/// (type 4) substitutions are decoded. Subtables of any other type or format
/// are skipped and listed in `skipped`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    pub lookup_type: u16,
    pub flags: u16,
    pub mark_filtering_set: Option<u16>,
    pub skipped: Vec<Unsupported>,
    mapping: BTreeMap<LookupKey, Substitute>,
}

impl LookupTable {
    /// Decodes the lookup at the absolute `offset`, leaving the reader's
    /// cursor where it was.
    ///
    /// Subtable offsets are relative to the lookup, offsets inside a
    /// subtable are relative to that subtable. Later subtables overwrite
    /// keys set by earlier ones.
    pub fn from_reader(reader: &mut ByteReader<'_>, offset: usize) -> Result<Self, BufferError> {
        reader.restoring(|reader| {
            let lookup_type = reader.read_u16_at(offset)?;
            let flags = reader.read_u16()?;
            let subtable_count = reader.read_u16()?;
            let subtables = (0..subtable_count)
                .map(|_| reader.read_u16().map(|o| offset + usize::from(o)))
                .collect::<Result<Vec<_>, _>>()?;
            let mark_filtering_set = if flags & USE_MARK_FILTERING_SET != 0 {
                Some(reader.read_u16()?)
            } else {
                None
            };

            let mut lookup = Self {
                lookup_type,
                flags,
                mark_filtering_set,
                skipped: Vec::new(),
                mapping: BTreeMap::new(),
            };
            for subtable in subtables {
                lookup.decode_subtable(reader, subtable)?;
            }

            Ok(lookup)
        })
    }

    fn decode_subtable(&mut self, reader: &mut ByteReader<'_>, subtable: usize) -> Result<(), BufferError> {
        if !matches!(
            self.lookup_type,
            SINGLE_SUBSTITUTION | ALTERNATE_SUBSTITUTION | LIGATURE_SUBSTITUTION
        ) {
            self.skip(Unsupported::LookupType(self.lookup_type));
            return Ok(());
        }

        reader.restoring(|reader| {
            let format = reader.read_u16_at(subtable)?;
            match (self.lookup_type, format) {
                (SINGLE_SUBSTITUTION, 1) => self.single_delta(reader, subtable),
                (SINGLE_SUBSTITUTION, 2) => self.single_list(reader, subtable),
                (ALTERNATE_SUBSTITUTION, 1) => self.alternates(reader, subtable),
                (LIGATURE_SUBSTITUTION, 1) => self.ligatures(reader, subtable),
                (lookup_type, format) => {
                    self.skip(Unsupported::SubtableFormat { lookup_type, format });
                    Ok(())
                }
            }
        })
    }

    fn skip(&mut self, unsupported: Unsupported) {
        self.skipped.push(unsupported.report());
    }

    /// Reads the coverage offset at the cursor and decodes the coverage it points to
    fn coverage(reader: &mut ByteReader<'_>, subtable: usize) -> Result<CoverageTable, BufferError> {
        let coverage_offset = subtable + usize::from(reader.read_u16()?);
        CoverageTable::from_reader(reader, coverage_offset)
    }

    // Single substitution format 1: every covered glyph plus a delta
    fn single_delta(&mut self, reader: &mut ByteReader<'_>, subtable: usize) -> Result<(), BufferError> {
        let coverage = Self::coverage(reader, subtable)?;
        let delta = reader.read_i16()?;

        for (_, glyph) in coverage.iter() {
            self.mapping.insert(
                LookupKey::Glyph(glyph),
                Substitute::Glyph(glyph.wrapping_add_signed(delta)),
            );
        }
        Ok(())
    }

    // Single substitution format 2: substitutes in coverage order
    fn single_list(&mut self, reader: &mut ByteReader<'_>, subtable: usize) -> Result<(), BufferError> {
        let coverage = Self::coverage(reader, subtable)?;
        let glyph_count = reader.read_u16()?;

        for i in 0..usize::from(glyph_count) {
            let substitute = reader.read_u16()?;
            if let Some(glyph) = coverage.get(i) {
                self.mapping
                    .insert(LookupKey::Glyph(glyph), Substitute::Glyph(substitute));
            }
        }
        Ok(())
    }

    fn alternates(&mut self, reader: &mut ByteReader<'_>, subtable: usize) -> Result<(), BufferError> {
        let coverage = Self::coverage(reader, subtable)?;
        let alternate_sets = read_offset_array(reader, subtable)?;

        for (i, alternate_set) in alternate_sets.into_iter().enumerate() {
            let glyph_count = reader.read_u16_at(alternate_set)?;
            let alternates = (0..glyph_count)
                .map(|_| reader.read_u16())
                .collect::<Result<Vec<_>, _>>()?;

            if let Some(glyph) = coverage.get(i) {
                self.mapping
                    .insert(LookupKey::Glyph(glyph), Substitute::Alternates(alternates));
            }
        }
        Ok(())
    }

    fn ligatures(&mut self, reader: &mut ByteReader<'_>, subtable: usize) -> Result<(), BufferError> {
        let coverage = Self::coverage(reader, subtable)?;
        let ligature_sets = read_offset_array(reader, subtable)?;

        for (i, ligature_set) in ligature_sets.into_iter().enumerate() {
            reader.seek_to(ligature_set);
            let ligatures = read_offset_array(reader, ligature_set)?;

            for ligature in ligatures {
                let ligature_glyph = reader.read_u16_at(ligature)?;
                let component_count = reader.read_u16()?;

                // the first component is the covered glyph, only the rest is stored
                let mut components = Vec::with_capacity(usize::from(component_count));
                components.extend(coverage.get(i));
                for _ in 1..component_count {
                    components.push(reader.read_u16()?);
                }

                if coverage.get(i).is_some() {
                    self.mapping.insert(
                        LookupKey::Sequence(components),
                        Substitute::Glyph(ligature_glyph),
                    );
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &LookupKey) -> Option<&Substitute> {
        self.mapping.get(key)
    }

    pub fn get_glyph(&self, glyph: u16) -> Option<&Substitute> {
        self.mapping.get(&LookupKey::Glyph(glyph))
    }

    pub fn get_sequence(&self, glyphs: &[u16]) -> Option<&Substitute> {
        self.mapping.get(&LookupKey::Sequence(glyphs.to_vec()))
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, LookupKey, Substitute> {
        self.mapping.iter()
    }
}

/// Reads a u16 count followed by that many u16 offsets relative to `base`
fn read_offset_array(reader: &mut ByteReader<'_>, base: usize) -> Result<Vec<usize>, BufferError> {
    let count = reader.read_u16()?;
    (0..count)
        .map(|_| reader.read_u16().map(|o| base + usize::from(o)))
        .collect()
}
