use std::collections::BTreeMap;

use crate::buffer::{BufferError, ByteReader};

use super::Unsupported;

/// A layer of a color glyph: an outline glyph painted with a palette entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRecord {
    pub glyph: u16,
    pub palette_index: u16,
}

/// The version 0 [COLR table](https://learn.microsoft.com/en-us/typography/opentype/spec/colr)
/// as base glyph to ordered layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColrTable {
    pub version: u16,
    pub unsupported: Option<Unsupported>,
    layers: BTreeMap<u16, Vec<LayerRecord>>,
}

impl ColrTable {
    pub fn from_bytes(data: &[u8]) -> Result<Self, BufferError> {
        let mut reader = ByteReader::new(data);

        let version = reader.read_u16()?;
        if version > 0 {
            return Ok(Self {
                version,
                unsupported: Some(Unsupported::ColrVersion(version).report()),
                ..Self::default()
            });
        }

        let num_base_glyph_records = reader.read_u16()?;
        let base_glyph_records_offset = reader.read_u32()? as usize;
        let layer_records_offset = reader.read_u32()? as usize;
        let num_layer_records = reader.read_u16()?;

        reader.seek_to(layer_records_offset);
        let layer_records = (0..num_layer_records)
            .map(|_| -> Result<_, BufferError> {
                Ok(LayerRecord {
                    glyph: reader.read_u16()?,
                    palette_index: reader.read_u16()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        reader.seek_to(base_glyph_records_offset);
        let mut layers = BTreeMap::new();
        for _ in 0..num_base_glyph_records {
            let glyph = reader.read_u16()?;
            let first_layer = usize::from(reader.read_u16()?);
            let num_layers = usize::from(reader.read_u16()?);

            // slices reaching past the layer records are cut short
            let start = first_layer.min(layer_records.len());
            let end = (first_layer + num_layers).min(layer_records.len());
            layers.insert(glyph, layer_records[start..end].to_vec());
        }

        Ok(Self {
            version,
            unsupported: None,
            layers,
        })
    }

    /// The layers of `glyph`, bottom first, or `None` if it is not a color glyph
    pub fn layers(&self, glyph: u16) -> Option<&[LayerRecord]> {
        self.layers.get(&glyph).map(Vec::as_slice)
    }

    /// Base glyphs in increasing glyph id order
    pub fn base_glyphs(&self) -> impl Iterator<Item = u16> + '_ {
        self.layers.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
