//! Read side access to the layout and color tables of a font.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

use crate::{
    Result,
    buffer::{BufferError, ByteReader},
    tables::{
        TableDirectory, Tag,
        colr::ColrTable,
        cpal::{Color, CpalTable},
        gsub::GsubTable,
        lookup::Substitute,
    },
};

/// Features a shaper applies on its own; their substitutes are never
/// offered as alternatives.
pub const REQUIRED_FEATURES: [Tag; 9] = [
    Tag::new(b"isol"),
    Tag::new(b"init"),
    Tag::new(b"medi"),
    Tag::new(b"fina"),
    Tag::new(b"rlig"),
    Tag::new(b"rclt"),
    Tag::new(b"calt"),
    Tag::new(b"dist"),
    Tag::new(b"ccmp"),
];

/// A color glyph layer with its palette 0 color resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorLayer {
    pub glyph: u16,
    /// `None` when the font has no CPAL or the entry is out of range
    pub color: Option<Color>,
}

/// A font blob with lazily decoded GSUB, COLR and CPAL tables.
///
/// Tables are looked up in the directory on first use; a missing table is
/// `None`, not an error.
#[derive(Debug)]
pub struct Font<'a> {
    data: &'a [u8],
    directory: TableDirectory,
    gsub: OnceLock<Option<GsubTable<'a>>>,
    colr: OnceLock<Option<ColrTable>>,
    cpal: OnceLock<Option<CpalTable>>,
    color_layers: Mutex<HashMap<u16, Arc<[ColorLayer]>>>,
}

impl<'a> Font<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let directory = TableDirectory::from_reader(&mut ByteReader::new(data))?;

        Ok(Self {
            data,
            directory,
            gsub: OnceLock::new(),
            colr: OnceLock::new(),
            cpal: OnceLock::new(),
            color_layers: Mutex::new(HashMap::new()),
        })
    }

    pub fn directory(&self) -> &TableDirectory {
        &self.directory
    }

    /// The bytes of a table, `None` if it is absent or empty
    pub fn table_data(&self, tag: Tag) -> Result<Option<&'a [u8]>> {
        let Some(record) = self.directory.find(tag).filter(|record| record.length > 0) else {
            return Ok(None);
        };

        let data = ByteReader::new(self.data)
            .read_bytes_at(record.offset as usize, record.length as usize)?;
        Ok(Some(data))
    }

    fn cached<'s, T>(
        &'s self,
        cell: &'s OnceLock<Option<T>>,
        tag: Tag,
        decode: impl FnOnce(&'a [u8]) -> std::result::Result<T, BufferError>,
    ) -> Result<Option<&'s T>> {
        if let Some(table) = cell.get() {
            return Ok(table.as_ref());
        }

        let table = self.table_data(tag)?.map(decode).transpose()?;
        Ok(cell.get_or_init(|| table).as_ref())
    }

    pub fn gsub(&self) -> Result<Option<&GsubTable<'a>>> {
        self.cached(&self.gsub, Tag::GSUB, GsubTable::from_bytes)
    }

    pub fn colr(&self) -> Result<Option<&ColrTable>> {
        self.cached(&self.colr, Tag::COLR, ColrTable::from_bytes)
    }

    pub fn cpal(&self) -> Result<Option<&CpalTable>> {
        self.cached(&self.cpal, Tag::CPAL, CpalTable::from_bytes)
    }

    /// What `lookup_index` substitutes for `glyph`.
    ///
    /// With a `next` glyph the pair is tried first, so a two glyph ligature
    /// wins over a single glyph substitution.
    pub fn substitute(&self, lookup_index: u16, glyph: u16, next: Option<u16>) -> Result<Option<&Substitute>> {
        let Some(gsub) = self.gsub()? else {
            return Ok(None);
        };
        let Some(lookup) = gsub.lookup(lookup_index)? else {
            return Ok(None);
        };

        if let Some(substitute) = next.and_then(|next| lookup.get_sequence(&[glyph, next])) {
            return Ok(Some(substitute));
        }
        Ok(lookup.get_glyph(glyph))
    }

    /// Every substitute the optional features of the font offer for `glyph`
    /// (followed by `next`), as unique `(feature, substitute)` pairs in
    /// feature list order.
    pub fn substitutes(&self, glyph: u16, next: Option<u16>) -> Result<Vec<(Tag, Substitute)>> {
        let Some(gsub) = self.gsub()? else {
            return Ok(Vec::new());
        };

        let mut substitutes = Vec::new();
        for (tag, lookups) in gsub.features()? {
            if REQUIRED_FEATURES.contains(tag) {
                continue;
            }
            for &lookup in lookups {
                if let Some(substitute) = self.substitute(lookup, glyph, next)? {
                    let entry = (*tag, substitute.clone());
                    if !substitutes.contains(&entry) {
                        substitutes.push(entry);
                    }
                }
            }
        }

        Ok(substitutes)
    }

    /// The color layers of `glyph`, empty for plain glyphs. Cached per glyph.
    pub fn color_layers(&self, glyph: u16) -> Result<Arc<[ColorLayer]>> {
        if let Some(layers) = self.lock_color_layers().get(&glyph) {
            return Ok(Arc::clone(layers));
        }

        let palette = self.cpal()?.and_then(|cpal| cpal.palette(0));
        let layers: Arc<[ColorLayer]> = self
            .colr()?
            .and_then(|colr| colr.layers(glyph))
            .unwrap_or_default()
            .iter()
            .map(|layer| ColorLayer {
                glyph: layer.glyph,
                color: palette.and_then(|p| p.get(usize::from(layer.palette_index)).copied()),
            })
            .collect();

        Ok(Arc::clone(
            self.lock_color_layers().entry(glyph).or_insert(layers),
        ))
    }

    fn lock_color_layers(&self) -> std::sync::MutexGuard<'_, HashMap<u16, Arc<[ColorLayer]>>> {
        // the map only ever gains complete entries, a poisoned lock is still consistent
        self.color_layers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
