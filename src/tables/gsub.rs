use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::buffer::{BufferError, ByteReader};

use super::{Tag, lookup::LookupTable};

/// A lazily decoded [GSUB table](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub)
///
/// Only the header is read up front. The feature list, the lookup offsets
/// and each individual lookup are decoded on first use and kept; most
/// lookups of a real font are never asked for.
///
/// The caches are `OnceLock`s, so a table can be shared between threads.
/// Two threads racing on the same entry may both decode it, the first
/// stored value wins and both get the same result.
#[derive(Debug)]
pub struct GsubTable<'a> {
    data: &'a [u8],
    pub major_version: u16,
    pub minor_version: u16,
    /// Kept for completeness, scripts and languages are not decoded
    pub script_list_offset: u16,
    pub feature_list_offset: u16,
    pub lookup_list_offset: u16,
    features: OnceLock<IndexMap<Tag, Vec<u16>>>,
    lookup_list: OnceLock<Vec<LookupSlot>>,
}

#[derive(Debug)]
struct LookupSlot {
    offset: usize,
    decoded: OnceLock<LookupTable>,
}

impl<'a> GsubTable<'a> {
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, BufferError> {
        let mut reader = ByteReader::new(data);

        Ok(Self {
            data,
            major_version: reader.read_u16()?,
            minor_version: reader.read_u16()?,
            script_list_offset: reader.read_u16()?,
            feature_list_offset: reader.read_u16()?,
            lookup_list_offset: reader.read_u16()?,
            features: OnceLock::new(),
            lookup_list: OnceLock::new(),
        })
    }

    /// Feature tags mapped to their lookup indices, in feature list order.
    ///
    /// A tag listed more than once (one record per script/language system)
    /// gets the lookup indices of every record, in order.
    pub fn features(&self) -> Result<&IndexMap<Tag, Vec<u16>>, BufferError> {
        if let Some(features) = self.features.get() {
            return Ok(features);
        }

        let features = self.decode_features()?;
        Ok(self.features.get_or_init(|| features))
    }

    fn decode_features(&self) -> Result<IndexMap<Tag, Vec<u16>>, BufferError> {
        let mut reader = ByteReader::new(self.data);
        let feature_list = usize::from(self.feature_list_offset);

        let feature_count = reader.read_u16_at(feature_list)?;
        let mut records = Vec::with_capacity(usize::from(feature_count));
        for _ in 0..feature_count {
            let tag = reader.read_tag()?;
            records.push((tag, feature_list + usize::from(reader.read_u16()?)));
        }

        let mut features: IndexMap<Tag, Vec<u16>> = IndexMap::new();
        for (tag, feature) in records {
            let _feature_params = reader.read_u16_at(feature)?;
            let lookup_index_count = reader.read_u16()?;

            let indices = features.entry(tag).or_default();
            for _ in 0..lookup_index_count {
                indices.push(reader.read_u16()?);
            }
        }

        log::debug!("decoded {} GSUB features", features.len());
        Ok(features)
    }

    fn lookup_slots(&self) -> Result<&[LookupSlot], BufferError> {
        if let Some(slots) = self.lookup_list.get() {
            return Ok(slots);
        }

        let mut reader = ByteReader::new(self.data);
        let lookup_list = usize::from(self.lookup_list_offset);
        let lookup_count = reader.read_u16_at(lookup_list)?;
        let slots = (0..lookup_count)
            .map(|_| {
                reader.read_u16().map(|offset| LookupSlot {
                    offset: lookup_list + usize::from(offset),
                    decoded: OnceLock::new(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.lookup_list.get_or_init(|| slots))
    }

    /// The number of lookups in the lookup list
    pub fn lookup_count(&self) -> Result<usize, BufferError> {
        Ok(self.lookup_slots()?.len())
    }

    /// The lookup at `index`, decoded on first call and cached after that.
    ///
    /// Returns `Ok(None)` when the index is past the end of the lookup list.
    pub fn lookup(&self, index: u16) -> Result<Option<&LookupTable>, BufferError> {
        let Some(slot) = self.lookup_slots()?.get(usize::from(index)) else {
            return Ok(None);
        };

        if let Some(lookup) = slot.decoded.get() {
            return Ok(Some(lookup));
        }

        let lookup = LookupTable::from_reader(&mut ByteReader::new(self.data), slot.offset)?;
        log::debug!("decoded GSUB lookup {index} ({} entries)", lookup.len());
        Ok(Some(slot.decoded.get_or_init(|| lookup)))
    }

    /// How many lookups have been decoded so far
    pub fn decoded_lookup_count(&self) -> usize {
        self.lookup_list
            .get()
            .map_or(0, |slots| slots.iter().filter(|slot| slot.decoded.get().is_some()).count())
    }
}
