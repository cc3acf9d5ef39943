use buffer::BufferError;
use tables::Tag;
use thiserror::Error;

pub mod buffer;
pub mod container;
pub mod font;
pub mod tables;

pub use container::{ChecksumMode, DEFAULT_DROP_TABLES, FontContainer, PUA_BASE, RemapOptions};
pub use font::{ColorLayer, Font};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// The writer needs a table that is not in the (retained) directory.
    #[error("font has no '{0}' table")]
    MissingTable(Tag),

    /// The glyph count table reports zero glyphs, so no private-use group can be built.
    #[error("font has no glyphs to remap")]
    NoGlyphs,

    #[error("invalid table tag {0:?}, expected 1 to 4 printable ASCII characters")]
    InvalidTag(String),
}

pub type Result<T> = std::result::Result<T, Error>;
