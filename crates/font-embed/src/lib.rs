//! Compact embedding font (CEF) and SVG font generation.
//!
//! The crate takes a source font (Type 1 in PFA / PFB / Macintosh resource containers,
//! CID-keyed Type 1, bare or OpenType-wrapped CFF, or TrueType), subsets it according to
//! an [`EmbeddingSpec`] and writes either a minimal sfnt container with `CFF `, `cmap`
//! and optional `GPOS` tables, or an SVG font.
//!
//! All I/O goes through a client-supplied [`StreamProvider`]; [`MemoryStreams`] and
//! [`FileStreams`] cover the common cases.
//!
//! # Examples
//!
//! ```no_run
//! use font_embed::{Embedder, EmbeddingSpec, FileStreams, SubsetGlyph, NO_UNICODE};
//!
//! let streams = FileStreams::new("Font.pfb", "Font.cef");
//! let mut embedder = Embedder::new(streams);
//! // Type 1 glyphs are keyed by name; ids index into the name array.
//! let names = [".notdef", "A", "B"];
//! let glyphs = [
//!     SubsetGlyph::new(0, NO_UNICODE),
//!     SubsetGlyph::new(1, 'A'.into()),
//!     SubsetGlyph::new(2, 'B'.into()),
//! ];
//! let spec = EmbeddingSpec::new(&glyphs).with_names(&names);
//! embedder.make_embedding_font(&spec, None)?;
//! # Ok::<_, font_embed::EmbedError>(())
//! ```

mod cmap;
mod embed;
mod errors;
mod font;
mod glyph;
mod gpos;
mod sniff;
mod spec;
mod stream;
mod subset;
#[cfg(test)]
pub(crate) mod tests;
mod write;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

pub use crate::{
    embed::Embedder,
    errors::{EmbedError, ErrorKind},
    font::TableTag,
    spec::{
        EmbedFlags, EmbeddingSpec, KernPair, MappedGlyph, Subset, SubsetGlyph, MAX_UDV_LEN,
        NO_UNICODE, VID_BEGIN,
    },
    stream::{ClientStream, FileStreams, MemoryStreams, StreamProvider, StreamRole},
    write::{SfntContext, SvgFlags, TableHandler},
};

/// Names of the components of the embedding pipeline, in the order they are invoked.
const COMPONENTS: [&str; 6] = ["sniff", "type1", "cff-parse", "truetype", "cff-write", "sfnt"];

/// Reports the crate version together with the names of pipeline components.
///
/// `report` is called first with the crate name and version, and then once for each
/// component with the component name and the crate version.
pub fn versions(mut report: impl FnMut(&str, &str)) {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    report(env!("CARGO_PKG_NAME"), VERSION);
    for component in COMPONENTS {
        report(component, VERSION);
    }
}
