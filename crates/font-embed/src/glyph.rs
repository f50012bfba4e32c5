//! Glyph callback interface shared by parsers and writers.

use crate::errors::EmbedError;

/// Identity of a glyph delivered by a parser.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GlyphInfo<'a> {
    /// Glyph index in the source font.
    pub(crate) tag: u16,
    /// Glyph name for name-keyed sources.
    pub(crate) name: Option<&'a str>,
    /// CID for CID-keyed sources.
    pub(crate) cid: Option<u16>,
    /// Index of the font dictionary the glyph belongs to.
    pub(crate) fd: u8,
}

/// Decision returned by [`GlyphSink::begin()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GlyphAction {
    /// Deliver the glyph outline.
    Parse,
    /// Skip the glyph; no further callbacks are made for it.
    Skip,
}

/// Accented character composed by the `seac` operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Seac {
    pub(crate) adx: f32,
    pub(crate) ady: f32,
    /// StandardEncoding code of the base character.
    pub(crate) base: u8,
    /// StandardEncoding code of the accent.
    pub(crate) accent: u8,
}

/// Receives glyph outlines from parsers.
///
/// Coordinates are absolute, in font units. Parsers flatten subroutines, `flex` and `seac`
/// before calling path methods; hint-related callbacks have no-op defaults.
pub(crate) trait GlyphSink {
    fn begin(&mut self, info: &GlyphInfo<'_>) -> Result<GlyphAction, EmbedError>;

    /// Advance width of the glyph. Called before any path operations.
    fn width(&mut self, width: f32);

    fn move_to(&mut self, x: f32, y: f32);

    fn line_to(&mut self, x: f32, y: f32);

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32);

    /// Stem hint (`vertical == true` for vertical stems).
    fn stem(&mut self, _edge: f32, _width: f32, _vertical: bool) {}

    /// Flex hint. The default implementation renders both curves.
    fn flex(&mut self, _depth: f32, curves: &[[f32; 6]; 2]) {
        for &[x1, y1, x2, y2, x3, y3] in curves {
            self.curve_to(x1, y1, x2, y2, x3, y3);
        }
    }

    /// Operator without a dedicated callback (e.g., `dotsection` or hint replacement).
    fn generic_op(&mut self, _op: u16, _args: &[f32]) {}

    /// Notifies that the glyph is composed of two standard glyphs. Parsers deliver
    /// the composed outline afterwards.
    fn seac(&mut self, _seac: &Seac) {}

    fn end(&mut self) -> Result<(), EmbedError>;
}

/// Records glyph callbacks; used in tests to inspect parser output.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub(crate) glyphs: Vec<RecordedGlyph>,
}

#[cfg(test)]
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct RecordedGlyph {
    pub(crate) tag: u16,
    pub(crate) name: Option<String>,
    pub(crate) cid: Option<u16>,
    pub(crate) fd: u8,
    pub(crate) width: Option<f32>,
    pub(crate) path: Vec<PathOp>,
    pub(crate) seac: Option<Seac>,
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PathOp {
    Move(f32, f32),
    Line(f32, f32),
    Curve([f32; 6]),
}

#[cfg(test)]
impl RecordingSink {
    fn current(&mut self) -> &mut RecordedGlyph {
        self.glyphs.last_mut().expect("no current glyph")
    }
}

#[cfg(test)]
impl GlyphSink for RecordingSink {
    fn begin(&mut self, info: &GlyphInfo<'_>) -> Result<GlyphAction, EmbedError> {
        self.glyphs.push(RecordedGlyph {
            tag: info.tag,
            name: info.name.map(str::to_owned),
            cid: info.cid,
            fd: info.fd,
            ..RecordedGlyph::default()
        });
        Ok(GlyphAction::Parse)
    }

    fn width(&mut self, width: f32) {
        let glyph = self.current();
        assert!(glyph.width.is_none(), "width reported twice");
        assert!(glyph.path.is_empty(), "width reported after path");
        glyph.width = Some(width);
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.current().path.push(PathOp::Move(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.current().path.push(PathOp::Line(x, y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) {
        self.current().path.push(PathOp::Curve([x1, y1, x2, y2, x3, y3]));
    }

    fn seac(&mut self, seac: &Seac) {
        self.current().seac = Some(*seac);
    }

    fn end(&mut self) -> Result<(), EmbedError> {
        Ok(())
    }
}
