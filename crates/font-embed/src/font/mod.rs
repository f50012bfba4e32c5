//! Source font parsers.

use core::{fmt, ops};

pub(crate) use self::{cff::{ops as cff_ops, CffParser}, truetype::TrueTypeParser, type1::Type1Parser};
use crate::{
    errors::{EmbedError, ParseError, ParseErrorKind},
    glyph::GlyphSink,
};

mod cff;
mod charstring;
pub(crate) mod strings;
mod truetype;
mod type1;

/// Big-endian reader over font data. Keeps track of the absolute offset for error reporting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    pub(crate) bytes: &'a [u8],
    pub(crate) offset: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub(crate) fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.offset)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), ParseError> {
        if self.bytes.len() < len {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        }
        self.bytes = &self.bytes[len..];
        self.offset += len;
        Ok(())
    }

    /// Splits off the first `len` bytes into a separate cursor.
    pub(crate) fn split_at(&mut self, len: usize) -> Result<Self, ParseError> {
        if self.bytes.len() < len {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        }
        let (head, tail) = self.bytes.split_at(len);
        let head = Self {
            bytes: head,
            offset: self.offset,
        };
        self.bytes = tail;
        self.offset += len;
        Ok(head)
    }

    /// Returns a cursor for the specified range relative to the current position.
    pub(crate) fn range(&self, range: ops::Range<usize>) -> Result<Self, ParseError> {
        let bytes = self.bytes.get(range.clone()).ok_or_else(|| {
            self.err(ParseErrorKind::RangeOutOfBounds {
                range: range.clone(),
                len: self.bytes.len(),
            })
        })?;
        Ok(Self {
            bytes,
            offset: self.offset + range.start,
        })
    }

    /// Returns a cursor starting at the specified offset relative to the current position.
    pub(crate) fn at(&self, offset: usize) -> Result<Self, ParseError> {
        if offset > self.bytes.len() {
            return Err(self.err(ParseErrorKind::OffsetOutOfBounds(offset)));
        }
        Ok(Self {
            bytes: &self.bytes[offset..],
            offset: self.offset + offset,
        })
    }

    pub(crate) fn read_byte_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let head = self.split_at(N)?;
        // `unwrap()` is safe: `head` has exactly `N` bytes
        Ok(head.bytes.try_into().unwrap())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ParseError> {
        self.read_byte_array::<1>().map(|[byte]| byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ParseError> {
        self.read_byte_array().map(u16::from_be_bytes)
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, ParseError> {
        self.read_byte_array().map(i16::from_be_bytes)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ParseError> {
        self.read_byte_array().map(u32::from_be_bytes)
    }

    /// Reads a big-endian unsigned integer of 1 to 4 bytes.
    pub(crate) fn read_offset(&mut self, size: u8) -> Result<u32, ParseError> {
        match size {
            1 => self.read_u8().map(u32::from),
            2 => self.read_u16().map(u32::from),
            3 => {
                let [a, b, c] = self.read_byte_array()?;
                Ok(u32::from_be_bytes([0, a, b, c]))
            }
            4 => self.read_u32(),
            _ => Err(self.err(ParseErrorKind::UnexpectedFormat(size))),
        }
    }

    pub(crate) fn read_u16_checked<T>(
        &mut self,
        check: impl FnOnce(u16) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let offset = self.offset;
        let value = self.read_u16()?;
        check(value).map_err(|kind| ParseError::new(kind, offset))
    }
}

/// OpenType table tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableTag(pub [u8; 4]);

impl fmt::Debug for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "TableTag({self})")
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(formatter, "{}", char::from(byte))?;
            } else {
                write!(formatter, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

impl TableTag {
    /// `cmap` table.
    pub const CMAP: Self = Self(*b"cmap");
    /// `CFF ` table.
    pub const CFF: Self = Self(*b"CFF ");
    /// `GPOS` table.
    pub const GPOS: Self = Self(*b"GPOS");
    pub(crate) const TYP1: Self = Self(*b"TYP1");
    pub(crate) const CID: Self = Self(*b"CID ");
    pub(crate) const HEAD: Self = Self(*b"head");
    pub(crate) const HHEA: Self = Self(*b"hhea");
    pub(crate) const HMTX: Self = Self(*b"hmtx");
    pub(crate) const MAXP: Self = Self(*b"maxp");
    pub(crate) const LOCA: Self = Self(*b"loca");
    pub(crate) const GLYF: Self = Self(*b"glyf");
    pub(crate) const NAME: Self = Self(*b"name");
    pub(crate) const POST: Self = Self(*b"post");
}

/// sfnt table directory.
#[derive(Debug)]
pub(crate) struct TableDirectory {
    pub(crate) version: u32,
    records: Vec<(TableTag, ops::Range<usize>)>,
}

impl TableDirectory {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut cursor = Cursor::new(bytes);
        let version = cursor.read_u32()?;
        let table_count = cursor.read_u16()?;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let records = (0..table_count).map(|_| {
            let tag = TableTag(cursor.read_byte_array()?);
            cursor.skip(4)?; // checksum
            let offset = cursor.read_u32()? as usize;
            let len = cursor.read_u32()? as usize;
            let range = offset..offset.saturating_add(len);
            if range.end > bytes.len() {
                return Err(cursor.err(ParseErrorKind::RangeOutOfBounds {
                    range,
                    len: bytes.len(),
                }));
            }
            Ok((tag, range))
        });
        Ok(Self {
            version,
            records: records.collect::<Result<_, ParseError>>()?,
        })
    }

    pub(crate) fn table_range(&self, tag: TableTag) -> Option<ops::Range<usize>> {
        self.records
            .iter()
            .find_map(|(record_tag, range)| (*record_tag == tag).then(|| range.clone()))
    }
}

/// Top-level font data shared by all font technologies.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FontInfo {
    pub(crate) font_name: String,
    pub(crate) version: Option<String>,
    pub(crate) notice: Option<String>,
    pub(crate) copyright: Option<String>,
    pub(crate) full_name: Option<String>,
    pub(crate) family_name: Option<String>,
    pub(crate) weight: Option<String>,
    pub(crate) is_fixed_pitch: bool,
    pub(crate) italic_angle: f32,
    pub(crate) underline_position: f32,
    pub(crate) underline_thickness: f32,
    pub(crate) font_matrix: Option<[f32; 6]>,
    pub(crate) font_bbox: [f32; 4],
    /// Present for CID-keyed fonts.
    pub(crate) cid: Option<CidInfo>,
    /// Font dictionaries. Name-keyed fonts have exactly one.
    pub(crate) font_dicts: Vec<FontDict>,
    pub(crate) glyph_count: usize,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            font_name: String::new(),
            version: None,
            notice: None,
            copyright: None,
            full_name: None,
            family_name: None,
            weight: None,
            is_fixed_pitch: false,
            italic_angle: 0.0,
            underline_position: -100.0,
            underline_thickness: 50.0,
            font_matrix: None,
            font_bbox: [0.0; 4],
            cid: None,
            font_dicts: vec![FontDict::default()],
            glyph_count: 0,
        }
    }
}

/// CID Registry-Ordering-Supplement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CidInfo {
    pub(crate) registry: String,
    pub(crate) ordering: String,
    pub(crate) supplement: i32,
}

impl CidInfo {
    pub(crate) fn adobe_identity() -> Self {
        Self {
            registry: "Adobe".to_owned(),
            ordering: "Identity".to_owned(),
            supplement: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FontDict {
    pub(crate) name: Option<String>,
    pub(crate) font_matrix: Option<[f32; 6]>,
    pub(crate) private: PrivateDict,
}

/// Private DICT values carried to the output. Hint-independent values only.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PrivateDict {
    pub(crate) blue_values: Vec<f32>,
    pub(crate) other_blues: Vec<f32>,
    pub(crate) family_blues: Vec<f32>,
    pub(crate) family_other_blues: Vec<f32>,
    pub(crate) blue_scale: Option<f32>,
    pub(crate) blue_shift: Option<f32>,
    pub(crate) blue_fuzz: Option<f32>,
    pub(crate) std_hw: Option<f32>,
    pub(crate) std_vw: Option<f32>,
    pub(crate) stem_snap_h: Vec<f32>,
    pub(crate) stem_snap_v: Vec<f32>,
    pub(crate) force_bold: bool,
    pub(crate) language_group: i32,
    pub(crate) expansion_factor: Option<f32>,
}

/// Font parser for a single font technology. A parser instance is reused across fonts.
pub(crate) trait FontParser {
    /// Parses font-level data. Must be called before any glyph retrieval.
    fn begin_font(&mut self, data: Vec<u8>, udv: Option<&[f32]>) -> Result<FontInfo, EmbedError>;

    fn glyph_count(&self) -> usize;

    /// Delivers all glyphs in the source order.
    fn iterate_glyphs(&mut self, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        for tag in 0..self.glyph_count() {
            // `unwrap()` is safe: glyph counts are bounded by `u16::MAX + 1`
            let tag = u16::try_from(tag).unwrap();
            self.glyph_by_tag(tag, sink)?;
        }
        Ok(())
    }

    /// Delivers the glyph with the specified source glyph index.
    fn glyph_by_tag(&mut self, tag: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError>;

    fn glyph_by_name(&mut self, name: &str, sink: &mut dyn GlyphSink) -> Result<(), EmbedError>;

    fn glyph_by_cid(&mut self, cid: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError>;

    /// Releases per-font data.
    fn end_font(&mut self);
}
