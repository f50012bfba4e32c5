//! CFF (Compact Font Format) font parser.

use std::{collections::BTreeMap, ops::Range};

use super::{
    charstring::{self, subr_bias, CharstringSource, Widths},
    strings::{standard_encoding_name, STANDARD_STRINGS, STANDARD_STRING_COUNT},
    CidInfo, Cursor, FontDict, FontInfo, FontParser, PrivateDict,
};
use crate::{
    errors::{EmbedError, ErrorKind, ParseError, ParseErrorKind},
    glyph::{GlyphAction, GlyphInfo, GlyphSink},
};

/// DICT operators. Two-byte operators are encoded as `0x0c00 | second_byte`.
pub(crate) mod ops {
    pub(crate) const VERSION: u16 = 0;
    pub(crate) const NOTICE: u16 = 1;
    pub(crate) const FULL_NAME: u16 = 2;
    pub(crate) const FAMILY_NAME: u16 = 3;
    pub(crate) const WEIGHT: u16 = 4;
    pub(crate) const FONT_BBOX: u16 = 5;
    pub(crate) const CHARSET: u16 = 15;
    pub(crate) const CHAR_STRINGS: u16 = 17;
    pub(crate) const PRIVATE: u16 = 18;
    pub(crate) const COPYRIGHT: u16 = 0x0c00;
    pub(crate) const IS_FIXED_PITCH: u16 = 0x0c01;
    pub(crate) const ITALIC_ANGLE: u16 = 0x0c02;
    pub(crate) const UNDERLINE_POSITION: u16 = 0x0c03;
    pub(crate) const UNDERLINE_THICKNESS: u16 = 0x0c04;
    pub(crate) const CHARSTRING_TYPE: u16 = 0x0c06;
    pub(crate) const FONT_MATRIX: u16 = 0x0c07;
    pub(crate) const ROS: u16 = 0x0c1e;
    pub(crate) const CID_COUNT: u16 = 0x0c22;
    pub(crate) const FD_ARRAY: u16 = 0x0c24;
    pub(crate) const FD_SELECT: u16 = 0x0c25;
    pub(crate) const FONT_NAME: u16 = 0x0c26;

    pub(crate) const BLUE_VALUES: u16 = 6;
    pub(crate) const OTHER_BLUES: u16 = 7;
    pub(crate) const FAMILY_BLUES: u16 = 8;
    pub(crate) const FAMILY_OTHER_BLUES: u16 = 9;
    pub(crate) const STD_HW: u16 = 10;
    pub(crate) const STD_VW: u16 = 11;
    pub(crate) const SUBRS: u16 = 19;
    pub(crate) const DEFAULT_WIDTH_X: u16 = 20;
    pub(crate) const NOMINAL_WIDTH_X: u16 = 21;
    pub(crate) const BLUE_SCALE: u16 = 0x0c09;
    pub(crate) const BLUE_SHIFT: u16 = 0x0c0a;
    pub(crate) const BLUE_FUZZ: u16 = 0x0c0b;
    pub(crate) const STEM_SNAP_H: u16 = 0x0c0c;
    pub(crate) const STEM_SNAP_V: u16 = 0x0c0d;
    pub(crate) const FORCE_BOLD: u16 = 0x0c0e;
    pub(crate) const LANGUAGE_GROUP: u16 = 0x0c11;
    pub(crate) const EXPANSION_FACTOR: u16 = 0x0c12;
}

const DEFAULT_FONT_MATRIX: [f32; 6] = [0.001, 0.0, 0.0, 0.001, 0.0, 0.0];

/// Reads an INDEX structure, returning absolute ranges of its objects.
pub(crate) fn read_index(cursor: &mut Cursor<'_>) -> Result<Vec<Range<usize>>, ParseError> {
    let count = usize::from(cursor.read_u16()?);
    if count == 0 {
        return Ok(vec![]);
    }
    let off_size = cursor.read_u8()?;
    let offsets = (0..=count)
        .map(|_| cursor.read_offset(off_size).map(|offset| offset as usize))
        .collect::<Result<Vec<_>, _>>()?;
    if offsets[0] != 1 || offsets.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(cursor.err(ParseErrorKind::Missing("monotonic INDEX offsets")));
    }

    // Offsets are 1-based relative to the byte preceding the object data.
    let base = cursor.offset - 1;
    cursor.skip(offsets[count] - 1)?;
    Ok(offsets
        .windows(2)
        .map(|pair| base + pair[0]..base + pair[1])
        .collect())
}

/// Parsed DICT: operators with their operands, in the encounter order.
#[derive(Debug, Default)]
pub(crate) struct Dict {
    entries: Vec<(u16, Vec<f64>)>,
}

impl Dict {
    pub(crate) fn parse(mut cursor: Cursor<'_>) -> Result<Self, ParseError> {
        let mut entries = vec![];
        let mut operands = vec![];
        while !cursor.is_empty() {
            let b0 = cursor.read_u8()?;
            match b0 {
                0..=11 | 13..=21 => entries.push((u16::from(b0), std::mem::take(&mut operands))),
                12 => {
                    let b1 = cursor.read_u8()?;
                    entries.push((0x0c00 | u16::from(b1), std::mem::take(&mut operands)));
                }
                28 => operands.push(f64::from(cursor.read_i16()?)),
                29 => {
                    #[allow(clippy::cast_possible_wrap)] // intentional
                    let value = cursor.read_u32()? as i32;
                    operands.push(f64::from(value));
                }
                30 => operands.push(read_real(&mut cursor)?),
                32..=246 => operands.push(f64::from(i16::from(b0) - 139)),
                247..=250 => {
                    let b1 = cursor.read_u8()?;
                    operands.push(f64::from((i16::from(b0) - 247) * 256 + i16::from(b1) + 108));
                }
                251..=254 => {
                    let b1 = cursor.read_u8()?;
                    operands.push(f64::from(-(i16::from(b0) - 251) * 256 - i16::from(b1) - 108));
                }
                _ => return Err(cursor.err(ParseErrorKind::InvalidOperator(b0.into()))),
            }
        }
        Ok(Self { entries })
    }

    pub(crate) fn get(&self, op: u16) -> Option<&[f64]> {
        self.entries
            .iter()
            .find_map(|(entry_op, operands)| (*entry_op == op).then_some(operands.as_slice()))
    }

    pub(crate) fn number(&self, op: u16) -> Option<f64> {
        self.get(op).and_then(|operands| operands.first().copied())
    }

    #[allow(clippy::cast_possible_truncation)] // font values are within `f32` range
    fn float(&self, op: u16) -> Option<f32> {
        self.number(op).map(|value| value as f32)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn floats(&self, op: u16) -> Vec<f32> {
        self.get(op)
            .map(|operands| operands.iter().map(|&value| value as f32).collect())
            .unwrap_or_default()
    }

    /// Reads a delta-encoded array, returning absolute values.
    #[allow(clippy::cast_possible_truncation)]
    fn deltas(&self, op: u16) -> Vec<f32> {
        let mut acc = 0.0;
        self.get(op)
            .unwrap_or_default()
            .iter()
            .map(|&delta| {
                acc += delta;
                acc as f32
            })
            .collect()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn offset(&self, op: u16) -> Option<usize> {
        self.number(op).filter(|&value| value >= 0.0).map(|value| value as usize)
    }

    fn matrix(&self, op: u16) -> Option<[f32; 6]> {
        self.floats(op).try_into().ok()
    }
}

fn read_real(cursor: &mut Cursor<'_>) -> Result<f64, ParseError> {
    let start = cursor.offset;
    let mut repr = String::new();
    'outer: loop {
        let byte = cursor.read_u8()?;
        for nibble in [byte >> 4, byte & 0xf] {
            match nibble {
                0..=9 => repr.push(char::from(b'0' + nibble)),
                0xa => repr.push('.'),
                0xb => repr.push('E'),
                0xc => repr.push_str("E-"),
                0xe => repr.push('-'),
                0xf => break 'outer,
                _ => return Err(ParseError::new(ParseErrorKind::InvalidToken, start)),
            }
        }
    }
    if repr.is_empty() {
        return Ok(0.0);
    }
    repr.parse()
        .map_err(|_| ParseError::new(ParseErrorKind::InvalidToken, start))
}

#[derive(Debug)]
struct LocalData {
    subrs: Vec<Range<usize>>,
    widths: Widths,
}

#[derive(Debug)]
struct CffFont {
    data: Vec<u8>,
    strings: Vec<Range<usize>>,
    global_subrs: Vec<Range<usize>>,
    charstrings: Vec<Range<usize>>,
    /// SIDs (name-keyed fonts) or CIDs (CID-keyed fonts) by glyph index.
    charset: Vec<u16>,
    /// FD index by glyph index; empty for name-keyed fonts.
    fd_select: Vec<u8>,
    locals: Vec<LocalData>,
    is_cid: bool,
    by_name: BTreeMap<String, u16>,
    by_cid: BTreeMap<u16, u16>,
}

impl CffFont {
    fn string(&self, sid: u16) -> Option<&str> {
        if sid < STANDARD_STRING_COUNT {
            return Some(STANDARD_STRINGS[usize::from(sid)]);
        }
        let range = self.strings.get(usize::from(sid - STANDARD_STRING_COUNT))?;
        std::str::from_utf8(&self.data[range.clone()]).ok()
    }

    fn owned_string(&self, dict: &Dict, op: u16) -> Option<String> {
        let sid = dict.number(op)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let sid = sid as u16;
        self.string(sid).map(str::to_owned)
    }

    fn glyph_name(&self, gid: u16) -> Option<&str> {
        if self.is_cid {
            return None;
        }
        self.string(*self.charset.get(usize::from(gid))?)
    }

    fn fd(&self, gid: u16) -> u8 {
        self.fd_select.get(usize::from(gid)).copied().unwrap_or(0)
    }

    fn charstring(&self, gid: u16) -> Option<&[u8]> {
        let range = self.charstrings.get(usize::from(gid))?;
        Some(&self.data[range.clone()])
    }
}

struct GlyphContext<'a> {
    font: &'a CffFont,
    fd: usize,
}

fn biased_subr<'a>(data: &'a [u8], subrs: &[Range<usize>], number: i32) -> Option<&'a [u8]> {
    let index = usize::try_from(number + subr_bias(subrs.len())).ok()?;
    subrs.get(index).map(|range| &data[range.clone()])
}

impl CharstringSource for GlyphContext<'_> {
    fn global_subr(&self, number: i32) -> Option<&[u8]> {
        biased_subr(&self.font.data, &self.font.global_subrs, number)
    }

    fn local_subr(&self, number: i32) -> Option<&[u8]> {
        let local = self.font.locals.get(self.fd)?;
        biased_subr(&self.font.data, &local.subrs, number)
    }

    fn seac_component(&self, code: u8) -> Option<&[u8]> {
        let name = standard_encoding_name(code)?;
        let gid = *self.font.by_name.get(name)?;
        self.font.charstring(gid)
    }
}

/// Parser for bare CFF fonts (including CID-keyed CFF).
#[derive(Debug, Default)]
pub(crate) struct CffParser {
    font: Option<CffFont>,
}

impl CffParser {
    fn font(&self) -> Result<&CffFont, EmbedError> {
        self.font
            .as_ref()
            .ok_or_else(|| EmbedError::internal("no CFF font is loaded"))
    }

    #[allow(clippy::too_many_lines)]
    fn parse(data: Vec<u8>) -> Result<(CffFont, FontInfo), ParseError> {
        let mut cursor = Cursor::new(&data);
        let major = cursor.read_u8()?;
        if major != 1 {
            return Err(cursor.err(ParseErrorKind::UnexpectedVersion(major.into())));
        }
        cursor.skip(1)?; // minor
        let header_len = cursor.read_u8()?;
        let mut cursor = Cursor::new(&data).at(header_len.into())?;

        let names = read_index(&mut cursor)?;
        let top_dicts = read_index(&mut cursor)?;
        let strings = read_index(&mut cursor)?;
        let global_subrs = read_index(&mut cursor)?;
        let name_range = names.first().ok_or_else(|| ParseError::missing("font name"))?;
        let top_range = top_dicts.first().ok_or_else(|| ParseError::missing("top DICT"))?;
        let top = Dict::parse(Cursor::new(&data).range(top_range.clone())?)?;

        if let Some(charstring_type) = top.number(ops::CHARSTRING_TYPE) {
            if charstring_type != 2.0 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let format = charstring_type as u8;
                return Err(ParseError::new(ParseErrorKind::UnexpectedFormat(format), top_range.start));
            }
        }

        let charstrings_offset = top
            .offset(ops::CHAR_STRINGS)
            .ok_or_else(|| ParseError::missing("CharStrings"))?;
        let charstrings = read_index(&mut Cursor::new(&data).at(charstrings_offset)?)?;
        let glyph_count = charstrings.len();
        let is_cid = top.get(ops::ROS).is_some();

        let charset = read_charset(&data, top.offset(ops::CHARSET).unwrap_or(0), glyph_count)?;

        let mut font_dicts = vec![];
        let mut locals = vec![];
        let mut fd_select = vec![];
        if is_cid {
            let fd_array_offset = top
                .offset(ops::FD_ARRAY)
                .ok_or_else(|| ParseError::missing("FDArray"))?;
            let fd_ranges = read_index(&mut Cursor::new(&data).at(fd_array_offset)?)?;
            for range in fd_ranges {
                let fd = Dict::parse(Cursor::new(&data).range(range)?)?;
                let (private, local) = read_private(&data, &fd)?;
                font_dicts.push((fd, private));
                locals.push(local);
            }
            if let Some(offset) = top.offset(ops::FD_SELECT) {
                fd_select = read_fd_select(&data, offset, glyph_count)?;
            }
        } else {
            let (private, local) = read_private(&data, &top)?;
            font_dicts.push((Dict::default(), private));
            locals.push(local);
        }

        let font_name = String::from_utf8_lossy(&data[name_range.clone()]).into_owned();
        let mut font = CffFont {
            data,
            strings,
            global_subrs,
            charstrings,
            charset,
            fd_select,
            locals,
            is_cid,
            by_name: BTreeMap::new(),
            by_cid: BTreeMap::new(),
        };

        for (gid, &id) in font.charset.iter().enumerate() {
            // `unwrap()` is safe: the charset length is bounded by the INDEX count
            let gid = u16::try_from(gid).unwrap();
            if is_cid {
                font.by_cid.entry(id).or_insert(gid);
            } else if let Some(name) = font.string(id) {
                font.by_name.entry(name.to_owned()).or_insert(gid);
            }
        }

        let cid = if is_cid {
            let ros = top.get(ops::ROS).unwrap_or_default();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let sid = |idx: usize| ros.get(idx).map(|&value| value as u16);
            #[allow(clippy::cast_possible_truncation)]
            let supplement = ros.get(2).map_or(0, |&value| value as i32);
            Some(CidInfo {
                registry: sid(0).and_then(|sid| font.string(sid)).unwrap_or("Adobe").to_owned(),
                ordering: sid(1)
                    .and_then(|sid| font.string(sid))
                    .unwrap_or("Identity")
                    .to_owned(),
                supplement,
            })
        } else {
            None
        };

        let font_dicts = font_dicts
            .into_iter()
            .map(|(dict, private)| FontDict {
                name: font.owned_string(&dict, ops::FONT_NAME),
                font_matrix: dict.matrix(ops::FONT_MATRIX),
                private,
            })
            .collect();

        let bbox = top.floats(ops::FONT_BBOX);
        let info = FontInfo {
            font_name,
            version: font.owned_string(&top, ops::VERSION),
            notice: font.owned_string(&top, ops::NOTICE),
            copyright: font.owned_string(&top, ops::COPYRIGHT),
            full_name: font.owned_string(&top, ops::FULL_NAME),
            family_name: font.owned_string(&top, ops::FAMILY_NAME),
            weight: font.owned_string(&top, ops::WEIGHT),
            is_fixed_pitch: top.number(ops::IS_FIXED_PITCH).is_some_and(|value| value != 0.0),
            italic_angle: top.float(ops::ITALIC_ANGLE).unwrap_or(0.0),
            underline_position: top.float(ops::UNDERLINE_POSITION).unwrap_or(-100.0),
            underline_thickness: top.float(ops::UNDERLINE_THICKNESS).unwrap_or(50.0),
            font_matrix: Some(top.matrix(ops::FONT_MATRIX).unwrap_or(DEFAULT_FONT_MATRIX)),
            font_bbox: bbox.try_into().unwrap_or([0.0; 4]),
            cid,
            font_dicts,
            glyph_count,
        };
        Ok((font, info))
    }

    fn deliver(&self, gid: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        let font = self.font()?;
        let charstring = font
            .charstring(gid)
            .ok_or_else(|| EmbedError::new(ErrorKind::CffParse, format_args!("no glyph #{gid}")))?;
        let fd = font.fd(gid);
        let info = GlyphInfo {
            tag: gid,
            name: font.glyph_name(gid),
            cid: if font.is_cid {
                font.charset.get(usize::from(gid)).copied()
            } else {
                None
            },
            fd,
        };
        if sink.begin(&info)? == GlyphAction::Skip {
            return Ok(());
        }

        let fd = usize::from(fd);
        let widths = font.locals.get(fd).map_or_else(Widths::default, |local| local.widths);
        let context = GlyphContext { font, fd };
        charstring::evaluate(charstring, &context, widths, sink).map_err(|err| {
            EmbedError::new(ErrorKind::CffParse, format_args!("glyph #{gid}: {err}"))
        })?;
        sink.end()
    }
}

fn read_charset(data: &[u8], offset: usize, glyph_count: usize) -> Result<Vec<u16>, ParseError> {
    let mut charset = Vec::with_capacity(glyph_count);
    match offset {
        // ISOAdobe charset: identity mapping
        0 => {
            charset.extend((0..glyph_count).map(|gid| u16::try_from(gid).unwrap_or(u16::MAX)));
            return Ok(charset);
        }
        // Expert charsets
        1 | 2 => {
            #[allow(clippy::cast_possible_truncation)]
            return Err(ParseError::new(ParseErrorKind::UnexpectedFormat(offset as u8), 0));
        }
        _ => {}
    }

    let mut cursor = Cursor::new(data).at(offset)?;
    charset.push(0);
    let format = cursor.read_u8()?;
    while charset.len() < glyph_count {
        match format {
            0 => charset.push(cursor.read_u16()?),
            1 | 2 => {
                let first = cursor.read_u16()?;
                let left = if format == 1 {
                    cursor.read_u8()?.into()
                } else {
                    cursor.read_u16()?
                };
                for i in 0..=left {
                    if charset.len() == glyph_count {
                        break;
                    }
                    charset.push(first.saturating_add(i));
                }
            }
            _ => return Err(cursor.err(ParseErrorKind::UnexpectedFormat(format))),
        }
    }
    Ok(charset)
}

fn read_fd_select(data: &[u8], offset: usize, glyph_count: usize) -> Result<Vec<u8>, ParseError> {
    let mut cursor = Cursor::new(data).at(offset)?;
    let format = cursor.read_u8()?;
    match format {
        0 => Ok(cursor.split_at(glyph_count)?.bytes.to_vec()),
        3 => {
            let range_count = cursor.read_u16()?;
            let mut fd_select = vec![0; glyph_count];
            let mut first = usize::from(cursor.read_u16()?);
            for _ in 0..range_count {
                let fd = cursor.read_u8()?;
                let next = usize::from(cursor.read_u16()?);
                if next < first || next > glyph_count {
                    return Err(cursor.err(ParseErrorKind::OffsetOutOfBounds(next)));
                }
                fd_select[first..next].fill(fd);
                first = next;
            }
            Ok(fd_select)
        }
        _ => Err(cursor.err(ParseErrorKind::UnexpectedFormat(format))),
    }
}

fn read_private(data: &[u8], dict: &Dict) -> Result<(PrivateDict, LocalData), ParseError> {
    let Some([size, offset]) = dict.get(ops::PRIVATE).and_then(|operands| <[f64; 2]>::try_from(operands).ok())
    else {
        let local = LocalData {
            subrs: vec![],
            widths: Widths::default(),
        };
        return Ok((PrivateDict::default(), local));
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (size, offset) = (size as usize, offset as usize);
    let private = Dict::parse(Cursor::new(data).range(offset..offset + size)?)?;

    let subrs = match private.offset(ops::SUBRS) {
        Some(subrs_offset) => read_index(&mut Cursor::new(data).at(offset + subrs_offset)?)?,
        None => vec![],
    };
    let local = LocalData {
        subrs,
        widths: Widths {
            default: private.float(ops::DEFAULT_WIDTH_X).unwrap_or(0.0),
            nominal: private.float(ops::NOMINAL_WIDTH_X).unwrap_or(0.0),
        },
    };

    #[allow(clippy::cast_possible_truncation)]
    let language_group = private.number(ops::LANGUAGE_GROUP).map_or(0, |value| value as i32);
    let private = PrivateDict {
        blue_values: private.deltas(ops::BLUE_VALUES),
        other_blues: private.deltas(ops::OTHER_BLUES),
        family_blues: private.deltas(ops::FAMILY_BLUES),
        family_other_blues: private.deltas(ops::FAMILY_OTHER_BLUES),
        blue_scale: private.float(ops::BLUE_SCALE),
        blue_shift: private.float(ops::BLUE_SHIFT),
        blue_fuzz: private.float(ops::BLUE_FUZZ),
        std_hw: private.float(ops::STD_HW),
        std_vw: private.float(ops::STD_VW),
        stem_snap_h: private.deltas(ops::STEM_SNAP_H),
        stem_snap_v: private.deltas(ops::STEM_SNAP_V),
        force_bold: private.number(ops::FORCE_BOLD).is_some_and(|value| value != 0.0),
        language_group,
        expansion_factor: private.float(ops::EXPANSION_FACTOR),
    };
    Ok((private, local))
}

impl FontParser for CffParser {
    fn begin_font(&mut self, data: Vec<u8>, udv: Option<&[f32]>) -> Result<FontInfo, EmbedError> {
        if udv.is_some() {
            log::warn!("design vector is ignored for CFF fonts");
        }
        let (font, info) = Self::parse(data).map_err(|err| err.into_embed(ErrorKind::CffParse))?;
        log::debug!(
            "parsed CFF font {:?}: {} glyphs, {}",
            info.font_name,
            info.glyph_count,
            if font.is_cid { "CID-keyed" } else { "name-keyed" }
        );
        self.font = Some(font);
        Ok(info)
    }

    fn glyph_count(&self) -> usize {
        self.font.as_ref().map_or(0, |font| font.charstrings.len())
    }

    fn glyph_by_tag(&mut self, tag: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        self.deliver(tag, sink)
    }

    fn glyph_by_name(&mut self, name: &str, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        let gid = *self
            .font()?
            .by_name
            .get(name)
            .ok_or_else(|| EmbedError::new(ErrorKind::CffParse, format_args!("no glyph named {name:?}")))?;
        self.deliver(gid, sink)
    }

    fn glyph_by_cid(&mut self, cid: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        let font = self.font()?;
        let gid = if font.is_cid {
            *font
                .by_cid
                .get(&cid)
                .ok_or_else(|| EmbedError::new(ErrorKind::CffParse, format_args!("no glyph for CID {cid}")))?
        } else {
            cid
        };
        self.deliver(gid, sink)
    }

    fn end_font(&mut self) {
        self.font = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_index() {
        let bytes = [0, 2, 1, 1, 3, 4, b'a', b'b', b'c', 0xff];
        let mut cursor = Cursor::new(&bytes);
        let ranges = read_index(&mut cursor).unwrap();
        assert_eq!(ranges, [6..8, 8..9]);
        assert_eq!(cursor.bytes, [0xff]);

        let mut cursor = Cursor::new(&[0, 0]);
        assert!(read_index(&mut cursor).unwrap().is_empty());
        assert!(cursor.is_empty());

        let truncated = [0, 1, 1, 1, 5, b'a'];
        assert!(read_index(&mut Cursor::new(&truncated)).is_err());
    }

    #[test]
    fn reading_dict_operands() {
        let bytes = [
            0x8b, // 0
            0xf7, 0x00, // 108
            0xfb, 0x00, // -108
            28, 0x27, 0x10, // 10000
            29, 0, 1, 0x86, 0xa0, // 100000
            30, 0xe2, 0xa2, 0x5f, // -2.25
            5,
            12, 7,
        ];
        let dict = Dict::parse(Cursor::new(&bytes)).unwrap();
        assert_eq!(
            dict.get(ops::FONT_BBOX).unwrap(),
            [0.0, 108.0, -108.0, 10_000.0, 100_000.0, -2.25]
        );
        assert!(dict.get(ops::FONT_MATRIX).unwrap().is_empty());
        assert!(dict.get(ops::CHARSET).is_none());
    }

    #[test]
    fn reading_real_numbers_with_exponent() {
        // 1.5E-3
        let bytes = [0x1a, 0x5c, 0x3f];
        assert_eq!(read_real(&mut Cursor::new(&bytes)).unwrap(), 1.5e-3);
        assert!(read_real(&mut Cursor::new(&[0xd0])).is_err());
    }

    #[test]
    fn delta_arrays_are_accumulated() {
        // -20 20 480 20 BlueValues
        let bytes = [0x8b - 20, 0x8b + 20, 0xf8, 0x74, 0x8b + 20, 6];
        let dict = Dict::parse(Cursor::new(&bytes)).unwrap();
        assert_eq!(dict.deltas(ops::BLUE_VALUES), [-20.0, 0.0, 480.0, 500.0]);
    }

    #[test]
    fn reading_charsets() {
        assert_eq!(read_charset(&[], 0, 3).unwrap(), [0, 1, 2]);
        assert!(read_charset(&[], 1, 3).is_err());

        let format0 = [0xff, 0xff, 0xff, 0, 0, 34, 0, 66];
        assert_eq!(read_charset(&format0, 3, 3).unwrap(), [0, 34, 66]);

        let format1 = [0xff, 0xff, 0xff, 1, 0, 10, 2, 1, 0, 3];
        assert_eq!(read_charset(&format1, 3, 5).unwrap(), [0, 10, 11, 12, 256]);

        let format2 = [0xff, 0xff, 0xff, 2, 0, 1, 0, 3];
        assert_eq!(read_charset(&format2, 3, 4).unwrap(), [0, 1, 2, 3]);
    }

    #[test]
    fn reading_fd_select() {
        let format0 = [0, 0, 1, 1];
        assert_eq!(read_fd_select(&format0, 0, 3).unwrap(), [0, 1, 1]);

        let format3 = [3, 0, 2, 0, 0, 1, 0, 2, 0, 0, 4];
        assert_eq!(read_fd_select(&format3, 0, 4).unwrap(), [1, 1, 0, 0]);

        let bad = [3, 0, 1, 0, 0, 0, 0, 9];
        assert!(read_fd_select(&bad, 0, 4).is_err());
    }

    #[test]
    fn unsupported_version_is_reported() {
        let err = CffParser::default()
            .begin_font(vec![2, 0, 5, 4], None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CffParse);
    }
}
