//! CFF table writer.
//!
//! Glyph outlines are encoded as unhinted Type 2 charstrings and spooled to a scratch stream while
//! the source font is read. Once all glyphs are known, [`CffSession::end_font()`] assembles the table:
//! header, Name / Top DICT / String / Global Subr INDEXes, charset, FDSelect (CID-keyed fonts only),
//! CharStrings, FDArray (CID-keyed fonts only) and Private DICTs. Offsets in Top and Font DICTs use
//! the fixed-size 5-byte integer encoding, so DICT sizes do not depend on the offset values.

use std::{
    collections::BTreeMap,
    io::{Read, Seek, SeekFrom, Write},
};

use crate::{
    errors::{EmbedError, ErrorKind},
    font::{
        cff_ops as ops,
        strings::{standard_sid, STANDARD_STRING_COUNT},
        FontDict, FontInfo, PrivateDict,
    },
    glyph::{GlyphAction, GlyphInfo, GlyphSink},
    stream::{ClientStream, StreamRole},
};

const DEFAULT_FONT_MATRIX: [f32; 6] = [0.001, 0.0, 0.0, 0.001, 0.0, 0.0];

mod charstring_ops {
    pub(super) const RLINETO: u8 = 5;
    pub(super) const RRCURVETO: u8 = 8;
    pub(super) const ENDCHAR: u8 = 14;
    pub(super) const RMOVETO: u8 = 21;
}

fn write_error(detail: impl std::fmt::Display) -> EmbedError {
    EmbedError::new(ErrorKind::CffWrite, detail)
}

/// Snaps a coordinate to an integer if it is close enough, or to the 16.16 fixed grid otherwise.
fn snap(value: f32) -> f64 {
    let value = f64::from(value);
    let rounded = value.round();
    if (value - rounded).abs() < 1e-3 {
        rounded
    } else {
        (value * 65_536.0).round() / 65_536.0
    }
}

/// Encodes a Type 2 charstring operand.
#[allow(clippy::cast_possible_truncation)] // values are range-checked
fn write_charstring_number(out: &mut Vec<u8>, value: f64) {
    if value.fract() == 0.0 && (-32_768.0..=32_767.0).contains(&value) {
        let value = value as i32;
        match value {
            -107..=107 => out.push((value + 139) as u8),
            108..=1131 => {
                let value = value - 108;
                out.extend_from_slice(&[(value / 256 + 247) as u8, (value % 256) as u8]);
            }
            -1131..=-108 => {
                let value = -value - 108;
                out.extend_from_slice(&[(value / 256 + 251) as u8, (value % 256) as u8]);
            }
            _ => {
                out.push(28);
                out.extend_from_slice(&(value as i16).to_be_bytes());
            }
        }
    } else {
        out.push(255);
        out.extend_from_slice(&((value * 65_536.0).round() as i32).to_be_bytes());
    }
}

/// Encodes a DICT integer operand.
#[allow(clippy::cast_possible_truncation)] // values are range-checked
fn write_dict_int(out: &mut Vec<u8>, value: i32) {
    match value {
        -107..=107 => out.push((value + 139) as u8),
        108..=1131 => {
            let value = value - 108;
            out.extend_from_slice(&[(value / 256 + 247) as u8, (value % 256) as u8]);
        }
        -1131..=-108 => {
            let value = -value - 108;
            out.extend_from_slice(&[(value / 256 + 251) as u8, (value % 256) as u8]);
        }
        -32_768..=32_767 => {
            out.push(28);
            out.extend_from_slice(&(value as i16).to_be_bytes());
        }
        _ => {
            out.push(29);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// Encodes a DICT number, using the real number encoding for non-integers.
#[allow(clippy::cast_possible_truncation)] // checked via the range
fn write_dict_number(out: &mut Vec<u8>, value: f32) {
    if value.fract() == 0.0 && (-1.0e9..=1.0e9).contains(&value) {
        write_dict_int(out, value as i32);
        return;
    }

    // `Display` for floats produces the shortest round-trip decimal representation without exponent.
    let repr = value.to_string();
    let mut nibbles: Vec<u8> = repr
        .bytes()
        .filter_map(|ch| match ch {
            b'0'..=b'9' => Some(ch - b'0'),
            b'.' => Some(0xa),
            b'-' => Some(0xe),
            _ => None,
        })
        .collect();
    nibbles.push(0xf);
    if nibbles.len() % 2 == 1 {
        nibbles.push(0xf);
    }
    out.push(30);
    out.extend(nibbles.chunks_exact(2).map(|pair| (pair[0] << 4) | pair[1]));
}

/// Encodes a DICT offset with the fixed-size 5-byte encoding.
fn write_dict_offset(out: &mut Vec<u8>, offset: usize) -> Result<(), EmbedError> {
    let offset = i32::try_from(offset).map_err(|_| write_error("CFF table is too large"))?;
    out.push(29);
    out.extend_from_slice(&offset.to_be_bytes());
    Ok(())
}

fn write_dict_op(out: &mut Vec<u8>, op: u16) {
    if op >= 0x0c00 {
        // `unwrap()` is safe: two-byte operators are `0x0c00..=0x0cff`
        out.extend_from_slice(&[12, u8::try_from(op & 0xff).unwrap()]);
    } else {
        // `unwrap()` is safe: one-byte operators are `< 22`
        out.push(u8::try_from(op).unwrap());
    }
}

fn write_dict_deltas(out: &mut Vec<u8>, op: u16, values: &[f32]) {
    if values.is_empty() {
        return;
    }
    let mut prev = 0.0;
    for &value in values {
        write_dict_number(out, value - prev);
        prev = value;
    }
    write_dict_op(out, op);
}

/// INDEX being assembled in memory.
#[derive(Debug, Default)]
struct Index {
    data: Vec<u8>,
    ends: Vec<usize>,
}

impl Index {
    fn push(&mut self, item: &[u8]) {
        self.data.extend_from_slice(item);
        self.ends.push(self.data.len());
    }

    fn off_size(&self) -> u8 {
        match self.data.len() + 1 {
            0..=0xff => 1,
            0x100..=0xffff => 2,
            0x1_0000..=0xff_ffff => 3,
            _ => 4,
        }
    }

    fn byte_len(&self) -> usize {
        if self.ends.is_empty() {
            2
        } else {
            3 + (self.ends.len() + 1) * usize::from(self.off_size()) + self.data.len()
        }
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), EmbedError> {
        let count =
            u16::try_from(self.ends.len()).map_err(|_| write_error("too many INDEX items"))?;
        out.extend_from_slice(&count.to_be_bytes());
        if count == 0 {
            return Ok(());
        }
        let off_size = self.off_size();
        out.push(off_size);
        let start = usize::from(4 - off_size);
        for offset in [0].into_iter().chain(self.ends.iter().copied()) {
            // `unwrap()` is safe: checked via `off_size`
            let offset = u32::try_from(offset + 1).unwrap();
            out.extend_from_slice(&offset.to_be_bytes()[start..]);
        }
        out.extend_from_slice(&self.data);
        Ok(())
    }
}

/// Non-standard strings of the font.
#[derive(Debug, Default)]
struct StringTable {
    strings: Index,
    by_value: BTreeMap<String, u16>,
}

impl StringTable {
    fn sid(&mut self, value: &str) -> Result<u16, EmbedError> {
        if let Some(sid) = standard_sid(value) {
            return Ok(sid);
        }
        if let Some(&sid) = self.by_value.get(value) {
            return Ok(sid);
        }
        let sid = u16::try_from(self.by_value.len())
            .ok()
            .and_then(|idx| idx.checked_add(STANDARD_STRING_COUNT))
            .ok_or_else(|| write_error("too many strings"))?;
        self.strings.push(value.as_bytes());
        self.by_value.insert(value.to_owned(), sid);
        Ok(sid)
    }
}

#[derive(Debug)]
struct GlyphRecord {
    name: Option<String>,
    tag: u16,
    cid: Option<u16>,
    fd: u8,
    width: f64,
    /// Length of the spooled charstring (without the width operand).
    len: usize,
}

/// Reusable CFF writer state. A new [`CffSession`] is started for each font.
#[derive(Debug, Default)]
pub(crate) struct CffWriter {
    glyphs: Vec<GlyphRecord>,
    charstring: Vec<u8>,
}

impl CffWriter {
    /// Starts writing a font; charstrings are spooled to `spool`.
    pub(crate) fn begin_font<'w>(&'w mut self, spool: &'w mut dyn ClientStream) -> CffSession<'w> {
        self.glyphs.clear();
        self.charstring.clear();
        CffSession {
            writer: self,
            spool,
            current: None,
            point: [0.0; 2],
        }
    }
}

/// CFF font being written. Receives glyphs via the [`GlyphSink`] interface.
pub(crate) struct CffSession<'w> {
    writer: &'w mut CffWriter,
    spool: &'w mut dyn ClientStream,
    current: Option<GlyphRecord>,
    point: [f64; 2],
}

impl std::fmt::Debug for CffSession<'_> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CffSession")
            .field("glyph_count", &self.writer.glyphs.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl CffSession<'_> {
    pub(crate) fn glyph_count(&self) -> usize {
        self.writer.glyphs.len()
    }

    fn push_point(&mut self, x: f32, y: f32) {
        let [x, y] = [snap(x), snap(y)];
        let out = &mut self.writer.charstring;
        write_charstring_number(out, x - self.point[0]);
        write_charstring_number(out, y - self.point[1]);
        self.point = [x, y];
    }

    /// Assembles the CFF table and writes it to `out`. Returns the table length.
    pub(crate) fn end_font(
        self,
        info: &FontInfo,
        out: &mut dyn ClientStream,
    ) -> Result<usize, EmbedError> {
        let spool_err = |err| StreamRole::Temp1.io_error(err);
        self.spool.seek(SeekFrom::Start(0)).map_err(spool_err)?;
        let mut charstrings = vec![];
        self.spool.read_to_end(&mut charstrings).map_err(spool_err)?;

        let table = TableBuilder::new(info, &self.writer.glyphs)?.build(&charstrings)?;
        out.write_all(&table)
            .map_err(|err| StreamRole::Temp0.io_error(err))?;
        log::debug!(
            "CFF table: {} bytes, {} glyphs, CID-keyed: {}",
            table.len(),
            self.writer.glyphs.len(),
            info.cid.is_some()
        );
        Ok(table.len())
    }
}

impl GlyphSink for CffSession<'_> {
    fn begin(&mut self, info: &GlyphInfo<'_>) -> Result<GlyphAction, EmbedError> {
        if self.current.is_some() {
            return Err(EmbedError::internal("nested glyph in CFF writer"));
        }
        self.writer.charstring.clear();
        self.point = [0.0; 2];
        self.current = Some(GlyphRecord {
            name: info.name.map(str::to_owned),
            tag: info.tag,
            cid: info.cid,
            fd: info.fd,
            width: 0.0,
            len: 0,
        });
        Ok(GlyphAction::Parse)
    }

    fn width(&mut self, width: f32) {
        if let Some(glyph) = &mut self.current {
            glyph.width = snap(width);
        }
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.push_point(x, y);
        self.writer.charstring.push(charstring_ops::RMOVETO);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push_point(x, y);
        self.writer.charstring.push(charstring_ops::RLINETO);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) {
        self.push_point(x1, y1);
        self.push_point(x2, y2);
        self.push_point(x3, y3);
        self.writer.charstring.push(charstring_ops::RRCURVETO);
    }

    fn end(&mut self) -> Result<(), EmbedError> {
        let mut glyph = self
            .current
            .take()
            .ok_or_else(|| EmbedError::internal("glyph end without begin"))?;
        self.writer.charstring.push(charstring_ops::ENDCHAR);
        self.spool
            .write_all(&self.writer.charstring)
            .map_err(|err| StreamRole::Temp1.io_error(err))?;
        glyph.len = self.writer.charstring.len();
        self.writer.glyphs.push(glyph);
        Ok(())
    }
}

/// Default and nominal width of a font dictionary; both equal the most common advance width.
fn most_common_width<'a>(widths: impl Iterator<Item = &'a f64>) -> f64 {
    let mut counts = BTreeMap::<i64, usize>::new();
    for &width in widths {
        #[allow(clippy::cast_possible_truncation)] // widths are snapped to the 16.16 grid
        let key = (width * 65_536.0) as i64;
        *counts.entry(key).or_default() += 1;
    }
    let mut best = (0, 0_usize);
    for (key, count) in counts {
        if count > best.1 {
            best = (key, count);
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let width = best.0 as f64 / 65_536.0;
    width
}

/// Assembles the CFF table from the font info and spooled glyphs.
struct TableBuilder<'a> {
    info: &'a FontInfo,
    glyphs: &'a [GlyphRecord],
    strings: StringTable,
    /// Per-FD default (= nominal) width.
    widths: Vec<f64>,
}

impl<'a> TableBuilder<'a> {
    fn new(info: &'a FontInfo, glyphs: &'a [GlyphRecord]) -> Result<Self, EmbedError> {
        if glyphs.is_empty() {
            return Err(write_error("font has no glyphs"));
        }
        let fd_count = info.font_dicts.len();
        if let Some(glyph) = glyphs.iter().find(|glyph| usize::from(glyph.fd) >= fd_count) {
            return Err(write_error(format_args!(
                "glyph #{} references font dict {} of {fd_count}",
                glyph.tag, glyph.fd
            )));
        }
        let widths = (0..fd_count)
            .map(|fd| {
                let fd_widths = glyphs
                    .iter()
                    .filter(|glyph| usize::from(glyph.fd) == fd)
                    .map(|glyph| &glyph.width);
                most_common_width(fd_widths)
            })
            .collect();
        Ok(Self {
            info,
            glyphs,
            strings: StringTable::default(),
            widths,
        })
    }

    fn glyph_name(glyph: &GlyphRecord) -> String {
        glyph
            .name
            .clone()
            .unwrap_or_else(|| format!("g{}", glyph.tag))
    }

    fn charset(&mut self) -> Result<Vec<u8>, EmbedError> {
        let mut charset = vec![0]; // format 0
        for glyph in &self.glyphs[1..] {
            let id = if self.info.cid.is_some() {
                glyph.cid.unwrap_or(glyph.tag)
            } else {
                self.strings.sid(&Self::glyph_name(glyph))?
            };
            charset.extend_from_slice(&id.to_be_bytes());
        }
        Ok(charset)
    }

    fn fd_select(&self) -> Result<Vec<u8>, EmbedError> {
        let mut ranges: Vec<(u16, u8)> = vec![];
        for (gid, glyph) in self.glyphs.iter().enumerate() {
            if ranges.last().is_none_or(|&(_, fd)| fd != glyph.fd) {
                let gid = u16::try_from(gid).map_err(|_| write_error("too many glyphs"))?;
                ranges.push((gid, glyph.fd));
            }
        }
        let mut fd_select = vec![3];
        let range_count = u16::try_from(ranges.len()).map_err(|_| write_error("too many FDSelect ranges"))?;
        fd_select.extend_from_slice(&range_count.to_be_bytes());
        for (first, fd) in ranges {
            fd_select.extend_from_slice(&first.to_be_bytes());
            fd_select.push(fd);
        }
        let sentinel = u16::try_from(self.glyphs.len()).map_err(|_| write_error("too many glyphs"))?;
        fd_select.extend_from_slice(&sentinel.to_be_bytes());
        Ok(fd_select)
    }

    fn charstrings(&self, spooled: &[u8]) -> Result<Index, EmbedError> {
        let mut index = Index::default();
        let mut pos = 0;
        let mut buffer = vec![];
        for glyph in self.glyphs {
            let charstring = spooled
                .get(pos..pos + glyph.len)
                .ok_or_else(|| EmbedError::new(ErrorKind::TempStream, "truncated charstring spool"))?;
            pos += glyph.len;

            buffer.clear();
            let nominal = self.widths[usize::from(glyph.fd)];
            if glyph.width != nominal {
                write_charstring_number(&mut buffer, glyph.width - nominal);
            }
            buffer.extend_from_slice(charstring);
            index.push(&buffer);
        }
        Ok(index)
    }

    fn private_dict(&self, fd: usize, private: &PrivateDict) -> Vec<u8> {
        let mut out = vec![];
        write_dict_deltas(&mut out, ops::BLUE_VALUES, &private.blue_values);
        write_dict_deltas(&mut out, ops::OTHER_BLUES, &private.other_blues);
        write_dict_deltas(&mut out, ops::FAMILY_BLUES, &private.family_blues);
        write_dict_deltas(&mut out, ops::FAMILY_OTHER_BLUES, &private.family_other_blues);
        let optional = [
            (ops::BLUE_SCALE, private.blue_scale),
            (ops::BLUE_SHIFT, private.blue_shift),
            (ops::BLUE_FUZZ, private.blue_fuzz),
            (ops::STD_HW, private.std_hw),
            (ops::STD_VW, private.std_vw),
        ];
        for (op, value) in optional {
            if let Some(value) = value {
                write_dict_number(&mut out, value);
                write_dict_op(&mut out, op);
            }
        }
        write_dict_deltas(&mut out, ops::STEM_SNAP_H, &private.stem_snap_h);
        write_dict_deltas(&mut out, ops::STEM_SNAP_V, &private.stem_snap_v);
        if private.force_bold {
            write_dict_int(&mut out, 1);
            write_dict_op(&mut out, ops::FORCE_BOLD);
        }
        if private.language_group != 0 {
            write_dict_int(&mut out, private.language_group);
            write_dict_op(&mut out, ops::LANGUAGE_GROUP);
        }
        if let Some(factor) = private.expansion_factor {
            write_dict_number(&mut out, factor);
            write_dict_op(&mut out, ops::EXPANSION_FACTOR);
        }

        #[allow(clippy::cast_possible_truncation)] // widths are font-unit values
        let width = self.widths[fd] as f32;
        if width != 0.0 {
            write_dict_number(&mut out, width);
            write_dict_op(&mut out, ops::DEFAULT_WIDTH_X);
            write_dict_number(&mut out, width);
            write_dict_op(&mut out, ops::NOMINAL_WIDTH_X);
        }
        out
    }

    fn write_string_op(
        &mut self,
        out: &mut Vec<u8>,
        op: u16,
        value: Option<&String>,
    ) -> Result<(), EmbedError> {
        if let Some(value) = value {
            let sid = self.strings.sid(value)?;
            write_dict_int(out, sid.into());
            write_dict_op(out, op);
        }
        Ok(())
    }

    /// Writes Top DICT entries not depending on the table layout.
    fn top_dict_prefix(&mut self) -> Result<Vec<u8>, EmbedError> {
        let info = self.info;
        let mut out = vec![];
        if let Some(cid) = &info.cid {
            let registry = self.strings.sid(&cid.registry)?;
            let ordering = self.strings.sid(&cid.ordering)?;
            write_dict_int(&mut out, registry.into());
            write_dict_int(&mut out, ordering.into());
            write_dict_int(&mut out, cid.supplement);
            write_dict_op(&mut out, ops::ROS);
        }
        self.write_string_op(&mut out, ops::VERSION, info.version.as_ref())?;
        self.write_string_op(&mut out, ops::NOTICE, info.notice.as_ref())?;
        self.write_string_op(&mut out, ops::COPYRIGHT, info.copyright.as_ref())?;
        self.write_string_op(&mut out, ops::FULL_NAME, info.full_name.as_ref())?;
        self.write_string_op(&mut out, ops::FAMILY_NAME, info.family_name.as_ref())?;
        self.write_string_op(&mut out, ops::WEIGHT, info.weight.as_ref())?;
        if info.is_fixed_pitch {
            write_dict_int(&mut out, 1);
            write_dict_op(&mut out, ops::IS_FIXED_PITCH);
        }
        if info.italic_angle != 0.0 {
            write_dict_number(&mut out, info.italic_angle);
            write_dict_op(&mut out, ops::ITALIC_ANGLE);
        }
        if info.underline_position != -100.0 {
            write_dict_number(&mut out, info.underline_position);
            write_dict_op(&mut out, ops::UNDERLINE_POSITION);
        }
        if info.underline_thickness != 50.0 {
            write_dict_number(&mut out, info.underline_thickness);
            write_dict_op(&mut out, ops::UNDERLINE_THICKNESS);
        }
        if let Some(matrix) = info.font_matrix.filter(|matrix| *matrix != DEFAULT_FONT_MATRIX) {
            for value in matrix {
                write_dict_number(&mut out, value);
            }
            write_dict_op(&mut out, ops::FONT_MATRIX);
        }
        for value in info.font_bbox {
            write_dict_number(&mut out, value.round());
        }
        write_dict_op(&mut out, ops::FONT_BBOX);

        if info.cid.is_some() {
            let cid_count = self
                .glyphs
                .iter()
                .map(|glyph| u32::from(glyph.cid.unwrap_or(glyph.tag)) + 1)
                .max()
                .unwrap_or(1);
            // `unwrap()` is safe: the CID count is at most `u16::MAX + 1`
            write_dict_int(&mut out, i32::try_from(cid_count).unwrap());
            write_dict_op(&mut out, ops::CID_COUNT);
        }
        Ok(out)
    }

    fn font_dict(&mut self, dict: &FontDict, private_len: usize, private_offset: usize) -> Result<Vec<u8>, EmbedError> {
        let mut out = vec![];
        self.write_string_op(&mut out, ops::FONT_NAME, dict.name.as_ref())?;
        if let Some(matrix) = dict.font_matrix {
            for value in matrix {
                write_dict_number(&mut out, value);
            }
            write_dict_op(&mut out, ops::FONT_MATRIX);
        }
        write_dict_offset(&mut out, private_len)?;
        write_dict_offset(&mut out, private_offset)?;
        write_dict_op(&mut out, ops::PRIVATE);
        Ok(out)
    }

    #[allow(clippy::too_many_lines)]
    fn build(mut self, spooled: &[u8]) -> Result<Vec<u8>, EmbedError> {
        let info = self.info;
        let is_cid = info.cid.is_some();
        if self.glyphs.len() > usize::from(u16::MAX) {
            return Err(write_error(format_args!("too many glyphs: {}", self.glyphs.len())));
        }

        // Layout-independent parts. Strings are registered while writing them.
        let top_prefix = self.top_dict_prefix()?;
        let charset = self.charset()?;
        let fd_select = if is_cid { self.fd_select()? } else { vec![] };
        let charstrings = self.charstrings(spooled)?;
        let privates: Vec<_> = info
            .font_dicts
            .iter()
            .enumerate()
            .map(|(fd, dict)| self.private_dict(fd, &dict.private))
            .collect();
        let font_dicts = if is_cid { info.font_dicts.as_slice() } else { &[] };
        let mut font_dict_index = Index::default();
        for (dict, private) in font_dicts.iter().zip(&privates) {
            font_dict_index.push(&self.font_dict(dict, private.len(), 0)?);
        }

        let mut name_index = Index::default();
        name_index.push(info.font_name.as_bytes());
        // Top DICT size with placeholder offsets; offsets have a fixed size
        let top_dict = |offsets: [usize; 4]| -> Result<Vec<u8>, EmbedError> {
            let [charset, fd_select, charstrings, fd_array_or_private] = offsets;
            let mut out = top_prefix.clone();
            write_dict_offset(&mut out, charset)?;
            write_dict_op(&mut out, ops::CHARSET);
            write_dict_offset(&mut out, charstrings)?;
            write_dict_op(&mut out, ops::CHAR_STRINGS);
            if is_cid {
                write_dict_offset(&mut out, fd_select)?;
                write_dict_op(&mut out, ops::FD_SELECT);
                write_dict_offset(&mut out, fd_array_or_private)?;
                write_dict_op(&mut out, ops::FD_ARRAY);
            } else {
                write_dict_offset(&mut out, privates[0].len())?;
                write_dict_offset(&mut out, fd_array_or_private)?;
                write_dict_op(&mut out, ops::PRIVATE);
            }
            Ok(out)
        };
        let mut top_index = Index::default();
        top_index.push(&top_dict([0; 4])?);

        let global_subrs = Index::default();
        let charset_offset =
            4 + name_index.byte_len() + top_index.byte_len() + self.strings.strings.byte_len() + global_subrs.byte_len();
        let fd_select_offset = charset_offset + charset.len();
        let charstrings_offset = fd_select_offset + fd_select.len();
        let fd_array_offset = charstrings_offset + charstrings.byte_len();
        let mut private_offset = fd_array_offset + if is_cid { font_dict_index.byte_len() } else { 0 };

        let offsets = [charset_offset, fd_select_offset, charstrings_offset];
        let top_target = if is_cid { fd_array_offset } else { private_offset };
        let mut top_index = Index::default();
        top_index.push(&top_dict([offsets[0], offsets[1], offsets[2], top_target])?);

        let mut font_dict_index = Index::default();
        let mut private_offsets = Vec::with_capacity(privates.len());
        for private in &privates {
            private_offsets.push(private_offset);
            private_offset += private.len();
        }
        for ((dict, private), &offset) in font_dicts.iter().zip(&privates).zip(&private_offsets) {
            font_dict_index.push(&self.font_dict(dict, private.len(), offset)?);
        }

        let mut out = Vec::with_capacity(private_offset);
        out.extend_from_slice(&[1, 0, 4, 4]); // major, minor, hdrSize, offSize
        name_index.write(&mut out)?;
        top_index.write(&mut out)?;
        self.strings.strings.write(&mut out)?;
        global_subrs.write(&mut out)?;
        debug_assert_eq!(out.len(), charset_offset);
        out.extend_from_slice(&charset);
        out.extend_from_slice(&fd_select);
        charstrings.write(&mut out)?;
        if is_cid {
            font_dict_index.write(&mut out)?;
        }
        for private in &privates {
            out.extend_from_slice(private);
        }
        if out.len() != private_offset {
            return Err(EmbedError::internal("CFF table layout mismatch"));
        }
        Ok(out)
    }
}
