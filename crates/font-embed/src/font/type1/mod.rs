//! Type 1 font parser. Handles name-keyed fonts (PFA / demultiplexed PFB), multiple master
//! fonts instanced with a user design vector, and CID-keyed Type 1 (CIDFontType 0) fonts.

use std::collections::BTreeMap;

use self::{
    charstring::Type1Source,
    lexer::{decrypt_charstring, decrypt_eexec, skip_eexec_whitespace, Lexer, Token, Value},
};
use super::{
    strings::standard_encoding_name, CidInfo, Cursor, FontDict, FontInfo, FontParser, PrivateDict,
};
use crate::{
    errors::{EmbedError, ErrorKind, ParseError, ParseErrorKind},
    glyph::{GlyphAction, GlyphInfo, GlyphSink},
};

mod charstring;
mod lexer;

const DEFAULT_LEN_IV: i32 = 4;
const DEFAULT_FONT_MATRIX: [f32; 6] = [0.001, 0.0, 0.0, 0.001, 0.0, 0.0];

#[derive(Debug)]
struct Type1Glyph {
    name: Option<String>,
    cid: Option<u16>,
    fd: u8,
    /// Decrypted charstring.
    charstring: Vec<u8>,
}

#[derive(Debug, Default)]
struct Type1Font {
    glyphs: Vec<Type1Glyph>,
    /// Decrypted subroutines for each font dictionary.
    subrs: Vec<Vec<Vec<u8>>>,
    weights: Vec<f32>,
    by_name: BTreeMap<String, u16>,
    by_cid: BTreeMap<u16, u16>,
}

struct GlyphContext<'a> {
    font: &'a Type1Font,
    fd: usize,
}

impl Type1Source for GlyphContext<'_> {
    fn subr(&self, index: usize) -> Option<&[u8]> {
        self.font.subrs.get(self.fd)?.get(index).map(Vec::as_slice)
    }

    fn seac_component(&self, code: u8) -> Option<&[u8]> {
        let gid = *self.font.by_name.get(standard_encoding_name(code)?)?;
        Some(&self.font.glyphs[usize::from(gid)].charstring)
    }

    fn weights(&self) -> &[f32] {
        &self.font.weights
    }
}

/// Font dictionary values collected while scanning the font program.
#[derive(Debug)]
struct FdValues<'a> {
    name: Option<String>,
    font_matrix: Option<[f32; 6]>,
    private: PrivateDict,
    len_iv: i32,
    subrs: BTreeMap<usize, &'a [u8]>,
    subr_map_offset: usize,
    sd_bytes: u8,
    subr_count: usize,
}

impl Default for FdValues<'_> {
    fn default() -> Self {
        Self {
            name: None,
            font_matrix: None,
            private: PrivateDict::default(),
            len_iv: DEFAULT_LEN_IV,
            subrs: BTreeMap::new(),
            subr_map_offset: 0,
            sd_bytes: 0,
            subr_count: 0,
        }
    }
}

#[derive(Debug, Default)]
struct CidValues {
    registry: Option<String>,
    ordering: Option<String>,
    supplement: i32,
    cid_map_offset: usize,
    fd_bytes: u8,
    gd_bytes: u8,
    cid_count: usize,
}

/// Where scanning of a font program section has stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stop {
    /// `eexec` token; the encrypted section starts at the specified position.
    Eexec(usize),
    /// `StartData` operator of a CID-keyed font.
    StartData { pos: usize, len: usize },
    End,
}

#[derive(Debug, Default)]
struct Scanner<'a> {
    info: FontInfo,
    top: FdValues<'a>,
    fds: Vec<FdValues<'a>>,
    in_fd_array: bool,
    current_fd: Option<usize>,
    charstrings: Vec<(String, &'a [u8])>,
    cid: Option<CidValues>,
    weight_vector: Vec<f32>,
    design_positions: Vec<Vec<f32>>,
    design_map: Vec<Vec<(f32, f32)>>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // PostScript integers
fn to_usize(value: &Value<'_>) -> Option<usize> {
    value.as_f32().filter(|&value| value >= 0.0).map(|value| value as usize)
}

#[allow(clippy::cast_possible_truncation)]
fn to_i32(value: &Value<'_>) -> Option<i32> {
    value.as_f32().map(|value| value as i32)
}

impl<'a> Scanner<'a> {
    fn fd(&mut self) -> &mut FdValues<'a> {
        match self.current_fd {
            Some(idx) => &mut self.fds[idx],
            None => &mut self.top,
        }
    }

    fn cid(&mut self) -> &mut CidValues {
        self.cid.get_or_insert_with(CidValues::default)
    }

    fn scan(&mut self, lexer: &mut Lexer<'a>) -> Stop {
        let mut last_int = None;
        while let Some(token) = lexer.next() {
            match token {
                Token::Name(name) => {
                    if let Some(Token::Binary(charstring)) = lexer.peek() {
                        lexer.next();
                        let name = String::from_utf8_lossy(name).into_owned();
                        self.charstrings.push((name, charstring));
                    } else {
                        self.handle_key(name, lexer);
                    }
                }
                Token::Int(value) => {
                    if let Some(Token::Binary(subr)) = lexer.peek() {
                        lexer.next();
                        if let Ok(index) = usize::try_from(value) {
                            self.fd().subrs.insert(index, subr);
                        }
                    } else {
                        last_int = Some(value);
                    }
                }
                Token::Raw(b"dup") if self.in_fd_array => {
                    if let Some(Token::Int(idx)) = lexer.peek() {
                        lexer.next();
                        let Ok(idx) = usize::try_from(idx) else {
                            continue;
                        };
                        if self.fds.len() <= idx {
                            self.fds.resize_with(idx + 1, FdValues::default);
                        }
                        self.current_fd = Some(idx);
                    }
                }
                Token::Raw(b"eexec") => return Stop::Eexec(lexer.pos()),
                Token::Raw(b"StartData") => {
                    let len = last_int.and_then(|len| usize::try_from(len).ok()).unwrap_or(0);
                    // Binary data starts after a single whitespace char
                    return Stop::StartData {
                        pos: lexer.pos() + 1,
                        len,
                    };
                }
                Token::Raw(b"closefile") => return Stop::End,
                _ => {}
            }
        }
        Stop::End
    }

    #[allow(clippy::too_many_lines)] // a flat list of dictionary keys
    fn handle_key(&mut self, key: &[u8], lexer: &mut Lexer<'a>) {
        // Keys that do not take a value or introduce nested structures
        match key {
            b"FDArray" => {
                self.in_fd_array = true;
                return;
            }
            b"Private" | b"CharStrings" | b"Subrs" | b"FontInfo" | b"CIDSystemInfo" => return,
            _ => {}
        }

        let Some(value) = Value::read(lexer) else {
            return;
        };
        match key {
            b"FontName" => {
                let name = value.as_text();
                if self.current_fd.is_some() {
                    self.fd().name = name;
                } else if let Some(name) = name {
                    self.info.font_name = name;
                }
            }
            b"CIDFontName" => {
                if let Some(name) = value.as_text() {
                    self.info.font_name = name;
                }
                self.cid();
            }
            b"version" => self.info.version = value.as_text(),
            b"Notice" => self.info.notice = value.as_text(),
            b"Copyright" => self.info.copyright = value.as_text(),
            b"FullName" => self.info.full_name = value.as_text(),
            b"FamilyName" => self.info.family_name = value.as_text(),
            b"Weight" => self.info.weight = value.as_text(),
            b"ItalicAngle" => self.info.italic_angle = value.as_f32().unwrap_or(0.0),
            b"isFixedPitch" => self.info.is_fixed_pitch = value == Value::Bool(true),
            b"UnderlinePosition" => {
                self.info.underline_position = value.as_f32().unwrap_or(-100.0);
            }
            b"UnderlineThickness" => {
                self.info.underline_thickness = value.as_f32().unwrap_or(50.0);
            }
            b"FontMatrix" => {
                if let Some(matrix) = value.as_numbers().and_then(|m| <[f32; 6]>::try_from(m).ok()) {
                    self.fd().font_matrix = Some(matrix);
                }
            }
            b"FontBBox" => {
                if let Some(bbox) = value.as_numbers().and_then(|b| <[f32; 4]>::try_from(b).ok()) {
                    self.info.font_bbox = bbox;
                }
            }
            b"WeightVector" => {
                if let Some(weights) = value.as_numbers() {
                    self.weight_vector = weights;
                }
            }
            b"BlendDesignPositions" => {
                if let Value::Array(masters) = &value {
                    self.design_positions = masters.iter().filter_map(Value::as_numbers).collect();
                }
            }
            b"BlendDesignMap" => {
                if let Value::Array(axes) = &value {
                    self.design_map = axes.iter().map(read_axis_map).collect();
                }
            }
            b"Registry" => self.cid().registry = value.as_text(),
            b"Ordering" => self.cid().ordering = value.as_text(),
            b"Supplement" => self.cid().supplement = to_i32(&value).unwrap_or(0),
            b"CIDMapOffset" => self.cid().cid_map_offset = to_usize(&value).unwrap_or(0),
            #[allow(clippy::cast_possible_truncation)]
            b"FDBytes" => self.cid().fd_bytes = to_usize(&value).unwrap_or(0) as u8,
            #[allow(clippy::cast_possible_truncation)]
            b"GDBytes" => self.cid().gd_bytes = to_usize(&value).unwrap_or(0) as u8,
            b"CIDCount" => self.cid().cid_count = to_usize(&value).unwrap_or(0),

            b"lenIV" => self.fd().len_iv = to_i32(&value).unwrap_or(DEFAULT_LEN_IV),
            b"SubrMapOffset" => self.fd().subr_map_offset = to_usize(&value).unwrap_or(0),
            #[allow(clippy::cast_possible_truncation)]
            b"SDBytes" => self.fd().sd_bytes = to_usize(&value).unwrap_or(0) as u8,
            b"SubrCount" => self.fd().subr_count = to_usize(&value).unwrap_or(0),
            _ => self.handle_private_key(key, &value),
        }
    }

    fn handle_private_key(&mut self, key: &[u8], value: &Value<'_>) {
        let private = &mut self.fd().private;
        // Multiple master fonts have blended arrays of arrays; these fail `as_numbers()`
        // and keep the values for the default instance.
        let set_array = |target: &mut Vec<f32>| {
            if let Some(values) = value.as_numbers() {
                *target = values;
            }
        };
        match key {
            b"BlueValues" => set_array(&mut private.blue_values),
            b"OtherBlues" => set_array(&mut private.other_blues),
            b"FamilyBlues" => set_array(&mut private.family_blues),
            b"FamilyOtherBlues" => set_array(&mut private.family_other_blues),
            b"StemSnapH" => set_array(&mut private.stem_snap_h),
            b"StemSnapV" => set_array(&mut private.stem_snap_v),
            b"BlueScale" => private.blue_scale = value.as_f32(),
            b"BlueShift" => private.blue_shift = value.as_f32(),
            b"BlueFuzz" => private.blue_fuzz = value.as_f32(),
            b"StdHW" => private.std_hw = first_number(value),
            b"StdVW" => private.std_vw = first_number(value),
            b"ForceBold" => private.force_bold = *value == Value::Bool(true),
            b"LanguageGroup" => private.language_group = to_i32(value).unwrap_or(0),
            b"ExpansionFactor" => private.expansion_factor = value.as_f32(),
            _ => {}
        }
    }
}

fn first_number(value: &Value<'_>) -> Option<f32> {
    value
        .as_f32()
        .or_else(|| value.as_numbers()?.first().copied())
}

fn read_axis_map(axis: &Value<'_>) -> Vec<(f32, f32)> {
    let Value::Array(points) = axis else {
        return vec![];
    };
    points
        .iter()
        .filter_map(|point| match point.as_numbers()?.as_slice() {
            &[user, normalized] => Some((user, normalized)),
            _ => None,
        })
        .collect()
}

/// Maps a user design coordinate to the normalized `0..=1` range.
fn normalize_coordinate(map: &[(f32, f32)], value: f32) -> f32 {
    let (Some(&first), Some(&last)) = (map.first(), map.last()) else {
        return value.clamp(0.0, 1.0);
    };
    if value <= first.0 {
        return first.1;
    }
    if value >= last.0 {
        return last.1;
    }
    for pair in map.windows(2) {
        let ((u0, n0), (u1, n1)) = (pair[0], pair[1]);
        if value <= u1 && u1 > u0 {
            return n0 + (value - u0) / (u1 - u0) * (n1 - n0);
        }
    }
    last.1
}

/// Computes master weights from a user design vector.
fn design_weights(
    udv: &[f32],
    positions: &[Vec<f32>],
    map: &[Vec<(f32, f32)>],
) -> Result<Vec<f32>, EmbedError> {
    let axis_count = positions.first().map_or(0, Vec::len);
    if udv.len() != axis_count {
        return Err(EmbedError::bad_spec(format_args!(
            "design vector has {} axes, while the font has {axis_count}",
            udv.len()
        )));
    }
    let normalized: Vec<_> = udv
        .iter()
        .enumerate()
        .map(|(axis, &value)| {
            let axis_map = map.get(axis).map(Vec::as_slice).unwrap_or_default();
            normalize_coordinate(axis_map, value)
        })
        .collect();

    Ok(positions
        .iter()
        .map(|position| {
            position
                .iter()
                .zip(&normalized)
                .map(|(&corner, &coord)| if corner >= 0.5 { coord } else { 1.0 - coord })
                .product()
        })
        .collect())
}

fn read_sized(cursor: &mut Cursor<'_>, size: u8) -> Result<usize, ParseError> {
    if size == 0 {
        return Ok(0);
    }
    cursor.read_offset(size).map(|value| value as usize)
}

/// Reads CID-keyed glyphs and subroutines from the binary section.
fn read_cid_data(
    binary: &[u8],
    cid: &CidValues,
    fds: &[FdValues<'_>],
) -> Result<(Vec<Type1Glyph>, Vec<Vec<Vec<u8>>>), ParseError> {
    let base = Cursor::new(binary);

    let mut subrs = Vec::with_capacity(fds.len());
    for fd in fds {
        let mut cursor = base.at(fd.subr_map_offset)?;
        let offsets = (0..=fd.subr_count)
            .map(|_| read_sized(&mut cursor, fd.sd_bytes))
            .collect::<Result<Vec<_>, _>>()?;
        let fd_subrs = offsets
            .windows(2)
            .map(|pair| {
                let subr = base.range(pair[0]..pair[1])?;
                Ok(decrypt_charstring(subr.bytes, fd.len_iv))
            })
            .collect::<Result<Vec<_>, ParseError>>()?;
        subrs.push(fd_subrs);
    }

    let mut cursor = base.at(cid.cid_map_offset)?;
    let read_entry = |cursor: &mut Cursor<'_>| -> Result<(usize, usize), ParseError> {
        let fd = read_sized(cursor, cid.fd_bytes)?;
        let offset = read_sized(cursor, cid.gd_bytes)?;
        Ok((fd, offset))
    };
    let mut glyphs = vec![];
    let (mut fd, mut start) = read_entry(&mut cursor)?;
    for cid_value in 0..cid.cid_count {
        let (next_fd, end) = read_entry(&mut cursor)?;
        if end > start {
            let fd_values = fds
                .get(fd)
                .ok_or_else(|| cursor.err(ParseErrorKind::OffsetOutOfBounds(fd)))?;
            let charstring = base.range(start..end)?;
            let cid_value = u16::try_from(cid_value)
                .map_err(|_| cursor.err(ParseErrorKind::OffsetOutOfBounds(cid_value)))?;
            glyphs.push(Type1Glyph {
                name: None,
                cid: Some(cid_value),
                fd: u8::try_from(fd).unwrap_or(u8::MAX),
                charstring: decrypt_charstring(charstring.bytes, fd_values.len_iv),
            });
        }
        (fd, start) = (next_fd, end);
    }
    Ok((glyphs, subrs))
}

fn collect_subrs(subrs: &BTreeMap<usize, &[u8]>, len_iv: i32) -> Vec<Vec<u8>> {
    let len = subrs.keys().next_back().map_or(0, |&idx| idx + 1);
    let mut output = vec![vec![]; len];
    for (&idx, subr) in subrs {
        output[idx] = decrypt_charstring(subr, len_iv);
    }
    output
}

/// Parser for Type 1 font programs.
#[derive(Debug, Default)]
pub(crate) struct Type1Parser {
    font: Option<Type1Font>,
}

impl Type1Parser {
    fn font(&self) -> Result<&Type1Font, EmbedError> {
        self.font
            .as_ref()
            .ok_or_else(|| EmbedError::internal("no Type 1 font is loaded"))
    }

    fn parse(data: &[u8], udv: Option<&[f32]>) -> Result<(Type1Font, FontInfo), EmbedError> {
        let private;
        let mut scanner = Scanner::default();
        let mut lexer = Lexer::new(data);
        let stop = scanner.scan(&mut lexer);

        let mut font = Type1Font::default();
        match stop {
            Stop::Eexec(pos) => {
                let start = skip_eexec_whitespace(data, pos)
                    .ok_or_else(|| type1_error(ParseError::missing("eexec data")))?;
                private = decrypt_eexec(&data[start..]);
                scanner.scan(&mut Lexer::new(&private));
            }
            Stop::StartData { pos, len } => {
                let cid = scanner
                    .cid
                    .as_ref()
                    .ok_or_else(|| type1_error(ParseError::missing("CIDFontName")))?;
                let binary = pos
                    .checked_add(len)
                    .and_then(|end| data.get(pos..end))
                    .ok_or_else(|| {
                        type1_error(ParseError::new(ParseErrorKind::OffsetOutOfBounds(pos + len), pos))
                    })?;
                let (glyphs, subrs) =
                    read_cid_data(binary, cid, &scanner.fds).map_err(type1_error)?;
                font.glyphs = glyphs;
                font.subrs = subrs;
            }
            Stop::End => return Err(type1_error(ParseError::missing("eexec section"))),
        }

        if scanner.cid.is_none() {
            font.subrs = vec![collect_subrs(&scanner.top.subrs, scanner.top.len_iv)];
            font.glyphs = scanner
                .charstrings
                .iter()
                .map(|(name, charstring)| Type1Glyph {
                    name: Some(name.clone()),
                    cid: None,
                    fd: 0,
                    charstring: decrypt_charstring(charstring, scanner.top.len_iv),
                })
                .collect();
        }

        font.weights = match udv {
            Some(udv) if !scanner.design_positions.is_empty() => {
                design_weights(udv, &scanner.design_positions, &scanner.design_map)?
            }
            Some(_) => {
                log::warn!("design vector is ignored for a font without multiple masters");
                scanner.weight_vector
            }
            None => scanner.weight_vector,
        };

        for (idx, glyph) in font.glyphs.iter().enumerate() {
            let gid = u16::try_from(idx)
                .map_err(|_| EmbedError::new(ErrorKind::Type1Parse, "too many glyphs"))?;
            if let Some(name) = &glyph.name {
                font.by_name.entry(name.clone()).or_insert(gid);
            }
            if let Some(cid) = glyph.cid {
                font.by_cid.entry(cid).or_insert(gid);
            }
        }

        let mut info = scanner.info;
        info.glyph_count = font.glyphs.len();
        info.font_matrix = Some(scanner.top.font_matrix.unwrap_or(DEFAULT_FONT_MATRIX));
        if let Some(cid) = scanner.cid {
            info.cid = Some(CidInfo {
                registry: cid.registry.unwrap_or_else(|| "Adobe".to_owned()),
                ordering: cid.ordering.unwrap_or_else(|| "Identity".to_owned()),
                supplement: cid.supplement,
            });
            info.font_dicts = scanner
                .fds
                .into_iter()
                .map(|fd| FontDict {
                    name: fd.name,
                    font_matrix: fd.font_matrix,
                    private: fd.private,
                })
                .collect();
        } else {
            info.font_dicts = vec![FontDict {
                name: Some(info.font_name.clone()),
                font_matrix: None,
                private: scanner.top.private,
            }];
        }
        Ok((font, info))
    }

    fn deliver(&self, tag: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        let font = self.font()?;
        let glyph = font
            .glyphs
            .get(usize::from(tag))
            .ok_or_else(|| EmbedError::new(ErrorKind::Type1Parse, format_args!("no glyph #{tag}")))?;
        let info = GlyphInfo {
            tag,
            name: glyph.name.as_deref(),
            cid: glyph.cid,
            fd: glyph.fd,
        };
        if sink.begin(&info)? == GlyphAction::Skip {
            return Ok(());
        }
        let context = GlyphContext {
            font,
            fd: usize::from(glyph.fd),
        };
        charstring::evaluate(&glyph.charstring, &context, sink).map_err(|err| {
            let id = glyph.name.clone().unwrap_or_else(|| format!("#{tag}"));
            EmbedError::new(ErrorKind::Type1Parse, format_args!("glyph {id}: {err}"))
        })?;
        sink.end()
    }
}

fn type1_error(err: ParseError) -> EmbedError {
    err.into_embed(ErrorKind::Type1Parse)
}

impl FontParser for Type1Parser {
    fn begin_font(&mut self, data: Vec<u8>, udv: Option<&[f32]>) -> Result<FontInfo, EmbedError> {
        let (font, info) = Self::parse(&data, udv)?;
        log::debug!(
            "parsed Type 1 font {:?}: {} glyphs, {} masters",
            info.font_name,
            info.glyph_count,
            font.weights.len().max(1)
        );
        self.font = Some(font);
        Ok(info)
    }

    fn glyph_count(&self) -> usize {
        self.font.as_ref().map_or(0, |font| font.glyphs.len())
    }

    fn glyph_by_tag(&mut self, tag: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        self.deliver(tag, sink)
    }

    fn glyph_by_name(&mut self, name: &str, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        let tag = *self.font()?.by_name.get(name).ok_or_else(|| {
            EmbedError::new(ErrorKind::Type1Parse, format_args!("no glyph named {name:?}"))
        })?;
        self.deliver(tag, sink)
    }

    fn glyph_by_cid(&mut self, cid: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        let font = self.font()?;
        let tag = if font.by_cid.is_empty() {
            cid
        } else {
            *font.by_cid.get(&cid).ok_or_else(|| {
                EmbedError::new(ErrorKind::Type1Parse, format_args!("no glyph for CID {cid}"))
            })?
        };
        self.deliver(tag, sink)
    }

    fn end_font(&mut self) {
        self.font = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        glyph::{PathOp, RecordingSink},
        tests::{cid_type1_font, type1_font, TestGlyph},
    };

    #[test]
    fn normalizing_design_coordinates() {
        let map = [(100.0, 0.0), (400.0, 0.5), (900.0, 1.0)];
        assert_eq!(normalize_coordinate(&map, 50.0), 0.0);
        assert_eq!(normalize_coordinate(&map, 250.0), 0.25);
        assert_eq!(normalize_coordinate(&map, 650.0), 0.75);
        assert_eq!(normalize_coordinate(&map, 1000.0), 1.0);
        assert_eq!(normalize_coordinate(&[], 0.3), 0.3);
    }

    #[test]
    fn design_weights_for_two_axes() {
        let positions = [
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
        ];
        let weights = design_weights(&[0.25, 0.5], &positions, &[]).unwrap();
        assert_eq!(weights, [0.375, 0.125, 0.375, 0.125]);

        let err = design_weights(&[0.5], &positions, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadSpec);
    }

    #[test]
    fn parsing_name_keyed_font() {
        for hex in [false, true] {
            let data = type1_font(
                "TestFont-Regular",
                &[
                    TestGlyph::new(".notdef", 0, vec![]),
                    TestGlyph::new("A", 600, vec![(0, 0), (500, 0), (250, 700)]),
                ],
                hex,
            );
            let mut parser = Type1Parser::default();
            let info = parser.begin_font(data, None).unwrap();
            assert_eq!(info.font_name, "TestFont-Regular");
            assert_eq!(info.family_name.as_deref(), Some("TestFont"));
            assert_eq!(info.glyph_count, 2);
            assert_eq!(info.font_matrix, Some(DEFAULT_FONT_MATRIX));
            assert_eq!(info.font_bbox, [0.0, -200.0, 1000.0, 800.0]);
            assert_eq!(info.font_dicts[0].private.blue_values, [-20.0, 0.0, 700.0, 720.0]);
            assert_eq!(info.font_dicts[0].private.std_vw, Some(80.0));

            let mut sink = RecordingSink::default();
            parser.glyph_by_name("A", &mut sink).unwrap();
            let glyph = &sink.glyphs[0];
            assert_eq!(glyph.tag, 1);
            assert_eq!(glyph.name.as_deref(), Some("A"));
            assert_eq!(glyph.width, Some(600.0));
            assert_eq!(
                glyph.path,
                [
                    PathOp::Move(0.0, 0.0),
                    PathOp::Line(500.0, 0.0),
                    PathOp::Line(250.0, 700.0),
                ]
            );

            let err = parser.glyph_by_name("B", &mut sink).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Type1Parse);
        }
    }

    #[test]
    fn parsing_cid_keyed_font() {
        let data = cid_type1_font(
            "TestCID",
            &[(0, vec![]), (5, vec![(0, 0), (100, 0), (100, 100)])],
        );
        let mut parser = Type1Parser::default();
        let info = parser.begin_font(data, None).unwrap();
        assert_eq!(info.font_name, "TestCID");
        let cid = info.cid.unwrap();
        assert_eq!((cid.registry.as_str(), cid.ordering.as_str()), ("Adobe", "Identity"));
        assert_eq!(info.glyph_count, 2);
        assert_eq!(info.font_dicts.len(), 1);

        let mut sink = RecordingSink::default();
        parser.glyph_by_cid(5, &mut sink).unwrap();
        assert_eq!(sink.glyphs[0].cid, Some(5));
        assert_eq!(sink.glyphs[0].path.len(), 3);
        assert!(parser.glyph_by_cid(3, &mut sink).is_err());
    }

    #[test]
    fn missing_eexec_is_an_error() {
        let err = Type1Parser::default()
            .begin_font(b"%!FontType1-1.0: Test\n/FontName /Test def\n".to_vec(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type1Parse);
    }
}
