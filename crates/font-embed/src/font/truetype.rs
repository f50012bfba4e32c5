//! TrueType (`glyf`-based sfnt) parser.

use core::ops::Range;
use std::collections::BTreeMap;

use super::{strings::MAC_GLYPH_NAMES, Cursor, FontInfo, FontParser, TableDirectory, TableTag};
use crate::{
    errors::{EmbedError, ErrorKind, ParseError, ParseErrorKind},
    glyph::{GlyphAction, GlyphInfo, GlyphSink},
};

/// Maximum nesting of composite glyphs.
const MAX_COMPONENT_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy)]
enum LocaFormat {
    Short,
    Long,
}

impl LocaFormat {
    const fn bytes_per_offset(self) -> usize {
        match self {
            Self::Short => 2,
            Self::Long => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f32,
    y: f32,
    on_curve: bool,
}

impl Point {
    fn midpoint(self, other: Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            on_curve: true,
        }
    }
}

type Contour = Vec<Point>;

/// Loaded TrueType font. Table data is referenced by ranges into `data`.
#[derive(Debug)]
struct TrueTypeFont {
    data: Vec<u8>,
    loca_format: LocaFormat,
    loca: Range<usize>,
    glyf: Range<usize>,
    hmtx: Range<usize>,
    number_of_h_metrics: u16,
    glyph_count: u16,
    /// Glyph names from the `post` table; empty if the table has no names.
    glyph_names: Vec<String>,
    by_name: BTreeMap<String, u16>,
}

impl TrueTypeFont {
    fn cursor(&self, range: Range<usize>) -> Result<Cursor<'_>, ParseError> {
        Cursor::new(&self.data).range(range)
    }

    fn glyph_range(&self, gid: u16) -> Result<Range<usize>, ParseError> {
        let offset_len = self.loca_format.bytes_per_offset();
        let mut loca = self.cursor(self.loca.clone())?.at(usize::from(gid) * offset_len)?;
        let (start, end) = match self.loca_format {
            LocaFormat::Short => {
                let start = usize::from(loca.read_u16()?) * 2;
                (start, usize::from(loca.read_u16()?) * 2)
            }
            LocaFormat::Long => (loca.read_u32()? as usize, loca.read_u32()? as usize),
        };
        if start > end {
            return Err(loca.err(ParseErrorKind::RangeOutOfBounds {
                range: start..end,
                len: self.glyf.len(),
            }));
        }
        Ok(self.glyf.start + start..self.glyf.start + end)
    }

    fn advance(&self, gid: u16) -> Result<u16, ParseError> {
        let metric_idx = gid.min(self.number_of_h_metrics.saturating_sub(1));
        let mut hmtx = self.cursor(self.hmtx.clone())?.at(usize::from(metric_idx) * 4)?;
        hmtx.read_u16()
    }

    /// Loads the outline of the glyph in its own coordinate space.
    fn outline(&self, gid: u16, depth: usize) -> Result<Vec<Contour>, ParseError> {
        if gid >= self.glyph_count {
            return Err(ParseError::new(ParseErrorKind::OffsetOutOfBounds(gid.into()), 0));
        }
        let range = self.glyph_range(gid)?;
        if range.is_empty() {
            return Ok(vec![]);
        }
        let mut cursor = Cursor::new(&self.data).range(range)?;
        let contour_count = cursor.read_i16()?;
        cursor.skip(8)?; // xMin, yMin, xMax, yMax
        if contour_count >= 0 {
            read_simple_glyph(cursor, contour_count.unsigned_abs())
        } else if depth >= MAX_COMPONENT_DEPTH {
            Err(cursor.err(ParseErrorKind::NestingTooDeep))
        } else {
            self.read_composite_glyph(cursor, depth)
        }
    }

    fn read_composite_glyph(
        &self,
        mut cursor: Cursor<'_>,
        depth: usize,
    ) -> Result<Vec<Contour>, ParseError> {
        const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
        const ARGS_ARE_XY_VALUES: u16 = 0x0002;
        const WE_HAVE_A_SCALE: u16 = 0x0008;
        const MORE_COMPONENTS: u16 = 0x0020;
        const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
        const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

        let mut contours: Vec<Contour> = vec![];
        loop {
            let flags = cursor.read_u16()?;
            let component_gid = cursor.read_u16()?;
            let xy_values = flags & ARGS_ARE_XY_VALUES != 0;
            let args = if flags & ARG_1_AND_2_ARE_WORDS != 0 {
                if xy_values {
                    [i32::from(cursor.read_i16()?), i32::from(cursor.read_i16()?)]
                } else {
                    [i32::from(cursor.read_u16()?), i32::from(cursor.read_u16()?)]
                }
            } else {
                let bytes = cursor.read_byte_array::<2>()?;
                if xy_values {
                    bytes.map(|byte| i32::from(i8::from_be_bytes([byte])))
                } else {
                    bytes.map(i32::from)
                }
            };
            let [a, b, c, d] = if flags & WE_HAVE_A_SCALE != 0 {
                let scale = read_f2dot14(&mut cursor)?;
                [scale, 0.0, 0.0, scale]
            } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
                let x_scale = read_f2dot14(&mut cursor)?;
                [x_scale, 0.0, 0.0, read_f2dot14(&mut cursor)?]
            } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
                [
                    read_f2dot14(&mut cursor)?,
                    read_f2dot14(&mut cursor)?,
                    read_f2dot14(&mut cursor)?,
                    read_f2dot14(&mut cursor)?,
                ]
            } else {
                [1.0, 0.0, 0.0, 1.0]
            };

            let mut component = self.outline(component_gid, depth + 1)?;
            for point in component.iter_mut().flatten() {
                let (x, y) = (point.x, point.y);
                point.x = a * x + c * y;
                point.y = b * x + d * y;
            }

            #[allow(clippy::cast_precision_loss)] // offsets are 16-bit
            let (dx, dy) = if xy_values {
                (args[0] as f32, args[1] as f32)
            } else {
                // Point matching: align a point of the component with a point of the glyph
                let find = |contours: &[Contour], idx: i32| {
                    let idx = usize::try_from(idx).ok()?;
                    contours.iter().flatten().nth(idx).copied()
                };
                let base = find(&contours, args[0]);
                let attached = find(&component, args[1]);
                let (Some(base), Some(attached)) = (base, attached) else {
                    return Err(cursor.err(ParseErrorKind::OffsetOutOfBounds(
                        usize::try_from(args[0].max(args[1])).unwrap_or(0),
                    )));
                };
                (base.x - attached.x, base.y - attached.y)
            };
            for point in component.iter_mut().flatten() {
                point.x += dx;
                point.y += dy;
            }
            contours.extend(component);

            if flags & MORE_COMPONENTS == 0 {
                break;
            }
        }
        Ok(contours)
    }
}

fn read_f2dot14(cursor: &mut Cursor<'_>) -> Result<f32, ParseError> {
    Ok(f32::from(cursor.read_i16()?) / 16_384.0)
}

fn read_simple_glyph(mut cursor: Cursor<'_>, contour_count: u16) -> Result<Vec<Contour>, ParseError> {
    const ON_CURVE_POINT: u8 = 0x01;
    const X_SHORT_VECTOR: u8 = 0x02;
    const Y_SHORT_VECTOR: u8 = 0x04;
    const REPEAT_FLAG: u8 = 0x08;
    const X_IS_SAME_OR_POSITIVE: u8 = 0x10;
    const Y_IS_SAME_OR_POSITIVE: u8 = 0x20;

    let end_points = (0..contour_count)
        .map(|_| cursor.read_u16())
        .collect::<Result<Vec<_>, _>>()?;
    let instruction_len = cursor.read_u16()?;
    cursor.skip(instruction_len.into())?;
    let point_count = end_points.last().map_or(0, |&last| usize::from(last) + 1);

    let mut flags = Vec::with_capacity(point_count);
    while flags.len() < point_count {
        let flag = cursor.read_u8()?;
        flags.push(flag);
        if flag & REPEAT_FLAG != 0 {
            let repeat_count = cursor.read_u8()?;
            flags.extend((0..repeat_count).map(|_| flag));
        }
    }
    flags.truncate(point_count);

    let mut read_coordinates = |short_flag: u8, same_flag: u8| {
        let mut value = 0_i32;
        flags
            .iter()
            .map(|&flag| -> Result<i32, ParseError> {
                let delta = if flag & short_flag != 0 {
                    let delta = i32::from(cursor.read_u8()?);
                    if flag & same_flag != 0 {
                        delta
                    } else {
                        -delta
                    }
                } else if flag & same_flag != 0 {
                    0
                } else {
                    i32::from(cursor.read_i16()?)
                };
                value += delta;
                Ok(value)
            })
            .collect::<Result<Vec<_>, _>>()
    };
    let xs = read_coordinates(X_SHORT_VECTOR, X_IS_SAME_OR_POSITIVE)?;
    let ys = read_coordinates(Y_SHORT_VECTOR, Y_IS_SAME_OR_POSITIVE)?;

    #[allow(clippy::cast_precision_loss)] // coordinates are 16-bit
    let mut points = flags.iter().zip(xs.into_iter().zip(ys)).map(|(&flag, (x, y))| Point {
        x: x as f32,
        y: y as f32,
        on_curve: flag & ON_CURVE_POINT != 0,
    });

    let mut contours = Vec::with_capacity(end_points.len());
    let mut start = 0;
    for &end in &end_points {
        let end = usize::from(end) + 1;
        if end < start {
            return Err(cursor.err(ParseErrorKind::InvalidToken));
        }
        contours.push(points.by_ref().take(end - start).collect());
        start = end;
    }
    Ok(contours)
}

/// Delivers a closed quadratic contour as cubic curves and lines.
fn emit_contour(points: &[Point], sink: &mut dyn GlyphSink) {
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return;
    };
    let (start, rest) = if first.on_curve {
        (first, &points[1..])
    } else if last.on_curve {
        (last, &points[..points.len() - 1])
    } else {
        (first.midpoint(last), points)
    };

    sink.move_to(start.x, start.y);
    let mut current = start;
    let mut control: Option<Point> = None;
    let closing = rest.iter().map(|&point| (point, false)).chain([(start, true)]);
    for (point, is_closing) in closing {
        match (point.on_curve, control) {
            (true, None) => {
                // The closing line is implicit
                if !is_closing {
                    sink.line_to(point.x, point.y);
                }
                current = point;
            }
            (true, Some(ctrl)) => {
                quad_to(sink, current, ctrl, point);
                current = point;
                control = None;
            }
            (false, None) => control = Some(point),
            (false, Some(ctrl)) => {
                let mid = ctrl.midpoint(point);
                quad_to(sink, current, ctrl, mid);
                current = mid;
                control = Some(point);
            }
        }
    }
}

fn quad_to(sink: &mut dyn GlyphSink, from: Point, ctrl: Point, to: Point) {
    const TWO_THIRDS: f32 = 2.0 / 3.0;
    sink.curve_to(
        from.x + TWO_THIRDS * (ctrl.x - from.x),
        from.y + TWO_THIRDS * (ctrl.y - from.y),
        to.x + TWO_THIRDS * (ctrl.x - to.x),
        to.y + TWO_THIRDS * (ctrl.y - to.y),
        to.x,
        to.y,
    );
}

/// Reads `name` table strings by name ID, preferring Windows Unicode English records.
fn read_names(mut cursor: Cursor<'_>) -> Result<BTreeMap<u16, String>, ParseError> {
    let table = cursor;
    cursor.skip(2)?; // format
    let count = cursor.read_u16()?;
    let storage = table.at(cursor.read_u16()?.into())?;

    let mut names = BTreeMap::<u16, (u8, String)>::new();
    for _ in 0..count {
        let platform_id = cursor.read_u16()?;
        let encoding_id = cursor.read_u16()?;
        let language_id = cursor.read_u16()?;
        let name_id = cursor.read_u16()?;
        let len = usize::from(cursor.read_u16()?);
        let offset = usize::from(cursor.read_u16()?);

        let (rank, is_utf16) = match (platform_id, encoding_id, language_id) {
            (3, 1, 0x409) => (3, true),
            (0, _, _) | (3, 0 | 1, _) => (2, true),
            (1, 0, 0) => (1, false),
            _ => continue,
        };
        if names.get(&name_id).is_some_and(|(existing, _)| *existing >= rank) {
            continue;
        }
        let bytes = storage.range(offset..offset + len)?.bytes;
        let value = if is_utf16 {
            let units = bytes
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]));
            char::decode_utf16(units)
                .map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        } else {
            bytes.iter().copied().map(char::from).collect()
        };
        names.insert(name_id, (rank, value));
    }
    Ok(names.into_iter().map(|(id, (_, name))| (id, name)).collect())
}

/// Reads glyph names from a format 1 or 2 `post` table.
fn read_post_names(mut cursor: Cursor<'_>, glyph_count: u16) -> Result<Vec<String>, ParseError> {
    const FORMAT_1: u32 = 0x0001_0000;
    const FORMAT_2: u32 = 0x0002_0000;

    let version = cursor.read_u32()?;
    match version {
        FORMAT_1 => Ok(MAC_GLYPH_NAMES
            .iter()
            .take(glyph_count.into())
            .map(|&name| name.to_owned())
            .collect()),
        FORMAT_2 => {
            cursor.skip(28)?; // remaining header fields
            let count = cursor.read_u16()?;
            let indices = (0..count)
                .map(|_| cursor.read_u16())
                .collect::<Result<Vec<_>, _>>()?;
            let mut custom_names = vec![];
            while !cursor.is_empty() {
                let len = cursor.read_u8()?;
                let name = cursor.split_at(len.into())?;
                custom_names.push(String::from_utf8_lossy(name.bytes).into_owned());
            }
            indices
                .into_iter()
                .map(|idx| {
                    let idx = usize::from(idx);
                    match MAC_GLYPH_NAMES.get(idx) {
                        Some(&name) => Ok(name.to_owned()),
                        None => custom_names
                            .get(idx - MAC_GLYPH_NAMES.len())
                            .cloned()
                            .ok_or_else(|| cursor.err(ParseErrorKind::OffsetOutOfBounds(idx))),
                    }
                })
                .collect()
        }
        _ => Ok(vec![]),
    }
}

/// Parser for TrueType fonts.
#[derive(Debug, Default)]
pub(crate) struct TrueTypeParser {
    font: Option<TrueTypeFont>,
}

impl TrueTypeParser {
    fn font(&self) -> Result<&TrueTypeFont, EmbedError> {
        self.font
            .as_ref()
            .ok_or_else(|| EmbedError::internal("no TrueType font is loaded"))
    }

    fn parse(data: Vec<u8>) -> Result<(TrueTypeFont, FontInfo), ParseError> {
        const TRUETYPE_VERSION: u32 = 0x0001_0000;
        const APPLE_TRUETYPE_VERSION: u32 = u32::from_be_bytes(*b"true");
        const HEAD_VERSION: u32 = 0x0001_0000;

        let directory = TableDirectory::parse(&data)?;
        if !matches!(directory.version, TRUETYPE_VERSION | APPLE_TRUETYPE_VERSION) {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedVersion(directory.version),
                0,
            ));
        }
        let table = |tag: TableTag, name: &'static str| {
            directory.table_range(tag).ok_or_else(|| ParseError::missing(name))
        };
        let head = table(TableTag::HEAD, "`head` table")?;
        let maxp = table(TableTag::MAXP, "`maxp` table")?;
        let hhea = table(TableTag::HHEA, "`hhea` table")?;
        let hmtx = table(TableTag::HMTX, "`hmtx` table")?;
        let loca = table(TableTag::LOCA, "`loca` table")?;
        let glyf = table(TableTag::GLYF, "`glyf` table")?;
        let root = Cursor::new(&data);

        let mut head_cursor = root.range(head)?;
        let head_version = head_cursor.read_u32()?;
        if head_version != HEAD_VERSION {
            return Err(head_cursor.err(ParseErrorKind::UnexpectedVersion(head_version)));
        }
        let mut head_cursor = head_cursor.at(14)?;
        let units_per_em = head_cursor.read_u16()?;
        let mut head_cursor = head_cursor.at(16)?; // created, modified
        let font_bbox = [
            f32::from(head_cursor.read_i16()?),
            f32::from(head_cursor.read_i16()?),
            f32::from(head_cursor.read_i16()?),
            f32::from(head_cursor.read_i16()?),
        ];
        head_cursor.skip(6)?; // macStyle, lowestRecPPEM, fontDirectionHint
        let loca_format = match head_cursor.read_i16()? {
            0 => LocaFormat::Short,
            1 => LocaFormat::Long,
            other => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let format = other as u8;
                return Err(head_cursor.err(ParseErrorKind::UnexpectedFormat(format)));
            }
        };

        let glyph_count = root.range(maxp)?.at(4)?.read_u16()?;
        let number_of_h_metrics = root.range(hhea)?.at(34)?.read_u16()?;
        if number_of_h_metrics == 0 || hmtx.len() < 4 * usize::from(number_of_h_metrics) {
            return Err(ParseError::missing("horizontal metrics"));
        }
        let expected_loca_len = loca_format.bytes_per_offset() * (usize::from(glyph_count) + 1);
        if loca.len() < expected_loca_len {
            return Err(ParseError::new(
                ParseErrorKind::RangeOutOfBounds {
                    range: 0..expected_loca_len,
                    len: loca.len(),
                },
                loca.start,
            ));
        }

        let names = match directory.table_range(TableTag::NAME) {
            Some(range) => read_names(root.range(range)?)?,
            None => BTreeMap::new(),
        };
        let mut info = FontInfo {
            glyph_count: glyph_count.into(),
            font_bbox,
            ..FontInfo::default()
        };
        if units_per_em > 0 {
            let scale = 1.0 / f32::from(units_per_em);
            info.font_matrix = Some([scale, 0.0, 0.0, scale, 0.0, 0.0]);
        }

        let mut glyph_names = vec![];
        if let Some(post) = directory.table_range(TableTag::POST) {
            let mut cursor = root.range(post.clone())?;
            cursor.skip(4)?; // version
            let italic_angle = i32::from_be_bytes(cursor.read_byte_array()?);
            #[allow(clippy::cast_precision_loss)] // Fixed values fit into `f32` well enough
            let italic_angle = italic_angle as f32 / 65_536.0;
            info.italic_angle = italic_angle;
            info.underline_position = f32::from(cursor.read_i16()?);
            info.underline_thickness = f32::from(cursor.read_i16()?);
            info.is_fixed_pitch = cursor.read_u32()? != 0;
            glyph_names = read_post_names(root.range(post)?, glyph_count)?;
        }

        let name = |id: u16| names.get(&id).cloned();
        info.copyright = name(0);
        info.family_name = name(1);
        info.weight = name(2);
        info.full_name = name(4);
        info.version = name(5);
        info.notice = name(7);
        info.font_name = name(6)
            .or_else(|| info.full_name.as_ref().map(|full| full.replace(' ', "")))
            .ok_or_else(|| ParseError::missing("PostScript font name"))?;

        let mut by_name = BTreeMap::new();
        for (gid, name) in glyph_names.iter().enumerate() {
            if let Ok(gid) = u16::try_from(gid) {
                by_name.entry(name.clone()).or_insert(gid);
            }
        }

        let font = TrueTypeFont {
            data,
            loca_format,
            loca,
            glyf,
            hmtx,
            number_of_h_metrics,
            glyph_count,
            glyph_names,
            by_name,
        };
        Ok((font, info))
    }

    fn deliver(&self, gid: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        let font = self.font()?;
        if gid >= font.glyph_count {
            return Err(EmbedError::new(
                ErrorKind::TrueTypeParse,
                format_args!("no glyph #{gid}"),
            ));
        }
        let info = GlyphInfo {
            tag: gid,
            name: font.glyph_names.get(usize::from(gid)).map(String::as_str),
            cid: None,
            fd: 0,
        };
        if sink.begin(&info)? == GlyphAction::Skip {
            return Ok(());
        }

        let map_err = |err: ParseError| {
            EmbedError::new(ErrorKind::TrueTypeParse, format_args!("glyph #{gid}: {err}"))
        };
        let advance = font.advance(gid).map_err(map_err)?;
        let contours = font.outline(gid, 0).map_err(map_err)?;
        sink.width(advance.into());
        for contour in &contours {
            emit_contour(contour, sink);
        }
        sink.end()
    }
}

impl FontParser for TrueTypeParser {
    fn begin_font(&mut self, data: Vec<u8>, udv: Option<&[f32]>) -> Result<FontInfo, EmbedError> {
        if udv.is_some() {
            log::warn!("user design vector is ignored for TrueType fonts");
        }
        let (font, info) = Self::parse(data).map_err(|err| err.into_embed(ErrorKind::TrueTypeParse))?;
        log::debug!(
            "parsed TrueType font {:?}: {} glyphs, {} glyph names",
            info.font_name,
            font.glyph_count,
            font.glyph_names.len()
        );
        self.font = Some(font);
        Ok(info)
    }

    fn glyph_count(&self) -> usize {
        self.font.as_ref().map_or(0, |font| font.glyph_count.into())
    }

    fn glyph_by_tag(&mut self, tag: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        self.deliver(tag, sink)
    }

    fn glyph_by_name(&mut self, name: &str, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        let gid = *self.font()?.by_name.get(name).ok_or_else(|| {
            EmbedError::new(ErrorKind::TrueTypeParse, format_args!("no glyph named {name:?}"))
        })?;
        self.deliver(gid, sink)
    }

    /// TrueType fonts are not CID-keyed; CIDs are interpreted as glyph indices.
    fn glyph_by_cid(&mut self, cid: u16, sink: &mut dyn GlyphSink) -> Result<(), EmbedError> {
        self.deliver(cid, sink)
    }

    fn end_font(&mut self) {
        self.font = None;
    }
}
