//! SVG font writer.

use core::{fmt, ops};
use std::{collections::BTreeSet, fmt::Write as _, io::Write as _};

use crate::{
    errors::{EmbedError, ErrorKind},
    font::FontInfo,
    glyph::{GlyphAction, GlyphInfo, GlyphSink},
    gpos::GidPair,
    stream::{ClientStream, StreamRole},
};

/// Flags controlling SVG font output.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SvgFlags(u32);

impl fmt::Debug for SvgFlags {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(SvgFlags, &str); 2] = [
            (SvgFlags::STANDALONE, "STANDALONE"),
            (SvgFlags::CRLF, "CRLF"),
        ];

        let mut set = formatter.debug_set();
        for (flag, name) in NAMES {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

impl SvgFlags {
    /// Writes a complete SVG document (XML declaration, `DOCTYPE` and the `<svg>` root)
    /// rather than a bare `<font>` element.
    pub const STANDALONE: Self = Self(1);
    /// Uses CRLF line endings instead of LF.
    pub const CRLF: Self = Self(1 << 1);

    /// Returns flags with no bits set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Checks whether all bits of `other` are set in these flags.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl ops::BitOr for SvgFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Allocates Private Use Area code points for glyphs without a Unicode value.
#[derive(Debug, Default)]
pub(crate) struct UnicodeAllocator {
    used: BTreeSet<u32>,
    next: u32,
}

impl UnicodeAllocator {
    const PUA_START: u32 = 0xe000;
    const PUA_END: u32 = 0xf8ff;

    /// Resets the allocator, marking `used` code points as taken.
    pub(crate) fn reset(&mut self, used: impl Iterator<Item = u32>) {
        self.used.clear();
        self.used.extend(used);
        self.next = Self::PUA_START;
    }

    pub(crate) fn allocate(&mut self) -> Result<u32, EmbedError> {
        while self.used.contains(&self.next) {
            self.next += 1;
        }
        if self.next > Self::PUA_END {
            return Err(EmbedError::new(
                ErrorKind::SvgWrite,
                "Private Use Area is exhausted",
            ));
        }
        let code = self.next;
        self.used.insert(code);
        self.next += 1;
        Ok(code)
    }
}

fn escape_xml(raw: &str, out: &mut String) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
}

#[derive(Debug)]
struct PendingGlyph {
    name: Option<String>,
    unicode: u32,
    width: f32,
}

/// SVG font being written. Receives glyphs via the [`GlyphSink`] interface and writes them
/// straight to the destination stream. The first glyph is written as `<missing-glyph>`.
pub(crate) struct SvgSession<'w> {
    out: &'w mut dyn ClientStream,
    flags: SvgFlags,
    newline: &'static str,
    font_name: String,
    /// `<font-face>` element written together with the `<font>` start tag.
    font_face: String,
    buffer: String,
    path: String,
    has_open_contour: bool,
    current: Option<PendingGlyph>,
    next_unicode: Option<u32>,
    /// Unicode values by output GID.
    unicodes: Vec<Option<u32>>,
    written: usize,
}

impl fmt::Debug for SvgSession<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SvgSession")
            .field("flags", &self.flags)
            .field("font_name", &self.font_name)
            .field("glyph_count", &self.unicodes.len())
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

impl<'w> SvgSession<'w> {
    pub(crate) fn begin_font(
        out: &'w mut dyn ClientStream,
        flags: SvgFlags,
        info: &FontInfo,
    ) -> Self {
        let newline = if flags.contains(SvgFlags::CRLF) { "\r\n" } else { "\n" };
        #[allow(clippy::cast_possible_truncation)] // font units per em are small
        let units_per_em = info
            .font_matrix
            .map_or(1000.0, |matrix| (1.0 / matrix[0]).round())
            as i32;

        let mut font_face = String::from("<font-face font-family=\"");
        escape_xml(info.family_name.as_deref().unwrap_or(&info.font_name), &mut font_face);
        let [x_min, y_min, x_max, y_max] = info.font_bbox;
        // `fmt::Write` for `String` is infallible
        let _ = write!(
            font_face,
            "\" units-per-em=\"{units_per_em}\" bbox=\"{x_min} {y_min} {x_max} {y_max}\" \
             underline-position=\"{}\" underline-thickness=\"{}\"",
            info.underline_position, info.underline_thickness
        );
        if info.italic_angle != 0.0 {
            let _ = write!(font_face, " slope=\"{}\"", info.italic_angle);
        }
        font_face.push_str("/>");

        let mut this = Self {
            out,
            flags,
            newline,
            font_name: info.font_name.clone(),
            font_face,
            buffer: String::new(),
            path: String::new(),
            has_open_contour: false,
            current: None,
            next_unicode: None,
            unicodes: vec![],
            written: 0,
        };
        if flags.contains(SvgFlags::STANDALONE) {
            let newline = this.newline;
            let _ = write!(
                this.buffer,
                "<?xml version=\"1.0\" standalone=\"no\"?>{newline}\
                 <!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \
                 \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">{newline}\
                 <svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\">{newline}<defs>{newline}"
            );
        }
        this
    }

    /// Sets the Unicode value for the next glyph passed to [`GlyphSink::begin()`].
    pub(crate) fn set_next_unicode(&mut self, unicode: u32) {
        self.next_unicode = Some(unicode);
    }

    fn flush_buffer(&mut self) -> Result<(), EmbedError> {
        self.out
            .write_all(self.buffer.as_bytes())
            .map_err(|err| StreamRole::Destination.io_error(err))?;
        self.written += self.buffer.len();
        self.buffer.clear();
        Ok(())
    }

    fn close_contour(&mut self) {
        if self.has_open_contour {
            self.path.push_str(" Z");
            self.has_open_contour = false;
        }
    }

    fn push_command(&mut self, command: char) {
        if !self.path.is_empty() {
            self.path.push(' ');
        }
        self.path.push(command);
    }

    /// Writes kerning pairs and finishes the font. Returns the total number of bytes written.
    pub(crate) fn end_font(mut self, pairs: &[GidPair]) -> Result<usize, EmbedError> {
        if self.current.is_some() {
            return Err(EmbedError::new(ErrorKind::SvgWrite, "unfinished glyph"));
        }
        if self.unicodes.is_empty() {
            return Err(EmbedError::new(ErrorKind::SvgWrite, "font has no glyphs"));
        }

        let newline = self.newline;
        let mut kern_count = 0;
        for pair in pairs {
            let lookup = |gid: u16| self.unicodes.get(usize::from(gid)).copied().flatten();
            let (Some(first), Some(second)) = (lookup(pair.first), lookup(pair.second)) else {
                log::trace!("skipping kerning pair {pair:?} without Unicode values");
                continue;
            };
            // SVG `k` values are subtracted from the advance.
            let _ = write!(
                self.buffer,
                "<hkern u1=\"&#x{first:X};\" u2=\"&#x{second:X};\" k=\"{}\"/>{newline}",
                -i32::from(pair.value)
            );
            kern_count += 1;
        }
        self.buffer.push_str("</font>");
        self.buffer.push_str(newline);
        if self.flags.contains(SvgFlags::STANDALONE) {
            let _ = write!(self.buffer, "</defs>{newline}</svg>{newline}");
        }
        self.flush_buffer()?;
        self.out
            .flush()
            .map_err(|err| StreamRole::Destination.io_error(err))?;
        log::debug!(
            "SVG font `{}`: {} glyphs, {kern_count} kerning pairs, {} bytes",
            self.font_name,
            self.unicodes.len(),
            self.written
        );
        Ok(self.written)
    }
}

impl GlyphSink for SvgSession<'_> {
    fn begin(&mut self, info: &GlyphInfo<'_>) -> Result<GlyphAction, EmbedError> {
        if self.current.is_some() {
            return Err(EmbedError::new(ErrorKind::SvgWrite, "nested glyph"));
        }
        let unicode = self.next_unicode.take().ok_or_else(|| {
            EmbedError::internal(format_args!("no Unicode value for glyph #{}", info.tag))
        })?;
        self.path.clear();
        self.has_open_contour = false;
        self.current = Some(PendingGlyph {
            name: info.name.map(str::to_owned),
            unicode,
            width: 0.0,
        });
        Ok(GlyphAction::Parse)
    }

    fn width(&mut self, width: f32) {
        if let Some(glyph) = &mut self.current {
            glyph.width = width;
        }
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.close_contour();
        self.push_command('M');
        let _ = write!(self.path, "{x} {y}");
        self.has_open_contour = true;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push_command('L');
        let _ = write!(self.path, "{x} {y}");
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) {
        self.push_command('C');
        let _ = write!(self.path, "{x1} {y1} {x2} {y2} {x3} {y3}");
    }

    fn end(&mut self) -> Result<(), EmbedError> {
        let glyph = self
            .current
            .take()
            .ok_or_else(|| EmbedError::new(ErrorKind::SvgWrite, "glyph end without begin"))?;
        self.close_contour();
        let newline = self.newline;

        if self.unicodes.is_empty() {
            // The first glyph is `.notdef`; its width is the default advance.
            self.buffer.push_str("<font id=\"");
            escape_xml(&self.font_name, &mut self.buffer);
            let _ = write!(
                self.buffer,
                "\" horiz-adv-x=\"{}\">{newline}{}{newline}<missing-glyph",
                glyph.width, self.font_face
            );
            self.unicodes.push(None);
        } else {
            let _ = write!(self.buffer, "<glyph unicode=\"&#x{:X};\"", glyph.unicode);
            if let Some(name) = &glyph.name {
                self.buffer.push_str(" glyph-name=\"");
                escape_xml(name, &mut self.buffer);
                self.buffer.push('"');
            }
            self.unicodes.push(Some(glyph.unicode));
        }
        let _ = write!(self.buffer, " horiz-adv-x=\"{}\"", glyph.width);
        if !self.path.is_empty() {
            let _ = write!(self.buffer, " d=\"{}\"", self.path);
        }
        let _ = write!(self.buffer, "/>{newline}");
        self.flush_buffer()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn write_font(flags: SvgFlags, pairs: &[GidPair]) -> String {
        let info = FontInfo {
            font_name: "Test&Co".to_owned(),
            font_bbox: [0.0, -200.0, 1000.0, 800.0],
            ..FontInfo::default()
        };
        let mut out = io::Cursor::new(vec![]);
        let mut session = SvgSession::begin_font(&mut out, flags, &info);
        let glyphs = [(".notdef", 0xffff, 500.0), ("A", 0x41, 600.0), ("B", 0xe000, 650.0)];
        for (tag, (name, unicode, width)) in glyphs.into_iter().enumerate() {
            session.set_next_unicode(unicode);
            let info = GlyphInfo {
                tag: u16::try_from(tag).unwrap(),
                name: Some(name),
                cid: None,
                fd: 0,
            };
            session.begin(&info).unwrap();
            session.width(width);
            if tag > 0 {
                session.move_to(0.0, 0.0);
                session.line_to(100.0, 0.0);
                session.curve_to(100.0, 50.0, 50.0, 100.5, 0.0, 100.0);
            }
            session.end().unwrap();
        }
        let len = session.end_font(pairs).unwrap();
        let out = String::from_utf8(out.into_inner()).unwrap();
        assert_eq!(out.len(), len);
        out
    }

    #[test]
    fn writing_font() {
        let pairs = [
            GidPair { first: 1, second: 2, value: -50 },
            GidPair { first: 1, second: 64_000, value: 10 },
        ];
        let svg = write_font(SvgFlags::empty(), &pairs);
        let lines: Vec<_> = svg.lines().collect();
        assert_eq!(
            lines,
            [
                "<font id=\"Test&amp;Co\" horiz-adv-x=\"500\">",
                "<font-face font-family=\"Test&amp;Co\" units-per-em=\"1000\" bbox=\"0 -200 1000 800\" \
                 underline-position=\"-100\" underline-thickness=\"50\"/>",
                "<missing-glyph horiz-adv-x=\"500\"/>",
                "<glyph unicode=\"&#x41;\" glyph-name=\"A\" horiz-adv-x=\"600\" \
                 d=\"M0 0 L100 0 C100 50 50 100.5 0 100 Z\"/>",
                "<glyph unicode=\"&#xE000;\" glyph-name=\"B\" horiz-adv-x=\"650\" \
                 d=\"M0 0 L100 0 C100 50 50 100.5 0 100 Z\"/>",
                "<hkern u1=\"&#x41;\" u2=\"&#xE000;\" k=\"50\"/>",
                "</font>",
            ]
        );
    }

    #[test]
    fn standalone_font_with_crlf() {
        let svg = write_font(SvgFlags::STANDALONE | SvgFlags::CRLF, &[]);
        assert!(svg.starts_with("<?xml version=\"1.0\" standalone=\"no\"?>\r\n"));
        assert!(svg.ends_with("</font>\r\n</defs>\r\n</svg>\r\n"));
        assert!(!svg.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn allocating_private_use_code_points() {
        let mut allocator = UnicodeAllocator::default();
        allocator.reset([0x41, 0xe000, 0xe002].into_iter());
        assert_eq!(allocator.allocate().unwrap(), 0xe001);
        assert_eq!(allocator.allocate().unwrap(), 0xe003);

        allocator.reset(0xe000..=0xf8ff);
        let err = allocator.allocate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SvgWrite);
    }

    #[test]
    fn flags_debug() {
        assert_eq!(format!("{:?}", SvgFlags::STANDALONE | SvgFlags::CRLF), "{STANDALONE, CRLF}");
        assert_eq!(format!("{:?}", SvgFlags::empty()), "{}");
    }
}
