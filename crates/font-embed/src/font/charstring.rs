//! Type 2 charstring evaluation.

use crate::{
    errors::{ParseError, ParseErrorKind},
    font::Cursor,
    glyph::{GlyphSink, Seac},
};

/// Maximum nesting depth for subroutine calls.
pub(super) const NESTING_DEPTH_LIMIT: u32 = 10;
const MAX_STACK_LEN: usize = 48;
const TRANSIENT_LEN: usize = 32;

/// Computes the subroutine number bias for an INDEX with `count` entries.
pub(super) fn subr_bias(count: usize) -> i32 {
    if count < 1_240 {
        107
    } else if count < 33_900 {
        1_131
    } else {
        32_768
    }
}

/// Charstring data available to the evaluator.
pub(super) trait CharstringSource {
    /// Gets a global subroutine by its biased number.
    fn global_subr(&self, number: i32) -> Option<&[u8]>;
    /// Gets a local subroutine by its biased number.
    fn local_subr(&self, number: i32) -> Option<&[u8]>;
    /// Gets the charstring of a `seac` component by its StandardEncoding code.
    fn seac_component(&self, code: u8) -> Option<&[u8]>;
}

/// Widths used to decode the optional width operand.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(super) struct Widths {
    pub(super) default: f32,
    pub(super) nominal: f32,
}

/// Evaluates a Type 2 charstring, delivering the flattened outline to `sink`.
pub(super) fn evaluate(
    charstring: &[u8],
    source: &dyn CharstringSource,
    widths: Widths,
    sink: &mut dyn GlyphSink,
) -> Result<(), ParseError> {
    let mut evaluator = Evaluator::new(source, widths, sink, (0.0, 0.0), true);
    evaluator.run(charstring)
}

struct Evaluator<'a, 's> {
    source: &'a dyn CharstringSource,
    widths: Widths,
    sink: &'s mut dyn GlyphSink,
    /// Offset applied to all points (non-zero for `seac` accents).
    offset: (f32, f32),
    emit_width: bool,
    have_width: bool,
    stem_count: usize,
    x: f32,
    y: f32,
    stack: Vec<f32>,
    transient: [f32; TRANSIENT_LEN],
}

impl<'a, 's> Evaluator<'a, 's> {
    fn new(
        source: &'a dyn CharstringSource,
        widths: Widths,
        sink: &'s mut dyn GlyphSink,
        offset: (f32, f32),
        emit_width: bool,
    ) -> Self {
        Self {
            source,
            widths,
            sink,
            offset,
            emit_width,
            have_width: false,
            stem_count: 0,
            x: 0.0,
            y: 0.0,
            stack: Vec::with_capacity(MAX_STACK_LEN),
            transient: [0.0; TRANSIENT_LEN],
        }
    }

    fn run(&mut self, charstring: &[u8]) -> Result<(), ParseError> {
        self.evaluate(charstring, 0)?;
        // Charstrings without stack-clearing operators still have a (default) width.
        self.take_width(false);
        Ok(())
    }

    fn push(&mut self, cursor: &Cursor<'_>, value: f32) -> Result<(), ParseError> {
        if self.stack.len() == MAX_STACK_LEN {
            return Err(cursor.err(ParseErrorKind::StackOverflow));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, cursor: &Cursor<'_>) -> Result<f32, ParseError> {
        self.stack
            .pop()
            .ok_or_else(|| cursor.err(ParseErrorKind::StackUnderflow))
    }

    fn args<const N: usize>(&self, cursor: &Cursor<'_>, start: usize) -> Result<[f32; N], ParseError> {
        self.stack
            .get(start..start + N)
            .and_then(|args| args.try_into().ok())
            .ok_or_else(|| cursor.err(ParseErrorKind::StackUnderflow))
    }

    /// Handles the optional width operand of the first stack-clearing operator.
    /// Returns the index of the first non-width argument.
    fn take_width(&mut self, has_extra_arg: bool) -> usize {
        if self.have_width {
            return 0;
        }
        self.have_width = true;
        let width = if has_extra_arg {
            self.widths.nominal + self.stack[0]
        } else {
            self.widths.default
        };
        if self.emit_width {
            self.sink.width(width);
        }
        usize::from(has_extra_arg)
    }

    fn move_to(&mut self) {
        self.sink
            .move_to(self.x + self.offset.0, self.y + self.offset.1);
    }

    fn line_to(&mut self) {
        self.sink
            .line_to(self.x + self.offset.0, self.y + self.offset.1);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let (dx, dy) = self.offset;
        self.sink.curve_to(
            x1 + dx,
            y1 + dy,
            x2 + dx,
            y2 + dy,
            self.x + dx,
            self.y + dy,
        );
    }

    fn flex(&mut self, depth: f32, points: [f32; 10]) {
        let (dx, dy) = self.offset;
        let [x1, y1, x2, y2, x3, y3, x4, y4, x5, y5] = points;
        self.sink.flex(
            depth,
            &[
                [x1 + dx, y1 + dy, x2 + dx, y2 + dy, x3 + dx, y3 + dy],
                [x4 + dx, y4 + dy, x5 + dx, y5 + dy, self.x + dx, self.y + dy],
            ],
        );
    }

    #[allow(clippy::too_many_lines)] // a single operator dispatch
    fn evaluate(&mut self, charstring: &[u8], depth: u32) -> Result<bool, ParseError> {
        if depth > NESTING_DEPTH_LIMIT {
            return Err(ParseError::new(ParseErrorKind::NestingTooDeep, 0));
        }

        let mut cursor = Cursor::new(charstring);
        while !cursor.is_empty() {
            let b0 = cursor.read_u8()?;
            match b0 {
                28 => {
                    let value = cursor.read_i16()?;
                    self.push(&cursor, value.into())?;
                }
                32..=246 => self.push(&cursor, f32::from(i16::from(b0) - 139))?,
                247..=250 => {
                    let b1 = cursor.read_u8()?;
                    let value = (i16::from(b0) - 247) * 256 + i16::from(b1) + 108;
                    self.push(&cursor, value.into())?;
                }
                251..=254 => {
                    let b1 = cursor.read_u8()?;
                    let value = -(i16::from(b0) - 251) * 256 - i16::from(b1) - 108;
                    self.push(&cursor, value.into())?;
                }
                255 => {
                    #[allow(clippy::cast_precision_loss)] // 16.16 fixed values
                    let value = cursor.read_u32()? as i32 as f32 / 65_536.0;
                    self.push(&cursor, value)?;
                }
                // hstem, vstem, hstemhm, vstemhm
                1 | 3 | 18 | 23 => {
                    let start = self.take_width(self.stack.len() % 2 == 1);
                    self.stems(start, matches!(b0, 3 | 23));
                }
                // hintmask, cntrmask
                19 | 20 => {
                    let start = self.take_width(self.stack.len() % 2 == 1);
                    self.stems(start, true);
                    cursor.skip(self.stem_count.div_ceil(8))?;
                    self.sink.generic_op(u16::from(b0), &[]);
                }
                // rmoveto
                21 => {
                    let start = self.take_width(self.stack.len() > 2);
                    let [dx, dy] = self.args(&cursor, start)?;
                    self.x += dx;
                    self.y += dy;
                    self.move_to();
                    self.stack.clear();
                }
                // hmoveto, vmoveto
                22 | 4 => {
                    let start = self.take_width(self.stack.len() > 1);
                    let [delta] = self.args(&cursor, start)?;
                    if b0 == 22 {
                        self.x += delta;
                    } else {
                        self.y += delta;
                    }
                    self.move_to();
                    self.stack.clear();
                }
                // rlineto
                5 => {
                    for i in (0..self.stack.len() / 2 * 2).step_by(2) {
                        let [dx, dy] = self.args(&cursor, i)?;
                        self.x += dx;
                        self.y += dy;
                        self.line_to();
                    }
                    self.stack.clear();
                }
                // hlineto, vlineto
                6 | 7 => {
                    let mut is_x = b0 == 6;
                    for i in 0..self.stack.len() {
                        if is_x {
                            self.x += self.stack[i];
                        } else {
                            self.y += self.stack[i];
                        }
                        is_x = !is_x;
                        self.line_to();
                    }
                    self.stack.clear();
                }
                // rrcurveto, rcurveline
                8 | 24 => {
                    let count = self.stack.len();
                    let mut i = 0;
                    while i + 6 <= count {
                        self.rr_curve(&cursor, i)?;
                        i += 6;
                    }
                    if b0 == 24 {
                        let [dx, dy] = self.args(&cursor, i)?;
                        self.x += dx;
                        self.y += dy;
                        self.line_to();
                    }
                    self.stack.clear();
                }
                // rlinecurve
                25 => {
                    let count = self.stack.len();
                    if count < 6 {
                        return Err(cursor.err(ParseErrorKind::StackUnderflow));
                    }
                    let mut i = 0;
                    while i + 6 < count {
                        let [dx, dy] = self.args(&cursor, i)?;
                        self.x += dx;
                        self.y += dy;
                        self.line_to();
                        i += 2;
                    }
                    self.rr_curve(&cursor, i)?;
                    self.stack.clear();
                }
                // vvcurveto, hhcurveto
                26 | 27 => {
                    let is_vertical = b0 == 26;
                    let mut i = 0;
                    let mut first_delta = 0.0;
                    if self.stack.len() % 2 == 1 {
                        first_delta = self.stack[0];
                        i = 1;
                    }
                    while i + 4 <= self.stack.len() {
                        let [da, dxb, dyb, dc] = self.args(&cursor, i)?;
                        let (x1, y1) = if is_vertical {
                            (self.x + first_delta, self.y + da)
                        } else {
                            (self.x + da, self.y + first_delta)
                        };
                        first_delta = 0.0;
                        let (x2, y2) = (x1 + dxb, y1 + dyb);
                        if is_vertical {
                            self.x = x2;
                            self.y = y2 + dc;
                        } else {
                            self.x = x2 + dc;
                            self.y = y2;
                        }
                        self.curve_to(x1, y1, x2, y2);
                        i += 4;
                    }
                    self.stack.clear();
                }
                // vhcurveto, hvcurveto
                30 | 31 => {
                    let count = self.stack.len();
                    let mut horizontal = b0 == 31;
                    let mut i = 0;
                    while i + 4 <= count {
                        let [a, b, c, d] = self.args(&cursor, i)?;
                        let last = if count - i == 5 { self.stack[i + 4] } else { 0.0 };
                        let (x1, y1, x2, y2);
                        if horizontal {
                            x1 = self.x + a;
                            y1 = self.y;
                            x2 = x1 + b;
                            y2 = y1 + c;
                            self.y = y2 + d;
                            self.x = x2 + last;
                        } else {
                            x1 = self.x;
                            y1 = self.y + a;
                            x2 = x1 + b;
                            y2 = y1 + c;
                            self.x = x2 + d;
                            self.y = y2 + last;
                        }
                        self.curve_to(x1, y1, x2, y2);
                        horizontal = !horizontal;
                        i += 4;
                    }
                    self.stack.clear();
                }
                // callsubr, callgsubr
                10 | 29 => {
                    let number = self.pop(&cursor)?;
                    #[allow(clippy::cast_possible_truncation)] // subroutine numbers are integers
                    let number = number as i32;
                    let subr = if b0 == 10 {
                        self.source.local_subr(number)
                    } else {
                        self.source.global_subr(number)
                    };
                    let subr = subr.ok_or_else(|| cursor.err(ParseErrorKind::InvalidSubr(number)))?;
                    if !self.evaluate(subr, depth + 1)? {
                        return Ok(false);
                    }
                }
                // return
                11 => return Ok(true),
                // endchar
                14 => {
                    let start = self.take_width(matches!(self.stack.len(), 1 | 5));
                    if self.stack.len() - start == 4 {
                        let [adx, ady, base, accent] = self.args(&cursor, start)?;
                        self.seac(&cursor, adx, ady, base, accent)?;
                    }
                    self.stack.clear();
                    return Ok(false);
                }
                12 => {
                    let b1 = cursor.read_u8()?;
                    self.escape(&mut cursor, b1)?;
                }
                _ => return Err(cursor.err(ParseErrorKind::InvalidOperator(b0.into()))),
            }
        }
        Ok(true)
    }

    fn stems(&mut self, start: usize, vertical: bool) {
        let mut edge = 0.0;
        let mut i = start;
        while i + 1 < self.stack.len() {
            edge += self.stack[i];
            let width = self.stack[i + 1];
            self.sink.stem(edge, width, vertical);
            edge += width;
            i += 2;
        }
        self.stem_count += (self.stack.len() - start) / 2;
        self.stack.clear();
    }

    fn rr_curve(&mut self, cursor: &Cursor<'_>, start: usize) -> Result<(), ParseError> {
        let [dx1, dy1, dx2, dy2, dx3, dy3] = self.args(cursor, start)?;
        let x1 = self.x + dx1;
        let y1 = self.y + dy1;
        let x2 = x1 + dx2;
        let y2 = y1 + dy2;
        self.x = x2 + dx3;
        self.y = y2 + dy3;
        self.curve_to(x1, y1, x2, y2);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // codes are small integers
    fn seac(
        &mut self,
        cursor: &Cursor<'_>,
        adx: f32,
        ady: f32,
        base: f32,
        accent: f32,
    ) -> Result<(), ParseError> {
        let seac = Seac {
            adx,
            ady,
            base: base as u8,
            accent: accent as u8,
        };
        self.sink.seac(&seac);

        let source = self.source;
        let component = |code: u8| {
            source
                .seac_component(code)
                .ok_or_else(|| cursor.err(ParseErrorKind::Missing("seac component")))
        };
        let base_charstring = component(seac.base)?;
        let accent_charstring = component(seac.accent)?;

        let widths = self.widths;
        let (ox, oy) = self.offset;
        Evaluator::new(source, widths, &mut *self.sink, (ox, oy), false).evaluate(base_charstring, 1)?;
        Evaluator::new(source, widths, &mut *self.sink, (ox + adx, oy + ady), false)
            .evaluate(accent_charstring, 1)?;
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn escape(&mut self, cursor: &mut Cursor<'_>, op: u8) -> Result<(), ParseError> {
        match op {
            // dotsection (deprecated, ignored)
            0 => {
                self.sink.generic_op(0x0c00, &[]);
                self.stack.clear();
            }
            // and, or
            3 | 4 => {
                let b = self.pop(cursor)? != 0.0;
                let a = self.pop(cursor)? != 0.0;
                let value = if op == 3 { a && b } else { a || b };
                self.push(cursor, if value { 1.0 } else { 0.0 })?;
            }
            // not
            5 => {
                let a = self.pop(cursor)?;
                self.push(cursor, if a == 0.0 { 1.0 } else { 0.0 })?;
            }
            // abs
            9 => {
                let a = self.pop(cursor)?;
                self.push(cursor, a.abs())?;
            }
            // add, sub, div, mul
            10 | 11 | 12 | 24 => {
                let b = self.pop(cursor)?;
                let a = self.pop(cursor)?;
                let value = match op {
                    10 => a + b,
                    11 => a - b,
                    12 if b != 0.0 => a / b,
                    12 => 0.0,
                    _ => a * b,
                };
                self.push(cursor, value)?;
            }
            // neg
            14 => {
                let a = self.pop(cursor)?;
                self.push(cursor, -a)?;
            }
            // eq
            15 => {
                let b = self.pop(cursor)?;
                let a = self.pop(cursor)?;
                self.push(cursor, if (a - b).abs() < f32::EPSILON { 1.0 } else { 0.0 })?;
            }
            // drop
            18 => {
                self.pop(cursor)?;
            }
            // put, get
            20 | 21 => {
                let index = self.pop(cursor)?;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let index = index as usize;
                if index >= TRANSIENT_LEN {
                    return Err(cursor.err(ParseErrorKind::InvalidOperator(0x0c00 | u16::from(op))));
                }
                if op == 20 {
                    self.transient[index] = self.pop(cursor)?;
                } else {
                    let value = self.transient[index];
                    self.push(cursor, value)?;
                }
            }
            // ifelse
            22 => {
                let v2 = self.pop(cursor)?;
                let v1 = self.pop(cursor)?;
                let s2 = self.pop(cursor)?;
                let s1 = self.pop(cursor)?;
                self.push(cursor, if v1 <= v2 { s1 } else { s2 })?;
            }
            // random: a deterministic value in (0, 1]
            23 => self.push(cursor, 0.5)?,
            // sqrt
            26 => {
                let a = self.pop(cursor)?;
                self.push(cursor, a.max(0.0).sqrt())?;
            }
            // dup
            27 => {
                let a = self.pop(cursor)?;
                self.push(cursor, a)?;
                self.push(cursor, a)?;
            }
            // exch
            28 => {
                let b = self.pop(cursor)?;
                let a = self.pop(cursor)?;
                self.push(cursor, b)?;
                self.push(cursor, a)?;
            }
            // index
            29 => {
                let index = self.pop(cursor)?;
                let len = self.stack.len();
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let index = if index < 0.0 { 0 } else { index as usize };
                if index >= len {
                    return Err(cursor.err(ParseErrorKind::StackUnderflow));
                }
                let value = self.stack[len - 1 - index];
                self.push(cursor, value)?;
            }
            // roll
            30 => {
                let shift = self.pop(cursor)?;
                let count = self.pop(cursor)?;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let count = count as usize;
                let len = self.stack.len();
                if count > len {
                    return Err(cursor.err(ParseErrorKind::StackUnderflow));
                }
                if count > 0 {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let shift = (shift as i32).rem_euclid(count as i32) as usize;
                    self.stack[len - count..].rotate_right(shift);
                }
            }
            // hflex
            34 => {
                let [dx1, dx2, dy2, dx3, dx4, dx5, dx6] = self.args(cursor, 0)?;
                let y0 = self.y;
                let x1 = self.x + dx1;
                let x2 = x1 + dx2;
                let y2 = y0 + dy2;
                let x3 = x2 + dx3;
                let x4 = x3 + dx4;
                let x5 = x4 + dx5;
                self.x = x5 + dx6;
                self.flex(50.0, [x1, y0, x2, y2, x3, y2, x4, y2, x5, y0]);
                self.stack.clear();
            }
            // flex
            35 => {
                let args: [f32; 13] = self.args(cursor, 0)?;
                let mut points = [0.0; 10];
                let (mut x, mut y) = (self.x, self.y);
                for (i, point) in points.chunks_exact_mut(2).enumerate() {
                    x += args[2 * i];
                    y += args[2 * i + 1];
                    point[0] = x;
                    point[1] = y;
                }
                self.x = x + args[10];
                self.y = y + args[11];
                self.flex(args[12], points);
                self.stack.clear();
            }
            // hflex1
            36 => {
                let [dx1, dy1, dx2, dy2, dx3, dx4, dx5, dy5, dx6] = self.args(cursor, 0)?;
                let y0 = self.y;
                let x1 = self.x + dx1;
                let y1 = y0 + dy1;
                let x2 = x1 + dx2;
                let y2 = y1 + dy2;
                let x3 = x2 + dx3;
                let x4 = x3 + dx4;
                let x5 = x4 + dx5;
                let y5 = y2 + dy5;
                self.x = x5 + dx6;
                self.flex(50.0, [x1, y1, x2, y2, x3, y2, x4, y2, x5, y5]);
                self.stack.clear();
            }
            // flex1
            37 => {
                let args: [f32; 11] = self.args(cursor, 0)?;
                let mut points = [0.0; 10];
                let (mut x, mut y) = (self.x, self.y);
                for (i, point) in points.chunks_exact_mut(2).enumerate() {
                    x += args[2 * i];
                    y += args[2 * i + 1];
                    point[0] = x;
                    point[1] = y;
                }
                if (x - self.x).abs() > (y - self.y).abs() {
                    self.x = x + args[10];
                } else {
                    self.y = y + args[10];
                }
                self.flex(50.0, points);
                self.stack.clear();
            }
            _ => {
                return Err(cursor.err(ParseErrorKind::InvalidOperator(0x0c00 | u16::from(op))));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{GlyphAction, GlyphInfo, PathOp, RecordingSink};

    #[derive(Debug, Default)]
    struct TestSource {
        global_subrs: Vec<Vec<u8>>,
        components: Vec<(u8, Vec<u8>)>,
    }

    impl CharstringSource for TestSource {
        fn global_subr(&self, number: i32) -> Option<&[u8]> {
            let index = usize::try_from(number + subr_bias(self.global_subrs.len())).ok()?;
            self.global_subrs.get(index).map(Vec::as_slice)
        }

        fn local_subr(&self, _number: i32) -> Option<&[u8]> {
            None
        }

        fn seac_component(&self, code: u8) -> Option<&[u8]> {
            self.components
                .iter()
                .find_map(|(c, charstring)| (*c == code).then_some(charstring.as_slice()))
        }
    }

    const WIDTHS: Widths = Widths {
        default: 500.0,
        nominal: 600.0,
    };

    fn run(charstring: &[u8], source: &TestSource) -> crate::glyph::RecordedGlyph {
        let mut sink = RecordingSink::default();
        let info = GlyphInfo {
            tag: 0,
            name: None,
            cid: None,
            fd: 0,
        };
        assert_eq!(sink.begin(&info).unwrap(), GlyphAction::Parse);
        evaluate(charstring, source, WIDTHS, &mut sink).unwrap();
        sink.glyphs.pop().unwrap()
    }

    fn num(value: i16) -> u8 {
        u8::try_from(value + 139).unwrap()
    }

    #[test]
    fn triangle_with_width() {
        // 50 10 20 rmoveto 100 0 rlineto -50 80 rlineto endchar
        let charstring = [num(50), num(10), num(20), 21, num(100), num(0), 5, num(-50), num(80), 5, 14];
        let glyph = run(&charstring, &TestSource::default());
        assert_eq!(glyph.width, Some(650.0));
        assert_eq!(
            glyph.path,
            [PathOp::Move(10.0, 20.0), PathOp::Line(110.0, 20.0), PathOp::Line(60.0, 100.0)]
        );
    }

    #[test]
    fn default_width_and_empty_glyph() {
        let glyph = run(&[14], &TestSource::default());
        assert_eq!(glyph.width, Some(500.0));
        assert!(glyph.path.is_empty());
    }

    #[test]
    fn hv_curves_alternate() {
        // 0 0 rmoveto 10 20 30 40 hvcurveto endchar
        let charstring = [num(0), num(0), 21, num(10), num(20), num(30), num(40), 31, 14];
        let glyph = run(&charstring, &TestSource::default());
        assert_eq!(glyph.path[1], PathOp::Curve([10.0, 0.0, 30.0, 30.0, 30.0, 70.0]));

        // vhcurveto with a trailing argument
        let charstring = [num(0), num(0), 21, num(10), num(20), num(30), num(40), num(5), 30, 14];
        let glyph = run(&charstring, &TestSource::default());
        assert_eq!(glyph.path[1], PathOp::Curve([0.0, 10.0, 20.0, 40.0, 60.0, 45.0]));
    }

    #[test]
    fn global_subroutines() {
        let source = TestSource {
            global_subrs: vec![vec![num(100), num(0), 5, 11]],
            ..TestSource::default()
        };
        // 0 0 rmoveto -107 callgsubr endchar
        let charstring = [num(0), num(0), 21, num(-107), 29, 14];
        let glyph = run(&charstring, &source);
        assert_eq!(glyph.path, [PathOp::Move(0.0, 0.0), PathOp::Line(100.0, 0.0)]);
    }

    #[test]
    fn endchar_seac_is_flattened() {
        let source = TestSource {
            components: vec![
                (b'A', vec![num(0), num(0), 21, num(100), num(0), 5, 14]),
                (0xc1, vec![num(-5), num(10), num(10), 21, num(0), num(10), 5, 14]),
            ],
            ..TestSource::default()
        };
        // 20 100 65 193 endchar
        let charstring = [num(20), num(100), num(65), 247, 85, 14];
        let glyph = run(&charstring, &source);
        assert_eq!(glyph.width, Some(500.0));
        assert_eq!(
            glyph.seac,
            Some(Seac {
                adx: 20.0,
                ady: 100.0,
                base: b'A',
                accent: 0xc1,
            })
        );
        assert_eq!(
            glyph.path,
            [
                PathOp::Move(0.0, 0.0),
                PathOp::Line(100.0, 0.0),
                PathOp::Move(30.0, 110.0),
                PathOp::Line(30.0, 120.0),
            ]
        );
    }

    #[test]
    fn arithmetic_operators() {
        // 10 20 add 5 sub 0 rmoveto
        let charstring = [num(10), num(20), 12, 10, num(5), 12, 11, num(0), 21, 14];
        let glyph = run(&charstring, &TestSource::default());
        assert_eq!(glyph.path, [PathOp::Move(25.0, 0.0)]);
    }

    #[test]
    fn stack_underflow_is_reported() {
        let mut sink = RecordingSink::default();
        let info = GlyphInfo {
            tag: 0,
            name: None,
            cid: None,
            fd: 0,
        };
        sink.begin(&info).unwrap();
        let err = evaluate(&[5, 21], &TestSource::default(), WIDTHS, &mut sink).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::StackUnderflow));
    }
}
