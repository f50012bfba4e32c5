//! Type 1 charstring interpretation, including flex, hint replacement, `seac`
//! and multiple master blending via `OtherSubrs`.

use crate::{
    errors::{ParseError, ParseErrorKind},
    font::Cursor,
    glyph::{GlyphSink, Seac},
};

const NESTING_DEPTH_LIMIT: u32 = 10;
/// Multiple master blends may push up to 6 values per master, with up to 16 masters.
const MAX_STACK_LEN: usize = 128;
const FLEX_POINT_COUNT: usize = 7;

/// Charstring data available to the interpreter.
pub(super) trait Type1Source {
    fn subr(&self, index: usize) -> Option<&[u8]>;
    /// Gets the charstring of a `seac` component by its StandardEncoding code.
    fn seac_component(&self, code: u8) -> Option<&[u8]>;
    /// Multiple master weight vector; empty for regular fonts.
    fn weights(&self) -> &[f32];
}

/// Evaluates a decrypted Type 1 charstring, delivering its outline to `sink`.
pub(super) fn evaluate(
    charstring: &[u8],
    source: &dyn Type1Source,
    sink: &mut dyn GlyphSink,
) -> Result<(), ParseError> {
    let mut interpreter = Interpreter::new(source, sink, (0.0, 0.0), true);
    interpreter.evaluate(charstring, 0)?;
    if !interpreter.have_width {
        // No `hsbw` / `sbw`; report zero width so that sinks get a complete glyph
        interpreter.sink.width(0.0);
    }
    Ok(())
}

struct Interpreter<'a, 's> {
    source: &'a dyn Type1Source,
    sink: &'s mut dyn GlyphSink,
    offset: (f32, f32),
    emit_width: bool,
    have_width: bool,
    sbx: f32,
    sby: f32,
    x: f32,
    y: f32,
    stack: Vec<f32>,
    /// PostScript operand stack used to pass `OtherSubrs` results back.
    ps_stack: Vec<f32>,
    flex_points: Option<Vec<(f32, f32)>>,
}

impl<'a, 's> Interpreter<'a, 's> {
    fn new(
        source: &'a dyn Type1Source,
        sink: &'s mut dyn GlyphSink,
        offset: (f32, f32),
        emit_width: bool,
    ) -> Self {
        Self {
            source,
            sink,
            offset,
            emit_width,
            have_width: false,
            sbx: 0.0,
            sby: 0.0,
            x: 0.0,
            y: 0.0,
            stack: Vec::with_capacity(24),
            ps_stack: vec![],
            flex_points: None,
        }
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

    /// Takes `N` bottom-most stack values and clears the stack.
    fn take<const N: usize>(&mut self, cursor: &Cursor<'_>) -> Result<[f32; N], ParseError> {
        let args = self
            .stack
            .get(..N)
            .and_then(|args| <[f32; N]>::try_from(args).ok())
            .ok_or_else(|| cursor.err(ParseErrorKind::StackUnderflow))?;
        self.stack.clear();
        Ok(args)
    }

    fn move_to(&mut self) {
        if let Some(points) = &mut self.flex_points {
            points.push((self.x, self.y));
        } else {
            self.sink
                .move_to(self.x + self.offset.0, self.y + self.offset.1);
        }
    }

    fn line_to(&mut self) {
        self.sink
            .line_to(self.x + self.offset.0, self.y + self.offset.1);
    }

    fn curve_to(&mut self, d: [f32; 6]) {
        let x1 = self.x + d[0];
        let y1 = self.y + d[1];
        let x2 = x1 + d[2];
        let y2 = y1 + d[3];
        self.x = x2 + d[4];
        self.y = y2 + d[5];
        let (ox, oy) = self.offset;
        self.sink
            .curve_to(x1 + ox, y1 + oy, x2 + ox, y2 + oy, self.x + ox, self.y + oy);
    }

    fn set_width(&mut self, sbx: f32, sby: f32, width: f32) {
        self.sbx = sbx;
        self.sby = sby;
        self.x = sbx;
        self.y = sby;
        if !self.have_width {
            self.have_width = true;
            if self.emit_width {
                self.sink.width(width);
            }
        }
    }

    /// Returns `Ok(false)` if the charstring is finished (`endchar` or `seac`).
    fn evaluate(&mut self, charstring: &[u8], depth: u32) -> Result<bool, ParseError> {
        if depth > NESTING_DEPTH_LIMIT {
            return Err(ParseError::new(ParseErrorKind::NestingTooDeep, 0));
        }

        let mut cursor = Cursor::new(charstring);
        while !cursor.is_empty() {
            let b0 = cursor.read_u8()?;
            match b0 {
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
                    #[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
                    let value = cursor.read_u32()? as i32 as f32;
                    self.push(&cursor, value)?;
                }
                // hstem, vstem
                1 | 3 => {
                    let [edge, width] = self.take(&cursor)?;
                    if b0 == 1 {
                        self.sink.stem(edge + self.sby, width, false);
                    } else {
                        self.sink.stem(edge + self.sbx, width, true);
                    }
                }
                // vmoveto
                4 => {
                    let [dy] = self.take(&cursor)?;
                    self.y += dy;
                    self.move_to();
                }
                // rlineto
                5 => {
                    let [dx, dy] = self.take(&cursor)?;
                    self.x += dx;
                    self.y += dy;
                    self.line_to();
                }
                // hlineto
                6 => {
                    let [dx] = self.take(&cursor)?;
                    self.x += dx;
                    self.line_to();
                }
                // vlineto
                7 => {
                    let [dy] = self.take(&cursor)?;
                    self.y += dy;
                    self.line_to();
                }
                // rrcurveto
                8 => {
                    let args = self.take::<6>(&cursor)?;
                    self.curve_to(args);
                }
                // closepath
                9 => {
                    self.stack.clear();
                    self.sink.generic_op(9, &[]);
                }
                // callsubr
                10 => {
                    let index = self.pop(&cursor)?;
                    #[allow(clippy::cast_possible_truncation)] // subr indices are integers
                    let index = index as i32;
                    let subr = usize::try_from(index)
                        .ok()
                        .and_then(|idx| self.source.subr(idx))
                        .ok_or_else(|| cursor.err(ParseErrorKind::InvalidSubr(index)))?;
                    if !self.evaluate(subr, depth + 1)? {
                        return Ok(false);
                    }
                }
                // return
                11 => return Ok(true),
                // hsbw
                13 => {
                    let [sbx, width] = self.take(&cursor)?;
                    self.set_width(sbx, 0.0, width);
                }
                // endchar
                14 => {
                    self.stack.clear();
                    return Ok(false);
                }
                // rmoveto
                21 => {
                    let [dx, dy] = self.take(&cursor)?;
                    self.x += dx;
                    self.y += dy;
                    self.move_to();
                }
                // hmoveto
                22 => {
                    let [dx] = self.take(&cursor)?;
                    self.x += dx;
                    self.move_to();
                }
                // vhcurveto
                30 => {
                    let [dy1, dx2, dy2, dx3] = self.take(&cursor)?;
                    self.curve_to([0.0, dy1, dx2, dy2, dx3, 0.0]);
                }
                // hvcurveto
                31 => {
                    let [dx1, dx2, dy2, dy3] = self.take(&cursor)?;
                    self.curve_to([dx1, 0.0, dx2, dy2, 0.0, dy3]);
                }
                12 => {
                    let b1 = cursor.read_u8()?;
                    if !self.escape(&mut cursor, b1, depth)? {
                        return Ok(false);
                    }
                }
                _ => return Err(cursor.err(ParseErrorKind::InvalidOperator(b0.into()))),
            }
        }
        Ok(true)
    }

    fn escape(&mut self, cursor: &mut Cursor<'_>, op: u8, depth: u32) -> Result<bool, ParseError> {
        match op {
            // dotsection
            0 => {
                self.stack.clear();
                self.sink.generic_op(0x0c00, &[]);
            }
            // vstem3, hstem3
            1 | 2 => {
                let args = self.take::<6>(cursor)?;
                let vertical = op == 1;
                let base = if vertical { self.sbx } else { self.sby };
                for pair in args.chunks_exact(2) {
                    self.sink.stem(pair[0] + base, pair[1], vertical);
                }
            }
            // seac
            6 => {
                let [asb, adx, ady, base, accent] = self.take(cursor)?;
                self.seac(cursor, asb, adx, ady, base, accent, depth)?;
                return Ok(false);
            }
            // sbw
            7 => {
                let [sbx, sby, width, _height] = self.take(cursor)?;
                self.set_width(sbx, sby, width);
            }
            // div
            12 => {
                let b = self.pop(cursor)?;
                let a = self.pop(cursor)?;
                self.push(cursor, if b == 0.0 { 0.0 } else { a / b })?;
            }
            // callothersubr
            16 => self.call_other_subr(cursor)?,
            // pop
            17 => {
                let value = self
                    .ps_stack
                    .pop()
                    .ok_or_else(|| cursor.err(ParseErrorKind::StackUnderflow))?;
                self.push(cursor, value)?;
            }
            // setcurrentpoint
            33 => {
                let [x, y] = self.take(cursor)?;
                self.x = x;
                self.y = y;
            }
            _ => {
                return Err(cursor.err(ParseErrorKind::InvalidOperator(0x0c00 | u16::from(op))));
            }
        }
        Ok(true)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // counts are small integers
    fn call_other_subr(&mut self, cursor: &Cursor<'_>) -> Result<(), ParseError> {
        let number = self.pop(cursor)? as i32;
        let arg_count = self.pop(cursor)?.max(0.0) as usize;
        if arg_count > self.stack.len() {
            return Err(cursor.err(ParseErrorKind::StackUnderflow));
        }
        let args = self.stack.split_off(self.stack.len() - arg_count);

        match number {
            // End flex
            0 => {
                let points = self
                    .flex_points
                    .take()
                    .filter(|points| points.len() >= FLEX_POINT_COUNT)
                    .ok_or_else(|| cursor.err(ParseErrorKind::Missing("flex points")))?;
                let depth = args.first().copied().unwrap_or(50.0);
                let (ox, oy) = self.offset;
                let p = |i: usize| (points[i].0 + ox, points[i].1 + oy);
                let (x1, y1) = p(1);
                let (x2, y2) = p(2);
                let (x3, y3) = p(3);
                let (x4, y4) = p(4);
                let (x5, y5) = p(5);
                let (x6, y6) = p(6);
                self.sink
                    .flex(depth, &[[x1, y1, x2, y2, x3, y3], [x4, y4, x5, y5, x6, y6]]);
                (self.x, self.y) = points[6];
                // Picked up by `pop pop setcurrentpoint`
                self.ps_stack.push(self.y);
                self.ps_stack.push(self.x);
            }
            // Start flex
            1 => self.flex_points = Some(Vec::with_capacity(FLEX_POINT_COUNT)),
            // Flex point; recorded by the preceding `rmoveto`
            2 => {}
            // Hint replacement: the subr number is passed back to be called
            3 => {
                self.sink.generic_op(0x0c10, &args);
                self.ps_stack.extend(args.iter().rev());
            }
            // Multiple master blends of 1, 2, 3, 4 and 6 values
            14..=18 => {
                let value_count = [1, 2, 3, 4, 6][(number - 14) as usize];
                let blended = blend(self.source.weights(), &args, value_count)
                    .ok_or_else(|| cursor.err(ParseErrorKind::StackUnderflow))?;
                self.ps_stack.extend(blended.iter().rev());
            }
            _ => {
                self.sink.generic_op(0x0c10, &args);
                self.ps_stack.extend(args.iter().rev());
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn seac(
        &mut self,
        cursor: &Cursor<'_>,
        asb: f32,
        adx: f32,
        ady: f32,
        base: f32,
        accent: f32,
        depth: u32,
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

        let (ox, oy) = self.offset;
        Interpreter::new(source, &mut *self.sink, (ox, oy), false).evaluate(base_charstring, depth + 1)?;
        let accent_offset = (ox + adx - asb, oy + ady);
        Interpreter::new(source, &mut *self.sink, accent_offset, false)
            .evaluate(accent_charstring, depth + 1)?;
        Ok(())
    }
}

/// Blends `value_count` values from master deltas. `args` contains base values followed
/// by deltas for each of the remaining masters.
fn blend(weights: &[f32], args: &[f32], value_count: usize) -> Option<Vec<f32>> {
    let master_count = weights.len().max(1);
    if args.len() != value_count * master_count {
        return None;
    }
    let (base, deltas) = args.split_at(value_count);
    Some(
        base.iter()
            .enumerate()
            .map(|(i, &value)| {
                let delta: f32 = deltas
                    .chunks_exact(value_count)
                    .zip(weights.iter().skip(1))
                    .map(|(chunk, &weight)| chunk[i] * weight)
                    .sum();
                value + delta
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{GlyphAction, GlyphInfo, PathOp, RecordedGlyph, RecordingSink};

    #[derive(Debug, Default)]
    struct TestSource {
        subrs: Vec<Vec<u8>>,
        components: Vec<(u8, Vec<u8>)>,
        weights: Vec<f32>,
    }

    impl Type1Source for TestSource {
        fn subr(&self, index: usize) -> Option<&[u8]> {
            self.subrs.get(index).map(Vec::as_slice)
        }

        fn seac_component(&self, code: u8) -> Option<&[u8]> {
            self.components
                .iter()
                .find_map(|(c, charstring)| (*c == code).then_some(charstring.as_slice()))
        }

        fn weights(&self) -> &[f32] {
            &self.weights
        }
    }

    fn num(value: i16) -> u8 {
        u8::try_from(value + 139).unwrap()
    }

    fn run(charstring: &[u8], source: &TestSource) -> RecordedGlyph {
        let mut sink = RecordingSink::default();
        let info = GlyphInfo {
            tag: 0,
            name: Some("test"),
            cid: None,
            fd: 0,
        };
        assert_eq!(sink.begin(&info).unwrap(), GlyphAction::Parse);
        evaluate(charstring, source, &mut sink).unwrap();
        sink.glyphs.pop().unwrap()
    }

    #[test]
    fn square_with_sidebearing() {
        // 20 500 hsbw 0 0 rmoveto 100 hlineto 100 vlineto -100 hlineto closepath endchar
        let charstring = [
            num(20), 248, 136, 13, // 500
            num(0), num(0), 21,
            num(100), 6,
            num(100), 7,
            num(-100), 6,
            9, 14,
        ];
        let glyph = run(&charstring, &TestSource::default());
        assert_eq!(glyph.width, Some(500.0));
        assert_eq!(
            glyph.path,
            [
                PathOp::Move(20.0, 0.0),
                PathOp::Line(120.0, 0.0),
                PathOp::Line(120.0, 100.0),
                PathOp::Line(20.0, 100.0),
            ]
        );
    }

    #[test]
    fn flex_is_flattened() {
        let mut charstring = vec![num(0), num(100), 13, num(0), num(0), 21];
        // 1 callothersubr
        charstring.extend([num(0), num(1), 12, 16]);
        // Reference point and 6 curve points, each followed by `2 callothersubr`
        for (dx, dy) in [(50, 0), (-40, 0), (10, 10), (30, 0), (20, 0), (10, -10), (30, 0)] {
            charstring.extend([num(dx), num(dy), 21, num(0), num(2), 12, 16]);
        }
        // 50 100 0 3 0 callothersubr pop pop setcurrentpoint
        charstring.extend([num(50), num(100), num(0), num(3), num(0), 12, 16, 12, 17, 12, 17, 12, 33]);
        charstring.extend([num(10), num(0), 5, 14]);

        let glyph = run(&charstring, &TestSource::default());
        assert_eq!(
            glyph.path,
            [
                PathOp::Move(0.0, 0.0),
                PathOp::Curve([10.0, 0.0, 20.0, 10.0, 50.0, 10.0]),
                PathOp::Curve([70.0, 10.0, 80.0, 0.0, 110.0, 0.0]),
                PathOp::Line(120.0, 0.0),
            ]
        );
    }

    #[test]
    fn hint_replacement_calls_subroutine() {
        let source = TestSource {
            subrs: vec![vec![11], vec![11], vec![11], vec![11], vec![num(10), num(20), 1, 11]],
            ..TestSource::default()
        };
        // 0 100 hsbw 4 1 3 callothersubr pop callsubr 0 0 rmoveto endchar
        let charstring = [
            num(0), num(100), 13,
            num(4), num(1), num(3), 12, 16, 12, 17, 10,
            num(0), num(0), 21, 14,
        ];
        let glyph = run(&charstring, &source);
        assert_eq!(glyph.path, [PathOp::Move(0.0, 0.0)]);
    }

    #[test]
    fn multiple_master_blend() {
        let source = TestSource {
            weights: vec![0.25, 0.75],
            ..TestSource::default()
        };
        // 0 100 hsbw 10 40 (base, delta) 2 14 callothersubr pop 0 rmoveto endchar
        let charstring = [
            num(0), num(100), 13,
            num(10), num(40), num(2), num(14), 12, 16, 12, 17, num(0), 21, 14,
        ];
        let glyph = run(&charstring, &source);
        assert_eq!(glyph.path, [PathOp::Move(40.0, 0.0)]);

        assert_eq!(blend(&[0.5, 0.5], &[1.0, 2.0, 10.0, 20.0], 2).unwrap(), [6.0, 12.0]);
        assert!(blend(&[0.5, 0.5], &[1.0, 2.0, 10.0], 2).is_none());
    }

    #[test]
    fn seac_composes_components() {
        let source = TestSource {
            components: vec![
                (b'A', vec![num(10), num(100), 13, num(0), num(0), 21, num(50), 6, 14]),
                (0xc1, vec![num(5), num(30), 13, num(0), num(0), 21, num(10), 7, 14]),
            ],
            ..TestSource::default()
        };
        // 10 600 hsbw 5 30 100 65 193 seac
        let charstring = [
            num(10), 248, 236, 13, // 600
            num(5), num(30), num(100), num(65), 247, 85, 12, 6,
        ];
        let glyph = run(&charstring, &source);
        assert_eq!(glyph.width, Some(600.0));
        assert_eq!(glyph.seac.unwrap().accent, 0xc1);
        assert_eq!(
            glyph.path,
            [
                PathOp::Move(10.0, 0.0),
                PathOp::Line(60.0, 0.0),
                PathOp::Move(30.0, 100.0),
                PathOp::Line(30.0, 110.0),
            ]
        );
    }

    #[test]
    fn invalid_subr_is_reported() {
        let mut sink = RecordingSink::default();
        let info = GlyphInfo {
            tag: 0,
            name: None,
            cid: None,
            fd: 0,
        };
        sink.begin(&info).unwrap();
        let err = evaluate(&[num(0), num(0), 13, num(7), 10], &TestSource::default(), &mut sink).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidSubr(7)));
    }
}
