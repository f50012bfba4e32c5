//! Kerning `GPOS` table synthesis.

use crate::{
    errors::{EmbedError, ErrorKind},
    spec::KernPair,
    subset::GlyphTable,
    write::{patch_u16, write_i16, write_u16, write_u32},
};

/// Kerning pair in terms of output GIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GidPair {
    pub(crate) first: u16,
    pub(crate) second: u16,
    pub(crate) value: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RangeRecord {
    pub(crate) start: u16,
    pub(crate) end: u16,
    pub(crate) start_coverage_index: u16,
}

/// Coverage table in the smaller of the two formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Coverage {
    /// Format 1: sorted glyph array.
    Glyphs(Vec<u16>),
    /// Format 2: glyph ranges.
    Ranges(Vec<RangeRecord>),
}

impl Coverage {
    /// Creates a coverage table for sorted, unique glyphs.
    pub(crate) fn new(glyphs: &[u16]) -> Self {
        let mut ranges: Vec<RangeRecord> = vec![];
        for (i, &glyph) in glyphs.iter().enumerate() {
            match ranges.last_mut() {
                Some(range) if u32::from(range.end) + 1 == u32::from(glyph) => range.end = glyph,
                _ => ranges.push(RangeRecord {
                    start: glyph,
                    end: glyph,
                    // Truncation is caught by the offset checks when writing the table
                    start_coverage_index: u16::try_from(i).unwrap_or(u16::MAX),
                }),
            }
        }

        let format1_len = 4 + 2 * glyphs.len();
        let format2_len = 4 + 6 * ranges.len();
        if format2_len < format1_len {
            Self::Ranges(ranges)
        } else {
            Self::Glyphs(glyphs.to_vec())
        }
    }

    pub(crate) fn format(&self) -> u16 {
        match self {
            Self::Glyphs(_) => 1,
            Self::Ranges(_) => 2,
        }
    }

    pub(crate) fn byte_len(&self) -> usize {
        match self {
            Self::Glyphs(glyphs) => 4 + 2 * glyphs.len(),
            Self::Ranges(ranges) => 4 + 6 * ranges.len(),
        }
    }

    fn write(&self, writer: &mut Vec<u8>) -> Result<(), EmbedError> {
        write_u16(writer, self.format());
        match self {
            Self::Glyphs(glyphs) => {
                write_u16(writer, checked_u16(glyphs.len())?);
                for &glyph in glyphs {
                    write_u16(writer, glyph);
                }
            }
            Self::Ranges(ranges) => {
                write_u16(writer, checked_u16(ranges.len())?);
                for range in ranges {
                    write_u16(writer, range.start);
                    write_u16(writer, range.end);
                    write_u16(writer, range.start_coverage_index);
                }
            }
        }
        Ok(())
    }
}

fn checked_u16(value: usize) -> Result<u16, EmbedError> {
    u16::try_from(value)
        .map_err(|_| EmbedError::new(ErrorKind::SfntWrite, "GPOS table offset overflow"))
}

/// Normalizes kerning pairs and builds the `GPOS` table. The pair accumulator is reused
/// across calls.
#[derive(Debug, Default)]
pub(crate) struct KernBuilder {
    pairs: Vec<GidPair>,
}

impl KernBuilder {
    /// Offset of the `PairPos` subtable from the start of the table.
    const PAIR_POS_OFFSET: usize = 56;
    const VALUE_FORMAT_X_ADVANCE: u16 = 0x0004;

    /// Remaps `pairs` to GIDs, sorts them and drops duplicates so that the pair with
    /// the smallest magnitude (negative on ties) survives.
    pub(crate) fn normalize(
        &mut self,
        pairs: &[KernPair],
        glyphs: &GlyphTable,
    ) -> Result<&[GidPair], EmbedError> {
        self.pairs.clear();
        for pair in pairs {
            let resolve = |id: u16| {
                glyphs.gid(id).ok_or_else(|| {
                    EmbedError::bad_spec(format_args!("kerning pair references glyph {id} not in subset"))
                })
            };
            self.pairs.push(GidPair {
                first: resolve(pair.first)?,
                second: resolve(pair.second)?,
                value: pair.value,
            });
        }

        self.pairs
            .sort_unstable_by_key(|pair| (pair.first, pair.second, pair.value.unsigned_abs(), pair.value));
        self.pairs.dedup_by_key(|pair| (pair.first, pair.second));
        log::debug!("kerning: {} unique pairs of {}", self.pairs.len(), pairs.len());
        Ok(&self.pairs)
    }

    pub(crate) fn pairs(&self) -> &[GidPair] {
        &self.pairs
    }

    /// Builds the `GPOS` table from normalized pairs. Returns `None` if there are no pairs.
    pub(crate) fn build_gpos(&self) -> Result<Option<Vec<u8>>, EmbedError> {
        if self.pairs.is_empty() {
            return Ok(None);
        }

        let mut writer = vec![];
        write_u32(&mut writer, 0x0001_0000); // version
        write_u16(&mut writer, 10); // scriptList offset
        write_u16(&mut writer, 30); // featureList offset
        write_u16(&mut writer, 44); // lookupList offset

        // ScriptList
        write_u16(&mut writer, 1); // scriptCount
        writer.extend_from_slice(b"DFLT");
        write_u16(&mut writer, 8); // script offset
        write_u16(&mut writer, 4); // defaultLangSys offset
        write_u16(&mut writer, 0); // langSysCount
        write_u16(&mut writer, 0); // lookupOrder
        write_u16(&mut writer, 0xffff); // requiredFeatureIndex
        write_u16(&mut writer, 1); // featureIndexCount
        write_u16(&mut writer, 0); // featureIndices[0]
        debug_assert_eq!(writer.len(), 30);

        // FeatureList
        write_u16(&mut writer, 1); // featureCount
        writer.extend_from_slice(b"kern");
        write_u16(&mut writer, 8); // feature offset
        write_u16(&mut writer, 0); // featureParams
        write_u16(&mut writer, 1); // lookupIndexCount
        write_u16(&mut writer, 0); // lookupListIndices[0]
        debug_assert_eq!(writer.len(), 44);

        // LookupList
        write_u16(&mut writer, 1); // lookupCount
        write_u16(&mut writer, 4); // lookup offset
        write_u16(&mut writer, 2); // lookupType: pair adjustment
        write_u16(&mut writer, 0); // lookupFlag
        write_u16(&mut writer, 1); // subTableCount
        write_u16(&mut writer, 8); // subtable offset
        debug_assert_eq!(writer.len(), Self::PAIR_POS_OFFSET);

        self.write_pair_pos(&mut writer)?;
        log::debug!("GPOS table: {} bytes", writer.len());
        Ok(Some(writer))
    }

    fn write_pair_pos(&self, writer: &mut Vec<u8>) -> Result<(), EmbedError> {
        let mut firsts: Vec<u16> = self.pairs.iter().map(|pair| pair.first).collect();
        firsts.dedup();
        let coverage = Coverage::new(&firsts);

        let start = writer.len();
        write_u16(writer, 1); // posFormat
        write_u16(writer, 0); // coverage offset, patched below
        write_u16(writer, Self::VALUE_FORMAT_X_ADVANCE);
        write_u16(writer, 0); // valueFormat2
        write_u16(writer, checked_u16(firsts.len())?);
        let offsets_start = writer.len();
        for _ in &firsts {
            write_u16(writer, 0); // pairSet offset, patched below
        }

        for (i, pair_set) in self.pairs.chunk_by(|a, b| a.first == b.first).enumerate() {
            let offset = checked_u16(writer.len() - start)?;
            patch_u16(writer, offsets_start + 2 * i, offset);
            write_u16(writer, checked_u16(pair_set.len())?);
            for pair in pair_set {
                write_u16(writer, pair.second);
                write_i16(writer, pair.value);
            }
        }

        let coverage_offset = checked_u16(writer.len() - start)?;
        patch_u16(writer, start + 2, coverage_offset);
        coverage.write(writer)?;
        checked_u16(writer.len() - start)?;
        Ok(())
    }
}
