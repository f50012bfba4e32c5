//! `cmap` table synthesis.

use crate::{
    errors::{EmbedError, ErrorKind},
    write::{search_params, write_u16, write_u32},
};

const UNICODE_PLATFORM: u16 = 0;
const UNICODE_BMP_ENCODING: u16 = 3;
const UNICODE_FULL_ENCODING: u16 = 4;
/// Runs are merged into a single explicit segment while the merged length stays below this value.
const MERGE_THRESHOLD: usize = 4;
/// Code covered by the final format 4 segment; it cannot be mapped by the client.
const LAST_BMP_CODE: u32 = 0xffff;

/// Mapping of a single code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    code: u32,
    glyph_id: u16,
}

/// Span of consecutive entries in the sorted mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    len: usize,
    /// Whether `glyph_id - code` is constant within the span.
    ordered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SegmentWithDelta {
    pub(crate) start_code: u16,
    pub(crate) end_code: u16,
    pub(crate) id_delta: u16,
    /// Index into `glyph_id_array` for explicit segments.
    pub(crate) array_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SequentialMapGroup {
    pub(crate) start_char_code: u32,
    pub(crate) end_char_code: u32,
    pub(crate) start_glyph_id: u32,
}

/// Synthesized `cmap` table: a format 4 subtable and, if there are codes beyond the BMP
/// or the BMP mapping does not fit into format 4, a format 12 subtable.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CmapTable {
    pub(crate) segments: Vec<SegmentWithDelta>,
    pub(crate) glyph_id_array: Vec<u16>,
    pub(crate) groups: Vec<SequentialMapGroup>,
}

/// Builds [`CmapTable`]s. The mapping accumulator is reused across calls.
#[derive(Debug, Default)]
pub(crate) struct CmapBuilder {
    mapping: Vec<Mapping>,
    spans: Vec<Span>,
}

impl CmapBuilder {
    /// Builds a table from `(code, GID)` pairs in arbitrary order.
    pub(crate) fn build(
        &mut self,
        entries: impl Iterator<Item = (u32, u16)>,
    ) -> Result<CmapTable, EmbedError> {
        self.mapping.clear();
        self.mapping
            .extend(entries.map(|(code, glyph_id)| Mapping { code, glyph_id }));
        self.mapping.sort_unstable_by_key(|mapping| mapping.code);
        if let Some(pair) = self.mapping.windows(2).find(|pair| pair[0].code == pair[1].code) {
            return Err(EmbedError::bad_spec(format_args!(
                "glyphs {} and {} are mapped to the same code U+{:04X}",
                pair[0].glyph_id, pair[1].glyph_id, pair[0].code
            )));
        }
        if let Some(mapping) = self.mapping.iter().find(|mapping| mapping.code == LAST_BMP_CODE) {
            return Err(EmbedError::bad_spec(format_args!(
                "glyph {} is mapped to U+FFFF, which is reserved for the final cmap segment",
                mapping.glyph_id
            )));
        }

        let mut table = CmapTable::default();
        let mut truncated = self.partition(true);
        self.build_segments(&mut table);
        if table.fit_format4() {
            log::debug!("format 4 cmap subtable is truncated; full mapping goes to format 12");
            truncated = true;
        }
        if truncated {
            self.partition(false);
            table.groups = self
                .spans
                .iter()
                .map(|span| {
                    let first = self.mapping[span.start];
                    SequentialMapGroup {
                        start_char_code: first.code,
                        end_char_code: self.mapping[span.start + span.len - 1].code,
                        start_glyph_id: first.glyph_id.into(),
                    }
                })
                .collect();
        }
        log::debug!(
            "cmap: {} codes, {} format 4 segments, {} format 12 groups",
            self.mapping.len(),
            table.segments.len(),
            table.groups.len()
        );
        Ok(table)
    }

    /// Partitions the sorted mapping into spans. In BMP mode, short runs are merged into explicit
    /// spans, and the walk stops at the first code beyond the BMP. Returns whether such a code
    /// was encountered.
    fn partition(&mut self, bmp_mode: bool) -> bool {
        self.spans.clear();
        let mut truncated = false;
        let mut block_start = 0;
        while block_start < self.mapping.len() {
            if bmp_mode && self.mapping[block_start].code > u32::from(u16::MAX) {
                truncated = true;
                break;
            }

            // Find the end of the code-contiguous block.
            let mut block_end = block_start + 1;
            while block_end < self.mapping.len() {
                let prev = self.mapping[block_end - 1];
                let next = self.mapping[block_end];
                if next.code != prev.code + 1 || (bmp_mode && next.code > u32::from(u16::MAX)) {
                    break;
                }
                block_end += 1;
            }

            let block_span_start = self.spans.len();
            let mut run_start = block_start;
            for i in block_start + 1..=block_end {
                let continues = i < block_end
                    && u32::from(self.mapping[i].glyph_id)
                        == u32::from(self.mapping[i - 1].glyph_id) + 1;
                if !continues {
                    self.push_run(bmp_mode, block_span_start, run_start, i - run_start);
                    run_start = i;
                }
            }
            block_start = block_end;
        }
        truncated
    }

    fn push_run(&mut self, merge: bool, block_span_start: usize, start: usize, len: usize) {
        if merge && self.spans.len() > block_span_start {
            // `unwrap()` is safe: checked above
            let current = self.spans.last_mut().unwrap();
            if len + current.len < MERGE_THRESHOLD {
                current.len += len;
                current.ordered = false;
                return;
            }
        }
        self.spans.push(Span {
            start,
            len,
            ordered: true,
        });
    }

    #[allow(clippy::cast_possible_truncation)] // spans are truncated to the BMP
    fn build_segments(&self, table: &mut CmapTable) {
        for span in &self.spans {
            let first = self.mapping[span.start];
            let last = self.mapping[span.start + span.len - 1];
            let start_code = first.code as u16;
            let segment = if span.ordered {
                SegmentWithDelta {
                    start_code,
                    end_code: last.code as u16,
                    id_delta: first.glyph_id.wrapping_sub(start_code),
                    array_index: None,
                }
            } else {
                let array_index = table.glyph_id_array.len();
                let glyph_ids = &self.mapping[span.start..span.start + span.len];
                table
                    .glyph_id_array
                    .extend(glyph_ids.iter().map(|mapping| mapping.glyph_id));
                SegmentWithDelta {
                    start_code,
                    end_code: last.code as u16,
                    id_delta: 0,
                    array_index: Some(array_index),
                }
            };
            table.segments.push(segment);
        }
        table.segments.push(SegmentWithDelta::FINAL);
    }
}

impl SegmentWithDelta {
    /// Mandatory final segment mapping 0xffff to glyph 0.
    const FINAL: Self = Self {
        start_code: u16::MAX,
        end_code: u16::MAX,
        id_delta: 1,
        array_index: None,
    };
}

impl CmapTable {
    const SEGMENT_LEN: usize = 8;

    fn format4_len(&self) -> usize {
        16 + Self::SEGMENT_LEN * self.segments.len() + 2 * self.glyph_id_array.len()
    }

    /// Drops trailing segments (keeping the final one) until the format 4 subtable fits
    /// its 16-bit length field. Returns whether any segment was dropped.
    fn fit_format4(&mut self) -> bool {
        let max_len = usize::from(u16::MAX);
        if self.format4_len() <= max_len {
            return false;
        }

        self.segments.pop(); // final segment
        while self.format4_len() + Self::SEGMENT_LEN > max_len {
            let Some(segment) = self.segments.pop() else {
                break;
            };
            if let Some(index) = segment.array_index {
                self.glyph_id_array.truncate(index);
            }
        }
        self.segments.push(SegmentWithDelta::FINAL);
        true
    }

    fn format12_len(&self) -> usize {
        16 + 12 * self.groups.len()
    }

    pub(crate) fn write(&self, writer: &mut Vec<u8>) -> Result<(), EmbedError> {
        let num_tables: u16 = if self.groups.is_empty() { 1 } else { 2 };
        let header_len = 4 + 8 * u32::from(num_tables);

        write_u16(writer, 0); // version
        write_u16(writer, num_tables);
        write_u16(writer, UNICODE_PLATFORM);
        write_u16(writer, UNICODE_BMP_ENCODING);
        write_u32(writer, header_len);
        if !self.groups.is_empty() {
            let format4_len = u32::try_from(self.format4_len()).map_err(|_| too_large())?;
            write_u16(writer, UNICODE_PLATFORM);
            write_u16(writer, UNICODE_FULL_ENCODING);
            write_u32(writer, header_len + format4_len);
        }

        self.write_format4(writer)?;
        if !self.groups.is_empty() {
            self.write_format12(writer)?;
        }
        Ok(())
    }

    fn write_format4(&self, writer: &mut Vec<u8>) -> Result<(), EmbedError> {
        let subtable_len = u16::try_from(self.format4_len()).map_err(|_| too_large())?;
        // `unwrap()` is safe: the segment count is bounded by the subtable length
        let segment_count = u16::try_from(self.segments.len()).unwrap();

        write_u16(writer, 4); // format
        write_u16(writer, subtable_len);
        write_u16(writer, 0); // language
        write_u16(writer, 2 * segment_count);
        let (search_range, entry_selector, range_shift) = search_params(segment_count, 2);
        write_u16(writer, search_range);
        write_u16(writer, entry_selector);
        write_u16(writer, range_shift);

        for segment in &self.segments {
            write_u16(writer, segment.end_code);
        }
        write_u16(writer, 0); // reserved padding
        for segment in &self.segments {
            write_u16(writer, segment.start_code);
        }
        for segment in &self.segments {
            write_u16(writer, segment.id_delta);
        }
        for (i, segment) in self.segments.iter().enumerate() {
            // Offset is counted from the `idRangeOffset` word of the segment
            let id_range_offset = segment.array_index.map_or(0, |index| {
                2 * (self.segments.len() - i) + 2 * index
            });
            // `unwrap()` is safe: the offset is bounded by the subtable length
            write_u16(writer, u16::try_from(id_range_offset).unwrap());
        }
        for &glyph_id in &self.glyph_id_array {
            write_u16(writer, glyph_id);
        }
        Ok(())
    }

    fn write_format12(&self, writer: &mut Vec<u8>) -> Result<(), EmbedError> {
        let subtable_len = u32::try_from(self.format12_len()).map_err(|_| too_large())?;
        write_u16(writer, 12); // format
        write_u16(writer, 0); // reserved
        write_u32(writer, subtable_len);
        write_u32(writer, 0); // language
        // `unwrap()` is safe: checked via `subtable_len`
        write_u32(writer, u32::try_from(self.groups.len()).unwrap());
        for group in &self.groups {
            write_u32(writer, group.start_char_code);
            write_u32(writer, group.end_char_code);
            write_u32(writer, group.start_glyph_id);
        }
        Ok(())
    }
}

fn too_large() -> EmbedError {
    EmbedError::new(ErrorKind::SfntWrite, "cmap subtable is too large")
}
