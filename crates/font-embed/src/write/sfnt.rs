//! sfnt container assembly.

use core::{fmt, iter};
use std::io::{Read, Seek, SeekFrom, Write};

use super::{search_params, write_u16, write_u32};
use crate::{
    cmap::{CmapBuilder, CmapTable},
    errors::{extend_zeroed, EmbedError, ErrorKind},
    font::TableTag,
    gpos::KernBuilder,
    stream::{ClientStream, StreamRole},
    subset::GlyphTable,
};

/// `OTTO` sfnt version for CFF-based fonts.
const CFF_SFNT_VERSION: u32 = 0x_4f54_544f;

fn sfnt_error(detail: impl fmt::Display) -> EmbedError {
    EmbedError::new(ErrorKind::SfntWrite, detail)
}

fn checksum(data: &[u8]) -> u32 {
    let chunks = data.chunks_exact(4);
    let remainder = chunks.remainder();
    let mut sum = chunks.fold(0_u32, |acc, chunk| {
        // `unwrap()` is safe: chunks have length 4
        acc.wrapping_add(u32::from_be_bytes(chunk.try_into().unwrap()))
    });
    if !remainder.is_empty() {
        let mut last = [0_u8; 4];
        last[..remainder.len()].copy_from_slice(remainder);
        sum = sum.wrapping_add(u32::from_be_bytes(last));
    }
    sum
}

/// Font data available to [`TableHandler`]s while the sfnt container is assembled.
pub struct SfntContext<'a> {
    pub(crate) font_name: &'a str,
    pub(crate) glyphs: &'a GlyphTable,
    pub(crate) kern: &'a KernBuilder,
    /// Spooled `CFF ` table.
    pub(crate) cff: &'a mut dyn ClientStream,
    pub(crate) cff_len: usize,
}

impl fmt::Debug for SfntContext<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SfntContext")
            .field("font_name", &self.font_name)
            .field("glyph_count", &self.glyphs.len())
            .field("cff_len", &self.cff_len)
            .finish_non_exhaustive()
    }
}

impl SfntContext<'_> {
    /// Returns the name of the output font.
    pub fn font_name(&self) -> &str {
        self.font_name
    }

    /// Returns the number of glyphs in the output font.
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Resolves a client glyph id to the glyph index in the output font. Virtual ids resolve
    /// to themselves.
    pub fn gid(&self, id: u16) -> Option<u16> {
        self.glyphs.gid(id)
    }
}

/// Handler for a table in the output sfnt container.
///
/// The `cmap`, `CFF ` and `GPOS` tables are written by built-in handlers with fill and write
/// sequence numbers 10, 20 and 30 respectively. Additional handlers can be registered via
/// [`Embedder::register_table()`](crate::Embedder::register_table()). For each font, all handlers
/// are filled in the ascending [fill sequence](Self::fill_seq()) order, and then the tables are written
/// in the ascending [write sequence](Self::write_seq()) order.
pub trait TableHandler: Send {
    /// Returns the table tag. Tags must be unique among all handlers.
    fn tag(&self) -> TableTag;

    /// Returns the fill sequence number.
    fn fill_seq(&self) -> u32;

    /// Returns the write sequence number; controls the table data order in the output.
    fn write_seq(&self) -> u32;

    /// Notifies the handler that a new font is started.
    fn new_font(&mut self) {}

    /// Prepares table data. Returns `false` if the table should be omitted from the output.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be built; the embedding call fails with it.
    fn fill(&mut self, context: &mut SfntContext<'_>) -> Result<bool, EmbedError>;

    /// Writes the table data prepared by [`Self::fill()`].
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be written; the embedding call fails with it.
    fn write(&mut self, context: &mut SfntContext<'_>, out: &mut Vec<u8>)
        -> Result<(), EmbedError>;

    /// Releases per-font data. Called after each font, on both success and failure.
    fn reuse(&mut self) {}
}

#[derive(Debug, Default)]
struct CmapHandler {
    builder: CmapBuilder,
    table: Option<CmapTable>,
}

impl TableHandler for CmapHandler {
    fn tag(&self) -> TableTag {
        TableTag::CMAP
    }

    fn fill_seq(&self) -> u32 {
        10
    }

    fn write_seq(&self) -> u32 {
        10
    }

    fn fill(&mut self, context: &mut SfntContext<'_>) -> Result<bool, EmbedError> {
        let table = self.builder.build(context.glyphs.unicode_mapping())?;
        log::debug!(
            "cmap: {} format 4 segments, {} format 12 groups",
            table.segments.len(),
            table.groups.len()
        );
        self.table = Some(table);
        Ok(true)
    }

    fn write(&mut self, _: &mut SfntContext<'_>, out: &mut Vec<u8>) -> Result<(), EmbedError> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| EmbedError::internal("cmap table is not filled"))?;
        table.write(out)
    }

    fn reuse(&mut self) {
        self.table = None;
    }
}

#[derive(Debug, Default)]
struct CffHandler;

impl TableHandler for CffHandler {
    fn tag(&self) -> TableTag {
        TableTag::CFF
    }

    fn fill_seq(&self) -> u32 {
        20
    }

    fn write_seq(&self) -> u32 {
        20
    }

    fn fill(&mut self, context: &mut SfntContext<'_>) -> Result<bool, EmbedError> {
        if context.cff_len == 0 {
            return Err(EmbedError::internal("CFF table is empty"));
        }
        Ok(true)
    }

    fn write(&mut self, context: &mut SfntContext<'_>, out: &mut Vec<u8>) -> Result<(), EmbedError> {
        let stream_err = |err| StreamRole::Temp0.io_error(err);
        context.cff.seek(SeekFrom::Start(0)).map_err(stream_err)?;
        let table = extend_zeroed(out, context.cff_len)?;
        context.cff.read_exact(table).map_err(stream_err)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct GposHandler {
    table: Option<Vec<u8>>,
}

impl TableHandler for GposHandler {
    fn tag(&self) -> TableTag {
        TableTag::GPOS
    }

    fn fill_seq(&self) -> u32 {
        30
    }

    fn write_seq(&self) -> u32 {
        30
    }

    fn fill(&mut self, context: &mut SfntContext<'_>) -> Result<bool, EmbedError> {
        self.table = context.kern.build_gpos()?;
        Ok(self.table.is_some())
    }

    fn write(&mut self, _: &mut SfntContext<'_>, out: &mut Vec<u8>) -> Result<(), EmbedError> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| EmbedError::internal("GPOS table is not filled"))?;
        out.extend_from_slice(table);
        Ok(())
    }

    fn reuse(&mut self) {
        self.table = None;
    }
}

#[derive(Debug, Clone, Copy)]
struct TableRecord {
    tag: TableTag,
    checksum: u32,
    /// Offset relative to the table data start. It's always 4-byte aligned.
    offset: u32,
    length: u32,
}

impl TableRecord {
    const BYTE_LEN: usize = 16;

    fn write(&self, writer: &mut Vec<u8>, data_offset: u32) {
        writer.extend_from_slice(&self.tag.0);
        write_u32(writer, self.checksum);
        write_u32(writer, self.offset + data_offset);
        write_u32(writer, self.length);
    }
}

/// Assembles the sfnt container from built-in and client-registered tables. Buffers are reused
/// across fonts.
#[derive(Debug, Default)]
pub(crate) struct SfntPacker {
    cmap: CmapHandler,
    cff: CffHandler,
    gpos: GposHandler,
    records: Vec<TableRecord>,
    /// Contains *aligned* table data.
    table_data: Vec<u8>,
}

impl SfntPacker {
    const SFNT_HEADER_LEN: usize = 12;

    /// Fills and writes all tables, and writes the container to `out`. Returns the container length.
    pub(crate) fn pack(
        &mut self,
        context: &mut SfntContext<'_>,
        client_tables: &mut [Box<dyn TableHandler>],
        out: &mut dyn ClientStream,
    ) -> Result<usize, EmbedError> {
        self.records.clear();
        self.table_data.clear();

        let mut handlers: Vec<&mut dyn TableHandler> = Vec::with_capacity(3 + client_tables.len());
        handlers.push(&mut self.cmap);
        handlers.push(&mut self.cff);
        handlers.push(&mut self.gpos);
        for handler in client_tables {
            handlers.push(handler.as_mut());
        }
        for handler in &mut handlers {
            handler.new_font();
        }

        let result = Self::write_tables(&mut handlers, context, &mut self.records, &mut self.table_data);
        for handler in &mut handlers {
            handler.reuse();
        }
        result?;
        self.write_container(out)
    }

    fn write_tables(
        handlers: &mut [&mut dyn TableHandler],
        context: &mut SfntContext<'_>,
        records: &mut Vec<TableRecord>,
        table_data: &mut Vec<u8>,
    ) -> Result<(), EmbedError> {
        let mut tags: Vec<_> = handlers.iter().map(|handler| handler.tag()).collect();
        tags.sort_unstable();
        if let Some(pair) = tags.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(sfnt_error(format_args!("duplicate table {}", pair[0])));
        }

        handlers.sort_by_key(|handler| handler.fill_seq());
        let mut included = Vec::with_capacity(handlers.len());
        for handler in handlers.iter_mut() {
            let is_included = handler.fill(context)?;
            log::trace!("filled table {} (included: {is_included})", handler.tag());
            included.push(is_included);
        }

        let mut order: Vec<_> = (0..handlers.len()).filter(|&i| included[i]).collect();
        order.sort_by_key(|&i| handlers[i].write_seq());
        for i in order {
            let handler = &mut handlers[i];
            let offset = table_data.len();
            debug_assert_eq!(offset % 4, 0, "unaligned offset: {offset}");
            handler.write(context, table_data)?;
            let length = table_data.len() - offset;
            // Pad the table heap to a 4-byte boundary.
            if length % 4 > 0 {
                let zero_padding = 4 - length % 4;
                table_data.extend(iter::repeat_n(0_u8, zero_padding));
            }

            log::debug!("table {}: {length} bytes", handler.tag());
            records.push(TableRecord {
                tag: handler.tag(),
                checksum: checksum(&table_data[offset..]),
                offset: u32::try_from(offset).map_err(|_| sfnt_error("table offset overflow"))?,
                length: u32::try_from(length).map_err(|_| sfnt_error("table length overflow"))?,
            });
        }
        Ok(())
    }

    fn write_container(&mut self, out: &mut dyn ClientStream) -> Result<usize, EmbedError> {
        let table_count =
            u16::try_from(self.records.len()).map_err(|_| sfnt_error("too many tables"))?;
        let data_offset = Self::SFNT_HEADER_LEN + self.records.len() * TableRecord::BYTE_LEN;
        let total_len = data_offset + self.table_data.len();
        let data_offset = u32::try_from(data_offset)
            .ok()
            .filter(|_| u32::try_from(total_len).is_ok())
            .ok_or_else(|| sfnt_error("font is too large"))?;

        let mut header = Vec::with_capacity(usize::try_from(data_offset).unwrap_or(0));
        write_u32(&mut header, CFF_SFNT_VERSION);
        write_u16(&mut header, table_count);
        let (search_range, entry_selector, range_shift) = search_params(table_count, 16);
        write_u16(&mut header, search_range);
        write_u16(&mut header, entry_selector);
        write_u16(&mut header, range_shift);

        self.records.sort_unstable_by_key(|record| record.tag);
        for record in &self.records {
            record.write(&mut header, data_offset);
        }

        let stream_err = |err| StreamRole::Destination.io_error(err);
        out.write_all(&header).map_err(stream_err)?;
        out.write_all(&self.table_data).map_err(stream_err)?;
        out.flush().map_err(stream_err)?;
        log::debug!("sfnt: {} tables, {total_len} bytes", self.records.len());
        Ok(total_len)
    }
}
