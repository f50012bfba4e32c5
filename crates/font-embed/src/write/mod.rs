//! Output writers: CFF table, SVG font and the sfnt container.

pub use self::{
    sfnt::{SfntContext, TableHandler},
    svg::SvgFlags,
};
pub(crate) use self::{
    cff::CffWriter,
    sfnt::SfntPacker,
    svg::{SvgSession, UnicodeAllocator},
};

mod cff;
mod sfnt;
mod svg;

pub(crate) fn write_u16(writer: &mut Vec<u8>, value: u16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn write_i16(writer: &mut Vec<u8>, value: i16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn write_u32(writer: &mut Vec<u8>, value: u32) {
    writer.extend_from_slice(&value.to_be_bytes());
}

/// Overwrites a big-endian `u16` at the specified offset.
pub(crate) fn patch_u16(writer: &mut [u8], offset: usize, value: u16) {
    writer[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Computes `searchRange`, `entrySelector` and `rangeShift` for a binary-searchable array
/// of `count` items of `item_len` bytes each.
pub(crate) fn search_params(count: u16, item_len: u16) -> (u16, u16, u16) {
    if count == 0 {
        return (0, 0, 0);
    }
    let entry_selector = u16::try_from(count.ilog2()).unwrap_or(0);
    let search_range = (1 << entry_selector) * item_len;
    let range_shift = count * item_len - search_range;
    (search_range, entry_selector, range_shift)
}
