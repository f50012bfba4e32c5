//! Source font type detection and demultiplexing of segmented containers.

use crate::{
    errors::{EmbedError, ErrorKind},
    font::{Cursor, TableDirectory, TableTag},
    stream::{ReadError, SourceReader},
};

/// Font technology of the source, which selects the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FontTechnology {
    /// Type 1 or CID-keyed Type 1 (CIDFontType 0) PostScript program.
    Type1,
    /// Bare CFF table data.
    Cff,
    /// TrueType sfnt with `glyf` outlines.
    TrueType,
}

/// Source container, as detected from signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Container {
    /// ASCII PostScript (PFA or CIDFont resource).
    PostScript,
    /// Windows PFB segments.
    Pfb,
    /// Naked CFF data.
    Cff,
    /// sfnt container (TrueType, OpenType/CFF, or GX-wrapped Type 1 / CID).
    Sfnt,
    /// Macintosh resource fork, possibly within an AppleSingle / AppleDouble file.
    ResourceFork,
}

/// Linearized source font.
#[derive(Debug)]
pub(crate) struct SourceFont {
    pub(crate) technology: FontTechnology,
    pub(crate) container: Container,
    pub(crate) data: Vec<u8>,
}

const PFB_MARKER: u8 = 0x80;
const APPLE_SINGLE_MAGIC: u32 = 0x0005_1600;
const APPLE_DOUBLE_MAGIC: u32 = 0x0005_1607;
const APPLE_RESOURCE_FORK_ENTRY: u32 = 2;
const RESOURCE_FORK_SIGNATURE: u32 = 0x0000_0100;
/// Header of a `TYP1` or `CID ` table preceding the PostScript program.
const WRAPPED_HEADER_LEN: usize = 28;

/// Detects the source type and reads the linearized font program.
pub(crate) fn detect(reader: &mut SourceReader<'_>) -> Result<SourceFont, EmbedError> {
    let start = reader.position();
    let mut signature = [0_u8; 4];
    for (i, byte) in signature.iter_mut().enumerate() {
        match reader.read_u8() {
            Ok(value) => *byte = value,
            Err(_) if i >= 2 => break,
            Err(err) => return Err(ReadError::Io(err).into_embed(ErrorKind::UnknownFontType)),
        }
    }
    reader.seek(start).map_err(|err| ReadError::Io(err).into_embed(ErrorKind::SourceStream))?;

    let font = match signature {
        [b'%', b'!', ..] => SourceFont {
            technology: FontTechnology::Type1,
            container: Container::PostScript,
            data: read_all(reader)?,
        },
        [PFB_MARKER, 1, ..] => SourceFont {
            technology: FontTechnology::Type1,
            container: Container::Pfb,
            data: read_pfb(reader)?,
        },
        [1, 0, header_len, offset_size] if header_len >= 4 && (1..=4).contains(&offset_size) => {
            SourceFont {
                technology: FontTechnology::Cff,
                container: Container::Cff,
                data: read_all(reader)?,
            }
        }
        _ => match u32::from_be_bytes(signature) {
            RESOURCE_FORK_SIGNATURE => read_resource_fork(reader, start)?,
            APPLE_SINGLE_MAGIC | APPLE_DOUBLE_MAGIC => read_apple_single(reader, start)?,
            _ => parse_sfnt(read_all(reader)?)?,
        },
    };
    log::debug!(
        "detected {:?} source in {:?} container ({} bytes)",
        font.technology,
        font.container,
        font.data.len()
    );
    Ok(font)
}

fn read_all(reader: &mut SourceReader<'_>) -> Result<Vec<u8>, EmbedError> {
    let mut data = vec![];
    reader
        .read_to_end(&mut data)
        .map_err(|err| err.into_embed(ErrorKind::SourceStream))?;
    Ok(data)
}

/// Concatenates ASCII and binary PFB segments until the end-of-file segment.
fn read_pfb(reader: &mut SourceReader<'_>) -> Result<Vec<u8>, EmbedError> {
    const ASCII_SEGMENT: u8 = 1;
    const BINARY_SEGMENT: u8 = 2;
    const EOF_SEGMENT: u8 = 3;

    let map_err = |err: ReadError| err.into_embed(ErrorKind::BadPfbSegment);
    let mut data = vec![];
    loop {
        let marker = match reader.read_u8() {
            Ok(marker) => marker,
            // Tolerate files ending without an explicit EOF segment
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(map_err(err.into())),
        };
        if marker != PFB_MARKER {
            return Err(EmbedError::new(
                ErrorKind::BadPfbSegment,
                format_args!("unexpected segment marker {marker:#04x}"),
            ));
        }
        let segment_type = reader.read_u8().map_err(|err| map_err(err.into()))?;
        match segment_type {
            EOF_SEGMENT => break,
            ASCII_SEGMENT | BINARY_SEGMENT => {
                let len = reader.read_u32_le().map_err(|err| map_err(err.into()))?;
                log::trace!("PFB segment type {segment_type}, {len} bytes");
                reader.read_into(&mut data, len as usize).map_err(map_err)?;
            }
            _ => {
                return Err(EmbedError::new(
                    ErrorKind::BadPfbSegment,
                    format_args!("unexpected segment type {segment_type}"),
                ));
            }
        }
    }
    Ok(data)
}

fn read_apple_single(reader: &mut SourceReader<'_>, start: u64) -> Result<SourceFont, EmbedError> {
    let map_err = |err: std::io::Error| ReadError::Io(err).into_embed(ErrorKind::UnknownFontType);
    reader.seek(start + 24).map_err(map_err)?; // magic, version, filler
    let entry_count = reader.read_u16().map_err(map_err)?;
    for _ in 0..entry_count {
        let id = reader.read_u32().map_err(map_err)?;
        let offset = reader.read_u32().map_err(map_err)?;
        let _len = reader.read_u32().map_err(map_err)?;
        if id == APPLE_RESOURCE_FORK_ENTRY {
            return read_resource_fork(reader, start + u64::from(offset));
        }
    }
    Err(EmbedError::new(
        ErrorKind::MissingResource,
        "no resource fork entry in AppleSingle / AppleDouble file",
    ))
}

#[derive(Debug)]
struct ResourceRef {
    id: u16,
    /// Offset of the resource data relative to the start of the fork.
    data_offset: u64,
}

/// Reads resource references of the given types from the resource map.
fn read_resource_map(
    reader: &mut SourceReader<'_>,
    base: u64,
) -> Result<(Vec<ResourceRef>, Vec<ResourceRef>), EmbedError> {
    const POST_TYPE: u32 = u32::from_be_bytes(*b"POST");
    const SFNT_TYPE: u32 = u32::from_be_bytes(*b"sfnt");

    let map_err = |err: std::io::Error| ReadError::Io(err).into_embed(ErrorKind::MissingResource);
    reader.seek(base).map_err(map_err)?;
    let data_offset = reader.read_u32().map_err(map_err)?;
    let map_offset = reader.read_u32().map_err(map_err)?;

    let map_start = base + u64::from(map_offset);
    reader.seek(map_start + 24).map_err(map_err)?; // header copy, handle, file ref, attributes
    let type_list_offset = reader.read_u16().map_err(map_err)?;
    let type_list_start = map_start + u64::from(type_list_offset);
    reader.seek(type_list_start).map_err(map_err)?;
    let type_count = reader.read_u16().map_err(map_err)?.wrapping_add(1);

    let mut types = vec![];
    for _ in 0..type_count {
        let tag = reader.read_u32().map_err(map_err)?;
        let count = reader.read_u16().map_err(map_err)?.wrapping_add(1);
        let ref_list_offset = reader.read_u16().map_err(map_err)?;
        types.push((tag, count, ref_list_offset));
    }

    let (mut post, mut sfnt) = (vec![], vec![]);
    for (tag, count, ref_list_offset) in types {
        let target = match tag {
            POST_TYPE => &mut post,
            SFNT_TYPE => &mut sfnt,
            _ => continue,
        };
        reader
            .seek(type_list_start + u64::from(ref_list_offset))
            .map_err(map_err)?;
        for _ in 0..count {
            let id = reader.read_u16().map_err(map_err)?;
            let _name_offset = reader.read_u16().map_err(map_err)?;
            let _attributes = reader.read_u8().map_err(map_err)?;
            let resource_offset = reader.read_u24().map_err(map_err)?;
            let _handle = reader.read_u32().map_err(map_err)?;
            target.push(ResourceRef {
                id,
                data_offset: base + u64::from(data_offset) + u64::from(resource_offset),
            });
        }
    }
    Ok((post, sfnt))
}

fn read_resource_fork(reader: &mut SourceReader<'_>, base: u64) -> Result<SourceFont, EmbedError> {
    let (mut post, sfnt) = read_resource_map(reader, base)?;
    log::debug!(
        "resource fork contains {} POST and {} sfnt resources",
        post.len(),
        sfnt.len()
    );

    if !post.is_empty() {
        post.sort_unstable_by_key(|resource| resource.id);
        return Ok(SourceFont {
            technology: FontTechnology::Type1,
            container: Container::ResourceFork,
            data: read_post_resources(reader, &post)?,
        });
    }

    let Some(resource) = sfnt.first() else {
        return Err(ErrorKind::MissingResource.into());
    };
    let map_err = |err: ReadError| err.into_embed(ErrorKind::BadSfnt);
    reader
        .seek(resource.data_offset)
        .map_err(|err| map_err(err.into()))?;
    let len = reader.read_u32().map_err(|err| map_err(err.into()))?;
    let mut data = vec![];
    reader.read_into(&mut data, len as usize).map_err(map_err)?;
    let mut font = parse_sfnt(data)?;
    font.container = Container::ResourceFork;
    Ok(font)
}

/// Concatenates `POST` resources (ordered by resource id) until an end marker.
fn read_post_resources(
    reader: &mut SourceReader<'_>,
    resources: &[ResourceRef],
) -> Result<Vec<u8>, EmbedError> {
    const COMMENT: u8 = 0;
    const ASCII: u8 = 1;
    const BINARY: u8 = 2;
    const END_OF_FILE: u8 = 3;
    const END_OF_DATA: u8 = 5;

    let map_err = |err: ReadError| err.into_embed(ErrorKind::BadPostResource);
    let mut data = vec![];
    for resource in resources {
        reader
            .seek(resource.data_offset)
            .map_err(|err| map_err(err.into()))?;
        let len = reader.read_u32().map_err(|err| map_err(err.into()))?;
        let resource_type = reader.read_u8().map_err(|err| map_err(err.into()))?;
        let _pad = reader.read_u8().map_err(|err| map_err(err.into()))?;
        log::trace!(
            "POST resource {}: type {resource_type}, {len} bytes",
            resource.id
        );

        match resource_type {
            COMMENT => continue,
            ASCII | BINARY => {
                let len = len.checked_sub(2).ok_or_else(|| {
                    EmbedError::new(ErrorKind::BadPostResource, "resource length is too small")
                })?;
                reader.read_into(&mut data, len as usize).map_err(map_err)?;
            }
            END_OF_FILE | END_OF_DATA => break,
            _ => {
                return Err(EmbedError::new(
                    ErrorKind::BadPostResource,
                    format_args!("unsupported resource type {resource_type}"),
                ));
            }
        }
    }
    Ok(data)
}

fn parse_sfnt(data: Vec<u8>) -> Result<SourceFont, EmbedError> {
    const TRUETYPE_VERSION: u32 = 0x0001_0000;
    const APPLE_TRUETYPE_VERSION: u32 = u32::from_be_bytes(*b"true");
    const OPENTYPE_VERSION: u32 = u32::from_be_bytes(*b"OTTO");
    const WRAPPED_TYPE1_VERSION: u32 = u32::from_be_bytes(*b"typ1");
    const COLLECTION_TAG: u32 = u32::from_be_bytes(*b"ttcf");

    let version = Cursor::new(&data)
        .read_u32()
        .map_err(|err| err.into_embed(ErrorKind::UnknownFontType))?;
    match version {
        COLLECTION_TAG => return Err(ErrorKind::TrueTypeCollection.into()),
        TRUETYPE_VERSION | APPLE_TRUETYPE_VERSION | OPENTYPE_VERSION | WRAPPED_TYPE1_VERSION => {}
        _ => {
            return Err(EmbedError::new(
                ErrorKind::UnknownFontType,
                format_args!("unrecognized signature {version:#010x}"),
            ));
        }
    }

    let directory = TableDirectory::parse(&data).map_err(|err| err.into_embed(ErrorKind::BadSfnt))?;
    let (technology, range) = match version {
        OPENTYPE_VERSION => {
            let range = directory
                .table_range(TableTag::CFF)
                .ok_or_else(|| EmbedError::new(ErrorKind::BadSfnt, "missing `CFF ` table"))?;
            (FontTechnology::Cff, range)
        }
        WRAPPED_TYPE1_VERSION => {
            let range = directory
                .table_range(TableTag::TYP1)
                .or_else(|| directory.table_range(TableTag::CID))
                .ok_or_else(|| {
                    EmbedError::new(ErrorKind::BadSfnt, "missing `TYP1` or `CID ` table")
                })?;
            if range.len() < WRAPPED_HEADER_LEN {
                return Err(EmbedError::new(ErrorKind::BadSfnt, "truncated wrapped font table"));
            }
            (FontTechnology::Type1, range.start + WRAPPED_HEADER_LEN..range.end)
        }
        _ => (FontTechnology::TrueType, 0..data.len()),
    };

    let data = if range == (0..data.len()) {
        data
    } else {
        data[range].to_vec()
    };
    Ok(SourceFont {
        technology,
        container: Container::Sfnt,
        data,
    })
}
