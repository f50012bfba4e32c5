use std::{fs, io::Write as _};

use allsorts::{
    binary::read::ReadScope,
    cff::CFF,
    font_data::FontData,
    tables::{
        cmap::{Cmap, CmapSubtable, EncodingId, PlatformId},
        FontTableProvider,
    },
};
use test_casing::test_casing;

use crate::{
    font::{strings::MAC_GLYPH_NAMES, CffParser, FontInfo, FontParser, TableDirectory, TableTag},
    glyph::RecordingSink,
    EmbedError, EmbedFlags, Embedder, EmbeddingSpec, ErrorKind, FileStreams, KernPair,
    MappedGlyph, MemoryStreams, SfntContext, SubsetGlyph, SvgFlags, TableHandler, NO_UNICODE, VID_BEGIN,
};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---------- Container fixtures ----------

/// Builds a PFB file from `(segment_type, data)` pairs, terminated by an EOF segment.
pub(crate) fn pfb_segments(segments: &[(u8, &[u8])]) -> Vec<u8> {
    let mut bytes = vec![];
    for &(segment_type, data) in segments {
        bytes.extend_from_slice(&[0x80, segment_type]);
        bytes.extend_from_slice(&u32::try_from(data.len()).unwrap().to_le_bytes());
        bytes.extend_from_slice(data);
    }
    bytes.extend_from_slice(&[0x80, 3]);
    bytes
}

/// Builds a Macintosh resource fork with `POST` resources given as `(id, type, data)`.
pub(crate) fn post_resource_fork(resources: &[(u16, u8, &[u8])]) -> Vec<u8> {
    const DATA_OFFSET: usize = 256;
    const TYPE_LIST_OFFSET: u16 = 28;

    let mut data = vec![];
    let mut refs = vec![];
    for &(id, resource_type, content) in resources {
        refs.push((id, u32::try_from(data.len()).unwrap()));
        data.extend_from_slice(&u32::try_from(content.len() + 2).unwrap().to_be_bytes());
        data.extend_from_slice(&[resource_type, 0]);
        data.extend_from_slice(content);
    }

    // Header copy, handle, file reference and attributes are zeroed.
    let mut map = vec![0; 24];
    map.extend_from_slice(&TYPE_LIST_OFFSET.to_be_bytes());
    map.extend_from_slice(&0_u16.to_be_bytes()); // name list offset
    if refs.is_empty() {
        map.extend_from_slice(&u16::MAX.to_be_bytes());
    } else {
        map.extend_from_slice(&0_u16.to_be_bytes()); // 1 type
        map.extend_from_slice(b"POST");
        map.extend_from_slice(&u16::try_from(refs.len() - 1).unwrap().to_be_bytes());
        map.extend_from_slice(&10_u16.to_be_bytes()); // reference list offset
        for (id, offset) in refs {
            map.extend_from_slice(&id.to_be_bytes());
            map.extend_from_slice(&u16::MAX.to_be_bytes()); // no name
            map.push(0); // attributes
            map.extend_from_slice(&offset.to_be_bytes()[1..]);
            map.extend_from_slice(&0_u32.to_be_bytes()); // handle
        }
    }

    let map_offset = DATA_OFFSET + data.len();
    let mut fork = vec![];
    for value in [DATA_OFFSET, map_offset, data.len(), map.len()] {
        fork.extend_from_slice(&u32::try_from(value).unwrap().to_be_bytes());
    }
    fork.resize(DATA_OFFSET, 0);
    fork.extend_from_slice(&data);
    fork.extend_from_slice(&map);
    fork
}

/// Builds an sfnt with the specified tables. Checksums are not computed.
pub(crate) fn sfnt_with_tables(version: [u8; 4], tables: &[(TableTag, &[u8])]) -> Vec<u8> {
    let table_count = u16::try_from(tables.len()).unwrap();
    let mut bytes = version.to_vec();
    bytes.extend_from_slice(&table_count.to_be_bytes());
    bytes.extend_from_slice(&[0; 6]); // searchRange, entrySelector, rangeShift

    let mut offset = 12 + 16 * tables.len();
    for &(tag, data) in tables {
        bytes.extend_from_slice(&tag.0);
        bytes.extend_from_slice(&0_u32.to_be_bytes());
        bytes.extend_from_slice(&u32::try_from(offset).unwrap().to_be_bytes());
        bytes.extend_from_slice(&u32::try_from(data.len()).unwrap().to_be_bytes());
        offset += data.len().next_multiple_of(4);
    }
    for &(_, data) in tables {
        bytes.extend_from_slice(data);
        bytes.resize(bytes.len().next_multiple_of(4), 0);
    }
    bytes
}

// ---------- Type 1 fixtures ----------

const EEXEC_SEED: u16 = 55_665;
const CHARSTRING_SEED: u16 = 4_330;
const LEN_IV: usize = 4;

fn encrypt(plain: &[u8], seed: u16) -> Vec<u8> {
    let mut r = seed;
    plain
        .iter()
        .map(|&byte| {
            let cipher = byte ^ r.to_be_bytes()[0];
            r = u16::from(cipher)
                .wrapping_add(r)
                .wrapping_mul(52_845)
                .wrapping_add(22_719);
            cipher
        })
        .collect()
}

fn push_type1_number(out: &mut Vec<u8>, value: i32) {
    match value {
        -107..=107 => out.push(u8::try_from(value + 139).unwrap()),
        108..=1_131 => {
            let value = value - 108;
            out.push(u8::try_from(value / 256 + 247).unwrap());
            out.push(u8::try_from(value % 256).unwrap());
        }
        -1_131..=-108 => {
            let value = -value - 108;
            out.push(u8::try_from(value / 256 + 251).unwrap());
            out.push(u8::try_from(value % 256).unwrap());
        }
        _ => {
            out.push(255);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// Encodes an encrypted Type 1 charstring for a single closed polygon with absolute points.
fn type1_charstring(width: i32, points: &[(i16, i16)]) -> Vec<u8> {
    const HSBW: u8 = 13;
    const RMOVETO: u8 = 21;
    const RLINETO: u8 = 5;
    const CLOSEPATH: u8 = 9;
    const ENDCHAR: u8 = 14;

    let mut plain = vec![0; LEN_IV];
    push_type1_number(&mut plain, 0);
    push_type1_number(&mut plain, width);
    plain.push(HSBW);

    let mut current = (0, 0);
    for (i, &(x, y)) in points.iter().enumerate() {
        push_type1_number(&mut plain, i32::from(x) - current.0);
        push_type1_number(&mut plain, i32::from(y) - current.1);
        plain.push(if i == 0 { RMOVETO } else { RLINETO });
        current = (x.into(), y.into());
    }
    if !points.is_empty() {
        plain.push(CLOSEPATH);
    }
    plain.push(ENDCHAR);
    encrypt(&plain, CHARSTRING_SEED)
}

#[derive(Debug, Clone)]
pub(crate) struct TestGlyph {
    name: String,
    width: i32,
    points: Vec<(i16, i16)>,
}

impl TestGlyph {
    pub(crate) fn new(name: &str, width: i32, points: Vec<(i16, i16)>) -> Self {
        Self {
            name: name.to_owned(),
            width,
            points,
        }
    }
}

const PRIVATE_DICT_VALUES: &str = "/BlueValues [-20 0 700 720] def\n/StdVW [80] def\n";

/// Builds a name-keyed Type 1 font with the eexec section either binary or hex-encoded.
/// The binary variant starts the encrypted section immediately after `eexec\n`.
pub(crate) fn type1_font(name: &str, glyphs: &[TestGlyph], hex: bool) -> Vec<u8> {
    let mut font = format!(
        "%!PS-AdobeFont-1.0: {name} 001.000\n\
         %%Title: {name}\n\
         12 dict begin\n\
         /FontInfo 9 dict dup begin\n\
         /version (001.000) readonly def\n\
         /Notice (Test font) readonly def\n\
         /FullName ({name}) readonly def\n\
         /FamilyName (TestFont) readonly def\n\
         /Weight (Regular) readonly def\n\
         /ItalicAngle 0 def\n\
         /isFixedPitch false def\n\
         /UnderlinePosition -100 def\n\
         /UnderlineThickness 50 def\n\
         end readonly def\n\
         /FontName /{name} def\n\
         /Encoding StandardEncoding def\n\
         /PaintType 0 def\n\
         /FontType 1 def\n\
         /FontMatrix [0.001 0 0 0.001 0 0] readonly def\n\
         /FontBBox {{0 -200 1000 800}} readonly def\n\
         currentdict end\n\
         currentfile eexec\n"
    )
    .into_bytes();

    let mut private = vec![0; 4]; // plaintext prefix; keeps the first cipher byte non-hex
    private.extend_from_slice(
        b"dup /Private 8 dict dup begin\n\
          /RD{string currentfile exch readstring pop}executeonly def\n\
          /ND{noaccess def}executeonly def\n\
          /NP{noaccess put}executeonly def\n",
    );
    private.extend_from_slice(PRIVATE_DICT_VALUES.as_bytes());
    private.extend_from_slice(b"/lenIV 4 def\n/MinFeature{16 16}def\n/password 5839 def\n/Subrs 0 array\n");
    write!(private, "2 index /CharStrings {} dict dup begin\n", glyphs.len()).unwrap();
    for glyph in glyphs {
        let charstring = type1_charstring(glyph.width, &glyph.points);
        write!(private, "/{} {} RD ", glyph.name, charstring.len()).unwrap();
        private.extend_from_slice(&charstring);
        private.extend_from_slice(b" ND\n");
    }
    private.extend_from_slice(
        b"end\nend\nreadonly put\nnoaccess put\n\
          dup/FontName get exch definefont pop\nmark currentfile closefile\n",
    );

    let encrypted = encrypt(&private, EEXEC_SEED);
    if hex {
        for line in encrypted.chunks(32) {
            for byte in line {
                write!(font, "{byte:02x}").unwrap();
            }
            font.push(b'\n');
        }
    } else {
        font.extend_from_slice(&encrypted);
        font.push(b'\n');
    }
    for _ in 0..8 {
        font.extend_from_slice(&[b'0'; 64]);
        font.push(b'\n');
    }
    font.extend_from_slice(b"cleartomark\n");
    font
}

/// Splits a binary Type 1 font into ASCII and binary PFB segments at the `eexec` token.
fn type1_to_pfb(font: &[u8]) -> Vec<u8> {
    const EEXEC: &[u8] = b"eexec\n";

    let split = font
        .windows(EEXEC.len())
        .position(|window| window == EEXEC)
        .unwrap()
        + EEXEC.len();
    let trailer = font
        .windows(65)
        .position(|window| window[0] == b'\n' && window[1..].iter().all(|&b| b == b'0'))
        .unwrap()
        + 1;
    pfb_segments(&[
        (1, &font[..split]),
        (2, &font[split..trailer]),
        (1, &font[trailer..]),
    ])
}

/// Builds a CID-keyed Type 1 font (Adobe-Identity-0) with a single font dictionary.
pub(crate) fn cid_type1_font(name: &str, glyphs: &[(u16, Vec<(i16, i16)>)]) -> Vec<u8> {
    const FD_BYTES: usize = 1;
    const GD_BYTES: usize = 4;
    const SD_BYTES: usize = 4;

    let cid_count = glyphs.iter().map(|(cid, _)| usize::from(*cid) + 1).max().unwrap_or(1);
    let cid_map_len = (cid_count + 1) * (FD_BYTES + GD_BYTES);
    let subr_map_offset = cid_map_len;
    let data_start = subr_map_offset + SD_BYTES;

    let mut charstrings = vec![];
    let mut cid_map = vec![];
    for cid in 0..cid_count {
        let offset = u32::try_from(data_start + charstrings.len()).unwrap();
        cid_map.push(0); // FD index
        cid_map.extend_from_slice(&offset.to_be_bytes());
        if let Some((_, points)) = glyphs.iter().find(|(glyph_cid, _)| usize::from(*glyph_cid) == cid) {
            charstrings.extend_from_slice(&type1_charstring(1_000, points));
        }
    }
    let end = u32::try_from(data_start + charstrings.len()).unwrap();
    cid_map.push(0);
    cid_map.extend_from_slice(&end.to_be_bytes());

    let mut binary = cid_map;
    binary.extend_from_slice(&u32::try_from(data_start).unwrap().to_be_bytes());
    binary.extend_from_slice(&charstrings);

    let mut font = format!(
        "%!PS-Adobe-3.0 Resource-CIDFont\n\
         %%DocumentNeededResources: ProcSet (CIDInit)\n\
         %%BeginResource: CIDFont ({name})\n\
         /CIDInit /ProcSet findresource begin\n\
         20 dict begin\n\
         /CIDFontName /{name} def\n\
         /CIDFontVersion 1 def\n\
         /CIDFontType 0 def\n\
         /CIDSystemInfo 3 dict dup begin\n\
         /Registry (Adobe) def\n\
         /Ordering (Identity) def\n\
         /Supplement 0 def\n\
         end def\n\
         /FontBBox [0 -200 1000 800] def\n\
         /CIDMapOffset 0 def\n\
         /FDBytes {FD_BYTES} def\n\
         /GDBytes {GD_BYTES} def\n\
         /CIDCount {cid_count} def\n\
         /FDArray 1 array\n\
         dup 0\n\
         %ADOBeginFontDict\n\
         14 dict begin\n\
         /FontName /{name}-Regular def\n\
         /FontType 1 def\n\
         /FontMatrix [0.001 0 0 0.001 0 0] def\n\
         /PaintType 0 def\n\
         %ADOBeginPrivateDict\n\
         /Private 15 dict dup begin\n\
         /lenIV 4 def\n\
         {PRIVATE_DICT_VALUES}\
         /SubrMapOffset {subr_map_offset} def\n\
         /SDBytes {SD_BYTES} def\n\
         /SubrCount 0 def\n\
         end def\n\
         %ADOEndPrivateDict\n\
         currentdict end\n\
         %ADOEndFontDict\n\
         put\n\
         def\n\
         %%BeginData: {len} Binary Bytes\n\
         (Binary) {len} StartData ",
        len = binary.len()
    )
    .into_bytes();
    font.extend_from_slice(&binary);
    font.extend_from_slice(b"\n%%EndData\n%%EndResource\n");
    font
}

// ---------- TrueType fixtures ----------

#[derive(Debug, Clone)]
pub(crate) struct TrueTypeGlyph {
    name: Option<String>,
    advance: u16,
    data: Vec<u8>,
}

impl TrueTypeGlyph {
    pub(crate) fn new(name: Option<&str>, advance: u16, data: Vec<u8>) -> Self {
        Self {
            name: name.map(str::to_owned),
            advance,
            data,
        }
    }
}

/// Encodes a simple `glyf` glyph from contours of `(x, y, on_curve)` points.
pub(crate) fn simple_glyph(contours: &[Vec<(i16, i16, bool)>]) -> Vec<u8> {
    let points: Vec<_> = contours.iter().flatten().copied().collect();
    let x_min = points.iter().map(|&(x, ..)| x).min().unwrap_or(0);
    let x_max = points.iter().map(|&(x, ..)| x).max().unwrap_or(0);
    let y_min = points.iter().map(|&(_, y, _)| y).min().unwrap_or(0);
    let y_max = points.iter().map(|&(_, y, _)| y).max().unwrap_or(0);

    let mut bytes = vec![];
    bytes.extend_from_slice(&i16::try_from(contours.len()).unwrap().to_be_bytes());
    for value in [x_min, y_min, x_max, y_max] {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    let mut end_point = 0;
    for contour in contours {
        end_point += contour.len();
        bytes.extend_from_slice(&u16::try_from(end_point - 1).unwrap().to_be_bytes());
    }
    bytes.extend_from_slice(&0_u16.to_be_bytes()); // instructions
    // Coordinates are encoded as full-width deltas.
    bytes.extend(points.iter().map(|&(_, _, on_curve)| u8::from(on_curve)));
    let mut prev = 0_i16;
    for &(x, ..) in &points {
        bytes.extend_from_slice(&(x - prev).to_be_bytes());
        prev = x;
    }
    prev = 0;
    for &(_, y, _) in &points {
        bytes.extend_from_slice(&(y - prev).to_be_bytes());
        prev = y;
    }
    bytes
}

/// Encodes a composite `glyf` glyph from `(glyph_id, dx, dy)` components.
pub(crate) fn composite_glyph(components: &[(u16, i16, i16)]) -> Vec<u8> {
    const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
    const ARGS_ARE_XY_VALUES: u16 = 0x0002;
    const MORE_COMPONENTS: u16 = 0x0020;

    let mut bytes = vec![];
    bytes.extend_from_slice(&(-1_i16).to_be_bytes());
    bytes.extend_from_slice(&[0; 8]); // bbox
    for (i, &(glyph_id, dx, dy)) in components.iter().enumerate() {
        let mut flags = ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES;
        if i + 1 < components.len() {
            flags |= MORE_COMPONENTS;
        }
        bytes.extend_from_slice(&flags.to_be_bytes());
        bytes.extend_from_slice(&glyph_id.to_be_bytes());
        bytes.extend_from_slice(&dx.to_be_bytes());
        bytes.extend_from_slice(&dy.to_be_bytes());
    }
    bytes
}

fn utf16_be(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

/// Builds a TrueType font with 1000 units per em, long `loca` offsets, a `name` table with
/// family and PostScript names, and a format 2 `post` table.
pub(crate) fn truetype_font(ps_name: &str, glyphs: &[TrueTypeGlyph]) -> Vec<u8> {
    let glyph_count = u16::try_from(glyphs.len()).unwrap();

    let mut head = vec![];
    head.extend_from_slice(&0x0001_0000_u32.to_be_bytes()); // version
    head.extend_from_slice(&0x0001_0000_u32.to_be_bytes()); // fontRevision
    head.extend_from_slice(&0_u32.to_be_bytes()); // checksumAdjustment
    head.extend_from_slice(&0x5f0f_3cf5_u32.to_be_bytes()); // magicNumber
    head.extend_from_slice(&0_u16.to_be_bytes()); // flags
    head.extend_from_slice(&1_000_u16.to_be_bytes()); // unitsPerEm
    head.extend_from_slice(&[0; 16]); // created, modified
    for value in [0_i16, -200, 1_000, 800] {
        head.extend_from_slice(&value.to_be_bytes());
    }
    head.extend_from_slice(&0_u16.to_be_bytes()); // macStyle
    head.extend_from_slice(&8_u16.to_be_bytes()); // lowestRecPPEM
    head.extend_from_slice(&2_i16.to_be_bytes()); // fontDirectionHint
    head.extend_from_slice(&1_i16.to_be_bytes()); // indexToLocFormat
    head.extend_from_slice(&0_i16.to_be_bytes()); // glyphDataFormat

    let mut hhea = vec![0; 34];
    hhea[..4].copy_from_slice(&0x0001_0000_u32.to_be_bytes());
    hhea.extend_from_slice(&glyph_count.to_be_bytes());

    let mut maxp = 0x0000_5000_u32.to_be_bytes().to_vec();
    maxp.extend_from_slice(&glyph_count.to_be_bytes());

    let (mut hmtx, mut loca, mut glyf) = (vec![], vec![], vec![]);
    for glyph in glyphs {
        hmtx.extend_from_slice(&glyph.advance.to_be_bytes());
        hmtx.extend_from_slice(&0_i16.to_be_bytes());
        loca.extend_from_slice(&u32::try_from(glyf.len()).unwrap().to_be_bytes());
        glyf.extend_from_slice(&glyph.data);
    }
    loca.extend_from_slice(&u32::try_from(glyf.len()).unwrap().to_be_bytes());

    let encoded_name = utf16_be(ps_name);
    let name_len = u16::try_from(encoded_name.len()).unwrap();
    let mut name = vec![];
    for value in [0_u16, 2, 6 + 12 * 2] {
        name.extend_from_slice(&value.to_be_bytes());
    }
    for (name_id, offset) in [(1_u16, 0), (6, name_len)] {
        for value in [3_u16, 1, 0x409, name_id, name_len, offset] {
            name.extend_from_slice(&value.to_be_bytes());
        }
    }
    name.extend_from_slice(&encoded_name);
    name.extend_from_slice(&encoded_name);

    let mut post = vec![];
    post.extend_from_slice(&0x0002_0000_u32.to_be_bytes());
    post.extend_from_slice(&0_u32.to_be_bytes()); // italicAngle
    post.extend_from_slice(&(-75_i16).to_be_bytes()); // underlinePosition
    post.extend_from_slice(&50_i16.to_be_bytes()); // underlineThickness
    post.extend_from_slice(&[0; 20]); // isFixedPitch, memory usage
    post.extend_from_slice(&glyph_count.to_be_bytes());
    let mut custom_names = vec![];
    for glyph in glyphs {
        let glyph_name = glyph.name.as_deref().unwrap_or(".notdef");
        let idx = MAC_GLYPH_NAMES
            .iter()
            .position(|&standard| standard == glyph_name)
            .unwrap_or_else(|| {
                custom_names.push(glyph_name);
                MAC_GLYPH_NAMES.len() + custom_names.len() - 1
            });
        post.extend_from_slice(&u16::try_from(idx).unwrap().to_be_bytes());
    }
    for glyph_name in custom_names {
        post.push(u8::try_from(glyph_name.len()).unwrap());
        post.extend_from_slice(glyph_name.as_bytes());
    }

    sfnt_with_tables(
        [0, 1, 0, 0],
        &[
            (TableTag::GLYF, &glyf),
            (TableTag::HEAD, &head),
            (TableTag::HHEA, &hhea),
            (TableTag::HMTX, &hmtx),
            (TableTag::LOCA, &loca),
            (TableTag::MAXP, &maxp),
            (TableTag::NAME, &name),
            (TableTag::POST, &post),
        ],
    )
}

// ---------- End-to-end tests ----------

const GLYPH_NAMES: [&str; 6] = [".notdef", "A", "B", "C", "D", "E"];

fn test_type1_glyphs() -> Vec<TestGlyph> {
    let triangle = |size: i16| vec![(0, 0), (size, 0), (size / 2, 700)];
    vec![
        TestGlyph::new(".notdef", 500, vec![(50, 0), (450, 0), (450, 700), (50, 700)]),
        TestGlyph::new("A", 600, triangle(500)),
        TestGlyph::new("B", 650, triangle(550)),
        TestGlyph::new("C", 700, triangle(600)),
        TestGlyph::new("D", 600, triangle(500)),
        TestGlyph::new("E", 550, triangle(450)),
    ]
}

fn test_type1_font(hex: bool) -> Vec<u8> {
    type1_font("TestFont-Regular", &test_type1_glyphs(), hex)
}

fn abc_subset() -> [SubsetGlyph; 4] {
    [
        SubsetGlyph::unmapped(0),
        SubsetGlyph::new(3, 'C'.into()),
        SubsetGlyph::new(1, 'A'.into()),
        SubsetGlyph::new(2, 'B'.into()),
    ]
}

fn embed(source: Vec<u8>, spec: &EmbeddingSpec<'_>) -> Result<Vec<u8>, EmbedError> {
    init_logger();
    let mut embedder = Embedder::new(MemoryStreams::new(source));
    embedder.make_embedding_font(spec, None)?;
    assert_eq!(embedder.streams().open_count(), 0);
    Ok(embedder.into_streams().take_destination())
}

fn table<'a>(font: &'a [u8], tag: TableTag) -> Option<&'a [u8]> {
    let directory = TableDirectory::parse(font).unwrap();
    directory.table_range(tag).map(|range| &font[range])
}

fn map_code(font: &[u8], code: u32) -> Option<u16> {
    let font_file = ReadScope::new(font).read::<FontData<'_>>().unwrap();
    let provider = font_file.table_provider(0).unwrap();
    let cmap_data = provider.read_table_data(u32::from_be_bytes(*b"cmap")).unwrap();
    let cmap = ReadScope::new(&cmap_data).read::<Cmap<'_>>().unwrap();
    let record = cmap.find_subtable(PlatformId::UNICODE, EncodingId(3)).unwrap();
    let subtable = cmap
        .scope
        .offset(record.offset as usize)
        .read::<CmapSubtable<'_>>()
        .unwrap();
    subtable.map_glyph(code).unwrap()
}

/// Parses the `CFF ` table of the output font with both the crate parser and `allsorts`.
fn parse_cff(font: &[u8]) -> (CffParser, FontInfo) {
    let cff = table(font, TableTag::CFF).expect("no CFF table");
    let cff_data = ReadScope::new(cff).read::<CFF<'_>>().unwrap();
    assert_eq!(cff_data.fonts.len(), 1);

    let mut parser = CffParser::default();
    let info = parser.begin_font(cff.to_vec(), None).unwrap();
    (parser, info)
}

#[test_casing(2, [false, true])]
fn embedding_type1_font_by_name(hex: bool) {
    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let font = embed(test_type1_font(hex), &spec).unwrap();

    assert_eq!(font[..4], *b"OTTO");
    assert!(table(&font, TableTag::CMAP).is_some());
    assert!(table(&font, TableTag::GPOS).is_none());
    // A single format 4 subtable for BMP-only mappings
    let cmap = table(&font, TableTag::CMAP).unwrap();
    assert_eq!(cmap[2..4], [0, 1]);

    for (ch, gid) in [('A', 1), ('B', 2), ('C', 3)] {
        assert_eq!(map_code(&font, ch.into()), Some(gid));
    }
    assert_eq!(map_code(&font, 'D'.into()).unwrap_or(0), 0);

    let (mut parser, info) = parse_cff(&font);
    assert_eq!(info.font_name, "TestFont-Regular");
    assert_eq!(info.glyph_count, 4);
    assert!(info.cid.is_none());
    assert_eq!(info.font_dicts[0].private.blue_values, [-20.0, 0.0, 700.0, 720.0]);

    let mut sink = RecordingSink::default();
    parser.glyph_by_name("C", &mut sink).unwrap();
    assert_eq!(sink.glyphs[0].tag, 3);
    assert_eq!(sink.glyphs[0].width, Some(700.0));
    assert_eq!(sink.glyphs[0].path.len(), 3);
    assert!(parser.glyph_by_name("D", &mut sink).is_err());
}

#[test]
fn type1_source_without_names_is_rejected() {
    init_logger();
    let glyphs = [SubsetGlyph::new(1, 'A'.into()), SubsetGlyph::new(2, 'B'.into())];
    for source in [test_type1_font(false), type1_to_pfb(&test_type1_font(false))] {
        let mut embedder = Embedder::new(MemoryStreams::new(source));
        let err = embedder
            .make_embedding_font(&EmbeddingSpec::new(&glyphs), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadSpec);
        assert!(err.to_string().contains("glyph names are required"), "{err}");
        assert_eq!(embedder.streams().open_count(), 0);
        assert!(embedder.streams().destination().is_empty());
    }
}

#[test]
fn glyph_map_is_reported_in_gid_order() {
    init_logger();
    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let mut embedder = Embedder::new(MemoryStreams::new(test_type1_font(false)));

    let mut mapped = vec![];
    embedder
        .make_embedding_font(
            &spec,
            Some(&mut |glyph: &MappedGlyph<'_>| {
                mapped.push((glyph.id, glyph.gid, glyph.name.map(str::to_owned), glyph.unicode));
            }),
        )
        .unwrap();

    assert_eq!(
        mapped,
        [
            (0, 0, Some(".notdef".to_owned()), NO_UNICODE),
            (1, 1, Some("A".to_owned()), 0x41),
            (2, 2, Some("B".to_owned()), 0x42),
            (3, 3, Some("C".to_owned()), 0x43),
        ]
    );
}

#[test]
fn duplicate_glyphs_keep_minimum_unicode() {
    let glyphs = [
        SubsetGlyph::new(1, 'a'.into()),
        SubsetGlyph::new(1, 'A'.into()),
        SubsetGlyph::new(2, 'B'.into()),
    ];
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let font = embed(test_type1_font(false), &spec).unwrap();
    assert_eq!(map_code(&font, 'A'.into()), Some(1));
    assert_eq!(map_code(&font, 'a'.into()).unwrap_or(0), 0);
    let (_, info) = parse_cff(&font);
    assert_eq!(info.glyph_count, 3);
}

#[test]
fn virtual_glyphs_are_mapped_in_cmap() {
    let glyphs = [
        SubsetGlyph::new(1, 'A'.into()),
        SubsetGlyph::new(VID_BEGIN, 0x2126),
        SubsetGlyph::new(VID_BEGIN + 1, 0x1_f600),
    ];
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let font = embed(test_type1_font(false), &spec).unwrap();

    assert_eq!(map_code(&font, 'A'.into()), Some(1));
    assert_eq!(map_code(&font, 0x2126), Some(VID_BEGIN));
    // Virtual glyphs are not present in the CFF table.
    let (_, info) = parse_cff(&font);
    assert_eq!(info.glyph_count, 2);
    // A supplementary code adds a format 12 subtable.
    let cmap = table(&font, TableTag::CMAP).unwrap();
    assert_eq!(cmap[2..4], [0, 2]);
}

#[test]
fn embedding_with_kerning() {
    let glyphs = abc_subset();
    // The duplicate pair with the smaller absolute value survives.
    let kern = [KernPair::new(1, 2, -50), KernPair::new(2, 3, 20), KernPair::new(1, 2, 30)];
    let spec = EmbeddingSpec::new(&glyphs)
        .with_names(&GLYPH_NAMES)
        .with_kerning(&kern);
    let font = embed(test_type1_font(false), &spec).unwrap();
    let gpos = table(&font, TableTag::GPOS).expect("no GPOS table");
    assert_eq!(gpos[..4], [0, 1, 0, 0]);
    let font_file = ReadScope::new(&font).read::<FontData<'_>>().unwrap();
    let provider = font_file.table_provider(0).unwrap();
    let gpos_data = provider.read_table_data(u32::from_be_bytes(*b"GPOS")).unwrap();
    assert_eq!(*gpos_data, *gpos);

    // Pairs referencing glyphs outside the subset are rejected.
    let kern = [KernPair::new(1, 5, -10)];
    let spec = EmbeddingSpec::new(&glyphs)
        .with_names(&GLYPH_NAMES)
        .with_kerning(&kern);
    let err = embed(test_type1_font(false), &spec).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSpec);
}

#[test]
fn duplicate_unicode_values_are_rejected() {
    let glyphs = [SubsetGlyph::new(1, 'A'.into()), SubsetGlyph::new(2, 'A'.into())];
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let err = embed(test_type1_font(false), &spec).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSpec);
}

#[test]
fn forcing_language_group() {
    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs)
        .with_names(&GLYPH_NAMES)
        .with_flags(EmbedFlags::FORCE_LANGUAGE_GROUP_1);
    let font = embed(test_type1_font(false), &spec).unwrap();
    let (_, info) = parse_cff(&font);
    assert!(!info.font_dicts.is_empty());
    for dict in &info.font_dicts {
        assert_eq!(dict.private.language_group, 1);
    }

    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let font = embed(test_type1_font(false), &spec).unwrap();
    let (_, info) = parse_cff(&font);
    assert_eq!(info.font_dicts[0].private.language_group, 0);
}

#[test]
fn renaming_font() {
    let glyphs = abc_subset();
    let mut spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    spec.new_font_name = Some("ABCDEF+TestFont");
    let font = embed(test_type1_font(false), &spec).unwrap();
    let (_, info) = parse_cff(&font);
    assert_eq!(info.font_name, "ABCDEF+TestFont");
}

#[test_casing(2, [EmbedFlags::empty(), EmbedFlags::FORCE_IDENTITY_ROS])]
fn embedding_cid_keyed_font(flags: EmbedFlags) {
    let source = cid_type1_font(
        "TestCID",
        &[
            (0, vec![]),
            (5, vec![(0, 0), (100, 0), (100, 100)]),
            (7, vec![(0, 0), (200, 0), (100, 300)]),
        ],
    );
    // Names are ignored for CID-keyed sources.
    let glyphs = [SubsetGlyph::new(7, 'X'.into()), SubsetGlyph::new(5, 'Y'.into())];
    let spec = EmbeddingSpec::new(&glyphs).with_flags(flags);
    let font = embed(source, &spec).unwrap();

    assert_eq!(map_code(&font, 'Y'.into()), Some(1));
    assert_eq!(map_code(&font, 'X'.into()), Some(2));

    let (mut parser, info) = parse_cff(&font);
    assert_eq!(info.glyph_count, 3);
    let cid = info.cid.as_ref().expect("output is not CID-keyed");
    assert_eq!((cid.registry.as_str(), cid.ordering.as_str()), ("Adobe", "Identity"));
    assert_eq!(cid.supplement, 0);
    assert_eq!(info.font_dicts.len(), 1);

    let mut sink = RecordingSink::default();
    parser.glyph_by_cid(7, &mut sink).unwrap();
    assert_eq!(sink.glyphs[0].cid, Some(7));
    assert_eq!(sink.glyphs[0].tag, 2);
}

fn test_truetype_font() -> Vec<u8> {
    truetype_font(
        "TestTrueType",
        &[
            TrueTypeGlyph::new(Some(".notdef"), 500, vec![]),
            TrueTypeGlyph::new(
                Some("A"),
                600,
                simple_glyph(&[vec![(0, 0, true), (250, 700, false), (500, 0, true)]]),
            ),
            TrueTypeGlyph::new(
                Some("B"),
                650,
                simple_glyph(&[
                    vec![(0, 0, true), (500, 0, true), (500, 700, true), (0, 700, true)],
                    vec![(100, 100, true), (100, 600, true), (400, 600, true), (400, 100, true)],
                ]),
            ),
        ],
    )
}

#[test]
fn embedding_truetype_font() {
    let glyphs = [SubsetGlyph::new(2, 'B'.into()), SubsetGlyph::new(1, 'A'.into())];
    let font = embed(test_truetype_font(), &EmbeddingSpec::new(&glyphs)).unwrap();
    assert_eq!(map_code(&font, 'A'.into()), Some(1));
    assert_eq!(map_code(&font, 'B'.into()), Some(2));

    let (mut parser, info) = parse_cff(&font);
    assert_eq!(info.font_name, "TestTrueType");
    assert_eq!(info.glyph_count, 3);

    let mut sink = RecordingSink::default();
    parser.glyph_by_tag(1, &mut sink).unwrap();
    assert_eq!(sink.glyphs[0].width, Some(600.0));
    // Quadratic curve converted to a cubic one
    assert!(sink.glyphs[0]
        .path
        .iter()
        .any(|op| matches!(op, crate::glyph::PathOp::Curve(_))));
    parser.glyph_by_tag(2, &mut sink).unwrap();
    let moves = sink.glyphs[1]
        .path
        .iter()
        .filter(|op| matches!(op, crate::glyph::PathOp::Move(..)))
        .count();
    assert_eq!(moves, 2);
}

#[test]
fn subsetting_naked_cff_font() {
    // Naked CFF source with `.notdef` and `A`..`E`
    let all_glyphs: Vec<_> = (0..6_u16)
        .map(|id| match id {
            0 => SubsetGlyph::unmapped(0),
            _ => SubsetGlyph::new(id, 0x40 + u32::from(id)),
        })
        .collect();
    let spec = EmbeddingSpec::new(&all_glyphs).with_names(&GLYPH_NAMES);
    let font = embed(test_type1_font(false), &spec).unwrap();
    let cff = table(&font, TableTag::CFF).unwrap().to_vec();
    assert_eq!(cff[..2], [1, 0]);
    let (_, info) = parse_cff(&font);
    assert_eq!(info.glyph_count, 6);

    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let font = embed(cff, &spec).unwrap();

    let (mut parser, info) = parse_cff(&font);
    assert_eq!(info.glyph_count, 4);
    let mut sink = RecordingSink::default();
    parser.glyph_by_tag(0, &mut sink).unwrap();
    assert_eq!(sink.glyphs[0].name.as_deref(), Some(".notdef"));

    // A single format 4 subtable mapping exactly `A`, `B` and `C`
    let cmap = table(&font, TableTag::CMAP).unwrap();
    assert_eq!(cmap[2..4], [0, 1]);
    let offset = usize::try_from(u32::from_be_bytes(cmap[8..12].try_into().unwrap())).unwrap();
    assert_eq!(cmap[offset..offset + 2], [0, 4]);
    for (ch, gid) in [('A', 1), ('B', 2), ('C', 3)] {
        assert_eq!(map_code(&font, ch.into()), Some(gid));
    }
    for ch in ['D', 'E', '@'] {
        assert_eq!(map_code(&font, ch.into()).unwrap_or(0), 0);
    }
    assert!(table(&font, TableTag::GPOS).is_none());
}

#[test]
fn reembedding_cff_output() {
    // The CFF table of a CEF font is a valid naked CFF source.
    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let font = embed(test_type1_font(false), &spec).unwrap();
    let cff = table(&font, TableTag::CFF).unwrap().to_vec();

    let names = [".notdef", "A", "B", "C"];
    let glyphs = [SubsetGlyph::new(2, 'B'.into())];
    let spec = EmbeddingSpec::new(&glyphs).with_names(&names);
    let font = embed(cff, &spec).unwrap();
    assert_eq!(map_code(&font, 'B'.into()), Some(1));
    let (_, info) = parse_cff(&font);
    assert_eq!(info.glyph_count, 2);
}

#[test]
fn writing_svg_font() {
    init_logger();
    let glyphs = [
        SubsetGlyph::new(1, 'A'.into()),
        SubsetGlyph::unmapped(2),
        SubsetGlyph::new(3, 0xe000),
    ];
    let kern = [KernPair::new(1, 2, -40)];
    let spec = EmbeddingSpec::new(&glyphs)
        .with_names(&GLYPH_NAMES)
        .with_flags(EmbedFlags::WRITE_SVG)
        .with_kerning(&kern);
    let mut embedder = Embedder::new(MemoryStreams::new(test_type1_font(true)));
    embedder.set_svg_flags(SvgFlags::STANDALONE);

    let mut mapped = vec![];
    let mut record = |glyph: &MappedGlyph<'_>| mapped.push((glyph.id, glyph.unicode));
    embedder.make_embedding_font(&spec, Some(&mut record)).unwrap();
    // U+E000 is already used, so the unmapped glyph gets the next private-use value.
    assert_eq!(mapped, [(0, NO_UNICODE), (1, 0x41), (2, 0xe001), (3, 0xe000)]);

    let svg = String::from_utf8(embedder.streams_mut().take_destination()).unwrap();
    assert!(svg.starts_with("<?xml version=\"1.0\" standalone=\"no\"?>\n"), "{svg}");
    assert!(svg.contains("<font id=\"TestFont-Regular\" horiz-adv-x=\"500\">"), "{svg}");
    assert!(svg.contains("<font-face font-family=\"TestFont\" units-per-em=\"1000\""), "{svg}");
    assert!(svg.contains("<missing-glyph horiz-adv-x=\"500\" d=\"M50 0"), "{svg}");
    assert!(
        svg.contains(
            "<glyph unicode=\"&#x41;\" glyph-name=\"A\" horiz-adv-x=\"600\" \
             d=\"M0 0 L500 0 L250 700 Z\"/>"
        ),
        "{svg}"
    );
    assert!(svg.contains("<glyph unicode=\"&#xE001;\" glyph-name=\"B\""), "{svg}");
    assert!(svg.contains("<hkern u1=\"&#x41;\" u2=\"&#xE001;\" k=\"40\"/>"), "{svg}");
    assert!(svg.ends_with("</font>\n</defs>\n</svg>\n"), "{svg}");
    assert_eq!(embedder.streams().open_count(), 0);
}

#[test]
fn svg_with_forced_language_group_is_rejected() {
    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs)
        .with_flags(EmbedFlags::WRITE_SVG | EmbedFlags::FORCE_LANGUAGE_GROUP_1);
    let err = embed(test_type1_font(false), &spec).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSpec);
}

#[test]
fn failed_call_leaves_embedder_usable() {
    init_logger();
    let mut embedder = Embedder::new(MemoryStreams::new(test_type1_font(false)));

    // Names are required for a Type 1 source; the error surfaces after the streams are opened.
    let glyphs = [SubsetGlyph::new(1, 'A'.into())];
    let err = embedder
        .make_embedding_font(&EmbeddingSpec::new(&glyphs), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSpec);
    assert_eq!(embedder.streams().open_count(), 0);

    // Unknown name
    let names = [".notdef", "A", "Missing"];
    let glyphs = [SubsetGlyph::new(2, 'M'.into())];
    let spec = EmbeddingSpec::new(&glyphs).with_names(&names);
    let err = embedder.make_embedding_font(&spec, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type1Parse);
    assert_eq!(embedder.streams().open_count(), 0);

    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    embedder.make_embedding_font(&spec, None).unwrap();
    let font = embedder.streams_mut().take_destination();
    assert_eq!(map_code(&font, 'C'.into()), Some(3));

    // The source can be replaced between calls.
    embedder.streams_mut().set_source(test_truetype_font());
    let glyphs = [SubsetGlyph::new(1, 'A'.into())];
    embedder
        .make_embedding_font(&EmbeddingSpec::new(&glyphs), None)
        .unwrap();
    let font = embedder.streams_mut().take_destination();
    let (_, info) = parse_cff(&font);
    assert_eq!(info.font_name, "TestTrueType");
}

#[test]
fn invalid_specs() {
    let glyphs = abc_subset();
    let err = embed(test_type1_font(false), &EmbeddingSpec::new(&[])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSpec);

    let mut spec = EmbeddingSpec::new(&glyphs);
    spec.url = Some("https://example.com/font");
    let err = embed(test_type1_font(false), &spec).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);

    let spec = EmbeddingSpec::new(&glyphs).with_names(&["A", "B", "C", "D"]);
    let err = embed(test_type1_font(false), &spec).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSpec);

    let udv = [0.5; 5];
    let mut spec = EmbeddingSpec::new(&glyphs);
    spec.udv = Some(udv.as_slice());
    let err = embed(test_type1_font(false), &spec).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSpec);
}

#[derive(Debug, Default)]
struct GlyphCountTable {
    reuses: usize,
}

impl TableHandler for GlyphCountTable {
    fn tag(&self) -> TableTag {
        TableTag(*b"GCNT")
    }

    fn fill_seq(&self) -> u32 {
        40
    }

    fn write_seq(&self) -> u32 {
        5
    }

    fn fill(&mut self, context: &mut SfntContext<'_>) -> Result<bool, EmbedError> {
        Ok(context.glyph_count() > 0)
    }

    fn write(&mut self, context: &mut SfntContext<'_>, out: &mut Vec<u8>) -> Result<(), EmbedError> {
        let count = u16::try_from(context.glyph_count())
            .map_err(|_| EmbedError::new(ErrorKind::SfntWrite, "too many glyphs"))?;
        out.extend_from_slice(&count.to_be_bytes());
        out.extend_from_slice(context.font_name().as_bytes());
        Ok(())
    }

    fn reuse(&mut self) {
        self.reuses += 1;
    }
}

#[test]
fn registered_table_is_written() {
    init_logger();
    let mut embedder = Embedder::new(MemoryStreams::new(test_type1_font(false)));
    embedder.register_table(Box::new(GlyphCountTable::default()));
    assert!(format!("{embedder:?}").contains("GCNT"));

    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    embedder.make_embedding_font(&spec, None).unwrap();
    let font = embedder.streams_mut().take_destination();

    let directory = TableDirectory::parse(&font).unwrap();
    let range = directory.table_range(TableTag(*b"GCNT")).unwrap();
    assert_eq!(font[range.clone()], *b"\0\x04TestFont-Regular");
    // Written before built-in tables
    let cff = directory.table_range(TableTag::CFF).unwrap();
    assert!(range.start < cff.start);

    // Registered tables are reused across calls.
    embedder.make_embedding_font(&spec, None).unwrap();
    assert_eq!(embedder.streams_mut().take_destination(), font);
}

#[test]
fn conflicting_registered_table_is_rejected() {
    #[derive(Debug)]
    struct FakeCmap;

    impl TableHandler for FakeCmap {
        fn tag(&self) -> TableTag {
            TableTag::CMAP
        }

        fn fill_seq(&self) -> u32 {
            50
        }

        fn write_seq(&self) -> u32 {
            50
        }

        fn fill(&mut self, _: &mut SfntContext<'_>) -> Result<bool, EmbedError> {
            Ok(true)
        }

        fn write(&mut self, _: &mut SfntContext<'_>, _: &mut Vec<u8>) -> Result<(), EmbedError> {
            Ok(())
        }
    }

    let mut embedder = Embedder::new(MemoryStreams::new(test_type1_font(false)));
    embedder.register_table(Box::new(FakeCmap));
    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let err = embedder.make_embedding_font(&spec, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SfntWrite);
    assert_eq!(embedder.streams().open_count(), 0);
}

#[test_casing(4, [1, 7, 512, 4_096])]
fn pfb_and_pfa_sources_are_equivalent(chunk_len: usize) {
    init_logger();
    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let pfa = test_type1_font(false);
    let expected = embed(pfa.clone(), &spec).unwrap();

    let mut embedder = Embedder::new(MemoryStreams::new(type1_to_pfb(&pfa)));
    embedder.set_read_chunk_len(chunk_len);
    embedder.make_embedding_font(&spec, None).unwrap();
    assert_eq!(embedder.streams_mut().take_destination(), expected);

    let post = post_resource_fork(&[(501, 1, pfa.as_slice()), (502, 5, b"")]);
    embedder.streams_mut().set_source(post);
    embedder.make_embedding_font(&spec, None).unwrap();
    assert_eq!(embedder.streams_mut().take_destination(), expected);
}

#[test]
fn wrapped_type1_source() {
    let mut wrapped = vec![0; 28];
    wrapped.extend_from_slice(&test_type1_font(true));
    let source = sfnt_with_tables(*b"typ1", &[(TableTag(*b"TYP1"), &wrapped)]);
    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    let font = embed(source, &spec).unwrap();
    let (_, info) = parse_cff(&font);
    assert_eq!(info.glyph_count, 4);
}

#[test]
fn embedding_with_file_streams() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("TestFont.pfa");
    let destination_path = dir.path().join("TestFont.cef");
    fs::write(&source_path, test_type1_font(true)).unwrap();

    let mut embedder = Embedder::new(FileStreams::new(&source_path, &destination_path));
    let glyphs = abc_subset();
    let spec = EmbeddingSpec::new(&glyphs).with_names(&GLYPH_NAMES);
    embedder.make_embedding_font(&spec, None).unwrap();

    let font = fs::read(&destination_path).unwrap();
    let expected = embed(test_type1_font(true), &spec).unwrap();
    assert_eq!(font, expected);

    // A missing source is reported as a source stream error.
    let mut embedder = Embedder::new(FileStreams::new(
        dir.path().join("missing.pfa"),
        &destination_path,
    ));
    let err = embedder.make_embedding_font(&spec, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceStream);
}

#[test]
fn embedder_is_send() {
    fn assert_send<T: Send>(_: &T) {}

    let embedder = Embedder::new(MemoryStreams::default());
    assert_send(&embedder);
}

#[test]
fn reporting_versions() {
    let mut reported = vec![];
    crate::versions(|name, version| reported.push((name.to_owned(), version.to_owned())));
    assert_eq!(reported[0].0, "font-embed");
    assert!(reported.iter().all(|(_, version)| version == env!("CARGO_PKG_VERSION")));
    assert!(reported.iter().any(|(name, _)| name == "sfnt"));
}
