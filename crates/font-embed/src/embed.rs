//! Embedding orchestrator.

use core::fmt;

use crate::{
    errors::EmbedError,
    font::{CffParser, CidInfo, FontInfo, FontParser, TrueTypeParser, Type1Parser},
    glyph::{GlyphAction, GlyphInfo, GlyphSink, Seac},
    gpos::KernBuilder,
    sniff::{self, FontTechnology},
    spec::{EmbedFlags, EmbeddingSpec, MappedGlyph, NO_UNICODE},
    stream::{OpenStreams, SourceReader, StreamProvider, StreamRole},
    subset::GlyphTable,
    write::{CffWriter, SfntContext, SfntPacker, SvgFlags, SvgSession, UnicodeAllocator},
    TableHandler,
};

/// How glyphs are requested from the source parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retrieval {
    ByCid,
    ByName,
    ByTag,
}

impl Retrieval {
    fn new(
        technology: FontTechnology,
        info: &FontInfo,
        glyphs: &GlyphTable,
    ) -> Result<Self, EmbedError> {
        Ok(if info.cid.is_some() {
            Self::ByCid
        } else if glyphs.has_names() {
            Self::ByName
        } else if technology == FontTechnology::Type1 {
            return Err(EmbedError::bad_spec(
                "glyph names are required for name-keyed sources",
            ));
        } else {
            Self::ByTag
        })
    }
}

/// Wraps the output writer, assigning the next output GID to each delivered glyph.
struct SubsetSink<'a> {
    inner: &'a mut dyn GlyphSink,
    glyphs: &'a mut GlyphTable,
    id: u16,
    gid: Option<u16>,
}

impl GlyphSink for SubsetSink<'_> {
    fn begin(&mut self, info: &GlyphInfo<'_>) -> Result<GlyphAction, EmbedError> {
        if self.gid.is_some() {
            return Err(EmbedError::internal(format_args!(
                "parser delivered several glyphs for id {}",
                self.id
            )));
        }
        let gid = self.glyphs.assign_gid(self.id)?;
        log::trace!("glyph {} (source tag {}) -> GID {gid}", self.id, info.tag);
        self.gid = Some(gid);
        self.inner.begin(info)
    }

    fn width(&mut self, width: f32) {
        self.inner.width(width);
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.inner.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.inner.line_to(x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) {
        self.inner.curve_to(x1, y1, x2, y2, x3, y3);
    }

    fn stem(&mut self, edge: f32, width: f32, vertical: bool) {
        self.inner.stem(edge, width, vertical);
    }

    fn flex(&mut self, depth: f32, curves: &[[f32; 6]; 2]) {
        self.inner.flex(depth, curves);
    }

    fn generic_op(&mut self, op: u16, args: &[f32]) {
        self.inner.generic_op(op, args);
    }

    fn seac(&mut self, seac: &Seac) {
        self.inner.seac(seac);
    }

    fn end(&mut self) -> Result<(), EmbedError> {
        self.inner.end()
    }
}

fn retrieve_glyph(
    parser: &mut dyn FontParser,
    glyphs: &mut GlyphTable,
    retrieval: Retrieval,
    id: u16,
    output: &mut dyn GlyphSink,
) -> Result<(), EmbedError> {
    let name = match retrieval {
        Retrieval::ByName => glyphs.get(id).and_then(|entry| entry.name.clone()),
        Retrieval::ByCid | Retrieval::ByTag => None,
    };
    let mut sink = SubsetSink {
        inner: output,
        glyphs,
        id,
        gid: None,
    };
    match (retrieval, &name) {
        (Retrieval::ByCid, _) => parser.glyph_by_cid(id, &mut sink)?,
        (Retrieval::ByName, Some(name)) => parser.glyph_by_name(name, &mut sink)?,
        (Retrieval::ByName, None) => {
            return Err(EmbedError::internal(format_args!("glyph {id} has no name")));
        }
        (Retrieval::ByTag, _) => parser.glyph_by_tag(id, &mut sink)?,
    }

    if sink.gid.is_none() {
        return Err(EmbedError::internal(format_args!(
            "parser did not deliver glyph {id}"
        )));
    }
    Ok(())
}

/// Lazily constructed source parsers, one per font technology.
#[derive(Debug, Default)]
struct Parsers {
    type1: Option<Type1Parser>,
    cff: Option<CffParser>,
    truetype: Option<TrueTypeParser>,
}

impl Parsers {
    fn get(&mut self, technology: FontTechnology) -> &mut dyn FontParser {
        match technology {
            FontTechnology::Type1 => self.type1.get_or_insert_with(Type1Parser::default),
            FontTechnology::Cff => self.cff.get_or_insert_with(CffParser::default),
            FontTechnology::TrueType => self.truetype.get_or_insert_with(TrueTypeParser::default),
        }
    }
}

/// Per-call accumulators reused across calls.
#[derive(Debug, Default)]
struct EmbedState {
    glyphs: GlyphTable,
    kern: KernBuilder,
    cff_writer: CffWriter,
    packer: SfntPacker,
    unicodes: UnicodeAllocator,
    /// Glyph request order.
    order: Vec<u16>,
}

impl EmbedState {
    #[allow(clippy::too_many_arguments)]
    fn embed<P: StreamProvider>(
        &mut self,
        streams: &mut OpenStreams<'_, P>,
        parsers: &mut Parsers,
        tables: &mut [Box<dyn TableHandler>],
        spec: &EmbeddingSpec<'_>,
        svg_flags: SvgFlags,
        read_chunk_len: usize,
    ) -> Result<(), EmbedError> {
        streams.open(StreamRole::Source)?;
        streams.open(StreamRole::Destination)?;

        let source = {
            let stream = streams.get(StreamRole::Source)?;
            let mut reader = SourceReader::new(stream, read_chunk_len)
                .map_err(|err| StreamRole::Source.io_error(err))?;
            sniff::detect(&mut reader)?
        };

        let parser = parsers.get(source.technology);
        let mut info = parser.begin_font(source.data, spec.udv)?;
        log::debug!(
            "source font `{}`: {} glyphs, CID-keyed: {}",
            info.font_name,
            info.glyph_count,
            info.cid.is_some()
        );
        if let Some(name) = spec.new_font_name {
            info.font_name = name.to_owned();
        }

        self.order.clear();
        self.order.extend(self.glyphs.request_order());
        let result = match Retrieval::new(source.technology, &info, &self.glyphs) {
            Ok(retrieval) if spec.flags.contains(EmbedFlags::WRITE_SVG) => {
                self.write_svg(parser, retrieval, &info, streams, spec, svg_flags)
            }
            Ok(retrieval) => self.write_cef(parser, retrieval, &mut info, streams, spec, tables),
            Err(err) => Err(err),
        };
        parser.end_font();
        result
    }

    fn write_cef<P: StreamProvider>(
        &mut self,
        parser: &mut dyn FontParser,
        retrieval: Retrieval,
        info: &mut FontInfo,
        streams: &mut OpenStreams<'_, P>,
        spec: &EmbeddingSpec<'_>,
        tables: &mut [Box<dyn TableHandler>],
    ) -> Result<(), EmbedError> {
        streams.open(StreamRole::Temp0)?;
        streams.open(StreamRole::Temp1)?;

        if spec.flags.contains(EmbedFlags::FORCE_LANGUAGE_GROUP_1) {
            for dict in &mut info.font_dicts {
                dict.private.language_group = 1;
            }
        }
        if spec.flags.contains(EmbedFlags::FORCE_IDENTITY_ROS) {
            if let Some(cid) = &mut info.cid {
                *cid = CidInfo::adobe_identity();
            }
        }

        let (temp0, temp1) = streams.temps()?;
        let mut session = self.cff_writer.begin_font(temp1);
        log::trace!("retrieving {} glyphs ({retrieval:?})", self.order.len());
        for &id in &self.order {
            retrieve_glyph(parser, &mut self.glyphs, retrieval, id, &mut session)?;
        }
        let cff_len = session.end_font(info, temp0)?;

        self.kern.normalize(spec.kern, &self.glyphs)?;
        let (destination, temp0) = streams.destination_and_temp0()?;
        let mut context = SfntContext {
            font_name: &info.font_name,
            glyphs: &self.glyphs,
            kern: &self.kern,
            cff: temp0,
            cff_len,
        };
        self.packer.pack(&mut context, tables, destination)?;
        Ok(())
    }

    fn write_svg<P: StreamProvider>(
        &mut self,
        parser: &mut dyn FontParser,
        retrieval: Retrieval,
        info: &FontInfo,
        streams: &mut OpenStreams<'_, P>,
        spec: &EmbeddingSpec<'_>,
        svg_flags: SvgFlags,
    ) -> Result<(), EmbedError> {
        self.unicodes.reset(self.glyphs.used_unicodes());
        let notdef_id = self.glyphs.notdef_id();

        let destination = streams.get(StreamRole::Destination)?;
        let mut session = SvgSession::begin_font(destination, svg_flags, info);
        for &id in &self.order {
            let unicode = match self.glyphs.get(id).map(|entry| entry.unicode) {
                _ if id == notdef_id => NO_UNICODE,
                Some(NO_UNICODE) | None => {
                    let unicode = self.unicodes.allocate()?;
                    self.glyphs.set_unicode(id, unicode);
                    unicode
                }
                Some(unicode) => unicode,
            };
            session.set_next_unicode(unicode);
            retrieve_glyph(parser, &mut self.glyphs, retrieval, id, &mut session)?;
        }

        self.kern.normalize(spec.kern, &self.glyphs)?;
        session.end_font(self.kern.pairs())?;
        Ok(())
    }
}

/// Font embedding context.
///
/// An embedder owns the stream provider, lazily constructed source parsers, registered tables
/// and accumulators reused across [`Self::make_embedding_font()`] calls. It stays usable after
/// a failed call.
///
/// # Examples
///
/// ```
/// use font_embed::{EmbeddingSpec, Embedder, ErrorKind, MemoryStreams, SubsetGlyph};
///
/// let mut embedder = Embedder::new(MemoryStreams::new(b"not a font".to_vec()));
/// let glyphs = [SubsetGlyph::new(1, 'A'.into())];
/// let err = embedder
///     .make_embedding_font(&EmbeddingSpec::new(&glyphs), None)
///     .unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::UnknownFontType);
/// // All streams are closed after the call.
/// assert_eq!(embedder.streams().open_count(), 0);
/// ```
pub struct Embedder<P> {
    streams: P,
    parsers: Parsers,
    state: EmbedState,
    tables: Vec<Box<dyn TableHandler>>,
    svg_flags: SvgFlags,
    read_chunk_len: usize,
}

impl<P: fmt::Debug> fmt::Debug for Embedder<P> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table_tags: Vec<_> = self.tables.iter().map(|table| table.tag()).collect();
        formatter
            .debug_struct("Embedder")
            .field("streams", &self.streams)
            .field("parsers", &self.parsers)
            .field("tables", &table_tags)
            .field("svg_flags", &self.svg_flags)
            .field("read_chunk_len", &self.read_chunk_len)
            .finish_non_exhaustive()
    }
}

impl<P: StreamProvider> Embedder<P> {
    /// Creates an embedder with the specified stream provider.
    pub fn new(streams: P) -> Self {
        Self {
            streams,
            parsers: Parsers::default(),
            state: EmbedState::default(),
            tables: vec![],
            svg_flags: SvgFlags::default(),
            read_chunk_len: SourceReader::DEFAULT_CHUNK_LEN,
        }
    }

    /// Returns a shared reference to the stream provider.
    pub fn streams(&self) -> &P {
        &self.streams
    }

    /// Returns an exclusive reference to the stream provider, e.g. to change the source
    /// between calls.
    pub fn streams_mut(&mut self) -> &mut P {
        &mut self.streams
    }

    /// Consumes this embedder and returns the stream provider.
    pub fn into_streams(self) -> P {
        self.streams
    }

    /// Registers an additional table written to CEF output.
    pub fn register_table(&mut self, table: Box<dyn TableHandler>) {
        log::debug!("registered table {}", table.tag());
        self.tables.push(table);
    }

    /// Sets flags for SVG output.
    pub fn set_svg_flags(&mut self, flags: SvgFlags) {
        self.svg_flags = flags;
    }

    /// Sets the length of chunks in which the source stream is read. Values less than 1
    /// are treated as 1.
    pub fn set_read_chunk_len(&mut self, len: usize) {
        self.read_chunk_len = len.max(1);
    }

    /// Produces an embedding font according to `spec`, reading the source font from
    /// the [`Source`](StreamRole::Source) stream and writing a CEF or SVG font to
    /// the [`Destination`](StreamRole::Destination) stream.
    ///
    /// If provided, `glyph_map` is called once for each output glyph in the ascending
    /// output GID order after the font is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is invalid, the source font cannot be read or parsed,
    /// a requested glyph is missing from the source, or the output cannot be written.
    /// All opened streams are closed regardless of the outcome.
    pub fn make_embedding_font(
        &mut self,
        spec: &EmbeddingSpec<'_>,
        glyph_map: Option<&mut dyn FnMut(&MappedGlyph<'_>)>,
    ) -> Result<(), EmbedError> {
        log::debug!("starting embedding with flags {:?}", spec.flags);
        spec.validate()?;
        self.state.glyphs.normalize(&spec.subset)?;

        let mut streams = OpenStreams::new(&mut self.streams);
        let result = self.state.embed(
            &mut streams,
            &mut self.parsers,
            &mut self.tables,
            spec,
            self.svg_flags,
            self.read_chunk_len,
        );
        let closed = streams.close_all();
        if let Err(err) = &result {
            log::debug!("embedding failed: {err}");
        }
        result?;
        closed?;

        if let Some(glyph_map) = glyph_map {
            for entry in self.state.glyphs.by_gid() {
                let Some(gid) = entry.gid else {
                    continue;
                };
                glyph_map(&MappedGlyph {
                    id: entry.id,
                    gid,
                    name: entry.name.as_deref(),
                    unicode: entry.unicode,
                });
            }
        }
        Ok(())
    }
}
