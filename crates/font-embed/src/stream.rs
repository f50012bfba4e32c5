//! Client-supplied streams and the buffered source reader.

use std::{
    fs, io,
    io::{Read, Seek, SeekFrom, Write},
    mem,
    path::PathBuf,
};

use crate::errors::{extend_zeroed, EmbedError, ErrorKind};

/// Role of a stream requested by the [`Embedder`](crate::Embedder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamRole {
    /// Read-only source font bytes.
    Source,
    /// Write-only output (CEF or SVG font).
    Destination,
    /// Scratch stream holding the CFF table while the sfnt container is assembled.
    Temp0,
    /// Scratch stream holding charstrings while the CFF table is assembled.
    Temp1,
}

impl StreamRole {
    const ALL: [Self; 4] = [Self::Source, Self::Destination, Self::Temp0, Self::Temp1];

    const fn index(self) -> usize {
        match self {
            Self::Source => 0,
            Self::Destination => 1,
            Self::Temp0 => 2,
            Self::Temp1 => 3,
        }
    }

    pub(crate) fn error_kind(self) -> ErrorKind {
        match self {
            Self::Source => ErrorKind::SourceStream,
            Self::Destination => ErrorKind::DestinationStream,
            Self::Temp0 | Self::Temp1 => ErrorKind::TempStream,
        }
    }

    pub(crate) fn io_error(self, err: io::Error) -> EmbedError {
        EmbedError::new(self.error_kind(), err)
    }
}

/// Byte stream that can be used in any [`StreamRole`].
pub trait ClientStream: Read + Write + Seek {}

impl<T: Read + Write + Seek> ClientStream for T {}

/// Provider of streams for the [`Embedder`](crate::Embedder).
///
/// Each embedding call opens the source and destination streams, and (for CEF output)
/// both scratch streams. Every stream opened during a call is handed back via
/// [`Self::close()`] before the call returns, regardless of its outcome.
pub trait StreamProvider {
    /// Stream type.
    type Stream: ClientStream;

    /// Opens a stream with the specified role.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the stream cannot be opened.
    fn open(&mut self, role: StreamRole) -> io::Result<Self::Stream>;

    /// Closes a previously opened stream.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if closing fails (e.g., the destination cannot be flushed).
    fn close(&mut self, role: StreamRole, stream: Self::Stream) -> io::Result<()>;
}

/// In-memory [`StreamProvider`]. The source is supplied as a byte buffer; the output
/// can be retrieved after the embedding call.
#[derive(Debug, Default)]
pub struct MemoryStreams {
    source: Vec<u8>,
    destination: Vec<u8>,
    open_count: usize,
}

impl MemoryStreams {
    /// Creates streams with the specified source bytes.
    pub fn new(source: impl Into<Vec<u8>>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Replaces the source bytes, e.g. to reuse an embedder for another font.
    pub fn set_source(&mut self, source: impl Into<Vec<u8>>) {
        self.source = source.into();
    }

    /// Returns bytes written to the destination stream by the last call.
    pub fn destination(&self) -> &[u8] {
        &self.destination
    }

    /// Takes the bytes written to the destination stream by the last call.
    pub fn take_destination(&mut self) -> Vec<u8> {
        mem::take(&mut self.destination)
    }

    /// Returns the number of currently open streams.
    pub fn open_count(&self) -> usize {
        self.open_count
    }
}

impl StreamProvider for MemoryStreams {
    type Stream = io::Cursor<Vec<u8>>;

    fn open(&mut self, role: StreamRole) -> io::Result<Self::Stream> {
        self.open_count += 1;
        Ok(match role {
            StreamRole::Source => io::Cursor::new(mem::take(&mut self.source)),
            StreamRole::Destination | StreamRole::Temp0 | StreamRole::Temp1 => {
                io::Cursor::new(Vec::new())
            }
        })
    }

    fn close(&mut self, role: StreamRole, stream: Self::Stream) -> io::Result<()> {
        self.open_count -= 1;
        match role {
            StreamRole::Source => self.source = stream.into_inner(),
            StreamRole::Destination => self.destination = stream.into_inner(),
            StreamRole::Temp0 | StreamRole::Temp1 => { /* scratch data is discarded */ }
        }
        Ok(())
    }
}

/// File-backed [`StreamProvider`]. Scratch streams are anonymous temporary files.
#[derive(Debug, Clone)]
pub struct FileStreams {
    source: PathBuf,
    destination: PathBuf,
}

impl FileStreams {
    /// Creates streams reading from `source` and writing to `destination`.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl StreamProvider for FileStreams {
    type Stream = fs::File;

    fn open(&mut self, role: StreamRole) -> io::Result<Self::Stream> {
        match role {
            StreamRole::Source => fs::File::open(&self.source),
            StreamRole::Destination => fs::File::create(&self.destination),
            StreamRole::Temp0 | StreamRole::Temp1 => tempfile::tempfile(),
        }
    }

    fn close(&mut self, role: StreamRole, mut stream: Self::Stream) -> io::Result<()> {
        if role == StreamRole::Destination {
            stream.flush()?;
            stream.sync_all()?;
        }
        Ok(())
    }
}

/// Set of streams opened during a single embedding call. Streams still open when
/// the set is dropped are closed through the provider.
pub(crate) struct OpenStreams<'p, P: StreamProvider> {
    provider: &'p mut P,
    streams: [Option<P::Stream>; 4],
}

impl<P: StreamProvider> Drop for OpenStreams<'_, P> {
    fn drop(&mut self) {
        for role in StreamRole::ALL {
            if let Some(stream) = self.streams[role.index()].take() {
                log::trace!("closing {role:?} stream during teardown");
                if let Err(err) = self.provider.close(role, stream) {
                    log::warn!("failed closing {role:?} stream: {err}");
                }
            }
        }
    }
}

impl<'p, P: StreamProvider> OpenStreams<'p, P> {
    pub(crate) fn new(provider: &'p mut P) -> Self {
        Self {
            provider,
            streams: [None, None, None, None],
        }
    }

    pub(crate) fn open(&mut self, role: StreamRole) -> Result<(), EmbedError> {
        let slot = &mut self.streams[role.index()];
        if slot.is_some() {
            return Err(EmbedError::internal(format_args!(
                "{role:?} stream is already open"
            )));
        }
        *slot = Some(self.provider.open(role).map_err(|err| role.io_error(err))?);
        log::trace!("opened {role:?} stream");
        Ok(())
    }

    pub(crate) fn get(&mut self, role: StreamRole) -> Result<&mut dyn ClientStream, EmbedError> {
        match &mut self.streams[role.index()] {
            Some(stream) => Ok(stream),
            None => Err(EmbedError::internal(format_args!(
                "{role:?} stream is not open"
            ))),
        }
    }

    /// Returns both scratch streams at once.
    pub(crate) fn temps(
        &mut self,
    ) -> Result<(&mut dyn ClientStream, &mut dyn ClientStream), EmbedError> {
        let [_, _, Some(temp0), Some(temp1)] = &mut self.streams else {
            return Err(EmbedError::internal("scratch streams are not open"));
        };
        Ok((temp0, temp1))
    }

    /// Returns the destination stream together with the CFF table spool.
    pub(crate) fn destination_and_temp0(
        &mut self,
    ) -> Result<(&mut dyn ClientStream, &mut dyn ClientStream), EmbedError> {
        let [_, Some(destination), Some(temp0), _] = &mut self.streams else {
            return Err(EmbedError::internal("destination or scratch stream is not open"));
        };
        Ok((destination, temp0))
    }

    /// Closes all open streams, returning the first error encountered.
    pub(crate) fn close_all(mut self) -> Result<(), EmbedError> {
        let mut result = Ok(());
        for role in StreamRole::ALL {
            if let Some(stream) = self.streams[role.index()].take() {
                log::trace!("closing {role:?} stream");
                let closed = self.provider.close(role, stream);
                if let (Ok(()), Err(err)) = (&result, closed) {
                    result = Err(role.io_error(err));
                }
            }
        }
        result
    }
}

/// Buffered big-endian reader over the source stream. The buffer is filled in chunks
/// of a configurable length, so multi-byte reads transparently span several fills.
pub(crate) struct SourceReader<'s> {
    stream: &'s mut dyn ClientStream,
    buffer: Vec<u8>,
    pos: usize,
    /// Stream offset of `buffer[0]`.
    buffer_offset: u64,
    chunk_len: usize,
}

impl<'s> SourceReader<'s> {
    pub(crate) const DEFAULT_CHUNK_LEN: usize = 4_096;

    pub(crate) fn new(stream: &'s mut dyn ClientStream, chunk_len: usize) -> io::Result<Self> {
        let buffer_offset = stream.stream_position()?;
        Ok(Self {
            stream,
            buffer: Vec::with_capacity(chunk_len.max(1)),
            pos: 0,
            buffer_offset,
            chunk_len: chunk_len.max(1),
        })
    }

    /// Refills the buffer. Returns `false` if the stream is exhausted.
    fn fill(&mut self) -> io::Result<bool> {
        self.buffer_offset += self.buffer.len() as u64;
        self.buffer.resize(self.chunk_len, 0);
        self.pos = 0;
        let len = loop {
            match self.stream.read(&mut self.buffer) {
                Ok(len) => break len,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.buffer.clear();
                    return Err(err);
                }
            }
        };
        self.buffer.truncate(len);
        Ok(len > 0)
    }

    pub(crate) fn position(&self) -> u64 {
        self.buffer_offset + self.pos as u64
    }

    /// Total stream length. Does not move the read position.
    pub(crate) fn stream_len(&mut self) -> io::Result<u64> {
        let current = self.stream.stream_position()?;
        let len = self.stream.seek(SeekFrom::End(0))?;
        self.stream.seek(SeekFrom::Start(current))?;
        Ok(len)
    }

    pub(crate) fn seek(&mut self, offset: u64) -> io::Result<()> {
        let buffer_end = self.buffer_offset + self.buffer.len() as u64;
        if (self.buffer_offset..=buffer_end).contains(&offset) {
            // `unwrap()` is safe: the difference is bounded by the buffer length
            self.pos = usize::try_from(offset - self.buffer_offset).unwrap();
        } else {
            self.stream.seek(SeekFrom::Start(offset))?;
            self.buffer.clear();
            self.buffer_offset = offset;
            self.pos = 0;
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> io::Result<u8> {
        if self.pos == self.buffer.len() && !self.fill()? {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        let byte = self.buffer[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut bytes = [0_u8; N];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    pub(crate) fn read_u16(&mut self) -> io::Result<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    pub(crate) fn read_u24(&mut self) -> io::Result<u32> {
        let [a, b, c] = self.read_array()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    pub(crate) fn read_u32(&mut self) -> io::Result<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    pub(crate) fn read_u32_le(&mut self) -> io::Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub(crate) fn read_exact(&mut self, mut dest: &mut [u8]) -> io::Result<()> {
        while !dest.is_empty() {
            if self.pos == self.buffer.len() && !self.fill()? {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            let available = (self.buffer.len() - self.pos).min(dest.len());
            let (head, tail) = dest.split_at_mut(available);
            head.copy_from_slice(&self.buffer[self.pos..self.pos + available]);
            self.pos += available;
            dest = tail;
        }
        Ok(())
    }

    /// Number of bytes between the read position and the end of the stream.
    pub(crate) fn remaining_len(&mut self) -> io::Result<u64> {
        Ok(self.stream_len()?.saturating_sub(self.position()))
    }

    /// Appends exactly `len` bytes to `dest`. Lengths exceeding the rest of the stream
    /// are rejected before allocating.
    pub(crate) fn read_into(&mut self, dest: &mut Vec<u8>, len: usize) -> Result<(), ReadError> {
        let available = self.remaining_len()?;
        if len as u64 > available {
            return Err(ReadError::Truncated {
                requested: len as u64,
                available,
            });
        }
        let tail = extend_zeroed(dest, len).map_err(ReadError::Alloc)?;
        self.read_exact(tail).map_err(ReadError::Io)
    }

    /// Appends all remaining bytes to `dest`.
    pub(crate) fn read_to_end(&mut self, dest: &mut Vec<u8>) -> Result<(), ReadError> {
        let remaining = self.remaining_len()?;
        let remaining = usize::try_from(remaining)
            .map_err(|err| ReadError::Alloc(EmbedError::new(ErrorKind::OutOfMemory, err)))?;
        self.read_into(dest, remaining)
    }
}

/// Error reading from the [`SourceReader`].
#[derive(Debug)]
pub(crate) enum ReadError {
    Io(io::Error),
    /// Length read from a container header exceeds the rest of the stream.
    Truncated { requested: u64, available: u64 },
    Alloc(EmbedError),
}

impl ReadError {
    /// Converts this error, attributing unexpected EOF to the supplied error kind.
    pub(crate) fn into_embed(self, eof_kind: ErrorKind) -> EmbedError {
        match self {
            Self::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                EmbedError::new(eof_kind, "unexpected end of the source stream")
            }
            Self::Io(err) => StreamRole::Source.io_error(err),
            Self::Truncated {
                requested,
                available,
            } => EmbedError::new(
                eof_kind,
                format_args!(
                    "{requested} bytes requested, but {available} bytes remain in the source stream"
                ),
            ),
            Self::Alloc(err) => err,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
