//! Byte handles and the pull-style stream adapter.
//!
//! A [`ByteHandle`] is any bidirectional byte channel: an in-memory buffer, a file,
//! or a pipe that cannot seek backwards. The codec never talks to a handle directly;
//! it pulls and pushes bytes through a [`StreamAdapter`], which exposes exactly the
//! operations the handle can honor.

use crate::constants::SKIP_CHUNK_SIZE;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// Abstract byte channel consumed by the codec session.
pub trait ByteHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
    /// Copies upcoming bytes into `buf` without advancing the read position.
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// True if the handle cannot seek backwards.
    fn is_sequential(&self) -> bool;
    fn position(&self) -> u64;
    /// Absolute seek. Sequential handles return an error.
    fn seek(&mut self, position: u64) -> io::Result<()>;
    /// Advisory number of bytes left to read, when the handle knows it.
    fn bytes_available(&self) -> Option<u64>;

    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        true
    }
}

fn unsupported(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, what.to_string())
}

/// Reads until `buf` is full or the source ends. `filled` counts the bytes stored in
/// `buf`, including those read before an error.
fn fill_from<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    filled: &mut usize,
) -> io::Result<()> {
    while *filled < buf.len() {
        match reader.read(&mut buf[*filled..]) {
            Ok(0) => break,
            Ok(n) => *filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    fill_from(reader, buf, &mut filled)?;
    Ok(filled)
}

/// Seekable growable in-memory buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryHandle {
    cursor: Cursor<Vec<u8>>,
}

impl MemoryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            cursor: Cursor::new(data.into()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

impl ByteHandle for MemoryHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cursor.write(buf)
    }

    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.cursor.get_ref();
        let start = (self.cursor.position() as usize).min(data.len());
        let n = (data.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn is_sequential(&self) -> bool {
        false
    }

    fn position(&self) -> u64 {
        self.cursor.position()
    }

    fn seek(&mut self, position: u64) -> io::Result<()> {
        self.cursor.set_position(position);
        Ok(())
    }

    fn bytes_available(&self) -> Option<u64> {
        let len = self.cursor.get_ref().len() as u64;
        Some(len.saturating_sub(self.cursor.position()))
    }
}

/// Random-access handle over anything readable, writable and seekable (typically a file).
#[derive(Debug)]
pub struct SeekableHandle<T> {
    inner: T,
    position: u64,
    length: u64,
}

impl<T: Read + Write + Seek> SeekableHandle<T> {
    pub fn new(mut inner: T) -> io::Result<Self> {
        let position = inner.stream_position()?;
        let length = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(position))?;
        Ok(Self {
            inner,
            position,
            length,
        })
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write + Seek> ByteHandle for SeekableHandle<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        self.length = self.length.max(self.position);
        Ok(n)
    }

    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let result = read_full(&mut self.inner, buf);
        // Rewind even when the read failed half-way.
        self.inner.seek(SeekFrom::Start(self.position))?;
        result
    }

    fn is_sequential(&self) -> bool {
        false
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, position: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    fn bytes_available(&self) -> Option<u64> {
        Some(self.length.saturating_sub(self.position))
    }
}

/// Forward-only source such as a pipe or socket.
///
/// Peeked bytes are kept in a look-ahead buffer and handed out again by the next reads.
#[derive(Debug)]
pub struct SequentialReader<R> {
    inner: R,
    lookahead: Vec<u8>,
    position: u64,
    length_hint: Option<u64>,
}

impl<R: Read> SequentialReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            lookahead: Vec::new(),
            position: 0,
            length_hint: None,
        }
    }

    /// Reader whose total length is known up front; the hint is only advisory.
    pub fn with_length_hint(inner: R, length: u64) -> Self {
        Self {
            length_hint: Some(length),
            ..Self::new(inner)
        }
    }
}

impl<R: Read> ByteHandle for SequentialReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = if self.lookahead.is_empty() {
            self.inner.read(buf)?
        } else {
            let n = self.lookahead.len().min(buf.len());
            buf[..n].copy_from_slice(&self.lookahead[..n]);
            self.lookahead.drain(..n);
            n
        };
        self.position += n as u64;
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(unsupported("sequential reader is not writable"))
    }

    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.lookahead.len() < buf.len() {
            let mut chunk = vec![0u8; buf.len() - self.lookahead.len()];
            let mut filled = 0;
            let result = fill_from(&mut self.inner, &mut chunk, &mut filled);
            // Bytes already pulled from the source stay readable even if the peek fails.
            self.lookahead.extend_from_slice(&chunk[..filled]);
            result?;
        }
        let n = self.lookahead.len().min(buf.len());
        buf[..n].copy_from_slice(&self.lookahead[..n]);
        Ok(n)
    }

    fn is_sequential(&self) -> bool {
        true
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, _position: u64) -> io::Result<()> {
        Err(unsupported("sequential reader cannot seek"))
    }

    fn bytes_available(&self) -> Option<u64> {
        self.length_hint
            .map(|length| length.saturating_sub(self.position))
    }

    fn is_writable(&self) -> bool {
        false
    }
}

/// Forward-only sink such as a pipe or socket.
#[derive(Debug)]
pub struct SequentialWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> SequentialWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteHandle for SequentialWriter<W> {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(unsupported("sequential writer is not readable"))
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn peek(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn is_sequential(&self) -> bool {
        true
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, _position: u64) -> io::Result<()> {
        Err(unsupported("sequential writer cannot seek"))
    }

    fn bytes_available(&self) -> Option<u64> {
        None
    }

    fn is_readable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Input,
    Output,
}

/// The set of primitive operations a [`StreamAdapter`] offers to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCapabilities {
    pub read: bool,
    pub write: bool,
    pub skip: bool,
    pub seek: bool,
}

/// Pull-style adapter between a codec driver and a [`ByteHandle`].
///
/// The adapter borrows the handle and never closes it.
pub struct StreamAdapter<'h> {
    handle: &'h mut dyn ByteHandle,
    direction: StreamDirection,
    capabilities: StreamCapabilities,
    remaining: u64,
}

impl<'h> StreamAdapter<'h> {
    pub fn new(handle: &'h mut dyn ByteHandle, direction: StreamDirection) -> Self {
        let seekable = !handle.is_sequential();
        let capabilities = StreamCapabilities {
            read: direction == StreamDirection::Input,
            write: direction == StreamDirection::Output,
            skip: seekable || direction == StreamDirection::Input,
            seek: seekable,
        };
        let remaining = match direction {
            StreamDirection::Input => handle.bytes_available().unwrap_or(0),
            StreamDirection::Output => 0,
        };
        Self {
            handle,
            direction,
            capabilities,
            remaining,
        }
    }

    pub fn input(handle: &'h mut dyn ByteHandle) -> Self {
        Self::new(handle, StreamDirection::Input)
    }

    pub fn output(handle: &'h mut dyn ByteHandle) -> Self {
        Self::new(handle, StreamDirection::Output)
    }

    pub fn direction(&self) -> StreamDirection {
        self.direction
    }

    pub fn capabilities(&self) -> StreamCapabilities {
        self.capabilities
    }

    /// Bytes left in the source when the adapter was built; 0 if unknown.
    pub fn remaining_estimate(&self) -> u64 {
        self.remaining
    }

    pub fn position(&self) -> u64 {
        self.handle.position()
    }

    /// Reads up to `buf.len()` bytes. `None` means end of stream or failure.
    pub fn read(&mut self, buf: &mut [u8]) -> Option<usize> {
        loop {
            match self.handle.read(buf) {
                Ok(0) => return None,
                Ok(n) => return Some(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("stream read failed: {e}");
                    return None;
                }
            }
        }
    }

    /// Writes `buf` and returns the number of bytes accepted; 0 when nothing could be written.
    pub fn write(&mut self, buf: &[u8]) -> usize {
        let mut written = 0;
        while written < buf.len() {
            match self.handle.write(&buf[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("stream write failed after {written} bytes: {e}");
                    break;
                }
            }
        }
        written
    }

    /// Advances the position by `count` bytes, returning how far it actually moved.
    pub fn skip(&mut self, count: i64) -> Option<i64> {
        if count == 0 {
            return Some(0);
        }
        if self.capabilities.seek {
            let target = (self.handle.position() as i64).checked_add(count)?;
            if target < 0 {
                return None;
            }
            return match self.handle.seek(target as u64) {
                Ok(()) => Some(count),
                Err(e) => {
                    log::debug!("stream skip by seek failed: {e}");
                    None
                }
            };
        }
        if count < 0 || !self.capabilities.skip {
            return None;
        }

        let mut scratch = [0u8; SKIP_CHUNK_SIZE];
        let mut skipped: i64 = 0;
        while skipped < count {
            let chunk = ((count - skipped) as usize).min(SKIP_CHUNK_SIZE);
            match self.read(&mut scratch[..chunk]) {
                Some(n) => skipped += n as i64,
                None => break,
            }
        }
        if skipped == 0 { None } else { Some(skipped) }
    }

    /// Absolute seek. Always refused on sequential handles.
    pub fn seek(&mut self, position: u64) -> bool {
        if !self.capabilities.seek {
            return false;
        }
        match self.handle.seek(position) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("stream seek to {position} failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_peek_is_non_destructive() {
        let mut handle = MemoryHandle::from_bytes(vec![1, 2, 3, 4]);
        let mut peeked = [0u8; 3];
        assert_eq!(handle.peek(&mut peeked).unwrap(), 3);
        assert_eq!(peeked, [1, 2, 3]);
        assert_eq!(handle.position(), 0);

        let mut read = [0u8; 4];
        assert_eq!(handle.read(&mut read).unwrap(), 4);
        assert_eq!(read, [1, 2, 3, 4]);
    }

    #[test]
    fn test_sequential_peek_then_read_returns_same_bytes() {
        let source: &[u8] = &[9, 8, 7, 6, 5];
        let mut handle = SequentialReader::new(source);
        let mut peeked = [0u8; 4];
        assert_eq!(handle.peek(&mut peeked).unwrap(), 4);
        assert_eq!(peeked, [9, 8, 7, 6]);

        let mut read = [0u8; 5];
        assert_eq!(handle.read(&mut read[..2]).unwrap(), 2);
        assert_eq!(handle.read(&mut read[2..]).unwrap(), 2);
        assert_eq!(handle.read(&mut read[4..]).unwrap(), 1);
        assert_eq!(read, [9, 8, 7, 6, 5]);
        assert_eq!(handle.position(), 5);
    }

    /// Hands out at most three bytes per call and fails once at `fail_at`.
    struct FlakyReader {
        data: Vec<u8>,
        position: usize,
        fail_at: Option<usize>,
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail_at == Some(self.position) {
                self.fail_at = None;
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            let n = buf.len().min(3).min(self.data.len() - self.position);
            buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
            self.position += n;
            Ok(n)
        }
    }

    #[test]
    fn test_failed_peek_keeps_bytes_already_read() {
        let mut handle = SequentialReader::new(FlakyReader {
            data: (1..=10).collect(),
            position: 0,
            fail_at: Some(3),
        });
        let mut peeked = [0u8; 8];
        assert!(handle.peek(&mut peeked).is_err());

        let mut read = [0u8; 10];
        let mut filled = 0;
        while filled < read.len() {
            let n = handle.read(&mut read[filled..]).unwrap();
            assert!(n > 0);
            filled += n;
        }
        assert_eq!(read.to_vec(), (1..=10).collect::<Vec<u8>>());
        assert_eq!(handle.position(), 10);
    }

    #[test]
    fn test_sequential_peek_short_source() {
        let source: &[u8] = &[1, 2];
        let mut handle = SequentialReader::new(source);
        let mut peeked = [0u8; 12];
        assert_eq!(handle.peek(&mut peeked).unwrap(), 2);
    }

    #[test]
    fn test_adapter_read_reports_end_of_stream() {
        let mut handle = MemoryHandle::from_bytes(vec![1, 2]);
        let mut adapter = StreamAdapter::input(&mut handle);
        let mut buf = [0u8; 8];
        assert_eq!(adapter.read(&mut buf), Some(2));
        assert_eq!(adapter.read(&mut buf), None);
    }

    #[test]
    fn test_adapter_remaining_estimate() {
        let mut handle = MemoryHandle::from_bytes(vec![0u8; 100]);
        handle.seek(40).unwrap();
        let adapter = StreamAdapter::input(&mut handle);
        assert_eq!(adapter.remaining_estimate(), 60);

        let source: &[u8] = &[0u8; 10];
        let mut unknown = SequentialReader::new(source);
        assert_eq!(StreamAdapter::input(&mut unknown).remaining_estimate(), 0);
    }

    #[test]
    fn test_sequential_adapter_has_no_seek() {
        let source: &[u8] = &[0u8; 16];
        let mut handle = SequentialReader::new(source);
        let mut adapter = StreamAdapter::input(&mut handle);
        let caps = adapter.capabilities();
        assert!(caps.read && caps.skip);
        assert!(!caps.seek && !caps.write);
        assert!(!adapter.seek(0));
    }

    #[test]
    fn test_sequential_skip_discards_bytes() {
        let source: Vec<u8> = (0..10_000u32).map(|v| v as u8).collect();
        let mut handle = SequentialReader::new(source.as_slice());
        let mut adapter = StreamAdapter::input(&mut handle);
        assert_eq!(adapter.skip(5000), Some(5000));
        let mut buf = [0u8; 1];
        adapter.read(&mut buf);
        assert_eq!(buf[0], source[5000]);

        // Past the end: only what was there is reported.
        assert_eq!(adapter.skip(10_000), Some(4999));
        assert_eq!(adapter.skip(1), None);
        assert_eq!(adapter.skip(-1), None);
    }

    #[test]
    fn test_seekable_skip_and_seek() {
        let mut handle = MemoryHandle::from_bytes((0..32u8).collect::<Vec<_>>());
        let mut adapter = StreamAdapter::input(&mut handle);
        assert_eq!(adapter.skip(10), Some(10));
        assert_eq!(adapter.position(), 10);
        assert_eq!(adapter.skip(-4), Some(-4));
        assert_eq!(adapter.position(), 6);
        assert_eq!(adapter.skip(-7), None);
        assert!(adapter.seek(30));
        let mut buf = [0u8; 4];
        assert_eq!(adapter.read(&mut buf), Some(2));
        assert_eq!(&buf[..2], &[30, 31]);
    }

    #[test]
    fn test_write_failure_returns_zero() {
        let source: &[u8] = &[];
        let mut handle = SequentialReader::new(source);
        let mut adapter = StreamAdapter::output(&mut handle);
        assert_eq!(adapter.write(&[1, 2, 3]), 0);
    }

    #[test]
    fn test_output_skip_then_seek_back_overwrites() {
        let mut handle = MemoryHandle::new();
        {
            let mut adapter = StreamAdapter::output(&mut handle);
            assert_eq!(adapter.skip(4), Some(4));
            assert_eq!(adapter.write(&[5, 6]), 2);
            assert!(adapter.seek(0));
            assert_eq!(adapter.write(&[1, 2, 3, 4]), 4);
        }
        assert_eq!(handle.into_inner(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_sequential_output_cannot_skip() {
        let mut handle = SequentialWriter::new(Vec::new());
        let mut adapter = StreamAdapter::output(&mut handle);
        assert!(!adapter.capabilities().skip);
        assert_eq!(adapter.skip(8), None);
        assert_eq!(adapter.write(&[1, 2]), 2);
        assert_eq!(handle.into_inner(), vec![1, 2]);
    }

    #[test]
    fn test_seekable_handle_over_cursor() {
        let mut handle = SeekableHandle::new(Cursor::new(vec![1u8, 2, 3, 4, 5])).unwrap();
        let mut peeked = [0u8; 2];
        assert_eq!(handle.peek(&mut peeked).unwrap(), 2);
        assert_eq!(handle.position(), 0);
        assert_eq!(handle.bytes_available(), Some(5));
        handle.seek(3).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(handle.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);
    }
}
