//! Re-readable request bodies.
//!
//! A [`Body`] starts either buffered (bytes already in memory) or as a
//! stream. When the binder needs the bytes it calls [`Body::duplicate`],
//! which drains the stream into a buffer and resets the body to that
//! buffer, so the handler can still read the body afterwards.

use bytes::Bytes;
use std::fmt;
use std::io::{self, Cursor, Read};

enum Inner {
    Empty,
    Buffered(Bytes),
    Stream(Box<dyn Read + Send>),
}

/// A request body that remains readable after binding consumed it.
///
/// # Example
///
/// ```rust
/// use tessera::Body;
/// use std::io::Read;
///
/// let mut body = Body::from_reader(&b"name=alice"[..]);
/// assert!(!body.is_buffered());
///
/// let bytes = body.duplicate().unwrap();
/// assert_eq!(&bytes[..], b"name=alice");
/// assert!(body.is_buffered());
///
/// // The original contents are still there for the next consumer.
/// let mut rest = String::new();
/// body.into_reader().read_to_string(&mut rest).unwrap();
/// assert_eq!(rest, "name=alice");
/// ```
pub struct Body {
    inner: Inner,
}

impl Body {
    /// Creates an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self { inner: Inner::Empty }
    }

    /// Wraps a stream that has not been read yet.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            inner: Inner::Stream(Box::new(reader)),
        }
    }

    /// Returns true if the contents are held in memory.
    #[must_use]
    pub fn is_buffered(&self) -> bool {
        !matches!(self.inner, Inner::Stream(_))
    }

    /// Returns the buffered contents, if the body has been buffered.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.inner {
            Inner::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Reads the whole body and resets it to the buffered copy.
    ///
    /// The returned [`Bytes`] shares its allocation with the buffer kept in
    /// the body; calling this again does not touch the stream.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised by the underlying stream.
    pub fn duplicate(&mut self) -> io::Result<Bytes> {
        if let Inner::Stream(reader) = &mut self.inner {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            tracing::debug!(len = buf.len(), "buffered request body");
            self.inner = Inner::Buffered(Bytes::from(buf));
        }

        Ok(match &self.inner {
            Inner::Buffered(bytes) => bytes.clone(),
            _ => Bytes::new(),
        })
    }

    /// Like [`duplicate`](Body::duplicate), but reads at most `limit` bytes.
    ///
    /// Returns `Ok(None)` when the body is longer than `limit`. The bytes
    /// read so far are put back in front of the stream, so the body is
    /// still readable in full.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised by the underlying stream.
    pub fn duplicate_within(&mut self, limit: usize) -> io::Result<Option<Bytes>> {
        match std::mem::replace(&mut self.inner, Inner::Empty) {
            Inner::Stream(mut reader) => {
                let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
                let mut buf = Vec::new();
                let read = (&mut reader).take(cap).read_to_end(&mut buf);

                if read.is_err() || buf.len() > limit {
                    self.inner = Inner::Stream(Box::new(Cursor::new(buf).chain(reader)));
                    return read.map(|_| None);
                }
                tracing::debug!(len = buf.len(), "buffered request body");
                let bytes = Bytes::from(buf);
                self.inner = Inner::Buffered(bytes.clone());
                Ok(Some(bytes))
            }
            Inner::Buffered(bytes) => {
                let within = (bytes.len() <= limit).then(|| bytes.clone());
                self.inner = Inner::Buffered(bytes);
                Ok(within)
            }
            Inner::Empty => Ok(Some(Bytes::new())),
        }
    }

    /// Converts the body into a reader over its contents.
    #[must_use]
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self.inner {
            Inner::Empty => Box::new(io::empty()),
            Inner::Buffered(bytes) => Box::new(Cursor::new(bytes)),
            Inner::Stream(reader) => reader,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Empty => f.write_str("Body::Empty"),
            Inner::Buffered(bytes) => f.debug_tuple("Body::Buffered").field(&bytes.len()).finish(),
            Inner::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            inner: Inner::Buffered(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Bytes::from_static(bytes).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<()> for Body {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingReader {
        data: Cursor<Vec<u8>>,
        reads: Arc<AtomicUsize>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.data.read(buf)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
        }
    }

    #[test]
    fn test_empty_body() {
        let mut body = Body::empty();
        assert!(body.is_buffered());
        assert!(body.duplicate().unwrap().is_empty());
    }

    #[test]
    fn test_buffered_body() {
        let mut body = Body::from("hello");
        assert_eq!(body.as_bytes().map(|b| &b[..]), Some(&b"hello"[..]));
        assert_eq!(&body.duplicate().unwrap()[..], b"hello");
    }

    #[test]
    fn test_stream_is_read_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut body = Body::from_reader(CountingReader {
            data: Cursor::new(b"payload".to_vec()),
            reads: Arc::clone(&reads),
        });

        let first = body.duplicate().unwrap();
        let after_first = reads.load(Ordering::SeqCst);
        let second = body.duplicate().unwrap();

        assert_eq!(first, second);
        assert_eq!(reads.load(Ordering::SeqCst), after_first);
    }

    #[test]
    fn test_body_readable_after_duplicate() {
        let mut body = Body::from_reader(Cursor::new(b"abc".to_vec()));
        body.duplicate().unwrap();

        let mut rest = Vec::new();
        body.into_reader().read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"abc");
    }

    #[test]
    fn test_stream_error_is_returned() {
        let mut body = Body::from_reader(FailingReader);
        let err = body.duplicate().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(!body.is_buffered());
    }

    #[test]
    fn test_debug_does_not_dump_contents() {
        let body = Body::from("secret");
        assert_eq!(format!("{body:?}"), "Body::Buffered(6)");
    }

    #[test]
    fn test_duplicate_within_stops_at_limit() {
        let mut body = Body::from_reader(io::repeat(b'a'));
        assert_eq!(body.duplicate_within(16).unwrap(), None);
        assert!(!body.is_buffered());
    }

    #[test]
    fn test_duplicate_within_keeps_oversized_body_readable() {
        let mut body = Body::from_reader(Cursor::new(b"abcdefgh".to_vec()));
        assert_eq!(body.duplicate_within(4).unwrap(), None);

        let mut rest = Vec::new();
        body.into_reader().read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"abcdefgh");
    }

    #[test]
    fn test_duplicate_within_buffers_small_body() {
        let mut body = Body::from_reader(Cursor::new(b"abcd".to_vec()));
        let bytes = body.duplicate_within(4).unwrap().unwrap();
        assert_eq!(&bytes[..], b"abcd");
        assert!(body.is_buffered());

        let mut buffered = Body::from("abcdef");
        assert_eq!(buffered.duplicate_within(4).unwrap(), None);
        assert!(buffered.as_bytes().is_some());
        assert!(Body::empty().duplicate_within(0).unwrap().unwrap().is_empty());
    }
}
