//! Read framing
//!
//! A read is armed with a [`ReadCodec`] snapshot and completes once the codec
//! yields one frame, the source reaches end of stream, or an I/O error occurs.

pub mod codec;

pub use codec::ReadCodec;

use bytes::{Bytes, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Anything a read can pull bytes from
pub(crate) trait ByteSource {
    /// Append newly received bytes to `buf`; `Ok(0)` means end of stream.
    async fn fill(&mut self, buf: &mut BytesMut) -> io::Result<usize>;
}

/// Result of one armed read
#[derive(Debug)]
pub struct ReadOutcome {
    pub buffer: Bytes,
    pub error: Option<io::Error>,
}

impl ReadOutcome {
    pub fn complete(buffer: Bytes) -> Self {
        Self {
            buffer,
            error: None,
        }
    }

    /// Source reached end of stream with `buffer` still unframed.
    ///
    /// A clean close carries no error; leftover bytes carry `UnexpectedEof`.
    pub fn end_of_stream(buffer: Bytes) -> Self {
        let error = (!buffer.is_empty()).then(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream inside a frame")
        });
        Self { buffer, error }
    }

    pub fn failed(buffer: Bytes, error: io::Error) -> Self {
        Self {
            buffer,
            error: Some(error),
        }
    }

    /// Read timeout fired before a frame was complete
    pub fn timed_out() -> Self {
        Self::failed(
            Bytes::new(),
            io::Error::new(io::ErrorKind::TimedOut, "read timed out"),
        )
    }

    pub fn bytes_transferred(&self) -> usize {
        self.buffer.len()
    }
}

/// Drive `source` until `codec` yields a frame.
///
/// Bytes past the frame stay in `pending` for the next read.
pub(crate) async fn read_frame<S: ByteSource>(
    source: &mut S,
    pending: &mut BytesMut,
    codec: &mut ReadCodec,
) -> ReadOutcome {
    loop {
        match codec.decode(pending) {
            Ok(Some(frame)) => return ReadOutcome::complete(frame),
            Ok(None) => {}
            Err(e) => return ReadOutcome::failed(pending.split().freeze(), e),
        }

        match source.fill(pending).await {
            Ok(0) => return ReadOutcome::end_of_stream(pending.split().freeze()),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return ReadOutcome::failed(pending.split().freeze(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays scripted chunks, then reports end of stream.
    struct Script(VecDeque<io::Result<&'static [u8]>>);

    impl Script {
        fn new(chunks: Vec<io::Result<&'static [u8]>>) -> Self {
            Self(chunks.into())
        }
    }

    impl ByteSource for Script {
        async fn fill(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(chunk)) => {
                    buf.extend_from_slice(chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    fn chunk(bytes: &'static [u8]) -> io::Result<&'static [u8]> {
        Ok(bytes)
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    #[test]
    fn test_frame_across_chunks_keeps_remainder() {
        let mut source = Script::new(vec![chunk(b"hel"), chunk(b"lo\nwor"), chunk(b"ld\n")]);
        let mut pending = BytesMut::new();
        let mut codec = ReadCodec::delimited("\n", 1024);

        let first = block_on(read_frame(&mut source, &mut pending, &mut codec));
        assert_eq!(&first.buffer[..], b"hello\n");
        assert!(first.error.is_none());
        assert_eq!(&pending[..], b"wor");

        let second = block_on(read_frame(&mut source, &mut pending, &mut codec));
        assert_eq!(&second.buffer[..], b"world\n");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_buffered_frame_needs_no_fill() {
        let mut source = Script::new(vec![]);
        let mut pending = BytesMut::from(&b"abcdefgh"[..]);
        let mut codec = ReadCodec::fixed(4);

        let outcome = block_on(read_frame(&mut source, &mut pending, &mut codec));
        assert_eq!(&outcome.buffer[..], b"abcd");
        assert_eq!(&pending[..], b"efgh");
    }

    #[test]
    fn test_clean_end_of_stream() {
        let mut source = Script::new(vec![]);
        let mut pending = BytesMut::new();
        let mut codec = ReadCodec::delimited("\n", 1024);

        let outcome = block_on(read_frame(&mut source, &mut pending, &mut codec));
        assert_eq!(outcome.bytes_transferred(), 0);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_end_of_stream_inside_frame() {
        let mut source = Script::new(vec![chunk(b"tail")]);
        let mut pending = BytesMut::new();
        let mut codec = ReadCodec::delimited("\n", 1024);

        let outcome = block_on(read_frame(&mut source, &mut pending, &mut codec));
        assert_eq!(&outcome.buffer[..], b"tail");
        assert_eq!(outcome.error.unwrap().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_io_error_after_partial_bytes() {
        let mut source = Script::new(vec![
            chunk(b"ab"),
            Err(io::Error::from(io::ErrorKind::ConnectionReset)),
        ]);
        let mut pending = BytesMut::new();
        let mut codec = ReadCodec::fixed(4);

        let outcome = block_on(read_frame(&mut source, &mut pending, &mut codec));
        assert_eq!(&outcome.buffer[..], b"ab");
        assert_eq!(outcome.error.unwrap().kind(), io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_interrupted_is_retried() {
        let mut source = Script::new(vec![
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            chunk(b"ok\n"),
        ]);
        let mut pending = BytesMut::new();
        let mut codec = ReadCodec::delimited("\n", 1024);

        let outcome = block_on(read_frame(&mut source, &mut pending, &mut codec));
        assert_eq!(&outcome.buffer[..], b"ok\n");
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_delimiter_limit_fails_read() {
        let mut source = Script::new(vec![chunk(b"0123456789")]);
        let mut pending = BytesMut::new();
        let mut codec = ReadCodec::delimited("\n", 8);

        let outcome = block_on(read_frame(&mut source, &mut pending, &mut codec));
        assert_eq!(outcome.bytes_transferred(), 10);
        assert_eq!(outcome.error.unwrap().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_timed_out_outcome() {
        let outcome = ReadOutcome::timed_out();
        assert_eq!(outcome.bytes_transferred(), 0);
        assert_eq!(outcome.error.unwrap().kind(), io::ErrorKind::TimedOut);
    }
}
