//! Read framing codec
//!
//! Decides when enough bytes have arrived to complete one armed read.

use bytes::{Bytes, BytesMut};
use eventsock_config::{ReadMode, ReadModeConfig};
use std::io;
use tokio_util::codec::Decoder;

/// Completion rule for one read, snapshotted from the read-mode config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadCodec {
    /// Complete once `delimiter` has been received; the frame includes it
    Delimited {
        delimiter: Vec<u8>,
        max_length: usize,
        /// Bytes already searched without finding the delimiter
        next_index: usize,
    },
    /// Complete once exactly `length` bytes have been received
    Fixed { length: usize },
}

impl ReadCodec {
    /// Snapshot a read-mode config
    pub fn from_config(config: &ReadModeConfig, max_length: usize) -> Self {
        match config.mode {
            ReadMode::UntilDelimiter => Self::delimited(config.delimiter_bytes(), max_length),
            ReadMode::FixedSize => Self::fixed(config.size),
        }
    }

    /// An empty delimiter completes with whatever bytes are available.
    pub fn delimited(delimiter: impl Into<Vec<u8>>, max_length: usize) -> Self {
        ReadCodec::Delimited {
            delimiter: delimiter.into(),
            max_length: max_length.max(1),
            next_index: 0,
        }
    }

    /// Lengths below one byte are raised to one.
    pub fn fixed(length: usize) -> Self {
        ReadCodec::Fixed {
            length: length.max(1),
        }
    }

    pub fn mode(&self) -> ReadMode {
        match self {
            ReadCodec::Delimited { .. } => ReadMode::UntilDelimiter,
            ReadCodec::Fixed { .. } => ReadMode::FixedSize,
        }
    }
}

impl Decoder for ReadCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self {
            ReadCodec::Fixed { length } => {
                if src.len() >= *length {
                    Ok(Some(src.split_to(*length).freeze()))
                } else {
                    Ok(None)
                }
            }
            ReadCodec::Delimited {
                delimiter,
                max_length,
                next_index,
            } => {
                if delimiter.is_empty() {
                    return Ok((!src.is_empty()).then(|| src.split().freeze()));
                }

                // Restart far enough back to catch a delimiter split across reads.
                let start = next_index
                    .saturating_sub(delimiter.len() - 1)
                    .min(src.len());
                if let Some(offset) = find(&src[start..], delimiter) {
                    let end = start + offset + delimiter.len();
                    *next_index = 0;
                    return Ok(Some(src.split_to(end).freeze()));
                }

                *next_index = src.len();
                if src.len() >= *max_length {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("delimiter not found within {} bytes", max_length),
                    ));
                }
                Ok(None)
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
