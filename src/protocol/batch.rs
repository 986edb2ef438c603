// ABOUTME: Binary framing for audio-frame batches
// ABOUTME: Length-prefixed frame sequences carried in one WebSocket binary message

use thiserror::Error;

/// Bytes of the per-frame length prefix (u32 big-endian)
const FRAME_HEADER_LEN: usize = 4;

/// Errors raised while walking a framed batch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// Fewer bytes remain than a frame length prefix needs
    #[error("truncated frame header: {remaining} trailing bytes")]
    TruncatedHeader {
        /// Bytes left over after the last complete frame
        remaining: usize,
    },

    /// A frame's declared length runs past the end of the message
    #[error("truncated frame body: expected {expected} bytes, found {found}")]
    TruncatedFrame {
        /// Declared frame length
        expected: usize,
        /// Bytes actually available
        found: usize,
    },
}

/// Encode an ordered sequence of audio frames into one binary message.
///
/// Each frame is prefixed with its length as a u32 big-endian, so the batch
/// can be forwarded verbatim and re-split by receivers:
/// `[len: u32 BE][frame bytes]` repeated. An empty batch encodes to an
/// empty message.
pub fn encode<F: AsRef<[u8]>>(frames: &[F]) -> Vec<u8> {
    let total: usize = frames
        .iter()
        .map(|f| FRAME_HEADER_LEN + f.as_ref().len())
        .sum();

    let mut message = Vec::with_capacity(total);
    for frame in frames {
        let frame = frame.as_ref();
        message.extend_from_slice(&(frame.len() as u32).to_be_bytes());
        message.extend_from_slice(frame);
    }
    message
}

/// Split a framed batch back into its frames without copying.
pub fn decode(data: &[u8]) -> Result<Vec<&[u8]>, BatchError> {
    let mut frames = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        if rest.len() < FRAME_HEADER_LEN {
            return Err(BatchError::TruncatedHeader {
                remaining: rest.len(),
            });
        }

        let (header, body) = rest.split_at(FRAME_HEADER_LEN);
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        if body.len() < len {
            return Err(BatchError::TruncatedFrame {
                expected: len,
                found: body.len(),
            });
        }

        let (frame, remaining) = body.split_at(len);
        frames.push(frame);
        rest = remaining;
    }

    Ok(frames)
}

/// Total audio payload size of a batch: the sum of all frame lengths,
/// excluding the framing overhead. This is the figure the relay bills
/// against a channel's byte counters.
pub fn payload_bytes(data: &[u8]) -> Result<u64, BatchError> {
    Ok(decode(data)?.iter().map(|f| f.len() as u64).sum())
}
