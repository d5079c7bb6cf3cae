//! The two frames of the exchange.
//!
//! A peer announces how many code points it is about to send on
//! [`LENGTH_TAG`], then sends exactly that many on [`PAYLOAD_TAG`]. The tags
//! only label channels between one pair of ranks; they carry no sequence
//! information.

use crate::coder::{CodePointCoder, Coder, DecodeError, LengthCoder};

/// Channel carrying the number of code points that follow.
pub const LENGTH_TAG: usize = 0;

/// Channel carrying the code points themselves.
pub const PAYLOAD_TAG: usize = 1;

/// The rank that collects every message.
pub const ROOT: usize = 0;

/// One of the two transfers that make up a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// The number of code points in the payload that follows.
    Length(usize),
    /// The message text, one entry per code point.
    Payload(Vec<char>),
}

impl Frame {
    pub fn tag(&self) -> usize {
        match self {
            Frame::Length(_) => LENGTH_TAG,
            Frame::Payload(_) => PAYLOAD_TAG,
        }
    }

    pub fn encode(self) -> Vec<u8> {
        match self {
            Frame::Length(n) => LengthCoder.encode(n),
            Frame::Payload(chars) => CodePointCoder.encode(chars),
        }
    }

    /// Decode a buffer received on the given tag. Returns `None` for a tag
    /// that is not part of the protocol.
    pub fn decode(tag: usize, data: Vec<u8>) -> Option<Result<Self, DecodeError>> {
        match tag {
            LENGTH_TAG => Some(Self::decode_length(data).map(Frame::Length)),
            PAYLOAD_TAG => Some(Self::decode_payload(data).map(Frame::Payload)),
            _ => None,
        }
    }

    /// Decode the body of a buffer received on [`LENGTH_TAG`].
    pub fn decode_length(data: Vec<u8>) -> Result<usize, DecodeError> {
        LengthCoder.decode(data)
    }

    /// Decode the body of a buffer received on [`PAYLOAD_TAG`].
    pub fn decode_payload(data: Vec<u8>) -> Result<Vec<char>, DecodeError> {
        CodePointCoder.decode(data)
    }
}
