use thiserror::Error;

/// Failure to decode a buffer back into its type.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected {expected} bytes, got {actual}")]
    WrongSize { expected: usize, actual: usize },

    #[error("{0} bytes is not a whole number of code points")]
    RaggedCodePoints(usize),

    #[error("{0:#x} is not a unicode scalar value")]
    InvalidCodePoint(u32),

    #[error("length {0} does not fit in usize")]
    LengthOverflow(u64),
}

/// An object that can encode a particular type to, and decode it from, a
/// `Vec<u8>`.
pub trait Coder {
    type Type;

    /// Consume an instance of the encodable type and convert it to bytes.
    fn encode(&self, inst: Self::Type) -> Vec<u8>;

    /// Consume a buffer of bytes and decode it to the decodable type.
    fn decode(&self, data: Vec<u8>) -> Result<Self::Type, DecodeError>;
}

/// Encodes a length as a little-endian `u64`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LengthCoder;

impl Coder for LengthCoder {
    type Type = usize;

    fn encode(&self, inst: usize) -> Vec<u8> {
        (inst as u64).to_le_bytes().to_vec()
    }

    fn decode(&self, data: Vec<u8>) -> Result<usize, DecodeError> {
        let bytes: [u8; 8] = data
            .as_slice()
            .try_into()
            .map_err(|_| DecodeError::WrongSize {
                expected: 8,
                actual: data.len(),
            })?;
        let value = u64::from_le_bytes(bytes);
        usize::try_from(value).map_err(|_| DecodeError::LengthOverflow(value))
    }
}

/// Encodes a sequence of code points as little-endian `u32` scalar values,
/// four bytes each, so the byte count is always four times the number of
/// characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodePointCoder;

impl Coder for CodePointCoder {
    type Type = Vec<char>;

    fn encode(&self, inst: Vec<char>) -> Vec<u8> {
        inst.into_iter()
            .flat_map(|c| u32::from(c).to_le_bytes())
            .collect()
    }

    fn decode(&self, data: Vec<u8>) -> Result<Vec<char>, DecodeError> {
        if data.len() % 4 != 0 {
            return Err(DecodeError::RaggedCodePoints(data.len()));
        }
        data.chunks_exact(4)
            .map(|chunk| {
                let value = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                char::from_u32(value).ok_or(DecodeError::InvalidCodePoint(value))
            })
            .collect()
    }
}
