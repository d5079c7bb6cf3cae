//! Utility functions intended for use within the [`crate::message`] module.

use std::io::{self, prelude::*};

const USIZE_BYTES: usize = 8;

/// Read a `usize`, sent as a little-endian `u64`, out of the given stream.
pub fn read_usize<R: Read>(stream: &mut R) -> io::Result<usize> {
    let value = u64::from_le_bytes(read_bytes_array(stream)?);
    usize::try_from(value).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "value exceeds usize"))
}

/// Read a `usize` from the stream, or return `None` if the stream was closed
/// cleanly before the first byte of it. A stream that closes part-way
/// through is an error.
pub fn read_usize_or_eof<R: Read>(stream: &mut R) -> io::Result<Option<usize>> {
    let mut buffer = [0; USIZE_BYTES];
    let cursor = read_some(stream, &mut buffer)?;
    if cursor == 0 {
        return Ok(None);
    }
    read_bytes_into(stream, &mut buffer[cursor..])?;
    usize::try_from(u64::from_le_bytes(buffer))
        .map(Some)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "value exceeds usize"))
}

/// Write a `usize` to the stream as a little-endian `u64`.
pub fn write_usize<W: Write>(stream: &mut W, value: usize) -> io::Result<()> {
    stream.write_all(&(value as u64).to_le_bytes())
}

/// Read the given number of bytes from a stream, into a `Vec<u8>`. The
/// buffer grows as bytes arrive, so a size taken from an untrusted header
/// costs no more memory than the peer actually sends.
pub fn read_bytes_vec<R: Read>(stream: &mut R, size: usize) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    stream.take(size as u64).read_to_end(&mut buffer)?;
    if buffer.len() < size {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(buffer)
}

/// Read the given (const) number of bytes from a stream, into an array.
pub fn read_bytes_array<R: Read, const SIZE: usize>(stream: &mut R) -> io::Result<[u8; SIZE]> {
    let mut buffer = [0; SIZE];
    read_bytes_into(stream, &mut buffer)?;
    Ok(buffer)
}

/// Fill up the given buffer by reading bytes from a stream repeatedly until
/// the buffer is full.
pub fn read_bytes_into<R: Read>(stream: &mut R, buffer: &mut [u8]) -> io::Result<()> {
    let mut cursor = 0;
    while cursor < buffer.len() {
        match read_some(stream, &mut buffer[cursor..])? {
            0 => return Err(io::ErrorKind::UnexpectedEof.into()),
            n => cursor += n,
        }
    }
    Ok(())
}

fn read_some<R: Read>(stream: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buffer) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn usize_is_read_back_after_write() {
        let mut buffer = Vec::new();
        write_usize(&mut buffer, 38).unwrap();
        assert_eq!(buffer.len(), 8);
        assert_eq!(read_usize(&mut Cursor::new(buffer)).unwrap(), 38);
    }

    #[test]
    fn clean_eof_before_a_header_is_none() {
        let mut stream = Cursor::new(Vec::<u8>::new());
        assert!(read_usize_or_eof(&mut stream).unwrap().is_none());
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut stream = Cursor::new(vec![1, 0, 0]);
        let err = read_usize_or_eof(&mut stream).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn oversized_claim_on_a_short_stream_fails_without_allocating_it() {
        let mut stream = Cursor::new(vec![7; 16]);
        let err = read_bytes_vec(&mut stream, 1 << 40).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn body_is_read_exactly() {
        let mut stream = Cursor::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(read_bytes_vec(&mut stream, 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(read_bytes_vec(&mut stream, 2).unwrap(), vec![4, 5]);
    }

    #[test]
    fn short_body_is_an_error() {
        let mut stream = Cursor::new(vec![1, 2, 3]);
        assert!(read_bytes_vec(&mut stream, 4).is_err());
    }
}
