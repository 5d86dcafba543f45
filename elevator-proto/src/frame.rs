//! Length-prefixed text framing: a 16-bit big-endian length, then that many payload
//! bytes, no terminator (spec §4.1).

use std::io::{self, ErrorKind, Read, Write};

use crate::error::ProtoError;
use crate::limits::MAX_FRAME_LEN;

/// Reads one frame from `r`, looping over partial reads until the length prefix and the
/// full payload have arrived. End-of-stream (at any point) is reported as
/// [`ProtoError::StreamClosed`]; `Interrupted` is retried transparently.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Vec<u8>, ProtoError> {
    let mut len_buf = [0u8; 2];
    read_exact_retrying(r, &mut len_buf)?;
    let len = u16::from_be_bytes(len_buf) as usize;

    let mut payload = vec![0u8; len];
    read_exact_retrying(r, &mut payload)?;
    Ok(payload)
}

/// Writes one frame to `w`, looping over partial writes. Rejects payloads over 65535 bytes.
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> Result<(), ProtoError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtoError::FrameTooLarge(payload.len()));
    }
    let len = (payload.len() as u16).to_be_bytes();
    write_all_retrying(w, &len)?;
    write_all_retrying(w, payload)?;
    Ok(())
}

fn read_exact_retrying<R: Read>(r: &mut R, mut buf: &mut [u8]) -> Result<(), ProtoError> {
    while !buf.is_empty() {
        match r.read(buf) {
            Ok(0) => return Err(ProtoError::StreamClosed),
            Ok(n) => buf = &mut buf[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(classify(e)),
        }
    }
    Ok(())
}

fn write_all_retrying<W: Write>(w: &mut W, mut buf: &[u8]) -> Result<(), ProtoError> {
    while !buf.is_empty() {
        match w.write(buf) {
            Ok(0) => return Err(ProtoError::StreamClosed),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(classify(e)),
        }
    }
    Ok(())
}

/// `BrokenPipe`/`ConnectionReset`/`UnexpectedEof` all mean the peer is gone for good.
fn classify(e: io::Error) -> ProtoError {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::UnexpectedEof => {
            ProtoError::StreamClosed
        }
        _ => ProtoError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_arbitrary_payload() {
        for len in [0usize, 1, 255, 256, 65535] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let mut buf = Vec::new();
            write_frame(&mut buf, &payload).unwrap();
            let mut cursor = Cursor::new(buf);
            let got = read_frame(&mut cursor).unwrap();
            assert_eq!(got, payload);
        }
    }

    #[test]
    fn rejects_oversized_payload() {
        let payload = vec![0u8; 65536];
        let mut buf = Vec::new();
        assert!(matches!(
            write_frame(&mut buf, &payload),
            Err(ProtoError::FrameTooLarge(65536))
        ));
    }

    #[test]
    fn empty_stream_is_closed() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(matches!(
            read_frame(&mut cursor),
            Err(ProtoError::StreamClosed)
        ));
    }

    #[test]
    fn truncated_payload_is_closed() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").unwrap();
        buf.truncate(buf.len() - 1);
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            read_frame(&mut cursor),
            Err(ProtoError::StreamClosed)
        ));
    }
}
