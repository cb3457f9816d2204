//! stream/io.rs
//! Drive the streaming transforms from a `Read` into a `Write`.
//!
//! Chunks are read with a fixed buffer and written as soon as the transform
//! returns them, so memory use does not grow with the document size.

use std::io::{ErrorKind, Read, Write};

use crate::constants::{DEFAULT_CHUNK_SIZE, HEADER_LEN_PREFIX, VERSION_LEGACY, VERSION_METADATA};
use crate::crypto::DocumentKey;
use crate::headers::DocumentHeader;
use crate::stream::decrypt::DecryptStream;
use crate::stream::encrypt::EncryptStream;
use crate::telemetry::TelemetrySnapshot;
use crate::types::SdkError;

/// Encrypt everything `reader` yields into `writer`, prefixed by `header`.
pub fn encrypt_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    header: &[u8],
    key: &DocumentKey,
) -> Result<TelemetrySnapshot, SdkError> {
    let mut stream = EncryptStream::new(header, key)?;
    let mut buf = vec![0u8; DEFAULT_CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(SdkError::Io(e)),
        };
        writer.write_all(&stream.update(&buf[..n])?)?;
    }

    writer.write_all(&stream.finish()?)?;
    writer.flush()?;
    Ok(stream.snapshot())
}

/// Decrypt an envelope from `reader` into `writer`.
///
/// On error some unauthenticated plaintext may already have been written;
/// callers must discard the output unless this returns `Ok`.
pub fn decrypt_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    key: DocumentKey,
) -> Result<TelemetrySnapshot, SdkError> {
    let mut stream = DecryptStream::new(key);
    pump_decrypt(reader, writer, &mut stream)?;
    Ok(stream.snapshot())
}

/// Read the header first, let the caller pick the key from it, then decrypt
/// the rest. Used when the access key depends on the document id.
pub fn decrypt_stream_with<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    resolve_key: F,
) -> Result<(DocumentHeader, TelemetrySnapshot), SdkError>
where
    R: Read,
    W: Write,
    F: FnOnce(&DocumentHeader) -> Result<DocumentKey, SdkError>,
{
    let header = read_document_header(reader)?;
    let key = resolve_key(&header)?;

    let mut stream = DecryptStream::with_header(header.clone(), key);
    pump_decrypt(reader, writer, &mut stream)?;
    Ok((header, stream.snapshot()))
}

/// Read exactly the header: the version byte, the u16 prefix (version 2),
/// then `len` metadata bytes. Nothing past the header is consumed.
pub fn read_document_header<R: Read>(reader: &mut R) -> Result<DocumentHeader, SdkError> {
    let mut version = [0u8; 1];
    read_header_bytes(reader, &mut version)?;

    match version[0] {
        VERSION_LEGACY => Ok(DocumentHeader::legacy()),
        VERSION_METADATA => {
            let mut len = [0u8; HEADER_LEN_PREFIX];
            read_header_bytes(reader, &mut len)?;
            let mut metadata = vec![0u8; u16::from_be_bytes(len) as usize];
            read_header_bytes(reader, &mut metadata)?;
            Ok(DocumentHeader::from_raw_metadata(metadata)?)
        }
        other => Err(SdkError::UnsupportedVersion { version: other }),
    }
}

fn read_header_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), SdkError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => SdkError::CorruptedOrTruncatedStream("stream ended inside the header"),
        _ => SdkError::Io(e),
    })
}

fn pump_decrypt<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    stream: &mut DecryptStream,
) -> Result<(), SdkError> {
    let mut buf = vec![0u8; DEFAULT_CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "input failed during stream decrypt");
                return Err(stream.abort());
            }
        };
        writer.write_all(&stream.update(&buf[..n])?)?;
    }

    writer.write_all(&stream.finish()?)?;
    writer.flush()?;
    Ok(())
}
