//! src/headers/decode.rs
//!
//! Header decoding utilities.
//!
//! Design notes:
//! - `decode_header` works on a whole envelope and hands back the remainder.
//! - `HeaderParser` is the incremental form used by streaming decrypt: it
//!   accepts arbitrary slices and reports how many bytes belonged to the header.
//! - Only structure is validated here. JSON is parsed by `DocumentHeader::metadata`.

use crate::constants::{HEADER_LEN_PREFIX, HEADER_PREFIX_V2, VERSION_LEGACY, VERSION_METADATA};
use crate::headers::types::{DocumentHeader, HeaderError};

/// Split a whole envelope into its header and the bytes that follow it.
pub fn decode_header(buf: &[u8]) -> Result<(DocumentHeader, &[u8]), HeaderError> {
    let Some(&version) = buf.first() else {
        return Err(HeaderError::BufferTooShort { have: 0, need: 1 });
    };

    match version {
        VERSION_LEGACY => Ok((DocumentHeader::legacy(), &buf[1..])),
        VERSION_METADATA => {
            if buf.len() < HEADER_PREFIX_V2 {
                return Err(HeaderError::BufferTooShort { have: buf.len(), need: HEADER_PREFIX_V2 });
            }
            let len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
            let end = HEADER_PREFIX_V2 + len;
            if buf.len() < end {
                return Err(HeaderError::BufferTooShort { have: buf.len(), need: end });
            }
            let header = DocumentHeader::from_raw_metadata(buf[HEADER_PREFIX_V2..end].to_vec())?;
            Ok((header, &buf[end..]))
        }
        raw => Err(HeaderError::UnsupportedVersion { raw }),
    }
}

/// Outcome of feeding bytes to a `HeaderParser`.
#[derive(Debug, PartialEq, Eq)]
pub enum HeaderProgress {
    /// Every byte offered was consumed; the header is not complete yet.
    NeedMore,
    /// Header complete. `consumed` bytes of the last input belonged to it.
    Complete { header: DocumentHeader, consumed: usize },
}

/// Incremental header parser: version byte, then the u16 prefix, then exactly
/// `len` metadata bytes.
#[derive(Debug, Default)]
pub struct HeaderParser {
    seen_version: bool,
    metadata_len: Option<usize>,
    buf: Vec<u8>,
}

impl HeaderParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once any header byte has been seen.
    pub fn has_started(&self) -> bool {
        self.seen_version
    }

    /// Feed the next slice. The parser must not be fed again after `Complete`.
    pub fn feed(&mut self, input: &[u8]) -> Result<HeaderProgress, HeaderError> {
        let mut pos = 0usize;

        if !self.seen_version {
            let Some(&version) = input.first() else {
                return Ok(HeaderProgress::NeedMore);
            };
            pos = 1;
            match version {
                VERSION_LEGACY => {
                    self.seen_version = true;
                    return Ok(HeaderProgress::Complete { header: DocumentHeader::legacy(), consumed: pos });
                }
                VERSION_METADATA => self.seen_version = true,
                raw => return Err(HeaderError::UnsupportedVersion { raw }),
            }
        }

        let metadata_len = match self.metadata_len {
            Some(len) => len,
            None => {
                pos += self.fill(&input[pos..], HEADER_LEN_PREFIX);
                if self.buf.len() < HEADER_LEN_PREFIX {
                    return Ok(HeaderProgress::NeedMore);
                }
                let len = u16::from_be_bytes([self.buf[0], self.buf[1]]) as usize;
                self.buf.clear();
                self.metadata_len = Some(len);
                len
            }
        };

        pos += self.fill(&input[pos..], metadata_len);
        if self.buf.len() < metadata_len {
            return Ok(HeaderProgress::NeedMore);
        }

        let header = DocumentHeader::from_raw_metadata(std::mem::take(&mut self.buf))?;
        Ok(HeaderProgress::Complete { header, consumed: pos })
    }

    /// Copy from `input` until `buf` holds `target` bytes; returns bytes taken.
    fn fill(&mut self, input: &[u8], target: usize) -> usize {
        let take = target.saturating_sub(self.buf.len()).min(input.len());
        self.buf.extend_from_slice(&input[..take]);
        take
    }
}
