//! Chunk sizing and framing
//!
//! An object of `L` bytes is cut into `k` data chunks of `chunk_size(L)` bytes
//! each; the last one is zero padded. Data chunks carry no header.
//!
//! RLNC coding chunks are framed as:
//!
//! ```text
//! +----------------------+-----+-------+-------+-----+---------+
//! | payload (chunk_size) | tag | c_0   | c_1   | ... | c_{k-1} |
//! +----------------------+-----+-------+-------+-----+---------+
//! ```
//!
//! where `c_j` is the coefficient applied to data chunk `j`.

use crate::error::{CodecError, Result};
use bytes::{Bytes, BytesMut};
use std::fmt;

/// Round `n` up to the next multiple of `alignment`; `None` on overflow.
pub fn align_up(n: usize, alignment: usize) -> Option<usize> {
    if alignment <= 1 {
        return Some(n);
    }
    n.checked_next_multiple_of(alignment)
}

/// Per-chunk payload size for an object of `object_size` bytes split `k` ways,
/// or `None` if it does not fit in a `usize`.
pub fn checked_chunk_size(object_size: usize, k: usize, alignment: usize) -> Option<usize> {
    if k == 0 {
        return Some(0);
    }
    align_up(object_size.div_ceil(k), alignment)
}

/// Like `checked_chunk_size`, saturating at `usize::MAX`.
pub fn chunk_size(object_size: usize, k: usize, alignment: usize) -> usize {
    checked_chunk_size(object_size, k, alignment).unwrap_or(usize::MAX)
}

/// Zero-initialized chunk buffer
pub fn alloc_chunk(len: usize) -> BytesMut {
    BytesMut::zeroed(len)
}

/// Split an object into `k` data chunks of `chunk_size` bytes, zero padding
/// whatever lies beyond the end of `input`.
pub fn split_object(input: &[u8], k: usize, chunk_size: usize) -> Vec<Bytes> {
    (0..k)
        .map(|i| {
            let start = (i * chunk_size).min(input.len());
            let end = ((i + 1) * chunk_size).min(input.len());
            let src = &input[start..end];

            if src.len() == chunk_size {
                Bytes::copy_from_slice(src)
            } else {
                let mut buf = alloc_chunk(chunk_size);
                buf[..src.len()].copy_from_slice(src);
                buf.freeze()
            }
        })
        .collect()
}

/// Concatenate data chunks and trim the padding off the end.
pub fn join_object(data_chunks: &[Bytes], object_size: usize) -> Result<Bytes> {
    let total: usize = data_chunks.iter().map(Bytes::len).sum();
    if total < object_size {
        return Err(CodecError::InvalidInput(format!(
            "data chunks hold {} bytes, object is {} bytes",
            total, object_size
        )));
    }

    let mut out = BytesMut::with_capacity(total);
    for chunk in data_chunks {
        out.extend_from_slice(chunk);
    }
    out.truncate(object_size);
    Ok(out.freeze())
}

/// Origin of an RLNC coding chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CodingTag {
    /// Produced by `encode`
    Encoded = 0x01,
    /// Re-derived by `recode`
    Recoded = 0x02,
}

impl TryFrom<u8> for CodingTag {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(CodingTag::Encoded),
            0x02 => Ok(CodingTag::Recoded),
            other => Err(CodecError::InvalidInput(format!(
                "unknown coding tag 0x{:02x}",
                other
            ))),
        }
    }
}

impl fmt::Display for CodingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodingTag::Encoded => write!(f, "encoded"),
            CodingTag::Recoded => write!(f, "recoded"),
        }
    }
}

/// Coding-vector header carried by RLNC coding chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingHeader {
    pub tag: CodingTag,
    pub coefficients: Vec<u8>,
}

impl CodingHeader {
    pub fn new(tag: CodingTag, coefficients: Vec<u8>) -> Self {
        Self { tag, coefficients }
    }

    /// Header length for a given `k`: one tag byte plus `k` coefficients.
    pub const fn len_for(k: usize) -> usize {
        1 + k
    }

    /// `payload ++ tag ++ coefficients`
    pub fn frame(&self, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(payload.len() + Self::len_for(self.coefficients.len()));
        buf.extend_from_slice(payload);
        buf.extend_from_slice(&[self.tag as u8]);
        buf.extend_from_slice(&self.coefficients);
        buf.freeze()
    }

    /// Split a framed chunk into its payload and header.
    pub fn parse(chunk: &[u8], k: usize) -> Result<(&[u8], CodingHeader)> {
        let header_len = Self::len_for(k);
        if chunk.len() < header_len {
            return Err(CodecError::InvalidInput(format!(
                "coding chunk is {} bytes, shorter than its {} byte header",
                chunk.len(),
                header_len
            )));
        }

        let (payload, header) = chunk.split_at(chunk.len() - header_len);
        let tag = CodingTag::try_from(header[0])?;
        Ok((payload, CodingHeader::new(tag, header[1..].to_vec())))
    }
}
