//! Codec interface shared by the Reed-Solomon and RLNC coders
//!
//! Chunks are addressed by index: `[0, k)` are data (systematic) chunks,
//! `[k, k + m)` are coding chunks. Sets and maps are ordered by index, so any
//! "first k available" selection is deterministic.

use crate::chunk;
use crate::error::{CodecError, InitError, Result};
use crate::profile::{CodecConfig, Profile};
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type ChunkIndex = usize;
pub type ChunkSet = BTreeSet<ChunkIndex>;
pub type ChunkMap = BTreeMap<ChunkIndex, Bytes>;

/// Common capability of every coder variant.
///
/// `init` takes `&mut self`; everything else takes `&self`, so a configured
/// coder can be shared between threads and used concurrently.
pub trait ErasureCodec: Send + Sync {
    /// Reconfigure from a profile.
    ///
    /// On failure the coder keeps its previous configuration and a
    /// human-readable explanation is written to `diagnostics`.
    fn init(&mut self, profile: &Profile, diagnostics: &mut dyn fmt::Write)
        -> std::result::Result<(), InitError>;

    fn config(&self) -> &CodecConfig;

    /// k
    fn data_chunk_count(&self) -> usize {
        self.config().data_chunks
    }

    /// m
    fn coding_chunk_count(&self) -> usize {
        self.config().coding_chunks
    }

    /// k + m
    fn chunk_count(&self) -> usize {
        self.config().chunk_count()
    }

    /// Padded payload size of each chunk for an object of `object_size` bytes.
    fn chunk_size(&self, object_size: usize) -> usize {
        let config = self.config();
        chunk::chunk_size(object_size, config.data_chunks, config.chunk_alignment)
    }

    /// Produce the requested chunks of `input`.
    fn encode(&self, requested: &ChunkSet, input: &[u8]) -> Result<ChunkMap>;

    /// Reconstruct the requested chunks from the available ones.
    ///
    /// Chunks that are both requested and available are returned unchanged.
    fn decode(&self, requested: &ChunkSet, available: &ChunkMap) -> Result<ChunkMap>;

    /// Like `decode`, but requested coding chunks that are missing are
    /// re-derived. Coders whose coding chunks are fixed by position treat this
    /// exactly as `decode`.
    fn recode(&self, requested: &ChunkSet, available: &ChunkMap) -> Result<ChunkMap> {
        self.decode(requested, available)
    }

    /// Which of the `available` chunks should be read to serve `requested`.
    ///
    /// Returns `requested` itself when every requested chunk is available,
    /// otherwise the lowest `k` available indices.
    fn minimum_to_decode(&self, requested: &ChunkSet, available: &ChunkSet) -> Result<ChunkSet> {
        let n = self.chunk_count();
        check_indices(requested.iter(), n)?;
        check_indices(available.iter(), n)?;

        if requested.is_subset(available) {
            return Ok(requested.clone());
        }

        let k = self.data_chunk_count();
        ensure_enough(available.len(), k)?;
        Ok(available.iter().take(k).copied().collect())
    }

    /// Decode the data chunks and join them back into the original object.
    fn decode_object(&self, available: &ChunkMap, object_size: usize) -> Result<Bytes> {
        let k = self.data_chunk_count();
        let decoded = self.decode(&data_indices(k), available)?;

        let data = (0..k)
            .map(|i| {
                decoded.get(&i).cloned().ok_or_else(|| {
                    CodecError::InvalidInput(format!("data chunk {} was not decoded", i))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        chunk::join_object(&data, object_size)
    }
}

/// `{0, .., k-1}`
pub fn data_indices(k: usize) -> ChunkSet {
    (0..k).collect()
}

/// `{0, .., n-1}`
pub fn all_indices(n: usize) -> ChunkSet {
    (0..n).collect()
}

pub(crate) fn check_indices<'a>(
    indices: impl IntoIterator<Item = &'a ChunkIndex>,
    chunk_count: usize,
) -> Result<()> {
    match indices.into_iter().find(|&&i| i >= chunk_count) {
        Some(&i) => Err(CodecError::index_out_of_range(i, chunk_count)),
        None => Ok(()),
    }
}

pub(crate) fn ensure_enough(available: usize, required: usize) -> Result<()> {
    if available < required {
        return Err(CodecError::InsufficientChunks {
            available,
            required,
        });
    }
    Ok(())
}

pub(crate) fn check_encode_input(
    requested: &ChunkSet,
    input: &[u8],
    chunk_count: usize,
) -> Result<()> {
    check_indices(requested, chunk_count)?;
    if input.is_empty() {
        return Err(CodecError::InvalidInput(
            "cannot encode an empty object".to_string(),
        ));
    }
    Ok(())
}

/// Payload size for encoding an object of `object_size` bytes.
pub(crate) fn encode_chunk_size(config: &CodecConfig, object_size: usize) -> Result<usize> {
    let size = chunk::checked_chunk_size(object_size, config.data_chunks, config.chunk_alignment);
    size.ok_or_else(|| {
        CodecError::InvalidInput(format!(
            "object of {} bytes overflows the chunk size",
            object_size
        ))
    })
}

/// Every requested chunk copied out of `available`, if all of them are there.
pub(crate) fn take_requested(requested: &ChunkSet, available: &ChunkMap) -> Option<ChunkMap> {
    requested
        .iter()
        .map(|i| available.get(i).map(|c| (*i, c.clone())))
        .collect()
}
