//! Reed-Solomon erasure coding
//!
//! Systematic (k, m) code over GF(2^8):
//! - chunks `0..k` are the object itself, cut into equal padded pieces
//! - chunks `k..k+m` are Cauchy combinations of the data chunks
//! - any `k` surviving chunks rebuild everything
//!
//! Coding chunk values are fixed by position, so `recode` is plain `decode`.

use crate::chunk::{self, alloc_chunk};
use crate::codec::{self, ChunkIndex, ChunkMap, ChunkSet, ErasureCodec};
use crate::error::{CodecError, InitError, Result};
use crate::gf;
use crate::matrix::GfMatrix;
use crate::profile::{CodecConfig, Profile};
use crate::PARALLEL_THRESHOLD;
use bytes::Bytes;
use rayon::prelude::*;
use std::fmt::{self, Write as _};
use tracing::{debug, error, instrument};

/// Reed-Solomon encoder/decoder
#[derive(Debug, Clone)]
pub struct ReedSolomonCodec {
    config: CodecConfig,
    /// `(k + m) x k`, identity on top
    generator: GfMatrix,
}

impl ReedSolomonCodec {
    /// Create a codec for an already validated configuration
    pub fn new(config: CodecConfig) -> std::result::Result<Self, InitError> {
        config.validate()?;
        let generator = build_generator(&config)?;
        Ok(Self { config, generator })
    }

    /// Create a codec straight from a profile
    pub fn from_profile(
        profile: &Profile,
        diagnostics: &mut dyn fmt::Write,
    ) -> std::result::Result<Self, InitError> {
        let config = CodecConfig::from_profile(profile, diagnostics)?;
        Self::new(config).map_err(|e| {
            let _ = writeln!(diagnostics, "{}", e);
            e
        })
    }

    /// Chunk `index` as the dot product of its generator row with the data
    /// chunks, one byte lane at a time.
    fn coding_chunk(&self, index: ChunkIndex, data: &[Bytes], size: usize) -> Bytes {
        let mut out = alloc_chunk(size);
        for (coeff, chunk) in self.generator.row(index).iter().zip(data) {
            gf::add_scaled(&mut out, chunk, *coeff);
        }
        out.freeze()
    }

    fn coding_chunks(&self, indices: &[ChunkIndex], data: &[Bytes], size: usize) -> ChunkMap {
        if size >= PARALLEL_THRESHOLD && indices.len() > 1 {
            indices
                .par_iter()
                .map(|&i| (i, self.coding_chunk(i, data, size)))
                .collect::<Vec<_>>()
                .into_iter()
                .collect()
        } else {
            indices
                .iter()
                .map(|&i| (i, self.coding_chunk(i, data, size)))
                .collect()
        }
    }

    /// Recover the `k` data chunks from the lowest `k` available indices.
    fn recover_data(&self, available: &ChunkMap, size: usize) -> Result<Vec<Bytes>> {
        let k = self.config.data_chunks;
        let selected: Vec<(ChunkIndex, &Bytes)> =
            available.iter().take(k).map(|(&i, c)| (i, c)).collect();

        // Lowest k indices are 0..k exactly when every data chunk survived.
        if selected.last().map(|(i, _)| *i) == Some(k - 1) {
            return Ok(selected.into_iter().map(|(_, c)| c.clone()).collect());
        }

        let rows: Vec<ChunkIndex> = selected.iter().map(|(i, _)| *i).collect();
        let decode_matrix = self.generator.select_rows(&rows)?.invert()?;

        let data = (0..k)
            .map(|j| {
                let mut out = alloc_chunk(size);
                for (coeff, (_, chunk)) in decode_matrix.row(j).iter().zip(&selected) {
                    gf::add_scaled(&mut out, chunk, *coeff);
                }
                out.freeze()
            })
            .collect();
        Ok(data)
    }

    /// Check that the coding chunks match the data chunks.
    ///
    /// Returns `Ok(false)` if any chunk is missing, sizes disagree, or a coding
    /// chunk differs from its recomputed value.
    pub fn verify(&self, chunks: &ChunkMap) -> Result<bool> {
        let k = self.config.data_chunks;
        let n = self.config.chunk_count();
        codec::check_indices(chunks.keys(), n)?;

        if chunks.len() != n {
            return Ok(false);
        }
        let Some(size) = uniform_len(chunks) else {
            return Ok(false);
        };

        let data: Vec<Bytes> = chunks.range(..k).map(|(_, c)| c.clone()).collect();
        let ok = (k..n).all(|i| {
            chunks
                .get(&i)
                .is_some_and(|c| *c == self.coding_chunk(i, &data, size))
        });
        Ok(ok)
    }
}

impl Default for ReedSolomonCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default()).expect("Default codec config should always work")
    }
}

impl ErasureCodec for ReedSolomonCodec {
    fn init(
        &mut self,
        profile: &Profile,
        diagnostics: &mut dyn fmt::Write,
    ) -> std::result::Result<(), InitError> {
        *self = Self::from_profile(profile, diagnostics)?;
        debug!(
            k = self.config.data_chunks,
            m = self.config.coding_chunks,
            "Reed-Solomon codec initialized"
        );
        Ok(())
    }

    fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn encode(&self, requested: &ChunkSet, input: &[u8]) -> Result<ChunkMap> {
        let k = self.config.data_chunks;
        codec::check_encode_input(requested, input, self.config.chunk_count())?;

        let size = codec::encode_chunk_size(&self.config, input.len())?;
        let data = chunk::split_object(input, k, size);

        let mut out: ChunkMap = requested
            .range(..k)
            .map(|&i| (i, data[i].clone()))
            .collect();
        let coding: Vec<ChunkIndex> = requested.range(k..).copied().collect();
        out.extend(self.coding_chunks(&coding, &data, size));

        debug!(
            object_size = input.len(),
            chunk_size = size,
            chunks = out.len(),
            "Reed-Solomon encode"
        );
        Ok(out)
    }

    #[instrument(skip_all, fields(requested = requested.len(), available = available.len()))]
    fn decode(&self, requested: &ChunkSet, available: &ChunkMap) -> Result<ChunkMap> {
        let k = self.config.data_chunks;
        let n = self.config.chunk_count();
        codec::check_indices(requested, n)?;
        codec::check_indices(available.keys(), n)?;

        if let Some(out) = codec::take_requested(requested, available) {
            return Ok(out);
        }
        codec::ensure_enough(available.len(), k)?;

        let size = uniform_len(available).ok_or_else(|| {
            CodecError::InvalidInput("available chunks differ in size".to_string())
        })?;

        let data = self.recover_data(available, size).map_err(|e| {
            if e == CodecError::SingularMatrix {
                error!(
                    indices = ?available.keys().take(k).collect::<Vec<_>>(),
                    "Generator submatrix is singular"
                );
            }
            e
        })?;

        let mut out = ChunkMap::new();
        let mut missing = Vec::new();
        for &i in requested {
            match available.get(&i) {
                Some(c) => {
                    out.insert(i, c.clone());
                }
                None if i < k => {
                    out.insert(i, data[i].clone());
                }
                None => missing.push(i),
            }
        }
        out.extend(self.coding_chunks(&missing, &data, size));

        debug!(chunk_size = size, "Reed-Solomon decode");
        Ok(out)
    }
}

fn build_generator(config: &CodecConfig) -> std::result::Result<GfMatrix, InitError> {
    GfMatrix::cauchy_systematic(config.data_chunks, config.coding_chunks)
        .map_err(|e| InitError::InvalidConfig(e.to_string()))
}

/// Common length of every chunk in the map, if they all agree.
fn uniform_len(chunks: &ChunkMap) -> Option<usize> {
    let mut lens = chunks.values().map(Bytes::len);
    let first = lens.next()?;
    lens.all(|l| l == first).then_some(first)
}
