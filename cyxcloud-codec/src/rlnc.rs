//! Random Linear Network Coding
//!
//! Data chunks are stored as-is. Every coding chunk is a random GF(2^8)
//! combination of the data chunks and carries its own coefficient vector, so
//! any `k` linearly independent chunks rebuild the object and new coding
//! chunks can be derived without a fixed generator.

use crate::chunk::{self, alloc_chunk, CodingHeader, CodingTag};
use crate::codec::{self, ChunkIndex, ChunkMap, ChunkSet, ErasureCodec};
use crate::error::{CodecError, InitError, Result};
use crate::gf::{self, Gf256};
use crate::matrix::Eliminator;
use crate::profile::{CodecConfig, Profile};
use crate::PARALLEL_THRESHOLD;
use bytes::Bytes;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, instrument};

/// Give up on a source that keeps returning all-zero vectors.
const MAX_DRAW_ATTEMPTS: usize = 64;

/// Where coding coefficients come from
pub trait CoefficientSource: Send + Sync {
    /// Overwrite `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]);
}

/// Per-thread OS-seeded generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl CoefficientSource for ThreadRandom {
    fn fill(&self, buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf);
    }
}

/// Deterministic generator for reproducible runs
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl CoefficientSource for SeededRandom {
    fn fill(&self, buf: &mut [u8]) {
        self.rng.lock().fill_bytes(buf);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Decode,
    Recode,
}

/// RLNC encoder/decoder
#[derive(Debug)]
pub struct RlncCodec<S = ThreadRandom> {
    config: CodecConfig,
    source: S,
}

impl RlncCodec<ThreadRandom> {
    /// Default configuration (k=2, m=1) with thread-local randomness
    pub fn new() -> Self {
        Self::with_source(ThreadRandom)
    }

    /// Create a codec straight from a profile
    pub fn from_profile(
        profile: &Profile,
        diagnostics: &mut dyn fmt::Write,
    ) -> std::result::Result<Self, InitError> {
        let config = CodecConfig::from_profile(profile, diagnostics)?;
        Self::with_config(config, ThreadRandom)
    }
}

impl Default for RlncCodec<ThreadRandom> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CoefficientSource> RlncCodec<S> {
    /// Default configuration with the given coefficient source
    pub fn with_source(source: S) -> Self {
        Self {
            config: CodecConfig::default(),
            source,
        }
    }

    pub fn with_config(config: CodecConfig, source: S) -> std::result::Result<Self, InitError> {
        config.validate()?;
        Ok(Self { config, source })
    }

    /// Framed coded chunk length for an object of `object_size` bytes
    pub fn coded_chunk_size(&self, object_size: usize) -> usize {
        self.chunk_size(object_size) + CodingHeader::len_for(self.config.data_chunks)
    }

    /// One coefficient vector of length `k`, never all zero.
    fn draw_coefficients(&self) -> Result<Vec<u8>> {
        let mut coeffs = vec![0u8; self.config.data_chunks];
        for _ in 0..MAX_DRAW_ATTEMPTS {
            self.source.fill(&mut coeffs);
            if coeffs.iter().any(|&c| c != 0) {
                return Ok(coeffs);
            }
        }
        Err(CodecError::InvalidInput(format!(
            "coefficient source returned {} all-zero vectors",
            MAX_DRAW_ATTEMPTS
        )))
    }

    /// Frame `tag` coding chunks for `indices`, each a fresh combination of `data`.
    fn coding_chunks(
        &self,
        indices: &[ChunkIndex],
        data: &[Bytes],
        size: usize,
        tag: CodingTag,
    ) -> Result<ChunkMap> {
        // Drawn up front and in index order so a seeded source stays reproducible.
        let headers = indices
            .iter()
            .map(|&i| Ok((i, CodingHeader::new(tag, self.draw_coefficients()?))))
            .collect::<Result<Vec<_>>>()?;

        let combine = |(i, header): &(ChunkIndex, CodingHeader)| {
            let mut payload = alloc_chunk(size);
            for (&c, chunk) in header.coefficients.iter().zip(data) {
                gf::add_scaled(&mut payload, chunk, Gf256(c));
            }
            (*i, header.frame(&payload))
        };

        let out = if size >= PARALLEL_THRESHOLD && headers.len() > 1 {
            headers.par_iter().map(combine).collect::<Vec<_>>()
        } else {
            headers.iter().map(combine).collect()
        };
        Ok(out.into_iter().collect())
    }

    /// Payload length shared by every available chunk.
    fn payload_len(&self, available: &ChunkMap) -> Result<usize> {
        let k = self.config.data_chunks;
        let header_len = CodingHeader::len_for(k);

        let size = match available.range(..k).next() {
            Some((_, data)) => data.len(),
            None => {
                let (i, coded) = available.iter().next().ok_or_else(|| {
                    CodecError::InvalidInput("no chunks available".to_string())
                })?;
                coded.len().checked_sub(header_len).ok_or_else(|| {
                    CodecError::InvalidInput(format!(
                        "coding chunk {} is {} bytes, shorter than its {} byte header",
                        i,
                        coded.len(),
                        header_len
                    ))
                })?
            }
        };

        for (&i, c) in available {
            let expected = if i < k { size } else { size + header_len };
            if c.len() != expected {
                return Err(CodecError::InvalidInput(format!(
                    "chunk {} is {} bytes, expected {}",
                    i,
                    c.len(),
                    expected
                )));
            }
        }
        Ok(size)
    }

    fn reconstruct(
        &self,
        requested: &ChunkSet,
        available: &ChunkMap,
        mode: Mode,
    ) -> Result<ChunkMap> {
        let k = self.config.data_chunks;
        let n = self.config.chunk_count();
        codec::check_indices(requested, n)?;
        codec::check_indices(available.keys(), n)?;

        if let Some(out) = codec::take_requested(requested, available) {
            return Ok(out);
        }
        codec::ensure_enough(available.len(), k)?;

        let size = self.payload_len(available)?;
        let mut eliminator = Eliminator::new(k, size);
        let mut unit = vec![0u8; k];

        for (&i, c) in available {
            if eliminator.is_complete() {
                break;
            }
            if i < k {
                unit.fill(0);
                unit[i] = 1;
                eliminator.absorb(&unit, c)?;
            } else {
                let (payload, header) = CodingHeader::parse(c, k)?;
                eliminator.absorb(&header.coefficients, payload)?;
            }
        }

        let rank = eliminator.rank();
        let data: Vec<Bytes> = eliminator
            .into_solution()
            .inspect_err(|_| debug!(rank, required = k, "Available chunks are rank deficient"))?
            .into_iter()
            .map(Bytes::from)
            .collect();

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

        match mode {
            Mode::Decode => {
                for i in &missing {
                    debug!(index = i, "No generator for missing coding chunk, omitted");
                }
            }
            Mode::Recode => {
                out.extend(self.coding_chunks(&missing, &data, size, CodingTag::Recoded)?);
            }
        }

        debug!(
            ?mode,
            chunk_size = size,
            returned = out.len(),
            "RLNC reconstruct"
        );
        Ok(out)
    }
}

impl<S: CoefficientSource> ErasureCodec for RlncCodec<S> {
    fn init(
        &mut self,
        profile: &Profile,
        diagnostics: &mut dyn fmt::Write,
    ) -> std::result::Result<(), InitError> {
        self.config = CodecConfig::from_profile(profile, diagnostics)?;
        debug!(
            k = self.config.data_chunks,
            m = self.config.coding_chunks,
            "RLNC codec initialized"
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
        out.extend(self.coding_chunks(&coding, &data, size, CodingTag::Encoded)?);

        debug!(
            object_size = input.len(),
            chunk_size = size,
            chunks = out.len(),
            "RLNC encode"
        );
        Ok(out)
    }

    #[instrument(skip_all, fields(requested = requested.len(), available = available.len()))]
    fn decode(&self, requested: &ChunkSet, available: &ChunkMap) -> Result<ChunkMap> {
        self.reconstruct(requested, available, Mode::Decode)
    }

    #[instrument(skip_all, fields(requested = requested.len(), available = available.len()))]
    fn recode(&self, requested: &ChunkSet, available: &ChunkMap) -> Result<ChunkMap> {
        self.reconstruct(requested, available, Mode::Recode)
    }
}
