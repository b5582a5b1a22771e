//! CyxCloud Codec Library
//!
//! Erasure codecs for the CyxCloud storage platform.
//! This crate provides:
//! - GF(2^8) arithmetic and matrices (polynomial 0x11D)
//! - Systematic Reed-Solomon coding with a Cauchy generator
//! - Random Linear Network Coding (RLNC) with self-describing coding chunks
//!   and recoding
//! - Profile parsing shared by both codecs
//!
//! Both codecs implement [`ErasureCodec`]:
//!
//! ```
//! use cyxcloud_codec::{all_indices, ErasureCodec, Profile, ReedSolomonCodec};
//!
//! let mut codec = ReedSolomonCodec::default();
//! let profile = Profile::new().with("k", "4").with("m", "2");
//! codec.init(&profile, &mut String::new()).unwrap();
//!
//! let object = b"hello erasure coded world";
//! let mut chunks = codec.encode(&all_indices(6), object).unwrap();
//! chunks.remove(&0);
//! chunks.remove(&5);
//!
//! let restored = codec.decode_object(&chunks, object.len()).unwrap();
//! assert_eq!(restored.as_ref(), object);
//! ```

pub mod chunk;
pub mod codec;
pub mod error;
pub mod gf;
pub mod matrix;
pub mod profile;
pub mod reed_solomon;
pub mod rlnc;

pub use chunk::{CodingHeader, CodingTag};
pub use codec::{all_indices, data_indices, ChunkIndex, ChunkMap, ChunkSet, ErasureCodec};
pub use error::{CodecError, InitError, Result};
pub use gf::Gf256;
pub use matrix::{Eliminator, GfMatrix};
pub use profile::{CodecConfig, Profile};
pub use reed_solomon::ReedSolomonCodec;
pub use rlnc::{CoefficientSource, RlncCodec, SeededRandom, ThreadRandom};

/// Default layout when no profile has been applied
/// - 2 data chunks
/// - 1 coding chunk: tolerates a single loss
pub const DEFAULT_DATA_CHUNKS: usize = 2;
pub const DEFAULT_CODING_CHUNKS: usize = 1;

/// Chunk payloads are not rounded up unless a profile asks for it.
pub const DEFAULT_CHUNK_ALIGNMENT: usize = 1;

/// Largest accepted `chunk-alignment`, one page.
pub const MAX_CHUNK_ALIGNMENT: usize = 4096;

/// Coding rows are computed on the rayon pool once chunks reach this size.
pub const PARALLEL_THRESHOLD: usize = 64 * 1024; // 64 KB
