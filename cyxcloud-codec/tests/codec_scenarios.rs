//! Scenario tests for the Reed-Solomon and RLNC codecs
//!
//! Run with: cargo test --test codec_scenarios

use bytes::Bytes;
use cyxcloud_codec::{
    all_indices, data_indices, ChunkMap, CodecError, CodingHeader, CodingTag, ErasureCodec,
    Profile, ReedSolomonCodec, RlncCodec, SeededRandom,
};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn profile(k: usize, m: usize) -> Profile {
    Profile::new()
        .with("plugin", "cc")
        .with("ruleset-failure-domain", "osd")
        .with("k", k.to_string())
        .with("m", m.to_string())
}

/// Generate object data of the given size
fn generate_object(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8 ^ 0x5A).collect()
}

fn rs(k: usize, m: usize) -> ReedSolomonCodec {
    let mut codec = ReedSolomonCodec::default();
    codec.init(&profile(k, m), &mut String::new()).unwrap();
    codec
}

fn rlnc(k: usize, m: usize, seed: u64) -> RlncCodec<SeededRandom> {
    let mut codec = RlncCodec::with_source(SeededRandom::new(seed));
    codec.init(&profile(k, m), &mut String::new()).unwrap();
    codec
}

fn erase(chunks: &ChunkMap, lost: &[usize]) -> ChunkMap {
    let mut out = chunks.clone();
    for i in lost {
        out.remove(i);
    }
    out
}

#[test]
fn test_init_rs_default() {
    let codec = ReedSolomonCodec::default();
    assert_eq!(codec.data_chunk_count(), 2);
    assert_eq!(codec.chunk_count(), 3);
    assert_eq!(codec.chunk_size(20), 10);
}

#[test]
fn test_init_rs() {
    init_tracing();
    let codec = rs(4, 3);
    assert_eq!(codec.chunk_count(), 7);
    assert_eq!(codec.chunk_size(20), 5);
    assert_eq!(codec.config().failure_domain.as_deref(), Some("osd"));
}

#[test]
fn test_init_rlnc() {
    let codec = rlnc(4, 3, 0);
    assert_eq!(codec.chunk_count(), 7);
    assert_eq!(codec.chunk_size(20), 5);
}

#[test]
fn test_init_rejects_and_keeps_state() {
    let mut codec = rs(4, 3);
    let mut diagnostics = String::new();

    let result = codec.init(&profile(0, 3), &mut diagnostics);
    assert!(result.is_err());
    assert!(diagnostics.contains("k=0"));
    assert_eq!(codec.chunk_count(), 7);

    let mut fresh = RlncCodec::new();
    assert!(fresh
        .init(&Profile::new().with("k", "many"), &mut String::new())
        .is_err());
    assert_eq!(fresh.chunk_count(), 3);
}

#[test]
fn test_encode_rs() {
    let codec = rs(4, 3);
    let input = generate_object(100);
    let encoded = codec.encode(&all_indices(7), &input).unwrap();

    assert_eq!(encoded.len(), 7);
    let size = codec.chunk_size(input.len());
    assert_eq!(size, 25);
    for (i, chunk) in &encoded {
        assert_eq!(chunk.len(), size, "chunk {}", i);
    }
    for i in 0..4 {
        assert_eq!(encoded[&i].as_ref(), &input[i * size..(i + 1) * size]);
    }
}

#[test]
fn test_encode_rlnc() {
    let codec = rlnc(4, 3, 1);
    let input = generate_object(100);
    let encoded = codec.encode(&all_indices(7), &input).unwrap();

    let size = codec.chunk_size(input.len());
    for i in 0..4 {
        assert_eq!(encoded[&i].as_ref(), &input[i * size..(i + 1) * size]);
    }
    for i in 4..7 {
        assert!(encoded[&i].len() > size);
        assert_eq!(encoded[&i].len(), size + CodingHeader::len_for(4));
    }
}

#[test]
fn test_decode_rs() {
    init_tracing();
    let codec = rs(4, 4);
    let input = generate_object(4 * 64);
    let all = all_indices(8);
    let encoded = codec.encode(&all, &input).unwrap();
    assert_eq!(codec.chunk_size(input.len()), 64);

    let decoded = codec.decode(&all, &erase(&encoded, &[0, 1, 2])).unwrap();
    assert_eq!(decoded, encoded);
}

#[test]
fn test_decode_rs_object() {
    let codec = rs(6, 3);
    let input = generate_object(1000);
    let encoded = codec.encode(&all_indices(9), &input).unwrap();

    let restored = codec
        .decode_object(&erase(&encoded, &[1, 4, 7]), input.len())
        .unwrap();
    assert_eq!(restored.as_ref(), input.as_slice());
}

#[test]
fn test_decode_rlnc() {
    init_tracing();
    let input = generate_object(100);
    let all = all_indices(7);
    let mut decoded_ok = 0;

    for seed in 0..10 {
        let codec = rlnc(4, 3, seed);
        let encoded = codec.encode(&all, &input).unwrap();
        let available = erase(&encoded, &[0, 1, 2]);

        match codec.decode(&all, &available) {
            Ok(decoded) => {
                for i in 0..7 {
                    assert_eq!(decoded[&i], encoded[&i], "seed {} chunk {}", seed, i);
                }
                decoded_ok += 1;
            }
            Err(CodecError::InsufficientRank { .. }) => continue,
            Err(e) => panic!("seed {}: {}", seed, e),
        }
    }
    assert!(decoded_ok >= 8);
}

#[test]
fn test_recode_rlnc() {
    let input = generate_object(100);
    let all = all_indices(7);
    let mut recoded_ok = 0;

    for seed in 0..10 {
        let codec = rlnc(4, 3, seed);
        let encoded = codec.encode(&all, &input).unwrap();

        let recoded = match codec.recode(&all, &erase(&encoded, &[3, 4, 5])) {
            Ok(r) => r,
            Err(CodecError::InsufficientRank { .. }) => continue,
            Err(e) => panic!("seed {}: {}", seed, e),
        };
        assert_eq!(recoded.len(), 7);
        assert_eq!(recoded[&3], encoded[&3]);
        assert_eq!(recoded[&6], encoded[&6]);
        for i in [4, 5] {
            let (_, header) = CodingHeader::parse(&recoded[&i], 4).unwrap();
            assert_eq!(header.tag, CodingTag::Recoded);
        }

        match codec.decode(&data_indices(4), &erase(&recoded, &[0, 1, 2])) {
            Ok(decoded) => {
                for i in 0..4 {
                    assert_eq!(decoded[&i], encoded[&i], "seed {} chunk {}", seed, i);
                }
                recoded_ok += 1;
            }
            Err(CodecError::InsufficientRank { .. }) => continue,
            Err(e) => panic!("seed {}: {}", seed, e),
        }
    }
    assert!(recoded_ok >= 7);
}

#[test]
fn test_recoded_chunks_mix_with_survivors() {
    let input = generate_object(100);
    let all = all_indices(7);
    // Each survivor set holds at least one recoded chunk (4 or 5).
    let survivor_sets: [[usize; 4]; 3] = [[0, 1, 4, 6], [0, 2, 3, 5], [1, 4, 5, 6]];
    let mut attempts = 0;
    let mut decoded_ok = 0;

    for seed in 0..10 {
        let codec = rlnc(4, 3, seed);
        let encoded = codec.encode(&all, &input).unwrap();
        let recoded = match codec.recode(&all, &erase(&encoded, &[4, 5])) {
            Ok(r) => r,
            Err(CodecError::InsufficientRank { .. }) => continue,
            Err(e) => panic!("seed {}: {}", seed, e),
        };

        for survivors in &survivor_sets {
            let available: ChunkMap = survivors
                .iter()
                .map(|i| (*i, recoded[i].clone()))
                .collect();
            attempts += 1;

            match codec.decode(&data_indices(4), &available) {
                Ok(decoded) => {
                    for i in 0..4 {
                        assert_eq!(
                            decoded[&i], encoded[&i],
                            "seed {} survivors {:?} chunk {}",
                            seed, survivors, i
                        );
                    }
                    decoded_ok += 1;
                }
                Err(CodecError::InsufficientRank { .. }) => {}
                Err(e) => panic!("seed {} survivors {:?}: {}", seed, survivors, e),
            }
        }
    }
    assert_eq!(attempts, 30);
    assert!(decoded_ok >= 26, "{} of {} decoded", decoded_ok, attempts);
}

#[test]
fn test_oversized_alignment_rejected() {
    let mut codec = rs(2, 1);
    let mut diagnostics = String::new();
    let huge = profile(2, 1).with("chunk-alignment", "4611686018427387904");

    assert!(codec.init(&huge, &mut diagnostics).is_err());
    assert!(diagnostics.contains("chunk alignment"));
    assert_eq!(codec.chunk_size(10), 5);

    let encoded = codec.encode(&all_indices(3), &generate_object(10)).unwrap();
    assert_eq!(encoded[&0].len(), 5);

    let mut codec = rlnc(2, 1, 0);
    let paged = profile(2, 1).with("chunk-alignment", "4096");
    codec.init(&paged, &mut String::new()).unwrap();
    assert_eq!(codec.chunk_size(10), 4096);
}

#[test]
fn test_rlnc_rank_failure() {
    let codec = rlnc(4, 3, 7);
    let encoded = codec.encode(&all_indices(7), &generate_object(100)).unwrap();

    let mut available = erase(&encoded, &[0, 1, 6]);
    available.insert(5, encoded[&4].clone());

    assert!(matches!(
        codec.decode(&data_indices(4), &available),
        Err(CodecError::InsufficientRank { rank: 3, required: 4 })
    ));
}

#[test]
fn test_minimum_to_decode() {
    let codec = rs(4, 2);
    let available = [1, 2, 3, 4, 5].into_iter().collect();

    let want = [1, 2].into_iter().collect();
    assert_eq!(codec.minimum_to_decode(&want, &available).unwrap(), want);

    let want = [0].into_iter().collect();
    let plan = codec.minimum_to_decode(&want, &available).unwrap();
    assert_eq!(plan.into_iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);

    let available = [4, 5].into_iter().collect();
    assert_eq!(
        codec.minimum_to_decode(&want, &available),
        Err(CodecError::InsufficientChunks {
            available: 2,
            required: 4
        })
    );
}

#[test]
fn test_out_of_range_index_rejected() {
    let codec = rs(2, 1);
    let mut available = codec.encode(&all_indices(3), b"abcdef").unwrap();
    available.insert(9, Bytes::from_static(b"xyz"));
    assert!(matches!(
        codec.decode(&all_indices(3), &available),
        Err(CodecError::InvalidInput(_))
    ));
}

#[test]
fn test_shared_codec_across_threads() {
    let codec: Arc<dyn ErasureCodec> = Arc::new(rs(5, 3));
    let input = Arc::new(generate_object(4096));

    std::thread::scope(|s| {
        for t in 0..4usize {
            let codec = Arc::clone(&codec);
            let input = Arc::clone(&input);
            s.spawn(move || {
                let all = all_indices(8);
                let encoded = codec.encode(&all, &input).unwrap();
                let lost = [t, t + 2, t + 4];
                let restored = codec
                    .decode_object(&erase(&encoded, &lost), input.len())
                    .unwrap();
                assert_eq!(restored.as_ref(), input.as_slice());
            });
        }
    });
}

#[test]
fn test_large_object_parallel_path() {
    let codec = rs(4, 2);
    let input = generate_object(1024 * 1024);
    let all = all_indices(6);
    let encoded = codec.encode(&all, &input).unwrap();
    assert!(codec.verify(&encoded).unwrap());

    let decoded = codec.decode(&all, &erase(&encoded, &[0, 3])).unwrap();
    assert_eq!(decoded, encoded);
}
