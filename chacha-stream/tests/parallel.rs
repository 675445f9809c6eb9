//! Parallel chunk scheduling must be indistinguishable from sequential
//! processing.
#![cfg(feature = "parallel")]

use chacha_stream::{ChaCha, Error, Status, Tuning};
use rand::{Rng, SeedableRng, rngs::StdRng};

const KEY: [u8; 32] = [0x42; 32];
const NONCE: [u8; 8] = [0x24; 8];

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf[..]);
    buf
}

fn encrypt_with(tuning: Tuning, rounds: u32, data: &[u8]) -> Vec<u8> {
    let mut cipher = ChaCha::with_tuning(&KEY, &NONCE, tuning).unwrap();
    cipher.set_rounds(rounds).unwrap();
    let mut out = vec![0u8; data.len()];
    assert_eq!(cipher.encrypt(data, &mut out), Ok(Status::Complete(data.len())));
    out
}

#[test]
fn lengths_around_threshold() {
    init_logging();
    let tuning = Tuning::new().with_blocks_per_chunk(2).with_max_workers(4);
    let threshold = tuning.parallel_threshold();
    assert_eq!(threshold, 256);

    for len in [threshold - 1, threshold, threshold + 1, 3 * 128, 3 * 128 + 17, 4096 + 5] {
        let data = random_bytes(len, len as u64);
        for rounds in [8, 12, 20] {
            assert_eq!(
                encrypt_with(tuning, rounds, &data),
                encrypt_with(Tuning::sequential(), rounds, &data),
                "len {len}, rounds {rounds}"
            );
        }
    }
}

#[test]
fn default_tuning_matches_sequential() {
    init_logging();
    let len = Tuning::default().parallel_threshold() * 3 + 1000;
    let data = random_bytes(len, 7);
    assert_eq!(
        encrypt_with(Tuning::default(), 20, &data),
        encrypt_with(Tuning::sequential(), 20, &data)
    );
}

#[test]
fn leading_partial_block() {
    init_logging();
    let data = random_bytes(5000, 1);
    let expected = encrypt_with(Tuning::sequential(), 20, &data);

    let tuning = Tuning::new().with_blocks_per_chunk(3);
    let mut cipher = ChaCha::with_tuning(&KEY, &NONCE, tuning).unwrap();
    let mut out = vec![0u8; data.len()];
    let (head, tail) = out.split_at_mut(37);
    cipher.encrypt(&data[..37], head).unwrap();
    cipher.encrypt(&data[37..], tail).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn single_worker() {
    init_logging();
    let data = random_bytes(10_000, 2);
    let tuning = Tuning::new().with_blocks_per_chunk(4).with_max_workers(1);
    assert_eq!(
        encrypt_with(tuning, 20, &data),
        encrypt_with(Tuning::sequential(), 20, &data)
    );
}

#[test]
fn counter_follows_parallel_batch() {
    init_logging();
    let mut parallel =
        ChaCha::with_tuning(&KEY, &NONCE, Tuning::new().with_blocks_per_chunk(2)).unwrap();
    let mut sequential = ChaCha::with_tuning(&KEY, &NONCE, Tuning::sequential()).unwrap();

    // 7 chunks of 2 blocks go to workers, the remainder is sequential
    let mut a = vec![0u8; 14 * 64 + 100];
    let mut b = a.clone();
    parallel.keystream(&mut a).unwrap();
    sequential.keystream(&mut b).unwrap();
    assert_eq!(a, b);
    assert_eq!(parallel.counter(), 16);
    assert_eq!(parallel.counter(), sequential.counter());

    let mut a = [0u8; 50];
    let mut b = [0u8; 50];
    parallel.keystream(&mut a).unwrap();
    sequential.keystream(&mut b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn retuning_between_calls() {
    init_logging();
    let data = random_bytes(20_000, 3);
    let expected = encrypt_with(Tuning::sequential(), 12, &data);

    let mut cipher = ChaCha::new(&KEY, &NONCE).unwrap();
    cipher.set_rounds(12).unwrap();
    let mut out = vec![0u8; data.len()];
    let (first, rest) = out.split_at_mut(6000);
    let (second, third) = rest.split_at_mut(7000);

    cipher.tune_parallel(3, 2);
    assert_eq!(cipher.tuning().blocks_per_chunk(), 3);
    assert_eq!(cipher.tuning().max_workers(), 2);
    cipher.encrypt(&data[..6000], first).unwrap();

    cipher.use_parallel(false);
    cipher.encrypt(&data[6000..13_000], second).unwrap();

    cipher.use_parallel(true);
    cipher.tune_parallel(0, 0);
    assert_eq!(cipher.tuning(), Tuning::default());
    cipher.encrypt(&data[13_000..], third).unwrap();

    assert_eq!(out, expected);
}

#[test]
fn near_counter_end() {
    init_logging();
    let tuning = Tuning::new().with_blocks_per_chunk(2);
    for start in [u64::MAX - 20, u64::MAX - 8, u64::MAX - 4, u64::MAX - 2] {
        let mut parallel = ChaCha::with_tuning(&KEY, &NONCE, tuning).unwrap();
        let mut sequential = ChaCha::with_tuning(&KEY, &NONCE, Tuning::sequential()).unwrap();
        parallel.seek(start);
        sequential.seek(start);

        let mut a = vec![0u8; 2000];
        let mut b = vec![0u8; 2000];
        let status = parallel.keystream(&mut a).unwrap();
        assert_eq!(status, sequential.keystream(&mut b).unwrap());
        assert!(status.is_exhausted());
        assert_eq!(status.len() as u64, (u64::MAX - start + 1) * 64);
        assert_eq!(a, b);
        assert_eq!(parallel.keystream(&mut a[..1]), Err(Error::UseAfterExhaustion));
    }
}

#[test]
fn batch_ends_on_last_block() {
    init_logging();
    let tuning = Tuning::new().with_blocks_per_chunk(2);
    let mut cipher = ChaCha::with_tuning(&KEY, &NONCE, tuning).unwrap();
    let mut sequential = ChaCha::with_tuning(&KEY, &NONCE, Tuning::sequential()).unwrap();
    cipher.seek(u64::MAX - 8);
    sequential.seek(u64::MAX - 8);

    // four chunks run in parallel, the final block is generated sequentially
    let mut a = vec![0u8; 9 * 64];
    let mut b = a.clone();
    assert_eq!(cipher.keystream(&mut a), Ok(Status::Complete(9 * 64)));
    sequential.keystream(&mut b).unwrap();
    assert_eq!(a, b);
    assert!(cipher.is_exhausted());

    assert_eq!(cipher.keystream(&mut a), Ok(Status::Exhausted(0)));
    assert_eq!(cipher.keystream(&mut a), Err(Error::UseAfterExhaustion));
}

#[test]
fn concurrent_contexts() {
    init_logging();
    let data = random_bytes(30_000, 4);
    let expected = encrypt_with(Tuning::sequential(), 20, &data);

    std::thread::scope(|s| {
        for workers in 1..=4 {
            let data = &data;
            let expected = &expected;
            s.spawn(move || {
                let tuning = Tuning::new().with_blocks_per_chunk(5).with_max_workers(workers);
                assert_eq!(&encrypt_with(tuning, 20, data), expected);
            });
        }
    });
}
