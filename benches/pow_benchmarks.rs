//! Performance benchmarks for retargeting and work computation

use bth_pow::target::scale_target;
use bth_pow::{
    block_proof, check_proof_of_work, BlockHeaderView, BlockIndex, ChainedHash, CompactTarget,
    ConsensusParams, Hash256, Hash512, HashPrimitives, RetargetAlgorithm,
};
use criterion::{criterion_group, criterion_main, Criterion};
use primitive_types::U256;
use std::hint::black_box;

/// Cheap deterministic stand-in so the bench measures the pipeline itself
struct XorFold;

impl XorFold {
    fn fold(tag: u8, data: &[u8]) -> Hash512 {
        let mut out = [tag; 64];
        for (i, byte) in data.iter().enumerate() {
            out[i % 64] = out[i % 64].rotate_left(3) ^ byte;
        }
        Hash512::new(out)
    }
}

impl HashPrimitives for XorFold {
    fn blake(&self, data: &[u8]) -> Hash512 { Self::fold(1, data) }
    fn bmw(&self, data: &[u8]) -> Hash512 { Self::fold(2, data) }
    fn luffa(&self, data: &[u8]) -> Hash512 { Self::fold(3, data) }
    fn cubehash(&self, data: &[u8]) -> Hash512 { Self::fold(4, data) }
    fn shavite(&self, data: &[u8]) -> Hash512 { Self::fold(5, data) }
    fn simd(&self, data: &[u8]) -> Hash512 { Self::fold(6, data) }
}

fn steady_chain(blocks: u64) -> BlockIndex {
    BlockIndex::from_headers(
        0,
        (0..blocks).map(|i| BlockHeaderView::new(i as i64 * 150, CompactTarget(0x1d00_ffff))),
    )
}

fn bench_retarget(c: &mut Criterion) {
    let params = ConsensusParams::default();
    let index = steady_chain(5000);
    let candidate = BlockHeaderView::new(5000 * 150, CompactTarget(0x1d00_ffff));

    for algorithm in RetargetAlgorithm::ALL {
        c.bench_function(&format!("next_target_{}", algorithm), |b| {
            b.iter(|| black_box(algorithm.next_target(index.tip(), &candidate, &params)));
        });
    }
}

fn bench_work(c: &mut Criterion) {
    let params = ConsensusParams::default();
    let bits = CompactTarget(0x1d00_ffff);
    let hash = Hash256::from_u256(&U256::from(12345u64));

    c.bench_function("block_proof", |b| {
        b.iter(|| black_box(block_proof(black_box(bits))));
    });

    c.bench_function("check_proof_of_work", |b| {
        b.iter(|| black_box(check_proof_of_work(&hash, bits, &params).is_ok()));
    });

    let index = steady_chain(2000);
    c.bench_function("chain_work_2000", |b| {
        b.iter(|| black_box(index.chain_work(index.tip().unwrap())));
    });

    let limit = params.pow_limit_value();
    let value = bits.decode().value;
    c.bench_function("scale_target", |b| {
        b.iter(|| black_box(scale_target(&value, 3450, 3600, &limit)));
    });
}

fn bench_chained_hash(c: &mut Criterion) {
    let hasher = ChainedHash::new(XorFold);
    let header = [0x42u8; 80];

    c.bench_function("chained_hash_80_bytes", |b| {
        b.iter(|| black_box(hasher.hash(black_box(&header))));
    });
}

criterion_group!(benches, bench_retarget, bench_work, bench_chained_hash);
criterion_main!(benches);
