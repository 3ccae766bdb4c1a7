//! # Pipeline Benchmarks
//!
//! Performance benchmarks for checksum verification and block storage.
//!
//! Run with: `cargo bench -p databridge-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use databridge_core::{
    BlockStore, BlockType, DataBody, DataEnvelope, DataHeader, DataServer, EnvelopeForwarder,
    ForwardingFailure, MemoryBlockStore, StoredBlock, checksum,
};
use std::hint::black_box;
use std::sync::Arc;

struct NoopForwarder;

impl EnvelopeForwarder for NoopForwarder {
    fn forward(&self, _envelope: &DataEnvelope) -> Result<(), ForwardingFailure> {
        Ok(())
    }
}

fn populated_store(size: usize) -> MemoryBlockStore {
    let store = MemoryBlockStore::new();
    for i in 0..size {
        let block_type = if i % 2 == 0 {
            BlockType::BlockTypeA
        } else {
            BlockType::BlockTypeB
        };
        store
            .insert(StoredBlock::new(format!("block-{i}"), block_type, "payload"))
            .expect("insert");
    }
    store
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum_verify");

    for size in [64usize, 4096, 65536].iter() {
        let content = vec![b'x'; *size];
        let declared = checksum::digest(&content);
        group.bench_with_input(BenchmarkId::from_parameter(size), &content, |b, content| {
            b.iter(|| black_box(checksum::verify(content, &declared)));
        });
    }

    group.finish();
}

fn bench_save_envelope(c: &mut Criterion) {
    let body = "hello";
    let declared = checksum::digest(body.as_bytes());

    c.bench_function("save_envelope_memory", |b| {
        let server = DataServer::new(Arc::new(MemoryBlockStore::new()), Arc::new(NoopForwarder));
        let mut i: u64 = 0;
        b.iter(|| {
            i += 1;
            let envelope = DataEnvelope::new(
                DataHeader::new(format!("block-{i}"), BlockType::BlockTypeA),
                DataBody::new(body),
                declared.as_str(),
            );
            black_box(server.save_envelope(&envelope))
        });
    });
}

fn bench_query_by_type(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_by_type");

    for size in [100, 1000, 10000].iter() {
        let store = populated_store(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(store.find_by_type(BlockType::BlockTypeA)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_checksum,
    bench_save_envelope,
    bench_query_by_type
);
criterion_main!(benches);
