use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use magpie::ConservativeGarbageCollector;

// builds a singly linked chain of `len` blocks and returns the head address
fn build_chain(gc: &mut ConservativeGarbageCollector, len: usize) -> usize {
    let mut head = 0usize;
    for _ in 0..len {
        let block = gc.allocate(32, None).unwrap();
        unsafe { block.as_ptr().cast::<usize>().write(head) };
        head = block.as_ptr() as usize;
    }
    head
}

fn allocation(c: &mut Criterion) {
    c.bench_function("allocate_1000_blocks", |b| {
        b.iter(|| {
            let mut gc = ConservativeGarbageCollector::new(std::ptr::null::<usize>());
            for _ in 0..1000 {
                black_box(gc.allocate(black_box(32), None).unwrap());
            }
            gc
        });
    });
}

fn collection(c: &mut Criterion) {
    c.bench_function("mark_and_sweep_chain_1000_all_live", |b| {
        b.iter_batched(
            || {
                let mut gc = ConservativeGarbageCollector::new(std::ptr::null::<usize>());
                let head = build_chain(&mut gc, 1000);
                (gc, head)
            },
            |(mut gc, head)| {
                gc.collect_from_roots(&[head]);
                assert_eq!(gc.count(), 1000);
                gc
            },
            criterion::BatchSize::SmallInput,
        );
    });

    c.bench_function("sweep_1000_unreachable", |b| {
        b.iter_batched(
            || {
                let mut gc = ConservativeGarbageCollector::new(std::ptr::null::<usize>());
                build_chain(&mut gc, 1000);
                gc
            },
            |mut gc| {
                gc.collect_from_roots(&[]);
                assert_eq!(gc.count(), 0);
                gc
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, allocation, collection);
criterion_main!(benches);
