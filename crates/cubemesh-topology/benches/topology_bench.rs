//! Benchmarks for Cubemesh Topology
//!
//! Measures performance of:
//! - Path packing and unpacking
//! - Path-based placement
//! - World bounds queries over a populated map

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cubemesh_topology::{pack_directions, unpack_directions, NodeId, Path, SideTable, TopologyMap};

/// Deterministic zig-zag path of the given length.
fn zigzag(len: usize) -> Vec<u8> {
    (0..len).map(|i| if i % 2 == 0 { 0 } else { 3 }).collect()
}

/// Benchmark packing and unpacking at different path lengths
fn bench_path_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_codec");

    for &len in &[1usize, 4, 16, 64, 255] {
        let codes = zigzag(len);
        let packed = pack_directions(&codes);

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("pack", len), &codes, |b, codes| {
            b.iter(|| pack_directions(black_box(codes)))
        });
        group.bench_with_input(BenchmarkId::new("unpack", len), &packed, |b, packed| {
            b.iter(|| Path::unpack(black_box(packed), len))
        });
        group.bench_with_input(BenchmarkId::new("unpack_raw", len), &packed, |b, packed| {
            b.iter(|| unpack_directions(black_box(packed)))
        });
    }
    group.finish();
}

/// Benchmark placing a cube from its path
fn bench_record_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_path");

    for &len in &[1usize, 8, 32, 128] {
        let path = Path::from_steps(zigzag(len)).expect("bench path fits on the wire");
        group.bench_with_input(BenchmarkId::from_parameter(len), &path, |b, path| {
            let mut map = TopologyMap::new(SideTable::standard(), 128);
            b.iter(|| {
                map.record_path(black_box(NodeId(7)), black_box(path));
            })
        });
    }
    group.finish();
}

/// Benchmark world bounds checks as the map grows
fn bench_contains_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("contains_point");

    for &side in &[2usize, 4, 8, 16] {
        let mut map = TopologyMap::new(SideTable::standard(), 128);
        map.record_host(NodeId(u32::MAX));
        let mut id = 1u32;
        for x in 0..side {
            for y in 0..side {
                if x == 0 && y == 0 {
                    continue;
                }
                let mut steps = vec![0u8; x];
                steps.extend(std::iter::repeat(3u8).take(y));
                let path = Path::from_steps(steps).expect("grid path fits on the wire");
                map.record_path(NodeId(id), &path);
                id += 1;
            }
        }

        let far_corner = (side as i32) * 128 - 1;
        group.bench_with_input(BenchmarkId::new("hit", map.len()), &map, |b, map| {
            b.iter(|| map.contains_point(black_box(far_corner), black_box(far_corner)))
        });
        group.bench_with_input(BenchmarkId::new("miss", map.len()), &map, |b, map| {
            b.iter(|| map.contains_point(black_box(-1), black_box(-1)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_path_codec, bench_record_path, bench_contains_point);
criterion_main!(benches);
