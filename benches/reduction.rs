//! Per-file reduction throughput.
//!
//! Covers a four-channel polarised scan on the point detector and a
//! single-channel scan read from area-detector frames.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array3};
use reflred::data::{ExperimentData, PersonData, SampleData, SlitData};
use reflred::{CorrectionParameters, DataReduction, DataSetMetadata, MemoryProvider, Region};

fn header() -> DataSetMetadata {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    DataSetMetadata {
        owner: PersonData::new("bench"),
        experiment: ExperimentData::new("bench", "MARIA", start),
        sample: SampleData::new("bench").with_dimensions(20.0, 0.5, 10.0),
    }
}

fn polarised_scan(points: usize) -> MemoryProvider {
    let n = points * 4;
    let theta = Array1::from_shape_fn(n, |i| 0.05 + (i / 4) as f64 * 0.01);
    let counts = Array1::from_shape_fn(n, |i| 1e5 / (1.0 + (i / 4) as f64));
    let sf1: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "off" } else { "on" }).collect();
    let sf2: Vec<&str> = (0..n).map(|i| if i % 4 < 2 { "off" } else { "on" }).collect();

    MemoryProvider::new("bench.dat", header(), SlitData::new(1.0, 0.5, -2000.0, -500.0), 4.7)
        .with_scan_column("theta", theta)
        .with_state_column("sf1", &sf1)
        .with_state_column("sf2", &sf2)
        .with_column("mon1", Array1::from_elem(n, 1e4))
        .with_column("timer", Array1::from_elem(n, 10.0))
        .with_detector("det", counts)
}

fn area_scan(points: usize) -> MemoryProvider {
    let frames = Array3::from_shape_fn((points, 64, 64), |(p, y, x)| {
        (p + y + x) as f64 % 17.0
    });
    MemoryProvider::new("area.dat", header(), SlitData::new(1.0, 0.5, -2000.0, -500.0), 4.7)
        .with_scan_column("theta", Array1::linspace(0.05, 2.0, points))
        .with_column("mon1", Array1::from_elem(points, 1e4))
        .with_column("timer", Array1::from_elem(points, 10.0))
        .with_area_detector("2Ddata", frames)
}

fn bench_point_detector(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_detector");
    let params = CorrectionParameters::default();

    for points in [100usize, 1_000, 10_000] {
        let provider = polarised_scan(points);
        group.bench_with_input(BenchmarkId::new("document", points), &provider, |b, p| {
            b.iter(|| {
                let reduction = DataReduction::new(p, &params).unwrap();
                black_box(reduction.document().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_area_detector(c: &mut Criterion) {
    let mut params = CorrectionParameters::default();
    params.data_source.detector = "2Ddata".to_string();
    params.data_source.region = Some(Region::new(20, 40, 20, 40));

    let provider = area_scan(200);
    c.bench_function("area_detector_region", |b| {
        b.iter(|| {
            let reduction = DataReduction::new(&provider, &params).unwrap();
            black_box(reduction.reduce().unwrap())
        });
    });
}

criterion_group!(benches, bench_point_detector, bench_area_detector);
criterion_main!(benches);
