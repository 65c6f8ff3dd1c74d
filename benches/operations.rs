/// Benchmarks for data extraction operations.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use diversity_server::dataset::{MemoryDataset, FEATURE, LATITUDE, LONGITUDE, TIME};
use diversity_server::models::{MapRequest, Selection, SeriesRequest};
use diversity_server::operation::Operation;
use diversity_server::operations;
use diversity_server::types::Mask;
use ndarray::{ArrayD, IxDyn};

const FILL_VALUE: f64 = -9999.0;

/// Build a global dataset at the given resolution in degrees, with descending latitudes.
fn dataset(resolution: f64, times: usize) -> MemoryDataset {
    let lats: Vec<f64> = (0..(180.0 / resolution) as usize)
        .map(|i| 90.0 - resolution * (i as f64 + 0.5))
        .collect();
    let lons: Vec<f64> = (0..(360.0 / resolution) as usize)
        .map(|i| -180.0 + resolution * (i as f64 + 0.5))
        .collect();
    let shape = [3, times, lats.len(), lons.len()];
    let data = ArrayD::from_shape_fn(IxDyn(&shape), |ix| {
        // Mask roughly one cell in seven.
        if (ix[2] + ix[3]) % 7 == 0 {
            FILL_VALUE
        } else {
            (ix[0] * 100 + ix[1]) as f64 + lats[ix[2]].sin() + lons[ix[3]].cos()
        }
    });
    MemoryDataset::new()
        .with_coordinate(LATITUDE, lats)
        .with_coordinate(LONGITUDE, lons)
        .with_coordinate(TIME, (0..times).map(|t| t as f64).collect())
        .with_variable(
            "mean_values",
            &[FEATURE, TIME, LATITUDE, LONGITUDE],
            data,
            Mask::fill_value(FILL_VALUE),
            Some("a,b,c"),
        )
        .unwrap()
}

fn series_request(selection: Selection) -> SeriesRequest {
    SeriesRequest {
        variable: "mean_values".to_string(),
        feature: None,
        selection,
        start_time: 0,
        end_time: None,
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    for resolution in [4.0, 2.0, 1.0] {
        let dataset = dataset(resolution, 48);
        let map = MapRequest {
            variable: "mean_values".to_string(),
            feature: Some("b".into()),
            time: 10,
        };
        c.bench_function(&format!("map({})", resolution), |b| {
            b.iter(|| operations::GetMap::execute(black_box(&dataset), black_box(&map)).unwrap())
        });

        let selections = [
            (
                "point",
                Selection::Point {
                    lon: 12.3,
                    lat: -45.6,
                },
            ),
            (
                "box",
                Selection::BoundingBox {
                    lon_min: -60.0,
                    lon_max: 60.0,
                    lat_min: 45.0,
                    lat_max: -45.0,
                },
            ),
        ];
        for (name, selection) in selections {
            let request = series_request(selection);
            c.bench_function(&format!("series_{}({})", name, resolution), |b| {
                b.iter(|| {
                    operations::GetSeries::execute(black_box(&dataset), black_box(&request))
                        .unwrap()
                })
            });
        }
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
