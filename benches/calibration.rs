use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use ndarray::Array2;
use p4m_calib_rs::image_pipeline::{
    calibration::quantize_unit_interval,
    optics::{CameraIntrinsics, CameraModel, OutputSize, VignetteModel},
    EncodingConfig, StandardTiffWriter, TiffCompression, TiffWriter,
};
use std::io::Cursor;

fn generate_gradient(width: usize, height: usize) -> Array2<f64> {
    Array2::from_shape_fn((height, width), |(y, x)| ((x + y) % 256) as f64 / 512.0)
}

/// Default lens scaled to `width`×`height`.
fn scaled_camera(width: usize, height: usize) -> CameraModel {
    let scale = width as f64 / 1600.0;
    CameraModel {
        intrinsics: CameraIntrinsics {
            fx: 1913.33333333 * scale,
            fy: 1913.33333333 * scale,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
        },
        output_size: OutputSize { width, height },
        ..CameraModel::default()
    }
}

fn benchmark_vignette(c: &mut Criterion) {
    let mut group = c.benchmark_group("vignette_by_size");
    let vignette = VignetteModel::default();

    for (width, height, label) in [(400, 325, "400x325"), (800, 650, "800x650"), (1600, 1300, "1600x1300")] {
        let image = generate_gradient(width, height);
        group.bench_with_input(BenchmarkId::from_parameter(label), &image, |b, image| {
            b.iter(|| vignette.correct(black_box(image)));
        });
    }

    group.finish();
}

fn benchmark_undistort(c: &mut Criterion) {
    let mut group = c.benchmark_group("undistort_by_size");
    group.sample_size(10);

    for (width, height, label) in [(400, 325, "400x325"), (800, 650, "800x650"), (1600, 1300, "1600x1300")] {
        let image = generate_gradient(width, height);
        let camera = scaled_camera(width, height);
        group.bench_with_input(BenchmarkId::from_parameter(label), &image, |b, image| {
            b.iter(|| camera.undistort(black_box(image)));
        });
    }

    group.finish();
}

fn benchmark_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");
    let frame = quantize_unit_interval(&generate_gradient(800, 650));

    let variants = [
        (TiffCompression::None, None, "none"),
        (TiffCompression::Lzw, None, "lzw"),
        (TiffCompression::Lzw, Some(2), "lzw_predictor"),
        (TiffCompression::DeflateBalanced, None, "deflate"),
    ];

    for (compression, predictor, label) in variants {
        let config = EncodingConfig::builder()
            .compression(compression)
            .predictor(predictor)
            .build();
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut output = Cursor::new(Vec::new());
                let _ = StandardTiffWriter.write_tiff(black_box(&frame), &mut output, &config);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_vignette, benchmark_undistort, benchmark_encoding);
criterion_main!(benches);
