use criterion::{Criterion, black_box, criterion_group, criterion_main};
use qrscan::{Scanner, decode_grayscale};

fn bench_scan_flat(c: &mut Criterion) {
    let image = vec![128u8; 640 * 480];
    c.bench_function("scan_640x480_flat", |b| {
        b.iter(|| decode_grayscale(black_box(&image), black_box(640), black_box(480), 8, false))
    });
}

fn bench_scan_stripes(c: &mut Criterion) {
    // Alternating bands exercise the run-length scanner and region labeling
    // without ever forming a symbol.
    let (w, h) = (640usize, 480usize);
    let mut image = vec![255u8; w * h];
    for y in 0..h {
        for x in 0..w {
            if (x / 5 + y / 7) % 2 == 0 {
                image[y * w + x] = 20;
            }
        }
    }
    c.bench_function("scan_640x480_stripes", |b| {
        b.iter(|| decode_grayscale(black_box(&image), black_box(640), black_box(480), 8, false))
    });
}

fn bench_scan_reused_scanner(c: &mut Criterion) {
    let image = vec![128u8; 640 * 480];
    let mut scanner = Scanner::new();
    scanner.resize(640, 480);
    c.bench_function("scan_640x480_reused", |b| {
        b.iter(|| {
            scanner.begin().copy_from_slice(black_box(&image));
            scanner.end(true);
            scanner.count()
        })
    });
}

criterion_group!(
    benches,
    bench_scan_flat,
    bench_scan_stripes,
    bench_scan_reused_scanner
);
criterion_main!(benches);
