use comparinator::snapshot::{Framebuffer, ImageDiffer, PixelDiff};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn benchmark_pixel_diff(c: &mut Criterion) {
    let alpha = Framebuffer::with_color(1920, 1280, [245, 245, 245]);
    let mut beta = alpha.clone();
    beta.draw_rect(200, 300, 800, 120, [30, 30, 30]);

    let alpha = alpha.to_png().unwrap();
    let beta = beta.to_png().unwrap();
    let differ = PixelDiff::default();

    c.bench_function("pixel_diff_desktop", |b| {
        b.iter(|| {
            let outcome = differ.compare(black_box(&alpha), black_box(&beta));
            assert!(outcome.is_ok());
        })
    });
}

criterion_group!(benches, benchmark_pixel_diff);
criterion_main!(benches);
