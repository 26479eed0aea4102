use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pricewatch_runtime::parse_price;

fn bench_parse_price(c: &mut Criterion) {
    let inputs = ["29,99 €", "1.234,56 €", "€1,234.56", "12\u{a0}999,00\u{a0}€", "0,005"];

    c.bench_function("parse_price_mixed_locales", |b| {
        b.iter(|| {
            for raw in &inputs {
                let _ = black_box(parse_price(black_box(raw)));
            }
        })
    });
}

criterion_group!(benches, bench_parse_price);
criterion_main!(benches);
