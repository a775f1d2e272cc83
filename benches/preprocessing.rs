use criterion::{black_box, criterion_group, criterion_main, Criterion};
use genre_classifier::preprocessing::Preprocessor;

const ARTICLE: &str = "The central bank raised interest rates for the third time this year, \
    saying inflation remained well above its target. Shares in lenders rose sharply while \
    house builders fell, and analysts said further increases couldn't be ruled out before \
    the end of the year.";

fn preprocess(c: &mut Criterion) {
    let preprocessor = Preprocessor::default();
    let long_article = ARTICLE.repeat(50);

    c.bench_function("preprocess short article", |b| {
        b.iter(|| preprocessor.preprocess(black_box(ARTICLE)))
    });

    c.bench_function("preprocess long article", |b| {
        b.iter(|| preprocessor.preprocess(black_box(&long_article)))
    });
}

criterion_group!(benches, preprocess);
criterion_main!(benches);
