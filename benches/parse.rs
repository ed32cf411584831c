//! Parsing benchmarks
//!
//! 1. Fresh parse of a storefront-like template, at growing sizes
//! 2. Incremental re-parse after a one-byte edit
//! 3. Batch parsing of many small templates
//!
//! Run with: cargo bench --bench parse
//! Add `--features parallel` to compare batch parsing on the rayon pool.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shopware_twig::{parse, parse_batch, parse_incremental, InputEdit};

const BLOCK: &str = r#"{% block sw_product_card %}
<div class="card product-box">
    <a href="/detail" :title="product.name" @click="onOpen">
        <img src="/media/p.png" alt="Product">
    </a>
    <ul><li>Size &amp; color<li>In stock</ul>
    {% if showPrice %}<span class="price">&#8364; 19.99</span>{% endif %}
    <!-- rating -->
    {% sw_icon(star, small) %}
    {% parent() %}
</div>
{% endblock %}
"#;

fn template(blocks: usize) -> Vec<u8> {
    BLOCK.repeat(blocks).into_bytes()
}

fn bench_fresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("fresh");
    for blocks in [1, 10, 100] {
        let source = template(blocks);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &source, |b, source| {
            b.iter(|| parse(black_box(source)))
        });
    }
    group.finish();
}

fn bench_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental");
    for blocks in [10, 100] {
        let old = template(blocks);
        let old_tree = parse(&old);

        // Replace one byte of content in the middle block
        let offset = BLOCK.len() * (blocks / 2) + BLOCK.find("In stock").unwrap_or(0);
        let mut new = old.clone();
        new[offset] = b'O';
        let edit = InputEdit::replace(offset, 1, 1);

        group.bench_with_input(BenchmarkId::from_parameter(blocks), &new, |b, new| {
            b.iter(|| parse_incremental(black_box(new), &old_tree, &[edit]))
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let sources: Vec<Vec<u8>> = (0..64).map(|i| template(1 + i % 4)).collect();
    c.bench_function("batch_64", |b| b.iter(|| parse_batch(black_box(&sources))));
}

criterion_group!(benches, bench_fresh, bench_incremental, bench_batch);
criterion_main!(benches);
