use criterion::{black_box, criterion_group, criterion_main, Criterion};

use agora::render::render_content;
use agora::validators::generate_slug;

const POST: &str = r#"# Weekly thread

Share what you're **working on** this week. Links to [your repos](https://example.com)
are welcome, but keep it *civil*.

* one
* two
* ~~three~~

<script>alert("nope")</script>
"#;

pub fn bench_slug(c: &mut Criterion) {
    c.bench_function("slug", |b| {
        b.iter(|| generate_slug(black_box("  The Rust Programming Language!! (unofficial)  ")))
    });
}

pub fn bench_render(c: &mut Criterion) {
    c.bench_function("render", |b| b.iter(|| render_content(black_box(POST))));
}

criterion_group!(benches, bench_slug, bench_render);
criterion_main!(benches);
