//! Benchmarks for the link scanner and renderer
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use hackboard::content::{document_to_html, render, render_document, scan, scan_document, LinkVariant};

fn chat_line(i: usize) -> String {
    format!(
        "msg {} see https://example.com/p/{} and www.test.org or team{}.dev tonight",
        i, i, i
    )
}

fn blog_body(lines: usize) -> String {
    (0..lines)
        .map(|i| match i % 4 {
            0 => String::new(),
            1 => format!("![shot {}](/img/{}.png) caption at hack{}.io", i, i, i),
            _ => chat_line(i),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");

    let plain = "no links in this message at all, just talk about the demo".repeat(4);
    group.bench_function("plain_text", |b| b.iter(|| scan(black_box(&plain))));

    let linked = chat_line(7);
    group.bench_function("chat_line", |b| b.iter(|| scan(black_box(&linked))));

    for lines in [10, 100, 1000] {
        let body = blog_body(lines);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_function(format!("document_{}", lines), |b| {
            b.iter(|| scan_document(black_box(&body)))
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    let segments = scan(&chat_line(3));
    group.bench_function("chat_units", |b| {
        b.iter(|| render(black_box(&segments), LinkVariant::OwnMessage))
    });

    let lines = scan_document(&blog_body(100));
    group.bench_function("document_html_100", |b| {
        b.iter(|| document_to_html(&render_document(black_box(&lines), LinkVariant::Default)))
    });

    group.finish();
}

criterion_group!(benches, bench_scan, bench_render);
criterion_main!(benches);
