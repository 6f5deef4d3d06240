//! Benchmarks for chatloom parsing, merging, and grouping.
//!
//! Run with: `cargo bench`
//! Run specific group: `cargo bench --bench parsing -- parse`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chatloom::attachments::AttachmentIndex;
use chatloom::config::{LocalIdentity, ParseConfig};
use chatloom::merge::merge_sources;
use chatloom::parsing::parse_source;
use chatloom::timeline::{build_timeline, SearchIndex};
use chrono::NaiveDate;

// =============================================================================
// Test Data Generators
// =============================================================================

fn generate_export(count: usize) -> String {
    let mut lines = Vec::with_capacity(count + count / 4);
    for i in 0..count {
        let sender = if i % 2 == 0 { "Alice" } else { "Bob" };
        let day = 1 + (i / 1440) % 28;
        let hour = (i / 60) % 24;
        let minute = i % 60;
        lines.push(format!(
            "{day:02}/01/2024, {hour:02}:{minute:02} - {sender}: Message number {i}"
        ));
        // Every fourth message gets a continuation line
        if i % 4 == 0 {
            lines.push(format!("continuation line for message {i}"));
        }
        if i % 50 == 0 {
            lines.push(format!(
                "{day:02}/01/2024, {hour:02}:{minute:02} - Alice: <attached: IMG-20240101-WA{:04}.jpg>",
                i % 10000
            ));
        }
    }
    lines.join("\n")
}

fn parsed_messages(count: usize) -> Vec<chatloom::Message> {
    let text = generate_export(count);
    parse_source("bench.txt", &text, &AttachmentIndex::new(), &bench_config())
        .expect("bench export parses")
        .messages
}

fn bench_config() -> ParseConfig {
    ParseConfig::new().with_local_identity(LocalIdentity::new("Alice"))
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for count in [1_000, 10_000] {
        let text = generate_export(count);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &text, |b, text| {
            b.iter(|| {
                parse_source(
                    "bench.txt",
                    black_box(text),
                    &AttachmentIndex::new(),
                    &bench_config(),
                )
            });
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    for count in [1_000, 10_000] {
        let messages = parsed_messages(count);
        group.throughput(Throughput::Elements(messages.len() as u64 * 2));
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &messages,
            |b, messages| {
                b.iter(|| merge_sources(black_box(vec![messages.clone(), messages.clone()])));
            },
        );
    }
    group.finish();
}

fn bench_timeline(c: &mut Criterion) {
    let messages = parsed_messages(10_000);
    let reference = NaiveDate::from_ymd_opt(2024, 1, 28).unwrap();
    c.bench_function("timeline/10000", |b| {
        b.iter(|| build_timeline(black_box(&messages), 10, reference));
    });
}

fn bench_search(c: &mut Criterion) {
    let messages = parsed_messages(10_000);
    let index = SearchIndex::build(&messages);
    c.bench_function("search/10000", |b| {
        b.iter(|| index.search(black_box("number 42")));
    });
}

criterion_group!(benches, bench_parse, bench_merge, bench_timeline, bench_search);
criterion_main!(benches);
