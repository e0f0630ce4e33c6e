use connectinfo::{
    ColorTable, GeoRecord, GeoResolver, Language, MessageFormatter, StaticDatabase, Template,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

const CHAT_TEMPLATE: &str =
    "{PURPLE}[INFO] {DEFAULT}Player {GREY}{PLAYERNAME} {DEFAULT} connects from {GREEN}{GEOINFO} {LIME}[+]";

// Generate a database with one record per address
fn generate_db(count: u32) -> StaticDatabase {
    let mut db = StaticDatabase::new();
    for i in 0..count {
        let ip = IpAddr::V4(Ipv4Addr::from(0x0500_0000 + i));
        db.insert(
            ip,
            GeoRecord::new(
                [("en", "Germany"), ("ru", "Германия")].into_iter().collect(),
                [("en", "Berlin"), ("ru", "Берлин")].into_iter().collect(),
            ),
        );
    }
    db
}

fn bench_resolve(c: &mut Criterion) {
    let resolver = GeoResolver::new(Arc::new(generate_db(10_000)));

    c.bench_function("resolve_hit", |b| {
        b.iter(|| black_box(resolver.resolve(black_box("5.0.10.1"), Language::Ru, true)));
    });
    c.bench_function("resolve_miss", |b| {
        b.iter(|| black_box(resolver.resolve(black_box("10.0.0.1"), Language::Ru, true)));
    });
    c.bench_function("resolve_address_with_port", |b| {
        b.iter(|| {
            black_box(resolver.resolve_address(black_box("5.0.10.1:27005"), Language::En, true))
        });
    });
}

fn bench_format(c: &mut Criterion) {
    let formatter = MessageFormatter::new(ColorTable::chat());
    let compiled = Template::compile(CHAT_TEMPLATE);

    c.bench_function("format_compile_each_time", |b| {
        b.iter(|| {
            black_box(formatter.format(black_box(CHAT_TEMPLATE), "Alice", "Germany, Berlin"))
        });
    });
    c.bench_function("format_precompiled", |b| {
        b.iter(|| black_box(formatter.render(black_box(&compiled), "Alice", "Germany, Berlin")));
    });

    // The naive replace chain, for comparison
    c.bench_function("format_replace_chain", |b| {
        b.iter(|| {
            let filled = CHAT_TEMPLATE
                .replace("{PLAYERNAME}", "Alice")
                .replace("{GEOINFO}", "Germany, Berlin");
            black_box(ColorTable::chat().apply(&filled));
        });
    });
}

criterion_group!(benches, bench_resolve, bench_format);
criterion_main!(benches);
