use grok_extract::{Extractor, TemplateRegistryBuilder};

fn main() {
    divan::main();
}

fn username_extractor() -> Extractor {
    let registry = TemplateRegistryBuilder::from([("USERNAME", r"[a-zA-Z0-9._-]+")])
        .build()
        .expect("Error while resolving templates!");
    Extractor::new(registry)
}

#[divan::bench(args = ["%{USERNAME:user}", "^%{USERNAME:user}$"])]
fn bench_simple_pattern_match(b: divan::Bencher, grok: &str) {
    let pattern = username_extractor()
        .compile(grok)
        .expect("Error while compiling!");

    b.bench(|| divan::black_box(pattern.extract("user")));
}

#[divan::bench(args = ["%{USERNAME:user}", "^%{USERNAME:user}$"])]
fn bench_simple_pattern_no_match(b: divan::Bencher, grok: &str) {
    let pattern = username_extractor()
        .compile(grok)
        .expect("Error while compiling!");

    b.bench(|| divan::black_box(pattern.extract("$$$$")));
}

#[divan::bench]
fn bench_simple_pattern_with_conversion(b: divan::Bencher) {
    let pattern = username_extractor()
        .compile("%{USERNAME:user:long}")
        .expect("Error while compiling!");

    b.bench(|| divan::black_box(pattern.extract("1234567890")));
}
