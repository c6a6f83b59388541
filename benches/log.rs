use grok_extract::Extractor;

fn main() {
    divan::main();
}

const MSG: &str = "2016-09-19T18:19:00 [8.8.8.8:prd] DEBUG this is an example log message";

const PATTERNS: [&str; 3] = [
    r"%{IPV4:ip} %{GREEDYDATA:message}",
    r"%{TIMESTAMP_ISO8601:timestamp} \[%{IPV4:ip};%{WORD:environment}\] %{LOGLEVEL:log_level} %{GREEDYDATA:message}",
    r"^%{TIMESTAMP_ISO8601:timestamp} \[%{IPV4:ip}:%{WORD:environment}\] %{LOGLEVEL:log_level} %{GREEDYDATA:message}$",
];

#[divan::bench(args = [false, true])]
fn bench_log_pattern_set(b: divan::Bencher, break_on_match: bool) {
    let set = Extractor::with_default_templates()
        .expect("Error while resolving templates!")
        .compile_all(PATTERNS)
        .expect("Error while compiling!");

    b.bench(|| divan::black_box(set.extract(MSG, break_on_match)));
}

#[divan::bench]
fn bench_log_extract_all_one_shot(b: divan::Bencher) {
    let extractor = Extractor::with_default_templates().expect("Error while resolving templates!");

    b.bench(|| divan::black_box(extractor.extract_all(PATTERNS, MSG, true)));
}
