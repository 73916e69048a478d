use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mockspace::config::UrlComparison;
use mockspace::matcher::Matcher;
use mockspace::namespace::{find_match, RegisteredRule};
use mockspace::request::ProxiedRequest;
use mockspace::rule::{PatternDialect, Rule, UrlSpec};
use serde_json::json;

fn exact_rules(count: usize) -> Vec<RegisteredRule> {
    (0..count)
        .map(|i| {
            let rule = Rule::new("GET", UrlSpec::exact(format!("/api/v1/endpoint{i}")))
                .with_json(json!({"id": i}));
            RegisteredRule::new(rule, UrlComparison::Path)
        })
        .collect()
}

fn pattern_rules(count: usize) -> Vec<RegisteredRule> {
    (0..count)
        .map(|i| {
            let url = UrlSpec::pattern(&format!(r"^/api/v\d+/endpoint{i}$"), PatternDialect::Regex)
                .unwrap();
            RegisteredRule::new(Rule::new("GET", url), UrlComparison::Path)
        })
        .collect()
}

fn bench_rule_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_matching");

    for rule_count in [10, 100, 1000].iter() {
        let rules = exact_rules(*rule_count);

        let first = ProxiedRequest::from_url("GET", "/api/v1/endpoint0");
        let last = ProxiedRequest::from_url("GET", &format!("/api/v1/endpoint{}", rule_count - 1));
        let none = ProxiedRequest::from_url("GET", "/not/found");

        group.throughput(Throughput::Elements(1));
        for (name, request) in [("match_first", &first), ("match_last", &last), ("match_none", &none)] {
            group.bench_with_input(BenchmarkId::new(name, rule_count), rule_count, |b, _| {
                b.iter(|| find_match(black_box(&rules), black_box(request), UrlComparison::Path));
            });
        }
    }

    group.finish();
}

fn bench_regex_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("regex_matching");

    for rule_count in [10, 50, 100].iter() {
        let rules = pattern_rules(*rule_count);
        let request = ProxiedRequest::from_url("GET", "/api/v2/endpoint5");

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("regex_match", rule_count), rule_count, |b, _| {
            b.iter(|| find_match(black_box(&rules), black_box(&request), UrlComparison::Path));
        });
    }

    group.finish();
}

fn bench_matchers(c: &mut Criterion) {
    let mut group = c.benchmark_group("matchers");

    let query = Matcher::QueryParams {
        params: [("q".to_string(), json!(4))].into_iter().collect(),
        strict: false,
    };
    let body = Matcher::JsonBody {
        json: json!({"user": {"name": "a"}}),
        strict: false,
    };
    let request = ProxiedRequest::from_url("POST", "/items?q=4&page=2")
        .with_body(r#"{"user": {"name": "a", "age": 3}, "tags": [1, 2, 3]}"#);

    group.bench_function("query_params", |b| {
        b.iter(|| query.evaluate(black_box(&request)));
    });
    group.bench_function("json_body_subset", |b| {
        b.iter(|| body.evaluate(black_box(&request)));
    });

    group.finish();
}

criterion_group!(benches, bench_rule_matching, bench_regex_matching, bench_matchers);
criterion_main!(benches);
