use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use simpledb::{
    DefaultParameterFactory, StandardDialect, Template, TemplateFormatter, list, named, reference,
    template,
};

/// SELECT * FROM t WHERE c0 = {0} AND c1 = {1} ... with `n` anonymous values.
fn anonymous_template(n: usize) -> Template {
    let mut format = String::from("SELECT * FROM t WHERE ");
    let mut slots = Vec::with_capacity(n);
    for i in 0..n {
        if i > 0 {
            format.push_str(" AND ");
        }
        format.push_str(&format!("c{i} = {{{i}}}"));
        slots.push(simpledb::IntoSlot::into_slot(i as i64));
    }
    Template::new(format, slots)
}

fn bench_anonymous(c: &mut Criterion) {
    let dialect = StandardDialect::tsql();
    let formatter = TemplateFormatter::new(&dialect);
    let mut group = c.benchmark_group("template/anonymous");

    for n in [1, 5, 10, 50, 100] {
        let t = anonymous_template(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &t, |b, t| {
            b.iter(|| black_box(formatter.format(t, &mut DefaultParameterFactory)));
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let dialect = StandardDialect::postgres();
    let formatter = TemplateFormatter::new(&dialect);
    let mut group = c.benchmark_group("template/in_list");

    for n in [10, 100, 1000] {
        let ids: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &ids, |b, ids| {
            b.iter(|| {
                let t = template!(
                    "SELECT * FROM t WHERE org = {} AND id IN {} AND owner = {}",
                    named("org", 7),
                    list(ids.clone()).parenthesized(),
                    reference("org"),
                );
                black_box(formatter.format(&t, &mut DefaultParameterFactory))
            });
        });
    }

    group.finish();
}

fn bench_nested(c: &mut Criterion) {
    let dialect = StandardDialect::tsql();
    let formatter = TemplateFormatter::new(&dialect);

    c.bench_function("template/nested", |b| {
        b.iter(|| {
            let inner = template!("SELECT id FROM members WHERE team = {}", named("team", 3));
            let t = template!(
                "SELECT * FROM users WHERE id IN ({}) AND team <> {}",
                inner,
                reference("team"),
            );
            black_box(formatter.format(&t, &mut DefaultParameterFactory))
        });
    });
}

criterion_group!(benches, bench_anonymous, bench_in_list, bench_nested);
criterion_main!(benches);
