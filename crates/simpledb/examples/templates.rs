//! Template formatting without a database
//!
//! Run with: cargo run --example templates -p simpledb

use simpledb::{
    DbResult, DefaultParameterFactory, StandardDialect, Template, TemplateFormatter, list, literal,
    named, param, reference, template,
};

fn show(title: &str, dialect: &StandardDialect, t: &Template) -> DbResult<()> {
    let cmd = TemplateFormatter::new(dialect).format(t, &mut DefaultParameterFactory)?;
    println!("== {title}");
    println!("   {}", cmd.text);
    for p in &cmd.parameters {
        println!("   {} = {}", p.name, p.value);
    }
    Ok(())
}

fn main() -> DbResult<()> {
    let tsql = StandardDialect::tsql();
    let pg = StandardDialect::postgres();

    show(
        "named value and reference",
        &tsql,
        &template!(
            "SELECT * FROM orders WHERE customer = {} OR referrer = {}",
            named("customer", 42),
            reference("customer"),
        ),
    )?;

    show(
        "anonymous values and an IN list",
        &pg,
        &template!(
            "SELECT * FROM t WHERE a = {} AND id IN {} AND b = {}",
            "x",
            list(vec![10, 20, 30]).parenthesized(),
            true,
        ),
    )?;

    show(
        "literals are inlined",
        &tsql,
        &template!("SELECT {} AS name, {} AS missing", literal("O'Brien"), literal(())),
    )?;

    let filter = template!("status = {} AND region = {}", named("status", "open"), "EU");
    show(
        "nested template shares the name table",
        &pg,
        &template!(
            "SELECT * FROM tickets WHERE {} AND owner <> {}",
            filter,
            param().name("owner").value("bot"),
        ),
    )?;

    // Two different values under one name are rejected.
    let conflict = template!("{} {}", named("x", 1), named("x", 2));
    match TemplateFormatter::new(&tsql).format(&conflict, &mut DefaultParameterFactory) {
        Ok(_) => println!("unexpected success"),
        Err(e) => println!("== conflict\n   {e}"),
    }

    Ok(())
}
