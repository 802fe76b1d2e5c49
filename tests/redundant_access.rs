//! End-to-end scenarios for the repeated-lookup analysis.

use memolint::ast::{Arg, BinaryOp, UnaryOp};
use memolint::testkit::*;
use memolint::{analyze_procedure, ContainerModel, Finding, FindingKind, TextualHost};
use pretty_assertions::assert_eq;

fn run(body: &[memolint::ast::Stmt]) -> Vec<Finding> {
    let _ = env_logger::builder().is_test(true).try_init();
    let host = TextualHost::new(["cache"]);
    let model = ContainerModel::default();
    analyze_procedure(body, &host, &model)
}

fn lookups(findings: &[Finding]) -> Vec<(&str, &str)> {
    findings
        .iter()
        .filter_map(|finding| match &finding.kind {
            FindingKind::RedundantLookup { container, key } => {
                Some((container.as_str(), key.as_str()))
            }
            FindingKind::AwaitInLoop => None,
        })
        .collect()
}

#[test]
fn single_read_is_fine() {
    let body = vec![expr_stmt(contains_key("cache", "key"))];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn two_reads_in_a_row_are_flagged() {
    let first = contains_key("cache", "key");
    let second = contains_key("cache", "key");
    let expected_span = first.span.union(second.span);

    let body = vec![expr_stmt(first), expr_stmt(second)];
    let findings = run(&body);
    assert_eq!(lookups(&findings), vec![("cache", "key")]);
    assert_eq!(findings[0].span, expected_span);
}

#[test]
fn reads_of_different_keys_are_independent() {
    let body = vec![
        expr_stmt(contains_key("cache", "first")),
        expr_stmt(contains_key("cache", "second")),
    ];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn write_between_reads_clears_the_run() {
    let body = vec![
        expr_stmt(contains_key("cache", "key")),
        expr_stmt(method(
            ident("cache"),
            "Add",
            vec![Arg::value(ident("key")), Arg::value(ident("value"))],
        )),
        expr_stmt(contains_key("cache", "key")),
    ];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn element_write_between_reads_clears_the_run() {
    let body = vec![
        expr_stmt(contains_key("cache", "key")),
        expr_stmt(assign(index(ident("cache"), ident("key")), ident("value"))),
        expr_stmt(contains_key("cache", "key")),
    ];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn clear_between_reads_clears_every_key() {
    let body = vec![
        expr_stmt(contains_key("cache", "key")),
        expr_stmt(method(ident("cache"), "Clear", vec![])),
        expr_stmt(contains_key("cache", "key")),
    ];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn reassigning_the_key_variable_clears_the_run() {
    let body = vec![
        expr_stmt(contains_key("cache", "key")),
        expr_stmt(assign(ident("key"), ident("other"))),
        expr_stmt(contains_key("cache", "key")),
    ];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn reassigning_the_container_clears_the_run() {
    let body = vec![
        expr_stmt(contains_key("cache", "key")),
        expr_stmt(assign(ident("cache"), ident("other"))),
        expr_stmt(contains_key("cache", "key")),
    ];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn ref_argument_counts_as_a_container_rewrite() {
    let body = vec![
        expr_stmt(contains_key("cache", "key")),
        expr_stmt(call(
            ident("Rebuild"),
            vec![memolint::ast::Arg {
                mode: memolint::ast::ArgMode::Ref,
                expr: ident("cache"),
            }],
        )),
        expr_stmt(contains_key("cache", "key")),
    ];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn repeated_element_reads_are_flagged() {
    let body = vec![
        local("x", Some(index(ident("cache"), ident("key")))),
        local("y", Some(index(ident("cache"), ident("key")))),
    ];
    assert_eq!(lookups(&run(&body)), vec![("cache", "key")]);
}

#[test]
fn incrementing_an_element_is_a_write_not_a_read() {
    let body = vec![
        expr_stmt(unary(
            UnaryOp::PostIncrement,
            index(ident("cache"), ident("key")),
        )),
        expr_stmt(contains_key("cache", "key")),
    ];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn try_get_value_pairs_with_its_first_argument() {
    let probe = |out_name: &str| {
        method(
            ident("cache"),
            "TryGetValue",
            vec![Arg::value(ident("key")), Arg::out(ident(out_name))],
        )
    };
    let body = vec![expr_stmt(probe("a")), expr_stmt(probe("b"))];
    assert_eq!(lookups(&run(&body)), vec![("cache", "key")]);
}

#[test]
fn one_read_per_branch_is_fine() {
    let body = vec![if_stmt(
        ident("cond"),
        vec![expr_stmt(contains_key("cache", "key"))],
        Some(vec![expr_stmt(contains_key("cache", "key"))]),
    )];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn branch_read_plus_read_after_the_join_is_flagged() {
    let body = vec![
        if_stmt(
            ident("cond"),
            vec![expr_stmt(contains_key("cache", "key"))],
            None,
        ),
        expr_stmt(contains_key("cache", "key")),
    ];
    assert_eq!(lookups(&run(&body)), vec![("cache", "key")]);
}

#[test]
fn switch_section_read_plus_read_after_is_flagged() {
    let body = vec![
        switch_stmt(
            ident("mode"),
            vec![
                case(
                    lit("1"),
                    vec![expr_stmt(contains_key("cache", "key")), break_stmt()],
                ),
                default_case(vec![break_stmt()]),
            ],
        ),
        expr_stmt(contains_key("cache", "key")),
    ];
    assert_eq!(lookups(&run(&body)), vec![("cache", "key")]);
}

#[test]
fn try_and_catch_are_alternative_paths() {
    let body = vec![try_stmt(
        vec![expr_stmt(contains_key("cache", "key"))],
        vec![catch(None, vec![expr_stmt(contains_key("cache", "key"))])],
        None,
    )];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn read_in_try_plus_read_after_is_flagged() {
    let body = vec![
        try_stmt(
            vec![expr_stmt(contains_key("cache", "key"))],
            vec![catch(None, vec![])],
            None,
        ),
        expr_stmt(contains_key("cache", "key")),
    ];
    // Flagged: the no-exception path performs both reads.
    assert_eq!(lookups(&run(&body)), vec![("cache", "key")]);
}

#[test]
fn short_circuit_operands_both_count() {
    let body = vec![if_stmt(
        binary(
            BinaryOp::And,
            contains_key("cache", "key"),
            contains_key("cache", "key"),
        ),
        vec![expr_stmt(ident("x"))],
        None,
    )];
    assert_eq!(lookups(&run(&body)), vec![("cache", "key")]);
}

#[test]
fn single_read_per_loop_iteration_is_flagged() {
    let body = vec![while_stmt(
        ident("go"),
        vec![expr_stmt(contains_key("cache", "key"))],
    )];
    assert_eq!(lookups(&run(&body)), vec![("cache", "key")]);
}

#[test]
fn do_while_read_is_flagged() {
    let body = vec![do_while_stmt(
        vec![expr_stmt(contains_key("cache", "key"))],
        ident("go"),
    )];
    assert_eq!(lookups(&run(&body)), vec![("cache", "key")]);
}

#[test]
fn loop_read_with_write_each_iteration_is_fine() {
    let body = vec![while_stmt(
        ident("go"),
        vec![
            expr_stmt(contains_key("cache", "key")),
            expr_stmt(assign(index(ident("cache"), ident("key")), ident("value"))),
        ],
    )];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn foreach_key_is_fresh_every_iteration() {
    let body = vec![foreach_stmt(
        "k",
        ident("keys"),
        vec![expr_stmt(contains_key("cache", "k"))],
    )];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn foreach_with_a_loop_invariant_key_is_flagged() {
    let body = vec![foreach_stmt(
        "item",
        ident("items"),
        vec![expr_stmt(contains_key("cache", "key"))],
    )];
    assert_eq!(lookups(&run(&body)), vec![("cache", "key")]);
}

#[test]
fn loop_counter_key_is_fine() {
    let body = vec![for_stmt(
        vec![("i", lit("0"))],
        Some(ident("going")),
        vec![unary(UnaryOp::PostIncrement, ident("i"))],
        vec![expr_stmt(contains_key("cache", "i"))],
    )];
    assert_eq!(run(&body), Vec::new());
}

#[test]
fn literal_key_in_a_loop_is_flagged() {
    let body = vec![while_stmt(
        ident("go"),
        vec![local("x", Some(index(ident("cache"), lit("3"))))],
    )];
    assert_eq!(lookups(&run(&body)), vec![("cache", "3")]);
}

#[test]
fn unresolved_names_fall_back_to_text_identity() {
    // Same spelling, no symbols: still treated as the same storage.
    let body = vec![
        expr_stmt(contains_key("cache", "key")),
        expr_stmt(contains_key("cache", "key")),
    ];
    assert_eq!(lookups(&run(&body)), vec![("cache", "key")]);
}

#[test]
fn analysis_is_deterministic() {
    let make = || {
        vec![
            if_stmt(
                ident("cond"),
                vec![expr_stmt(contains_key("cache", "a"))],
                None,
            ),
            expr_stmt(contains_key("cache", "a")),
            expr_stmt(contains_key("cache", "b")),
            expr_stmt(contains_key("cache", "b")),
        ]
    };
    let body = make();
    let first = run(&body);
    let second = run(&body);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    // Span order.
    assert!(first[0].span.start <= first[1].span.start);
}

#[test]
fn empty_body_yields_nothing() {
    assert_eq!(run(&[]), Vec::new());
}
