//! Evaluator tests: programs are lexed and parsed, then run against a
//! fresh root environment with a couple of test natives installed.

use std::cell::Cell;
use std::rc::Rc;

use evolve_eval::{register_native, EvalConfig, Environment, Evaluator, NativeError, Value};
use evolve_lexer::tokenize;
use evolve_parser::Parser;
use evolve_types::{ErrorCode, EvolveError, Frame, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Run `source` in `env` with `config`.
fn run_in(env: &Environment, source: &str, config: EvalConfig) -> Result<Option<Value>, EvolveError> {
    run_named(env, "test.ev", source, config)
}

/// Like [`run_in`], with the source registered under `name`.
fn run_named(
    env: &Environment,
    name: &str,
    source: &str,
    config: EvalConfig,
) -> Result<Option<Value>, EvolveError> {
    let sf = Rc::new(SourceFile::new(name, source));
    let tokens = tokenize(&sf)?;
    let program = Parser::new(tokens, &sf)
        .with_globals(env.names())
        .parse()?;
    Evaluator::new(Rc::clone(&sf), config).evaluate(&program, env)
}

/// Environment with a `tick()` native that counts its calls.
fn counting_env() -> (Environment, Rc<Cell<u32>>) {
    let env = Environment::new();
    let ticks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&ticks);
    register_native(&env, "tick", move |_| {
        counter.set(counter.get() + 1);
        Ok(None)
    });
    (env, ticks)
}

fn run(source: &str) -> Result<Option<Value>, EvolveError> {
    run_in(&Environment::new(), source, EvalConfig::default())
}

fn eval_ok(source: &str) -> Value {
    match run(source) {
        Ok(Some(value)) => value,
        Ok(None) => panic!("program produced no value"),
        Err(e) => panic!("unexpected error:\n{e}"),
    }
}

fn eval_err(source: &str) -> EvolveError {
    match run(source) {
        Ok(value) => panic!("expected error, got {value:?}"),
        Err(e) => e,
    }
}

fn number(source: &str) -> f64 {
    let value = eval_ok(source);
    value
        .as_number()
        .unwrap_or_else(|| panic!("expected Number, got {value:?}"))
}

// ─────────────────────────────────────────────────────────────────────
// Arithmetic & operators
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_arithmetic_matches_host() {
    let pairs = [(1, 2), (7, 3), (-4, 9), (0, 5), (12, 12)];
    for (a, b) in pairs {
        let (a, b) = (a as f64, b as f64);
        assert_eq!(number(&format!("{a} + {b}")), a + b);
        assert_eq!(number(&format!("{a} - {b}")), a - b);
        assert_eq!(number(&format!("{a} * {b}")), a * b);
    }
    assert_eq!(number("2.5 * 4"), 10.0);
    assert_eq!(number("10 / 4"), 2.5);
}

#[test]
fn test_precedence_and_unary() {
    assert_eq!(number("1 + 2 * 3"), 7.0);
    assert_eq!(number("(1 + 2) * 3"), 9.0);
    assert_eq!(number("-3 + 5"), 2.0);
    assert_eq!(number("--3"), 3.0);
    assert_eq!(number("+4"), 4.0);
}

#[test]
fn test_deeply_nested_expressions_evaluate() {
    let depth = 900;
    let parens = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(number(&parens), 1.0);
    assert_eq!(number(&format!("1{}", "+1".repeat(depth))), 901.0);
    assert_eq!(number(&format!("{}7", "-".repeat(depth))), 7.0);
}

#[test]
fn test_division_by_zero() {
    let err = eval_err("var x = 1;\nx / 0;");
    assert_eq!(err.code, ErrorCode::DIVISION_BY_ZERO);
    assert_eq!(err.message, "Division by zero");
    assert_eq!(err.span.start.line, 1);
    assert_eq!(err.span.start.column, 4);
}

#[test]
fn test_relational_operators_yield_booleans() {
    assert_eq!(eval_ok("1 < 2"), Value::boolean(true));
    assert_eq!(eval_ok("2 <= 1"), Value::boolean(false));
    assert_eq!(eval_ok("3 == 3"), Value::boolean(true));
    assert_eq!(eval_ok("\"a\" != \"b\""), Value::boolean(true));
    assert_eq!(eval_ok("(1 < 2) == true"), Value::boolean(true));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval_ok("\"ev\" + \"olve\""), Value::string("evolve"));
}

#[test]
fn test_illegal_operation_names_both_operands() {
    let err = eval_err("\"a\" - 1");
    assert_eq!(err.code, ErrorCode::ILLEGAL_OPERATION);
    assert_eq!(err.message, "illegal operation '-' between String and Number");
}

// ─────────────────────────────────────────────────────────────────────
// Variables
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_declared_variable_reads_back() {
    assert_eq!(number("var x = 5;\nx"), 5.0);
    assert_eq!(number("var x = 5;\nx = x + 1;\nx"), 6.0);
}

#[test]
fn test_assignment_yields_value() {
    assert_eq!(number("var x = 2;"), 2.0);
}

#[test]
fn test_reference_is_repositioned() {
    let value = eval_ok("var x = 5;\nx");
    let span = value.span.expect("span");
    assert_eq!(span.start.line, 1);
    assert_eq!(span.start.column, 0);
}

#[test]
fn test_assignment_in_block_shadows_outer() {
    assert_eq!(number("var x = 1;\nif (true) { x = 2; }\nx"), 1.0);
}

#[test]
fn test_block_result_is_last_statement() {
    assert_eq!(number("if (true) { 1; 2; }"), 2.0);
}

#[test]
fn test_reserved_name_at_runtime() {
    let env = Environment::new();
    env.set("while", Value::number(1.0));
    let err = run_in(&env, "while + 1", EvalConfig::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::RESERVED_NAME);
}

#[test]
fn test_names_removed_after_parse_are_reported_at_runtime() {
    let env = Environment::new();
    env.set("x", Value::number(1.0));
    let sf = Rc::new(SourceFile::new("test.ev", "x"));
    let program = Parser::new(tokenize(&sf).unwrap(), &sf)
        .with_globals(env.names())
        .parse()
        .unwrap();
    let err = Evaluator::new(Rc::clone(&sf), EvalConfig::default())
        .evaluate(&program, &Environment::new())
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NOT_DEFINED);
    assert_eq!(err.message, "'x' is not defined");
}

// ─────────────────────────────────────────────────────────────────────
// Functions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_function_call() {
    assert_eq!(
        number("function add(a, b) { return a + b; }\nadd(2, 3);"),
        5.0
    );
}

#[test]
fn test_arity_mismatch() {
    let err = eval_err("function add(a, b) { return a + b; }\nadd(2);");
    assert_eq!(err.code, ErrorCode::ARITY_MISMATCH);
    assert_eq!(err.message, "'add' takes 2 argument(s), got 1");
}

#[test]
fn test_not_callable() {
    let err = eval_err("var x = 1;\nx(2);");
    assert_eq!(err.code, ErrorCode::NOT_CALLABLE);
    assert_eq!(err.message, "'x' is not callable");
}

#[test]
fn test_function_without_return_yields_last_value() {
    assert_eq!(number("function f() { 1; 2 + 2; }\nf();"), 4.0);
    assert_eq!(number("function f() { }\nf();"), 0.0);
    assert_eq!(number("function f() { if (false) { 1; } }\nf();"), 0.0);
}

#[test]
fn test_bare_return_yields_zero() {
    assert_eq!(number("function f() { return; }\nf();"), 0.0);
}

#[test]
fn test_return_stops_the_call() {
    let (env, ticks) = counting_env();
    let result = run_in(
        &env,
        "function f() { return 1; tick(); }\nf();",
        EvalConfig::default(),
    )
    .unwrap();
    assert_eq!(result, Some(Value::number(1.0)));
    assert_eq!(ticks.get(), 0);
}

#[test]
fn test_return_unwinds_out_of_nested_blocks() {
    let (env, ticks) = counting_env();
    let source = "function sign(n) {\n  if (n < 0) { if (true) { return -1; } tick(); }\n  tick();\n  return 1;\n}\nsign(-5);";
    let result = run_in(&env, source, EvalConfig::default()).unwrap();
    assert_eq!(result, Some(Value::number(-1.0)));
    assert_eq!(ticks.get(), 0);
}

#[test]
fn test_recursion_with_base_case() {
    let source = "function fact(n) {\n  if (n <= 1) { return 1; }\n  return n * fact(n - 1);\n}\nfact(10);";
    assert_eq!(number(source), 3_628_800.0);
}

#[test]
fn test_deep_terminating_recursion() {
    let source = "function sum(n) {\n  if (n == 0) { return 0; }\n  return n + sum(n - 1);\n}\nsum(500);";
    assert_eq!(number(source), 125_250.0);
}

#[test]
fn test_closure_outlives_defining_call() {
    let source = "function make(n) {\n  function add(x) { return x + n; }\n  return add;\n}\nvar add5 = make(5);\nadd5(3);";
    assert_eq!(number(source), 8.0);
}

#[test]
fn test_scoping_is_lexical() {
    let source = "var n = 1;\nfunction get() { return n; }\nfunction shadow() { var n = 2; return get(); }\nshadow();";
    assert_eq!(number(source), 1.0);
}

#[test]
fn test_parameters_do_not_leak_into_caller() {
    let env = Environment::new();
    run_in(&env, "function f(a) { var b = a; return b; }\nf(1);", EvalConfig::default()).unwrap();
    assert!(env.contains_local("f"));
    assert!(!env.contains_local("a"));
    assert!(!env.contains_local("b"));
}

#[test]
fn test_function_value_display() {
    assert_eq!(eval_ok("function f() { }").to_string(), "<function f>");
}

// ─────────────────────────────────────────────────────────────────────
// Natives
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_native_receives_evaluated_arguments() {
    let env = Environment::new();
    register_native(&env, "sum", |args| {
        Ok(Some(Value::number(
            args.iter().filter_map(Value::as_number).sum(),
        )))
    });
    let result = run_in(&env, "sum(1, 2 * 3, 4)", EvalConfig::default()).unwrap();
    assert_eq!(result, Some(Value::number(11.0)));
}

#[test]
fn test_native_without_result_yields_zero() {
    let (env, ticks) = counting_env();
    let result = run_in(&env, "tick() + tick()", EvalConfig::default()).unwrap();
    assert_eq!(result, Some(Value::number(0.0)));
    assert_eq!(ticks.get(), 2);
}

#[test]
fn test_native_failure_is_a_runtime_error() {
    let env = Environment::new();
    register_native(&env, "fail", |_| Err(NativeError::Custom("boom".into())));
    let err = run_in(&env, "var x = 1;\nfail(x);", EvalConfig::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::NATIVE_FAILURE);
    assert_eq!(err.message, "boom");
    assert_eq!(err.span.start.line, 1);
}

// ─────────────────────────────────────────────────────────────────────
// Control flow
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_else_branch_only() {
    let (env, ticks) = counting_env();
    let result = run_in(
        &env,
        "if (false) { tick(); } else { var y = 1; }",
        EvalConfig::default(),
    )
    .unwrap();
    assert_eq!(result, Some(Value::number(1.0)));
    assert_eq!(ticks.get(), 0);
}

#[test]
fn test_first_true_branch_short_circuits() {
    let (env, ticks) = counting_env();
    let source = "if (1) { 10; } elseif (tick()) { 20; } elseif (2) { tick(); } else { tick(); }";
    let result = run_in(&env, source, EvalConfig::default()).unwrap();
    assert_eq!(result, Some(Value::number(10.0)));
    assert_eq!(ticks.get(), 0);
}

#[test]
fn test_elseif_chain_in_order() {
    let source = "var x = 5;\nif (x > 10) { 1; } elseif (x > 3) { 2; } elseif (x > 0) { 3; } else { 4; }";
    assert_eq!(number(source), 2.0);
}

#[test]
fn test_if_without_match_yields_nothing() {
    assert_eq!(run("if (0) { 1; }").unwrap(), None);
}

#[test]
fn test_truthiness_of_strings() {
    assert_eq!(number("if (\"false\") { 1; } else { 2; }"), 2.0);
    assert_eq!(number("if (\"None\") { 1; } else { 2; }"), 2.0);
    assert_eq!(number("if (\"yes\") { 1; } else { 2; }"), 1.0);
}

#[test]
fn test_block_variables_are_scoped() {
    let env = Environment::new();
    run_in(&env, "if (true) { var inner = 1; }", EvalConfig::default()).unwrap();
    assert!(!env.contains_local("inner"));
}

// ─────────────────────────────────────────────────────────────────────
// Recursion limit & tracebacks
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_unbounded_recursion_hits_limit() {
    let err = eval_err("function f(n) { return f(n + 1); }\nf(0);");
    assert_eq!(err.code, ErrorCode::RECURSION_LIMIT);
    assert_eq!(err.message, "maximum recursion depth exceeded");
    // The program frame plus one per active call.
    assert_eq!(err.traceback.len(), 1001);
}

#[test]
fn test_recursion_limit_is_configurable() {
    let config = EvalConfig {
        max_call_depth: 3,
        ..EvalConfig::default()
    };
    let err = run_in(
        &Environment::new(),
        "function f() { return f(); }\nf();",
        config,
    )
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::RECURSION_LIMIT);
    assert_eq!(
        err.traceback,
        vec![
            Frame::new("<program>", "test.ev", Some(1)),
            Frame::new("f", "test.ev", Some(0)),
            Frame::new("f", "test.ev", Some(0)),
            Frame::new("f", "test.ev", Some(0)),
        ]
    );
}

#[test]
fn test_traceback_rendering() {
    let source = "function inner(x) {\n  return x / 0;\n}\nfunction outer() {\n  return inner(1);\n}\nouter();";
    let err = eval_err(source);
    let expected = "Traceback (most recent call last):\n  File test.ev, line 7, in <program>\n  File test.ev, line 5, in outer\n  File test.ev, line 2, in inner\nRuntime Error: Division by zero\nFile test.ev, line 2\n\n  return x / 0;\n             ^";
    assert_eq!(err.to_string(), expected);
}

#[test]
fn test_traceback_uses_custom_root_name() {
    let config = EvalConfig {
        root_name: "<repl>".to_string(),
        ..EvalConfig::default()
    };
    let env = Environment::root(config.root_name.clone());
    let err = run_in(&env, "1 / 0", config).unwrap_err();
    assert_eq!(err.traceback, vec![Frame::new("<repl>", "test.ev", Some(0))]);
}

#[test]
fn test_error_serializes_with_traceback() {
    let err = eval_err("function f() { return 1 / 0; }\nf();");
    let json: serde_json::Value = serde_json::from_str(&err.to_json().unwrap()).unwrap();
    assert_eq!(json["code"], 304);
    assert_eq!(json["category"], "runtime");
    assert_eq!(json["traceback"][1]["name"], "f");
    assert_eq!(json["traceback"][1]["file"], "test.ev");
}

// ─────────────────────────────────────────────────────────────────────
// Persistence across runs
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_bindings_persist_across_runs() {
    let env = Environment::new();
    let config = EvalConfig::default();
    run_in(&env, "var base = 10;", config.clone()).unwrap();
    run_in(&env, "function scale(x) { return x * base; }", config.clone()).unwrap();
    let result = run_in(&env, "scale(3)", config).unwrap();
    assert_eq!(result, Some(Value::number(30.0)));
}

#[test]
fn test_function_errors_report_their_own_source() {
    let env = Environment::new();
    let config = EvalConfig::default();
    run_in(&env, "\n\nfunction bad() { return 1 / 0; }", config.clone()).unwrap();
    let err = run_in(&env, "bad()", config).unwrap_err();
    assert_eq!(err.span.start.line, 2);
    assert!(err.excerpt.starts_with("function bad()"));
}

#[test]
fn test_traceback_frames_name_their_own_source() {
    let env = Environment::new();
    let config = EvalConfig::default();
    run_named(&env, "lib.ev", "function f(n) { return n / 0; }", config.clone()).unwrap();
    let err = run_named(&env, "main.ev", "var a = 1;\nvar b = 2;\nvar c = 3;\nf(1);", config)
        .unwrap_err();
    assert_eq!(
        err.traceback,
        vec![
            Frame::new("<program>", "main.ev", Some(3)),
            Frame::new("f", "lib.ev", Some(0)),
        ]
    );
    assert!(err.to_string().starts_with(
        "Traceback (most recent call last):\n  File main.ev, line 4, in <program>\n  File lib.ev, line 1, in f\n"
    ));
    assert_eq!(err.file, "lib.ev");
}
