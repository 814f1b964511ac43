//! End-to-end tests for the interpreter.
//!
//! Programs are built with `kite_ir::build` and run against a buffered
//! print handler; assertions are on printed output and returned values.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::sync::Arc;

use kite_eval::{buffer_handler, Interpreter, SharedPrintHandler};
use kite_ir::build::*;
use kite_ir::{BinaryOp, Stmt};
use kite_value::{
    Env, EvalError, EvalErrorKind, FuncValue, InterruptReason, StructType, TypeDesc, Value,
};
use pretty_assertions::assert_eq;

struct Harness {
    interp: Interpreter,
    env: Env,
    out: SharedPrintHandler,
}

impl Harness {
    fn new() -> Self {
        Self::with(Interpreter::builder())
    }

    fn with(builder: kite_eval::InterpreterBuilder) -> Self {
        let out = buffer_handler();
        let interp = builder.print_handler(Arc::clone(&out)).build();
        let env = interp.new_env();
        Harness { interp, env, out }
    }

    fn run(&self, program: &[Stmt]) -> Result<Value, EvalError> {
        self.interp.execute(program, &self.env)
    }

    fn output(&self) -> String {
        self.out.get_output()
    }
}

fn println_(args: Vec<kite_ir::Expr>) -> Stmt {
    expr_stmt(call("println", args))
}

/// Run `program` and return what it printed.
fn output_of(program: &[Stmt]) -> String {
    let h = Harness::new();
    h.run(program).unwrap();
    h.output()
}

#[test]
fn continue_skips_the_rest_of_the_body() {
    let program = vec![for_in(
        &["v"],
        array(vec![int(1), int(2), int(3)]),
        vec![
            if_(eq(ident("v"), int(2)), vec![cont()]),
            println_(vec![ident("v")]),
        ],
    )];
    assert_eq!(output_of(&program), "1\n3\n");
}

#[test]
fn c_style_for_counts() {
    let program = vec![c_for(
        Some(assign(ident("i"), int(0))),
        Some(lt(ident("i"), int(3))),
        Some(expr_stmt(inc(ident("i")))),
        vec![println_(vec![ident("i")])],
    )];
    assert_eq!(output_of(&program), "0\n1\n2\n");
}

#[test]
fn break_leaves_only_the_innermost_loop() {
    let program = vec![for_in(
        &["i"],
        array(vec![int(1), int(2)]),
        vec![
            loop_(None, vec![brk()]),
            println_(vec![ident("i")]),
        ],
    )];
    assert_eq!(output_of(&program), "1\n2\n");
}

#[test]
fn return_leaves_nested_loops() {
    let program = vec![
        expr_stmt(func_named(
            "find",
            &[],
            vec![
                for_in(
                    &["i"],
                    array(vec![int(1), int(2), int(3)]),
                    vec![if_(
                        eq(ident("i"), int(2)),
                        vec![ret(vec![mul(ident("i"), int(10))])],
                    )],
                ),
                ret(vec![int(0)]),
            ],
        )),
        println_(vec![call("find", vec![])]),
    ];
    assert_eq!(output_of(&program), "20\n");
}

#[test]
fn break_outside_a_loop_is_an_error() {
    let h = Harness::new();
    let err = h.run(&[brk()]).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::InvalidOperation);
}

#[test]
fn top_level_value_is_the_last_statement() {
    let h = Harness::new();
    let value = h.run(&[expr_stmt(add(int(40), int(2)))]).unwrap();
    assert!(matches!(value, Value::Int(42)));
}

#[test]
fn try_catch_finally() {
    let program = vec![try_catch(
        vec![throw(string("boom")), println_(vec![string("unreachable")])],
        Some("e"),
        vec![println_(vec![ident("e")])],
        Some(vec![println_(vec![string("done")])]),
    )];
    assert_eq!(output_of(&program), "boom\ndone\n");
}

#[test]
fn finally_runs_when_the_error_escapes() {
    let h = Harness::new();
    let program = vec![try_catch(
        Vec::new(),
        None,
        Vec::new(),
        Some(vec![throw(string("from finally"))]),
    )];
    let err = h.run(&program).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Thrown);
    assert_eq!(err.message, "from finally");
}

#[test]
fn deferred_calls_run_newest_first() {
    let program = vec![
        defer(call("println", vec![string("f1")])),
        defer(call("println", vec![string("f2")])),
        defer(call("println", vec![string("f3")])),
    ];
    assert_eq!(output_of(&program), "f3\nf2\nf1\n");
}

#[test]
fn deferred_calls_run_on_error() {
    let h = Harness::new();
    let program = vec![
        expr_stmt(func_named(
            "work",
            &[],
            vec![
                defer(call("println", vec![string("f1")])),
                defer(call("println", vec![string("f2")])),
                throw(string("fail")),
            ],
        )),
        expr_stmt(call("work", vec![])),
    ];
    let err = h.run(&program).unwrap_err();
    assert_eq!(err.message, "fail");
    assert_eq!(h.output(), "f2\nf1\n");
}

#[test]
fn deferred_arguments_are_evaluated_at_defer_time() {
    let program = vec![
        assign(ident("x"), int(1)),
        defer(call("println", vec![ident("x")])),
        assign(ident("x"), int(2)),
    ];
    assert_eq!(output_of(&program), "1\n");
}

fn define_variadic_host(env: &Env) {
    env.define_value(
        "f",
        Value::Func(FuncValue::host(
            "f",
            vec![TypeDesc::Int, TypeDesc::slice(TypeDesc::Int)],
            true,
            |_, args| Ok(vec![Value::string(format!("{} {}", args[0], args[1]))]),
        )),
    );
}

#[test]
fn variadic_host_packs_trailing_arguments() {
    let h = Harness::new();
    define_variadic_host(&h.env);
    h.run(&[
        println_(vec![call("f", vec![int(1), int(2), int(3)])]),
        println_(vec![call("f", vec![int(1)])]),
    ])
    .unwrap();
    assert_eq!(h.output(), "1 [2 3]\n1 []\n");
}

#[test]
fn variadic_host_accepts_a_spread_array() {
    let h = Harness::new();
    define_variadic_host(&h.env);
    h.run(&[
        assign(ident("xs"), array(vec![int(4), int(5)])),
        println_(vec![call_spread("f", vec![int(1), ident("xs")])]),
    ])
    .unwrap();
    assert_eq!(h.output(), "1 [4 5]\n");
}

#[test]
fn missing_arguments_are_reported() {
    let h = Harness::new();
    define_variadic_host(&h.env);
    let err = h.run(&[expr_stmt(call("f", vec![]))]).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::ArgumentCountMismatch {
            expected: 2,
            got: 0
        }
    );
}

#[test]
fn argument_types_are_checked() {
    let h = Harness::new();
    define_variadic_host(&h.env);
    let err = h
        .run(&[expr_stmt(call("f", vec![array(Vec::new())]))])
        .unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::ArgumentTypeMismatch { .. }));
}

#[test]
fn script_variadic_function() {
    let program = vec![
        assign(
            ident("count"),
            func_variadic(&["first", "rest"], vec![ret(vec![len(ident("rest"))])]),
        ),
        println_(vec![call("count", vec![int(1), int(2), int(3)])]),
    ];
    assert_eq!(output_of(&program), "2\n");
}

#[test]
fn multiple_results_chain_into_a_call() {
    let h = Harness::new();
    h.env.define_value(
        "pair",
        Value::Func(FuncValue::host("pair", Vec::new(), false, |_, _| {
            Ok(vec![Value::Int(1), Value::string("a")])
        })),
    );
    h.run(&[println_(vec![call("pair", vec![])])]).unwrap();
    assert_eq!(h.output(), "1 a\n");
}

#[test]
fn appending_by_writing_at_len() {
    let program = vec![
        assign(ident("a"), array(vec![int(1), int(2)])),
        assign(index(ident("a"), len(ident("a"))), int(3)),
        println_(vec![ident("a")]),
    ];
    assert_eq!(output_of(&program), "[1 2 3]\n");
}

#[test]
fn writing_past_len_is_out_of_range() {
    let h = Harness::new();
    let err = h
        .run(&[
            assign(ident("a"), array(vec![int(1)])),
            assign(index(ident("a"), int(5)), int(3)),
        ])
        .unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::IndexOutOfRange { index: 5, len: 1 });
}

#[test]
fn equality_across_kinds() {
    let program = vec![println_(vec![
        eq(int(1), float(1.0)),
        eq(string("a"), string("a")),
        eq(nil(), nil()),
        eq(int(1), string("1")),
        eq(string("a"), string("b")),
    ])];
    assert_eq!(output_of(&program), "true true true true false\n");
}

#[test]
fn mixed_string_and_number_concatenation() {
    let program = vec![println_(vec![
        add(string("x"), int(1)),
        add(int(1), string("x")),
        add(int(1), float(0.5)),
    ])];
    assert_eq!(output_of(&program), "x1 1x 1.5\n");
}

#[test]
fn compound_assignment() {
    let program = vec![
        assign(ident("n"), int(10)),
        expr_stmt(op_assign(BinaryOp::Sub, ident("n"), int(4))),
        println_(vec![ident("n")]),
    ];
    assert_eq!(output_of(&program), "6\n");
}

#[test]
fn pointer_aliases_the_variable() {
    let program = vec![
        assign(ident("x"), int(1)),
        assign(ident("p"), addr_of(ident("x"))),
        assign(deref(ident("p")), int(5)),
        println_(vec![ident("x"), deref(ident("p"))]),
    ];
    assert_eq!(output_of(&program), "5 5\n");
}

#[test]
fn map_presence() {
    let program = vec![
        assign(
            ident("m"),
            typed_map(ty("string"), ty("int"), vec![(string("a"), int(1))]),
        ),
        let_presence(vec![ident("v"), ident("ok")], index(ident("m"), string("a"))),
        println_(vec![ident("v"), ident("ok")]),
        let_presence(vec![ident("v"), ident("ok")], index(ident("m"), string("b"))),
        println_(vec![ident("v"), ident("ok")]),
    ];
    assert_eq!(output_of(&program), "1 true\n0 false\n");
}

#[test]
fn nil_map_is_allocated_on_first_write() {
    let program = vec![
        assign(ident("z"), new(map_of(ty("string"), ty("int")))),
        assign(index(deref(ident("z")), string("k")), int(7)),
        println_(vec![index(deref(ident("z")), string("k"))]),
    ];
    assert_eq!(output_of(&program), "7\n");
}

#[test]
fn delete_removes_map_keys() {
    let program = vec![
        assign(ident("m"), map(vec![(string("a"), int(1)), (string("b"), int(2))])),
        expr_stmt(delete(ident("m"), Some(string("a")))),
        println_(vec![len(ident("m")), index(ident("m"), string("b"))]),
        println_(vec![include(int(2), array(vec![int(1), string("2")]))]),
    ];
    assert_eq!(output_of(&program), "1 2\ntrue\n");
}

#[test]
fn switch_picks_the_matching_case() {
    let program = vec![switch(
        int(3),
        vec![
            case(vec![int(1)], vec![println_(vec![string("one")])]),
            case(vec![int(2), int(3)], vec![println_(vec![string("two or three")])]),
        ],
        Some(vec![println_(vec![string("other")])]),
    )];
    assert_eq!(output_of(&program), "two or three\n");
}

#[test]
fn modules_and_dotted_names() {
    let program = vec![
        module("cfg", vec![assign(ident("port"), int(8080))]),
        println_(vec![member(ident("cfg"), "port"), ident("cfg.port")]),
        assign(ident("cfg.port"), int(9090)),
        println_(vec![member(ident("cfg"), "port")]),
    ];
    assert_eq!(output_of(&program), "8080 8080\n9090\n");
}

#[test]
fn import_strings_package() {
    let program = vec![
        assign(ident("s"), call("import", vec![string("strings")])),
        println_(vec![method_call(ident("s"), "ToUpper", vec![string("hi")])]),
        println_(vec![method_call(
            ident("s"),
            "Join",
            vec![
                method_call(ident("s"), "Split", vec![string("a,b"), string(",")]),
                string("-"),
            ],
        )]),
    ];
    assert_eq!(output_of(&program), "HI\na-b\n");
}

#[test]
fn type_names() {
    let program = vec![println_(vec![
        call("typeOf", vec![int(1)]),
        call("typeOf", vec![nil()]),
        call("typeOf", vec![string("s")]),
    ])];
    assert_eq!(output_of(&program), "int64 nil string\n");
}

fn counter_type() -> Arc<StructType> {
    StructType::builder("Counter")
        .field("N", TypeDesc::Int)
        .field("hidden", TypeDesc::Int)
        .pointer_method(
            "Inc",
            FuncValue::host("Inc", vec![TypeDesc::Any], false, |_, args| {
                if let Value::Struct(s) = args[0].deref_once() {
                    let n = match s.field("N") {
                        Some(Value::Int(n)) => n,
                        _ => 0,
                    };
                    s.set(0, Value::Int(n + 1));
                }
                Ok(Vec::new())
            }),
        )
        .method(
            "Get",
            FuncValue::host("Get", vec![TypeDesc::Any], false, |_, args| {
                Ok(vec![match &args[0] {
                    Value::Struct(s) => s.field("N").unwrap_or(Value::Nil),
                    _ => Value::Nil,
                }])
            }),
        )
        .build()
}

#[test]
fn struct_methods_and_fields() {
    let h = Harness::new();
    h.env.define_type("Counter", TypeDesc::Struct(counter_type()));
    h.run(&[
        assign(ident("c"), new(ty("Counter"))),
        expr_stmt(method_call(ident("c"), "Inc", vec![])),
        expr_stmt(method_call(ident("c"), "Inc", vec![])),
        println_(vec![member(ident("c"), "N"), method_call(ident("c"), "Get", vec![])]),
    ])
    .unwrap();
    assert_eq!(h.output(), "2 2\n");
}

#[test]
fn unexported_fields_are_hidden() {
    let h = Harness::new();
    h.env.define_type("Counter", TypeDesc::Struct(counter_type()));
    let err = h
        .run(&[
            assign(ident("c"), new(ty("Counter"))),
            expr_stmt(member(ident("c"), "hidden")),
        ])
        .unwrap_err();
    assert!(err.message.contains("unexported"), "{}", err.message);
}

#[test]
fn host_panics_become_errors() {
    let h = Harness::new();
    h.env.define_value(
        "boom",
        Value::Func(FuncValue::host("boom", Vec::new(), false, |_, _| {
            panic!("kaboom")
        })),
    );
    let err = h.run(&[expr_stmt(call("boom", vec![]))]).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Panic);
    assert!(err.message.contains("kaboom"), "{}", err.message);
}

#[test]
fn step_budget_interrupts_infinite_loops() {
    let h = Harness::with(Interpreter::builder().max_steps(1_000));
    let err = h.run(&[loop_(None, Vec::new())]).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::Interrupted {
            reason: InterruptReason::StepBudget
        }
    );
    assert!(h.interp.is_cancelled());
}

#[test]
fn try_does_not_catch_interrupts() {
    let h = Harness::with(Interpreter::builder().max_steps(1_000));
    let program = vec![try_catch(
        vec![loop_(None, Vec::new())],
        None,
        vec![println_(vec![string("caught")])],
        None,
    )];
    let err = h.run(&program).unwrap_err();
    assert!(err.is_interrupted());
    assert_eq!(h.output(), "");
}

#[test]
fn errors_carry_the_innermost_position() {
    let h = Harness::new();
    let program = vec![expr_stmt(add(int(1), ident("missing").at(3, 7))).at(3, 1)];
    let err = h.run(&program).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UndefinedSymbol {
            name: "missing".to_string()
        }
    );
    let pos = err.pos.unwrap();
    assert_eq!((pos.line, pos.column), (3, 7));
}

#[test]
fn make_slice_uses_length_and_capacity() {
    let program = vec![
        assign(ident("a"), make_slice(slice_of(ty("int")), int(2), Some(int(8)))),
        assign(index(ident("a"), int(2)), int(5)),
        println_(vec![ident("a"), len(ident("a"))]),
    ];
    assert_eq!(output_of(&program), "[0 0 5] 3\n");
}

#[test]
fn oversized_allocations_are_errors() {
    let h = Harness::new();
    let programs = [
        vec![expr_stmt(make_slice(slice_of(ty("int")), int(1 << 61), None))],
        vec![expr_stmt(make_slice(slice_of(ty("int")), int(1), Some(int(i64::MAX))))],
        vec![expr_stmt(make_chan(ty("int"), Some(int(1 << 61))))],
        vec![expr_stmt(mul(string("ab"), int(i64::MAX)))],
        vec![expr_stmt(make_slice(slice_of(ty("int")), int(4), Some(int(2))))],
    ];
    for program in &programs {
        let err = h.run(program).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::InvalidOperation, "{}", err.message);
    }
    // The run is still usable afterwards.
    h.run(&[println_(vec![string("ok")])]).unwrap();
    assert_eq!(h.output(), "ok\n");
}

#[test]
fn validate_checks_every_branch_without_side_effects() {
    let h = Harness::new();
    let program = vec![
        println_(vec![string("side effect")]),
        if_(boolean(false), vec![expr_stmt(call("nowhere", vec![]))]),
    ];
    let err = h.interp.validate(&program, &h.env).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::UndefinedSymbol { .. }));
    assert_eq!(h.output(), "");
}

#[test]
fn validate_accepts_a_sound_program() {
    let h = Harness::new();
    let program = vec![
        assign(ident("total"), int(0)),
        for_in(
            &["v"],
            array(vec![int(1), int(2)]),
            vec![assign(ident("total"), add(ident("total"), ident("v")))],
        ),
        println_(vec![ident("total")]),
    ];
    h.interp.validate(&program, &h.env).unwrap();
    assert_eq!(h.output(), "");
    // Validation definitions stay out of the caller's scope.
    assert!(h.env.get_value("total").is_err());
}

#[test]
fn validate_twice_checks_function_bodies_each_time() {
    let h = Harness::new();
    let program = vec![
        assign(
            ident("f"),
            func(&[], vec![expr_stmt(call("nowhere", vec![]))]),
        ),
        expr_stmt(call("f", vec![])),
    ];
    for _ in 0..2 {
        let err = h.interp.validate(&program, &h.env).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::UndefinedSymbol {
                name: "nowhere".to_string()
            }
        );
    }
}

#[test]
fn validate_leaves_caller_bindings_alone() {
    let h = Harness::new();
    h.run(&[
        assign(ident("x"), int(1)),
        assign(ident("a"), typed_array(ty("int"), vec![int(1)])),
        assign(ident("m"), map(vec![(string("k"), int(1))])),
        assign(ident("p"), addr_of(ident("x"))),
    ])
    .unwrap();

    let program = vec![
        assign(ident("x"), int(99)),
        assign(index(ident("a"), int(0)), int(42)),
        assign(index(ident("a"), int(1)), int(43)),
        assign(index(ident("m"), string("k")), int(7)),
        assign(deref(ident("p")), int(5)),
        expr_stmt(inc(ident("x"))),
        expr_stmt(delete(string("a"), Some(boolean(true)))),
    ];
    h.interp.validate(&program, &h.env).unwrap();

    h.run(&[println_(vec![
        ident("x"),
        ident("a"),
        index(ident("m"), string("k")),
    ])])
    .unwrap();
    assert_eq!(h.output(), "1 [1] 1\n");
}

#[test]
fn recursion_terminates() {
    let program = vec![
        expr_stmt(func_named(
            "fib",
            &["n"],
            vec![
                if_(lt(ident("n"), int(2)), vec![ret(vec![ident("n")])]),
                ret(vec![add(
                    call("fib", vec![sub(ident("n"), int(1))]),
                    call("fib", vec![sub(ident("n"), int(2))]),
                )]),
            ],
        )),
        println_(vec![call("fib", vec![int(15)])]),
    ];
    assert_eq!(output_of(&program), "610\n");
}

#[test]
fn closures_capture_their_scope() {
    let program = vec![
        assign(ident("n"), int(0)),
        assign(
            ident("bump"),
            func(&[], vec![assign(ident("n"), add(ident("n"), int(1)))]),
        ),
        expr_stmt(call("bump", vec![])),
        expr_stmt(call("bump", vec![])),
        println_(vec![ident("n")]),
    ];
    assert_eq!(output_of(&program), "2\n");
}

#[test]
fn range_builtin_and_string_iteration() {
    let program = vec![
        for_in(&["i"], call("range", vec![int(3)]), vec![expr_stmt(call("print", vec![ident("i")]))]),
        for_in(&["c"], string("ab"), vec![expr_stmt(call("print", vec![ident("c")]))]),
    ];
    assert_eq!(output_of(&program), "012ab");
}
