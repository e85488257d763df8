//! Interpreter tests running whole programs through the front end and
//! asserting on captured print output.

use opal_eval::{Interpreter, PrintHandler};
use opal_ir::StringInterner;
use pretty_assertions::assert_eq;

/// Run a program, returning (exit code, captured stdout).
fn run(source: &str) -> (i32, String) {
    let interner = StringInterner::new();
    let tokens = opal_lexer::lex(source, 0, &interner).expect("lex failed");
    let decls = opal_parse::parse(&tokens, &interner).expect("parse failed");
    let program = opal_resolve::resolve(&decls, &interner).expect("resolve failed");
    let mut interp = Interpreter::new(
        &program.hir,
        &program.types,
        &interner,
        PrintHandler::buffer(),
    );
    let code = interp.run(&[]).expect("runtime error");
    (code, interp.output().to_string())
}

/// Run a program expected to fail at runtime; returns the error message.
fn run_err(source: &str) -> String {
    let interner = StringInterner::new();
    let tokens = opal_lexer::lex(source, 0, &interner).expect("lex failed");
    let decls = opal_parse::parse(&tokens, &interner).expect("parse failed");
    let program = opal_resolve::resolve(&decls, &interner).expect("resolve failed");
    let mut interp = Interpreter::new(
        &program.hir,
        &program.types,
        &interner,
        PrintHandler::buffer(),
    );
    interp
        .run(&[])
        .expect_err("expected a runtime error")
        .message
}

fn output(source: &str) -> String {
    run(source).1
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(output("proc main() { print(1 + 2 * 3); }"), "7");
}

#[test]
fn array_literal_indexing_and_mutation() {
    assert_eq!(
        output("proc main() { int[] a = [1, 2, 3]; a[1] = 10; print(a); }"),
        "[1, 10, 3]"
    );
}

#[test]
fn for_loop_with_continue() {
    assert_eq!(
        output("proc main() { for(int i = 0; i < 3; i++) { if(i == 1) continue; print(i); } }"),
        "02"
    );
}

#[test]
fn function_call_returns_value() {
    assert_eq!(
        output("func int f(int x) { return x * x; } proc main() { print(f(5)); }"),
        "25"
    );
}

#[test]
fn match_binds_active_option() {
    assert_eq!(
        output(
            "proc main() { (int|bool) u = true; match(v: u) { bool: print(v); int: print(\"i\"); } }"
        ),
        "true"
    );
}

#[test]
fn assertions_pass_and_fail() {
    assert_eq!(output("proc main() { assert(1 == 1); print(\"ok\"); }"), "ok");
    let msg = run_err("proc main() { assert(1 == 2); }");
    assert!(msg.contains("assertion failed"));
}

#[test]
fn main_exit_code_propagates() {
    let (code, _) = run("proc int main() { return 42; }");
    assert_eq!(code, 42);
    let (code, _) = run("proc main() { print(\"\"); }");
    assert_eq!(code, 0);
}

#[test]
fn value_semantics_on_assignment() {
    // Mutating a copy must not be visible through the original.
    assert_eq!(
        output(
            "proc main() { int[] a = [1, 2, 3]; int[] b = a; b[0] = 99; print(a, b); }"
        ),
        "[1, 2, 3][99, 2, 3]"
    );
}

#[test]
fn value_semantics_on_parameter_passing() {
    // Parameters are bound by copy; a local copy can be mutated without
    // the caller observing anything.
    assert_eq!(
        output(
            "proc mutate(int[] xs) { int[] c = xs; c[0] = 5; print(c); }\
             proc main() { int[] a = [1, 2]; mutate(a); print(a); }"
        ),
        "[5, 2][1, 2]"
    );
}

#[test]
fn parameters_cannot_be_assigned() {
    let interner = StringInterner::new();
    let tokens =
        opal_lexer::lex("proc f(int[] xs) { xs[0] = 5; } proc main() { }", 0, &interner)
            .expect("lex failed");
    let decls = opal_parse::parse(&tokens, &interner).expect("parse failed");
    let err = opal_resolve::resolve(&decls, &interner).unwrap_err();
    assert!(err.message.contains("immutable"));
}

#[test]
fn for_range_runs_exact_count() {
    assert_eq!(output("proc main() { for i : 0, 4 { print(i); } }"), "0123");
    assert_eq!(output("proc main() { for i : 2, 5 { print(i); } }"), "234");
    // Empty range runs zero times.
    assert_eq!(output("proc main() { for i : 3, 3 { print(i); } print(\"x\"); }"), "x");
    assert_eq!(output("proc main() { for i : 5, 3 { print(i); } print(\"x\"); }"), "x");
}

#[test]
fn for_array_iterates_elements() {
    assert_eq!(
        output("proc main() { for [i, x] : [10, 20, 30] { print(i, \":\", x, \" \"); } }"),
        "0:10 1:20 2:30 "
    );
}

#[test]
fn for_array_iterates_ragged_rows() {
    assert_eq!(
        output(
            "proc main() { int[][] g = [[1], [2, 3]]; for [i, j, x] : g { print(x); } }"
        ),
        "123"
    );
}

#[test]
fn for_array_over_string_yields_chars() {
    assert_eq!(
        output("proc main() { for [i, c] : \"abc\" { print(c); } }"),
        "abc"
    );
}

#[test]
fn while_with_break() {
    assert_eq!(
        output(
            "proc main() { int i = 0; while(true) { if(i == 3) break; print(i); i++; } }"
        ),
        "012"
    );
}

#[test]
fn switch_falls_through_until_break() {
    let source = "proc main() { switch(2) {\
        case 1: print(\"one\"); break;\
        case 2: print(\"two\");\
        case 3: print(\"three\"); break;\
        default: print(\"other\"); } }";
    assert_eq!(output(source), "twothree");
}

#[test]
fn switch_takes_default() {
    let source = "proc main() { switch(9) {\
        case 1: print(\"one\"); break;\
        default: print(\"other\"); } }";
    assert_eq!(output(source), "other");
}

#[test]
fn strings_concatenate_and_index() {
    assert_eq!(
        output("proc main() { char[] s = \"ab\" + \"cd\"; print(s, s[2]); }"),
        "abcdc"
    );
}

#[test]
fn string_cells_are_mutable() {
    assert_eq!(
        output("proc main() { char[] s = \"cat\"; s[0] = 'b'; print(s); }"),
        "bat"
    );
}

#[test]
fn array_append_and_prepend() {
    assert_eq!(
        output("proc main() { int[] a = [2, 3]; a = a + 4; a = 1 + a; print(a); }"),
        "[1, 2, 3, 4]"
    );
}

#[test]
fn array_length() {
    assert_eq!(
        output("proc main() { int[] a = [1, 2, 3]; print(a.len); print(\"\".len); }"),
        "30"
    );
}

#[test]
fn new_array_fills_defaults() {
    assert_eq!(
        output("proc main() { int[][] g = array int[2][3]; print(g, g[1][2]); }"),
        "[[0, 0, 0], [0, 0, 0]]0"
    );
}

#[test]
fn struct_members_and_methods() {
    let source = "struct Vec { int x; int y;\
        func int sum() { return this.x + this.y; }\
        proc shift(int d) { this.x = this.x + d; } }\
        proc main() { Vec v = [3, 4]; print(v.sum()); v.shift(10); print(v.x); }";
    assert_eq!(output(source), "713");
}

#[test]
fn struct_prints_with_name() {
    assert_eq!(
        output("struct Pt { int x; int y; } proc main() { Pt p = [1, 2]; print(p); }"),
        "Pt{1, 2}"
    );
}

#[test]
fn tuples_print_in_parens() {
    assert_eq!(
        output("proc main() { (int, bool) t = [7, true]; print(t, t[0]); }"),
        "(7, true)7"
    );
}

#[test]
fn maps_insert_lookup_and_print_in_order() {
    let source = "proc main() { (char[] : int) m = [[\"one\", 1], [\"two\", 2]];\
        m[\"three\"] = 3; print(m[\"two\"], \" \", m); }";
    assert_eq!(output(source), "2 {one: 1, two: 2, three: 3}");
}

#[test]
fn map_missing_key_defaults() {
    assert_eq!(
        output("proc main() { (int : int) m = [[1, 10]]; print(m[2]); print(m); }"),
        "0{1: 10, 2: 0}"
    );
}

#[test]
fn union_is_and_as() {
    let source = "proc main() { (int|bool) u = 5;\
        print(u is int, u is bool);\
        int x = u as int; print(x); }";
    assert_eq!(output(source), "truefalse5");
}

#[test]
fn union_as_mismatch_is_a_runtime_error() {
    let msg = run_err("proc main() { (int|bool) u = 5; bool b = u as bool; print(b); }");
    assert!(msg.contains("as"));
}

#[test]
fn enums_convert_to_integers() {
    assert_eq!(
        output(
            "enum Color { red, green = 5, blue }\
             proc main() { long c = Color.blue; print(c, Color.red); }"
        ),
        "60"
    );
}

#[test]
fn globals_initialize_in_order() {
    assert_eq!(
        output("int a = 2; int b = a + 3; proc main() { print(a, b); }"),
        "25"
    );
}

#[test]
fn recursion_works() {
    assert_eq!(
        output(
            "func int fib(int n) { if(n < 2) { return n; } return fib(n - 1) + fib(n - 2); }\
             proc main() { print(fib(10)); }"
        ),
        "55"
    );
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let msg = run_err("proc main() { int z = 0; print(1 / z); }");
    assert!(msg.contains("division by zero"));
}

#[test]
fn out_of_bounds_index_is_a_runtime_error() {
    let msg = run_err("proc main() { int[] a = [1]; print(a[3]); }");
    assert!(msg.contains("out of bound"));
}

#[test]
fn negative_index_is_a_runtime_error() {
    let msg = run_err("proc main() { int[] a = [1]; int i = -1; print(a[i]); }");
    assert!(msg.contains("negative"));
}

#[test]
fn signed_minimum_negation_is_a_runtime_error() {
    let msg = run_err(
        "proc main() { long m = -9223372036854775807; m = m - 1; print(-m); }",
    );
    assert!(msg.contains("overflow"));
}

#[test]
fn extern_calls_are_stubbed() {
    let msg = run_err("extern proc int now(); proc main() { print(now()); }");
    assert!(msg.contains("not implemented"));
}

#[test]
fn integer_narrowing_overflow_is_a_runtime_error() {
    let msg = run_err("proc main() { long big = 300; byte b = big; print(b); }");
    assert!(msg.contains("overflow"));
}

#[test]
fn binary_arithmetic_wraps_modularly() {
    assert_eq!(
        output("proc main() { byte a = 120; byte b = 120; byte c = a + b; print(c); }"),
        "-16"
    );
}

#[test]
fn float_arithmetic_prints_shortest_form() {
    assert_eq!(output("proc main() { print(1.5 + 2.25); }"), "3.75");
    assert_eq!(output("proc main() { print(1.0 / 2.0); }"), "0.5");
}

#[test]
fn bitwise_and_shifts() {
    assert_eq!(
        output("proc main() { print(6 & 3, \" \", 6 | 3, \" \", 6 ^ 3, \" \", 1 << 4, \" \", 32 >> 2); }"),
        "2 7 5 16 8"
    );
}

#[test]
fn bool_logic_short_circuits() {
    // The second operand would divide by zero if evaluated.
    assert_eq!(
        output("func bool boom() { int z = 0; return 1 / z == 0; }\
                proc main() { if(false && boom()) { print(\"no\"); } print(\"ok\"); }"),
        "ok"
    );
}

#[test]
fn methods_mutate_receiver_through_this() {
    let source = "struct Counter { int n;\
        proc bump() { this.n = this.n + 1; } }\
        proc main() { Counter c = [0]; c.bump(); c.bump(); print(c.n); }";
    assert_eq!(output(source), "2");
}

#[test]
fn nested_compound_assignment() {
    assert_eq!(
        output(
            "struct Inner { int v; } struct Outer { Inner inner; }\
             proc main() { Outer o = [[1]]; o.inner.v = 9; print(o.inner.v); }"
        ),
        "9"
    );
}

#[test]
fn compound_literal_lvalue_unpacks() {
    assert_eq!(
        output("proc main() { int a = 0; int b = 0; [a, b] = [3, 4]; print(a, b); }"),
        "34"
    );
}

#[test]
fn print_renders_chars_and_escapes() {
    assert_eq!(output("proc main() { print('a', '\\n', 'b'); }"), "a\\nb");
}

#[test]
fn modulo_and_comparisons() {
    assert_eq!(
        output("proc main() { print(7 % 3, 7 / 2, 2 < 3, 3 <= 2); }"),
        "13truefalse"
    );
}
