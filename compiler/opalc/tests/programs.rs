//! End-to-end scenarios: whole source programs against expected output.

use opalc::{compile_source, run_captured};
use pretty_assertions::assert_eq;

fn output_of(source: &str) -> String {
    let compilation = compile_source("test.opal", source).unwrap_or_else(|err| {
        panic!("compile failed: {}", err.render());
    });
    let (_, output) = run_captured(&compilation, &[]).expect("runtime error");
    output
}

#[test]
fn s1_arithmetic_precedence() {
    assert_eq!(output_of("proc main() { print(1+2*3); }"), "7");
}

#[test]
fn s2_array_mutation() {
    assert_eq!(
        output_of("proc main() { int[] a = [1,2,3]; a[1] = 10; print(a); }"),
        "[1, 10, 3]"
    );
}

#[test]
fn s3_continue_in_loop() {
    assert_eq!(
        output_of("proc main() { for(int i = 0; i < 3; i++) { if(i == 1) continue; print(i); } }"),
        "02"
    );
}

#[test]
fn s4_function_call() {
    assert_eq!(
        output_of("func int f(int x) { return x*x; } proc main() { print(f(5)); }"),
        "25"
    );
}

#[test]
fn s5_match_over_union() {
    assert_eq!(
        output_of(
            "proc main() { (int|bool) u = true; match(v: u) { bool: print(v); int: print(\"i\"); } }"
        ),
        "true"
    );
}

#[test]
fn s6_assertions() {
    assert_eq!(output_of("proc main() { assert(1 == 1); print(\"ok\"); }"), "ok");

    let compilation =
        compile_source("test.opal", "proc main() { assert(1 == 2); }").expect("compile failed");
    let err = run_captured(&compilation, &[]).expect_err("expected assertion failure");
    assert!(err.message.contains("assertion failed"));
    // The failure is located.
    assert_ne!(err.span, opal_ir::Span::DUMMY);
}

#[test]
fn compile_errors_render_with_location() {
    let err = compile_source("demo.opal", "proc main() {\n  print(missing);\n}")
        .err()
        .expect("expected compile failure");
    let rendered = err.render();
    assert!(rendered.starts_with("demo.opal:2:"), "got: {rendered}");
    assert!(rendered.contains("unknown name missing"));
}

#[test]
fn exit_code_from_main() {
    let compilation =
        compile_source("test.opal", "proc int main() { return 3; }").expect("compile failed");
    let (code, _) = run_captured(&compilation, &[]).expect("runtime error");
    assert_eq!(code, 3);
}

#[test]
fn main_receives_arguments() {
    let compilation = compile_source(
        "test.opal",
        "proc main(char[][] args) { print(args.len); for [i, a] : args { print(\" \", a); } }",
    )
    .expect("compile failed");
    let (_, output) = run_captured(
        &compilation,
        &["alpha".to_string(), "beta".to_string()],
    )
    .expect("runtime error");
    assert_eq!(output, "2 alpha beta");
}

#[test]
fn multiple_source_files_share_the_global_scope() {
    let files = vec![
        (
            "lib.opal".to_string(),
            "func int square(int x) { return x * x; }".to_string(),
        ),
        (
            "main.opal".to_string(),
            "proc main() { print(square(6)); }".to_string(),
        ),
    ];
    let compilation = opalc::compile(files).unwrap_or_else(|err| {
        panic!("compile failed: {}", err.render());
    });
    let (_, output) = run_captured(&compilation, &[]).expect("runtime error");
    assert_eq!(output, "36");
}

#[test]
fn modules_structs_and_enums_end_to_end() {
    let source = "module geo {\
            struct Point { int x; int y;\
                func int manhattan() { return this.x + this.y; } }\
        }\
        enum Kind { small, large = 10 }\
        proc main() {\
            geo.Point p = [3, 4];\
            print(p.manhattan());\
            long k = Kind.large;\
            print(\" \", k);\
        }";
    assert_eq!(output_of(source), "7 10");
}

#[test]
fn runtime_errors_exit_nonzero_semantics() {
    let compilation = compile_source(
        "test.opal",
        "proc main() { int[] a = [1]; print(a[5]); }",
    )
    .expect("compile failed");
    let err = run_captured(&compilation, &[]).expect_err("expected bounds failure");
    assert!(err.message.contains("out of bound"));
}
