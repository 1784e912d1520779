//! End-to-end compilation scenarios (spec.md §8).

use std::path::PathBuf;

use bish::{compile_source, CompileOptions, Config};

fn compile(src: &str) -> String {
    compile_source(src, &PathBuf::from("t.bish"), &Config::default(), &CompileOptions::default()).unwrap()
}

fn compile_library(src: &str) -> String {
    let options = CompileOptions { library_mode: true, ..Default::default() };
    compile_source(src, &PathBuf::from("t.bish"), &Config::default(), &options).unwrap()
}

#[test]
fn scenario_1_simple_arithmetic() {
    let out = compile("a = 1; b = 2; c = a + b;");
    assert!(out.contains("a=1;"), "{out}");
    assert!(out.contains("b=2;"), "{out}");
    assert!(out.contains("c=$(( $a + $b ));"), "{out}");
    assert!(out.contains("main;"), "{out}");
}

#[test]
fn scenario_2_function_return_value() {
    let out = compile("def add(x, y) { return x + y; } a = add(2, 3);");
    assert!(out.contains("function add ()"), "{out}");
    assert!(out.contains("local x=\"$1\";"), "{out}");
    assert!(out.contains("local y=\"$2\";"), "{out}");
    assert!(out.lines().any(|l| l.trim_start().starts_with("add \"$_") && l.trim_end().ends_with(';')), "{out}");
}

#[test]
fn scenario_3_array_iteration() {
    let out = compile("a = [1, 2, 3]; for (x in a) { b = x + 1; }");
    assert!(out.contains("a=( 1 2 3 );"), "{out}");
    assert!(out.contains("for x in \"${a[@]}\"; do"), "{out}");
}

#[test]
fn scenario_4_logical_and_condition() {
    let out = compile("if (1 < 2 and 2 < 3) { a = 1; }");
    assert!(
        out.contains("if [[ $([[ 1 -lt 2 && 2 -lt 3 ]] && echo 1 || echo 0) -eq 1 ]]; then"),
        "{out}"
    );
    assert!(out.contains("fi"), "{out}");
}

#[test]
fn scenario_5_extern_pipe() {
    let out = compile(r#"dir = "/tmp"; a = @(ls $dir | wc -l);"#);
    assert!(out.contains("$( ls \"$dir\" | wc -l )"), "{out}");
    assert!(!out.contains("$($("), "no double-nested subshell capture: {out}");
}

#[test]
fn library_mode_omits_main_but_keeps_the_seed() {
    let out = compile_library("def id(x) { return x; }");
    assert!(out.contains("args=( \"$0\" \"$@\" );"), "{out}");
    assert!(!out.contains("function main ()"), "{out}");
    assert!(!out.trim_end().ends_with("main;"), "{out}");
}

#[test]
fn empty_function_body_compiles_to_a_noop() {
    let out = compile("def nothing() { } nothing();");
    assert!(out.contains("function nothing ()"), "{out}");
}

#[test]
fn string_interpolation_reads_surrounding_variables() {
    let out = compile(r#"name = "world"; greeting = "hello " + name;"#);
    assert!(out.contains("greeting="), "{out}");
}

#[test]
fn array_parameter_is_passed_by_reference() {
    let out = compile("def first(arr) { return arr[0]; } a = [1,2,3]; x = first(a);");
    assert!(out.contains("local arr=( \"${_global_ref_1[@]}\" );"), "{out}");
    assert!(!out.contains("first arr"), "{out}");
}
