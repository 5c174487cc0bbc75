use rstest::rstest;

mod common;

use common::compile_error;

#[rstest]
#[case::undefined_identifier("x = 1;", "Identifier is not defined.")]
#[case::undefined_in_expression("print(nope);", "Identifier is not defined.")]
#[case::already_defined("var x = 1; var x = 2;", "Identifier is already defined.")]
#[case::function_name_taken("var f = 1; func f(): i32 { return 0; }", "Identifier is already defined.")]
#[case::break_outside_loop("break;", "Break statement outside of loop.")]
#[case::continue_outside_loop("continue;", "Continue statement outside of loop.")]
#[case::return_outside_function("return 1;", "Return statement outside of function.")]
#[case::binary_mismatch("var a = 1 + \"s\";", "Type unknown or mismatch for binary expression.")]
#[case::logical_on_reals("var a = 1.5 and 2.5;", "Type unknown or mismatch for binary expression.")]
#[case::bitwise_on_reals("var a = 1.5 & 2;", "Type unknown or mismatch for binary expression.")]
#[case::unary_on_string("var a = -\"s\";", "Type unknown or mismatch for unary expression.")]
#[case::assign_real_to_int("var a: i32 = 1.5;", "Assignment type mismatch.")]
#[case::assign_narrowing("var a: i8 = 300;", "Assignment type mismatch.")]
#[case::assign_untyped_expression("var b = 1; var a = (b = 2);", "No type to assign.")]
#[case::no_type_declared("var x;", "No type declared for the variable.")]
#[case::unknown_data_type("var x: banana = 1;", "Unknown data type.")]
#[case::array_needs_initializer("var xs: array[i32];", "Array variable requires an initializer.")]
#[case::array_length_mismatch(
    "var xs: array[i32] = [1, 2]; xs = [1, 2, 3];",
    "Array length mismatch."
)]
#[case::array_element_mismatch("var xs = [1, \"s\"];", "Array element type mismatch.")]
#[case::empty_array_literal("var xs = [];", "Array literal cannot be empty.")]
#[case::index_non_array("var a = 1; print(a[0]);", "Identifier is not an array.")]
#[case::real_array_index(
    "var xs: array[i32] = [1]; print(xs[1.5]);",
    "Array index must be an integer."
)]
#[case::call_arity(
    "func f(x: i32): i32 { return x; } print(f(1, 2));",
    "Function parameters passed count mismatch."
)]
#[case::call_type(
    "func f(x: i8): i8 { return x; } print(f(300));",
    "Function parameter type mismatch."
)]
#[case::call_narrowing_real(
    "func f(x: i32): i32 { return x; } print(f(1.5));",
    "Function parameter type mismatch."
)]
#[case::builtin_arity("print(sqrt(1.0, 2.0));", "Builtin function argument count mismatch.")]
#[case::builtin_type("print(sqrt(1));", "Builtin function argument type mismatch.")]
#[case::len_of_int("var a = 1; print(len(a));", "Builtin function argument type mismatch.")]
#[case::missing_factor("var a = ;", "Unknown factor.")]
#[case::not_a_function("var a = 1; print(a(2));", "Identifier is not a function.")]
fn rejects(#[case] source: &str, #[case] message: &str) {
    let err = compile_error(source);
    assert_eq!(err.message, message, "for source: {source}");
}

#[test]
fn positions_point_at_the_offending_token() {
    let err = compile_error("var a = 1;\nnope = 2;");
    assert_eq!(err.row, 2);
    assert!(err.to_string().ends_with(" : 2 6"), "got: {err}");
}

#[test]
fn bad_token_is_reported() {
    let err = compile_error("var a = 1 @ 2;");
    assert_eq!(err.message, "Malformed token.");
}
