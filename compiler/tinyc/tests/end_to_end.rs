//! Compiles real source text through the lexer, parser, and codegen, then
//! runs the assembled program on the VM — exercising the whole pipeline
//! rather than any one crate's bytecode in isolation.

use std::any::Any;

use tinyc_ast::FuncOrigin;
use tinyc_codegen::CodegenError;
use tinyc_vm::{DataCell, HostRegistry, LoadedProgram, Vm};

/// A host function taking one `s32` and recording it, for tests that want
/// to observe a value without a real standard-output host function.
fn report(argv: &[DataCell], host_data: &mut dyn Any) -> DataCell {
    let log = host_data.downcast_mut::<Vec<i32>>().expect("tests pass a Vec<i32>");
    log.push(argv[0].s32());
    DataCell::zeroed()
}

fn run_reporting(source: &str) -> Vec<i32> {
    let prototypes = [("void report(s32)", FuncOrigin::CoreLib)];
    let parsed = tinyc_parser::parse_program(source, &prototypes).expect("parses");
    let program = tinyc_codegen::assemble_program(&parsed.structs, &parsed.funcs, &parsed.globals).expect("assembles");
    let bytes = tinyc_codegen::serialize(&program);

    let mut hosts = HostRegistry::new();
    hosts.register("void report(s32)", report);
    let loaded = LoadedProgram::load(&bytes, &hosts).expect("loads");

    let mut vm = Vm::new();
    let mut log: Vec<i32> = Vec::new();
    vm.run(&loaded, &mut log).expect("runs");
    log
}

#[test]
fn operator_precedence_matches_arithmetic_convention() {
    let log = run_reporting("void main() { report(2 + 3 * 4); }");
    assert_eq!(log, vec![14]);
}

#[test]
fn assignment_expression_result_is_usable_as_an_rvalue() {
    // a = (a = 10) + b, with b = 5, should leave a == 15 and report it.
    let log = run_reporting(
        "void main() { s32 a; s32 b; b = 5; a = (a = 10) + b; report(a); }",
    );
    assert_eq!(log, vec![15]);
}

#[test]
fn short_circuit_and_skips_the_right_operand() {
    let log = run_reporting(
        "s32 touch(s32 v) { report(v); return v; }\n\
         void main() { if (touch(0) && touch(1)) { report(99); } }",
    );
    // only the left side of `&&` runs once it's false; `touch(1)` and the
    // `if` body never execute.
    assert_eq!(log, vec![0]);
}

#[test]
fn short_circuit_or_skips_the_right_operand() {
    let log = run_reporting(
        "s32 touch(s32 v) { report(v); return v; }\n\
         void main() { if (touch(1) || touch(0)) { report(99); } }",
    );
    assert_eq!(log, vec![1, 99]);
}

#[test]
fn sizeof_accounts_for_struct_alignment_padding() {
    // { s8; s32; } pads the s8 up to a 4-byte boundary for the s32: 8 bytes.
    let log = run_reporting(
        "struct Padded { s8 tag; s32 value; };\n\
         void main() { report(sizeof(struct Padded)); }",
    );
    assert_eq!(log, vec![8]);
}

#[test]
fn linked_list_built_from_globals_reverses_in_place() {
    let log = run_reporting(
        "struct Node { s32 value; struct Node* next; };\n\
         struct Node a;\n\
         struct Node b;\n\
         struct Node c;\n\
         void main() {\n\
         \u{20}   a.value = 1; b.value = 2; c.value = 3;\n\
         \u{20}   a.next = &b; b.next = &c; c.next = nullptr;\n\
         \u{20}   struct Node* prev = nullptr;\n\
         \u{20}   struct Node* cur = &a;\n\
         \u{20}   while (cur != nullptr) {\n\
         \u{20}       struct Node* next = cur->next;\n\
         \u{20}       cur->next = prev;\n\
         \u{20}       prev = cur;\n\
         \u{20}       cur = next;\n\
         \u{20}   }\n\
         \u{20}   struct Node* it = prev;\n\
         \u{20}   while (it != nullptr) {\n\
         \u{20}       report(it->value);\n\
         \u{20}       it = it->next;\n\
         \u{20}   }\n\
         }",
    );
    assert_eq!(log, vec![3, 2, 1]);
}

#[test]
fn comparing_pointers_of_different_pointee_types_is_a_compile_error() {
    let prototypes: [(&str, FuncOrigin); 0] = [];
    let parsed =
        tinyc_parser::parse_program("void main() { s32* a; f64* b; if (a == b) { } }", &prototypes).expect("parses");
    let err = tinyc_codegen::assemble_program(&parsed.structs, &parsed.funcs, &parsed.globals)
        .expect_err("incompatible pointer types must be rejected");
    assert!(matches!(err, CodegenError::IncompatiblePointerComparison));
}

#[test]
fn void_main_returning_normally_runs_to_completion() {
    let log = run_reporting("void main() { report(7); }");
    assert_eq!(log, vec![7]);
}

#[test]
fn mixed_width_arithmetic_converts_the_narrower_operand_first() {
    // a is s8 holding -1; without converting it to s32 before ADD_S32, the
    // cell's high bytes (left zeroed by Load1/from_s8) would read back as
    // 255 instead of being sign-extended.
    let log = run_reporting(
        "void main() { s8 a; a = -1; s32 b; b = 2; report(a + b); }",
    );
    assert_eq!(log, vec![1]);
}

#[test]
fn mixed_width_comparison_converts_the_narrower_operand_first() {
    let log = run_reporting(
        "void main() { s8 a; a = -1; s32 b; b = -1; if (a == b) { report(1); } else { report(0); } }",
    );
    assert_eq!(log, vec![1]);
}
