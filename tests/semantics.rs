// tests/semantics.rs
//! End-to-end semantic scenarios: compile source text, elaborate, and
//! inspect the resulting design.

use veris::errors::Severity;
use veris::sema::expr::BoundStmt;
use veris::sema::{
    Compilation, CompilationOptions, ExpressionKind, ScopeId, SymbolId, SymbolKind,
};
use veris::value::{ConstantValue, Logic};

fn compile(source: &str) -> Compilation {
    compile_with(source, CompilationOptions::default())
}

fn compile_with(source: &str, options: CompilationOptions) -> Compilation {
    let mut compilation = Compilation::new(options);
    compilation
        .add_source("test.sv", source)
        .expect("add_source failed");
    compilation
}

fn error_codes(compilation: &mut Compilation) -> Vec<u16> {
    compilation
        .get_semantic_diagnostics()
        .iter()
        .filter(|d| d.severity() == Severity::Error)
        .map(|d| d.code.code)
        .collect()
}

fn param_value(compilation: &mut Compilation, path: &str) -> ConstantValue {
    let sym = compilation
        .find_hierarchical(path)
        .unwrap_or_else(|| panic!("no symbol at {}", path));
    match &compilation.symbol(sym).kind {
        SymbolKind::Parameter { value, .. } => value.clone(),
        _ => panic!("{} is not a parameter", path),
    }
}

fn instance_body(compilation: &Compilation, inst: SymbolId) -> ScopeId {
    match &compilation.symbol(inst).kind {
        SymbolKind::Instance { body, .. } => *body,
        _ => panic!("not an instance"),
    }
}

fn first_procedural_bound(compilation: &mut Compilation, scope: ScopeId) -> BoundStmt {
    compilation.get_semantic_diagnostics();
    let members = compilation.scope(scope).members.clone();
    for member in members {
        if let SymbolKind::ProceduralBlock {
            bound: Some(bound), ..
        } = &compilation.symbol(member).kind
        {
            return bound.as_ref().clone();
        }
    }
    panic!("no bound procedural block in scope");
}

// ============================================================================
// Core behaviors
// ============================================================================

#[test]
fn simple_module_elaborates() {
    let mut c = compile("module top; endmodule");
    let top = c.find_top("top").expect("top instance");
    assert!(matches!(
        c.symbol(top).kind,
        SymbolKind::Instance { .. }
    ));
    assert!(error_codes(&mut c).is_empty());
}

#[test]
fn parameter_override_applies() {
    let mut c = compile(
        "module m; parameter P = 1; endmodule \
         module top; m #(.P(5)) u(); endmodule",
    );
    let value = param_value(&mut c, "top.u.P");
    assert_eq!(value.integer().and_then(|v| v.to_i64()), Some(5));
    assert!(error_codes(&mut c).is_empty());
}

#[test]
fn constant_folding_localparam() {
    let mut c = compile("module m; localparam int X = (1 + 2) * 4; endmodule");
    let value = param_value(&mut c, "m.X");
    let int = value.integer().expect("integer value");
    assert_eq!(int.to_i64(), Some(12));
    assert_eq!(int.width(), 32);
    assert!(int.is_signed());

    let x = c.find_hierarchical("m.X").unwrap();
    let ty = c.symbol(x).value_type().unwrap();
    assert_eq!(ty, c.type_arena().builtins.int);
}

#[test]
fn width_propagation_inserts_conversion() {
    let mut c = compile(
        "module m; logic [3:0] a; logic [7:0] b; \
         initial b = a + 4'b0001; endmodule",
    );
    let top = c.find_top("m").unwrap();
    let body = instance_body(&c, top);
    let stmt = first_procedural_bound(&mut c, body);

    let BoundStmt::Expr(assign) = stmt else {
        panic!("expected assignment statement");
    };
    let ExpressionKind::Assignment { rhs, .. } = &assign.kind else {
        panic!("expected assignment expression");
    };

    // The addition was evaluated at the assignment's 8-bit width.
    assert_eq!(c.type_arena().bit_width(rhs.ty), Some(8));
    assert!(c.type_arena().is_four_state(rhs.ty));
    let ExpressionKind::BinaryOp { lhs, .. } = &rhs.kind else {
        panic!("expected binary op on the rhs, got {:?}", rhs.kind);
    };
    // The 4-bit named value was widened through an implicit conversion.
    let ExpressionKind::Conversion { operand, implicit } = &lhs.kind else {
        panic!("expected implicit conversion around 'a', got {:?}", lhs.kind);
    };
    assert!(*implicit);
    assert_eq!(c.type_arena().bit_width(operand.ty), Some(4));
    assert_eq!(c.type_arena().bit_width(lhs.ty), Some(8));
}

#[test]
fn four_state_addition_taints_result() {
    let mut c = compile("module m; localparam logic [3:0] Y = 4'b10x1 + 4'b0001; endmodule");
    let value = param_value(&mut c, "m.Y");
    let int = value.integer().expect("integer value");
    assert_eq!(int.width(), 4);
    for i in 0..4 {
        assert_eq!(int.get_bit(i), Logic::X);
    }
}

#[test]
fn hierarchical_name_binds() {
    let mut c = compile(
        "module leaf; int x; endmodule \
         module top; leaf u(); initial $display(top.u.x); endmodule",
    );
    assert!(error_codes(&mut c).is_empty());

    let x = c.find_hierarchical("top.u.x").expect("top.u.x");
    let top = c.find_top("top").unwrap();
    let body = instance_body(&c, top);
    let stmt = first_procedural_bound(&mut c, body);
    let BoundStmt::Expr(call) = stmt else {
        panic!("expected expression statement");
    };
    let ExpressionKind::SystemCall { args, .. } = &call.kind else {
        panic!("expected system call");
    };
    let ExpressionKind::NamedValue { symbol } = &args[0].kind else {
        panic!("expected named value argument, got {:?}", args[0].kind);
    };
    assert_eq!(*symbol, x);
}

#[test]
fn upward_lookup_finds_sibling_instance() {
    let mut c = compile(
        "module leaf; int x; endmodule \
         module mid; initial $display(brother.x); endmodule \
         module top; leaf brother(); mid m1(); endmodule",
    );
    assert!(error_codes(&mut c).is_empty());
}

#[test]
fn use_before_declaration_errors() {
    let mut c = compile("module m; initial x = 1; int x; endmodule");
    let codes = error_codes(&mut c);
    assert!(codes.contains(&2002), "expected E2002, got {:?}", codes);
}

#[test]
fn declaration_before_use_is_fine() {
    let mut c = compile("module m; int x; initial x = 1; endmodule");
    assert!(error_codes(&mut c).is_empty());
}

#[test]
fn constexpr_recursion_limit() {
    let mut c = compile(
        "module m; \
         function int f(int n); return f(n); endfunction \
         localparam int Z = f(0); endmodule",
    );
    let codes = error_codes(&mut c);
    assert!(codes.contains(&4003), "expected E4003, got {:?}", codes);
    let value = param_value(&mut c, "m.Z");
    assert!(value.is_err());
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn type_canonicalization_is_identity() {
    let mut c = compile(
        "module m; int a; bit signed [31:0] b; logic [3:0] p; logic [3:0] q; endmodule",
    );
    c.get_root();
    let a = c.find_hierarchical("m.a").unwrap();
    let b = c.find_hierarchical("m.b").unwrap();
    assert_eq!(
        c.symbol(a).value_type().unwrap(),
        c.symbol(b).value_type().unwrap()
    );
    let p = c.find_hierarchical("m.p").unwrap();
    let q = c.find_hierarchical("m.q").unwrap();
    assert_eq!(
        c.symbol(p).value_type().unwrap(),
        c.symbol(q).value_type().unwrap()
    );
    assert_ne!(
        c.symbol(a).value_type().unwrap(),
        c.symbol(p).value_type().unwrap()
    );
}

#[test]
fn elaboration_is_idempotent() {
    let mut c = compile("module m; initial y = 1; endmodule");
    let root1 = c.get_root();
    let root2 = c.get_root();
    assert_eq!(root1, root2);

    let first = c.get_semantic_diagnostics().len();
    let second = c.get_semantic_diagnostics().len();
    assert_eq!(first, second);
    assert!(first > 0);
}

#[test]
fn finalized_compilation_rejects_new_trees() {
    let mut c = compile("module m; endmodule");
    c.get_root();
    assert!(c.is_finalized());
    assert!(c.add_source("late.sv", "module late; endmodule").is_err());
}

#[test]
fn instance_bodies_share_on_identical_parameters() {
    let mut c = compile(
        "module m; parameter P = 1; endmodule \
         module top; m #(.P(2)) u1(); m #(.P(2)) u2(); m #(.P(3)) u3(); endmodule",
    );
    c.get_root();
    let u1 = c.find_hierarchical("top.u1").unwrap();
    let u2 = c.find_hierarchical("top.u2").unwrap();
    let u3 = c.find_hierarchical("top.u3").unwrap();
    assert_eq!(instance_body(&c, u1), instance_body(&c, u2));
    assert_ne!(instance_body(&c, u1), instance_body(&c, u3));
}

#[test]
fn instance_caching_can_be_disabled() {
    let options = CompilationOptions {
        disable_instance_caching: true,
        ..CompilationOptions::default()
    };
    let mut c = compile_with(
        "module m; parameter P = 1; endmodule \
         module top; m u1(); m u2(); endmodule",
        options,
    );
    c.get_root();
    let u1 = c.find_hierarchical("top.u1").unwrap();
    let u2 = c.find_hierarchical("top.u2").unwrap();
    assert_ne!(instance_body(&c, u1), instance_body(&c, u2));
}

#[test]
fn constant_evaluation_is_deterministic() {
    let source = "module m; localparam int X = 3 ** 5 + 17 % 4; endmodule";
    let mut c1 = compile(source);
    let mut c2 = compile(source);
    assert_eq!(param_value(&mut c1, "m.X"), param_value(&mut c2, "m.X"));
    assert_eq!(
        param_value(&mut c1, "m.X").integer().and_then(|v| v.to_i64()),
        Some(244)
    );
}

// ============================================================================
// Defparams, generates, packages
// ============================================================================

#[test]
fn defparam_overrides_parameter() {
    let mut c = compile(
        "module m; parameter P = 1; endmodule \
         module top; m u(); defparam u.P = 5; endmodule",
    );
    let value = param_value(&mut c, "top.u.P");
    assert_eq!(value.integer().and_then(|v| v.to_i64()), Some(5));
}

#[test]
fn generate_for_expands_blocks() {
    let mut c = compile(
        "module top; genvar i; \
         for (i = 0; i < 3; i = i + 1) begin : g wire w; end \
         endmodule",
    );
    c.get_root();
    for i in 0..3 {
        let path = format!("top.g[{}]", i);
        let block = c
            .find_hierarchical(&path)
            .unwrap_or_else(|| panic!("missing {}", path));
        assert!(matches!(
            c.symbol(block).kind,
            SymbolKind::GenerateBlock { .. }
        ));
        let genvar = param_value(&mut c, &format!("{}.i", path));
        assert_eq!(genvar.integer().and_then(|v| v.to_i64()), Some(i));
    }
    assert!(c.find_hierarchical("top.g[3]").is_none());
}

#[test]
fn generate_if_selects_branch() {
    let mut c = compile(
        "module top; parameter W = 8; \
         if (W > 4) begin : wide wire w; end \
         else begin : narrow wire n; end \
         endmodule",
    );
    c.get_root();
    assert!(c.find_hierarchical("top.wide").is_some());
    assert!(c.find_hierarchical("top.narrow").is_none());
}

#[test]
fn wildcard_import_resolves() {
    let mut c = compile(
        "package pkg; parameter W = 8; endpackage \
         module top; import pkg::*; localparam int X = W; endmodule",
    );
    let value = param_value(&mut c, "top.X");
    assert_eq!(value.integer().and_then(|v| v.to_i64()), Some(8));
    assert!(error_codes(&mut c).is_empty());
}

#[test]
fn same_scope_declaration_beats_import() {
    let mut c = compile(
        "package pkg; parameter W = 8; endpackage \
         module top; import pkg::*; parameter W = 3; \
         localparam int X = W; endmodule",
    );
    let value = param_value(&mut c, "top.X");
    assert_eq!(value.integer().and_then(|v| v.to_i64()), Some(3));
}

#[test]
fn ambiguous_wildcard_import_errors() {
    let mut c = compile(
        "package p1; parameter N = 1; endpackage \
         package p2; parameter N = 2; endpackage \
         module top; import p1::*; import p2::*; \
         localparam int X = N; endmodule",
    );
    let codes = error_codes(&mut c);
    assert!(codes.contains(&2004), "expected E2004, got {:?}", codes);
}

#[test]
fn package_qualified_name_resolves() {
    let mut c = compile(
        "package pkg; parameter W = 16; endpackage \
         module top; localparam int X = pkg::W; endmodule",
    );
    let value = param_value(&mut c, "top.X");
    assert_eq!(value.integer().and_then(|v| v.to_i64()), Some(16));
}

// ============================================================================
// Lookup details
// ============================================================================

#[test]
fn typo_correction_suggests_nearby_name() {
    let mut c = compile("module m; int value; initial valu = 1; endmodule");
    let diags = c.get_semantic_diagnostics();
    let suggestion = diags.iter().find(|d| d.code.code == 2010);
    let suggestion = suggestion.expect("expected a spelling suggestion");
    assert_eq!(suggestion.args[1], "value");
}

#[test]
fn unknown_module_reports() {
    let mut c = compile("module top; nosuch u(); endmodule");
    let codes = error_codes(&mut c);
    assert!(codes.contains(&5001), "expected E5001, got {:?}", codes);
}

#[test]
fn lint_mode_suppresses_unknown_module() {
    let options = CompilationOptions {
        lint_mode: true,
        ..CompilationOptions::default()
    };
    let mut c = compile_with("module top; nosuch u(); endmodule", options);
    assert!(error_codes(&mut c).is_empty());
}

#[test]
fn error_limit_short_circuits() {
    let options = CompilationOptions {
        error_limit: 2,
        typo_correction_limit: 0,
        ..CompilationOptions::default()
    };
    let mut c = compile_with(
        "module m; initial begin a = 1; b = 2; c = 3; d = 4; e = 5; end endmodule",
        options,
    );
    let diags = c.get_semantic_diagnostics();
    let errors: Vec<_> = diags
        .iter()
        .filter(|d| d.severity() == Severity::Error)
        .collect();
    // Two real errors plus the limit-exceeded report.
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|d| d.code.code == 5999));
}

#[test]
fn duplicate_diagnostics_collapse_across_instances() {
    // The same body error reached through two instances reports once.
    let mut c = compile(
        "module m; parameter P = 1; initial q = 1; endmodule \
         module top; m #(.P(2)) u1(); m #(.P(3)) u2(); endmodule",
    );
    let diags = c.get_semantic_diagnostics();
    let undefined: Vec<_> = diags.iter().filter(|d| d.code.code == 2001).collect();
    assert_eq!(undefined.len(), 1);
    assert!(undefined[0].multiplicity >= 2);
}

// ============================================================================
// Expressions and evaluation
// ============================================================================

#[test]
fn command_line_param_override() {
    let options = CompilationOptions {
        param_overrides: vec!["P=7".to_string()],
        ..CompilationOptions::default()
    };
    let mut c = compile_with("module top; parameter P = 1; endmodule", options);
    let value = param_value(&mut c, "top.P");
    assert_eq!(value.integer().and_then(|v| v.to_i64()), Some(7));
}

#[test]
fn clog2_and_bits_fold() {
    let mut c = compile(
        "module m; logic [7:0] d; \
         localparam int C = $clog2(16); \
         localparam int B = $bits(d); endmodule",
    );
    assert_eq!(
        param_value(&mut c, "m.C").integer().and_then(|v| v.to_i64()),
        Some(4)
    );
    assert_eq!(
        param_value(&mut c, "m.B").integer().and_then(|v| v.to_i64()),
        Some(8)
    );
}

#[test]
fn replication_concat_folds() {
    let mut c = compile("module m; localparam logic [7:0] R = {2{4'b1010}}; endmodule");
    let value = param_value(&mut c, "m.R");
    assert_eq!(value.integer().and_then(|v| v.to_u64()), Some(0xAA));
}

#[test]
fn constant_function_with_loop() {
    let mut c = compile(
        "module m; \
         function int sum(int n); \
           int acc; acc = 0; \
           for (int i = 1; i <= n; i = i + 1) acc = acc + i; \
           return acc; \
         endfunction \
         localparam int S = sum(4); endmodule",
    );
    assert_eq!(
        param_value(&mut c, "m.S").integer().and_then(|v| v.to_i64()),
        Some(10)
    );
    assert!(error_codes(&mut c).is_empty());
}

#[test]
fn constant_function_with_case() {
    let mut c = compile(
        "module m; \
         function int pick(int n); \
           case (n) \
             0: return 10; \
             1, 2: return 20; \
             default: return 30; \
           endcase \
         endfunction \
         localparam int A = pick(0); \
         localparam int B = pick(2); \
         localparam int D = pick(9); endmodule",
    );
    assert_eq!(
        param_value(&mut c, "m.A").integer().and_then(|v| v.to_i64()),
        Some(10)
    );
    assert_eq!(
        param_value(&mut c, "m.B").integer().and_then(|v| v.to_i64()),
        Some(20)
    );
    assert_eq!(
        param_value(&mut c, "m.D").integer().and_then(|v| v.to_i64()),
        Some(30)
    );
}

#[test]
fn struct_member_access_folds() {
    let mut c = compile(
        "module m; \
         typedef struct packed { logic [3:0] hi; logic [3:0] lo; } pair_t; \
         localparam pair_t P0 = 8'hab; \
         localparam logic [3:0] H = P0.hi; \
         localparam logic [3:0] L = P0.lo; endmodule",
    );
    assert_eq!(
        param_value(&mut c, "m.H").integer().and_then(|v| v.to_u64()),
        Some(0xA)
    );
    assert_eq!(
        param_value(&mut c, "m.L").integer().and_then(|v| v.to_u64()),
        Some(0xB)
    );
}

#[test]
fn enum_members_are_visible_constants() {
    let mut c = compile(
        "module m; \
         typedef enum { RED, GREEN = 5, BLUE } color_t; \
         localparam int G = GREEN; \
         localparam int B = BLUE; endmodule",
    );
    assert_eq!(
        param_value(&mut c, "m.G").integer().and_then(|v| v.to_i64()),
        Some(5)
    );
    assert_eq!(
        param_value(&mut c, "m.B").integer().and_then(|v| v.to_i64()),
        Some(6)
    );
}

#[test]
fn part_select_respects_declared_endianness() {
    let mut c = compile(
        "module m; \
         localparam logic [7:0] V = 8'hc3; \
         localparam logic [3:0] HI = V[7:4]; \
         localparam logic B0 = V[0]; endmodule",
    );
    assert_eq!(
        param_value(&mut c, "m.HI").integer().and_then(|v| v.to_u64()),
        Some(0xC)
    );
    assert_eq!(
        param_value(&mut c, "m.B0").integer().and_then(|v| v.to_u64()),
        Some(1)
    );
}

#[test]
fn ternary_with_unknown_condition_merges() {
    let mut c = compile(
        "module m; localparam logic [3:0] T = 1'bx ? 4'b1010 : 4'b1001; endmodule",
    );
    let value = param_value(&mut c, "m.T");
    let int = value.integer().expect("integer");
    assert_eq!(int.get_bit(3), Logic::One);
    assert_eq!(int.get_bit(2), Logic::Zero);
    assert_eq!(int.get_bit(1), Logic::X);
    assert_eq!(int.get_bit(0), Logic::X);
}

#[test]
fn shift_takes_left_operand_type() {
    let mut c = compile("module m; localparam logic [7:0] S = 8'h01 << 3; endmodule");
    assert_eq!(
        param_value(&mut c, "m.S").integer().and_then(|v| v.to_u64()),
        Some(8)
    );
}

#[test]
fn string_parameter_concatenates() {
    let mut c = compile(
        "module m; localparam string GREETING = {\"hello\", \" \", \"world\"}; endmodule",
    );
    match param_value(&mut c, "m.GREETING") {
        ConstantValue::Str(s) => assert_eq!(s, "hello world"),
        other => panic!("expected string, got {:?}", other),
    }
}

#[test]
fn unbased_unsized_literal_fills_width() {
    let mut c = compile("module m; localparam logic [7:0] ONES = '1; endmodule");
    assert_eq!(
        param_value(&mut c, "m.ONES")
            .integer()
            .and_then(|v| v.to_u64()),
        Some(0xFF)
    );
}

#[test]
fn signed_system_function_changes_interpretation() {
    let mut c = compile(
        "module m; localparam int N = $signed(4'b1111); endmodule",
    );
    assert_eq!(
        param_value(&mut c, "m.N").integer().and_then(|v| v.to_i64()),
        Some(-1)
    );
}

// ============================================================================
// Output surfaces
// ============================================================================

#[test]
fn json_dump_names_top_instances() {
    let mut c = compile(
        "module leaf; endmodule \
         module top; leaf u(); endmodule",
    );
    let tree = c.serialize_design();
    let members = tree["members"].as_array().expect("root members");
    assert!(members.iter().any(|m| m["name"] == "top"));
    let top = members.iter().find(|m| m["name"] == "top").unwrap();
    let body = top["members"]
        .as_array()
        .expect("top body members");
    assert!(body.iter().any(|m| m["name"] == "u" && m["module"] == "leaf"));
}

#[test]
fn explicit_top_module_selection() {
    let options = CompilationOptions {
        top_modules: vec!["alpha".to_string()],
        ..CompilationOptions::default()
    };
    let mut c = compile_with(
        "module alpha; endmodule module beta; endmodule",
        options,
    );
    c.get_root();
    assert!(c.find_top("alpha").is_some());
    assert!(c.find_top("beta").is_none());
}

#[test]
fn multiple_files_share_one_design() {
    let mut c = Compilation::new(CompilationOptions::default());
    c.add_source("pkg.sv", "package pkg; parameter W = 4; endpackage")
        .unwrap();
    c.add_source("top.sv", "module top; localparam int X = pkg::W; endmodule")
        .unwrap();
    let value = param_value(&mut c, "top.X");
    assert_eq!(value.integer().and_then(|v| v.to_i64()), Some(4));
}
