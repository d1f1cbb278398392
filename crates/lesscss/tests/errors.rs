use lesscss::{CompileOptions, LessError, compile_str, compile_with};

#[test]
fn test_syntax_error_positions() {
    let err = compile_str(".a {\n  color: red;\n  width: (1 + ;\n}").unwrap_err();
    assert!(matches!(err.root(), LessError::Syntax { .. }));
    let pos = err.position().unwrap();
    assert_eq!(pos.line, 3);
}

#[test]
fn test_unclosed_block() {
    let err = compile_str(".a { color: red;").unwrap_err();
    assert!(err.to_string().contains("missing closing"));
}

#[test]
fn test_errors_inside_mixins_carry_the_call_site() {
    let err = compile_str(".m() {\n  x: @missing;\n}\n.a {\n  .m();\n}").unwrap_err();
    assert!(matches!(err.root(), LessError::UndefinedVariable { .. }));
    let message = err.to_string();
    assert!(message.contains("undefined variable @missing at 2:"), "{message}");
    assert!(message.contains("\n    in 5:"), "{message}");
}

#[test]
fn test_type_mismatch_message() {
    let err = compile_str(".a { v: 2px / 0; }").unwrap_err();
    assert!(matches!(err.root(), LessError::TypeMismatch { .. }));
    assert!(err.to_string().contains("division by zero"));
}

// ============================================================================
// Nesting limits
// ============================================================================

fn variable_chain(length: usize) -> String {
    let mut source = String::from("@v0: 1px;\n");
    for i in 1..length {
        source.push_str(&format!("@v{i}: @v{} + 1;\n", i - 1));
    }
    source.push_str(&format!(".a {{ width: @v{}; }}\n", length - 1));
    source
}

#[test]
fn test_long_variable_chains_resolve() {
    let css = compile_str(&variable_chain(40)).unwrap();
    assert_eq!(css, ".a {\n  width: 40px;\n}\n");
}

#[test]
fn test_deep_variable_chain_is_reported() {
    let err = compile_str(&variable_chain(500)).unwrap_err();
    let LessError::RecursionLimit { name, limit, .. } = err.root() else {
        panic!("expected a recursion limit error, got {err}");
    };
    assert!(name.starts_with("@v"), "{name}");
    assert_eq!(*limit, 64);
}

#[test]
fn test_deeply_nested_rules_are_reported() {
    let source = format!("{}color: red;{}", ".a {".repeat(3000), "}".repeat(3000));
    let err = compile_str(&source).unwrap_err();
    assert!(matches!(err.root(), LessError::RecursionLimit { name, .. } if name == ".a"));
}

#[test]
fn test_rule_nesting_counts_toward_the_limit() {
    let options = CompileOptions::default().max_recursion(3);
    let source = ".a { .b { .c { .d { x: 1; } } } }";
    let err = compile_with(source, &options).unwrap_err();
    assert!(matches!(err.root(), LessError::RecursionLimit { limit: 3, .. }));
    assert!(compile_with(".a { .b { .c { x: 1; } } }", &options).is_ok());
}

#[test]
fn test_deeply_nested_parentheses_are_reported() {
    let source = format!(".a {{ v: {}1{}; }}", "(".repeat(1000), ")".repeat(1000));
    let err = compile_str(&source).unwrap_err();
    assert!(matches!(err.root(), LessError::RecursionLimit { .. }));
}

#[test]
fn test_script_without_evaluator() {
    let err = compile_str(".a { v: `1 + 1`; }").unwrap_err();
    assert!(matches!(err.root(), LessError::Script { .. }));
}
