use lesscss::{LessError, compile_str};

// ============================================================================
// Declaration and lookup
// ============================================================================

#[test]
fn test_variables_are_lazy() {
    let css = compile_str(".a { width: @w; }\n@w: @base * 2;\n@base: 5px;").unwrap();
    assert_eq!(css, ".a {\n  width: 10px;\n}\n");
}

#[test]
fn test_last_declaration_wins() {
    let css = compile_str("@a: 1;\n.x { v: @a; }\n@a: 2;").unwrap();
    assert_eq!(css, ".x {\n  v: 2;\n}\n");
}

#[test]
fn test_block_scope_shadows_globals() {
    let css = compile_str("@c: red;\n.a { @c: blue; color: @c; }\n.b { color: @c; }").unwrap();
    assert_eq!(css, ".a {\n  color: blue;\n}\n.b {\n  color: red;\n}\n");
}

#[test]
fn test_variable_variables() {
    let css = compile_str("@name: \"primary\";\n@primary: green;\n.a { color: @@name; }").unwrap();
    assert_eq!(css, ".a {\n  color: green;\n}\n");
}

#[test]
fn test_undefined_variable() {
    let err = compile_str(".a { color: @missing; }").unwrap_err();
    assert!(matches!(err.root(), LessError::UndefinedVariable { name, .. } if name == "missing"));
}

#[test]
fn test_self_reference_is_an_error() {
    let err = compile_str("@a: @a + 1;\n.x { v: @a; }").unwrap_err();
    assert!(matches!(err.root(), LessError::Syntax { message, .. } if message.contains("recursive")));
}

// ============================================================================
// Interpolation
// ============================================================================

#[test]
fn test_selector_and_property_interpolation() {
    let css = compile_str("@p: \"pad\";\n@side: left;\n.@{p}-x { @{p}ding-@{side}: 1px; }").unwrap();
    assert_eq!(css, ".pad-x {\n  padding-left: 1px;\n}\n");
}

#[test]
fn test_string_interpolation() {
    let css = compile_str("@n: 3;\n.a { content: \"item @{n}\"; }").unwrap();
    assert_eq!(css, ".a {\n  content: \"item 3\";\n}\n");
}

#[test]
fn test_escaped_strings() {
    let css = compile_str("@w: 10px;\n.a { width: ~\"calc(100% - @{w})\"; }").unwrap();
    assert_eq!(css, ".a {\n  width: calc(100% - 10px);\n}\n");
}

// ============================================================================
// Detached rulesets
// ============================================================================

#[test]
fn test_detached_ruleset_call() {
    let css = compile_str("@r: { color: red; }\n.a { @r(); }").unwrap();
    assert_eq!(css, ".a {\n  color: red;\n}\n");
}

#[test]
fn test_calling_a_plain_variable_fails() {
    let err = compile_str("@r: 1px;\n.a { @r(); }").unwrap_err();
    assert!(matches!(err.root(), LessError::TypeMismatch { .. }));
}
