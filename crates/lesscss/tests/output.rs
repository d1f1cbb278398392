use lesscss::{CompileOptions, compile_str, compile_with};

fn compressed(source: &str) -> String {
    compile_with(source, &CompileOptions::default().compress(true)).unwrap()
}

// ============================================================================
// Flattening
// ============================================================================

#[test]
fn test_nested_rules_flatten() {
    let css = compile_str(
        "
        .card {
            padding: 4px;
            .title { font-weight: bold; }
            &-footer, &:hover { color: gray; }
        }
        ",
    )
    .unwrap();
    insta::assert_snapshot!(css, @r"
    .card {
      padding: 4px;
    }
    .card .title {
      font-weight: bold;
    }
    .card-footer,
    .card:hover {
      color: gray;
    }
    ");
}

#[test]
fn test_empty_rules_are_omitted() {
    let css = compile_str(".a { .b { } }\n.c { @v: 1; }").unwrap();
    assert_eq!(css, "");
}

#[test]
fn test_comments_are_kept() {
    let css = compile_str("/* header */\n.a { /* inside */ b: c; }").unwrap();
    assert_eq!(css, "/* header */\n.a {\n  /* inside */\n  b: c;\n}\n");
}

#[test]
fn test_charset_and_css_imports_are_hoisted() {
    let css = compile_str(".a { b: c; }\n@import \"x.css\";\n@charset \"utf-8\";").unwrap();
    assert_eq!(css, "@charset \"utf-8\";\n@import \"x.css\";\n.a {\n  b: c;\n}\n");
}

#[test]
fn test_property_outside_a_rule_is_an_error() {
    assert!(compile_str("color: red;").is_err());
}

// ============================================================================
// Media
// ============================================================================

#[test]
fn test_media_bubbles_out_of_rules() {
    let css = compile_str(".a { color: blue; @media print { color: red; } }").unwrap();
    assert_eq!(
        css,
        ".a {\n  color: blue;\n}\n@media print {\n  .a {\n    color: red;\n  }\n}\n"
    );
}

#[test]
fn test_nested_media_queries_combine() {
    let css = compile_str("@media screen { .a { @media (min-width: 768px) { color: red; } } }").unwrap();
    assert_eq!(
        css,
        "@media screen and (min-width: 768px) {\n  .a {\n    color: red;\n  }\n}\n"
    );
}

#[test]
fn test_media_query_variables() {
    let css = compile_str("@phone: ~\"(max-width: 480px)\";\n@media @phone { .a { b: c; } }").unwrap();
    assert_eq!(css, "@media (max-width: 480px) {\n  .a {\n    b: c;\n  }\n}\n");
}

#[test]
fn test_font_face_keeps_its_declarations() {
    let css = compile_str("@font-face { font-family: X; src: url(x.woff); }").unwrap();
    assert_eq!(css, "@font-face {\n  font-family: X;\n  src: url(x.woff);\n}\n");
}

// ============================================================================
// Compressed output
// ============================================================================

#[test]
fn test_compressed_output() {
    let css = compressed(".a { color: #ffffff; margin: 0.5px; }\n.b { c: d; }");
    insta::assert_snapshot!(css, @".a{color:#fff;margin:.5px}.b{c:d}");
}

#[test]
fn test_compressed_never_writes_semicolon_before_brace() {
    let css = compressed(".a { x: 1; y: 2; .b { z: 3; } }\n@media print { .c { w: 4; } }");
    assert!(!css.contains(";}"));
    assert_eq!(css, ".a{x:1;y:2}.a .b{z:3}@media print{.c{w:4}}");
}

#[test]
fn test_compressed_drops_plain_comments() {
    let css = compressed("/* gone */\n/*! kept */\n.a { b: c; }");
    assert_eq!(css, "/*! kept */.a{b:c}");
}
