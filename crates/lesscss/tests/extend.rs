use lesscss::{CompileOptions, MemoryResolver, compile_str, compile_with};

#[test]
fn test_selector_suffix_extend() {
    let css = compile_str(".a { color: red; }\n.b:extend(.a) { width: 1px; }").unwrap();
    assert_eq!(css, ".a,\n.b {\n  color: red;\n}\n.b {\n  width: 1px;\n}\n");
}

#[test]
fn test_extend_inside_block() {
    let css = compile_str(".a { color: red; }\n.c { &:extend(.a); }").unwrap();
    assert_eq!(css, ".a,\n.c {\n  color: red;\n}\n");
}

#[test]
fn test_extend_before_target() {
    let css = compile_str(".c:extend(.a) {}\n.a { color: red; }").unwrap();
    assert_eq!(css, ".a,\n.c {\n  color: red;\n}\n");
}

#[test]
fn test_extend_all() {
    let css = compile_str(".x.y { c: d; }\n.z:extend(.x all) {}").unwrap();
    assert_eq!(css, ".x.y,\n.z.y {\n  c: d;\n}\n");
}

#[test]
fn test_nested_extender_uses_full_selector() {
    let css = compile_str(".a { color: red; }\n.p { .q:extend(.a) {} }").unwrap();
    assert_eq!(css, ".a,\n.p .q {\n  color: red;\n}\n");
}

#[test]
fn test_extend_reaches_into_media() {
    let css = compile_str("@media print { .a { color: red; } }\n.b:extend(.a) {}").unwrap();
    assert_eq!(css, "@media print {\n  .a,\n  .b {\n    color: red;\n  }\n}\n");
}

#[test]
fn test_reference_rules_appear_only_through_extends() {
    let resolver = MemoryResolver::new().with_file("lib.less", ".btn { color: red; }\n.unused { x: y; }");
    let options = CompileOptions::default().resolver(resolver);
    let css = compile_with("@import (reference) \"lib\";\n.ok:extend(.btn) {}", &options).unwrap();
    assert_eq!(css, ".ok {\n  color: red;\n}\n");
}

#[test]
fn test_all_extend_containing_its_target() {
    let css = compile_str(".nav .link { color: red; }\n.nav .item:extend(.nav all) {}").unwrap();
    assert_eq!(css, ".nav .link,\n.nav .item .link {\n  color: red;\n}\n");

    let css = compile_str(".a { x: 1; }\n.a.b:extend(.a all) {}").unwrap();
    assert_eq!(css, ".a,\n.a.b {\n  x: 1;\n}\n");
}

#[test]
fn test_extend_inside_media_stays_there() {
    let css = compile_str(".a { x: 1; }\n@media print { .a { y: 2; } .b:extend(.a) {} }").unwrap();
    assert_eq!(
        css,
        ".a {\n  x: 1;\n}\n@media print {\n  .a,\n  .b {\n    y: 2;\n  }\n}\n"
    );
}
