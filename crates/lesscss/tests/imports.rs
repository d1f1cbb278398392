use lesscss::{CompileOptions, LessError, MemoryResolver, RewriteUrls, compile_file, compile_with};

fn with_files(files: &[(&str, &str)]) -> CompileOptions {
    let resolver = files
        .iter()
        .fold(MemoryResolver::new(), |resolver, (path, text)| resolver.with_file(path, *text));
    CompileOptions::default().resolver(resolver)
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_imported_variables_and_mixins() {
    let options = with_files(&[("lib.less", "@main: blue;\n.m() { color: @main; }")]);
    let css = compile_with("@import \"lib\";\n.a { .m(); }", &options).unwrap();
    assert_eq!(css, ".a {\n  color: blue;\n}\n");
}

#[test]
fn test_imports_happen_once() {
    let options = with_files(&[("a.less", ".a { b: c; }")]);
    let css = compile_with("@import \"a\";\n@import \"a.less\";", &options).unwrap();
    assert_eq!(css, ".a {\n  b: c;\n}\n");
}

#[test]
fn test_multiple_imports_repeat() {
    let options = with_files(&[("a.less", "/* a */")]);
    let css = compile_with("@import \"a\";\n@import (multiple) \"a\";", &options).unwrap();
    assert_eq!(css, "/* a */\n/* a */\n");
}

#[test]
fn test_nested_imports_are_relative_to_their_file() {
    let options = with_files(&[
        ("sub/outer.less", "@import \"inner\";"),
        ("sub/inner.less", ".inner { x: 1; }"),
    ]);
    let css = compile_with("@import \"sub/outer\";", &options).unwrap();
    assert_eq!(css, ".inner {\n  x: 1;\n}\n");
}

#[test]
fn test_inline_import_is_verbatim() {
    let options = with_files(&[("raw.css", ".raw{a:b}\n")]);
    let css = compile_with("@import (inline) \"raw.css\";", &options).unwrap();
    assert_eq!(css, ".raw{a:b}\n");
}

#[test]
fn test_reference_import_mixins() {
    let options = with_files(&[("lib.less", ".btn { color: red; }\n/* hidden */")]);
    let css = compile_with("@import (reference) \"lib\";\n.a { .btn; }", &options).unwrap();
    assert_eq!(css, ".a {\n  color: red;\n}\n");
}

#[test]
fn test_interpolated_import_name() {
    let options = with_files(&[("theme/colors.less", "@main: green;")]);
    let css = compile_with(
        "@theme: \"theme\";\n@import \"@{theme}/colors\";\n.a { color: @main; }",
        &options,
    )
    .unwrap();
    assert_eq!(css, ".a {\n  color: green;\n}\n");
}

#[test]
fn test_url_rewriting() {
    let options = with_files(&[("sub/img.less", ".i { background: url(\"pic.png\"); }")])
        .rewrite_urls(RewriteUrls::All);
    let css = compile_with("@import \"sub/img\";", &options).unwrap();
    assert_eq!(css, ".i {\n  background: url(\"sub/pic.png\");\n}\n");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_import() {
    let err = compile_with("@import \"nope\";", &with_files(&[])).unwrap_err();
    assert!(matches!(err.root(), LessError::Resource { path, .. } if path == "nope"));
}

#[test]
fn test_optional_import() {
    let css = compile_with("@import (optional) \"nope\";\n.a { b: c; }", &with_files(&[])).unwrap();
    assert_eq!(css, ".a {\n  b: c;\n}\n");
}

// ============================================================================
// Filesystem
// ============================================================================

#[test]
fn test_compile_file_reads_imports_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("vars.less"), "@gap: 8px;").unwrap();
    let main = dir.path().join("main.less");
    std::fs::write(&main, "@import \"vars\";\n.a { margin: @gap * 2; }").unwrap();

    let css = compile_file(&main, &CompileOptions::default()).unwrap();
    assert_eq!(css, ".a {\n  margin: 16px;\n}\n");
}

#[test]
fn test_compile_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = compile_file(dir.path().join("absent.less"), &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, LessError::Resource { .. }));
}
