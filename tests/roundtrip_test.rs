//! Parse and emit behaviour over the fixture Dockerfiles

use runbox::dockerfile::{CommandForm, Instruction};
use runbox::runtime::Language;
use runbox::templates::{generate, java_variant_a, java_variant_b, TemplateKind, DEFAULT_WORKDIR};
use runbox::{parse, Dockerfile, Validator};
use std::path::PathBuf;
use yare::parameterized;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/dockerfiles")
        .join(name);
    std::fs::read_to_string(path).unwrap()
}

#[parameterized(
    java = { "Dockerfile.java" },
    java_bare = { "Dockerfile.java-bare" },
    c = { "Dockerfile.c" },
    cxx = { "Dockerfile.c++" },
    cpp = { "Dockerfile.cpp" },
    go = { "Dockerfile.go" },
    php = { "Dockerfile.php" },
    swift = { "Dockerfile.swift" },
    swift_package = { "Dockerfile.swift-package" },
)]
fn canonical_fixture_emits_unchanged(name: &str) {
    let text = fixture(name);
    let dockerfile = parse(&text).unwrap();
    assert_eq!(dockerfile.emit(), text);
}

#[parameterized(
    quoted_label_keys = { "FROM alpine:3.19\nLABEL \"my key\"=value \"other key\"=\"a b\"\n" },
    quoted_env_key = { "FROM alpine:3.19\nENV \"APP HOME\"=/opt/app\n" },
    escaped_key = { r#"FROM alpine:3.19
LABEL "a\\b"=c
"# },
    legacy_env_with_spaces = { "FROM openjdk:17\nENV JAVA_HOME /opt/java home\n" },
    env_escape_values = { r#"FROM alpine:3.19
ENV WIN_PATH="C:\\tools\\bin" QUOTE="say \"hi\"" TICK='it"s'
"# },
    env_continuation = { "FROM alpine:3.19\nENV A=1 \\\n    B=\"two words\"\n" },
    arg_defaults = { r#"ARG DIR="C:\\tools"
FROM alpine:3.19
ARG MSG="hello world"
ARG EMPTY=
ARG "spaced name"
"# },
    copy_json_with_spaces = { r#"FROM alpine:3.19
COPY ["my dir/a file.txt", "other.txt", "/opt/app dir/"]
"# },
    copy_json_plain = { r#"FROM alpine:3.19
COPY --chown=app:app ["src", "/app/"]
"# },
    volume_json = { r#"FROM alpine:3.19
VOLUME ["/data", "/var/log app"]
VOLUME ["/cache"]
"# },
    backtick_escape = { "# escape=`\nFROM mcr.microsoft.com/windows/servercore:ltsc2022\nENV TOOLS C:\\tools\nENV TICK=\"a``b\"\nWORKDIR C:\\app\nCOPY . C:\\app\\\nRUN dir `\n    C:\\app\n" },
)]
fn emitted_text_reparses_equivalent(text: &str) {
    let dockerfile = parse(text).unwrap();
    let emitted = dockerfile.emit();
    let reparsed = parse(&emitted).unwrap_or_else(|e| panic!("{}\n{}", e, emitted));

    assert!(reparsed.is_equivalent(&dockerfile), "{}", emitted);
    assert_eq!(reparsed.escape, dockerfile.escape);
    assert_eq!(reparsed.emit(), emitted);
}

#[test]
fn fixtures_match_builtin_java_variants() {
    let a = parse(&fixture("Dockerfile.java")).unwrap();
    let b = parse(&fixture("Dockerfile.java-bare")).unwrap();

    assert!(a.is_equivalent(&java_variant_a()));
    assert!(b.is_equivalent(&java_variant_b()));
    assert!(!a.is_equivalent(&b));
}

#[test]
fn variants_differ_only_in_staging_and_command() {
    let a = java_variant_a();
    let b = java_variant_b();

    assert_eq!(a.base_image(), b.base_image());
    assert_eq!(a.working_dir(), b.working_dir());
    assert_eq!(a.working_dir().as_deref(), Some(DEFAULT_WORKDIR));
    assert_eq!(a.default_command().unwrap().argv(), vec!["java", "Main"]);
    assert_eq!(b.default_command().unwrap().argv(), vec!["java"]);
}

#[test]
fn sloppy_input_is_canonicalized() {
    let text = "from  openjdk:17\nworkdir /usr/src/app\ncopy . .\nrun javac \\\nMain.java\ncmd [\"java\",\"Main\"]\n";
    let dockerfile = parse(text).unwrap();
    let canonical = dockerfile.emit();

    assert_eq!(
        canonical,
        "FROM openjdk:17\nWORKDIR /usr/src/app\nCOPY . .\nRUN javac Main.java\nCMD [\"java\", \"Main\"]\n"
    );
    assert_eq!(parse(&canonical).unwrap().emit(), canonical);
    assert!(dockerfile.is_equivalent(&java_variant_a()));
}

#[test]
fn serialized_model_emits_same_text() {
    let dockerfile = parse(&fixture("Dockerfile.c")).unwrap();

    let json = serde_json::to_string(&dockerfile).unwrap();
    let from_json: Dockerfile = serde_json::from_str(&json).unwrap();
    assert_eq!(from_json.emit(), dockerfile.emit());

    let yaml = serde_yaml::to_string(&dockerfile).unwrap();
    let from_yaml: Dockerfile = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(from_yaml, dockerfile);
}

#[test]
fn exec_form_operators_stay_literal() {
    let dockerfile = parse(&fixture("Dockerfile.c++")).unwrap();
    let cmd = dockerfile
        .instructions()
        .find_map(|i| match &i.instruction {
            Instruction::Cmd(form) => Some(form.clone()),
            _ => None,
        })
        .unwrap();

    assert!(matches!(cmd, CommandForm::Exec(ref args) if args.contains(&"&&".to_string())));
    assert_eq!(cmd.process_argv()[0], "g++");
}

#[test]
fn generated_templates_reparse_and_lint_clean() {
    for &language in Language::all() {
        for kind in [TemplateKind::Sandbox, TemplateKind::Standalone { entry: None }] {
            let generated = generate(language, &kind, DEFAULT_WORKDIR).unwrap();
            let reparsed = parse(&generated.emit()).unwrap();
            assert!(reparsed.is_equivalent(&generated), "{} {:?}", language, kind);

            let report = Validator::default().lint(&reparsed);
            assert!(!report.has_errors(), "{} {:?}: {:#?}", language, kind, report.diagnostics);
        }
    }
}
