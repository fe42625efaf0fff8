//! Golden-file test harness for fast-async.
//!
//! Discovers `.input.js` files under `tests/fixtures/`, runs the pass
//! (parse → transform → apply imports → codegen), and compares the output
//! against the corresponding `.expected.js` file. A sibling `.options.json`
//! supplies the pass options for that fixture.
//!
//! Output and expected file are both reparsed and compared as syntax trees,
//! ignoring positions and parentheses, so formatting does not matter.
//!
//! Set `FA_UPDATE_FIXTURES=1` to overwrite expected files with actual output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fa_ast::{ParserConfig, SyntaxExtension};
use fa_parser::parse_program;
use fa_plugin::{CompilationUnit, FastAsync, PendingImports, PluginOptions};
use swc_common::EqIgnoreSpan;
use swc_ecma_ast as ast;
use swc_ecma_codegen::{text_writer::JsWriter, Emitter, Node};
use swc_ecma_visit::{VisitMut, VisitMutWith};

fn fixtures_dir() -> PathBuf {
    // CARGO_MANIFEST_DIR is crates/fa_test/, so go up two levels to workspace root.
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
}

fn collect_input_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir(dir)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".input.js"))
        })
        .collect();
    files.sort();
    files
}

fn walkdir(dir: &Path) -> Vec<PathBuf> {
    let mut result = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                result.extend(walkdir(&path));
            } else {
                result.push(path);
            }
        }
    }
    result
}

fn sibling(input: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(input.to_str().unwrap().replace(".input.js", suffix))
}

fn load_options(input: &Path) -> Result<PluginOptions> {
    let path = sibling(input, ".options.json");
    if !path.exists() {
        return Ok(PluginOptions::default());
    }
    let json = std::fs::read_to_string(&path)?;
    PluginOptions::from_json(&json).with_context(|| format!("invalid {}", path.display()))
}

fn run_pipeline(source: &str, filename: &str, options: PluginOptions) -> Result<String> {
    let pass = FastAsync::new(options);
    let mut parser = ParserConfig::default();
    pass.manipulate_options(&mut parser);
    let parsed = parse_program(source, filename, &parser)?;

    let mut unit = CompilationUnit {
        program: parsed.program,
        source: source.to_string(),
        filename: filename.to_string(),
    };
    let mut imports = PendingImports::default();
    pass.transform(&mut unit, &mut imports)?;
    imports.apply(&mut unit.program)?;

    let mut buf = Vec::new();
    {
        let writer = JsWriter::new(parsed.source_map.clone(), "\n", &mut buf, None);
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default()
                .with_target(swc_ecma_ast::EsVersion::latest()),
            cm: parsed.source_map,
            comments: None,
            wr: writer,
        };
        unit.program.emit_with(&mut emitter)?;
    }

    Ok(String::from_utf8(buf)?)
}

struct Unparen;

impl VisitMut for Unparen {
    fn visit_mut_expr(&mut self, node: &mut ast::Expr) {
        node.visit_mut_children_with(self);
        if let ast::Expr::Paren(paren) = node {
            let inner = std::mem::replace(&mut *paren.expr, ast::Expr::Invalid(ast::Invalid {
                span: swc_common::DUMMY_SP,
            }));
            *node = inner;
        }
    }
}

fn normalized(source: &str, filename: &str) -> Result<ast::Program> {
    let mut parser = ParserConfig::default();
    parser.extensions.enable(SyntaxExtension::AsyncFunctions);
    let mut program = parse_program(source, filename, &parser)?.program;
    program.visit_mut_with(&mut Unparen);
    Ok(program)
}

#[test]
fn golden_file_tests() {
    let fixtures = fixtures_dir();
    let input_files = collect_input_files(&fixtures);

    assert!(
        !input_files.is_empty(),
        "No test fixtures found in {}",
        fixtures.display()
    );

    let update_mode = std::env::var("FA_UPDATE_FIXTURES").is_ok();
    let mut failures = Vec::new();

    for input_path in &input_files {
        let expected_path = sibling(input_path, ".expected.js");
        let test_name = input_path
            .strip_prefix(&fixtures)
            .unwrap()
            .display()
            .to_string();

        let source = match std::fs::read_to_string(input_path) {
            Ok(s) => s,
            Err(e) => {
                failures.push(format!("{test_name}: failed to read input: {e}"));
                continue;
            }
        };
        let options = match load_options(input_path) {
            Ok(o) => o,
            Err(e) => {
                failures.push(format!("{test_name}: {e:#}"));
                continue;
            }
        };

        let filename = input_path.display().to_string();
        let actual = match run_pipeline(&source, &filename, options) {
            Ok(s) => s,
            Err(e) => {
                failures.push(format!("{test_name}: pipeline failed: {e:#}"));
                continue;
            }
        };

        if update_mode {
            if let Err(e) = std::fs::write(&expected_path, &actual) {
                failures.push(format!("{test_name}: failed to write expected: {e}"));
            }
            continue;
        }

        let expected = match std::fs::read_to_string(&expected_path) {
            Ok(s) => s,
            Err(e) => {
                failures.push(format!(
                    "{test_name}: failed to read {}: {e}",
                    expected_path.display()
                ));
                continue;
            }
        };

        let matches = match (
            normalized(&actual, "actual.js"),
            normalized(&expected, "expected.js"),
        ) {
            (Ok(actual_tree), Ok(expected_tree)) => actual_tree.eq_ignore_span(&expected_tree),
            (Err(e), _) => {
                failures.push(format!(
                    "{test_name}: output does not reparse: {e}\n--- actual ---\n{}",
                    actual.trim()
                ));
                continue;
            }
            (_, Err(e)) => {
                failures.push(format!("{test_name}: expected file does not parse: {e}"));
                continue;
            }
        };

        if !matches {
            failures.push(format!(
                "{test_name}: output mismatch\n--- expected ---\n{}\n--- actual ---\n{}",
                expected.trim(),
                actual.trim()
            ));
        }
    }

    if !failures.is_empty() {
        panic!(
            "\n{} golden test(s) failed:\n\n{}",
            failures.len(),
            failures.join("\n\n")
        );
    }
}

#[test]
fn output_needs_no_async_support() {
    let fixtures = fixtures_dir();
    let mut failures = Vec::new();

    for input_path in collect_input_files(&fixtures) {
        let test_name = input_path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let result = std::fs::read_to_string(&input_path)
            .map_err(anyhow::Error::from)
            .and_then(|source| {
                let options = load_options(&input_path)?;
                run_pipeline(&source, &input_path.display().to_string(), options)
            });
        let output = match result {
            Ok(s) => s,
            Err(e) => {
                failures.push(format!("{test_name}: pipeline failed: {e:#}"));
                continue;
            }
        };

        // without the extension the parser rejects any remaining async syntax
        if let Err(e) = parse_program(&output, "output.js", &ParserConfig::default()) {
            failures.push(format!(
                "{test_name}: output still needs async support: {e}\n--- output ---\n{}",
                output.trim()
            ));
        }
    }

    if !failures.is_empty() {
        panic!(
            "\n{} output check(s) failed:\n\n{}",
            failures.len(),
            failures.join("\n\n")
        );
    }
}
