//! The host's import-adding facility.

use std::collections::HashSet;

use fa_ast::{ParserConfig, ParserOptions};
use fa_parser::parse_program;
use swc_ecma_ast as ast;
use swc_ecma_visit::{Visit, VisitWith};

use crate::{
    error::PassError,
    inject::{prepend_module_item, prepend_stmt, unquote},
};

/// Adds a default import of a module to the unit being compiled.
pub trait ImportAdder {
    fn add_import(&mut self, module: &str);
}

/// Records import requests so they can be applied once the pass committed.
#[derive(Debug, Default)]
pub struct PendingImports {
    requests: Vec<String>,
}

impl ImportAdder for PendingImports {
    fn add_import(&mut self, module: &str) {
        if !self.requests.iter().any(|m| m == module) {
            self.requests.push(module.to_string());
        }
    }
}

impl PendingImports {
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    /// Insert the requested imports after the program's directive prologue,
    /// in request order. Modules get `import` declarations, scripts get
    /// `require` calls. A module the program already imports is skipped.
    /// Returns how many imports were inserted.
    pub fn apply(self, program: &mut ast::Program) -> Result<usize, PassError> {
        let mut taken = identifiers(program);
        let mut planned = Vec::new();
        for module in self.requests {
            if let ast::Program::Module(m) = &*program {
                if imports_module(m, &module) {
                    continue;
                }
            }
            let local = fresh_binding(&binding_name(&module), &taken);
            taken.insert(local.clone());
            planned.push((module, local));
        }

        let mut inserted = 0;
        let is_module = matches!(program, ast::Program::Module(_));
        for (module, local) in planned.into_iter().rev() {
            let Some(item) = parse_item(&import_source(&module, &local, is_module), &module)? else {
                continue;
            };
            match item {
                ast::ModuleItem::Stmt(stmt) => prepend_stmt(program, stmt),
                decl => {
                    if let ast::Program::Module(m) = &mut *program {
                        prepend_module_item(m, decl);
                    }
                }
            }
            inserted += 1;
        }
        Ok(inserted)
    }
}

/// `_` followed by the camel-cased module name: `nodent-runtime` → `_nodentRuntime`.
pub fn binding_name(module: &str) -> String {
    let mut name = String::from("_");
    for (i, part) in module
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|p| !p.is_empty())
        .enumerate()
    {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                name.push(first);
            } else {
                name.push(first.to_ascii_uppercase());
            }
            name.extend(chars);
        }
    }
    if name.len() == 1 {
        name.push_str("runtime");
    }
    name
}

/// `base`, or `base2`, `base3`, ... when `base` is already taken.
fn fresh_binding(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Every identifier name in the program, bindings and references alike.
#[derive(Default)]
struct IdentifierCollector {
    names: HashSet<String>,
}

impl Visit for IdentifierCollector {
    fn visit_ident(&mut self, node: &ast::Ident) {
        self.names.insert(node.sym.to_string());
    }
}

fn identifiers(program: &ast::Program) -> HashSet<String> {
    let mut collector = IdentifierCollector::default();
    program.visit_with(&mut collector);
    collector.names
}

fn import_source(module: &str, local: &str, is_module: bool) -> String {
    // JSON string syntax is valid JS string literal syntax.
    let specifier = serde_json::Value::String(module.to_string()).to_string();
    if is_module {
        format!("import {local} from {specifier};")
    } else {
        format!("var {local} = require({specifier});")
    }
}

fn parse_item(source: &str, module: &str) -> Result<Option<ast::ModuleItem>, PassError> {
    let config = ParserConfig {
        options: ParserOptions {
            ranges: false,
            locations: false,
        },
        ..Default::default()
    };
    let parsed = parse_program(source, "<import>", &config).map_err(|source| PassError::Import {
        module: module.to_string(),
        source,
    })?;
    Ok(match parsed.program {
        ast::Program::Module(m) => m.body.into_iter().next(),
        ast::Program::Script(s) => s.body.into_iter().next().map(ast::ModuleItem::Stmt),
    })
}

fn imports_module(module: &ast::Module, name: &str) -> bool {
    module.body.iter().any(|item| match item {
        ast::ModuleItem::ModuleDecl(ast::ModuleDecl::Import(import)) => {
            import.src.raw.as_deref().and_then(unquote) == Some(name)
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use fa_ast::ParserConfig;
    use fa_parser::parse_program;

    use super::*;
    use crate::inject::directive_text;

    fn parse(src: &str) -> ast::Program {
        parse_program(src, "t.js", &ParserConfig::default())
            .unwrap()
            .program
    }

    #[test]
    fn binding_names_are_camel_cased() {
        assert_eq!(binding_name("nodent-runtime"), "_nodentRuntime");
        assert_eq!(binding_name("@scope/async.rt"), "_scopeAsyncRt");
        assert_eq!(binding_name("--"), "_runtime");
    }

    #[test]
    fn duplicate_requests_collapse() {
        let mut imports = PendingImports::default();
        imports.add_import("nodent-runtime");
        imports.add_import("nodent-runtime");
        assert_eq!(imports.requests().len(), 1);
    }

    #[test]
    fn module_gets_import_after_prologue() {
        let mut program = parse("'use strict';\nimport a from \"a\";\nexport default a;");
        let mut imports = PendingImports::default();
        imports.add_import("nodent-runtime");
        assert_eq!(imports.apply(&mut program).unwrap(), 1);

        let ast::Program::Module(module) = &program else {
            panic!("expected a module");
        };
        assert_eq!(module.body.len(), 4);
        match &module.body[1] {
            ast::ModuleItem::ModuleDecl(ast::ModuleDecl::Import(import)) => {
                assert_eq!(import.src.raw.as_deref(), Some("\"nodent-runtime\""));
                assert_eq!(import.specifiers.len(), 1);
            }
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn existing_import_is_not_duplicated() {
        let mut program = parse("import rt from 'nodent-runtime';\nrt();");
        let mut imports = PendingImports::default();
        imports.add_import("nodent-runtime");
        assert_eq!(imports.apply(&mut program).unwrap(), 0);
    }

    #[test]
    fn script_gets_require() {
        let mut program = parse("\"use strict\";\nmain();");
        let mut imports = PendingImports::default();
        imports.add_import("nodent-runtime");
        imports.apply(&mut program).unwrap();

        let ast::Program::Script(script) = &program else {
            panic!("expected a script");
        };
        assert_eq!(script.body.len(), 3);
        assert_eq!(directive_text(&script.body[0]), Some("use strict"));
        assert!(matches!(script.body[1], ast::Stmt::Decl(ast::Decl::Var(_))));
    }

    #[test]
    fn taken_binding_names_get_a_suffix() {
        let mut program = parse(
            "var _nodentRuntime = 1;\nfunction f(_nodentRuntime2) { return _nodentRuntime2; }",
        );
        let mut imports = PendingImports::default();
        imports.add_import("nodent-runtime");
        imports.apply(&mut program).unwrap();

        let ast::Program::Script(script) = &program else {
            panic!("expected a script");
        };
        match &script.body[0] {
            ast::Stmt::Decl(ast::Decl::Var(var)) => match &var.decls[0].name {
                ast::Pat::Ident(binding) => assert_eq!(binding.id.sym, *"_nodentRuntime3"),
                other => panic!("unexpected pattern {other:?}"),
            },
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn distinct_modules_get_distinct_bindings() {
        let mut taken = HashSet::new();
        taken.insert("_a".to_string());
        assert_eq!(fresh_binding("_a", &taken), "_a2");
        assert_eq!(fresh_binding("_b", &taken), "_b");
    }
}
