use fa_ast::{ParserConfig, SyntaxExtension};
use swc_common::{
    comments::{Comments, SingleThreadedComments},
    sync::Lrc,
    BytePos, FileName, SourceMap, Spanned,
};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_parser::{EsSyntax, Syntax};
use swc_ecma_visit::VisitMutWith;

use crate::{gate, locations::StripLocations};

/// Result of parsing one compilation unit.
pub struct ParseResult {
    pub program: Program,
    /// `None` when the `locations` parser option is off.
    pub comments: Option<SingleThreadedComments>,
    pub source_map: Lrc<SourceMap>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{filename}:{line}:{col}: {message}")]
    Syntax {
        filename: String,
        line: usize,
        col: usize,
        message: String,
    },
    #[error("{filename}:{line}:{col}: `{extension}` syntax is not enabled in the parser configuration")]
    ExtensionDisabled {
        extension: SyntaxExtension,
        filename: String,
        line: usize,
        col: usize,
    },
}

/// Parse an ECMAScript source string as a module or script.
///
/// 1. Parse with the SWC parser (JSX/decorators per the enabled extensions).
/// 2. Reject async syntax unless `asyncFunctions` is enabled.
/// 3. Drop spans when `ranges` is off.
pub fn parse_program(
    source: &str,
    filename: &str,
    config: &ParserConfig,
) -> Result<ParseResult, ParseError> {
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );

    let comments = config
        .options
        .locations
        .then(SingleThreadedComments::default);

    let syntax = Syntax::Es(EsSyntax {
        jsx: config.extensions.contains(SyntaxExtension::Jsx) || filename.ends_with(".jsx"),
        decorators: config.extensions.contains(SyntaxExtension::Decorators),
        ..Default::default()
    });

    let mut recovered = vec![];
    let program = swc_ecma_parser::parse_file_as_program(
        &source_file,
        syntax,
        EsVersion::latest(),
        comments.as_ref().map(|c| c as &dyn Comments),
        &mut recovered,
    );
    let mut program = match (program, recovered.into_iter().next()) {
        (Ok(program), None) => program,
        (Err(e), _) | (Ok(_), Some(e)) => {
            let (line, col) = line_col(&source_map, e.span().lo);
            return Err(ParseError::Syntax {
                filename: filename.to_string(),
                line,
                col,
                message: e.kind().msg().to_string(),
            });
        }
    };

    if !config.extensions.contains(SyntaxExtension::AsyncFunctions) {
        if let Some(span) = gate::find_async_syntax(&program) {
            let (line, col) = line_col(&source_map, span.lo);
            return Err(ParseError::ExtensionDisabled {
                extension: SyntaxExtension::AsyncFunctions,
                filename: filename.to_string(),
                line,
                col,
            });
        }
    }

    if !config.options.ranges {
        program.visit_mut_with(&mut StripLocations);
    }

    Ok(ParseResult {
        program,
        comments,
        source_map,
    })
}

fn line_col(source_map: &SourceMap, pos: BytePos) -> (usize, usize) {
    let loc = source_map.lookup_char_pos(pos);
    (loc.line, loc.col.0 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fa_ast::ParserExtensions;

    fn async_config() -> ParserConfig {
        ParserConfig {
            extensions: [SyntaxExtension::AsyncFunctions].into_iter().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn async_function_needs_the_extension() {
        let src = "async function f() { return 1; }";
        let err = parse_program(src, "f.js", &ParserConfig::default())
            .err()
            .unwrap();
        match err {
            ParseError::ExtensionDisabled {
                extension, line, ..
            } => {
                assert_eq!(extension, SyntaxExtension::AsyncFunctions);
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(parse_program(src, "f.js", &async_config()).is_ok());
    }

    #[test]
    fn registering_twice_still_accepts_async() {
        let mut extensions = ParserExtensions::new();
        extensions.enable(SyntaxExtension::AsyncFunctions);
        extensions.enable(SyntaxExtension::AsyncFunctions);
        let config = ParserConfig {
            extensions,
            ..Default::default()
        };
        assert_eq!(config.extensions.len(), 1);
        assert!(parse_program("const g = async () => await h();", "g.js", &config).is_ok());
    }

    #[test]
    fn plain_code_parses_without_extensions() {
        let parsed = parse_program("function f() { return 1; }", "f.js", &ParserConfig::default())
            .unwrap();
        assert!(matches!(parsed.program, Program::Script(_)));
    }

    #[test]
    fn import_makes_a_module() {
        let parsed = parse_program("import a from \"a\";", "m.js", &ParserConfig::default())
            .unwrap();
        assert!(matches!(parsed.program, Program::Module(_)));
    }

    #[test]
    fn syntax_error_reports_position() {
        let err = parse_program("var = 1;", "bad.js", &ParserConfig::default())
            .err()
            .unwrap();
        match err {
            ParseError::Syntax {
                filename, line, ..
            } => {
                assert_eq!(filename, "bad.js");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
