use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fa_ast::{ParserConfig, SyntaxExtension};
use fa_parser::{parse_program, ParseResult};
use fa_plugin::{CompilationUnit, FastAsync, Injection, PendingImports, PluginOptions, UseModule};
use swc_common::{source_map::DefaultSourceMapGenConfig, sync::Lrc, SourceMap};
use swc_ecma_ast::Program;
use swc_ecma_codegen::{text_writer::JsWriter, Emitter, Node};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fast-async", about = "fast-async: rewrite async/await into promises, with runtime injection")]
struct Cli {
    /// Log engine activity (equivalent to RUST_LOG=info).
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Enable an extra parser extension (`jsx`, `decorators`, `asyncFunctions`).
    #[arg(long = "syntax", value_name = "EXT", global = true)]
    syntax: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite async functions and emit JavaScript with runtime support.
    Transform {
        /// Input .js/.jsx file.
        input: PathBuf,
        /// Output file (stdout if omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// JSON file with pass options (`env`, `compiler`, `useModule`, `runtimePattern`).
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Import the runtime from a module instead of inlining it.
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        use_module: Option<String>,
        /// Only inline the runtime into matching files, or `directive`.
        #[arg(long)]
        runtime_pattern: Option<String>,
        /// Generate a source map.
        #[arg(long)]
        source_map: bool,
    },
    /// Parse the file and report any syntax errors.
    Check { input: PathBuf },
    /// Parse and dump the AST.
    Parse {
        input: PathBuf,
        /// Dump as JSON instead of debug output.
        #[arg(long)]
        ast: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Transform {
            input,
            output,
            config,
            use_module,
            runtime_pattern,
            source_map,
        } => {
            let source = read_source(&input)?;
            let filename = input.display().to_string();
            let options = load_options(config.as_deref(), use_module, runtime_pattern)?;

            let pass = FastAsync::new(options);
            let mut parser = parser_config(&cli.syntax)?;
            pass.manipulate_options(&mut parser);
            let parsed = parse_program(&source, &filename, &parser)?;
            let source_map_handle = parsed.source_map.clone();

            let mut unit = CompilationUnit {
                program: parsed.program,
                source,
                filename: filename.clone(),
            };
            let mut imports = PendingImports::default();
            let outcome = pass
                .transform(&mut unit, &mut imports)
                .with_context(|| format!("fast-async failed on {filename}"))?;
            let added = imports.apply(&mut unit.program)?;

            match &outcome.injection {
                Injection::Imported(module) => {
                    tracing::info!(%filename, %module, added, "runtime imported")
                }
                Injection::Inlined => tracing::info!(%filename, "runtime inlined"),
                Injection::Skipped => tracing::info!(
                    %filename,
                    runtime_used = outcome.runtime_used,
                    "runtime not injected"
                ),
            }

            let (code, map) = emit(&unit.program, source_map_handle, source_map)?;
            match &output {
                Some(path) => std::fs::write(path, &code)?,
                None => print!("{code}"),
            }

            if let Some(map) = map {
                let map_path = match &output {
                    Some(path) => format!("{}.map", path.display()),
                    None => format!("{filename}.map"),
                };
                std::fs::write(&map_path, &map)?;
                eprintln!("Source map written to {map_path}");
            }
        }
        Commands::Check { input } => {
            let parsed = parse_async(&input, &cli.syntax)?;
            let filename = input.display().to_string();
            let has_async = fa_parser::gate::find_async_syntax(&parsed.program).is_some();
            eprintln!(
                "OK: {filename}{}",
                if has_async { " (uses async functions)" } else { "" }
            );
        }
        Commands::Parse { input, ast } => {
            let parsed = parse_async(&input, &cli.syntax)?;
            if ast {
                let json = serde_json::to_string_pretty(&parsed.program)?;
                println!("{json}");
            } else {
                println!("{:#?}", parsed.program);
            }
        }
    }

    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn parser_config(syntax: &[String]) -> Result<ParserConfig> {
    let mut parser = ParserConfig::default();
    for name in syntax {
        parser.extensions.enable_named(name)?;
    }
    Ok(parser)
}

fn parse_async(input: &Path, syntax: &[String]) -> Result<ParseResult> {
    let source = read_source(input)?;
    let mut parser = parser_config(syntax)?;
    parser.extensions.enable(SyntaxExtension::AsyncFunctions);
    Ok(parse_program(&source, &input.display().to_string(), &parser)?)
}

fn load_options(
    config: Option<&Path>,
    use_module: Option<String>,
    runtime_pattern: Option<String>,
) -> Result<PluginOptions> {
    let mut options = match config {
        Some(path) => {
            let json = read_source(path)?;
            PluginOptions::from_json(&json)
                .with_context(|| format!("invalid options in {}", path.display()))?
        }
        None => PluginOptions::default(),
    };

    if let Some(module) = use_module {
        options.use_module = Some(match module.as_str() {
            "true" => UseModule::Flag(true),
            "false" => UseModule::Flag(false),
            _ => UseModule::Name(module),
        });
    }
    if runtime_pattern.is_some() {
        options.runtime_pattern = runtime_pattern;
    }
    Ok(options)
}

fn emit(program: &Program, cm: Lrc<SourceMap>, with_map: bool) -> Result<(String, Option<String>)> {
    let mut buf = Vec::new();
    let mut srcmap_buf = if with_map { Some(vec![]) } else { None };
    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, srcmap_buf.as_mut());
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default()
                .with_target(swc_ecma_ast::EsVersion::latest()),
            cm: cm.clone(),
            comments: None,
            wr: writer,
        };
        program.emit_with(&mut emitter)?;
    }
    let code = String::from_utf8(buf)?;

    let map = match srcmap_buf {
        Some(mappings) => {
            let srcmap = cm.build_source_map(&mappings, None, DefaultSourceMapGenConfig);
            let mut json = vec![];
            srcmap
                .to_writer(&mut json)
                .context("failed to serialize source map")?;
            Some(String::from_utf8(json)?)
        }
        None => None,
    };

    Ok((code, map))
}
