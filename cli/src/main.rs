mod config;
mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use folio::parser::ParseError;
use renderer::Renderer;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "folio", version, about = "Declarative document template renderer")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template against a data file
    Render(RenderArgs),

    /// Run .test.toml fixture files
    Test(TestArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// The output tree as JSON
    Json,
    /// Leaf texts, one per line
    Text,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// JSON template file
    template: String,

    /// JSON data file (not needed with --check or --ast)
    data: Option<String>,

    /// Date format used by renderDates, e.g. "MMM YYYY"
    #[arg(long)]
    date_format: Option<String>,

    /// Maximum template nesting depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Validate the template and its expressions, don't render (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the loaded template
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.toml file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Render(render_args) => do_render(render_args, cli.no_color, cli.verbose),
        Command::Test(test_args) => {
            init_logging("error", cli.verbose, cli.no_color);
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging(level: &str, verbose: bool, no_color: bool) {
    let level = if verbose { "debug" } else { level };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(!no_color)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("logging initialized with level: {}", level);
}

fn do_render(args: RenderArgs, no_color: bool, verbose: bool) {
    let config = match &args.config {
        Some(path) => Config::load(Path::new(path)).unwrap_or_else(|e| fail(&e)),
        None => Config::default(),
    };
    init_logging(config.log_level(), verbose, no_color);

    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let writer = StandardStream::stderr(color_choice);
    let term_config = term::Config::default();

    // Read template
    let source = read_file(&args.template);
    let mut files = SimpleFiles::new();
    let file_id = files.add(args.template.clone(), source.clone());

    // Load
    let template = match folio::parser::Parser::new(source, file_id).parse() {
        Ok(t) => t,
        Err(errors) => {
            emit(&writer, &term_config, &files, &errors);
            process::exit(1);
        }
    };

    let options = config.render_options(args.date_format.as_deref(), args.max_depth);
    let renderer = Renderer::new(options);

    // --check: template loads, every expression compiles, depth is in range
    if args.check {
        let failures = renderer.precompile(&template);
        let errors: Vec<ParseError> = failures
            .into_iter()
            .map(|failure| {
                let name = format!("{}#{}", args.template, failure.location);
                let expression_id = files.add(name, failure.expression);
                ParseError {
                    file_id: expression_id,
                    ..failure.error
                }
            })
            .collect();
        emit(&writer, &term_config, &files, &errors);

        if template.depth > renderer.options().max_depth {
            eprintln!(
                "error: template nests {} levels deep, the limit is {}",
                template.depth,
                renderer.options().max_depth
            );
            process::exit(1);
        }
        if !errors.is_empty() {
            process::exit(1);
        }
        eprintln!("ok: {} loaded successfully", args.template);
        return;
    }

    // --ast: dump the loaded template
    if args.ast {
        println!("{:#?}", template);
        return;
    }

    let Some(data_path) = &args.data else {
        fail("a data file is required to render");
    };
    let data: serde_json::Value = serde_json::from_str(&read_file(data_path))
        .unwrap_or_else(|e| fail(&format!("invalid data JSON in '{}': {}", data_path, e)));

    let output = renderer
        .render(&template, &data)
        .unwrap_or_else(|e| fail(&e.to_string()));

    match args.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(&format!("cannot serialize output: {}", e)),
        },
        OutputFormat::Text => print!("{}", output),
    }
}

fn read_file(path: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| fail(&format!("cannot read '{}': {}", path, e)))
}

fn fail(message: &str) -> ! {
    eprintln!("error: {}", message);
    process::exit(1);
}

fn emit(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    errors: &[ParseError],
) {
    for error in errors {
        let diagnostic = error.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
    }
}
