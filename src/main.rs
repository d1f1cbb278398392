//! `lessc`: compiles a LESS stylesheet to CSS.

mod log_init;

use lesscss::{CompileOptions, RewriteUrls, compile_file};
use log::LevelFilter;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "\
Usage: lessc [options] <input.less> [output.css]

Options:
    -x, --compress            Emit compressed CSS
    --rewrite-urls MODE       Rewrite urls in imported files: off, local or all
    --max-recursion N         Maximum nesting of rules, mixins and variables (default: 64)
    --log-file PATH           Append log messages to PATH instead of stderr
    -v, --verbose             Log debug messages (otherwise LESSC_LOG sets the level)
    -h, --help                Print this help
";

struct Args {
    compress: bool,
    rewrite_urls: Option<RewriteUrls>,
    max_recursion: Option<usize>,
    log_file: Option<String>,
    verbose: bool,
    input: PathBuf,
    output: Option<PathBuf>,
}

fn parse_args() -> Result<Option<Args>, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        return Ok(None);
    }
    let parsed = Args {
        compress: args.contains(["-x", "--compress"]),
        rewrite_urls: args.opt_value_from_str("--rewrite-urls")?,
        max_recursion: args.opt_value_from_str("--max-recursion")?,
        log_file: args.opt_value_from_str("--log-file")?,
        verbose: args.contains(["-v", "--verbose"]),
        input: args.free_from_str()?,
        output: args.opt_free_from_str()?,
    };
    let rest = args.finish();
    if !rest.is_empty() {
        eprintln!("lessc: ignoring extra arguments: {rest:?}");
    }
    Ok(Some(parsed))
}

fn run(args: Args) -> Result<(), String> {
    let mut options = CompileOptions::default().compress(args.compress);
    if let Some(mode) = args.rewrite_urls {
        options = options.rewrite_urls(mode);
    }
    if let Some(limit) = args.max_recursion {
        options = options.max_recursion(limit);
    }

    log::info!("compiling {}", args.input.display());
    let css = compile_file(&args.input, &options).map_err(|err| err.to_string())?;
    match &args.output {
        Some(path) => std::fs::write(path, css).map_err(|err| format!("{}: {err}", path.display())),
        None => {
            print!("{css}");
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("lessc: {err}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        std::env::var("LESSC_LOG")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(LevelFilter::Warn)
    };
    if let Err(err) = log_init::init_logger(args.log_file.as_deref(), level) {
        eprintln!("lessc: could not install logger: {err}");
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("lessc: {message}");
            ExitCode::FAILURE
        }
    }
}
