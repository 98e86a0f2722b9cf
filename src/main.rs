//! quire - render markdown chapters into a single HTML page

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use quire::{AssetSource, BookIndex, IndexSource, PageAssembler, PageConfig};

#[derive(Parser)]
#[command(name = "quire")]
#[command(version, about = "Render markdown chapters into a single HTML page", long_about = None)]
#[command(after_help = "EXAMPLES:
    quire render --base docs -o book.html       Render docs/README.md and its chapters
    quire render --index book.json              Render an explicit chapter list
    quire toc --base docs                       Print the numbered table of contents
    quire inline-fonts katex.css -o math.css    Embed WOFF2 fonts as data URLs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Render the book into one HTML page
    Render {
        #[command(flatten)]
        book: BookArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the numbered table of contents
    Toc {
        #[command(flatten)]
        book: BookArgs,
    },

    /// Inline the WOFF2 fonts of a style sheet as base64 data URLs
    InlineFonts {
        /// Style sheet to rewrite
        #[arg(value_name = "CSS")]
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct BookArgs {
    /// Entry document name, or a JSON file with {"title", "files"}
    #[arg(long, value_name = "FILE|JSON")]
    index: Option<String>,

    /// Directory chapters are resolved against
    #[arg(long, value_name = "DIR", default_value = ".")]
    base: PathBuf,

    /// Page style sheet, relative to the working directory (bundled default when omitted)
    #[arg(long, value_name = "CSS")]
    style: Option<PathBuf>,

    /// Style sheet appended when the page contains math, relative to the working directory
    #[arg(long, value_name = "CSS")]
    math_style: Option<PathBuf>,

    /// Diagram library embedded when the page contains a diagram, relative to the working directory
    #[arg(long, value_name = "JS")]
    diagram_script: Option<PathBuf>,

    /// Add a live-reload script
    #[arg(long)]
    watch: bool,

    /// Date shown in the header (YYYY-MM-DD, default today)
    #[arg(long, value_name = "DATE")]
    date: Option<NaiveDate>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match cli.command {
        Command::Render { book, output } => render(&book, output.as_deref()),
        Command::Toc { book } => toc(&book),
        Command::InlineFonts { input, output } => inline_fonts(&input, output.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn render(args: &BookArgs, output: Option<&Path>) -> quire::Result<()> {
    let page = PageAssembler::new(page_config(args)?).render()?;
    log::info!("read {} files", page.dependencies.len());
    write_output(output, &page.html)
}

fn toc(args: &BookArgs) -> quire::Result<()> {
    let outline = PageAssembler::new(page_config(args)?).render_toc()?;
    print!("{outline}");
    Ok(())
}

fn inline_fonts(input: &Path, output: Option<&Path>) -> quire::Result<()> {
    let css = std::fs::read_to_string(input).map_err(|e| quire::Error::io(input, e))?;
    let base_dir = input.parent().unwrap_or(Path::new("."));
    let inlined = quire::css::inline_fonts(&css, base_dir)?;
    write_output(output, &inlined)
}

fn page_config(args: &BookArgs) -> quire::Result<PageConfig> {
    let mut config = PageConfig::new(&args.base).with_watch(args.watch);

    if let Some(index) = &args.index {
        config = config.with_index(index_source(&args.base, index)?);
    }
    if let Some(style) = &args.style {
        config = config.with_style(cli_asset(style)?);
    }
    if let Some(style) = &args.math_style {
        config = config.with_math_style(cli_asset(style)?);
    }
    if let Some(script) = &args.diagram_script {
        config = config.with_diagram_script(cli_asset(script)?);
    }
    if let Some(date) = args.date {
        config = config.with_date(date);
    }

    Ok(config)
}

/// Asset paths on the command line are relative to the working directory,
/// not to `--base`.
fn cli_asset(path: &Path) -> quire::Result<AssetSource> {
    let path = std::path::absolute(path).map_err(|e| quire::Error::io(path, e))?;
    Ok(AssetSource::File(path))
}

/// A `.json` index is an explicit chapter list; anything else names the
/// entry document.
fn index_source(base: &Path, index: &str) -> quire::Result<IndexSource> {
    if index.ends_with(".json") {
        let path = Path::new(index);
        let path = if path.is_absolute() || path.exists() {
            path.to_path_buf()
        } else {
            base.join(path)
        };
        Ok(IndexSource::Explicit(BookIndex::load(path)?))
    } else {
        Ok(IndexSource::Entry(index.to_string()))
    }
}

fn write_output(output: Option<&Path>, content: &str) -> quire::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).map_err(|e| quire::Error::io(path, e))?;
            log::info!("wrote {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_args(base: &str) -> BookArgs {
        BookArgs {
            index: None,
            base: PathBuf::from(base),
            style: None,
            math_style: None,
            diagram_script: None,
            watch: false,
            date: None,
        }
    }

    #[test]
    fn test_cli_assets_resolve_against_working_directory() {
        let mut args = book_args("docs");
        args.style = Some(PathBuf::from("docs/x.css"));
        args.math_style = Some(PathBuf::from("math.css"));

        let config = page_config(&args).unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(config.base_dir, PathBuf::from("docs"));
        assert_eq!(config.style, Some(AssetSource::File(cwd.join("docs/x.css"))));
        assert_eq!(config.math_style, Some(AssetSource::File(cwd.join("math.css"))));
        assert_eq!(config.diagram_script, None);
    }

    #[test]
    fn test_cli_asset_loads_once_under_relative_base() {
        let cwd = std::env::current_dir().unwrap();
        let dir = tempfile::Builder::new()
            .prefix("quire-cli")
            .tempdir_in(&cwd)
            .unwrap();
        let relative = dir.path().strip_prefix(&cwd).unwrap();
        std::fs::write(dir.path().join("x.css"), "p { color: red }").unwrap();

        let asset = cli_asset(&relative.join("x.css")).unwrap();
        let mut dependencies = Vec::new();
        let css = asset.load(relative, &mut dependencies).unwrap();
        assert_eq!(css, "p { color: red }");
        assert_eq!(dependencies, vec![dir.path().join("x.css")]);
    }

    #[test]
    fn test_absolute_asset_path_is_kept() {
        let path = std::env::temp_dir().join("style.css");
        assert_eq!(cli_asset(&path).unwrap(), AssetSource::File(path));
    }
}
