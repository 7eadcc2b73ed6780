use std::path::PathBuf;

use clap::Parser;
use mdkatex::KatexSource;
use miette::Result;
use tracing_subscriber::EnvFilter;

mod convert;

use convert::{RenderOptions, convert_all, convert_stdin, reads_stdin};

#[derive(Parser)]
#[command(version, about = "mdkatex - Markdown to HTML with math ready for KaTeX auto-render", long_about = None)]
struct Cli {
    /// Markdown files to convert. Reads stdin when empty or `-` (which can't be
    /// mixed with files)
    inputs: Vec<PathBuf>,

    /// Output file, or directory when converting several inputs
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit a complete HTML page that loads KaTeX
    #[arg(long)]
    standalone: bool,

    /// Page title for --standalone (defaults to the input file name)
    #[arg(long)]
    title: Option<String>,

    /// Load KaTeX from this directory instead of the CDN
    #[arg(long, env = "MDKATEX_KATEX_PATH")]
    katex_path: Option<PathBuf>,

    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = RenderOptions {
        standalone: cli.standalone,
        title: cli.title,
        katex: cli.katex_path.map_or(KatexSource::Cdn, KatexSource::Local),
    };

    if reads_stdin(&cli.inputs)? {
        convert_stdin(cli.output.as_deref(), &options).await
    } else {
        convert_all(cli.inputs, cli.output, options).await
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .context_lines(2)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
