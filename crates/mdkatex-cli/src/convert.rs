use std::path::{Path, PathBuf};
use std::sync::Arc;

use mdkatex::{KatexSource, Pipeline, render_document};
use miette::{IntoDiagnostic, Result, WrapErr};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinSet;

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Wrap the fragment in a full HTML page.
    pub standalone: bool,
    pub title: Option<String>,
    pub katex: KatexSource,
}

impl RenderOptions {
    fn title_for(&self, input: Option<&Path>) -> String {
        self.title.clone().unwrap_or_else(|| {
            input
                .and_then(|path| path.file_stem())
                .and_then(|stem| stem.to_str())
                .unwrap_or("Untitled")
                .to_string()
        })
    }
}

/// Converts one document. Each call gets its own conversion context.
pub fn render(markdown: &str, input: Option<&Path>, options: &RenderOptions) -> Result<String> {
    let body = Pipeline::new().render(markdown)?;
    if options.standalone {
        Ok(render_document(&options.title_for(input), &body, &options.katex))
    } else {
        Ok(body)
    }
}

/// Whether the inputs name stdin: none at all, or only `-`.
///
/// `-` mixed with file paths is rejected rather than read as a file.
pub fn reads_stdin(inputs: &[PathBuf]) -> Result<bool> {
    let dashes = inputs.iter().filter(|input| input.as_os_str() == "-").count();
    if dashes > 0 && dashes < inputs.len() {
        miette::bail!("`-` (stdin) can't be combined with input files");
    }
    Ok(dashes == inputs.len())
}

/// Where the HTML for `input` goes. `None` means stdout.
pub fn output_path(input: &Path, output: Option<&Path>, multiple: bool) -> Option<PathBuf> {
    let html_name = || {
        let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_owned();
        name.push(".html");
        name
    };
    match output {
        None if multiple => Some(input.with_extension("html")),
        None => None,
        Some(dir) if multiple || dir.is_dir() => Some(dir.join(html_name())),
        Some(file) => Some(file.to_path_buf()),
    }
}

pub async fn create_file(dest: &Path) -> Result<File> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .await
                .into_diagnostic()
                .wrap_err_with(|| format!("creating {}", parent.display()))?;
        }
    }
    File::create(dest)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("creating {}", dest.display()))
}

pub async fn write_output(dest: Option<&Path>, html: &str) -> Result<()> {
    match dest {
        Some(dest) => {
            let mut file = create_file(dest).await?;
            file.write_all(html.as_bytes()).await.into_diagnostic()?;
            file.flush().await.into_diagnostic()?;
            tracing::info!("wrote {}", dest.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(html.as_bytes()).await.into_diagnostic()?;
            stdout.flush().await.into_diagnostic()?;
        }
    }
    Ok(())
}

pub async fn convert_file(
    input: PathBuf,
    dest: Option<PathBuf>,
    options: Arc<RenderOptions>,
) -> Result<()> {
    tracing::debug!("converting {}", input.display());
    let markdown = fs::read_to_string(&input)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", input.display()))?;
    let html = render(&markdown, Some(&input), &options)
        .wrap_err_with(|| format!("converting {}", input.display()))?;
    write_output(dest.as_deref(), &html).await
}

pub async fn convert_stdin(dest: Option<&Path>, options: &RenderOptions) -> Result<()> {
    let mut markdown = String::new();
    tokio::io::stdin()
        .read_to_string(&mut markdown)
        .await
        .into_diagnostic()?;
    let html = render(&markdown, None, options)?;
    write_output(dest, &html).await
}

/// Converts every input concurrently, one task per document.
///
/// All tasks run to completion; the first failure is returned.
pub async fn convert_all(
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    options: RenderOptions,
) -> Result<()> {
    let multiple = inputs.len() > 1;
    let options = Arc::new(options);
    let mut tasks = JoinSet::new();
    for input in inputs {
        let dest = output_path(&input, output.as_deref(), multiple);
        tasks.spawn(convert_file(input, dest, options.clone()));
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined.into_diagnostic().and_then(|result| result) {
            tracing::error!("{err:?}");
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
