use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use eqraster::{FilterOptions, OutputFormat, RenderConfig, Renderer, ResvgDecoder};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Png,
    Jpeg,
    Webp,
}

/// Render math engine markup (KaTeX/MathJax output) to an image.
#[derive(Debug, Parser)]
#[command(name = "eqraster", version)]
struct Cli {
    /// Markup file; reads stdin when omitted or `-`
    input: Option<PathBuf>,

    /// Output file; defaults to an `equation-<millis>` name in the current directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target width in CSS pixels
    #[arg(long, default_value_t = 400)]
    width: u32,

    /// Target height in CSS pixels
    #[arg(long, default_value_t = 120)]
    height: u32,

    /// JSON file with filter options
    #[arg(long)]
    options: Option<PathBuf>,

    /// CSS file replacing the default engine stylesheet
    #[arg(long)]
    stylesheet: Option<PathBuf>,

    /// Render at this multiple of the target size
    #[arg(long, default_value_t = 1)]
    quality: u32,

    /// Decode timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    #[arg(long, value_enum, default_value_t = Format::Png)]
    format: Format,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = 95)]
    jpeg_quality: u8,

    /// Load system fonts so text elements can be drawn
    #[arg(long)]
    system_fonts: bool,
}

fn read_markup(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read markup from {}", path.display())),
        _ => {
            let mut markup = String::new();
            std::io::stdin()
                .read_to_string(&mut markup)
                .context("failed to read markup from stdin")?;
            Ok(markup)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let markup = read_markup(cli.input.as_ref())?;
    if markup.trim().is_empty() {
        bail!("no markup given");
    }

    let options: FilterOptions = match &cli.options {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read options from {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("invalid filter options in {}", path.display()))?
        }
        None => FilterOptions::default(),
    };

    let mut config = RenderConfig {
        timeout_ms: cli.timeout_ms,
        quality_multiplier: cli.quality,
        output_format: match cli.format {
            Format::Png => OutputFormat::Png,
            Format::Jpeg => OutputFormat::Jpeg(cli.jpeg_quality),
            Format::Webp => OutputFormat::WebP,
        },
        ..Default::default()
    };
    if let Some(path) = &cli.stylesheet {
        config.stylesheet = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read stylesheet from {}", path.display()))?;
    }

    let renderer = if cli.system_fonts {
        Renderer::with_decoder(config, Arc::new(ResvgDecoder::with_system_fonts()))
    } else {
        Renderer::new(config)
    };

    let attachment = renderer
        .render_attachment(&markup, cli.width, cli.height, &options)
        .await
        .context("render failed")?;

    let path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&attachment.file_name));
    std::fs::write(&path, &attachment.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!(
        "wrote {} ({}, {} bytes)",
        path.display(),
        attachment.mime_type,
        attachment.bytes.len()
    );
    println!("{}", path.display());
    Ok(())
}
