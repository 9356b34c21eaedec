use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use datestamp::{
    Config,
    catalog::{self, ImageDescriptor},
    watermark::{self, AnchorPosition, FontLibrary, Rgb, WatermarkSettings},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "datestamp.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stamp a date onto each image and save it
    Apply {
        files: Vec<PathBuf>,

        /// Date to stamp (YYYY-MM-DD); defaults to each file's creation date
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Save as <name>_watermarked.<ext> instead of overwriting
        #[arg(long)]
        copy: bool,

        /// Write results into this directory instead of next to the source
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Render a PNG preview of one image
    Preview {
        file: PathBuf,

        /// Where to write the preview PNG
        #[arg(short, long)]
        out: PathBuf,

        /// Date to stamp (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Print size and creation date of images
    Inspect {
        files: Vec<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for the `[watermark]` section of the config file
#[derive(Args, Debug)]
struct StyleArgs {
    #[arg(long)]
    position: Option<AnchorPosition>,

    /// Date pattern, e.g. "MM/dd/yyyy" or "%Y-%m-%d"
    #[arg(long)]
    format: Option<String>,

    #[arg(long)]
    font: Option<String>,

    /// Font size in points
    #[arg(long)]
    size: Option<f32>,

    #[arg(long, overrides_with = "no_bold")]
    bold: bool,

    /// Use the regular weight even if the config asks for bold
    #[arg(long, overrides_with = "bold")]
    no_bold: bool,

    #[arg(long, overrides_with = "no_italic")]
    italic: bool,

    #[arg(long, overrides_with = "italic")]
    no_italic: bool,

    #[arg(long)]
    color: Option<Rgb>,

    #[arg(long)]
    shadow_color: Option<Rgb>,

    /// Draw the drop shadow even if the config disables it
    #[arg(long, overrides_with = "no_shadow")]
    shadow: bool,

    #[arg(long, overrides_with = "shadow")]
    no_shadow: bool,

    /// Opacity of text and shadow, 0.0 to 1.0
    #[arg(long)]
    transparency: Option<f32>,
}

impl StyleArgs {
    fn apply_to(&self, settings: &mut WatermarkSettings) {
        if let Some(position) = self.position {
            settings.position = position;
        }
        if let Some(format) = &self.format {
            settings.date_format = format.clone();
        }
        if let Some(font) = &self.font {
            settings.font_family = font.clone();
        }
        if let Some(size) = self.size {
            settings.font_size = size;
        }
        if let Some(bold) = flag(self.bold, self.no_bold) {
            settings.bold = bold;
        }
        if let Some(italic) = flag(self.italic, self.no_italic) {
            settings.italic = italic;
        }
        if let Some(color) = self.color {
            settings.text_color = color;
        }
        if let Some(color) = self.shadow_color {
            settings.shadow_color = color;
        }
        if let Some(shadow) = flag(self.shadow, self.no_shadow) {
            settings.has_drop_shadow = shadow;
        }
        if let Some(transparency) = self.transparency {
            settings.transparency = transparency;
        }
    }
}

/// `Some` when either side of a `--x` / `--no-x` pair was given.
fn flag(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Apply {
            files,
            date,
            copy,
            output_dir,
            style,
        } => run_apply(&config, &files, date, copy, output_dir.as_deref(), &style),
        Commands::Preview {
            file,
            out,
            date,
            style,
        } => run_preview(&config, &file, &out, date, &style),
        Commands::Inspect { files, json } => run_inspect(&files, json),
    }
}

fn settings_for(
    config: &Config,
    style: &StyleArgs,
) -> Result<WatermarkSettings, Box<dyn std::error::Error>> {
    let mut settings = config.watermark.clone();
    style.apply_to(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn run_apply(
    config: &Config,
    files: &[PathBuf],
    date: Option<NaiveDate>,
    copy: bool,
    output_dir: Option<&Path>,
    style: &StyleArgs,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let settings = settings_for(config, style)?;

    for skipped in files.iter().filter(|f| !catalog::is_supported_image(f)) {
        info!("Skipping unsupported file {:?}", skipped);
    }
    let images = catalog::load_descriptors(files);
    if images.is_empty() {
        eprintln!("No images to stamp");
        return Ok(ExitCode::FAILURE);
    }

    let fonts = FontLibrary::from_config(&config.fonts);
    info!("{} font faces available", fonts.len());

    let (mut saved, mut failed) = (0usize, 0usize);
    for image in &images {
        let target = destination(image, copy, output_dir);
        let stamp_date = date.unwrap_or_else(|| image.creation_date());

        match watermark::stamp_file(&image.path, &target, stamp_date, &settings, &fonts) {
            Ok(format) => {
                saved += 1;
                println!(
                    "{} -> {} ({})",
                    image.path.display(),
                    target.display(),
                    format.extension()
                );
            }
            Err(e) => {
                failed += 1;
                error!("Failed to stamp {:?}: {}", image.path, e);
            }
        }
    }

    println!("Saved: {}, failed: {}", saved, failed);
    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn destination(image: &ImageDescriptor, copy: bool, output_dir: Option<&Path>) -> PathBuf {
    let target = watermark::output_path(&image.path, copy);
    match (output_dir, target.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => target,
    }
}

fn run_preview(
    config: &Config,
    file: &Path,
    out: &Path,
    date: Option<NaiveDate>,
    style: &StyleArgs,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let settings = settings_for(config, style)?;
    let fonts = FontLibrary::from_config(&config.fonts);
    let date = date.unwrap_or_else(|| Local::now().date_naive());

    let bytes = std::fs::read(file)?;
    let encoded = watermark::preview(&bytes, date, &settings, &fonts)?;
    watermark::write_atomic(out, &encoded.bytes)?;
    println!("Preview written to {}", out.display());
    Ok(ExitCode::SUCCESS)
}

fn run_inspect(files: &[PathBuf], json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let images = catalog::load_descriptors(files);
    if json {
        println!("{}", serde_json::to_string_pretty(&images)?);
        return Ok(ExitCode::SUCCESS);
    }

    for image in &images {
        println!(
            "{}\t{}x{}\t{}\t{} bytes",
            image.path.display(),
            image.width,
            image.height,
            image.creation_date(),
            image.file_size
        );
    }
    Ok(ExitCode::SUCCESS)
}
