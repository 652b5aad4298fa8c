mod renderer;
mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use measure_core::{
    fit_scale, BaseExtent, FlipAxis, MeasureSettings, Measurement, PageHandle, PageRenderer,
    Viewer,
};
use pdf_engine::{OpenSource, PdfDocument};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use storage::Storage;
use tracing::info;

pub use renderer::PdfPageRenderer;
pub use script::{parse_script, Step};

#[derive(Debug, Parser)]
#[command(name = "vectormeasure")]
#[command(about = "Measure distances on vector drawings")]
pub struct Cli {
    /// Directory holding settings.json (defaults to the platform config dir).
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable page metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Run a scripted measuring session and print the result as JSON.
    Measure {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// `;`-separated steps, e.g. "enable; click 10,10; click 110,10; calibrate 5".
        #[arg(long)]
        script: String,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Write the flattened page with its marks as PNG.
        #[arg(long, value_name = "PNG")]
        export: Option<PathBuf>,
    },
    /// Inspect or create the settings file.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Print the effective settings.
    Show,
    /// Write default settings.
    Init {
        /// Overwrite an existing settings file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    first_page_size_pt: PageSizeOutput,
    fit_scale: f64,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f64,
    height: f64,
}

#[derive(Debug, Serialize)]
struct MeasureOutput {
    page: u32,
    scale: f64,
    pan: [f64; 2],
    flipped_horizontal: bool,
    flipped_vertical: bool,
    surface_size: [u32; 2],
    units_per_pixel: f64,
    unit: String,
    calibrated: bool,
    calibration_status: String,
    distance_label: Option<String>,
    live_label: Option<String>,
    status: String,
    measurements: Vec<Measurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    export: Option<String>,
}

#[derive(Debug, Serialize)]
struct SettingsOutput {
    path: String,
    exists: bool,
    settings: MeasureSettings,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let storage = match cli.config_dir {
        Some(dir) => Storage::with_root(dir),
        None => Storage::from_default_project().context("failed to locate settings directory")?,
    };

    match cli.command {
        Commands::Info { file } => run_info(&storage, &file),
        Commands::Measure { file, script, page, export } => {
            run_measure(&storage, &file, &script, page, export.as_deref())
        }
        Commands::Settings { action } => run_settings(&storage, action),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(storage: &Storage, file: &Path) -> Result<()> {
    let renderer = open_renderer(file)?;
    let settings = storage.load_settings().context("failed to load settings")?;

    let extent: BaseExtent = renderer.page_size(PageHandle(1))?;
    let fit_scale = fit_scale(settings.container_width, extent)?;

    let payload = InfoOutput {
        path: file.display().to_string(),
        page_count: renderer.page_count(),
        first_page_size_pt: PageSizeOutput { width: extent.width, height: extent.height },
        fit_scale,
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_measure(
    storage: &Storage,
    file: &Path,
    script: &str,
    page: u32,
    export: Option<&Path>,
) -> Result<()> {
    let steps = parse_script(script)?;
    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let settings = storage.load_settings().context("failed to load settings")?;
    let mut viewer = Viewer::new(open_renderer(file)?, settings);
    viewer.open(PageHandle(u64::from(page))).with_context(|| format!("failed to open page {page}"))?;

    for (index, step) in steps.iter().enumerate() {
        apply_step(&mut viewer, *step)
            .with_context(|| format!("step {} ({step:?}) failed: {}", index + 1, viewer.status_message()))?;
    }

    let export = match export {
        Some(path) => {
            let png = viewer.export_flattened_png().context("failed to encode PNG")?;
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, png).with_context(|| format!("failed to write image to {}", path.display()))?;
            info!(path = %path.display(), "exported flattened page");
            Some(path.display().to_string())
        }
        None => None,
    };

    let payload = measure_output(&viewer, page, export)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn apply_step(viewer: &mut Viewer<PdfPageRenderer>, step: Step) -> Result<()> {
    match step {
        Step::Enable => viewer.enable_measuring(),
        Step::Click(point) => {
            viewer.click(point);
        }
        Step::Move(point) => {
            viewer.pointer_move(point);
        }
        Step::Calibrate(length) => {
            viewer.calibrate(length)?;
        }
        Step::Flip(axis) => viewer.flip(axis)?,
        Step::ZoomIn => viewer.zoom_in()?,
        Step::ZoomOut => viewer.zoom_out()?,
        Step::Zoom(factor) => viewer.zoom(factor)?,
        Step::Scale(scale) => viewer.set_scale(scale)?,
        Step::Pan { dx, dy } => viewer.pan_by(dx, dy)?,
        Step::Reset => viewer.reset_view()?,
        Step::Clear => viewer.clear(),
        Step::Cancel => viewer.cancel(),
    }
    Ok(())
}

fn measure_output(
    viewer: &Viewer<PdfPageRenderer>,
    page: u32,
    export: Option<String>,
) -> Result<MeasureOutput> {
    let transform = viewer.transform().context("no page is open")?;
    let (width, height) = viewer.layers().map(|layers| (layers.width(), layers.height())).unwrap_or((0, 0));
    let calibration = viewer.calibration();
    let pan = transform.pan();

    Ok(MeasureOutput {
        page,
        scale: transform.scale(),
        pan: [pan.dx, pan.dy],
        flipped_horizontal: transform.is_flipped(FlipAxis::Horizontal),
        flipped_vertical: transform.is_flipped(FlipAxis::Vertical),
        surface_size: [width, height],
        units_per_pixel: calibration.units_per_base_pixel(),
        unit: calibration.unit().to_owned(),
        calibrated: calibration.is_calibrated(),
        calibration_status: viewer.calibration_status_text(),
        distance_label: viewer.current_distance_label().map(str::to_owned),
        live_label: viewer.live_label().map(str::to_owned),
        status: viewer.status_message().to_owned(),
        measurements: viewer.session().marks().to_vec(),
        export,
    })
}

fn run_settings(storage: &Storage, action: SettingsAction) -> Result<()> {
    let path = storage.settings_path();

    match action {
        SettingsAction::Show => {
            let settings = storage.load_settings().context("failed to load settings")?;
            let payload =
                SettingsOutput { path: path.display().to_string(), exists: path.exists(), settings };
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        SettingsAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!("settings already exist at {} (use --force to overwrite)", path.display());
            }
            storage.save_settings(&MeasureSettings::default()).context("failed to save settings")?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn open_renderer(file: &Path) -> Result<PdfPageRenderer> {
    ensure_pdf_exists(file)?;
    let document = PdfDocument::open(OpenSource::from(file)).context("failed to open PDF")?;
    Ok(PdfPageRenderer::new(document))
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
