use clap::{Args as ClapArgs, Parser, Subcommand};
use image::{DynamicImage, GrayImage, ImageFormat};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod calibrate;
mod config;
mod crop;
mod enhance;
mod error;
mod geometry;
mod package;
mod renderer;
mod renderers;

use config::EnhanceConfig;
use enhance::{Pipeline, Preset};
use error::RoiError;
use geometry::{BBox, CoordinateSpace, RenderScale};
use renderers::RendererRegistry;

#[derive(Parser, Debug)]
#[command(name = "meter-roi")]
#[command(about = "Crop, clean up and package the meter display region of scanned bill PDFs")]
#[command(version)]
pub struct Args {
    /// Page renderer backend (see `meter-roi info`)
    #[arg(long, global = true, env = "METER_ROI_RENDERER")]
    pub renderer: Option<String>,

    /// JSON file overriding enhancer tuning values
    #[arg(long, global = true, env = "METER_ROI_TUNING")]
    pub tuning: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a page region, enhance it and save it as a one-page PDF
    Crop(CropArgs),
    /// Enhance an image file into a digit mask
    Enhance(EnhanceArgs),
    /// Wrap an image file in a one-page PDF
    Package(PackageArgs),
    /// Find a region's bounding box on a rendered page
    Calibrate(CalibrateArgs),
    /// Print available renderers and effective tuning as JSON
    Info,
}

#[derive(ClapArgs, Debug)]
pub struct CropArgs {
    /// Input PDF path
    #[arg(long)]
    pub pdf: PathBuf,

    /// Output PDF path (default: roi_<input name>)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    pub page: usize,

    /// Bounding box in PDF points, origin bottom-left
    #[arg(
        long,
        num_args = 4,
        value_names = ["X0", "Y0", "X1", "Y1"],
        allow_negative_numbers = true,
        conflicts_with = "bbox_file"
    )]
    pub bbox: Option<Vec<f64>>,

    /// Read the bounding box from a calibration bbox.txt (origin top-left)
    #[arg(long)]
    pub bbox_file: Option<PathBuf>,

    /// Render DPI
    #[arg(long, env = "METER_ROI_DPI", default_value_t = 400)]
    pub dpi: u32,

    /// Enhancement applied before packaging
    #[arg(long, value_enum, default_value_t = Preset::Light)]
    pub preset: Preset,

    /// Disable the unsharp mask cleanup
    #[arg(long)]
    pub no_sharpen: bool,

    /// Open the result in the platform viewer
    #[arg(long)]
    pub open: bool,

    /// Print a JSON summary instead of a status line
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct EnhanceArgs {
    /// Path to the meter image
    #[arg(long)]
    pub img: PathBuf,

    /// Output image path
    #[arg(long, default_value = "preprocessed.png")]
    pub save: PathBuf,

    /// Enhancement preset (mask for the full digit mask)
    #[arg(long, value_enum, default_value_t = Preset::Mask)]
    pub preset: Preset,

    /// Resolution the image was rendered at (rescales the decimal-dot area band)
    #[arg(long, env = "METER_ROI_DPI", default_value_t = 400)]
    pub dpi: u32,

    /// Write every intermediate stage as a PNG into this directory
    #[arg(long)]
    pub steps_dir: Option<PathBuf>,

    /// Skip the <save>_sideby.png comparison image
    #[arg(long)]
    pub no_side_by_side: bool,

    /// Disable the unsharp mask of the light preset
    #[arg(long)]
    pub no_sharpen: bool,

    /// Print step timings as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct PackageArgs {
    /// Image to embed
    #[arg(long)]
    pub img: PathBuf,

    /// Output PDF path
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(ClapArgs, Debug)]
pub struct CalibrateArgs {
    /// Input PDF path
    #[arg(long)]
    pub pdf: PathBuf,

    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    pub page: usize,

    /// Render DPI
    #[arg(long, env = "METER_ROI_DPI", default_value_t = 400)]
    pub dpi: u32,

    /// Bounding box to preview first, in PDF points, origin top-left
    #[arg(long, num_args = 4, value_names = ["X0", "Y0", "X1", "Y1"])]
    pub bbox: Option<Vec<f64>>,

    /// Directory for page_preview.png, roi_preview.png and bbox.txt
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing; stdout is kept for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("meter-roi v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args) {
        tracing::error!(code = e.code(), "{}", e);
        return Err(e.into());
    }
    Ok(())
}

fn run(args: Args) -> Result<(), RoiError> {
    let tuning = match &args.tuning {
        Some(path) => EnhanceConfig::load(path)?,
        None => EnhanceConfig::default(),
    };
    let renderer_name = args.renderer.as_deref();

    match args.command {
        Command::Crop(crop_args) => run_crop(crop_args, renderer_name, tuning),
        Command::Enhance(enhance_args) => run_enhance(enhance_args, tuning),
        Command::Package(package_args) => run_package(package_args),
        Command::Calibrate(calibrate_args) => run_calibrate(calibrate_args, renderer_name),
        Command::Info => run_info(tuning),
    }
}

fn run_crop(args: CropArgs, renderer_name: Option<&str>, tuning: EnhanceConfig) -> Result<(), RoiError> {
    let bbox = match (&args.bbox, &args.bbox_file) {
        (_, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| RoiError::InvalidBbox(format!("Failed to read {}: {}", path.display(), e)))?;
            BBox::parse(&text, CoordinateSpace::TopLeft)?
        }
        (Some(values), None) => BBox::from_slice(values, CoordinateSpace::BottomLeft)?,
        (None, None) => BBox::from_slice(&crop::DEFAULT_BBOX, CoordinateSpace::BottomLeft)?,
    };

    let request = crop::CropRequest {
        output: args.out.clone().unwrap_or_else(|| crop::default_output(&args.pdf)),
        input: args.pdf,
        page: args.page,
        bbox,
        dpi: args.dpi,
        preset: args.preset,
        sharpen: !args.no_sharpen,
        tuning,
    };

    let registry = RendererRegistry::new();
    let renderer = registry.select(renderer_name)?;
    let summary = crop::crop_roi_to_pdf(renderer, &request)?;

    if args.json {
        print_json(&summary)?;
    } else {
        println!("Saved ROI PDF -> {}", summary.output.display());
    }
    if args.open {
        crop::open_file(&summary.output);
    }
    Ok(())
}

fn run_enhance(args: EnhanceArgs, tuning: EnhanceConfig) -> Result<(), RoiError> {
    let image = load_image(&args.img)?;

    if let Some(dir) = &args.steps_dir {
        std::fs::create_dir_all(dir).map_err(|e| RoiError::write_failure(dir, e))?;
    }

    let result = Pipeline::new(args.preset, tuning.for_dpi(args.dpi))
        .with_sharpen(!args.no_sharpen)
        .with_stages(args.steps_dir.is_some())
        .process(&image)?;

    // encode everything before any output becomes visible; the mask goes last
    let mut staged = Vec::new();
    if let Some(dir) = &args.steps_dir {
        for (index, (name, stage)) in result.stages.iter().enumerate() {
            let path = dir.join(format!("{:02}_{}.png", index + 1, name));
            staged.push(stage_image(&DynamicImage::ImageLuma8(stage.clone()), &path)?);
        }
    }
    if !args.no_side_by_side {
        let pair = side_by_side(&image.to_luma8(), &result.image.to_luma8());
        staged.push(stage_image(&DynamicImage::ImageLuma8(pair), &side_by_side_path(&args.save))?);
    }
    staged.push(stage_image(&result.image, &args.save)?);

    for image in staged {
        image.persist()?;
    }
    if let Some(dir) = &args.steps_dir {
        tracing::info!("Wrote {} stages to {}", result.stages.len(), dir.display());
    }

    if args.json {
        print_json(&result)?;
    } else {
        println!("Saved -> {}", args.save.display());
    }
    Ok(())
}

fn run_package(args: PackageArgs) -> Result<(), RoiError> {
    let image = load_image(&args.img)?;
    let packaged = package::package_image(&image, &args.out)?;
    println!("Saved PDF -> {}", packaged.path.display());
    Ok(())
}

fn run_calibrate(args: CalibrateArgs, renderer_name: Option<&str>) -> Result<(), RoiError> {
    let registry = RendererRegistry::new();
    let renderer = registry.select(renderer_name)?;
    let doc = renderers::open_document(renderer, &args.pdf)?;
    let scale = RenderScale::new(args.dpi)?;

    std::fs::create_dir_all(&args.out_dir).map_err(|e| RoiError::write_failure(&args.out_dir, e))?;
    let mut session = calibrate::CalibrationSession::new(doc, args.page, scale, &args.out_dir)?;

    let stdout = std::io::stdout();
    if let Some(values) = &args.bbox {
        let bbox = BBox::from_slice(values, CoordinateSpace::TopLeft)?;
        let selection = session.preview_bbox(bbox)?;
        writeln!(
            stdout.lock(),
            "Previewing bbox (points, origin top-left): {}",
            selection.bbox
        )
        .map_err(|e| RoiError::write_failure("<stdout>", e))?;
    }

    session.run(std::io::stdin().lock(), stdout.lock())
}

fn run_info(tuning: EnhanceConfig) -> Result<(), RoiError> {
    let registry = RendererRegistry::new();
    let info = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "default_renderer": registry.default_name(),
        "renderers": registry.info(),
        "tuning": tuning,
    });
    print_json(&info)
}

fn load_image(path: &Path) -> Result<DynamicImage, RoiError> {
    if !path.exists() {
        return Err(RoiError::InputNotFound(path.to_path_buf()));
    }
    image::open(path)
        .map_err(|e| RoiError::InvalidInput(format!("Failed to decode {}: {}", path.display(), e)))
}

/// An encoded image in a scratch file beside its destination
struct StagedImage {
    tmp: tempfile::NamedTempFile,
    path: PathBuf,
}

impl StagedImage {
    fn persist(self) -> Result<(), RoiError> {
        let path = self.path;
        self.tmp
            .persist(&path)
            .map_err(|e| RoiError::write_failure(&path, e.error))?;
        tracing::info!("Wrote {}", path.display());
        Ok(())
    }
}

/// Encode `image` in the format named by `path`'s extension without touching `path`
fn stage_image(image: &DynamicImage, path: &Path) -> Result<StagedImage, RoiError> {
    let format = ImageFormat::from_path(path).map_err(|e| RoiError::write_failure(path, e))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| RoiError::write_failure(path, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        image
            .write_to(&mut writer, format)
            .map_err(|e| RoiError::write_failure(path, e))?;
        writer.flush().map_err(|e| RoiError::write_failure(path, e))?;
    }
    Ok(StagedImage {
        tmp,
        path: path.to_path_buf(),
    })
}

/// `<stem>_sideby.<ext>` next to `save`
fn side_by_side_path(save: &Path) -> PathBuf {
    let stem = save.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let ext = save
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    save.with_file_name(format!("{}_sideby.{}", stem, ext))
}

/// Input and result next to each other, for a quick visual check
fn side_by_side(left: &GrayImage, right: &GrayImage) -> GrayImage {
    let mut canvas = GrayImage::new(left.width() + right.width(), left.height().max(right.height()));
    image::imageops::replace(&mut canvas, left, 0, 0);
    image::imageops::replace(&mut canvas, right, left.width() as i64, 0);
    canvas
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), RoiError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| RoiError::InvalidInput(format!("Failed to serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
