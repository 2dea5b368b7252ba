use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use image::ImageFormat;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use imgtomap::{
    Config, ConversionError, ConversionRequest, ImageConverter, MapTemplate, PaletteSelection,
    TileCatalog, CONFIG_FILE_NAME,
};

const MAP_FILE_NAME: &str = "map.wbox";
const PREVIEW_FILE_NAME: &str = "preview.png";

#[derive(Parser, Debug)]
#[command(name = "imgtomap", version)]
#[command(about = "Convert images to WorldBox maps")]
struct Args {
    /// Image files to convert. Folders are searched for images
    images: Vec<PathBuf>,

    /// Ignore the config file
    #[arg(long)]
    no_config: bool,

    /// Generate a config file in the current directory
    #[arg(long)]
    generate_config: bool,

    /// Enable dithering for smoother color transitions. Not recommended for
    /// maps meant to be played on
    #[arg(short = 'D', long)]
    dither: bool,

    /// Target width of the map(s) in cells, 0 for automatic
    #[arg(short = 'W', long, default_value = "0", allow_negative_numbers = true)]
    width: i64,

    /// Target height of the map(s) in cells, 0 for automatic
    #[arg(short = 'H', long, default_value = "0", allow_negative_numbers = true)]
    height: i64,

    /// Search folders recursively
    #[arg(short = 'R', long)]
    recursive: bool,

    /// Where to save the converted maps and previews. Ignored when a config file is loaded
    #[arg(short = 'O', long)]
    output: Option<PathBuf>,

    /// Print the available tiles and their colors, then exit
    #[arg(long)]
    list_tiles: bool,
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), ConversionError> {
    let catalog = TileCatalog::builtin();

    if args.list_tiles {
        for tile in catalog.iter() {
            println!("{:<16} #{}", tile.id, tile.color.to_hex());
        }
        return Ok(());
    }

    let config_path = Path::new(CONFIG_FILE_NAME);
    if args.generate_config {
        Config::for_catalog(catalog).save(config_path)?;
        info!("Generated {}", config_path.display());
    }

    let config = if !args.no_config && config_path.exists() {
        Some(Config::load(config_path)?)
    } else {
        None
    };

    let tiles = config
        .as_ref()
        .map(Config::enabled_tiles)
        .unwrap_or_else(|| PaletteSelection::all(catalog));
    // A loaded config decides the output directory, even over -O
    let output = match config.as_ref() {
        Some(config) => config.output.clone(),
        None => args.output.clone().unwrap_or_else(|| PathBuf::from("./")),
    };
    let template = match config.as_ref().and_then(|c| c.template.as_deref()) {
        Some(path) => MapTemplate::from_path(path)?,
        None => MapTemplate::default(),
    };
    let converter = ImageConverter::new(catalog).with_template(template);

    let mut converted = 0;
    let mut failed = 0;
    for path in args.images.iter() {
        if !path.exists() {
            error!("'{}' does not exist", path.display());
            continue;
        }

        for image_path in find_images(path, args.recursive) {
            match convert_image(&converter, &image_path, &output, &tiles, args) {
                Ok(()) => converted += 1,
                Err(e) => {
                    error!("Failed to convert {}: {}", image_path.display(), e);
                    failed += 1;
                }
            }
        }
    }

    if converted + failed > 0 {
        info!(converted, failed, "Done");
    }
    Ok(())
}

/// Images at `path`: the file itself, or the files inside a folder
fn find_images(path: &Path, recursive: bool) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_image(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    WalkDir::new(path)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_image(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Whether the file extension names a format the image decoder reads
fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(ImageFormat::from_extension)
        .is_some_and(|format| format.reading_enabled())
}

/// Convert one image and write `<output>/<name>/map.wbox` and `preview.png`
fn convert_image(
    converter: &ImageConverter<'_>,
    image_path: &Path,
    output: &Path,
    tiles: &PaletteSelection,
    args: &Args,
) -> Result<(), ConversionError> {
    let image = image::open(image_path)?;
    let request = ConversionRequest {
        image: &image,
        dither: args.dither,
        width: args.width,
        height: args.height,
        tiles: tiles.clone(),
    };
    let map = converter.convert(&request)?;

    let name = image_path.file_stem().unwrap_or(image_path.as_os_str());
    let map_dir = output.join(name);
    fs::create_dir_all(&map_dir)?;
    fs::write(map_dir.join(MAP_FILE_NAME), &map.data)?;
    map.preview.save(map_dir.join(PREVIEW_FILE_NAME))?;

    info!("Converted {}", image_path.display());
    Ok(())
}
