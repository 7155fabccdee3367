use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use image::ColorType;
use strider::{
    dim4, Array, Config, DType, Device, DeviceRequest, Interpolation, KernelKind, Seq, Source,
};

#[derive(Parser, Debug)]
#[command(name = "strider", about = "Resample images with strided array kernels")]
struct Opts {
    /// Device to run on, defaults to $STRIDER_DEVICE or cpu
    #[arg(short, long, global = true)]
    device: Option<DeviceRequest>,

    /// Log verbosity
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Io {
    input: PathBuf,
    output: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scale an image to WIDTH x HEIGHT
    Resize {
        #[command(flatten)]
        io: Io,
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
        #[arg(short, long, default_value = "bilinear")]
        method: Interpolation,
    },
    /// Warp an image by an affine (6 values) or perspective (9 values) matrix
    Transform {
        #[command(flatten)]
        io: Io,
        /// Row-major matrix, e.g. 1,0,10,0,1,0
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        matrix: Vec<f32>,
        #[arg(long)]
        width: Option<usize>,
        #[arg(long)]
        height: Option<usize>,
        /// The matrix already maps output pixels to input pixels
        #[arg(long)]
        inverse: bool,
        #[arg(short, long, default_value = "bilinear")]
        method: Interpolation,
    },
    /// Cut out the inclusive pixel range [X0, X1] x [Y0, Y1]
    Crop {
        #[command(flatten)]
        io: Io,
        #[arg(long, allow_hyphen_values = true)]
        x0: isize,
        #[arg(long, allow_hyphen_values = true)]
        x1: isize,
        #[arg(long, allow_hyphen_values = true)]
        y0: isize,
        #[arg(long, allow_hyphen_values = true)]
        y1: isize,
        /// Negative steps mirror the image
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        step: isize,
    },
    /// Print the selected device and its kernel tables
    Info,
}

pub fn start_logger(level: log::LevelFilter) {
    let logger = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level_for("wgpu_core", log::LevelFilter::Warn)
        .level_for("naga", log::LevelFilter::Warn)
        .level(level)
        .chain(std::io::stderr())
        .apply();
    match logger {
        Ok(_) => log::info!("Logging initialized."),
        Err(error) => eprintln!("Error initializing logging: {:?}", error),
    }
}

/// A decoded image as a planar `(width, height, channels)` u8 array.
struct Image {
    array: Array,
    color: ColorType,
}

fn load_image(path: &Path) -> anyhow::Result<Image> {
    let img = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let (width, height) = (img.width() as usize, img.height() as usize);
    let (color, raw) = match img.color().channel_count() {
        1 => (ColorType::L8, img.into_luma8().into_raw()),
        2 => (ColorType::La8, img.into_luma_alpha8().into_raw()),
        3 => (ColorType::Rgb8, img.into_rgb8().into_raw()),
        _ => (ColorType::Rgba8, img.into_rgba8().into_raw()),
    };
    let channels = color.channel_count() as usize;

    let mut planar = vec![0u8; raw.len()];
    for (i, px) in raw.chunks_exact(channels).enumerate() {
        for (c, v) in px.iter().enumerate() {
            planar[i + c * width * height] = *v;
        }
    }
    let array = Array::from_host(
        dim4!(width, height, channels),
        &planar,
        Source::Host,
        &Device::CPU,
    )?;
    log::info!("Loaded {} as {:?}", path.display(), array.dims()?);
    Ok(Image { array, color })
}

fn save_image(path: &Path, array: &Array, color: ColorType) -> anyhow::Result<()> {
    let host = array.to(&Device::CPU)?;
    let host = match host.dt()? {
        DType::U8 => host,
        _ => host.cast(DType::U8)?,
    };
    let dims = host.dims()?;
    let (width, height, channels) = (dims[0], dims[1], dims[2]);
    let planar = host.host::<u8>()?;

    let mut raw = vec![0u8; planar.len()];
    for c in 0..channels {
        for i in 0..width * height {
            raw[i * channels + c] = planar[i + c * width * height];
        }
    }
    image::save_buffer(path, &raw, width as u32, height as u32, color)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {} ({}x{})", path.display(), width, height);
    Ok(())
}

/// Moves an image onto `device`, widening to f32 where u8 is not supported.
fn stage(array: &Array, device: &Device) -> anyhow::Result<Array> {
    if device.backend().supports(DType::U8) {
        Ok(array.to(device)?)
    } else {
        log::warn!("{} has no u8 storage, staging as f32", device.label());
        Ok(array.cast(DType::F32)?.to(device)?)
    }
}

fn print_info(device: &Device) {
    println!("device: {}", device.label());
    #[cfg(feature = "gpu")]
    if let Ok(gpu) = device.try_gpu() {
        let info = gpu.info();
        println!("adapter: {} ({:?}, {:?})", info.name, info.device_type, info.backend);
    }
    let backend = device.backend();
    for kind in [KernelKind::Resize, KernelKind::Transform] {
        let kernels: Vec<String> = backend
            .kernels(kind)
            .iter()
            .map(|(dt, interp)| format!("{}/{}", dt, interp))
            .collect();
        println!("{}: {}", kind, kernels.join(" "));
    }
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    start_logger(opts.log_level);

    let request = opts.device.unwrap_or(Config::global().device);
    let device = Device::request_device(request)?;
    log::info!("Using {}", device.label());

    match opts.command {
        Command::Resize {
            io,
            width,
            height,
            method,
        } => {
            let img = load_image(&io.input)?;
            let out = stage(&img.array, &device)?.resize(width, height, method)?;
            save_image(&io.output, &out, img.color)?;
        }
        Command::Transform {
            io,
            matrix,
            width,
            height,
            inverse,
            method,
        } => {
            let img = load_image(&io.input)?;
            let dims = img.array.dims()?;
            let tf = Array::from_host(dim4!(matrix.len()), &matrix, Source::Host, &device)?;
            let out = stage(&img.array, &device)?.transform(
                &tf,
                width.unwrap_or(dims[0]),
                height.unwrap_or(dims[1]),
                method,
                inverse,
            )?;
            save_image(&io.output, &out, img.color)?;
        }
        Command::Crop {
            io,
            x0,
            x1,
            y0,
            y1,
            step,
        } => {
            let img = load_image(&io.input)?;
            let view = img
                .array
                .index(&[Seq::new(x0, x1, step), Seq::new(y0, y1, step)])?;
            save_image(&io.output, &view, img.color)?;
        }
        Command::Info => print_info(&device),
    }
    device.sync()?;
    Ok(())
}
