mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::Cli;
use spectrograph::audio::analysis;
use spectrograph::audio::decode::{self, ChannelLayout};
use spectrograph::config::{self, Config};
use spectrograph::encode::image_file::{self, ExportFormat};
use spectrograph::{column_width_from_zoom, Spectrogram, TickOutcome};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect spectrograph.toml / user config
    let cfg = match config::discover_config_path(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) if cli.config.is_some() => return Err(err),
            Err(err) => {
                log::warn!("{:#}; using defaults", err);
                Config::default()
            }
        },
        None => Config::default(),
    };

    let palettes = cfg.palette_registry()?;

    if cli.list_palettes {
        println!("Available palettes:");
        for name in palettes.names() {
            println!("  {}", name);
        }
        return Ok(());
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    // Merge: CLI values apply only when they differ from their defaults
    let mut display = cfg.display.clone();
    if cli.scale != "linear" { display.scale = cli.scale.parse()?; }
    if cli.palette != "grayscale" { display.palette = cli.palette.clone(); }
    if cli.sensitivity != 100.0 { display.sensitivity = cli.sensitivity; }
    if cli.contrast != 100.0 { display.contrast = cli.contrast; }
    if cli.zoom != 100.0 { display.zoom = cli.zoom; }
    if cli.min_freq != 0.0 { display.min_freq = cli.min_freq; }
    if cli.max_freq.is_some() { display.max_freq = cli.max_freq; }

    let width = if cli.width != 800 { cli.width } else { cfg.canvas.width };
    let height = if cli.height != 300 { cli.height } else { cfg.canvas.height };
    let fps = if cli.fps != 60 { cli.fps } else { cfg.analysis.fps };

    let mut analyser = cfg.analysis.analyser_settings();
    if cli.fft_size != 2048 { analyser.fft_size = cli.fft_size; }

    let format = match &cli.format {
        Some(name) => name.parse()?,
        None => match cli.output.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bmp") => ExportFormat::Bmp,
            Some(ext) if ext.eq_ignore_ascii_case("png") => ExportFormat::Png,
            _ => cfg.export.format,
        },
    };

    let seconds_per_column = 1.0 / fps as f32 / column_width_from_zoom(display.zoom) as f32;
    let mut options = cfg.export.export_options(seconds_per_column);
    if cli.title.is_some() { options.title = cli.title.clone(); }
    if cli.no_legend { options.legend = false; }
    options.validate()?;

    log::info!("spectrograph - scrolling spectrogram renderer");
    log::info!("Input: {}", input.display());
    log::info!("Output: {}", cli.output.display());
    log::info!(
        "Canvas: {}x{} per channel, {} scale, palette {}",
        width, height, display.scale, display.palette
    );

    // 1. Decode audio
    log::info!("Decoding audio...");
    let layout = if cli.mono { ChannelLayout::Mono } else { ChannelLayout::Stereo };
    let audio = decode::decode_audio(input, layout)?;

    // 2. Analyze into byte spectra, one frame per tick
    let mut frames = analysis::analyze(&audio, fps, &analyser)?;
    let total_frames = frames.len();
    log::info!("Total frames: {}, Duration: {:.1}s", total_frames, audio.duration());

    // 3. Render
    let settings = display.render_settings(audio.sample_rate, &palettes)?;
    let labels = Spectrogram::default_labels(audio.channels.len());
    let mut session = Spectrogram::new(labels, width, height, settings)?;

    let pb = ProgressBar::new(total_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} columns ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    loop {
        match session.tick(&mut frames)? {
            TickOutcome::Drawn => pb.inc(1),
            TickOutcome::Skipped => {}
            TickOutcome::Ended | TickOutcome::Cancelled => break,
        }
    }
    session.stop();
    pb.finish_with_message("Rendering complete");

    // 4. Export
    log::info!("Compositing export...");
    let image = session.export(analyser.bins(), &options)?;
    image_file::save(&image, &cli.output, format)?;

    log::info!("Done! Output: {}", cli.output.display());
    Ok(())
}
