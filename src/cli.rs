use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spectrograph", about = "Render an audio file into a labelled scrolling spectrogram image")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Output image file
    #[arg(short, long, default_value = "spectrogram.png")]
    pub output: PathBuf,

    /// Config file (defaults to spectrograph.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Frequency scale: linear, logarithmic or mel
    #[arg(long, default_value = "linear")]
    pub scale: String,

    /// Colour palette name
    #[arg(short, long, default_value = "grayscale")]
    pub palette: String,

    /// Sensitivity in percent (linear gain)
    #[arg(long, default_value_t = 100.0)]
    pub sensitivity: f32,

    /// Contrast in percent (exponent)
    #[arg(long, default_value_t = 100.0)]
    pub contrast: f32,

    /// Zoom in percent; every 100% widens each column by one pixel
    #[arg(long, default_value_t = 100.0)]
    pub zoom: f32,

    /// Lowest displayed frequency in Hz
    #[arg(long, default_value_t = 0.0)]
    pub min_freq: f32,

    /// Highest displayed frequency in Hz (defaults to Nyquist)
    #[arg(long)]
    pub max_freq: Option<f32>,

    /// Spectrogram width in pixels (visible history)
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Spectrogram height in pixels per channel
    #[arg(long, default_value_t = 300)]
    pub height: u32,

    /// FFT size (power of two)
    #[arg(long, default_value_t = 2048)]
    pub fft_size: usize,

    /// Columns rendered per second of audio
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Title drawn above the spectrogram
    #[arg(long)]
    pub title: Option<String>,

    /// Omit the colour legend
    #[arg(long)]
    pub no_legend: bool,

    /// Output format: png or bmp (defaults to the output extension)
    #[arg(long)]
    pub format: Option<String>,

    /// Mix all channels into one spectrogram
    #[arg(long)]
    pub mono: bool,

    /// List available palettes and exit
    #[arg(long)]
    pub list_palettes: bool,
}
