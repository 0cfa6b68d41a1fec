use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded PCM, one sample vector per kept channel.
pub struct AudioData {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }
}

/// How source channels are mapped onto spectrogram channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelLayout {
    /// Average every source channel into one.
    Mono,
    /// Keep the first two channels separately (one if the source is mono).
    Stereo,
}

pub fn decode_audio(path: &Path, layout: ChannelLayout) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let source_channels = track.codec_params.channels.map_or(1, |c| c.count()).max(1);
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let kept = match layout {
        ChannelLayout::Mono => 1,
        ChannelLayout::Stereo => source_channels.min(2),
    };
    if layout == ChannelLayout::Stereo && source_channels == 1 {
        log::warn!("{} is mono; rendering a single channel", path.display());
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut channels: Vec<Vec<f32>> = vec![Vec::new(); kept];

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        let interleaved = spec.channels.count().max(1);
        for frame in sample_buf.samples().chunks(interleaved) {
            match layout {
                ChannelLayout::Mono => {
                    channels[0].push(frame.iter().sum::<f32>() / frame.len() as f32);
                }
                ChannelLayout::Stereo => {
                    for (ch, samples) in channels.iter_mut().enumerate() {
                        samples.push(frame.get(ch).copied().unwrap_or(0.0));
                    }
                }
            }
        }
    }

    let audio = AudioData {
        channels,
        sample_rate,
    };

    log::info!(
        "Decoded audio: {} channel(s), {} samples, {}Hz, {:.1}s",
        audio.channels.len(),
        audio.frames(),
        sample_rate,
        audio.duration()
    );

    Ok(audio)
}
