use crate::error::AppError;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

/// Stream layout and timing info for one input file.
#[derive(Debug, Clone, Default)]
pub struct MediaInfo {
    /// Container duration in seconds, when the container reports one.
    pub duration_secs: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub channel_layout: Option<String>,
}

/// Probe a media file with ffprobe.
pub fn probe_media(ffprobe: &Path, input: &Path) -> Result<MediaInfo, AppError> {
    let output = Command::new(ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(input)
        .output()
        .map_err(|e| AppError::probe(input, format!("failed to execute ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::probe(input, format!("ffprobe failed: {}", stderr.trim())));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
        .map_err(|e| AppError::probe(input, format!("failed to parse ffprobe output: {e}")))
}

fn parse_probe_output(json: &str) -> Result<MediaInfo, serde_json::Error> {
    let data: FfprobeOutput = serde_json::from_str(json)?;

    let duration_secs = data
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0);

    let mut info = MediaInfo {
        duration_secs,
        ..MediaInfo::default()
    };

    for stream in &data.streams {
        match stream.codec_type.as_deref() {
            Some("video") => info.has_video = true,
            Some("audio") => {
                info.has_audio = true;
                info.sample_rate = stream.sample_rate.as_deref().and_then(|s| s.parse().ok());
                info.channels = stream.channels;
                info.channel_layout = stream.channel_layout.clone();
            }
            _ => {}
        }
    }

    Ok(info)
}

// JSON deserialization structures

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<RawStream>,
    format: Option<FormatInfo>,
}

#[derive(Debug, Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    codec_type: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
    channel_layout: Option<String>,
}
