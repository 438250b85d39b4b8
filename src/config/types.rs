use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Quality/size tradeoff presets, mapped onto concrete encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum QualityPreset {
    /// CRF 16, slow preset, 224 kbps audio
    VisuallyLossless,
    /// CRF 18, slow preset, 192 kbps audio
    Balanced,
    /// CRF 22, medium preset, 128 kbps audio
    SmallerFile,
}

/// Encoder settings for one batch run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingProfile {
    /// ffmpeg video encoder: libx264, h264_nvenc, h264_qsv,
    /// h264_videotoolbox
    pub video_encoder: String,
    pub video_preset: String,
    pub video_crf: u8,
    pub audio_codec: String,
    pub audio_bitrate_kbps: u32,
    pub copy_subtitles: bool,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self::from_preset(QualityPreset::Balanced)
    }
}

impl EncodingProfile {
    pub fn from_preset(preset: QualityPreset) -> Self {
        let (crf, video_preset, audio_bitrate_kbps) = match preset {
            QualityPreset::VisuallyLossless => (16, "slow", 224),
            QualityPreset::Balanced => (18, "slow", 192),
            QualityPreset::SmallerFile => (22, "medium", 128),
        };

        Self {
            video_encoder: "libx264".to_string(),
            video_preset: video_preset.to_string(),
            video_crf: crf,
            audio_codec: "aac".to_string(),
            audio_bitrate_kbps,
            copy_subtitles: true,
        }
    }

    /// Whether the configured encoder offloads to dedicated hardware.
    pub fn uses_hardware_encoder(&self) -> bool {
        self.video_encoder != "libx264"
    }
}
