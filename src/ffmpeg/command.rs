use crate::config::EncodingProfile;
use crate::error::AppError;
use crate::ffmpeg::capability::FilterCapability;
use crate::ffmpeg::probe::MediaInfo;
use std::path::Path;

/// Video PTS multiplier: doubling presentation timestamps turns a 2× speed
/// recording back into 1×.
const VIDEO_RETIME_FILTER: &str = "[0:v]setpts=2*PTS[v]";

/// Containers that benefit from the progressive `faststart` layout.
const FASTSTART_CONTAINERS: &[&str] = &["mp4", "mov", "m4v", "m4a"];

/// Which audio time-stretch path to use. Both halve the tempo; rubberband
/// preserves formants and sounds natural on voice, atempo is the fallback
/// every ffmpeg build carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFilter {
    Rubberband,
    Atempo,
}

impl AudioFilter {
    /// Select the audio path for a session. `Unknown` capability falls back
    /// to atempo, same as `Absent`.
    pub fn from_capability(cap: FilterCapability) -> Self {
        if cap.usable() {
            AudioFilter::Rubberband
        } else {
            AudioFilter::Atempo
        }
    }

    fn filter_graph(&self) -> &'static str {
        match self {
            AudioFilter::Rubberband => "[0:a]rubberband=tempo=0.5:formant=preserved[a]",
            AudioFilter::Atempo => "[0:a]atempo=0.5[a]",
        }
    }
}

/// Everything the builder needs for one invocation.
#[derive(Debug, Clone)]
pub struct RetimeParams<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub media: &'a MediaInfo,
    pub profile: &'a EncodingProfile,
    pub audio_filter: AudioFilter,
    /// Encode only a centered window of this many seconds for a quick A/B
    /// check instead of the full file.
    pub preview_seconds: Option<u32>,
}

/// Build the ffmpeg argument list (without the program name) that retimes
/// `input` from 2× to 1× into `output`.
///
/// Pure: the same params always produce the identical sequence.
pub fn build_retime_args(params: &RetimeParams) -> Result<Vec<String>, AppError> {
    let media = params.media;
    let profile = params.profile;

    if !media.has_video && !media.has_audio {
        return Err(AppError::NoUsableStreams(params.input.to_path_buf()));
    }

    let mut filters: Vec<&str> = Vec::new();
    let mut maps: Vec<String> = Vec::new();

    if media.has_video {
        filters.push(VIDEO_RETIME_FILTER);
        maps.extend(["-map".into(), "[v]".into()]);
    }

    if media.has_audio {
        filters.push(params.audio_filter.filter_graph());
        maps.extend(["-map".into(), "[a]".into()]);
    }

    // Subtitles ride along untouched; the `?` keeps their absence from
    // failing the run.
    let copy_subtitles = profile.copy_subtitles && media.has_video;
    if copy_subtitles {
        maps.extend(["-map".into(), "0:s?".into()]);
    }

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-nostdin".into(),
        "-i".into(),
        params.input.to_string_lossy().into_owned(),
    ];

    if let Some(window) = params.preview_seconds.filter(|s| *s > 0)
        && let Some(duration) = media.duration_secs
    {
        // Seek after the input for accurate positioning.
        let start = (duration / 2.0 - f64::from(window) / 2.0).max(0.0);
        args.extend(["-ss".into(), format!("{start:.3}"), "-t".into(), window.to_string()]);
    }

    args.extend(["-filter_complex".into(), filters.join(";")]);
    args.extend(maps);

    if media.has_video {
        args.extend([
            "-c:v".into(),
            profile.video_encoder.clone(),
            "-preset".into(),
            profile.video_preset.clone(),
            "-crf".into(),
            profile.video_crf.to_string(),
        ]);
    }
    if media.has_audio {
        args.extend([
            "-c:a".into(),
            profile.audio_codec.clone(),
            "-b:a".into(),
            format!("{}k", profile.audio_bitrate_kbps),
        ]);
    }
    if copy_subtitles {
        args.extend(["-c:s".into(), "copy".into()]);
    }

    args.extend(["-map_metadata".into(), "0".into(), "-map_chapters".into(), "0".into()]);

    if wants_faststart(params.output) {
        args.extend(["-movflags".into(), "+faststart".into()]);
    }

    args.push(params.output.to_string_lossy().into_owned());
    Ok(args)
}

fn wants_faststart(output: &Path) -> bool {
    output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| FASTSTART_CONTAINERS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn media(video: bool, audio: bool) -> MediaInfo {
        MediaInfo {
            duration_secs: Some(120.0),
            has_video: video,
            has_audio: audio,
            ..MediaInfo::default()
        }
    }

    fn params<'a>(
        media: &'a MediaInfo,
        profile: &'a EncodingProfile,
        input: &'a Path,
        output: &'a Path,
        audio_filter: AudioFilter,
    ) -> RetimeParams<'a> {
        RetimeParams {
            input,
            output,
            media,
            profile,
            audio_filter,
            preview_seconds: None,
        }
    }

    #[test]
    fn full_sequence_for_av_input() {
        let m = media(true, true);
        let profile = EncodingProfile::default();
        let input = PathBuf::from("/in/talk.mp4");
        let output = PathBuf::from("/out/talk.mp4");
        let args =
            build_retime_args(&params(&m, &profile, &input, &output, AudioFilter::Rubberband))
                .unwrap();

        let expected: Vec<String> = [
            "-y",
            "-hide_banner",
            "-nostdin",
            "-i",
            "/in/talk.mp4",
            "-filter_complex",
            "[0:v]setpts=2*PTS[v];[0:a]rubberband=tempo=0.5:formant=preserved[a]",
            "-map",
            "[v]",
            "-map",
            "[a]",
            "-map",
            "0:s?",
            "-c:v",
            "libx264",
            "-preset",
            "slow",
            "-crf",
            "18",
            "-c:a",
            "aac",
            "-b:a",
            "192k",
            "-c:s",
            "copy",
            "-map_metadata",
            "0",
            "-map_chapters",
            "0",
            "-movflags",
            "+faststart",
            "/out/talk.mp4",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(args, expected);
    }

    #[test]
    fn builder_is_deterministic() {
        let m = media(true, true);
        let profile = EncodingProfile::default();
        let input = PathBuf::from("a.mkv");
        let output = PathBuf::from("b.mkv");
        let p = params(&m, &profile, &input, &output, AudioFilter::Atempo);

        assert_eq!(build_retime_args(&p).unwrap(), build_retime_args(&p).unwrap());
    }

    #[test]
    fn fallback_never_mentions_rubberband() {
        let m = media(true, true);
        let profile = EncodingProfile::default();
        let input = PathBuf::from("a.mp4");
        let output = PathBuf::from("b.mp4");
        let args =
            build_retime_args(&params(&m, &profile, &input, &output, AudioFilter::Atempo)).unwrap();

        assert!(args.iter().all(|a| !a.contains("rubberband")));
        assert!(args.iter().any(|a| a.contains("atempo=0.5")));
    }

    #[test]
    fn preferred_path_always_uses_rubberband() {
        let m = media(false, true);
        let profile = EncodingProfile::default();
        let input = PathBuf::from("a.wav");
        let output = PathBuf::from("b.wav");
        let args =
            build_retime_args(&params(&m, &profile, &input, &output, AudioFilter::Rubberband))
                .unwrap();

        assert!(args.iter().any(|a| a.contains("rubberband=tempo=0.5:formant=preserved")));
    }

    #[test]
    fn audio_only_skips_video_and_subtitles() {
        let m = media(false, true);
        let profile = EncodingProfile::default();
        let input = PathBuf::from("memo.m4a");
        let output = PathBuf::from("memo_1x.m4a");
        let args =
            build_retime_args(&params(&m, &profile, &input, &output, AudioFilter::Atempo)).unwrap();

        assert!(!args.contains(&"[v]".to_string()));
        assert!(!args.contains(&"0:s?".to_string()));
        assert!(!args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"-c:a".to_string()));
    }

    #[test]
    fn video_only_skips_audio_chain() {
        let m = media(true, false);
        let profile = EncodingProfile::default();
        let input = PathBuf::from("clip.mp4");
        let output = PathBuf::from("clip_1x.mp4");
        let args =
            build_retime_args(&params(&m, &profile, &input, &output, AudioFilter::Rubberband))
                .unwrap();

        assert!(!args.contains(&"[a]".to_string()));
        assert!(!args.contains(&"-b:a".to_string()));
        assert!(args.iter().any(|a| a == "[0:v]setpts=2*PTS[v]"));
    }

    #[test]
    fn no_streams_is_rejected() {
        let m = media(false, false);
        let profile = EncodingProfile::default();
        let input = PathBuf::from("broken.mp4");
        let output = PathBuf::from("out.mp4");

        assert!(matches!(
            build_retime_args(&params(&m, &profile, &input, &output, AudioFilter::Atempo)),
            Err(AppError::NoUsableStreams(_))
        ));
    }

    #[test]
    fn faststart_only_for_mp4_family() {
        let m = media(true, true);
        let profile = EncodingProfile::default();
        let input = PathBuf::from("a.mkv");

        let mkv = PathBuf::from("out.mkv");
        let args =
            build_retime_args(&params(&m, &profile, &input, &mkv, AudioFilter::Atempo)).unwrap();
        assert!(!args.contains(&"-movflags".to_string()));

        let mp4 = PathBuf::from("out.MP4");
        let args =
            build_retime_args(&params(&m, &profile, &input, &mp4, AudioFilter::Atempo)).unwrap();
        assert!(args.contains(&"-movflags".to_string()));
    }

    #[test]
    fn preview_selects_centered_window() {
        let m = media(true, true);
        let profile = EncodingProfile::default();
        let input = PathBuf::from("a.mp4");
        let output = PathBuf::from("b.mp4");
        let mut p = params(&m, &profile, &input, &output, AudioFilter::Atempo);
        p.preview_seconds = Some(20);

        let args = build_retime_args(&p).unwrap();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        // 120s file, 20s window -> starts at 50s, placed after -i for
        // accurate seek.
        assert_eq!(args[ss + 1], "50.000");
        assert_eq!(args[ss + 2], "-t");
        assert_eq!(args[ss + 3], "20");
        assert!(ss > args.iter().position(|a| a == "-i").unwrap());
    }

    #[test]
    fn preview_skipped_without_known_duration() {
        let mut m = media(true, true);
        m.duration_secs = None;
        let profile = EncodingProfile::default();
        let input = PathBuf::from("a.mp4");
        let output = PathBuf::from("b.mp4");
        let mut p = params(&m, &profile, &input, &output, AudioFilter::Atempo);
        p.preview_seconds = Some(20);

        let args = build_retime_args(&p).unwrap();
        assert!(!args.contains(&"-ss".to_string()));
    }
}
