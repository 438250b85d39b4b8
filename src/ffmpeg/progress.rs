use regex::Regex;
use std::time::{Duration, Instant};

/// One structured progress sample for a running job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Output seconds processed so far, clamped to never decrease.
    pub processed_secs: f64,
    /// Completion in [0,1]. None while the total duration is unknown;
    /// callers must show an indeterminate state, not 0 or 1.
    pub fraction: Option<f32>,
    pub eta: Option<Duration>,
    /// Encoding rate in output seconds per wall second, when ffmpeg
    /// reported one.
    pub speed: Option<f32>,
}

/// Incremental parser for ffmpeg's stderr status lines.
///
/// Lines look like
/// `frame= 2406 fps=120 q=28.0 size=10496KiB time=00:01:40.24 bitrate=857.6kbits/s speed=5.01x`
/// interleaved with arbitrary diagnostics. Anything without a parseable
/// `time=` token is ignored.
pub struct ProgressParser {
    total_secs: Option<f64>,
    processed_secs: f64,
    started: Instant,
    time_re: Regex,
    speed_re: Regex,
}

impl ProgressParser {
    /// `total_secs` is the expected duration of the *output* stream. For a
    /// 2×→1× retime that is twice the probed input duration.
    pub fn new(total_secs: Option<f64>) -> Self {
        Self {
            total_secs,
            processed_secs: 0.0,
            started: Instant::now(),
            time_re: Regex::new(r"time=\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid regex"),
            speed_re: Regex::new(r"speed=\s*(\d+(?:\.\d+)?)x").expect("valid regex"),
        }
    }

    /// Feed one stderr line. Returns a sample when the line carried a time
    /// marker, None otherwise.
    pub fn push_line(&mut self, line: &str) -> Option<ProgressUpdate> {
        // Take the last occurrence; some builds emit carriage-return packed
        // lines with several status blocks.
        let caps = self.time_re.captures_iter(line).last()?;

        let hours: f64 = caps[1].parse().ok()?;
        let minutes: f64 = caps[2].parse().ok()?;
        let seconds: f64 = caps[3].parse().ok()?;
        let t = hours * 3600.0 + minutes * 60.0 + seconds;

        // Monotonic clamp: repeated or out-of-order markers never move
        // progress backwards.
        if t > self.processed_secs {
            self.processed_secs = t;
        }

        let speed = self
            .speed_re
            .captures(line)
            .and_then(|c| c[1].parse::<f32>().ok())
            .filter(|s| *s > 0.0);

        let fraction = self
            .total_secs
            .map(|total| (self.processed_secs / total).clamp(0.0, 1.0) as f32);

        Some(ProgressUpdate {
            processed_secs: self.processed_secs,
            fraction,
            eta: self.estimate_remaining(speed),
            speed,
        })
    }

    fn estimate_remaining(&self, speed: Option<f32>) -> Option<Duration> {
        let total = self.total_secs?;
        let remaining = (total - self.processed_secs).max(0.0);

        // Prefer the reported encoding rate; fall back to the observed
        // wall-clock rate when the line had no speed token.
        let rate = speed.map(f64::from).unwrap_or_else(|| {
            let elapsed = self.started.elapsed().as_secs_f64();
            if elapsed > 0.0 { self.processed_secs / elapsed } else { 0.0 }
        });

        if rate < 0.01 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining / rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str =
        "frame= 2406 fps=120 q=28.0 size=10496KiB time=00:01:40.24 bitrate=857.6kbits/s speed=5.01x";

    #[test]
    fn parses_time_and_speed() {
        let mut parser = ProgressParser::new(Some(200.48));
        let update = parser.push_line(STATUS).unwrap();

        assert!((update.processed_secs - 100.24).abs() < 1e-9);
        assert!((update.fraction.unwrap() - 0.5).abs() < 1e-3);
        assert!((update.speed.unwrap() - 5.01).abs() < 1e-3);
    }

    #[test]
    fn eta_uses_reported_speed() {
        let mut parser = ProgressParser::new(Some(200.0));
        let update = parser
            .push_line("time=00:01:40.00 bitrate=857.6kbits/s speed=2.00x")
            .unwrap();

        // 100s remaining at 2x.
        assert_eq!(update.eta.unwrap().as_secs(), 50);
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        let mut parser = ProgressParser::new(Some(100.0));
        assert!(parser.push_line("Stream mapping:").is_none());
        assert!(parser.push_line("  Stream #0:0 -> #0:0 (h264 -> h264)").is_none());
        assert!(parser.push_line("size=     256KiB time=N/A bitrate=N/A").is_none());
        assert!(parser.push_line("size= 1KiB time=-577014:32:22.77").is_none());
    }

    #[test]
    fn progress_never_decreases() {
        let mut parser = ProgressParser::new(Some(100.0));
        let first = parser.push_line("time=00:00:40.00 speed=1.0x").unwrap();
        let second = parser.push_line("time=00:00:20.00 speed=1.0x").unwrap();
        let third = parser.push_line("time=00:00:40.00 speed=1.0x").unwrap();

        assert!((first.processed_secs - 40.0).abs() < 1e-9);
        assert!((second.processed_secs - 40.0).abs() < 1e-9);
        assert_eq!(second.fraction, first.fraction);
        assert_eq!(third.fraction, first.fraction);
    }

    #[test]
    fn unknown_total_yields_indeterminate_fraction() {
        let mut parser = ProgressParser::new(None);
        let update = parser.push_line("time=00:00:30.00 speed=1.0x").unwrap();

        assert_eq!(update.fraction, None);
        assert_eq!(update.eta, None);
        assert!((update.processed_secs - 30.0).abs() < 1e-9);
    }

    #[test]
    fn fraction_clamps_at_one() {
        let mut parser = ProgressParser::new(Some(10.0));
        let update = parser.push_line("time=00:00:30.00 speed=1.0x").unwrap();

        assert_eq!(update.fraction, Some(1.0));
        assert_eq!(update.eta.unwrap().as_secs(), 0);
    }

    #[test]
    fn takes_last_marker_on_packed_lines() {
        let mut parser = ProgressParser::new(Some(100.0));
        let update = parser
            .push_line("time=00:00:10.00 speed=1.0x\rtime=00:00:12.00 speed=1.0x")
            .unwrap();

        assert!((update.processed_secs - 12.0).abs() < 1e-9);
    }
}
