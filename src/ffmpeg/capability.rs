use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

/// The formant-preserving time-stretch filter we prefer for the audio path.
pub const RUBBERBAND_FILTER: &str = "rubberband";

/// Availability of the rubberband filter in the resolved ffmpeg build.
///
/// Probed once per session, then read-only. `Unknown` means the probe
/// itself could not run; command construction treats it like `Absent`, but
/// callers should tell the user once that the check was inconclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterCapability {
    Available,
    Absent,
    Unknown,
}

impl FilterCapability {
    /// Whether the preferred filter can actually be used.
    pub fn usable(&self) -> bool {
        matches!(self, FilterCapability::Available)
    }
}

/// Ask ffmpeg for its filter list and look for rubberband.
pub fn detect_rubberband(ffmpeg: &Path) -> FilterCapability {
    let output = match Command::new(ffmpeg).args(["-hide_banner", "-filters"]).output() {
        Ok(o) => o,
        Err(e) => {
            warn!("filter capability probe failed to run: {}", e);
            return FilterCapability::Unknown;
        }
    };

    // ffmpeg lists filters on stdout; older builds print to stderr.
    let listing = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let cap = classify_filter_listing(&listing);
    info!("rubberband filter: {:?}", cap);
    cap
}

fn classify_filter_listing(listing: &str) -> FilterCapability {
    if listing.contains(RUBBERBAND_FILTER) {
        FilterCapability::Available
    } else {
        FilterCapability::Absent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_rubberband_in_listing() {
        let listing = " ... atempo    A->A  Adjust audio tempo.\n \
                       ... rubberband A->A  Apply time-stretching and pitch-shifting.\n";
        assert_eq!(classify_filter_listing(listing), FilterCapability::Available);
    }

    #[test]
    fn reports_absent_when_not_listed() {
        let listing = " ... atempo    A->A  Adjust audio tempo.\n";
        assert_eq!(classify_filter_listing(listing), FilterCapability::Absent);
        assert!(!FilterCapability::Absent.usable());
    }

    #[test]
    fn unknown_is_not_usable() {
        assert!(!FilterCapability::Unknown.usable());
        assert!(FilterCapability::Available.usable());
    }
}
