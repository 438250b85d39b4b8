pub mod capability;
pub mod command;
pub mod locate;
pub mod probe;
pub mod progress;

pub use capability::{FilterCapability, detect_rubberband};
pub use command::{AudioFilter, RetimeParams, build_retime_args};
pub use locate::{which_ffmpeg, which_ffprobe};
pub use probe::{MediaInfo, probe_media};
pub use progress::{ProgressParser, ProgressUpdate};
