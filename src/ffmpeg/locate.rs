use crate::error::AppError;
use std::env;
use std::path::{Path, PathBuf};

/// Env override for the processor binary. May point at the executable
/// itself or at a directory containing it.
pub const FFMPEG_ENV: &str = "FFMPEG_PATH";
/// Env override for the prober binary.
pub const FFPROBE_ENV: &str = "FFPROBE_PATH";

/// Directories checked relative to our own executable when neither the env
/// override nor PATH resolves a binary (portable/bundled installs).
const RELATIVE_CANDIDATES: &[&str] = &["ffmpeg", "ffmpeg/bin", "bin", "tools/ffmpeg", "vendor/ffmpeg/bin"];

fn exe_name(base: &str) -> String {
    if cfg!(windows) {
        format!("{base}.exe")
    } else {
        base.to_string()
    }
}

/// Normalize an override value: a directory is resolved to `dir/<name>`,
/// a file path is accepted as-is. Returns None when nothing exists there.
fn normalize_exe(value: &Path, name: &str) -> Option<PathBuf> {
    if value.is_dir() {
        let cand = value.join(name);
        return cand.exists().then_some(cand);
    }
    value.exists().then(|| value.to_path_buf())
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|cand| cand.is_file())
}

fn search_relative(name: &str) -> Option<PathBuf> {
    let here = env::current_exe().ok()?;
    let dir = here.parent()?;
    RELATIVE_CANDIDATES
        .iter()
        .filter_map(|rel| normalize_exe(&dir.join(rel), name))
        .next()
}

fn locate(
    tool: &'static str,
    env_var: &'static str,
    explicit: Option<&Path>,
) -> Result<PathBuf, AppError> {
    let name = exe_name(tool);

    if let Some(value) = explicit
        && let Some(found) = normalize_exe(value, &name)
    {
        return Ok(found);
    }

    if let Some(value) = env::var_os(env_var)
        && let Some(found) = normalize_exe(Path::new(&value), &name)
    {
        return Ok(found);
    }

    if let Some(found) = search_path(&name) {
        return Ok(found);
    }

    if let Some(found) = search_relative(&name) {
        return Ok(found);
    }

    Err(AppError::ToolNotFound { tool, env_var })
}

/// Resolve the ffmpeg executable: explicit configured path, then env
/// override, then PATH, then the conventional directories next to our own
/// binary.
pub fn which_ffmpeg(explicit: Option<&Path>) -> Result<PathBuf, AppError> {
    locate("ffmpeg", FFMPEG_ENV, explicit)
}

/// Resolve the ffprobe executable with the same fallback chain.
pub fn which_ffprobe(explicit: Option<&Path>) -> Result<PathBuf, AppError> {
    locate("ffprobe", FFPROBE_ENV, explicit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn normalize_accepts_direct_file() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("ffmpeg");
        fs::write(&exe, b"").unwrap();

        assert_eq!(normalize_exe(&exe, "ffmpeg"), Some(exe));
    }

    #[test]
    fn normalize_resolves_inside_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("ffprobe");
        fs::write(&exe, b"").unwrap();

        assert_eq!(normalize_exe(dir.path(), "ffprobe"), Some(exe));
    }

    #[test]
    fn explicit_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join(exe_name("ffmpeg"));
        fs::write(&exe, b"").unwrap();

        assert_eq!(locate("ffmpeg", FFMPEG_ENV, Some(dir.path())).unwrap(), exe);
    }

    #[test]
    fn normalize_rejects_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(normalize_exe(&dir.path().join("nope"), "ffmpeg"), None);
        assert_eq!(normalize_exe(dir.path(), "ffmpeg"), None);
    }
}
