use crate::queue::is_media_file;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Recursively collect media files under `root`, sorted for stable queue
/// order. A single file is accepted directly when its extension matches.
pub fn discover_media(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return if is_media_file(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("error reading directory entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && is_media_file(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    info!("found {} media file(s) under {}", files.len(), root.display());
    files
}

/// Map an input file into the output tree, mirroring the input hierarchy.
///
/// When input and output roots are the same directory the destination gets
/// the stem suffix instead, so the source is never targeted directly.
pub fn derive_output_path(
    file: &Path,
    input_root: Option<&Path>,
    output_root: Option<&Path>,
    suffix: &str,
) -> PathBuf {
    if let (Some(input_root), Some(output_root)) = (input_root, output_root)
        && let Ok(rel) = file.strip_prefix(input_root)
    {
        let same_root = match (input_root.canonicalize(), output_root.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => input_root == output_root,
        };
        if same_root {
            return append_stem(file, suffix);
        }
        return output_root.join(rel);
    }

    if let Some(output_root) = output_root {
        // Not under the input root; place it at the top of the output tree.
        return output_root.join(file.file_name().unwrap_or_default());
    }

    append_stem(file, suffix)
}

/// Pick a destination that will not clobber an existing file. With
/// overwrite enabled the path is used as-is; otherwise the stem suffix is
/// appended, then `(1)`, `(2)`, … until a free name is found.
pub fn resolve_collision(base: &Path, suffix: &str, overwrite: bool) -> PathBuf {
    if overwrite || !base.exists() {
        return base.to_path_buf();
    }

    let mut stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    if !stem.ends_with(suffix) {
        let candidate = append_stem(base, suffix);
        if !candidate.exists() {
            return candidate;
        }
        stem.push_str(suffix);
    }

    for i in 1..1000 {
        let candidate = with_stem(base, &format!("{stem}({i})"));
        if !candidate.exists() {
            return candidate;
        }
    }

    // Pathological directory; fall back to a timestamped name.
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    with_stem(base, &format!("{stem}_{ts}"))
}

fn with_stem(path: &Path, stem: &str) -> PathBuf {
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    };
    path.with_file_name(name)
}

fn append_stem(path: &Path, extra: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    with_stem(path, &format!("{stem}{extra}"))
}
