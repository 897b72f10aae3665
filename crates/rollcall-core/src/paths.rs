use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const ROLLCALL_DIR: &str = ".rollcall";
pub const CONFIG_FILE: &str = ".rollcall/config.yaml";
pub const STATE_FILE: &str = ".rollcall/state.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

/// `path` relative to `root`, `/`-separated. Paths outside `root` are
/// returned as given.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.rollcall/config.yaml")
        );
        assert_eq!(state_path(root), PathBuf::from("/tmp/proj/.rollcall/state.json"));
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            relative_slash_path(root, Path::new("/tmp/proj/src/lib.rs")),
            "src/lib.rs"
        );
        assert_eq!(
            relative_slash_path(root, Path::new("/elsewhere/x.rs")),
            "/elsewhere/x.rs"
        );
    }
}
