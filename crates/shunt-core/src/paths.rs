use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SHUNT_DIR: &str = ".shunt";
pub const CONFIG_FILE: &str = ".shunt/config.yaml";
pub const PID_FILE: &str = ".shunt/shunt.pid";
pub const LOG_FILE: &str = ".shunt/shunt.log";
pub const OFFSET_FILE: &str = ".shunt/offset";
pub const ARTIFACTS_DIR: &str = ".shunt/artifacts";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn shunt_dir(root: &Path) -> PathBuf {
    root.join(SHUNT_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn pid_path(root: &Path) -> PathBuf {
    root.join(PID_FILE)
}

pub fn log_path(root: &Path) -> PathBuf {
    root.join(LOG_FILE)
}

pub fn offset_path(root: &Path) -> PathBuf {
    root.join(OFFSET_FILE)
}

pub fn artifacts_dir(root: &Path) -> PathBuf {
    root.join(ARTIFACTS_DIR)
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
            PathBuf::from("/tmp/proj/.shunt/config.yaml")
        );
        assert_eq!(pid_path(root), PathBuf::from("/tmp/proj/.shunt/shunt.pid"));
        assert_eq!(offset_path(root), PathBuf::from("/tmp/proj/.shunt/offset"));
    }
}
