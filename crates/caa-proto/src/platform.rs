use std::path::PathBuf;

const APP_DIR: &str = "caa-radio";

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/caa-radio/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_DIR)
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

/// How desktop notifications are delivered on this platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    /// freedesktop `notify-send`
    NotifySend,
    /// macOS `osascript -e 'display notification …'`
    Osascript,
}

#[cfg(target_os = "macos")]
fn notifier_candidates() -> &'static [(&'static str, NotifierKind)] {
    &[("osascript", NotifierKind::Osascript)]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn notifier_candidates() -> &'static [(&'static str, NotifierKind)] {
    &[("notify-send", NotifierKind::NotifySend)]
}

#[cfg(windows)]
fn notifier_candidates() -> &'static [(&'static str, NotifierKind)] {
    &[]
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        for name in names {
            let p = dir.join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }
    None
}

/// Find the desktop notifier binary.
/// `CAA_NOTIFIER_PATH` overrides the PATH search (treated as `notify-send` compatible).
pub fn find_notifier_binary() -> Option<(PathBuf, NotifierKind)> {
    if let Ok(p) = std::env::var("CAA_NOTIFIER_PATH") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some((path, NotifierKind::NotifySend));
        }
    }

    notifier_candidates()
        .iter()
        .find_map(|(name, kind)| find_on_path(&[name]).map(|p| (p, *kind)))
}
