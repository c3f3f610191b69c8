//! Where a generated `latest.json` goes.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

/// Replace `path` with `contents` via a sibling temp file, so readers never
/// see a half-written document.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path = dir.join(tmp_name);

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    debug!("[output] wrote {} bytes to {:?}", contents.len(), path);
    Ok(())
}

/// Write to `dest`, or to stdout when there is none.
pub fn emit(dest: Option<&Path>, document: &str) -> io::Result<()> {
    match dest {
        Some(path) => write_atomic(path, document),
        None => {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", document)?;
            out.flush()
        }
    }
}
