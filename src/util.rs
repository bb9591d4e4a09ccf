use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Truthiness of an integer-valued environment toggle.
///
/// Absent, empty and `0` are false, any other integer is true.
pub fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => value.trim().parse::<i64>().map(|n| n != 0).unwrap_or(false),
        Err(_) => false,
    }
}

/// Required environment variable naming an existing path.
pub fn get_var_path(name: &str) -> Result<PathBuf> {
    let path = std::env::var(name).with_context(|| format!("{name} is not defined"))?;

    let path = PathBuf::from(path);
    if !path.exists() {
        bail!("path {name}={path:?} does not exist");
    }

    Ok(path)
}

/// Every file below `dir`, recursively, in sorted order.
pub fn all_files_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }

    Ok(())
}
