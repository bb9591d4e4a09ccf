use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{bail, Context, Result};

use crate::util;

/// Whether this is a ROCm build, from the `FLARE_ROCM_BUILD` toggle.
pub fn rocm_build() -> bool {
    util::env_flag("FLARE_ROCM_BUILD")
}

/// Translate CUDA sources for a ROCm build.
///
/// Runs `hipify-perl` over each source, writing the translated tree to
/// `hipified/` under the source root, and returns the new source list in
/// the same order. A ROCm build cannot proceed without translated sources,
/// so any tool failure is an error.
pub fn hipify(csrc: &Path, sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let out_root = csrc.join("hipified");
    let mut translated = Vec::with_capacity(sources.len());

    for source in sources {
        let rel = source.strip_prefix(csrc).unwrap_or(source);
        let target = out_root.join(rel);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let status = Command::new("hipify-perl")
            .arg("-o")
            .arg(&target)
            .arg(source)
            .status()
            .context("failed to run hipify-perl")?;

        if !status.success() {
            bail!("hipify-perl failed for {}", source.display());
        }

        translated.push(target);
    }

    Ok(translated)
}
