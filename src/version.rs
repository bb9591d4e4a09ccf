use std::{
    fs,
    io::Write,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::util;

/// Sentinel for probes that could not produce a value.
pub const UNKNOWN: &str = "UNKNOWN";

/// Revision of the flare software stack, embedded in local version suffixes.
const STACK_VERSION: &str = "1.6";

/// Full version string for the extension package.
///
/// Reads the base version from the first line of `version_file`. Unless
/// suppressed with `FLARE_NO_LOCAL_VERSION` or `FLARE_RELEASE_BUILD`, the
/// git short revision of `repo_root` is appended together with the ABI and
/// toolkit tags; if git fails the local suffix is skipped entirely. When
/// suppressed, a fixed `generic` suffix plus the toolkit tag is appended
/// instead.
pub fn flare_version(version_file: &Path, repo_root: &Path) -> Result<String> {
    let text = fs::read_to_string(version_file)
        .with_context(|| format!("reading {}", version_file.display()))?;
    let mut version = text.lines().next().unwrap_or("").trim().to_string();

    let suppressed =
        util::env_flag("FLARE_NO_LOCAL_VERSION") || util::env_flag("FLARE_RELEASE_BUILD");

    if suppressed {
        version.push_str(&format!("+flr{STACK_VERSION}.generic.{}", dtk_version()));
    } else if let Some(commit) = git_short_rev(repo_root) {
        version.push_str(&format!(
            "+flr{STACK_VERSION}.git{commit}.abi{}.{}",
            abi_tag(),
            dtk_version()
        ));
    }

    Ok(version)
}

fn git_short_rev(repo_root: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(repo_root)
        .output()
        .ok()?;

    if !output.status.success() {
        warn!("git rev-parse failed, skipping local version");
        return None;
    }

    let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!rev.is_empty()).then_some(rev)
}

/// The `_GLIBCXX_USE_CXX11_ABI` mode the system compiler defaults to,
/// or [`UNKNOWN`] when the probe fails.
pub fn abi_tag() -> String {
    match probe_abi() {
        Ok(tag) => tag,
        Err(err) => {
            warn!("could not detect C++ ABI: {err:#}");
            UNKNOWN.to_string()
        }
    }
}

fn probe_abi() -> Result<String> {
    let mut child = Command::new("gcc")
        .args(["-x", "c++", "-E", "-dM", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .context("spawning gcc")?;

    child
        .stdin
        .take()
        .context("gcc stdin unavailable")?
        .write_all(b"#include <string>\n")
        .context("writing to gcc")?;

    let output = child.wait_with_output().context("waiting for gcc")?;
    if !output.status.success() {
        bail!("gcc exited with {}", output.status);
    }

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if !line.contains("_GLIBCXX_USE_CXX11_ABI") {
            continue;
        }

        match line.trim_end().chars().last() {
            Some(c) if c.is_ascii_digit() => return Ok(c.to_string()),
            _ => bail!("malformed ABI define: {line}"),
        }
    }

    bail!("_GLIBCXX_USE_CXX11_ABI not defined");
}

/// ROCm toolkit tag such as `dtk2404`, read from `$ROCM_PATH/.info/version-dev`,
/// or [`UNKNOWN`] when the probe fails.
pub fn dtk_version() -> String {
    match probe_dtk() {
        Ok(tag) => tag,
        Err(err) => {
            warn!("could not detect ROCm toolkit version: {err:#}");
            UNKNOWN.to_string()
        }
    }
}

fn probe_dtk() -> Result<String> {
    let rocm_path = std::env::var("ROCM_PATH").context("ROCM_PATH is not set")?;
    let info = Path::new(&rocm_path).join(".info").join("version-dev");

    let text = fs::read_to_string(&info).with_context(|| format!("reading {}", info.display()))?;
    let first = text.lines().next().context("empty version-dev file")?;

    Ok(format!("dtk{}", first.trim().replace('.', "")))
}
