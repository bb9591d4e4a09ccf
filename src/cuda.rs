use std::{fmt, path::PathBuf, process::Command};

use anyhow::{bail, Context, Result};

/// Oldest CUDA toolkit the extension builds against.
pub const MIN_CUDA_VERSION: CudaVersion = CudaVersion { major: 12, minor: 0 };

const DEFAULT_ARCHS: &str = "70;80;89;90";

/// Semicolon-separated target architecture list, `FLARE_CUDA_ARCHS` or the default.
pub fn cuda_archs() -> String {
    std::env::var("FLARE_CUDA_ARCHS").unwrap_or_else(|_| DEFAULT_ARCHS.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CudaVersion {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for CudaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Detected CUDA toolkit version from `nvcc --version`.
///
/// `Ok(None)` when nvcc cannot be found or run, an error when its output
/// cannot be parsed.
pub fn cuda_version() -> Result<Option<CudaVersion>> {
    let output = match Command::new(nvcc_path()).arg("--version").output() {
        Ok(output) => output,
        Err(_) => return Ok(None),
    };

    if !output.status.success() {
        return Ok(None);
    }

    parse_nvcc_version(&String::from_utf8_lossy(&output.stdout)).map(Some)
}

fn nvcc_path() -> PathBuf {
    for name in ["CUDA_HOME", "CUDA_PATH"] {
        if let Ok(root) = std::env::var(name) {
            return PathBuf::from(root).join("bin").join("nvcc");
        }
    }

    PathBuf::from("nvcc")
}

// "Cuda compilation tools, release 12.4, V12.4.131"
fn parse_nvcc_version(text: &str) -> Result<CudaVersion> {
    for line in text.lines() {
        let Some(idx) = line.find("release ") else {
            continue;
        };

        let token = line[idx + "release ".len()..]
            .split([',', ' '])
            .next()
            .context("truncated nvcc version line")?;

        let (major, minor) = token.split_once('.').context("nvcc version is not MAJOR.MINOR")?;

        return Ok(CudaVersion {
            major: major.trim().parse().with_context(|| format!("bad nvcc major version {major:?}"))?,
            minor: minor.trim().parse().with_context(|| format!("bad nvcc minor version {minor:?}"))?,
        });
    }

    bail!("no release line in nvcc output");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const NVCC_OUTPUT: &str = "nvcc: NVIDIA (R) Cuda compiler driver\n\
        Copyright (c) 2005-2024 NVIDIA Corporation\n\
        Built on Thu_Mar_28_02:18:24_PDT_2024\n\
        Cuda compilation tools, release 12.4, V12.4.131\n\
        Build cuda_12.4.r12.4/compiler.34097967_0\n";

    #[test]
    fn parses_nvcc_release_line() {
        let version = parse_nvcc_version(NVCC_OUTPUT).unwrap();
        assert_eq!(version, CudaVersion { major: 12, minor: 4 });
        assert_eq!(version.to_string(), "12.4");
    }

    #[test]
    fn rejects_garbled_nvcc_output() {
        assert!(parse_nvcc_version("nvcc: something went wrong").is_err());
        assert!(parse_nvcc_version("Cuda compilation tools, release twelve").is_err());
    }

    #[test]
    fn version_ordering() {
        assert!(CudaVersion { major: 11, minor: 8 } < MIN_CUDA_VERSION);
        assert!(CudaVersion { major: 12, minor: 0 } >= MIN_CUDA_VERSION);
        assert!(CudaVersion { major: 12, minor: 6 } > MIN_CUDA_VERSION);
    }

    #[test]
    #[serial]
    fn arch_list_env_override() {
        temp_env::with_var("FLARE_CUDA_ARCHS", Some("80;90"), || {
            assert_eq!(cuda_archs(), "80;90");
        });

        temp_env::with_var("FLARE_CUDA_ARCHS", None::<&str>, || {
            assert_eq!(cuda_archs(), DEFAULT_ARCHS);
        });
    }

    #[test]
    #[serial]
    fn missing_nvcc_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();

        temp_env::with_var("CUDA_HOME", Some(dir.path()), || {
            assert!(cuda_version().unwrap().is_none());
        });
    }
}
