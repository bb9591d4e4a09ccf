use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::{cuda, descriptor::Extension, hip, util};

const CXX_FLAGS: [&str; 2] = ["-O3", "-fvisibility=hidden"];

const CUDA_FLAGS: [&str; 10] = [
    "-O3",
    "-U__CUDA_NO_HALF_OPERATORS__",
    "-U__CUDA_NO_HALF_CONVERSIONS__",
    "-U__CUDA_NO_BFLOAT16_OPERATORS__",
    "-U__CUDA_NO_BFLOAT16_CONVERSIONS__",
    "-U__CUDA_NO_BFLOAT162_OPERATORS__",
    "-U__CUDA_NO_BFLOAT162_CONVERSIONS__",
    "--expt-relaxed-constexpr",
    "--expt-extended-lambda",
    "--use_fast_math",
];

const HIP_FLAGS: [&str; 7] = [
    "-O3",
    "-U__HIP_NO_HALF_OPERATORS__",
    "-U__HIP_NO_HALF_CONVERSIONS__",
    "-U__HIP_NO_BFLOAT16_OPERATORS__",
    "-U__HIP_NO_BFLOAT16_CONVERSIONS__",
    "-U__HIP_NO_BFLOAT162_OPERATORS__",
    "-U__HIP_NO_BFLOAT162_CONVERSIONS__",
];

/// Assemble the build descriptor for the PyTorch extension module.
///
/// `csrc_source_files` must hold `common.cpp` and an `extensions/`
/// subdirectory; every file under the latter is compiled. The device
/// toolchain is selected with `FLARE_ROCM_BUILD`, and MPI support with
/// `FLARE_WITH_MPI` (which requires `MPI_HOME`).
pub fn setup_torch_extension(
    csrc_source_files: impl AsRef<Path>,
    csrc_header_files: impl AsRef<Path>,
    common_header_files: impl AsRef<Path>,
) -> Result<Extension> {
    let csrc = csrc_source_files.as_ref();
    let common = common_header_files.as_ref();

    let mut sources = vec![csrc.join("common.cpp")];
    sources.extend(
        util::all_files_in_dir(&csrc.join("extensions"))
            .context("collecting extension sources")?,
    );

    let mut include_dirs = vec![
        common.to_path_buf(),
        common.join("common"),
        common.join("common").join("include"),
        csrc_header_files.as_ref().to_path_buf(),
    ];

    let rocm = hip::rocm_build();
    if rocm {
        sources = hip::hipify(csrc, &sources)?;
    }

    let mut extension = Extension::new("flare_torch");
    extension.rocm = rocm;
    extension.sources = sources;
    extension.cxx_flags = CXX_FLAGS.iter().map(|f| f.to_string()).collect();
    extension.nvcc_flags = device_flags(rocm)?;

    if util::env_flag("FLARE_WITH_MPI") {
        let mpi_home = util::get_var_path("MPI_HOME").context(
            "MPI_HOME=/path/to/mpi must be set when compiling with FLARE_WITH_MPI=1",
        )?;

        include_dirs.push(mpi_home.join("include"));
        extension.cxx_flags.push("-DFLARE_WITH_MPI".to_string());
        extension.nvcc_flags.push("-DFLARE_WITH_MPI".to_string());
        extension.library_dirs.push(mpi_home.join("lib"));
        extension.libraries.push("mpi".to_string());
    }

    extension.include_dirs = include_dirs;
    Ok(extension)
}

/// Device-compiler flags for the selected toolchain.
///
/// The CUDA branch probes the installed toolkit: a missing nvcc is logged
/// and skipped, a toolkit older than [`cuda::MIN_CUDA_VERSION`] is fatal.
fn device_flags(rocm: bool) -> Result<Vec<String>> {
    if rocm {
        let mut flags: Vec<String> = HIP_FLAGS.iter().map(|f| f.to_string()).collect();
        //TODO lift -parallel-jobs once the minimum supported hipcc is known
        // to honour FLARE_BUILD_THREADS_PER_JOB-style job counts
        flags.push("-parallel-jobs=4".to_string());
        return Ok(flags);
    }

    let mut flags: Vec<String> = CUDA_FLAGS.iter().map(|f| f.to_string()).collect();

    let archs = cuda::cuda_archs();
    if archs.split(';').any(|arch| arch == "70") {
        flags.push("-gencode".to_string());
        flags.push("arch=compute_70,code=sm_70".to_string());
    }

    match cuda::cuda_version()? {
        None => warn!("could not determine CUDA toolkit version"),
        Some(version) => {
            if version < cuda::MIN_CUDA_VERSION {
                bail!("flare requires CUDA {} or newer, found {version}", cuda::MIN_CUDA_VERSION);
            }

            flags.push("--threads".to_string());
            flags.push(
                std::env::var("FLARE_BUILD_THREADS_PER_JOB").unwrap_or_else(|_| "1".to_string()),
            );

            for arch in archs.split(';') {
                if arch == "70" || arch.is_empty() {
                    continue; // already handled
                }

                flags.push("-gencode".to_string());
                flags.push(format!("arch=compute_{arch},code=sm_{arch}"));
            }
        }
    }

    Ok(flags)
}
