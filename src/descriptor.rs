use std::path::PathBuf;

/// Fully-populated build descriptor for one compiled extension module.
///
/// Assembled once by [`setup_torch_extension`](crate::torch::setup_torch_extension)
/// and handed to the packaging driver, which either turns it into a
/// [`cc::Build`] or reads the fields directly.
#[derive(Debug, Clone, Default)]
pub struct Extension {
    pub name: String,
    /// Device toolchain selected for this build.
    pub rocm: bool,
    pub sources: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    /// Host-compiler flags.
    pub cxx_flags: Vec<String>,
    /// Device-compiler (nvcc/hipcc) flags.
    pub nvcc_flags: Vec<String>,
    pub libraries: Vec<String>,
    pub library_dirs: Vec<PathBuf>,
}

impl Extension {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Configure a `cc::Build` from the descriptor, ready for `compile()`.
    ///
    /// In CUDA mode host flags are routed through `-Xcompiler` so nvcc
    /// forwards them; hipcc is a clang driver and takes both sets directly.
    pub fn cc_build(&self) -> cc::Build {
        let mut build = cc::Build::new();
        build.cargo_warnings(false).cpp(true).debug(false);

        if self.rocm {
            let compiler = if cfg!(target_family = "windows") { "hipcc.bin.exe" } else { "hipcc" };
            build.compiler(compiler);
            build.define("__HIP_PLATFORM_AMD__", None);

            for flag in self.nvcc_flags.iter().chain(&self.cxx_flags) {
                build.flag(flag);
            }
        } else {
            build.cuda(true).cudart("shared");

            for flag in &self.nvcc_flags {
                build.flag(flag);
            }

            for flag in &self.cxx_flags {
                build.flag(format!("-Xcompiler={flag}"));
            }
        }

        for dir in &self.include_dirs {
            build.include(dir);
        }

        build.files(&self.sources);
        build
    }

    /// Print the cargo directives for linked libraries and search paths.
    pub fn emit_link_directives(&self) {
        for dir in &self.library_dirs {
            println!("cargo:rustc-link-search=native={}", dir.display());
        }

        for lib in &self.libraries {
            println!("cargo:rustc-link-lib=dylib={lib}");
        }
    }
}
