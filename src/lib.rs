//! Build tooling for the flare GPU extension.
//!
//! Two independent pieces, both invoked by the packaging driver during its
//! setup phase: [`setup_torch_extension`] assembles the source lists and
//! compiler flags for the PyTorch extension module, and [`flare_version`]
//! computes the package version string from the version file, git and the
//! installed toolchain. Both are driven by `FLARE_*` environment variables.

pub mod cuda;
pub mod descriptor;
pub mod hip;
pub mod torch;
pub mod util;
pub mod version;

pub use descriptor::Extension;
pub use torch::setup_torch_extension;
pub use version::flare_version;
