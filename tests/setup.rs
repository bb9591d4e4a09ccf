//! End-to-end run of the extension setup the way a packaging driver uses it.

use std::fs;

use serial_test::serial;

use flare_build::setup_torch_extension;

#[test]
#[serial]
fn cuda_descriptor_round_trip() {
    let csrc = tempfile::tempdir().unwrap();
    fs::write(csrc.path().join("common.cpp"), "int flare_common() { return 0; }\n").unwrap();
    fs::create_dir(csrc.path().join("extensions")).unwrap();
    fs::write(csrc.path().join("extensions").join("norm.cpp"), "").unwrap();

    let headers = tempfile::tempdir().unwrap();
    let common = tempfile::tempdir().unwrap();
    let no_toolkit = tempfile::tempdir().unwrap();

    temp_env::with_vars(
        [
            ("FLARE_ROCM_BUILD", None::<String>),
            ("FLARE_WITH_MPI", None),
            ("FLARE_CUDA_ARCHS", Some("80".to_string())),
            ("CUDA_HOME", Some(no_toolkit.path().display().to_string())),
            ("CUDA_PATH", None),
        ],
        || {
            let ext = setup_torch_extension(csrc.path(), headers.path(), common.path()).unwrap();

            assert_eq!(ext.name, "flare_torch");
            assert_eq!(ext.sources.len(), 2);
            assert!(ext.nvcc_flags.contains(&"--use_fast_math".to_string()));

            // the descriptor must be convertible without touching the toolchain
            let _build = ext.cc_build();
            ext.emit_link_directives();
        },
    );
}
