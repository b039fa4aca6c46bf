// Regenerates the C header with the `cbindgen` CLI when it is installed,
// otherwise exposes the checked-in `include/echoverb.h` through $OUT_DIR.

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/echoverb.h");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        return;
    };
    let header_repo = PathBuf::from(crate_dir.clone()).join("include").join("echoverb.h");
    let header_out = PathBuf::from(out_dir).join("echoverb.h");

    let generated = Command::new("cbindgen")
        .args(["--crate", "echoverb-ffi", "--lang", "C", "--output"])
        .arg(&header_out)
        .current_dir(&crate_dir)
        .status()
        .is_ok_and(|s| s.success());

    if generated {
        println!("cargo:warning=echoverb-ffi: header generated with cbindgen -> {}", header_out.display());
        return;
    }

    if let Err(e) = fs::copy(&header_repo, &header_out) {
        println!("cargo:warning=echoverb-ffi: could not stage include/echoverb.h ({e})");
    }
}
