// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=cbindgen.toml");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        return;
    };

    // The header is a convenience for C harnesses; the library builds without it.
    let bindings = match cbindgen::generate(&crate_dir) {
        Ok(bindings) => bindings,
        Err(e) => {
            println!("cargo:warning=ncclsim.h not generated: {e}");
            return;
        }
    };

    let out_dir_header = Path::new(&out_dir).join("ncclsim.h");
    bindings.write_to_file(&out_dir_header);

    let src_tree_header = Path::new(&crate_dir).join("include").join("ncclsim.h");
    if let Some(parent) = src_tree_header.parent() {
        fs::create_dir_all(parent).ok();
    }
    fs::copy(&out_dir_header, &src_tree_header).ok();
}
