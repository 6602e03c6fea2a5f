//! Reusable instruction bundles
//!
//! Common toolchain steps with the package caches already mounted.

use crate::instruction::{CacheMount, Instruction, Sharing};

const APT_CACHE_DIRS: [&str; 2] = ["/var/cache/apt", "/var/lib/apt"];
const CARGO_REGISTRY: &str = "/root/.cargo/registry";

/// `apt-get install` of `packages`, sorted so the line is stable
pub fn apt_install<S: AsRef<str>>(packages: &[S]) -> Instruction {
    let mut packages: Vec<&str> = packages.iter().map(AsRef::as_ref).collect();
    packages.sort_unstable();

    let mounts = APT_CACHE_DIRS
        .iter()
        .map(|dir| CacheMount::new(*dir).sharing(Sharing::Locked))
        .collect();

    Instruction::run_with_mounts(
        format!(
            "apt-get update && DEBIAN_FRONTEND=noninteractive apt-get install -y --no-install-recommends {}",
            packages.join(" ")
        ),
        mounts,
    )
}

/// `cargo <subcommand>` with the registry cached between builds
pub fn cargo(subcommand: &str) -> Instruction {
    Instruction::run_with_mounts(
        format!("cargo {subcommand}"),
        vec![CacheMount::new(CARGO_REGISTRY).sharing(Sharing::Locked)],
    )
}

/// Install a pinned toolchain through rustup and put cargo on the PATH
pub fn install_rust_toolchain(version: &str) -> Vec<Instruction> {
    vec![
        Instruction::run(format!(
            "curl https://sh.rustup.rs -sSf | sh -s -- -y --default-toolchain {version}"
        )),
        Instruction::env([("PATH", "$PATH:/root/.cargo/bin")]),
    ]
}
