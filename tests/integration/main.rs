//! Integration tests for Stagecraft

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    const BUILD_FILE: &str = r#"
[stages.builder]
from = "rust:1.82"
description = "Compile the release binary"
steps = [
    { workdir = "/app" },
    { copy = { src = ".", dest = "." } },
    { cargo = "build --release" },
]

[stages.default]
from = "debian:bookworm-slim"
tag = "example/app:latest"
steps = [
    { apt_install = ["ca-certificates"] },
    { copy_artifact = { stage = "builder", path = "/app/target/release/app", dest = "/usr/local/bin/app" } },
    { cmd = ["/usr/local/bin/app"] },
]
"#;

    /// Command isolated from the user's global and local config
    fn stagecraft(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("stagecraft");
        cmd.current_dir(dir)
            .env_remove("STAGECRAFT_CONFIG")
            .args(["--no-local", "--config"])
            .arg(dir.join("config.toml"));
        cmd
    }

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("build.toml"), BUILD_FILE).unwrap();
        temp
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("stagecraft")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("multi-stage"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("stagecraft")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("stagecraft"));
    }

    #[test]
    fn preview_prints_manifest() {
        let temp = project();
        stagecraft(temp.path())
            .arg("preview")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("#syntax=docker/dockerfile:1.4\n\n"))
            .stdout(predicate::str::contains("FROM rust:1.82 AS stage-0"))
            .stdout(predicate::str::contains("FROM debian:bookworm-slim AS stage-1"))
            .stdout(predicate::str::contains(
                "COPY --from=stage-0 /app/target/release/app /usr/local/bin/app",
            ));
    }

    #[test]
    fn preview_is_deterministic() {
        let temp = project();
        let first = stagecraft(temp.path()).arg("preview").output().unwrap();
        let second = stagecraft(temp.path()).arg("preview").output().unwrap();
        assert!(first.status.success());
        assert_eq!(first.stdout, second.stdout);
    }

    #[test]
    fn preview_other_target() {
        let temp = project();
        stagecraft(temp.path())
            .args(["preview", "-t", "builder"])
            .assert()
            .success()
            .stdout(predicate::str::contains("RUN --mount=type=cache,target=/root/.cargo/registry,sharing=locked cargo build --release"))
            .stdout(predicate::str::contains("bookworm").not());
    }

    #[test]
    fn preview_uses_configured_syntax() {
        let temp = project();
        std::fs::write(
            temp.path().join("config.toml"),
            "[build]\nsyntax = \"docker/dockerfile:1.7\"\n",
        )
        .unwrap();

        stagecraft(temp.path())
            .arg("preview")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("#syntax=docker/dockerfile:1.7"));
    }

    #[test]
    fn preview_missing_target() {
        let temp = project();
        stagecraft(temp.path())
            .args(["preview", "--target", "release"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Target `release` not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn missing_build_file() {
        let temp = TempDir::new().unwrap();
        stagecraft(temp.path())
            .arg("ls")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Build file not found"));
    }

    #[test]
    fn invalid_build_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("build.toml"),
            "[stages.default]\nfrom = \"alpine\"\nsteps = [{ copy_artifact = { stage = \"nope\", path = \"/a\", dest = \"/b\" } }]\n",
        )
        .unwrap();

        stagecraft(temp.path())
            .arg("preview")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown stage `nope`"));
    }

    #[test]
    fn ls_lists_targets() {
        let temp = project();
        stagecraft(temp.path())
            .arg("ls")
            .assert()
            .success()
            .stdout(predicate::str::contains("builder"))
            .stdout(predicate::str::contains("example/app:latest"))
            .stdout(predicate::str::contains("2 target(s)"));
    }

    #[test]
    fn ls_plain_and_json() {
        let temp = project();
        stagecraft(temp.path())
            .args(["ls", "--format", "plain"])
            .assert()
            .success()
            .stdout("builder\ndefault\n");

        let output = stagecraft(temp.path())
            .args(["ls", "--format", "json"])
            .output()
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json[0]["target"], "builder");
        assert_eq!(json[0]["description"], "Compile the release binary");
        assert_eq!(json[1]["tag"], "example/app:latest");
    }

    #[test]
    fn ls_explicit_file() {
        let temp = project();
        std::fs::rename(temp.path().join("build.toml"), temp.path().join("images.toml")).unwrap();
        stagecraft(temp.path())
            .args(["ls", "images.toml", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("default"));
    }

    #[test]
    fn cache_id_is_stable() {
        let temp = TempDir::new().unwrap();
        let first = stagecraft(temp.path())
            .args(["cache-id", "/root/.cache", "--dir", "/src/project"])
            .output()
            .unwrap();
        let second = stagecraft(temp.path())
            .args(["cache-id", "/root/.cache", "--dir", "/src/project"])
            .output()
            .unwrap();

        let id = String::from_utf8(first.stdout).unwrap();
        let id = id.trim();
        assert_eq!(id.len(), 17);
        assert_eq!(id.as_bytes()[8], b'-');
        assert_eq!(first.status.code(), Some(0));
        assert_eq!(String::from_utf8(second.stdout).unwrap().trim(), id);
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        stagecraft(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        stagecraft(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[build]"))
            .stdout(predicate::str::contains("tag_prefix = \"stagecraft\""));
    }

    #[test]
    fn config_init_and_set() {
        let temp = TempDir::new().unwrap();
        stagecraft(temp.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(temp.path().join("config.toml").exists());

        stagecraft(temp.path())
            .args(["config", "set", "build.tag_prefix", "registry.local/team"])
            .assert()
            .success();

        stagecraft(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("registry.local/team"));
    }

    #[test]
    fn config_set_unknown_key() {
        let temp = TempDir::new().unwrap();
        stagecraft(temp.path())
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn local_config_is_discovered() {
        let temp = project();
        std::fs::write(
            temp.path().join("stagecraft.toml"),
            "[build]\ndefault_file = \"images.toml\"\n",
        )
        .unwrap();
        std::fs::rename(temp.path().join("build.toml"), temp.path().join("images.toml")).unwrap();

        let mut cmd = cargo_bin_cmd!("stagecraft");
        cmd.current_dir(temp.path())
            .env_remove("STAGECRAFT_CONFIG")
            .arg("--config")
            .arg(temp.path().join("config.toml"))
            .args(["ls", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("builder"));
    }
}
