//! End-to-end tests driving the `carafe` binary.

use std::path::PathBuf;
use std::process::Command;

use sha2::{Digest, Sha256};
use tempfile::TempDir;

/// Test context that sets up a temporary carafe home environment
struct TestContext {
    temp_dir: TempDir,
    carafe_home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let carafe_home = temp_dir.path().join(".carafe");
        std::fs::create_dir_all(&carafe_home).expect("failed to create carafe home");

        Self {
            temp_dir,
            carafe_home,
        }
    }

    fn carafe_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_carafe");
        let mut cmd = Command::new(bin_path);
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("CARAFE_HOME", &self.carafe_home);
        cmd
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content).expect("failed to write file");
        path
    }

    fn entry_point(&self, name: &str) -> PathBuf {
        self.carafe_home.join("bin").join(name)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A recipe pointing at a local mock server, with per-archive bodies.
fn mock_recipe(server_url: &str, pydantic_digest: &str) -> String {
    let package_body = b"package archive".as_slice();
    let aiohttp_body = b"aiohttp archive".as_slice();
    let mcp_body = b"mcp archive".as_slice();

    format!(
        r#"
[package]
name = "pixeldojo-mcp"
version = "0.1.0"
description = "MCP server for PixelDojo AI image generation API"
homepage = "https://github.com/mariussil/pixeldojo-mcp-server"
url = "{server_url}/pixeldojo-mcp-0.1.0.tar.gz"
sha256 = "{package}"
license = "MIT"

[[resource]]
name = "aiohttp"
url = "{server_url}/aiohttp-3.9.5.tar.gz"
sha256 = "{aiohttp}"

[[resource]]
name = "pydantic"
url = "{server_url}/pydantic-2.7.0.tar.gz"
sha256 = "{pydantic_digest}"

[[resource]]
name = "mcp"
url = "{server_url}/mcp-1.8.0.tar.gz"
sha256 = "{mcp}"
requires = ["pydantic"]
"#,
        package = sha256_hex(package_body),
        aiohttp = sha256_hex(aiohttp_body),
        mcp = sha256_hex(mcp_body),
    )
}

/// Serve the four archives of `mock_recipe` from a mockito server.
fn serve_archives(server: &mut mockito::Server) {
    for (path, body) in [
        ("/pixeldojo-mcp-0.1.0.tar.gz", b"package archive".as_slice()),
        ("/aiohttp-3.9.5.tar.gz", b"aiohttp archive".as_slice()),
        ("/pydantic-2.7.0.tar.gz", b"pydantic archive".as_slice()),
        ("/mcp-1.8.0.tar.gz", b"mcp archive".as_slice()),
    ] {
        server
            .mock("GET", path)
            .with_status(200)
            .with_body(body)
            .create();
    }
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx
        .carafe_cmd()
        .arg("--help")
        .output()
        .expect("failed to run carafe");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("install"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx
        .carafe_cmd()
        .arg("--version")
        .output()
        .expect("failed to run carafe");
    assert!(output.status.success());
}

#[test]
fn test_list_empty() {
    let ctx = TestContext::new();
    let output = ctx
        .carafe_cmd()
        .arg("list")
        .output()
        .expect("failed to run carafe");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No applications installed"));
}

#[test]
fn test_check_reports_install_order() {
    let ctx = TestContext::new();
    let recipe = ctx.write_file(
        "pixeldojo-mcp.toml",
        &mock_recipe("https://files.pythonhosted.org", &sha256_hex(b"pydantic archive")),
    );

    let output = ctx
        .carafe_cmd()
        .arg("check")
        .arg(&recipe)
        .output()
        .expect("failed to run carafe");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("OK: pixeldojo-mcp 0.1.0 (3 resources)"));
    // mcp requires pydantic, so pydantic must come first.
    let pydantic = stdout.find("pydantic").unwrap();
    let mcp = stdout.rfind("-> mcp").unwrap();
    assert!(pydantic < mcp);
}

#[test]
fn test_check_rejects_placeholder_digest() {
    let ctx = TestContext::new();
    let recipe = ctx.write_file(
        "bad.toml",
        r#"
[package]
name = "pixeldojo-mcp"
version = "0.1.0"
url = "https://example.com/pixeldojo-mcp-0.1.0.tar.gz"
sha256 = "PLACEHOLDER_SHA256_CHECKSUM"
"#,
    );

    let output = ctx
        .carafe_cmd()
        .arg("check")
        .arg(&recipe)
        .output()
        .expect("failed to run carafe");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SHA256"));
}

#[test]
fn test_hash_command() {
    let ctx = TestContext::new();
    let file = ctx.write_file("hello.txt", "hello world");

    let output = ctx
        .carafe_cmd()
        .arg("hash")
        .arg(&file)
        .output()
        .expect("failed to run carafe");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"));
}

#[test]
fn test_install_dry_run_touches_nothing() {
    let ctx = TestContext::new();
    let recipe = ctx.write_file(
        "pixeldojo-mcp.toml",
        &mock_recipe("https://files.pythonhosted.org", &sha256_hex(b"pydantic archive")),
    );

    let output = ctx
        .carafe_cmd()
        .arg("--dry-run")
        .arg("install")
        .arg(&recipe)
        .output()
        .expect("failed to run carafe");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("would install pixeldojo-mcp"));
    assert!(!ctx.carafe_home.join("envs/pixeldojo-mcp").exists());
    assert!(!ctx.entry_point("pixeldojo-mcp").exists());
}

#[test]
fn test_corrupted_digest_fails_naming_resource() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    serve_archives(&mut server);

    // One flipped character in pydantic's pinned digest.
    let good = sha256_hex(b"pydantic archive");
    let corrupted = if good.starts_with('0') {
        format!("1{}", &good[1..])
    } else {
        format!("0{}", &good[1..])
    };
    let recipe = ctx.write_file(
        "pixeldojo-mcp.toml",
        &mock_recipe(&server.url(), &corrupted),
    );

    let output = ctx
        .carafe_cmd()
        .arg("install")
        .arg(&recipe)
        .output()
        .expect("failed to run carafe");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pydantic"), "must name the failing resource");
    assert!(stderr.contains(&corrupted), "must show the expected digest");
    assert!(stderr.contains(&good), "must show the computed digest");

    // No filesystem mutation under digest mismatch: no environment, no
    // entry point.
    assert!(!ctx.carafe_home.join("envs/pixeldojo-mcp").exists());
    assert!(!ctx.entry_point("pixeldojo-mcp").exists());
}

#[test]
fn test_held_lock_fails_fast() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    serve_archives(&mut server);

    let recipe = ctx.write_file(
        "pixeldojo-mcp.toml",
        &mock_recipe(&server.url(), &sha256_hex(b"pydantic archive")),
    );

    // Simulate a concurrent install holding the environment lock.
    let lock = ctx.carafe_home.join("envs/pixeldojo-mcp.lock");
    std::fs::create_dir_all(lock.parent().unwrap()).unwrap();
    std::fs::write(&lock, "12345\n").unwrap();

    let output = ctx
        .carafe_cmd()
        .arg("install")
        .arg(&recipe)
        .output()
        .expect("failed to run carafe");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("in progress"));
    assert!(!ctx.carafe_home.join("envs/pixeldojo-mcp").exists());
}

#[test]
fn test_remove_unknown_app_reports_not_installed() {
    let ctx = TestContext::new();
    let output = ctx
        .carafe_cmd()
        .args(["remove", "--yes", "no-such-app"])
        .output()
        .expect("failed to run carafe");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not installed"));
}

#[test]
fn test_info_of_fake_install_reads_receipt() {
    let ctx = TestContext::new();

    // Hand-craft a committed environment: receipt + bin dir, the way a
    // finished install leaves it.
    let env_root = ctx.carafe_home.join("envs/pixeldojo-mcp");
    std::fs::create_dir_all(env_root.join("bin")).unwrap();
    std::fs::write(
        env_root.join("receipt.json"),
        r#"{
  "name": "pixeldojo-mcp",
  "version": "0.1.0",
  "description": "MCP server for PixelDojo AI image generation API",
  "homepage": "https://github.com/mariussil/pixeldojo-mcp-server",
  "license": "MIT",
  "bin": ["pixeldojo-mcp"],
  "archives": [
    {"name": "pixeldojo-mcp", "sha256": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"}
  ],
  "check": {"args": ["--help"], "expect": "pixeldojo-mcp"},
  "installed_at": "2026-08-06T00:00:00+00:00"
}"#,
    )
    .unwrap();

    let output = ctx
        .carafe_cmd()
        .args(["info", "pixeldojo-mcp"])
        .output()
        .expect("failed to run carafe");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pixeldojo-mcp 0.1.0"));
    assert!(stdout.contains("MIT"));

    let listed = ctx
        .carafe_cmd()
        .arg("list")
        .output()
        .expect("failed to run carafe");
    let list_out = String::from_utf8_lossy(&listed.stdout);
    assert!(list_out.contains("pixeldojo-mcp"));
    assert!(list_out.contains("0.1.0"));
}

#[test]
fn test_removal_of_fake_install_cleans_up() {
    let ctx = TestContext::new();

    let env_root = ctx.carafe_home.join("envs/pixeldojo-mcp");
    std::fs::create_dir_all(env_root.join("bin")).unwrap();
    std::fs::write(env_root.join("bin/pixeldojo-mcp"), "#!/bin/sh\n").unwrap();
    std::fs::write(
        env_root.join("receipt.json"),
        r#"{
  "name": "pixeldojo-mcp",
  "version": "0.1.0",
  "bin": ["pixeldojo-mcp"],
  "archives": [],
  "check": {"args": ["--help"], "expect": "pixeldojo-mcp"},
  "installed_at": "2026-08-06T00:00:00+00:00"
}"#,
    )
    .unwrap();
    let bin_dir = ctx.carafe_home.join("bin");
    std::fs::create_dir_all(&bin_dir).unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink(env_root.join("bin/pixeldojo-mcp"), ctx.entry_point("pixeldojo-mcp"))
        .unwrap();

    let output = ctx
        .carafe_cmd()
        .args(["remove", "--yes", "pixeldojo-mcp"])
        .output()
        .expect("failed to run carafe");
    assert!(output.status.success());

    assert!(!env_root.exists());
    assert!(!ctx.entry_point("pixeldojo-mcp").exists());
    assert!(!ctx.entry_point("pixeldojo-mcp").is_symlink());
}
