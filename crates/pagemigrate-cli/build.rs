use chrono::Local;
use std::process::Command;

/// Embeds `BUILD_HASH` for `--version`: the short commit hash, with a
/// `-dirty-<timestamp>` suffix when tracked files differ from HEAD.
fn main() {
    let hash = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());

    let dirty = Command::new("git")
        .args(["diff", "--quiet", "HEAD"])
        .status()
        .is_ok_and(|s| !s.success());

    let build_hash = if dirty {
        format!("{hash}-dirty-{}", Local::now().format("%Y%m%d-%H%M%S"))
    } else {
        hash
    };
    println!("cargo:rustc-env=BUILD_HASH={build_hash}");

    // The workspace root (and its .git) is two levels up.
    for watched in ["../../.git/HEAD", "../../.git/index"] {
        println!("cargo:rerun-if-changed={watched}");
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
