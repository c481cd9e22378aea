use std::process::Command;

fn git(args: &[&str]) -> Option<std::process::Output> {
    Command::new("git").args(args).output().ok()
}

/// Short commit hash, suffixed with `-dirty` for uncommitted changes.
fn version() -> String {
    let head = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).trim().to_string(),
        _ => return "unknown".to_string(),
    };
    let dirty = git(&["diff", "--quiet"])
        .map(|o| !o.status.success())
        .unwrap_or(false);
    if dirty { format!("{}-dirty", head) } else { head }
}

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", version());
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
