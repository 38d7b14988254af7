use std::process::Command;

/// Run git and return its trimmed stdout, or `None` outside a checkout.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    let package_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();

    // "0.5.0 (1a2b3c4)", "0.5.0 (1a2b3c4-dirty)" or just "0.5.0"
    let version = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(hash) => {
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
                .is_some_and(|status| !status.is_empty());
            let suffix = if dirty { "-dirty" } else { "" };
            format!("{} ({}{})", package_version, hash, suffix)
        }
        None => package_version,
    };

    println!("cargo:rustc-env=PLAYLIST_COMPOSER_VERSION={}", version);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
}
