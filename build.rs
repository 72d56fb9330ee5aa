use std::env;
use std::process::Command;

fn git_short_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=10", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn main() {
    let version = env::var("FATT_VERSION_STRING")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| {
            let pkg_version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".into());
            match git_short_sha() {
                Some(sha) => format!("{pkg_version}+{sha}"),
                None => pkg_version,
            }
        });
    println!("cargo:rustc-env=FATT_VERSION_STRING={version}");
    println!("cargo:rerun-if-env-changed=FATT_VERSION_STRING");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
