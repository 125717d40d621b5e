//! Build and product metadata, printed by the `version` subcommand.
//!
//! Grounded in `internal/product/version.go`'s `BuildInfo`: the original
//! stamps version/commit/tree-state/build-time via `-ldflags` at link
//! time. Cargo's own `CARGO_PKG_VERSION` plays that role here; the
//! remaining fields fall back to "unknown" when no `build.rs` has
//! populated them, rather than failing the build.

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn git_commit() -> &'static str {
    option_env!("TSIGOATD_GIT_COMMIT").unwrap_or("unknown")
}

fn build_time() -> &'static str {
    option_env!("TSIGOATD_BUILD_TIME").unwrap_or("unknown")
}

/// Renders the same information the `serve` startup banner logs at `INFO`.
#[must_use]
pub fn build_info(short: bool) -> String {
    if short {
        return VERSION.to_string();
    }
    format!(
        "{NAME} {VERSION}\n  commit:     {}\n  built:      {}\n  rustc:      {}\n  target:     {}",
        git_commit(),
        build_time(),
        option_env!("TSIGOATD_RUSTC_VERSION").unwrap_or("unknown"),
        std::env::consts::ARCH,
    )
}
