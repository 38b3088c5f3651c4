//! Process-wide debug-print toggle.
//!
//! The reference linker this engine is modeled on gates a family of
//! verbose trace prints behind a single runtime flag read from the
//! environment once, lazily, on first use. We keep that shape: a
//! `OnceLock<bool>` initialized from `CTF_LINK_DEBUG` the first time
//! [`is_enabled`] is consulted, rather than at process start, so
//! library consumers that never touch this module never pay for it.

use std::sync::OnceLock;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Whether verbose internal tracing is enabled for this process.
///
/// Reads the `CTF_LINK_DEBUG` environment variable on first call and
/// caches the result; later changes to the environment have no effect.
pub fn is_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| {
        std::env::var("CTF_LINK_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

/// Force the toggle to a known value, for tests that need deterministic
/// behavior regardless of the ambient environment. Has no effect once
/// [`is_enabled`] has already been called elsewhere in the process.
#[cfg(test)]
pub fn force_for_test(value: bool) {
    let _ = DEBUG_ENABLED.set(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_false_when_unset_and_forced() {
        force_for_test(false);
        assert!(!is_enabled());
    }
}
