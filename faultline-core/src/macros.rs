use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG: AtomicBool = AtomicBool::new(false);

/// Returns whether debug diagnostics are enabled.
///
/// This is process global rather than per client so that the debug macro can
/// be used from contexts that must not touch the hub, such as while holding
/// a scope stack lock.
#[doc(hidden)]
pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

#[doc(hidden)]
pub fn set_debug_enabled(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

/// Prints internal diagnostics to stderr when `ClientOptions::debug` is set.
///
/// Diagnostics, not exceptions, are the sanctioned channel for surfacing
/// processor and delivery problems: nothing in the pipeline is allowed to
/// panic through a public API call.
#[macro_export]
macro_rules! faultline_debug {
    ($($arg:tt)*) => {
        if $crate::macros::debug_enabled() {
            eprint!("[faultline] ");
            eprintln!($($arg)*);
        }
    };
}

/// Returns the intended release for the client as an `Option<Cow<'static, str>>`.
///
/// This uses the information supplied by cargo to calculate a release in the
/// form `name@version`.
///
/// # Examples
///
/// ```
/// let _guard = faultline_core::ClientOptions {
///     release: faultline_core::release_name!(),
///     ..Default::default()
/// };
/// ```
#[macro_export]
macro_rules! release_name {
    () => {{
        option_env!("CARGO_PKG_NAME").and_then(|name| {
            option_env!("CARGO_PKG_VERSION").map(|version| {
                ::std::borrow::Cow::Owned(format!("{}@{}", name, version))
            })
        })
    }};
}
