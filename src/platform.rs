/*
 * Host platform seam.
 *
 * The scheduler needs exactly two things from whatever it runs on: the
 * current tick and, when every thread is asleep, permission to halt the
 * execution unit. Both cross this trait. Diagnostic output does not; it
 * goes through the `log` facade, and the host installs a logger (or
 * none).
 */

use spin::Once;

use crate::tick::Tick;

/// Host-supplied clock and power hooks.
pub trait Platform: Sync {
    /// Current tick counter. Monotonic with wraparound; the unit is
    /// whatever the host wants it to be.
    fn tick(&self) -> Tick;

    /// Hint that no thread can run for roughly `ticks` units. The host
    /// may halt the execution unit until the wake-up tick; ignoring the
    /// hint is also valid.
    #[cfg(feature = "idle")]
    fn deep_idle(&self, ticks: Tick) {
        let _ = ticks;
    }
}

static PLATFORM: Once<&'static dyn Platform> = Once::new();

/// Register the host platform. The first registration wins; later calls
/// are ignored.
pub fn set_platform(platform: &'static dyn Platform) {
    PLATFORM.call_once(|| platform);
}

#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
pub(crate) fn platform() -> &'static dyn Platform {
    *PLATFORM
        .get()
        .expect("no platform registered; call set_platform() first")
}
