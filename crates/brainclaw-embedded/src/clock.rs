//! Monotonic time source

/// Monotonic milliseconds since an arbitrary epoch.
pub trait Clock {
    /// Current time
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
