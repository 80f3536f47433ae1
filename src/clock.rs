//! A time source that can be replaced by a fake implementation during
//! testing.
//!
//! The cache derives its epoch number from the time elapsed since a fixed
//! origin, so unlike an instant-based clock this one hands out absolute
//! offsets. [`SystemClock`] uses the Unix epoch as its origin while
//! [`FakeClock`] starts at zero and only moves when told to.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

//------------ Clock ------------------------------------------------------------

/// A source of the current time as an offset from a fixed origin.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Create a new instance of the clock.
    fn new() -> Self;

    /// Return the time that has passed since the clock's origin.
    fn now(&self) -> Duration;
}

//------------ SystemClock ------------------------------------------------------

/// Implementation of the [Clock] trait using the system time.
#[derive(Clone, Debug)]
pub struct SystemClock {}

impl Clock for SystemClock {
    fn new() -> Self {
        Self {}
    }

    fn now(&self) -> Duration {
        // A system clock before the Unix epoch is a configuration problem
        // we cannot do anything useful about. Treat it as time zero.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

//------------ FakeClock --------------------------------------------------------

/// Implementation of the [Clock] trait to fake the passing of time, for
/// example for testing cache expiry without sleeping.
#[derive(Clone, Debug)]
pub struct FakeClock {
    /// The current fake time.
    now: Arc<Mutex<Duration>>,
}

impl FakeClock {
    /// Adjust the current time by adding a [Duration].
    pub fn adjust_time(&self, adjust: Duration) {
        let mut now = self.now.lock().expect("fake clock lock poisoned");
        *now = (*now).saturating_add(adjust);
    }
}

impl Clock for FakeClock {
    fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Duration::from_secs(0))),
        }
    }

    fn now(&self) -> Duration {
        *self.now.lock().expect("fake clock lock poisoned")
    }
}

//============ Tests =============================================================
