//! Time plugin and clock resource.
//!
//! Provides [`TimePlugin`], which registers a global [`Clock`]. The console
//! measures connection inactivity through this clock, so tests can swap in a
//! [`MockClock`] and expire connections without sleeping.
//!
//! # Example
//!
//! ```
//! use portico_system::server::Server;
//! use portico_core_plugins::{Clock, ServerInfoPlugin, TimePlugin};
//!
//! let mut server = Server::new();
//! server.add_plugins(ServerInfoPlugin::default());
//! server.add_plugins(TimePlugin::default());
//! server.finish();
//!
//! let clock = server.get_global::<Clock>().unwrap();
//! let start = clock.now();
//! assert!(clock.elapsed_since(start) < std::time::Duration::from_secs(1));
//! ```

use crate::ServerInfoPlugin;
use portico_system::plugin::{Plugin, PluginId};
use portico_system::resource::GlobalResource;
use portico_system::server::Server;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ─────────────────────────────────────────────────────────────────────────────
// ClockProvider Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Source of the current instant.
///
/// # Example
///
/// ```
/// use std::time::Instant;
/// use portico_core_plugins::ClockProvider;
///
/// struct FixedClock(Instant);
///
/// impl ClockProvider for FixedClock {
///     fn now(&self) -> Instant {
///         self.0
///     }
/// }
/// ```
pub trait ClockProvider: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
struct SystemClock;

impl ClockProvider for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Clock Resource
// ─────────────────────────────────────────────────────────────────────────────

/// Global time source. Cloning shares the underlying provider.
#[derive(Clone)]
pub struct Clock {
    provider: Arc<dyn ClockProvider>,
}

impl GlobalResource for Clock {}

impl core::fmt::Debug for Clock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Clock").field("now", &self.now()).finish()
    }
}

impl Clock {
    /// Creates a clock backed by the system clock.
    #[must_use]
    pub fn system() -> Self {
        Self {
            provider: Arc::new(SystemClock),
        }
    }

    /// Creates a clock backed by a custom provider.
    #[must_use]
    pub fn with_provider(provider: Arc<dyn ClockProvider>) -> Self {
        Self { provider }
    }

    /// Returns the current instant.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.provider.now()
    }

    /// Returns the time elapsed since `earlier`, or zero if `earlier` is in
    /// the future.
    #[must_use]
    pub fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TimePlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Registers the global [`Clock`].
///
/// # Dependencies
///
/// - [`ServerInfoPlugin`]
///
/// # Testing with Mock Clock
///
/// ```ignore
/// let mock = Arc::new(MockClock::new(Instant::now()));
/// server.add_plugins(TimePlugin::with_clock(mock.clone()));
///
/// mock.advance(Duration::from_secs(300));
/// console.sweep_inactive(); // every idle connection is closed
/// ```
#[derive(Clone, Default)]
pub struct TimePlugin {
    clock: Option<Arc<dyn ClockProvider>>,
}

impl TimePlugin {
    /// Creates a `TimePlugin` using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `TimePlugin` with a custom clock provider.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn ClockProvider>) -> Self {
        Self { clock: Some(clock) }
    }
}

impl Plugin for TimePlugin {
    fn build(&self, server: &mut Server) {
        let clock = match &self.clock {
            Some(provider) => Clock::with_provider(Arc::clone(provider)),
            None => Clock::system(),
        };
        server.insert_global(clock);
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<ServerInfoPlugin>()]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MockClock for Testing
// ─────────────────────────────────────────────────────────────────────────────

/// Clock provider whose time only moves when told to.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockClock {
    current: parking_lot::RwLock<Instant>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockClock {
    /// Creates a mock clock set to the given instant.
    #[must_use]
    pub fn new(start: Instant) -> Self {
        Self {
            current: parking_lot::RwLock::new(start),
        }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.current.write() += duration;
    }

    /// Sets the clock to a specific instant.
    pub fn set(&self, instant: Instant) {
        *self.current.write() = instant;
    }

    /// Returns the current instant.
    #[must_use]
    pub fn current(&self) -> Instant {
        *self.current.read()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl ClockProvider for MockClock {
    fn now(&self) -> Instant {
        self.current()
    }
}
