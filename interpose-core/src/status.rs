//! Cache status marker.

use std::fmt;

/// Whether a response was replayed from a cache or fetched from the transport.
///
/// Caching behaviors insert it into the response extensions and the context
/// metadata so other behaviors and callers can tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheStatus {
    /// The response was replayed from a cached entry.
    Hit,
    /// The response came from the transport.
    #[default]
    Miss,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }

    /// Returns `true` for [`CacheStatus::Hit`].
    #[inline]
    pub const fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
