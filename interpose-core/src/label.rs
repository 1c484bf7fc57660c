//! Behavior label type for identifying pipeline behaviors.
//!
//! `BehaviorLabel` is a newtype wrapper around `SmolStr` used in tracing fields,
//! metrics labels and as the origin marker of background continuations.

use smol_str::SmolStr;
use std::fmt;

/// A label identifying a behavior in a pipeline.
///
/// Used for:
/// - Behavior identification in `Behavior::label()`
/// - Origin tracking of background continuations (`Context::background_origin`)
/// - Metrics labels
///
/// # Example
/// ```
/// use interpose_core::BehaviorLabel;
///
/// let label = BehaviorLabel::new_static("swr");
/// assert_eq!(label.as_str(), "swr");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BehaviorLabel(SmolStr);

impl BehaviorLabel {
    /// Creates a new behavior label.
    #[inline]
    pub fn new(s: impl Into<SmolStr>) -> Self {
        Self(s.into())
    }

    /// Creates a behavior label from a static string (no allocation).
    #[inline]
    pub const fn new_static(s: &'static str) -> Self {
        Self(SmolStr::new_static(s))
    }

    /// Returns the label as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BehaviorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BehaviorLabel {
    #[inline]
    fn from(s: &str) -> Self {
        Self(SmolStr::new(s))
    }
}

impl From<String> for BehaviorLabel {
    #[inline]
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}

impl PartialEq<str> for BehaviorLabel {
    fn eq(&self, other: &str) -> bool {
        self.0.as_str() == other
    }
}

impl PartialEq<&str> for BehaviorLabel {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_str() == *other
    }
}
