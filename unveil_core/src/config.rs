// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Orchestrator configuration.
//!
//! [`OrchestratorConfig`] is read once when an
//! [`Orchestrator`](crate::orchestrator::Orchestrator) is constructed and is
//! immutable afterwards. [`validate`](OrchestratorConfig::validate) runs
//! before any element is registered, so a bad configuration fails fast
//! instead of half-wiring a page.
//!
//! Markup and script callers usually hold loosely typed numbers (signed,
//! fractional milliseconds). [`Overrides`] carries those and converts them
//! into a validated configuration with [`Overrides::apply`].

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::time::Duration;

/// What a [`Selector`] contributes to the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Matching elements take part in the staged reveal sequence.
    Reveal,
    /// Matching elements only carry a deferred resource.
    Lazy,
    /// Matching elements are revealed and carry a deferred resource.
    Both,
}

impl TargetKind {
    /// Returns `true` if matching elements take part in the reveal sequence.
    #[must_use]
    pub const fn reveals(self) -> bool {
        matches!(self, Self::Reveal | Self::Both)
    }

    /// Returns `true` if matching elements may carry a deferred resource.
    #[must_use]
    pub const fn loads(self) -> bool {
        matches!(self, Self::Lazy | Self::Both)
    }
}

/// An element selection predicate.
///
/// The pattern is interpreted by the platform (a CSS selector for the web
/// backend). The selector's position in
/// [`OrchestratorConfig::selection`] is its *group*: stagger ordinals are
/// counted per group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selector {
    /// Platform-interpreted pattern.
    pub pattern: String,
    /// Role of matching elements.
    pub kind: TargetKind,
}

impl Selector {
    /// A selector whose matches are revealed.
    #[must_use]
    pub fn reveal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: TargetKind::Reveal,
        }
    }

    /// A selector whose matches only load a deferred resource.
    #[must_use]
    pub fn lazy(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: TargetKind::Lazy,
        }
    }

    /// A selector whose matches are revealed and load a deferred resource.
    #[must_use]
    pub fn both(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: TargetKind::Both,
        }
    }
}

/// Signed per-edge distances (in CSS pixels) by which the trigger region is
/// grown (positive) or shrunk (negative) relative to the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Margin {
    /// Top edge.
    pub top: f64,
    /// Right edge.
    pub right: f64,
    /// Bottom edge.
    pub bottom: f64,
    /// Left edge.
    pub left: f64,
}

impl Margin {
    /// No expansion or contraction.
    pub const ZERO: Self = Self::uniform(0.0);

    /// Creates a margin from explicit edges, in CSS order.
    #[must_use]
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// The same distance on every edge.
    #[must_use]
    pub const fn uniform(px: f64) -> Self {
        Self::new(px, px, px, px)
    }

    /// Returns `true` if every edge is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.top.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
            && self.left.is_finite()
    }
}

impl fmt::Display for Margin {
    /// Formats as a CSS `rootMargin` value, e.g. `0px 0px -50px 0px`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}px {}px {}px {}px",
            self.top, self.right, self.bottom, self.left
        )
    }
}

/// Reasons a configuration is rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The selection list is empty.
    EmptySelection,
    /// The selector at this index has a blank pattern.
    BlankSelector(usize),
    /// The visibility threshold is outside `0.0..=1.0` or not a number.
    ThresholdOutOfRange(f64),
    /// A margin edge is NaN or infinite.
    NonFiniteMargin,
    /// A duration override is negative or not a number.
    NegativeDuration {
        /// Name of the offending setting.
        field: &'static str,
        /// The rejected value in milliseconds.
        millis: f64,
    },
    /// A retry count override is negative.
    NegativeRetries(i64),
    /// The backoff base is zero.
    ZeroBackoffBase,
    /// The backoff ceiling is below the backoff base.
    BackoffCeilingBelowBase,
    /// A load timeout of zero was configured.
    ZeroLoadTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySelection => write!(f, "at least one selector is required"),
            Self::BlankSelector(idx) => write!(f, "selector {idx} has a blank pattern"),
            Self::ThresholdOutOfRange(t) => {
                write!(f, "visibility threshold {t} is outside 0.0..=1.0")
            }
            Self::NonFiniteMargin => write!(f, "margin edges must be finite"),
            Self::NegativeDuration { field, millis } => {
                write!(f, "{field} must be a non-negative duration, got {millis}ms")
            }
            Self::NegativeRetries(n) => write!(f, "max retries must be non-negative, got {n}"),
            Self::ZeroBackoffBase => write!(f, "backoff base must be greater than zero"),
            Self::BackoffCeilingBelowBase => {
                write!(f, "backoff ceiling must not be below the backoff base")
            }
            Self::ZeroLoadTimeout => write!(f, "load timeout must be greater than zero"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Immutable orchestrator settings.
#[derive(Clone, Debug, PartialEq)]
pub struct OrchestratorConfig {
    /// Selection predicates, one group per entry.
    pub selection: Vec<Selector>,
    /// Fraction (0–1) of an element's area that must be inside the trigger
    /// region for it to count as entered. Zero means any intersection.
    pub threshold: f64,
    /// Trigger region adjustment relative to the viewport.
    pub margin: Margin,
    /// Delay multiplier applied per ordinal position.
    pub stagger_interval: Duration,
    /// Extra delay between an element's reveal and its connector.
    pub connector_delay: Duration,
    /// Number of retries after the first failed attempt.
    pub max_retries: u32,
    /// Wait before the first retry; doubles per completed attempt.
    pub backoff_base: Duration,
    /// Upper bound for any single backoff wait.
    pub backoff_ceiling: Duration,
    /// Optional per-attempt timeout. `None` leaves attempts bounded only by
    /// the platform's transport.
    pub load_timeout: Option<Duration>,
    /// Honor the platform's reduced-motion preference.
    pub respect_reduced_motion: bool,
    /// Treat the page as static regardless of the root marker.
    pub force_static: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl OrchestratorConfig {
    /// Creates a configuration with the documented defaults and the given
    /// selection.
    #[must_use]
    pub fn new(selection: Vec<Selector>) -> Self {
        Self {
            selection,
            threshold: 0.1,
            margin: Margin::new(0.0, 0.0, -50.0, 0.0),
            stagger_interval: Duration::from_millis(100),
            connector_delay: Duration::from_millis(150),
            max_retries: 3,
            backoff_base: Duration::from_millis(1_000),
            backoff_ceiling: Duration::from_millis(8_000),
            load_timeout: None,
            respect_reduced_motion: true,
            force_static: false,
        }
    }

    /// Sets the visibility threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the trigger margin.
    #[must_use]
    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }

    /// Sets the stagger interval.
    #[must_use]
    pub fn with_stagger(mut self, interval: Duration) -> Self {
        self.stagger_interval = interval;
        self
    }

    /// Sets the connector sub-delay.
    #[must_use]
    pub fn with_connector_delay(mut self, delay: Duration) -> Self {
        self.connector_delay = delay;
        self
    }

    /// Sets the retry bound and backoff window.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, base: Duration, ceiling: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff_base = base;
        self.backoff_ceiling = ceiling;
        self
    }

    /// Sets the per-attempt load timeout.
    #[must_use]
    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Sets whether the reduced-motion preference is honored.
    #[must_use]
    pub fn with_reduced_motion(mut self, respect: bool) -> Self {
        self.respect_reduced_motion = respect;
        self
    }

    /// Forces static (eager) mode.
    #[must_use]
    pub fn with_static(mut self, force: bool) -> Self {
        self.force_static = force;
        self
    }

    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selection.is_empty() {
            return Err(ConfigError::EmptySelection);
        }
        if let Some(idx) = self
            .selection
            .iter()
            .position(|s| s.pattern.trim().is_empty())
        {
            return Err(ConfigError::BlankSelector(idx));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold));
        }
        if !self.margin.is_finite() {
            return Err(ConfigError::NonFiniteMargin);
        }
        if self.backoff_base.is_zero() {
            return Err(ConfigError::ZeroBackoffBase);
        }
        if self.backoff_ceiling < self.backoff_base {
            return Err(ConfigError::BackoffCeilingBelowBase);
        }
        if self.load_timeout.is_some_and(Duration::is_zero) {
            return Err(ConfigError::ZeroLoadTimeout);
        }
        Ok(())
    }
}

/// Loosely typed per-run overrides, as read from markup or script options.
///
/// Unset fields keep the base configuration's value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Overrides {
    /// Visibility threshold.
    pub threshold: Option<f64>,
    /// Trigger margin.
    pub margin: Option<Margin>,
    /// Stagger interval in milliseconds.
    pub stagger_ms: Option<f64>,
    /// Connector sub-delay in milliseconds.
    pub connector_delay_ms: Option<f64>,
    /// Retry bound.
    pub max_retries: Option<i64>,
    /// Backoff base in milliseconds.
    pub backoff_base_ms: Option<f64>,
    /// Backoff ceiling in milliseconds.
    pub backoff_ceiling_ms: Option<f64>,
    /// Per-attempt timeout in milliseconds.
    pub load_timeout_ms: Option<f64>,
}

impl Overrides {
    /// Applies the overrides on top of `base` and validates the result.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if an override is out of range or the
    /// combined configuration fails [`OrchestratorConfig::validate`].
    pub fn apply(&self, mut base: OrchestratorConfig) -> Result<OrchestratorConfig, ConfigError> {
        if let Some(t) = self.threshold {
            base.threshold = t;
        }
        if let Some(m) = self.margin {
            base.margin = m;
        }
        if let Some(ms) = self.stagger_ms {
            base.stagger_interval = millis("stagger interval", ms)?;
        }
        if let Some(ms) = self.connector_delay_ms {
            base.connector_delay = millis("connector delay", ms)?;
        }
        if let Some(n) = self.max_retries {
            base.max_retries = u32::try_from(n).map_err(|_| ConfigError::NegativeRetries(n))?;
        }
        if let Some(ms) = self.backoff_base_ms {
            base.backoff_base = millis("backoff base", ms)?;
        }
        if let Some(ms) = self.backoff_ceiling_ms {
            base.backoff_ceiling = millis("backoff ceiling", ms)?;
        }
        if let Some(ms) = self.load_timeout_ms {
            base.load_timeout = Some(millis("load timeout", ms)?);
        }
        base.validate()?;
        Ok(base)
    }
}

fn millis(field: &'static str, millis: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_millis_f64(millis).ok_or(ConfigError::NegativeDuration { field, millis })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn base() -> OrchestratorConfig {
        OrchestratorConfig::new(vec![Selector::reveal("[data-reveal]")])
    }

    #[test]
    fn defaults_validate() {
        let config = base();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.stagger_interval, Duration::from_millis(100));
        assert_eq!(config.max_retries, 3);
        assert!(config.respect_reduced_motion, "reduced motion honored by default");
        assert!(!config.force_static, "static mode off by default");
    }

    #[test]
    fn empty_and_blank_selection_rejected() {
        assert_eq!(
            OrchestratorConfig::default().validate(),
            Err(ConfigError::EmptySelection)
        );
        let config = OrchestratorConfig::new(vec![Selector::reveal(".a"), Selector::lazy("  ")]);
        assert_eq!(config.validate(), Err(ConfigError::BlankSelector(1)));
    }

    #[test]
    fn threshold_bounds() {
        assert!(base().with_threshold(0.0).validate().is_ok(), "zero allowed");
        assert!(base().with_threshold(1.0).validate().is_ok(), "one allowed");
        assert_eq!(
            base().with_threshold(1.5).validate(),
            Err(ConfigError::ThresholdOutOfRange(1.5))
        );
        assert!(
            base().with_threshold(f64::NAN).validate().is_err(),
            "NaN threshold rejected"
        );
    }

    #[test]
    fn backoff_window_checked() {
        let config = base().with_retries(2, Duration::from_millis(500), Duration::from_millis(100));
        assert_eq!(config.validate(), Err(ConfigError::BackoffCeilingBelowBase));
        let config = base().with_retries(2, Duration::ZERO, Duration::from_millis(100));
        assert_eq!(config.validate(), Err(ConfigError::ZeroBackoffBase));
        let config = base().with_load_timeout(Some(Duration::ZERO));
        assert_eq!(config.validate(), Err(ConfigError::ZeroLoadTimeout));
    }

    #[test]
    fn negative_stagger_override_fails_fast() {
        let overrides = Overrides {
            stagger_ms: Some(-20.0),
            ..Overrides::default()
        };
        assert_eq!(
            overrides.apply(base()),
            Err(ConfigError::NegativeDuration {
                field: "stagger interval",
                millis: -20.0
            })
        );
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let overrides = Overrides {
            threshold: Some(0.5),
            stagger_ms: Some(40.0),
            max_retries: Some(1),
            load_timeout_ms: Some(2_500.0),
            ..Overrides::default()
        };
        let config = overrides.apply(base()).unwrap();
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.stagger_interval, Duration::from_millis(40));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.load_timeout, Some(Duration::from_millis(2_500)));
        assert_eq!(config.backoff_base, Duration::from_millis(1_000), "untouched");

        let negative = Overrides {
            max_retries: Some(-1),
            ..Overrides::default()
        };
        assert_eq!(negative.apply(base()), Err(ConfigError::NegativeRetries(-1)));
    }

    #[test]
    fn margin_formats_as_css() {
        use alloc::string::ToString;
        assert_eq!(
            Margin::new(0.0, 0.0, -50.0, 0.0).to_string(),
            "0px 0px -50px 0px"
        );
    }
}
