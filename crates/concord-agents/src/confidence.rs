//! Confidence calibration.
//!
//! Both strategies are pure functions of `(raw_confidence, context)`, so the
//! same inputs always calibrate to the same output.

use std::sync::Arc;

use concord_models::{CalibrationConfig, CalibrationStrategy};

/// Reference interval a metric is expected to fall in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdealRange {
    pub low: f64,
    pub high: f64,
}

impl IdealRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            low: low.min(high),
            high: low.max(high),
        }
    }

    pub fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Half-open ranges are expressed with infinities.
    pub fn at_least(low: f64) -> Self {
        Self::new(low, f64::INFINITY)
    }

    pub fn at_most(high: f64) -> Self {
        Self::new(f64::NEG_INFINITY, high)
    }

    /// Absolute distance from the range, 0 inside it.
    pub fn distance(&self, value: f64) -> f64 {
        if value < self.low {
            self.low - value
        } else if value > self.high {
            value - self.high
        } else {
            0.0
        }
    }
}

/// Quality signals surrounding an agent's raw confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationContext {
    /// The measured metric the agent's opinion rests on.
    pub metric: Option<f64>,
    pub ideal: Option<IdealRange>,
    /// Distance normalizer: a metric `scale` away from the ideal halves proximity.
    pub scale: f64,
    /// Fraction of expected dataset fields present, 0.0 to 1.0.
    pub completeness: Option<f64>,
    /// Real-world plausible bounds for the metric.
    pub plausible: Option<(f64, f64)>,
    /// Whether a secondary metric agrees. `None` means not available.
    pub corroboration: Option<bool>,
}

impl Default for CalibrationContext {
    fn default() -> Self {
        Self {
            metric: None,
            ideal: None,
            scale: 1.0,
            completeness: None,
            plausible: None,
            corroboration: None,
        }
    }
}

impl CalibrationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metric(mut self, metric: f64, ideal: IdealRange, scale: f64) -> Self {
        self.metric = Some(metric);
        self.ideal = Some(ideal);
        self.scale = scale;
        self
    }

    pub fn with_completeness(mut self, completeness: f64) -> Self {
        self.completeness = Some(completeness);
        self
    }

    pub fn with_plausible(mut self, low: f64, high: f64) -> Self {
        self.plausible = Some((low.min(high), low.max(high)));
        self
    }

    pub fn with_corroboration(mut self, agrees: bool) -> Self {
        self.corroboration = Some(agrees);
        self
    }

    /// Normalized distance of the metric from the ideal, 0 when either is
    /// missing. A non-finite metric is infinitely far from any ideal.
    fn normalized_distance(&self) -> f64 {
        match (self.metric, self.ideal) {
            (Some(metric), Some(_)) if !metric.is_finite() => f64::INFINITY,
            (Some(metric), Some(ideal)) => {
                let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
                ideal.distance(metric) / scale
            }
            _ => 0.0,
        }
    }
}

/// Converts a raw self-reported confidence into a calibrated one in [0, 1].
pub trait ConfidenceCalculator: Send + Sync {
    fn calibrate(&self, raw_confidence: f64, context: &CalibrationContext) -> f64;
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Confidence falls off with normalized distance from the ideal.
///
/// `raw * max_confidence / (1 + distance)`; at the ideal (or with no metric)
/// the result tops out at `max_confidence`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceCalculator {
    pub max_confidence: f64,
}

impl Default for DistanceCalculator {
    fn default() -> Self {
        Self {
            max_confidence: 0.9,
        }
    }
}

impl ConfidenceCalculator for DistanceCalculator {
    fn calibrate(&self, raw_confidence: f64, context: &CalibrationContext) -> f64 {
        let proximity = 1.0 / (1.0 + context.normalized_distance());
        clamp_unit(clamp_unit(raw_confidence) * clamp_unit(self.max_confidence) * proximity)
    }
}

/// Distance score adjusted by completeness, extremity and corroboration,
/// applied in that order and clamped last.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhancedCalculator {
    pub base: DistanceCalculator,
    pub completeness_floor: f64,
    pub extremity_floor: f64,
    pub corroboration_boost: f64,
}

impl Default for EnhancedCalculator {
    fn default() -> Self {
        Self::from_config(&CalibrationConfig::default())
    }
}

impl EnhancedCalculator {
    pub fn from_config(config: &CalibrationConfig) -> Self {
        Self {
            base: DistanceCalculator {
                max_confidence: config.max_confidence,
            },
            completeness_floor: clamp_unit(config.completeness_floor),
            extremity_floor: clamp_unit(config.extremity_floor),
            corroboration_boost: config.corroboration_boost.max(0.0),
        }
    }

    /// `floor` with no data, 1.0 with all of it, linear between.
    fn completeness_multiplier(&self, context: &CalibrationContext) -> f64 {
        let completeness = context.completeness.map_or(1.0, clamp_unit);
        self.completeness_floor + (1.0 - self.completeness_floor) * completeness
    }

    /// 1.0 inside plausible bounds; outside, shrinks with the overshoot
    /// relative to the bounds' width, never below `extremity_floor`.
    fn extremity_multiplier(&self, context: &CalibrationContext) -> f64 {
        let (Some(metric), Some((low, high))) = (context.metric, context.plausible) else {
            return 1.0;
        };
        if !metric.is_finite() {
            return self.extremity_floor;
        }
        let overshoot = IdealRange::new(low, high).distance(metric);
        if overshoot == 0.0 {
            return 1.0;
        }
        let width = (high - low).abs().max(f64::EPSILON);
        (1.0 / (1.0 + overshoot / width)).max(self.extremity_floor)
    }

    fn corroboration_multiplier(&self, context: &CalibrationContext) -> f64 {
        match context.corroboration {
            Some(true) => 1.0 + self.corroboration_boost,
            Some(false) | None => 1.0,
        }
    }
}

impl ConfidenceCalculator for EnhancedCalculator {
    fn calibrate(&self, raw_confidence: f64, context: &CalibrationContext) -> f64 {
        let base = self.base.calibrate(raw_confidence, context);
        let adjusted = base
            * self.completeness_multiplier(context)
            * self.extremity_multiplier(context)
            * self.corroboration_multiplier(context);
        clamp_unit(adjusted)
    }
}

/// Build the configured calibration strategy.
pub fn calculator_from_config(config: &CalibrationConfig) -> Arc<dyn ConfidenceCalculator> {
    match config.strategy {
        CalibrationStrategy::Distance => Arc::new(DistanceCalculator {
            max_confidence: config.max_confidence,
        }),
        CalibrationStrategy::Enhanced => Arc::new(EnhancedCalculator::from_config(config)),
    }
}
