//! Parameter ranges and slider definitions.
//!
//! Each of the four sliders has a fixed range. Values outside it are rejected
//! before they reach the pipeline state; the step is a hint for the slider
//! widget and is not enforced.

use crate::core::error::RangeError;
use crate::core::types::ParameterName;
use serde::{Deserialize, Serialize};

/// Closed numeric range `[min, max]` with an optional slider step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    /// Smallest accepted value.
    pub min: f64,
    /// Largest accepted value.
    pub max: f64,
    /// Slider increment, if the slider snaps.
    pub step: Option<f64>,
}

impl ParameterRange {
    /// Continuous range.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max, step: None }
    }

    /// Range whose slider snaps to multiples of `step`.
    pub const fn stepped(min: f64, max: f64, step: f64) -> Self {
        Self {
            min,
            max,
            step: Some(step),
        }
    }

    /// Check whether a value lies in the range. NaN never does.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check a value, producing a [`RangeError`] naming the parameter.
    pub fn check(&self, name: ParameterName, value: f64) -> Result<(), RangeError> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(RangeError {
                name,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Clamp a value into range, rounding to the step when there is one.
    ///
    /// This is what a slider widget does before calling into the pipeline.
    pub fn snap(&self, value: f64) -> f64 {
        let value = if value.is_nan() { self.min } else { value };
        let value = match self.step {
            Some(step) if step > 0.0 => self.min + ((value - self.min) / step).round() * step,
            _ => value,
        };
        value.clamp(self.min, self.max)
    }
}

/// UI hints for parameter display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "widget", content = "options")]
pub enum UiHint {
    /// Continuous slider.
    Slider,
    /// Slider snapping to a fixed increment.
    SteppedSlider {
        /// Increment between positions.
        step: f64,
    },
}

/// Everything the presentation layer needs to draw one slider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Which slider.
    pub name: ParameterName,
    /// Human-readable label.
    pub display_name: String,
    /// Accepted range.
    pub range: ParameterRange,
    /// Initial slider position.
    pub default_value: f64,
    /// Description for tooltips.
    pub description: String,
    /// Widget hint.
    pub ui_hint: UiHint,
}

impl ParameterDefinition {
    /// Build the definition for a parameter name from its fixed range.
    pub fn new(name: ParameterName) -> Self {
        let range = name.range();
        let ui_hint = match range.step {
            Some(step) => UiHint::SteppedSlider { step },
            None => UiHint::Slider,
        };
        Self {
            name,
            display_name: name.display_name().to_string(),
            range,
            default_value: name.default_value(),
            description: String::new(),
            ui_hint,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
