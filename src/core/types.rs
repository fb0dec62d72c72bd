//! Value types that flow through the pipeline.
//!
//! Filter kinds and parameter names are closed enums: the filter menu and the
//! four sliders are fixed, so exhaustive matching catches any kind that the
//! registry or the engine forgets to handle.

use crate::core::error::{InstafilterError, RangeError};
use crate::core::parameter::ParameterRange;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// One of the fixed set of visual effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Crystallize,
    Edges,
    GaussianBlur,
    Pixellate,
    SepiaTone,
    UnsharpMask,
    Vignette,
    HueAdjust,
}

impl FilterKind {
    /// Every filter kind, in filter-menu order.
    pub const ALL: [FilterKind; 8] = [
        FilterKind::Crystallize,
        FilterKind::Edges,
        FilterKind::GaussianBlur,
        FilterKind::Pixellate,
        FilterKind::SepiaTone,
        FilterKind::UnsharpMask,
        FilterKind::Vignette,
        FilterKind::HueAdjust,
    ];

    /// Stable identifier used in config files and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            FilterKind::Crystallize => "crystallize",
            FilterKind::Edges => "edges",
            FilterKind::GaussianBlur => "gaussian_blur",
            FilterKind::Pixellate => "pixellate",
            FilterKind::SepiaTone => "sepia_tone",
            FilterKind::UnsharpMask => "unsharp_mask",
            FilterKind::Vignette => "vignette",
            FilterKind::HueAdjust => "hue_adjust",
        }
    }

    /// Label shown in the filter-selection menu.
    pub fn display_name(&self) -> &'static str {
        match self {
            FilterKind::Crystallize => "Crystallize",
            FilterKind::Edges => "Edges",
            FilterKind::GaussianBlur => "Gaussian Blur",
            FilterKind::Pixellate => "Pixellate",
            FilterKind::SepiaTone => "Sepia Tone",
            FilterKind::UnsharpMask => "Unsharp Mask",
            FilterKind::Vignette => "Vignette",
            FilterKind::HueAdjust => "Hue",
        }
    }

    /// Look up a kind by identifier or menu label, ignoring case.
    pub fn from_id(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL.into_iter().find(|kind| {
            kind.id().eq_ignore_ascii_case(wanted) || kind.display_name().eq_ignore_ascii_case(wanted)
        })
    }
}

impl Default for FilterKind {
    fn default() -> Self {
        FilterKind::SepiaTone
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for FilterKind {
    type Err = InstafilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| InstafilterError::UnknownFilter(s.to_string()))
    }
}

/// Name of one of the four adjustable sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterName {
    Intensity,
    Radius,
    Scale,
    Angle,
}

impl ParameterName {
    /// Every parameter name, in slider order.
    pub const ALL: [ParameterName; 4] = [
        ParameterName::Intensity,
        ParameterName::Radius,
        ParameterName::Scale,
        ParameterName::Angle,
    ];

    /// Stable identifier.
    pub fn id(&self) -> &'static str {
        match self {
            ParameterName::Intensity => "intensity",
            ParameterName::Radius => "radius",
            ParameterName::Scale => "scale",
            ParameterName::Angle => "angle",
        }
    }

    /// Slider label.
    pub fn display_name(&self) -> &'static str {
        match self {
            ParameterName::Intensity => "Intensity",
            ParameterName::Radius => "Radius",
            ParameterName::Scale => "Scale",
            ParameterName::Angle => "Angle",
        }
    }

    /// The fixed range a value for this name must lie in.
    pub fn range(&self) -> ParameterRange {
        match self {
            ParameterName::Intensity => ParameterRange::new(0.0, 1.0),
            ParameterName::Radius => ParameterRange::stepped(0.0, 200.0, 1.0),
            ParameterName::Scale => ParameterRange::stepped(0.0, 10.0, 1.0),
            ParameterName::Angle => ParameterRange::new(0.0, 1.0),
        }
    }

    /// Slider position before the user touches it.
    pub fn default_value(&self) -> f64 {
        match self {
            ParameterName::Intensity => 0.5,
            ParameterName::Radius => 100.0,
            ParameterName::Scale => 5.0,
            ParameterName::Angle => 0.5,
        }
    }

    /// Look up a name by identifier, ignoring case.
    pub fn from_id(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL.into_iter().find(|p| p.id().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The four slider values.
///
/// All four slots are always present. Which of them actually reach the
/// engine is decided by the registry for the current filter kind, so a
/// value set while one filter is active survives switching to a filter
/// that ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    pub intensity: f64,
    pub radius: f64,
    pub scale: f64,
    pub angle: f64,
}

impl ParameterSet {
    /// Get the value stored for a name.
    pub fn get(&self, name: ParameterName) -> f64 {
        match name {
            ParameterName::Intensity => self.intensity,
            ParameterName::Radius => self.radius,
            ParameterName::Scale => self.scale,
            ParameterName::Angle => self.angle,
        }
    }

    /// Store a value after checking it against the name's range.
    ///
    /// On error the set is left untouched.
    pub fn set(&mut self, name: ParameterName, value: f64) -> Result<(), RangeError> {
        name.range().check(name, value)?;
        *self.slot_mut(name) = value;
        Ok(())
    }

    /// Check every slot against its range.
    pub fn validate(&self) -> Result<(), RangeError> {
        ParameterName::ALL
            .into_iter()
            .try_for_each(|name| name.range().check(name, self.get(name)))
    }

    /// Iterate over `(name, value)` pairs in slider order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterName, f64)> + '_ {
        ParameterName::ALL.into_iter().map(move |name| (name, self.get(name)))
    }

    fn slot_mut(&mut self, name: ParameterName) -> &mut f64 {
        match name {
            ParameterName::Intensity => &mut self.intensity,
            ParameterName::Radius => &mut self.radius,
            ParameterName::Scale => &mut self.scale,
            ParameterName::Angle => &mut self.angle,
        }
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            intensity: ParameterName::Intensity.default_value(),
            radius: ParameterName::Radius.default_value(),
            scale: ParameterName::Scale.default_value(),
            angle: ParameterName::Angle.default_value(),
        }
    }
}

/// The parameters actually handed to the engine for one filter kind.
///
/// Produced by [`FilterRegistry::bind`](crate::filters::FilterRegistry::bind);
/// only names the kind accepts are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParameters {
    values: Vec<(ParameterName, f64)>,
}

impl BoundParameters {
    /// Create an empty binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a value.
    pub fn insert(&mut self, name: ParameterName, value: f64) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Get a bound value.
    pub fn get(&self, name: ParameterName) -> Option<f64> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Get a bound value or the engine's own default.
    pub fn get_or(&self, name: ParameterName, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    /// Check whether a name is bound.
    pub fn contains(&self, name: ParameterName) -> bool {
        self.get(name).is_some()
    }

    /// Names that are bound, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = ParameterName> + '_ {
        self.values.iter().map(|(n, _)| *n)
    }

    /// Number of bound values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A decoded raster supplied by the image picker.
///
/// The pixel data is shared behind an `Arc`, so handing a source to a
/// background render is a reference-count bump, not a copy.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: Arc<DynamicImage>,
    format: Option<image::ImageFormat>,
}

impl SourceImage {
    /// Wrap an already decoded image.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
            format: None,
        }
    }

    /// Record the container format the bytes were decoded from.
    pub fn with_format(mut self, format: image::ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Get the pixel data.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Get the format the image was decoded from, if known.
    pub fn format(&self) -> Option<image::ImageFormat> {
        self.format
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Result of the last successful render.
///
/// Equality compares pixels only: two renders of the same state at
/// different generations are equal.
#[derive(Debug, Clone)]
pub struct OutputImage {
    image: Arc<DynamicImage>,
    kind: FilterKind,
    generation: u64,
}

impl OutputImage {
    /// Wrap a rendered image.
    pub fn new(image: DynamicImage, kind: FilterKind, generation: u64) -> Self {
        Self {
            image: Arc::new(image),
            kind,
            generation,
        }
    }

    /// Get the pixel data.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// The filter that produced this image.
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// The render generation that produced this image.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl PartialEq for OutputImage {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
            || (self.image.color() == other.image.color()
                && self.image.width() == other.image.width()
                && self.image.height() == other.image.height()
                && self.image.as_bytes() == other.image.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_kind_default_is_sepia() {
        assert_eq!(FilterKind::default(), FilterKind::SepiaTone);
    }

    #[test]
    fn test_filter_kind_lookup() {
        assert_eq!(FilterKind::from_id("pixellate"), Some(FilterKind::Pixellate));
        assert_eq!(FilterKind::from_id("Gaussian Blur"), Some(FilterKind::GaussianBlur));
        assert_eq!(FilterKind::from_id("HUE"), Some(FilterKind::HueAdjust));
        assert_eq!(FilterKind::from_id("posterize"), None);
        assert!("posterize".parse::<FilterKind>().is_err());
    }

    #[test]
    fn test_parameter_defaults() {
        let params = ParameterSet::default();
        assert_eq!(params.intensity, 0.5);
        assert_eq!(params.radius, 100.0);
        assert_eq!(params.scale, 5.0);
        assert_eq!(params.angle, 0.5);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_parameter_set_rejects_out_of_range() {
        let mut params = ParameterSet::default();
        let err = params.set(ParameterName::Radius, 250.0).unwrap_err();
        assert_eq!(err.name, ParameterName::Radius);
        assert_eq!(params, ParameterSet::default());

        assert!(params.set(ParameterName::Intensity, f64::NAN).is_err());
        assert!(params.set(ParameterName::Scale, -1.0).is_err());
        assert!(params.set(ParameterName::Angle, 1.0).is_ok());
        assert_eq!(params.angle, 1.0);
    }

    #[test]
    fn test_bound_parameters_replace() {
        let mut bound = BoundParameters::new();
        bound.insert(ParameterName::Scale, 3.0);
        bound.insert(ParameterName::Scale, 4.0);
        assert_eq!(bound.len(), 1);
        assert_eq!(bound.get(ParameterName::Scale), Some(4.0));
        assert_eq!(bound.get_or(ParameterName::Radius, 10.0), 10.0);
    }

    #[test]
    fn test_output_equality_ignores_generation() {
        let pixels = image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]));
        let a = OutputImage::new(DynamicImage::ImageRgba8(pixels.clone()), FilterKind::Edges, 1);
        let b = OutputImage::new(DynamicImage::ImageRgba8(pixels), FilterKind::Edges, 2);
        assert_eq!(a, b);
    }
}
