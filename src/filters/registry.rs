//! Filter registry: which parameters each filter kind accepts.
//!
//! The engine silently ignores values it does not understand, so the pipeline
//! never relies on that. Every render goes through [`FilterRegistry::bind`],
//! which drops every slider the current kind does not accept.

use crate::core::parameter::ParameterDefinition;
use crate::core::types::{BoundParameters, FilterKind, ParameterName, ParameterSet};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Category for grouping filters in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Blur effects
    Blur,
    /// Sharpening effects
    Sharpen,
    /// Edge detection
    Edge,
    /// Color manipulation
    Color,
    /// Stylizing effects (cells, blocks, vignettes)
    Stylize,
}

impl Category {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Blur => "Blur",
            Category::Sharpen => "Sharpen",
            Category::Edge => "Edge",
            Category::Color => "Color",
            Category::Stylize => "Stylize",
        }
    }
}

/// Registry entry describing one filter kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDescriptor {
    /// The kind described.
    pub kind: FilterKind,
    /// Menu label.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Menu grouping.
    pub category: Category,
    /// Sliders this kind accepts, in slider order.
    pub parameters: Vec<ParameterDefinition>,
}

impl FilterDescriptor {
    /// Start describing a filter kind.
    pub fn builder(kind: FilterKind) -> DescriptorBuilder {
        DescriptorBuilder {
            descriptor: FilterDescriptor {
                kind,
                name: kind.display_name().to_string(),
                description: String::new(),
                category: Category::Stylize,
                parameters: Vec::new(),
            },
        }
    }

    /// Check whether this kind accepts a parameter.
    pub fn accepts(&self, name: ParameterName) -> bool {
        self.parameters.iter().any(|p| p.name == name)
    }

    /// Names of the accepted parameters.
    pub fn accepted(&self) -> impl Iterator<Item = ParameterName> + '_ {
        self.parameters.iter().map(|p| p.name)
    }
}

/// Builder for [`FilterDescriptor`].
pub struct DescriptorBuilder {
    descriptor: FilterDescriptor,
}

impl DescriptorBuilder {
    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = description.into();
        self
    }

    /// Set the category.
    pub fn category(mut self, category: Category) -> Self {
        self.descriptor.category = category;
        self
    }

    /// Declare an accepted parameter.
    pub fn accepts(mut self, name: ParameterName, description: impl Into<String>) -> Self {
        if !self.descriptor.accepts(name) {
            self.descriptor
                .parameters
                .push(ParameterDefinition::new(name).with_description(description));
            self.descriptor.parameters.sort_by_key(|p| p.name);
        }
        self
    }

    /// Finish the descriptor.
    pub fn build(self) -> FilterDescriptor {
        self.descriptor
    }
}

/// Registry of every filter kind and the parameters it accepts.
///
/// The registry is always fully populated with the built-in descriptors,
/// which keeps [`parameters_accepted`](Self::parameters_accepted) total.
#[derive(Debug, Clone)]
pub struct FilterRegistry {
    /// Descriptors in menu order.
    filters: IndexMap<FilterKind, FilterDescriptor>,
}

impl FilterRegistry {
    /// Create the registry with every built-in filter.
    pub fn new() -> Self {
        let mut registry = Self {
            filters: IndexMap::new(),
        };

        crate::filters::builtin::register_all(&mut registry);

        // Menu order follows FilterKind::ALL regardless of registration order
        registry.filters.sort_keys();
        registry
    }

    /// Register (or replace) a descriptor.
    pub fn register(&mut self, descriptor: FilterDescriptor) {
        self.filters.insert(descriptor.kind, descriptor);
    }

    /// Parameters the engine accepts for a kind.
    pub fn parameters_accepted(&self, kind: FilterKind) -> Vec<ParameterName> {
        self.filters
            .get(&kind)
            .map(|d| d.accepted().collect())
            .unwrap_or_default()
    }

    /// Check whether a kind accepts a parameter.
    pub fn accepts(&self, kind: FilterKind, name: ParameterName) -> bool {
        self.filters.get(&kind).is_some_and(|d| d.accepts(name))
    }

    /// Keep only the slider values the kind accepts.
    pub fn bind(&self, kind: FilterKind, parameters: &ParameterSet) -> BoundParameters {
        let mut bound = BoundParameters::new();
        for (name, value) in parameters.iter() {
            if self.accepts(kind, name) {
                bound.insert(name, value);
            }
        }
        bound
    }

    /// Get the descriptor for a kind.
    pub fn descriptor(&self, kind: FilterKind) -> Option<&FilterDescriptor> {
        self.filters.get(&kind)
    }

    /// Find a kind by id or menu label.
    pub fn lookup(&self, name: &str) -> Option<&FilterDescriptor> {
        FilterKind::from_id(name).and_then(|kind| self.filters.get(&kind))
    }

    /// Descriptors in menu order.
    pub fn menu(&self) -> impl Iterator<Item = &FilterDescriptor> {
        self.filters.values()
    }

    /// Descriptors grouped by category for UI display.
    pub fn grouped_by_category(&self) -> IndexMap<Category, Vec<&FilterDescriptor>> {
        let mut grouped: IndexMap<Category, Vec<&FilterDescriptor>> = IndexMap::new();
        for descriptor in self.filters.values() {
            grouped.entry(descriptor.category).or_default().push(descriptor);
        }
        grouped
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
