//! Run configuration for deposition jobs
//!
//! Deposition runs are described by small TOML files: a `[density]` table
//! selecting the output resolution and the interpolation scheme, and a
//! bounds file listing the spatial regions to render, either directly as
//! boxes or as balls that expand to periodic-aware bounding boxes. All
//! validation is eager; a configuration that parses is safe to run.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error as ThisError;

use crate::density::{InterpolatorFlag, PointSelector};

/// Error type for reading and validating run configurations
#[derive(Debug, ThisError)]
pub enum ConfigError {
    /// The configuration text is not valid TOML or misses required fields
    #[error("failed to parse configuration")]
    Parse(
        #[source]
        #[from]
        toml::de::Error,
    ),
    /// The interpolator name does not match any deposition strategy
    #[error("unknown interpolator flag `{0}`")]
    UnknownInterpolator(String),
    /// The selector name does not match any point-selector policy
    #[error("unknown point selector `{0}`")]
    UnknownSelector(String),
    /// A scalar run parameter has to be positive
    #[error("need to specify a positive `{0}` for the density run")]
    NonPositiveParameter(&'static str),
    /// A ball region needs a positive radius
    #[error("need to specify a positive radius for ball `{0}`")]
    InvalidRadius(String),
    /// A ball region was given a negative radius multiplier
    #[error("ball `{name}` given a negative radius multiplier, {multiplier}")]
    NegativeRadiusMultiplier { name: String, multiplier: f64 },
    /// A box region needs positive side lengths
    #[error("need to specify a positive {axis} width for box `{name}`")]
    InvalidBoxWidth { axis: char, name: String },
    /// A region origin or center has to lie inside the periodic box
    #[error("{axis} coordinate of `{name}` must be in range [0, {total}), but is {value}")]
    CoordinateOutOfRange {
        axis: char,
        name: String,
        total: f64,
        value: f64,
    },
    /// The projection axis of a box is not one of the coordinate axes
    #[error("projection axis of box `{name}` must be one of [X | Y | Z], `{axis}` is not recognized")]
    InvalidProjectionAxis { name: String, axis: String },
}

/// Parameters of a density deposition run
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DensityConfig {
    pub input: String,
    pub output: String,
    /// Cells per side of the full output grid
    pub total_pixels: i64,
    /// Sample points per tetrahedron for the sampling strategies
    pub particles: i64,
    /// Name of the deposition strategy, see [`InterpolatorFlag`]
    pub interpolator: String,
    /// Name of the point-selector policy, see [`PointSelector`]
    #[serde(default = "default_selector")]
    pub selector: String,
    #[serde(default)]
    pub image_pixels: Option<i64>,
    #[serde(default)]
    pub projection_depth: Option<i64>,
    /// Only deposit every n-th particle per dimension
    #[serde(default = "default_subsample_length")]
    pub subsample_length: i64,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub profile_file: Option<String>,
    #[serde(default)]
    pub prepend_name: Option<String>,
    #[serde(default)]
    pub append_name: Option<String>,
}

fn default_selector() -> String {
    "Flat".to_string()
}

fn default_subsample_length() -> i64 {
    1
}

#[derive(Deserialize)]
struct DensityFile {
    density: DensityConfig,
}

impl DensityConfig {
    /// Parses and validates the `[density]` table of a run configuration
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: DensityFile = toml::from_str(text)?;
        let config = file.density;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.total_pixels <= 0 {
            return Err(ConfigError::NonPositiveParameter("total_pixels"));
        }
        if self.particles <= 0 {
            return Err(ConfigError::NonPositiveParameter("particles"));
        }
        if self.subsample_length <= 0 {
            return Err(ConfigError::NonPositiveParameter("subsample_length"));
        }
        if let Some(image_pixels) = self.image_pixels {
            if image_pixels <= 0 {
                return Err(ConfigError::NonPositiveParameter("image_pixels"));
            }
        }
        if let Some(projection_depth) = self.projection_depth {
            if projection_depth <= 0 {
                return Err(ConfigError::NonPositiveParameter("projection_depth"));
            }
        }
        self.flag()?;
        self.point_selector()?;
        Ok(())
    }

    /// Returns the parsed deposition strategy
    pub fn flag(&self) -> Result<InterpolatorFlag, ConfigError> {
        self.interpolator.parse()
    }

    /// Returns the parsed point-selector policy
    pub fn point_selector(&self) -> Result<PointSelector, ConfigError> {
        self.selector.parse()
    }
}

/// A ball-shaped render region that expands to a bounding box
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BallConfig {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radius: f64,
    #[serde(default)]
    pub radius_multiplier: Option<f64>,
}

/// A box-shaped render region
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoxConfig {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub x_width: f64,
    pub y_width: f64,
    pub z_width: f64,
    /// Collapse the box along this axis when rendering a projection
    #[serde(default)]
    pub projection_axis: Option<String>,
    #[serde(skip)]
    pub name: String,
}

#[derive(Deserialize)]
struct BoundsFile {
    #[serde(default)]
    ball: BTreeMap<String, BallConfig>,
    #[serde(default, rename = "box")]
    boxes: BTreeMap<String, BoxConfig>,
}

impl BallConfig {
    fn check(&self, name: &str, total_width: f64) -> Result<(), ConfigError> {
        if self.radius <= 0.0 {
            return Err(ConfigError::InvalidRadius(name.to_string()));
        }
        if let Some(multiplier) = self.radius_multiplier {
            if multiplier < 0.0 {
                return Err(ConfigError::NegativeRadiusMultiplier {
                    name: name.to_string(),
                    multiplier,
                });
            }
        }
        for (axis, value) in [('x', self.x), ('y', self.y), ('z', self.z)] {
            if value < 0.0 || value >= total_width {
                return Err(ConfigError::CoordinateOutOfRange {
                    axis,
                    name: name.to_string(),
                    total: total_width,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Expands the ball into its bounding box, pulling corners that fall
    /// below the box origin up by one period
    pub fn bounding_box(&self, name: &str, total_width: f64) -> BoxConfig {
        let radius = self.radius * self.radius_multiplier.unwrap_or(1.0);
        let corner = |center: f64| {
            if center > radius {
                center - radius
            } else {
                center - radius + total_width
            }
        };

        BoxConfig {
            x: corner(self.x),
            y: corner(self.y),
            z: corner(self.z),
            x_width: 2.0 * radius,
            y_width: 2.0 * radius,
            z_width: 2.0 * radius,
            projection_axis: None,
            name: name.to_string(),
        }
    }
}

impl BoxConfig {
    fn check(&mut self, name: &str, total_width: f64) -> Result<(), ConfigError> {
        self.name = name.to_string();

        for (axis, width) in [
            ('x', self.x_width),
            ('y', self.y_width),
            ('z', self.z_width),
        ] {
            if width <= 0.0 {
                return Err(ConfigError::InvalidBoxWidth {
                    axis,
                    name: name.to_string(),
                });
            }
        }
        for (axis, value) in [('x', self.x), ('y', self.y), ('z', self.z)] {
            if value < 0.0 || value >= total_width {
                return Err(ConfigError::CoordinateOutOfRange {
                    axis,
                    name: name.to_string(),
                    total: total_width,
                    value,
                });
            }
        }

        if let Some(axis) = &self.projection_axis {
            let upper = axis.to_uppercase();
            if !upper.is_empty() && upper != "X" && upper != "Y" && upper != "Z" {
                return Err(ConfigError::InvalidProjectionAxis {
                    name: name.to_string(),
                    axis: axis.clone(),
                });
            }
            self.projection_axis = if upper.is_empty() { None } else { Some(upper) };
        }
        Ok(())
    }

    /// Returns whether the box renders a projection instead of a cube
    pub fn is_projection(&self) -> bool {
        self.projection_axis.is_some()
    }
}

/// Parses a bounds file and expands every ball into its bounding box
///
/// `total_width` is the physical side length of the periodic box; all
/// regions have to place their origin or center inside it.
pub fn read_bounds_config(text: &str, total_width: f64) -> Result<Vec<BoxConfig>, ConfigError> {
    let file: BoundsFile = toml::from_str(text)?;

    let mut boxes = Vec::new();
    for (name, ball) in &file.ball {
        ball.check(name, total_width)?;
        boxes.push(ball.bounding_box(name, total_width));
    }
    for (name, mut box_config) in file.boxes {
        box_config.check(&name, total_width)?;
        boxes.push(box_config);
    }
    Ok(boxes)
}
