use crate::core::forcefield::params::{CombiningRule, CoulombMethod, NonbondedSettings};
use crate::core::topology::DEFAULT_MAX_COVALENT_ORDER;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid configuration in '{path}': {source}")]
    Invalid { path: String, source: ConfigError },
}

/// Neighbor-list geometry and exclusion policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NeighborListConfig {
    /// Interaction cutoff in nm.
    pub cutoff: f64,
    /// Verlet buffer added to the cutoff when building the pair list.
    #[serde(default = "default_skin")]
    pub skin: f64,
    /// Pair buffer capacity relative to the count found at allocation.
    #[serde(default = "default_capacity_padding")]
    pub capacity_padding: f64,
    /// Covalently connected pairs below this order never enter the pair list.
    #[serde(default = "default_min_covalent_order")]
    pub min_covalent_order: u8,
}

fn default_skin() -> f64 {
    0.0
}
fn default_capacity_padding() -> f64 {
    1.3
}
fn default_min_covalent_order() -> u8 {
    3
}
fn default_max_covalent_order() -> u8 {
    DEFAULT_MAX_COVALENT_ORDER
}

impl NeighborListConfig {
    pub fn new(cutoff: f64) -> Self {
        Self {
            cutoff,
            skin: default_skin(),
            capacity_padding: default_capacity_padding(),
            min_covalent_order: default_min_covalent_order(),
        }
    }

    /// Radius within which pairs are stored: cutoff plus skin.
    #[inline]
    pub fn list_cutoff(&self) -> f64 {
        self.cutoff + self.skin
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cutoff.is_finite() && self.cutoff > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "cutoff",
                reason: format!("must be positive and finite, got {}", self.cutoff),
            });
        }
        if !(self.skin.is_finite() && self.skin >= 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "skin",
                reason: format!("must be non-negative, got {}", self.skin),
            });
        }
        if !(self.capacity_padding.is_finite() && self.capacity_padding >= 1.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "capacity_padding",
                reason: format!("must be at least 1, got {}", self.capacity_padding),
            });
        }
        Ok(())
    }
}

/// Full engine configuration: exclusions, neighbor list and nonbonded treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EngineConfig {
    /// Bond-graph radius tracked by the covalent map.
    #[serde(default = "default_max_covalent_order")]
    pub max_covalent_order: u8,
    pub neighbor_list: NeighborListConfig,
    #[serde(default)]
    pub nonbonded: NonbondedSettings,
}

impl EngineConfig {
    pub fn new(cutoff: f64) -> Self {
        Self {
            max_covalent_order: default_max_covalent_order(),
            neighbor_list: NeighborListConfig::new(cutoff),
            nonbonded: NonbondedSettings::default(),
        }
    }

    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    #[inline]
    pub fn cutoff(&self) -> f64 {
        self.neighbor_list.cutoff
    }

    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigLoadError::Toml { source, .. } => ConfigLoadError::Toml {
                path: path.to_string_lossy().to_string(),
                source,
            },
            ConfigLoadError::Invalid { source, .. } => ConfigLoadError::Invalid {
                path: path.to_string_lossy().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigLoadError::Toml {
            path: "<string>".to_string(),
            source: e,
        })?;
        config.validate().map_err(|e| ConfigLoadError::Invalid {
            path: "<string>".to_string(),
            source: e,
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.neighbor_list.validate()?;
        if usize::from(self.neighbor_list.min_covalent_order)
            > usize::from(self.max_covalent_order) + 1
        {
            return Err(ConfigError::InvalidValue {
                parameter: "min_covalent_order",
                reason: format!(
                    "{} exceeds the tracked covalent radius {} by more than one",
                    self.neighbor_list.min_covalent_order, self.max_covalent_order
                ),
            });
        }

        let nb = &self.nonbonded;
        let scale_tables = [
            ("lj_scales", &nb.lj_scales),
            ("coulomb_scales", &nb.coulomb_scales),
        ];
        for (parameter, scales) in scale_tables {
            if scales.len() > usize::from(self.max_covalent_order) {
                return Err(ConfigError::InvalidValue {
                    parameter,
                    reason: format!(
                        "{} factors given but the covalent map only tracks orders up to {}",
                        scales.len(),
                        self.max_covalent_order
                    ),
                });
            }
            if scales.iter().any(|s| !s.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    parameter,
                    reason: "scale factors must be finite".to_string(),
                });
            }
        }

        if let Some(r_on) = nb.switch_distance {
            if !(r_on.is_finite() && r_on >= 0.0 && r_on < self.cutoff()) {
                return Err(ConfigError::InvalidValue {
                    parameter: "switch_distance",
                    reason: format!(
                        "must lie in [0, cutoff = {}), got {}",
                        self.cutoff(),
                        r_on
                    ),
                });
            }
        }

        if let CoulombMethod::ReactionField { dielectric } = nb.coulomb_method {
            if !(dielectric.is_finite() && dielectric >= 1.0) {
                return Err(ConfigError::InvalidValue {
                    parameter: "dielectric",
                    reason: format!("must be at least 1, got {dielectric}"),
                });
            }
        }

        if !(nb.coulomb_constant.is_finite() && nb.coulomb_constant > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "coulomb_constant",
                reason: format!("must be positive, got {}", nb.coulomb_constant),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct EngineConfigBuilder {
    cutoff: Option<f64>,
    skin: Option<f64>,
    capacity_padding: Option<f64>,
    min_covalent_order: Option<u8>,
    max_covalent_order: Option<u8>,
    combining_rule: Option<CombiningRule>,
    lj_scales: Option<Vec<f64>>,
    coulomb_scales: Option<Vec<f64>>,
    coulomb_method: Option<CoulombMethod>,
    switch_distance: Option<f64>,
    coulomb_constant: Option<f64>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn skin(mut self, skin: f64) -> Self {
        self.skin = Some(skin);
        self
    }
    pub fn capacity_padding(mut self, padding: f64) -> Self {
        self.capacity_padding = Some(padding);
        self
    }
    pub fn min_covalent_order(mut self, order: u8) -> Self {
        self.min_covalent_order = Some(order);
        self
    }
    pub fn max_covalent_order(mut self, order: u8) -> Self {
        self.max_covalent_order = Some(order);
        self
    }
    pub fn combining_rule(mut self, rule: CombiningRule) -> Self {
        self.combining_rule = Some(rule);
        self
    }
    pub fn lj_scales(mut self, scales: Vec<f64>) -> Self {
        self.lj_scales = Some(scales);
        self
    }
    pub fn coulomb_scales(mut self, scales: Vec<f64>) -> Self {
        self.coulomb_scales = Some(scales);
        self
    }
    pub fn coulomb_method(mut self, method: CoulombMethod) -> Self {
        self.coulomb_method = Some(method);
        self
    }
    pub fn switch_distance(mut self, distance: f64) -> Self {
        self.switch_distance = Some(distance);
        self
    }
    pub fn coulomb_constant(mut self, constant: f64) -> Self {
        self.coulomb_constant = Some(constant);
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let cutoff = self
            .cutoff
            .ok_or(ConfigError::MissingParameter("cutoff"))?;
        let mut config = EngineConfig::new(cutoff);

        let nl = &mut config.neighbor_list;
        if let Some(skin) = self.skin {
            nl.skin = skin;
        }
        if let Some(padding) = self.capacity_padding {
            nl.capacity_padding = padding;
        }
        if let Some(order) = self.min_covalent_order {
            nl.min_covalent_order = order;
        }
        if let Some(order) = self.max_covalent_order {
            config.max_covalent_order = order;
        }

        let nb = &mut config.nonbonded;
        if let Some(rule) = self.combining_rule {
            nb.combining_rule = rule;
        }
        if let Some(scales) = self.lj_scales {
            nb.lj_scales = scales;
        }
        if let Some(scales) = self.coulomb_scales {
            nb.coulomb_scales = scales;
        }
        if let Some(method) = self.coulomb_method {
            nb.coulomb_method = method;
        }
        nb.switch_distance = self.switch_distance;
        if let Some(constant) = self.coulomb_constant {
            nb.coulomb_constant = constant;
        }

        config.validate()?;
        Ok(config)
    }
}
