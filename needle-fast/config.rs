use needle_core::OrbConfig;
use crate::builder::DetectorBuilder;
use crate::error::{FastError, FastResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete detector configuration with all settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorConfig {
    /// Core ORB configuration
    pub core: OrbConfig,
    /// Performance tuning
    pub nms_distance: f32,
    pub subpixel_refinement: bool,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub version: Option<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorConfig {
    /// Create new configuration with default settings
    pub fn new() -> Self {
        Self {
            core: OrbConfig::default(),
            nms_distance: 3.0,
            subpixel_refinement: true,
            name: None,
            description: None,
            version: None,
        }
    }

    /// Few levels and wide suppression, for quick presence checks.
    ///
    /// Presets leave `core.threshold` at its default: the needle pipeline
    /// derives the threshold from the per-call sensitivity.
    pub fn fast_preset() -> Self {
        Self {
            core: OrbConfig {
                patch_size: 15,
                n_levels: 4,
                ..OrbConfig::default()
            },
            nms_distance: 5.0,
            subpixel_refinement: false,
            name: Some("Fast".to_string()),
            description: Some("Optimized for speed with fewer levels and sparser features".to_string()),
            version: Some("1.0".to_string()),
        }
    }

    /// Balanced preset, same as the defaults but labelled
    pub fn balanced_preset() -> Self {
        Self::new().with_metadata("Balanced", "Default trade-off between speed and recall")
    }

    /// More levels and denser keypoints for small or scaled needles
    pub fn precision_preset() -> Self {
        Self {
            core: OrbConfig {
                patch_size: 31,
                n_levels: 10,
                ..OrbConfig::default()
            },
            nms_distance: 2.0,
            subpixel_refinement: true,
            name: Some("Precision".to_string()),
            description: Some("Maximum recall for small or low-contrast targets".to_string()),
            version: Some("1.0".to_string()),
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    /// Convert to DetectorBuilder for further customization
    pub fn to_builder(self) -> DetectorBuilder {
        DetectorBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "DetectorConfig: threshold={}, patch_size={}, threads={}, levels={}, max_keypoints={}, NMS:{:.1}, Subpixel:{}",
            self.core.threshold, self.core.patch_size, self.core.n_threads,
            self.core.n_levels, self.core.max_keypoints,
            self.nms_distance, self.subpixel_refinement
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> FastResult<()> {
        // 0 would admit every pixel, >127 breaks the saturating u8 comparisons
        if self.core.threshold == 0 || self.core.threshold > 127 {
            return Err(FastError::InvalidThreshold(self.core.threshold));
        }
        if self.core.patch_size % 2 == 0 || !(3..=63).contains(&self.core.patch_size) {
            return Err(FastError::InvalidPatchSize(self.core.patch_size));
        }
        if !(1..=16).contains(&self.core.n_levels) {
            return Err(FastError::InvalidLevels(self.core.n_levels));
        }
        if !self.nms_distance.is_finite() || self.nms_distance < 0.0 {
            return Err(FastError::InvalidNmsDistance(self.nms_distance));
        }
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
