use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Feature scoring method used by `TextClassifier::train`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// max-over-classes chi-square
    #[default]
    ChiSquare,
    /// Scalable Term Selection
    ScalableTermSelection,
}

/// Tuning knobs of the STS lambda search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StsConfig {
    /// stop once |AVL - target AVL| drops below this
    pub tolerance: f64,
    /// stop once the lambda bracket is narrower than this
    pub min_bracket: f64,
    pub max_iterations: usize,
}

impl Default for StsConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            min_bracket: 1e-13,
            max_iterations: 64,
        }
    }
}

/// Parameters of the built-in logistic regression backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    /// cost of constraint violation (C)
    pub cost: f64,
    /// relative gradient-norm stopping tolerance
    pub eps: f64,
    pub max_iterations: usize,
    /// value of the synthetic bias feature, `<= 0` disables it
    pub bias: f64,
}

impl Default for LinearParams {
    fn default() -> Self {
        Self {
            cost: 10.0,
            eps: 0.01,
            max_iterations: 1000,
            bias: 1.0,
        }
    }
}

/// Classifier configuration
///
/// Every field has a default, so a TOML document only needs to name what it changes:
///
/// ```
/// use text_classifier::ClassifierConfig;
/// let config = ClassifierConfig::from_toml_str("num_classes = 4\nmax_features = 200").unwrap();
/// assert_eq!(config.num_classes, 4);
/// assert_eq!(config.max_features, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub num_classes: usize,
    /// K, the number of features kept by selection
    pub max_features: usize,
    pub selection: SelectionMethod,
    /// terms whose name is longer than this (in chars) are never selected
    pub max_term_len: usize,
    /// directory for the training cache, OS temp dir when unset
    pub cache_dir: Option<PathBuf>,
    pub sts: StsConfig,
    pub solver: LinearParams,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            num_classes: 2,
            max_features: 5000,
            selection: SelectionMethod::ChiSquare,
            max_term_len: 50,
            cache_dir: None,
            sts: StsConfig::default(),
            solver: LinearParams::default(),
        }
    }
}

impl ClassifierConfig {
    /// Create a default configuration for `num_classes` classes
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject configurations no training run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(Error::Config("num_classes must be at least 1".into()));
        }
        if self.max_features == 0 {
            return Err(Error::Config("max_features must be at least 1".into()));
        }
        if !(self.solver.cost > 0.0) || !(self.solver.eps > 0.0) {
            return Err(Error::Config("solver cost and eps must be positive".into()));
        }
        Ok(())
    }

    /// Directory the training cache is created in
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = ClassifierConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClassifierConfig::default());
    }

    #[test]
    fn nested_tables_override_selected_fields() {
        let s = r#"
            num_classes = 3
            selection = "scalable_term_selection"

            [sts]
            tolerance = 0.5

            [solver]
            cost = 2.0
        "#;
        let config = ClassifierConfig::from_toml_str(s).unwrap();
        assert_eq!(config.num_classes, 3);
        assert_eq!(config.selection, SelectionMethod::ScalableTermSelection);
        assert_eq!(config.sts.tolerance, 0.5);
        assert_eq!(config.sts.min_bracket, 1e-13);
        assert_eq!(config.solver.cost, 2.0);
        assert_eq!(config.solver.bias, 1.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            ClassifierConfig::from_toml_str("num_classes = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ClassifierConfig::from_toml_str("[solver]\ncost = -1.0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ClassifierConfig::from_toml_str("num_classes = \"two\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = ClassifierConfig::new(5);
        config.max_features = 42;
        let s = config.to_toml_string().unwrap();
        assert_eq!(ClassifierConfig::from_toml_str(&s).unwrap(), config);
    }
}
