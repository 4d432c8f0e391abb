use std::{collections::HashSet, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Whether higher raw values of a criterion are good or bad for suitability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Benefit,
    Cost,
}

/// One scoring dimension of the criteria matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionSpec {
    /// Short name, e.g. "dni"; the matrix column is `{name}_score`.
    pub name: String,
    pub polarity: Polarity,
    /// Values already lie in [0,1] and skip min-max scaling.
    #[serde(default)]
    pub pre_scaled: bool,
}

impl CriterionSpec {
    fn new(name: &str, polarity: Polarity, pre_scaled: bool) -> Self {
        Self { name: name.to_string(), polarity, pre_scaled }
    }

    /// Column name of this criterion in merged score tables.
    pub fn column(&self) -> String {
        format!("{}_score", self.name)
    }
}

/// Tunables for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub criteria: Vec<CriterionSpec>,
    pub eligible_land_classes: Vec<String>,
    /// Subject rows per pairwise-distance chunk.
    pub chunk_size: usize,
    pub critic_seed: u64,
    pub h_spacing_m: f64,
    pub v_spacing_m: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        use Polarity::{Benefit, Cost};
        Self {
            criteria: vec![
                CriterionSpec::new("dni", Benefit, false),
                CriterionSpec::new("temp", Benefit, false),
                CriterionSpec::new("pvout", Benefit, false),
                CriterionSpec::new("dem", Cost, false),
                CriterionSpec::new("road", Benefit, true),
                CriterionSpec::new("station", Benefit, true),
                CriterionSpec::new("solar", Cost, true),
                CriterionSpec::new("dso", Benefit, true),
                CriterionSpec::new("land", Benefit, true),
            ],
            eligible_land_classes: ["meadow", "grass", "farmland", "scrub", "farmyard", "heath"]
                .into_iter()
                .map(String::from)
                .collect(),
            chunk_size: 10_000,
            critic_seed: 42,
            h_spacing_m: 1000.0,
            v_spacing_m: 1000.0,
        }
    }
}

impl SiteConfig {
    /// Load a config from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("[config] Failed to open config file {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("[config] Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Look up a criterion by its short name.
    pub fn criterion(&self, name: &str) -> Option<&CriterionSpec> {
        self.criteria.iter().find(|c| c.name == name)
    }

    /// Reject malformed tables.
    pub fn validate(&self) -> Result<()> {
        if self.criteria.is_empty() {
            bail!("[config] criteria table is empty");
        }
        let mut seen = HashSet::new();
        for c in &self.criteria {
            if c.name.trim().is_empty() {
                bail!("[config] criterion with empty name");
            }
            if !seen.insert(c.name.as_str()) {
                bail!("[config] duplicate criterion {:?}", c.name);
            }
        }
        if self.chunk_size == 0 {
            bail!("[config] chunk_size must be positive");
        }
        if !(self.h_spacing_m > 0.0 && self.v_spacing_m > 0.0) {
            bail!("[config] grid spacing must be positive (got {} x {})", self.h_spacing_m, self.v_spacing_m);
        }
        Ok(())
    }

    /// Criteria whose scorer inverts closeness and whose normalizer inverts again.
    /// `inverted` lists criteria scored as "farther is better".
    pub fn double_inverted<'a>(&'a self, inverted: &'a [&str]) -> impl Iterator<Item = &'a CriterionSpec> + 'a {
        self.criteria.iter()
            .filter(move |c| c.polarity == Polarity::Cost && inverted.contains(&c.name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        let config = SiteConfig::default();
        config.validate().unwrap();
        assert_eq!(config.criteria.len(), 9);
        assert_eq!(config.criterion("dem").unwrap().polarity, Polarity::Cost);
        assert!(config.criterion("land").unwrap().pre_scaled);
        assert_eq!(config.criterion("dni").unwrap().column(), "dni_score");
    }

    #[test]
    fn duplicate_criterion_rejected() {
        let mut config = SiteConfig::default();
        config.criteria.push(CriterionSpec::new("dni", Polarity::Cost, false));
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "chunk_size": 64, "criteria": [{ "name": "dni", "polarity": "benefit" }] }"#).unwrap();

        let config = SiteConfig::from_json_file(&path).unwrap();
        assert_eq!(config.chunk_size, 64);
        assert_eq!(config.criteria.len(), 1);
        assert!(!config.criteria[0].pre_scaled);
        assert_eq!(config.critic_seed, 42);
        assert_eq!(config.eligible_land_classes.len(), 6);
    }

    #[test]
    fn solar_is_flagged_as_double_inverted() {
        let config = SiteConfig::default();
        let flagged = config.double_inverted(&["solar", "dso"]).map(|c| c.name.as_str()).collect::<Vec<_>>();
        assert_eq!(flagged, vec!["solar"]);
    }
}
