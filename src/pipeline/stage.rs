use std::{collections::BTreeSet, fmt, str::FromStr};

use anyhow::{Result, anyhow, bail};
use serde::Serialize;

use crate::proximity::{Closeness, DistanceMode};

/// One named pipeline stage, in declared execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Grid,
    Centroid,
    Dso,
    Solar,
    Station,
    Road,
    Dni,
    Pvout,
    Temp,
    Dem,
    LandRatio,
    FinalScore,
    McdmScore,
}

/// How a proximity stage measures and scores its facility layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityRule {
    pub id_column: &'static str,
    pub mode: DistanceMode,
    pub closeness: Closeness,
}

impl Stage {
    pub const ALL: [Stage; 13] = [
        Stage::Grid, Stage::Centroid,
        Stage::Dso, Stage::Solar, Stage::Station, Stage::Road,
        Stage::Dni, Stage::Pvout, Stage::Temp, Stage::Dem,
        Stage::LandRatio, Stage::FinalScore, Stage::McdmScore,
    ];

    #[inline] pub fn id(self) -> u8 { self as u8 }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Stage name; also the artifact name of its output.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Grid => "grid",
            Stage::Centroid => "centroid",
            Stage::Dso => "dso",
            Stage::Solar => "solar",
            Stage::Station => "station",
            Stage::Road => "road",
            Stage::Dni => "dni",
            Stage::Pvout => "pvout",
            Stage::Temp => "temp",
            Stage::Dem => "dem",
            Stage::LandRatio => "land_ratio",
            Stage::FinalScore => "final_score",
            Stage::McdmScore => "mcdm_score",
        }
    }

    /// Stages whose outputs this stage reads as required inputs.
    pub fn depends_on(self) -> &'static [Stage] {
        match self {
            Stage::Grid => &[],
            Stage::Centroid => &[Stage::Grid],
            Stage::Dso | Stage::Solar | Stage::Station | Stage::Road => &[Stage::Centroid],
            Stage::Dni | Stage::Pvout | Stage::Temp | Stage::Dem | Stage::LandRatio | Stage::FinalScore => &[Stage::Grid],
            Stage::McdmScore => &[Stage::FinalScore],
        }
    }

    pub fn proximity(self) -> Option<ProximityRule> {
        use Closeness::*;
        let rule = |id_column, mode, closeness| Some(ProximityRule { id_column, mode, closeness });
        match self {
            Stage::Dso => rule("dso_id", DistanceMode::Haversine, NearerIsBetter),
            Stage::Solar => rule("solar_id", DistanceMode::Haversine, FartherIsBetter),
            Stage::Station => rule("station_id", DistanceMode::Haversine, NearerIsBetter),
            Stage::Road => rule("road_id", DistanceMode::Planar, NearerIsBetter),
            _ => None,
        }
    }

    pub fn is_zonal(self) -> bool {
        matches!(self, Stage::Dni | Stage::Pvout | Stage::Temp | Stage::Dem)
    }

    /// Criterion this stage produces, if any.
    pub fn criterion(self) -> Option<&'static str> {
        match self {
            Stage::LandRatio => Some("land"),
            s if s.proximity().is_some() || s.is_zonal() => Some(s.name()),
            _ => None,
        }
    }

    /// Stage producing the named criterion.
    pub fn for_criterion(criterion: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.criterion() == Some(criterion))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    /// Accepts a numeric id or a stage name.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u8>() {
            return Self::from_id(id).ok_or_else(|| anyhow!("unknown step id {id}"));
        }
        Self::ALL.into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("unknown step {s:?}"))
    }
}

/// The stages to evaluate in one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSelection {
    All,
    Only(BTreeSet<Stage>),
}

impl StepSelection {
    /// Parse tokens like `["0", "dni", "11,12"]` or `["all"]`.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let mut stages = BTreeSet::new();
        for token in tokens.iter().flat_map(|t| t.as_ref().split(',')).map(str::trim).filter(|t| !t.is_empty()) {
            if token.eq_ignore_ascii_case("all") {
                return Ok(Self::All);
            }
            stages.insert(token.parse::<Stage>()?);
        }
        if stages.is_empty() {
            bail!("no steps selected");
        }
        Ok(Self::Only(stages))
    }

    pub fn contains(&self, stage: Stage) -> bool {
        match self {
            Self::All => true,
            Self::Only(stages) => stages.contains(&stage),
        }
    }

    /// Selected stages in declared order.
    pub fn stages(&self) -> Vec<Stage> {
        Stage::ALL.into_iter().filter(|&s| self.contains(s)).collect()
    }
}

impl Default for StepSelection {
    fn default() -> Self { Self::All }
}

impl FromStr for StepSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(&[s])
    }
}
