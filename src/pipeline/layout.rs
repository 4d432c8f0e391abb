use std::path::{Path, PathBuf};

use crate::pipeline::Stage;

/// Artifact paths of one region.
///
/// Inputs live under `{root}/extraction/{region}/`, outputs under
/// `{root}/score/{region}/`, so regions never share a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLayout {
    root: PathBuf,
    region: String,
}

impl RegionLayout {
    pub fn new(root: impl Into<PathBuf>, region: impl Into<String>) -> Self {
        Self { root: root.into(), region: region.into() }
    }

    #[inline] pub fn region(&self) -> &str { &self.region }

    #[inline] pub fn root(&self) -> &Path { &self.root }

    pub fn extraction_dir(&self) -> PathBuf {
        self.root.join("extraction").join(&self.region)
    }

    pub fn score_dir(&self) -> PathBuf {
        self.root.join("score").join(&self.region)
    }

    pub fn boundary(&self) -> PathBuf {
        self.extraction_dir().join(format!("boundary_{}.geojson", self.region))
    }

    /// Point layer of one facility kind, e.g. `dso`.
    pub fn facilities(&self, kind: &str) -> PathBuf {
        self.extraction_dir().join(format!("{kind}_facilities_{}.geojson", self.region))
    }

    /// ESRI ASCII grid of one raster criterion, e.g. `dni`.
    pub fn raster(&self, criterion: &str) -> PathBuf {
        self.extraction_dir().join(format!("{criterion}_raster_{}.asc", self.region))
    }

    pub fn land_use(&self) -> PathBuf {
        self.extraction_dir().join(format!("land_use_{}.geojson", self.region))
    }

    /// Output artifact `{name}_{region}.geojson`.
    pub fn artifact(&self, name: &str) -> PathBuf {
        self.score_dir().join(format!("{name}_{}.geojson", self.region))
    }

    pub fn ranking_csv(&self) -> PathBuf {
        self.score_dir().join(format!("ranking_{}.csv", self.region))
    }

    pub fn stage_output(&self, stage: Stage) -> PathBuf {
        self.artifact(stage.name())
    }

    /// Files a stage requires before it may run: upstream artifacts first,
    /// then its own extraction inputs.
    pub fn stage_inputs(&self, stage: Stage) -> Vec<PathBuf> {
        let mut inputs = stage.depends_on().iter().map(|&s| self.stage_output(s)).collect::<Vec<_>>();
        match stage {
            Stage::Grid => inputs.push(self.boundary()),
            Stage::LandRatio => inputs.push(self.land_use()),
            s if s.proximity().is_some() => inputs.push(self.facilities(s.name())),
            s if s.is_zonal() => inputs.push(self.raster(s.name())),
            _ => {}
        }
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_partitioned_by_region() {
        let layout = RegionLayout::new("/data", "opole");
        assert_eq!(layout.stage_output(Stage::Dso), PathBuf::from("/data/score/opole/dso_opole.geojson"));
        assert_eq!(layout.ranking_csv(), PathBuf::from("/data/score/opole/ranking_opole.csv"));
        assert_eq!(
            layout.stage_inputs(Stage::Solar),
            vec![
                PathBuf::from("/data/score/opole/centroid_opole.geojson"),
                PathBuf::from("/data/extraction/opole/solar_facilities_opole.geojson"),
            ]
        );
        assert_eq!(
            layout.stage_inputs(Stage::Temp)[1],
            PathBuf::from("/data/extraction/opole/temp_raster_opole.asc")
        );
        assert_eq!(layout.stage_inputs(Stage::FinalScore), vec![layout.stage_output(Stage::Grid)]);
    }
}
