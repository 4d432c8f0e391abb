use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    common::sha256_file,
    pipeline::{RegionLayout, Stage},
};

/// State of one stage's output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub stage: Stage,
    pub id: u8,
    pub path: PathBuf,
    pub sha256: Option<String>,
}

impl ArtifactStatus {
    #[inline] pub fn is_complete(&self) -> bool { self.sha256.is_some() }
}

/// Completion state of a region, derived purely from which output
/// artifacts exist. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionManifest {
    pub region: String,
    pub artifacts: Vec<ArtifactStatus>,
}

impl RegionManifest {
    pub fn scan(layout: &RegionLayout) -> Result<Self> {
        let artifacts = Stage::ALL.into_iter().map(|stage| {
            let path = layout.stage_output(stage);
            let sha256 = if path.is_file() { Some(sha256_file(&path)?) } else { None };
            Ok(ArtifactStatus { stage, id: stage.id(), path, sha256 })
        }).collect::<Result<Vec<_>>>()?;
        Ok(Self { region: layout.region().to_string(), artifacts })
    }

    /// Stages whose output artifact exists, in declared order.
    pub fn completed(&self) -> Vec<Stage> {
        self.artifacts.iter().filter(|a| a.is_complete()).map(|a| a.stage).collect()
    }

    pub fn is_complete(&self, stage: Stage) -> bool {
        self.artifacts.iter().any(|a| a.stage == stage && a.is_complete())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("[pipeline::manifest] Failed to serialize manifest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_set_follows_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RegionLayout::new(dir.path(), "r");
        std::fs::create_dir_all(layout.score_dir()).unwrap();
        std::fs::write(layout.stage_output(Stage::Grid), b"{}").unwrap();
        std::fs::write(layout.stage_output(Stage::Dni), b"{}").unwrap();

        let manifest = RegionManifest::scan(&layout).unwrap();
        assert_eq!(manifest.completed(), vec![Stage::Grid, Stage::Dni]);
        assert!(manifest.is_complete(Stage::Dni));
        assert!(!manifest.is_complete(Stage::Centroid));
        assert_eq!(manifest.artifacts.len(), Stage::ALL.len());

        let json = manifest.to_json().unwrap();
        assert!(json.contains("\"stage\": \"dni\""));
        assert!(json.contains("44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"));
    }
}
