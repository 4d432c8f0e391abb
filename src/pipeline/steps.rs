use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use chrono::{SecondsFormat, Utc};
use geo::{BooleanOps, Geometry, MultiPolygon};
use polars::prelude::{Column, DataFrame};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    common,
    config::SiteConfig,
    error::ScoreError,
    geom::{GeometryBackend, LandFeature, LandFragment, ZonalResult},
    mcdm::{CriteriaMatrix, critic_weights, normalize, rank_topsis},
    pipeline::{RegionLayout, RunReport, Stage, StepPlan, StepSelection, run_steps},
    proximity::{Closeness, ProximityScorer},
    records::{Cell, Centroid, Record, SpatialRecordSet},
    score::{CriteriaColumn, adapt_zonal, aggregate_land, land_column, merge_scores},
};

/// All stages of one region, bound to a geometry backend.
pub struct Pipeline<'a, B: GeometryBackend> {
    layout: RegionLayout,
    config: SiteConfig,
    backend: &'a B,
    /// RFC 3339 timestamp stamped on every artifact of this run.
    created: String,
}

impl<'a, B: GeometryBackend> Pipeline<'a, B> {
    pub fn new(layout: RegionLayout, config: SiteConfig, backend: &'a B) -> Self {
        Self {
            layout,
            config,
            backend,
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Override the `created` stamp.
    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.created = created.into();
        self
    }

    #[inline] pub fn layout(&self) -> &RegionLayout { &self.layout }

    #[inline] pub fn config(&self) -> &SiteConfig { &self.config }

    /// Plans of the selected stages, in declared order.
    pub fn plans(&self, selection: &StepSelection) -> Vec<StepPlan> {
        selection.stages().into_iter()
            .map(|stage| StepPlan {
                stage,
                inputs: self.layout.stage_inputs(stage),
                output: self.layout.stage_output(stage),
            })
            .collect()
    }

    pub fn run(&self, selection: &StepSelection, force: bool) -> Result<RunReport> {
        self.config.validate()?;

        let inverted = Stage::ALL.into_iter()
            .filter(|s| s.proximity().is_some_and(|r| r.closeness == Closeness::FartherIsBetter))
            .map(Stage::name)
            .collect::<Vec<_>>();
        for spec in self.config.double_inverted(&inverted) {
            warn!(criterion = %spec.name, "scored farther-is-better and declared cost; it is inverted twice");
        }

        info!(region = self.layout.region(), force, steps = ?selection.stages(), "starting run");
        run_steps(self.layout.region(), &self.plans(selection), force, |plan| self.execute(plan.stage))
    }

    fn execute(&self, stage: Stage) -> Result<()> {
        match stage {
            Stage::Grid => self.grid(),
            Stage::Centroid => self.centroids(),
            Stage::LandRatio => self.land_ratio(),
            Stage::FinalScore => self.final_score(),
            Stage::McdmScore => self.mcdm_score(),
            s if s.is_zonal() => self.zonal(s),
            s => self.proximity(s),
        }
    }

    fn write(&self, stage: Stage, records: Vec<Record>) -> Result<()> {
        let mut set = SpatialRecordSet::new(stage.name(), records);
        set.stamp(self.layout.region(), &self.created);
        set.write_geojson(&self.layout.stage_output(stage))
    }

    fn read_artifact(&self, stage: Stage) -> Result<SpatialRecordSet> {
        let set = SpatialRecordSet::read_geojson(&self.layout.stage_output(stage), stage.name(), Some("cell_id"))?;
        set.require_non_empty()?;
        Ok(set)
    }

    fn read_cells(&self) -> Result<Vec<Cell>> {
        Cell::from_records(&self.read_artifact(Stage::Grid)?)
    }

    fn grid(&self) -> Result<()> {
        let set = SpatialRecordSet::read_geojson(&self.layout.boundary(), "boundary", None)?;
        set.require_non_empty()?;

        let boundary = set.iter()
            .filter_map(|r| match &r.geometry {
                Some(Geometry::Polygon(p)) => Some(MultiPolygon(vec![p.clone()])),
                Some(Geometry::MultiPolygon(mp)) => Some(mp.clone()),
                _ => None,
            })
            .reduce(|a, b| a.union(&b))
            .ok_or_else(|| ScoreError::schema("boundary", "geometry"))?;

        let region = self.layout.region();
        let cells = self.backend.make_grid(&boundary, self.config.h_spacing_m, self.config.v_spacing_m, region)?;
        if cells.is_empty() {
            return Err(ScoreError::empty(format!("grid for {region} has no cells")).into());
        }
        info!(region, cells = cells.len(), "grid built");
        self.write(Stage::Grid, cells.iter().map(Cell::to_record).collect())
    }

    fn centroids(&self) -> Result<()> {
        let records = self.read_cells()?.iter()
            .map(|cell| {
                let point = self.backend.centroid_of(&cell.geometry)
                    .ok_or_else(|| anyhow!("cell {} has no centroid", cell.cell_id))?;
                Ok(Centroid::new(&cell.cell_id, point.x(), point.y()).to_record("cell_id"))
            })
            .collect::<Result<Vec<_>>>()?;
        self.write(Stage::Centroid, records)
    }

    fn proximity(&self, stage: Stage) -> Result<()> {
        let rule = stage.proximity().ok_or_else(|| anyhow!("{stage} is not a proximity stage"))?;
        let subjects = Centroid::from_records(&self.read_artifact(Stage::Centroid)?)?;

        let table = format!("{}_facilities", stage.name());
        let facility_set = SpatialRecordSet::read_geojson(&self.layout.facilities(stage.name()), &table, Some(rule.id_column))?;
        facility_set.require_non_empty()?;
        let facilities = Centroid::from_records(&facility_set)?;

        let results = ProximityScorer::new(rule.mode, rule.closeness)
            .with_chunk_size(self.config.chunk_size)
            .score(&subjects, &facilities)?;

        let records = results.iter().zip(&subjects)
            .map(|(result, subject)| result.to_record().with_geometry(subject.point()))
            .collect();
        self.write(stage, records)
    }

    fn zonal(&self, stage: Stage) -> Result<()> {
        let cells = self.read_cells()?;
        let stats = self.backend.zonal_stats(&self.layout.raster(stage.name()), &cells)?;

        let geometries = cells.iter().map(|c| (c.cell_id.as_str(), &c.geometry)).collect::<HashMap<_, _>>();
        let missing = stats.iter().filter(|z| z.mean.is_none()).count();
        if missing > 0 {
            warn!(criterion = stage.name(), cells = missing, "cells without valid pixels");
        }

        let records = stats.iter()
            .map(|z| match geometries.get(z.cell_id.as_str()) {
                Some(&g) => z.to_record().with_geometry(g.clone()),
                None => z.to_record(),
            })
            .collect();
        self.write(stage, records)
    }

    fn land_ratio(&self) -> Result<()> {
        let cells = self.read_cells()?;
        let land = LandFeature::from_records(&SpatialRecordSet::read_geojson(&self.layout.land_use(), "land_use", None)?)?;
        let fragments = self.backend.intersect(&cells, &land)?;
        info!(features = land.len(), fragments = fragments.len(), "land use intersected");
        self.write(Stage::LandRatio, fragments.iter().map(LandFragment::to_record).collect())
    }

    /// One criterion column from a stage artifact. Land fragments also
    /// yield each cell's dominant class.
    fn criterion_column(&self, stage: Stage, criterion: &str, dominant: &mut HashMap<String, String>) -> Result<CriteriaColumn> {
        let set = SpatialRecordSet::read_geojson(&self.layout.stage_output(stage), stage.name(), Some("cell_id"))?;
        Ok(match stage {
            Stage::LandRatio => {
                let results = aggregate_land(&LandFragment::from_records(&set)?, &self.config.eligible_land_classes);
                dominant.extend(results.iter().map(|r| (r.cell_id.clone(), r.dominant_class.clone())));
                land_column(&results)
            }
            s if s.is_zonal() => adapt_zonal(&ZonalResult::from_records(&set)?, criterion),
            _ => {
                set.require_columns(&["score"])?;
                CriteriaColumn::from_records(&set, "score", format!("{criterion}_score"))
            }
        })
    }

    fn final_score(&self) -> Result<()> {
        let cells = self.read_cells()?;

        let mut columns = Vec::new();
        let mut dominant = HashMap::new();
        let mut has_land = false;
        for spec in &self.config.criteria {
            let Some(stage) = Stage::for_criterion(&spec.name) else {
                warn!(criterion = %spec.name, "no stage produces this criterion; omitted");
                continue;
            };
            if !self.layout.stage_output(stage).is_file() {
                warn!(criterion = %spec.name, stage = stage.name(), "criterion artifact absent; omitted");
                continue;
            }
            has_land |= stage == Stage::LandRatio;
            columns.push(self.criterion_column(stage, &spec.name, &mut dominant)?);
        }
        if columns.is_empty() {
            return Err(ScoreError::empty("no criterion artifacts to merge").into());
        }

        let merged = merge_scores(&cells, &columns)?;
        let mut records = cells.iter().map(Cell::to_record).collect::<Vec<_>>();
        for name in merged.criteria() {
            for (record, value) in records.iter_mut().zip(merged.values(name)?) {
                record.set(name, json!(value));
            }
        }
        if has_land {
            for record in &mut records {
                let class = dominant.get(&record.id).cloned();
                record.set("dominant_class", json!(class));
            }
        }

        info!(cells = records.len(), criteria = ?merged.criteria(), "scores merged");
        self.write(Stage::FinalScore, records)
    }

    /// Writes the mcdm artifact, then the ranking CSV. The CSV from an
    /// earlier run is removed first so it never outlives a failed step.
    fn mcdm_score(&self) -> Result<()> {
        let csv_path = self.layout.ranking_csv();
        if csv_path.is_file() {
            std::fs::remove_file(&csv_path)
                .with_context(|| format!("[pipeline] Failed to remove stale {}", csv_path.display()))?;
        }

        let set = self.read_artifact(Stage::FinalScore)?;
        let columns = self.config.criteria.iter()
            .map(|c| c.column())
            .filter(|column| set.iter().any(|r| r.has(column)))
            .collect::<Vec<_>>();
        if columns.is_empty() {
            return Err(ScoreError::empty("final score has no criterion columns").into());
        }

        let matrix = normalize(&CriteriaMatrix::from_records(&set, &columns)?, &self.config.criteria)?;
        let weights = critic_weights(&matrix, self.config.critic_seed);
        for (column, weight) in weights.columns().iter().zip(weights.as_slice()) {
            info!(criterion = %column, weight, "critic weight");
        }
        let ranked = rank_topsis(&matrix, &weights)?;

        let mut by_rank = ranked.iter().collect::<Vec<_>>();
        by_rank.sort_by_key(|r| r.rank);
        let mut df = DataFrame::new(vec![
            Column::new("cell_id".into(), by_rank.iter().map(|r| r.cell_id.as_str()).collect::<Vec<_>>()),
            Column::new("composite_score".into(), by_rank.iter().map(|r| r.composite_score).collect::<Vec<_>>()),
            Column::new("rank".into(), by_rank.iter().map(|r| r.rank as u32).collect::<Vec<_>>()),
        ])?;

        let mut records = set.into_records();
        for (record, result) in records.iter_mut().zip(&ranked) {
            result.annotate(record);
        }
        self.write(Stage::McdmScore, records)?;
        common::write_csv(&mut df, &csv_path)
    }
}
