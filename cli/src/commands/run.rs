use anyhow::Result;
use pvsite::{Pipeline, PlanarBackend, RegionLayout, SiteConfig, StepSelection, StepState};
use tracing::info;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SiteConfig::from_json_file(path)?,
        None => SiteConfig::default(),
    };
    if let Some(h) = args.h_space { config.h_spacing_m = h }
    if let Some(v) = args.v_space { config.v_spacing_m = v }
    if let Some(n) = args.chunk_size { config.chunk_size = n }

    let selection = StepSelection::parse(&args.steps)?;
    let layout = RegionLayout::new(&args.region.input_path, &args.region.region_name);
    let backend = PlanarBackend::new();

    let report = Pipeline::new(layout, config, &backend).run(&selection, args.force)?;

    info!(
        region = %report.region,
        completed = report.count(StepState::Completed),
        skipped = report.count(StepState::Skipped),
        failed = report.count(StepState::Failed),
        "done"
    );
    Ok(())
}
