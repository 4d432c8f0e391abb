use anyhow::Result;
use pvsite::{RegionLayout, RegionManifest};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::RegionArgs) -> Result<()> {
    let layout = RegionLayout::new(&args.input_path, &args.region_name);
    let manifest = RegionManifest::scan(&layout)?;
    println!("{}", manifest.to_json()?);
    Ok(())
}
