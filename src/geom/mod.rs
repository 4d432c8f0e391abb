mod backend;
mod bbox;
mod measure;
mod planar;
mod raster;

pub use backend::{GeometryBackend, LandFeature, LandFragment, ZonalResult};
pub(crate) use measure::{KM_PER_DEGREE, area_km2, haversine_km, perimeter_km};
pub use planar::PlanarBackend;
pub use raster::AsciiGrid;
