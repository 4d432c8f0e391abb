use geo::{Distance, GeodesicArea, Haversine, MultiPolygon, Point};

/// Length of one degree of latitude on the mean-radius sphere, in km.
/// Only used to turn grid spacing in metres into degrees.
pub(crate) const KM_PER_DEGREE: f64 = 111.195;

/// Great-circle distance between two lon/lat points in km.
pub(crate) fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.distance(a, b) / 1000.0
}

/// Geodesic area in km² of a lon/lat geometry.
pub(crate) fn area_km2(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.geodesic_area_unsigned() / 1e6
}

/// Geodesic boundary length in km (exterior and interior rings).
pub(crate) fn perimeter_km(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.geodesic_perimeter() / 1e3
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::{Rect, coord};

    use super::*;

    #[test]
    fn one_degree_of_latitude() {
        let km = haversine_km(Point::new(0.0, 0.0), Point::new(0.0, 1.0));
        assert_abs_diff_eq!(km, KM_PER_DEGREE, epsilon = 1e-3);
    }

    #[test]
    fn longitude_shrinks_with_latitude() {
        let equator = haversine_km(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        let north = haversine_km(Point::new(0.0, 60.0), Point::new(1.0, 60.0));
        assert_abs_diff_eq!(north / equator, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn degree_cell_at_sixty_north_is_geodesic() {
        let cell = MultiPolygon(vec![
            Rect::new(coord! { x: 10.0, y: 60.0 }, coord! { x: 11.0, y: 61.0 }).to_polygon(),
        ]);
        assert_abs_diff_eq!(area_km2(&cell), 6122.9, epsilon = 1.0);
        assert_abs_diff_eq!(perimeter_km(&cell), 332.75, epsilon = 0.5);
        assert_eq!(area_km2(&MultiPolygon(vec![])), 0.0);
    }
}
