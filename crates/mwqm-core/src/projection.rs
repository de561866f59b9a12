//! Reprojection of geometries between EPSG codes using proj4rs and the
//! crs-definitions database.

use geo::MapCoords;
use geo_types::{Coord, Geometry};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::error::ProjectionError;

/// PROJ string for an EPSG code, if the database knows it.
#[must_use]
pub fn proj_string(epsg: u16) -> Option<&'static str> {
    crs_definitions::from_code(epsg).map(|def| def.proj4)
}

/// True when the CRS expresses coordinates as longitude/latitude degrees.
#[must_use]
pub fn is_geographic(epsg: u16) -> bool {
    proj_string(epsg).map_or(epsg == 4326, |def| def.contains("+proj=longlat"))
}

fn load_proj(epsg: u16) -> Result<Proj, ProjectionError> {
    let definition = proj_string(epsg).ok_or(ProjectionError::UnknownCrs { epsg })?;
    Proj::from_proj_string(definition).map_err(|e| ProjectionError::InvalidDefinition {
        epsg,
        message: format!("{e:?}"),
    })
}

/// Transforms coordinates from one EPSG code to another.
///
/// Identical source and target codes short-circuit to an identity transform
/// without touching the database.
pub struct CoordTransformer {
    from: u16,
    to: u16,
    projs: Option<(Proj, Proj)>,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl std::fmt::Debug for CoordTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordTransformer")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("identity", &self.is_identity())
            .finish()
    }
}

impl CoordTransformer {
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if either code is unknown or its
    /// definition cannot be instantiated.
    pub fn new(from: u16, to: u16) -> Result<Self, ProjectionError> {
        if from == to {
            return Ok(Self {
                from,
                to,
                projs: None,
                source_is_geographic: false,
                target_is_geographic: false,
            });
        }
        let source = load_proj(from)?;
        let target = load_proj(to)?;
        Ok(Self {
            from,
            to,
            projs: Some((source, target)),
            source_is_geographic: is_geographic(from),
            target_is_geographic: is_geographic(to),
        })
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.projs.is_none()
    }

    /// Transform a single coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Transform`] if proj4rs rejects the point or
    /// produces a non-finite result.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        let Some((source, target)) = &self.projs else {
            return Ok((x, y));
        };

        // proj4rs works in radians for geographic systems
        let mut point = if self.source_is_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        transform(source, target, &mut point).map_err(|e| self.failure(x, y, format!("{e:?}")))?;

        let (out_x, out_y) = if self.target_is_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(self.failure(x, y, "result is not finite".to_string()));
        }
        Ok((out_x, out_y))
    }

    /// Transform every coordinate of a geometry, failing on the first bad one.
    ///
    /// # Errors
    ///
    /// See [`CoordTransformer::transform`].
    pub fn transform_geometry(
        &self,
        geometry: &Geometry<f64>,
    ) -> Result<Geometry<f64>, ProjectionError> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|coord: Coord<f64>| {
            self.transform(coord.x, coord.y)
                .map(|(x, y)| Coord { x, y })
        })
    }

    fn failure(&self, x: f64, y: f64, message: String) -> ProjectionError {
        ProjectionError::Transform {
            from: self.from,
            to: self.to,
            x,
            y,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn identity_keeps_coordinates() {
        let t = CoordTransformer::new(4326, 4326).unwrap();
        assert!(t.is_identity());
        assert_eq!(t.transform(12.5, -3.0).unwrap(), (12.5, -3.0));
    }

    #[test]
    fn mercator_origin_maps_to_null_island() {
        let t = CoordTransformer::new(3857, 4326).unwrap();
        let (lon, lat) = t.transform(0.0, 0.0).unwrap();
        assert!(lon.abs() < 1e-9);
        assert!(lat.abs() < 1e-9);
    }

    #[test]
    fn utm_point_lands_in_zone() {
        // UTM 18N, roughly New York
        let t = CoordTransformer::new(26918, 4326).unwrap();
        let (lon, lat) = t.transform(583_960.0, 4_507_523.0).unwrap();
        assert!((lon - -74.0).abs() < 0.05, "lon = {lon}");
        assert!((lat - 40.71).abs() < 0.05, "lat = {lat}");
    }

    #[test]
    fn geometry_round_trip() {
        let forward = CoordTransformer::new(4326, 3857).unwrap();
        let back = CoordTransformer::new(3857, 4326).unwrap();
        let poly: Geometry<f64> =
            polygon![(x: -1.0, y: 50.0), (x: 1.0, y: 50.0), (x: 1.0, y: 52.0)].into();

        let projected = forward.transform_geometry(&poly).unwrap();
        let restored = back.transform_geometry(&projected).unwrap();

        let Geometry::Polygon(restored) = restored else {
            panic!("Expected Polygon");
        };
        let first = restored.exterior().0[0];
        assert!((first.x - -1.0).abs() < 1e-6);
        assert!((first.y - 50.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_code_fails() {
        let err = CoordTransformer::new(1, 4326).unwrap_err();
        assert_eq!(err, ProjectionError::UnknownCrs { epsg: 1 });
    }

    #[test]
    fn geographic_detection() {
        assert!(is_geographic(4326));
        assert!(!is_geographic(3857));
    }
}
