//! Local vector feature sets.
//!
//! A [`VectorFeatureSet`] is a table of rows, each with an optional geometry
//! and one value per attribute column, tagged with the coordinate reference
//! system its geometries are expressed in. The geometry column is held apart
//! from the attribute columns, so attribute maps never include it.

use std::fmt;

use geo_types::Geometry;

use crate::attribute::AttributeValue;
use crate::table::TableError;

/// Default name of the geometry column.
pub const DEFAULT_GEOMETRY_COLUMN: &str = "geometry";

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    epsg: u16,
}

impl Crs {
    /// Geographic WGS 84 longitude/latitude.
    pub const WGS84: Crs = Crs { epsg: 4326 };

    #[must_use]
    pub const fn epsg(code: u16) -> Self {
        Self { epsg: code }
    }

    #[must_use]
    pub const fn code(&self) -> u16 {
        self.epsg
    }

    /// Parses `EPSG:3857`, `epsg:3857`, `urn:ogc:def:crs:EPSG::3857` or a
    /// bare code. OGC CRS84 is mapped to EPSG:4326. Any other authority
    /// (`ESRI:102003`) yields `None`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.ends_with("CRS84") {
            return Some(Crs::WGS84);
        }
        let mut parts = trimmed.rsplit(':');
        let code = parts.next()?;
        let mut authority = parts.filter(|part| !part.is_empty());
        let is_epsg = match authority.next() {
            None => true,
            Some(part) if part.eq_ignore_ascii_case("EPSG") => true,
            // urn:ogc:def:crs:EPSG:6.6:3857 carries a version before the code
            Some(_) => authority.next().is_some_and(|part| part.eq_ignore_ascii_case("EPSG")),
        };
        if !is_epsg {
            return None;
        }
        code.parse::<u16>().ok().map(Crs::epsg)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// One row of a [`VectorFeatureSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Row geometry, if any
    pub geometry: Option<Geometry<f64>>,
    /// One value per attribute column, in column order
    pub values: Vec<AttributeValue>,
}

/// A table of geometries with scalar attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFeatureSet {
    crs: Option<Crs>,
    geometry_column: String,
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl Default for VectorFeatureSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl VectorFeatureSet {
    /// Creates a set with no rows.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateColumn`] if an attribute column repeats
    /// or is named like the geometry column.
    pub fn new<I, S>(crs: Crs, columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_geometry_column(crs, DEFAULT_GEOMETRY_COLUMN, columns)
    }

    /// Like [`VectorFeatureSet::new`] with a custom geometry column name.
    ///
    /// # Errors
    ///
    /// See [`VectorFeatureSet::new`].
    pub fn with_geometry_column<I, S>(
        crs: Crs,
        geometry_column: impl Into<String>,
        columns: I,
    ) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let geometry_column = geometry_column.into();
        let mut names: Vec<String> = Vec::new();
        for column in columns {
            let column = column.into();
            if column == geometry_column || names.contains(&column) {
                return Err(TableError::DuplicateColumn(column));
            }
            names.push(column);
        }
        Ok(Self {
            crs: Some(crs),
            geometry_column,
            columns: names,
            rows: Vec::new(),
        })
    }

    /// A set with no CRS, no columns and no rows.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            crs: None,
            geometry_column: DEFAULT_GEOMETRY_COLUMN.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnCountMismatch`] if `values` does not hold
    /// one value per attribute column.
    pub fn push_row(
        &mut self,
        geometry: Option<Geometry<f64>>,
        values: Vec<AttributeValue>,
    ) -> Result<(), TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::ColumnCountMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        self.rows.push(FeatureRow { geometry, values });
        Ok(())
    }

    #[must_use]
    pub fn crs(&self) -> Option<Crs> {
        self.crs
    }

    /// Tags the set with a CRS without touching coordinates.
    pub fn set_crs(&mut self, crs: Crs) {
        self.crs = Some(crs);
    }

    #[must_use]
    pub fn geometry_column(&self) -> &str {
        &self.geometry_column
    }

    /// Attribute column names, excluding the geometry column.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Name/value pairs of a row's attributes.
    pub fn attributes<'a>(
        &'a self,
        row: &'a FeatureRow,
    ) -> impl Iterator<Item = (&'a str, &'a AttributeValue)> + 'a {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(row.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn crs_parse_forms() {
        assert_eq!(Crs::parse("EPSG:3857"), Some(Crs::epsg(3857)));
        assert_eq!(Crs::parse("urn:ogc:def:crs:EPSG::26918"), Some(Crs::epsg(26918)));
        assert_eq!(Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84"), Some(Crs::WGS84));
        assert_eq!(Crs::parse("4326"), Some(Crs::WGS84));
        assert_eq!(Crs::parse("urn:ogc:def:crs:EPSG:6.6:32618"), Some(Crs::epsg(32618)));
        assert_eq!(Crs::parse("not a crs"), None);
        assert_eq!(Crs::parse("ESRI:102003"), None);
        assert_eq!(Crs::parse("ESRI:3857"), None);
        assert_eq!(Crs::parse("urn:ogc:def:crs:EPSG::102003"), None);
        assert_eq!(Crs::WGS84.to_string(), "EPSG:4326");
    }

    #[test]
    fn geometry_column_is_not_an_attribute() {
        let err = VectorFeatureSet::new(Crs::WGS84, ["id", "geometry"]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("geometry".to_string()));
    }

    #[test]
    fn attributes_pair_names_with_values() {
        let mut set = VectorFeatureSet::new(Crs::WGS84, ["huc", "area"]).unwrap();
        let poly = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        set.push_row(Some(poly.into()), vec!["01020003".into(), 1.5.into()])
            .unwrap();

        let attrs: Vec<_> = set.attributes(&set.rows()[0]).collect();
        assert_eq!(attrs[0], ("huc", &AttributeValue::Text("01020003".into())));
        assert_eq!(attrs[1], ("area", &AttributeValue::Float(1.5)));
    }

    #[test]
    fn push_row_checks_width() {
        let mut set = VectorFeatureSet::new(Crs::WGS84, ["id"]).unwrap();
        assert!(set.push_row(None, vec![]).is_err());
    }

    #[test]
    fn empty_set_has_no_crs() {
        let set = VectorFeatureSet::empty();
        assert!(set.is_empty());
        assert!(set.crs().is_none());
        assert_eq!(set.geometry_column(), "geometry");
    }
}
