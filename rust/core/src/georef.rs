// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Georeferencing Support
//!
//! Resolves IfcProjectedCRS and IfcMapConversion records into a model
//! origin. When the projected CRS is known to the projection engine the
//! origin carries geodetic longitude/latitude; an unrecognized CRS is an
//! expected outcome modeled as data, never an error.

use crate::capability::{ModelDecoder, RecordFields, RecordType};
use crate::error::Result;
use crate::session::{Session, GEOREF_SCHEMA};
use thiserror::Error;

/// Fixed geodetic target reference for origin conversion.
pub const GEODETIC_CRS: &str = "EPSG:4326";

/// Failure inside the projection engine, e.g. a malformed CRS
/// definition. Absorbed by the resolver and downgraded to
/// [`ModelOrigin::UnsupportedCrs`]; never aborts an extraction.
#[derive(Error, Debug)]
#[error("Projection failed: {0}")]
pub struct ProjectionError(pub String);

/// Forward geodetic projection between two CRS definitions.
///
/// External collaborator boundary; assumed pure and side-effect-free.
pub trait ProjectionEngine {
    /// Whether the engine knows a definition for the named CRS.
    fn is_defined(&self, crs_name: &str) -> bool;

    /// Convert a point between two CRS definitions, `[x, y]` in, `[x, y]` out.
    fn project(
        &self,
        from_crs: &str,
        to_crs: &str,
        point: [f64; 2],
    ) -> std::result::Result<[f64; 2], ProjectionError>;
}

/// Map-conversion parameters extracted from an IfcMapConversion record.
///
/// Every field defaults to zero when absent from the record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MapConversion {
    /// False easting (X offset to map CRS)
    pub eastings: f64,
    /// False northing (Y offset to map CRS)
    pub northings: f64,
    /// Orthogonal height (Z offset)
    pub orthogonal_height: f64,
    /// X-axis abscissa (cos of rotation angle)
    pub x_axis_abscissa: f64,
    /// X-axis ordinate (sin of rotation angle)
    pub x_axis_ordinate: f64,
    /// Scale factor, zero when the record omits it
    pub scale: f64,
}

impl MapConversion {
    /// Read conversion parameters from a decoded record, defaulting each
    /// missing numeric field to zero.
    pub fn from_record(fields: &RecordFields) -> Self {
        let get = |name: &str| fields.get(name).and_then(|v| v.as_f64()).unwrap_or(0.0);
        Self {
            eastings: get("Eastings"),
            northings: get("Northings"),
            orthogonal_height: get("OrthogonalHeight"),
            x_axis_abscissa: get("XAxisAbscissa"),
            x_axis_ordinate: get("XAxisOrdinate"),
            scale: get("Scale"),
        }
    }

    /// Grid-north rotation in radians.
    #[inline]
    pub fn rotation(&self) -> f64 {
        self.x_axis_ordinate.atan2(self.x_axis_abscissa)
    }

    /// Grid-north rotation in degrees.
    #[inline]
    pub fn rotation_degrees(&self) -> f64 {
        self.rotation().to_degrees()
    }

    /// Scale with the absent-field zero treated as the identity scale.
    #[inline]
    pub fn effective_scale(&self) -> f64 {
        if self.scale == 0.0 {
            1.0
        } else {
            self.scale
        }
    }

    /// Transform local engineering coordinates to map coordinates.
    #[inline]
    pub fn local_to_map(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        let cos_r = self.rotation().cos();
        let sin_r = self.rotation().sin();
        let s = self.effective_scale();

        let e = s * (cos_r * x - sin_r * y) + self.eastings;
        let n = s * (sin_r * x + cos_r * y) + self.northings;
        let h = z + self.orthogonal_height;

        (e, n, h)
    }

    /// Transform map coordinates back to local engineering coordinates.
    #[inline]
    pub fn map_to_local(&self, e: f64, n: f64, h: f64) -> (f64, f64, f64) {
        let cos_r = self.rotation().cos();
        let sin_r = self.rotation().sin();
        let inv_scale = 1.0 / self.effective_scale();

        let dx = e - self.eastings;
        let dy = n - self.northings;

        // Inverse rotation: transpose of rotation matrix
        let x = inv_scale * (cos_r * dx + sin_r * dy);
        let y = inv_scale * (-sin_r * dx + cos_r * dy);
        let z = h - self.orthogonal_height;

        (x, y, z)
    }
}

/// Georeferenced origin of a model, as a tagged result.
///
/// The sum-type shape keeps downstream code from reading a longitude off
/// an unsupported-CRS result.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOrigin {
    /// Schema generation without georeferencing, or no CRS record present.
    None,
    /// A projected CRS record exists but no map-conversion record does;
    /// partial by design, kept for diagnostics.
    CrsOnly {
        /// Name of the projected CRS, e.g. "EPSG:32632"
        projected_crs_name: String,
    },
    /// Origin fully resolved to geodetic degrees.
    Resolved {
        /// Name of the projected CRS the conversion started from
        projected_crs_name: String,
        /// Geodetic longitude in degrees
        longitude: f64,
        /// Geodetic latitude in degrees
        latitude: f64,
        /// Orthogonal height in meters
        height_meters: f64,
        /// Scale factor, identity when the record omitted it
        scale: f64,
        /// Grid-north heading in degrees
        heading_degrees: f64,
        /// The raw conversion parameters
        map_conversion: MapConversion,
    },
    /// The projection engine does not know the CRS; conversion data is
    /// kept for diagnostics but no location is ever guessed.
    UnsupportedCrs {
        /// Name of the unrecognized projected CRS
        projected_crs_name: String,
        /// The raw conversion parameters
        map_conversion: MapConversion,
    },
}

impl ModelOrigin {
    /// Whether no origin information was found at all.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, ModelOrigin::None)
    }
}

/// Resolve the georeferenced origin of an open model.
///
/// Gated on the normalized schema version: older schema generations
/// return [`ModelOrigin::None`] before any record query runs (a
/// forward-looking limitation, not a bug). Ties between multiple records
/// of the same type break to the first in decoder-native order, which is
/// not guaranteed stable across decoder versions.
///
/// Decode failures on a present record propagate; projection-engine
/// failures downgrade to [`ModelOrigin::UnsupportedCrs`].
pub fn resolve_origin<D, E>(
    session: &mut Session<'_, D>,
    schema_version: &str,
    engine: &E,
) -> Result<ModelOrigin>
where
    D: ModelDecoder + ?Sized,
    E: ProjectionEngine + ?Sized,
{
    if schema_version != GEOREF_SCHEMA {
        return Ok(ModelOrigin::None);
    }

    let crs_ids = session.ids_with_type(RecordType::ProjectedCrs);
    let crs_id = match crs_ids.first() {
        Some(&id) => id,
        None => return Ok(ModelOrigin::None),
    };
    let crs_record = session.record(crs_id)?;
    let projected_crs_name = crs_record
        .get("Name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let conversion_ids = session.ids_with_type(RecordType::MapConversion);
    let conversion_id = match conversion_ids.first() {
        Some(&id) => id,
        None => return Ok(ModelOrigin::CrsOnly { projected_crs_name }),
    };
    let map_conversion = MapConversion::from_record(&session.record(conversion_id)?);
    let heading_degrees = map_conversion.rotation_degrees();

    if !engine.is_defined(&projected_crs_name) {
        return Ok(ModelOrigin::UnsupportedCrs {
            projected_crs_name,
            map_conversion,
        });
    }

    let point = [map_conversion.eastings, map_conversion.northings];
    match engine.project(&projected_crs_name, GEODETIC_CRS, point) {
        Ok([longitude, latitude]) => Ok(ModelOrigin::Resolved {
            projected_crs_name,
            longitude: finite_or_zero(longitude),
            latitude: finite_or_zero(latitude),
            height_meters: map_conversion.orthogonal_height,
            scale: map_conversion.effective_scale(),
            heading_degrees,
            map_conversion,
        }),
        // Malformed definition inside the engine: treat as unknown.
        Err(_) => Ok(ModelOrigin::UnsupportedCrs {
            projected_crs_name,
            map_conversion,
        }),
    }
}

#[inline]
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
