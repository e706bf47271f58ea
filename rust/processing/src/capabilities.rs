// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capabilities assembly
//!
//! Orchestrates format sniffing, session lifetime, schema versioning and
//! origin resolution into the normalized capabilities record consumed
//! downstream. Geometry decoding is a separate entry point
//! ([`crate::extract::extract_scene`]) so metadata-only callers never
//! pay for it; [`ingest_model`] combines both over a single session.

use crate::error::Result;
use crate::extract::extract_session;
use crate::mesh::ExtractedScene;
use ifc_scene_core::{
    derive_format, resolve_origin, MapConversion, ModelDecoder, ModelOrigin, ProjectionEngine,
    Session, DEFAULT_SETTINGS, GEODETIC_CRS,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Fixed half-width of the origin bounding box, in degrees.
///
/// A coarse approximation around the resolved origin; a true
/// geometry-derived bbox is a known future enhancement.
pub const ORIGIN_BBOX_MARGIN_DEG: f64 = 0.001;

/// Geodetic bounds of the capabilities bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Bounds {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

/// Bounding box with its CRS tag, fixed at the geodetic reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    pub bounds: Bounds,
    pub crs: String,
}

impl BoundingBox {
    /// Degenerate all-zero box used when no origin resolves.
    pub fn degenerate() -> Self {
        Self {
            bounds: Bounds::default(),
            crs: GEODETIC_CRS.to_string(),
        }
    }
}

/// Normalized model capabilities: format/version/properties/bbox.
///
/// The serialized field names (`format`, `version`, `properties`,
/// `bbox`) are stable interface; downstream code pattern-matches on
/// them.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCapabilities {
    /// Format tag derived from the resource identifier
    pub format: String,
    /// Normalized schema version tag
    #[serde(rename = "version")]
    pub schema_version: String,
    /// Extracted properties merged with georeferenced-origin fields
    pub properties: Map<String, Value>,
    /// Coarse geodetic bounding box around the resolved origin
    #[serde(rename = "bbox")]
    pub bounding_box: BoundingBox,
}

/// Assemble the capabilities record for a model payload.
///
/// Opens a session with the fixed decoder settings, resolves version
/// and origin, and closes the session on every path. Does not decode
/// geometry.
pub fn get_capabilities<D, E>(
    decoder: &mut D,
    engine: &E,
    resource_id: &str,
    bytes: &[u8],
) -> Result<ModelCapabilities>
where
    D: ModelDecoder + ?Sized,
    E: ProjectionEngine + ?Sized,
{
    let format = derive_format(resource_id).to_string();
    let mut session = Session::open(decoder, bytes, &DEFAULT_SETTINGS)?;
    let schema_version = session.schema_version();
    let origin = resolve_origin(&mut session, &schema_version, engine)?;
    session.close();

    debug!(%format, version = %schema_version, "assembled model capabilities");
    Ok(compose(format, schema_version, &origin))
}

/// Combined entry point: capabilities and full scene over one session.
pub fn ingest_model<D, E>(
    decoder: &mut D,
    engine: &E,
    resource_id: &str,
    bytes: &[u8],
) -> Result<(ModelCapabilities, ExtractedScene)>
where
    D: ModelDecoder + ?Sized,
    E: ProjectionEngine + ?Sized,
{
    let format = derive_format(resource_id).to_string();
    let mut session = Session::open(decoder, bytes, &DEFAULT_SETTINGS)?;
    let schema_version = session.schema_version();
    let origin = resolve_origin(&mut session, &schema_version, engine)?;
    let scene = extract_session(&mut session)?;
    session.close();

    Ok((compose(format, schema_version, &origin), scene))
}

fn compose(format: String, schema_version: String, origin: &ModelOrigin) -> ModelCapabilities {
    if let ModelOrigin::UnsupportedCrs {
        projected_crs_name, ..
    } = origin
    {
        warn!(crs = %projected_crs_name, "projected CRS not known to the projection engine");
    }

    ModelCapabilities {
        format,
        schema_version,
        properties: origin_properties(origin),
        bounding_box: origin_bounding_box(origin),
    }
}

/// Flatten the origin result into capability properties.
fn origin_properties(origin: &ModelOrigin) -> Map<String, Value> {
    let mut properties = Map::new();
    match origin {
        ModelOrigin::None => {}
        ModelOrigin::CrsOnly { projected_crs_name } => {
            properties.insert("projectedCrsName".to_string(), json!(projected_crs_name));
        }
        ModelOrigin::Resolved {
            projected_crs_name,
            longitude,
            latitude,
            height_meters,
            scale,
            heading_degrees,
            map_conversion,
        } => {
            properties.insert("projectedCrsName".to_string(), json!(projected_crs_name));
            properties.insert("longitude".to_string(), json!(longitude));
            properties.insert("latitude".to_string(), json!(latitude));
            properties.insert("heightMeters".to_string(), json!(height_meters));
            properties.insert("scale".to_string(), json!(scale));
            properties.insert("headingDegrees".to_string(), json!(heading_degrees));
            properties.insert(
                "mapConversion".to_string(),
                map_conversion_json(map_conversion),
            );
        }
        ModelOrigin::UnsupportedCrs {
            projected_crs_name,
            map_conversion,
        } => {
            properties.insert("projectedCrsName".to_string(), json!(projected_crs_name));
            properties.insert("projectedCrsNotSupported".to_string(), json!(true));
            properties.insert(
                "mapConversion".to_string(),
                map_conversion_json(map_conversion),
            );
        }
    }
    properties
}

fn map_conversion_json(conversion: &MapConversion) -> Value {
    let mut value = serde_json::to_value(conversion).unwrap_or(Value::Null);
    if let Value::Object(ref mut fields) = value {
        fields.insert(
            "rotationDegrees".to_string(),
            json!(conversion.rotation_degrees()),
        );
    }
    value
}

fn origin_bounding_box(origin: &ModelOrigin) -> BoundingBox {
    match origin {
        ModelOrigin::Resolved {
            longitude,
            latitude,
            ..
        } => BoundingBox {
            bounds: Bounds {
                minx: longitude - ORIGIN_BBOX_MARGIN_DEG,
                miny: latitude - ORIGIN_BBOX_MARGIN_DEG,
                maxx: longitude + ORIGIN_BBOX_MARGIN_DEG,
                maxy: latitude + ORIGIN_BBOX_MARGIN_DEG,
            },
            crs: GEODETIC_CRS.to_string(),
        },
        _ => BoundingBox::degenerate(),
    }
}
