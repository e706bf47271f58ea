// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry extraction
//!
//! Drives the decoder's mesh stream and turns every placed geometry
//! part into flat world-frame buffers while accumulating the scene
//! extent. Extraction is all-or-nothing per model: any unresolvable
//! geometry or record discards partial results and surfaces the decode
//! error. Vertex data passes through uncorrected; there is no geometry
//! validation or repair in this layer.
//!
//! Transform handling: the part placement matrix and the global
//! coordination matrix are applied per vertex during the copy, so
//! `positions` leave this module in the final world frame and no
//! deferred transformation is carried on the output.

use crate::error::Result;
use crate::mesh::{ExtractedScene, GeometryPart, MeshRecord};
use ifc_scene_core::{
    FieldValue, ModelDecoder, PlacedMesh, SceneExtent, Session, DEFAULT_SETTINGS,
};
use nalgebra::{Matrix4, Point3};
use tracing::debug;

/// Extract the full render-ready scene from raw model bytes.
///
/// Opens its own session and guarantees its release on every path.
pub fn extract_scene<D: ModelDecoder + ?Sized>(
    decoder: &mut D,
    bytes: &[u8],
) -> Result<ExtractedScene> {
    let mut session = Session::open(decoder, bytes, &DEFAULT_SETTINGS)?;
    let scene = extract_session(&mut session)?;
    session.close();
    Ok(scene)
}

/// Extract the scene from an already-open session.
///
/// The caller keeps ownership of the session; on error the partial
/// scene is dropped and the caller's session guard still closes the
/// model.
pub fn extract_session<D: ModelDecoder + ?Sized>(
    session: &mut Session<'_, D>,
) -> Result<ExtractedScene> {
    let coordination = Matrix4::from_row_slice(&session.coordination_matrix());

    // Collect descriptors first; buffer resolution below re-borrows the
    // session, which the push visitor cannot.
    let mut descriptors: Vec<PlacedMesh> = Vec::new();
    session.stream_meshes(&mut |mesh| descriptors.push(mesh.clone()))?;
    debug!(meshes = descriptors.len(), "streamed mesh descriptors");

    let mut extent = SceneExtent::new();
    let mut meshes = Vec::with_capacity(descriptors.len());

    for placed in &descriptors {
        let mut geometry = Vec::with_capacity(placed.parts.len());

        for part in &placed.parts {
            let world = coordination * Matrix4::from_row_slice(&part.transformation);

            let mut positions: Vec<f64> = Vec::new();
            let mut normals: Vec<f32> = Vec::new();
            let mut indices: Vec<u32> = Vec::new();

            session.with_geometry(part.geometry_id, &mut |raw| {
                positions = Vec::with_capacity(raw.vertices.len() / 2);
                normals = Vec::with_capacity(raw.vertices.len() / 2);
                for vertex in raw.vertices.chunks_exact(6) {
                    let p = world.transform_point(&Point3::new(
                        vertex[0] as f64,
                        vertex[1] as f64,
                        vertex[2] as f64,
                    ));
                    extent.expand(p.x, p.y, p.z);
                    positions.extend_from_slice(&[p.x, p.y, p.z]);
                    normals.extend_from_slice(&[vertex[3], vertex[4], vertex[5]]);
                }
                indices = raw.indices.clone();
                Ok(())
            })?;

            geometry.push(GeometryPart {
                color: part.color,
                positions,
                normals,
                indices,
            });
        }

        let record = session.record(placed.express_id)?;
        let mut properties = serde_json::Map::with_capacity(record.len());
        for (name, value) in &record {
            properties.insert(name.clone(), field_to_json(value));
        }

        meshes.push(MeshRecord {
            id: placed.express_id,
            geometry,
            properties,
        });
    }

    debug!(
        meshes = meshes.len(),
        vertices = extent.sample_count,
        "decoded model geometry"
    );

    Ok(ExtractedScene {
        meshes,
        extent: extent.extent(),
        center: extent.center(),
        size: extent.size(),
    })
}

/// Convert one record field to JSON, collapsing `{value}` wrappers.
fn field_to_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Null => serde_json::Value::Null,
        FieldValue::Real(v) => serde_json::Value::from(*v),
        FieldValue::Integer(i) => serde_json::Value::from(*i),
        FieldValue::Text(s) => serde_json::Value::from(s.clone()),
        FieldValue::Boolean(b) => serde_json::Value::from(*b),
        FieldValue::EntityRef(id) => serde_json::Value::from(*id),
        FieldValue::List(items) => {
            serde_json::Value::Array(items.iter().map(field_to_json).collect())
        }
        FieldValue::Wrapped(inner) => field_to_json(inner),
    }
}
