// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render-ready scene output types
//!
//! Flat numeric buffers per geometry part plus per-mesh metadata, the
//! shape the rendering collaborator consumes. Field names are stable
//! interface.

use serde::Serialize;

/// One render-ready chunk of a mesh.
///
/// Positions are world-frame doubles (placement and coordination
/// matrices already applied during extraction); normals stay single
/// precision as delivered by the decoder. Both run interleaved X,Y,Z
/// with `positions.len() == normals.len()`, and every index is
/// `< positions.len() / 3`.
#[derive(Debug, Clone, Serialize)]
pub struct GeometryPart {
    /// 4-component color, opaque to this pipeline
    pub color: [f32; 4],
    /// World-frame vertex positions, x,y,z interleaved
    pub positions: Vec<f64>,
    /// Vertex normals, nx,ny,nz interleaved
    pub normals: Vec<f32>,
    /// Triangle list
    pub indices: Vec<u32>,
}

impl GeometryPart {
    /// Number of vertices in the part
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles in the part
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// One decoded visual chunk with its unwrapped property record.
#[derive(Debug, Clone, Serialize)]
pub struct MeshRecord {
    /// Express id, unique within a model
    pub id: u32,
    /// Geometry parts in decoder-native order
    pub geometry: Vec<GeometryPart>,
    /// Property record fields, `{value}` wrappers collapsed
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Full geometry extraction result: all meshes plus the derived
/// bounding volume of the whole vertex set.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedScene {
    /// All decoded meshes
    pub meshes: Vec<MeshRecord>,
    /// `[minx, miny, maxx, maxy, minz, maxz]`; infinity sentinel when
    /// the model carries no vertices
    pub extent: [f64; 6],
    /// Box midpoint per axis
    pub center: [f64; 3],
    /// Box span per axis
    pub size: [f64; 3],
}
