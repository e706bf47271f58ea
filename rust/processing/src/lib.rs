// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Scene Processing
//!
//! Geometry extraction and capabilities assembly over the decoder
//! capability defined in [`ifc_scene_core`]. The pipeline is a pure,
//! stateless transform: raw model bytes in, a normalized render-ready
//! scene description and/or capabilities record out. Nothing persists
//! across calls, and independent calls over different resources may run
//! concurrently.
//!
//! Two entry points, one session each:
//!
//! - [`get_capabilities`] — format, normalized schema version,
//!   georeferenced-origin properties and a coarse geodetic bbox; never
//!   decodes geometry
//! - [`extract_scene`] — every mesh as flat position/normal/index
//!   buffers in the world frame, plus the scene extent
//!
//! [`ingest_model`] combines both over a single session when a caller
//! wants everything at once.

pub mod capabilities;
pub mod error;
pub mod extract;
pub mod mesh;

pub use capabilities::{
    get_capabilities, ingest_model, BoundingBox, Bounds, ModelCapabilities,
    ORIGIN_BBOX_MARGIN_DEG,
};
pub use error::{Error, Result};
pub use extract::{extract_scene, extract_session};
pub use mesh::{ExtractedScene, GeometryPart, MeshRecord};
