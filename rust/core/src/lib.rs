// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Scene Core
//!
//! Decoder-facing foundation of the IFC ingestion pipeline: the opaque
//! decoder capability boundary, scoped session lifetime, schema-version
//! normalization, running scene extent, and georeference resolution.
//!
//! ## Overview
//!
//! This crate provides the building blocks the processing pipeline
//! composes:
//!
//! - **Capability boundary**: [`ModelDecoder`] — open/stream/fetch/close
//!   over an external binary decoder, never reimplemented here
//! - **Session discipline**: [`Session`] — single owner, closed exactly
//!   once on every exit path
//! - **Extent accumulation**: [`SceneExtent`] — order-independent
//!   min/max over the full vertex stream
//! - **Georeferencing**: [`resolve_origin`] — projected CRS +
//!   map-conversion records resolved against a [`ProjectionEngine`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_scene_core::{Session, resolve_origin, DEFAULT_SETTINGS};
//!
//! let mut session = Session::open(&mut decoder, &bytes, &DEFAULT_SETTINGS)?;
//! let version = session.schema_version();
//! let origin = resolve_origin(&mut session, &version, &engine)?;
//! session.close();
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for georeferencing data

pub mod capability;
pub mod error;
pub mod extent;
pub mod format;
pub mod georef;
pub mod session;

pub use capability::{
    DecoderSettings, FieldValue, ModelDecoder, ModelId, PlacedMesh, PlacedPart, RawGeometry,
    RecordFields, RecordType, DEFAULT_SETTINGS, IDENTITY_MATRIX,
};
pub use error::{Error, Result};
pub use extent::SceneExtent;
pub use format::derive_format;
pub use georef::{
    resolve_origin, MapConversion, ModelOrigin, ProjectionEngine, ProjectionError, GEODETIC_CRS,
};
pub use session::{Session, BASELINE_SCHEMA, GEOREF_SCHEMA};
