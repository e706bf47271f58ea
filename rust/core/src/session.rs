// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scoped decoder session
//!
//! [`Session`] pairs one open model with exclusive access to its decoder
//! and guarantees that `close_model` runs exactly once on every exit
//! path, including decode errors surfaced mid-extraction.

use crate::capability::{
    DecoderSettings, ModelDecoder, ModelId, PlacedMesh, RawGeometry, RecordFields, RecordType,
};
use crate::error::Result;

/// Baseline schema tag assumed when the decoder reports none.
pub const BASELINE_SCHEMA: &str = "IFC4";

/// Major-version marker of the schema generation that carries
/// georeferencing records. Sub-variants (e.g. `IFC4X3`) normalize to
/// this marker so downstream feature gates treat them uniformly.
pub const GEOREF_SCHEMA: &str = "IFC4";

/// Single-owner handle over one open model.
///
/// Dropping an unclosed session closes the model, so `?`-style early
/// returns never leak decoder state. Call [`Session::close`] on the
/// success path to release eagerly.
pub struct Session<'d, D: ModelDecoder + ?Sized> {
    decoder: &'d mut D,
    model: ModelId,
    closed: bool,
}

impl<'d, D: ModelDecoder + ?Sized> Session<'d, D> {
    /// Open a model from raw bytes. Decode failures propagate unmodified.
    pub fn open(decoder: &'d mut D, bytes: &[u8], settings: &DecoderSettings) -> Result<Self> {
        let model = decoder.open_model(bytes, settings)?;
        Ok(Self {
            decoder,
            model,
            closed: false,
        })
    }

    /// Handle of the underlying open model.
    #[inline]
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Normalized schema version tag.
    ///
    /// Defaults to [`BASELINE_SCHEMA`] when the decoder reports nothing.
    /// A reported tag containing the major-version marker collapses to
    /// the marker itself; this is lossy by design so that schema
    /// sub-variants gate features identically. Anything else passes
    /// through unchanged.
    pub fn schema_version(&self) -> String {
        match self.decoder.model_schema(self.model) {
            None => BASELINE_SCHEMA.to_string(),
            Some(tag) if tag.contains(GEOREF_SCHEMA) => GEOREF_SCHEMA.to_string(),
            Some(tag) => tag,
        }
    }

    /// Global coordination matrix of the model, row-major.
    #[inline]
    pub fn coordination_matrix(&self) -> [f64; 16] {
        self.decoder.coordination_matrix(self.model)
    }

    /// Stream all meshes through `visitor`, synchronously.
    pub fn stream_meshes(&mut self, visitor: &mut dyn FnMut(&PlacedMesh)) -> Result<()> {
        self.decoder.stream_meshes(self.model, visitor)
    }

    /// Ids of all records with the given type tag, decoder-native order.
    pub fn ids_with_type(&mut self, record_type: RecordType) -> Vec<u32> {
        self.decoder.ids_with_type(self.model, record_type)
    }

    /// Decoded fields of one record.
    pub fn record(&mut self, id: u32) -> Result<RecordFields> {
        self.decoder.record(self.model, id)
    }

    /// Scoped access to one part's raw geometry buffers.
    pub fn with_geometry(
        &mut self,
        geometry_id: u32,
        f: &mut dyn FnMut(&RawGeometry) -> Result<()>,
    ) -> Result<()> {
        self.decoder.with_geometry(self.model, geometry_id, f)
    }

    /// Close the session eagerly. Equivalent to dropping it, but makes
    /// the release point explicit on the success path.
    pub fn close(mut self) {
        self.closed = true;
        self.decoder.close_model(self.model);
    }
}

impl<D: ModelDecoder + ?Sized> Drop for Session<'_, D> {
    fn drop(&mut self) {
        if !self.closed {
            self.decoder.close_model(self.model);
        }
    }
}
