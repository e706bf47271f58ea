// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoder capability interface
//!
//! The underlying model-format decoder is an opaque capability: open a
//! model from bytes, stream its meshes, fetch named records by id, close
//! it. Binary-format parsing lives entirely behind [`ModelDecoder`]; any
//! conformant decoder can be substituted as long as it fails with a
//! decode error on malformed input and behaves deterministically for a
//! given byte buffer.

use crate::error::Result;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Opaque handle to one open model inside a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

/// Decoder settings, fixed process-wide for this pipeline.
///
/// Not caller-configurable: every session opens with [`DEFAULT_SETTINGS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderSettings {
    /// Shift model coordinates to the origin while decoding.
    /// Disabled so georeferenced offsets survive into the output frame.
    pub coordinate_to_origin: bool,
    /// Use the decoder's fast boolean-operation path.
    pub use_fast_booleans: bool,
}

/// The one settings value this pipeline ever opens a model with.
pub const DEFAULT_SETTINGS: DecoderSettings = DecoderSettings {
    coordinate_to_origin: false,
    use_fast_booleans: true,
};

/// Row-major 4x4 identity, the coordination matrix of an unplaced model.
pub const IDENTITY_MATRIX: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Record types the pipeline queries by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IfcProjectedCRS
    ProjectedCrs,
    /// IfcMapConversion
    MapConversion,
}

/// One decoded attribute of a record.
///
/// Decoders may deliver a field either as a bare value or wrapped in a
/// `{value}` envelope; [`FieldValue::unwrapped`] collapses the envelope
/// idempotently.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Null/undefined
    Null,
    /// Float value
    Real(f64),
    /// Integer value
    Integer(i64),
    /// String value
    Text(String),
    /// Boolean value
    Boolean(bool),
    /// Entity reference
    EntityRef(u32),
    /// List of values
    List(Vec<FieldValue>),
    /// Value wrapped in a `{value}` envelope
    Wrapped(Box<FieldValue>),
}

impl FieldValue {
    /// Collapse the optional `{value}` wrapper. Idempotent: a bare value
    /// is returned unchanged, nested wrappers collapse fully.
    #[inline]
    pub fn unwrapped(&self) -> &FieldValue {
        match self {
            FieldValue::Wrapped(inner) => inner.unwrapped(),
            other => other,
        }
    }

    /// Get as float, unwrapping first
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self.unwrapped() {
            FieldValue::Real(v) => Some(*v),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string, unwrapping first
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self.unwrapped() {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Key/value map of one record's decoded fields.
pub type RecordFields = FxHashMap<String, FieldValue>;

/// One placed geometry part inside a streamed mesh.
#[derive(Debug, Clone, Copy)]
pub struct PlacedPart {
    /// Express id of the decoder-owned geometry buffers for this part
    pub geometry_id: u32,
    /// 4-component color, opaque to this pipeline
    pub color: [f32; 4],
    /// Local placement matrix, row-major 4x4
    pub transformation: [f64; 16],
}

/// One mesh as delivered by [`ModelDecoder::stream_meshes`].
///
/// Meshes typically carry very few parts, hence the inline storage.
#[derive(Debug, Clone)]
pub struct PlacedMesh {
    /// Express id, unique within a model
    pub express_id: u32,
    /// Placed parts in decoder-native order
    pub parts: SmallVec<[PlacedPart; 4]>,
}

/// Raw decoder-owned geometry buffers for one part.
#[derive(Debug, Clone, Default)]
pub struct RawGeometry {
    /// Interleaved position+normal sextuples: x, y, z, nx, ny, nz
    pub vertices: Vec<f32>,
    /// Triangle list indexing into the vertex sextuples
    pub indices: Vec<u32>,
}

impl RawGeometry {
    /// Number of vertices in the interleaved buffer
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 6
    }
}

/// The decoder capability boundary.
///
/// A model handle is valid between `open_model` and `close_model` and is
/// not safe for concurrent use; the session layer enforces the
/// single-owner discipline.
pub trait ModelDecoder {
    /// Open a model from raw bytes. Fails with a decode error when the
    /// buffer is not a valid model payload; this layer does not
    /// pre-validate.
    fn open_model(&mut self, bytes: &[u8], settings: &DecoderSettings) -> Result<ModelId>;

    /// Release all decoder state for the model.
    fn close_model(&mut self, model: ModelId);

    /// Decoder-reported schema tag, when the model declares one.
    fn model_schema(&self, model: ModelId) -> Option<String>;

    /// Global coordination matrix applied to the whole model, row-major.
    /// Identity when the decoder has none.
    fn coordination_matrix(&self, model: ModelId) -> [f64; 16];

    /// Synchronously invoke `visitor` once per mesh in decoder-native
    /// order. No ordering across meshes is guaranteed; downstream logic
    /// must not rely on id-based ordering.
    fn stream_meshes(
        &mut self,
        model: ModelId,
        visitor: &mut dyn FnMut(&PlacedMesh),
    ) -> Result<()>;

    /// Ids of all records with the given type tag, decoder-native order.
    fn ids_with_type(&mut self, model: ModelId, record_type: RecordType) -> Vec<u32>;

    /// Decoded fields of the record with the given id.
    fn record(&mut self, model: ModelId, id: u32) -> Result<RecordFields>;

    /// Scoped access to the raw geometry buffers of one part.
    ///
    /// Implementations must release their temporary geometry handle on
    /// every path, including when `f` returns an error.
    fn with_geometry(
        &mut self,
        model: ModelId,
        geometry_id: u32,
        f: &mut dyn FnMut(&RawGeometry) -> Result<()>,
    ) -> Result<()>;
}
