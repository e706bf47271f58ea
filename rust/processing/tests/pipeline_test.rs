//! End-to-end pipeline tests against an in-memory decoder double.
//!
//! The fake decoder counts lifecycle calls so the tests can verify the
//! exactly-once close contract, including on injected mid-stream
//! failures.

use ifc_scene_core::{
    DecoderSettings, Error, FieldValue, ModelDecoder, ModelId, ModelOrigin, PlacedMesh,
    PlacedPart, ProjectionEngine, ProjectionError, RawGeometry, RecordFields, RecordType,
    Session, DEFAULT_SETTINGS, IDENTITY_MATRIX,
};
use ifc_scene_processing::{extract_scene, get_capabilities, ingest_model, ORIGIN_BBOX_MARGIN_DEG};
use rustc_hash::FxHashMap;
use serde_json::json;

const MODEL: ModelId = ModelId(7);

#[derive(Default)]
struct FakeDecoder {
    schema: Option<String>,
    coordination: Option<[f64; 16]>,
    meshes: Vec<PlacedMesh>,
    geometries: FxHashMap<u32, RawGeometry>,
    records: FxHashMap<u32, RecordFields>,
    projected_crs_ids: Vec<u32>,
    map_conversion_ids: Vec<u32>,
    /// Geometry id that fails to resolve, simulating a mid-stream decode error
    fail_geometry: Option<u32>,
    open_calls: usize,
    close_calls: usize,
    type_queries: usize,
    last_settings: Option<DecoderSettings>,
}

impl ModelDecoder for FakeDecoder {
    fn open_model(&mut self, bytes: &[u8], settings: &DecoderSettings) -> Result<ModelId, Error> {
        self.open_calls += 1;
        self.last_settings = Some(*settings);
        if bytes.is_empty() {
            return Err(Error::InvalidModel("empty payload".to_string()));
        }
        Ok(MODEL)
    }

    fn close_model(&mut self, _model: ModelId) {
        self.close_calls += 1;
    }

    fn model_schema(&self, _model: ModelId) -> Option<String> {
        self.schema.clone()
    }

    fn coordination_matrix(&self, _model: ModelId) -> [f64; 16] {
        self.coordination.unwrap_or(IDENTITY_MATRIX)
    }

    fn stream_meshes(
        &mut self,
        _model: ModelId,
        visitor: &mut dyn FnMut(&PlacedMesh),
    ) -> Result<(), Error> {
        for mesh in &self.meshes {
            visitor(mesh);
        }
        Ok(())
    }

    fn ids_with_type(&mut self, _model: ModelId, record_type: RecordType) -> Vec<u32> {
        self.type_queries += 1;
        match record_type {
            RecordType::ProjectedCrs => self.projected_crs_ids.clone(),
            RecordType::MapConversion => self.map_conversion_ids.clone(),
        }
    }

    fn record(&mut self, _model: ModelId, id: u32) -> Result<RecordFields, Error> {
        self.records
            .get(&id)
            .cloned()
            .ok_or(Error::RecordUnavailable(id))
    }

    fn with_geometry(
        &mut self,
        _model: ModelId,
        geometry_id: u32,
        f: &mut dyn FnMut(&RawGeometry) -> Result<(), Error>,
    ) -> Result<(), Error> {
        if self.fail_geometry == Some(geometry_id) {
            return Err(Error::GeometryUnavailable(geometry_id));
        }
        match self.geometries.get(&geometry_id) {
            Some(raw) => f(raw),
            None => Err(Error::GeometryUnavailable(geometry_id)),
        }
    }
}

struct FakeProjection {
    known: Vec<&'static str>,
    fail_project: bool,
}

impl FakeProjection {
    fn knowing(crs: &'static str) -> Self {
        Self {
            known: vec![crs],
            fail_project: false,
        }
    }

    fn knowing_nothing() -> Self {
        Self {
            known: Vec::new(),
            fail_project: false,
        }
    }
}

impl ProjectionEngine for FakeProjection {
    fn is_defined(&self, crs_name: &str) -> bool {
        self.known.contains(&crs_name)
    }

    fn project(
        &self,
        _from_crs: &str,
        to_crs: &str,
        _point: [f64; 2],
    ) -> Result<[f64; 2], ProjectionError> {
        assert_eq!(to_crs, "EPSG:4326");
        if self.fail_project {
            return Err(ProjectionError("malformed definition".to_string()));
        }
        Ok([15.0, 42.0])
    }
}

fn translation(tx: f64, ty: f64, tz: f64) -> [f64; 16] {
    [
        1.0, 0.0, 0.0, tx, //
        0.0, 1.0, 0.0, ty, //
        0.0, 0.0, 1.0, tz, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// Triangle (0,0,0) (1,0,0) (0,2,0), normals +Z.
fn triangle_geometry() -> RawGeometry {
    RawGeometry {
        vertices: vec![
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
            0.0, 2.0, 0.0, 0.0, 0.0, 1.0,
        ],
        indices: vec![0, 1, 2],
    }
}

fn placed_mesh(express_id: u32, parts: Vec<PlacedPart>) -> PlacedMesh {
    PlacedMesh {
        express_id,
        parts: parts.into_iter().collect(),
    }
}

fn simple_record(name: &str) -> RecordFields {
    let mut fields: RecordFields = FxHashMap::default();
    fields.insert(
        "Name".to_string(),
        FieldValue::Wrapped(Box::new(FieldValue::Text(name.to_string()))),
    );
    fields.insert("Tag".to_string(), FieldValue::Text("T-1".to_string()));
    fields
}

/// Two meshes, one translated part, one identity part.
fn geometry_decoder() -> FakeDecoder {
    let mut decoder = FakeDecoder {
        schema: Some("IFC4".to_string()),
        coordination: Some(translation(0.0, 0.0, 5.0)),
        ..Default::default()
    };
    decoder.geometries.insert(10, triangle_geometry());
    decoder.geometries.insert(
        11,
        RawGeometry {
            vertices: vec![
                -1.0, -1.0, -1.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
                1.0, 1.0, 1.0, 0.0, 1.0, 0.0,
            ],
            indices: vec![2, 1, 0],
        },
    );
    decoder.meshes.push(placed_mesh(
        1,
        vec![PlacedPart {
            geometry_id: 10,
            color: [0.5, 0.5, 0.5, 1.0],
            transformation: translation(10.0, 0.0, 0.0),
        }],
    ));
    decoder.meshes.push(placed_mesh(
        2,
        vec![PlacedPart {
            geometry_id: 11,
            color: [1.0, 0.0, 0.0, 1.0],
            transformation: IDENTITY_MATRIX,
        }],
    ));
    decoder.records.insert(1, simple_record("Wall-001"));
    decoder.records.insert(2, simple_record("Slab-001"));
    decoder
}

fn georeferenced_decoder(schema: &str) -> FakeDecoder {
    let mut decoder = FakeDecoder {
        schema: Some(schema.to_string()),
        ..Default::default()
    };
    decoder.projected_crs_ids = vec![101, 102];
    decoder.map_conversion_ids = vec![201];

    let mut crs: RecordFields = FxHashMap::default();
    crs.insert(
        "Name".to_string(),
        FieldValue::Wrapped(Box::new(FieldValue::Text("EPSG:32633".to_string()))),
    );
    decoder.records.insert(101, crs);

    let mut conversion: RecordFields = FxHashMap::default();
    conversion.insert("Eastings".to_string(), FieldValue::Real(500000.0));
    conversion.insert("Northings".to_string(), FieldValue::Real(4649776.0));
    conversion.insert(
        "OrthogonalHeight".to_string(),
        FieldValue::Wrapped(Box::new(FieldValue::Real(10.0))),
    );
    conversion.insert("XAxisOrdinate".to_string(), FieldValue::Real(0.0));
    conversion.insert("XAxisAbscissa".to_string(), FieldValue::Real(1.0));
    conversion.insert("Scale".to_string(), FieldValue::Real(1.0));
    decoder.records.insert(201, conversion);
    decoder
}

#[test]
fn extent_spans_all_meshes_and_parts() {
    let mut decoder = geometry_decoder();
    let scene = extract_scene(&mut decoder, b"payload").expect("extraction succeeds");

    assert_eq!(scene.meshes.len(), 2);
    // Mesh 1 triangle lands at (10..11, 0..2, 5); mesh 2 at (-1..1, -1..1, 4..6).
    assert_eq!(scene.extent, [-1.0, -1.0, 11.0, 2.0, 4.0, 6.0]);
    assert_eq!(scene.center, [5.0, 0.5, 5.0]);
    assert_eq!(scene.size, [12.0, 3.0, 2.0]);
    assert_eq!(decoder.close_calls, 1);
}

#[test]
fn extent_is_order_independent() {
    let mut forward = geometry_decoder();
    let mut reverse = geometry_decoder();
    reverse.meshes.reverse();

    let scene_a = extract_scene(&mut forward, b"payload").expect("forward order");
    let scene_b = extract_scene(&mut reverse, b"payload").expect("reverse order");

    assert_eq!(scene_a.extent, scene_b.extent);
    assert_eq!(scene_a.center, scene_b.center);
    assert_eq!(scene_a.size, scene_b.size);
}

#[test]
fn world_positions_compose_placement_and_coordination() {
    let mut decoder = geometry_decoder();
    let scene = extract_scene(&mut decoder, b"payload").expect("extraction succeeds");

    let part = &scene.meshes[0].geometry[0];
    assert_eq!(part.positions[0..3], [10.0, 0.0, 5.0]);
    assert_eq!(part.positions[3..6], [11.0, 0.0, 5.0]);
    assert_eq!(part.positions[6..9], [10.0, 2.0, 5.0]);
    // Normals pass through untransformed
    assert_eq!(part.normals[0..3], [0.0, 0.0, 1.0]);
    // Indices copied verbatim
    assert_eq!(part.indices, vec![0, 1, 2]);
}

#[test]
fn empty_model_keeps_extent_sentinel() {
    let mut decoder = FakeDecoder {
        schema: Some("IFC4".to_string()),
        ..Default::default()
    };
    let scene = extract_scene(&mut decoder, b"payload").expect("empty model is valid");

    assert!(scene.meshes.is_empty());
    assert_eq!(
        scene.extent,
        [
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY
        ]
    );
    assert!(scene.extent.iter().all(|v| !v.is_nan()));
}

#[test]
fn properties_unwrap_value_envelopes() {
    let mut decoder = geometry_decoder();
    let scene = extract_scene(&mut decoder, b"payload").expect("extraction succeeds");

    let properties = &scene.meshes[0].properties;
    // Wrapped field yields the inner value, bare field passes through.
    assert_eq!(properties["Name"], json!("Wall-001"));
    assert_eq!(properties["Tag"], json!("T-1"));
}

#[test]
fn indices_stay_in_bounds() {
    let mut decoder = geometry_decoder();
    let scene = extract_scene(&mut decoder, b"payload").expect("extraction succeeds");

    for mesh in &scene.meshes {
        for part in &mesh.geometry {
            assert_eq!(part.positions.len(), part.normals.len());
            assert_eq!(part.positions.len() % 3, 0);
            let vertex_count = part.vertex_count() as u32;
            assert!(part.indices.iter().all(|&i| i < vertex_count));
        }
    }
}

#[test]
fn mid_stream_geometry_failure_discards_results_and_closes_once() {
    let mut decoder = geometry_decoder();
    decoder.fail_geometry = Some(11);

    let result = extract_scene(&mut decoder, b"payload");
    assert!(matches!(
        result,
        Err(ifc_scene_processing::Error::Decode(
            Error::GeometryUnavailable(11)
        ))
    ));
    assert_eq!(decoder.open_calls, 1);
    assert_eq!(decoder.close_calls, 1);
}

#[test]
fn missing_property_record_fails_extraction_and_closes_once() {
    let mut decoder = geometry_decoder();
    decoder.records.remove(&2);

    assert!(extract_scene(&mut decoder, b"payload").is_err());
    assert_eq!(decoder.close_calls, 1);
}

#[test]
fn invalid_payload_propagates_without_close() {
    let mut decoder = geometry_decoder();
    assert!(extract_scene(&mut decoder, b"").is_err());
    assert_eq!(decoder.open_calls, 1);
    assert_eq!(decoder.close_calls, 0);
}

#[test]
fn capabilities_use_fixed_decoder_settings() {
    let mut decoder = georeferenced_decoder("IFC4");
    let engine = FakeProjection::knowing("EPSG:32633");
    get_capabilities(&mut decoder, &engine, "model.ifc", b"payload").expect("capabilities");

    let settings = decoder.last_settings.expect("settings recorded");
    assert_eq!(settings, DEFAULT_SETTINGS);
    assert!(!settings.coordinate_to_origin);
    assert!(settings.use_fast_booleans);
}

#[test]
fn capabilities_resolve_known_crs() {
    let mut decoder = georeferenced_decoder("IFC4X3_ADD2");
    let engine = FakeProjection::knowing("EPSG:32633");
    let capabilities =
        get_capabilities(&mut decoder, &engine, "https://x/y/model.ifc", b"payload")
            .expect("capabilities");

    assert_eq!(capabilities.format, "ifc");
    // Sub-variant normalizes to the major-version marker.
    assert_eq!(capabilities.schema_version, "IFC4");

    let properties = &capabilities.properties;
    assert_eq!(properties["projectedCrsName"], json!("EPSG:32633"));
    assert_eq!(properties["longitude"], json!(15.0));
    assert_eq!(properties["latitude"], json!(42.0));
    assert_eq!(properties["heightMeters"], json!(10.0));
    assert_eq!(properties["scale"], json!(1.0));
    // atan2(0, 1) == 0
    assert_eq!(properties["headingDegrees"], json!(0.0));
    assert_eq!(properties["mapConversion"]["eastings"], json!(500000.0));
    assert_eq!(properties["mapConversion"]["rotationDegrees"], json!(0.0));

    let bounds = &capabilities.bounding_box.bounds;
    assert_eq!(bounds.minx, 15.0 - ORIGIN_BBOX_MARGIN_DEG);
    assert_eq!(bounds.maxx, 15.0 + ORIGIN_BBOX_MARGIN_DEG);
    assert_eq!(bounds.miny, 42.0 - ORIGIN_BBOX_MARGIN_DEG);
    assert_eq!(bounds.maxy, 42.0 + ORIGIN_BBOX_MARGIN_DEG);
    assert_eq!(capabilities.bounding_box.crs, "EPSG:4326");

    assert_eq!(decoder.close_calls, 1);
}

#[test]
fn capabilities_mark_unknown_crs_unsupported() {
    let mut decoder = georeferenced_decoder("IFC4");
    let engine = FakeProjection::knowing_nothing();
    let capabilities =
        get_capabilities(&mut decoder, &engine, "model.ifc", b"payload").expect("capabilities");

    let properties = &capabilities.properties;
    assert_eq!(properties["projectedCrsName"], json!("EPSG:32633"));
    assert_eq!(properties["projectedCrsNotSupported"], json!(true));
    // Conversion payload kept for diagnostics, location never guessed.
    assert_eq!(properties["mapConversion"]["northings"], json!(4649776.0));
    assert!(!properties.contains_key("longitude"));
    assert!(!properties.contains_key("latitude"));

    // Degenerate all-zero box with the geodetic tag.
    let bounds = &capabilities.bounding_box.bounds;
    assert_eq!(
        (bounds.minx, bounds.miny, bounds.maxx, bounds.maxy),
        (0.0, 0.0, 0.0, 0.0)
    );
    assert_eq!(capabilities.bounding_box.crs, "EPSG:4326");
}

#[test]
fn projection_failure_downgrades_to_unsupported() {
    let mut decoder = georeferenced_decoder("IFC4");
    let mut engine = FakeProjection::knowing("EPSG:32633");
    engine.fail_project = true;

    let capabilities =
        get_capabilities(&mut decoder, &engine, "model.ifc", b"payload").expect("never fatal");
    assert_eq!(
        capabilities.properties["projectedCrsNotSupported"],
        json!(true)
    );
    assert_eq!(decoder.close_calls, 1);
}

#[test]
fn schema_gate_short_circuits_before_record_queries() {
    let mut decoder = georeferenced_decoder("IFC2X3");
    let engine = FakeProjection::knowing("EPSG:32633");
    let capabilities =
        get_capabilities(&mut decoder, &engine, "model.ifc", b"payload").expect("capabilities");

    assert_eq!(capabilities.schema_version, "IFC2X3");
    assert!(capabilities.properties.is_empty());
    // The gate must return before any type query reaches the decoder.
    assert_eq!(decoder.type_queries, 0);
}

#[test]
fn crs_without_map_conversion_is_partial_result() {
    let mut decoder = georeferenced_decoder("IFC4");
    decoder.map_conversion_ids.clear();
    let engine = FakeProjection::knowing("EPSG:32633");

    let capabilities =
        get_capabilities(&mut decoder, &engine, "model.ifc", b"payload").expect("capabilities");
    assert_eq!(
        capabilities.properties["projectedCrsName"],
        json!("EPSG:32633")
    );
    assert!(!capabilities.properties.contains_key("mapConversion"));
    assert!(!capabilities.properties.contains_key("longitude"));
}

#[test]
fn missing_crs_record_yields_empty_properties() {
    let mut decoder = FakeDecoder {
        schema: Some("IFC4".to_string()),
        ..Default::default()
    };
    let engine = FakeProjection::knowing_nothing();
    let capabilities =
        get_capabilities(&mut decoder, &engine, "model.ifc", b"payload").expect("capabilities");

    assert!(capabilities.properties.is_empty());
    assert_eq!(capabilities.bounding_box.bounds.maxx, 0.0);
}

#[test]
fn ingest_shares_one_session() {
    let mut decoder = geometry_decoder();
    let engine = FakeProjection::knowing_nothing();

    let (capabilities, scene) =
        ingest_model(&mut decoder, &engine, "site/model.ifc", b"payload").expect("ingest");

    assert_eq!(capabilities.format, "ifc");
    assert_eq!(scene.meshes.len(), 2);
    assert_eq!(decoder.open_calls, 1);
    assert_eq!(decoder.close_calls, 1);
}

#[test]
fn resolver_ties_break_to_first_record() {
    // Two projected CRS records: only the first (#101) is consulted.
    let mut decoder = georeferenced_decoder("IFC4");
    let engine = FakeProjection::knowing("EPSG:32633");

    let mut session = Session::open(&mut decoder, b"payload", &DEFAULT_SETTINGS).expect("open");
    let version = session.schema_version();
    let origin =
        ifc_scene_core::resolve_origin(&mut session, &version, &engine).expect("resolve");
    session.close();

    match origin {
        ModelOrigin::Resolved {
            projected_crs_name,
            heading_degrees,
            height_meters,
            scale,
            ..
        } => {
            assert_eq!(projected_crs_name, "EPSG:32633");
            assert_eq!(heading_degrees, 0.0);
            assert_eq!(height_meters, 10.0);
            assert_eq!(scale, 1.0);
        }
        other => panic!("expected resolved origin, got {other:?}"),
    }
}
