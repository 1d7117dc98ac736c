mod common;

use common::{point, MemorySource};
use pcq_engine::cancel::CancelToken;
use pcq_engine::error::EngineError;
use pcq_engine::index::IndexBuilder;
use pcq_engine::job::JobDescriptor;
use pcq_engine::profile::{ProfileExtractor, ProfileRequest};
use pcq_projection::CoordinateProjector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

fn identity() -> CoordinateProjector {
    CoordinateProjector::from_wkt(None, None).0
}

fn histogram_source() -> MemorySource {
    let classes = [2u8, 2, 6, 6, 6, 9, 2, 3, 4, 5];
    MemorySource::new(
        classes
            .iter()
            .enumerate()
            .map(|(i, &cls)| point(i as f64, i as f64, i as f64, cls))
            .collect(),
    )
}

#[test]
fn index_counts_every_classification() {
    let mut source = histogram_source();
    let mut projector = identity();
    let artifact = IndexBuilder::new(CancelToken::new())
        .with_chunk_size(3)
        .build(&mut source, &mut projector, "idx-1")
        .unwrap();

    assert_eq!(artifact.points_total, 10);
    let expected: Vec<(&str, u64)> =
        vec![("2", 3), ("3", 1), ("4", 1), ("5", 1), ("6", 3), ("9", 1)];
    let got: Vec<(&str, u64)> = artifact
        .classes
        .iter()
        .map(|(k, &v)| (k.as_str(), v))
        .collect();
    assert_eq!(got, expected);

    // Histogram counts cover the header's declared point count exactly.
    let total: u64 = artifact.classes.values().sum();
    assert_eq!(total, artifact.points_total);

    // No CRS declared: no geographic bbox.
    assert!(artifact.bbox_wgs84.is_none());
    assert!(artifact.coordinate_system.is_none());
}

#[test]
fn index_is_independent_of_chunk_size() {
    let build = |chunk_size: usize| {
        let mut source = histogram_source();
        let mut projector = identity();
        IndexBuilder::new(CancelToken::new())
            .with_chunk_size(chunk_size)
            .build(&mut source, &mut projector, "idx-1")
            .unwrap()
    };
    let small = build(1);
    let large = build(1000);
    assert_eq!(small.classes, large.classes);
    assert_eq!(small.bbox_native, large.bbox_native);
    assert_eq!(small.coordinate_system, large.coordinate_system);
}

fn profile_request(line: &[[f64; 2]], buffer_m: f64, step_m: f64) -> ProfileRequest {
    let descriptor: JobDescriptor = serde_json::from_value(json!({
        "id": "prof-1",
        "type": "profile",
        "inputFile": "raw.las",
        "line": {"type": "Feature", "geometry": {
            "type": "LineString",
            "coordinates": line.iter().map(|c| vec![c[0], c[1]]).collect::<Vec<_>>(),
        }},
        "buffer_m": buffer_m,
        "step_m": step_m,
        "max_points_per_plan": 100,
    }))
    .unwrap();
    ProfileRequest::from_job(&descriptor).unwrap()
}

#[test]
fn profile_bins_corridor_points_along_the_line() {
    // Straight 100 m line, 50 m bins, 10 m corridor; three in-corridor
    // points at arc lengths 10, 60 and 90, plus one far outside.
    let mut source = MemorySource::new(vec![
        point(10.0, 1.0, 5.0, 2),
        point(60.0, -2.0, 7.0, 2),
        point(90.0, 3.0, 9.0, 2),
        point(50.0, 20.0, 99.0, 2),
    ]);
    let mut projector = identity();
    let request = profile_request(&[[0.0, 0.0], [100.0, 0.0]], 10.0, 50.0);

    let output = ProfileExtractor::new(CancelToken::new())
        .run(
            &mut source,
            &mut projector,
            &request,
            "prof-1",
            StdRng::seed_from_u64(0),
        )
        .unwrap();

    let series = &output.artifact.series;
    assert_eq!(series.len(), 2);

    assert_eq!(series[0].s_m, 0.0);
    assert_eq!(series[0].count, 1);
    assert_eq!(series[0].z_m, 5.0);
    assert_eq!((series[0].x, series[0].y), (0.0, 0.0));

    assert_eq!(series[1].s_m, 50.0);
    assert_eq!(series[1].count, 2);
    assert_eq!(series[1].z_m, 8.0);
    assert_eq!((series[1].x, series[1].y), (50.0, 0.0));

    // Series counts cover exactly the points that passed both filters.
    let emitted: u64 = series.iter().map(|entry| entry.count).sum();
    assert_eq!(emitted, 3);
    assert_eq!(output.plan.features.len(), 3);
}

#[test]
fn profile_applies_the_classification_filter() {
    let mut source = MemorySource::new(vec![
        point(10.0, 0.0, 1.0, 2),
        point(20.0, 0.0, 2.0, 9),
        point(30.0, 0.0, 3.0, 6),
    ]);
    let mut projector = identity();
    let mut request = profile_request(&[[0.0, 0.0], [100.0, 0.0]], 10.0, 50.0);
    request.classes = [2u8, 6].into_iter().collect();

    let output = ProfileExtractor::new(CancelToken::new())
        .run(
            &mut source,
            &mut projector,
            &request,
            "prof-2",
            StdRng::seed_from_u64(0),
        )
        .unwrap();

    let classes: Vec<u8> = output.artifact.series.iter().map(|e| e.cls).collect();
    assert_eq!(classes, vec![2, 6]);
    assert_eq!(output.plan.features.len(), 2);
}

#[test]
fn profile_sample_is_capped_while_series_stays_exact() {
    let mut source = MemorySource::new(
        (0..50)
            .map(|i| point(i as f64 * 2.0, 0.5, 1.0, 2))
            .collect(),
    );
    let mut projector = identity();
    let mut request = profile_request(&[[0.0, 0.0], [100.0, 0.0]], 10.0, 50.0);
    request.max_plan_points = 7;

    let output = ProfileExtractor::new(CancelToken::new())
        .run(
            &mut source,
            &mut projector,
            &request,
            "prof-3",
            StdRng::seed_from_u64(11),
        )
        .unwrap();

    assert_eq!(output.plan.features.len(), 7);
    let emitted: u64 = output.artifact.series.iter().map(|e| e.count).sum();
    assert_eq!(emitted, 50);
}

#[test]
fn zero_length_line_is_a_terminal_input_error() {
    let mut source = MemorySource::new(vec![point(0.0, 0.0, 0.0, 2)]);
    let mut projector = identity();
    let request = profile_request(&[[5.0, 5.0], [5.0, 5.0]], 10.0, 1.0);

    let err = ProfileExtractor::new(CancelToken::new())
        .run(
            &mut source,
            &mut projector,
            &request,
            "prof-4",
            StdRng::seed_from_u64(0),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Input(_)));
    assert!(err.is_terminal());
}

#[test]
fn invalid_request_parameters_are_rejected() {
    let make = |buffer_m: f64, step_m: f64| {
        let descriptor: JobDescriptor = serde_json::from_value(json!({
            "id": "prof-5", "type": "profile", "inputFile": "raw.las",
            "line": {"type": "Feature", "geometry": {
                "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}},
            "buffer_m": buffer_m, "step_m": step_m,
        }))
        .unwrap();
        ProfileRequest::from_job(&descriptor)
    };
    assert!(matches!(make(0.0, 0.5), Err(EngineError::Input(_))));
    assert!(matches!(make(-1.0, 0.5), Err(EngineError::Input(_))));
    assert!(matches!(make(25.0, 0.0), Err(EngineError::Input(_))));
    assert!(make(25.0, 0.5).is_ok());

    let no_line: JobDescriptor = serde_json::from_value(json!({
        "id": "prof-6", "type": "profile", "inputFile": "raw.las"
    }))
    .unwrap();
    assert!(matches!(
        ProfileRequest::from_job(&no_line),
        Err(EngineError::Input(_))
    ));
}

#[test]
fn cancellation_aborts_between_chunks() {
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut source = histogram_source();
    let mut projector = identity();
    let err = IndexBuilder::new(cancel.clone())
        .with_chunk_size(2)
        .build(&mut source, &mut projector, "idx-2")
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert!(!err.is_terminal());
}
