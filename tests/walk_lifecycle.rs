//! Lifecycle behaviour against a mock database: the conditional-update race
//! rules, the matching guards and the geofenced start/end flow.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use uuid::Uuid;

use walkbroker::entity::sea_orm_active_enums::{WalkSource, WalkStatus, WalkType};
use walkbroker::entity::{
    user_fcm_tokens, walk_payment_methods, walk_pets, walk_track_points, walker_profiles, walks,
};
use walkbroker::{
    ActingUser, CreateWalkRequest, EndWalkRequest, LatLng, NotificationService,
    OfflineRouteProvider, StartWalkRequest, TrackPointRequest, TrackingService, WalkError,
    WalkExecutionService, WalkService, geo_math,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn origin() -> LatLng {
    LatLng::new(19.4326, -99.1332)
}

fn destination() -> LatLng {
    // Roughly 550 m north of the origin.
    geo_math::destination_from_bearing(origin(), 0.55, 0.0)
}

fn walk_model(id: Uuid, client_id: Uuid, status: WalkStatus, walker_id: Option<Uuid>) -> walks::Model {
    let now = Utc::now().fixed_offset();
    walks::Model {
        id,
        client_id,
        walker_id,
        predefined_route_id: None,
        r#type: WalkType::Time,
        source: WalkSource::Custom,
        status,
        origin_lat: Some(origin().lat),
        origin_lng: Some(origin().lng),
        destination_lat: Some(destination().lat),
        destination_lng: Some(destination().lng),
        pickup_lat: None,
        pickup_lng: None,
        dropoff_lat: None,
        dropoff_lng: None,
        selected_route_polyline: Some("_p~iF~ps|U_ulLnnqC".to_string()),
        estimated_distance_meters: Some(2000),
        estimated_duration_seconds: Some(600),
        requested_start_time: now,
        actual_start_time: None,
        actual_end_time: None,
        price_amount: 49.0,
        price_currency: "MXN".to_string(),
        agreed_payment_method_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn profile_model(walker_id: Uuid, max_dogs: i32) -> walker_profiles::Model {
    let now = Utc::now().fixed_offset();
    walker_profiles::Model {
        id: Uuid::new_v4(),
        user_id: walker_id,
        bio: None,
        experience: None,
        service_zone_label: "Condesa".to_string(),
        rating_average: 4.8,
        total_reviews: 12,
        max_dogs,
        service_center_lat: origin().lat,
        service_center_lng: origin().lng,
        zone_radius_km: 5.0,
        created_at: now,
        updated_at: now,
    }
}

fn pet_row(walk_id: Uuid) -> walk_pets::Model {
    walk_pets::Model {
        id: Uuid::new_v4(),
        walk_id,
        pet_id: Uuid::new_v4(),
    }
}

fn payment_row(walk_id: Uuid, payment_method_id: Uuid) -> walk_payment_methods::Model {
    walk_payment_methods::Model {
        id: Uuid::new_v4(),
        walk_id,
        payment_method_id,
    }
}

fn point_row(walk_id: Uuid, at: LatLng, ts: i64) -> walk_track_points::Model {
    walk_track_points::Model {
        id: Uuid::new_v4(),
        walk_id,
        lat: at.lat,
        lng: at.lng,
        timestamp_millis: Some(ts),
        accuracy_meters: Some(5.0),
        speed_mps: None,
        battery_level: None,
        is_manual: false,
        created_at: Utc::now().fixed_offset(),
    }
}

fn exec_ok() -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: 1,
    }
}

fn exec_zero() -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: 0,
    }
}

fn walk_service(db: DatabaseConnection) -> WalkService {
    WalkService::new(
        db,
        Arc::new(OfflineRouteProvider::default()),
        Arc::new(NotificationService::disabled()),
    )
}

fn execution_service(db: DatabaseConnection) -> WalkExecutionService {
    // `DatabaseConnection` only derives `Clone` when the `mock` feature is
    // off; under the mock-backed test build we share the same underlying
    // connection by cloning its `Arc`, which is exactly what cloning a real
    // pooled connection would do.
    let shared = match &db {
        DatabaseConnection::MockDatabaseConnection(conn) => {
            DatabaseConnection::MockDatabaseConnection(conn.clone())
        }
        _ => unreachable!("tests run against a mock database"),
    };
    WalkExecutionService::new(
        shared,
        Arc::new(TrackingService::new(db)),
        Arc::new(NotificationService::disabled()),
    )
}

#[tokio::test]
async fn accept_race_yields_one_winner_and_one_conflict() {
    init_logging();
    let walk_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let walker_a = Uuid::new_v4();
    let walker_b = Uuid::new_v4();
    let pm_id = Uuid::new_v4();

    let pending = walk_model(walk_id, client_id, WalkStatus::Pending, None);
    let mut accepted = walk_model(walk_id, client_id, WalkStatus::Accepted, Some(walker_a));
    accepted.agreed_payment_method_id = Some(pm_id);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // Walker A: guards pass, conditional update wins.
        .append_query_results([vec![profile_model(walker_a, 2)]])
        .append_query_results([vec![pending.clone()]])
        .append_query_results([vec![pet_row(walk_id)]])
        .append_query_results([vec![payment_row(walk_id, pm_id)]])
        .append_exec_results([exec_ok()])
        .append_query_results([vec![accepted.clone()]])
        .append_query_results([vec![pet_row(walk_id)]])
        .append_query_results([vec![payment_row(walk_id, pm_id)]])
        .append_query_results([Vec::<user_fcm_tokens::Model>::new()])
        // Walker B: read the same pending snapshot, lost the write.
        .append_query_results([vec![profile_model(walker_b, 2)]])
        .append_query_results([vec![pending.clone()]])
        .append_query_results([vec![pet_row(walk_id)]])
        .append_query_results([vec![payment_row(walk_id, pm_id)]])
        .append_exec_results([exec_zero()])
        .into_connection();

    let service = walk_service(db);

    let won = service
        .accept_walk(&ActingUser::walker(walker_a), walk_id, pm_id)
        .await
        .unwrap();
    assert_eq!(won.status, WalkStatus::Accepted);
    assert_eq!(won.walker_id, Some(walker_a));

    let lost = service
        .accept_walk(&ActingUser::walker(walker_b), walk_id, pm_id)
        .await
        .unwrap_err();
    assert!(matches!(lost, WalkError::StateConflict(_)), "got {lost:?}");
}

#[tokio::test]
async fn accept_rejects_walks_over_the_walker_capacity() {
    let walk_id = Uuid::new_v4();
    let walker_id = Uuid::new_v4();
    let pending = walk_model(walk_id, Uuid::new_v4(), WalkStatus::Pending, None);

    // Two pets against a one-dog walker: no conditional update is attempted.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![profile_model(walker_id, 1)]])
        .append_query_results([vec![pending]])
        .append_query_results([vec![pet_row(walk_id), pet_row(walk_id)]])
        .into_connection();

    let err = walk_service(db)
        .accept_walk(&ActingUser::walker(walker_id), walk_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::StateConflict(_)), "got {err:?}");
}

#[tokio::test]
async fn accept_rejects_payment_methods_not_offered_on_the_walk() {
    let walk_id = Uuid::new_v4();
    let walker_id = Uuid::new_v4();
    let pending = walk_model(walk_id, Uuid::new_v4(), WalkStatus::Pending, None);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![profile_model(walker_id, 3)]])
        .append_query_results([vec![pending]])
        .append_query_results([vec![pet_row(walk_id)]])
        .append_query_results([vec![payment_row(walk_id, Uuid::new_v4())]])
        .into_connection();

    let err = walk_service(db)
        .accept_walk(&ActingUser::walker(walker_id), walk_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::StateConflict(_)), "got {err:?}");
}

#[tokio::test]
async fn accept_requires_a_walker_profile() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<walker_profiles::Model>::new()])
        .into_connection();

    let err = walk_service(db)
        .accept_walk(&ActingUser::walker(Uuid::new_v4()), Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn accept_rejects_already_taken_walks_before_writing() {
    let walk_id = Uuid::new_v4();
    let walker_id = Uuid::new_v4();
    let taken = walk_model(walk_id, Uuid::new_v4(), WalkStatus::Accepted, Some(Uuid::new_v4()));

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![profile_model(walker_id, 3)]])
        .append_query_results([vec![taken]])
        .into_connection();

    let err = walk_service(db)
        .accept_walk(&ActingUser::walker(walker_id), walk_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::StateConflict(_)), "got {err:?}");
}

#[tokio::test]
async fn cancel_is_conditional_on_pending() {
    let walk_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();

    // Zero rows affected: the walk had already left PENDING.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec_zero()])
        .into_connection();

    let err = walk_service(db)
        .cancel_pending_walk(&ActingUser::client(client_id), walk_id)
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::StateConflict(_)), "got {err:?}");
}

#[tokio::test]
async fn create_walk_persists_and_prices_the_request() {
    let client_id = Uuid::new_v4();
    let pet = Uuid::new_v4();
    let pm = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec_ok(), exec_ok(), exec_ok()])
        .into_connection();

    let detail = walk_service(db)
        .create_walk(
            &ActingUser::client(client_id),
            CreateWalkRequest {
                walk_type: WalkType::Time,
                origin: Some(origin()),
                destination: None,
                pickup: None,
                dropoff: None,
                estimated_distance_meters: Some(1200),
                estimated_duration_seconds: Some(1800),
                selected_route_polyline: "_p~iF~ps|U".to_string(),
                requested_start_time: Utc::now().fixed_offset(),
                predefined_route_id: None,
                pet_ids: vec![pet],
                payment_method_ids: vec![pm],
            },
        )
        .await
        .unwrap();

    assert_eq!(detail.status, WalkStatus::Pending);
    assert_eq!(detail.client_id, client_id);
    assert_eq!(detail.walker_id, None);
    assert_eq!(detail.pet_ids, vec![pet]);
    assert_eq!(detail.payment_method_ids, vec![pm]);
    // 25.00 base + 12.00/km over 1.2 km.
    assert_eq!(detail.price_amount, 39.4);
}

#[tokio::test]
async fn create_walk_validation_fails_before_any_write() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let err = walk_service(db)
        .create_walk(
            &ActingUser::client(Uuid::new_v4()),
            CreateWalkRequest {
                walk_type: WalkType::Time,
                origin: Some(origin()),
                destination: None,
                pickup: None,
                dropoff: None,
                estimated_distance_meters: Some(1200),
                estimated_duration_seconds: Some(1800),
                selected_route_polyline: "_p~iF~ps|U".to_string(),
                requested_start_time: Utc::now().fixed_offset(),
                predefined_route_id: None,
                pet_ids: vec![],
                payment_method_ids: vec![Uuid::new_v4()],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn start_is_rejected_from_any_state_but_accepted() {
    for status in [
        WalkStatus::Pending,
        WalkStatus::Started,
        WalkStatus::WalkerFinished,
        WalkStatus::ReviewPending,
        WalkStatus::Completed,
        WalkStatus::Cancelled,
        WalkStatus::Inactive,
    ] {
        let walk_id = Uuid::new_v4();
        let walker_id = Uuid::new_v4();
        let walk = walk_model(walk_id, Uuid::new_v4(), status.clone(), Some(walker_id));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![walk]])
            .into_connection();

        let err = execution_service(db)
            .start_walk(
                &ActingUser::walker(walker_id),
                walk_id,
                StartWalkRequest {
                    start_photo_url: "walks/start.jpg".to_string(),
                    lat: origin().lat,
                    lng: origin().lng,
                    accuracy_meters: Some(5.0),
                },
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, WalkError::StateConflict(_)),
            "status {status:?} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn start_enforces_the_start_geofence() {
    let walk_id = Uuid::new_v4();
    let walker_id = Uuid::new_v4();
    let walk = walk_model(walk_id, Uuid::new_v4(), WalkStatus::Accepted, Some(walker_id));

    // 251 m east of the origin anchor: outside the 250 m start radius.
    let away = geo_math::destination_from_bearing(origin(), 0.251, 90.0);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![walk]])
        .into_connection();

    let err = execution_service(db)
        .start_walk(
            &ActingUser::walker(walker_id),
            walk_id,
            StartWalkRequest {
                start_photo_url: "walks/start.jpg".to_string(),
                lat: away.lat,
                lng: away.lng,
                accuracy_meters: None,
            },
        )
        .await
        .unwrap_err();

    match err {
        WalkError::GeofenceViolation {
            distance_meters,
            radius_meters,
        } => {
            assert!((distance_meters - 251.0).abs() < 1.0);
            assert_eq!(radius_meters, 250.0);
        }
        other => panic!("expected geofence violation, got {other:?}"),
    }
}

#[tokio::test]
async fn start_transitions_accepted_to_started_and_initializes_tracking() {
    let walk_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let walker_id = Uuid::new_v4();
    let accepted = walk_model(walk_id, client_id, WalkStatus::Accepted, Some(walker_id));
    let mut started = walk_model(walk_id, client_id, WalkStatus::Started, Some(walker_id));
    started.actual_start_time = Some(Utc::now().fixed_offset());

    // 249 m from the anchor: inside the 250 m start radius.
    let near = geo_math::destination_from_bearing(origin(), 0.249, 90.0);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![accepted]])
        .append_exec_results([exec_ok(), exec_ok(), exec_ok()]) // photo, CAS, tracking meta
        .append_query_results([vec![started.clone()]])
        .append_query_results([vec![pet_row(walk_id)]])
        .append_query_results([vec![payment_row(walk_id, Uuid::new_v4())]])
        .into_connection();

    let detail = execution_service(db)
        .start_walk(
            &ActingUser::walker(walker_id),
            walk_id,
            StartWalkRequest {
                start_photo_url: "walks/start.jpg".to_string(),
                lat: near.lat,
                lng: near.lng,
                accuracy_meters: Some(4.0),
            },
        )
        .await
        .unwrap();

    assert_eq!(detail.status, WalkStatus::Started);
    assert!(detail.actual_start_time.is_some());
}

#[tokio::test]
async fn end_finishes_the_walk_and_summarizes_the_track() {
    let walk_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let walker_id = Uuid::new_v4();
    let started = walk_model(walk_id, client_id, WalkStatus::Started, Some(walker_id));
    let mut finished = walk_model(walk_id, client_id, WalkStatus::WalkerFinished, Some(walker_id));
    finished.actual_end_time = Some(Utc::now().fixed_offset());

    // Realized duration 500 s against a 600 s estimate: no review flag.
    let points = vec![
        point_row(walk_id, destination(), 500_000),
        point_row(walk_id, origin(), 0),
    ];

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![started]])
        .append_exec_results([
            exec_ok(), // photo
            exec_ok(), // CAS -> WALKER_FINISHED
            exec_ok(), // summary insert
            exec_ok(), // tracking meta deactivation
        ])
        .append_query_results([points])
        .append_query_results([vec![finished.clone()]])
        .append_query_results([vec![pet_row(walk_id)]])
        .append_query_results([vec![payment_row(walk_id, Uuid::new_v4())]])
        .append_query_results([Vec::<user_fcm_tokens::Model>::new()])
        .into_connection();

    let detail = execution_service(db)
        .end_walk(
            &ActingUser::walker(walker_id),
            walk_id,
            EndWalkRequest {
                end_photo_url: "walks/end.jpg".to_string(),
                lat: destination().lat,
                lng: destination().lng,
                accuracy_meters: Some(6.0),
            },
        )
        .await
        .unwrap();

    assert_eq!(detail.status, WalkStatus::WalkerFinished);
}

#[tokio::test]
async fn end_flags_duration_outliers_for_review() {
    let walk_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let walker_id = Uuid::new_v4();
    let started = walk_model(walk_id, client_id, WalkStatus::Started, Some(walker_id));
    let review = walk_model(walk_id, client_id, WalkStatus::ReviewPending, Some(walker_id));

    // Realized duration 1300 s: more than twice the 600 s estimate.
    let points = vec![
        point_row(walk_id, destination(), 1_300_000),
        point_row(walk_id, origin(), 0),
    ];

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![started]])
        .append_exec_results([
            exec_ok(), // photo
            exec_ok(), // CAS -> WALKER_FINISHED
            exec_ok(), // summary insert
            exec_ok(), // CAS -> REVIEW_PENDING
            exec_ok(), // tracking meta deactivation
        ])
        .append_query_results([points])
        .append_query_results([vec![review.clone()]])
        .append_query_results([vec![pet_row(walk_id)]])
        .append_query_results([vec![payment_row(walk_id, Uuid::new_v4())]])
        .append_query_results([Vec::<user_fcm_tokens::Model>::new()])
        .into_connection();

    let detail = execution_service(db)
        .end_walk(
            &ActingUser::walker(walker_id),
            walk_id,
            EndWalkRequest {
                end_photo_url: "walks/end.jpg".to_string(),
                lat: destination().lat,
                lng: destination().lng,
                accuracy_meters: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(detail.status, WalkStatus::ReviewPending);
}

#[tokio::test]
async fn end_is_rejected_from_any_state_but_started() {
    for status in [
        WalkStatus::Pending,
        WalkStatus::Accepted,
        WalkStatus::WalkerFinished,
        WalkStatus::ReviewPending,
        WalkStatus::Completed,
        WalkStatus::Cancelled,
        WalkStatus::Inactive,
    ] {
        let walk_id = Uuid::new_v4();
        let walker_id = Uuid::new_v4();
        let walk = walk_model(walk_id, Uuid::new_v4(), status.clone(), Some(walker_id));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![walk]])
            .into_connection();

        let err = execution_service(db)
            .end_walk(
                &ActingUser::walker(walker_id),
                walk_id,
                EndWalkRequest {
                    end_photo_url: "walks/end.jpg".to_string(),
                    lat: destination().lat,
                    lng: destination().lng,
                    accuracy_meters: None,
                },
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, WalkError::StateConflict(_)),
            "status {status:?} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn tracking_points_require_a_started_walk_owned_by_the_walker() {
    let walk_id = Uuid::new_v4();
    let walker_id = Uuid::new_v4();

    // Wrong walker.
    let other = walk_model(walk_id, Uuid::new_v4(), WalkStatus::Started, Some(Uuid::new_v4()));
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![other]])
        .into_connection();
    let err = TrackingService::new(db)
        .save_point(
            &ActingUser::walker(walker_id),
            walk_id,
            TrackPointRequest {
                lat: origin().lat,
                lng: origin().lng,
                timestamp_millis: Some(0),
                accuracy_meters: None,
                speed_mps: None,
                battery_level: None,
                is_manual: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::NotFound(_)), "got {err:?}");

    // Right walker, wrong state.
    let accepted = walk_model(walk_id, Uuid::new_v4(), WalkStatus::Accepted, Some(walker_id));
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![accepted]])
        .into_connection();
    let err = TrackingService::new(db)
        .save_point(
            &ActingUser::walker(walker_id),
            walk_id,
            TrackPointRequest {
                lat: origin().lat,
                lng: origin().lng,
                timestamp_millis: Some(0),
                accuracy_meters: None,
                speed_mps: None,
                battery_level: None,
                is_manual: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::StateConflict(_)), "got {err:?}");

    // Right walker, started walk: the point is stored.
    let started = walk_model(walk_id, Uuid::new_v4(), WalkStatus::Started, Some(walker_id));
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![started]])
        .append_exec_results([exec_ok()])
        .into_connection();
    TrackingService::new(db)
        .save_point(
            &ActingUser::walker(walker_id),
            walk_id,
            TrackPointRequest {
                lat: origin().lat,
                lng: origin().lng,
                timestamp_millis: Some(1_000),
                accuracy_meters: Some(8.0),
                speed_mps: Some(1.2),
                battery_level: Some(80),
                is_manual: false,
            },
        )
        .await
        .unwrap();
}
