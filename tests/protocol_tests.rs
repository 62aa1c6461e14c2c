use railyard::layout::{JunctionId, SensorId, ServoPosition};
use railyard::protocol::{
    CommandFrame, Frame, OutboundCommand, ProtocolHandler, ProtocolError, ReplyStatus, Request,
    RequestKind, MAX_TARGET_SPEED,
};
use railyard::sample;
use railyard::telemetry::{ControllerStats, TelemetryCollector};
use railyard::train::TrainId;

#[test]
fn client_request_lines_parse() {
    let mut handler = ProtocolHandler::new();

    let odometry = handler
        .parse_request(r#"{"id":1,"timestamp":100,"kind":{"Odometry":{"train":0,"delta":-3.5}}}"#)
        .unwrap();
    assert_eq!(
        odometry.kind,
        RequestKind::Odometry {
            train: TrainId(0),
            delta: -3.5,
        }
    );

    let sensor = handler
        .parse_request(r#"{"id":2,"timestamp":101,"kind":{"SensorFired":{"sensor":1}}}"#)
        .unwrap();
    assert_eq!(
        sensor.kind,
        RequestKind::SensorFired {
            sensor: SensorId(1),
        }
    );

    let servo = handler
        .parse_request(
            r#"{"id":3,"timestamp":102,"kind":{"SetServo":{"junction":1,"position":"Curve"}}}"#,
        )
        .unwrap();
    assert_eq!(
        servo.kind,
        RequestKind::SetServo {
            junction: JunctionId(1),
            position: ServoPosition::Curve,
        }
    );

    let status = handler
        .parse_request(r#"{"id":4,"timestamp":103,"kind":"Status"}"#)
        .unwrap();
    assert_eq!(status.kind, RequestKind::Status);
}

#[test]
fn validation_runs_during_parse() {
    let mut handler = ProtocolHandler::new();
    let result = handler.parse_request(
        r#"{"id":5,"timestamp":0,"kind":{"SetTargetSpeed":{"train":0,"speed":1e300}}}"#,
    );
    assert_eq!(result, Err(ProtocolError::SpeedOutOfRange));
}

#[test]
fn the_speed_bound_is_symmetric() {
    let forward = Request {
        id: 1,
        timestamp: 0,
        kind: RequestKind::SetTargetSpeed {
            train: TrainId(0),
            speed: MAX_TARGET_SPEED,
        },
    };
    assert!(ProtocolHandler::validate(&forward).is_ok());

    let backward = Request {
        id: 2,
        timestamp: 0,
        kind: RequestKind::SetTargetSpeed {
            train: TrainId(0),
            speed: -MAX_TARGET_SPEED,
        },
    };
    assert!(ProtocolHandler::validate(&backward).is_ok());

    let too_fast = Request {
        id: 3,
        timestamp: 0,
        kind: RequestKind::SetTargetSpeed {
            train: TrainId(0),
            speed: -(MAX_TARGET_SPEED + 0.5),
        },
    };
    assert_eq!(
        ProtocolHandler::validate(&too_fast),
        Err(ProtocolError::SpeedOutOfRange)
    );
}

#[test]
fn replies_carry_the_request_id() {
    let request = Request {
        id: 77,
        timestamp: 5,
        kind: RequestKind::Status,
    };
    let accepted = ProtocolHandler::accepted(&request, 6, None);
    assert_eq!(accepted.id, 77);
    assert_eq!(accepted.status, ReplyStatus::Accepted);

    let rejected = ProtocolHandler::rejected(77, 6, "unknown sensor 9");
    assert_eq!(rejected.status, ReplyStatus::Rejected);
    assert_eq!(rejected.message.as_deref(), Some("unknown sensor 9"));
}

#[test]
fn command_frames_round_trip_on_the_wire() {
    let frame = Frame::Commands(CommandFrame {
        cycle: 12,
        timestamp: 1200,
        commands: vec![
            OutboundCommand::SetTrainSpeed {
                train: TrainId(0),
                speed: 55.0,
            },
            OutboundCommand::SetJunctionServo {
                junction: JunctionId(1),
                position: ServoPosition::Straight,
            },
        ],
    });
    let json = ProtocolHandler::serialize_frame(&frame).unwrap();
    assert_eq!(serde_json::from_str::<Frame>(&json).unwrap(), frame);
}

#[test]
fn telemetry_frames_fit_the_wire_bound() {
    let (layout, trains) = sample::passing_loop_plan().build().unwrap();
    let mut collector = TelemetryCollector::new();
    let stats = ControllerStats {
        cycles: u64::MAX,
        odometry_applied: u64::MAX,
        corrections_applied: u64::MAX,
        corrections_ignored: u64::MAX,
        failed_events: u64::MAX,
        last_error: Some("x".repeat(200)),
    };
    let frame = Frame::Telemetry(collector.frame(u64::MAX, u64::MAX, &trains, &layout, &stats));
    // Worst-case counters on the full sample roster still serialize.
    ProtocolHandler::serialize_frame(&frame).unwrap();
}

#[test]
fn unknown_request_kinds_are_invalid_json() {
    let mut handler = ProtocolHandler::new();
    let result =
        handler.parse_request(r#"{"id":1,"timestamp":0,"kind":{"SelfDestruct":{"really":true}}}"#);
    assert_eq!(result, Err(ProtocolError::InvalidJson));
}
