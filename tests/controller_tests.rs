use railyard::controller::{
    ControllerError, LayoutController, ODOMETRY_QUEUE_DEPTH, SENSOR_QUEUE_DEPTH,
};
use railyard::layout::{JunctionId, LayoutError, LookupError, SectionId, SensorId, ServoPosition, StationId};
use railyard::protocol::OutboundCommand;
use railyard::sample;
use railyard::topology::TopologyError;
use railyard::train::TrainId;

fn sample_controller() -> LayoutController {
    LayoutController::from_plan(&sample::passing_loop_plan()).unwrap()
}

#[test]
fn every_train_gets_one_speed_command_per_cycle() {
    let mut controller = sample_controller();
    controller.set_target_speed(TrainId(0), 40.0).unwrap();
    controller.reconcile();
    let commands = controller.commands();

    let speeds: Vec<_> = commands
        .iter()
        .filter_map(|command| match command {
            OutboundCommand::SetTrainSpeed { train, speed } => Some((*train, *speed)),
            OutboundCommand::SetJunctionServo { .. } => None,
        })
        .collect();
    assert_eq!(speeds, vec![(TrainId(0), 40.0), (TrainId(1), 0.0)]);

    // Unchanged state emits all over again next cycle.
    controller.reconcile();
    assert_eq!(controller.commands(), commands);
}

#[test]
fn only_servo_junctions_emit_servo_commands() {
    let mut controller = sample_controller();
    controller
        .set_servo(JunctionId(1), ServoPosition::Curve)
        .unwrap();
    controller.reconcile();

    let servos: Vec<_> = controller
        .commands()
        .into_iter()
        .filter_map(|command| match command {
            OutboundCommand::SetJunctionServo { junction, position } => Some((junction, position)),
            OutboundCommand::SetTrainSpeed { .. } => None,
        })
        .collect();
    // Junction 2 is also switchable, but carries no physical actuator.
    assert_eq!(servos, vec![(JunctionId(1), ServoPosition::Curve)]);
}

#[test]
fn queue_overflow_is_an_explicit_error() {
    let mut controller = sample_controller();
    for _ in 0..ODOMETRY_QUEUE_DEPTH {
        controller.push_odometry(TrainId(0), 0.1).unwrap();
    }
    assert_eq!(
        controller.push_odometry(TrainId(0), 0.1),
        Err(ControllerError::OdometryQueueFull)
    );

    for _ in 0..SENSOR_QUEUE_DEPTH {
        controller.push_sensor(SensorId(0)).unwrap();
    }
    assert_eq!(
        controller.push_sensor(SensorId(0)),
        Err(ControllerError::SensorQueueFull)
    );

    // Draining frees the space again.
    controller.reconcile();
    controller.push_odometry(TrainId(0), 0.1).unwrap();
}

#[test]
fn dispatch_rejects_unknown_ids() {
    let mut controller = sample_controller();
    assert_eq!(
        controller.set_target_speed(TrainId(9), 10.0),
        Err(LookupError::UnknownTrain(TrainId(9)))
    );
    assert_eq!(
        controller.set_servo(JunctionId(0), ServoPosition::Curve),
        Err(LayoutError::NotSwitchable(JunctionId(0)))
    );
}

#[test]
fn stats_accumulate_across_cycles() {
    let mut controller = sample_controller();
    controller.push_odometry(TrainId(0), 2.0).unwrap();
    controller.push_odometry(TrainId(9), 2.0).unwrap();
    controller.reconcile();
    controller.push_odometry(TrainId(0), 1.0).unwrap();
    controller.reconcile();

    let stats = controller.stats();
    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.odometry_applied, 2);
    assert_eq!(stats.failed_events, 1);
    assert_eq!(
        stats.last_error.as_deref(),
        Some("unknown train 9")
    );
}

#[test]
fn telemetry_frames_follow_the_collector_cadence() {
    let mut controller = sample_controller();
    let mut emitted = 0;
    for _ in 0..20 {
        controller.reconcile();
        if controller.telemetry_frame(0).is_some() {
            emitted += 1;
        }
    }
    // Default cadence is every tenth cycle.
    assert_eq!(emitted, 2);

    // Snapshots are unconditional.
    let snapshot = controller.snapshot(123);
    assert_eq!(snapshot.timestamp, 123);
    assert_eq!(snapshot.cycle, 20);
    assert_eq!(snapshot.trains.len(), 2);
    assert_eq!(snapshot.junctions.len(), 4);
}

#[test]
fn sample_trains_reach_both_stations() {
    let controller = sample_controller();
    // Train 0 sits at station A's platform: distance zero.
    let at_platform = controller
        .distance_to_station(TrainId(0), StationId(0))
        .unwrap();
    assert!(at_platform.abs() < 1e-9);

    // Ahead to station B: rest of section 0, all of section 1, and the
    // platform offset on the nearer loop track.
    let to_b = controller
        .distance_to_station(TrainId(0), StationId(1))
        .unwrap();
    let expected = (118.25 - 64.5) + 175.1 + 64.5;
    assert!((to_b - expected).abs() < 1e-9);

    assert!(matches!(
        controller.distance_to_station(TrainId(7), StationId(0)),
        Err(TopologyError::Lookup(LookupError::UnknownTrain(TrainId(7))))
    ));
}

#[test]
fn a_full_lap_on_the_sample_layout_returns_home() {
    let mut controller = sample_controller();
    let start = {
        let train = controller.train(TrainId(0)).unwrap();
        (train.section(), train.mileage())
    };

    // Straight route lap: sections 0 + 1 + 2 + 4 = 543.7 cm.
    controller.push_odometry(TrainId(0), 543.7).unwrap();
    let report = controller.reconcile();
    assert!(report.is_clean());

    let train = controller.train(TrainId(0)).unwrap();
    assert_eq!(train.section(), start.0);
    assert!((train.mileage() - start.1).abs() < 1e-6);
}

#[test]
fn sensor_corrections_work_on_the_sample_layout() {
    let mut controller = sample_controller();
    // Send train 0 just short of sensor 0 on section 1: 118.25 - 64.5
    // leaves the section, plus 80 into section 1 (sensor sits at 87.55).
    controller.push_odometry(TrainId(0), 53.75 + 80.0).unwrap();
    controller.push_sensor(SensorId(0)).unwrap();
    let report = controller.reconcile();
    assert!(report.is_clean());
    assert_eq!(report.corrections_applied, 1);

    let train = controller.train(TrainId(0)).unwrap();
    assert_eq!(train.section(), SectionId(1));
    // Snapped to exactly the surveyed sensor position.
    assert_eq!(
        train.mileage(),
        sample::STRAIGHT_UNIT * 2.5 + sample::CURVE_UNIT * 2.0
    );
}
