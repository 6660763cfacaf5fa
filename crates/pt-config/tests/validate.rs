use pt_config::{CarFile, ConfigError, ValidationError, save_yaml, validate_car_file};
use pt_sim::{ThrottlePoint, ThrottleProfile};

fn field_of(err: ValidationError) -> String {
    match err {
        ValidationError::InvalidValue { field, .. } => field,
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn default_is_valid() {
    validate_car_file(&CarFile::default()).unwrap();
}

#[test]
fn unsupported_version() {
    for version in [0, 2] {
        let file = CarFile {
            version,
            ..CarFile::default()
        };
        assert!(matches!(
            validate_car_file(&file),
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }
}

#[test]
fn fatal_engine_fields() {
    let mut file = CarFile::default();
    file.car.engine.bore_m = 0.0;
    assert_eq!(field_of(validate_car_file(&file).unwrap_err()), "engine.bore_m");

    let mut file = CarFile::default();
    file.car.engine.compression_ratio = 1.0;
    assert_eq!(
        field_of(validate_car_file(&file).unwrap_err()),
        "engine.compression_ratio"
    );

    let mut file = CarFile::default();
    file.car.engine.moment_override = Some(-1.0);
    assert_eq!(
        field_of(validate_car_file(&file).unwrap_err()),
        "engine.moment_override"
    );
}

#[test]
fn tunable_fields_are_not_fatal() {
    // Components fall back to defaults for these
    let mut file = CarFile::default();
    file.car.engine.combustion_efficiency = -0.5;
    file.car.transmission.shift_time_s = 0.0;
    file.car.torque_converter.k_factor = 0.5;
    validate_car_file(&file).unwrap();
}

#[test]
fn gear_ratios() {
    let mut file = CarFile::default();
    file.car.transmission.ratios.clear();
    assert_eq!(
        field_of(validate_car_file(&file).unwrap_err()),
        "transmission.ratios"
    );

    let mut file = CarFile::default();
    file.car.transmission.ratios[2] = -1.6;
    assert_eq!(
        field_of(validate_car_file(&file).unwrap_err()),
        "transmission.ratios[2]"
    );

    let mut file = CarFile::default();
    file.car.transmission.ratios.swap(3, 4);
    let err = validate_car_file(&file).unwrap_err();
    assert!(err.to_string().contains("strictly decreasing"));
    assert_eq!(field_of(err), "transmission.ratios");

    let mut file = CarFile::default();
    file.car.transmission.ratios = vec![1.0];
    file.car.transmission.schedule.up.clear();
    file.car.transmission.schedule.down.clear();
    validate_car_file(&file).unwrap();
}

#[test]
fn run_section() {
    let mut file = CarFile::default();
    file.run.dt_s = 0.0;
    assert_eq!(field_of(validate_car_file(&file).unwrap_err()), "run.dt_s");

    let mut file = CarFile::default();
    file.run.dt_s = 0.01;
    assert_eq!(field_of(validate_car_file(&file).unwrap_err()), "run.dt_s");

    let mut file = CarFile::default();
    file.run.record_every = 0;
    assert_eq!(
        field_of(validate_car_file(&file).unwrap_err()),
        "run.record_every"
    );

    let mut file = CarFile::default();
    file.run.throttle = ThrottleProfile::Constant { throttle: 1.5 };
    assert_eq!(field_of(validate_car_file(&file).unwrap_err()), "run.throttle");
}

#[test]
fn throttle_steps_must_be_ordered() {
    let mut file = CarFile::default();
    file.run.throttle = ThrottleProfile::Steps {
        points: vec![
            ThrottlePoint {
                t_s: 5.0,
                throttle: 1.0,
            },
            ThrottlePoint {
                t_s: 2.0,
                throttle: 0.0,
            },
        ],
    };
    assert_eq!(
        field_of(validate_car_file(&file).unwrap_err()),
        "run.throttle.points"
    );

    file.run.throttle = ThrottleProfile::Steps { points: vec![] };
    assert!(validate_car_file(&file).is_err());
}

#[test]
fn save_refuses_invalid_file() {
    let mut file = CarFile::default();
    file.car.transmission.ratios.clear();
    let path = std::env::temp_dir().join("pt_config_invalid.yaml");
    assert!(matches!(
        save_yaml(&path, &file),
        Err(ConfigError::Validation(_))
    ));
}
