use std::path::Path;

#[test]
fn shipped_default_car_loads_and_matches_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/default_car.yaml");
    let file = pt_config::load_yaml(&path)
        .unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e));

    assert_eq!(file, pt_config::CarFile::default());

    let (mut car, opts) = pt_config::build(&file).unwrap();
    assert_eq!(car.gear(), 1);
    assert_eq!(opts.dt, car.dt());

    // Short run to make sure the built car steps
    let short = pt_sim::SimOptions {
        t_end: 0.1,
        ..opts
    };
    let record = pt_sim::run_sim(&mut car, &file.run.throttle, &short).unwrap();
    assert!(record.x.iter().all(|o| o.rpm.is_finite()));
}
