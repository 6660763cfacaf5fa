use clap::{Parser, Subcommand, ValueEnum};
use pt_config::{CarFile, ConfigResult};
use pt_sim::{SimRecord, ThrottleProfile};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "pt-cli")]
#[command(about = "Powertrain CLI - engine, converter and gearbox drive simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a drive simulation
    Run {
        /// Path to the car file (YAML or JSON)
        config: PathBuf,
        /// Constant throttle in [0, 1], overriding the file's profile
        #[arg(long)]
        throttle: Option<f64>,
        /// Simulated duration in seconds
        #[arg(long)]
        duration: Option<f64>,
        /// Time step in seconds
        #[arg(long, conflicts_with = "calibrate")]
        dt: Option<f64>,
        /// Measure the time step that keeps pace with wall-clock time
        #[arg(long)]
        calibrate: bool,
        /// Include per-cylinder telemetry
        #[arg(long)]
        cylinders: bool,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Output file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate car file syntax and values
    Validate {
        /// Path to the car file (YAML or JSON)
        config: PathBuf,
    },
    /// Measure the real-time step for a car
    Calibrate {
        /// Path to the car file (YAML or JSON)
        config: PathBuf,
        /// Number of steps to time
        #[arg(long, default_value_t = 20_000)]
        samples: usize,
    },
    /// Write the default car file
    Defaults {
        /// Output file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Json,
}

struct RunArgs {
    throttle: Option<f64>,
    duration: Option<f64>,
    dt: Option<f64>,
    calibrate: bool,
    cylinders: bool,
    format: Format,
}

const CALIBRATION_SAMPLES: usize = 20_000;

fn main() -> ConfigResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            throttle,
            duration,
            dt,
            calibrate,
            cylinders,
            format,
            output,
        } => cmd_run(
            &config,
            RunArgs {
                throttle,
                duration,
                dt,
                calibrate,
                cylinders,
                format,
            },
            output.as_deref(),
        ),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Calibrate { config, samples } => cmd_calibrate(&config, samples),
        Commands::Defaults { output } => cmd_defaults(output.as_deref()),
    }
}

fn cmd_run(config: &Path, args: RunArgs, output: Option<&Path>) -> ConfigResult<()> {
    let mut file = pt_config::load(config)?;

    if let Some(throttle) = args.throttle {
        file.run.throttle = ThrottleProfile::Constant { throttle };
    }
    if let Some(duration) = args.duration {
        file.run.duration_s = duration;
    }
    if let Some(dt) = args.dt {
        file.run.dt_s = dt;
    }
    if args.calibrate {
        file.run.dt_s = pt_sim::calibrate_time_step(&file.car, CALIBRATION_SAMPLES)?;
    }
    pt_config::validate_car_file(&file)?;

    let (mut car, opts) = pt_config::build(&file)?;
    car.set_cylinder_telemetry(args.cylinders);
    info!(name = %file.name, dt = opts.dt, t_end = opts.t_end, "running");

    let record = pt_sim::run_sim(&mut car, &file.run.throttle, &opts)?;

    let text = match args.format {
        Format::Csv => to_csv(&record),
        Format::Json => serde_json::to_string_pretty(&record)?,
    };

    if let Some(path) = output {
        std::fs::write(path, text)?;
        print_summary(&record);
        println!("✓ Wrote {} samples to {}", record.x.len(), path.display());
    } else {
        print!("{}", text);
    }
    Ok(())
}

fn cmd_validate(config: &Path) -> ConfigResult<()> {
    println!("Validating car file: {}", config.display());
    let file = pt_config::load(config)?;
    // Building catches what only the components can check
    pt_config::build(&file)?;
    println!("✓ Car file is valid: {}", file.name);
    Ok(())
}

fn cmd_calibrate(config: &Path, samples: usize) -> ConfigResult<()> {
    let file = pt_config::load(config)?;
    println!("Timing {} steps of {}", samples, file.name);
    let dt = pt_sim::calibrate_time_step(&file.car, samples)?;
    println!("✓ Real-time step: {:.3e} s ({:.0} steps per second)", dt, 1.0 / dt);
    Ok(())
}

fn cmd_defaults(output: Option<&Path>) -> ConfigResult<()> {
    let file = CarFile::default();
    if let Some(path) = output {
        pt_config::save_yaml(path, &file)?;
        println!("✓ Wrote default car file to {}", path.display());
    } else {
        print!("{}", pt_config::to_yaml_string(&file)?);
    }
    Ok(())
}

fn to_csv(record: &SimRecord) -> String {
    let cylinder_count = record
        .x
        .first()
        .and_then(|o| o.cylinders.as_ref())
        .map_or(0, Vec::len);

    let mut csv = String::from("time_s,rpm,road_speed_mph,gear,torque_nm,horsepower,just_shifted");
    for i in 0..cylinder_count {
        csv.push_str(&format!(
            ",cyl{i}_stroke,cyl{i}_piston_m,cyl{i}_pressure_pa,cyl{i}_temperature_k"
        ));
    }
    csv.push('\n');

    for out in &record.x {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}",
            out.time_s,
            out.rpm,
            out.road_speed_mph,
            out.gear,
            out.torque_nm,
            out.horsepower,
            u8::from(out.just_shifted)
        ));
        for cyl in out.cylinders.iter().flatten() {
            csv.push_str(&format!(
                ",{:?},{},{},{}",
                cyl.stroke, cyl.piston_position_m, cyl.pressure_pa, cyl.temperature_k
            ));
        }
        csv.push('\n');
    }
    csv
}

fn print_summary(record: &SimRecord) {
    if let Some(last) = record.x.last() {
        println!("\nRun summary:");
        println!("  Duration:    {:.2} s", last.time_s);
        println!("  Final gear:  {}", last.gear);
        println!("  Final speed: {:.1} mph", last.road_speed_mph);
        println!("  Final rpm:   {:.0}", last.rpm);
        let peak_hp = record.x.iter().map(|o| o.horsepower).fold(0.0, f64::max);
        println!("  Peak power:  {:.1} hp", peak_hp);
    }
    if !record.shifts.is_empty() {
        println!("\nShifts:");
        for event in &record.shifts {
            println!(
                "  {:>7.2} s  {} -> {}  ({:.0} rpm, {:.1} mph)",
                event.time_s, event.from_gear, event.to_gear, event.rpm, event.mph
            );
        }
    }
}
