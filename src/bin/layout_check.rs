use clap::{App, Arg};
use colored::*;
use railyard::layout::Continuation;
use railyard::plan::TrackPlan;
use railyard::sample;
use railyard::topology::Position;

fn main() {
    let matches = App::new("layout-check")
        .version("0.1.0")
        .author("Layout Control Engineering Team")
        .about("🛤️  Validate a track plan file and summarize the layout")
        .arg(
            Arg::with_name("plan")
                .help("Track plan JSON file")
                .value_name("FILE")
                .required_unless("sample"),
        )
        .arg(
            Arg::with_name("sample")
                .long("sample")
                .help("Check the built-in passing-loop plan instead of a file"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .help("Only report pass/fail"),
        )
        .get_matches();

    let quiet = matches.is_present("quiet");

    let plan = if matches.is_present("sample") {
        sample::passing_loop_plan()
    } else {
        let path = matches.value_of("plan").unwrap();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("{} Cannot read {}: {}", "❌".red(), path.bright_white(), e);
                std::process::exit(1);
            }
        };
        match TrackPlan::from_json(&json) {
            Ok(plan) => plan,
            Err(e) => {
                eprintln!("{} {} is not a valid track plan: {}", "❌".red(), path.bright_white(), e);
                std::process::exit(1);
            }
        }
    };

    let (layout, trains) = match plan.build() {
        Ok(built) => built,
        Err(e) => {
            eprintln!("{} Plan rejected: {}", "❌".red(), e.to_string().bright_red());
            std::process::exit(1);
        }
    };

    if quiet {
        println!("{}", "OK".bright_green());
        return;
    }

    println!("{}", "🛤️  Track Plan Summary".bright_blue().bold());
    println!("{}", "═════════════════════".bright_blue());

    println!("\n{}", "Sections".bright_white().bold());
    let mut total_length = 0.0;
    for section in layout.sections() {
        total_length += section.length();
        println!(
            "  #{} {} → {} ({:.2} cm, {}/{})",
            section.id().to_string().bright_cyan(),
            section.source(),
            section.target(),
            section.length(),
            section.source_state(),
            section.target_state(),
        );
    }
    println!("  total track length {:.2} cm", total_length);

    println!("\n{}", "Junctions".bright_white().bold());
    for junction in layout.junctions() {
        let shape = match junction.outbound() {
            Continuation::Fixed(_) => "fixed".dimmed(),
            Continuation::Branch { .. } => "branch".bright_yellow(),
        };
        let servo = match junction.servo() {
            Some(servo) => format!("servo {}", servo).bright_green(),
            None => "no servo".dimmed(),
        };
        println!("  #{} {} ({})", junction.id().to_string().bright_cyan(), shape, servo);
    }

    println!("\n{}", "Sensors".bright_white().bold());
    for sensor in layout.sensors() {
        println!(
            "  #{} on section {} at {:.2} cm",
            sensor.id().to_string().bright_cyan(),
            sensor.section(),
            sensor.position(),
        );
    }

    println!("\n{}", "Stations".bright_white().bold());
    for station in layout.stations() {
        let platforms = layout
            .platforms_of(station.id())
            .map(|platforms| platforms.len())
            .unwrap_or(0);
        println!(
            "  #{} \"{}\" ({} platforms)",
            station.id().to_string().bright_cyan(),
            station.name(),
            platforms,
        );
    }

    println!("\n{}", "Trains".bright_white().bold());
    for train in &trains {
        println!(
            "  #{} on section {} at {:.2} cm",
            train.id().to_string().bright_cyan(),
            train.section(),
            train.mileage(),
        );
    }

    // Reachability: every section must reach every other section forward.
    let mut unreachable = 0usize;
    for from in layout.sections() {
        for to in layout.sections() {
            if from.id() == to.id() {
                continue;
            }
            if layout
                .distance(Position::new(from.id(), 0.0), Position::new(to.id(), 0.0))
                .is_err()
            {
                println!(
                    "  {} no forward path from section {} to section {}",
                    "⚠".yellow(),
                    from.id(),
                    to.id(),
                );
                unreachable += 1;
            }
        }
    }

    let actuated = layout.junctions().iter().filter(|j| j.servo().is_some()).count();
    println!(
        "\n{} {} junctions ({} actuated), {} sections, {} sensors, {} stations, {} trains",
        "✅".green(),
        layout.junctions().len(),
        actuated,
        layout.sections().len(),
        layout.sensors().len(),
        layout.stations().len(),
        trains.len(),
    );
    if unreachable > 0 {
        println!("{} {} unreachable section pairs", "⚠".yellow(), unreachable);
    }
}
