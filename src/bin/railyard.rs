use clap::{App, Arg, ArgMatches, SubCommand};
use colored::*;
use std::process::Command;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("railyard")
        .version("0.1.0")
        .author("Layout Control Engineering Team")
        .about("🚂 Railyard - model railway layout controller client")
        .arg(
            Arg::with_name("host")
                .short("h")
                .long("host")
                .value_name("HOST")
                .help("Controller host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Controller port")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
                .global(true),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table", "compact"])
                .default_value("table")
                .global(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable verbose output")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("status")
                .about("📊 Get a snapshot of trains and junctions")
                .long_about("Requests an immediate telemetry snapshot from the layout controller"),
        )
        .subcommand(
            SubCommand::with_name("speed")
                .about("🚄 Set a train's target speed")
                .arg(
                    Arg::with_name("train")
                        .help("Train id")
                        .required(true)
                        .validator(validate_u32),
                )
                .arg(
                    Arg::with_name("value")
                        .help("Target speed (negative runs backward)")
                        .required(true)
                        .allow_hyphen_values(true)
                        .validator(validate_f64),
                ),
        )
        .subcommand(
            SubCommand::with_name("servo")
                .about("🔀 Switch a junction's servo")
                .arg(
                    Arg::with_name("junction")
                        .help("Junction id")
                        .required(true)
                        .validator(validate_u32),
                )
                .arg(
                    Arg::with_name("position")
                        .help("Servo position")
                        .required(true)
                        .possible_values(&["straight", "curve"]),
                ),
        )
        .subcommand(
            SubCommand::with_name("odometry")
                .about("📏 Inject an odometry report (testing aid)")
                .arg(
                    Arg::with_name("train")
                        .help("Train id")
                        .required(true)
                        .validator(validate_u32),
                )
                .arg(
                    Arg::with_name("delta")
                        .help("Distance moved since the last report")
                        .required(true)
                        .allow_hyphen_values(true)
                        .validator(validate_f64),
                ),
        )
        .subcommand(
            SubCommand::with_name("sensor")
                .about("🔔 Inject a sensor firing (testing aid)")
                .arg(
                    Arg::with_name("id")
                        .help("Sensor id")
                        .required(true)
                        .validator(validate_u32),
                ),
        )
        .subcommand(
            SubCommand::with_name("monitor")
                .about("📈 Monitor the live frame stream")
                .long_about("Continuously prints command and telemetry frames broadcast by the controller"),
        )
        .subcommand(
            SubCommand::with_name("server")
                .about("🚀 Start the layout controller server")
                .arg(
                    Arg::with_name("background")
                        .short("b")
                        .long("background")
                        .help("Run server in background"),
                ),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap();
    let port = matches.value_of("port").unwrap().parse::<u16>()?;
    let format = matches.value_of("format").unwrap();
    let verbose = matches.is_present("verbose");

    if verbose {
        println!("{}", "🚂 Railyard - layout controller client".bright_blue().bold());
        println!("{} {}:{}", "Connecting to".dimmed(), host, port);
    }

    match matches.subcommand() {
        ("status", _) => {
            handle_status(host, port, format).await?;
        }
        ("speed", Some(sub_matches)) => {
            let train: u32 = sub_matches.value_of("train").unwrap().parse()?;
            let speed: f64 = sub_matches.value_of("value").unwrap().parse()?;
            let response = send_request(host, port, create_speed_request(train, speed)).await?;
            print_reply_result("Target speed", &format!("train {} → {}", train, speed), &response, format);
        }
        ("servo", Some(sub_matches)) => {
            let junction: u32 = sub_matches.value_of("junction").unwrap().parse()?;
            let position = sub_matches.value_of("position").unwrap();
            let response = send_request(host, port, create_servo_request(junction, position)).await?;
            print_reply_result("Servo", &format!("junction {} → {}", junction, position), &response, format);
        }
        ("odometry", Some(sub_matches)) => {
            let train: u32 = sub_matches.value_of("train").unwrap().parse()?;
            let delta: f64 = sub_matches.value_of("delta").unwrap().parse()?;
            let response = send_request(host, port, create_odometry_request(train, delta)).await?;
            print_reply_result("Odometry", &format!("train {} moved {}", train, delta), &response, format);
        }
        ("sensor", Some(sub_matches)) => {
            let sensor: u32 = sub_matches.value_of("id").unwrap().parse()?;
            let response = send_request(host, port, create_sensor_request(sensor)).await?;
            print_reply_result("Sensor", &format!("sensor {} fired", sensor), &response, format);
        }
        ("monitor", _) => {
            handle_monitor(host, port, format).await?;
        }
        ("server", Some(sub_matches)) => {
            handle_server(sub_matches, port)?;
        }
        _ => {
            println!("{}", "No command specified. Use --help for usage information.".yellow());
            println!("{}", "Quick start:".bright_green());
            println!("  {} Start the controller server", "railyard server".bright_cyan());
            println!("  {} Show trains and junctions", "railyard status".bright_cyan());
            println!("  {} Watch the frame stream", "railyard monitor".bright_cyan());
        }
    }

    Ok(())
}

async fn handle_status(host: &str, port: u16, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let response = send_request(host, port, create_status_request()).await?;

    match format {
        "json" => println!("{}", response),
        _ => {
            let parsed: serde_json::Value = serde_json::from_str(&response)?;
            if parsed["status"] != "Accepted" {
                println!("{} {}", "❌".red(), "Status request rejected".bright_red());
                return Ok(());
            }
            let frame: serde_json::Value = match parsed["message"].as_str() {
                Some(message) => serde_json::from_str(message)?,
                None => {
                    println!("{} {}", "❌".red(), "Reply carried no snapshot".bright_red());
                    return Ok(());
                }
            };
            print_snapshot(&frame["Telemetry"], format);
        }
    }

    Ok(())
}

fn print_snapshot(telemetry: &serde_json::Value, format: &str) {
    if format == "compact" {
        let trains = telemetry["trains"].as_array().map_or(0, Vec::len);
        let cycle = telemetry["cycle"].as_u64().unwrap_or(0);
        println!("[cycle {}] {} trains tracked", cycle, trains);
        return;
    }

    println!("{}", "📊 Layout Status".bright_blue().bold());
    println!("{}", "════════════════".bright_blue());
    println!("Cycle: {}", telemetry["cycle"].as_u64().unwrap_or(0).to_string().bright_cyan());

    println!("\n{}", "Trains".bright_white().bold());
    if let Some(trains) = telemetry["trains"].as_array() {
        for train in trains {
            let id = train["train"].as_u64().unwrap_or(0);
            let section = train["section"].as_u64().unwrap_or(0);
            let mileage = train["mileage"].as_f64().unwrap_or(0.0);
            let speed = train["target_speed"].as_f64().unwrap_or(0.0);
            let speed_str = if speed == 0.0 {
                format!("{:>6.1}", speed).yellow()
            } else {
                format!("{:>6.1}", speed).green()
            };
            println!(
                "  #{} section {:>2} at {:>7.2} cm, target speed {}",
                id.to_string().bright_cyan(),
                section,
                mileage,
                speed_str,
            );
        }
    }

    println!("\n{}", "Junctions".bright_white().bold());
    if let Some(junctions) = telemetry["junctions"].as_array() {
        for junction in junctions {
            let id = junction["junction"].as_u64().unwrap_or(0);
            let out_state = junction["out_state"].as_str().unwrap_or("?");
            let servo = junction["servo"].as_u64();
            let servo_str = match servo {
                Some(servo) => format!("servo {}", servo).bright_green(),
                None => "no servo".dimmed(),
            };
            println!("  #{} {} ({})", id.to_string().bright_cyan(), out_state, servo_str);
        }
    }

    if let Some(stats) = telemetry.get("stats") {
        println!("\n{}", "Counters".bright_white().bold());
        println!(
            "  cycles {} | odometry {} | corrections {} | ignored {} | failed {}",
            stats["cycles"].as_u64().unwrap_or(0),
            stats["odometry_applied"].as_u64().unwrap_or(0),
            stats["corrections_applied"].as_u64().unwrap_or(0),
            stats["corrections_ignored"].as_u64().unwrap_or(0),
            stats["failed_events"].as_u64().unwrap_or(0),
        );
        if let Some(error) = stats["last_error"].as_str() {
            println!("  last error: {}", error.bright_red());
        }
    }
}

async fn handle_monitor(host: &str, port: u16, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "📡 Monitoring layout frames (Press Ctrl+C to stop)...".bright_blue().bold());

    let stream = TcpStream::connect((host, port)).await?;
    let mut lines = BufReader::new(stream).lines();

    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        match format {
            "json" => println!("{}", line),
            _ => {
                let Ok(frame) = serde_json::from_str::<serde_json::Value>(&line) else {
                    continue;
                };
                if let Some(commands) = frame.get("Commands") {
                    let cycle = commands["cycle"].as_u64().unwrap_or(0);
                    let count = commands["commands"].as_array().map_or(0, Vec::len);
                    println!("[cycle {:>6}] {} {} commands", cycle, "⚙".dimmed(), count);
                } else if let Some(telemetry) = frame.get("Telemetry") {
                    if format == "compact" {
                        let cycle = telemetry["cycle"].as_u64().unwrap_or(0);
                        let failed = telemetry["stats"]["failed_events"].as_u64().unwrap_or(0);
                        let status = if failed == 0 { "OK".green() } else { "WARN".yellow() };
                        println!("[cycle {:>6}] {}", cycle, status);
                    } else {
                        print_snapshot(telemetry, format);
                        println!();
                    }
                }
            }
        }
    }

    Ok(())
}

fn handle_server(matches: &ArgMatches<'_>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let background = matches.is_present("background");

    println!("{}", "🚀 Starting layout controller server...".bright_green().bold());

    let mut cmd = Command::new("cargo");
    cmd.args(&["run", "--bin", "railyard-controller"]);

    if background {
        cmd.spawn()?;
        println!("{} Server started in background on port {}", "✅".green(), port);
    } else {
        println!("{} Server starting on port {} (Press Ctrl+C to stop)", "🌐".bright_blue(), port);
        cmd.status()?;
    }

    Ok(())
}

// Helper functions

fn validate_u32(v: String) -> Result<(), String> {
    v.parse::<u32>().map(|_| ()).map_err(|_| "must be a non-negative integer".into())
}

fn validate_f64(v: String) -> Result<(), String> {
    match v.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(()),
        _ => Err("must be a finite number".into()),
    }
}

fn print_reply_result(action: &str, value: &str, response: &str, format: &str) {
    match format {
        "json" => println!("{}", response),
        "compact" => println!("{}", "OK".bright_green()),
        _ => {
            if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(response) {
                match parsed["status"].as_str().unwrap_or("Unknown") {
                    "Accepted" => {
                        println!("{} {}: {}", "✅".green(), action.bright_white(), value.bright_cyan());
                    }
                    "Rejected" => {
                        let message = parsed["message"].as_str().unwrap_or("request rejected");
                        println!("{} {} failed: {}", "❌".red(), action.bright_white(), message.bright_red());
                    }
                    status => {
                        println!("{} {} returned {}", "❓".blue(), action.bright_white(), status.bright_blue());
                    }
                }
            } else {
                println!("{} {}", "✅".green(), "Request completed".bright_green());
            }
        }
    }
}

async fn send_request(host: &str, port: u16, request: String) -> Result<String, Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", host, port);
    let stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("{} Failed to connect to layout controller at {}", "❌".red(), addr.bright_white());
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                eprintln!("{} Server is not running. Start it with:", "💡".yellow());
                eprintln!("   {}", "railyard server".bright_cyan());
                eprintln!("   or");
                eprintln!("   {}", "cargo run --bin railyard-controller".bright_cyan());
            } else {
                eprintln!("{} Network error: {}", "🔌".yellow(), e.to_string().bright_red());
            }
            return Err(e.into());
        }
    };

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    match tokio::time::timeout(std::time::Duration::from_secs(5), async {
        writer.write_all(request.as_bytes()).await?;
        writer.write_all(b"\n").await?;

        // Skip broadcast frames until the reply to this request arrives.
        while let Some(line) = lines.next_line().await? {
            if line.contains("\"status\"") {
                return Ok(line);
            }
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "Server closed connection",
        ))
    })
    .await
    {
        Ok(result) => Ok(result?),
        Err(_) => {
            eprintln!("{} Request timed out after 5 seconds", "⏰".yellow());
            Err("Request timeout".into())
        }
    }
}

// Request creation functions

fn create_status_request() -> String {
    serde_json::json!({
        "id": current_timestamp() as u32,
        "timestamp": current_timestamp(),
        "kind": "Status"
    })
    .to_string()
}

fn create_speed_request(train: u32, speed: f64) -> String {
    serde_json::json!({
        "id": current_timestamp() as u32,
        "timestamp": current_timestamp(),
        "kind": {
            "SetTargetSpeed": { "train": train, "speed": speed }
        }
    })
    .to_string()
}

fn create_servo_request(junction: u32, position: &str) -> String {
    let position = match position {
        "curve" => "Curve",
        _ => "Straight",
    };

    serde_json::json!({
        "id": current_timestamp() as u32,
        "timestamp": current_timestamp(),
        "kind": {
            "SetServo": { "junction": junction, "position": position }
        }
    })
    .to_string()
}

fn create_odometry_request(train: u32, delta: f64) -> String {
    serde_json::json!({
        "id": current_timestamp() as u32,
        "timestamp": current_timestamp(),
        "kind": {
            "Odometry": { "train": train, "delta": delta }
        }
    })
    .to_string()
}

fn create_sensor_request(sensor: u32) -> String {
    serde_json::json!({
        "id": current_timestamp() as u32,
        "timestamp": current_timestamp(),
        "kind": {
            "SensorFired": { "sensor": sensor }
        }
    })
    .to_string()
}

fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
