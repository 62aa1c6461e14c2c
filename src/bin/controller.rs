use railyard::controller::LayoutController;
use railyard::protocol::{Frame, CommandFrame, ProtocolHandler, Reply, RequestKind};
use railyard::sample;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex};
use tokio::time;
use tracing::{error, info, warn};

const TCP_PORT: u16 = 8080;
const CYCLE_INTERVAL_MS: u64 = 100;
const FRAME_BROADCAST_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("🚂 Railyard Layout Controller");
    println!("=============================");

    let plan = sample::passing_loop_plan();
    let controller = Arc::new(Mutex::new(LayoutController::from_plan(&plan)?));
    {
        let controller_guard = controller.lock().await;
        info!(
            "Layout ready: {} junctions, {} sections, {} trains",
            controller_guard.layout().junctions().len(),
            controller_guard.layout().sections().len(),
            controller_guard.trains().len(),
        );
    }

    // Broadcast channel for outbound frames
    let (frame_tx, _) = broadcast::channel(FRAME_BROADCAST_BUFFER_SIZE);

    let tcp_controller = Arc::clone(&controller);
    let tcp_frame_tx = frame_tx.clone();
    let tcp_server = tokio::spawn(async move {
        if let Err(e) = start_tcp_server(tcp_controller, tcp_frame_tx).await {
            error!("TCP server error: {}", e);
        }
    });

    // Reconciliation cycle cadence belongs here, not to the core.
    let mut interval = time::interval(Duration::from_millis(CYCLE_INTERVAL_MS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_cycle(&controller, &frame_tx).await;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    tcp_server.abort();
    println!("🛤️  Layout controller stopped");

    Ok(())
}

async fn run_cycle(
    controller: &Arc<Mutex<LayoutController>>,
    frame_tx: &broadcast::Sender<String>,
) {
    let timestamp = current_timestamp();
    let mut controller_guard = controller.lock().await;

    let report = controller_guard.reconcile();
    for failure in &report.failures {
        warn!("cycle {}: event {:?} failed: {}", report.cycle, failure.event, failure.error);
    }

    let commands = Frame::Commands(CommandFrame {
        cycle: report.cycle,
        timestamp,
        commands: controller_guard.commands(),
    });
    broadcast_frame(frame_tx, &commands);

    if let Some(telemetry) = controller_guard.telemetry_frame(timestamp) {
        info!(
            "📡 cycle {}: {} trains, {} failed events total",
            telemetry.cycle,
            telemetry.trains.len(),
            telemetry.stats.failed_events,
        );
        broadcast_frame(frame_tx, &Frame::Telemetry(telemetry));
    }
}

fn broadcast_frame(frame_tx: &broadcast::Sender<String>, frame: &Frame) {
    if frame_tx.receiver_count() == 0 {
        return;
    }
    match ProtocolHandler::serialize_frame(frame) {
        Ok(json) => {
            if let Err(e) = frame_tx.send(json) {
                warn!("Failed to broadcast frame: {}", e);
            }
        }
        Err(e) => error!("Frame serialization error: {}", e),
    }
}

async fn start_tcp_server(
    controller: Arc<Mutex<LayoutController>>,
    frame_tx: broadcast::Sender<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", TCP_PORT)).await?;
    info!("🌐 TCP server listening on port {}", TCP_PORT);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("🔗 New client connected: {}", addr);
                let client_controller = Arc::clone(&controller);
                let client_frame_rx = frame_tx.subscribe();

                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, client_controller, client_frame_rx).await {
                        warn!("Client {} error: {}", addr, e);
                    }
                    info!("🔌 Client {} disconnected", addr);
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    controller: Arc<Mutex<LayoutController>>,
    mut frame_rx: broadcast::Receiver<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reader, writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let writer = Arc::new(Mutex::new(writer));

    // Forward broadcast frames to this client
    let frame_writer = Arc::clone(&writer);
    let frame_task = tokio::spawn(async move {
        while let Ok(frame) = frame_rx.recv().await {
            let mut writer_guard = frame_writer.lock().await;
            if writer_guard.write_all(frame.as_bytes()).await.is_err() {
                break;
            }
            if writer_guard.write_all(b"\n").await.is_err() {
                break;
            }
        }
    });

    let mut handler = ProtocolHandler::new();
    let mut line = String::new();
    loop {
        line.clear();
        match buf_reader.read_line(&mut line).await {
            Ok(0) => break, // Client disconnected
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let reply = match handler.parse_request(trimmed) {
                    Ok(request) => {
                        info!("📨 Received request: {:?}", request);
                        let mut controller_guard = controller.lock().await;
                        apply_request(&mut controller_guard, &request)
                    }
                    Err(e) => {
                        warn!("Rejected request line: {}", e);
                        ProtocolHandler::rejected(0, current_timestamp(), &e.to_string())
                    }
                };

                let reply_json = handler.serialize_reply(&reply)?.to_string();
                {
                    let mut writer_guard = writer.lock().await;
                    writer_guard.write_all(reply_json.as_bytes()).await?;
                    writer_guard.write_all(b"\n").await?;
                }
            }
            Err(e) => {
                error!("Error reading from client: {}", e);
                break;
            }
        }
    }

    frame_task.abort();
    Ok(())
}

/// Queues plant reports for the next cycle; applies dispatch requests
/// immediately. Always answers with a reply naming the request id.
fn apply_request(controller: &mut LayoutController, request: &railyard::Request) -> Reply {
    let timestamp = current_timestamp();
    let result = match request.kind {
        RequestKind::Odometry { train, delta } => controller
            .push_odometry(train, delta)
            .map(|()| None)
            .map_err(|e| e.to_string()),
        RequestKind::SensorFired { sensor } => controller
            .push_sensor(sensor)
            .map(|()| None)
            .map_err(|e| e.to_string()),
        RequestKind::SetTargetSpeed { train, speed } => controller
            .set_target_speed(train, speed)
            .map(|()| None)
            .map_err(|e| e.to_string()),
        RequestKind::SetServo { junction, position } => controller
            .set_servo(junction, position)
            .map(|()| None)
            .map_err(|e| e.to_string()),
        RequestKind::Status => {
            let frame = Frame::Telemetry(controller.snapshot(timestamp));
            match ProtocolHandler::serialize_frame(&frame) {
                Ok(json) => Ok(Some(json)),
                Err(e) => Err(e.to_string()),
            }
        }
    };

    match result {
        Ok(message) => ProtocolHandler::accepted(request, timestamp, message),
        Err(reason) => ProtocolHandler::rejected(request.id, timestamp, &reason),
    }
}

fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
