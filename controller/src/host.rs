use std::{io::ErrorKind, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use chrono_tz::Tz;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::Serialize;
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{info, warn};

use pool_common::{
    ManualRequest, RuntimeConfig, ScheduleEngine, TOPIC_CMD_MANUAL, TOPIC_CONTROLLER_STATE,
    TOPIC_SENSOR_TEMP,
};

use crate::adapters::{LoggingRelay, SharedTemperature, SystemClock};

type Engine = ScheduleEngine<SystemClock, SharedTemperature, LoggingRelay>;

#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<Engine>>,
    temperature: SharedTemperature,
    tz: Tz,
    mqtt: AsyncClient,
}

#[derive(Clone)]
struct AppStore {
    runtime_path: Arc<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const SENSOR_STALE_AFTER: Duration = Duration::from_secs(15 * 60);

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    runtime.engine.sanitize();
    runtime
        .schedule
        .validate()
        .context("pump schedule cannot be used")?;
    if runtime.schedule.bands.is_empty() || runtime.schedule.seasons.is_empty() {
        warn!("schedule has no bands or no seasons, the pump will stay off");
    }

    let clock = SystemClock::new(&runtime.timezone).context("invalid controller timezone")?;
    let temperature = SharedTemperature::new(SENSOR_STALE_AFTER);
    let engine = ScheduleEngine::new(
        runtime.engine.clone(),
        runtime.schedule.clone(),
        clock,
        temperature.clone(),
        LoggingRelay,
    );

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or(runtime.network.mqtt_host.clone());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.network.mqtt_port);

    let mut mqtt_options = MqttOptions::new("pool-controller-rust", mqtt_host, mqtt_port);
    let mqtt_user = std::env::var("MQTT_USER").unwrap_or(runtime.network.mqtt_user.clone());
    let mqtt_pass = std::env::var("MQTT_PASS").unwrap_or(runtime.network.mqtt_pass.clone());
    if !mqtt_user.is_empty() {
        mqtt_options.set_credentials(mqtt_user, mqtt_pass);
    }

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let app_state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        temperature,
        tz: clock.tz(),
        mqtt,
    };

    subscribe_topics(&app_state.mqtt).await?;
    spawn_mqtt_loop(app_state.clone(), eventloop);
    spawn_control_loop(app_state.clone());
    spawn_state_publish_loop(app_state.clone());

    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/state", get(handle_get_state))
        .route(
            "/api/manual",
            axum::routing::put(handle_put_manual).delete(handle_delete_manual),
        )
        .with_state(app_state);

    let port = std::env::var("POOL_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn subscribe_topics(mqtt: &AsyncClient) -> anyhow::Result<()> {
    for topic in [TOPIC_SENSOR_TEMP, TOPIC_CMD_MANUAL] {
        mqtt.subscribe(topic, QoS::AtMostOnce).await?;
    }
    Ok(())
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if let Err(err) =
                        handle_mqtt_message(&app_state, message.topic, message.payload.to_vec())
                            .await
                    {
                        warn!("mqtt message handling error: {err:#}");
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

// The only writer of the engine's timers: one poll per second.
fn spawn_control_loop(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));

        loop {
            interval.tick().await;
            app_state.engine.lock().await.poll();
        }
    });
}

fn spawn_state_publish_loop(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        loop {
            interval.tick().await;

            let payload = {
                let engine = app_state.engine.lock().await;
                serde_json::to_vec(&engine.state_payload(Utc::now().timestamp()))
            };

            match payload {
                Ok(body) => {
                    if let Err(err) = app_state
                        .mqtt
                        .publish(TOPIC_CONTROLLER_STATE, QoS::AtLeastOnce, true, body)
                        .await
                    {
                        warn!("controller state publish failed: {err}");
                    }
                }
                Err(err) => warn!("controller state serialization failed: {err}"),
            }
        }
    });
}

async fn handle_mqtt_message(
    app_state: &AppState,
    topic: String,
    payload: Vec<u8>,
) -> anyhow::Result<()> {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return Ok(());
    }

    let message = String::from_utf8(payload).context("non utf8 mqtt payload")?;
    let message = message.trim();

    match topic.as_str() {
        TOPIC_SENSOR_TEMP => {
            let temp: f32 = message
                .parse()
                .with_context(|| format!("invalid temperature payload '{message}'"))?;
            let plausible = app_state.engine.lock().await.config().is_plausible_temp(temp);
            if plausible {
                app_state.temperature.publish(temp);
            } else {
                warn!(temp_c = temp, "ignoring implausible temperature from sensor");
            }
        }
        TOPIC_CMD_MANUAL => {
            let mut engine = app_state.engine.lock().await;
            if message.eq_ignore_ascii_case("off") || message.eq_ignore_ascii_case("auto") {
                engine.disable_manual_pump();
            } else {
                let request: ManualRequest =
                    serde_json::from_str(message).context("invalid manual command")?;
                if request.duration.is_some_and(|secs| secs < 0) {
                    anyhow::bail!("manual duration must not be negative");
                }
                engine.enable_manual_pump(request.duration, request.on);
            }
        }
        _ => {}
    }

    Ok(())
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = {
        let engine = state.engine.lock().await;
        engine.status(Utc::now().timestamp())
    };
    Json(status)
}

async fn handle_get_state(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine.lock().await;
    let now = Utc::now().with_timezone(&state.tz);
    let temperature = engine
        .state()
        .current_temp
        .map(|temp| format!("{temp:.2}"))
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "Current Time is : {}\nTemperature {}\nTime table :\n{}",
        now.format("%a %b %e %H:%M:%S %Y"),
        temperature,
        engine.timetable_listing()
    )
}

async fn handle_put_manual(
    State(state): State<AppState>,
    Json(request): Json<ManualRequest>,
) -> impl IntoResponse {
    if request.duration.is_some_and(|secs| secs < 0) {
        return error_response(StatusCode::BAD_REQUEST, "duration must not be negative");
    }

    {
        let mut engine = state.engine.lock().await;
        engine.enable_manual_pump(request.duration, request.on);
    }

    handle_get_status(State(state)).await.into_response()
}

async fn handle_delete_manual(State(state): State<AppState>) -> impl IntoResponse {
    {
        let mut engine = state.engine.lock().await;
        engine.disable_manual_pump();
    }
    handle_get_status(State(state)).await.into_response()
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("POOL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.pool"));

        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(self.runtime_path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)
                .with_context(|| format!("malformed {}", self.runtime_path.display()))?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
