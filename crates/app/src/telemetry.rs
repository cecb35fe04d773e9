use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{
    BuildError as PrometheusBuildError, PrometheusBuilder, PrometheusHandle,
};
use std::{
    fmt as stdfmt,
    sync::{Mutex, OnceLock},
};
use tracing_subscriber::{
    fmt::{self as tracing_fmt, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use shiftboard_util::{AppConfig, Environment};

#[derive(Debug)]
pub enum TelemetryError {
    Tracing(tracing_subscriber::util::TryInitError),
    Metrics(PrometheusBuildError),
}

impl stdfmt::Display for TelemetryError {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        match self {
            Self::Tracing(err) => write!(f, "failed to initialize tracing: {err}"),
            Self::Metrics(err) => write!(f, "failed to install metrics recorder: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {}

impl From<tracing_subscriber::util::TryInitError> for TelemetryError {
    fn from(value: tracing_subscriber::util::TryInitError) -> Self {
        Self::Tracing(value)
    }
}

impl From<PrometheusBuildError> for TelemetryError {
    fn from(value: PrometheusBuildError) -> Self {
        Self::Metrics(value)
    }
}

static TRACING_INIT: OnceLock<()> = OnceLock::new();
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static METRICS_INSTALL_GUARD: Mutex<()> = Mutex::new(());

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

fn build_git_sha() -> &'static str {
    option_env!("GIT_SHA").unwrap_or("unknown")
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer(environment: Environment) -> BoxedLayer {
    let layer = tracing_fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::rfc_3339());

    match environment {
        Environment::Development | Environment::Test => layer.pretty().boxed(),
        Environment::Production => layer.json().boxed(),
    }
}

/// Installs the global subscriber: pretty output for development and test,
/// JSON lines in production. Calling it again is a no-op.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryError> {
    if TRACING_INIT.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt_layer(config.environment))
        .with(env_filter)
        .try_init()?;

    TRACING_INIT.set(()).ok();
    tracing::info!(
        stage = "telemetry",
        env = %config.environment.as_str(),
        version = BUILD_VERSION,
        git_sha = build_git_sha(),
        "tracing initialized"
    );
    Ok(())
}

/// Installs the Prometheus recorder once per process and returns its handle.
///
/// Without it the coordinator's counters go to the no-op recorder. Embedders
/// with their own recorder skip this call.
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let _guard = METRICS_INSTALL_GUARD
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    METRICS_HANDLE.set(handle.clone()).ok();

    describe_gauge!("app_build_info", "Build metadata for the running binary");
    describe_counter!(
        "coordinator_writes_total",
        "Count of successful writes, labelled by entity and operation"
    );
    describe_counter!(
        "coordinator_validation_failures_total",
        "Count of writes rejected by validation, labelled by entity"
    );
    describe_counter!(
        "shift_assignments_total",
        "Count of assign/unassign requests, labelled by result"
    );

    Ok(handle)
}

/// Renders the Prometheus text exposition with a build info line appended.
pub fn render_metrics(handle: &PrometheusHandle) -> String {
    let mut body = handle.render();
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }

    body.push_str("# TYPE app_build_info gauge\n");
    body.push_str(&format!(
        "app_build_info{{version=\"{}\",git=\"{}\"}} 1\n",
        BUILD_VERSION,
        build_git_sha()
    ));
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::counter;

    fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            environment: Environment::Test,
            seed_demo_data: false,
            metrics_enabled: false,
        }
    }

    #[test]
    fn init_tracing_is_idempotent() {
        let config = test_config();
        init_tracing(&config).expect("first init");
        init_tracing(&config).expect("second init is a no-op");
    }

    #[test]
    fn installed_recorder_renders_coordinator_counters() {
        let handle = init_metrics().expect("install recorder");
        init_metrics().expect("second install reuses the handle");

        counter!("shift_assignments_total", "result" => "assigned").increment(1);

        let body = render_metrics(&handle);
        assert!(body.contains("shift_assignments_total"));
        assert!(body.contains("result=\"assigned\""));
        assert!(body.contains(&format!("app_build_info{{version=\"{BUILD_VERSION}\"")));
    }
}
