use tracing::info;

use shiftboard_app::{seed, telemetry, Coordinator};
use shiftboard_storage::Database;
use shiftboard_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = if config.metrics_enabled {
        Some(telemetry::init_metrics()?)
    } else {
        None
    };

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;
    let coordinator = Coordinator::new(database);

    if config.seed_demo_data {
        let summary = seed::seed_demo_data(&coordinator).await?;
        info!(stage = "app", summary = %serde_json::to_string(&summary)?, "seed finished");
    }

    let organizations = coordinator.list_organizations().await?;
    info!(
        stage = "app",
        env = %config.environment.as_str(),
        organizations = organizations.len(),
        "database ready"
    );

    if let Some(handle) = metrics {
        info!(stage = "app", snapshot = %telemetry::render_metrics(&handle), "metrics snapshot");
    }
    Ok(())
}
