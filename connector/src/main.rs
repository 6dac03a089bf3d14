use std::sync::Arc;

use connector::{JiraConfiguration, MemorySink, SyncPipeline};
use dotenv::dotenv;
use jira::JiraClient;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "connector=info,jira=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let config = match JiraConfiguration::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let api = Arc::new(JiraClient::new(
        &config.host,
        &config.username,
        &config.password,
    ));
    let sink = Arc::new(MemorySink::new());
    let pipeline = SyncPipeline::new(api, sink, config);

    match pipeline.run().await {
        Ok(summary) => {
            info!(
                created = summary.created,
                updated = summary.updated,
                deleted = summary.deleted,
                "run finished"
            );
        }
        Err(err) => {
            error!(error = %err, "sync run failed");
            std::process::exit(1);
        }
    }
}
