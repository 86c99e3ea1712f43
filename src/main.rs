use std::sync::Arc;

use study_planner::cli;
use study_planner::config::PlannerConfig;
use study_planner::pipeline::{HttpScheduleService, ScheduleService, SubmissionPipeline};
use study_planner::presenter::ResultPresenter;
use study_planner::routes::{WizardRouteState, wizard_routes};
use study_planner::wizard::WizardSession;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = PlannerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  export PLANNER_FUNCTION_TOKEN=...");
        std::process::exit(1);
    });

    let http_port: Option<u16> = match std::env::var("PLANNER_HTTP_PORT") {
        Ok(raw) => Some(raw.trim().parse().map_err(|_| {
            format!("Invalid configuration value for PLANNER_HTTP_PORT: {raw:?}")
        })?),
        Err(_) => None,
    };

    eprintln!("📚 Study Planner v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Endpoint: {}", config.endpoint);
    eprintln!("   Timeout: {}s", config.request_timeout.as_secs());
    match &config.artifact_dir {
        Some(dir) => eprintln!("   Artifacts: {}", dir.display()),
        None => eprintln!("   Artifacts: system temp dir"),
    }

    let service: Arc<dyn ScheduleService> = Arc::new(HttpScheduleService::new(&config)?);
    let session = WizardSession::new(
        SubmissionPipeline::new(service, &config),
        ResultPresenter::new(&config),
    );

    match http_port {
        Some(port) => {
            eprintln!("   HTTP API: http://0.0.0.0:{}/api/wizard\n", port);
            let app = wizard_routes(WizardRouteState::new(session));
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
            tracing::info!(port, "Wizard HTTP server started");
            axum::serve(listener, app).await?;
        }
        None => {
            eprintln!("   Type 'sair' to quit.\n");
            cli::run(session).await?;
        }
    }

    Ok(())
}
