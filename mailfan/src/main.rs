//! mailfan server binary

use anyhow::Result;
use mailfan::config::MailfanConfig;
use mailfan::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    mailfan::observability::init()?;

    let config = MailfanConfig::load()?;
    let addr = config.service.bind_addr();

    let state = AppState::new(config)?;
    state.start_expiry_sweeper();

    let app = mailfan::handlers::router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "mailfan listening");
    axum::serve(listener, app).await?;

    Ok(())
}
