//! HTTP service binary for fine-appeal.
//!
//! Configuration comes from the environment:
//!
//! | Variable                       | Default      |
//! |--------------------------------|--------------|
//! | `PORT`                         | `3001`       |
//! | `EDGEQUAKE_MODEL`              | provider default |
//! | `EDGEQUAKE_PROVIDER`           | auto-detect  |
//! | `FINE_APPEAL_TIMEOUT`          | `60`         |
//! | `FINE_APPEAL_MAX_UPLOAD_BYTES` | `10485760`   |
//! | `FINE_APPEAL_TITLE`            | `Traffic Fine Appeal` |
//! | `RUST_LOG`                     | `fine_appeal=info,tower_http=debug` |

use anyhow::{Context, Result};
use fine_appeal::server::{router, AppState};
use fine_appeal::{AppealConfig, LayoutConfig};
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("fine_appeal=info,fine_appeal_server=info,tower_http=debug")
        }))
        .init();

    let mut builder = AppealConfig::builder();
    if let Some(model) = env_var("EDGEQUAKE_MODEL") {
        builder = builder.model(model);
    }
    if let Some(provider) = env_var("EDGEQUAKE_PROVIDER") {
        builder = builder.provider_name(provider);
    }
    if let Some(secs) = env_parse::<u64>("FINE_APPEAL_TIMEOUT")? {
        builder = builder.timeout_secs(secs);
    }
    if let Some(bytes) = env_parse::<u64>("FINE_APPEAL_MAX_UPLOAD_BYTES")? {
        builder = builder.max_upload_bytes(bytes);
    }
    let config = builder.build().context("Invalid configuration")?;

    let mut layout = LayoutConfig::default();
    if let Some(title) = env_var("FINE_APPEAL_TITLE") {
        layout.title = title;
    }

    info!("Initializing fine-appeal service...");
    let state = AppState::from_config(config, layout);
    let app = router(state);

    let port = env_parse::<u16>("PORT")?.unwrap_or(3001);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_var(name)
        .map(|v| v.trim().parse::<T>().with_context(|| format!("{name}={v} is not valid")))
        .transpose()
}
