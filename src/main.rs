// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

use std::{env, net::SocketAddr};

use tracing::info;
use tracing_subscriber::EnvFilter;

use licdata_server::api::router;
use licdata_server::config;
use licdata_server::crypto::Cipher;
use licdata_server::state::AppState;
use licdata_server::store::{ContentStore, GithubHost};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let format = env::var(config::LOG_FORMAT_ENV).unwrap_or_default();
    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cipher = Cipher::from_env().expect("invalid encryption configuration");
    if !cipher.is_enabled() {
        info!("at-rest encryption is disabled");
    }
    let host = GithubHost::from_env().expect("invalid repository configuration");
    info!(branch = host.branch(), "using GitHub-hosted content store");

    let state = AppState::new(ContentStore::new(host, cipher));
    let app = router(state);

    let bind_host =
        env::var(config::HOST_ENV).unwrap_or_else(|_| config::DEFAULT_HOST.to_string());
    let port: u16 = env::var(config::PORT_ENV)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(config::DEFAULT_PORT);
    let addr: SocketAddr = format!("{bind_host}:{port}")
        .parse()
        .expect("invalid bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("cannot bind server address");
    info!(%addr, "licdata server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("cannot install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("cannot install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
