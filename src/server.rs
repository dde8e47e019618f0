use std::{net::SocketAddr, str::FromStr};

use axum::{Extension, Router, routing::get};

use crate::{
    Res,
    api::{self, CallbackSlot},
};

pub fn router(slot: CallbackSlot) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback).layer(Extension(slot)))
}

/// Serves the callback endpoints on `addr` until the task is dropped.
pub async fn start_api_server(addr: &str, slot: CallbackSlot) -> Res<()> {
    let addr = SocketAddr::from_str(addr)?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(slot)).await?;
    Ok(())
}
