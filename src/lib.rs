//! supply-manager-api library
//!
//! Procurement backend: purchase orders and their line items move from
//! creation through partial and full receipt while a capacity ledger keeps
//! warehouse-location volume accounting consistent.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod migrator;
pub mod openapi;
pub mod services;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: services::AppServices,
}

/// All v1 API routes; state is applied by the binary (or the test harness).
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/purchase-orders", handlers::purchase_orders::routes())
        .nest("/purchases", handlers::purchases::routes())
        .nest("/suppliers", handlers::suppliers::routes())
        .nest("/products", handlers::products::routes())
        .nest("/locations", handlers::locations::routes())
        .nest("/dashboard", handlers::dashboard::routes())
}
