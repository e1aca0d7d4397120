//! # Order Analytics
//!
//! Query, cache and result-shaping layer for a TPCH order analytics dashboard
//! backed by Databricks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Views / CLI (overview, customers, geography,      │
//! │        products, ad-hoc explorer)                        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [catalog]
//! ┌─────────────────────────────────────────────────────────┐
//! │   MetricCatalog: 12 named TPCH aggregations              │
//! │   + ResultCache (metric, params) → result, 1h TTL        │
//! └─────────────────────────────────────────────────────────┘
//!                          │ miss / ad-hoc
//!                          ▼ [executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │   QueryExecutor → ConnectionResolver → SqlClient         │
//! │   (SQL warehouse | cluster session)                      │
//! └─────────────────────────────────────────────────────────┘
//!                          │ raw result
//!                          ▼ [normalize]
//! ┌─────────────────────────────────────────────────────────┐
//! │   TabularResult with numeric columns coerced             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod export;
pub mod logging;
pub mod normalize;
pub mod resolver;
pub mod table;
pub mod views;

pub use catalog::{KpiMetrics, Limit, MetricCatalog, MetricId, MetricParams};
pub use config::{ConnectionConfig, ConnectionMode, Settings};
pub use error::{Error, Result};
pub use executor::{QueryExecutor, TimedResult};
pub use resolver::{ClientFactory, ConnectionResolver, DatabricksClientFactory};
pub use table::{Column, TabularResult, Value};
