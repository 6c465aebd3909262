//! # Wayfarer Server
//!
//! The serving layer of the Wayfarer booking API: the route table with
//! per-route access declarations, the response renderer, the pipeline
//! orchestrator that owns the fixed stage order and the single terminal
//! error sink, and the hyper 1.x serve loop.
//!
//! # Example
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use serde_json::json;
//! use wayfarer_server::{render::json_success, Access, App, Server, ServerConfig};
//!
//! # async fn run() -> Result<(), wayfarer_server::ServerError> {
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:3000")
//!     .token_secret("change-me")
//!     .build();
//!
//! let app = App::builder(config.clone())
//!     .route(
//!         Method::GET,
//!         "/api/v1/tours",
//!         "listTours",
//!         Access::Public,
//!         |_ctx, _req| async move { Ok(json_success(StatusCode::OK, json!({"tours": []}))) },
//!     )
//!     .build();
//!
//! Server::new(app, config).run().await
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/wayfarer-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod config;
pub mod render;
pub mod router;
pub mod server;
pub mod telemetry;

pub use app::{App, AppBuilder, Handler};
pub use config::{ServerConfig, ServerConfigBuilder};
pub use render::{json_success, ErrorRenderer};
pub use router::{Access, PathParams, RouteMatch, Router};
pub use server::{Server, ServerError};
pub use telemetry::{init_logging, LogConfig};
