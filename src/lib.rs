//! # pagewright
//!
//! **pagewright** bootstraps the HTTP side of a microservice that also
//! serves a browser frontend: it resolves which bundled scripts and
//! stylesheets belong to a page and renders the HTML shell that loads them.
//!
//! ## Architecture
//!
//! - **[`assets`]** - page asset discovery: a static manifest in production,
//!   live compilation stats in development
//! - **[`render`]** - templates, the per-request render context and the page renderer
//! - **[`middleware`]** - the request handler chain ([`middleware::PageHandler`])
//! - **[`server`]** - HTTP service on `may_minihttp`, health check, error handling
//! - **[`static_files`]** - serving bundle files with cache headers
//! - **[`runtime_config`]** - mode and listen settings resolved once at startup
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Service as FrontendService
//!     participant Handlers as PageHandler chain
//!     participant Ctx as RenderContext
//!     participant Renderer as PageRenderer
//!     participant Assets as AssetProvider
//!
//!     Client->>Service: GET /?_kap_basepath=/embed/
//!     Service->>Service: health check / asset files
//!     Service->>Handlers: run in registration order
//!     Handlers->>Ctx: set_render_value("user", ...)
//!     Handlers-->>Service: Flow::Render { page: "home" }
//!     Service->>Ctx: render_page("home", options)
//!     Ctx->>Renderer: values + options + base URL
//!     Renderer->>Assets: resolve("home")
//!     Assets-->>Renderer: PageAssetSet
//!     Renderer-->>Service: PageResponse (200, or captured error status)
//!     Service-->>Client: text/html
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use pagewright::assets::StaticAssets;
//! use pagewright::middleware::{from_fn, Flow, PageRoute};
//! use pagewright::render::PageRenderer;
//! use pagewright::server::{AssetMount, FrontendService, HttpServer};
//! use pagewright::static_files::StaticFiles;
//! use std::sync::Arc;
//!
//! let assets = StaticAssets::load("./dist", "/").expect("build the frontend first");
//! let renderer = PageRenderer::with_default_templates(Arc::new(assets));
//! let service = FrontendService::builder(renderer)
//!     .assets(AssetMount::new("/", StaticFiles::immutable("./dist")))
//!     .handler(from_fn(|ctx| {
//!         ctx.set_render_value("title", "Shop");
//!         Ok(Flow::Next)
//!     }))
//!     .handler(PageRoute::exact("/", "home"))
//!     .build();
//! let handle = HttpServer(service).start("127.0.0.1:8080").unwrap();
//! handle.join().unwrap();
//! ```

pub mod assets;
pub mod cli;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod render;
pub mod runtime_config;
pub mod server;
pub mod static_files;

pub use assets::{AssetError, AssetManifest, AssetProvider, PageAssetSet};
pub use render::{PageRenderer, RenderContext, RenderError};
pub use runtime_config::{Mode, RuntimeConfig};
pub use server::{FrontendService, RequestInfo, ServerOptions};
