//! # Render Module
//!
//! Turns a page name into an HTML document.
//!
//! - [`templates`] - the pluggable markup functions ([`Templates`])
//! - [`context`] - the per-request accumulator ([`RenderContext`])
//! - [`page`] - the orchestration ([`PageRenderer`])
//!
//! ## Flow
//!
//! ```text
//! upstream handlers ──set_render_value──▶ RenderContext
//!                                              │ render_page(page, options)
//!                                              ▼
//!     AssetProvider ──PageAssetSet──▶ PageRenderer ──▶ Templates ──▶ PageResponse
//! ```

pub mod context;
pub mod page;
pub mod templates;

pub use context::{RenderContext, RenderValues, RequestError, BASE_PATH_QUERY_PARAM};
pub use page::{PageRenderer, PageResponse, RenderError};
pub use templates::{DefaultTemplates, MainTemplateParams, Templates, ViewTemplates};
