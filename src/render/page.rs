use super::context::{RenderContext, RenderValues, RequestError};
use super::templates::{DefaultTemplates, MainTemplateParams, Templates};
use crate::assets::{AssetError, AssetProvider};
use crate::server::RequestInfo;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Separator between rendered asset fragments.
const FRAGMENT_SEPARATOR: &str = "\n";

/// Finished page, ready to be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl PageResponse {
    pub fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "Content-Type: text/html; charset=utf-8",
            body,
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: "Content-Type: application/json",
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The requested page is not in the current manifest.
    PageNotFound { page: String },
    /// The asset provider could not produce a snapshot.
    Assets(AssetError),
    /// A view template failed to compile or render.
    Template(String),
}

impl RenderError {
    pub fn status(&self) -> u16 {
        500
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::PageNotFound { page } => {
                write!(f, "Invalid page render, page '{page}' not found in asset map")
            }
            RenderError::Assets(err) => write!(f, "{err}"),
            RenderError::Template(msg) => write!(f, "Template render failed: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<AssetError> for RenderError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::PageNotFound { page } => RenderError::PageNotFound { page },
            other => RenderError::Assets(other),
        }
    }
}

impl From<RenderError> for RequestError {
    fn from(err: RenderError) -> Self {
        RequestError::new(err.status(), err.to_string())
    }
}

/// Combines page assets, render values and templates into a document.
///
/// Shared by every request; holds no per-request state.
pub struct PageRenderer {
    provider: Arc<dyn AssetProvider>,
    templates: Arc<dyn Templates>,
}

impl PageRenderer {
    pub fn new(provider: Arc<dyn AssetProvider>, templates: Arc<dyn Templates>) -> Self {
        Self {
            provider,
            templates,
        }
    }

    pub fn with_default_templates(provider: Arc<dyn AssetProvider>) -> Self {
        Self::new(provider, Arc::new(DefaultTemplates))
    }

    pub fn provider(&self) -> &Arc<dyn AssetProvider> {
        &self.provider
    }

    /// Fresh accumulator for one request.
    pub fn context<'a>(&'a self, request: &'a RequestInfo) -> RenderContext<'a> {
        RenderContext::new(self, request)
    }

    /// Render `page`.
    ///
    /// Merge order: accumulated `values`, then `options`, then `baseUrl`,
    /// `styles` and `scripts`, which always win. With a captured `error`
    /// the shell is still rendered, carrying that error's status.
    pub fn render(
        &self,
        request: &RequestInfo,
        page: &str,
        values: RenderValues,
        options: RenderValues,
        base_url: &str,
        error: Option<&RequestError>,
    ) -> Result<PageResponse, RenderError> {
        let assets = self.provider.resolve(page)?;

        let styles = assets
            .styles
            .iter()
            .map(|path| match self.provider.inline_style(path) {
                Some(css) => self.templates.render_inline_style(request, &css),
                None => self
                    .templates
                    .render_stylesheet(request, strip_leading_slash(path)),
            })
            .collect::<Vec<_>>()
            .join(FRAGMENT_SEPARATOR);
        let scripts = assets
            .scripts
            .iter()
            .map(|path| self.templates.render_script(request, strip_leading_slash(path)))
            .collect::<Vec<_>>()
            .join(FRAGMENT_SEPARATOR);

        let mut merged = values;
        merged.extend(options);
        merged.insert("baseUrl".into(), Value::from(base_url));
        merged.insert("styles".into(), Value::from(styles.as_str()));
        merged.insert("scripts".into(), Value::from(scripts.as_str()));

        let body = self.templates.render_main(
            request,
            &MainTemplateParams {
                page,
                base_url,
                styles: &styles,
                scripts: &scripts,
                values: &merged,
            },
        )?;

        let status = error.map_or(200, |e| e.status);
        debug!(
            page = %page,
            status,
            scripts = assets.scripts.len(),
            styles = assets.styles.len(),
            "page rendered"
        );
        Ok(PageResponse::html(status, body))
    }
}

/// Asset paths are emitted relative to `<base href>`.
fn strip_leading_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}
