use super::page::{PageRenderer, PageResponse, RenderError};
use crate::server::RequestInfo;
use serde_json::{Map, Value};
use std::fmt;

/// Query parameter that overrides the rendered page's `<base href>`.
pub const BASE_PATH_QUERY_PARAM: &str = "_kap_basepath";

/// Named values handed to the main template.
pub type RenderValues = Map<String, Value>;

/// Error attached to a request, either returned by a handler or captured
/// in the [`RenderContext`] for the page shell to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub status: u16,
    pub message: String,
}

impl RequestError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for RequestError {}

/// Base URL for a request: the `_kap_basepath` query value, or `/`.
pub fn resolve_base_url(request: &RequestInfo) -> String {
    match request.query_params.get(BASE_PATH_QUERY_PARAM) {
        Some(v) if !v.is_empty() => v.clone(),
        _ => "/".to_string(),
    }
}

/// Render inputs accumulated while one request walks the handler chain.
///
/// Created per request and consumed by [`RenderContext::render_page`], so
/// nothing can be written after the render and nothing leaks into the next
/// request. Writes are last-write-wins per key.
pub struct RenderContext<'a> {
    renderer: &'a PageRenderer,
    request: &'a RequestInfo,
    values: Option<RenderValues>,
    error: Option<RequestError>,
    base_url: String,
}

impl<'a> RenderContext<'a> {
    pub fn new(renderer: &'a PageRenderer, request: &'a RequestInfo) -> Self {
        Self {
            renderer,
            request,
            values: None,
            error: None,
            base_url: resolve_base_url(request),
        }
    }

    pub fn request(&self) -> &RequestInfo {
        self.request
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store one value, replacing any earlier value for `key`.
    pub fn set_render_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
    }

    /// Store every entry of `values`, one key at a time.
    pub fn set_render_values<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in values {
            self.set_render_value(key, value);
        }
    }

    pub fn render_value(&self, key: &str) -> Option<&Value> {
        self.values.as_ref().and_then(|v| v.get(key))
    }

    pub fn render_values(&self) -> Option<&RenderValues> {
        self.values.as_ref()
    }

    /// Capture an error; the page shell is still rendered, with its status.
    pub fn set_error(&mut self, error: RequestError) {
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    /// Terminal render step for this request.
    pub fn render_page(
        self,
        page: &str,
        options: RenderValues,
    ) -> Result<PageResponse, RenderError> {
        self.renderer.render(
            self.request,
            page,
            self.values.unwrap_or_default(),
            options,
            &self.base_url,
            self.error.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetManifest, PageAssetSet, StaticAssets};
    use serde_json::json;
    use std::sync::Arc;

    struct Fixed(Arc<AssetManifest>);

    impl crate::assets::AssetProvider for Fixed {
        fn manifest(&self) -> Result<Arc<AssetManifest>, crate::assets::AssetError> {
            Ok(Arc::clone(&self.0))
        }
        fn public_path(&self) -> &str {
            "/"
        }
    }

    fn renderer() -> PageRenderer {
        let manifest: AssetManifest = [("home".to_string(), PageAssetSet::from_paths(["home.js"]))]
            .into_iter()
            .collect();
        PageRenderer::with_default_templates(Arc::new(Fixed(Arc::new(manifest))))
    }

    #[test]
    fn test_last_write_wins() {
        let renderer = renderer();
        let req = RequestInfo::get("/");
        let mut ctx = renderer.context(&req);
        assert!(ctx.render_values().is_none());
        ctx.set_render_value("title", "first");
        ctx.set_render_value("title", "second");
        assert_eq!(ctx.render_value("title"), Some(&json!("second")));
    }

    #[test]
    fn test_mapping_equals_single_writes() {
        let renderer = renderer();
        let req = RequestInfo::get("/");

        let mut a = renderer.context(&req);
        a.set_render_values([("a", 1), ("b", 2)]);

        let mut b = renderer.context(&req);
        b.set_render_value("a", 1);
        b.set_render_value("b", 2);

        assert_eq!(a.render_values(), b.render_values());
    }

    #[test]
    fn test_base_url() {
        assert_eq!(resolve_base_url(&RequestInfo::get("/home")), "/");
        assert_eq!(
            resolve_base_url(&RequestInfo::get("/home?_kap_basepath=%2Fembed%2Fapp%2F")),
            "/embed/app/"
        );
        assert_eq!(resolve_base_url(&RequestInfo::get("/home?_kap_basepath=")), "/");
    }

    #[test]
    fn test_static_provider_is_usable_in_context() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("assets.json"), r#"{"home": ["home.js"]}"#).unwrap();
        let provider = StaticAssets::load(dir.path(), "/").unwrap();
        let renderer = PageRenderer::with_default_templates(Arc::new(provider));
        let req = RequestInfo::get("/");
        let res = renderer.context(&req).render_page("home", Map::new()).unwrap();
        assert_eq!(res.status, 200);
        assert!(res.body.contains(r#"<script src="home.js"></script>"#));
    }
}
