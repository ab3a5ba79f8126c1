use super::request::{parse_request, RequestInfo};
use super::response::{write_reply, Reply};
use crate::assets::AssetProvider;
use crate::middleware::{Flow, PageHandler};
use crate::render::{PageRenderer, PageResponse, RequestError};
use crate::static_files::StaticFiles;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

/// Fixed health check path; answered before anything else runs.
pub const HEALTH_ENDPOINT: &str = "/.kapeta/health";

/// Switches for the built-in collaborators around the page pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerOptions {
    pub disable_error_handling: bool,
    pub disable_catch_all: bool,
    pub disable_health_check: bool,
}

fn with_trailing_slash(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

#[derive(Clone)]
enum MountSource {
    Fixed { prefix: String, files: StaticFiles },
    /// Prefix and directory asked from the provider on every request.
    Provider(Arc<dyn AssetProvider>),
}

/// Asset bytes mounted under a URL prefix.
#[derive(Clone)]
pub struct AssetMount {
    source: MountSource,
}

impl AssetMount {
    pub fn new(prefix: impl Into<String>, files: StaticFiles) -> Self {
        Self {
            source: MountSource::Fixed {
                prefix: with_trailing_slash(&prefix.into()),
                files,
            },
        }
    }

    /// Serve whatever `provider` currently reports through
    /// [`AssetProvider::asset_files`]. The live provider's prefix follows the
    /// `publicPath` of its latest compilation.
    pub fn provider(provider: Arc<dyn AssetProvider>) -> Self {
        Self {
            source: MountSource::Provider(provider),
        }
    }

    fn current(&self) -> Option<(String, &StaticFiles)> {
        match &self.source {
            MountSource::Fixed { prefix, files } => Some((prefix.clone(), files)),
            MountSource::Provider(provider) => provider
                .asset_files()
                .map(|(prefix, files)| (with_trailing_slash(&prefix), files)),
        }
    }
}

struct ServiceInner {
    options: ServerOptions,
    renderer: PageRenderer,
    assets: Option<AssetMount>,
    handlers: Vec<Arc<dyn PageHandler>>,
}

/// `may_minihttp` service running the page pipeline.
///
/// Request order: health check, asset files, then the handler chain in
/// registration order, then the catch-all.
#[derive(Clone)]
pub struct FrontendService {
    inner: Arc<ServiceInner>,
}

pub struct FrontendServiceBuilder {
    options: ServerOptions,
    renderer: PageRenderer,
    assets: Option<AssetMount>,
    handlers: Vec<Arc<dyn PageHandler>>,
}

impl FrontendServiceBuilder {
    pub fn options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn assets(mut self, mount: AssetMount) -> Self {
        self.assets = Some(mount);
        self
    }

    /// Append a handler; handlers run in the order they were added.
    pub fn handler<H: PageHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn build(self) -> FrontendService {
        if !self.options.disable_health_check {
            info!("Configuring health check endpoint: {}", HEALTH_ENDPOINT);
        }
        FrontendService {
            inner: Arc::new(ServiceInner {
                options: self.options,
                renderer: self.renderer,
                assets: self.assets,
                handlers: self.handlers,
            }),
        }
    }
}

impl FrontendService {
    pub fn builder(renderer: PageRenderer) -> FrontendServiceBuilder {
        FrontendServiceBuilder {
            options: ServerOptions::default(),
            renderer,
            assets: None,
            handlers: Vec::new(),
        }
    }

    /// Produce the reply for one request without touching the socket.
    pub fn handle(&self, request: &RequestInfo) -> Reply {
        let inner = &self.inner;

        if !inner.options.disable_health_check
            && request.method == "GET"
            && request.path == HEALTH_ENDPOINT
        {
            return Reply::json(200, json!({ "ok": true }));
        }

        if request.is_read() {
            if let Some(reply) = self.serve_asset(request) {
                return reply;
            }
        }

        let mut ctx = inner.renderer.context(request);
        for handler in &inner.handlers {
            match handler.handle(&mut ctx) {
                Ok(Flow::Next) => continue,
                Ok(Flow::Respond(page)) => return Reply::Page(page),
                Ok(Flow::Render { page, options }) => {
                    return match ctx.render_page(&page, options) {
                        Ok(page) => Reply::Page(page),
                        Err(err) => self.error_reply(err.into()),
                    };
                }
                Err(err) => return self.error_reply(err),
            }
        }

        if inner.options.disable_catch_all {
            Reply::json(404, json!({ "error": "Not Found" }))
        } else {
            Reply::json(418, json!({ "error": "Not available" }))
        }
    }

    fn serve_asset(&self, request: &RequestInfo) -> Option<Reply> {
        let (prefix, files) = self.inner.assets.as_ref()?.current()?;
        let relative = request.path.strip_prefix(prefix.as_str())?;
        let decoded = urlencoding::decode(relative).ok()?;
        match files.load(&decoded) {
            Ok(file) => Some(Reply::File(file)),
            // Only a root mount lets misses fall through to the page handlers.
            Err(_) if prefix == "/" => None,
            Err(err) => {
                debug!(path = %request.path, error = %err, "asset not found");
                Some(Reply::json(404, json!({ "error": "Not Found" })))
            }
        }
    }

    fn error_reply(&self, err: RequestError) -> Reply {
        let status = if err.status >= 400 { err.status } else { 500 };
        if self.inner.options.disable_error_handling {
            error!(status, error = %err.message, "unhandled request error");
            return Reply::Page(PageResponse {
                status: 500,
                content_type: "Content-Type: text/plain; charset=utf-8",
                body: "Internal Server Error".to_string(),
            });
        }
        warn!(status, error = %err.message, "request failed");
        let message = if err.message.is_empty() {
            "Unknown error".to_string()
        } else {
            err.message
        };
        Reply::json(status, json!({ "error": message }))
    }
}

impl HttpService for FrontendService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = parse_request(&req);
        let span = info_span!(
            "request",
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path
        );
        let _guard = span.enter();

        let reply = self.handle(&request);
        info!(status = reply.status(), "request handled");
        write_reply(res, reply);
        Ok(())
    }
}
