use crate::render::{PageResponse, RenderContext, RenderValues, RequestError};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// What the service should do after a handler ran.
#[derive(Debug)]
pub enum Flow {
    /// Hand the request to the next handler.
    Next,
    /// Terminal render of a page with caller options.
    Render { page: String, options: RenderValues },
    /// Send this response and stop.
    Respond(PageResponse),
}

impl Flow {
    pub fn render(page: impl Into<String>) -> Self {
        Flow::Render {
            page: page.into(),
            options: RenderValues::new(),
        }
    }

    pub fn render_with(page: impl Into<String>, options: RenderValues) -> Self {
        Flow::Render {
            page: page.into(),
            options,
        }
    }
}

/// A step in the request chain.
///
/// Handlers run in registration order. Upstream handlers stash values with
/// [`RenderContext::set_render_value`] or capture an error with
/// [`RenderContext::set_error`] and return [`Flow::Next`]; returning `Err`
/// skips the rest of the chain and goes to the error handler.
pub trait PageHandler: Send + Sync {
    fn handle(&self, ctx: &mut RenderContext<'_>) -> Result<Flow, RequestError>;
}

/// Closure-backed [`PageHandler`].
pub struct FnHandler<F>(F);

impl<F> PageHandler for FnHandler<F>
where
    F: Fn(&mut RenderContext<'_>) -> Result<Flow, RequestError> + Send + Sync,
{
    fn handle(&self, ctx: &mut RenderContext<'_>) -> Result<Flow, RequestError> {
        (self.0)(ctx)
    }
}

pub fn from_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut RenderContext<'_>) -> Result<Flow, RequestError> + Send + Sync,
{
    FnHandler(f)
}

/// [`PageHandler`] that is built on first use.
///
/// `init` runs once, for the first request that reaches the handler. A
/// failed initialisation is kept and returned to that request and every
/// later one, so it reaches the error handler like any handler error.
pub struct LazyHandler<F, H> {
    init: F,
    handler: OnceLock<Result<H, RequestError>>,
}

impl<F, H> PageHandler for LazyHandler<F, H>
where
    F: Fn() -> Result<H, RequestError> + Send + Sync,
    H: PageHandler,
{
    fn handle(&self, ctx: &mut RenderContext<'_>) -> Result<Flow, RequestError> {
        let handler = self.handler.get_or_init(|| {
            let built = (self.init)();
            match &built {
                Ok(_) => debug!("lazy handler initialised"),
                Err(err) => warn!(status = err.status, error = %err.message, "lazy handler failed to initialise"),
            }
            built
        });
        match handler {
            Ok(handler) => handler.handle(ctx),
            Err(err) => Err(err.clone()),
        }
    }
}

pub fn from_lazy<F, H>(init: F) -> LazyHandler<F, H>
where
    F: Fn() -> Result<H, RequestError> + Send + Sync,
    H: PageHandler,
{
    LazyHandler {
        init,
        handler: OnceLock::new(),
    }
}
