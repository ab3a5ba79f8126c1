mod core;
mod route;

pub use core::{from_fn, from_lazy, Flow, FnHandler, LazyHandler, PageHandler};
pub use route::PageRoute;
