pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{start, HttpServer, ServerHandle};
pub use request::{parse_query_params, parse_request, RequestInfo};
pub use response::{write_reply, Reply};
pub use service::{AssetMount, FrontendService, FrontendServiceBuilder, ServerOptions, HEALTH_ENDPOINT};
