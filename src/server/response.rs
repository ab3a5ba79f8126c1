use crate::render::PageResponse;
use crate::static_files::StaticFile;
use http::StatusCode;
use may_minihttp::Response;
use serde_json::Value;

/// Everything the service can send back.
#[derive(Debug)]
pub enum Reply {
    Page(PageResponse),
    File(StaticFile),
}

impl Reply {
    pub fn status(&self) -> u16 {
        match self {
            Reply::Page(page) => page.status,
            Reply::File(_) => 200,
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Reply::Page(PageResponse::json(status, &body))
    }
}

fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

pub fn write_reply(res: &mut Response, reply: Reply) {
    let status = reply.status();
    res.status_code(status as usize, status_reason(status));
    match reply {
        Reply::Page(page) => {
            res.header(page.content_type);
            res.body_vec(page.body.into_bytes());
        }
        Reply::File(file) => {
            res.header(file.content_type);
            res.header(file.cache_control);
            res.body_vec(file.bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(418), "I'm a teapot");
        assert_eq!(status_reason(799), "Unknown");
    }
}
