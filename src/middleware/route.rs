use super::core::{Flow, PageHandler};
use crate::render::{RenderContext, RequestError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    Exact,
    Prefix,
}

/// Terminal handler rendering a page for `GET`/`HEAD` requests on a path.
#[derive(Debug, Clone)]
pub struct PageRoute {
    path: String,
    page: String,
    matching: Match,
}

impl PageRoute {
    pub fn exact(path: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            page: page.into(),
            matching: Match::Exact,
        }
    }

    /// Everything below `prefix`, for client-side routed applications.
    pub fn prefix(prefix: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            path: prefix.into(),
            page: page.into(),
            matching: Match::Prefix,
        }
    }

    /// Parse `PATH=PAGE`; a trailing `*` on the path makes it a prefix route.
    pub fn parse(spec: &str) -> Option<Self> {
        let (path, page) = spec.split_once('=')?;
        if page.is_empty() || !path.starts_with('/') {
            return None;
        }
        Some(match path.strip_suffix('*') {
            Some(prefix) => Self::prefix(prefix, page),
            None => Self::exact(path, page),
        })
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn matches(&self, path: &str) -> bool {
        match self.matching {
            Match::Exact => path == self.path,
            Match::Prefix => path.starts_with(&self.path),
        }
    }
}

impl PageHandler for PageRoute {
    fn handle(&self, ctx: &mut RenderContext<'_>) -> Result<Flow, RequestError> {
        let request = ctx.request();
        if request.is_read() && self.matches(&request.path) {
            Ok(Flow::render(self.page.clone()))
        } else {
            Ok(Flow::Next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_definition() {
        let exact = PageRoute::parse("/=home").unwrap();
        assert!(exact.matches("/"));
        assert!(!exact.matches("/x"));
        assert_eq!(exact.page(), "home");

        let prefix = PageRoute::parse("/app/*=app").unwrap();
        assert!(prefix.matches("/app/users/1"));
        assert!(!prefix.matches("/other"));

        assert!(PageRoute::parse("home").is_none());
        assert!(PageRoute::parse("/=").is_none());
        assert!(PageRoute::parse("x=home").is_none());
    }
}
