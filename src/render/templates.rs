//! Markup functions used to assemble a page.
//!
//! [`Templates`] provides a default for every method, so an implementation
//! overrides only what it needs:
//!
//! ```rust
//! use pagewright::render::Templates;
//! use pagewright::server::RequestInfo;
//!
//! struct DeferredScripts;
//!
//! impl Templates for DeferredScripts {
//!     fn render_script(&self, _req: &RequestInfo, src: &str) -> String {
//!         format!(r#"<script defer src="{src}"></script>"#)
//!     }
//! }
//! ```

use super::context::RenderValues;
use super::page::RenderError;
use crate::server::RequestInfo;
use minijinja::{Environment, Value as JinjaValue};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Inputs of the main document template.
///
/// `styles` and `scripts` are already-rendered fragments and must be
/// emitted as-is.
#[derive(Debug)]
pub struct MainTemplateParams<'a> {
    pub page: &'a str,
    pub base_url: &'a str,
    pub styles: &'a str,
    pub scripts: &'a str,
    /// Merged render values, including `baseUrl`, `styles` and `scripts`.
    pub values: &'a RenderValues,
}

pub trait Templates: Send + Sync {
    fn render_main(
        &self,
        _request: &RequestInfo,
        params: &MainTemplateParams<'_>,
    ) -> Result<String, RenderError> {
        Ok(main_document(params))
    }

    fn render_script(&self, _request: &RequestInfo, src: &str) -> String {
        script_tag(src)
    }

    fn render_stylesheet(&self, _request: &RequestInfo, href: &str) -> String {
        stylesheet_tag(href)
    }

    /// Only used when the live provider inlines stylesheets.
    fn render_inline_style(&self, _request: &RequestInfo, css: &str) -> String {
        inline_style_tag(css)
    }
}

/// Every method at its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTemplates;

impl Templates for DefaultTemplates {}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn main_document(params: &MainTemplateParams<'_>) -> String {
    format!(
        r#"<!doctype html>
<html lang="en-US">
  <head>
    <title></title>
    <meta charset="utf-8" />
    <base href="{base}" />
    {styles}
  </head>
  <body>
    {scripts}
  </body>
</html>"#,
        base = escape_attr(params.base_url),
        styles = params.styles,
        scripts = params.scripts,
    )
}

pub fn script_tag(src: &str) -> String {
    format!(r#"<script src="{}"></script>"#, escape_attr(src))
}

pub fn stylesheet_tag(href: &str) -> String {
    format!(r#"<link rel="stylesheet" href="{}" />"#, escape_attr(href))
}

pub fn inline_style_tag(css: &str) -> String {
    format!("<style>{css}</style>")
}

/// Main documents from minijinja views.
///
/// Each `<name>.html` in the views directory is a view. The view is chosen by
/// the `viewName` render value, falling back to the page name, and then to
/// [`main_document`] when no such view exists. Render values are
/// auto-escaped; `styles` and `scripts` are passed as safe strings.
#[derive(Debug, Clone, Default)]
pub struct ViewTemplates {
    views: HashMap<String, String>,
}

impl ViewTemplates {
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let mut views = HashMap::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                debug!(view = %stem, "registered view template");
                views.insert(stem.to_string(), fs::read_to_string(&path)?);
            }
        }
        Ok(Self { views })
    }

    pub fn with_view(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.views.insert(name.into(), source.into());
        self
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    fn render_view(&self, name: &str, source: &str, params: &MainTemplateParams<'_>) -> Result<String, RenderError> {
        let mut ctx: BTreeMap<String, JinjaValue> = params
            .values
            .iter()
            .map(|(k, v)| (k.clone(), JinjaValue::from_serialize(v)))
            .collect();
        ctx.insert("styles".into(), JinjaValue::from_safe_string(params.styles.to_string()));
        ctx.insert("scripts".into(), JinjaValue::from_safe_string(params.scripts.to_string()));
        ctx.insert("baseUrl".into(), JinjaValue::from(params.base_url));

        // The `.html` suffix turns on HTML auto-escaping.
        let template_name = format!("{name}.html");
        let mut env = Environment::new();
        env.add_template(&template_name, source)
            .map_err(|e| RenderError::Template(e.to_string()))?;
        let tmpl = env
            .get_template(&template_name)
            .map_err(|e| RenderError::Template(e.to_string()))?;
        tmpl.render(ctx)
            .map_err(|e| RenderError::Template(e.to_string()))
    }
}

impl Templates for ViewTemplates {
    fn render_main(
        &self,
        _request: &RequestInfo,
        params: &MainTemplateParams<'_>,
    ) -> Result<String, RenderError> {
        let view = params
            .values
            .get("viewName")
            .and_then(|v| v.as_str())
            .unwrap_or(params.page);
        match self.views.get(view) {
            Some(source) => self.render_view(view, source, params),
            None => Ok(main_document(params)),
        }
    }
}
