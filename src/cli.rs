use crate::middleware::PageRoute;
use crate::runtime_config::{Mode, RuntimeConfig};
use crate::server::ServerOptions;
use clap::Parser;
use std::path::PathBuf;

fn parse_page_route(s: &str) -> Result<PageRoute, String> {
    PageRoute::parse(s).ok_or_else(|| format!("expected PATH=PAGE (e.g. /=home or /app/*=app), got '{s}'"))
}

#[derive(Parser, Debug)]
#[command(name = "pagewright")]
#[command(about = "Serve server-rendered pages for a bundled frontend", long_about = None, version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "PAGEWRIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run with live assets from a watching bundler
    #[arg(long, default_value_t = false)]
    pub dev: bool,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Production build output containing assets.json
    #[arg(long)]
    pub dist: Option<PathBuf>,

    /// URL prefix the bundle is served under
    #[arg(long)]
    pub public_path: Option<String>,

    /// Compilation stats written by the bundler in watch mode
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// Directory the watching bundler emits into
    #[arg(long)]
    pub live_output: Option<PathBuf>,

    /// Inline stylesheets in development instead of linking them
    #[arg(long, default_value_t = false)]
    pub inline_styles: bool,

    /// Directory of minijinja page views (<name>.html)
    #[arg(long)]
    pub views: Option<PathBuf>,

    /// Page route as PATH=PAGE; repeatable. A trailing `*` matches a prefix.
    #[arg(long = "page", value_parser = parse_page_route)]
    pub pages: Vec<PageRoute>,

    #[arg(long, default_value_t = false)]
    pub no_health_check: bool,

    #[arg(long, default_value_t = false)]
    pub no_catch_all: bool,

    #[arg(long, default_value_t = false)]
    pub no_error_handling: bool,
}

impl Cli {
    /// Apply flags on top of an already layered configuration.
    pub fn apply(&self, config: &mut RuntimeConfig) {
        if self.dev {
            config.mode = Mode::Development;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dist) = &self.dist {
            config.dist_folder = dist.clone();
        }
        if let Some(public_path) = &self.public_path {
            config.public_path = public_path.clone();
        }
        if let Some(stats) = &self.stats {
            config.stats_file = stats.clone();
        }
        if let Some(out) = &self.live_output {
            config.live_output_dir = out.clone();
        }
        if self.inline_styles {
            config.inline_styles = true;
        }
        if self.views.is_some() {
            config.views_dir = self.views.clone();
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            disable_error_handling: self.no_error_handling,
            disable_catch_all: self.no_catch_all,
            disable_health_check: self.no_health_check,
        }
    }

    /// Configured routes, or `/` to the `index` page.
    pub fn page_routes(&self) -> Vec<PageRoute> {
        if self.pages.is_empty() {
            vec![PageRoute::exact("/", "index")]
        } else {
            self.pages.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "pagewright",
            "--dev",
            "--port",
            "9100",
            "--dist",
            "/srv/dist",
            "--page",
            "/=home",
            "--page",
            "/app/*=app",
        ]);
        let mut config = RuntimeConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.mode, Mode::Development);
        assert_eq!(config.port, 9100);
        assert_eq!(config.dist_folder, PathBuf::from("/srv/dist"));
        let routes = cli.page_routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[1].page(), "app");
    }

    #[test]
    fn test_default_route_and_bad_route() {
        let cli = Cli::parse_from(["pagewright"]);
        assert_eq!(cli.page_routes()[0].page(), "index");
        assert!(Cli::try_parse_from(["pagewright", "--page", "home"]).is_err());
    }
}
