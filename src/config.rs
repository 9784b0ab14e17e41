use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "PORT", default_value = "10000")]
    pub port: u16,

    /// SQLite URL, e.g. `sqlite://github_events.db` or `sqlite::memory:`
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite://github_events.db")]
    pub database_url: String,

    #[arg(short, long, env = "GITHUB_WEBHOOK_SECRET")]
    pub secret: Option<String>,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "gh-event-log",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--database-url",
            "sqlite::memory:",
            "--secret",
            "hush",
        ])
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.secret.as_deref(), Some("hush"));
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(Config::try_parse_from(["gh-event-log", "--port", "http"]).is_err());
    }
}
