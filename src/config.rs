use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for an agora instance.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Address to bind to
    pub address: String,
    /// Port to bind to
    pub port: u16,
    /// URL to connect to the database
    pub database_url: String,
    /// The name shown in the nav bar and page titles.
    pub site_name: String,
    /// Where the static files are.
    pub static_dir: PathBuf,
    /// Where the templates to be rendered are.
    pub template_dir: PathBuf,
    /// File to log to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// One of "off", "error", "warn", "info", "debug" or "trace".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How long a session lasts, e.g. "1 week".
    pub session_length: String,
    /// How many posts are on a page by default.
    pub page_width: u32,
    /// The most posts a client can ask for on one page.
    pub max_page_width: u32,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Open a config file at the given path.
    pub fn open<P>(path: P) -> Result<Config>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let msg = format!("Couldn't open config file at {}", path.display());

        let reader = File::open(path).map_err(|err| Error::from_io_error(err, msg))?;

        Ok(serde_yaml::from_reader(reader)?)
    }

    /// Generate a new config file from default values.
    pub fn generate<W>(mut out: W) -> Result<()>
    where
        W: std::io::Write,
    {
        writeln!(&mut out, "# Configuration for agora")?;
        serde_yaml::to_writer(&mut out, &Config::default())?;
        writeln!(&mut out)?;
        Ok(())
    }

    /// Get the default location of the config file.
    pub fn default_path() -> PathBuf {
        if cfg!(debug_assertions) {
            PathBuf::from("contrib/dev-config.yaml")
        } else {
            PathBuf::from("/etc/agora/config.yaml")
        }
    }

    /// How long a new session lasts.
    pub fn session_length(&self) -> Result<chrono::Duration> {
        let length = parse_duration::parse(&self.session_length)?;

        // Anything that doesn't fit in a chrono duration is effectively forever.
        Ok(chrono::Duration::from_std(length).unwrap_or_else(|_| chrono::Duration::max_value()))
    }

    /// The most verbose level of log messages to write.
    pub fn log_level(&self) -> Result<LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| Error::UnknownLogLevel {
                level: self.log_level.clone(),
            })
    }

    /// Clamp the page width a client asked for to what's allowed.
    pub fn page_width(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(0) | None => self.page_width,
            Some(width) => width.min(self.max_page_width),
        }
    }

    /// Dump configuration info to the log.
    pub fn debug_log(&self) {
        use log::debug;

        debug!("  address {}", self.address);
        debug!("  port {}", self.port);
        debug!("  database url {}", self.database_url);
        debug!("  site name {}", self.site_name);
        debug!("  static dir {}", self.static_dir.display());
        debug!("  template dir {}", self.template_dir.display());
        debug!("  log level {}", self.log_level);
        debug!("  session length {}", self.session_length);
        debug!("  page width {} (max {})", self.page_width, self.max_page_width);
        if let Some(ref log_file) = self.log_file {
            debug!("  log file {}", log_file.display());
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        if cfg!(debug_assertions) {
            Config {
                address: "0.0.0.0".into(),
                port: 8000,
                database_url: "postgres://agora:@localhost/agora".into(),
                site_name: "agora".into(),
                static_dir: PathBuf::from("res/static/"),
                template_dir: PathBuf::from("res/templates/"),
                log_file: None,
                log_level: "debug".into(),
                session_length: "1 week".into(),
                page_width: 10,
                max_page_width: 50,
            }
        } else {
            Config {
                address: "0.0.0.0".into(),
                port: 8000,
                database_url: "postgres://agora:@localhost/agora".into(),
                site_name: "agora".into(),
                static_dir: PathBuf::from("/usr/share/agora/static/"),
                template_dir: PathBuf::from("/usr/share/agora/templates/"),
                log_file: Some(PathBuf::from("/var/log/agora/agora.log")),
                log_level: "info".into(),
                session_length: "1 week".into(),
                page_width: 10,
                max_page_width: 50,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_config_parses() -> Result<()> {
        let mut out = Vec::new();
        Config::generate(&mut out)?;

        let text = String::from_utf8_lossy(&out);
        assert!(text.starts_with("# Configuration for agora"));

        let config: Config = serde_yaml::from_str(&text)?;
        assert_eq!(config.port, 8000);
        assert_eq!(config.site_name, "agora");

        Ok(())
    }

    #[test]
    fn session_length() -> Result<()> {
        let mut config = Config::default();

        assert_eq!(config.session_length()?, chrono::Duration::weeks(1));

        config.session_length = "2 hours".into();
        assert_eq!(config.session_length()?, chrono::Duration::hours(2));

        config.session_length = "a while".into();
        assert!(config.session_length().is_err());

        Ok(())
    }

    #[test]
    fn log_level() -> Result<()> {
        let mut config = Config::default();

        config.log_level = "warn".into();
        assert_eq!(config.log_level()?, LevelFilter::Warn);

        config.log_level = "loud".into();
        assert!(config.log_level().is_err());

        Ok(())
    }

    #[test]
    fn page_width() {
        let config = Config::default();

        assert_eq!(config.page_width(None), 10);
        assert_eq!(config.page_width(Some(0)), 10);
        assert_eq!(config.page_width(Some(20)), 20);
        assert_eq!(config.page_width(Some(500)), 50);
    }

    #[test]
    fn missing_log_level_defaults_to_info() -> Result<()> {
        let yaml = r#"
address: 127.0.0.1
port: 9000
database_url: "postgres://localhost/agora"
site_name: test
static_dir: res/static
template_dir: res/templates
session_length: 1 day
page_width: 5
max_page_width: 25
"#;

        let config: Config = serde_yaml::from_str(yaml)?;

        assert_eq!(config.log_level()?, LevelFilter::Info);
        assert!(config.log_file.is_none());

        Ok(())
    }
}
