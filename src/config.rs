use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;

use crate::cli::CliArgs;
use crate::error::{MailFetchError, Result};

pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

const LOG_PREFIX: &str = "mail-fetch";
const RESULTS_PREFIX: &str = "results";

/// Optional settings read from `config.toml`.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct FileConfig {
    #[serde(default)]
    pub endpoints: EndpointOverrides,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct EndpointOverrides {
    pub authority_url: Option<String>,
    pub graph_url: Option<String>,
    pub scope: Option<String>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authority_url: Url,
    pub graph_url: Url,
    pub scope: String,
    pub page_size: Option<u32>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authority_url: Url::parse(DEFAULT_AUTHORITY_URL).expect("default authority url"),
            graph_url: Url::parse(DEFAULT_GRAPH_URL).expect("default graph url"),
            scope: DEFAULT_SCOPE.to_string(),
            page_size: None,
        }
    }
}

impl Endpoints {
    fn resolve(file: EndpointOverrides, args: &CliArgs) -> Result<Self> {
        let authority_url = args.authority_url.clone().or(file.authority_url);
        let graph_url = args.graph_url.clone().or(file.graph_url);
        Ok(Self {
            authority_url: parse_url("authority url", authority_url, DEFAULT_AUTHORITY_URL)?,
            graph_url: parse_url("graph url", graph_url, DEFAULT_GRAPH_URL)?,
            scope: file.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            page_size: args.page_size.or(file.page_size),
        })
    }
}

/// Only absolute http(s) URLs that can carry further path segments.
fn parse_url(what: &str, raw: Option<String>, default: &str) -> Result<Url> {
    let raw = raw.as_deref().unwrap_or(default);
    let url = Url::parse(raw)
        .map_err(|e| MailFetchError::Config(format!("invalid {what} {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(MailFetchError::Config(format!(
            "invalid {what} {raw:?}: expected an http(s) base url"
        )));
    }
    Ok(url)
}

/// The application credential used for the client-credential grant.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub app_id: String,
    pub organization_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("app_id", &self.app_id)
            .field("organization_id", &self.organization_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Validated input for one run. Built once in `main` and only borrowed after that.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub credentials: ClientCredentials,
    pub username: String,
    pub output_dir: PathBuf,
    pub include_attachments: bool,
    pub fetch_all_pages: bool,
    pub endpoints: Endpoints,
    pub started_at: DateTime<Utc>,
}

impl RunConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => load_file_config(&absolutize(path)?)?,
            None => match default_config_path() {
                Some(path) if path.exists() => load_file_config(&path)?,
                _ => FileConfig::default(),
            },
        };
        let endpoints = Endpoints::resolve(file.endpoints, &args)?;

        let config = Self {
            credentials: ClientCredentials {
                app_id: required("--app-id", args.app_id)?,
                organization_id: required("--organization-id", args.organization_id)?,
                client_secret: required("--client-secret", args.client_secret)?,
            },
            username: required("--username", args.username)?,
            output_dir: absolutize(&args.output)?,
            include_attachments: args.include_attachments,
            fetch_all_pages: args.all_results,
            endpoints,
            started_at: Utc::now(),
        };
        if config.endpoints.page_size == Some(0) {
            return Err(MailFetchError::Config("page size must be positive".into()));
        }
        Ok(config)
    }

    /// Sortable UTC stamp with millisecond precision, safe in file names.
    pub fn file_stamp(&self) -> String {
        self.started_at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.output_dir.join("logs")
    }

    pub fn log_file_name(&self) -> String {
        format!("{LOG_PREFIX}_{}.log", self.file_stamp())
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir
            .join("results")
            .join(format!("{RESULTS_PREFIX}_{}.json", self.file_stamp()))
    }
}

/// Rejects blank values; anything else is kept byte for byte.
fn required(flag: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(MailFetchError::Config(format!("{flag} must not be empty")));
    }
    Ok(value)
}

/// Expands `~` and joins relative paths onto the current directory.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let raw = path
        .to_str()
        .ok_or_else(|| MailFetchError::Config(format!("path is not valid UTF-8: {path:?}")))?;
    if raw.trim().is_empty() {
        return Err(MailFetchError::Config("--output must not be empty".into()));
    }
    let expanded = PathBuf::from(shellexpand::tilde(raw).as_ref());
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    let cwd = std::env::current_dir()
        .map_err(|e| MailFetchError::Config(format!("cannot read current directory: {e}")))?;
    Ok(cwd.join(expanded))
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mail-fetch").join("config.toml"))
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path).map_err(|source| MailFetchError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| MailFetchError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
