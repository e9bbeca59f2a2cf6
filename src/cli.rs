use std::path::PathBuf;

use clap::Parser;
use clap::builder::NonEmptyStringValueParser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mail-fetch",
    version,
    about = "Read a Microsoft 365 mailbox with an application credential via Graph API"
)]
pub struct CliArgs {
    /// Application (client) id of the registered app
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub app_id: String,

    /// Directory (tenant) id of the organization
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub organization_id: String,

    /// Client secret of the registered app
    #[arg(
        long,
        env = "MAIL_FETCH_CLIENT_SECRET",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub client_secret: String,

    /// Mailbox to read (user principal name or object id)
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub username: String,

    /// Directory receiving logs/ and results/
    #[arg(long)]
    pub output: PathBuf,

    /// Also fetch the attachments of every message
    #[arg(long, default_value_t = false)]
    pub include_attachments: bool,

    /// Walk every page instead of stopping after the first result
    #[arg(long, default_value_t = false)]
    pub all_results: bool,

    /// TOML file with endpoint settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "MAIL_FETCH_AUTHORITY_URL", hide = true)]
    pub authority_url: Option<String>,

    #[arg(long, env = "MAIL_FETCH_GRAPH_URL", hide = true)]
    pub graph_url: Option<String>,

    /// Page size requested from the messages endpoint ($top)
    #[arg(long, hide = true)]
    pub page_size: Option<u32>,
}
