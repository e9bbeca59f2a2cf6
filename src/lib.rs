pub mod auth;
pub mod cli;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod paginate;
pub mod writer;

use std::path::PathBuf;

use reqwest::Client;
use tracing::{Instrument, info, info_span};

use crate::auth::{Authenticator, ClientCredentialAuthenticator};
use crate::client::GraphClient;
use crate::collector::MailCollector;
use crate::config::RunConfig;
use crate::error::Result;
use crate::writer::ResultWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub messages: usize,
    pub attachments: usize,
    pub results_path: PathBuf,
}

pub async fn run(config: &RunConfig) -> Result<RunSummary> {
    let http = Client::new();
    let authenticator = ClientCredentialAuthenticator::new(http.clone(), &config.endpoints);
    run_with(config, &authenticator, http).await
}

/// Runs one fetch with the given authenticator. The results file is closed
/// on every path; records written before a failure stay on disk.
pub async fn run_with<A>(config: &RunConfig, authenticator: &A, http: Client) -> Result<RunSummary>
where
    A: Authenticator + ?Sized,
{
    let span = info_span!("run", user = %config.username, started_at = %config.started_at);
    async move {
        let auth = authenticator.acquire_context(&config.credentials).await?;
        info!(scope = %auth.scope, "authenticated");

        let graph = GraphClient::new(http, auth, &config.endpoints.graph_url);
        let mut writer = ResultWriter::open(config.results_path())?;
        info!(path = %writer.path().display(), "writing results");

        let summary = MailCollector::new(&graph, config)
            .collect(&mut writer)
            .await?;
        let results_path = writer.path().to_path_buf();
        writer.close()?;

        Ok(RunSummary {
            messages: summary.messages,
            attachments: summary.attachments,
            results_path,
        })
    }
    .instrument(span)
    .await
}
