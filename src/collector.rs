use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::client::GraphClient;
use crate::config::RunConfig;
use crate::error::Result;
use crate::model::{Attachment, MailMessage, OutputRecord};
use crate::paginate::{self, ItemSink};
use crate::writer::ResultWriter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub messages: usize,
    pub attachments: usize,
    pub pages: usize,
}

pub struct MailCollector<'a> {
    graph: &'a GraphClient,
    config: &'a RunConfig,
}

impl<'a> MailCollector<'a> {
    pub fn new(graph: &'a GraphClient, config: &'a RunConfig) -> Self {
        Self { graph, config }
    }

    /// Walks the user's messages and writes one record per message before
    /// moving to the next.
    #[instrument(skip_all, fields(user = %self.config.username))]
    pub async fn collect(&self, writer: &mut ResultWriter) -> Result<CollectSummary> {
        let url = self
            .graph
            .messages_url(&self.config.username, self.config.endpoints.page_size);
        let first = self.graph.get_page::<MailMessage>(&url).await?;

        let mut sink = RecordSink {
            collector: self,
            writer,
            messages: 0,
            attachments: 0,
        };
        let traversal = paginate::for_each(
            first,
            &self.graph.pages::<MailMessage>(),
            self.config.fetch_all_pages,
            &mut sink,
        )
        .await?;

        let summary = CollectSummary {
            messages: sink.messages,
            attachments: sink.attachments,
            pages: traversal.pages,
        };
        info!(
            messages = summary.messages,
            attachments = summary.attachments,
            pages = summary.pages,
            "collection finished"
        );
        Ok(summary)
    }

    async fn attachments_of(&self, message_id: &str) -> Result<Vec<Attachment>> {
        let url = self
            .graph
            .attachments_url(&self.config.username, message_id);
        let first = self.graph.get_page::<Attachment>(&url).await?;
        paginate::collect_all(
            first,
            &self.graph.pages::<Attachment>(),
            self.config.fetch_all_pages,
        )
        .await
    }
}

struct RecordSink<'c, 'w> {
    collector: &'c MailCollector<'c>,
    writer: &'w mut ResultWriter,
    messages: usize,
    attachments: usize,
}

#[async_trait]
impl<'c, 'w> ItemSink<MailMessage> for RecordSink<'c, 'w> {
    async fn accept(&mut self, message: MailMessage) -> Result<()> {
        let message_id = message.id().unwrap_or_default().to_string();
        let attachments = if !self.collector.config.include_attachments {
            Vec::new()
        } else if message_id.is_empty() {
            warn!("message has no id, skipping its attachments");
            Vec::new()
        } else {
            self.collector.attachments_of(&message_id).await?
        };

        debug!(
            message_id = %message_id,
            attachments = attachments.len(),
            "writing record"
        );
        self.attachments += attachments.len();
        self.writer.write_record(&OutputRecord {
            message,
            attachments,
        })?;
        self.messages += 1;
        Ok(())
    }
}
