//! Inbound multiplexer: every channel adapter feeds one queue, and each
//! message is handled on its own task so slow generations in one chat do not
//! hold up the others.

use crate::dialogue::Dialogue;
use anyhow::Result;
use bb_channels::{ChannelAdapter, InboundMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

pub struct Gateway {
    dialogue: Arc<Dialogue>,
    channels: HashMap<String, Arc<dyn ChannelAdapter>>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
}

impl Gateway {
    pub fn new(
        dialogue: Arc<Dialogue>,
        channels: HashMap<String, Arc<dyn ChannelAdapter>>,
        inbound_rx: mpsc::Receiver<InboundMessage>,
    ) -> Self {
        Self {
            dialogue,
            channels,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
        }
    }

    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run_loop(shutdown).await {
                tracing::error!(%e, "gateway loop exited");
            }
        })
    }

    async fn run_loop(self: &Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        let mut rx = self.inbound_rx.lock().await;
        let mut in_flight = JoinSet::new();
        tracing::info!(channels = self.channels.len(), "gateway loop started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(in_flight = in_flight.len(), "gateway stopping");
                    in_flight.shutdown().await;
                    return Ok(());
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "inbound handler task failed");
                    }
                }
                msg = rx.recv() => {
                    let Some(inbound) = msg else {
                        tracing::info!("inbound queue closed");
                        while in_flight.join_next().await.is_some() {}
                        return Ok(());
                    };
                    let gateway = Arc::clone(self);
                    in_flight.spawn(async move {
                        if let Err(e) = gateway.handle_inbound(inbound).await {
                            tracing::warn!(%e, "handle_inbound failed");
                        }
                    });
                }
            }
        }
    }

    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(channel = %inbound.channel_id, sender = %inbound.sender_id)
    )]
    async fn handle_inbound(&self, inbound: InboundMessage) -> Result<()> {
        let channel = self
            .channels
            .get(inbound.channel_id.as_str())
            .ok_or_else(|| anyhow::anyhow!("unknown channel: {}", inbound.channel_id))?
            .clone();

        self.dialogue.handle(channel.as_ref(), &inbound).await
    }
}
