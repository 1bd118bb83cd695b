//! # Actuation Loop
//!
//! Consumes targets from the mailbox and drives the motion controller.
//!
//! The loop alternates between two states:
//!
//! - **Idle**: waiting on [`Mailbox::take`]
//! - **Executing**: one synchronous round trip per command line
//!
//! Each activation discards stale input, sends `G91`, waits for its response,
//! then sends the `G1` move and waits for that response. Responses pace the
//! loop but never abort it; a failed read or write does, since the device's
//! command/acknowledgment sequence can no longer be trusted.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{PlotjogError, Result};
use crate::motion::command::{Ack, MoveCommand};
use crate::motion::mailbox::Mailbox;
use crate::motion::sampler::SampledTarget;
use crate::serial::CommandPort;
use crate::telemetry::{MoveJournal, MoveRecord};

/// Drives relative moves on the motion controller.
pub struct Actuator<P> {
    port: P,
    mailbox: Arc<Mailbox<SampledTarget>>,
    feed_rate: u32,
    journal: Option<MoveJournal>,
    executed: Arc<AtomicU64>,
}

impl<P: CommandPort> Actuator<P> {
    /// Creates an actuator reading targets from `mailbox`.
    pub fn new(port: P, mailbox: Arc<Mailbox<SampledTarget>>, feed_rate: u32) -> Self {
        Self {
            port,
            mailbox,
            feed_rate,
            journal: None,
            executed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records every completed activation to `journal`.
    #[must_use]
    pub fn with_journal(mut self, journal: MoveJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Shared counter of completed activations.
    pub fn executed_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.executed)
    }

    /// Runs until a transport failure.
    ///
    /// # Errors
    ///
    /// Returns `Transport` on the first failed read or write.
    pub async fn run(mut self) -> Result<()> {
        info!("Actuation loop started (feed rate {} mm/min)", self.feed_rate);
        loop {
            let target = self.mailbox.take().await;
            self.execute(target).await?;
        }
    }

    /// Performs one activation and returns the classified responses.
    pub async fn execute(&mut self, target: SampledTarget) -> Result<Vec<Ack>> {
        let command = MoveCommand::relative(target, self.feed_rate);
        let lines = command.lines();

        let mut responses = Vec::with_capacity(lines.len());
        for line in &lines {
            responses.push(self.round_trip(line).await?);
        }

        let acks: Vec<Ack> = responses.iter().map(|r| Ack::parse(r)).collect();
        for (line, ack) in lines.iter().zip(&acks) {
            if ack.is_error() {
                warn!("Controller rejected '{}': {}", line, ack);
            }
        }

        let count = self.executed.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Move {} done: {}", count, command);

        if let Some(journal) = self.journal.as_mut() {
            let record = MoveRecord {
                timestamp: Utc::now(),
                dx: target.dx,
                dy: target.dy,
                commands: lines.to_vec(),
                responses,
            };
            if let Err(e) = journal.append(&record) {
                warn!("Failed to journal move {}: {}", count, e);
            }
        }

        Ok(acks)
    }

    async fn round_trip(&mut self, line: &str) -> Result<String> {
        self.port
            .discard_input()
            .await
            .map_err(|e| PlotjogError::Transport(format!("Failed to discard input: {}", e)))?;

        self.port
            .write_line(line)
            .await
            .map_err(|e| PlotjogError::Transport(format!("Failed to send '{}': {}", line, e)))?;

        let response = self
            .port
            .read_line()
            .await
            .map_err(|e| PlotjogError::Transport(format!("No response to '{}': {}", line, e)))?;

        debug!("{} -> {}", line, response);
        Ok(response)
    }
}
