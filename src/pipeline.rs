//! # Pipeline Module
//!
//! Wires the joystick to the motion controller.
//!
//! ```text
//! reader thread ──mpsc──▶ producer task ──Mailbox──▶ actuation task ──▶ serial
//!  (blocking)              (poll tick)                (round trips)
//! ```
//!
//! The reader blocks on the device and forwards stick axis changes. The
//! producer wakes on every poll tick, folds all queued changes into the
//! intent vector, runs the sampler and posts accepted targets to the
//! mailbox. Nothing downstream of the mailbox can slow the producer down.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::actuator::Actuator;
use crate::config::Config;
use crate::error::{PlotjogError, Result};
use crate::joystick::{AxisChange, AxisEventSource, Reading};
use crate::motion::aggregator::{IntentAggregator, IntentUpdate};
use crate::motion::mailbox::Mailbox;
use crate::motion::sampler::{SampledTarget, Sampler, SamplerSettings};
use crate::serial::CommandPort;
use crate::telemetry::MoveJournal;

/// Forwards stick axis changes from `source` until it closes or the receiver goes away.
///
/// A [`Reading::NoEvent`] is skipped. Blocks the calling thread.
pub fn read_events<S>(source: &mut S, tx: &mpsc::Sender<AxisChange>) -> Result<()>
where
    S: AxisEventSource + ?Sized,
{
    loop {
        let event = match source.next_event()? {
            Reading::Event(event) => event,
            // Nothing to forward; the next poll tick sees no update
            Reading::NoEvent => continue,
            Reading::Closed => break,
        };
        let Some(change) = event.stick_change() else {
            continue;
        };
        if tx.blocking_send(change).is_err() {
            debug!("Producer gone, stopping reader for {}", source.device_path());
            return Ok(());
        }
    }
    info!("Joystick {} stopped delivering events", source.device_path());
    Ok(())
}

/// Runs [`read_events`] on a dedicated OS thread.
///
/// The thread is detached from the async runtime so a reader parked in a
/// device read never holds up shutdown.
pub fn spawn_reader<S: AxisEventSource>(
    mut source: S,
    tx: mpsc::Sender<AxisChange>,
) -> Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("joystick-reader".to_string())
        .spawn(move || {
            if let Err(e) = read_events(&mut source, &tx) {
                error!("Joystick reader failed: {}", e);
            }
        })?;
    Ok(handle)
}

/// Producer side: aggregator and sampler driven by the poll tick.
#[derive(Debug)]
pub struct Producer {
    aggregator: IntentAggregator,
    sampler: Sampler,
    mailbox: Arc<Mailbox<SampledTarget>>,
    poll_period: Duration,
}

impl Producer {
    pub fn new(
        settings: SamplerSettings,
        poll_period: Duration,
        mailbox: Arc<Mailbox<SampledTarget>>,
    ) -> Self {
        Self {
            aggregator: IntentAggregator::new(),
            sampler: Sampler::new(settings),
            mailbox,
            poll_period,
        }
    }

    /// Handles one poll tick.
    ///
    /// Drains every queued change, samples, and posts an accepted target.
    ///
    /// # Errors
    ///
    /// Returns `InputClosed` once the reader is gone and the queue is empty.
    pub fn tick(&mut self, rx: &mut mpsc::Receiver<AxisChange>) -> Result<Option<SampledTarget>> {
        loop {
            match rx.try_recv() {
                Ok(change) => {
                    if let Some(update) = IntentUpdate::from_change(&change) {
                        self.aggregator.apply(update);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(PlotjogError::InputClosed),
            }
        }

        let target = self.sampler.poll(self.aggregator.complete());
        if let Some(target) = target {
            let replaced = self.mailbox.set(target);
            debug!(
                "Posted target dx={:.3} dy={:.3}{}",
                target.dx,
                target.dy,
                if replaced { " (replaced unconsumed target)" } else { "" }
            );
        }
        Ok(target)
    }

    /// Ticks until the input closes.
    pub async fn run(mut self, mut rx: mpsc::Receiver<AxisChange>) -> Result<()> {
        let mut ticker = interval(self.poll_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Sampling every {:?}, commanding every {} polls",
            self.poll_period,
            self.sampler.settings().command_every_polls
        );

        loop {
            ticker.tick().await;
            self.tick(&mut rx)?;
        }
    }
}

/// The complete joystick-to-controller bridge.
pub struct Bridge<S, P> {
    source: S,
    producer: Producer,
    actuator: Actuator<P>,
    event_queue: usize,
}

impl<S, P> Bridge<S, P>
where
    S: AxisEventSource,
    P: CommandPort + 'static,
{
    /// Builds the bridge from configuration.
    pub fn new(config: &Config, source: S, port: P) -> Self {
        let mailbox = Arc::new(Mailbox::new());
        Self {
            source,
            producer: Producer::new(
                config.sampler_settings(),
                config.poll_period(),
                Arc::clone(&mailbox),
            ),
            actuator: Actuator::new(port, mailbox, config.motion.feed_rate),
            event_queue: config.timing.event_queue,
        }
    }

    /// Records executed moves to `journal`.
    #[must_use]
    pub fn with_journal(mut self, journal: MoveJournal) -> Self {
        self.actuator = self.actuator.with_journal(journal);
        self
    }

    /// Shared counter of completed activations.
    pub fn executed_counter(&self) -> Arc<AtomicU64> {
        self.actuator.executed_counter()
    }

    /// Runs until the producer or the actuation loop stops.
    ///
    /// # Errors
    ///
    /// - `InputClosed`: the joystick stopped delivering events
    /// - `Transport`: a command round trip failed
    pub async fn run(self) -> Result<()> {
        let (tx, rx) = mpsc::channel(self.event_queue);
        spawn_reader(self.source, tx)?;

        let mut producer = tokio::spawn(self.producer.run(rx));
        let mut actuator = tokio::spawn(self.actuator.run());

        let result = tokio::select! {
            result = &mut producer => joined("producer", result),
            result = &mut actuator => joined("actuator", result),
        };

        producer.abort();
        actuator.abort();
        result
    }
}

fn joined(
    task: &str,
    result: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    result.map_err(|e| PlotjogError::Task(format!("{} task: {}", task, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joystick::mocks::{axis, button, ChannelSource, FailingSource, ScriptedSource};
    use crate::joystick::{AXIS_X, AXIS_Y};
    use crate::serial::port_trait::mocks::RecordingPort;
    use std::sync::atomic::Ordering;

    fn settings(command_every_polls: u32) -> SamplerSettings {
        SamplerSettings {
            min_norm: 0.2,
            max_reach: 0.2,
            command_every_polls,
        }
    }

    fn producer(command_every_polls: u32) -> (Producer, Arc<Mailbox<SampledTarget>>) {
        let mailbox = Arc::new(Mailbox::new());
        let producer = Producer::new(
            settings(command_every_polls),
            Duration::from_millis(1),
            Arc::clone(&mailbox),
        );
        (producer, mailbox)
    }

    fn change(axis: u8, value: f32) -> AxisChange {
        AxisChange { axis, value }
    }

    fn test_config(command_every_polls: u32) -> Config {
        let mut config = Config::default();
        config.timing.command_every_polls = command_every_polls;
        config
    }

    async fn wait_for_lines(port: &RecordingPort, count: usize) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let lines = port.get_written_lines();
                if lines.len() >= count {
                    return lines;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("commands were not sent in time")
    }

    #[test]
    fn test_tick_only_x_updates_emit_nothing() {
        let (mut producer, mailbox) = producer(1);
        let (tx, mut rx) = mpsc::channel(16);

        for value in [0.5, 0.9, -1.0] {
            tx.try_send(change(AXIS_X, value)).unwrap();
            assert_eq!(producer.tick(&mut rx).unwrap(), None);
        }
        assert!(mailbox.try_take().is_none());
    }

    #[test]
    fn test_tick_posts_scaled_target() {
        let (mut producer, mailbox) = producer(1);
        let (tx, mut rx) = mpsc::channel(16);

        tx.try_send(change(AXIS_X, 0.5)).unwrap();
        tx.try_send(change(AXIS_Y, -0.5)).unwrap();

        let target = producer.tick(&mut rx).unwrap().unwrap();
        assert!((target.dx - 0.1).abs() < 1e-6);
        assert!((target.dy + 0.1).abs() < 1e-6);
        assert_eq!(mailbox.try_take(), Some(target));
    }

    #[test]
    fn test_tick_below_floor_posts_nothing() {
        let (mut producer, mailbox) = producer(1);
        let (tx, mut rx) = mpsc::channel(16);

        tx.try_send(change(AXIS_X, 0.1)).unwrap();
        tx.try_send(change(AXIS_Y, 0.1)).unwrap();

        for _ in 0..10 {
            assert_eq!(producer.tick(&mut rx).unwrap(), None);
        }
        assert!(mailbox.try_take().is_none());
    }

    #[test]
    fn test_tick_respects_command_cadence() {
        let (mut producer, mailbox) = producer(3);
        let (tx, mut rx) = mpsc::channel(16);

        tx.try_send(change(AXIS_X, 1.0)).unwrap();
        tx.try_send(change(AXIS_Y, 0.0)).unwrap();

        let posted: Vec<bool> = (0..6)
            .map(|_| producer.tick(&mut rx).unwrap().is_some())
            .collect();
        assert_eq!(posted, vec![false, false, true, false, false, true]);

        // Unconsumed targets collapse into one
        assert!(mailbox.try_take().is_some());
        assert!(mailbox.try_take().is_none());
    }

    #[test]
    fn test_tick_ignores_other_axes() {
        let (mut producer, _mailbox) = producer(1);
        let (tx, mut rx) = mpsc::channel(16);

        tx.try_send(change(AXIS_X, 1.0)).unwrap();
        tx.try_send(change(3, 1.0)).unwrap();
        assert_eq!(producer.tick(&mut rx).unwrap(), None);
    }

    #[test]
    fn test_tick_closed_input_is_error() {
        let (mut producer, _mailbox) = producer(1);
        let (tx, mut rx) = mpsc::channel(16);
        drop(tx);

        assert!(matches!(producer.tick(&mut rx), Err(PlotjogError::InputClosed)));
    }

    #[test]
    fn test_read_events_forwards_only_stick_axes() {
        let mut source = ScriptedSource::new([
            axis(AXIS_X, 0.5),
            button(0, true),
            axis(2, 0.7),
            axis(AXIS_Y, -0.5),
        ]);
        let (tx, mut rx) = mpsc::channel(16);

        read_events(&mut source, &tx).unwrap();
        drop(tx);

        assert_eq!(rx.try_recv().unwrap(), change(AXIS_X, 0.5));
        assert_eq!(rx.try_recv().unwrap(), change(AXIS_Y, -0.5));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn test_read_events_stops_when_producer_gone() {
        let mut source = ScriptedSource::new([axis(AXIS_X, 0.5), axis(AXIS_Y, 0.5)]);
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        assert!(read_events(&mut source, &tx).is_ok());
        // Stopped at the first failed send
        assert_eq!(source.readings.len(), 1);
    }

    #[test]
    fn test_read_events_skips_no_event() {
        let mut source = ScriptedSource::from_readings([
            Reading::NoEvent,
            axis(AXIS_X, 0.5).into(),
            Reading::NoEvent,
            Reading::NoEvent,
            axis(AXIS_Y, -0.5).into(),
        ]);
        let (tx, mut rx) = mpsc::channel(16);

        read_events(&mut source, &tx).unwrap();
        drop(tx);

        assert_eq!(rx.try_recv().unwrap(), change(AXIS_X, 0.5));
        assert_eq!(rx.try_recv().unwrap(), change(AXIS_Y, -0.5));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn test_read_events_propagates_device_errors() {
        let (tx, _rx) = mpsc::channel(16);
        assert!(matches!(
            read_events(&mut FailingSource, &tx),
            Err(PlotjogError::Joystick(_))
        ));
    }

    #[tokio::test]
    async fn test_end_to_end_move() {
        let (events, source) = ChannelSource::new();
        let port = RecordingPort::new();
        let bridge = Bridge::new(&test_config(5), source, port.clone());
        let handle = tokio::spawn(bridge.run());

        events.send(axis(AXIS_X, 0.5).into()).unwrap();
        events.send(axis(AXIS_Y, -0.5).into()).unwrap();

        let lines = wait_for_lines(&port, 2).await;
        assert_eq!(lines[0], "G91");
        assert_eq!(lines[1], "G1 X0.100 Y0.100 F400");

        handle.abort();
    }

    #[tokio::test]
    async fn test_end_to_end_no_event_keeps_running() {
        let (events, source) = ChannelSource::new();
        let port = RecordingPort::new();
        let handle = tokio::spawn(Bridge::new(&test_config(5), source, port.clone()).run());

        events.send(Reading::NoEvent).unwrap();
        events.send(Reading::NoEvent).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());
        assert!(port.get_written_lines().is_empty());

        events.send(axis(AXIS_X, 0.5).into()).unwrap();
        events.send(axis(AXIS_Y, -0.5).into()).unwrap();

        let lines = wait_for_lines(&port, 2).await;
        assert_eq!(lines[0], "G91");
        assert_eq!(lines[1], "G1 X0.100 Y0.100 F400");

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_commands_on_poll_multiple() {
        let (producer, mailbox) = producer(20);
        let (tx, rx) = mpsc::channel(16);
        tx.send(change(AXIS_X, 1.0)).await.unwrap();
        tx.send(change(AXIS_Y, 0.0)).await.unwrap();

        let handle = tokio::spawn(producer.run(rx));

        // Polls at 0..=18 ms: 19 polls, no command tick yet
        tokio::time::sleep(Duration::from_micros(18_500)).await;
        assert!(mailbox.try_take().is_none());

        // The 20th poll at 19 ms is a command tick
        tokio::time::sleep(Duration::from_millis(1)).await;
        let target = mailbox.try_take().expect("command tick should post a target");
        assert!((target.dx - 0.2).abs() < 1e-6);
        assert_eq!(target.dy, 0.0);

        assert!(!handle.is_finished());
        handle.abort();
        drop(tx);
    }

    #[tokio::test]
    async fn test_end_to_end_jitter_sends_nothing() {
        let (events, source) = ChannelSource::new();
        let port = RecordingPort::new();
        let bridge = Bridge::new(&test_config(5), source, port.clone());
        let executed = bridge.executed_counter();
        let handle = tokio::spawn(bridge.run());

        events.send(axis(AXIS_X, 0.1).into()).unwrap();
        events.send(axis(AXIS_Y, 0.1).into()).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(port.get_written_lines().is_empty());
        assert_eq!(executed.load(Ordering::Relaxed), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_end_to_end_incomplete_vector_sends_nothing() {
        let (events, source) = ChannelSource::new();
        let port = RecordingPort::new();
        let handle = tokio::spawn(Bridge::new(&test_config(1), source, port.clone()).run());

        events.send(axis(AXIS_X, 1.0).into()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(port.get_written_lines().is_empty());

        // Completing the vector starts motion
        events.send(axis(AXIS_Y, 0.0).into()).unwrap();
        let lines = wait_for_lines(&port, 2).await;
        assert_eq!(lines[1], "G1 X0.200 Y0.000 F400");

        handle.abort();
    }

    #[tokio::test]
    async fn test_bridge_stops_when_joystick_disconnects() {
        let (events, source) = ChannelSource::new();
        let port = RecordingPort::new();
        let handle = tokio::spawn(Bridge::new(&test_config(5), source, port).run());

        drop(events);

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("bridge should stop")
            .unwrap();
        assert!(matches!(result, Err(PlotjogError::InputClosed)));
    }
}
