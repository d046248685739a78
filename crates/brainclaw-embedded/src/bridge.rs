//! Cooperative scheduler for the main context

use crate::clock::Clock;
use crate::orchestrator::{OrchestratorState, StreamOrchestrator};
use crate::pump::{LinkChange, PumpStats, TransportPump};
use crate::radio::RadioLink;
use crate::transport::{Endpoint, Transport};

/// Orchestrator plus transport pump, driven by one `tick` per loop iteration.
///
/// ```text
/// tick:  pump.poll ─▶ orchestrator hooks ─▶ pump.drain ─▶ orchestrator.tick
/// ```
pub struct Bridge<'a, R: RadioLink, T: Transport, C: Clock> {
    orchestrator: StreamOrchestrator<'a, R, C>,
    pump: TransportPump<'a, T>,
    next_stats_at: u64,
}

impl<'a, R: RadioLink, T: Transport, C: Clock> Bridge<'a, R, T, C> {
    /// Combine an orchestrator and a pump.
    pub fn new(orchestrator: StreamOrchestrator<'a, R, C>, pump: TransportPump<'a, T>) -> Self {
        let next_stats_at = orchestrator.now_ms() + orchestrator.config().stats_interval_ms;
        Self { orchestrator, pump, next_stats_at }
    }

    /// Connect the transport and start looking for the headset.
    pub fn start(&mut self, endpoint: &Endpoint<'_>) {
        self.pump.connect(endpoint);
        self.orchestrator.start();
    }

    /// Run one scheduler iteration.
    pub fn tick(&mut self) {
        for change in self.pump.poll() {
            match change {
                LinkChange::Up => self.orchestrator.on_transport_connected(),
                LinkChange::Down => self.orchestrator.on_transport_disconnected(),
            }
        }

        self.pump.drain();
        self.orchestrator.tick();
        self.log_stats();
    }

    /// Stop streaming and release the peripheral.
    pub fn shutdown(&mut self) {
        self.orchestrator.shutdown();
        self.pump.drain();
        tracing::info!("Bridge stopped");
    }

    /// Current orchestrator state
    pub fn state(&self) -> &OrchestratorState {
        self.orchestrator.state()
    }

    /// Pump counters
    pub fn pump_stats(&self) -> PumpStats {
        self.pump.stats()
    }

    /// Orchestrator
    pub fn orchestrator(&self) -> &StreamOrchestrator<'a, R, C> {
        &self.orchestrator
    }

    /// Transport pump
    pub fn pump(&self) -> &TransportPump<'a, T> {
        &self.pump
    }

    /// Transport pump (mutable)
    pub fn pump_mut(&mut self) -> &mut TransportPump<'a, T> {
        &mut self.pump
    }

    fn log_stats(&mut self) {
        let now = self.orchestrator.now_ms();
        if now < self.next_stats_at {
            return;
        }
        self.next_stats_at = now + self.orchestrator.config().stats_interval_ms;

        let relay = self.pump.relay_stats();
        let pump = self.pump.stats();
        tracing::info!(
            state = self.orchestrator.state().label(),
            queued = relay.accepted,
            relay_dropped = relay.dropped,
            sent = pump.sent,
            discarded = pump.discarded,
            send_failed = pump.send_failed,
            "bridge stats"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::notify::{NotificationHandler, NotifyOutcome};
    use crate::testing::{FakeClock, FakeEvent, FakeRadio, FakeTransport, RadioCall};
    use brainclaw_core::protocol::{pack_samples, EEG_AF7_CHAR_UUID, GYRO_CHAR_UUID, TELEMETRY_CHAR_UUID};
    use brainclaw_core::{LinkState, RelayQueue};

    const ENDPOINT: Endpoint<'static> = Endpoint { host: "10.0.0.2", port: 8765, path: "/?role=producer" };

    fn run<R: RadioLink, T: Transport>(bridge: &mut Bridge<'_, R, T, &FakeClock>, clock: &FakeClock, n: usize) {
        for _ in 0..n {
            bridge.tick();
            clock.advance(100);
        }
    }

    #[test]
    fn test_end_to_end() {
        let relay = RelayQueue::new();
        let link = LinkState::new();
        let clock = FakeClock::default();
        let handler = NotificationHandler::new(&relay, &link);

        let orchestrator = StreamOrchestrator::new(FakeRadio::with_muse(), &clock, &link, BridgeConfig::default());
        let pump = TransportPump::new(FakeTransport::default(), &relay, &link);
        let mut bridge = Bridge::new(orchestrator, pump);

        bridge.start(&ENDPOINT);
        assert_eq!(bridge.pump().transport().endpoint.as_deref(), Some("10.0.0.2:8765/?role=producer"));

        // Radio comes up first; nothing can be delivered yet
        run(&mut bridge, &clock, 3);
        assert!(matches!(bridge.state(), OrchestratorState::Linked { .. }));
        let telemetry = [0, 1, 0x00, 0x32, 0, 0, 0, 0, 0x00, 0xC8];
        assert_eq!(handler.on_notification(TELEMETRY_CHAR_UUID, &telemetry), NotifyOutcome::Offline);

        // Transport up: one start sequence
        bridge.pump_mut().transport_mut().push_event(FakeEvent::Connected);
        run(&mut bridge, &clock, 20);
        assert_eq!(bridge.state(), &OrchestratorState::Streaming);
        assert!(link.streaming());
        assert_eq!(bridge.orchestrator().radio().writes().len(), 3);

        // Data flows in arrival order
        let mut eeg = [0u8; 20];
        eeg[1] = 9;
        eeg[2..].copy_from_slice(&pack_samples(&[2048; 12]));
        let gyro = [0, 1, 0, 0, 0, 0, 0, 0];
        assert_eq!(handler.on_notification(TELEMETRY_CHAR_UUID, &telemetry), NotifyOutcome::Queued);
        assert_eq!(handler.on_notification(EEG_AF7_CHAR_UUID, &eeg), NotifyOutcome::Queued);
        assert_eq!(handler.on_notification(GYRO_CHAR_UUID, &gyro), NotifyOutcome::Queued);
        bridge.tick();

        let sent = &bridge.pump().transport().sent;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0], r#"{"type":"telemetry","battery":50,"temp":20.0}"#);
        assert!(sent[1].starts_with(r#"{"type":"eeg","ch":1,"seq":9,"samples":[0.00,"#));
        assert_eq!(sent[2], r#"{"type":"gyro","x":0.00,"y":0.00,"z":0.00}"#);

        // Transport drop: stream stops, peripheral kept
        bridge.pump_mut().transport_mut().push_event(FakeEvent::Disconnected);
        bridge.tick();
        assert!(!link.streaming());
        assert!(link.radio_connected());
        assert_eq!(bridge.orchestrator().radio().count(|c| matches!(c, RadioCall::Unsubscribe(..))), 7);
        assert_eq!(handler.on_notification(TELEMETRY_CHAR_UUID, &telemetry), NotifyOutcome::Offline);

        // Back again, then the headset drops
        bridge.pump_mut().transport_mut().push_event(FakeEvent::Connected);
        run(&mut bridge, &clock, 20);
        assert_eq!(bridge.state(), &OrchestratorState::Streaming);

        link.on_radio_disconnected();
        bridge.tick();
        assert!(matches!(bridge.state(), OrchestratorState::Scanning { .. }));
        assert!(!link.streaming());
    }

    #[test]
    fn test_messages_discarded_after_transport_loss() {
        let relay = RelayQueue::new();
        let link = LinkState::new();
        let clock = FakeClock::default();
        let handler = NotificationHandler::new(&relay, &link);

        let orchestrator = StreamOrchestrator::new(FakeRadio::with_muse(), &clock, &link, BridgeConfig::default());
        let pump = TransportPump::new(FakeTransport::default(), &relay, &link);
        let mut bridge = Bridge::new(orchestrator, pump);
        bridge.start(&ENDPOINT);
        bridge.pump_mut().transport_mut().push_event(FakeEvent::Connected);
        run(&mut bridge, &clock, 20);

        // Queued while up, transport drops before the next drain
        let telemetry = [0, 1, 0x00, 0x32, 0, 0, 0, 0, 0x00, 0xC8];
        handler.on_notification(TELEMETRY_CHAR_UUID, &telemetry);
        bridge.pump_mut().transport_mut().push_event(FakeEvent::Disconnected);
        bridge.tick();

        assert!(bridge.pump().transport().sent.is_empty());
        assert_eq!(bridge.pump_stats().discarded, 1);
    }
}
