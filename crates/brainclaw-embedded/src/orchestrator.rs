//! Stream orchestrator: peripheral discovery, connection and stream control
//!
//! A non-blocking state machine driven by [`StreamOrchestrator::tick`] from
//! the main scheduling context. Retry delays are deadlines on the [`Clock`],
//! never sleeps.
//!
//! ```text
//!  Idle ──start──▶ Scanning ──match──▶ Connecting ──ok──▶ Linked
//!                    ▲  ▲                  │                │ both links up
//!          no match  │  └──────fail────────┘                ▼
//!          or radio  │                              SubscribingChannels
//!          loss      │                                      │
//!                    │                                      ▼
//!                    └────────── (any) ◀──── Streaming ◀── Handshaking
//! ```
//!
//! A transport loss returns `SubscribingChannels`, `Handshaking` or
//! `Streaming` to `Linked` with the peripheral kept. A radio loss, observed
//! through [`LinkState`], drops the peripheral handle without touching it and
//! schedules a rescan after the reconnect delay.

use core::mem;

use brainclaw_core::protocol::{encode_command, handshake_sequence, HALT, SUBSCRIPTION_ORDER};
use brainclaw_core::LinkState;

use crate::clock::Clock;
use crate::config::BridgeConfig;
use crate::radio::{Advertisement, RadioLink};

/// Orchestrator state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Not started, or shut down
    Idle,
    /// Looking for a headset once `not_before` has passed
    Scanning {
        /// Earliest time for the next scan
        not_before: u64,
    },
    /// Connecting to a matched headset on the next tick
    Connecting {
        /// Matched advertisement
        target: Advertisement,
    },
    /// Peripheral connected, waiting for both links before starting
    Linked {
        /// Earliest time a tick may start the stream
        retry_at: u64,
    },
    /// Enabling notifications, one channel per tick
    SubscribingChannels {
        /// Index into the subscription order
        next: usize,
        /// Channels successfully subscribed so far
        subscribed: usize,
    },
    /// Writing the start sequence
    Handshaking {
        /// Index of the next command
        step: usize,
        /// When the next command is due
        due: u64,
    },
    /// Headset is streaming
    Streaming,
}

impl OrchestratorState {
    /// Short name for logs
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning { .. } => "scanning",
            Self::Connecting { .. } => "connecting",
            Self::Linked { .. } => "linked",
            Self::SubscribingChannels { .. } => "subscribing",
            Self::Handshaking { .. } => "handshaking",
            Self::Streaming => "streaming",
        }
    }

    /// Check if a start sequence is in progress or complete
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::SubscribingChannels { .. } | Self::Handshaking { .. } | Self::Streaming
        )
    }
}

/// Drives the headset from discovery to streaming.
pub struct StreamOrchestrator<'a, R: RadioLink, C: Clock> {
    radio: R,
    clock: C,
    link: &'a LinkState,
    config: BridgeConfig,
    state: OrchestratorState,
    handle: Option<R::Handle>,
    paused: bool,
}

impl<'a, R: RadioLink, C: Clock> StreamOrchestrator<'a, R, C> {
    /// Create an idle orchestrator.
    pub fn new(radio: R, clock: C, link: &'a LinkState, config: BridgeConfig) -> Self {
        Self {
            radio,
            clock,
            link,
            config,
            state: OrchestratorState::Idle,
            handle: None,
            paused: false,
        }
    }

    /// Current state
    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    /// Configuration in use
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Radio collaborator
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Current time from the orchestrator's clock
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Begin scanning from `Idle`, or lift a previous [`stop`](Self::stop).
    pub fn start(&mut self) {
        self.paused = false;
        match self.state {
            OrchestratorState::Idle => {
                let now = self.clock.now_ms();
                self.set_state(OrchestratorState::Scanning { not_before: now });
            }
            OrchestratorState::Linked { .. } => {
                self.try_start();
            }
            _ => {}
        }
    }

    /// Advance the state machine by at most one step.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();

        if self.handle.is_some() && !self.link.radio_connected() {
            self.on_radio_lost(now);
            return;
        }

        match self.state {
            OrchestratorState::Idle | OrchestratorState::Streaming => {}
            OrchestratorState::Scanning { not_before } => {
                if now >= not_before {
                    self.scan();
                }
            }
            OrchestratorState::Connecting { .. } => self.connect(now),
            OrchestratorState::Linked { retry_at } => {
                if now >= retry_at {
                    self.try_start();
                }
            }
            OrchestratorState::SubscribingChannels { next, subscribed } => {
                self.subscribe_step(next, subscribed, now);
            }
            OrchestratorState::Handshaking { step, due } => {
                if now >= due {
                    self.handshake_step(step, now);
                }
            }
        }
    }

    /// The transport came up.
    pub fn on_transport_connected(&mut self) {
        if !self.try_start() {
            tracing::debug!("Transport up, stream not started (state: {})", self.state.label());
        }
    }

    /// The transport went down. Stops the stream but keeps the peripheral.
    pub fn on_transport_disconnected(&mut self) {
        self.link.set_streaming(false);

        if self.state.is_active() {
            tracing::info!("Transport lost, stopping stream");
            self.unsubscribe_all();
            let now = self.clock.now_ms();
            self.set_state(OrchestratorState::Linked { retry_at: now });
        }
    }

    /// Halt the stream and unsubscribe. The stream stays stopped until
    /// [`start`](Self::start) is called. Calling it again does nothing.
    pub fn stop(&mut self) {
        self.paused = true;
        if !self.state.is_active() {
            return;
        }

        tracing::info!("Stopping stream");
        if self.link.radio_connected() {
            if let Some(handle) = self.handle.as_ref() {
                match encode_command(HALT) {
                    Ok(frame) => {
                        if let Err(e) = self.radio.write_control(handle, &frame) {
                            tracing::warn!("Halt command failed: {}", e);
                        }
                    }
                    Err(e) => tracing::warn!("Cannot frame halt command: {}", e),
                }
            }
            self.unsubscribe_all();
        }

        self.link.set_streaming(false);
        let now = self.clock.now_ms();
        self.set_state(OrchestratorState::Linked { retry_at: now });
    }

    /// Stop the stream, disconnect the peripheral and return to `Idle`.
    pub fn shutdown(&mut self) {
        self.stop();

        if let Some(handle) = self.handle.take() {
            if self.link.radio_connected() {
                self.radio.disconnect(handle);
            }
        }
        self.link.on_radio_disconnected();
        self.set_state(OrchestratorState::Idle);
    }

    // ------------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------------

    fn scan(&mut self) {
        let duration = self.config.scan_duration_ms;
        tracing::info!("Scanning for Muse headsets ({} ms)...", duration);

        let found = match self.radio.scan(duration) {
            Ok(results) => {
                let filter = self.config.name_filter.as_str();
                results.into_iter().find(|adv| adv.is_muse(filter))
            }
            Err(e) => {
                tracing::warn!("Scan failed: {}", e);
                None
            }
        };

        // The scan may have blocked for its full duration
        let now = self.clock.now_ms();
        if let Some(target) = found {
            tracing::info!(
                "Found {} (rssi {:?})",
                target.name.as_ref().map_or("unnamed device", |n| n.as_str()),
                target.rssi
            );
            self.set_state(OrchestratorState::Connecting { target });
        } else {
            let delay = self.config.scan_retry_delay_ms;
            tracing::warn!("No Muse found, retrying in {} ms", delay);
            self.set_state(OrchestratorState::Scanning { not_before: now + delay });
        }
    }

    fn connect(&mut self, now: u64) {
        let target = match &self.state {
            OrchestratorState::Connecting { target } => target.clone(),
            _ => return,
        };

        // Marked up first so a disconnect reported mid-connect is not overwritten
        self.link.set_radio_connected();

        match self.radio.connect(&target, &self.config.connection) {
            Ok(_) if !self.link.radio_connected() => {
                tracing::warn!("Muse (token {}) dropped while connecting", target.token);
                self.on_radio_lost(now);
            }
            Ok(handle) => {
                tracing::info!("Connected to Muse (token {})", target.token);
                self.handle = Some(handle);
                self.set_state(OrchestratorState::Linked { retry_at: now });
                self.try_start();
            }
            Err(e) => {
                self.link.on_radio_disconnected();
                let delay = self.config.scan_retry_delay_ms;
                tracing::warn!("Connection failed: {}, rescanning in {} ms", e, delay);
                self.set_state(OrchestratorState::Scanning { not_before: now + delay });
            }
        }
    }

    /// Begin the start sequence if linked, unpaused, and both links are up.
    fn try_start(&mut self) -> bool {
        if self.paused
            || self.handle.is_none()
            || !matches!(self.state, OrchestratorState::Linked { .. })
            || !self.link.should_start()
        {
            return false;
        }

        tracing::info!("Both links up, starting stream");
        self.set_state(OrchestratorState::SubscribingChannels { next: 0, subscribed: 0 });
        true
    }

    fn subscribe_step(&mut self, next: usize, subscribed: usize, now: u64) {
        let Some(handle) = self.handle.as_ref() else {
            return;
        };

        let channel = SUBSCRIPTION_ORDER[next];
        let subscribed = match self.radio.subscribe(handle, channel) {
            Ok(()) => {
                tracing::debug!("Subscribed to {}", channel.label());
                subscribed + 1
            }
            Err(e) => {
                tracing::warn!("Subscribe to {} failed: {}", channel.label(), e);
                subscribed
            }
        };

        let next = next + 1;
        if next < SUBSCRIPTION_ORDER.len() {
            self.set_state(OrchestratorState::SubscribingChannels { next, subscribed });
        } else if subscribed == 0 {
            let delay = self.config.scan_retry_delay_ms;
            tracing::warn!("No channel subscribed, retrying in {} ms", delay);
            self.set_state(OrchestratorState::Linked { retry_at: now + delay });
        } else {
            self.set_state(OrchestratorState::Handshaking { step: 0, due: now });
        }
    }

    fn handshake_step(&mut self, step: usize, now: u64) {
        let Some(handle) = self.handle.as_ref() else {
            return;
        };

        let commands = handshake_sequence(self.config.preset.as_str());
        let command = commands[step];
        match encode_command(command) {
            Ok(frame) => match self.radio.write_control(handle, &frame) {
                Ok(()) => tracing::debug!("Sent command '{}'", command),
                Err(e) => tracing::warn!("Command '{}' failed: {}", command, e),
            },
            Err(e) => tracing::warn!("Skipping command '{}': {}", command, e),
        }

        let step = step + 1;
        if step < commands.len() {
            let due = now + self.config.command_interval_ms;
            self.set_state(OrchestratorState::Handshaking { step, due });
        } else {
            self.link.set_streaming(true);
            tracing::info!("Muse streaming started");
            self.set_state(OrchestratorState::Streaming);
        }
    }

    fn on_radio_lost(&mut self, now: u64) {
        // The handle is stale; drop it without further I/O
        self.handle = None;
        self.link.set_streaming(false);

        let delay = self.config.reconnect_delay_ms;
        tracing::warn!("Muse disconnected, rescanning in {} ms", delay);
        self.set_state(OrchestratorState::Scanning { not_before: now + delay });
    }

    fn unsubscribe_all(&mut self) {
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        if !self.link.radio_connected() {
            return;
        }

        for channel in SUBSCRIPTION_ORDER {
            if let Err(e) = self.radio.unsubscribe(handle, channel) {
                tracing::debug!("Unsubscribe from {} failed: {}", channel.label(), e);
            }
        }
    }

    fn set_state(&mut self, state: OrchestratorState) {
        if mem::discriminant(&self.state) != mem::discriminant(&state) {
            tracing::debug!("Orchestrator: {} -> {}", self.state.label(), state.label());
        }
        self.state = state;
    }
}

// ============================================================================
// Tests
// ============================================================================
