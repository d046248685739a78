//! Muse headset access through btleplug
//!
//! btleplug is async; the orchestrator is not. [`BtleplugRadio`] is used from
//! the dedicated scheduling thread and runs each operation to completion with
//! [`Handle::block_on`]. Notifications and disconnect events are handled by
//! tasks spawned on the runtime, which feed the [`NotificationHandler`] and
//! [`LinkState`] directly.
//!
//! # Characteristics
//!
//! Muse service `0000fe8d-0000-1000-8000-00805f9b34fb`:
//! - `273e0001-...` - Control (write without response)
//! - `273e0003-...` to `273e0006-...` - EEG TP9, AF7, AF8, TP10 (notify)
//! - `273e0009-...` - Gyroscope (notify)
//! - `273e000a-...` - Accelerometer (notify)
//! - `273e000b-...` - Telemetry (notify)

use std::collections::HashMap;
use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use brainclaw_core::protocol::CONTROL_CHAR_UUID;
use brainclaw_core::{DataChannel, LinkState};
use brainclaw_embedded::radio::{MAX_ADVERTISED_SERVICES, MAX_SCAN_RESULTS};
use brainclaw_embedded::{Advertisement, ConnectionParams, NotificationHandler, RadioLink, ScanResults};

use crate::config::BleConfig;
use crate::error::{NativeError, NativeResult};

/// Connected Muse headset.
///
/// Dropping the handle stops its notification and disconnect-watch tasks.
pub struct MuseHandle {
    peripheral: Peripheral,
    characteristics: HashMap<Uuid, Characteristic>,
    tasks: Vec<JoinHandle<()>>,
}

impl MuseHandle {
    fn characteristic(&self, uuid: u128) -> NativeResult<&Characteristic> {
        let uuid = Uuid::from_u128(uuid);
        self.characteristics
            .get(&uuid)
            .ok_or(NativeError::MissingCharacteristic(uuid))
    }
}

impl Drop for MuseHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// [`RadioLink`] over the host Bluetooth adapter.
pub struct BtleplugRadio {
    runtime: Handle,
    adapter: Adapter,
    config: BleConfig,
    handler: NotificationHandler<'static>,
    link: &'static LinkState,
    /// Peripherals from the last scan, indexed by advertisement token
    scanned: Vec<Peripheral>,
}

impl BtleplugRadio {
    /// Open the configured Bluetooth adapter.
    ///
    /// Must be called outside the runtime's worker threads.
    ///
    /// # Errors
    ///
    /// Returns error if Bluetooth is not available
    pub fn new(
        runtime: Handle,
        config: BleConfig,
        handler: NotificationHandler<'static>,
        link: &'static LinkState,
    ) -> NativeResult<Self> {
        let adapter = runtime.block_on(async {
            let manager = Manager::new().await?;
            let adapters = manager.adapters().await?;
            adapters
                .into_iter()
                .nth(config.adapter_index)
                .ok_or(NativeError::NoAdapter)
        })?;

        Ok(Self { runtime, adapter, config, handler, link, scanned: Vec::new() })
    }

    async fn scan_async(&self, duration: Duration) -> NativeResult<Vec<(Peripheral, Advertisement)>> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(duration).await;
        self.adapter.stop_scan().await?;

        let mut found = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            if let Some(properties) = peripheral.properties().await? {
                let services: Vec<u128> = properties.services.iter().map(Uuid::as_u128).collect();
                let advertisement =
                    advertisement(0, properties.local_name.as_deref(), &services, properties.rssi);
                found.push((peripheral, advertisement));
            }
        }

        // Strongest signal first
        found.sort_by_key(|(_, adv)| std::cmp::Reverse(adv.rssi.unwrap_or(i16::MIN)));
        found.truncate(MAX_SCAN_RESULTS);
        Ok(found)
    }

    async fn connect_async(peripheral: &Peripheral) -> NativeResult<HashMap<Uuid, Characteristic>> {
        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        peripheral.discover_services().await?;

        let characteristics: HashMap<Uuid, Characteristic> = peripheral
            .characteristics()
            .into_iter()
            .map(|c| (c.uuid, c))
            .collect();

        let control = Uuid::from_u128(CONTROL_CHAR_UUID);
        if !characteristics.contains_key(&control) {
            if let Err(e) = peripheral.disconnect().await {
                tracing::debug!("Disconnect after incomplete discovery failed: {}", e);
            }
            return Err(NativeError::MissingCharacteristic(control));
        }

        Ok(characteristics)
    }

    /// Forward every notification to the handler.
    async fn spawn_notification_task(&self, peripheral: &Peripheral) -> NativeResult<JoinHandle<()>> {
        let mut stream = peripheral.notifications().await?;
        let handler = self.handler;
        let link = self.link;

        Ok(self.runtime.spawn(async move {
            while let Some(notification) = stream.next().await {
                handler.on_notification(notification.uuid.as_u128(), &notification.value);
            }

            // Stream ended, device disconnected
            tracing::debug!("Notification stream ended");
            link.on_radio_disconnected();
        }))
    }

    /// Report the peripheral's disconnect into the link state.
    ///
    /// `events` must be subscribed before the connect starts so a drop during
    /// service discovery is still delivered.
    fn spawn_disconnect_watch<S>(&self, mut events: S, id: PeripheralId) -> JoinHandle<()>
    where
        S: Stream<Item = CentralEvent> + Send + Unpin + 'static,
    {
        let link = self.link;

        self.runtime.spawn(async move {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(disconnected) = event {
                    if disconnected == id {
                        tracing::info!("Disconnected from {:?}", id);
                        link.on_radio_disconnected();
                        break;
                    }
                }
            }
        })
    }
}

impl RadioLink for BtleplugRadio {
    type Handle = MuseHandle;
    type Error = NativeError;

    fn scan(&mut self, duration_ms: u64) -> NativeResult<ScanResults> {
        tracing::info!("Starting BLE scan for Muse headsets...");
        let found = self.runtime.block_on(self.scan_async(Duration::from_millis(duration_ms)))?;

        self.scanned.clear();
        let mut results = ScanResults::new();
        for (token, (peripheral, mut adv)) in (0u32..).zip(found) {
            adv.token = token;
            self.scanned.push(peripheral);
            // Capacity matches the truncation above
            let _ = results.push(adv);
        }

        tracing::info!("Scan complete: {} devices", results.len());
        Ok(results)
    }

    fn connect(&mut self, target: &Advertisement, params: &ConnectionParams) -> NativeResult<MuseHandle> {
        let peripheral = usize::try_from(target.token)
            .ok()
            .and_then(|i| self.scanned.get(i))
            .cloned()
            .ok_or(NativeError::DeviceNotFound(target.token))?;

        // btleplug leaves interval and MTU negotiation to the OS
        tracing::debug!(
            "Requested interval {}-{}, latency {}, timeout {}, MTU {}",
            params.min_interval,
            params.max_interval,
            params.latency,
            params.supervision_timeout,
            params.mtu
        );

        tracing::info!("Connecting to BLE device: {}", peripheral.address());
        let events = self.runtime.block_on(self.adapter.events())?;

        let timeout = self.config.connect_timeout;
        let connected = self.runtime.block_on(async {
            tokio::time::timeout(timeout, Self::connect_async(&peripheral)).await
        });

        let characteristics = match connected {
            Ok(result) => result?,
            Err(_) => {
                if let Err(e) = self.runtime.block_on(peripheral.disconnect()) {
                    tracing::debug!("Disconnect after timeout failed: {}", e);
                }
                return Err(NativeError::ConnectTimeout(
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ));
            }
        };

        let watcher = self.spawn_disconnect_watch(events, peripheral.id());
        let notifications = match self.runtime.block_on(self.spawn_notification_task(&peripheral)) {
            Ok(task) => task,
            Err(e) => {
                watcher.abort();
                return Err(e);
            }
        };
        let handle = MuseHandle { peripheral, characteristics, tasks: vec![watcher, notifications] };

        // A drop before the watcher started may have gone unreported
        if !self.runtime.block_on(handle.peripheral.is_connected())? {
            tracing::warn!("Peripheral dropped during connection setup");
            self.link.on_radio_disconnected();
        }

        Ok(handle)
    }

    fn subscribe(&mut self, handle: &MuseHandle, channel: DataChannel) -> NativeResult<()> {
        let characteristic = handle.characteristic(channel.uuid())?;
        self.runtime.block_on(handle.peripheral.subscribe(characteristic))?;
        Ok(())
    }

    fn unsubscribe(&mut self, handle: &MuseHandle, channel: DataChannel) -> NativeResult<()> {
        let characteristic = handle.characteristic(channel.uuid())?;
        self.runtime.block_on(handle.peripheral.unsubscribe(characteristic))?;
        Ok(())
    }

    fn write_control(&mut self, handle: &MuseHandle, frame: &[u8]) -> NativeResult<()> {
        let characteristic = handle.characteristic(CONTROL_CHAR_UUID)?;
        self.runtime
            .block_on(handle.peripheral.write(characteristic, frame, WriteType::WithoutResponse))?;
        Ok(())
    }

    fn disconnect(&mut self, handle: MuseHandle) {
        if let Err(e) = self.runtime.block_on(handle.peripheral.disconnect()) {
            tracing::warn!("Disconnect failed: {}", e);
        }
    }
}

/// Build an [`Advertisement`] from host scan data, truncating to the
/// fixed capacities.
pub fn advertisement(token: u32, name: Option<&str>, services: &[u128], rssi: Option<i16>) -> Advertisement {
    let name = name.map(|name| {
        let mut bounded = heapless::String::new();
        for c in name.chars() {
            if bounded.push(c).is_err() {
                break;
            }
        }
        bounded
    });

    let mut bounded_services = heapless::Vec::new();
    for uuid in services.iter().take(MAX_ADVERTISED_SERVICES) {
        let _ = bounded_services.push(*uuid);
    }

    Advertisement { token, name, services: bounded_services, rssi }
}
