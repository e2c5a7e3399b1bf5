//! Dashboard view: owns the simulated device for one mount.
//!
//! Mounting creates a fresh [`DeviceState`] and schedules the simulated
//! Bluetooth connect. Unmounting (or dropping) cancels that task, so nothing
//! writes to the state after teardown.

use std::sync::Arc;
use std::time::Duration;

use pillow_ease_core::{DeviceState, HeatLevel, MassageMode, Recommendation};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// A mounted dashboard.
pub struct DashboardView {
    device: Arc<Mutex<DeviceState>>,
    connect: CancellationToken,
    /// One-shot message shown on the next render.
    flash: std::sync::Mutex<Option<String>>,
}

impl DashboardView {
    /// Mount with default device state; the device connects after `connect_delay`.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn mount(connect_delay: Duration) -> Self {
        let device = Arc::new(Mutex::new(DeviceState::default()));
        let connect = CancellationToken::new();

        tokio::spawn(simulate_connect(
            Arc::downgrade(&device),
            connect.clone(),
            connect_delay,
        ));
        tracing::debug!(?connect_delay, "Dashboard mounted");

        Self {
            device,
            connect,
            flash: std::sync::Mutex::new(None),
        }
    }

    /// Tear down; the pending connect, if any, never fires.
    pub fn unmount(&self) {
        if !self.connect.is_cancelled() {
            self.connect.cancel();
            tracing::debug!("Dashboard unmounted");
        }
    }

    pub async fn snapshot(&self) -> DeviceState {
        self.device.lock().await.clone()
    }

    pub async fn toggle_power(&self) -> DeviceState {
        let mut device = self.device.lock().await;
        device.toggle_power();
        device.clone()
    }

    /// Ignored while the device is off.
    pub async fn set_heat(&self, heat: HeatLevel) -> DeviceState {
        self.when_on(|device| device.set_heat(heat)).await
    }

    /// Ignored while the device is off.
    pub async fn set_intensity(&self, intensity: u8) -> DeviceState {
        self.when_on(|device| device.set_intensity(intensity)).await
    }

    /// Ignored while the device is off, and for modes not on the manual picker.
    pub async fn set_mode(&self, mode: MassageMode) -> DeviceState {
        if !MassageMode::MANUAL.contains(&mode) {
            tracing::debug!(mode = mode.as_str(), "Mode not manually selectable");
            return self.snapshot().await;
        }
        self.when_on(|device| device.set_mode(mode)).await
    }

    /// Apply a recommendation and switch the device on.
    pub async fn apply_recommendation(&self, recommendation: &Recommendation) -> DeviceState {
        let mut device = self.device.lock().await;
        device.apply_recommendation(recommendation);
        device.clone()
    }

    async fn when_on(&self, update: impl FnOnce(&mut DeviceState)) -> DeviceState {
        let mut device = self.device.lock().await;
        if device.is_on {
            update(&mut *device);
        }
        device.clone()
    }

    pub fn set_flash(&self, message: String) {
        if let Ok(mut flash) = self.flash.lock() {
            *flash = Some(message);
        }
    }

    #[must_use]
    pub fn take_flash(&self) -> Option<String> {
        self.flash.lock().ok().and_then(|mut flash| flash.take())
    }
}

impl Drop for DashboardView {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn simulate_connect(
    device: std::sync::Weak<Mutex<DeviceState>>,
    cancel: CancellationToken,
    delay: Duration,
) {
    tokio::select! {
        () = cancel.cancelled() => {}
        () = tokio::time::sleep(delay) => {
            let Some(device) = device.upgrade() else {
                return;
            };
            let mut device = device.lock().await;
            if !cancel.is_cancelled() && device.mark_connected() {
                tracing::info!("Device connected");
            }
        }
    }
}
