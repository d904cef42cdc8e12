// src/sensor/mod.rs

// One module per supported sensor. Each owns its framer and decoder; the
// PM2005 additionally owns its measurement sequencer.

pub mod five_in_one;
pub mod jx_co2_102;
pub mod pm2005;

use log::{info, warn};

use crate::common::{
    error::SensorError,
    frame::SerialSettings,
    hal_traits::{SensorSerial, SensorTimer},
    reading::{Channel, ReadingSink, Subscriptions},
};

pub use five_in_one::FiveInOne;
pub use jx_co2_102::JxCo2102;
pub use pm2005::{Pm2005, SequencerTimings};

/// The supported sensor models.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SensorKind {
    /// Five-in-one module: VOC, formaldehyde, eCO2, temperature, humidity.
    FiveInOne,
    /// PM2005 laser particle sensor.
    Pm2005,
    /// JX-CO2-102 infrared CO2 sensor.
    JxCo2102,
}

impl SensorKind {
    pub fn name(&self) -> &'static str {
        match self {
            SensorKind::FiveInOne => "five-in-one",
            SensorKind::Pm2005 => "pm2005",
            SensorKind::JxCo2102 => "jx-co2-102",
        }
    }

    /// Channels this model reports.
    pub fn channels(&self) -> &'static [Channel] {
        match self {
            SensorKind::FiveInOne => &[
                Channel::Voc,
                Channel::Formaldehyde,
                Channel::Eco2,
                Channel::Temperature,
                Channel::Humidity,
            ],
            SensorKind::Pm2005 => &[
                Channel::Particles0p5,
                Channel::Particles2p5,
                Channel::Particles10,
                Channel::Pm2p5Mass,
                Channel::Pm10Mass,
            ],
            SensorKind::JxCo2102 => &[Channel::Co2],
        }
    }

    /// Line settings the transport must be opened with.
    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings::SENSOR_UART
    }
}

/// Everything needed to build a driver.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SensorConfig {
    pub kind: SensorKind,
    pub subscriptions: Subscriptions,
    /// Only used by the PM2005.
    pub timings: SequencerTimings,
}

impl SensorConfig {
    /// Subscribes to every channel the model reports, with default timings.
    pub fn new(kind: SensorKind) -> Self {
        SensorConfig {
            kind,
            subscriptions: Subscriptions::from_channels(kind.channels()),
            timings: SequencerTimings::default(),
        }
    }

    #[must_use]
    pub fn with_subscriptions(mut self, subscriptions: Subscriptions) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    #[must_use]
    pub fn with_timings(mut self, timings: SequencerTimings) -> Self {
        self.timings = timings;
        self
    }
}

/// A driver for one sensor on one serial port, chosen at construction.
#[derive(Debug)]
pub enum SensorDriver {
    FiveInOne(FiveInOne),
    Pm2005(Pm2005),
    JxCo2102(JxCo2102),
}

impl SensorDriver {
    /// Builds a driver with default timings. `now_ms` anchors the PM2005's
    /// first measurement cycle.
    pub fn new(kind: SensorKind, now_ms: u32, subscriptions: Subscriptions) -> Self {
        Self::from_config(SensorConfig::new(kind).with_subscriptions(subscriptions), now_ms)
    }

    pub fn from_config(config: SensorConfig, now_ms: u32) -> Self {
        match config.kind {
            SensorKind::FiveInOne => SensorDriver::FiveInOne(FiveInOne::new(config.subscriptions)),
            SensorKind::Pm2005 => {
                SensorDriver::Pm2005(Pm2005::new(now_ms, config.subscriptions, config.timings))
            }
            SensorKind::JxCo2102 => SensorDriver::JxCo2102(JxCo2102::new(config.subscriptions)),
        }
    }

    pub fn kind(&self) -> SensorKind {
        match self {
            SensorDriver::FiveInOne(_) => SensorKind::FiveInOne,
            SensorDriver::Pm2005(_) => SensorKind::Pm2005,
            SensorDriver::JxCo2102(_) => SensorKind::JxCo2102,
        }
    }

    pub fn subscriptions(&self) -> Subscriptions {
        match self {
            SensorDriver::FiveInOne(d) => d.subscriptions(),
            SensorDriver::Pm2005(d) => d.subscriptions(),
            SensorDriver::JxCo2102(d) => d.subscriptions(),
        }
    }

    /// One non-blocking step, meant to be called from the host's main loop.
    ///
    /// Consumes every byte already available, publishes decoded readings to
    /// `sink`, and for the PM2005 sends at most one scheduled command. Frame
    /// errors are logged and absorbed; only transport failures are returned.
    pub fn service<IF, S>(&mut self, iface: &mut IF, sink: &mut S) -> Result<(), SensorError<IF::Error>>
    where
        IF: SensorSerial + SensorTimer,
        S: ReadingSink,
    {
        match self {
            SensorDriver::FiveInOne(d) => d.service(iface, sink),
            SensorDriver::Pm2005(d) => d.service(iface, sink),
            SensorDriver::JxCo2102(d) => d.service(iface, sink),
        }
    }

    /// Drops any partially received frame.
    pub fn reset(&mut self) {
        match self {
            SensorDriver::FiveInOne(d) => d.reset(),
            SensorDriver::Pm2005(d) => d.reset(),
            SensorDriver::JxCo2102(d) => d.reset(),
        }
    }

    /// Whether the driver is in a warning state (a failed calibration).
    pub fn has_warning(&self) -> bool {
        match self {
            SensorDriver::JxCo2102(d) => d.has_warning(),
            _ => false,
        }
    }

    /// The CO2 driver, for calibration.
    pub fn as_jx_co2_102_mut(&mut self) -> Option<&mut JxCo2102> {
        match self {
            SensorDriver::JxCo2102(d) => Some(d),
            _ => None,
        }
    }

    /// Logs the effective configuration.
    pub fn dump_config(&self) {
        let kind = self.kind();
        let subscriptions = self.subscriptions();
        let uart = kind.serial_settings();

        info!("{}:", kind.name());
        for channel in kind.channels() {
            info!(
                "  {} [{}]: {}",
                channel.name(),
                channel.unit(),
                if subscriptions.contains(*channel) { "subscribed" } else { "no subscriber" }
            );
        }
        for channel in subscriptions.iter() {
            if !kind.channels().contains(&channel) {
                warn!("  {} is subscribed but never reported by {}", channel.name(), kind.name());
            }
        }
        info!("  UART: {} baud, {:?}", uart.baud_rate, uart.format);

        if let SensorDriver::Pm2005(d) = self {
            let t = d.timings();
            info!(
                "  Cycle: every {} ms, ack timeout {} ms, warm-up {} ms, read gap {} ms",
                t.measurement_interval.as_millis(),
                t.open_ack_timeout.as_millis(),
                t.warmup.as_millis(),
                t.read_gap.as_millis()
            );
        }
    }
}

/// Logs a frame-level failure that the drivers recover from on their own.
pub(crate) fn report_absorbed(source: &str, err: &SensorError) {
    warn!("{}: discarding frame ({:?}): {}", source, err.kind(), err);
}
