// src/common/reading.rs

use core::fmt;

/// Every named metric a supported sensor can report.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Channel {
    Voc = 0,
    Formaldehyde = 1,
    Eco2 = 2,
    Temperature = 3,
    Humidity = 4,
    Particles0p5 = 5,
    Particles2p5 = 6,
    Particles10 = 7,
    Pm2p5Mass = 8,
    Pm10Mass = 9,
    Co2 = 10,
}

impl Channel {
    pub const ALL: [Channel; 11] = [
        Channel::Voc,
        Channel::Formaldehyde,
        Channel::Eco2,
        Channel::Temperature,
        Channel::Humidity,
        Channel::Particles0p5,
        Channel::Particles2p5,
        Channel::Particles10,
        Channel::Pm2p5Mass,
        Channel::Pm10Mass,
        Channel::Co2,
    ];

    /// Unit the channel's value is expressed in.
    pub fn unit(&self) -> &'static str {
        match self {
            Channel::Voc | Channel::Formaldehyde | Channel::Pm2p5Mass | Channel::Pm10Mass => "µg/m³",
            Channel::Eco2 | Channel::Co2 => "ppm",
            Channel::Temperature => "°C",
            Channel::Humidity => "%RH",
            Channel::Particles0p5 | Channel::Particles2p5 | Channel::Particles10 => "pcs/L",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Voc => "VOC",
            Channel::Formaldehyde => "Formaldehyde",
            Channel::Eco2 => "eCO2",
            Channel::Temperature => "Temperature",
            Channel::Humidity => "Humidity",
            Channel::Particles0p5 => "PM0.5",
            Channel::Particles2p5 => "PM2.5",
            Channel::Particles10 => "PM10",
            Channel::Pm2p5Mass => "PM2.5 Mass",
            Channel::Pm10Mass => "PM10 Mass",
            Channel::Co2 => "CO2",
        }
    }
}

/// A decoded measurement, tagged with the metric it belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Reading {
    /// Total volatile organic compounds, µg/m³.
    Voc(u16),
    /// Formaldehyde, µg/m³.
    Formaldehyde(u16),
    /// Equivalent CO2, ppm.
    Eco2(u16),
    /// Temperature in tenths of a degree Celsius.
    Temperature { deci_celsius: i32 },
    /// Relative humidity in tenths of a percent.
    Humidity { deci_percent: u16 },
    /// Particles ≥ 0.5 µm per litre.
    Particles0p5(u32),
    /// Particles ≥ 2.5 µm per litre.
    Particles2p5(u32),
    /// Particles ≥ 10 µm per litre.
    Particles10(u32),
    /// PM2.5 mass concentration, µg/m³.
    Pm2p5Mass(u32),
    /// PM10 mass concentration, µg/m³.
    Pm10Mass(u32),
    /// CO2, ppm.
    Co2(u16),
}

impl Reading {
    pub fn channel(&self) -> Channel {
        match self {
            Reading::Voc(_) => Channel::Voc,
            Reading::Formaldehyde(_) => Channel::Formaldehyde,
            Reading::Eco2(_) => Channel::Eco2,
            Reading::Temperature { .. } => Channel::Temperature,
            Reading::Humidity { .. } => Channel::Humidity,
            Reading::Particles0p5(_) => Channel::Particles0p5,
            Reading::Particles2p5(_) => Channel::Particles2p5,
            Reading::Particles10(_) => Channel::Particles10,
            Reading::Pm2p5Mass(_) => Channel::Pm2p5Mass,
            Reading::Pm10Mass(_) => Channel::Pm10Mass,
            Reading::Co2(_) => Channel::Co2,
        }
    }

    /// The value in the channel's unit, as published to a sink.
    pub fn value(&self) -> f32 {
        match *self {
            Reading::Voc(v) | Reading::Formaldehyde(v) | Reading::Eco2(v) | Reading::Co2(v) => {
                f32::from(v)
            }
            Reading::Temperature { deci_celsius } => deci_celsius as f32 * 0.1,
            Reading::Humidity { deci_percent } => f32::from(deci_percent) * 0.1,
            Reading::Particles0p5(v)
            | Reading::Particles2p5(v)
            | Reading::Particles10(v)
            | Reading::Pm2p5Mass(v)
            | Reading::Pm10Mass(v) => v as f32,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel = self.channel();
        match self {
            Reading::Temperature { .. } | Reading::Humidity { .. } => {
                write!(f, "{}: {:.1} {}", channel.name(), self.value(), channel.unit())
            }
            _ => write!(f, "{}: {} {}", channel.name(), self.value(), channel.unit()),
        }
    }
}

/// The set of channels that have a subscriber.
///
/// A channel that is absent is a first-class "nobody is listening" state:
/// its readings are decoded but never published.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct Subscriptions(u16);

impl Subscriptions {
    pub const fn none() -> Self {
        Subscriptions(0)
    }

    pub const fn all() -> Self {
        Subscriptions((1 << Channel::ALL.len()) - 1)
    }

    pub fn from_channels(channels: &[Channel]) -> Self {
        channels.iter().fold(Self::none(), |s, c| s.with(*c))
    }

    #[must_use]
    pub const fn with(self, channel: Channel) -> Self {
        Subscriptions(self.0 | (1 << channel as u8))
    }

    #[must_use]
    pub const fn without(self, channel: Channel) -> Self {
        Subscriptions(self.0 & !(1 << channel as u8))
    }

    #[inline]
    pub const fn contains(&self, channel: Channel) -> bool {
        self.0 & (1 << channel as u8) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

/// Most readings a single frame decodes to (the five-in-one frame).
pub const MAX_READINGS_PER_FRAME: usize = 5;

/// The readings decoded from one validated frame.
pub type Readings = heapless::Vec<Reading, MAX_READINGS_PER_FRAME>;

/// Downstream consumer of decoded readings.
pub trait ReadingSink {
    fn publish(&mut self, reading: Reading);
}

impl<F: FnMut(Reading)> ReadingSink for F {
    fn publish(&mut self, reading: Reading) {
        self(reading)
    }
}

/// Collects readings; once full, later readings are dropped.
impl<const N: usize> ReadingSink for heapless::Vec<Reading, N> {
    fn publish(&mut self, reading: Reading) {
        let _ = self.push(reading);
    }
}

/// Publishes every reading whose channel is subscribed; each one independently.
pub fn publish_subscribed<S: ReadingSink>(
    subscriptions: Subscriptions,
    readings: &[Reading],
    sink: &mut S,
) {
    for reading in readings {
        if subscriptions.contains(reading.channel()) {
            sink.publish(*reading);
        }
    }
}
