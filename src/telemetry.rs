//! Telemetry vocabulary shared by the samplers and the BLE side.
//!
//! Every notification goes out as ASCII: the range channels carry a plain base-10 integer
//! (`"132"`), the orientation channel carries `rateX,rateY,rateZ` with two decimals each
//! (`"12.50,-4.10,0.05"`).

use core::fmt::Write;

use heapless::String;

use crate::config::{PAYLOAD_MAX, SERVICE_UUID};
use crate::drivers::gyro::AngularRate;

pub type Payload = String<PAYLOAD_MAX>;

/// Stable identity of a notification channel (one BLE characteristic each).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelKey {
    Front,
    Left,
    Right,
    Orientation,
}

impl ChannelKey {
    pub const ALL: [ChannelKey; 4] = [
        ChannelKey::Front,
        ChannelKey::Left,
        ChannelKey::Right,
        ChannelKey::Orientation,
    ];

    pub const fn index(self) -> usize {
        match self {
            ChannelKey::Front => 0,
            ChannelKey::Left => 1,
            ChannelKey::Right => 2,
            ChannelKey::Orientation => 3,
        }
    }
}

/// Service UUID in advertising byte order.
pub const SERVICE_UUID_LE: [u8; 16] = uuid128_le(SERVICE_UUID);

/// Little-endian bytes of a dashed 128-bit UUID string. Bad input fails const evaluation.
pub const fn uuid128_le(uuid: &str) -> [u8; 16] {
    let text = uuid.as_bytes();
    assert!(text.len() == 36, "UUID must be 36 characters");

    let mut out = [0u8; 16];
    let mut i = 0;
    let mut n = 0;
    while n < 16 {
        if text[i] == b'-' {
            i += 1;
            continue;
        }
        out[15 - n] = (hex_nibble(text[i]) << 4) | hex_nibble(text[i + 1]);
        n += 1;
        i += 2;
    }
    out
}

const fn hex_nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => panic!("non-hex digit in UUID"),
    }
}

/// One of the three ultrasonic sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorId {
    Front,
    Left,
    Right,
}

impl SensorId {
    /// Measurement order within one range cycle.
    pub const CYCLE: [SensorId; 3] = [SensorId::Front, SensorId::Left, SensorId::Right];

    pub const fn channel(self) -> ChannelKey {
        match self {
            SensorId::Front => ChannelKey::Front,
            SensorId::Left => ChannelKey::Left,
            SensorId::Right => ChannelKey::Right,
        }
    }

    pub const fn index(self) -> usize {
        self.channel().index()
    }
}

/// "Set the characteristic value and notify subscribers".
///
/// Fire-and-forget: implementations must never block the caller and may drop the value when
/// nobody can take it.
pub trait NotificationChannel {
    fn publish(&self, key: ChannelKey, payload: &[u8]);
}

impl<T: NotificationChannel + ?Sized> NotificationChannel for &T {
    fn publish(&self, key: ChannelKey, payload: &[u8]) {
        (**self).publish(key, payload)
    }
}

/// Line-oriented text output for an external plotter.
pub trait DebugSink {
    fn write_line(&mut self, line: &str);
}

impl<T: DebugSink + ?Sized> DebugSink for &mut T {
    fn write_line(&mut self, line: &str) {
        (**self).write_line(line)
    }
}

pub fn format_distance(distance: u16) -> Payload {
    let mut out = Payload::new();
    // u16 fits in 5 digits
    let _ = write!(out, "{}", distance);
    out
}

pub fn format_rates(rate: &AngularRate) -> Payload {
    let mut out = Payload::new();
    // Raw counts bound each field to "-250.14", so three fit in PAYLOAD_MAX.
    let _ = write!(out, "{:.2},{:.2},{:.2}", rate.x, rate.y, rate.z);
    out
}

/// Serial-plotter line: `>GiroX:1.00,GiroY:-0.76,GiroZ:0.04`.
pub fn format_plot_line(rate: &AngularRate) -> String<64> {
    let mut out = String::new();
    let _ = write!(
        out,
        ">GiroX:{:.2},GiroY:{:.2},GiroZ:{:.2}",
        rate.x, rate.y, rate.z
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_plain_decimal() {
        assert_eq!(format_distance(132).as_str(), "132");
        assert_eq!(format_distance(0).as_str(), "0");
        assert_eq!(format_distance(400).as_str(), "400");
    }

    #[test]
    fn rates_use_two_decimals() {
        let rate = AngularRate {
            x: 12.5,
            y: -4.1,
            z: 0.05,
        };
        let text = format_rates(&rate);
        assert_eq!(text.as_str(), "12.50,-4.10,0.05");
    }

    #[test]
    fn extreme_rates_fit_payload() {
        let rate = AngularRate::from_raw(i16::MIN, i16::MIN, i16::MIN);
        let text = format_rates(&rate);
        assert_eq!(text.as_str(), "-250.14,-250.14,-250.14");
    }

    #[test]
    fn plot_line_is_tagged_csv() {
        let rate = AngularRate::from_raw(131, -100, 5);
        let line = format_plot_line(&rate);
        assert_eq!(line.as_str(), ">GiroX:1.00,GiroY:-0.76,GiroZ:0.04");
    }

    #[test]
    fn service_uuid_is_reversed_for_advertising() {
        assert_eq!(
            SERVICE_UUID_LE,
            [
                0x4b, 0x91, 0x31, 0xc3, 0xc9, 0xc5, 0xcc, 0x8f, 0x9e, 0x45, 0xb5, 0x1f, 0x01, 0xc2,
                0xaf, 0x4f,
            ]
        );
        assert_eq!(uuid128_le("00000000-0000-0000-0000-0000000000FF")[0], 0xff);
    }

    #[test]
    fn sensor_channels_follow_cycle_order() {
        let keys: Vec<ChannelKey> = SensorId::CYCLE.iter().map(|s| s.channel()).collect();
        assert_eq!(keys, [ChannelKey::Front, ChannelKey::Left, ChannelKey::Right]);
        for (i, key) in ChannelKey::ALL.iter().enumerate() {
            assert_eq!(key.index(), i);
        }
    }
}
