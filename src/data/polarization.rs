//! Polarisation channels and scan-row filtering.
//!
//! A channel code has one symbol per spin-manipulating device: `p` (plus),
//! `m` (minus) or `o` (device absent, matches anything). `Unpolarized` is
//! used when no such device is scanned and matches every row.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Polarisation channel of the beam.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarization {
    Unpolarized,
    Po,
    Mo,
    Op,
    Om,
    Mm,
    Mp,
    Pm,
    Pp,
}

/// State one device must be in for a row to belong to a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpinState {
    Plus,
    Minus,
    Any,
}

/// Device readings that identify each spin state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipperStates {
    pub plus: String,
    pub minus: String,
}

impl Default for FlipperStates {
    fn default() -> Self {
        Self {
            plus: "off".to_string(),
            minus: "on".to_string(),
        }
    }
}

impl FlipperStates {
    fn reading(&self, state: SpinState) -> Option<&str> {
        match state {
            SpinState::Plus => Some(&self.plus),
            SpinState::Minus => Some(&self.minus),
            SpinState::Any => None,
        }
    }
}

impl Polarization {
    const CODED: [Polarization; 8] = [
        Polarization::Po,
        Polarization::Mo,
        Polarization::Op,
        Polarization::Om,
        Polarization::Mm,
        Polarization::Mp,
        Polarization::Pm,
        Polarization::Pp,
    ];

    /// Channel code as used in exchange headers.
    pub fn code(&self) -> &'static str {
        match self {
            Polarization::Unpolarized => "unpolarized",
            Polarization::Po => "po",
            Polarization::Mo => "mo",
            Polarization::Op => "op",
            Polarization::Om => "om",
            Polarization::Mm => "mm",
            Polarization::Mp => "mp",
            Polarization::Pm => "pm",
            Polarization::Pp => "pp",
        }
    }

    /// Per-device spin states; `None` for `Unpolarized`.
    pub fn states(&self) -> Option<[SpinState; 2]> {
        use SpinState::*;
        let states = match self {
            Polarization::Unpolarized => return None,
            Polarization::Po => [Plus, Any],
            Polarization::Mo => [Minus, Any],
            Polarization::Op => [Any, Plus],
            Polarization::Om => [Any, Minus],
            Polarization::Mm => [Minus, Minus],
            Polarization::Mp => [Minus, Plus],
            Polarization::Pm => [Plus, Minus],
            Polarization::Pp => [Plus, Plus],
        };
        Some(states)
    }

    fn from_states(states: [SpinState; 2]) -> Option<Self> {
        Self::CODED
            .iter()
            .copied()
            .find(|p| p.states() == Some(states))
    }

    /// Check whether a scan row belongs to this channel.
    ///
    /// `row` holds the readings of the devices that are present, in device
    /// order. Every non-`o` symbol is matched against the next reading.
    pub fn matches(&self, row: &[&str], flippers: &FlipperStates) -> bool {
        let Some(states) = self.states() else {
            return true;
        };

        let expected: Vec<&str> = states
            .iter()
            .filter_map(|s| flippers.reading(*s))
            .collect();

        expected.len() == row.len() && expected.iter().zip(row).all(|(e, r)| e == r)
    }
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Derive the channels present from the list of scanned devices.
///
/// Each configured polarisation device that is scanned contributes
/// `(m, p)`, an absent one contributes `(o, o)`. The product without the
/// all-absent code gives the channels; none at all gives `Unpolarized`.
pub fn channels_for(scan_devices: &[String], polarisation_devices: &[String; 2]) -> Vec<Polarization> {
    let options: Vec<[SpinState; 2]> = polarisation_devices
        .iter()
        .map(|dev| {
            if scan_devices.iter().any(|d| d == dev) {
                [SpinState::Minus, SpinState::Plus]
            } else {
                [SpinState::Any, SpinState::Any]
            }
        })
        .collect();

    let mut channels = Vec::new();
    for first in options[0] {
        for second in options[1] {
            if let Some(p) = Polarization::from_states([first, second]) {
                if !channels.contains(&p) {
                    channels.push(p);
                }
            }
        }
    }

    if channels.is_empty() {
        vec![Polarization::Unpolarized]
    } else {
        log::debug!(
            "polarisation channels: {}",
            channels
                .iter()
                .map(|c| c.code())
                .collect::<Vec<_>>()
                .join(", ")
        );
        channels
    }
}
