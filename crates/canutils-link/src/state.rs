use std::fmt;

use serde::Serialize;

/// Controller bus state as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusState {
    Active,
    Stopped,
    Sleeping,
    BusWarn,
    BusPassive,
    BusOff,
    Unknown,
}

impl BusState {
    /// Map a numeric driver state code.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => BusState::Active,
            1 => BusState::Stopped,
            2 => BusState::Sleeping,
            6 => BusState::BusWarn,
            7 => BusState::BusPassive,
            8 => BusState::BusOff,
            _ => BusState::Unknown,
        }
    }

    /// Interpret an attribute value: a numeric code or a state name.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if let Ok(code) = value.parse::<u32>() {
            return Self::from_code(code);
        }
        match value.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "active" | "error-active" => BusState::Active,
            "stopped" => BusState::Stopped,
            "sleeping" => BusState::Sleeping,
            "bus-warn" | "error-warning" => BusState::BusWarn,
            "bus-passive" | "error-passive" => BusState::BusPassive,
            "bus-off" => BusState::BusOff,
            _ => BusState::Unknown,
        }
    }
}

impl fmt::Display for BusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BusState::Active => "active",
            BusState::Stopped => "stopped",
            BusState::Sleeping => "sleeping",
            BusState::BusWarn => "bus warn",
            BusState::BusPassive => "bus passive",
            BusState::BusOff => "bus off",
            BusState::Unknown => "<unknown>",
        };
        f.write_str(name)
    }
}

/// Requested controller mode. Only `start` is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Start,
}

impl ControlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlMode::Start => "start",
        }
    }
}
