use std::fmt;
use std::str::FromStr;

use crate::error::LinkError;

/// A bitrate the tools can set. Reads report whatever the driver holds,
/// which may be off this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitrate {
    K10,
    K20,
    K50,
    K100,
    K125,
    K250,
    K500,
    K800,
    M1,
}

impl Bitrate {
    /// Every supported bitrate, slowest first.
    pub const ALL: [Bitrate; 9] = [
        Bitrate::K10,
        Bitrate::K20,
        Bitrate::K50,
        Bitrate::K100,
        Bitrate::K125,
        Bitrate::K250,
        Bitrate::K500,
        Bitrate::K800,
        Bitrate::M1,
    ];

    pub fn kbit(self) -> u32 {
        match self {
            Bitrate::K10 => 10,
            Bitrate::K20 => 20,
            Bitrate::K50 => 50,
            Bitrate::K100 => 100,
            Bitrate::K125 => 125,
            Bitrate::K250 => 250,
            Bitrate::K500 => 500,
            Bitrate::K800 => 800,
            Bitrate::M1 => 1000,
        }
    }

    pub fn bits_per_second(self) -> u32 {
        self.kbit() * 1000
    }

    pub fn from_kbit(kbit: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.kbit() == kbit)
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kbit())
    }
}

impl FromStr for Bitrate {
    type Err = LinkError;

    /// Parse a kbit/s value such as `"125"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_kbit)
            .ok_or_else(|| LinkError::InvalidBitrate(s.to_string()))
    }
}
