/*
[INPUT]:  xAPI integer code tables and serde requirements
[OUTPUT]: Typed Rust enums serialized as wire integers
[POS]:    Data layer - enumerations shared by commands and records
[UPDATE]: When the venue adds codes or a new enumeration is needed
*/

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

macro_rules! wire_code {
    ($name:ident, $repr:ty, { $($variant:ident = $value:literal),+ $(,)? }) => {
        impl From<$name> for $repr {
            fn from(value: $name) -> Self {
                value as $repr
            }
        }

        impl TryFrom<$repr> for $name {
            type Error = String;

            fn try_from(value: $repr) -> Result<Self, String> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!("unknown {} code {}", stringify!($name), other)),
                }
            }
        }
    };
}

/// Chart period in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
#[repr(u32)]
pub enum PeriodCode {
    M1 = 1,
    M5 = 5,
    M15 = 15,
    M30 = 30,
    H1 = 60,
    H4 = 240,
    D1 = 1440,
    W1 = 10080,
    MN1 = 43200,
}

wire_code!(PeriodCode, u32, {
    M1 = 1,
    M5 = 5,
    M15 = 15,
    M30 = 30,
    H1 = 60,
    H4 = 240,
    D1 = 1440,
    W1 = 10080,
    MN1 = 43200,
});

impl PeriodCode {
    pub fn minutes(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            PeriodCode::M1 => "M1",
            PeriodCode::M5 => "M5",
            PeriodCode::M15 => "M15",
            PeriodCode::M30 => "M30",
            PeriodCode::H1 => "H1",
            PeriodCode::H4 => "H4",
            PeriodCode::D1 => "D1",
            PeriodCode::W1 => "W1",
            PeriodCode::MN1 => "MN1",
        }
    }
}

impl fmt::Display for PeriodCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PeriodCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_uppercase();
        let trimmed = trimmed.strip_prefix("PERIOD_").unwrap_or(&trimmed);
        match trimmed {
            "M1" => Ok(PeriodCode::M1),
            "M5" => Ok(PeriodCode::M5),
            "M15" => Ok(PeriodCode::M15),
            "M30" => Ok(PeriodCode::M30),
            "H1" => Ok(PeriodCode::H1),
            "H4" => Ok(PeriodCode::H4),
            "D1" => Ok(PeriodCode::D1),
            "W1" => Ok(PeriodCode::W1),
            "MN1" => Ok(PeriodCode::MN1),
            other => Err(format!("unknown period {other}")),
        }
    }
}

/// Trade operation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum TradeCmd {
    Buy = 0,
    Sell = 1,
    BuyLimit = 2,
    SellLimit = 3,
    BuyStop = 4,
    SellStop = 5,
    /// Read only
    Balance = 6,
    /// Read only
    Credit = 7,
}

wire_code!(TradeCmd, u8, {
    Buy = 0,
    Sell = 1,
    BuyLimit = 2,
    SellLimit = 3,
    BuyStop = 4,
    SellStop = 5,
    Balance = 6,
    Credit = 7,
});

/// Trade transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum TradeType {
    Open = 0,
    /// Only used in the streaming trades topic
    Pending = 1,
    Close = 2,
    Modify = 3,
    Delete = 4,
}

wire_code!(TradeType, u8, {
    Open = 0,
    Pending = 1,
    Close = 2,
    Modify = 3,
    Delete = 4,
});

/// `requestStatus` of a trade transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum TradeStatus {
    Error = 0,
    Pending = 1,
    Accepted = 3,
    Rejected = 4,
}

wire_code!(TradeStatus, u8, {
    Error = 0,
    Pending = 1,
    Accepted = 3,
    Rejected = 4,
});

/// Venue weekday numbering, Monday=1..Sunday=7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum TradeDay {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

wire_code!(TradeDay, u8, {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
});

impl From<Weekday> for TradeDay {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => TradeDay::Monday,
            Weekday::Tue => TradeDay::Tuesday,
            Weekday::Wed => TradeDay::Wednesday,
            Weekday::Thu => TradeDay::Thursday,
            Weekday::Fri => TradeDay::Friday,
            Weekday::Sat => TradeDay::Saturday,
            Weekday::Sun => TradeDay::Sunday,
        }
    }
}

/// Lookback unit for historical chart pulls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeUnit {
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    pub fn millis(self) -> i64 {
        match self {
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
            TimeUnit::Weeks => 604_800_000,
            TimeUnit::Months => 2_629_743_000,
            TimeUnit::Years => 31_556_926_000,
        }
    }
}

/// Account environment; selects the `/demo` or `/real` endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Demo,
    Real,
}

impl Environment {
    pub fn as_path(self) -> &'static str {
        match self {
            Environment::Demo => "demo",
            Environment::Real => "real",
        }
    }
}
