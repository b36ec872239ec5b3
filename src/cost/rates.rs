use std::fmt;

use serde::Serialize;

/// Runner class a job executed on. Determines its per-minute billing rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComputeEnvironment {
    #[default]
    Ubuntu,
    Windows,
    Macos,
}

impl fmt::Display for ComputeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ubuntu => "UBUNTU",
            Self::Windows => "WINDOWS",
            Self::Macos => "MACOS",
        };
        write!(f, "{name}")
    }
}

const WINDOWS_MULTIPLIER: f64 = 2.0;
const MACOS_MULTIPLIER: f64 = 10.0;

/// Cost per minute (USD) for each compute environment.
///
/// Windows and macOS are always derived from the Ubuntu base rate so the
/// published billing multipliers hold after recalibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTable {
    ubuntu_per_min: f64,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            ubuntu_per_min: 0.008,
        }
    }
}

impl RateTable {
    /// Builds a table from the Ubuntu per-minute rate. Negative rates are clamped to zero.
    pub fn from_base(ubuntu_per_min: f64) -> Self {
        Self {
            ubuntu_per_min: ubuntu_per_min.max(0.0),
        }
    }

    pub fn per_minute(&self, env: ComputeEnvironment) -> f64 {
        match env {
            ComputeEnvironment::Ubuntu => self.ubuntu_per_min,
            ComputeEnvironment::Windows => self.ubuntu_per_min * WINDOWS_MULTIPLIER,
            ComputeEnvironment::Macos => self.ubuntu_per_min * MACOS_MULTIPLIER,
        }
    }

    pub fn cost(&self, env: ComputeEnvironment, minutes: f64) -> f64 {
        minutes.max(0.0) * self.per_minute(env)
    }
}

/// Maps free-form runner labels to a compute environment.
///
/// Case-insensitive substring match: "windows" wins over "mac", anything else
/// (including no labels at all) is Ubuntu.
pub fn classify_environment<S: AsRef<str>>(labels: &[S]) -> ComputeEnvironment {
    let lowered: Vec<String> = labels
        .iter()
        .map(|label| label.as_ref().to_lowercase())
        .collect();

    if lowered.iter().any(|l| l.contains("windows")) {
        ComputeEnvironment::Windows
    } else if lowered.iter().any(|l| l.contains("mac")) {
        ComputeEnvironment::Macos
    } else {
        ComputeEnvironment::Ubuntu
    }
}
