// ============================================================
// Layer 3 — Abalone Domain Types
// ============================================================
// The physical measurements of one abalone, in the two shapes
// the system sees them:
//
//   AbaloneRecord — one row of the training CSV, including the
//                   Length column and the Rings target
//   AbaloneInput  — one prediction request (HTTP body or CLI
//                   flags), without Length and without Rings
//
// CSV headers carry spaces ("Whole weight"), the request body
// uses underscores ("Whole_weight"). serde renames bridge both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sex of the animal: male, female, or infant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
    I,
}

impl Sex {
    /// The single-letter code used in the dataset
    pub fn code(&self) -> &'static str {
        match self {
            Sex::M => "M",
            Sex::F => "F",
            Sex::I => "I",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Sex {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "M" | "m" => Ok(Sex::M),
            "F" | "f" => Ok(Sex::F),
            "I" | "i" => Ok(Sex::I),
            other => anyhow::bail!("unknown sex code '{other}', expected one of M, F, I"),
        }
    }
}

/// One labelled row of `abalone.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbaloneRecord {
    #[serde(rename = "Sex")]
    pub sex: Sex,

    #[serde(rename = "Length")]
    pub length: f64,

    #[serde(rename = "Diameter")]
    pub diameter: f64,

    #[serde(rename = "Height")]
    pub height: f64,

    #[serde(rename = "Whole weight")]
    pub whole_weight: f64,

    #[serde(rename = "Shucked weight")]
    pub shucked_weight: f64,

    #[serde(rename = "Viscera weight")]
    pub viscera_weight: f64,

    #[serde(rename = "Shell weight")]
    pub shell_weight: f64,

    /// Ring count — the regression target (age ≈ rings + 1.5 years)
    #[serde(rename = "Rings")]
    pub rings: f64,
}

impl AbaloneRecord {
    /// Every numeric column paired with its CSV header, Rings last
    pub fn measurements(&self) -> [(&'static str, f64); 8] {
        [
            ("Length",         self.length),
            ("Diameter",       self.diameter),
            ("Height",         self.height),
            ("Whole weight",   self.whole_weight),
            ("Shucked weight", self.shucked_weight),
            ("Viscera weight", self.viscera_weight),
            ("Shell weight",   self.shell_weight),
            ("Rings",          self.rings),
        ]
    }
}

/// Request payload for a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbaloneInput {
    #[serde(rename = "Sex")]
    pub sex: Sex,

    #[serde(rename = "Diameter")]
    pub diameter: f64,

    #[serde(rename = "Height")]
    pub height: f64,

    #[serde(rename = "Whole_weight")]
    pub whole_weight: f64,

    #[serde(rename = "Shucked_weight")]
    pub shucked_weight: f64,

    #[serde(rename = "Viscera_weight")]
    pub viscera_weight: f64,

    #[serde(rename = "Shell_weight")]
    pub shell_weight: f64,
}

impl From<&AbaloneRecord> for AbaloneInput {
    fn from(r: &AbaloneRecord) -> Self {
        Self {
            sex:            r.sex,
            diameter:       r.diameter,
            height:         r.height,
            whole_weight:   r.whole_weight,
            shucked_weight: r.shucked_weight,
            viscera_weight: r.viscera_weight,
            shell_weight:   r.shell_weight,
        }
    }
}

/// Response payload for a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbalonePrediction {
    pub predicted_rings: f64,
}
