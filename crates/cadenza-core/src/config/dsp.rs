use serde::{Deserialize, Serialize};

use crate::config::error::{ConfigError, ConfigResult};

/// Allowed range of the input and output gain, in dB
pub const GAIN_RANGE: (f64, f64) = (-10.0, 10.0);
/// Allowed range of tone control levels, in dB
pub const TONE_LEVEL_RANGE: (f64, f64) = (-10.0, 10.0);
/// Allowed range of a parametric EQ band's gain, in dB
pub const BAND_GAIN_RANGE: (f64, f64) = (-24.0, 24.0);
/// Allowed range of a parametric EQ band's centre frequency, in Hz
pub const BAND_FREQUENCY_RANGE: (f64, f64) = (10.0, 30_000.0);
/// Allowed range of a parametric EQ band's quality factor
pub const BAND_Q_RANGE: (f64, f64) = (0.1, 100.0);

fn default_true() -> bool {
    true
}

fn check_range(what: &str, value: f64, (min, max): (f64, f64)) -> ConfigResult<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::InvalidConfig(format!(
            "{} {} is outside the range {}..={}",
            what, value, min, max
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParametricEqBandType {
    #[default]
    Peak,
    LowShelf,
    HighShelf,
    HighPass,
    LowPass,
    Notch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametricEqBand {
    pub frequency: f64,
    #[serde(default = "default_q")]
    pub q: f64,
    #[serde(default)]
    pub gain: f64,
    #[serde(rename = "type", default)]
    pub band_type: ParametricEqBandType,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_q() -> f64 {
    1.0
}

/// One stage of a player's DSP chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DspFilter {
    ParametricEq {
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default)]
        bands: Vec<ParametricEqBand>,
    },
    ToneControl {
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default)]
        bass_level: f64,
        #[serde(default)]
        mid_level: f64,
        #[serde(default)]
        treble_level: f64,
    },
}

impl DspFilter {
    pub fn tone_control(bass_level: f64, mid_level: f64, treble_level: f64) -> Self {
        DspFilter::ToneControl {
            enabled: true,
            bass_level,
            mid_level,
            treble_level,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            DspFilter::ParametricEq { bands, .. } => bands.iter().try_for_each(|band| {
                check_range("band frequency", band.frequency, BAND_FREQUENCY_RANGE)?;
                check_range("band q", band.q, BAND_Q_RANGE)?;
                check_range("band gain", band.gain, BAND_GAIN_RANGE)
            }),
            DspFilter::ToneControl {
                bass_level,
                mid_level,
                treble_level,
                ..
            } => {
                check_range("bass level", *bass_level, TONE_LEVEL_RANGE)?;
                check_range("mid level", *mid_level, TONE_LEVEL_RANGE)?;
                check_range("treble level", *treble_level, TONE_LEVEL_RANGE)
            }
        }
    }
}

/// DSP chain of one player. Its lifecycle is independent of the player config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DspConfig {
    pub enabled: bool,
    pub input_gain: f64,
    pub output_gain: f64,
    pub filters: Vec<DspFilter>,
}

impl DspConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        check_range("input gain", self.input_gain, GAIN_RANGE)?;
        check_range("output gain", self.output_gain, GAIN_RANGE)?;
        self.filters.iter().try_for_each(DspFilter::validate)
    }
}
