// The effect parameter table: which numeric value each named effect plays with,
// and the range the engine accepts for it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RATE_RANGE: (f32, f32) = (0.5, 2.0); // half speed .. double speed
pub const PITCH_RANGE: (f32, f32) = (-2400.0, 2400.0); // two octaves either way, in cents
pub const MIX_RANGE: (f32, f32) = (0.0, 100.0); // percent wet
pub const MAX_DELAY_SECONDS: f32 = 2.0;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{name} = {value} is outside [{min}, {max}]")]
pub struct ParamError {
    pub name: &'static str,
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Slow,
    Fast,
    Chipmunk,
    DarthVader,
    Reverb,
    Delay,
}

impl EffectKind {
    pub const ALL: [EffectKind; 6] = [
        EffectKind::Slow,
        EffectKind::Fast,
        EffectKind::Chipmunk,
        EffectKind::DarthVader,
        EffectKind::Reverb,
        EffectKind::Delay,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EffectKind::Slow => "SLOW",
            EffectKind::Fast => "FAST",
            EffectKind::Chipmunk => "CHIPMUNK",
            EffectKind::DarthVader => "DARTH VADER",
            EffectKind::Reverb => "REVERB",
            EffectKind::Delay => "DELAY",
        }
    }

    // 1-based key shown on the play screen
    pub fn from_key(n: u8) -> Option<Self> {
        Self::ALL.get((n as usize).checked_sub(1)?).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EffectParam {
    Rate(f32),
    PitchCents(f32),
    WetDryMix(f32),
    DelaySeconds(f32),
}

impl EffectParam {
    pub fn name(&self) -> &'static str {
        match self {
            EffectParam::Rate(_) => "rate",
            EffectParam::PitchCents(_) => "pitch",
            EffectParam::WetDryMix(_) => "wetDryMix",
            EffectParam::DelaySeconds(_) => "delayTime",
        }
    }

    pub fn value(&self) -> f32 {
        match *self {
            EffectParam::Rate(v)
            | EffectParam::PitchCents(v)
            | EffectParam::WetDryMix(v)
            | EffectParam::DelaySeconds(v) => v,
        }
    }

    pub fn range(&self) -> (f32, f32) {
        match self {
            EffectParam::Rate(_) => RATE_RANGE,
            EffectParam::PitchCents(_) => PITCH_RANGE,
            EffectParam::WetDryMix(_) => MIX_RANGE,
            EffectParam::DelaySeconds(_) => (0.0, MAX_DELAY_SECONDS),
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        check_range(self.name(), self.value(), self.range())
    }
}

pub(crate) fn check_range(name: &'static str, value: f32, (min, max): (f32, f32)) -> Result<(), ParamError> {
    // NaN fails both comparisons, so test for containment rather than exclusion
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ParamError { name, value, min, max })
    }
}

// One numeric value per effect kind. Serialized as part of the config file so
// the values can be tuned without touching code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectTable {
    pub slow_rate: f32,
    pub fast_rate: f32,
    pub chipmunk_cents: f32,
    pub darth_vader_cents: f32,
    pub reverb_mix: f32,
    pub delay_seconds: f32,
}

impl Default for EffectTable {
    fn default() -> Self {
        Self {
            slow_rate: 0.5,
            fast_rate: 1.5,
            chipmunk_cents: 1000.0,
            darth_vader_cents: -1000.0,
            reverb_mix: 70.0,
            delay_seconds: 0.125,
        }
    }
}

impl EffectTable {
    pub fn param(&self, kind: EffectKind) -> EffectParam {
        match kind {
            EffectKind::Slow => EffectParam::Rate(self.slow_rate),
            EffectKind::Fast => EffectParam::Rate(self.fast_rate),
            EffectKind::Chipmunk => EffectParam::PitchCents(self.chipmunk_cents),
            EffectKind::DarthVader => EffectParam::PitchCents(self.darth_vader_cents),
            EffectKind::Reverb => EffectParam::WetDryMix(self.reverb_mix),
            EffectKind::Delay => EffectParam::DelaySeconds(self.delay_seconds),
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        EffectKind::ALL
            .iter()
            .try_for_each(|&kind| self.param(kind).validate())
    }
}

// Knob settings for the custom screen: variable speed, then pitch, then distortion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CustomSettings {
    pub rate: f32,
    pub pitch_cents: f32,
    pub drive: f32, // 0.0 to 1.0
    pub mix: f32,   // percent wet
}

impl Default for CustomSettings {
    fn default() -> Self {
        Self { rate: 1.0, pitch_cents: 0.0, drive: 0.0, mix: 0.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomKnob {
    Rate,
    Pitch,
    Drive,
    Mix,
}

impl CustomKnob {
    pub fn label(self) -> &'static str {
        match self {
            CustomKnob::Rate => "RATE",
            CustomKnob::Pitch => "PITCH",
            CustomKnob::Drive => "DRIVE",
            CustomKnob::Mix => "MIX",
        }
    }

    // size of one knob click
    fn step(self) -> f32 {
        match self {
            CustomKnob::Rate => 0.05,
            CustomKnob::Pitch => 100.0,
            CustomKnob::Drive => 0.05,
            CustomKnob::Mix => 5.0,
        }
    }
}

impl CustomSettings {
    // Turn one knob by `clicks` steps, clamped to the knob's range.
    pub fn turned(mut self, knob: CustomKnob, clicks: f32) -> Self {
        let delta = knob.step() * clicks;
        match knob {
            CustomKnob::Rate => self.rate = (self.rate + delta).clamp(RATE_RANGE.0, RATE_RANGE.1),
            CustomKnob::Pitch => {
                self.pitch_cents = (self.pitch_cents + delta).clamp(PITCH_RANGE.0, PITCH_RANGE.1)
            }
            CustomKnob::Drive => self.drive = (self.drive + delta).clamp(0.0, 1.0),
            CustomKnob::Mix => self.mix = (self.mix + delta).clamp(MIX_RANGE.0, MIX_RANGE.1),
        }
        self
    }

    pub fn value(&self, knob: CustomKnob) -> f32 {
        match knob {
            CustomKnob::Rate => self.rate,
            CustomKnob::Pitch => self.pitch_cents,
            CustomKnob::Drive => self.drive,
            CustomKnob::Mix => self.mix,
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        check_range("rate", self.rate, RATE_RANGE)?;
        check_range("pitch", self.pitch_cents, PITCH_RANGE)?;
        check_range("drive", self.drive, (0.0, 1.0))?;
        check_range("mix", self.mix, MIX_RANGE)
    }
}
