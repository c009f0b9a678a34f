use std::f32::consts::{LN_10, PI};

use super::frame::StereoFrame;

// Everything the control thread needs to build an effect stage. Building
// allocates (delay lines), so it happens before the pipeline reaches the
// audio thread.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectSpec {
    PitchShift { cents: f32 },
    Reverb { mix: f32, decay_seconds: f32 },
    Delay { seconds: f32, feedback: f32, mix: f32 },
    Distortion { drive: f32, mix: f32 },
}

impl EffectSpec {
    pub fn to_effect(&self, sample_rate: u32) -> Box<dyn Effect> {
        let sr = sample_rate.max(1) as f32;
        match *self {
            EffectSpec::PitchShift { cents } => Box::new(PitchShift::new(sr, cents)),
            EffectSpec::Reverb { mix, decay_seconds } => Box::new(Reverb::new(sr, mix, decay_seconds)),
            EffectSpec::Delay { seconds, feedback, mix } => Box::new(Delay::new(sr, seconds, feedback, mix)),
            EffectSpec::Distortion { drive, mix } => Box::new(Distortion::new(drive, mix)),
        }
    }
}

pub trait Effect: Send {
    fn process(&mut self, buf: &mut [StereoFrame]);

    // frames of output still owed after the input goes silent
    fn tail_frames(&self) -> usize {
        0
    }
}

// -- pitch shift --
// Two read taps sweep across a short delay window at (1 - ratio) samples per
// sample; sin^2 gains cross-fade them so each tap is silent when it wraps.

const PITCH_WINDOW_SECONDS: f32 = 0.05;

pub struct PitchShift {
    ratio: f32,
    window: f32,
    ring: Vec<StereoFrame>,
    write: usize,
    phase: f32,
}

impl PitchShift {
    pub fn new(sample_rate: f32, cents: f32) -> Self {
        let window = (PITCH_WINDOW_SECONDS * sample_rate).max(4.0).round();
        Self {
            ratio: 2.0_f32.powf(cents / 1200.0),
            window,
            ring: vec![StereoFrame::zero(); window as usize + 3],
            write: 0,
            phase: 0.0,
        }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    fn tap(&self, phase: f32) -> StereoFrame {
        let len = self.ring.len() as f32;
        let delay = 1.0 + phase * self.window;
        let pos = (self.write as f32 - delay).rem_euclid(len);
        let i = pos as usize % self.ring.len();
        let j = (i + 1) % self.ring.len();
        StereoFrame::lerp(self.ring[i], self.ring[j], pos - pos.floor())
    }
}

impl Effect for PitchShift {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let step = (1.0 - self.ratio) / self.window;
        for f in buf.iter_mut() {
            self.ring[self.write] = *f;

            let pa = self.phase;
            let pb = (pa + 0.5).fract();
            let ga = (PI * pa).sin().powi(2);
            let gb = (PI * pb).sin().powi(2);
            let a = self.tap(pa);
            let b = self.tap(pb);
            *f = StereoFrame {
                left: a.left * ga + b.left * gb,
                right: a.right * ga + b.right * gb,
            };

            self.phase = (self.phase + step).rem_euclid(1.0);
            self.write = (self.write + 1) % self.ring.len();
        }
    }

    fn tail_frames(&self) -> usize {
        self.ring.len()
    }
}

// -- reverb --

const COMB_TIMES: [f32; 4] = [0.0297, 0.0371, 0.0411, 0.0437];
const ALLPASS_TIMES: [f32; 2] = [0.005, 0.0017];
const ALLPASS_FEEDBACK: f32 = 0.5;
const STEREO_SPREAD: f32 = 0.0011; // right channel runs slightly longer lines

pub struct Reverb {
    mix: f32, // 0.0 to 1.0
    tail: usize,
    left: ChannelReverb,
    right: ChannelReverb,
}

impl Reverb {
    pub fn new(sample_rate: f32, mix_percent: f32, decay_seconds: f32) -> Self {
        let decay = decay_seconds.max(0.1);
        Self {
            mix: (mix_percent / 100.0).clamp(0.0, 1.0),
            tail: (decay * sample_rate) as usize,
            left: ChannelReverb::new(sample_rate, decay, 0.0),
            right: ChannelReverb::new(sample_rate, decay, STEREO_SPREAD),
        }
    }
}

impl Effect for Reverb {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let dry = 1.0 - self.mix;
        for f in buf.iter_mut() {
            let wl = self.left.process(f.left);
            let wr = self.right.process(f.right);
            f.left = f.left * dry + wl * self.mix;
            f.right = f.right * dry + wr * self.mix;
        }
    }

    fn tail_frames(&self) -> usize {
        self.tail
    }
}

struct ChannelReverb {
    combs: Vec<DelayLine>,
    allpasses: Vec<DelayLine>,
}

impl ChannelReverb {
    fn new(sample_rate: f32, decay: f32, spread: f32) -> Self {
        let combs = COMB_TIMES
            .iter()
            .map(|&t| {
                let t = t + spread;
                // feedback that reaches -60 dB after `decay` seconds
                let feedback = (-3.0 * t / decay * LN_10).exp();
                DelayLine::new(sample_rate, t, feedback)
            })
            .collect();
        let allpasses = ALLPASS_TIMES
            .iter()
            .map(|&t| DelayLine::new(sample_rate, t + spread, ALLPASS_FEEDBACK))
            .collect();
        Self { combs, allpasses }
    }

    fn process(&mut self, input: f32) -> f32 {
        let sum: f32 = self.combs.iter_mut().map(|c| c.comb(input)).sum();
        let mut out = sum / self.combs.len() as f32;
        for ap in &mut self.allpasses {
            out = ap.allpass(out);
        }
        out
    }
}

struct DelayLine {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
}

impl DelayLine {
    fn new(sample_rate: f32, seconds: f32, feedback: f32) -> Self {
        let len = ((seconds * sample_rate).round() as usize).max(1);
        Self { buffer: vec![0.0; len], index: 0, feedback }
    }

    fn advance(&mut self) {
        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }
    }

    fn comb(&mut self, input: f32) -> f32 {
        let out = self.buffer[self.index];
        self.buffer[self.index] = input + out * self.feedback;
        self.advance();
        out
    }

    fn allpass(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        self.buffer[self.index] = input + buffered * self.feedback;
        self.advance();
        buffered - input
    }
}

// -- delay --

const MIN_DELAY_TAIL_SECONDS: f32 = 1.0;

pub struct Delay {
    line: Vec<StereoFrame>,
    index: usize,
    feedback: f32,
    mix: f32,
    tail: usize,
}

impl Delay {
    pub fn new(sample_rate: f32, seconds: f32, feedback: f32, mix_percent: f32) -> Self {
        let len = ((seconds.max(0.0) * sample_rate).round() as usize).max(1);
        let feedback = feedback.clamp(0.0, 0.95);
        // repeats until the echo is 60 dB down
        let repeats = if feedback > 0.0 {
            ((0.001_f32).ln() / feedback.ln()).ceil() as usize
        } else {
            1
        };
        let tail = (len * repeats.max(1)).max((MIN_DELAY_TAIL_SECONDS * sample_rate) as usize);
        Self {
            line: vec![StereoFrame::zero(); len],
            index: 0,
            feedback,
            mix: (mix_percent / 100.0).clamp(0.0, 1.0),
            tail,
        }
    }
}

impl Effect for Delay {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let dry = 1.0 - self.mix;
        for f in buf.iter_mut() {
            let echo = self.line[self.index];
            self.line[self.index] = StereoFrame {
                left: f.left + echo.left * self.feedback,
                right: f.right + echo.right * self.feedback,
            };
            f.left = f.left * dry + echo.left * self.mix;
            f.right = f.right * dry + echo.right * self.mix;
            self.index = (self.index + 1) % self.line.len();
        }
    }

    fn tail_frames(&self) -> usize {
        self.tail
    }
}

// -- distortion --

pub struct Distortion {
    drive: f32,
    mix: f32,
}

impl Distortion {
    pub fn new(drive: f32, mix_percent: f32) -> Self {
        Self {
            drive: drive.clamp(0.0, 1.0),
            mix: (mix_percent / 100.0).clamp(0.0, 1.0),
        }
    }
}

impl Effect for Distortion {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let pre_gain = 1.0 + self.drive * 10.0;
        let dry = 1.0 - self.mix;
        for f in buf.iter_mut() {
            let l = (pre_gain * f.left.clamp(-1.0, 1.0)).tanh();
            let r = (pre_gain * f.right.clamp(-1.0, 1.0)).tanh();
            f.left = f.left * dry + l * self.mix;
            f.right = f.right * dry + r * self.mix;
        }
    }
}
