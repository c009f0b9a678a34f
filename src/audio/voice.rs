use super::clip_buffer::ClipBuffer;
use super::frame::StereoFrame;

// Reads a clip from the start at a fixed rate. A rate of 1.0 is unmodified
// playback; anything else is plain variable speed (pitch follows the rate).
#[derive(Clone, Debug)]
pub struct Voice {
    pub pos: f64,
    pub rate: f64,
    pub active: bool,
}

impl Voice {
    pub fn new(rate: f32) -> Self {
        Self {
            pos: 0.0,
            rate: rate as f64,
            active: true,
        }
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    // Add this voice into `out`; returns how many frames were written before the clip ran out
    pub fn render_into(&mut self, buffer: &ClipBuffer, out: &mut [StereoFrame]) -> usize {
        if !self.active {
            return 0;
        }
        let data = &buffer.data;
        let len = data.len();

        for (n, frame) in out.iter_mut().enumerate() { // for each frame in the output buffer
            if self.pos >= len as f64 {
                self.active = false;
                return n;
            }

            // read sample at current position
            let i = self.pos as usize;
            let frac = (self.pos - i as f64) as f32;
            let s0 = data[i];
            let s1 = data.get(i + 1).copied().unwrap_or(s0);
            let sample = StereoFrame::lerp(s0, s1, frac);

            frame.left += sample.left;
            frame.right += sample.right;

            self.pos += self.rate;
        }
        if self.pos >= len as f64 {
            self.active = false;
        }
        out.len()
    }
}
