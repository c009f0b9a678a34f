use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;

use super::engine::{Engine, EngineCommand, EngineStatus, PipelineEvent};
use super::frame::StereoFrame;
use crate::error::Result;

/// Where the player sends engine commands. The real implementation runs the
/// engine inside a cpal output callback; [`OfflineOutput`] runs it inline.
pub trait AudioOutput {
    fn sample_rate(&self) -> u32;

    fn send(&self, cmd: EngineCommand) -> Result<()>;

    fn status(&self) -> &EngineStatus;

    fn events(&self) -> &Receiver<PipelineEvent>;
}

// Drives the engine synchronously, one rendered block at a time. Nothing is
// audible; useful without a sound card and for checking what a pipeline produces.
pub struct OfflineOutput {
    engine: Mutex<Engine>,
    status: Arc<EngineStatus>,
    events_rx: Receiver<PipelineEvent>,
    sample_rate: u32,
}

impl OfflineOutput {
    pub fn new(sample_rate: u32) -> Self {
        let status = Arc::new(EngineStatus::default());
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let mut engine = Engine::new(Arc::clone(&status));
        engine.set_events_tx(events_tx);
        Self {
            engine: Mutex::new(engine),
            status,
            events_rx,
            sample_rate,
        }
    }

    fn engine(&self) -> std::sync::MutexGuard<'_, Engine> {
        // a panic mid-render leaves the engine usable; keep going
        self.engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn render(&self, frames: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::zero(); frames];
        self.engine().render_block(&mut out);
        out
    }

    // Render in `block`-sized steps until the pipeline finishes or `limit`
    // frames have been produced. Returns everything rendered.
    pub fn render_until_idle(&self, block: usize, limit: usize) -> Vec<StereoFrame> {
        let mut out = Vec::new();
        let mut engine = self.engine();
        let mut buf = vec![StereoFrame::zero(); block.max(1)];
        while engine.is_playing() && out.len() < limit {
            engine.render_block(&mut buf);
            out.extend_from_slice(&buf);
        }
        out
    }
}

impl AudioOutput for OfflineOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn send(&self, cmd: EngineCommand) -> Result<()> {
        self.engine().handle_cmd(cmd);
        Ok(())
    }

    fn status(&self) -> &EngineStatus {
        &self.status
    }

    fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events_rx
    }
}
