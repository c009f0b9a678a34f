use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crossbeam_channel::Sender;

use super::clip_buffer::ClipBuffer;
use super::effect::Effect;
use super::frame::StereoFrame;
use super::voice::Voice;

// One playback: source voice -> zero or more effect stages -> output.
// Built on the control thread, moved whole into the engine.
pub struct Pipeline {
    pub label: String,
    pub voice: Voice,
    pub effects: Vec<Box<dyn Effect>>,
    tail_remaining: usize,
}

impl Pipeline {
    pub fn new(label: impl Into<String>, rate: f32, effects: Vec<Box<dyn Effect>>) -> Self {
        let tail_remaining = effects.iter().map(|e| e.tail_frames()).max().unwrap_or(0);
        Self {
            label: label.into(),
            voice: Voice::new(rate),
            effects,
            tail_remaining,
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("label", &self.label)
            .field("rate", &self.voice.rate)
            .field("effects", &self.effects.len())
            .finish()
    }
}

pub enum EngineCommand {
    // The engine can't read files (would stall the callback), so the clip is
    // decoded up front and handed over whole
    Load(Arc<ClipBuffer>),
    Start(Pipeline),
    Stop,
    Unload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    Started { generation: u64, label: String },
    Released { generation: u64, label: String }, // torn down before finishing
    Finished { generation: u64, label: String }, // ran out of audio on its own
}

// Shared with the control thread; written only by the engine.
#[derive(Debug, Default)]
pub struct EngineStatus {
    active: AtomicUsize,
    generation: AtomicU64,
}

impl EngineStatus {
    pub fn active_pipelines(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

pub struct Engine {
    clip: Option<Arc<ClipBuffer>>,
    current: Option<Pipeline>,
    generation: u64,
    status: Arc<EngineStatus>,
    events_tx: Option<Sender<PipelineEvent>>,
}

impl Engine {
    pub fn new(status: Arc<EngineStatus>) -> Self {
        Self {
            clip: None,
            current: None,
            generation: 0,
            status,
            events_tx: None,
        }
    }

    pub fn set_events_tx(&mut self, tx: Sender<PipelineEvent>) {
        self.events_tx = Some(tx);
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    pub fn handle_cmd(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Load(buffer) => {
                self.teardown();
                self.clip = Some(buffer);
            }
            EngineCommand::Start(pipeline) => self.install(pipeline),
            EngineCommand::Stop => self.teardown(),
            EngineCommand::Unload => {
                self.teardown();
                self.clip = None;
            }
        }
    }

    // the old pipeline is always fully released before the new one counts as started
    fn install(&mut self, pipeline: Pipeline) {
        self.teardown();
        if self.clip.is_none() {
            return; // nothing to read from; the player checks this before sending
        }
        self.generation += 1;
        self.emit(PipelineEvent::Started {
            generation: self.generation,
            label: pipeline.label.clone(),
        });
        self.current = Some(pipeline);
        self.status.active.store(1, Ordering::Release);
        self.status.generation.store(self.generation, Ordering::Release);
    }

    fn teardown(&mut self) {
        if let Some(mut p) = self.current.take() {
            p.voice.stop();
            self.status.active.store(0, Ordering::Release);
            self.emit(PipelineEvent::Released { generation: self.generation, label: p.label });
        }
    }

    fn finish(&mut self) {
        if let Some(p) = self.current.take() {
            self.status.active.store(0, Ordering::Release);
            self.emit(PipelineEvent::Finished { generation: self.generation, label: p.label });
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.try_send(event);
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        for f in out.iter_mut() {
            *f = StereoFrame::zero();
        }
        let (Some(clip), Some(p)) = (self.clip.as_ref(), self.current.as_mut()) else {
            return;
        };

        let written = p.voice.render_into(clip, out);
        for effect in p.effects.iter_mut() {
            effect.process(out);
        }

        if !p.voice.active {
            // the source is done; effects ring out over silence for their tail
            let silent = out.len() - written;
            p.tail_remaining = p.tail_remaining.saturating_sub(silent);
            if p.tail_remaining == 0 {
                self.finish();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::effect::EffectSpec;

    fn engine_with_clip(frames: usize) -> (Engine, crossbeam_channel::Receiver<PipelineEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut engine = Engine::new(Arc::new(EngineStatus::default()));
        engine.set_events_tx(tx);
        let clip = ClipBuffer::from_frames(vec![StereoFrame::mono(0.25); frames], 1000);
        engine.handle_cmd(EngineCommand::Load(Arc::new(clip)));
        (engine, rx)
    }

    #[test]
    fn restarting_releases_previous_pipeline_first() {
        let (mut engine, rx) = engine_with_clip(100);
        engine.handle_cmd(EngineCommand::Start(Pipeline::new("a", 0.5, vec![])));
        engine.handle_cmd(EngineCommand::Start(Pipeline::new("b", 1.5, vec![])));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                PipelineEvent::Started { generation: 1, label: "a".into() },
                PipelineEvent::Released { generation: 1, label: "a".into() },
                PipelineEvent::Started { generation: 2, label: "b".into() },
            ]
        );
        assert_eq!(engine.status.active_pipelines(), 1);
        assert_eq!(engine.status.generation(), 2);
    }

    #[test]
    fn pipeline_finishes_after_clip_and_tail() {
        let (mut engine, rx) = engine_with_clip(100);
        let delay = EffectSpec::Delay { seconds: 0.1, feedback: 0.0, mix: 50.0 }.to_effect(1000);
        let tail = delay.tail_frames(); // one second minimum at 1 kHz
        engine.handle_cmd(EngineCommand::Start(Pipeline::new("delay", 1.0, vec![delay])));

        let mut block = [StereoFrame::zero(); 50];
        let mut rendered = 0;
        while engine.is_playing() {
            engine.render_block(&mut block);
            rendered += block.len();
        }
        assert_eq!(rendered, 100 + tail);
        assert!(matches!(rx.try_iter().last(), Some(PipelineEvent::Finished { .. })));
        assert_eq!(engine.status.active_pipelines(), 0);
    }

    #[test]
    fn start_without_clip_is_ignored() {
        let mut engine = Engine::new(Arc::new(EngineStatus::default()));
        engine.handle_cmd(EngineCommand::Start(Pipeline::new("orphan", 1.0, vec![])));
        assert!(!engine.is_playing());
    }

    #[test]
    fn idle_engine_renders_silence() {
        let (mut engine, _rx) = engine_with_clip(10);
        let mut block = [StereoFrame::mono(9.0); 8];
        engine.render_block(&mut block);
        assert!(block.iter().all(|f| *f == StereoFrame::zero()));
    }

    #[test]
    fn unload_stops_and_forgets_clip() {
        let (mut engine, rx) = engine_with_clip(10);
        engine.handle_cmd(EngineCommand::Start(Pipeline::new("x", 1.0, vec![])));
        engine.handle_cmd(EngineCommand::Unload);
        assert!(!engine.is_playing());
        assert!(matches!(rx.try_iter().last(), Some(PipelineEvent::Released { .. })));
        engine.handle_cmd(EngineCommand::Start(Pipeline::new("y", 1.0, vec![])));
        assert!(!engine.is_playing());
    }
}
