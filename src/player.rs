//! Sequencer to synthesizer pump

use crate::note::NoteFactory;
use crate::sequencer::Sequencer;
use crate::synth::Synthesizer;
use log::debug;

const MICROS_PER_SECOND: u128 = 1_000_000;

/// Plays a loaded song through a synthesizer, applying every event before
/// the first frame at or after its time.
#[derive(Debug, Clone)]
pub struct Player {
    sequencer: Sequencer,
    synth: Synthesizer,
    sample_rate: u32,
    /// Time at frame 0 of the current pass, microseconds
    base_time: u64,
    /// Frames rendered since `base_time`
    frames: u64,
    looping: bool,
    /// Loop passes allowed, None for no limit
    loop_limit: Option<u32>,
    loops: u32,
}

impl Player {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_factory(sample_rate, NoteFactory::default())
    }

    pub fn with_factory(sample_rate: u32, factory: NoteFactory) -> Self {
        Self {
            sequencer: Sequencer::new(),
            synth: Synthesizer::new(factory),
            sample_rate: sample_rate.max(1),
            base_time: 0,
            frames: 0,
            looping: false,
            loop_limit: None,
            loops: 0,
        }
    }

    /// Loads a song and rewinds to its start. The synthesizer is reset right
    /// away, so settings made after loading survive until the song changes
    /// them.
    pub fn load(&mut self, bytes: &[u8]) -> bool {
        self.synth.all_sound_off_immediately();
        self.base_time = 0;
        self.frames = 0;
        self.loops = 0;
        let loaded = self.sequencer.load(bytes);
        self.sequencer.play(0, &mut self.synth);
        loaded
    }

    /// Enables endless looping
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        self.loop_limit = None;
    }

    /// Loops `count` times, then lets the song end. Zero disables looping.
    pub fn set_loop_count(&mut self, count: u32) {
        self.looping = count > 0;
        self.loop_limit = Some(count);
    }

    /// Completed loop passes
    pub fn loops(&self) -> u32 {
        self.loops
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Playback position in microseconds
    pub fn time(&self) -> u64 {
        self.base_time
            + (u128::from(self.frames) * MICROS_PER_SECOND / u128::from(self.sample_rate)) as u64
    }

    /// True once every event has been played and no loop is pending
    pub fn is_finished(&self) -> bool {
        self.sequencer.is_finished() && !self.can_loop()
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synth
    }

    pub fn synthesizer_mut(&mut self) -> &mut Synthesizer {
        &mut self.synth
    }

    /// Stops every note at once
    pub fn stop(&mut self) {
        self.synth.all_sound_off_immediately();
    }

    /// Renders `out.len() / 2` interleaved stereo frames
    pub fn render(&mut self, out: &mut [i32]) {
        let total = out.len() / 2;
        let rate = self.sample_rate as f32;
        let mut done = 0;

        while done < total {
            let now = self.time();
            self.sequencer.play(now + 1, &mut self.synth);

            if self.sequencer.is_finished() && self.can_loop() {
                self.sequencer.rewind_to_loop();
                self.base_time = self.sequencer.loop_time().unwrap_or(0);
                self.frames = 0;
                self.loops += 1;
                debug!("PLAYER: loop {} at {} us", self.loops, self.base_time);
                continue;
            }

            let remaining = (total - done) as u64;
            let chunk = match self.sequencer.next_time() {
                Some(next) => self.frames_until(next).clamp(1, remaining),
                None => remaining,
            } as usize;

            self.synth.synthesize(&mut out[2 * done..2 * (done + chunk)], rate);
            self.frames += chunk as u64;
            done += chunk;
        }
    }

    /// Frames left before the first frame at or after `time`
    fn frames_until(&self, time: u64) -> u64 {
        let offset = u128::from(time.saturating_sub(self.base_time));
        let rate = u128::from(self.sample_rate);
        let target = (offset * rate + MICROS_PER_SECOND - 1) / MICROS_PER_SECOND;
        (target as u64).saturating_sub(self.frames)
    }

    fn can_loop(&self) -> bool {
        if !self.looping || self.loop_limit.map_or(false, |limit| self.loops >= limit) {
            return false;
        }
        match self.sequencer.loop_time() {
            Some(loop_time) => loop_time < self.sequencer.get_total_time(),
            None => false,
        }
    }
}
