//! Sample-accurate playback timeline.
//!
//! All positions are counted in output frames at the playback sample rate.
//! `clock` is the position of the next frame handed to the device ("now"),
//! `cursor` is the earliest start for the next chunk. A cursor of 0 means
//! "start at now".

use std::collections::BTreeMap;
use std::time::Duration;

use super::pcm::frames_to_duration;

pub type ChunkId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledChunk {
    pub id: ChunkId,
    pub start: u64,
    pub frames: u64,
}

impl ScheduledChunk {
    pub fn end(&self) -> u64 {
        self.start + self.frames
    }
}

struct InFlight {
    start: u64,
    samples: Vec<i16>,
}

impl InFlight {
    fn end(&self) -> u64 {
        self.start + self.samples.len() as u64
    }
}

/// What one render call did to the in-flight set.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Chunks that finished playing inside the rendered window.
    pub completed: Vec<ChunkId>,
    /// The in-flight set became empty because of those completions.
    pub drained: bool,
}

pub struct Timeline {
    sample_rate: u32,
    clock: u64,
    cursor: u64,
    next_id: ChunkId,
    /// Bumped by every cancellation, so a renderer can tell that audio it
    /// already handed to the device is stale.
    generation: u64,
    in_flight: BTreeMap<ChunkId, InFlight>,
}

impl Timeline {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            clock: 0,
            cursor: 0,
            next_id: 0,
            generation: 0,
            in_flight: BTreeMap::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn now(&self) -> u64 {
        self.clock
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn duration_of(&self, frames: u64) -> Duration {
        frames_to_duration(frames, self.sample_rate)
    }

    /// Place a decoded chunk at `max(cursor, now)` and advance the cursor by
    /// its length.
    pub fn schedule(&mut self, samples: Vec<i16>) -> ScheduledChunk {
        let start = self.cursor.max(self.clock);
        let frames = samples.len() as u64;
        self.cursor = start + frames;

        let id = self.next_id;
        self.next_id += 1;
        self.in_flight.insert(id, InFlight { start, samples });

        ScheduledChunk { id, start, frames }
    }

    /// Drop every scheduled chunk, whatever its progress, and pin the next
    /// chunk to "now". Returns how many chunks were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.in_flight.len();
        self.in_flight.clear();
        self.cursor = 0;
        self.generation += 1;
        cancelled
    }

    /// Mix the window `[now, now + out.len())` into `out` (mono) and advance
    /// the clock past it. Chunks ending inside the window are removed.
    pub fn render(&mut self, out: &mut [i16]) -> RenderOutcome {
        out.fill(0);
        let window_start = self.clock;
        let window_end = window_start + out.len() as u64;

        for chunk in self.in_flight.values() {
            if chunk.end() <= window_start || chunk.start >= window_end {
                continue;
            }
            let from = chunk.start.max(window_start);
            let to = chunk.end().min(window_end);
            for t in from..to {
                let slot = &mut out[(t - window_start) as usize];
                *slot = slot.saturating_add(chunk.samples[(t - chunk.start) as usize]);
            }
        }
        self.clock = window_end;

        let completed: Vec<ChunkId> = self
            .in_flight
            .iter()
            .filter(|(_, chunk)| chunk.end() <= window_end)
            .map(|(&id, _)| id)
            .collect();
        for id in &completed {
            self.in_flight.remove(id);
        }

        let drained = !completed.is_empty() && self.in_flight.is_empty();
        RenderOutcome { completed, drained }
    }
}
