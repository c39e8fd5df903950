/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use vrsession_api::FrameState;

use std::collections::VecDeque;

/// How many frames the averaged frame rate is computed over.
pub const AVERAGE_FRAME_COUNT: usize = 8;

/// Per-frame scratch data of a running session. Created when drawing is
/// prepared, dropped when the session ends.
#[derive(Debug)]
pub struct DrawInfo {
    frame_state: FrameState,
    /// Time at frame start to benchmark frame render durations.
    frame_begin_ns: u64,
    /// Time the last frames took for rendering (in ms), oldest first.
    last_frame_times: VecDeque<f64>,
}

/// Timings of the frame that just ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTimings {
    pub duration_ms: f64,
    /// Average over the last `AVERAGE_FRAME_COUNT` frames (or fewer, at startup).
    pub average_ms: f64,
}

impl FrameTimings {
    pub fn fps(&self) -> f64 {
        1000.0 / self.duration_ms
    }

    pub fn average_fps(&self) -> f64 {
        1000.0 / self.average_ms
    }
}

impl Default for DrawInfo {
    fn default() -> Self {
        DrawInfo::new()
    }
}

impl DrawInfo {
    pub fn new() -> DrawInfo {
        DrawInfo {
            frame_state: FrameState::default(),
            frame_begin_ns: 0,
            last_frame_times: VecDeque::with_capacity(AVERAGE_FRAME_COUNT),
        }
    }

    pub fn frame_state(&self) -> &FrameState {
        &self.frame_state
    }

    pub(crate) fn set_frame_state(&mut self, frame_state: FrameState) {
        self.frame_state = frame_state;
    }

    pub(crate) fn mark_frame_begin(&mut self) {
        self.frame_begin_ns = time::precise_time_ns();
    }

    /// Records the duration of the frame begun by the last `mark_frame_begin`.
    pub(crate) fn finish_frame(&mut self) -> FrameTimings {
        let elapsed_ns = time::precise_time_ns().saturating_sub(self.frame_begin_ns);
        self.record_frame_duration(elapsed_ns as f64 / 1_000_000.0)
    }

    pub fn record_frame_duration(&mut self, duration_ms: f64) -> FrameTimings {
        if self.last_frame_times.len() >= AVERAGE_FRAME_COUNT {
            self.last_frame_times.pop_front();
        }
        self.last_frame_times.push_back(duration_ms);

        let total: f64 = self.last_frame_times.iter().sum();
        FrameTimings {
            duration_ms,
            average_ms: total / self.last_frame_times.len() as f64,
        }
    }

    pub fn recent_frame_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.last_frame_times.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_the_last_eight_durations() {
        let mut draw_info = DrawInfo::new();
        let mut timings = None;
        for frame in 1..=20 {
            timings = Some(draw_info.record_frame_duration(frame as f64));
        }

        let recent: Vec<f64> = draw_info.recent_frame_times().collect();
        assert_eq!(recent, vec![13., 14., 15., 16., 17., 18., 19., 20.]);

        let timings = timings.unwrap();
        assert_eq!(timings.duration_ms, 20.);
        assert_eq!(timings.average_ms, recent.iter().sum::<f64>() / 8.);
        assert_eq!(timings.average_ms, 16.5);
    }

    #[test]
    fn average_covers_fewer_frames_at_startup() {
        let mut draw_info = DrawInfo::new();
        draw_info.record_frame_duration(10.);
        let timings = draw_info.record_frame_duration(20.);
        assert_eq!(timings.average_ms, 15.);
        assert_eq!(timings.fps(), 50.);
        assert!((timings.average_fps() - 1000. / 15.).abs() < 1e-9);
    }

    #[test]
    fn finished_frame_is_recorded() {
        let mut draw_info = DrawInfo::new();
        draw_info.mark_frame_begin();
        let timings = draw_info.finish_frame();
        assert!(timings.duration_ms >= 0.);
        assert_eq!(draw_info.recent_frame_times().count(), 1);
    }
}
