//! Auto-scrolling artwork strips shown behind the log in prompt.

use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::debug;

pub const TILES_PER_TRACK: usize = 15;
pub const DEFAULT_STEP: f64 = 0.5;
pub const DEFAULT_TICK: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTrack {
    offset: f64,
    direction: ScrollDirection,
    track_length: f64,
    viewport_width: f64,
}

impl ScrollTrack {
    pub fn new(track_length: f64, viewport_width: f64, offset: f64) -> Self {
        Self {
            offset,
            direction: ScrollDirection::Forward,
            track_length,
            viewport_width,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }

    pub fn max_offset(&self) -> f64 {
        (self.track_length - self.viewport_width).max(0.0)
    }

    /// Advances one step, reversing at either end before moving.
    pub fn tick(&mut self, step: f64) -> f64 {
        if self.offset >= self.max_offset() {
            self.direction = ScrollDirection::Backward;
        }
        if self.offset <= 0.0 {
            self.direction = ScrollDirection::Forward;
        }
        match self.direction {
            ScrollDirection::Forward => self.offset += step,
            ScrollDirection::Backward => self.offset -= step,
        }
        self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarouselGeometry {
    pub viewport_width: f64,
    pub tile_size: f64,
    pub track_length: f64,
}

impl CarouselGeometry {
    /// Square tiles a third of the viewport wide, fifteen per track.
    pub fn from_viewport(viewport_width: f64) -> Self {
        let tile_size = viewport_width / 3.0;
        Self {
            viewport_width,
            tile_size,
            track_length: tile_size * TILES_PER_TRACK as f64,
        }
    }

    pub fn tile_origin(&self, index: usize) -> f64 {
        self.tile_size * index as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarouselOffsets {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Carousel {
    top: ScrollTrack,
    bottom: ScrollTrack,
}

impl Carousel {
    /// The bottom strip starts scrolled to its far end so the two strips
    /// move in opposite directions.
    pub fn new(geometry: CarouselGeometry) -> Self {
        let top = ScrollTrack::new(geometry.track_length, geometry.viewport_width, 0.0);
        let bottom_start = top.max_offset();
        let bottom = ScrollTrack::new(
            geometry.track_length,
            geometry.viewport_width,
            bottom_start,
        );
        Self { top, bottom }
    }

    pub fn offsets(&self) -> CarouselOffsets {
        CarouselOffsets {
            top: self.top.offset(),
            bottom: self.bottom.offset(),
        }
    }

    pub fn tick(&mut self, step: f64) -> CarouselOffsets {
        self.top.tick(step);
        self.bottom.tick(step);
        self.offsets()
    }
}

/// Splits the artwork list into the top and bottom strips.
pub fn split_artwork(urls: &[String]) -> (Vec<String>, Vec<String>) {
    let top = urls.iter().take(TILES_PER_TRACK).cloned().collect();
    let bottom = urls
        .iter()
        .skip(TILES_PER_TRACK)
        .take(TILES_PER_TRACK)
        .cloned()
        .collect();
    (top, bottom)
}

/// Drives a [`Carousel`] on a fixed period while the prompt is visible.
/// Dropping the ticker stops it.
pub struct CarouselTicker {
    task: JoinHandle<()>,
    offsets: watch::Receiver<CarouselOffsets>,
}

impl CarouselTicker {
    pub fn start(mut carousel: Carousel, period: Duration, step: f64) -> Self {
        let (tx, offsets) = watch::channel(carousel.offsets());
        let task = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of an interval completes immediately.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if tx.send(carousel.tick(step)).is_err() {
                    debug!("carousel: no observers left, stopping");
                    break;
                }
            }
        });
        Self { task, offsets }
    }

    pub fn subscribe(&self) -> watch::Receiver<CarouselOffsets> {
        self.offsets.clone()
    }

    pub fn current(&self) -> CarouselOffsets {
        *self.offsets.borrow()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for CarouselTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "tests/carousel_tests.rs"]
mod tests;
