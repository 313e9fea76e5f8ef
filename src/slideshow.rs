//! Slide cycling shared by the slideshow-style displays.
//!
//! `Deck` holds the immutable slide list and the only mutable presentation
//! state: the active index and the direction of the last move. `Slideshow` pairs a
//! deck with the auto-advance `CycleTimer` and the `Loading → Presenting ⇄ Paused`
//! state machine. Rendering stays with the display controllers.

use std::time::Duration;

use log::{debug, info, trace};

use crate::model::{Direction, PresentationState, Slide};
use crate::timer::CycleTimer;

#[derive(Debug, Default)]
pub struct Deck {
    slides: Vec<Slide>,
    index: usize,
    direction: Direction,
}

impl Deck {
    pub fn new(slides: Vec<Slide>) -> Self {
        Self { slides, index: 0, direction: Direction::Forward }
    }

    /// Replaces every slide and goes back to the first one.
    pub fn replace(&mut self, slides: Vec<Slide>) {
        self.slides = slides;
        self.index = 0;
        self.direction = Direction::Forward;
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn current(&self) -> Option<&Slide> {
        self.slides.get(self.index)
    }

    /// Moves to `(i + 1) mod N`. `None` when there are no slides.
    pub fn next(&mut self) -> Option<&Slide> {
        if self.slides.is_empty() {
            return None;
        }
        self.direction = Direction::Forward;
        self.index = (self.index + 1) % self.slides.len();
        self.current()
    }

    /// Moves to `(i - 1 + N) mod N`. `None` when there are no slides.
    pub fn previous(&mut self) -> Option<&Slide> {
        if self.slides.is_empty() {
            return None;
        }
        self.direction = Direction::Backward;
        self.index = (self.index + self.slides.len() - 1) % self.slides.len();
        self.current()
    }
}

/// Observable state of a slideshow, returned by every display handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlideshowSnapshot {
    pub state: PresentationState,
    pub index: usize,
    pub direction: Direction,
    pub slide_count: usize,
}

#[derive(Debug)]
pub struct Slideshow {
    deck: Deck,
    advance: CycleTimer,
    state: PresentationState,
    /// Auto-advance only runs with at least this many slides.
    min_slides_to_cycle: usize,
    /// Identifies the latest content request; older responses are discarded.
    load_token: u64,
}

impl Slideshow {
    pub fn new(slide_duration: Duration, min_slides_to_cycle: usize) -> Self {
        Self {
            deck: Deck::default(),
            advance: CycleTimer::repeating("slide-advance", slide_duration),
            state: PresentationState::Loading,
            min_slides_to_cycle,
            load_token: 0,
        }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn state(&self) -> PresentationState {
        self.state
    }

    pub fn is_advancing(&self) -> bool {
        self.advance.is_running()
    }

    pub fn snapshot(&self) -> SlideshowSnapshot {
        SlideshowSnapshot {
            state: self.state,
            index: self.deck.index(),
            direction: self.deck.direction(),
            slide_count: self.deck.len(),
        }
    }

    /// Stops auto-advance and enters `Loading`. Returns the token the matching
    /// response must carry.
    pub fn begin_load(&mut self) -> u64 {
        self.advance.stop();
        self.state = PresentationState::Loading;
        self.load_token += 1;
        debug!("Slideshow content request #{} started", self.load_token);
        self.load_token
    }

    pub fn is_current(&self, token: u64) -> bool {
        token == self.load_token
    }

    /// Installs freshly loaded slides at index 0 and restarts auto-advance.
    pub fn finish_load(&mut self, slides: Vec<Slide>) {
        info!("Slideshow loaded {} slide(s)", slides.len());
        self.deck.replace(slides);
        self.state = PresentationState::Presenting;
        self.start();
    }

    /// (Re)starts auto-advance from zero and enters `Presenting`.
    pub fn start(&mut self) {
        if self.state == PresentationState::Loading {
            trace!("Ignoring slideshow start while loading");
            return;
        }
        self.state = PresentationState::Presenting;
        if self.deck.len() >= self.min_slides_to_cycle.max(1) {
            self.advance.start();
        } else {
            debug!("Not cycling {} slide(s)", self.deck.len());
            self.advance.stop();
        }
    }

    pub fn pause(&mut self) {
        self.advance.stop();
        if self.state == PresentationState::Presenting {
            info!("Slideshow paused at slide {}", self.deck.index());
            self.state = PresentationState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == PresentationState::Paused {
            info!("Slideshow resumed at slide {}", self.deck.index());
            self.start();
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.state {
            PresentationState::Presenting => self.pause(),
            PresentationState::Paused => self.resume(),
            PresentationState::Loading => trace!("Pause toggle ignored while loading"),
        }
    }

    /// Auto-advance step. Returns the new index.
    pub fn advance(&mut self) -> Option<usize> {
        let moved = self.deck.next().is_some();
        moved.then(|| self.deck.index())
    }

    /// Manual forward navigation; restarts the idle countdown if cycling.
    pub fn navigate_next(&mut self) -> Option<usize> {
        let moved = self.deck.next().is_some();
        self.advance.reset_if_running();
        moved.then(|| self.deck.index())
    }

    /// Manual backward navigation; restarts the idle countdown if cycling.
    pub fn navigate_previous(&mut self) -> Option<usize> {
        let moved = self.deck.previous().is_some();
        self.advance.reset_if_running();
        moved.then(|| self.deck.index())
    }

    /// Resolves when auto-advance is due. Pending forever while stopped.
    pub async fn tick(&mut self) {
        self.advance.fired().await
    }
}
