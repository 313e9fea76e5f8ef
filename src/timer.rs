//! A restartable, cancelable timer for cooperative controller loops.
//!
//! `CycleTimer` owns no content, only scheduling: a period, a mode (repeating or
//! one-shot) and at most one pending deadline. Controllers await [`CycleTimer::fired`]
//! as one arm of their `tokio::select!` loop; the arm body is the timer's callback.
//! Re-arming overwrites the deadline, so a timer can never have two pending fires.

use std::future::pending;
use std::time::Duration;

use log::trace;
use tokio::time::{sleep_until, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Repeating,
    Once,
}

#[derive(Debug)]
pub struct CycleTimer {
    name: &'static str,
    period: Duration,
    mode: Mode,
    deadline: Option<Instant>,
}

impl CycleTimer {
    /// A timer that fires every `period` once started.
    pub fn repeating(name: &'static str, period: Duration) -> Self {
        Self { name, period, mode: Mode::Repeating, deadline: None }
    }

    /// A timer that fires once, `delay` after being started.
    pub fn once(name: &'static str, delay: Duration) -> Self {
        Self { name, period: delay, mode: Mode::Once, deadline: None }
    }

    /// (Re)starts the countdown from now, canceling any pending fire.
    pub fn start(&mut self) {
        trace!("Timer '{}' armed for {:?}", self.name, self.period);
        self.deadline = Some(Instant::now() + self.period);
    }

    /// Starts the timer only if it is not already running.
    pub fn ensure_started(&mut self) {
        if !self.is_running() {
            self.start();
        }
    }

    /// Restarts the countdown if the timer is running; a stopped timer stays stopped.
    pub fn reset_if_running(&mut self) {
        if self.is_running() {
            self.start();
        }
    }

    pub fn stop(&mut self) {
        if self.deadline.take().is_some() {
            trace!("Timer '{}' stopped", self.name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Changes the period; a running timer is restarted with the new value.
    pub fn set_period(&mut self, period: Duration) {
        self.period = period;
        self.reset_if_running();
    }

    /// Resolves when the pending deadline passes. Never resolves while stopped.
    ///
    /// Cancel-safe: the timer is only updated after the deadline has passed, so a
    /// `select!` that drops this future leaves the schedule untouched.
    pub async fn fired(&mut self) {
        let Some(deadline) = self.deadline else {
            return pending().await;
        };
        sleep_until(deadline).await;
        self.deadline = match self.mode {
            // Anchored on the previous deadline so repeated fires do not drift.
            Mode::Repeating => Some(deadline + self.period),
            Mode::Once => None,
        };
        trace!("Timer '{}' fired", self.name);
    }
}
