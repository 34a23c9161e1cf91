// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! Window system plumbing shared by the app and the renderers.
//!
//! Resize notifications are never applied from inside the window callback.
//! The callback enqueues the new drawable size; the render loop drains the
//! queue once per tick and only acts on the most recent entry.

pub use winit;

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use tracing::debug;

/// Drawable size in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawableSize {
    pub width: u32,
    pub height: u32,
}

impl DrawableSize {
    pub fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for DrawableSize {
    fn from(s: winit::dpi::PhysicalSize<u32>) -> Self {
        DrawableSize {
            width: s.width,
            height: s.height,
        }
    }
}

/// Producer half. Cheap to clone; hand one to whatever observes the window.
#[derive(Clone, Debug)]
pub struct ResizeNotifier {
    tx: Sender<DrawableSize>,
}

impl ResizeNotifier {
    /// Returns false once the consumer is gone.
    pub fn notify(&self, size: DrawableSize) -> bool {
        self.tx.send(size).is_ok()
    }
}

/// Single consumer half, owned by the render loop.
#[derive(Debug)]
pub struct ResizeQueue {
    rx: Receiver<DrawableSize>,
}

pub fn resize_channel() -> (ResizeNotifier, ResizeQueue) {
    let (tx, rx) = mpsc::channel();
    (ResizeNotifier { tx }, ResizeQueue { rx })
}

impl ResizeQueue {
    /// Drains every pending notification and returns the newest one.
    pub fn take_latest(&self) -> Option<DrawableSize> {
        let mut latest = None;
        let mut coalesced = 0usize;
        loop {
            match self.rx.try_recv() {
                Ok(size) => {
                    if latest.is_some() {
                        coalesced += 1;
                    }
                    latest = Some(size);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if coalesced > 0 {
            debug!("coalesced {} stale resize notifications", coalesced);
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(width: u32, height: u32) -> DrawableSize {
        DrawableSize { width, height }
    }

    #[test]
    fn empty_queue_yields_nothing() {
        let (_tx, rx) = resize_channel();
        assert_eq!(rx.take_latest(), None);
    }

    #[test]
    fn burst_collapses_to_latest() {
        let (tx, rx) = resize_channel();
        tx.notify(size(640, 480));
        tx.notify(size(800, 600));
        tx.notify(size(1024, 768));
        assert_eq!(rx.take_latest(), Some(size(1024, 768)));
        assert_eq!(rx.take_latest(), None);
    }

    #[test]
    fn cloned_notifiers_feed_one_queue() {
        let (tx, rx) = resize_channel();
        let tx2 = tx.clone();
        tx.notify(size(1, 1));
        tx2.notify(size(2, 2));
        assert_eq!(rx.take_latest(), Some(size(2, 2)));
    }

    #[test]
    fn notify_reports_dropped_consumer() {
        let (tx, rx) = resize_channel();
        drop(rx);
        assert!(!tx.notify(size(10, 10)));
    }

    #[test]
    fn zero_area_detection() {
        assert!(size(0, 600).is_zero_area());
        assert!(size(800, 0).is_zero_area());
        assert!(!size(1, 1).is_zero_area());
    }
}
