// SPDX-License-Identifier: CEPL-1.0
//! Frame pacing: the acquire → submit → present protocol.
//!
//! [`FrameSynchronizer`] owns a ring of N frame slots and a table recording
//! which slot last rendered into each swapchain image. It drives anything
//! implementing [`FrameTarget`]; the Vulkan implementation lives in the crate
//! root, tests use a scripted target.
//!
//! Per tick, with `current = frame % N`:
//! 1) wait on `current`'s fence, retire the images it owned
//! 2) acquire an image, signalling `current`'s image-acquired semaphore
//! 3) if another slot still owns that image, wait on that slot's fence
//! 4) record `current` as the owner
//! 5) reset `current`'s fence and submit
//! 6) present
//! 7) advance `frame`
//!
//! A stale swapchain at step 2 or 6 abandons the tick, rebuilds, and leaves
//! `frame` where it was. If the surface has shrunk to nothing the rebuild is
//! deferred and the tick reports `Paused` instead.

use crate::error::{GpuContext, VkError, VkResult};
use ash::vk;
use pacer_render::{FrameStats, FrameStatus};
use tracing::debug;

/// The GPU side of the frame protocol.
///
/// `Slot` holds one frame's synchronization primitives. Fence semantics:
/// a slot is created signaled, [`FrameTarget::submit`] resets it, and it
/// becomes signaled again when the submitted work completes.
pub trait FrameTarget {
    type Slot;

    fn create_slot(&mut self) -> VkResult<Self::Slot>;
    fn destroy_slot(&mut self, slot: Self::Slot);

    /// Zero-area surface; nothing can be presented.
    fn is_paused(&self) -> bool;
    fn image_count(&self) -> usize;

    /// Blocks until the slot's fence is signaled.
    fn wait_for_slot(&mut self, slot: &Self::Slot) -> VkResult<()>;
    /// Returns the image index. A stale chain is [`VkError::SwapchainStale`].
    fn acquire_image(&mut self, slot: &Self::Slot) -> VkResult<u32>;
    /// Resets the slot's fence and submits the image's recorded commands.
    fn submit(&mut self, slot: &Self::Slot, image: u32) -> VkResult<()>;
    /// Suboptimal or out-of-date is [`VkError::SwapchainStale`].
    fn present(&mut self, slot: &Self::Slot, image: u32) -> VkResult<()>;
    /// Drains the device and replaces the image chain. Returns
    /// [`VkError::SurfaceZeroArea`], leaving the old chain alone, while the
    /// surface has no area to build for.
    fn rebuild(&mut self) -> VkResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Submitted,
    Presented,
}

pub struct FrameSynchronizer<S> {
    slots: Vec<S>,
    states: Vec<SlotState>,
    frame: usize,
    /// Swapchain image index → slot whose fence guards it.
    image_owner: Vec<Option<usize>>,
    resize_pending: bool,
    stats: FrameStats,
}

impl<S> FrameSynchronizer<S> {
    pub fn new<T>(target: &mut T, frames_in_flight: usize) -> VkResult<Self>
    where
        T: FrameTarget<Slot = S>,
    {
        let n = frames_in_flight.max(1);
        let mut slots = Vec::with_capacity(n);
        for _ in 0..n {
            match target.create_slot() {
                Ok(s) => slots.push(s),
                Err(e) => {
                    for s in slots {
                        target.destroy_slot(s);
                    }
                    return Err(e);
                }
            }
        }
        Ok(FrameSynchronizer {
            slots,
            states: vec![SlotState::Idle; n],
            frame: 0,
            image_owner: vec![None; target.image_count()],
            resize_pending: false,
            stats: FrameStats::default(),
        })
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next tick will use.
    pub fn current_slot(&self) -> usize {
        self.frame
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.states[slot]
    }

    pub fn owner_of(&self, image: usize) -> Option<usize> {
        self.image_owner.get(image).copied().flatten()
    }

    pub fn image_table_len(&self) -> usize {
        self.image_owner.len()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Marks the chain for rebuild at the start of the next unpaused tick.
    /// Any number of calls between ticks cost one rebuild.
    pub fn notify_resized(&mut self) {
        self.resize_pending = true;
    }

    pub fn resize_pending(&self) -> bool {
        self.resize_pending
    }

    pub fn tick<T>(&mut self, target: &mut T) -> VkResult<FrameStatus>
    where
        T: FrameTarget<Slot = S>,
    {
        if target.is_paused() {
            return Ok(FrameStatus::Paused);
        }
        if self.resize_pending {
            debug!("frame: resize pending, rebuilding before acquire");
            self.resize_pending = false;
            if self.rebuild(target)? == FrameStatus::Paused {
                return Ok(FrameStatus::Paused);
            }
        }

        let current = self.frame;

        // 1) Bound the frames in flight.
        target.wait_for_slot(&self.slots[current])?;
        self.retire(current);

        // 2) Acquire
        let image = match target.acquire_image(&self.slots[current]) {
            Ok(i) => i,
            Err(e) if e.is_recoverable() => {
                debug!("frame: acquire reported {e}, rebuilding");
                return self.rebuild(target);
            }
            Err(e) => return Err(e),
        };
        let idx = image as usize;
        if idx >= self.image_owner.len() {
            return Err(VkError::gpu(
                "acquire_next_image",
                vk::Result::ERROR_UNKNOWN,
            ));
        }

        // 3) Another slot may still be rendering into this image.
        if let Some(owner) = self.image_owner[idx] {
            if owner != current {
                debug!(
                    "frame: image {idx} still held by slot {owner} ({:?}), waiting",
                    self.states[owner]
                );
                target.wait_for_slot(&self.slots[owner])?;
                self.retire(owner);
            }
        }

        // 4) + 5)
        self.image_owner[idx] = Some(current);
        target.submit(&self.slots[current], image)?;
        self.states[current] = SlotState::Submitted;

        // 6) Present
        match target.present(&self.slots[current], image) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                debug!("frame: present reported {e}, rebuilding");
                return self.rebuild(target);
            }
            Err(e) => return Err(e),
        }
        self.states[current] = SlotState::Presented;

        // 7) Advance
        self.frame = (self.frame + 1) % self.slots.len();
        self.stats.frames_presented += 1;
        Ok(FrameStatus::Presented)
    }

    /// The slot's fence has been observed signaled: it owns nothing anymore.
    fn retire(&mut self, slot: usize) {
        for owner in self.image_owner.iter_mut() {
            if *owner == Some(slot) {
                *owner = None;
            }
        }
        self.states[slot] = SlotState::Idle;
    }

    /// `SwapchainRebuilt`, or `Paused` when the surface has no area yet. In
    /// that case the current chain stays and the rebuild is retried next tick.
    fn rebuild<T>(&mut self, target: &mut T) -> VkResult<FrameStatus>
    where
        T: FrameTarget<Slot = S>,
    {
        match target.rebuild() {
            Ok(()) => {}
            Err(VkError::SurfaceZeroArea) => {
                debug!("frame: surface has zero extent, pausing");
                self.resize_pending = true;
                return Ok(FrameStatus::Paused);
            }
            Err(e) => return Err(e),
        }
        // The rebuild drained the device, so every fence has signaled.
        self.image_owner = vec![None; target.image_count()];
        self.states.fill(SlotState::Idle);
        self.stats.rebuilds += 1;
        Ok(FrameStatus::SwapchainRebuilt)
    }

    /// Hands every slot back to the target. The device must be idle.
    pub fn release<T>(&mut self, target: &mut T)
    where
        T: FrameTarget<Slot = S>,
    {
        for s in self.slots.drain(..) {
            target.destroy_slot(s);
        }
        self.states.clear();
        self.image_owner.clear();
    }
}

/// Per-frame Vulkan synchronization primitives.
#[derive(Clone, Copy, Debug)]
pub struct FrameSlot {
    pub image_acquired: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub in_flight: vk::Fence,
}

impl FrameSlot {
    /// Fence starts signaled so the first wait on a fresh slot returns at once.
    pub unsafe fn new(device: &ash::Device) -> VkResult<Self> {
        let sem_ci = vk::SemaphoreCreateInfo::default();
        let fence_ci = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            flags: vk::FenceCreateFlags::SIGNALED,
            ..Default::default()
        };
        let image_acquired = device
            .create_semaphore(&sem_ci, None)
            .gpu("create_semaphore")?;
        let render_finished = match device.create_semaphore(&sem_ci, None) {
            Ok(s) => s,
            Err(e) => {
                device.destroy_semaphore(image_acquired, None);
                return Err(VkError::gpu("create_semaphore", e));
            }
        };
        let in_flight = match device.create_fence(&fence_ci, None) {
            Ok(f) => f,
            Err(e) => {
                device.destroy_semaphore(image_acquired, None);
                device.destroy_semaphore(render_finished, None);
                return Err(VkError::gpu("create_fence", e));
            }
        };
        Ok(FrameSlot {
            image_acquired,
            render_finished,
            in_flight,
        })
    }

    pub unsafe fn destroy(self, device: &ash::Device) {
        device.destroy_fence(self.in_flight, None);
        device.destroy_semaphore(self.render_finished, None);
        device.destroy_semaphore(self.image_acquired, None);
    }
}
