//! Render-target arena: one frame per population slot plus the elite slot.

use crate::compute::Frame;

/// Owned collection of `len()` population frames and one elite frame.
///
/// Offspring are drawn into a staging set and become visible only through
/// [`RenderTargets::commit`], so a generation that fails part way leaves the
/// committed slots untouched. The elite slot is written only by
/// [`RenderTargets::promote`].
#[derive(Debug)]
pub struct RenderTargets {
    slots: Vec<Frame>,
    staging: Vec<Frame>,
    elite: Frame,
    width: u32,
    height: u32,
    released: bool,
}

impl RenderTargets {
    /// Allocate `count` slots (and the elite slot) filled with `background`.
    pub fn new(count: usize, width: u32, height: u32, background: [u8; 4]) -> Self {
        let frame = Frame::filled(width, height, background);
        Self {
            slots: vec![frame.clone(); count],
            staging: vec![frame.clone(); count],
            elite: frame,
            width,
            height,
            released: false,
        }
    }

    /// Number of population slots (the elite slot is not counted).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn slot(&self, index: usize) -> &Frame {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut Frame {
        &mut self.slots[index]
    }

    pub fn slots(&self) -> &[Frame] {
        &self.slots
    }

    /// Staging frame for the next generation's slot `index`.
    pub fn staging_mut(&mut self, index: usize) -> &mut Frame {
        &mut self.staging[index]
    }

    /// Swap the staging set in as the committed slots.
    pub fn commit(&mut self) {
        std::mem::swap(&mut self.slots, &mut self.staging);
    }

    pub fn elite(&self) -> &Frame {
        &self.elite
    }

    /// Copy slot `index` into the elite slot.
    pub fn promote(&mut self, index: usize) {
        self.elite.copy_from(&self.slots[index]);
    }

    /// Whether [`RenderTargets::release`] has run.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Free every frame. Returns `false` when there was nothing left to free.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.slots = Vec::new();
        self.staging = Vec::new();
        self.elite = Frame::new(0, 0);
        self.released = true;
        true
    }
}
