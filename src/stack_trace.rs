use core::fmt;

use crate::config::{BACKTRACE_ARGS, MAX_BACKTRACE_FRAMES, STACK_REGION_TOP};

/// Narrow capability for reading words out of the stack region.
///
/// The walker never dereferences memory itself; everything goes through
/// this trait so the walk can run against a synthetic buffer in tests and
/// against raw kernel memory on the board. `None` means the address is
/// outside the readable range (or misaligned) and ends the walk.
pub trait MemoryReader {
    fn read_word(&self, addr: u32) -> Option<u32>;
}

#[derive(Clone, Copy, Debug)]
pub struct WalkConfig {
    /// Frame pointers at or above this address have left the kernel stack
    /// region; the walk terminates once the advanced pointer reaches it.
    pub stack_top: u32,
    /// Hard cap on emitted frames, so a cyclic chain still terminates.
    pub max_frames: usize,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            stack_top: STACK_REGION_TOP,
            max_frames: MAX_BACKTRACE_FRAMES,
        }
    }
}

/// One recovered stack frame, innermost first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub frame_pointer: u32,
    pub return_address: u32,
    pub args: [u32; BACKTRACE_ARGS],
}

/// Lazy walk over a frame-pointer chain.
///
/// Frame layout, by calling convention:
///
/// ```text
/// fp + 8 ..  first five call-argument words, 4 bytes apart
/// fp + 4     saved return address
/// fp         caller's frame pointer
/// ```
///
/// The starting frame is emitted unconditionally (the walk only checks the
/// boundary after advancing, do/while style) provided its words are
/// readable. The sequence is finite and not restartable.
pub struct FrameWalker<'a> {
    mem: &'a dyn MemoryReader,
    fp: u32,
    config: WalkConfig,
    emitted: usize,
    done: bool,
    truncated: bool,
}

impl<'a> FrameWalker<'a> {
    pub fn new(mem: &'a dyn MemoryReader, fp: u32, config: WalkConfig) -> Self {
        Self {
            mem,
            fp,
            config,
            emitted: 0,
            done: false,
            truncated: false,
        }
    }

    /// True once the walk was cut off by `max_frames` with the chain still
    /// going. Meaningful only after the iterator is exhausted.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn frames_emitted(&self) -> usize {
        self.emitted
    }

    fn read_frame(&self) -> Option<Frame> {
        let return_address = self.mem.read_word(self.fp.wrapping_add(4))?;
        let mut args = [0u32; BACKTRACE_ARGS];
        for (i, slot) in args.iter_mut().enumerate() {
            *slot = self.mem.read_word(self.fp.wrapping_add(8 + 4 * i as u32))?;
        }
        Some(Frame {
            frame_pointer: self.fp,
            return_address,
            args,
        })
    }
}

impl Iterator for FrameWalker<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.done {
            return None;
        }
        if self.emitted == self.config.max_frames {
            // Chain still alive at the cap: corrupt or cyclic.
            self.truncated = true;
            self.done = true;
            log::warn!(
                "stack walk truncated after {} frames, chain may be cyclic",
                self.emitted
            );
            return None;
        }

        // A frame we cannot fully read is not emitted at all; a partial
        // frame would be indistinguishable from a real one.
        let Some(frame) = self.read_frame() else {
            self.done = true;
            return None;
        };

        match self.mem.read_word(self.fp) {
            Some(saved) if saved < self.config.stack_top => self.fp = saved,
            _ => self.done = true,
        }
        self.emitted += 1;
        Some(frame)
    }
}

impl fmt::Debug for FrameWalker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameWalker")
            .field("fp", &self.fp)
            .field("emitted", &self.emitted)
            .field("done", &self.done)
            .field("truncated", &self.truncated)
            .finish()
    }
}

#[cfg(all(target_os = "none", target_arch = "riscv32"))]
mod kernel {
    use core::arch::asm;

    use super::MemoryReader;

    /// Read the current frame pointer register.
    ///
    /// Only useful when the kernel is built with frame pointers forced on;
    /// otherwise the compiler treats s0 as a scratch register.
    pub fn current_frame_pointer() -> u32 {
        let fp: usize;
        unsafe {
            asm!("mv {}, fp", out(reg) fp);
        }
        fp as u32
    }

    /// Bounds-checked reader over a raw kernel memory range.
    #[derive(Clone, Copy)]
    pub struct RawMemory {
        start: u32,
        end: u32,
    }

    impl RawMemory {
        pub fn new(start: u32, end: u32) -> Self {
            Self { start, end }
        }
    }

    impl MemoryReader for RawMemory {
        fn read_word(&self, addr: u32) -> Option<u32> {
            if addr % 4 != 0 || addr < self.start || addr > self.end.saturating_sub(4) {
                return None;
            }
            // Range-checked above; the board guarantees this region is
            // plain readable RAM.
            Some(unsafe { (addr as usize as *const u32).read_volatile() })
        }
    }
}

#[cfg(all(target_os = "none", target_arch = "riscv32"))]
pub use kernel::{RawMemory, current_frame_pointer};
