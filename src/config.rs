pub const LINE_BUF_SIZE: usize = 80; // enough for one VGA text line
pub const MAX_ARGS: usize = 16;
pub const BACKTRACE_ARGS: usize = 5;

/// Frame pointers at or above this address are outside the kernel stack
/// region; reaching one ends the walk. Board code may override it through
/// `WalkConfig`.
pub const STACK_REGION_TOP: u32 = 0xf000_0000;

/// Upper bound on walked frames. A corrupted or cyclic frame-pointer chain
/// must not loop forever; the walker stops here and reports truncation.
pub const MAX_BACKTRACE_FRAMES: usize = 4096;
