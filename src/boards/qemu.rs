/// Base virtual address the kernel image is linked at on the QEMU board.
pub const KERNBASE: u32 = 0x8000_0000;

/// The end address of the physical memory available to the QEMU board.
/// This constant defines the upper boundary of usable RAM.
/// 0x8800_0000 = 0x8000_0000 + 0x0800_0000 (128MB)
pub const MEMORY_END: u32 = 0x8800_0000;
