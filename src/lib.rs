//! Kernel-resident diagnostic monitor.
//!
//! A small interactive shell the kernel can drop into from boot code or a
//! trap handler: it reads lines from the serial console, dispatches them
//! over a fixed command table, and can walk the kernel stack by following
//! the saved frame-pointer chain, annotating return addresses with
//! function symbols.
//!
//! The core (tokenizer, dispatcher, stack walker, symbol table) is pure
//! and polymorphic over its inputs, so it also builds and tests on the
//! host; the serial console, SBI, and register-poking glue only compiles
//! for the bare-metal RISC-V target.

#![cfg_attr(not(test), no_std)]

#[cfg(all(target_os = "none", target_arch = "riscv32"))]
#[path = "boards/qemu.rs"]
mod board;

#[cfg(all(target_os = "none", target_arch = "riscv32"))]
#[macro_use]
pub mod console;
pub mod config;
#[cfg(all(target_os = "none", target_arch = "riscv32"))]
mod lang_items;
#[cfg(all(target_os = "none", target_arch = "riscv32"))]
pub mod logging;
pub mod monitor;
#[cfg(all(target_os = "none", target_arch = "riscv32"))]
pub mod sbi;
pub mod stack_trace;
pub mod symbol;
pub mod sync;
pub mod tokenizer;
pub mod trap;
