//! Interactive kernel monitor: a line-oriented shell over a small fixed
//! command table, for poking at the running kernel.

use core::fmt;
use core::fmt::Write;

use crate::config::{LINE_BUF_SIZE, MAX_ARGS};
use crate::stack_trace::{FrameWalker, MemoryReader, WalkConfig};
use crate::symbol::SymbolResolver;
use crate::tokenizer::{Args, TokenizeError, tokenize};
use crate::trap::TrapFrame;

const PROMPT: &str = "K> ";

/// Addresses of the kernel image segments, for `kerninfo`.
///
/// The kernel side fills this from linker symbols; tests hand in synthetic
/// values.
#[derive(Clone, Copy, Debug)]
pub struct KernelLayout {
    pub entry: u32,
    pub etext: u32,
    pub edata: u32,
    pub end: u32,
    /// Virtual-to-physical offset of the image.
    pub kernbase: u32,
}

pub type Handler = fn(&mut Monitor<'_>, &Args<'_>, Option<&TrapFrame>) -> i32;

pub struct Command {
    pub name: &'static str,
    pub desc: &'static str,
    // return a negative value to force the monitor to exit
    pub handler: Handler,
}

/// The fixed command registry. There is no runtime registration; the table
/// is immutable for the life of the kernel and `help` reports it in this
/// order.
pub static COMMANDS: &[Command] = &[
    Command {
        name: "help",
        desc: "Display this list of commands",
        handler: cmd_help,
    },
    Command {
        name: "kerninfo",
        desc: "Display information about the kernel",
        handler: cmd_kerninfo,
    },
    Command {
        name: "backtrace",
        desc: "Display a backtrace of the kernel stack",
        handler: cmd_backtrace,
    },
];

/// Supplies the next input line, or `None` at end of input.
///
/// The reader owns prompting and line editing; the monitor only sees
/// whole lines. May block indefinitely waiting for the data source.
pub trait LineReader {
    fn read_line<'b>(&mut self, prompt: &str, buf: &'b mut [u8]) -> Option<&'b str>;
}

/// Everything a monitor session needs: an output sink, a readable view of
/// stack memory, a symbol resolver, and the kernel layout. All borrowed;
/// the monitor owns nothing and spawns nothing.
pub struct Monitor<'a> {
    out: &'a mut dyn fmt::Write,
    mem: &'a dyn MemoryReader,
    symbols: &'a dyn SymbolResolver,
    layout: KernelLayout,
    walk: WalkConfig,
    frame_pointer: u32,
}

impl<'a> Monitor<'a> {
    pub fn new(
        out: &'a mut dyn fmt::Write,
        mem: &'a dyn MemoryReader,
        symbols: &'a dyn SymbolResolver,
        layout: KernelLayout,
    ) -> Self {
        Self {
            out,
            mem,
            symbols,
            layout,
            walk: WalkConfig::default(),
            frame_pointer: 0,
        }
    }

    /// Frame pointer the next `backtrace` starts from.
    pub fn set_frame_pointer(&mut self, fp: u32) {
        self.frame_pointer = fp;
    }

    pub fn set_walk_config(&mut self, walk: WalkConfig) {
        self.walk = walk;
    }

    /// Run the shell loop until end of input or a handler asks to exit.
    pub fn run(&mut self, input: &mut dyn LineReader, tf: Option<&TrapFrame>) {
        let _ = writeln!(self.out, "Welcome to the kernel monitor!");
        let _ = writeln!(self.out, "Type 'help' for a list of commands.");

        let mut buf = [0u8; LINE_BUF_SIZE];
        loop {
            let Some(line) = input.read_line(PROMPT, &mut buf) else {
                break;
            };
            if self.run_cmd(line, tf) < 0 {
                break;
            }
        }
    }

    /// Tokenize and dispatch one line. Returns the handler's code: 0 to
    /// continue, negative to terminate the loop; other values are reserved
    /// and currently also continue.
    pub fn run_cmd(&mut self, line: &str, tf: Option<&TrapFrame>) -> i32 {
        let args = match tokenize(line) {
            Ok(args) => args,
            Err(TokenizeError::TooManyArgs) => {
                let _ = writeln!(self.out, "Too many arguments (max {})", MAX_ARGS);
                return 0;
            }
        };
        self.dispatch(COMMANDS, &args, tf)
    }

    fn dispatch(&mut self, table: &[Command], args: &Args<'_>, tf: Option<&TrapFrame>) -> i32 {
        let Some(name) = args.first() else {
            return 0;
        };
        for cmd in table {
            if cmd.name == name {
                return (cmd.handler)(self, args, tf);
            }
        }
        log::debug!("unknown monitor command {:?}", name);
        let _ = writeln!(self.out, "Unknown command '{}'", name);
        0
    }
}

fn cmd_help(mon: &mut Monitor<'_>, _args: &Args<'_>, _tf: Option<&TrapFrame>) -> i32 {
    for cmd in COMMANDS {
        let _ = writeln!(mon.out, "{} - {}", cmd.name, cmd.desc);
    }
    0
}

fn cmd_kerninfo(mon: &mut Monitor<'_>, _args: &Args<'_>, _tf: Option<&TrapFrame>) -> i32 {
    let l = mon.layout;
    let _ = writeln!(mon.out, "Special kernel symbols:");
    for (name, addr) in [
        ("entry", l.entry),
        ("etext", l.etext),
        ("edata", l.edata),
        ("end", l.end),
    ] {
        let _ = writeln!(
            mon.out,
            "  {:<5}  {:08x} (virt)  {:08x} (phys)",
            name,
            addr,
            addr.wrapping_sub(l.kernbase)
        );
    }
    let _ = writeln!(
        mon.out,
        "Kernel executable memory footprint: {}KB",
        (l.end.wrapping_sub(l.entry) + 1023) / 1024
    );
    0
}

fn cmd_backtrace(mon: &mut Monitor<'_>, _args: &Args<'_>, _tf: Option<&TrapFrame>) -> i32 {
    let _ = writeln!(mon.out, "Stack backtrace:");
    let mut walker = FrameWalker::new(mon.mem, mon.frame_pointer, mon.walk);
    while let Some(frame) = walker.next() {
        let _ = write!(
            mon.out,
            "ebp {:08x} eip {:08x} args",
            frame.frame_pointer, frame.return_address
        );
        for arg in frame.args {
            let _ = write!(mon.out, " {:08x}", arg);
        }
        let _ = writeln!(mon.out);

        // A miss just drops the symbol line; the raw frame already printed.
        if let Some(info) = mon.symbols.resolve(frame.return_address) {
            let name = info.fn_name.get(..info.fn_namelen).unwrap_or(info.fn_name);
            let _ = writeln!(
                mon.out,
                "{}:{}: {}+{}",
                info.file,
                info.line,
                name,
                frame.return_address.wrapping_sub(info.fn_addr)
            );
        }
    }
    if walker.truncated() {
        let _ = writeln!(
            mon.out,
            "(backtrace truncated after {} frames)",
            walker.frames_emitted()
        );
    }
    0
}

#[cfg(all(target_os = "none", target_arch = "riscv32"))]
mod kernel {
    use super::{KernelLayout, Monitor, TrapFrame, WalkConfig};
    use crate::board;
    use crate::config::MAX_BACKTRACE_FRAMES;
    use crate::console::{SbiLineReader, Stdout};
    use crate::stack_trace::{RawMemory, current_frame_pointer};
    use crate::symbol::KernelSymbols;

    unsafe extern "C" {
        safe fn stext();
        safe fn etext();
        safe fn edata();
        safe fn ekernel();
    }

    impl KernelLayout {
        /// Layout of the running kernel image, from linker symbols.
        pub fn from_linker() -> Self {
            Self {
                entry: stext as usize as u32,
                etext: etext as usize as u32,
                edata: edata as usize as u32,
                end: ekernel as usize as u32,
                kernbase: board::KERNBASE,
            }
        }
    }

    /// Drop into the monitor from a trap handler or an explicit debugging
    /// entry point.
    ///
    /// The session runs with S-mode interrupts off (the monitor is
    /// non-reentrant and must not be preempted mid-walk); the previous
    /// interrupt state is restored on the way out.
    pub fn enter(tf: Option<&TrapFrame>) {
        let sie_was_on = riscv::register::sstatus::read().sie();
        unsafe {
            riscv::register::sstatus::clear_sie();
        }

        log::info!("[kernel] entering monitor");
        let mem = RawMemory::new(board::KERNBASE, board::MEMORY_END);
        let symbols = KernelSymbols;
        let mut out = Stdout;
        let mut monitor = Monitor::new(&mut out, &mem, &symbols, KernelLayout::from_linker());
        monitor.set_walk_config(WalkConfig {
            stack_top: board::MEMORY_END,
            max_frames: MAX_BACKTRACE_FRAMES,
        });
        monitor.set_frame_pointer(current_frame_pointer());
        monitor.run(&mut SbiLineReader, tf);
        log::info!("[kernel] leaving monitor");

        if sie_was_on {
            unsafe {
                riscv::register::sstatus::set_sie();
            }
        }
    }
}

#[cfg(all(target_os = "none", target_arch = "riscv32"))]
pub use kernel::enter;
