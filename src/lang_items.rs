use core::panic::PanicInfo;

use crate::config::BACKTRACE_ARGS;
use crate::sbi::shutdown;
use crate::stack_trace::{FrameWalker, RawMemory, WalkConfig, current_frame_pointer};
use crate::symbol::{KernelSymbols, SymbolResolver};
use crate::{board, println};

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    if let Some(location) = info.location() {
        println!(
            "[kernel] Panicked at {}:{} {}",
            location.file(),
            location.line(),
            info.message()
        );
    } else {
        println!("[kernel] Panicked: {}", info.message());
    }
    print_backtrace();
    shutdown(true)
}

/// Dump the panicking context's own call chain, with symbol lines where
/// the kernel symbol table is loaded.
fn print_backtrace() {
    let mem = RawMemory::new(board::KERNBASE, board::MEMORY_END);
    let symbols = KernelSymbols;
    let mut walker = FrameWalker::new(
        &mem,
        current_frame_pointer(),
        WalkConfig {
            stack_top: board::MEMORY_END,
            ..WalkConfig::default()
        },
    );
    println!("Stack backtrace:");
    while let Some(frame) = walker.next() {
        crate::print!(
            "ebp {:08x} eip {:08x} args",
            frame.frame_pointer,
            frame.return_address
        );
        for i in 0..BACKTRACE_ARGS {
            crate::print!(" {:08x}", frame.args[i]);
        }
        println!();
        if let Some(info) = symbols.resolve(frame.return_address) {
            let name = info.fn_name.get(..info.fn_namelen).unwrap_or(info.fn_name);
            println!(
                "{}:{}: {}+{}",
                info.file,
                info.line,
                name,
                frame.return_address.wrapping_sub(info.fn_addr)
            );
        }
    }
    if walker.truncated() {
        println!(
            "(backtrace truncated after {} frames)",
            walker.frames_emitted()
        );
    }
}
