use crate::monitor::LineReader;
use crate::sbi::{console_getchar, console_putchar};
use core::fmt::{self, Write};

const CR: u8 = 0x0d;
const LF: u8 = 0x0a;
const BS: u8 = 0x08;
const DEL: u8 = 0x7f;
const EOT: u8 = 0x04;

pub struct Stdout;

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            console_putchar(c as usize);
        }
        Ok(())
    }
}

pub fn print(args: fmt::Arguments) {
    Stdout.write_fmt(args).unwrap();
}

#[macro_export]
macro_rules! print {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::print(format_args!($fmt $(, $($arg)+)?))
    }
}

#[macro_export]
macro_rules! println {
    () => {
        $crate::print!("\n")
    };
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::print(format_args!(concat!($fmt, "\n") $(, $($arg)+)?))
    }
}

/// Line editor over the SBI serial console.
///
/// Echoes input, supports backspace, and treats Ctrl-D on an empty line
/// as end of input. Bytes past the caller's buffer are dropped (still
/// echoed as a bell so the operator notices).
pub struct SbiLineReader;

impl LineReader for SbiLineReader {
    fn read_line<'b>(&mut self, prompt: &str, buf: &'b mut [u8]) -> Option<&'b str> {
        for c in prompt.chars() {
            console_putchar(c as usize);
        }
        let mut len = 0usize;
        loop {
            let c = loop {
                let c = console_getchar();
                if c != usize::MAX {
                    break c as u8;
                }
            };
            match c {
                CR | LF => {
                    console_putchar('\n' as usize);
                    // Whole buffer came from 7-bit serial input.
                    return Some(core::str::from_utf8(&buf[..len]).unwrap_or(""));
                }
                BS | DEL => {
                    if len > 0 {
                        len -= 1;
                        console_putchar(BS as usize);
                        console_putchar(' ' as usize);
                        console_putchar(BS as usize);
                    }
                }
                EOT if len == 0 => {
                    console_putchar('\n' as usize);
                    return None;
                }
                c if (b' '..DEL).contains(&c) || c == b'\t' => {
                    if len < buf.len() {
                        buf[len] = c;
                        len += 1;
                        console_putchar(c as usize);
                    } else {
                        console_putchar(0x07);
                    }
                }
                _ => {}
            }
        }
    }
}
