// SPDX-License-Identifier: Apache-2.0

//! Printk implementation for Rust.
//!
//! This uses the kernel's `k_str_out` to write to the console.

use core::fmt::{write, Arguments, Result, Write};

/// Print to the kernel console, without a newline.
///
/// This macro uses the same syntax as std's [`format!`], but writes to the kernel console
/// instead.
///
/// To avoid allocation, the output is written in chunks of a small buffer that resides on the
/// stack, so output from concurrent tasks may interleave at that granularity.
///
/// [`format!`]: https://doc.rust-lang.org/stable/std/macro.format.html
#[macro_export]
macro_rules! printk {
    ($($arg:tt)*) => {{
        $crate::printk::printk(format_args!($($arg)*));
    }};
}

/// Print to the kernel console, with a newline.
///
/// This macro uses the same syntax as std's [`format!`], but writes to the kernel console
/// instead.  See `std::fmt` for more information.
///
/// [`format!`]: https://doc.rust-lang.org/stable/std/macro.format.html
#[macro_export]
macro_rules! printkln {
    ($($arg:tt)*) => {{
        $crate::printk::printkln(format_args!($($arg)*));
    }};
}

/// The buffer size for a console write.  This is a tradeoff between efficiency (large buffers
/// need fewer calls) and needing more stack space.
const BUF_SIZE: usize = 32;

struct Context<F: FnMut(&[u8])> {
    // How many characters are used in the buffer.
    count: usize,
    // Bytes written.
    buf: [u8; BUF_SIZE],
    out: F,
}

fn utf8_byte_length(byte: u8) -> usize {
    if byte & 0b1000_0000 == 0 {
        // Single byte (0xxxxxxx)
        1
    } else if byte & 0b1110_0000 == 0b1100_0000 {
        // Two-byte sequence (110xxxxx)
        2
    } else if byte & 0b1111_0000 == 0b1110_0000 {
        // Three-byte sequence (1110xxxx)
        3
    } else if byte & 0b1111_1000 == 0b1111_0000 {
        // Four-byte sequence (11110xxx)
        4
    } else {
        // Continuation byte or invalid (10xxxxxx)
        1
    }
}

impl<F: FnMut(&[u8])> Context<F> {
    fn new(out: F) -> Context<F> {
        Context {
            count: 0,
            buf: [0; BUF_SIZE],
            out,
        }
    }

    fn add_byte(&mut self, b: u8) {
        // Ensure we have room for an entire UTF-8 sequence.
        if self.count + utf8_byte_length(b) > self.buf.len() {
            self.flush();
        }

        self.buf[self.count] = b;
        self.count += 1;
    }

    fn flush(&mut self) {
        if self.count > 0 {
            (self.out)(&self.buf[..self.count]);
            self.count = 0;
        }
    }
}

impl<F: FnMut(&[u8])> Write for Context<F> {
    fn write_str(&mut self, s: &str) -> Result {
        for b in s.bytes() {
            self.add_byte(b);
        }
        Ok(())
    }
}

fn format_to<F: FnMut(&[u8])>(out: F, args: Arguments<'_>, newline: bool) {
    let mut context = Context::new(out);
    // The context itself never fails, only a Display impl could.  Print what was produced.
    let _ = write(&mut context, args);
    if newline {
        context.add_byte(b'\n');
    }
    context.flush();
}

#[doc(hidden)]
pub fn printk(args: Arguments<'_>) {
    format_to(crate::raw::k_str_out, args, false);
}

#[doc(hidden)]
pub fn printkln(args: Arguments<'_>) {
    format_to(crate::raw::k_str_out, args, true);
}
