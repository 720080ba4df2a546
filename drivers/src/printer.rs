/*++

Licensed under the Apache-2.0 license.

File Name:

    printer.rs

Abstract:

    File contains support routines and macros for firmware logging.

--*/
use core::convert::Infallible;
use ufmt::{uDisplay, uWrite};

#[derive(Default)]
pub struct Printer;

impl uWrite for Printer {
    type Error = Infallible;

    /// Writes a string slice into this writer, returning whether the write succeeded.
    fn write_str(&mut self, _str: &str) -> Result<(), Self::Error> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "std")] {
                print!("{_str}");
            }
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! cprint {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwrite!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

#[macro_export]
macro_rules! cprintln {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwriteln!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

pub struct HexBytes<'a>(pub &'a [u8]);
impl uDisplay for HexBytes<'_> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        for &x in self.0.iter() {
            f.write_char(DIGITS[usize::from(x >> 4)] as char)?;
            f.write_char(DIGITS[usize::from(x & 0xf)] as char)?;
        }
        Ok(())
    }
}
