mod ascii;
mod utf16;

pub use self::ascii::{Ascii, AsciiError};
pub use self::utf16::Utf16;
