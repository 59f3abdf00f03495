#![no_std]
extern crate alloc;

use core::mem;

pub use crate::entry::Entry;
pub use crate::error::Error;
pub use crate::header::Header;
pub use crate::layout::{generate_header, Layout, LayoutEntry};

mod entry;
mod error;
mod header;
mod layout;

pub const HEADER_SIZE: usize = mem::size_of::<Header>();
pub const ENTRY_SIZE: usize = mem::size_of::<Entry>();

/// Header sizes are rounded up to a multiple of this
pub const ALIGNMENT: usize = 0x10;

pub const MAGIC: [u8; 4] = *b"PFS0";
