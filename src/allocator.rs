//! Memory Allocator Configuration
//!
//! Installs mimalloc as the global allocator of the binary.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
