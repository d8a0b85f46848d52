//! Global allocator.
//!
//! Building and applying a template allocates one buffer per file from many
//! worker threads at once; mimalloc keeps those allocations thread-local.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
