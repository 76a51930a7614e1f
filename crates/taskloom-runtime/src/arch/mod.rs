//! Architecture-specific context switching
//!
//! Each architecture module defines `SavedContext` (the callee-saved
//! register block for its ABI), `init_context` and `swap_context`.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod x86_64;
        pub use x86_64::{init_context, swap_context, SavedContext};
    } else if #[cfg(target_arch = "aarch64")] {
        mod aarch64;
        pub use aarch64::{init_context, swap_context, SavedContext};
    } else {
        compile_error!("Unsupported architecture");
    }
}
