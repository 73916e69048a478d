//! Control operation handlers.

pub mod calls;
pub mod namespaces;
pub mod rules;
pub mod system;
