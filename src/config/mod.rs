//! Corefile reading for k8s-event

mod corefile;
mod dispenser;

pub use corefile::extract;
pub use dispenser::{Dispenser, Token, tokenize};
