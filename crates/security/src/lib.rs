//! Security module for Tether: filesystem confinement to the project root.
//!
//! Every path a tool touches goes through [`confine`] first. Paths are
//! compared component-wise after symlink resolution, so `../`, absolute
//! paths, sibling directories sharing a name prefix, and symlinks that point
//! out of the tree are all rejected.

pub mod path;

pub use path::{confine, display_path, ConfinementError};
