//! patchwatch-pkg: Package manager output parsing
//!
//! Turns the raw text of `apt list --upgradable` and `yum check-update`
//! into normalized [`UpdateRecord`]s.

pub mod apt;
pub mod traits;
pub mod types;
pub mod yum;

pub use apt::AptParser;
pub use traits::PackageParser;
pub use types::{PackageFamily, UpdateRecord};
pub use yum::YumParser;
