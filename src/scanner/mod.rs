mod directory;
pub mod exclusion;
mod jar;
pub mod trail;
mod walker;
mod war;

pub use self::directory::scan_directory;
pub use self::exclusion::{ExclusionPattern, compile_exclusions, find_exclusion};
pub use self::jar::{scan_archive, scan_jar_file};
pub use self::walker::{DependencyWalker, WalkOptions};
pub use self::war::{DependencyGraphResolver, DescriptorGraphResolver, GraphCache, scan_war_file};
