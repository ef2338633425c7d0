pub mod framework;
pub mod imports;
pub mod patch;
pub mod split;

pub use self::framework::{format_package_list, merge_framework_packages, normalize_version};
pub use self::imports::{
    ImportOptions, KnownExports, compute_imports, detect_missing_exports, format_imports,
    missing_export,
};
pub use self::patch::{ImportPolicy, ManifestPatcher, PatchOutcome, PatchedHeader};
pub use self::split::{Resolution, resolve};
