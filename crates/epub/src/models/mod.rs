mod cover;
mod manifest;
mod metadata;

pub use self::cover::{CoverCandidate, CoverSelection, CoverSource};
pub use self::manifest::ManifestItem;
pub use self::metadata::{MetadataFields, MetadataUpdate};
