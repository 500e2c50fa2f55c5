mod cache;

pub use cache::{FamilyEntry, InstanceFamilyCache};
