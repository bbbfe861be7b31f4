//! Code for handling IDs
use std::sync::Arc;

macro_rules! define_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            serde::Deserialize,
            Debug,
            serde::Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Arc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(Arc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(Arc::from(s))
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(Arc::from(id))
            }

            /// The ID as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id_type!(
    /// Identifies a crop (e.g. "corn")
    CropID
);

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_lookup_by_str() {
        let map: IndexMap<CropID, u32> = [("corn".into(), 4), ("rice".into(), 6)]
            .into_iter()
            .collect();
        assert_eq!(map.get("rice"), Some(&6));
        assert_eq!(map.get("barley"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(CropID::new("wheat").to_string(), "wheat");
    }
}
