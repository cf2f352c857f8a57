use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Logical destination category derived from the object-type label.
/// Never stored on the record; only selects the target collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Bus,
    Vehicle,
    Other,
}

impl Category {
    /// Parse a category label as used in query parameters
    pub fn parse_label(label: &str) -> Category {
        match label.to_lowercase().as_str() {
            "bus" => Category::Bus,
            "vehicle" => Category::Vehicle,
            _ => Category::Other,
        }
    }

    /// Destination collection for records of this category
    pub fn collection_name(&self) -> &'static str {
        match self {
            Category::Bus => "bus_detections",
            Category::Vehicle => "vehicle_detections",
            Category::Other => "other_detections",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Bus => write!(f, "bus"),
            Category::Vehicle => write!(f, "vehicle"),
            Category::Other => write!(f, "other"),
        }
    }
}

/// Map a free-text object-type label to its category. Case-insensitive,
/// total. "cup" is kept deliberately: the upstream detector emits it for
/// a mislabeled vehicle class and existing data depends on the routing.
pub fn classify(object_type: &str) -> Category {
    match object_type.to_lowercase().as_str() {
        "bus" => Category::Bus,
        "car" | "truck" | "motorcycle" | "cup" => Category::Vehicle,
        _ => Category::Other,
    }
}
