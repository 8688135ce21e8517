//! Outbound notification boundary.

use serde::{Deserialize, Serialize};

/// Channel a notification is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    General,
    Inventory,
    Health,
    Death,
    Spawn,
    Connection,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::General,
        Category::Inventory,
        Category::Health,
        Category::Death,
        Category::Spawn,
        Category::Connection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Inventory => "inventory",
            Category::Health => "health",
            Category::Death => "death",
            Category::Spawn => "spawn",
            Category::Connection => "connection",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort notification delivery.
///
/// Implementations must never block the caller and must swallow their own
/// failures (logging them is fine).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, category: Category, text: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serde_matches_display() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
        }
    }
}
