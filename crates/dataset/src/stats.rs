use chrono::Duration;
use foundation::Timestamp;
use serde::Serialize;

use crate::category::Category;
use crate::node::Node;

/// Headline counters shown above the map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub total: usize,
    pub clients: usize,
    pub repeaters: usize,
    pub room_servers: usize,
    pub sensors: usize,
    pub unknown: usize,
    /// Inserted within the last 24 hours.
    pub added_24h: usize,
    pub added_7d: usize,
    pub added_30d: usize,
}

impl NodeStats {
    /// `now` is passed in so the result does not depend on the wall clock.
    pub fn compute(nodes: &[Node], now: Timestamp) -> Self {
        let day = now - Duration::days(1);
        let week = now - Duration::days(7);
        let month = now - Duration::days(30);

        let mut s = NodeStats {
            total: nodes.len(),
            ..NodeStats::default()
        };
        for node in nodes {
            match node.category() {
                Category::Client => s.clients += 1,
                Category::Repeater => s.repeaters += 1,
                Category::RoomServer => s.room_servers += 1,
                Category::Sensor => s.sensors += 1,
                Category::Unknown(_) => s.unknown += 1,
            }
            let inserted = node.inserted_at();
            if inserted > day {
                s.added_24h += 1;
            }
            if inserted > week {
                s.added_7d += 1;
            }
            if inserted > month {
                s.added_30d += 1;
            }
        }
        s
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Client => self.clients,
            Category::Repeater => self.repeaters,
            Category::RoomServer => self.room_servers,
            Category::Sensor => self.sensors,
            Category::Unknown(_) => self.unknown,
        }
    }
}
