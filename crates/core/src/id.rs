//! Unique identifiers for offloaded work.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a Work Item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkId(Ulid);

impl WorkId {
    /// Generate a new WorkId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for WorkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for WorkId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_id_parses_its_display_form() {
        let id = WorkId::new();
        let parsed: WorkId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_work_ids_are_unique() {
        assert_ne!(WorkId::new(), WorkId::new());
    }

    #[test]
    fn test_work_id_rejects_garbage() {
        assert!("not-a-ulid".parse::<WorkId>().is_err());
    }
}
