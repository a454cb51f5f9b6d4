//! Shared pool of server-side resources created during setup

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Opaque identifier assigned by the target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an identifier from a JSON string or number
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            JsonValue::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// Read an identifier from the last path segment of a `Location` header
    pub fn from_location(location: &str) -> Option<Self> {
        location
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| Self(segment.to_string()))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable, cheaply clonable sequence of identifiers shared by all VUs
#[derive(Debug, Clone)]
pub struct ResourcePool {
    ids: Arc<[ResourceId]>,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::empty()
    }
}

impl ResourcePool {
    pub fn new(ids: Vec<ResourceId>) -> Self {
        Self { ids: ids.into() }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResourceId> {
        self.ids.get(index)
    }

    /// Slot owned by VU `vu` (1-based) under dedicated binding
    pub fn dedicated(&self, vu: u32) -> Option<&ResourceId> {
        let index = (vu as usize).checked_sub(1)?;
        self.ids.get(index)
    }

    /// Uniform pick for random binding
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&ResourceId> {
        if self.ids.is_empty() {
            return None;
        }
        self.ids.get(rng.random_range(0..self.ids.len()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceId> {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    #[test]
    fn test_id_from_json() {
        assert_eq!(ResourceId::from_json(&json!("abc")), Some(ResourceId::new("abc")));
        assert_eq!(ResourceId::from_json(&json!(42)), Some(ResourceId::new("42")));
        assert_eq!(ResourceId::from_json(&json!("")), None);
        assert_eq!(ResourceId::from_json(&json!(null)), None);
        assert_eq!(ResourceId::from_json(&json!({"id": 1})), None);
    }

    #[test]
    fn test_id_from_location() {
        assert_eq!(
            ResourceId::from_location("http://localhost:3000/users/17"),
            Some(ResourceId::new("17"))
        );
        assert_eq!(ResourceId::from_location("/users/ab-cd/"), Some(ResourceId::new("ab-cd")));
        assert_eq!(ResourceId::from_location(""), None);
    }

    #[test]
    fn test_dedicated_slots_are_one_based() {
        let pool = ResourcePool::new(vec![ResourceId::new("a"), ResourceId::new("b")]);
        assert_eq!(pool.dedicated(0), None);
        assert_eq!(pool.dedicated(1), Some(&ResourceId::new("a")));
        assert_eq!(pool.dedicated(2), Some(&ResourceId::new("b")));
        assert_eq!(pool.dedicated(3), None);
    }

    #[test]
    fn test_pick_stays_in_pool() {
        let pool = ResourcePool::new((0..5).map(|i| ResourceId::new(i.to_string())).collect());
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let id = pool.pick(&mut rng).unwrap();
            assert!(pool.iter().any(|candidate| candidate == id));
        }
        assert!(ResourcePool::empty().pick(&mut rng).is_none());
    }
}
