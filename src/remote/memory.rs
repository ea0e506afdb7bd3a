//! In-process [`RemoteStore`] backend.
//!
//! Implements the same sorted-set/set/string semantics as the remote store
//! over plain maps. Used by tests and by embedders that want the
//! remote-backed codecs without a network hop.

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::Result;
use crate::remote::store::{LexBound, RemoteStore};

#[derive(Default)]
struct Tables {
    /// Sorted sets: member -> score. Ordering is derived on read.
    zsets: AHashMap<String, BTreeMap<String, f64>>,
    /// Plain sets.
    sets: AHashMap<String, BTreeSet<String>>,
    /// Scalar strings.
    strings: AHashMap<String, String>,
}

/// An in-memory sorted-set/set/string store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Members of a sorted set ordered by (score, member), with scores.
    fn ordered_members(zset: &BTreeMap<String, f64>) -> Vec<(String, f64)> {
        let mut members: Vec<(String, f64)> = zset
            .iter()
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        members
    }
}

impl RemoteStore for MemoryStore {
    fn z_add_docs(&self, key: &str, docs: &[u32]) -> Result<()> {
        let mut tables = self.tables.write();
        let zset = tables.zsets.entry(key.to_string()).or_default();
        for doc in docs {
            zset.insert(doc.to_string(), *doc as f64);
        }
        Ok(())
    }

    fn z_add_members(&self, key: &str, members: &[String]) -> Result<()> {
        let mut tables = self.tables.write();
        let zset = tables.zsets.entry(key.to_string()).or_default();
        for member in members {
            zset.insert(member.clone(), 0.0);
        }
        Ok(())
    }

    fn s_add(&self, key: &str, members: &[String]) -> Result<()> {
        let mut tables = self.tables.write();
        let set = tables.sets.entry(key.to_string()).or_default();
        for member in members {
            set.insert(member.clone());
        }
        Ok(())
    }

    fn z_card(&self, key: &str) -> Result<u64> {
        let tables = self.tables.read();
        Ok(tables.zsets.get(key).map_or(0, |zset| zset.len() as u64))
    }

    fn z_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let tables = self.tables.read();
        let Some(zset) = tables.zsets.get(key) else {
            return Ok(Vec::new());
        };
        let members = Self::ordered_members(zset);
        let len = members.len() as i64;
        let resolve = |index: i64| -> i64 {
            if index < 0 { len + index } else { index }
        };
        let start = resolve(start).max(0);
        let stop = resolve(stop).min(len - 1);
        if start > stop || start >= len {
            return Ok(Vec::new());
        }
        Ok(members[start as usize..=stop as usize]
            .iter()
            .map(|(member, _)| member.clone())
            .collect())
    }

    fn z_range_by_score(
        &self,
        key: &str,
        after: Option<u32>,
        count: usize,
    ) -> Result<Vec<String>> {
        let tables = self.tables.read();
        let Some(zset) = tables.zsets.get(key) else {
            return Ok(Vec::new());
        };
        let min = after.map(|doc| doc as f64);
        Ok(Self::ordered_members(zset)
            .into_iter()
            .filter(|(_, score)| min.is_none_or(|min| *score > min))
            .take(count)
            .map(|(member, _)| member)
            .collect())
    }

    fn z_range_by_lex(
        &self,
        key: &str,
        min: LexBound,
        offset: usize,
        count: usize,
    ) -> Result<Vec<String>> {
        let tables = self.tables.read();
        let Some(zset) = tables.zsets.get(key) else {
            return Ok(Vec::new());
        };
        let mut members: Vec<&String> = zset.keys().collect();
        members.sort();
        Ok(members
            .into_iter()
            .filter(|member| match &min {
                LexBound::Unbounded => true,
                LexBound::Inclusive(bound) => member.as_str() >= bound.as_str(),
                LexBound::Exclusive(bound) => member.as_str() > bound.as_str(),
            })
            .skip(offset)
            .take(count)
            .cloned()
            .collect())
    }

    fn s_members(&self, key: &str) -> Result<Vec<String>> {
        let tables = self.tables.read();
        Ok(tables
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let tables = self.tables.read();
        Ok(tables.strings.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut tables = self.tables.write();
        tables.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
