//! Classification of parsed entities against stored sync records.

use std::collections::{BTreeMap, HashSet};

use plansync_core::{Classification, ClassifiedItem, Entity};
use plansync_state::{sort_ids, StateRecord};

/// Classify `parsed` against `stored`.
///
/// Parsed items come first, in input order, each carrying its fresh
/// fingerprint and the stored external ID (if any). Stored IDs that were not
/// parsed follow as ORPHANED, in numeric-aware ID order, with only their
/// stored fingerprint and external ID.
pub fn classify<T, F>(
    parsed: &[T],
    stored: &BTreeMap<String, StateRecord>,
    fingerprint: F,
) -> Vec<ClassifiedItem<T>>
where
    T: Entity + Clone,
    F: Fn(&T) -> String,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(parsed.len());

    for item in parsed {
        let id = item.id();
        seen.insert(id);
        let content_hash = fingerprint(item);
        let prior = stored.get(id);

        let classification = match prior {
            Some(record) if !record.content_hash.is_empty() => {
                if record.content_hash == content_hash {
                    Classification::Unchanged
                } else {
                    Classification::Changed
                }
            }
            _ => Classification::New,
        };
        tracing::debug!("{id}: {classification} ({content_hash})");

        out.push(ClassifiedItem {
            id: id.to_owned(),
            classification,
            content_hash,
            devops_id: prior.and_then(|r| r.devops_id.clone()),
            entity: Some(item.clone()),
        });
    }

    let mut orphans: Vec<&String> = stored
        .keys()
        .filter(|id| !seen.contains(id.as_str()))
        .collect();
    sort_ids(&mut orphans);
    for id in orphans {
        let record = &stored[id];
        tracing::debug!("{id}: ORPHANED");
        out.push(ClassifiedItem {
            id: id.clone(),
            classification: Classification::Orphaned,
            content_hash: record.content_hash.clone(),
            devops_id: record.devops_id.clone(),
            entity: None,
        });
    }

    out
}
