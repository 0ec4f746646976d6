use tracing::debug;

use crate::capture::InterfaceDescriptor;
use crate::merge::config::DedupMode;

/// Result of unifying the inputs' interface lists.
#[derive(Debug, Clone, Default)]
pub struct MergedInterfaces {
    pub interfaces: Vec<InterfaceDescriptor>,
    /// Per input: local interface index to merged interface index.
    pub maps: Vec<Vec<u32>>,
}

/// Whether two interfaces describe the same capture interface.
///
/// The mandatory fields must match exactly. An optional attribute only
/// counts against equivalence when both sides carry it with different
/// values. Filters and statistics are never compared.
pub fn is_duplicate(a: &InterfaceDescriptor, b: &InterfaceDescriptor) -> bool {
    if a.encapsulation != b.encapsulation
        || a.link_type != b.link_type
        || a.time_units_per_second != b.time_units_per_second
        || a.tsprecision != b.tsprecision
        || a.snaplen != b.snaplen
    {
        return false;
    }

    compatible(&a.speed, &b.speed)
        && compatible(&a.tsresol, &b.tsresol)
        && compatible(&a.fcslen, &b.fcslen)
        && compatible(&a.comment, &b.comment)
        && compatible(&a.name, &b.name)
        && compatible(&a.description, &b.description)
        && compatible(&a.os, &b.os)
}

fn compatible<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Builds the merged interface set and each input's index map.
pub fn merge_interfaces(lists: &[&[InterfaceDescriptor]], mode: DedupMode) -> MergedInterfaces {
    if mode == DedupMode::AllSame {
        if all_lists_match(lists) {
            debug!("All inputs share the same interfaces; reusing the first input's list");
            return MergedInterfaces {
                interfaces: lists
                    .first()
                    .map(|first| first.iter().map(InterfaceDescriptor::clone_for_merge).collect())
                    .unwrap_or_default(),
                maps: lists
                    .iter()
                    .map(|list| (0..list.len() as u32).collect())
                    .collect(),
            };
        }
        debug!("Input interface lists differ; merging interfaces individually");
    }

    let search = mode != DedupMode::None;
    let mut merged: Vec<InterfaceDescriptor> = Vec::new();
    let mut maps = Vec::with_capacity(lists.len());

    for list in lists {
        let mut map = Vec::with_capacity(list.len());
        for interface in list.iter() {
            let existing = if search {
                merged.iter().position(|m| is_duplicate(m, interface))
            } else {
                None
            };

            let index = match existing {
                Some(index) => index,
                None => {
                    merged.push(interface.clone_for_merge());
                    merged.len() - 1
                }
            };
            map.push(index as u32);
        }
        maps.push(map);
    }

    MergedInterfaces {
        interfaces: merged,
        maps,
    }
}

/// True when every list matches the first one position by position.
fn all_lists_match(lists: &[&[InterfaceDescriptor]]) -> bool {
    let (first, rest) = match lists.split_first() {
        Some(split) => split,
        None => return true,
    };

    rest.iter().all(|list| {
        list.len() == first.len()
            && first
                .iter()
                .zip(list.iter())
                .all(|(a, b)| is_duplicate(a, b))
    })
}
