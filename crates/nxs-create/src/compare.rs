//! Inventory reconciliation.
//!
//! Loads two inventories and reports structural drift: entries present on
//! one side only and entries whose fields differ. Matching is greedy: for
//! each name present on both sides, every first-side entry claims the first
//! unclaimed second-side entry it matches exactly. An earlier greedy choice
//! can consume the better counterpart of a later entry, so the diff is
//! order-dependent rather than minimum-cost; callers rely on the stable
//! positional behavior.

use std::collections::BTreeMap;
use std::fmt;

use nxs_device::{load_inventory, Device};
use serde::Serialize;

use crate::CreateError;

/// Field differences of one failed pairing attempt.
#[derive(Debug, Clone, Serialize)]
pub struct EntryDiff {
    /// Device name shared by the paired entries.
    pub name: String,
    /// Differing fields: `field -> (first value, second value)`.
    pub fields: BTreeMap<&'static str, (String, String)>,
}

/// Outcome of comparing two inventories.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompareReport {
    /// Entries present in the first inventory only.
    pub only_first: Vec<Device>,
    /// Entries present in the second inventory only.
    pub only_second: Vec<Device>,
    /// Field diffs recorded by failed pairing attempts.
    pub diffs: Vec<EntryDiff>,
}

impl CompareReport {
    /// Whether the inventories matched entirely.
    pub fn is_empty(&self) -> bool {
        self.only_first.is_empty() && self.only_second.is_empty() && self.diffs.is_empty()
    }
}

impl fmt::Display for CompareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "inventories match");
        }
        if !self.only_first.is_empty() {
            writeln!(f, "only in first:")?;
            for device in &self.only_first {
                writeln!(f, "  {} ({}) {}", device.name, device.module, device.control_address)?;
            }
        }
        if !self.only_second.is_empty() {
            writeln!(f, "only in second:")?;
            for device in &self.only_second {
                writeln!(f, "  {} ({}) {}", device.name, device.module, device.control_address)?;
            }
        }
        if !self.diffs.is_empty() {
            writeln!(f, "differing:")?;
            for diff in &self.diffs {
                write!(f, "  {}:", diff.name)?;
                for (field, (a, b)) in &diff.fields {
                    write!(f, " {field}: '{a}' | '{b}'")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Compare two inventory documents.
pub fn compare_inventories(first: &str, second: &str) -> Result<CompareReport, CreateError> {
    let first = group_by_name(load_inventory(first)?);
    let mut second = group_by_name(load_inventory(second)?);

    let mut report = CompareReport::default();
    for (name, list_a) in first {
        let Some(list_b) = second.remove(&name) else {
            report.only_first.extend(list_a);
            continue;
        };
        pair_entries(&name, list_a, list_b, &mut report);
    }
    for (_, list_b) in second {
        report.only_second.extend(list_b);
    }
    Ok(report)
}

fn group_by_name(devices: Vec<Device>) -> BTreeMap<String, Vec<Device>> {
    let mut out: BTreeMap<String, Vec<Device>> = BTreeMap::new();
    for device in devices {
        out.entry(device.name.clone()).or_default().push(device);
    }
    out
}

fn pair_entries(name: &str, list_a: Vec<Device>, list_b: Vec<Device>, report: &mut CompareReport) {
    let mut claimed = vec![false; list_b.len()];
    for a in list_a {
        let mut matched = false;
        for (index, b) in list_b.iter().enumerate() {
            if claimed[index] {
                continue;
            }
            let diff = a.diff(b);
            if diff.is_empty() {
                claimed[index] = true;
                matched = true;
                break;
            }
            report.diffs.push(EntryDiff {
                name: name.to_string(),
                fields: diff,
            });
        }
        if !matched {
            report.only_first.push(a);
        }
    }
    for (index, b) in list_b.into_iter().enumerate() {
        if !claimed[index] {
            report.only_second.push(b);
        }
    }
}
