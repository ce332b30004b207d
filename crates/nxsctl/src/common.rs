use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use nxs_create::{FsSink, TemplateCatalog};
use nxs_device::SnapshotBus;
use nxs_xml::StrategyMode;

pub fn make_sink(directory: &Path, prefix: Option<&str>) -> FsSink {
    FsSink::new(directory, prefix)
}

/// Load the offline bus snapshot, if one was supplied.
pub fn load_bus(path: Option<&Path>) -> Result<Option<SnapshotBus>> {
    match path {
        Some(path) => {
            let bus = SnapshotBus::from_file(path)
                .with_context(|| format!("load bus snapshot {}", path.display()))?;
            Ok(Some(bus))
        }
        None => Ok(None),
    }
}

/// The built-in template catalog, with an optional directory layered on top.
pub fn load_templates(dir: Option<&Path>) -> Result<TemplateCatalog> {
    let mut catalog = TemplateCatalog::default();
    if let Some(dir) = dir {
        catalog
            .load_dir(dir)
            .with_context(|| format!("load template directory {}", dir.display()))?;
    }
    Ok(catalog)
}

pub fn parse_mode(value: &str) -> Result<StrategyMode> {
    StrategyMode::parse(value)
        .with_context(|| format!("unknown strategy mode '{value}' (INIT, STEP, FINAL, POSTRUN)"))
}

/// Fold a flat `name value name value ...` list into pairs.
pub fn pair_values(values: &[String]) -> Result<Vec<(String, String)>> {
    if values.len() % 2 != 0 {
        bail!(
            "expected 'name value' pairs, got an odd number of arguments ({})",
            values.len()
        );
    }
    Ok(values
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialise JSON output")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{pair_values, parse_mode};
    use nxs_xml::StrategyMode;

    #[test]
    fn pairs_fold_in_order() {
        let values: Vec<String> = ["a", "1", "b", "2"].iter().map(|s| s.to_string()).collect();
        let pairs = pair_values(&values).expect("pairs");
        assert_eq!(
            pairs,
            vec![("a".into(), "1".into()), ("b".into(), "2".into())]
        );
    }

    #[test]
    fn odd_pair_count_fails() {
        let values: Vec<String> = ["a"].iter().map(|s| s.to_string()).collect();
        assert!(pair_values(&values).is_err());
    }

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!(parse_mode("step").expect("mode"), StrategyMode::Step);
        assert_eq!(parse_mode("POSTRUN").expect("mode"), StrategyMode::PostRun);
        assert!(parse_mode("never").is_err());
    }
}
