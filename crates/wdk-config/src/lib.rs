//! wdk-config
//!
//! Engine defaults: the per-stock parameters a new stock starts with and
//! the event page size used when assembling ledgers.  Loaded by a
//! layered merge of JSON/YAML files — later files override earlier ones,
//! field by field — with a SHA-256 hash of the effective config for
//! audit logs.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use wdk_numeric::Percent;

/// Effective engine defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineDefaults {
    /// Percent of a split buy allocated to Swing.
    pub swing_ratio_pct: Percent,
    /// Default PDP for new stocks.
    pub price_drop_pct: Percent,
    /// Default STP for new stocks.
    pub swing_take_profit_pct: Percent,
    /// Default HTP for new stocks.
    pub hold_take_profit_pct: Percent,
    /// Default commission percent.
    pub commission_pct: Percent,
    /// Page size for event-list assembly.
    pub event_page_size: usize,
}

impl EngineDefaults {
    pub fn sane_defaults() -> Self {
        Self {
            swing_ratio_pct: Percent::from_units(50),
            price_drop_pct: Percent::from_units(5),
            swing_take_profit_pct: Percent::from_units(10),
            hold_take_profit_pct: Percent::from_units(20),
            commission_pct: Percent::ZERO,
            event_page_size: 200,
        }
    }
}

/// One config layer as written on disk; every field optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsLayer {
    pub swing_ratio_pct: Option<f64>,
    pub price_drop_pct: Option<f64>,
    pub swing_take_profit_pct: Option<f64>,
    pub hold_take_profit_pct: Option<f64>,
    pub commission_pct: Option<f64>,
    pub event_page_size: Option<usize>,
}

impl DefaultsLayer {
    fn merge_over(self, base: DefaultsLayer) -> DefaultsLayer {
        DefaultsLayer {
            swing_ratio_pct: self.swing_ratio_pct.or(base.swing_ratio_pct),
            price_drop_pct: self.price_drop_pct.or(base.price_drop_pct),
            swing_take_profit_pct: self.swing_take_profit_pct.or(base.swing_take_profit_pct),
            hold_take_profit_pct: self.hold_take_profit_pct.or(base.hold_take_profit_pct),
            commission_pct: self.commission_pct.or(base.commission_pct),
            event_page_size: self.event_page_size.or(base.event_page_size),
        }
    }
}

fn pct_field(value: Option<f64>, fallback: Percent, field: &str) -> Result<Percent> {
    match value {
        None => Ok(fallback),
        Some(x) => {
            let pct = Percent::from_f64(x)
                .with_context(|| format!("config field {field}: {x} is not a finite percent"))?;
            if pct.is_negative() {
                bail!("config field {field}: must not be negative, got {x}");
            }
            Ok(pct)
        }
    }
}

/// Load and merge config layers in order (base first), falling back to
/// [`EngineDefaults::sane_defaults`] for anything left unset.
///
/// File format is chosen by extension: `.json`, or `.yaml`/`.yml`.
pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> Result<EngineDefaults> {
    let mut merged = DefaultsLayer::default();
    for path in paths {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config layer {}", path.display()))?;
        let layer: DefaultsLayer = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text)
                .with_context(|| format!("parse json config {}", path.display()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)
                .with_context(|| format!("parse yaml config {}", path.display()))?,
            other => bail!(
                "unsupported config extension {:?} for {}",
                other,
                path.display()
            ),
        };
        merged = layer.merge_over(merged);
    }

    let base = EngineDefaults::sane_defaults();
    let swing_ratio_pct = pct_field(merged.swing_ratio_pct, base.swing_ratio_pct, "swing_ratio_pct")?;
    if !swing_ratio_pct.is_valid_ratio() {
        bail!("config field swing_ratio_pct: must be within 0..=100");
    }
    Ok(EngineDefaults {
        swing_ratio_pct,
        price_drop_pct: pct_field(merged.price_drop_pct, base.price_drop_pct, "price_drop_pct")?,
        swing_take_profit_pct: pct_field(
            merged.swing_take_profit_pct,
            base.swing_take_profit_pct,
            "swing_take_profit_pct",
        )?,
        hold_take_profit_pct: pct_field(
            merged.hold_take_profit_pct,
            base.hold_take_profit_pct,
            "hold_take_profit_pct",
        )?,
        commission_pct: pct_field(merged.commission_pct, base.commission_pct, "commission_pct")?,
        event_page_size: merged.event_page_size.unwrap_or(base.event_page_size).max(1),
    })
}

/// SHA-256 over the canonical JSON of the effective defaults.
///
/// Keys are emitted in sorted order and values use the raw fixed-point
/// representation, so equal configs always hash equal.
pub fn config_hash(defaults: &EngineDefaults) -> String {
    let value = serde_json::json!({
        "swing_ratio_pct": defaults.swing_ratio_pct.raw(),
        "price_drop_pct": defaults.price_drop_pct.raw(),
        "swing_take_profit_pct": defaults.swing_take_profit_pct.raw(),
        "hold_take_profit_pct": defaults.hold_take_profit_pct.raw(),
        "commission_pct": defaults.commission_pct.raw(),
        "event_page_size": defaults.event_page_size,
    });
    let canonical = value.to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn empty_layer_list_yields_sane_defaults() {
        let loaded = load_layered::<&Path>(&[]).unwrap();
        assert_eq!(loaded, EngineDefaults::sane_defaults());
    }

    #[test]
    fn later_layer_overrides_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_file(&dir, "base.json", r#"{"swing_ratio_pct": 60.0, "commission_pct": 0.5}"#);
        let over = write_file(&dir, "override.yaml", "swing_ratio_pct: 70.0\n");
        let loaded = load_layered(&[base, over]).unwrap();
        assert_eq!(loaded.swing_ratio_pct, Percent::from_units(70));
        assert_eq!(loaded.commission_pct, Percent::from_f64(0.5).unwrap());
        // untouched fields fall back
        assert_eq!(loaded.event_page_size, 200);
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_file(&dir, "bad.json", r#"{"swing_ratio_pct": 130.0}"#);
        assert!(load_layered(&[bad]).is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_file(&dir, "bad.json", r#"{"swng_ratio_pct": 50.0}"#);
        assert!(load_layered(&[bad]).is_err());
    }

    #[test]
    fn hash_is_stable_and_sensitive() {
        let a = EngineDefaults::sane_defaults();
        let mut b = EngineDefaults::sane_defaults();
        assert_eq!(config_hash(&a), config_hash(&b));
        b.commission_pct = Percent::from_units(1);
        assert_ne!(config_hash(&a), config_hash(&b));
    }
}
