//! Query layer over the stored IPDO highlights.
//!
//! `HighlightStore` is the read contract the agent depends on. Every lookup
//! is keyed by report date and returns an empty list when the date has no
//! data; errors are reserved for the store itself being unusable.
//!
//! Record field names are serialized in Portuguese because the records are
//! handed to the reasoning service as-is and match the report vocabulary.

pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Load situation of a submarket.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoadStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "descricao")]
    pub description: Option<String>,
}

/// Energy transfer between submarkets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnergyTransfer {
    #[serde(default, rename = "submercado_origem")]
    pub origin: Option<String>,
    #[serde(default, rename = "submercado_destino")]
    pub destination: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "descricao")]
    pub description: Option<String>,
}

/// Generation highlight nested inside an operation record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationHighlight {
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "descricao")]
    pub description: Option<String>,
}

/// Operation highlights of one submarket on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationHighlight {
    #[serde(rename = "submercado", default = "unknown_submarket")]
    pub submarket: String,
    #[serde(rename = "carga", default)]
    pub load: LoadStatus,
    #[serde(rename = "restricoes", default)]
    pub restrictions: Vec<String>,
    #[serde(rename = "transferencia_energia", default)]
    pub transfer: EnergyTransfer,
    #[serde(rename = "geracao", default)]
    pub generation: Vec<GenerationHighlight>,
}

fn unknown_submarket() -> String {
    "Desconhecido".to_string()
}

/// Row of the generation table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationEntry {
    #[serde(rename = "submercado")]
    pub submarket: String,
    #[serde(rename = "tipo")]
    pub kind: String,
    pub status: Option<String>,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
}

/// Thermal unit that generated away from its schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalDeviation {
    #[serde(rename = "unidade_geradora")]
    pub unit: String,
    #[serde(rename = "desvio_mw")]
    pub deviation_mw: Option<f64>,
    #[serde(rename = "desvio_status")]
    pub deviation_status: String,
    #[serde(rename = "descricao")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationStatus {
    #[serde(rename = "tipo")]
    pub kind: String,
    pub status: Option<String>,
}

/// Compact per-submarket view of one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationSummary {
    #[serde(rename = "submercado")]
    pub submarket: String,
    #[serde(rename = "carga_status")]
    pub load_status: Option<String>,
    #[serde(rename = "transferencia_status")]
    pub transfer_status: Option<String>,
    #[serde(rename = "transferencia_origem")]
    pub transfer_origin: Option<String>,
    #[serde(rename = "transferencia_destino")]
    pub transfer_destination: Option<String>,
    #[serde(rename = "restricoes_qtd")]
    pub restriction_count: usize,
    #[serde(rename = "restricoes_amostra")]
    pub restriction_sample: Vec<String>,
    #[serde(rename = "geracao")]
    pub generation: Vec<GenerationStatus>,
}

/// Default sizes of the summary's inner lists.
pub const SUMMARY_RESTRICTION_SAMPLE: usize = 3;
pub const SUMMARY_GENERATION_ITEMS: usize = 5;

/// Read-only lookups over stored highlights.
#[async_trait]
pub trait HighlightStore: Send + Sync {
    /// Every date with operation data, most recent first.
    async fn list_available_dates(&self) -> Result<Vec<String>>;

    /// Operation highlights of a date, ordered by submarket.
    async fn lookup_operation(&self, date: &str) -> Result<Vec<OperationHighlight>>;

    /// Generation rows of a date, with exact-match submarket/type filters.
    async fn lookup_generation(
        &self,
        date: &str,
        submarket: Option<&str>,
        kind: Option<&str>,
    ) -> Result<Vec<GenerationEntry>>;

    /// Thermal deviations sorted by `desvio_mw` descending, nulls last.
    async fn lookup_thermal(
        &self,
        date: &str,
        limit: Option<usize>,
        deviation_status: Option<&str>,
    ) -> Result<Vec<ThermalDeviation>>;

    /// Summary per submarket. `submarket` is a case-insensitive contains
    /// filter; `item_limit` caps both inner lists.
    async fn lookup_operation_summary(
        &self,
        date: &str,
        submarket: Option<&str>,
        item_limit: Option<usize>,
    ) -> Result<Vec<OperationSummary>>;
}

/// Build the summary view from full operation records.
pub fn summarize(
    operations: &[OperationHighlight],
    submarket: Option<&str>,
    item_limit: Option<usize>,
) -> Vec<OperationSummary> {
    let restriction_cap = item_limit.unwrap_or(SUMMARY_RESTRICTION_SAMPLE);
    let generation_cap = item_limit.unwrap_or(SUMMARY_GENERATION_ITEMS);
    let needle = submarket.map(str::to_lowercase);

    operations
        .iter()
        .filter(|op| {
            needle
                .as_deref()
                .map_or(true, |n| op.submarket.to_lowercase().contains(n))
        })
        .map(|op| OperationSummary {
            submarket: op.submarket.clone(),
            load_status: op.load.status.clone(),
            transfer_status: op.transfer.status.clone(),
            transfer_origin: op.transfer.origin.clone(),
            transfer_destination: op.transfer.destination.clone(),
            restriction_count: op.restrictions.len(),
            restriction_sample: op.restrictions.iter().take(restriction_cap).cloned().collect(),
            generation: op
                .generation
                .iter()
                .take(generation_cap)
                .map(|g| GenerationStatus {
                    kind: g.kind.clone(),
                    status: g.status.clone(),
                })
                .collect(),
        })
        .collect()
}

/// In-memory store used by tests across the crate.
#[cfg(test)]
pub mod memory {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub struct MemoryStore {
        pub operations: BTreeMap<String, Vec<OperationHighlight>>,
        pub generation: BTreeMap<String, Vec<GenerationEntry>>,
        pub thermal: BTreeMap<String, Vec<ThermalDeviation>>,
        /// Makes every lookup fail, simulating an unreachable database.
        pub broken: AtomicBool,
    }

    impl MemoryStore {
        pub fn break_store(&self) {
            self.broken.store(true, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.broken.load(Ordering::SeqCst) {
                anyhow::bail!("database is unavailable");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl HighlightStore for MemoryStore {
        async fn list_available_dates(&self) -> Result<Vec<String>> {
            self.check()?;
            Ok(self.operations.keys().rev().cloned().collect())
        }

        async fn lookup_operation(&self, date: &str) -> Result<Vec<OperationHighlight>> {
            self.check()?;
            Ok(self.operations.get(date).cloned().unwrap_or_default())
        }

        async fn lookup_generation(
            &self,
            date: &str,
            submarket: Option<&str>,
            kind: Option<&str>,
        ) -> Result<Vec<GenerationEntry>> {
            self.check()?;
            Ok(self
                .generation
                .get(date)
                .into_iter()
                .flatten()
                .filter(|g| submarket.map_or(true, |s| g.submarket == s))
                .filter(|g| kind.map_or(true, |k| g.kind == k))
                .cloned()
                .collect())
        }

        async fn lookup_thermal(
            &self,
            date: &str,
            limit: Option<usize>,
            deviation_status: Option<&str>,
        ) -> Result<Vec<ThermalDeviation>> {
            self.check()?;
            let mut rows: Vec<ThermalDeviation> = self
                .thermal
                .get(date)
                .into_iter()
                .flatten()
                .filter(|t| deviation_status.map_or(true, |s| t.deviation_status == s))
                .cloned()
                .collect();
            rows.sort_by(|a, b| match (a.deviation_mw, b.deviation_mw) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
            if let Some(limit) = limit {
                rows.truncate(limit);
            }
            Ok(rows)
        }

        async fn lookup_operation_summary(
            &self,
            date: &str,
            submarket: Option<&str>,
            item_limit: Option<usize>,
        ) -> Result<Vec<OperationSummary>> {
            let operations = self.lookup_operation(date).await?;
            Ok(summarize(&operations, submarket, item_limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(submarket: &str, restrictions: &[&str], kinds: &[&str]) -> OperationHighlight {
        OperationHighlight {
            submarket: submarket.to_string(),
            load: LoadStatus {
                status: Some("Normal".into()),
                description: None,
            },
            restrictions: restrictions.iter().map(|s| s.to_string()).collect(),
            transfer: EnergyTransfer::default(),
            generation: kinds
                .iter()
                .map(|k| GenerationHighlight {
                    kind: k.to_string(),
                    status: Some("Acima".into()),
                    description: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_summarize_default_caps() {
        let ops = vec![operation(
            "Sul",
            &["a", "b", "c", "d"],
            &["Hidráulica", "Térmica", "Eólica", "Solar", "Nuclear", "Outra"],
        )];
        let summary = summarize(&ops, None, None);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].restriction_count, 4);
        assert_eq!(summary[0].restriction_sample, vec!["a", "b", "c"]);
        assert_eq!(summary[0].generation.len(), 5);
    }

    #[test]
    fn test_summarize_filters_submarket_case_insensitive() {
        let ops = vec![
            operation("Nordeste", &[], &[]),
            operation("Sudeste/Centro-Oeste", &[], &[]),
        ];
        let summary = summarize(&ops, Some("SUDESTE"), Some(1));
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].submarket, "Sudeste/Centro-Oeste");
    }

    #[test]
    fn test_operation_record_serializes_with_report_keys() {
        let value = serde_json::to_value(operation("Norte", &["x"], &["Solar"])).unwrap();
        assert_eq!(value["submercado"], "Norte");
        assert_eq!(value["carga"]["status"], "Normal");
        assert_eq!(value["restricoes"][0], "x");
        assert!(value["transferencia_energia"].get("submercado_origem").is_some());
        assert_eq!(value["geracao"][0]["tipo"], "Solar");
    }
}
