//! Query adapters.
//!
//! Typed wrappers around [`HighlightStore`] lookups. Each adapter applies
//! the filters the store does not support natively (case-insensitive
//! substring or equality matching) and truncates the final, filtered
//! result. A limit is always applied last.

use anyhow::Result;
use serde::Serialize;

use crate::store::{
    GenerationEntry, HighlightStore, OperationHighlight, OperationSummary, ThermalDeviation,
};

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn truncate<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationQuery {
    pub date: String,
    pub submarket: Option<String>,
}

pub async fn operation(
    store: &dyn HighlightStore,
    query: &OperationQuery,
) -> Result<Vec<OperationHighlight>> {
    let items = store.lookup_operation(&query.date).await?;
    Ok(match query.submarket.as_deref() {
        Some(submarket) => items
            .into_iter()
            .filter(|op| contains_ci(&op.submarket, submarket))
            .collect(),
        None => items,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationQuery {
    pub date: String,
    pub submarket: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

pub async fn generation(
    store: &dyn HighlightStore,
    query: &GenerationQuery,
) -> Result<Vec<GenerationEntry>> {
    let mut items = store
        .lookup_generation(
            &query.date,
            query.submarket.as_deref(),
            query.kind.as_deref(),
        )
        .await?;

    if let Some(status) = query.status.as_deref() {
        let wanted = status.to_lowercase();
        items.retain(|g| {
            g.status
                .as_deref()
                .map_or(false, |s| s.to_lowercase() == wanted)
        });
    }

    Ok(truncate(items, query.limit))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThermalQuery {
    pub date: String,
    pub limit: Option<usize>,
    pub unit: Option<String>,
    pub term: Option<String>,
    pub deviation_status: Option<String>,
}

pub async fn thermal(
    store: &dyn HighlightStore,
    query: &ThermalQuery,
) -> Result<Vec<ThermalDeviation>> {
    // With post-filters the store must not cut the list first, otherwise
    // matching rows past the limit would be lost.
    let has_post_filter = query.unit.is_some() || query.term.is_some();
    let store_limit = if has_post_filter { None } else { query.limit };

    let mut items = store
        .lookup_thermal(&query.date, store_limit, query.deviation_status.as_deref())
        .await?;

    if let Some(unit) = query.unit.as_deref() {
        items.retain(|t| contains_ci(&t.unit, unit));
    }
    if let Some(term) = query.term.as_deref() {
        items.retain(|t| contains_ci(&t.description, term));
    }

    Ok(truncate(items, query.limit))
}

/// A single restriction flattened out of an operation record.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Restriction {
    #[serde(rename = "submercado")]
    pub submarket: String,
    #[serde(rename = "restricao")]
    pub restriction: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestrictionsQuery {
    pub date: String,
    pub submarket: Option<String>,
    pub term: Option<String>,
    pub limit: Option<usize>,
}

pub async fn restrictions(
    store: &dyn HighlightStore,
    query: &RestrictionsQuery,
) -> Result<Vec<Restriction>> {
    let operations = operation(
        store,
        &OperationQuery {
            date: query.date.clone(),
            submarket: query.submarket.clone(),
        },
    )
    .await?;

    let flattened = operations.into_iter().flat_map(|op| {
        let submarket = op.submarket;
        op.restrictions.into_iter().map(move |restriction| Restriction {
            submarket: submarket.clone(),
            restriction,
        })
    });

    let items: Vec<Restriction> = match query.term.as_deref() {
        Some(term) => flattened
            .filter(|r| contains_ci(&r.restriction, term))
            .collect(),
        None => flattened.collect(),
    };

    Ok(truncate(items, query.limit))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryQuery {
    pub date: String,
    pub submarket: Option<String>,
    pub item_limit: Option<usize>,
}

pub async fn operation_summary(
    store: &dyn HighlightStore,
    query: &SummaryQuery,
) -> Result<Vec<OperationSummary>> {
    store
        .lookup_operation_summary(&query.date, query.submarket.as_deref(), query.item_limit)
        .await
}

pub async fn available_dates(store: &dyn HighlightStore) -> Result<Vec<String>> {
    store.list_available_dates().await
}

/// Fixture shared by adapter, tool and agent tests.
#[cfg(test)]
pub mod fixtures {
    use crate::store::memory::MemoryStore;
    use crate::store::{
        EnergyTransfer, GenerationEntry, GenerationHighlight, LoadStatus, OperationHighlight,
        ThermalDeviation,
    };

    pub const DATE: &str = "2024-05-10";

    fn generation(submarket: &str, kind: &str, status: &str) -> GenerationEntry {
        GenerationEntry {
            submarket: submarket.into(),
            kind: kind.into(),
            status: Some(status.into()),
            description: Some(format!("{kind} {status} no {submarket}")),
        }
    }

    fn op(submarket: &str, restrictions: &[&str]) -> OperationHighlight {
        OperationHighlight {
            submarket: submarket.into(),
            load: LoadStatus {
                status: Some("Normal".into()),
                description: Some("Carga dentro do previsto".into()),
            },
            restrictions: restrictions.iter().map(|s| s.to_string()).collect(),
            transfer: EnergyTransfer {
                origin: Some(submarket.into()),
                destination: Some("Sudeste".into()),
                status: Some("Exportador".into()),
                description: None,
            },
            generation: vec![GenerationHighlight {
                kind: "Eólica".into(),
                status: Some("Acima".into()),
                description: None,
            }],
        }
    }

    fn thermal(unit: &str, mw: Option<f64>, description: &str) -> ThermalDeviation {
        ThermalDeviation {
            unit: unit.into(),
            deviation_mw: mw,
            deviation_status: match mw {
                Some(v) if v > 0.0 => "Acima",
                Some(_) => "Abaixo",
                None => "Sem desvio",
            }
            .into(),
            description: description.into(),
        }
    }

    pub fn store() -> MemoryStore {
        let mut store = MemoryStore::default();
        store.operations.insert(
            DATE.into(),
            vec![
                op("Nordeste", &["frequência baixa", "corte eólico"]),
                op("Sudeste/Centro-Oeste", &["manutenção de linha"]),
                op("Sul", &[]),
            ],
        );
        store.operations.insert("2024-05-09".into(), vec![op("Norte", &[])]);
        store.generation.insert(
            DATE.into(),
            vec![
                generation("Nordeste", "Solar", "Acima"),
                generation("Nordeste", "Eólica", "Acima"),
                generation("Sudeste/Centro-Oeste", "Solar", "acima"),
                generation("Sudeste/Centro-Oeste", "Solar", "Inferior"),
                generation("Sul", "Solar", "Sem desvio"),
                generation("Sul", "Hidráulica", "Acima"),
            ],
        );
        // Insertion order deliberately differs from the deviation order.
        store.thermal.insert(
            DATE.into(),
            vec![
                thermal("UTE Candiota", Some(15.0), "Restrição elétrica"),
                thermal("UTE Pecém", Some(310.0), "Despacho por ordem de mérito"),
                thermal("UTE Santa Cruz", None, "Sem informação de desvio"),
                thermal("UTE Parnaíba", Some(120.5), "Restrição de gás"),
                thermal("UTE Angra", Some(-30.0), "Manutenção"),
            ],
        );
        store
    }
}
