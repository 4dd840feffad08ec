//! Loading structured report files into the store.
//!
//! A report file is the JSON produced when an IPDO bulletin was structured:
//! an optional `data` field plus `destaques_operacao` and/or
//! `destaques_geracao_termica` arrays. Without `data`, the report date is
//! read from the file name (`IPDO-2024-05-10.json`, `ipdo_20240510.json`).

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

use crate::store::sqlite::SqliteStore;
use crate::store::{OperationHighlight, ThermalDeviation};

const FILE_NAME_DATE: &str = r"(\d{4})[._-]?(\d{1,2})[._-]?(\d{1,2})";

#[derive(Debug, Deserialize)]
struct ReportDocument {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    destaques_operacao: Option<Vec<OperationHighlight>>,
    #[serde(default)]
    destaques_geracao_termica: Option<Vec<ThermalImport>>,
}

/// Thermal item as found in report files. Older files carry a free-text
/// `desvio` instead of `desvio_mw`/`desvio_status`.
#[derive(Debug, Deserialize)]
struct ThermalImport {
    unidade_geradora: String,
    #[serde(default)]
    desvio_mw: Option<f64>,
    #[serde(default)]
    desvio_status: Option<String>,
    #[serde(default)]
    desvio: Option<String>,
    #[serde(default)]
    descricao: String,
}

impl ThermalImport {
    fn into_deviation(self) -> ThermalDeviation {
        let status = self
            .desvio_status
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| legacy_status(self.desvio.as_deref().unwrap_or_default()));
        ThermalDeviation {
            unit: self.unidade_geradora,
            deviation_mw: self.desvio_mw,
            deviation_status: status,
            description: self.descricao,
        }
    }
}

fn legacy_status(text: &str) -> String {
    let lower = text.to_lowercase();
    if lower.contains("acima") {
        "Acima".to_string()
    } else if lower.contains("abaixo") {
        "Abaixo".to_string()
    } else {
        "Sem desvio".to_string()
    }
}

/// What one imported file contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub date: String,
    pub generation_rows: usize,
    pub thermal_rows: usize,
}

/// Report date embedded in a file name, as `YYYY-MM-DD`.
pub fn date_from_file_name(name: &str) -> Result<Option<String>> {
    let pattern = Regex::new(FILE_NAME_DATE).context("Invalid file name date pattern")?;
    let Some(caps) = pattern.captures(name) else {
        return Ok(None);
    };
    let year: i32 = caps[1].parse()?;
    let month: u32 = caps[2].parse()?;
    let day: u32 = caps[3].parse()?;
    Ok(NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string()))
}

fn validate_date(date: &str) -> Result<String> {
    let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid report date '{date}' (expected YYYY-MM-DD)"))?;
    Ok(parsed.format("%Y-%m-%d").to_string())
}

/// Load one report file into the store.
pub async fn import_file(store: &SqliteStore, path: &Path) -> Result<ImportSummary> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report file: {}", path.display()))?;
    let document: ReportDocument = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse report file: {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let date = match document.data.as_deref() {
        Some(date) => validate_date(date)?,
        None => match date_from_file_name(&file_name)? {
            Some(date) => date,
            None => bail!("No report date in '{}' or its file name", path.display()),
        },
    };

    if document.destaques_operacao.is_none() && document.destaques_geracao_termica.is_none() {
        bail!(
            "'{}' has neither destaques_operacao nor destaques_geracao_termica",
            path.display()
        );
    }

    let mut summary = ImportSummary {
        date: date.clone(),
        generation_rows: 0,
        thermal_rows: 0,
    };
    if let Some(operations) = document.destaques_operacao {
        summary.generation_rows = store.save_operation_highlights(&date, &operations).await?;
    }
    if let Some(thermal) = document.destaques_geracao_termica {
        let items: Vec<ThermalDeviation> =
            thermal.into_iter().map(ThermalImport::into_deviation).collect();
        summary.thermal_rows = store.save_thermal_highlights(&date, &items).await?;
    }

    tracing::info!(
        file = %path.display(),
        date = %summary.date,
        generation_rows = summary.generation_rows,
        thermal_rows = summary.thermal_rows,
        "report imported"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HighlightStore;
    use tempfile::TempDir;

    #[test]
    fn test_date_from_file_name() {
        assert_eq!(
            date_from_file_name("IPDO-2024-05-10.json").unwrap().as_deref(),
            Some("2024-05-10")
        );
        assert_eq!(
            date_from_file_name("ipdo_2024.5.9_operacao.json").unwrap().as_deref(),
            Some("2024-05-09")
        );
        assert_eq!(
            date_from_file_name("20240131.json").unwrap().as_deref(),
            Some("2024-01-31")
        );
        assert_eq!(date_from_file_name("relatorio.json").unwrap(), None);
        assert_eq!(date_from_file_name("2024-13-40.json").unwrap(), None);
    }

    #[test]
    fn test_legacy_deviation_text() {
        assert_eq!(legacy_status("Geração ACIMA do programado"), "Acima");
        assert_eq!(legacy_status("abaixo"), "Abaixo");
        assert_eq!(legacy_status(""), "Sem desvio");
    }

    #[tokio::test]
    async fn test_import_report_file() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("ipdo.db")).await.unwrap();
        let path = dir.path().join("IPDO-2024-05-10_destaques.json");
        std::fs::write(
            &path,
            r#"{
                "destaques_operacao": [{
                    "submercado": "Nordeste",
                    "carga": {"status": "Normal"},
                    "restricoes": ["corte eólico"],
                    "geracao": [{"tipo": "Solar Fotovoltaica", "status": "Acima"}]
                }],
                "destaques_geracao_termica": [
                    {"unidade_geradora": "Pecém", "desvio_mw": 310.0,
                     "desvio_status": "Acima", "descricao": "Despacho por ordem de mérito"},
                    {"unidade_geradora": "Candiota", "desvio": "abaixo do programado",
                     "descricao": "Restrição de combustível"}
                ],
                "_metadata": {"fonte": "IPDO-2024-05-10.pdf"}
            }"#,
        )
        .unwrap();

        let summary = import_file(&store, &path).await.unwrap();
        assert_eq!(summary.date, "2024-05-10");
        assert_eq!(summary.thermal_rows, 2);

        let generation = store.lookup_generation("2024-05-10", None, Some("Solar")).await.unwrap();
        assert_eq!(generation.len(), 1);

        let thermal = store.lookup_thermal("2024-05-10", None, None).await.unwrap();
        assert_eq!(thermal[0].unit, "Pecém");
        assert_eq!(thermal[1].deviation_status, "Abaixo");
        assert_eq!(thermal[1].deviation_mw, None);
    }

    #[tokio::test]
    async fn test_import_rejects_file_without_date_or_sections() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("ipdo.db")).await.unwrap();

        let undated = dir.path().join("relatorio.json");
        std::fs::write(&undated, r#"{"destaques_operacao": []}"#).unwrap();
        assert!(import_file(&store, &undated).await.is_err());

        let empty = dir.path().join("2024-05-10.json");
        std::fs::write(&empty, r#"{"data": "2024-05-10"}"#).unwrap();
        assert!(import_file(&store, &empty).await.is_err());
    }
}
