//! SQLite-backed highlight store.
//!
//! Holds the three report tables (`destaques_operacao`, `destaques_geracao`,
//! `destaques_geracao_termica`). Schema creation is idempotent and never
//! drops data.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;

use super::{
    summarize, EnergyTransfer, GenerationEntry, GenerationHighlight, HighlightStore, LoadStatus,
    OperationHighlight, OperationSummary, ThermalDeviation,
};

/// `ORDER BY` fragment giving the report's generation type order.
const GENERATION_ORDER: &str = "
    CASE tipo_geracao
        WHEN 'Hidráulica' THEN 1
        WHEN 'Térmica' THEN 2
        WHEN 'Eólica' THEN 3
        WHEN 'Solar' THEN 4
        WHEN 'Nuclear' THEN 5
        ELSE 99
    END,
    tipo_geracao";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the tables exist.
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        let store = Self { pool };
        store.init_schema().await?;
        tracing::debug!(path = %db_path.display(), "highlight store ready");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS destaques_geracao (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                data TEXT NOT NULL,
                submercado TEXT NOT NULL,
                tipo_geracao TEXT NOT NULL,
                status TEXT,
                descricao TEXT,
                UNIQUE(data, submercado, tipo_geracao)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create destaques_geracao table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS destaques_operacao (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                data TEXT NOT NULL,
                submercado TEXT NOT NULL,
                carga_status TEXT,
                carga_descricao TEXT,
                restricoes TEXT,
                transferencia_origem TEXT,
                transferencia_destino TEXT,
                transferencia_status TEXT,
                transferencia_descricao TEXT,
                UNIQUE(data, submercado)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create destaques_operacao table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS destaques_geracao_termica (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                data TEXT NOT NULL,
                unidade_geradora TEXT NOT NULL,
                desvio_mw REAL NULL,
                desvio_status TEXT NOT NULL,
                descricao TEXT NOT NULL,
                UNIQUE(data, unidade_geradora, descricao)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create destaques_geracao_termica table")?;

        Ok(())
    }

    /// Store operation highlights of one date, replacing rows already
    /// present for the same submarket and generation type.
    ///
    /// Returns the number of generation rows written.
    pub async fn save_operation_highlights(
        &self,
        date: &str,
        items: &[OperationHighlight],
    ) -> Result<usize> {
        if items.is_empty() {
            tracing::info!(date, "no operation highlights to save");
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;
        let mut generation_rows = 0;

        for item in items {
            let restrictions = serde_json::to_string(&item.restrictions)
                .context("Failed to encode restrictions")?;

            sqlx::query(
                r#"
                INSERT OR REPLACE INTO destaques_operacao
                    (data, submercado, carga_status, carga_descricao, restricoes,
                     transferencia_origem, transferencia_destino,
                     transferencia_status, transferencia_descricao)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(date)
            .bind(&item.submarket)
            .bind(&item.load.status)
            .bind(&item.load.description)
            .bind(restrictions)
            .bind(&item.transfer.origin)
            .bind(&item.transfer.destination)
            .bind(&item.transfer.status)
            .bind(&item.transfer.description)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to save operation for {}", item.submarket))?;

            for generation in &item.generation {
                sqlx::query(
                    r#"
                    INSERT OR REPLACE INTO destaques_geracao
                        (data, submercado, tipo_geracao, status, descricao)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(date)
                .bind(&item.submarket)
                .bind(canonical_generation_kind(&generation.kind))
                .bind(&generation.status)
                .bind(&generation.description)
                .execute(&mut *tx)
                .await
                .with_context(|| {
                    format!(
                        "Failed to save {} generation for {}",
                        generation.kind, item.submarket
                    )
                })?;
                generation_rows += 1;
            }
        }

        tx.commit().await.context("Failed to commit operation highlights")?;
        tracing::info!(
            date,
            submarkets = items.len(),
            generation_rows,
            "operation highlights saved"
        );
        Ok(generation_rows)
    }

    /// Store thermal deviations of one date. Duplicates are ignored.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn save_thermal_highlights(
        &self,
        date: &str,
        items: &[ThermalDeviation],
    ) -> Result<usize> {
        if items.is_empty() {
            tracing::info!(date, "no thermal highlights to save");
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;
        let mut inserted = 0;
        for item in items {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO destaques_geracao_termica
                    (data, unidade_geradora, desvio_mw, desvio_status, descricao)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(date)
            .bind(&item.unit)
            .bind(item.deviation_mw)
            .bind(&item.deviation_status)
            .bind(&item.description)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to save thermal highlight for {}", item.unit))?;
            inserted += result.rows_affected() as usize;
        }
        tx.commit().await.context("Failed to commit thermal highlights")?;

        tracing::info!(date, inserted, "thermal highlights saved");
        Ok(inserted)
    }

    async fn generation_of(&self, date: &str, submarket: &str) -> Result<Vec<GenerationHighlight>> {
        let sql = format!(
            "SELECT tipo_geracao, status, descricao
             FROM destaques_geracao
             WHERE data = ? AND submercado = ?
             ORDER BY {GENERATION_ORDER}"
        );
        let rows = sqlx::query(&sql)
            .bind(date)
            .bind(submarket)
            .fetch_all(&self.pool)
            .await
            .context("Failed to query generation highlights")?;

        rows.iter()
            .map(|row| -> Result<GenerationHighlight> {
                Ok(GenerationHighlight {
                    kind: row.try_get("tipo_geracao")?,
                    status: row.try_get("status")?,
                    description: row.try_get("descricao")?,
                })
            })
            .collect()
    }
}

/// The extraction step sometimes spells out the solar technology.
fn canonical_generation_kind(kind: &str) -> &str {
    match kind {
        "Solar Fotovoltaica" => "Solar",
        other => other,
    }
}

fn decode_restrictions(raw: Option<String>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Array(values)) => values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn thermal_from_row(row: &SqliteRow) -> Result<ThermalDeviation> {
    Ok(ThermalDeviation {
        unit: row.try_get("unidade_geradora")?,
        deviation_mw: row.try_get("desvio_mw")?,
        deviation_status: row.try_get("desvio_status")?,
        description: row.try_get("descricao")?,
    })
}

#[async_trait]
impl HighlightStore for SqliteStore {
    async fn list_available_dates(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT data FROM destaques_operacao ORDER BY data DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list dates")?;
        rows.iter()
            .map(|row| -> Result<String> { Ok(row.try_get("data")?) })
            .collect()
    }

    async fn lookup_operation(&self, date: &str) -> Result<Vec<OperationHighlight>> {
        let rows = sqlx::query(
            "SELECT * FROM destaques_operacao WHERE data = ? ORDER BY submercado",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query operation highlights")?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let submarket: String = row.try_get("submercado")?;
            let generation = self.generation_of(date, &submarket).await?;
            out.push(OperationHighlight {
                load: LoadStatus {
                    status: row.try_get("carga_status")?,
                    description: row.try_get("carga_descricao")?,
                },
                restrictions: decode_restrictions(row.try_get("restricoes")?),
                transfer: EnergyTransfer {
                    origin: row.try_get("transferencia_origem")?,
                    destination: row.try_get("transferencia_destino")?,
                    status: row.try_get("transferencia_status")?,
                    description: row.try_get("transferencia_descricao")?,
                },
                generation,
                submarket,
            });
        }
        Ok(out)
    }

    async fn lookup_generation(
        &self,
        date: &str,
        submarket: Option<&str>,
        kind: Option<&str>,
    ) -> Result<Vec<GenerationEntry>> {
        let mut sql = String::from(
            "SELECT submercado, tipo_geracao, status, descricao
             FROM destaques_geracao
             WHERE data = ?",
        );
        if submarket.is_some() {
            sql.push_str(" AND submercado = ?");
        }
        if kind.is_some() {
            sql.push_str(" AND tipo_geracao = ?");
        }
        sql.push_str(" ORDER BY submercado, tipo_geracao");

        let mut query = sqlx::query(&sql).bind(date);
        if let Some(submarket) = submarket {
            query = query.bind(submarket);
        }
        if let Some(kind) = kind {
            query = query.bind(kind);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to query generation")?;
        rows.iter()
            .map(|row| -> Result<GenerationEntry> {
                Ok(GenerationEntry {
                    submarket: row.try_get("submercado")?,
                    kind: row.try_get("tipo_geracao")?,
                    status: row.try_get("status")?,
                    description: row.try_get("descricao")?,
                })
            })
            .collect()
    }

    async fn lookup_thermal(
        &self,
        date: &str,
        limit: Option<usize>,
        deviation_status: Option<&str>,
    ) -> Result<Vec<ThermalDeviation>> {
        let mut sql = String::from(
            "SELECT unidade_geradora, desvio_mw, desvio_status, descricao
             FROM destaques_geracao_termica
             WHERE data = ?",
        );
        if deviation_status.is_some() {
            sql.push_str(" AND desvio_status = ?");
        }
        sql.push_str(" ORDER BY (desvio_mw IS NULL) ASC, desvio_mw DESC");
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql).bind(date);
        if let Some(status) = deviation_status {
            query = query.bind(status);
        }
        if let Some(limit) = limit {
            query = query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to query thermal highlights")?;
        rows.iter().map(thermal_from_row).collect()
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
