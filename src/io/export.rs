use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::{LedgerService, Statement};
use crate::domain::{AccountId, format_cents};

/// Statement document written by the JSON export
#[derive(Debug, Clone, Serialize)]
pub struct StatementSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub statement: Statement,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export accounts to CSV format
    pub async fn export_accounts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.list_accounts(None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "owner",
            "currency",
            "balance_cents",
            "balance",
            "created_at",
        ])?;

        let mut count = 0;
        for account in &accounts {
            csv_writer.write_record([
                account.id.to_string(),
                account.owner.clone(),
                account.currency.to_string(),
                account.balance_cents.to_string(),
                format_cents(account.balance_cents),
                account.created_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export one account's entries to CSV format, with a running balance
    pub async fn export_statement_csv<W: Write>(
        &self,
        account_id: AccountId,
        writer: W,
    ) -> Result<usize> {
        let statement = self.service.statement(account_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "entry_id",
            "created_at",
            "transfer_id",
            "amount_cents",
            "running_balance_cents",
        ])?;

        let mut running = 0i64;
        for entry in &statement.entries {
            running += entry.amount_cents;
            csv_writer.write_record([
                entry.id.to_string(),
                entry.created_at.to_rfc3339(),
                entry
                    .transfer_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                entry.amount_cents.to_string(),
                running.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(statement.entries.len())
    }

    /// Export one account's statement as a JSON document
    pub async fn export_statement_json<W: Write>(
        &self,
        account_id: AccountId,
        mut writer: W,
    ) -> Result<StatementSnapshot> {
        let statement = self.service.statement(account_id).await?;

        let snapshot = StatementSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            statement,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
