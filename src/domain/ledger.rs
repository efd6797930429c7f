use std::fmt;

use super::{AccountId, Cents, Entry};

/// Order a pair of accounts for lock acquisition.
///
/// Every transaction that needs both rows locks the lower id first. Because all
/// transfers request locks in this one total order, no cycle of waiters can form
/// between two transfers moving money in opposite directions.
pub fn lock_order(a: AccountId, b: AccountId) -> (AccountId, AccountId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Balance of an account derived from its entries.
pub fn compute_balance(account_id: AccountId, entries: &[Entry]) -> Cents {
    entries
        .iter()
        .filter(|e| e.account_id == account_id)
        .map(|e| e.amount_cents)
        .sum()
}

/// Raw figures gathered from storage for an integrity check.
#[derive(Debug, Clone, Default)]
pub struct IntegrityStats {
    pub account_count: i64,
    pub transfer_count: i64,
    pub entry_count: i64,
    pub has_sequence_gaps: bool,
    pub unbalanced_transfers: i64,
    /// Sum of all entries that belong to a transfer
    pub transfer_entry_total: Cents,
    /// (account, stored balance, sum of its entries) where the two disagree
    pub balance_mismatches: Vec<(AccountId, Cents, Cents)>,
    pub negative_balances: Vec<(AccountId, Cents)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    SequenceGaps,
    UnbalancedTransfers(i64),
    TransferEntriesDoNotNet(Cents),
    BalanceMismatch {
        account_id: AccountId,
        balance: Cents,
        entry_total: Cents,
    },
    NegativeBalance {
        account_id: AccountId,
        balance: Cents,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::SequenceGaps => write!(f, "transfer sequence has gaps"),
            IntegrityIssue::UnbalancedTransfers(count) => {
                write!(f, "{} transfer(s) without a matching debit/credit pair", count)
            }
            IntegrityIssue::TransferEntriesDoNotNet(total) => {
                write!(f, "transfer entries sum to {} cents instead of 0", total)
            }
            IntegrityIssue::BalanceMismatch {
                account_id,
                balance,
                entry_total,
            } => write!(
                f,
                "account {} has balance {} cents but entries sum to {} cents",
                account_id, balance, entry_total
            ),
            IntegrityIssue::NegativeBalance {
                account_id,
                balance,
            } => write!(f, "account {} has negative balance {} cents", account_id, balance),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub account_count: i64,
    pub transfer_count: i64,
    pub entry_count: i64,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn build_integrity_report(stats: IntegrityStats) -> IntegrityReport {
    let mut issues = Vec::new();

    if stats.has_sequence_gaps {
        issues.push(IntegrityIssue::SequenceGaps);
    }
    if stats.unbalanced_transfers > 0 {
        issues.push(IntegrityIssue::UnbalancedTransfers(stats.unbalanced_transfers));
    }
    if stats.transfer_entry_total != 0 {
        issues.push(IntegrityIssue::TransferEntriesDoNotNet(stats.transfer_entry_total));
    }
    for (account_id, balance, entry_total) in stats.balance_mismatches {
        issues.push(IntegrityIssue::BalanceMismatch {
            account_id,
            balance,
            entry_total,
        });
    }
    for (account_id, balance) in stats.negative_balances {
        issues.push(IntegrityIssue::NegativeBalance {
            account_id,
            balance,
        });
    }

    IntegrityReport {
        account_count: stats.account_count,
        transfer_count: stats.transfer_count,
        entry_count: stats.entry_count,
        issues,
    }
}
