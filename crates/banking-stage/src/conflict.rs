//! Account-conflict resolution: groups a batch by the set of accounts each
//! transaction touches so that disjoint groups can execute in parallel while
//! transactions sharing an account are serialized within their group.
//!
//! "Accounts touched" is approximated by a transaction's full signature set,
//! the same proxy `mev-protection` uses for account overlap.

use std::collections::HashSet;

use shared_types::entities::{Signature, Transaction};

/// A group of transactions that must execute serially relative to each
/// other, because they share at least one account.
pub struct ConflictGroup {
    pub accounts: HashSet<Signature>,
    pub transactions: Vec<Transaction>,
}

/// Partition `batch` into conflict groups. Disjoint groups touch no common
/// account and may run in parallel; transactions within a group run in
/// arrival order.
pub fn group(batch: Vec<Transaction>) -> Vec<ConflictGroup> {
    let mut groups: Vec<ConflictGroup> = Vec::new();

    for tx in batch {
        let tx_accounts: HashSet<Signature> = tx.signatures.iter().copied().collect();

        let mut matched: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.accounts.is_disjoint(&tx_accounts))
            .map(|(i, _)| i)
            .collect();

        if matched.is_empty() {
            groups.push(ConflictGroup {
                accounts: tx_accounts,
                transactions: vec![tx],
            });
            continue;
        }

        // Merge every matched group into the first, since the new
        // transaction bridges them all into one conflict set.
        let primary = matched.remove(0);
        for idx in matched.into_iter().rev() {
            let merged = groups.swap_remove(idx);
            groups[primary].accounts.extend(merged.accounts);
            groups[primary].transactions.extend(merged.transactions);
        }
        groups[primary].accounts.extend(tx_accounts);
        groups[primary].transactions.push(tx);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(sigs: &[u8]) -> Transaction {
        Transaction::new(sigs.iter().map(|&s| [s; 64]).collect(), vec![])
    }

    #[test]
    fn disjoint_transactions_land_in_separate_groups() {
        let batch = vec![tx(&[1]), tx(&[2]), tx(&[3])];
        let groups = group(batch);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn overlapping_transactions_share_a_group() {
        let batch = vec![tx(&[1, 9]), tx(&[2, 9])];
        let groups = group(batch);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].transactions.len(), 2);
    }

    #[test]
    fn a_bridging_transaction_merges_two_groups() {
        let batch = vec![tx(&[1]), tx(&[2]), tx(&[1, 2])];
        let groups = group(batch);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].transactions.len(), 3);
    }
}
