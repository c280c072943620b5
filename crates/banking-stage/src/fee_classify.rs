//! Fee classification stage: reads the fee each transaction attaches,
//! records it into the fee market's rolling window, and drops transactions
//! that don't clear the configured floor.
//!
//! Like [`crate::verification`], this is the one other place the banking
//! stage looks inside the otherwise-opaque message body: bytes `[32, 40)`
//! carry the fee as a little-endian `u64`, immediately after the fee
//! payer's public key. Transactions too short to carry a fee are treated
//! as attaching a fee of zero.

use fee_market::{FeeMarket, FeeTier};
use shared_types::entities::Transaction;

use crate::errors::RejectReason;

const FEE_OFFSET: usize = 32;
const FEE_WIDTH: usize = 8;

/// A transaction paired with its classified fee tier, for stages further
/// down the pipeline that want to prioritize on it.
pub struct ClassifiedTransaction {
    pub transaction: Transaction,
    pub fee: u64,
    pub tier: FeeTier,
}

fn extract_fee(tx: &Transaction) -> u64 {
    if tx.message.len() < FEE_OFFSET + FEE_WIDTH {
        return 0;
    }
    let mut bytes = [0u8; FEE_WIDTH];
    bytes.copy_from_slice(&tx.message[FEE_OFFSET..FEE_OFFSET + FEE_WIDTH]);
    u64::from_le_bytes(bytes)
}

/// Classify and record every transaction in `batch`. Transactions whose fee
/// falls below `min_fee` are rejected rather than classified; both outcomes
/// are recorded into the fee market's window so `inclusion_rate()` reflects
/// what actually passed this stage.
pub fn run(
    batch: Vec<Transaction>,
    market: &FeeMarket,
    min_fee: u64,
) -> (Vec<ClassifiedTransaction>, Vec<(Transaction, RejectReason)>) {
    let mut accepted = Vec::with_capacity(batch.len());
    let mut rejected = Vec::new();

    for tx in batch {
        let fee = extract_fee(&tx);
        if fee < min_fee {
            market.record(fee, false);
            rejected.push((tx, RejectReason::FeeTooLow));
            continue;
        }
        market.record(fee, true);
        let tier = market.classify(fee);
        accepted.push(ClassifiedTransaction {
            transaction: tx,
            fee,
            tier,
        });
    }

    (accepted, rejected)
}
