//! Repository abstractions for the settlement ledger.
//!
//! Each repository owns a connection handle and exposes one settlement
//! operation (or a family of reads) as a single store transaction. The
//! pure computations live in `trellis-core`; repositories load state,
//! call into core, and persist the result.

pub mod account;
pub mod referral;
pub mod report;
pub mod reward;
pub mod settlement;
pub mod subsidy;
pub mod withdrawal;

#[cfg(test)]
mod settlement_flow_tests;

pub use account::AccountRepository;
pub use referral::ReferralRepository;
pub use report::ReportRepository;
pub use reward::RewardRepository;
pub use settlement::SettlementRepository;
pub use subsidy::SubsidyRepository;
pub use withdrawal::WithdrawalRepository;
