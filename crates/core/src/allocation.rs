//! Static fund-split table across the platform pools.
//!
//! Every settled order sends fixed fractions of its paid amount into a set of
//! shared pool accounts, plus an 80% revenue share to whichever party sold
//! the product. The fractions are pure data; applying them is exact decimal
//! arithmetic with no rounding.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Share of the paid amount credited as platform/merchant revenue.
pub const REVENUE_SHARE: Decimal = Decimal::from_parts(80, 0, 0, false, 2);

/// Share of a member order credited to the company points pool.
pub const COMPANY_POINTS_SHARE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Identifier of a shared (non-per-user) finance account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolAccount {
    /// Weekly subsidy pool; distributed as coupons against point holdings.
    SubsidyPool,
    /// Public-welfare fund; every credit is independently auditable.
    PublicWelfare,
    /// Platform maintenance.
    Platform,
    /// Honor-director dividend pool.
    HonorDirector,
    /// Community store pool.
    Community,
    /// City operations center pool.
    CityCenter,
    /// Regional company pool.
    RegionCompany,
    /// Business development fund.
    Development,
    /// Platform revenue pool (member products and self-operated sales).
    PlatformRevenuePool,
    /// Company points ledger (participates in subsidy divisor, never paid).
    CompanyPoints,
    /// Company cash ledger (tax withholding destination).
    CompanyBalance,
}

impl PoolAccount {
    /// Stable identifier used as the `account_type` column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubsidyPool => "subsidy_pool",
            Self::PublicWelfare => "public_welfare",
            Self::Platform => "platform",
            Self::HonorDirector => "honor_director",
            Self::Community => "community",
            Self::CityCenter => "city_center",
            Self::RegionCompany => "region_company",
            Self::Development => "development",
            Self::PlatformRevenuePool => "platform_revenue_pool",
            Self::CompanyPoints => "company_points",
            Self::CompanyBalance => "company_balance",
        }
    }

    /// Human-readable account name, used when seeding the accounts.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::SubsidyPool => "Weekly subsidy pool",
            Self::PublicWelfare => "Public welfare fund",
            Self::Platform => "Platform maintenance",
            Self::HonorDirector => "Honor director dividends",
            Self::Community => "Community stores",
            Self::CityCenter => "City operations center",
            Self::RegionCompany => "Regional companies",
            Self::Development => "Development fund",
            Self::PlatformRevenuePool => "Platform revenue pool",
            Self::CompanyPoints => "Company points ledger",
            Self::CompanyBalance => "Company cash ledger",
        }
    }

    /// All pool accounts, in seeding order.
    #[must_use]
    pub const fn all() -> [Self; 11] {
        [
            Self::SubsidyPool,
            Self::PublicWelfare,
            Self::Platform,
            Self::HonorDirector,
            Self::Community,
            Self::CityCenter,
            Self::RegionCompany,
            Self::Development,
            Self::PlatformRevenuePool,
            Self::CompanyPoints,
            Self::CompanyBalance,
        ]
    }
}

impl std::fmt::Display for PoolAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed-fraction allocation table applied to every order's paid amount.
///
/// The revenue share and the company points share are handled separately by
/// the settlement branch logic; this table covers only the small pools.
#[must_use]
pub const fn allocation_table() -> [(PoolAccount, Decimal); 8] {
    [
        (PoolAccount::PublicWelfare, Decimal::from_parts(1, 0, 0, false, 2)),
        (PoolAccount::Platform, Decimal::from_parts(1, 0, 0, false, 2)),
        (PoolAccount::SubsidyPool, Decimal::from_parts(12, 0, 0, false, 2)),
        (PoolAccount::HonorDirector, Decimal::from_parts(2, 0, 0, false, 2)),
        (PoolAccount::Community, Decimal::from_parts(1, 0, 0, false, 2)),
        (PoolAccount::CityCenter, Decimal::from_parts(1, 0, 0, false, 2)),
        (PoolAccount::RegionCompany, Decimal::from_parts(5, 0, 0, false, 3)),
        (PoolAccount::Development, Decimal::from_parts(15, 0, 0, false, 3)),
    ]
}

/// Splits a paid amount across the small pools.
///
/// Returns one `(pool, amount)` credit per table row, in table order.
#[must_use]
pub fn split(amount: Decimal) -> Vec<(PoolAccount, Decimal)> {
    allocation_table()
        .into_iter()
        .map(|(pool, fraction)| (pool, amount * fraction))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_table_fractions_sum_to_twenty_percent() {
        let total: Decimal = allocation_table().iter().map(|(_, f)| *f).sum();
        assert_eq!(total, dec!(0.20));
    }

    #[test]
    fn test_table_plus_revenue_share_covers_whole_amount() {
        let total: Decimal = allocation_table().iter().map(|(_, f)| *f).sum();
        assert_eq!(total + REVENUE_SHARE, Decimal::ONE);
    }

    #[test]
    fn test_split_of_member_price() {
        let credits = split(dec!(1980.00));
        let by_pool = |p: PoolAccount| {
            credits
                .iter()
                .find(|(pool, _)| *pool == p)
                .map(|(_, amt)| *amt)
                .unwrap()
        };
        assert_eq!(by_pool(PoolAccount::PublicWelfare), dec!(19.8000));
        assert_eq!(by_pool(PoolAccount::SubsidyPool), dec!(237.6000));
        assert_eq!(by_pool(PoolAccount::RegionCompany), dec!(9.90000));
        assert_eq!(by_pool(PoolAccount::Development), dec!(29.70000));
    }

    #[test]
    fn test_account_type_round_trip_is_stable() {
        for pool in PoolAccount::all() {
            assert!(!pool.as_str().is_empty());
            assert_eq!(pool.to_string(), pool.as_str());
        }
    }

    proptest! {
        /// No money is created or destroyed: the small-pool credits plus the
        /// 80% revenue share always reconstruct the paid amount exactly.
        #[test]
        fn prop_split_conserves_value(cents in 0i64..100_000_000) {
            let amount = Decimal::new(cents, 2);
            let pools: Decimal = split(amount).iter().map(|(_, a)| *a).sum();
            prop_assert_eq!(pools + amount * REVENUE_SHARE, amount);
        }

        /// Every individual credit is non-negative for non-negative input.
        #[test]
        fn prop_split_credits_non_negative(cents in 0i64..100_000_000) {
            let amount = Decimal::new(cents, 2);
            for (_, credit) in split(amount) {
                prop_assert!(credit >= Decimal::ZERO);
            }
        }
    }
}
