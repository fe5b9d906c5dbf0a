//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Settlement business rules.
    #[serde(default)]
    pub settlement: SettlementConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    1
}

/// Business rules for order settlement, rewards, and payouts.
///
/// Every knob has a production default; deployments override through the
/// `config/` files or `TRELLIS__SETTLEMENT__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    /// Fixed price of the membership product. Referral and team rewards are
    /// sized against this price, not the instance price on a given order.
    #[serde(default = "default_member_product_price")]
    pub member_product_price: Decimal,
    /// Merchant id representing the platform itself (self-operated products).
    #[serde(default)]
    pub platform_merchant_id: i64,
    /// Withholding tax rate applied to withdrawals.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
    /// Monetary value of one redeemed point.
    #[serde(default = "default_points_discount_rate")]
    pub points_discount_rate: Decimal,
    /// Upper bound on the per-point value of a weekly subsidy run.
    #[serde(default = "default_max_point_value")]
    pub max_point_value: Decimal,
    /// Coupon validity window in days.
    #[serde(default = "default_coupon_valid_days")]
    pub coupon_valid_days: i64,
    /// Maximum member-product orders per buyer in a rolling 24h window.
    #[serde(default = "default_max_member_purchases")]
    pub max_member_purchases_per_window: u64,
    /// Maximum referral chain depth for team rewards and downline queries.
    #[serde(default = "default_max_team_layer")]
    pub max_team_layer: u32,
    /// Withdrawals above this amount require manual audit.
    #[serde(default = "default_manual_audit_threshold")]
    pub manual_audit_threshold: Decimal,
    /// Whether the weekly subsidy run deducts merchant points and mints
    /// merchant coupons. Present in the schema, historically disabled.
    #[serde(default)]
    pub deduct_merchant_points_on_subsidy: bool,
    /// Row-lock wait budget per transaction, in milliseconds. Exceeding it
    /// surfaces as a retryable `Busy` error instead of blocking forever.
    #[serde(default = "default_lock_wait_timeout_ms")]
    pub lock_wait_timeout_ms: u64,
}

fn default_member_product_price() -> Decimal {
    Decimal::new(1_980_00, 2)
}

fn default_tax_rate() -> Decimal {
    Decimal::new(6, 2)
}

fn default_points_discount_rate() -> Decimal {
    Decimal::ONE
}

fn default_max_point_value() -> Decimal {
    Decimal::new(2, 2)
}

fn default_coupon_valid_days() -> i64 {
    30
}

fn default_max_member_purchases() -> u64 {
    2
}

fn default_max_team_layer() -> u32 {
    6
}

fn default_manual_audit_threshold() -> Decimal {
    Decimal::new(5_000_00, 2)
}

fn default_lock_wait_timeout_ms() -> u64 {
    5_000
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            member_product_price: default_member_product_price(),
            platform_merchant_id: 0,
            tax_rate: default_tax_rate(),
            points_discount_rate: default_points_discount_rate(),
            max_point_value: default_max_point_value(),
            coupon_valid_days: default_coupon_valid_days(),
            max_member_purchases_per_window: default_max_member_purchases(),
            max_team_layer: default_max_team_layer(),
            manual_audit_threshold: default_manual_audit_threshold(),
            deduct_merchant_points_on_subsidy: false,
            lock_wait_timeout_ms: default_lock_wait_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TRELLIS").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_settlement_defaults_match_business_rules() {
        let cfg = SettlementConfig::default();
        assert_eq!(cfg.member_product_price, dec!(1980.00));
        assert_eq!(cfg.tax_rate, dec!(0.06));
        assert_eq!(cfg.points_discount_rate, dec!(1));
        assert_eq!(cfg.max_point_value, dec!(0.02));
        assert_eq!(cfg.coupon_valid_days, 30);
        assert_eq!(cfg.max_member_purchases_per_window, 2);
        assert_eq!(cfg.max_team_layer, 6);
        assert_eq!(cfg.manual_audit_threshold, dec!(5000.00));
        assert_eq!(cfg.platform_merchant_id, 0);
        assert!(!cfg.deduct_merchant_points_on_subsidy);
    }

    #[test]
    fn test_settlement_section_is_optional() {
        let cfg: AppConfig = config::Config::builder()
            .set_override("database.url", "postgres://localhost/trellis")
            .unwrap()
            .build()
            .and_then(config::Config::try_deserialize)
            .unwrap();
        assert_eq!(cfg.database.max_connections, 20);
        assert_eq!(cfg.settlement.max_team_layer, 6);
    }
}
