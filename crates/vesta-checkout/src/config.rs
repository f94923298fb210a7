//! # Checkout Configuration
//!
//! Store identity, sale number layout and pricing defaults for one register.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Load Order                             │
//! │                  (later sources override earlier)                       │
//! │                                                                         │
//! │  1. Defaults (CheckoutConfig::default)                                 │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  2. checkout.toml (explicit path, or the platform config dir)          │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  3. VESTA_* environment variables                                      │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  4. validate()                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # checkout.toml
//! [store]
//! tenant_id = "tenant-001"
//! outlet_id = "outlet-001"
//! outlet_name = "Downtown"
//!
//! [sale_number]
//! prefix = "POS"
//! checksum = true
//! short = false
//!
//! [pricing]
//! tax_rate = "16"
//! tax_included = true
//! rounding = "nearest"   # nearest | up | down
//!
//! [inventory]
//! default_min_stock = 5
//! ```

use std::path::PathBuf;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vesta_core::pricing::{RoundingRule, TaxConfig};
use vesta_core::sale_number::{self, SaleNumberFormat};

use crate::error::{CheckoutError, CheckoutResult};

// =============================================================================
// Store Configuration
// =============================================================================

/// Which tenant and outlet this register sells for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub tenant_id: String,
    pub outlet_id: String,

    /// Used to derive the outlet code in sale numbers.
    #[serde(default = "default_outlet_name")]
    pub outlet_name: String,
}

fn default_outlet_name() -> String {
    "Main".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            tenant_id: "default-tenant".to_string(),
            outlet_id: "default-outlet".to_string(),
            outlet_name: default_outlet_name(),
        }
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Tax percentage, e.g. `16` for 16%.
    #[serde(default)]
    pub tax_rate: Decimal,

    /// Shelf prices already include tax.
    #[serde(default = "default_tax_included")]
    pub tax_included: bool,

    #[serde(default)]
    pub rounding: RoundingRule,
}

fn default_tax_included() -> bool {
    true
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            tax_rate: Decimal::ZERO,
            tax_included: default_tax_included(),
            rounding: RoundingRule::default(),
        }
    }
}

// =============================================================================
// Inventory Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Minimum stock given to inventories registered without one.
    #[serde(default = "default_min_stock")]
    pub default_min_stock: i64,
}

fn default_min_stock() -> i64 {
    5
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            default_min_stock: default_min_stock(),
        }
    }
}

// =============================================================================
// Checkout Configuration
// =============================================================================

/// Complete checkout configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sale_number: SaleNumberFormat,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub inventory: InventorySettings,
}

impl CheckoutConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(config_path: Option<PathBuf>) -> CheckoutResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file as pretty TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> CheckoutResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CheckoutError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Checkout config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CheckoutResult<()> {
        for (field, value) in [
            ("store.tenant_id", &self.store.tenant_id),
            ("store.outlet_id", &self.store.outlet_id),
            ("store.outlet_name", &self.store.outlet_name),
        ] {
            if value.trim().is_empty() {
                return Err(CheckoutError::Config(format!("{} must not be empty", field)));
            }
        }

        if self.pricing.tax_rate < Decimal::ZERO || self.pricing.tax_rate > Decimal::ONE_HUNDRED {
            return Err(CheckoutError::Config(format!(
                "pricing.tax_rate must be between 0 and 100, got {}",
                self.pricing.tax_rate
            )));
        }

        if self.inventory.default_min_stock < 0 {
            return Err(CheckoutError::Config(
                "inventory.default_min_stock must not be negative".into(),
            ));
        }

        // A sample number exercises the prefix and outlet name rules.
        let today = Utc::now().date_naive();
        sale_number::generate_with(&self.sale_number, &self.store.outlet_name, 1, today)
            .map_err(|e| CheckoutError::Config(format!("sale_number: {}", e)))?;

        Ok(())
    }

    /// Tax settings in the shape the pricing functions take.
    pub fn tax_config(&self) -> TaxConfig {
        TaxConfig::new(self.pricing.tax_rate, self.pricing.tax_included)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `VESTA_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("VESTA_TENANT_ID") {
            debug!(tenant_id = %id, "Overriding tenant ID from environment");
            self.store.tenant_id = id;
        }

        if let Some(id) = lookup("VESTA_OUTLET_ID") {
            debug!(outlet_id = %id, "Overriding outlet ID from environment");
            self.store.outlet_id = id;
        }

        if let Some(name) = lookup("VESTA_OUTLET_NAME") {
            self.store.outlet_name = name;
        }

        if let Some(prefix) = lookup("VESTA_SALE_PREFIX") {
            self.sale_number.prefix = (!prefix.is_empty()).then_some(prefix);
        }

        if let Some(flag) = lookup("VESTA_SALE_CHECKSUM") {
            match flag.parse::<bool>() {
                Ok(b) => self.sale_number.checksum = b,
                Err(_) => warn!(value = %flag, "Invalid VESTA_SALE_CHECKSUM in environment"),
            }
        }

        if let Some(rate) = lookup("VESTA_TAX_RATE") {
            match rate.parse::<Decimal>() {
                Ok(r) => {
                    debug!(tax_rate = %r, "Overriding tax rate from environment");
                    self.pricing.tax_rate = r;
                }
                Err(_) => warn!(value = %rate, "Invalid VESTA_TAX_RATE in environment"),
            }
        }

        if let Some(flag) = lookup("VESTA_TAX_INCLUDED") {
            match flag.parse::<bool>() {
                Ok(b) => self.pricing.tax_included = b,
                Err(_) => warn!(value = %flag, "Invalid VESTA_TAX_INCLUDED in environment"),
            }
        }

        if let Some(rule) = lookup("VESTA_ROUNDING") {
            match rule.to_lowercase().as_str() {
                "nearest" => self.pricing.rounding = RoundingRule::Nearest,
                "up" => self.pricing.rounding = RoundingRule::Up,
                "down" => self.pricing.rounding = RoundingRule::Down,
                _ => warn!(value = %rule, "Unknown rounding rule in environment"),
            }
        }

        if let Some(min) = lookup("VESTA_DEFAULT_MIN_STOCK") {
            match min.parse::<i64>() {
                Ok(m) => self.inventory.default_min_stock = m,
                Err(_) => warn!(value = %min, "Invalid VESTA_DEFAULT_MIN_STOCK in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vesta", "pos")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }
}
