//! Ledger configuration.
//!
//! The configuration is a YAML document; [`Config::from_yaml`] deserializes
//! and validates it. Validation failures are [`EngineError::ConfigInvalid`]
//! and abort startup.
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Yes/no switch as written in the config file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    Yes,
    #[default]
    No,
}

impl Flag {
    pub fn is_yes(self) -> bool {
        self == Flag::Yes
    }
}

/// Which ledger implementation produced the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerCli {
    #[default]
    Ledger,
    Hledger,
    Beancount,
}

/// Commodity kind, used to pick a price provider and to gate stock-split
/// detection to non-currency commodities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommodityType {
    Mutualfund,
    Stock,
    Nps,
    Currency,
    #[default]
    Unknown,
}

impl CommodityType {
    /// String representation used in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mutualfund => "mutualfund",
            Self::Stock => "stock",
            Self::Nps => "nps",
            Self::Currency => "currency",
            Self::Unknown => "unknown",
        }
    }
}

impl TryFrom<&str> for CommodityType {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "mutualfund" => Ok(Self::Mutualfund),
            "stock" => Ok(Self::Stock),
            "nps" => Ok(Self::Nps),
            "currency" => Ok(Self::Currency),
            "unknown" => Ok(Self::Unknown),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PriceCode {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Commodity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub commodity_type: CommodityType,
    #[serde(default)]
    pub price: PriceCode,
    /// Currency the price series is quoted in, when it is not the default
    /// currency. Valuation converts through the `<CCY><DEFAULT>=X` pair.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub harvest: Option<u32>,
    #[serde(default)]
    pub tax_category: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BudgetConfig {
    #[serde(default)]
    pub rollover: Flag,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RetirementGoal {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub swr: Decimal,
    #[serde(default)]
    pub expenses: Vec<String>,
    #[serde(default)]
    pub savings: Vec<String>,
    #[serde(default)]
    pub yearly_expenses: Option<Decimal>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SavingsGoal {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub target: Decimal,
    pub rate: Decimal,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_per_period: Option<Decimal>,
    #[serde(default)]
    pub accounts: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Goals {
    #[serde(default)]
    pub retirement: Vec<RetirementGoal>,
    #[serde(default)]
    pub savings: Vec<SavingsGoal>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AllocationTarget {
    pub name: String,
    pub target: Decimal,
    pub accounts: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScheduleAL {
    pub code: String,
    pub accounts: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreditCard {
    pub account: String,
    #[serde(default)]
    pub credit_limit: Decimal,
    #[serde(default)]
    pub statement_end_day: u32,
    #[serde(default)]
    pub due_day: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ImportTemplate {
    pub name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub journal_path: String,
    pub db_path: String,
    #[serde(default)]
    pub sheets_directory: String,
    #[serde(default)]
    pub ledger_cli: LedgerCli,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_precision")]
    pub display_precision: u32,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub time_zone: String,
    #[serde(default = "default_financial_year_starting_month")]
    pub financial_year_starting_month: u32,
    #[serde(default)]
    pub week_starting_day: u32,
    #[serde(default)]
    pub strict: Flag,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub goals: Goals,
    #[serde(default)]
    pub schedule_al: Vec<ScheduleAL>,
    #[serde(default)]
    pub allocation_targets: Vec<AllocationTarget>,
    #[serde(default)]
    pub commodities: Vec<Commodity>,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub user_accounts: Vec<String>,
    #[serde(default)]
    pub credit_cards: Vec<CreditCard>,
    #[serde(default)]
    pub import_templates: Vec<ImportTemplate>,
    #[serde(default = "default_interest_prefixes")]
    pub interest_prefixes: Vec<String>,
    #[serde(default = "default_capital_gains_source_prefix")]
    pub capital_gains_source_prefix: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_precision() -> u32 {
    2
}

fn default_locale() -> String {
    "en-IN".to_string()
}

fn default_financial_year_starting_month() -> u32 {
    4
}

fn default_interest_prefixes() -> Vec<String> {
    vec!["Income:Interest".to_string()]
}

fn default_capital_gains_source_prefix() -> String {
    "Assets".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            journal_path: String::new(),
            db_path: String::new(),
            sheets_directory: String::new(),
            ledger_cli: LedgerCli::default(),
            default_currency: default_currency(),
            display_precision: default_precision(),
            locale: default_locale(),
            time_zone: String::new(),
            financial_year_starting_month: default_financial_year_starting_month(),
            week_starting_day: 0,
            strict: Flag::No,
            budget: BudgetConfig::default(),
            goals: Goals::default(),
            schedule_al: Vec::new(),
            allocation_targets: Vec::new(),
            commodities: Vec::new(),
            accounts: Vec::new(),
            user_accounts: Vec::new(),
            credit_cards: Vec::new(),
            import_templates: Vec::new(),
            interest_prefixes: default_interest_prefixes(),
            capital_gains_source_prefix: default_capital_gains_source_prefix(),
        }
    }
}

impl Config {
    /// Deserialize and validate a YAML configuration document.
    pub fn from_yaml(input: &str) -> ResultEngine<Config> {
        let config: Config = serde_yaml::from_str(input)
            .map_err(|err| EngineError::ConfigInvalid(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ResultEngine<()> {
        if !(1..=12).contains(&self.financial_year_starting_month) {
            return Err(EngineError::ConfigInvalid(format!(
                "financial_year_starting_month must be 1-12, got {}",
                self.financial_year_starting_month
            )));
        }
        if self.week_starting_day > 6 {
            return Err(EngineError::ConfigInvalid(format!(
                "week_starting_day must be 0-6, got {}",
                self.week_starting_day
            )));
        }
        if self.display_precision > 8 {
            return Err(EngineError::ConfigInvalid(format!(
                "display_precision must be 0-8, got {}",
                self.display_precision
            )));
        }
        for goal in &self.goals.retirement {
            if goal.swr <= Decimal::ZERO {
                return Err(EngineError::ConfigInvalid(format!(
                    "retirement goal '{}': swr must be > 0",
                    goal.name
                )));
            }
        }
        for goal in &self.goals.savings {
            if goal.target <= Decimal::ZERO {
                return Err(EngineError::ConfigInvalid(format!(
                    "savings goal '{}': target must be > 0",
                    goal.name
                )));
            }
            if goal.target_date.is_none() && goal.payment_per_period.is_none() {
                return Err(EngineError::ConfigInvalid(format!(
                    "savings goal '{}': either target_date or payment_per_period is required",
                    goal.name
                )));
            }
        }
        for target in &self.allocation_targets {
            if target.target < Decimal::ZERO || target.target > Decimal::ONE_HUNDRED {
                return Err(EngineError::ConfigInvalid(format!(
                    "allocation target '{}': target must be 0-100",
                    target.name
                )));
            }
        }
        Ok(())
    }

    /// Commodity declaration by name, if any.
    pub fn commodity(&self, name: &str) -> Option<&Commodity> {
        self.commodities.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::from_yaml(
            "journal_path: /data/main.ledger\ndb_path: /data/ledger.db\n",
        )
        .unwrap();
        assert_eq!(config.default_currency, "INR");
        assert_eq!(config.financial_year_starting_month, 4);
        assert_eq!(config.display_precision, 2);
        assert!(!config.budget.rollover.is_yes());
        assert_eq!(config.interest_prefixes, vec!["Income:Interest"]);
    }

    #[test]
    fn rollover_and_goals_parse() {
        let config = Config::from_yaml(
            r#"
journal_path: main.ledger
db_path: ledger.db
budget:
  rollover: yes
goals:
  retirement:
    - name: FIRE
      swr: 3.5
      savings: ["Assets:Equity:*"]
      expenses: ["Expenses:*"]
  savings:
    - name: House
      target: 5000000
      rate: 0.07
      target_date: 2030-01-01
      accounts: ["Assets:Debt:*"]
"#,
        )
        .unwrap();
        assert!(config.budget.rollover.is_yes());
        assert_eq!(config.goals.retirement[0].name, "FIRE");
        assert_eq!(config.goals.savings[0].rate, Decimal::new(7, 2));
    }

    #[test]
    fn invalid_financial_year_month_rejected() {
        let err = Config::from_yaml(
            "journal_path: a\ndb_path: b\nfinancial_year_starting_month: 13\n",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid(_)));
    }

    #[test]
    fn savings_goal_without_solve_target_rejected() {
        let err = Config::from_yaml(
            r#"
journal_path: a
db_path: b
goals:
  savings:
    - name: Car
      target: 100
      rate: 0.05
"#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid(_)));
    }
}
