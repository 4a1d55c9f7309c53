//! Analytical back end of the ledger.
//!
//! The engine owns the posting and price stores and answers every report
//! from an immutable snapshot: reads clone an `Arc`, a journal rebuild swaps
//! the snapshot under a write lock. All monetary arithmetic is exact
//! decimal; the only floats live inside the XIRR and annuity solvers.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::sync::RwLock;

pub use allocation::{Allocation, AllocationReport};
pub use breakdown::AssetBreakdown;
pub use budget::{AccountBudget, Budget, BudgetReport};
pub use cancel::CancelToken;
pub use cash_flow::CashFlow;
pub use config::Config;
pub use error::EngineError;
pub use goals::{RetirementProgress, SavingsProjection};
pub use networth::Networth;
pub use posting::{Posting, Status};
pub use price::{Price, PriceIndex};
pub use provider::{AutoCompleteField, AutoCompleteItem, PriceProvider, ProviderRegistry};
pub use query::Query;
pub use sheet::{Diagnostic, LineResult};
pub use store::{Journal, Snapshot};
pub use transaction::TransactionView;

pub mod allocation;
pub mod breakdown;
pub mod budget;
pub mod calendar;
mod cancel;
pub mod cash_flow;
pub mod classify;
pub mod config;
mod error;
pub mod format;
pub mod goals;
pub mod networth;
pub mod posting;
pub mod price;
pub mod provider;
pub mod query;
pub mod sheet;
mod store;
pub mod transaction;
pub mod valuation;
pub mod xirr;

type ResultEngine<T> = Result<T, EngineError>;

/// Daily timeline plus the portfolio rate of return.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworthReport {
    pub networth_timeline: Vec<Networth>,
    pub xirr: Decimal,
}

/// Single-record net worth plus the portfolio rate of return.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentNetworthReport {
    pub networth: Networth,
    pub xirr: Decimal,
}

#[derive(Debug)]
pub struct Engine {
    db: DatabaseConnection,
    config: Config,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Engine {
    /// Return a builder for `Engine`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The current consistent snapshot. Every report reads exactly one.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Rebuilds the stores from a freshly parsed journal.
    ///
    /// Destructive and atomic: the tables are replaced inside one database
    /// transaction and the in-memory snapshot is swapped under the write
    /// lock, so concurrent readers keep the journal they started with.
    pub async fn rebuild(&self, journal: Journal) -> ResultEngine<()> {
        let mut guard = self.snapshot.write().await;
        store::replace_journal(&self.db, &journal).await?;
        let next = store::load_snapshot(&self.db, guard.version + 1).await?;
        *guard = Arc::new(next);
        Ok(())
    }

    /// Fetches fresh prices for configured commodities and reloads the index.
    ///
    /// Provider failures are logged and the affected commodities keep their
    /// stale series.
    pub async fn refresh_prices(&self, registry: &ProviderRegistry) -> ResultEngine<()> {
        let fetched = provider::fetch_prices(registry, &self.config.commodities).await;
        if fetched.is_empty() {
            return Ok(());
        }
        let mut guard = self.snapshot.write().await;
        store::replace_prices(&self.db, &fetched).await?;
        let next = store::load_snapshot(&self.db, guard.version + 1).await?;
        *guard = Arc::new(next);
        Ok(())
    }

    /// A query over the current snapshot.
    pub async fn query(&self, today: NaiveDate) -> Query {
        let snapshot = self.snapshot().await;
        Query::new(Arc::clone(&snapshot.postings), today)
    }

    /// Transactions of the current snapshot, in encounter order.
    pub async fn transactions(&self) -> Vec<TransactionView> {
        let snapshot = self.snapshot().await;
        transaction::group_postings(&snapshot.postings)
    }

    pub async fn networth(
        &self,
        today: NaiveDate,
        cancel: &CancelToken,
    ) -> ResultEngine<NetworthReport> {
        let snapshot = self.snapshot().await;
        let classifier = classify::Classifier::new(&self.config, &snapshot.postings);
        let valuer = valuation::Valuer::new(&self.config, &snapshot.prices);

        let postings = Query::new(Arc::clone(&snapshot.postings), today)
            .like(&["Assets:%", "Income:CapitalGains:%", "Liabilities:%"])
            .until_today()
            .all();

        let timeline =
            networth::networth_timeline(&classifier, valuer, &postings, today, false, cancel)?;
        let xirr = xirr::postings_xirr(&classifier, valuer, &postings, today);
        Ok(NetworthReport {
            networth_timeline: timeline,
            xirr,
        })
    }

    pub async fn current_networth(&self, today: NaiveDate) -> ResultEngine<CurrentNetworthReport> {
        let snapshot = self.snapshot().await;
        let classifier = classify::Classifier::new(&self.config, &snapshot.postings);
        let valuer = valuation::Valuer::new(&self.config, &snapshot.prices);

        let postings = Query::new(Arc::clone(&snapshot.postings), today)
            .like(&["Assets:%", "Income:CapitalGains:%", "Liabilities:%"])
            .until_today()
            .all();

        let networth = networth::current_networth(&classifier, valuer, &postings, today);
        let xirr = xirr::postings_xirr(&classifier, valuer, &postings, today);
        Ok(CurrentNetworthReport { networth, xirr })
    }

    pub async fn cash_flow(
        &self,
        today: NaiveDate,
        cancel: &CancelToken,
    ) -> ResultEngine<Vec<CashFlow>> {
        let query = self.query(today).await;
        cash_flow::compute_cash_flow(&query, today, Decimal::ZERO, cancel)
    }

    /// Cash flow over the last three months, seeded with the checking
    /// balance from before the window.
    pub async fn current_cash_flow(
        &self,
        today: NaiveDate,
        cancel: &CancelToken,
    ) -> ResultEngine<Vec<CashFlow>> {
        let query = self.query(today).await;
        let seed = valuation::cost_sum(
            &query
                .clone()
                .before_n_months(3)
                .account_prefix("Assets:Checking")
                .all(),
        );
        let windowed = query.last_n_months(3);
        cash_flow::compute_cash_flow(&windowed, today, seed, cancel)
    }

    async fn breakdowns(
        &self,
        pattern: &str,
        include_capital_gains: bool,
        rollup: bool,
        today: NaiveDate,
    ) -> std::collections::BTreeMap<String, AssetBreakdown> {
        let snapshot = self.snapshot().await;
        let classifier = classify::Classifier::new(&self.config, &snapshot.postings);
        let valuer = valuation::Valuer::new(&self.config, &snapshot.prices);

        let mut patterns = vec![pattern];
        if include_capital_gains {
            patterns.push("Income:CapitalGains:%");
        }
        let postings = Query::new(Arc::clone(&snapshot.postings), today)
            .like(&patterns)
            .all();
        breakdown::compute_breakdowns(&classifier, valuer, &postings, rollup, today)
    }

    pub async fn balance(
        &self,
        today: NaiveDate,
    ) -> std::collections::BTreeMap<String, AssetBreakdown> {
        self.breakdowns("Assets:%", true, true, today).await
    }

    pub async fn checking_balance(
        &self,
        today: NaiveDate,
    ) -> std::collections::BTreeMap<String, AssetBreakdown> {
        self.breakdowns("Assets:Checking:%", false, false, today).await
    }

    async fn budget_report(
        &self,
        until_this_month_end: bool,
        today: NaiveDate,
        cancel: &CancelToken,
    ) -> ResultEngine<BudgetReport> {
        let query = self.query(today).await;
        let window = |q: Query| {
            if until_this_month_end {
                q.until_this_month_end()
            } else {
                q
            }
        };
        let forecasts = window(query.clone().like(&["Expenses:%"]).forecast()).all();
        let expenses = window(query.clone().like(&["Expenses:%"])).all();
        let checking_balance =
            valuation::cost_sum(&query.clone().account_prefix("Assets:Checking").all());
        budget::compute_budget(
            &forecasts,
            &expenses,
            checking_balance,
            self.config.budget.rollover.is_yes(),
            today,
            cancel,
        )
    }

    pub async fn budget(
        &self,
        today: NaiveDate,
        cancel: &CancelToken,
    ) -> ResultEngine<BudgetReport> {
        self.budget_report(false, today, cancel).await
    }

    pub async fn current_budget(
        &self,
        today: NaiveDate,
        cancel: &CancelToken,
    ) -> ResultEngine<BudgetReport> {
        self.budget_report(true, today, cancel).await
    }

    pub async fn allocation(&self, today: NaiveDate) -> AllocationReport {
        let snapshot = self.snapshot().await;
        let classifier = classify::Classifier::new(&self.config, &snapshot.postings);
        let valuer = valuation::Valuer::new(&self.config, &snapshot.prices);
        let query = Query::new(Arc::clone(&snapshot.postings), today);
        allocation::compute_allocation(&self.config, &classifier, valuer, &query, today)
    }

    pub async fn retirement_goal(
        &self,
        name: &str,
        today: NaiveDate,
    ) -> ResultEngine<RetirementProgress> {
        let goal = self
            .config
            .goals
            .retirement
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| EngineError::KeyNotFound(name.to_string()))?;

        let snapshot = self.snapshot().await;
        let classifier = classify::Classifier::new(&self.config, &snapshot.postings);
        let valuer = valuation::Valuer::new(&self.config, &snapshot.prices);
        let query = Query::new(Arc::clone(&snapshot.postings), today);
        Ok(goals::compute_retirement(
            goal,
            &self.config,
            &classifier,
            valuer,
            &query,
            today,
        ))
    }

    pub async fn savings_goal(
        &self,
        name: &str,
        today: NaiveDate,
    ) -> ResultEngine<SavingsProjection> {
        let goal = self
            .config
            .goals
            .savings
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| EngineError::KeyNotFound(name.to_string()))?;

        let snapshot = self.snapshot().await;
        let classifier = classify::Classifier::new(&self.config, &snapshot.postings);
        let valuer = valuation::Valuer::new(&self.config, &snapshot.prices);
        let query = Query::new(Arc::clone(&snapshot.postings), today);
        Ok(goals::compute_savings(
            goal,
            &classifier,
            valuer,
            &query,
            today,
        ))
    }

    /// Evaluates a sheet against the current snapshot.
    pub async fn evaluate_sheet(&self, text: &str, today: NaiveDate) -> Vec<LineResult> {
        let snapshot = self.snapshot().await;
        let classifier = classify::Classifier::new(&self.config, &snapshot.postings);
        let valuer = valuation::Valuer::new(&self.config, &snapshot.prices);
        let ctx = sheet::SheetContext {
            postings: &snapshot.postings,
            classifier: &classifier,
            valuer,
            today,
            display_precision: self.config.display_precision,
            locale: &self.config.locale,
        };
        sheet::evaluate_sheet(text, &ctx)
    }

    /// Lints a sheet without evaluating it.
    pub fn validate_sheet(&self, text: &str) -> Vec<Diagnostic> {
        sheet::validate_sheet(text)
    }
}

/// The builder for `Engine`.
#[derive(Default)]
pub struct EngineBuilder {
    database: Option<DatabaseConnection>,
    config: Config,
}

impl EngineBuilder {
    /// Pass the required database.
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = Some(db);
        self
    }

    pub fn config(mut self, config: Config) -> EngineBuilder {
        self.config = config;
        self
    }

    /// Construct `Engine`, loading the initial snapshot from the database.
    pub async fn build(self) -> ResultEngine<Engine> {
        let db = self
            .database
            .ok_or_else(|| EngineError::ConfigInvalid("database is required".to_string()))?;
        self.config.validate()?;
        let snapshot = store::load_snapshot(&db, 1).await?;
        Ok(Engine {
            db,
            config: self.config,
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }
}
