//! Price providers.
//!
//! The HTTP clients themselves live outside the engine; this module defines
//! the interface they satisfy, the registry they are discovered through, and
//! the bounded fan-out used during a refresh: at most eight fetches in
//! flight, ten seconds per request, three attempts with exponential backoff.
//! A provider failure is observational: it is logged and the refresh
//! continues with stale prices for that commodity.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tokio::{sync::Semaphore, task::JoinSet, time::timeout};

use crate::{EngineError, ResultEngine, config::Commodity, price::Price};

const MAX_CONCURRENT_FETCHES: usize = 8;
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
pub struct AutoCompleteField {
    pub label: String,
    pub id: String,
    pub help: String,
    pub input_type: String,
}

#[derive(Clone, Debug)]
pub struct AutoCompleteItem {
    pub label: String,
    pub id: String,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn code(&self) -> &'static str;
    fn label(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn auto_complete_fields(&self) -> Vec<AutoCompleteField>;
    async fn auto_complete(
        &self,
        db: &DatabaseConnection,
        field: &str,
        filter: &HashMap<String, String>,
    ) -> Vec<AutoCompleteItem>;
    async fn clear_cache(&self, db: &DatabaseConnection);
    async fn get_prices(&self, code: &str, commodity_name: &str) -> ResultEngine<Vec<Price>>;
}

/// Providers keyed by their code.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn PriceProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> ProviderRegistry {
        ProviderRegistry::default()
    }

    pub fn register(&mut self, provider: Arc<dyn PriceProvider>) {
        self.providers.insert(provider.code(), provider);
    }

    pub fn get(&self, code: &str) -> Option<Arc<dyn PriceProvider>> {
        self.providers.get(code).cloned()
    }

    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn PriceProvider>> {
        self.providers.values()
    }
}

async fn fetch_with_retry(
    provider: Arc<dyn PriceProvider>,
    code: String,
    commodity_name: String,
) -> ResultEngine<Vec<Price>> {
    let mut last_error = None;
    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(BACKOFF_BASE * 2u32.pow(attempt - 1)).await;
        }
        match timeout(FETCH_TIMEOUT, provider.get_prices(&code, &commodity_name)).await {
            Ok(Ok(prices)) => return Ok(prices),
            Ok(Err(err)) => last_error = Some(err),
            Err(_) => {
                last_error = Some(EngineError::PriceFetch {
                    commodity: commodity_name.clone(),
                    message: "timed out".to_string(),
                });
            }
        }
    }
    Err(last_error.unwrap_or(EngineError::PriceFetch {
        commodity: commodity_name,
        message: "no attempts made".to_string(),
    }))
}

/// Fetches fresh prices for every commodity with a configured provider.
///
/// Fetches run in parallel under the worker cap; failed commodities are
/// logged and dropped from the result.
pub async fn fetch_prices(
    registry: &ProviderRegistry,
    commodities: &[Commodity],
) -> Vec<Price> {
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
    let mut tasks = JoinSet::new();

    for commodity in commodities {
        if commodity.price.provider.is_empty() || commodity.price.code.is_empty() {
            continue;
        }
        let Some(provider) = registry.get(&commodity.price.provider) else {
            tracing::warn!(
                commodity = commodity.name,
                provider = commodity.price.provider,
                "unknown price provider"
            );
            continue;
        };
        let semaphore = Arc::clone(&semaphore);
        let code = commodity.price.code.clone();
        let name = commodity.name.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire().await;
            let result = fetch_with_retry(provider, code, name.clone()).await;
            (name, result)
        });
    }

    let mut prices = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(mut fetched))) => prices.append(&mut fetched),
            Ok((name, Err(err))) => {
                tracing::warn!(commodity = name, "price fetch failed: {err}");
            }
            Err(err) => tracing::error!("price fetch task panicked: {err}"),
        }
    }
    prices
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::{CommodityType, PriceCode};

    struct FlakyProvider {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl PriceProvider for FlakyProvider {
        fn code(&self) -> &'static str {
            "test-flaky"
        }

        fn label(&self) -> &'static str {
            "Flaky"
        }

        fn description(&self) -> &'static str {
            "Fails a configured number of times, then succeeds."
        }

        fn auto_complete_fields(&self) -> Vec<AutoCompleteField> {
            Vec::new()
        }

        async fn auto_complete(
            &self,
            _db: &DatabaseConnection,
            _field: &str,
            _filter: &HashMap<String, String>,
        ) -> Vec<AutoCompleteItem> {
            Vec::new()
        }

        async fn clear_cache(&self, _db: &DatabaseConnection) {}

        async fn get_prices(
            &self,
            _code: &str,
            commodity_name: &str,
        ) -> ResultEngine<Vec<Price>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(EngineError::PriceFetch {
                    commodity: commodity_name.to_string(),
                    message: "boom".to_string(),
                });
            }
            Ok(vec![Price {
                commodity_type: CommodityType::Stock,
                commodity_id: "X".to_string(),
                commodity_name: commodity_name.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                value: dec!(100),
            }])
        }
    }

    fn commodity(name: &str) -> Commodity {
        Commodity {
            name: name.to_string(),
            price: PriceCode {
                provider: "test-flaky".to_string(),
                code: "X".to_string(),
            },
            ..Commodity::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FlakyProvider {
            calls: AtomicU32::new(0),
            fail_first: 2,
        }));

        let prices = fetch_prices(&registry, &[commodity("NIFTY")]).await;
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].commodity_name, "NIFTY");
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_attempts() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicU32::new(0),
            fail_first: 10,
        });
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::clone(&provider) as Arc<dyn PriceProvider>);

        let prices = fetch_prices(&registry, &[commodity("NIFTY")]).await;
        assert!(prices.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_provider_is_skipped() {
        let registry = ProviderRegistry::new();
        let mut c = commodity("NIFTY");
        c.price.provider = "nope".to_string();
        let prices = fetch_prices(&registry, &[c]).await;
        assert!(prices.is_empty());
    }
}
