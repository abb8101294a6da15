//! Process-wide administrative operations: warm-up, full flush, stats.

use futures::future::join_all;

use crate::domain::{CacheStats, ClearReport, SectionOutcome, TtlTier, WarmUpReport};
use crate::ports::{CatalogSource, ClearTarget};
use crate::services::CacheFacade;

const FEATURED_PRODUCTS: &str = "featured_products";
const CATEGORY_TREE: &str = "category_tree";
const PRODUCERS: &str = "producers";
const STORE: &str = "store";

/// Proof that the caller explicitly asked to wipe every cache.
///
/// A full flush is not an invalidation: it drops keys of every entity and
/// the application-level caches too.
#[derive(Debug, Clone)]
pub struct FlushConfirmation {
    reason: String,
}

impl FlushConfirmation {
    /// Phrase an outer boundary (HTTP, CLI) must receive before flushing.
    pub const PHRASE: &'static str = "flush-all";

    pub fn confirmed(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Confirm only when `phrase` matches [`Self::PHRASE`] exactly.
    pub fn from_phrase(phrase: &str, reason: impl Into<String>) -> Option<Self> {
        (phrase == Self::PHRASE).then(|| Self::confirmed(reason))
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl CacheFacade {
    /// Populate featured products, the category tree and verified producers
    /// straight from the system of record.
    ///
    /// Each section runs even if an earlier one failed; errors are recorded
    /// in the report, never raised.
    pub async fn warm_up_caches(&self) -> WarmUpReport {
        let mut report = WarmUpReport::new();

        let Some(catalog) = self.catalog.as_deref() else {
            tracing::warn!("Cache warm-up requested without a catalog source");
            for section in [FEATURED_PRODUCTS, CATEGORY_TREE, PRODUCERS] {
                report.record(section, SectionOutcome::failed("no catalog source configured"));
            }
            return report.finish();
        };

        report.record(FEATURED_PRODUCTS, self.warm_featured_products(catalog).await);
        report.record(CATEGORY_TREE, self.warm_category_tree(catalog).await);
        report.record(PRODUCERS, self.warm_producers(catalog).await);

        for (section, outcome) in &report.sections {
            if let SectionOutcome::Failed { error } = outcome {
                tracing::error!(section = %section, error = %error, "Cache warm-up section failed");
            }
        }
        tracing::info!(failed = ?report.failed_sections(), "Cache warm-up finished");

        report.finish()
    }

    async fn warm_featured_products(&self, catalog: &dyn CatalogSource) -> SectionOutcome {
        let limit = self.settings.warm_up.featured_products;
        let products = match catalog.featured_products(limit).await {
            Ok(products) => products,
            Err(e) => return SectionOutcome::failed(e),
        };

        match self
            .write(&self.keys.featured_products(), &products, TtlTier::Medium)
            .await
        {
            Ok(()) => SectionOutcome::succeeded("cached"),
            Err(e) => SectionOutcome::failed(e),
        }
    }

    async fn warm_category_tree(&self, catalog: &dyn CatalogSource) -> SectionOutcome {
        let tree = match catalog.category_tree().await {
            Ok(tree) => tree,
            Err(e) => return SectionOutcome::failed(e),
        };

        match self
            .write(&self.keys.category_tree(), &tree, TtlTier::Long)
            .await
        {
            Ok(()) => SectionOutcome::succeeded("cached"),
            Err(e) => SectionOutcome::failed(e),
        }
    }

    async fn warm_producers(&self, catalog: &dyn CatalogSource) -> SectionOutcome {
        let limit = self.settings.warm_up.verified_producers;
        let producers = match catalog.verified_producers(limit).await {
            Ok(producers) => producers,
            Err(e) => return SectionOutcome::failed(e),
        };

        let writes = producers.iter().map(|producer| {
            let key = self.keys.producer(producer.id);
            async move { self.write(&key, &producer.data, TtlTier::Long).await }
        });
        let results = join_all(writes).await;

        let total = results.len();
        let mut errors = results.into_iter().filter_map(Result::err);
        match errors.next() {
            None => SectionOutcome::succeeded(format!("{total} cached")),
            Some(first) => {
                let failed = 1 + errors.count();
                SectionOutcome::failed(format!(
                    "{failed} of {total} producers not cached: {first}"
                ))
            }
        }
    }

    /// Wipe the entire keyspace and the application-level caches.
    ///
    /// Unlike the `invalidate_*` family this ignores prefixes. Every section
    /// is attempted; failures are recorded in the report.
    pub async fn clear_all_caches(&self, confirmation: FlushConfirmation) -> ClearReport {
        let mut report = ClearReport::new();

        let outcome = if self.capabilities.flush {
            match self.store.flush_all().await {
                Ok(()) => SectionOutcome::succeeded("flushed"),
                Err(e) => SectionOutcome::failed(e),
            }
        } else {
            SectionOutcome::failed(format!(
                "{} store does not support flushing",
                self.store.driver()
            ))
        };
        report.record(STORE, outcome);

        self.index.clear().await;

        match &self.maintenance {
            Some(runner) => {
                for target in ClearTarget::ALL {
                    let outcome = match runner.clear(target).await {
                        Ok(()) => SectionOutcome::succeeded("cleared"),
                        Err(e) => SectionOutcome::failed(e),
                    };
                    report.record(&format!("{target}_cache"), outcome);
                }
            }
            None => tracing::debug!("No maintenance runner configured; application caches untouched"),
        }

        tracing::warn!(
            reason = confirmation.reason(),
            failed = ?report.failed_sections(),
            "All caches flushed"
        );

        report.finish()
    }

    /// Hit/miss counters and store metadata, as far as the store reports them.
    pub async fn get_cache_stats(&self) -> CacheStats {
        let stats = CacheStats::new(self.store.driver(), self.capabilities);
        if !self.capabilities.info {
            return stats;
        }

        match self.store.info().await {
            Ok(info) => stats.with_info(info),
            Err(e) => {
                tracing::warn!(error = %e, "Could not retrieve cache stats");
                CacheStats {
                    error: Some(e.to_string()),
                    ..stats
                }
            }
        }
    }
}
