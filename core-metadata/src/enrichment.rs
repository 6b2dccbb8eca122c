//! # Enrichment Pipeline
//!
//! Attaches covers and display fields to freshly imported records.
//!
//! Records are looked up in fixed-size batches. Lookups inside a batch run
//! concurrently; batches run one after another with a fixed pause between
//! them so the public cover APIs are not flooded. A record whose lookup
//! misses keeps no cover; nothing is retried.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::enrichment::EnrichmentPipeline;
//! use core_metadata::resolver::CoverResolver;
//! use core_runtime::config::EnrichmentSettings;
//! use std::sync::Arc;
//!
//! let resolver = Arc::new(CoverResolver::with_defaults(http_client, &cover_config));
//! let pipeline = EnrichmentPipeline::new(resolver, EnrichmentSettings::default())
//!     .with_event_bus(event_bus.clone());
//!
//! let enriched = pipeline.enrich(records).await;
//! ```

use crate::resolver::{CoverLookup, CoverQuery};
use core_library::models::{EnrichedBookRecord, RawBookRecord};
use core_runtime::config::EnrichmentSettings;
use core_runtime::events::{CoreEvent, EventBus, ImportEvent};
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

/// Batched cover enrichment.
pub struct EnrichmentPipeline {
    lookup: Arc<dyn CoverLookup>,
    settings: EnrichmentSettings,
    event_bus: Option<EventBus>,
}

impl EnrichmentPipeline {
    pub fn new(lookup: Arc<dyn CoverLookup>, settings: EnrichmentSettings) -> Self {
        Self {
            lookup,
            settings,
            event_bus: None,
        }
    }

    /// Publish `ImportEvent::BatchEnriched` after every batch.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn settings(&self) -> &EnrichmentSettings {
        &self.settings
    }

    /// Enriches every record, preserving input order.
    #[instrument(skip_all, fields(total = records.len()))]
    pub async fn enrich(&self, records: Vec<RawBookRecord>) -> Vec<EnrichedBookRecord> {
        let total = records.len();
        let batch_size = self.settings.batch_size.max(1);
        let batch_count = total.div_ceil(batch_size);
        let mut enriched = Vec::with_capacity(total);
        let mut pending = records.into_iter().peekable();
        let mut batch = 0;

        while pending.peek().is_some() {
            batch += 1;
            let chunk: Vec<RawBookRecord> = pending.by_ref().take(batch_size).collect();
            debug!(batch, of = batch_count, size = chunk.len(), "Enriching batch");

            let results = join_all(chunk.into_iter().map(|record| self.enrich_one(record))).await;
            let covers_found = results.iter().filter(|r| r.has_cover()).count();
            enriched.extend(results);

            info!(
                batch,
                completed = enriched.len(),
                total,
                covers_found,
                "Enrichment batch completed"
            );
            if let Some(bus) = &self.event_bus {
                bus.emit(CoreEvent::Import(ImportEvent::BatchEnriched {
                    batch,
                    completed: enriched.len(),
                    total,
                    covers_found,
                }));
            }

            if pending.peek().is_some() {
                sleep(self.settings.batch_delay()).await;
            }
        }

        enriched
    }

    async fn enrich_one(&self, record: RawBookRecord) -> EnrichedBookRecord {
        let query = CoverQuery::new(record.title.clone(), record.author.clone())
            .with_isbn13(record.isbn13())
            .with_isbn10(record.isbn10());

        let found = self.lookup.lookup(&query).await;
        let enriched = EnrichedBookRecord::from_raw(record);
        match found {
            Some(cover) => enriched.with_cover(
                cover.cover_url,
                Some(cover.thumbnail_url),
                cover.source.as_str(),
            ),
            None => enriched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{CoverLookupResult, CoverSource, MockCoverLookup};
    use core_library::models::ExclusiveShelf;
    use std::time::Duration;
    use tokio::time::Instant;

    fn record(n: usize) -> RawBookRecord {
        RawBookRecord {
            book_id: n.to_string(),
            title: format!("Book {}", n),
            author: "Some Author".to_string(),
            isbn13: if n % 2 == 0 { format!("97800000000{:02}", n) } else { String::new() },
            number_of_pages: 350,
            date_read: "2023/04/01".to_string(),
            exclusive_shelf: ExclusiveShelf::Read,
            ..Default::default()
        }
    }

    fn even_titles_have_covers() -> MockCoverLookup {
        let mut lookup = MockCoverLookup::new();
        lookup.expect_lookup().returning(|query| {
            query.isbn13.as_ref().map(|isbn| {
                CoverLookupResult::new(format!("https://covers/{}.jpg", isbn), CoverSource::GoogleIsbn13)
            })
        });
        lookup
    }

    #[tokio::test(start_paused = true)]
    async fn test_twelve_records_run_in_three_batches() {
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let pipeline = EnrichmentPipeline::new(
            Arc::new(even_titles_have_covers()),
            EnrichmentSettings::default(),
        )
        .with_event_bus(bus);

        let started = Instant::now();
        let enriched = pipeline.enrich((0..12).map(record).collect()).await;

        // two pauses: none after the last batch
        assert_eq!(started.elapsed(), Duration::from_secs(2));

        let ids: Vec<_> = enriched.iter().map(|e| e.record.book_id.as_str()).collect();
        let expected: Vec<String> = (0..12).map(|n| n.to_string()).collect();
        assert_eq!(ids, expected);

        let mut progress = Vec::new();
        while let Ok(CoreEvent::Import(ImportEvent::BatchEnriched { batch, completed, .. })) =
            events.try_recv()
        {
            progress.push((batch, completed));
        }
        assert_eq!(progress, vec![(1, 5), (2, 10), (3, 12)]);
    }

    struct SlowLookup;

    #[async_trait::async_trait]
    impl CoverLookup for SlowLookup {
        async fn lookup(&self, _query: &CoverQuery) -> Option<CoverLookupResult> {
            sleep(Duration::from_millis(100)).await;
            None
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookups_in_a_batch_overlap() {
        let pipeline = EnrichmentPipeline::new(Arc::new(SlowLookup), EnrichmentSettings::default());

        let started = Instant::now();
        pipeline.enrich((0..5).map(record).collect()).await;
        assert_eq!(started.elapsed(), Duration::from_millis(100));

        let started = Instant::now();
        pipeline.enrich((0..7).map(record).collect()).await;
        assert_eq!(started.elapsed(), Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_misses_leave_cover_unset() {
        let pipeline = EnrichmentPipeline::new(
            Arc::new(even_titles_have_covers()),
            EnrichmentSettings::default(),
        );

        let enriched = pipeline.enrich(vec![record(1), record(2)]).await;

        assert!(!enriched[0].has_cover());
        assert_eq!(
            enriched[1].cover_url.as_deref(),
            Some("https://covers/9780000000002.jpg")
        );
        assert_eq!(enriched[1].thumbnail_url, enriched[1].cover_url);
        assert_eq!(enriched[1].cover_source.as_deref(), Some("Google-ISBN13"));
        assert_eq!(enriched[1].year_read, Some(2023));
        assert_eq!(enriched[1].spine_width, 20.0);
    }

    #[tokio::test]
    async fn test_one_lookup_per_record_with_both_isbns() {
        let mut lookup = MockCoverLookup::new();
        lookup
            .expect_lookup()
            .withf(|query| {
                query.isbn13.as_deref() == Some("9780441013593")
                    && query.isbn10.as_deref() == Some("0441013597")
            })
            .times(1)
            .returning(|_| None);

        let pipeline = EnrichmentPipeline::new(Arc::new(lookup), EnrichmentSettings::default());
        let record = RawBookRecord {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            isbn: "0441013597".into(),
            isbn13: "9780441013593".into(),
            ..Default::default()
        };

        let enriched = pipeline.enrich(vec![record]).await;
        assert_eq!(enriched.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let pipeline = EnrichmentPipeline::new(
            Arc::new(MockCoverLookup::new()),
            EnrichmentSettings::default(),
        );
        assert!(pipeline.enrich(Vec::new()).await.is_empty());
    }
}
