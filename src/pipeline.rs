//! Per-station pipeline: resolve, query layers, download, extract
//!
//! Every stage except the downloads runs on the calling thread. A failing
//! registry lookup or layer query ends processing of that station only.

use crate::azimuth::AzimuthTableExtractor;
use crate::config::PipelineConfig;
use crate::fetcher::DocumentFetcher;
use crate::http::HttpSource;
use crate::rate_limit::RateLimiter;
use crate::record::{StationId, StationResultSet};
use crate::registry::StationResolver;
use crate::wfs::FeatureQueryClient;
use crate::ScrapeError;
use log::{error, info, warn};

/// Outcome of one station in a batch run
pub type StationOutcome = (StationId, Result<StationResultSet, ScrapeError>);

pub struct StationPipeline<H> {
    http: H,
    config: PipelineConfig,
    extractor: AzimuthTableExtractor,
}

impl<H: HttpSource> StationPipeline<H> {
    pub fn new(http: H, config: PipelineConfig) -> Result<Self, ScrapeError> {
        config.validate()?;
        Ok(Self {
            http,
            config,
            extractor: AzimuthTableExtractor::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one station
    ///
    /// A station without reports, or whose reports all failed to download,
    /// yields an empty result set rather than an error.
    pub fn run(&self, id: &StationId) -> Result<StationResultSet, ScrapeError> {
        let bbox = StationResolver::new(&self.http, self.config.registry_url.as_str()).resolve(id)?;

        let references = FeatureQueryClient::new(&self.http, self.config.wfs_url.as_str())
            .collect_references(&bbox, &self.config.layers)?;
        if references.is_empty() {
            info!("No PDFs found for station {}", id);
            return Ok(StationResultSet::empty(id.clone()));
        }

        let fetcher = DocumentFetcher::new(
            &self.http,
            self.config.download_dir.clone(),
            self.config.max_concurrent_downloads,
        );
        let mut documents = fetcher.fetch_all(&references)?;
        if documents.is_empty() {
            warn!("No PDF for station {} was downloaded successfully", id);
            return Ok(StationResultSet::empty(id.clone()));
        }

        // Download completion order is arbitrary
        documents.sort_by(|a, b| a.path.cmp(&b.path));

        let records = documents
            .iter()
            .map(|document| self.extractor.extract(document, id))
            .collect();

        Ok(StationResultSet {
            station_id: id.clone(),
            records,
        })
    }

    /// Process stations one after another; a failure never stops the batch
    pub fn run_batch(&self, ids: &[StationId]) -> Vec<StationOutcome> {
        let mut limiter = RateLimiter::new(self.config.registry_cooldown());

        ids.iter()
            .map(|id| {
                limiter.acquire();
                let result = self.run(id);
                match &result {
                    Ok(set) => info!(
                        "Station {}: {} records, {} with azimuths",
                        id,
                        set.len(),
                        set.successes().count()
                    ),
                    Err(e) => error!("Station {} failed: {}", id, e),
                }
                (id.clone(), result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;

    /// Registry answers with an empty array for every station
    struct EmptyRegistry;

    impl HttpSource for EmptyRegistry {
        fn get(&self, _url: &str, _query: &[(&str, &str)]) -> Result<HttpResponse, ScrapeError> {
            Ok(HttpResponse::new(200, "[]"))
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            max_concurrent_downloads: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            StationPipeline::new(EmptyRegistry, config),
            Err(ScrapeError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_station_is_not_found() {
        let pipeline = StationPipeline::new(EmptyRegistry, PipelineConfig::default()).unwrap();
        let id = StationId::new("99999").unwrap();
        assert!(matches!(pipeline.run(&id), Err(ScrapeError::NotFound(_))));
    }

    #[test]
    fn test_batch_keeps_every_station() {
        let pipeline = StationPipeline::new(EmptyRegistry, PipelineConfig::default()).unwrap();
        let ids = vec![StationId::new("1").unwrap(), StationId::new("2").unwrap()];
        let outcomes = pipeline.run_batch(&ids);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].0.as_str(), "2");
        assert!(outcomes.iter().all(|(_, r)| r.is_err()));
    }
}
