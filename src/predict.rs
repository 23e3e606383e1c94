//! Client for the external leak-prediction service.
//!
//! The ingestion pipeline never calls this: sensor records arrive with
//! their probability already computed. Only the HTTP layer uses this
//! client, to proxy model-management requests through to the inference
//! service.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Performance metrics of the currently deployed model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    // ---
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion_matrix: Vec<Vec<u64>>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Acknowledgement returned when a retrain is queued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainResponse {
    // ---
    pub status: String,
    pub message: String,
    pub estimated_time: Option<String>,
}

// ---

pub struct PredictClient {
    // ---
    base_url: String,
    http: reqwest::Client,
}

impl PredictClient {
    pub fn new(base_url: String) -> Self {
        // ---
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch current model performance metrics.
    pub async fn get_model_metrics(&self) -> Result<ModelMetrics> {
        // ---
        let url = format!("{}/api/model/metrics", self.base_url);
        let metrics = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(metrics)
    }

    /// Queue a model retraining run.
    pub async fn retrain_model(&self) -> Result<RetrainResponse> {
        // ---
        let url = format!("{}/api/model/retrain", self.base_url);
        let response = self
            .http
            .post(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response)
    }
}

// ---

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        // ---
        let client = PredictClient::new("http://localhost:8000/".to_string());
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_metrics_deserialize_without_timestamp() {
        // ---
        let metrics: ModelMetrics = serde_json::from_str(
            r#"{
                "accuracy": 0.92,
                "precision": 0.89,
                "recall": 0.94,
                "f1_score": 0.91,
                "confusion_matrix": [[850, 50], [30, 220]]
            }"#,
        )
        .unwrap();

        assert_eq!(metrics.accuracy, 0.92);
        assert_eq!(metrics.confusion_matrix[1][1], 220);
        assert!(metrics.last_updated.is_none());
    }
}
