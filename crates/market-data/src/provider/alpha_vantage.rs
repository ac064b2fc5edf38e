//! Alpha Vantage price provider.
//!
//! Fetches latest quotes via the GLOBAL_QUOTE endpoint. The free tier is
//! limited to a handful of API calls per minute; rate-limit notices arrive
//! both as HTTP 429 and as "Note"/"Information" fields in an otherwise
//! successful response.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::Quote;
use crate::provider::PriceProvider;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Alpha Vantage latest-quote provider.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

/// GLOBAL_QUOTE response envelope.
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
}

impl AlphaVantageProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(BASE_URL, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })
    }

    /// Check the in-band error fields Alpha Vantage uses instead of HTTP
    /// status codes.
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(msg) = error_message {
            if msg.contains("Invalid API call") || msg.contains("not found") {
                return Err(MarketDataError::SymbolNotFound(msg.clone()));
            }
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: msg.clone(),
            });
        }

        // "Note" and "Information" usually indicate rate limiting
        for msg in [note, information].into_iter().flatten() {
            if msg.contains("API call frequency") || msg.contains("rate limit") {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage notice: {}", msg);
        }

        Ok(())
    }

    fn parse_quote(symbol: &str, text: &str) -> Result<Quote, MarketDataError> {
        let response: GlobalQuoteResponse =
            serde_json::from_str(text).map_err(|e| MarketDataError::ParseFailed(e.to_string()))?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        // An unknown symbol yields an empty "Global Quote" object.
        let quote = response
            .global_quote
            .filter(|q| q.price.is_some())
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let price_str = quote.price.as_deref().unwrap_or_default();
        let price = Decimal::from_str(price_str).map_err(|e| {
            MarketDataError::ParseFailed(format!("price '{}' for {}: {}", price_str, symbol, e))
        })?;

        let reported_symbol = quote.symbol.unwrap_or_else(|| symbol.to_string());
        Ok(Quote::new(reported_symbol, price, "USD"))
    }
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol)];
        let text = self.fetch(&params).await?;
        let quote = Self::parse_quote(symbol, &text)?;
        debug!("Alpha Vantage: {} priced at {}", quote.symbol, quote.price);
        Ok(quote)
    }
}
