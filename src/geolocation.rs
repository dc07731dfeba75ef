//! IP geolocation through ip-api.com.

use std::net::IpAddr;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GatewayError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpApiResponse {
    status: String,
    message: Option<String>,
    query: Option<String>,
    city: Option<String>,
    region_name: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpLocation {
    pub ip: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl TryFrom<IpApiResponse> for IpLocation {
    type Error = GatewayError;

    fn try_from(res: IpApiResponse) -> Result<Self, Self::Error> {
        if res.status != "success" {
            return Err(GatewayError::LocationLookup(
                res.message.unwrap_or_else(|| "unknown failure".to_string()),
            ));
        }
        let (Some(latitude), Some(longitude)) = (res.lat, res.lon) else {
            return Err(GatewayError::DataNotFound("coordinates"));
        };

        Ok(IpLocation {
            ip: res.query.unwrap_or_default(),
            city: res.city.unwrap_or_else(|| "Unknown City".to_string()),
            region: res.region_name.unwrap_or_default(),
            country: res.country.unwrap_or_default(),
            country_code: res.country_code.unwrap_or_default(),
            latitude,
            longitude,
            timezone: res.timezone.unwrap_or_default(),
        })
    }
}

/// Parses a client-supplied address. Anything else is refused before it can
/// reach the upstream URL.
pub fn parse_ip(text: &str) -> Result<IpAddr, GatewayError> {
    text.trim()
        .parse()
        .map_err(|_| GatewayError::LocationLookup(format!("invalid IP address {text:?}")))
}

#[derive(Debug, Clone)]
pub struct IpLocator {
    http: Client,
    base_url: String,
}

impl IpLocator {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Looks up `ip`, or the address ip-api sees the request coming from.
    pub async fn locate(&self, ip: Option<IpAddr>) -> Result<IpLocation, GatewayError> {
        let url = match ip {
            Some(ip) => format!("{}/json/{}", self.base_url, ip),
            None => format!("{}/json/", self.base_url),
        };
        debug!(%url, "ip lookup");

        let res = self.http.get(&url).send().await?;
        if !res.status().is_success() {
            return Err(GatewayError::UpstreamStatus {
                status: res.status().as_u16(),
                message: res.text().await.unwrap_or_default(),
            });
        }

        let json: IpApiResponse = res.json().await?;
        IpLocation::try_from(json)
    }
}
