//! Geocoder implementation using the Kakao Local `coord2address` API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use plocky_core::{
    model::Coordinate,
    ports::{GeocodeDocument, Geocoder, PortError, RoadAddress},
};

/// Production endpoint of the Kakao developer API.
pub const DEFAULT_BASE_URL: &str = "https://dapi.kakao.com";

const COORD2ADDRESS_PATH: &str = "/v2/local/geo/coord2address.json";

/// Response from /v2/local/geo/coord2address.json
#[derive(Debug, Deserialize)]
struct Coord2AddressResponse {
    #[serde(default)]
    documents: Vec<KakaoDocument>,
    // "meta" only carries total_count, no need to model it
}

/// Single candidate; `road_address` is null for points without a road-name address.
#[derive(Debug, Deserialize)]
struct KakaoDocument {
    #[serde(default)]
    road_address: Option<KakaoRoadAddress>,
}

/// Road-name address block. Kakao sends "" for missing parts.
#[derive(Debug, Deserialize)]
struct KakaoRoadAddress {
    #[serde(default)]
    region_1depth_name: String,
    #[serde(default)]
    region_2depth_name: String,
    #[serde(default)]
    region_3depth_name: String,
    #[serde(default)]
    road_name: String,
    #[serde(default)]
    main_building_no: String,
    #[serde(default)]
    sub_building_no: String,
}

impl From<KakaoRoadAddress> for RoadAddress {
    fn from(road: KakaoRoadAddress) -> Self {
        Self {
            region_1: road.region_1depth_name,
            region_2: road.region_2depth_name,
            region_3: road.region_3depth_name,
            road_name: road.road_name,
            main_building_no: road.main_building_no,
            sub_building_no: road.sub_building_no,
        }
    }
}

/// Reverse geocoder for Korean coordinates.
pub struct KakaoGeocoder {
    client: Client,
    api_key: String,
    base_url: String,
}

impl KakaoGeocoder {
    /// Create a geocoder talking to the production API.
    ///
    /// Timeouts are taken from the given client.
    #[must_use]
    pub fn new<K: Into<String>>(client: Client, api_key: K) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_BASE_URL)
    }

    /// Create a geocoder talking to another host, e.g. a local stub.
    #[must_use]
    pub fn with_base_url<K: Into<String>, U: Into<String>>(
        client: Client,
        api_key: K,
        base_url: U,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl Geocoder for KakaoGeocoder {
    async fn reverse(&self, coordinate: Coordinate) -> Result<Vec<GeocodeDocument>, PortError> {
        debug!(
            latitude = coordinate.latitude,
            longitude = coordinate.longitude,
            "Requesting Kakao coord2address"
        );

        // Kakao takes x = longitude, y = latitude.
        let req = self
            .client
            .get(format!("{}{COORD2ADDRESS_PATH}", self.base_url))
            .header("Authorization", format!("KakaoAK {}", self.api_key))
            .query(&[
                ("x", coordinate.longitude.to_string()),
                ("y", coordinate.latitude.to_string()),
            ]);

        let resp = fetch_json::<Coord2AddressResponse>(req).await?;

        Ok(resp
            .documents
            .into_iter()
            .map(|doc| GeocodeDocument {
                road_address: doc.road_address.map(RoadAddress::from),
            })
            .collect())
    }
}

// Fetch and decode JSON, keeping transport and decode failures apart.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .json()
        .await
        .map_err(|err| {
            if err.is_decode() {
                PortError::MalformedResponse(err.to_string())
            } else {
                PortError::from(err)
            }
        })
}
