//! Turns raw coordinates into stored locations with a readable address.

use std::sync::Arc;

use tracing::debug;

use crate::model::{Coordinate, NewLocation};
use crate::ports::{GeocodeDocument, Geocoder, PortError, RoadAddress};

/// Address used when the geocoder knows no road address for a point.
pub const FALLBACK_ADDRESS: &str = "경기 성남시 분당구 삼평동 624";

/// Resolves coordinates through a [`Geocoder`].
#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    /// Create a resolver bound to the given geocoder.
    #[must_use]
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Look up the address of a coordinate.
    ///
    /// Every call asks the geocoder; nothing is cached.
    ///
    /// # Errors
    ///
    /// Propagates the geocoder's [`PortError`] without retrying.
    pub async fn resolve(&self, coordinate: Coordinate) -> Result<NewLocation, PortError> {
        let documents = self.geocoder.reverse(coordinate).await?;
        let address = assemble_address(&documents);
        debug!(
            latitude = coordinate.latitude,
            longitude = coordinate.longitude,
            %address,
            "Resolved coordinate"
        );
        Ok(NewLocation {
            coordinate,
            address,
        })
    }
}

/// Build an address from the best geocoding candidate.
///
/// Falls back to [`FALLBACK_ADDRESS`] when there is no candidate or the best
/// candidate has no road address.
#[must_use]
pub fn assemble_address(documents: &[GeocodeDocument]) -> String {
    match documents.first().and_then(|doc| doc.road_address.as_ref()) {
        Some(road) => format_road_address(road),
        None => FALLBACK_ADDRESS.to_owned(),
    }
}

/// Join road address components, stopping at the first missing one.
///
/// The neighbourhood (`region_3`) is optional: it is skipped when empty but does
/// not cut off the road name.
#[must_use]
pub fn format_road_address(road: &RoadAddress) -> String {
    let mut parts: Vec<&str> = Vec::new();

    if road.region_1.is_empty() {
        return String::new();
    }
    parts.push(&road.region_1);

    if road.region_2.is_empty() {
        return parts.join(" ");
    }
    parts.push(&road.region_2);

    if !road.region_3.is_empty() {
        parts.push(&road.region_3);
    }

    if road.road_name.is_empty() {
        return parts.join(" ");
    }
    parts.push(&road.road_name);

    if road.main_building_no.is_empty() {
        return parts.join(" ");
    }

    let mut address = parts.join(" ");
    address.push(' ');
    address.push_str(&road.main_building_no);
    if !road.sub_building_no.is_empty() {
        address.push('-');
        address.push_str(&road.sub_building_no);
    }
    address
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    fn full_road() -> RoadAddress {
        RoadAddress {
            region_1: "서울특별시".to_owned(),
            region_2: "강남구".to_owned(),
            region_3: "역삼동".to_owned(),
            road_name: "테헤란로".to_owned(),
            main_building_no: "152".to_owned(),
            sub_building_no: "3".to_owned(),
        }
    }

    fn doc(road: RoadAddress) -> GeocodeDocument {
        GeocodeDocument {
            road_address: Some(road),
        }
    }

    #[test]
    fn full_address_uses_every_component() {
        assert_eq!(
            assemble_address(&[doc(full_road())]),
            "서울특별시 강남구 역삼동 테헤란로 152-3",
            "sub building number is hyphenated"
        );
    }

    #[test]
    fn empty_region_2_truncates_after_region_1() {
        let road = RoadAddress {
            region_2: String::new(),
            ..full_road()
        };
        assert_eq!(assemble_address(&[doc(road)]), "서울특별시", "stops at region 2");
    }

    #[test]
    fn empty_region_1_yields_empty_address() {
        let road = RoadAddress {
            region_1: String::new(),
            ..full_road()
        };
        assert_eq!(assemble_address(&[doc(road)]), "", "nothing to show");
    }

    #[test]
    fn empty_region_3_is_skipped_without_truncating() {
        let road = RoadAddress {
            region_3: String::new(),
            ..full_road()
        };
        assert_eq!(
            assemble_address(&[doc(road)]),
            "서울특별시 강남구 테헤란로 152-3",
            "road name still follows"
        );
    }

    #[test]
    fn missing_building_number_drops_sub_number() {
        let road = RoadAddress {
            main_building_no: String::new(),
            ..full_road()
        };
        assert_eq!(
            assemble_address(&[doc(road)]),
            "서울특별시 강남구 역삼동 테헤란로",
            "sub number needs a main number"
        );
    }

    #[test]
    fn missing_sub_number_keeps_main_number() {
        let road = RoadAddress {
            sub_building_no: String::new(),
            ..full_road()
        };
        assert_eq!(
            assemble_address(&[doc(road)]),
            "서울특별시 강남구 역삼동 테헤란로 152",
            "no trailing hyphen"
        );
    }

    #[test]
    fn no_documents_falls_back() {
        assert_eq!(assemble_address(&[]), FALLBACK_ADDRESS, "empty list");
        assert_eq!(
            assemble_address(&[GeocodeDocument::default()]),
            FALLBACK_ADDRESS,
            "candidate without road address"
        );
    }

    #[test]
    fn only_first_document_is_used() {
        let other = RoadAddress {
            region_1: "부산광역시".to_owned(),
            ..full_road()
        };
        let address = assemble_address(&[doc(full_road()), doc(other)]);
        assert!(address.starts_with("서울특별시"), "best match wins");
    }

    struct CountingGeocoder {
        calls: Mutex<Vec<Coordinate>>,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn reverse(&self, coordinate: Coordinate) -> Result<Vec<GeocodeDocument>, PortError> {
            self.calls.lock().expect("lock").push(coordinate);
            Ok(vec![doc(full_road())])
        }
    }

    struct DownGeocoder;

    #[async_trait]
    impl Geocoder for DownGeocoder {
        async fn reverse(&self, _coordinate: Coordinate) -> Result<Vec<GeocodeDocument>, PortError> {
            Err(PortError::MalformedResponse("garbage".to_owned()))
        }
    }

    #[tokio::test]
    async fn resolve_asks_geocoder_every_time() {
        let geocoder = Arc::new(CountingGeocoder {
            calls: Mutex::new(Vec::new()),
        });
        let resolver = LocationResolver::new(geocoder.clone());
        let point = Coordinate::new(37.5, 127.03);

        let first = resolver.resolve(point).await.expect("resolves");
        let second = resolver.resolve(point).await.expect("resolves");

        assert_eq!(first, second, "same answer");
        assert_eq!(first.coordinate, point, "coordinate kept");
        assert_eq!(geocoder.calls.lock().expect("lock").len(), 2, "no caching");
    }

    #[tokio::test]
    async fn resolve_surfaces_geocoder_failure() {
        let resolver = LocationResolver::new(Arc::new(DownGeocoder));
        let result = resolver.resolve(Coordinate::new(0.0, 0.0)).await;
        assert!(
            matches!(result, Err(PortError::MalformedResponse(_))),
            "error is propagated"
        );
    }
}
