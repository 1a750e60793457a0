//! Shared state handed to every handler.

use std::sync::Arc;

use plocky_core::{
    Geocoder, LocationResolver, MemberService, PloggingService, Store, TrashcanService,
};

/// Services behind the HTTP routes.
#[derive(Clone)]
pub struct AppState {
    /// Registration and profiles.
    pub members: Arc<MemberService>,
    /// Session recording and history.
    pub ploggings: Arc<PloggingService>,
    /// Public trash can registry.
    pub trashcans: Arc<TrashcanService>,
}

impl AppState {
    /// Build every service on top of one store and one geocoder.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, geocoder: Arc<dyn Geocoder>) -> Self {
        let resolver = LocationResolver::new(geocoder);
        Self {
            members: Arc::new(MemberService::new(Arc::clone(&store))),
            ploggings: Arc::new(PloggingService::new(Arc::clone(&store), resolver)),
            trashcans: Arc::new(TrashcanService::new(store)),
        }
    }
}
