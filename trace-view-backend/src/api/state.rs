use crate::collaborators::event_store::EventStore;
use crate::collaborators::search::TraceSearch;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<dyn TraceSearch>,
    pub event_store: Arc<dyn EventStore>,
}
