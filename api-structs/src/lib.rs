pub mod time_conversion;
pub mod trace_view;

pub type OrganizationSlug = String;
pub type ProjectId = u64;
pub type EventId = String;
pub type SpanId = String;
