use domain::ticket::Purpose;
use serde::Deserialize;
use utoipa::ToSchema;

/// Body accepted by the stream-ticket endpoint. Both fields are optional;
/// an absent TTL falls back to the configured default and an absent purpose
/// yields an unrestricted ticket.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTicketParams {
    pub(crate) ttl_seconds: Option<i64>,
    #[schema(value_type = Option<String>)]
    pub(crate) purpose: Option<Purpose>,
}
