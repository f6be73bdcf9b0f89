use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::settlement::WinnerOrder;

// ========== REQUEST MODELS ==========

/// Body of `POST /prizes/process-all`; an empty body sweeps every pending draw
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SweepRequest {
    #[validate(length(min = 1, max = 500, message = "between 1 and 500 draw ids"))]
    pub draw_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub order: WinnerOrder,
}
