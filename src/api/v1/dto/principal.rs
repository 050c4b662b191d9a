use serde::Serialize;

use crate::services::auth::SubjectId;

#[derive(Debug, Serialize)]
pub struct PrincipalResponse {
    #[serde(rename = "Status")]
    pub status: &'static str,
    pub principal: String,
    // sorted for stable output
    pub subjects: Vec<SubjectId>,
}
