use serde::Deserialize;

/// Upsert request. The bio is not accepted here: it is produced by the bio
/// writer from the structured fields below.
#[derive(Debug, Deserialize)]
pub struct UpsertProfileRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: serde_json::Value,
    #[serde(default)]
    pub education: serde_json::Value,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// Plain partial update; only supplied fields change.
#[derive(Debug, Default, Deserialize)]
pub struct PatchProfileRequest {
    pub title: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<serde_json::Value>,
    pub education: Option<serde_json::Value>,
}
