use serde_json::Value;
use std::path::Path;

/// Read the example list. A missing or malformed file yields an empty list.
pub async fn load_examples(path: &Path) -> Vec<Value> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(path = %path.display(), %err, "examples file not readable");
            return Vec::new();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(examples) => examples,
        Err(err) => {
            tracing::error!(path = %path.display(), %err, "examples file is not a JSON array");
            Vec::new()
        }
    }
}
