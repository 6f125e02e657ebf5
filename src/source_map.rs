use serde::{Deserialize, Serialize};

/// Companion source map for one emitted file. `mappings` is left empty;
/// consumers only rely on the shape of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    pub version: u32,
    pub file: String,
    pub sources: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn new(output_file: &str, source_file: &str) -> Self {
        Self {
            version: 3,
            file: output_file.to_string(),
            sources: vec![source_file.to_string()],
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// `app.ets` -> `app.js`; anything else gets `.js` appended.
pub fn output_file_name(source_file: &str) -> String {
    let base = source_file.rsplit(['/', '\\']).next().unwrap_or(source_file);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.js", stem),
        _ => format!("{}.js", base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_has_required_keys() {
        let map = SourceMap::new("app.js", "src/app.ets");
        let value: serde_json::Value = serde_json::from_str(&map.to_json()).unwrap();
        for key in ["version", "mappings", "sources", "names", "file"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["version"], 3);
        assert_eq!(value["sources"][0], "src/app.ets");
    }

    #[test]
    fn output_names() {
        assert_eq!(output_file_name("src/pages/Index.ets"), "Index.js");
        assert_eq!(output_file_name("util.ts"), "util.js");
        assert_eq!(output_file_name("README"), "README.js");
    }
}
