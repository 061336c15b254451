//! Field-path classification for flattened JSON-bag keys
//!
//! Rebuilds the structure implied by delimiter-concatenated keys such as
//! `data__title__fr_FR` or `data__links|list`. Resolution is pure and total:
//! it never fails, it only classifies. Keys without the configured prefix are
//! left out here and treated as direct scalar field references by callers.

/// Conventions for flattened keys addressing the JSON attribute bag.
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub prefix: String,
    pub delimiter: String,
    pub list_marker: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            prefix: "data__".to_string(),
            delimiter: "__".to_string(),
            list_marker: "|list".to_string(),
        }
    }
}

impl PathConfig {
    pub fn from_search_config(config: &crate::config::SearchConfig) -> Self {
        Self {
            prefix: config.data_prefix.clone(),
            delimiter: config.data_delimiter.clone(),
            list_marker: config.list_marker.clone(),
        }
    }
}

/// A classified flattened key: the original key, its ordered path segments
/// with the delimiter removed, and whether the value is a comma list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPath {
    pub key: String,
    pub segments: Vec<String>,
    pub is_list: bool,
}

/// Classify the JSON-path keys among `keys`.
///
/// `data__title__fr_FR` becomes `(key, ["data", "title", "fr_FR"], false)`;
/// `data__links|list` becomes `(key, ["data", "links"], true)`.
pub fn data_paths<'a, I>(keys: I, config: &PathConfig) -> Vec<DataPath>
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter()
        .filter(|key| key.starts_with(&config.prefix))
        .map(|key| {
            let (base, is_list) = match key.strip_suffix(&config.list_marker) {
                Some(base) => (base, true),
                None => (key, false),
            };
            DataPath {
                key: key.to_string(),
                segments: base
                    .split(config.delimiter.as_str())
                    .map(|s| s.to_string())
                    .collect(),
                is_list,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_json_paths_and_skips_scalar_keys() {
        let config = PathConfig::default();
        let paths = data_paths(
            ["data__title__fr_FR", "slug", "data__links|list", "title"],
            &config,
        );

        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].segments, vec!["data", "title", "fr_FR"]);
        assert!(!paths[0].is_list);
        assert_eq!(paths[0].key, "data__title__fr_FR");
        assert_eq!(paths[1].segments, vec!["data", "links"]);
        assert!(paths[1].is_list);
        assert_eq!(paths[1].key, "data__links|list");
    }

    #[test]
    fn resolution_is_total() {
        let config = PathConfig::default();
        // Degenerate inputs classify without panicking.
        let paths = data_paths(["data__", "data____x", "data__|list"], &config);
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[1].segments, vec!["data", "", "x"]);
    }

    #[test]
    fn alternate_conventions() {
        let config = PathConfig {
            prefix: "meta.".to_string(),
            delimiter: ".".to_string(),
            list_marker: "#list".to_string(),
        };
        let paths = data_paths(["meta.title.en", "meta.tags#list", "data__x"], &config);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].segments, vec!["meta", "title", "en"]);
        assert_eq!(paths[1].segments, vec!["meta", "tags"]);
        assert!(paths[1].is_list);
    }
}
