// src/mapping.rs

use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::codec::{self, ParseOptions};
use crate::error::MappingFetchError;
use crate::fetch::MappingSource;

/// Management code → product display name. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeMapping(HashMap<String, String>);

impl CodeMapping {
    pub fn get(&self, code: &str) -> Option<&str> {
        self.0.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Later pairs overwrite earlier ones.
impl<K, V> FromIterator<(K, V)> for CodeMapping
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HashMap::new();
        for (k, v) in iter {
            map.insert(k.into(), v.into());
        }
        CodeMapping(map)
    }
}

/// Build the mapping from reference-table text.
///
/// Lines lacking a non-empty code and name field are skipped; the kept pair is
/// trimmed, so a whitespace-only name maps to `""`. Text that does not
/// parse as CSV yields an empty mapping: every invoice row then falls through
/// to the not-found value, but the session stays usable.
pub fn mapping_from_text(text: &str) -> CodeMapping {
    let records = match codec::parse(text, ParseOptions::REFERENCE_TABLE) {
        Ok(parsed) => parsed.into_records(),
        Err(e) => {
            warn!(error = %e, "reference table did not parse; using empty mapping");
            return CodeMapping::default();
        }
    };

    let mut skipped = 0usize;
    let mapping: CodeMapping = records
        .iter()
        .filter_map(|record| match (record.first(), record.get(1)) {
            (Some(code), Some(name)) if !code.is_empty() && !name.is_empty() => {
                Some((code.trim(), name.trim()))
            }
            _ => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        warn!(skipped, "skipped incomplete reference lines");
    }
    mapping
}

/// Fetch the reference table once and build the mapping.
///
/// Transport failures propagate; parse failures do not (see [`mapping_from_text`]).
#[instrument(level = "info", skip(source), fields(origin = %source.describe()))]
pub async fn load<S: MappingSource>(source: &S) -> Result<CodeMapping, MappingFetchError> {
    let text = source.fetch_text().await?;
    let mapping = mapping_from_text(&text);
    info!(codes = mapping.len(), "reference mapping loaded");
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FileSource;
    use std::future::Future;

    struct Inline(&'static str);

    impl MappingSource for Inline {
        fn describe(&self) -> String {
            "inline".to_string()
        }

        fn fetch_text(&self) -> impl Future<Output = Result<String, MappingFetchError>> + Send {
            let text = self.0.to_string();
            async move { Ok(text) }
        }
    }

    #[test]
    fn last_duplicate_wins() {
        let mapping = mapping_from_text("A100,Widget\nA101,Gadget\nA100,WidgetV2");
        let expected: CodeMapping = [("A100", "WidgetV2"), ("A101", "Gadget")]
            .into_iter()
            .collect();
        assert_eq!(mapping, expected);
    }

    #[test]
    fn keys_and_values_are_trimmed() {
        let mapping = mapping_from_text("  A100 ,  위젯 세트  \r\n\"B 1\",\" 가젯\"\r\n");
        assert_eq!(mapping.get("A100"), Some("위젯 세트"));
        assert_eq!(mapping.get("B 1"), Some("가젯"));
        assert_eq!(mapping.get("  A100 "), None);
    }

    #[test]
    fn incomplete_lines_are_skipped() {
        let mapping = mapping_from_text(
            "A100,Widget\nonly-code\n,no code\nA102,\n\nA104,Thing,extra\n",
        );
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("A100"), Some("Widget"));
        assert_eq!(mapping.get("A102"), None);
        assert_eq!(mapping.get("A104"), Some("Thing"));
    }

    #[test]
    fn whitespace_name_is_an_empty_match_and_still_overrides() {
        let mapping = mapping_from_text("A100,Widget\nA100,   \nA103,  \n");
        assert_eq!(mapping.get("A100"), Some(""));
        assert_eq!(mapping.get("A103"), Some(""));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let mapping = mapping_from_text("a100,lower\nA100,upper\n");
        assert_eq!(mapping.get("a100"), Some("lower"));
        assert_eq!(mapping.get("A100"), Some("upper"));
    }

    #[test]
    fn unparsable_text_gives_empty_mapping() {
        let mapping = mapping_from_text("A100,\"Widget\nA101,Gadget\n");
        assert!(mapping.is_empty());
    }

    #[tokio::test]
    async fn load_builds_from_source() -> anyhow::Result<()> {
        let mapping = load(&Inline("A100,Widget\nA101,Gadget\nA100,WidgetV2")).await?;
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("A100"), Some("WidgetV2"));
        Ok(())
    }

    #[tokio::test]
    async fn load_propagates_fetch_failures() {
        let source = FileSource::new("/definitely/not/here/mcode.txt");
        let err = load(&source).await.unwrap_err();
        assert!(matches!(err, MappingFetchError::Io { .. }));
    }
}
