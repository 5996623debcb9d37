// src/enrich.rs

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::codec::InvoiceRow;
use crate::config::Config;
use crate::mapping::CodeMapping;

/// Which column to join on, which to fill, and what to fill it with on a miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinColumns {
    pub key_column: String,
    pub derived_column: String,
    pub not_found: String,
}

impl JoinColumns {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            key_column: cfg.key_column.clone(),
            derived_column: cfg.derived_column.clone(),
            not_found: cfg.not_found.clone(),
        }
    }
}

impl Default for JoinColumns {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichStats {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
}

/// `headers` with `derived` appended unless already present.
pub fn output_headers(headers: &[String], derived: &str) -> Vec<String> {
    let mut out = headers.to_vec();
    if !out.iter().any(|h| h == derived) {
        out.push(derived.to_string());
    }
    out
}

/// Resolved display name for one row, or `None` when it should get the
/// not-found value. A key mapped to `""` is a match.
pub fn lookup<'m>(
    row: &InvoiceRow,
    mapping: &'m CodeMapping,
    key_column: &str,
) -> Option<&'m str> {
    let key = row.get(key_column).map(str::trim).unwrap_or_default();
    if key.is_empty() {
        return None;
    }
    mapping.get(key)
}

/// Join every row against `mapping` and set the derived column.
///
/// Inputs are left untouched; rows are independent, so they are resolved in
/// parallel and come back in input order.
#[instrument(level = "debug", skip_all, fields(row_count = rows.len()))]
pub fn enrich(
    rows: &[InvoiceRow],
    headers: &[String],
    mapping: &CodeMapping,
    cols: &JoinColumns,
) -> (Vec<InvoiceRow>, Vec<String>, EnrichStats) {
    let resolved: Vec<(InvoiceRow, bool)> = rows
        .par_iter()
        .map(|row| {
            let hit = lookup(row, mapping, &cols.key_column);
            let mut out = row.clone();
            out.set(&cols.derived_column, hit.unwrap_or(cols.not_found.as_str()));
            (out, hit.is_some())
        })
        .collect();

    let matched = resolved.iter().filter(|(_, hit)| *hit).count();
    let stats = EnrichStats {
        total: resolved.len(),
        matched,
        unmatched: resolved.len() - matched,
    };
    debug!(?stats, "enriched rows");

    let rows = resolved.into_iter().map(|(row, _)| row).collect();
    (rows, output_headers(headers, &cols.derived_column), stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sample_mapping() -> CodeMapping {
        [("A100", "WidgetV2"), ("A101", "Gadget"), ("E1", "")]
            .into_iter()
            .collect()
    }

    #[test]
    fn matched_row_gets_display_name() {
        let cols = JoinColumns::default();
        let row: InvoiceRow = [("관리코드", "A101"), ("주문자", "Kim")].into_iter().collect();

        let (rows, hs, stats) = enrich(&[row], &headers(&["관리코드", "주문자"]), &sample_mapping(), &cols);

        let expected: InvoiceRow = [
            ("관리코드", "A101"),
            ("주문자", "Kim"),
            ("재정의된 옵션명", "Gadget"),
        ]
        .into_iter()
        .collect();
        assert_eq!(rows, vec![expected]);
        assert_eq!(hs, headers(&["관리코드", "주문자", "재정의된 옵션명"]));
        assert_eq!(stats, EnrichStats { total: 1, matched: 1, unmatched: 0 });
    }

    #[test]
    fn misses_get_the_sentinel_and_empty_match_stays_empty() {
        let cols = JoinColumns::default();
        let hs = headers(&["관리코드", "주문자"]);
        let rows: Vec<InvoiceRow> = vec![
            [("관리코드", "Z999"), ("주문자", "a")].into_iter().collect(),
            [("관리코드", "   "), ("주문자", "b")].into_iter().collect(),
            [("주문자", "c")].into_iter().collect(),
            [("관리코드", " E1 "), ("주문자", "d")].into_iter().collect(),
            [("관리코드", " A100\t"), ("주문자", "e")].into_iter().collect(),
        ];

        let (out, _, stats) = enrich(&rows, &hs, &sample_mapping(), &cols);
        let derived: Vec<&str> = out.iter().map(|r| r.get("재정의된 옵션명").unwrap()).collect();

        assert_eq!(derived, vec!["옵션명 없음", "옵션명 없음", "옵션명 없음", "", "WidgetV2"]);
        assert_eq!(stats, EnrichStats { total: 5, matched: 2, unmatched: 3 });
    }

    #[test]
    fn rerun_does_not_duplicate_the_derived_column() {
        let cols = JoinColumns::default();
        let hs = headers(&["관리코드", "주문자"]);
        let rows: Vec<InvoiceRow> = vec![[("관리코드", "A100"), ("주문자", "Kim")].into_iter().collect()];

        let (once, hs1, _) = enrich(&rows, &hs, &sample_mapping(), &cols);
        let (twice, hs2, _) = enrich(&once, &hs1, &sample_mapping(), &cols);

        assert_eq!(hs1, hs2);
        assert_eq!(once, twice);
        assert_eq!(twice[0].len(), 3);
    }

    #[test]
    fn existing_derived_column_keeps_its_position() {
        let hs = headers(&["재정의된 옵션명", "관리코드"]);
        assert_eq!(output_headers(&hs, "재정의된 옵션명"), hs);
    }

    #[test]
    fn inputs_are_not_mutated_and_order_is_kept() {
        let cols = JoinColumns::default();
        let hs = headers(&["관리코드"]);
        let rows: Vec<InvoiceRow> = (0..500)
            .map(|i| [("관리코드", if i % 2 == 0 { "A100" } else { "nope" })].into_iter().collect())
            .collect();
        let before = rows.clone();

        let (out, _, stats) = enrich(&rows, &hs, &sample_mapping(), &cols);

        assert_eq!(rows, before);
        assert_eq!(stats.matched, 250);
        for (i, row) in out.iter().enumerate() {
            let want = if i % 2 == 0 { "WidgetV2" } else { "옵션명 없음" };
            assert_eq!(row.get("재정의된 옵션명"), Some(want));
        }
    }

    #[test]
    fn empty_mapping_sends_everything_to_sentinel() {
        let cols = JoinColumns::default();
        let rows: Vec<InvoiceRow> = vec![[("관리코드", "A100")].into_iter().collect()];
        let (out, _, stats) = enrich(&rows, &headers(&["관리코드"]), &CodeMapping::default(), &cols);
        assert_eq!(out[0].get("재정의된 옵션명"), Some("옵션명 없음"));
        assert_eq!(stats.unmatched, 1);
    }
}
