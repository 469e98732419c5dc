//! Exposure dataset — CSV loading, campaign catalogue and the aggregation
//! helpers shared by every report.

use crate::config::ColumnConfig;
use crate::error::{CampaignError, CampaignResult};
use crate::types::{CampaignRef, UserRecord};
use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const MISSING_MARKERS: &[&str] = &["", "nan", "NaN", "NA", "N/A", "null", "NULL", "None"];

/// First cell that kept a column out of the numeric features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonNumericCell {
    pub column: String,
    /// File line, the header being line 1.
    pub row: usize,
    pub value: String,
}

impl NonNumericCell {
    pub fn to_error(&self) -> CampaignError {
        CampaignError::Data(format!(
            "row {}: column '{}' has non-numeric value '{}'",
            self.row, self.column, self.value
        ))
    }
}

/// In-memory exposure table.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    headers: Vec<String>,
    feature_columns: Vec<String>,
    non_numeric: Vec<NonNumericCell>,
    records: Vec<UserRecord>,
    has_quiz_score: bool,
    has_transaction_start: bool,
}

impl Dataset {
    /// Load a CSV export from disk.
    pub fn load(path: impl AsRef<Path>, columns: &ColumnConfig) -> CampaignResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(file, columns)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            features = dataset.feature_columns.len(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    /// Parse a CSV export with a header row.
    pub fn from_reader<R: Read>(reader: R, columns: &ColumnConfig) -> CampaignResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &str| find(name).ok_or_else(|| CampaignError::MissingColumn(name.to_string()));

        let user_idx = require(&columns.user_id)?;
        let campaign_idx = require(&columns.campaign)?;
        let number_idx = require(&columns.campaign_number)?;
        let purchase_idx = require(&columns.purchase)?;
        let quiz_idx = find(&columns.quiz_score);
        let transaction_idx = find(&columns.transaction_start);

        let mut rows = Vec::new();
        for result in rdr.records() {
            rows.push(result?);
        }

        // Feature columns are the remaining columns whose cells are all numeric or missing.
        let reserved = [user_idx, campaign_idx, number_idx, purchase_idx];
        let mut feature_idx = Vec::new();
        let mut non_numeric = Vec::new();
        for (idx, name) in headers.iter().enumerate() {
            if reserved.contains(&idx) {
                continue;
            }
            let offending = rows.iter().enumerate().find_map(|(i, row)| {
                let raw = row.get(idx).unwrap_or("");
                parse_cell(raw).is_err().then(|| (i + 2, raw.to_string()))
            });
            match offending {
                None => feature_idx.push(idx),
                Some((row, value)) => {
                    debug!(column = %name, row, value = %value, "Skipping non-numeric column");
                    non_numeric.push(NonNumericCell {
                        column: name.clone(),
                        row,
                        value,
                    });
                }
            }
        }

        let numeric = |row: &csv::StringRecord, line: usize, idx: usize| -> CampaignResult<Option<f64>> {
            let raw = row.get(idx).unwrap_or("");
            parse_cell(raw).map_err(|_| {
                NonNumericCell {
                    column: headers[idx].clone(),
                    row: line,
                    value: raw.to_string(),
                }
                .to_error()
            })
        };

        let mut records = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            // Header is line 1.
            let line = i + 2;
            let campaign = row
                .get(campaign_idx)
                .filter(|s| !is_missing(s))
                .map(str::to_string);
            let campaign_number = match numeric(row, line, number_idx)? {
                Some(n) if n.fract() != 0.0 => {
                    return Err(CampaignError::Data(format!(
                        "row {}: column '{}' has non-integral campaign number '{}'",
                        line,
                        headers[number_idx],
                        row.get(number_idx).unwrap_or("")
                    )));
                }
                other => other.map(|n| n as i64),
            };
            let purchase = numeric(row, line, purchase_idx)?;
            let quiz_score = match quiz_idx {
                Some(idx) => numeric(row, line, idx)?,
                None => None,
            };
            let transaction_start = match transaction_idx {
                Some(idx) => numeric(row, line, idx)?,
                None => None,
            };
            let features = feature_idx
                .iter()
                .map(|&idx| parse_cell(row.get(idx).unwrap_or("")).unwrap_or(None))
                .collect();

            records.push(UserRecord {
                user_id: row.get(user_idx).unwrap_or("").to_string(),
                campaign,
                campaign_number,
                purchase,
                quiz_score,
                transaction_start,
                features,
            });
        }

        Ok(Self {
            feature_columns: feature_idx.iter().map(|&idx| headers[idx].clone()).collect(),
            non_numeric,
            headers,
            records,
            has_quiz_score: quiz_idx.is_some(),
            has_transaction_start: transaction_idx.is_some(),
        })
    }

    pub fn records(&self) -> &[UserRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Numeric feature columns in file order.
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.feature_columns.iter().position(|c| c == name)
    }

    /// Columns left out of the features, with their first non-numeric cell.
    pub fn non_numeric_columns(&self) -> &[NonNumericCell] {
        &self.non_numeric
    }

    pub fn non_numeric_cell(&self, column: &str) -> Option<&NonNumericCell> {
        self.non_numeric.iter().find(|c| c.column == column)
    }

    pub fn feature_value(&self, record: &UserRecord, column: usize) -> Option<f64> {
        record.features.get(column).copied().flatten()
    }

    pub fn has_quiz_score(&self) -> bool {
        self.has_quiz_score
    }

    pub fn has_transaction_start(&self) -> bool {
        self.has_transaction_start
    }

    /// Distinct (number, name) pairs, sorted by campaign number.
    pub fn campaigns(&self) -> Vec<CampaignRef> {
        let pairs: BTreeSet<(i64, &str)> = self
            .records
            .iter()
            .filter_map(|r| Some((r.campaign_number?, r.campaign.as_deref()?)))
            .collect();
        pairs
            .into_iter()
            .map(|(number, name)| CampaignRef {
                number,
                name: name.to_string(),
            })
            .collect()
    }

    pub fn resolve_campaign(&self, number: i64) -> CampaignResult<CampaignRef> {
        self.campaigns()
            .into_iter()
            .find(|c| c.number == number)
            .ok_or(CampaignError::UnknownCampaign(number))
    }

    /// All rows carrying the given campaign name.
    pub fn records_for(&self, name: &str) -> Vec<&UserRecord> {
        self.records
            .iter()
            .filter(|r| r.campaign.as_deref() == Some(name))
            .collect()
    }

    /// Resolve a campaign number and return its rows (selected by name).
    pub fn campaign_records(&self, number: i64) -> CampaignResult<(CampaignRef, Vec<&UserRecord>)> {
        let campaign = self.resolve_campaign(number)?;
        let records = self.records_for(&campaign.name);
        Ok((campaign, records))
    }
}

/// Number of distinct, non-empty user ids.
pub fn unique_users<'a>(records: impl IntoIterator<Item = &'a UserRecord>) -> usize {
    records
        .into_iter()
        .filter(|r| r.has_user_id())
        .map(|r| r.user_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Sum of present purchase indicators.
pub fn purchase_total<'a>(records: impl IntoIterator<Item = &'a UserRecord>) -> f64 {
    records.into_iter().filter_map(|r| r.purchase).sum()
}

pub(crate) fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim())
}

fn parse_cell(raw: &str) -> Result<Option<f64>, ()> {
    let raw = raw.trim();
    if is_missing(raw) {
        return Ok(None);
    }
    match raw {
        "true" | "True" | "TRUE" => return Ok(Some(1.0)),
        "false" | "False" | "FALSE" => return Ok(Some(0.0)),
        _ => {}
    }
    let value: f64 = raw.parse().map_err(|_| ())?;
    Ok(if value.is_nan() { None } else { Some(value) })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
ruserid,campaign,Campaign number,purcheas_ind,safety_level_quiz_score,breach_found,country
u1,Spring,2.0,1,5,1,US
u2,Spring,2.0,0,0,0,DE
u2,Spring,2.0,1,,1,DE
u3,Winter,1,0,3,NaN,US
u4,,,0,1,0,FR
";

    fn sample() -> Dataset {
        Dataset::from_reader(SAMPLE.as_bytes(), &ColumnConfig::default()).unwrap()
    }

    #[test]
    fn test_load_detects_numeric_feature_columns() {
        let dataset = sample();
        assert_eq!(dataset.len(), 5);
        assert_eq!(
            dataset.feature_columns(),
            &["safety_level_quiz_score".to_string(), "breach_found".to_string()]
        );
        assert!(dataset.has_quiz_score());
        assert!(!dataset.has_transaction_start());

        let breach = dataset.column_index("breach_found").unwrap();
        assert_eq!(dataset.feature_value(&dataset.records()[0], breach), Some(1.0));
        assert_eq!(dataset.feature_value(&dataset.records()[3], breach), None);
    }

    #[test]
    fn test_campaign_catalogue_sorted() {
        let dataset = sample();
        let campaigns = dataset.campaigns();
        assert_eq!(campaigns.len(), 2);
        assert_eq!(campaigns[0].number, 1);
        assert_eq!(campaigns[0].name, "Winter");
        assert_eq!(campaigns[1].number, 2);
        assert_eq!(campaigns[1].name, "Spring");
    }

    #[test]
    fn test_resolve_unknown_campaign() {
        let dataset = sample();
        assert!(matches!(
            dataset.resolve_campaign(9),
            Err(CampaignError::UnknownCampaign(9))
        ));
    }

    #[test]
    fn test_aggregation_helpers() {
        let dataset = sample();
        let (campaign, rows) = dataset.campaign_records(2).unwrap();
        assert_eq!(campaign.name, "Spring");
        assert_eq!(rows.len(), 3);
        assert_eq!(unique_users(rows.iter().copied()), 2);
        assert_eq!(purchase_total(rows.iter().copied()), 2.0);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "ruserid,campaign,purcheas_ind\nu1,A,1\n";
        let err = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap_err();
        assert!(matches!(err, CampaignError::MissingColumn(c) if c == "Campaign number"));
    }

    #[test]
    fn test_non_numeric_purchase_is_reported_with_row() {
        let csv = "ruserid,campaign,Campaign number,purcheas_ind\nu1,A,1,yes\n";
        let err = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("row 2"));
        assert!(message.contains("purcheas_ind"));
    }

    #[test]
    fn test_non_numeric_column_keeps_first_bad_cell() {
        let dataset = sample();
        assert!(dataset.column_index("country").is_none());
        let cell = dataset.non_numeric_cell("country").unwrap();
        assert_eq!(cell.row, 2);
        assert_eq!(cell.value, "US");
        assert!(dataset.non_numeric_cell("breach_found").is_none());

        let csv = "ruserid,campaign,Campaign number,purcheas_ind,breach_found\n\
u1,A,1,1,1\nu2,A,1,0,0\nu3,A,1,0,unknown\n";
        let dataset = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap();
        let cell = dataset.non_numeric_cell("breach_found").unwrap();
        assert_eq!(cell.row, 4);
        let message = cell.to_error().to_string();
        assert!(message.contains("row 4"));
        assert!(message.contains("breach_found"));
        assert!(message.contains("unknown"));
    }

    #[test]
    fn test_non_integral_campaign_number_rejected() {
        let csv = "ruserid,campaign,Campaign number,purcheas_ind\nu1,A,2,1\nu2,B,2.5,0\n";
        let err = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, CampaignError::Data(_)));
        assert!(message.contains("row 3"));
        assert!(message.contains("2.5"));
    }

    #[test]
    fn test_headers_only_is_empty_dataset() {
        let csv = "ruserid,campaign,Campaign number,purcheas_ind\n";
        let dataset = Dataset::from_reader(csv.as_bytes(), &ColumnConfig::default()).unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.campaigns().is_empty());
    }
}
