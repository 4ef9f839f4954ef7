use scarlet_core::{ErrorInfo, HarnessError, RunProvenance};
use serde::{Deserialize, Serialize};

const PROVENANCE_PREFIX: &str = "# ";

/// Metrics of one matched source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    pub blend_id: String,
    /// Index of the source in the blend's truth catalog.
    pub source: usize,
    /// One value per record column; NaN when the source could not be measured.
    pub values: Vec<f64>,
}

/// Quality metrics of one dataset under one revision.
///
/// Persisted as CSV: a `# `-prefixed JSON provenance line followed by a
/// header of `blend,source,<columns...>` and one row per matched source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub provenance: RunProvenance,
    pub columns: Vec<String>,
    pub rows: Vec<RecordRow>,
}

impl MeasurementRecord {
    /// All values of a column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|column| column == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.values.get(idx).copied().unwrap_or(f64::NAN))
                .collect(),
        )
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, HarnessError> {
        let provenance = serde_json::to_string(&self.provenance)
            .map_err(|err| HarnessError::Serde(ErrorInfo::new("record-provenance", err.to_string())))?;
        let mut bytes = format!("{PROVENANCE_PREFIX}{provenance}\n").into_bytes();
        {
            let mut writer = csv::WriterBuilder::new().from_writer(&mut bytes);
            let header = ["blend", "source"]
                .into_iter()
                .map(String::from)
                .chain(self.columns.iter().cloned());
            writer
                .write_record(header)
                .map_err(|err| wrap_csv("record-write-header", err))?;
            for row in &self.rows {
                if row.values.len() != self.columns.len() {
                    return Err(HarnessError::Serde(
                        ErrorInfo::new("record-row-width", "row width does not match columns")
                            .with_context("blend", row.blend_id.clone())
                            .with_context("source", row.source.to_string()),
                    ));
                }
                let fields = [row.blend_id.clone(), row.source.to_string()]
                    .into_iter()
                    .chain(row.values.iter().map(f64::to_string));
                writer
                    .write_record(fields)
                    .map_err(|err| wrap_csv("record-write-row", err))?;
            }
            writer
                .flush()
                .map_err(|err| wrap_csv("record-flush", err.into()))?;
        }
        Ok(bytes)
    }

    pub fn from_csv_slice(data: &[u8]) -> Result<Self, HarnessError> {
        let text = std::str::from_utf8(data)
            .map_err(|err| HarnessError::Serde(ErrorInfo::new("record-utf8", err.to_string())))?;
        let (first, body) = text.split_once('\n').unwrap_or((text, ""));
        let provenance_json = first.strip_prefix(PROVENANCE_PREFIX).ok_or_else(|| {
            HarnessError::Serde(ErrorInfo::new(
                "record-provenance-missing",
                "measurement record lacks its provenance line",
            ))
        })?;
        let provenance: RunProvenance = serde_json::from_str(provenance_json)
            .map_err(|err| HarnessError::Serde(ErrorInfo::new("record-provenance", err.to_string())))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(body.as_bytes());
        let headers = reader
            .headers()
            .map_err(|err| wrap_csv("record-read-header", err))?
            .clone();
        if headers.get(0) != Some("blend") || headers.get(1) != Some("source") {
            return Err(HarnessError::Serde(ErrorInfo::new(
                "record-header",
                "measurement header must start with blend,source",
            )));
        }
        let columns: Vec<String> = headers.iter().skip(2).map(String::from).collect();
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|err| wrap_csv("record-read-row", err))?;
            let blend_id = record.get(0).unwrap_or_default().to_string();
            let source = record
                .get(1)
                .unwrap_or_default()
                .parse::<usize>()
                .map_err(|err| parse_error(&blend_id, err))?;
            let values = record
                .iter()
                .skip(2)
                .map(|field| field.parse::<f64>().map_err(|err| parse_error(&blend_id, err)))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(RecordRow {
                blend_id,
                source,
                values,
            });
        }
        Ok(Self {
            provenance,
            columns,
            rows,
        })
    }
}

fn parse_error(blend_id: &str, err: impl ToString) -> HarnessError {
    HarnessError::Serde(
        ErrorInfo::new("record-parse", "malformed measurement field")
            .with_context("blend", blend_id)
            .with_hint(err.to_string()),
    )
}

fn wrap_csv(code: &str, err: csv::Error) -> HarnessError {
    HarnessError::Serde(ErrorInfo::new(code, "CSV measurement record failure").with_hint(err.to_string()))
}
