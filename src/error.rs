use thiserror::Error;

/// Failure to turn an uploaded file into order records. Loads are
/// all-or-nothing: any of these aborts the whole file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read order file: {0}")]
    Io(#[from] std::io::Error),
    #[error("order file is not valid delimited text: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read xlsx workbook: {0}")]
    Workbook(String),
    #[error("unsupported file format: .{0} (only .csv/.xlsx)")]
    UnsupportedFormat(String),
    #[error("order file has no header row")]
    NoHeader,
    #[error("missing column: {column}")]
    MissingColumn { column: String },
    #[error("line {line}: order_date cannot be parsed as a timestamp: {value:?}")]
    InvalidDate { line: usize, value: String },
    #[error("line {line}: invalid value for {column}: {value:?}")]
    InvalidField {
        line: usize,
        column: String,
        value: String,
    },
}

impl LoadError {
    pub(crate) fn invalid_field(line: usize, column: &str, value: &str) -> Self {
        LoadError::InvalidField {
            line,
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("No data matches the selected filters. Please adjust your selections.")]
    EmptyResult,
    #[error("order amounts are too large to total")]
    AmountOverflow,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file is not valid JSON ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("disposable domain rules file cannot be read ({path}): {source}")]
    Rules {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("top_products_limit must be at least 1")]
    InvalidTopProductsLimit,
}

/// Anything a dashboard query can end in, with the category the JSON
/// adapter reports.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl QueryError {
    pub fn category(&self) -> &'static str {
        match self {
            QueryError::Validation(_) => "VALIDATION_ERROR",
            QueryError::Load(_) => "LOAD_ERROR",
            QueryError::Pipeline(PipelineError::EmptyResult) => "EMPTY_RESULT",
            QueryError::Pipeline(PipelineError::AmountOverflow) => "AMOUNT_OVERFLOW",
            QueryError::Settings(_) => "SETTINGS_ERROR",
        }
    }
}
