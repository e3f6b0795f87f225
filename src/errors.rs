use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    ArrowError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Chart error: {0}")]
    ChartError(String),

    #[error("PDF error: {0}")]
    PdfError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;

// 用于从字符串创建错误
impl From<String> for ReportError {
    fn from(s: String) -> Self {
        ReportError::Unknown(s)
    }
}

// 用于从&str创建错误
impl From<&str> for ReportError {
    fn from(s: &str) -> Self {
        ReportError::Unknown(s.to_string())
    }
}
