// Report production: HTML rendering on the request path, PDF conversion off it.
// Conversion always runs behind the process-isolated, time-bounded converter.

pub mod converter;
pub mod renderer;
pub mod templates;

pub use converter::{ConverterConfig, DocumentConverter, ProcessConverter};
pub use renderer::{HtmlReportRenderer, ReportData, ReportRenderer};
