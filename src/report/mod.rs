mod reporter;

pub use reporter::SummaryReport;
