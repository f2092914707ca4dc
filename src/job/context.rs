use crate::data::PartitionRange;
use std::fmt;

/// Label prefixed to every engine log line. Passed explicitly to each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogContext {
    Job(String),
    Range { range: PartitionRange, attempt: u32 },
    Key(String),
    Column { key: String, column: String },
}

impl LogContext {
    pub fn job(name: &str) -> Self {
        LogContext::Job(name.to_string())
    }

    pub fn range(range: PartitionRange, attempt: u32) -> Self {
        LogContext::Range { range, attempt }
    }

    pub fn key(key: &impl fmt::Display) -> Self {
        LogContext::Key(key.to_string())
    }

    pub fn column(key: &impl fmt::Display, column: &str) -> Self {
        LogContext::Column {
            key: key.to_string(),
            column: column.to_string(),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogContext::Job(name) => write!(f, "{}", name),
            LogContext::Range { range, attempt } => write!(f, "range {} attempt {}", range, attempt),
            LogContext::Key(key) => write!(f, "pk {}", key),
            LogContext::Column { key, column } => write!(f, "{}:{}", key, column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let range = PartitionRange::new(-10, 10).unwrap();
        assert_eq!(LogContext::range(range, 2).to_string(), "range [-10,10) attempt 2");
        assert_eq!(LogContext::key(&"1 %% a").to_string(), "pk 1 %% a");
        assert_eq!(LogContext::column(&"1", "name").to_string(), "1:name");
        assert_eq!(LogContext::job("diff").to_string(), "diff");
    }
}
