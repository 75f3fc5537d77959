use clap::{Parser, ValueEnum};

/// Question solution service: cached AI explanations and video suggestions.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = TracingFormat::default())]
    pub tracing: TracingFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable, for local development.
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

impl Default for TracingFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            TracingFormat::Pretty
        } else {
            TracingFormat::Json
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tracing_flag() {
        let args = Args::try_parse_from(["examverse", "--tracing", "json"]).unwrap();
        assert_eq!(args.tracing, TracingFormat::Json);
        assert!(Args::try_parse_from(["examverse", "--tracing", "xml"]).is_err());
    }
}
