use anyhow::Result;
use chunk_protocol::Response;
use clap::ValueEnum;

pub const CSV_HEADER: &str = "chunk_id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One chunk id per line
    #[default]
    Lines,
    /// `chunk_id` header, one JSON-quoted id per row
    Csv,
    /// `result` protocol message
    Json,
}

pub fn render(chunks: &[String], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Lines => chunks.join("\n"),
        OutputFormat::Csv => {
            let mut out = String::from(CSV_HEADER);
            out.push('\n');
            for chunk in chunks {
                out.push_str(&serde_json::to_string(chunk)?);
                out.push('\n');
            }
            out
        }
        OutputFormat::Json => serde_json::to_string_pretty(&Response::Result {
            chunks: chunks.to_vec(),
        })?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids() -> Vec<String> {
        vec!["chunk_id_1".to_string(), "odd \"one\",x".to_string()]
    }

    #[test]
    fn csv_quotes_every_row() {
        assert_eq!(
            render(&ids(), OutputFormat::Csv).unwrap(),
            "chunk_id\n\"chunk_id_1\"\n\"odd \\\"one\\\",x\"\n"
        );
        assert_eq!(render(&[], OutputFormat::Csv).unwrap(), "chunk_id\n");
    }

    #[test]
    fn lines_and_json() {
        assert_eq!(
            render(&ids()[..1], OutputFormat::Lines).unwrap(),
            "chunk_id_1"
        );
        let value: serde_json::Value =
            serde_json::from_str(&render(&ids(), OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(value["type"], "result");
        assert_eq!(value["chunks"][0], "chunk_id_1");
    }
}
