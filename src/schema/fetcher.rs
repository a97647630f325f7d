use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use super::ResourceSchema;
use crate::error::LeastError;

/// Retrieves a resource schema that is not available locally.
pub trait SchemaFetcher: Send + Sync {
    fn fetch(&self, canonical: &str) -> Result<ResourceSchema, LeastError>;
}

/// Fetches schemas from the CloudFormation registry through the AWS CLI.
#[derive(Debug, Clone)]
pub struct AwsCliFetcher {
    program: String,
}

impl Default for AwsCliFetcher {
    fn default() -> Self {
        Self {
            program: "aws".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct DescribeTypeOutput {
    #[serde(rename = "Schema")]
    schema: String,
}

impl AwsCliFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable, e.g. a wrapper script.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Whether the CLI can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Extract the schema document from `describe-type` output.
    pub fn parse_describe_type(output: &[u8]) -> Result<ResourceSchema, LeastError> {
        let response: DescribeTypeOutput = serde_json::from_slice(output)
            .map_err(|e| LeastError::FetchError(format!("parsing aws response: {e}")))?;
        ResourceSchema::from_slice(response.schema.as_bytes())
    }
}

impl SchemaFetcher for AwsCliFetcher {
    fn fetch(&self, canonical: &str) -> Result<ResourceSchema, LeastError> {
        debug!(event = "SchemaFetch", phase = "Start", type_name = %canonical);
        let output = Command::new(&self.program)
            .args([
                "cloudformation",
                "describe-type",
                "--type",
                "RESOURCE",
                "--type-name",
                canonical,
                "--output",
                "json",
            ])
            .output()
            .map_err(|e| LeastError::FetchError(format!("executing {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(LeastError::FetchError(format!(
                "aws cli error: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::parse_describe_type(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_describe_type_output() {
        let output = serde_json::json!({
            "Arn": "arn:aws:cloudformation:us-east-1::type/resource/AWS-SQS-Queue",
            "Type": "RESOURCE",
            "TypeName": "AWS::SQS::Queue",
            "Schema": "{\"typeName\":\"AWS::SQS::Queue\",\"handlers\":{\"create\":{\"permissions\":[\"sqs:CreateQueue\"]}}}"
        });
        let schema =
            AwsCliFetcher::parse_describe_type(output.to_string().as_bytes()).unwrap();
        assert_eq!(schema.type_name, "AWS::SQS::Queue");
        assert!(schema.permissions().all().contains("sqs:CreateQueue"));
    }

    #[test]
    fn test_parse_describe_type_without_schema() {
        assert!(matches!(
            AwsCliFetcher::parse_describe_type(br#"{"TypeName": "AWS::SQS::Queue"}"#),
            Err(LeastError::FetchError(_))
        ));
    }

    #[test]
    fn test_missing_program_is_fetch_error() {
        let fetcher = AwsCliFetcher::with_program("least-core-no-such-binary");
        assert!(!fetcher.is_available());
        assert!(matches!(
            fetcher.fetch("AWS::S3::Bucket"),
            Err(LeastError::FetchError(_))
        ));
    }
}
