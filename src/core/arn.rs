//! ARN parsing and validation.
//!
//! Format: `arn:partition:service:region:account:resource`. The resource
//! segment may itself contain colons (e.g. Secrets Manager secret IDs), so
//! everything after the fifth separator belongs to it. Region and account
//! are empty for global services such as S3.

use std::fmt;

/// A parsed Amazon Resource Name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account: String,
    pub resource: String,
}

impl Arn {
    /// Parse an ARN string. Returns a message describing the first defect.
    pub fn parse(input: &str) -> Result<Self, String> {
        let parts: Vec<&str> = input.splitn(6, ':').collect();
        if parts.len() != 6 {
            return Err(format!(
                "malformed ARN '{}': expected 6 colon-separated segments, got {}",
                input,
                parts.len()
            ));
        }
        if parts[0] != "arn" {
            return Err(format!("malformed ARN '{}': must start with 'arn:'", input));
        }
        if parts[1].is_empty() {
            return Err(format!("malformed ARN '{}': empty partition", input));
        }
        if parts[2].is_empty() {
            return Err(format!("malformed ARN '{}': empty service", input));
        }
        if parts[5].is_empty() {
            return Err(format!("malformed ARN '{}': empty resource", input));
        }

        Ok(Self {
            partition: parts[1].to_string(),
            service: parts[2].to_string(),
            region: parts[3].to_string(),
            account: parts[4].to_string(),
            resource: parts[5].to_string(),
        })
    }

    /// Parse and require a specific service (e.g. "s3", "secretsmanager").
    pub fn parse_service(input: &str, service: &str) -> Result<Self, String> {
        let arn = Self::parse(input)?;
        if arn.service != service {
            return Err(format!(
                "ARN '{}' is for service '{}', expected '{}'",
                input, arn.service, service
            ));
        }
        Ok(arn)
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account, self.resource
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_bucket_arn() {
        let arn = Arn::parse("arn:aws:s3:::my-s3-bucket/*").unwrap();
        assert_eq!(arn.partition, "aws");
        assert_eq!(arn.service, "s3");
        assert_eq!(arn.region, "");
        assert_eq!(arn.account, "");
        assert_eq!(arn.resource, "my-s3-bucket/*");
    }

    #[test]
    fn test_parse_secret_arn_with_colons_in_resource() {
        let arn =
            Arn::parse("arn:aws:secretsmanager:us-east-1:123456789012:secret:my-secret-GH69Bf4")
                .unwrap();
        assert_eq!(arn.service, "secretsmanager");
        assert_eq!(arn.region, "us-east-1");
        assert_eq!(arn.account, "123456789012");
        assert_eq!(arn.resource, "secret:my-secret-GH69Bf4");
    }

    #[test]
    fn test_roundtrip_display() {
        let input = "arn:aws:secretsmanager:us-east-1:123456789012:secret:my-secret-GH69Bf4";
        let arn = Arn::parse(input).unwrap();
        assert_eq!(arn.to_string(), input);
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        let result = Arn::parse("nra:aws:s3:::bucket");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("must start with 'arn:'"));
    }

    #[test]
    fn test_parse_rejects_short_input() {
        let result = Arn::parse("arn:aws:s3");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("6 colon-separated segments"));
    }

    #[test]
    fn test_parse_rejects_empty_service() {
        let result = Arn::parse("arn:aws::::bucket");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("empty service"));
    }

    #[test]
    fn test_parse_rejects_empty_resource() {
        let result = Arn::parse("arn:aws:s3:::");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("empty resource"));
    }

    #[test]
    fn test_parse_service_mismatch() {
        let result = Arn::parse_service("arn:aws:s3:::bucket/*", "secretsmanager");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("expected 'secretsmanager'"));
    }
}
