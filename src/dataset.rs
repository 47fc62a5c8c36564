//! Dataset classification — maps an S3 object key to an Elastic Common
//! Schema dataset name by first-match-wins substring search, ported from
//! `shippers/es.py::discover_dataset`.

/// Ordered, first-match-wins substring table. Order matters: e.g.
/// `"elasticloadbalancing"` must be checked before any more generic
/// `"logs"`-like substring that could also appear in an ELB key.
const DATASET_TABLE: &[(&str, &str)] = &[
    ("/CloudTrail-Digest/", "aws.cloudtrail"),
    ("/CloudTrail-Insight/", "aws.cloudtrail"),
    ("/CloudTrail/", "aws.cloudtrail"),
    ("exportedlogs", "aws.cloudwatch_logs"),
    ("awslogs", "aws.cloudwatch_logs"),
    ("/elasticloadbalancing/", "aws.elb_logs"),
    ("/network-firewall/", "aws.firewall_logs"),
    ("lambda", "aws.lambda"),
    ("/SMSUsageReports/", "aws.sns"),
    ("/StorageLens/", "aws.s3_storage_lens"),
    ("/vpcflowlogs/", "aws.vpcflow"),
    ("/WAFLogs/", "aws.waf"),
];

const GENERIC_DATASET: &str = "generic";

/// Classify an S3 object key into a dataset name. An empty key (no object
/// key recoverable from the triggering event) also falls back to generic.
pub fn classify_dataset(object_key: &str) -> &'static str {
    if object_key.is_empty() {
        return GENERIC_DATASET;
    }
    for (needle, dataset) in DATASET_TABLE {
        if object_key.contains(needle) {
            return dataset;
        }
    }
    GENERIC_DATASET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_generic() {
        assert_eq!(classify_dataset(""), "generic");
    }

    #[test]
    fn unmatched_key_is_generic() {
        assert_eq!(classify_dataset("some/random/key.json"), "generic");
    }

    #[test]
    fn cloudtrail_digest_file() {
        assert_eq!(
            classify_dataset("AWSLogs/123456789012/CloudTrail-Digest/us-east-1/2024/01/01/file.json.gz"),
            "aws.cloudtrail"
        );
    }

    #[test]
    fn cloudwatch_logs_exported() {
        assert_eq!(classify_dataset("exportedlogs/2024/01/01/log.gz"), "aws.cloudwatch_logs");
    }

    #[test]
    fn elb_logs() {
        assert_eq!(
            classify_dataset("AWSLogs/123456789012/elasticloadbalancing/us-east-1/2024/01/01/file.log.gz"),
            "aws.elb_logs"
        );
    }

    #[test]
    fn vpc_flow_logs() {
        assert_eq!(classify_dataset("AWSLogs/123456789012/vpcflowlogs/file.log.gz"), "aws.vpcflow");
    }

    #[test]
    fn waf_logs() {
        assert_eq!(classify_dataset("AWSLogs/123456789012/WAFLogs/file.log.gz"), "aws.waf");
    }

    #[test]
    fn lambda_logs() {
        assert_eq!(classify_dataset("aws/lambda/my-function/file.gz"), "aws.lambda");
    }

    #[test]
    fn first_match_wins_ordering() {
        // A key containing both a CloudTrail-Digest marker and "lambda"
        // must resolve to cloudtrail, since that entry is earlier in the
        // table.
        assert_eq!(
            classify_dataset("AWSLogs/123/CloudTrail-Digest/lambda/file.json.gz"),
            "aws.cloudtrail"
        );
    }
}
