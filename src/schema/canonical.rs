//! Translation between Terraform resource kinds and CloudFormation type names.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Kinds whose CloudFormation name does not follow from the structural rule,
/// or that share a schema with a parent resource.
const EXPLICIT: &[(&str, &str)] = &[
    // EC2
    ("aws_instance", "AWS::EC2::Instance"),
    ("aws_eip", "AWS::EC2::EIP"),
    ("aws_eip_association", "AWS::EC2::EIPAssociation"),
    ("aws_security_group", "AWS::EC2::SecurityGroup"),
    ("aws_security_group_rule", "AWS::EC2::SecurityGroupIngress"),
    ("aws_network_interface", "AWS::EC2::NetworkInterface"),
    ("aws_key_pair", "AWS::EC2::KeyPair"),
    ("aws_launch_template", "AWS::EC2::LaunchTemplate"),
    ("aws_placement_group", "AWS::EC2::PlacementGroup"),

    // VPC
    ("aws_vpc", "AWS::EC2::VPC"),
    ("aws_subnet", "AWS::EC2::Subnet"),
    ("aws_internet_gateway", "AWS::EC2::InternetGateway"),
    ("aws_nat_gateway", "AWS::EC2::NatGateway"),
    ("aws_route_table", "AWS::EC2::RouteTable"),
    ("aws_route", "AWS::EC2::Route"),
    ("aws_route_table_association", "AWS::EC2::SubnetRouteTableAssociation"),
    ("aws_vpc_endpoint", "AWS::EC2::VPCEndpoint"),
    ("aws_vpc_peering_connection", "AWS::EC2::VPCPeeringConnection"),
    ("aws_network_acl", "AWS::EC2::NetworkAcl"),
    ("aws_network_acl_rule", "AWS::EC2::NetworkAclEntry"),

    // S3
    ("aws_s3_bucket", "AWS::S3::Bucket"),
    ("aws_s3_bucket_policy", "AWS::S3::BucketPolicy"),
    ("aws_s3_bucket_versioning", "AWS::S3::Bucket"),
    ("aws_s3_bucket_acl", "AWS::S3::Bucket"),
    ("aws_s3_bucket_cors_configuration", "AWS::S3::Bucket"),
    ("aws_s3_bucket_lifecycle_configuration", "AWS::S3::Bucket"),
    ("aws_s3_bucket_logging", "AWS::S3::Bucket"),
    ("aws_s3_bucket_public_access_block", "AWS::S3::Bucket"),

    // IAM
    ("aws_iam_role", "AWS::IAM::Role"),
    ("aws_iam_policy", "AWS::IAM::ManagedPolicy"),
    ("aws_iam_role_policy", "AWS::IAM::Policy"),
    ("aws_iam_role_policy_attachment", "AWS::IAM::Role"),
    ("aws_iam_user", "AWS::IAM::User"),
    ("aws_iam_user_policy", "AWS::IAM::Policy"),
    ("aws_iam_user_policy_attachment", "AWS::IAM::User"),
    ("aws_iam_group", "AWS::IAM::Group"),
    ("aws_iam_group_policy", "AWS::IAM::Policy"),
    ("aws_iam_group_policy_attachment", "AWS::IAM::Group"),
    ("aws_iam_instance_profile", "AWS::IAM::InstanceProfile"),

    // Lambda
    ("aws_lambda_function", "AWS::Lambda::Function"),
    ("aws_lambda_permission", "AWS::Lambda::Permission"),
    ("aws_lambda_event_source_mapping", "AWS::Lambda::EventSourceMapping"),
    ("aws_lambda_layer_version", "AWS::Lambda::LayerVersion"),
    ("aws_lambda_alias", "AWS::Lambda::Alias"),

    // DynamoDB
    ("aws_dynamodb_table", "AWS::DynamoDB::Table"),
    ("aws_dynamodb_global_table", "AWS::DynamoDB::GlobalTable"),

    // RDS
    ("aws_db_instance", "AWS::RDS::DBInstance"),
    ("aws_db_cluster", "AWS::RDS::DBCluster"),
    ("aws_db_subnet_group", "AWS::RDS::DBSubnetGroup"),
    ("aws_db_parameter_group", "AWS::RDS::DBParameterGroup"),
    ("aws_db_cluster_parameter_group", "AWS::RDS::DBClusterParameterGroup"),
    ("aws_rds_cluster", "AWS::RDS::DBCluster"),

    // ECS
    ("aws_ecs_cluster", "AWS::ECS::Cluster"),
    ("aws_ecs_service", "AWS::ECS::Service"),
    ("aws_ecs_task_definition", "AWS::ECS::TaskDefinition"),

    // EKS
    ("aws_eks_cluster", "AWS::EKS::Cluster"),
    ("aws_eks_node_group", "AWS::EKS::Nodegroup"),
    ("aws_eks_addon", "AWS::EKS::Addon"),

    // CloudWatch
    ("aws_cloudwatch_log_group", "AWS::Logs::LogGroup"),
    ("aws_cloudwatch_log_stream", "AWS::Logs::LogStream"),
    ("aws_cloudwatch_metric_alarm", "AWS::CloudWatch::Alarm"),
    ("aws_cloudwatch_dashboard", "AWS::CloudWatch::Dashboard"),

    // SNS/SQS
    ("aws_sns_topic", "AWS::SNS::Topic"),
    ("aws_sns_topic_policy", "AWS::SNS::TopicPolicy"),
    ("aws_sns_topic_subscription", "AWS::SNS::Subscription"),
    ("aws_sqs_queue", "AWS::SQS::Queue"),
    ("aws_sqs_queue_policy", "AWS::SQS::QueuePolicy"),

    // API Gateway
    ("aws_api_gateway_rest_api", "AWS::ApiGateway::RestApi"),
    ("aws_api_gateway_resource", "AWS::ApiGateway::Resource"),
    ("aws_api_gateway_method", "AWS::ApiGateway::Method"),
    ("aws_api_gateway_integration", "AWS::ApiGateway::Method"),
    ("aws_api_gateway_deployment", "AWS::ApiGateway::Deployment"),
    ("aws_api_gateway_stage", "AWS::ApiGateway::Stage"),
    ("aws_apigatewayv2_api", "AWS::ApiGatewayV2::Api"),
    ("aws_apigatewayv2_stage", "AWS::ApiGatewayV2::Stage"),
    ("aws_apigatewayv2_route", "AWS::ApiGatewayV2::Route"),
    ("aws_apigatewayv2_integration", "AWS::ApiGatewayV2::Integration"),

    // Secrets Manager / SSM
    ("aws_secretsmanager_secret", "AWS::SecretsManager::Secret"),
    ("aws_secretsmanager_secret_version", "AWS::SecretsManager::Secret"),
    ("aws_ssm_parameter", "AWS::SSM::Parameter"),

    // KMS
    ("aws_kms_key", "AWS::KMS::Key"),
    ("aws_kms_alias", "AWS::KMS::Alias"),

    // ACM
    ("aws_acm_certificate", "AWS::CertificateManager::Certificate"),
    ("aws_acm_certificate_validation", "AWS::CertificateManager::Certificate"),

    // Route53
    ("aws_route53_zone", "AWS::Route53::HostedZone"),
    ("aws_route53_record", "AWS::Route53::RecordSet"),

    // CloudFront
    ("aws_cloudfront_distribution", "AWS::CloudFront::Distribution"),
    ("aws_cloudfront_origin_access_identity", "AWS::CloudFront::CloudFrontOriginAccessIdentity"),

    // Elasticache
    ("aws_elasticache_cluster", "AWS::ElastiCache::CacheCluster"),
    ("aws_elasticache_replication_group", "AWS::ElastiCache::ReplicationGroup"),
    ("aws_elasticache_subnet_group", "AWS::ElastiCache::SubnetGroup"),

    // ELB
    ("aws_lb", "AWS::ElasticLoadBalancingV2::LoadBalancer"),
    ("aws_alb", "AWS::ElasticLoadBalancingV2::LoadBalancer"),
    ("aws_lb_target_group", "AWS::ElasticLoadBalancingV2::TargetGroup"),
    ("aws_alb_target_group", "AWS::ElasticLoadBalancingV2::TargetGroup"),
    ("aws_lb_listener", "AWS::ElasticLoadBalancingV2::Listener"),
    ("aws_alb_listener", "AWS::ElasticLoadBalancingV2::Listener"),
    ("aws_lb_listener_rule", "AWS::ElasticLoadBalancingV2::ListenerRule"),

    // Step Functions
    ("aws_sfn_state_machine", "AWS::StepFunctions::StateMachine"),
    ("aws_sfn_activity", "AWS::StepFunctions::Activity"),

    // EventBridge
    ("aws_cloudwatch_event_rule", "AWS::Events::Rule"),
    ("aws_cloudwatch_event_target", "AWS::Events::Rule"),

    // CodeBuild/CodePipeline
    ("aws_codebuild_project", "AWS::CodeBuild::Project"),
    ("aws_codepipeline", "AWS::CodePipeline::Pipeline"),

    // Cognito
    ("aws_cognito_user_pool", "AWS::Cognito::UserPool"),
    ("aws_cognito_user_pool_client", "AWS::Cognito::UserPoolClient"),
    ("aws_cognito_identity_pool", "AWS::Cognito::IdentityPool"),

    // Kinesis
    ("aws_kinesis_stream", "AWS::Kinesis::Stream"),
    ("aws_kinesis_firehose_delivery_stream", "AWS::KinesisFirehose::DeliveryStream"),

    // Glue
    ("aws_glue_catalog_database", "AWS::Glue::Database"),
    ("aws_glue_catalog_table", "AWS::Glue::Table"),
    ("aws_glue_crawler", "AWS::Glue::Crawler"),
    ("aws_glue_job", "AWS::Glue::Job"),

    // Athena
    ("aws_athena_workgroup", "AWS::Athena::WorkGroup"),
    ("aws_athena_database", "AWS::Athena::Database"),

    // ECR
    ("aws_ecr_repository", "AWS::ECR::Repository"),
    ("aws_ecr_lifecycle_policy", "AWS::ECR::Repository"),
    ("aws_ecr_repository_policy", "AWS::ECR::Repository"),

    // WAF
    ("aws_wafv2_web_acl", "AWS::WAFv2::WebACL"),
    ("aws_wafv2_ip_set", "AWS::WAFv2::IPSet"),
    ("aws_wafv2_rule_group", "AWS::WAFv2::RuleGroup"),

    // Auto Scaling
    ("aws_autoscaling_group", "AWS::AutoScaling::AutoScalingGroup"),
    ("aws_autoscaling_policy", "AWS::AutoScaling::ScalingPolicy"),
    ("aws_autoscaling_schedule", "AWS::AutoScaling::ScheduledAction"),
    ("aws_launch_configuration", "AWS::AutoScaling::LaunchConfiguration"),

    // CloudTrail
    ("aws_cloudtrail", "AWS::CloudTrail::Trail"),

    // Config
    ("aws_config_config_rule", "AWS::Config::ConfigRule"),
    ("aws_config_configuration_recorder", "AWS::Config::ConfigurationRecorder"),

    // Backup
    ("aws_backup_vault", "AWS::Backup::BackupVault"),
    ("aws_backup_plan", "AWS::Backup::BackupPlan"),
];

static FORWARD: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| EXPLICIT.iter().copied().collect());

/// First kind (lexicographically) mapping to each canonical name.
static REVERSE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, &'static str> = HashMap::new();
    for (tf, cfn) in EXPLICIT {
        map.entry(*cfn)
            .and_modify(|existing| {
                if *tf < *existing {
                    *existing = *tf;
                }
            })
            .or_insert(*tf);
    }
    map
});

/// `aws_s3_bucket` -> `AWS::S3::Bucket`.
///
/// The explicit table wins; otherwise `aws_<svc>_<a>_<b>` becomes
/// `AWS::<SVC>::<A><B>`. Kinds outside the `aws_` namespace, or with fewer
/// than two tokens after the prefix, have no canonical name.
pub fn canonical_type_name(kind: &str) -> Option<String> {
    if let Some(cfn) = FORWARD.get(kind) {
        return Some(cfn.to_string());
    }

    let rest = kind.strip_prefix("aws_")?;
    let parts: Vec<&str> = rest.split('_').collect();
    if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let service = parts[0].to_uppercase();
    let resource: String = parts[1..].iter().map(|p| title_case(p)).collect();
    Some(format!("AWS::{service}::{resource}"))
}

/// `AWS::S3::Bucket` -> `aws_s3_bucket`. Inverse of [`canonical_type_name`]
/// where the mapping is one-to-one.
pub fn terraform_type_name(canonical: &str) -> Option<String> {
    if let Some(tf) = REVERSE.get(canonical) {
        return Some(tf.to_string());
    }

    let rest = canonical.strip_prefix("AWS::")?;
    let (service, resource) = rest.split_once("::")?;
    if service.is_empty() || resource.is_empty() || resource.contains("::") {
        return None;
    }
    Some(format!(
        "aws_{}_{}",
        service.to_lowercase(),
        snake_case(resource)
    ))
}

/// Cache file name for a canonical type: `AWS::S3::Bucket` -> `aws-s3-bucket.json`.
pub fn cache_file_name(canonical: &str) -> String {
    format!("{}.json", canonical.replace("::", "-").to_lowercase())
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn snake_case(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let mut out = String::with_capacity(word.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_lower) {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        explicit_instance = { "aws_instance", Some("AWS::EC2::Instance") },
        explicit_vpc = { "aws_vpc", Some("AWS::EC2::VPC") },
        explicit_log_group = { "aws_cloudwatch_log_group", Some("AWS::Logs::LogGroup") },
        explicit_sub_resource = { "aws_s3_bucket_versioning", Some("AWS::S3::Bucket") },
        structural = { "aws_sagemaker_notebook_instance", Some("AWS::SAGEMAKER::NotebookInstance") },
        structural_two_tokens = { "aws_mq_broker", Some("AWS::MQ::Broker") },
        single_token = { "aws_foo", None },
        not_aws = { "google_storage_bucket", None },
        empty_token = { "aws_s3__bucket", None },
    )]
    fn test_canonical_type_name(kind: &str, expected: Option<&str>) {
        assert_eq!(canonical_type_name(kind).as_deref(), expected);
    }

    #[parameterized(
        bucket = { "AWS::S3::Bucket", Some("aws_s3_bucket") },
        instance = { "AWS::EC2::Instance", Some("aws_instance") },
        structural = { "AWS::MQ::ConfigurationAssociation", Some("aws_mq_configuration_association") },
        acronym = { "AWS::Foo::HTTPListener", Some("aws_foo_http_listener") },
        not_aws = { "Custom::Thing", None },
        nested = { "AWS::A::B::C", None },
    )]
    fn test_terraform_type_name(canonical: &str, expected: Option<&str>) {
        assert_eq!(terraform_type_name(canonical).as_deref(), expected);
    }

    #[test]
    fn test_reverse_is_deterministic_for_shared_names() {
        // aws_rds_cluster and aws_db_cluster share AWS::RDS::DBCluster
        assert_eq!(
            terraform_type_name("AWS::RDS::DBCluster").as_deref(),
            Some("aws_db_cluster")
        );
    }

    #[test]
    fn test_explicit_entries_round_trip_through_canonical() {
        for (tf, cfn) in EXPLICIT {
            let back = terraform_type_name(cfn).unwrap();
            assert_eq!(canonical_type_name(&back).as_deref(), Some(*cfn), "{tf}");
        }
    }

    #[test]
    fn test_cache_file_name() {
        assert_eq!(cache_file_name("AWS::S3::Bucket"), "aws-s3-bucket.json");
        assert_eq!(
            cache_file_name("AWS::ElasticLoadBalancingV2::LoadBalancer"),
            "aws-elasticloadbalancingv2-loadbalancer.json"
        );
    }
}
