//! Static resource catalog: IAM actions per lifecycle phase and ARN templates,
//! keyed by Terraform resource kind.
//!
//! The tables are loaded once into read-only process-wide state. They back the
//! fallback tier of resolution and all ARN rendering.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use serde::Serialize;
use strum_macros::{Display, EnumIter};
use utoipa::ToSchema;

/// A deduplicated, order-insensitive set of IAM actions.
pub type ActionSet = BTreeSet<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, ToSchema)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Create,
    Read,
    Update,
    Delete,
    List,
}

/// Actions required per lifecycle phase. Phases may overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PhaseActions {
    pub create: Vec<String>,
    pub read: Vec<String>,
    pub update: Vec<String>,
    pub delete: Vec<String>,
    pub list: Vec<String>,
}

impl PhaseActions {
    pub fn phase(&self, phase: Phase) -> &[String] {
        match phase {
            Phase::Create => &self.create,
            Phase::Read => &self.read,
            Phase::Update => &self.update,
            Phase::Delete => &self.delete,
            Phase::List => &self.list,
        }
    }

    /// The phase-union.
    pub fn union(&self) -> ActionSet {
        [
            &self.create,
            &self.read,
            &self.update,
            &self.delete,
            &self.list,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        [
            &self.create,
            &self.read,
            &self.update,
            &self.delete,
            &self.list,
        ]
        .iter()
        .all(|v| v.is_empty())
    }
}

/// An ARN template such as `arn:aws:s3:::{bucket}`.
///
/// `{account}` and `{region}` are contextual; every other placeholder names
/// the resource attribute that fills it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LocatorTemplate {
    pub pattern: String,
    /// Additional patterns rendered with the same substitutions, e.g. the
    /// objects inside a bucket.
    pub children: Vec<String>,
}

impl LocatorTemplate {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, pattern: impl Into<String>) -> Self {
        self.children.push(pattern.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogEntry {
    pub kind: String,
    pub actions: PhaseActions,
    pub locator: Option<LocatorTemplate>,
}

struct ActionRow {
    kind: &'static str,
    create: &'static [&'static str],
    read: &'static [&'static str],
    update: &'static [&'static str],
    delete: &'static [&'static str],
    list: &'static [&'static str],
}

struct LocatorRow {
    kind: &'static str,
    pattern: &'static str,
    children: &'static [&'static str],
}

const ACTION_ROWS: &[ActionRow] = &[
    ActionRow {
        kind: "aws_s3_bucket",
        create: &["s3:CreateBucket", "s3:PutBucketTagging"],
        read: &["s3:GetBucket*", "s3:ListBucket"],
        update: &["s3:PutBucket*"],
        delete: &["s3:DeleteBucket"],
        list: &[],
    },
    ActionRow {
        kind: "aws_s3_bucket_versioning",
        create: &["s3:PutBucketVersioning"],
        read: &["s3:GetBucketVersioning"],
        update: &["s3:PutBucketVersioning"],
        delete: &[],
        list: &[],
    },
    ActionRow {
        kind: "aws_s3_bucket_public_access_block",
        create: &["s3:PutBucketPublicAccessBlock"],
        read: &["s3:GetBucketPublicAccessBlock"],
        update: &["s3:PutBucketPublicAccessBlock"],
        delete: &["s3:PutBucketPublicAccessBlock"],
        list: &[],
    },
    ActionRow {
        kind: "aws_instance",
        create: &["ec2:RunInstances", "ec2:CreateTags"],
        read: &["ec2:DescribeInstances", "ec2:DescribeTags"],
        update: &[
            "ec2:ModifyInstanceAttribute",
            "ec2:CreateTags",
            "ec2:DeleteTags",
        ],
        delete: &["ec2:TerminateInstances"],
        list: &[],
    },
    ActionRow {
        kind: "aws_vpc",
        create: &["ec2:CreateVpc", "ec2:CreateTags", "ec2:ModifyVpcAttribute"],
        read: &["ec2:DescribeVpcs", "ec2:DescribeVpcAttribute"],
        update: &["ec2:ModifyVpcAttribute", "ec2:CreateTags", "ec2:DeleteTags"],
        delete: &["ec2:DeleteVpc"],
        list: &[],
    },
    ActionRow {
        kind: "aws_subnet",
        create: &["ec2:CreateSubnet", "ec2:CreateTags"],
        read: &["ec2:DescribeSubnets"],
        update: &[
            "ec2:ModifySubnetAttribute",
            "ec2:CreateTags",
            "ec2:DeleteTags",
        ],
        delete: &["ec2:DeleteSubnet"],
        list: &[],
    },
    ActionRow {
        kind: "aws_security_group",
        create: &["ec2:CreateSecurityGroup", "ec2:CreateTags"],
        read: &["ec2:DescribeSecurityGroups"],
        update: &[
            "ec2:AuthorizeSecurityGroupIngress",
            "ec2:AuthorizeSecurityGroupEgress",
            "ec2:RevokeSecurityGroupIngress",
            "ec2:RevokeSecurityGroupEgress",
            "ec2:CreateTags",
            "ec2:DeleteTags",
        ],
        delete: &["ec2:DeleteSecurityGroup"],
        list: &[],
    },
    ActionRow {
        kind: "aws_internet_gateway",
        create: &[
            "ec2:CreateInternetGateway",
            "ec2:AttachInternetGateway",
            "ec2:CreateTags",
        ],
        read: &["ec2:DescribeInternetGateways"],
        update: &["ec2:CreateTags", "ec2:DeleteTags"],
        delete: &["ec2:DetachInternetGateway", "ec2:DeleteInternetGateway"],
        list: &[],
    },
    ActionRow {
        kind: "aws_route_table",
        create: &["ec2:CreateRouteTable", "ec2:CreateTags"],
        read: &["ec2:DescribeRouteTables"],
        update: &[
            "ec2:CreateRoute",
            "ec2:ReplaceRoute",
            "ec2:DeleteRoute",
            "ec2:CreateTags",
            "ec2:DeleteTags",
        ],
        delete: &["ec2:DeleteRouteTable"],
        list: &[],
    },
    ActionRow {
        kind: "aws_iam_role",
        create: &["iam:CreateRole", "iam:TagRole"],
        read: &["iam:GetRole", "iam:ListRoleTags"],
        update: &[
            "iam:UpdateRole",
            "iam:UpdateAssumeRolePolicy",
            "iam:TagRole",
            "iam:UntagRole",
        ],
        delete: &["iam:DeleteRole"],
        list: &[],
    },
    ActionRow {
        kind: "aws_iam_policy",
        create: &["iam:CreatePolicy", "iam:TagPolicy"],
        read: &["iam:GetPolicy", "iam:GetPolicyVersion"],
        update: &[
            "iam:CreatePolicyVersion",
            "iam:DeletePolicyVersion",
            "iam:TagPolicy",
            "iam:UntagPolicy",
        ],
        delete: &["iam:DeletePolicy"],
        list: &["iam:ListPolicyVersions"],
    },
    ActionRow {
        kind: "aws_iam_role_policy",
        create: &["iam:PutRolePolicy"],
        read: &["iam:GetRolePolicy"],
        update: &["iam:PutRolePolicy"],
        delete: &["iam:DeleteRolePolicy"],
        list: &[],
    },
    ActionRow {
        kind: "aws_iam_role_policy_attachment",
        create: &["iam:AttachRolePolicy"],
        read: &["iam:ListAttachedRolePolicies"],
        update: &[],
        delete: &["iam:DetachRolePolicy"],
        list: &[],
    },
    ActionRow {
        kind: "aws_lambda_function",
        create: &[
            "lambda:CreateFunction",
            "lambda:TagResource",
            "iam:PassRole",
        ],
        read: &[
            "lambda:GetFunction",
            "lambda:GetFunctionConfiguration",
            "lambda:ListTags",
        ],
        update: &[
            "lambda:UpdateFunctionCode",
            "lambda:UpdateFunctionConfiguration",
            "lambda:TagResource",
            "lambda:UntagResource",
        ],
        delete: &["lambda:DeleteFunction"],
        list: &[],
    },
    ActionRow {
        kind: "aws_dynamodb_table",
        create: &["dynamodb:CreateTable", "dynamodb:TagResource"],
        read: &["dynamodb:DescribeTable", "dynamodb:ListTagsOfResource"],
        update: &[
            "dynamodb:UpdateTable",
            "dynamodb:TagResource",
            "dynamodb:UntagResource",
        ],
        delete: &["dynamodb:DeleteTable"],
        list: &[],
    },
    ActionRow {
        kind: "aws_sqs_queue",
        create: &["sqs:CreateQueue", "sqs:TagQueue"],
        read: &[
            "sqs:GetQueueAttributes",
            "sqs:GetQueueUrl",
            "sqs:ListQueueTags",
        ],
        update: &["sqs:SetQueueAttributes", "sqs:TagQueue", "sqs:UntagQueue"],
        delete: &["sqs:DeleteQueue"],
        list: &["sqs:ListQueues"],
    },
    ActionRow {
        kind: "aws_sns_topic",
        create: &["sns:CreateTopic", "sns:TagResource"],
        read: &["sns:GetTopicAttributes", "sns:ListTagsForResource"],
        update: &[
            "sns:SetTopicAttributes",
            "sns:TagResource",
            "sns:UntagResource",
        ],
        delete: &["sns:DeleteTopic"],
        list: &["sns:ListTopics"],
    },
    ActionRow {
        kind: "aws_kms_key",
        create: &["kms:CreateKey", "kms:TagResource"],
        read: &[
            "kms:DescribeKey",
            "kms:GetKeyPolicy",
            "kms:GetKeyRotationStatus",
            "kms:ListResourceTags",
        ],
        update: &[
            "kms:PutKeyPolicy",
            "kms:EnableKeyRotation",
            "kms:DisableKeyRotation",
            "kms:UpdateKeyDescription",
            "kms:TagResource",
            "kms:UntagResource",
        ],
        delete: &["kms:ScheduleKeyDeletion"],
        list: &["kms:ListKeys"],
    },
    ActionRow {
        kind: "aws_cloudwatch_log_group",
        create: &[
            "logs:CreateLogGroup",
            "logs:PutRetentionPolicy",
            "logs:TagResource",
        ],
        read: &["logs:DescribeLogGroups", "logs:ListTagsForResource"],
        update: &[
            "logs:PutRetentionPolicy",
            "logs:DeleteRetentionPolicy",
            "logs:TagResource",
            "logs:UntagResource",
        ],
        delete: &["logs:DeleteLogGroup"],
        list: &[],
    },
    ActionRow {
        kind: "aws_ecr_repository",
        create: &["ecr:CreateRepository", "ecr:TagResource"],
        read: &["ecr:DescribeRepositories", "ecr:ListTagsForResource"],
        update: &[
            "ecr:PutImageScanningConfiguration",
            "ecr:PutImageTagMutability",
            "ecr:TagResource",
            "ecr:UntagResource",
        ],
        delete: &["ecr:DeleteRepository"],
        list: &[],
    },
    ActionRow {
        kind: "aws_secretsmanager_secret",
        create: &["secretsmanager:CreateSecret", "secretsmanager:TagResource"],
        read: &[
            "secretsmanager:DescribeSecret",
            "secretsmanager:GetResourcePolicy",
        ],
        update: &[
            "secretsmanager:UpdateSecret",
            "secretsmanager:TagResource",
            "secretsmanager:UntagResource",
        ],
        delete: &["secretsmanager:DeleteSecret"],
        list: &[],
    },
    ActionRow {
        kind: "aws_ssm_parameter",
        create: &["ssm:PutParameter", "ssm:AddTagsToResource"],
        read: &[
            "ssm:GetParameter",
            "ssm:GetParameters",
            "ssm:DescribeParameters",
            "ssm:ListTagsForResource",
        ],
        update: &[
            "ssm:PutParameter",
            "ssm:AddTagsToResource",
            "ssm:RemoveTagsFromResource",
        ],
        delete: &["ssm:DeleteParameter"],
        list: &[],
    },
];

// Kinds whose identifiers are generated by AWS use a trailing wildcard instead
// of an attribute placeholder.
const LOCATOR_ROWS: &[LocatorRow] = &[
    LocatorRow {
        kind: "aws_s3_bucket",
        pattern: "arn:aws:s3:::{bucket}",
        children: &["arn:aws:s3:::{bucket}/*"],
    },
    LocatorRow {
        kind: "aws_s3_bucket_versioning",
        pattern: "arn:aws:s3:::{bucket}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_s3_bucket_public_access_block",
        pattern: "arn:aws:s3:::{bucket}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_lambda_function",
        pattern: "arn:aws:lambda:{region}:{account}:function:{function_name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_dynamodb_table",
        pattern: "arn:aws:dynamodb:{region}:{account}:table/{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_iam_role",
        pattern: "arn:aws:iam::{account}:role/{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_iam_policy",
        pattern: "arn:aws:iam::{account}:policy/{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_iam_role_policy",
        pattern: "arn:aws:iam::{account}:role/{role}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_iam_role_policy_attachment",
        pattern: "arn:aws:iam::{account}:role/{role}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_db_instance",
        pattern: "arn:aws:rds:{region}:{account}:db:{identifier}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_rds_cluster",
        pattern: "arn:aws:rds:{region}:{account}:cluster:{cluster_identifier}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_sqs_queue",
        pattern: "arn:aws:sqs:{region}:{account}:{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_sns_topic",
        pattern: "arn:aws:sns:{region}:{account}:{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_kms_key",
        pattern: "arn:aws:kms:{region}:{account}:key/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_secretsmanager_secret",
        pattern: "arn:aws:secretsmanager:{region}:{account}:secret:{name}*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_ssm_parameter",
        pattern: "arn:aws:ssm:{region}:{account}:parameter/{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_cloudwatch_log_group",
        pattern: "arn:aws:logs:{region}:{account}:log-group:{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_ecr_repository",
        pattern: "arn:aws:ecr:{region}:{account}:repository/{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_ecs_cluster",
        pattern: "arn:aws:ecs:{region}:{account}:cluster/{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_ecs_service",
        pattern: "arn:aws:ecs:{region}:{account}:service/{cluster}/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_ecs_task_definition",
        pattern: "arn:aws:ecs:{region}:{account}:task-definition/{family}:*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_eks_cluster",
        pattern: "arn:aws:eks:{region}:{account}:cluster/{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_kinesis_stream",
        pattern: "arn:aws:kinesis:{region}:{account}:stream/{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_cognito_user_pool",
        pattern: "arn:aws:cognito-idp:{region}:{account}:userpool/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_elasticache_cluster",
        pattern: "arn:aws:elasticache:{region}:{account}:cluster:{cluster_id}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_sfn_state_machine",
        pattern: "arn:aws:states:{region}:{account}:stateMachine:{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_glue_catalog_database",
        pattern: "arn:aws:glue:{region}:{account}:database/{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_route53_zone",
        pattern: "arn:aws:route53:::hostedzone/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_route53_record",
        pattern: "arn:aws:route53:::hostedzone/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_cloudfront_distribution",
        pattern: "arn:aws:cloudfront::{account}:distribution/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_acm_certificate",
        pattern: "arn:aws:acm:{region}:{account}:certificate/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_wafv2_web_acl",
        pattern: "arn:aws:wafv2:{region}:{account}:*/webacl/{name}/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_autoscaling_group",
        pattern: "arn:aws:autoscaling:{region}:{account}:autoScalingGroup:*:autoScalingGroupName/{name}",
        children: &[],
    },
    LocatorRow {
        kind: "aws_lb",
        pattern: "arn:aws:elasticloadbalancing:{region}:{account}:loadbalancer/*/{name}/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_lb_target_group",
        pattern: "arn:aws:elasticloadbalancing:{region}:{account}:targetgroup/{name}/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_api_gateway_rest_api",
        pattern: "arn:aws:apigateway:{region}::/restapis/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_instance",
        pattern: "arn:aws:ec2:{region}:{account}:instance/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_vpc",
        pattern: "arn:aws:ec2:{region}:{account}:vpc/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_subnet",
        pattern: "arn:aws:ec2:{region}:{account}:subnet/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_security_group",
        pattern: "arn:aws:ec2:{region}:{account}:security-group/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_internet_gateway",
        pattern: "arn:aws:ec2:{region}:{account}:internet-gateway/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_nat_gateway",
        pattern: "arn:aws:ec2:{region}:{account}:natgateway/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_route_table",
        pattern: "arn:aws:ec2:{region}:{account}:route-table/*",
        children: &[],
    },
    LocatorRow {
        kind: "aws_eip",
        pattern: "arn:aws:ec2:{region}:{account}:elastic-ip/*",
        children: &[],
    },
];

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

static CATALOG: Lazy<HashMap<&'static str, CatalogEntry>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, CatalogEntry> = HashMap::new();

    for row in ACTION_ROWS {
        map.insert(
            row.kind,
            CatalogEntry {
                kind: row.kind.to_string(),
                actions: PhaseActions {
                    create: to_owned_list(row.create),
                    read: to_owned_list(row.read),
                    update: to_owned_list(row.update),
                    delete: to_owned_list(row.delete),
                    list: to_owned_list(row.list),
                },
                locator: None,
            },
        );
    }

    for row in LOCATOR_ROWS {
        let mut locator = LocatorTemplate::new(row.pattern);
        for child in row.children {
            locator = locator.with_child(*child);
        }
        map.entry(row.kind)
            .or_insert_with(|| CatalogEntry {
                kind: row.kind.to_string(),
                actions: PhaseActions::default(),
                locator: None,
            })
            .locator = Some(locator);
    }

    map
});

pub fn entry(kind: &str) -> Option<&'static CatalogEntry> {
    CATALOG.get(kind)
}

/// Phase-union of the catalog actions for `kind`; empty when unknown.
pub fn actions_for(kind: &str) -> ActionSet {
    entry(kind).map(|e| e.actions.union()).unwrap_or_default()
}

pub fn locator_for(kind: &str) -> Option<&'static LocatorTemplate> {
    entry(kind).and_then(|e| e.locator.as_ref())
}

/// Kinds with a non-empty action mapping, sorted.
pub fn supported_kinds() -> Vec<&'static str> {
    let mut kinds: Vec<&'static str> = CATALOG
        .iter()
        .filter(|(_, e)| !e.actions.is_empty())
        .map(|(k, _)| *k)
        .collect();
    kinds.sort_unstable();
    kinds
}
