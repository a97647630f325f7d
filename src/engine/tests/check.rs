#[test]
fn test_check_against_json_file() {
    let outcome = engine()
        .check(
            &testdata("simple"),
            ExistingPolicy::JsonFile(testdata("existing-policy.json")),
        )
        .unwrap();
    let report = &outcome.report;

    assert_eq!(
        report.matched,
        vec![
            "dynamodb:CreateTable",
            "dynamodb:DescribeTable",
            "s3:CreateBucket",
            "s3:DeleteBucket",
            "s3:GetBucket*",
            "s3:ListBucket",
            "s3:PutBucket*",
            "s3:PutBucketTagging",
        ]
    );
    assert_eq!(report.excessive, vec!["ec2:RunInstances"]);
    assert_eq!(report.missing.len(), 13);
    assert!(report.missing.iter().any(|a| a == "sqs:CreateQueue"));
    assert_eq!(outcome.exit_code(), EXIT_MISSING);
}

#[test]
fn test_check_against_own_output_is_compliant() {
    let engine = engine();
    let generated = engine.generate(&testdata("local-module")).unwrap();
    let outcome = engine
        .check(
            &testdata("local-module"),
            ExistingPolicy::Document(generated.policy),
        )
        .unwrap();
    assert!(outcome.report.is_compliant());
    assert_eq!(outcome.exit_code(), 0);
}

#[test]
fn test_check_only_excessive() {
    let outcome = engine()
        .check(
            &testdata("empty"),
            ExistingPolicy::JsonFile(testdata("existing-policy.json")),
        )
        .unwrap();
    assert!(outcome.report.missing.is_empty());
    assert_eq!(
        outcome.report.excessive,
        vec![
            "dynamodb:CreateTable",
            "dynamodb:DescribeTable",
            "ec2:RunInstances",
            "s3:*"
        ]
    );
    assert_eq!(outcome.exit_code(), EXIT_EXCESSIVE);
}

#[test]
fn test_check_against_declared_tree() {
    let existing = engine()
        .load_existing(ExistingPolicy::Tree(testdata("policies")))
        .unwrap();
    assert_eq!(
        existing.granted_actions(),
        vec![
            "logs:CreateLogStream",
            "logs:PutLogEvents",
            "s3:GetObject",
            "s3:PutObject",
            "sqs:SendMessage",
        ]
    );

    let outcome = engine()
        .check(&testdata("simple"), ExistingPolicy::Tree(testdata("policies")))
        .unwrap();
    assert!(outcome.report.matched.is_empty());
    assert_eq!(outcome.report.excessive.len(), 5);
    assert_eq!(outcome.exit_code(), EXIT_MISSING);
}

#[test]
fn test_check_keeps_existing_tree_diagnostics() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("iam.tf"),
        r#"
resource "aws_iam_policy" "queue" {
  policy = jsonencode({
    Statement = [{ Effect = "Allow", Action = ["sqs:*"], Resource = "*" }]
  })
}
"#,
    )
    .unwrap();
    fs::write(tmp.path().join("broken.tf"), "resource \"aws_sqs_queue\" {\n").unwrap();

    let outcome = engine()
        .check(&testdata("simple"), ExistingPolicy::Tree(tmp.path().to_path_buf()))
        .unwrap();
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::ParseFailure);
    assert!(outcome.diagnostics[0].location.ends_with("broken.tf"));
    assert!(outcome.report.matched.iter().any(|a| a.starts_with("sqs:")));
}

#[test]
fn test_check_tree_without_policies() {
    let err = engine()
        .check(&testdata("local-module"), ExistingPolicy::Tree(testdata("simple")))
        .unwrap_err();
    assert!(matches!(err, LeastError::NoPoliciesFound(ref dir) if dir.ends_with("simple")));
    assert!(err.to_string().starts_with("no IAM policies found in"));
}

#[parameterized(
    missing_file = { "missing.json" },
    not_json = { "simple/main.tf" },
)]
fn test_check_unreadable_policy_file(name: &str) {
    let result = engine().check(
        &testdata("simple"),
        ExistingPolicy::JsonFile(testdata(name)),
    );
    assert!(matches!(
        result,
        Err(LeastError::Io(_)) | Err(LeastError::InvalidFormat(_))
    ));
}

#[test]
fn test_check_outcome_serializes() {
    let outcome = engine()
        .check(
            &testdata("broken-file"),
            ExistingPolicy::JsonFile(testdata("existing-policy.json")),
        )
        .unwrap();
    assert_eq!(outcome.diagnostics.len(), 1);
    let mut settings = insta::Settings::clone_current();
    settings.add_redaction(".diagnostics[].message", "[message]");
    settings.bind(|| {
        snapshot_outcome!(outcome, @r#"
        {
          "report": {
            "missing": [
              "kms:CreateKey",
              "kms:DescribeKey",
              "kms:DisableKeyRotation",
              "kms:EnableKeyRotation",
              "kms:GetKeyPolicy",
              "kms:GetKeyRotationStatus",
              "kms:ListKeys",
              "kms:ListResourceTags",
              "kms:PutKeyPolicy",
              "kms:ScheduleKeyDeletion",
              "kms:TagResource",
              "kms:UntagResource",
              "kms:UpdateKeyDescription"
            ],
            "excessive": [
              "dynamodb:CreateTable",
              "dynamodb:DescribeTable",
              "ec2:RunInstances",
              "s3:*"
            ],
            "matched": []
          },
          "diagnostics": [
            {
              "kind": "parse_failure",
              "location": "[path]",
              "message": "[message]"
            }
          ]
        }
        "#);
    });
}
