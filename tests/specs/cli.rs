// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rw-cli run` argument and config-loading behavior that doesn't require an
//! actual connector image or a running `docker` daemon.

use crate::prelude::{valid_sync_input_json, Fixture};

#[test]
fn missing_job_root_directory_fails_with_usage_error() {
    let fixture = Fixture::new();
    let sync_input = fixture.file("sync-input.json", &valid_sync_input_json());
    let missing_job_root = fixture.job_root().join("does-not-exist");

    fixture
        .rw_cli()
        .args(["run", sync_input.to_str().unwrap(), "--job-root"])
        .arg(&missing_job_root)
        .assert()
        .failure()
        .code(2)
        .stderr(predicates::str::contains("is not a directory"));
}

#[test]
fn malformed_sync_input_file_fails_to_parse() {
    let fixture = Fixture::new();
    let sync_input = fixture.file("sync-input.json", "{ not valid json");
    let job_root = fixture.job_root();

    fixture
        .rw_cli()
        .args(["run", sync_input.to_str().unwrap(), "--job-root"])
        .arg(&job_root)
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("parsing"));
}

#[test]
fn toml_sync_input_is_parsed_by_extension() {
    let fixture = Fixture::new();
    let toml_body = r#"
[config]
job_id = "job-1"
attempt = 1
connection_id = "conn-1"

[source]
image = "airbyte/source-fake:1.0"
config = {}

[source.catalog]
streams = []

[destination]
image = "airbyte/destination-fake:1.0"
config = {}

[destination.catalog]
streams = []
"#;
    let sync_input = fixture.file("sync-input.toml", toml_body);
    let job_root = fixture.job_root();

    // No docker daemon in this environment, so the attempt itself fails once
    // past config loading; what this test pins down is that a `.toml` file
    // parses instead of erroring out as bad JSON.
    let assertion = fixture
        .rw_cli()
        .args(["run", sync_input.to_str().unwrap(), "--job-root"])
        .arg(&job_root)
        .assert()
        .failure();
    let output = assertion.get_output();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("parsing"), "TOML input should not hit the parse-error path: {stderr}");
}
