use chrono::Utc;
use std::sync::Arc;
use vbatch_client::error::ClientError;
use vbatch_client::report::LogReporter;
use vbatch_client::Client;
use vbatch_core::config::{Config, OptionLayer, RunOptions};
use vbatch_core::errors::DomainError;
use vbatch_core::model::{JobId, Phase};
use vbatch_test_utils::doubles::{no_sleep, MemoryStore, ScriptedBackend};

fn options(build: bool, property: bool, coverage: bool, report: bool) -> RunOptions {
    let cli = OptionLayer {
        jobname: Some("run".to_string()),
        build: Some(build),
        property: Some(property),
        coverage: Some(coverage),
        report: Some(report),
        ..OptionLayer::default()
    };
    RunOptions::resolve(cli, OptionLayer::default(), Utc::now()).unwrap()
}

fn client_with(backend: Arc<ScriptedBackend>) -> Client {
    Client::with_parts(
        Config::default(),
        backend,
        Arc::new(MemoryStore::with_bucket("cbmc")),
        Arc::new(LogReporter),
    )
    .with_sleeper(no_sleep)
}

fn depends_on(backend: &ScriptedBackend, jobname: &str) -> Vec<JobId> {
    backend
        .submissions()
        .into_iter()
        .find(|s| s.job_name == jobname)
        .unwrap_or_else(|| panic!("{} was not submitted", jobname))
        .depends_on
}

#[test]
fn test_build_property_report_chain() {
    let backend = Arc::new(ScriptedBackend::new());
    let client = client_with(backend.clone());

    let result = client.submit(&options(true, true, false, true), true).unwrap();

    assert_eq!(backend.submissions().len(), 3);
    let build_id = result.build.jobid.clone().unwrap();
    let property_id = result.property.jobid.clone().unwrap();
    assert_eq!(depends_on(&backend, "run-property"), vec![build_id]);
    assert_eq!(depends_on(&backend, "run-report"), vec![property_id]);
    assert_eq!(result.coverage.jobid, None);
    assert_eq!(result.coverage.jobname, None);
}

#[test]
fn test_report_waits_on_property_and_coverage_without_build() {
    let backend = Arc::new(ScriptedBackend::new());
    let client = client_with(backend.clone());

    let result = client.submit(&options(false, true, true, true), true).unwrap();

    assert!(depends_on(&backend, "run-property").is_empty());
    assert!(depends_on(&backend, "run-coverage").is_empty());
    assert_eq!(
        depends_on(&backend, "run-report"),
        vec![
            result.property.jobid.clone().unwrap(),
            result.coverage.jobid.clone().unwrap()
        ]
    );
    assert!(!result.build.is_scheduled());
}

#[test]
fn test_every_phase_subset() {
    for mask in 0u8..16 {
        let enabled = [mask & 1 != 0, mask & 2 != 0, mask & 4 != 0, mask & 8 != 0];
        let backend = Arc::new(ScriptedBackend::new());
        let client = client_with(backend.clone());

        let result = client
            .submit(&options(enabled[0], enabled[1], enabled[2], enabled[3]), false)
            .unwrap();

        let submitted = backend.submissions();
        assert_eq!(
            submitted.len(),
            enabled.iter().filter(|e| **e).count(),
            "mask {:04b}",
            mask
        );

        for (phase, on) in Phase::ALL.into_iter().zip(enabled) {
            let slot = result.phase(phase);
            assert_eq!(slot.is_scheduled(), on, "{} in mask {:04b}", phase, mask);
            assert_eq!(slot.jobname.is_some(), on);
            if !on {
                continue;
            }
            let request = submitted
                .iter()
                .find(|s| s.job_name == phase.job_name("run"))
                .unwrap();
            let expected: Vec<JobId> = match phase {
                Phase::Build => vec![],
                Phase::Property | Phase::Coverage => result.build.jobid.iter().cloned().collect(),
                Phase::Report => [&result.property, &result.coverage]
                    .iter()
                    .filter_map(|p| p.jobid.clone())
                    .collect(),
            };
            assert_eq!(request.depends_on, expected, "{} in mask {:04b}", phase, mask);
            assert_eq!(request.memory, result_memory(phase));
        }
    }
}

fn result_memory(phase: Phase) -> u32 {
    match phase {
        Phase::Build | Phase::Report => 8000,
        Phase::Property | Phase::Coverage => 16000,
    }
}

#[test]
fn test_submission_order_and_command() {
    let backend = Arc::new(ScriptedBackend::new());
    let client = client_with(backend.clone());
    client.submit(&options(true, true, true, true), true).unwrap();

    let names: Vec<String> = backend
        .submissions()
        .into_iter()
        .map(|s| s.job_name)
        .collect();
    assert_eq!(names, ["run-build", "run-property", "run-coverage", "run-report"]);

    let build = &backend.submissions()[0];
    assert_eq!(build.command[0], "--jsons");
    assert_eq!(build.command[2], "--dobuild");
    assert_eq!(build.command[4], "run-build");
    assert_eq!(build.job_queue, "CBMCJobQueue");
    assert_eq!(build.job_definition, "CBMCJobUbuntu14Gcc");
}

#[test]
fn test_failed_submission_aborts_without_cancelling() {
    let backend = Arc::new(ScriptedBackend::new().fail_submission_of("-property"));
    let client = client_with(backend.clone());

    let err = client.submit(&options(true, true, true, true), true).unwrap_err();

    match &err {
        ClientError::SubmissionAborted {
            job_name,
            submitted,
            source,
        } => {
            assert_eq!(job_name, "run-property");
            assert!(matches!(source.as_ref(), ClientError::Backend(e) if e.code == "ClientException"));
            let build = submitted.job_id(Phase::Build).unwrap();
            assert_eq!(submitted.submitted_ids(), vec![build]);
            assert!(err.to_string().contains(&build.0));
        }
        other => panic!("expected SubmissionAborted, got {:?}", other),
    }
    let names: Vec<String> = backend
        .submissions()
        .into_iter()
        .map(|s| s.job_name)
        .collect();
    assert_eq!(names, ["run-build"]);
    assert!(backend.terminated().is_empty());
}

#[test]
fn test_missing_definition_stops_before_submitting() {
    let backend = Arc::new(ScriptedBackend::empty().with_queue("CBMCJobQueue"));
    let client = client_with(backend.clone());

    let err = client.submit(&options(true, true, true, true), true).unwrap_err();

    assert!(matches!(
        err,
        ClientError::Domain(DomainError::DefinitionNotFound(ref name)) if name == "CBMCJobUbuntu14Gcc"
    ));
    assert!(backend.submissions().is_empty());
}

#[test]
fn test_inactive_definitions_do_not_count() {
    let backend = Arc::new(
        ScriptedBackend::empty()
            .with_definition("CBMCJobUbuntu14Gcc", "INACTIVE")
            .with_definition("CBMCJobUbuntu14Gcc", "ACTIVE")
            .with_queue("CBMCJobQueue"),
    );
    let client = client_with(backend.clone());
    assert!(client.submit(&options(true, false, false, false), true).is_ok());
}

#[test]
fn test_duplicate_definition_and_ambiguous_queue() {
    let duplicate = Arc::new(
        ScriptedBackend::new().with_definition("CBMCJobUbuntu14Gcc", "ACTIVE"),
    );
    assert!(matches!(
        client_with(duplicate).submit(&options(true, true, true, true), true),
        Err(ClientError::Domain(DomainError::DuplicateDefinition(_)))
    ));

    let ambiguous = Arc::new(ScriptedBackend::new().with_queue("CBMCJobQueue"));
    assert!(matches!(
        client_with(ambiguous).submit(&options(true, true, true, true), true),
        Err(ClientError::Domain(DomainError::AmbiguousQueue(_)))
    ));

    let no_queue = Arc::new(
        ScriptedBackend::empty().with_definition("CBMCJobUbuntu14Gcc", "ACTIVE"),
    );
    assert!(matches!(
        client_with(no_queue).submit(&options(true, true, true, true), true),
        Err(ClientError::Domain(DomainError::QueueNotFound(_)))
    ));
}

#[test]
fn test_failed_first_submission_reports_the_backend_error() {
    let backend = Arc::new(ScriptedBackend::new().fail_submission_of("-build"));
    let client = client_with(backend.clone());

    let err = client.submit(&options(true, true, true, true), true).unwrap_err();

    assert!(matches!(err, ClientError::Backend(ref e) if e.code == "ClientException"));
    assert!(backend.submissions().is_empty());
}
