use std::sync::{Arc, Mutex};
use std::time::Duration;

use atlas_core::config::AtlasConfig;
use atlas_core::error::{AtlasError, JobError};
use atlas_core::job::{JobRunner, JobState, JobStatus};
use atlas_core::progress::{ProgressListener, TracingListener};
use atlas_core::recipe::ExtractUtilsRecipe;
use atlas_test::{
    do_work_project, init_tracing, layered_app, run_job, util_helper_project, wait_terminal,
};

#[tokio::test(start_paused = true)]
async fn util_helper_job_completes() {
    init_tracing();
    let runner = JobRunner::new();
    let status = run_job(
        &runner,
        "job-1",
        Arc::new(ExtractUtilsRecipe::new()),
        util_helper_project(),
    )
    .await;

    assert_eq!(status.status, JobState::Completed);
    assert!((status.progress - 100.0).abs() < f64::EPSILON);
    let result = status.result.expect("completed job has a result");
    assert_eq!(result.modules_touched, 1);
    assert_eq!(result.transformations_applied, 1);
    assert_eq!(status.current_step.as_deref(), Some("Completed"));
}

#[tokio::test(start_paused = true)]
async fn job_without_steps_fails_early() {
    let runner = JobRunner::new();
    let status = run_job(
        &runner,
        "job-empty",
        Arc::new(ExtractUtilsRecipe::new()),
        do_work_project(),
    )
    .await;

    assert_eq!(status.status, JobState::Failed);
    assert!(status.progress < 100.0);
    assert!(status.result.is_none());
    assert!(status.error.unwrap().contains("no transformation steps"));
}

#[tokio::test(start_paused = true)]
async fn listener_sees_every_checkpoint_in_order() {
    let seen: Arc<Mutex<Vec<JobStatus>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let listener: Arc<dyn ProgressListener> =
        Arc::new(move |s: &JobStatus| sink.lock().unwrap().push(s.clone()));

    let runner = JobRunner::new();
    runner
        .start_job(
            "watched",
            Arc::new(ExtractUtilsRecipe::new()),
            util_helper_project(),
            listener,
        )
        .unwrap();
    wait_terminal(&runner, "watched").await;

    let seen = seen.lock().unwrap();
    let progress: Vec<f64> = seen.iter().map(|s| s.progress).collect();
    assert_eq!(progress, [0.0, 10.0, 30.0, 50.0, 100.0, 100.0]);
    let steps: Vec<_> = seen.iter().map(|s| s.current_step.as_deref()).collect();
    assert_eq!(
        steps,
        [
            None,
            Some("Validating recipe"),
            Some("Generating migration plan"),
            Some("Applying transformations"),
            Some("Applying transformations (1/1)"),
            Some("Completed"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_takes_effect_mid_application() {
    init_tracing();
    let config = AtlasConfig::from_toml_str("[jobs]\nstep_delay_ms = 30000\n").unwrap();
    let runner = JobRunner::from_config(&config);
    runner
        .start_job(
            "long",
            Arc::new(ExtractUtilsRecipe::new()),
            layered_app(),
            Arc::new(TracingListener),
        )
        .unwrap();

    let mut rx = runner.subscribe("long").unwrap();
    rx.wait_for(|s| s.status == JobState::Running && s.progress >= 50.0)
        .await
        .unwrap();

    let started = tokio::time::Instant::now();
    assert!(runner.cancel_job("long").await);
    // the step delay was interrupted, not waited out
    assert!(started.elapsed() < Duration::from_secs(30));

    let status = runner.get_status("long").unwrap();
    assert_eq!(status.status, JobState::Cancelled);
    assert!(status.progress < 100.0);
    assert!(status.result.is_none());
}

#[tokio::test(start_paused = true)]
async fn ids_are_reusable_only_after_termination() {
    let runner = JobRunner::new();
    let recipe = Arc::new(ExtractUtilsRecipe::new());
    runner
        .start_job(
            "same",
            recipe.clone(),
            util_helper_project(),
            Arc::new(TracingListener),
        )
        .unwrap();

    let err = runner
        .start_job(
            "same",
            recipe.clone(),
            util_helper_project(),
            Arc::new(TracingListener),
        )
        .unwrap_err();
    assert!(matches!(err, AtlasError::Job(JobError::AlreadyRunning(ref id)) if id == "same"));

    wait_terminal(&runner, "same").await;
    let again = run_job(&runner, "same", recipe, util_helper_project()).await;
    assert_eq!(again.status, JobState::Completed);
    assert_eq!(runner.job_ids(), ["same"]);
}

#[tokio::test(start_paused = true)]
async fn many_jobs_progress_independently() {
    let runner = JobRunner::new();
    let recipe = Arc::new(ExtractUtilsRecipe::new());
    for i in 0..8 {
        let modules = if i % 2 == 0 {
            util_helper_project()
        } else {
            do_work_project()
        };
        runner
            .start_job(&format!("job-{i}"), recipe.clone(), modules, Arc::new(TracingListener))
            .unwrap();
    }

    for i in 0..8 {
        let status = wait_terminal(&runner, &format!("job-{i}")).await;
        let expected = if i % 2 == 0 {
            JobState::Completed
        } else {
            JobState::Failed
        };
        assert_eq!(status.status, expected, "job-{i}");
    }
    assert_eq!(runner.job_ids().len(), 8);
}
