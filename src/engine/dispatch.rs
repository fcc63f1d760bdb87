// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Run dispatch
//!
//! Turns a step's run action into outputs: command templates are rendered
//! and handed to the process runner, callables first produce the template,
//! and custom executors run on their own.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::ProcessRunner;
use crate::errors::{StepflowError, StepflowResult};
use crate::pipeline::{CmdOutputs, Run, StepCall};

const PLACEHOLDER: &str = r"\{([a-z_]+(?:\.[a-z_]+)?)\}";

/// Placeholder pattern, compiled on first use
fn placeholder() -> StepflowResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(PLACEHOLDER))
        .as_ref()
        .map_err(|e| StepflowError::user(e.to_string()))
}

/// Substitute `{project.name}`-style placeholders.
///
/// Known keys: `project.name`, `project.publish_name`, `project.version`,
/// `project.path`, `flow`, `step`. Anything else is left as written, so
/// shell brace syntax passes through.
pub fn render_template(template: &str, call: StepCall<'_>) -> StepflowResult<String> {
    let re = placeholder()?;

    let rendered = re.replace_all(template, |caps: &Captures| match &caps[1] {
        "project.name" => call.project.name.clone(),
        "project.publish_name" => call.project.publish_name().to_string(),
        "project.version" => call.project.version.clone(),
        "project.path" => call.project.root().to_string_lossy().to_string(),
        "flow" => call.flow.name.clone(),
        "step" => call.step.id.clone(),
        _ => caps[0].to_string(),
    });

    Ok(rendered.into_owned())
}

/// Execute a step's run action
pub async fn execute_run(
    runner: &dyn ProcessRunner,
    env: &BTreeMap<String, String>,
    call: StepCall<'_>,
) -> StepflowResult<CmdOutputs> {
    match &call.step.run {
        Run::Unset => Err(StepflowError::NoRunDefined {
            step: call.step.id.clone(),
        }),
        Run::Custom(executor) => executor.execute(call).await,
        Run::Command(template) => run_command(runner, env, template, call).await,
        Run::Callable(produce) => {
            let template = produce(call).await?;
            run_command(runner, env, &template, call).await
        }
    }
}

async fn run_command(
    runner: &dyn ProcessRunner,
    env: &BTreeMap<String, String>,
    template: &str,
    call: StepCall<'_>,
) -> StepflowResult<CmdOutputs> {
    let command = render_template(template, call)?;
    tracing::info!(project = %call.project.name, step = %call.step.id, "$ {}", command);

    let output = runner.execute(&command, call.project.root(), env).await?;

    if !output.success() {
        return Err(StepflowError::CommandFailure {
            command,
            exit_code: output.exit_code,
            outputs: output.lines,
        });
    }

    Ok(CmdOutputs::Lines(output.lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ShellRunner;
    use crate::pipeline::{Context, Flow, Pipeline, PipelineStep, Project, StepExecutor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn project(root: &std::path::Path, step: PipelineStep) -> Project {
        let pipeline = Pipeline::new(vec![step], vec![Flow::new("ci", ["build"])]);
        Project::new("web~staging", "2.1.0", root, pipeline).unwrap()
    }

    async fn run(project: &Project) -> StepflowResult<CmdOutputs> {
        let context = Context::with_config(json!({"target": "eu"}));
        let call = StepCall {
            step: &project.pipeline.steps[0],
            project,
            flow: &project.pipeline.flows[0],
            context: &context,
        };
        execute_run(&ShellRunner::new(), &BTreeMap::new(), call).await
    }

    #[test]
    fn test_placeholder_pattern_is_shared() {
        let first = placeholder().unwrap();
        let second = placeholder().unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(first.is_match("{project.name}"));
    }

    #[test]
    fn test_render_template() {
        let project = project(
            std::path::Path::new("/ws/web"),
            PipelineStep::new("build").with_command("true"),
        );
        let context = Context::default();
        let call = StepCall {
            step: &project.pipeline.steps[0],
            project: &project,
            flow: &project.pipeline.flows[0],
            context: &context,
        };

        let rendered = render_template(
            "deploy {project.publish_name}@{project.version} ({project.name}) {flow}/{step} in {project.path} {unknown} ${HOME}",
            call,
        )
        .unwrap();

        assert_eq!(
            rendered,
            "deploy web@2.1.0 (web~staging) ci/build in /ws/web {unknown} ${HOME}"
        );
    }

    #[tokio::test]
    async fn test_command_success_captures_lines() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path(), PipelineStep::new("build").with_command("echo {step}"));

        let outputs = run(&project).await.unwrap();
        assert_eq!(outputs, CmdOutputs::Lines(vec!["build".into()]));
    }

    #[tokio::test]
    async fn test_command_failure_carries_outputs() {
        let dir = TempDir::new().unwrap();
        let project = project(
            dir.path(),
            PipelineStep::new("build").with_command("echo broken; exit 2"),
        );

        match run(&project).await.unwrap_err() {
            StepflowError::CommandFailure {
                exit_code, outputs, ..
            } => {
                assert_eq!(exit_code, 2);
                assert_eq!(outputs, vec!["broken"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_callable_run_sees_context() {
        let dir = TempDir::new().unwrap();
        let step = PipelineStep::new("build").with_run_fn(|call| {
            let target = call.context.config["target"].as_str().unwrap_or("none").to_string();
            Box::pin(async move { Ok(format!("echo target={}", target)) })
        });
        let project = project(dir.path(), step);

        let outputs = run(&project).await.unwrap();
        assert_eq!(outputs, CmdOutputs::Lines(vec!["target=eu".into()]));
    }

    #[tokio::test]
    async fn test_unset_run_fails() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path(), PipelineStep::new("build"));
        assert!(matches!(
            run(&project).await,
            Err(StepflowError::NoRunDefined { .. })
        ));
    }

    struct Publish;

    #[async_trait]
    impl StepExecutor for Publish {
        async fn execute(&self, call: StepCall<'_>) -> StepflowResult<CmdOutputs> {
            Ok(CmdOutputs::Structured(json!({
                "fingerprint": call.project.version,
                "published": true,
            })))
        }
    }

    #[tokio::test]
    async fn test_custom_executor() {
        let dir = TempDir::new().unwrap();
        let project = project(
            dir.path(),
            PipelineStep::new("build").with_executor(Arc::new(Publish)),
        );

        let outputs = run(&project).await.unwrap();
        assert_eq!(outputs.explicit_fingerprint(), Some(Some("2.1.0".into())));
    }
}
