use ort::{
    CPUExecutionProvider, ExecutionProviderDispatch, GraphOptimizationLevel, Session, Tensor,
    XNNPACKExecutionProvider,
};
use tracing::debug;

use crate::{
    error::{StudioError, StudioResult},
    ml::runtime::ExecutionProviderPolicy,
};

pub fn build_session(model_path: &str, policy: &ExecutionProviderPolicy) -> StudioResult<Session> {
    let mut attempts = vec![providers_for_policy(policy, true)];

    if policy.allow_cpu_fallback && policy.prefer_xnnpack {
        attempts.push(providers_for_policy(policy, false));
    }

    let mut errors = Vec::new();
    for providers in attempts {
        if providers.is_empty() {
            continue;
        }

        match build_session_with_providers(model_path, providers) {
            Ok(session) => return Ok(session),
            Err(error) => {
                debug!(model_path, %error, "session build attempt failed");
                errors.push(format!("{error}"));
            }
        }
    }

    if errors.is_empty() {
        return Err(StudioError::InvalidRequest(
            "no execution provider selected while CPU fallback is disabled".to_string(),
        ));
    }

    Err(StudioError::ProcessingFailed(format!(
        "failed to create ONNX session for model '{model_path}' across EP fallbacks: {}",
        errors.join(" | ")
    )))
}

fn providers_for_policy(
    policy: &ExecutionProviderPolicy,
    include_xnnpack: bool,
) -> Vec<ExecutionProviderDispatch> {
    let mut providers: Vec<ExecutionProviderDispatch> = Vec::new();

    if include_xnnpack && policy.prefer_xnnpack {
        providers.push(XNNPACKExecutionProvider::default().build());
    }
    if policy.allow_cpu_fallback {
        providers.push(
            CPUExecutionProvider::default()
                .with_arena_allocator()
                .build(),
        );
    }

    providers
}

fn build_session_with_providers(
    model_path: &str,
    providers: Vec<ExecutionProviderDispatch>,
) -> StudioResult<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(1)?
        .with_inter_threads(1)?
        .with_execution_providers(providers)?
        .commit_from_file(model_path)?;
    Ok(session)
}

pub fn run_f32(
    session: &Session,
    input: Vec<f32>,
    input_shape: Vec<i64>,
) -> StudioResult<(Vec<i64>, Vec<f32>)> {
    let input_tensor = Tensor::<f32>::from_array((input_shape, input))?;
    let outputs = session.run(ort::inputs![input_tensor]?)?;
    if outputs.is_empty() {
        return Err(StudioError::ProcessingFailed(
            "missing first output tensor".to_string(),
        ));
    }
    let output = &outputs[0];
    let tensor = output.try_extract_tensor::<f32>()?;
    let shape = tensor.shape().iter().map(|d| *d as i64).collect::<Vec<_>>();
    let data = tensor.iter().copied().collect::<Vec<_>>();
    Ok((shape, data))
}
