use super::*;
use crate::state::test_helpers;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use types::{JobHandle, PollOutcome, SubmitOutcome};

// =========================================================================
// MockUpstream — scripted results, recorded calls
// =========================================================================

#[derive(Default)]
struct MockUpstream {
    complete_result: Mutex<Option<Result<String, UpstreamError>>>,
    submit_result: Mutex<Option<Result<SubmitOutcome, UpstreamError>>>,
    polls: Mutex<Vec<Result<PollOutcome, UpstreamError>>>,
    completed_turns: Mutex<Vec<Vec<ChatTurn>>>,
    submitted_prompts: Mutex<Vec<String>>,
    poll_calls: AtomicUsize,
}

impl MockUpstream {
    fn completing(result: Result<String, UpstreamError>) -> Self {
        Self { complete_result: Mutex::new(Some(result)), ..Self::default() }
    }

    fn submitting(result: Result<SubmitOutcome, UpstreamError>) -> Self {
        Self { submit_result: Mutex::new(Some(result)), ..Self::default() }
    }

    fn complete_calls(&self) -> usize {
        self.completed_turns.lock().unwrap().len()
    }

    fn submit_calls(&self) -> usize {
        self.submitted_prompts.lock().unwrap().len()
    }

    fn poll_call_count(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Upstream for MockUpstream {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, UpstreamError> {
        self.completed_turns.lock().unwrap().push(turns.to_vec());
        self.complete_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Ok("done".into()))
    }

    async fn submit_image(&self, prompt: &str) -> Result<SubmitOutcome, UpstreamError> {
        self.submitted_prompts.lock().unwrap().push(prompt.to_owned());
        self.submit_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Ok(SubmitOutcome::Deferred(JobHandle("https://example.test/op/1".into()))))
    }

    async fn poll_image(&self, _job: &JobHandle) -> Result<PollOutcome, UpstreamError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let mut polls = self.polls.lock().unwrap();
        if polls.is_empty() { Ok(PollOutcome::Pending) } else { polls.remove(0) }
    }
}

fn text_request(content: &str) -> GatewayRequest {
    GatewayRequest { turns: vec![ChatTurn::new(Role::User, content)], image_mode: false }
}

fn image_request(prompt: &str) -> GatewayRequest {
    GatewayRequest { turns: vec![ChatTurn::new(Role::User, prompt)], image_mode: true }
}

// =========================================================================
// configuration guard
// =========================================================================

#[tokio::test]
async fn missing_config_short_circuits_with_zero_upstream_calls() {
    let mock = MockUpstream::default();
    let config = test_helpers::unconfigured();
    let envelope = handle(&config, Some(&mock), &text_request("hi")).await;

    assert_eq!(envelope.error, Some(ErrorKind::MissingConfig));
    assert_eq!(envelope.is_configured, Some(false));
    assert!(envelope.content.contains("AZURE_OPENAI_API_KEY"));
    assert_eq!(mock.complete_calls(), 0);
    assert_eq!(mock.submit_calls(), 0);
    assert_eq!(mock.poll_call_count(), 0);
}

#[tokio::test]
async fn image_path_requires_image_deployment() {
    let mock = MockUpstream::default();
    let config = crate::config::GatewayConfig { image_deployment: None, ..test_helpers::test_config() };
    let envelope = handle(&config, Some(&mock), &image_request("a cat")).await;

    assert_eq!(envelope.error, Some(ErrorKind::MissingConfig));
    assert!(envelope.content.contains("AZURE_OPENAI_IMAGE_DEPLOYMENT"));
    assert_eq!(mock.submit_calls(), 0);

    // The same config still serves the text path.
    let envelope = handle(&config, Some(&mock), &text_request("hi")).await;
    assert_eq!(envelope.error, None);
}

#[tokio::test]
async fn absent_client_yields_configuration_error() {
    let config = test_helpers::test_config();
    let envelope = handle(&config, None, &text_request("hi")).await;
    assert_eq!(envelope.error, Some(ErrorKind::MissingConfig));
    assert_eq!(envelope.is_configured, Some(false));
}

// =========================================================================
// dispatch purity
// =========================================================================

#[tokio::test]
async fn text_mode_never_touches_the_image_path() {
    // Even image-sounding prose stays on the text path: the flag is the
    // sole dispatch authority.
    let mock = MockUpstream::completing(Ok("sure".into()));
    let config = test_helpers::test_config();
    let envelope = handle(&config, Some(&mock), &text_request("please draw me a picture of a cat")).await;

    assert_eq!(envelope.content, "sure");
    assert_eq!(mock.submit_calls(), 0);
    assert_eq!(mock.poll_call_count(), 0);
}

// =========================================================================
// text path
// =========================================================================

#[tokio::test]
async fn text_round_trip_returns_upstream_content_exactly() {
    let mock = MockUpstream::completing(Ok("hello".into()));
    let config = test_helpers::test_config();
    let envelope = handle(&config, Some(&mock), &text_request("say hello")).await;

    assert!(!envelope.is_image);
    assert_eq!(envelope.content, "hello");
    assert_eq!(envelope.error, None);
}

#[tokio::test]
async fn system_instruction_leads_the_turn_sequence() {
    let mock = MockUpstream::completing(Ok("ok".into()));
    let config = test_helpers::test_config();
    handle(&config, Some(&mock), &text_request("hi")).await;

    let calls = mock.completed_turns.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let turns = &calls[0];
    assert_eq!(turns[0].role, Role::System);
    assert_eq!(turns[0].content, SYSTEM_PROMPT);
    assert_eq!(turns[1], ChatTurn::new(Role::User, "hi"));
}

#[tokio::test]
async fn unauthorized_completion_is_classified() {
    let mock = MockUpstream::completing(Err(UpstreamError::Status { status: 401, body: "denied".into() }));
    let config = test_helpers::test_config();
    let envelope = handle(&config, Some(&mock), &text_request("hi")).await;

    assert_eq!(envelope.error, Some(ErrorKind::Unauthorized));
    assert!(!envelope.content.is_empty());
    assert!(!envelope.is_image);
}

#[tokio::test]
async fn unknown_completion_failure_embeds_truncated_body() {
    let body = "upstream exploded ".repeat(50);
    let mock = MockUpstream::completing(Err(UpstreamError::Status { status: 500, body }));
    let config = test_helpers::test_config();
    let envelope = handle(&config, Some(&mock), &text_request("hi")).await;

    assert_eq!(envelope.error, Some(ErrorKind::Unknown));
    assert!(envelope.content.contains("upstream exploded"));
    assert!(envelope.content.len() < 500, "body must be truncated into the hint");
}

// =========================================================================
// image path
// =========================================================================

#[tokio::test]
async fn inline_image_result_returns_url_with_zero_polls() {
    let mock = MockUpstream::submitting(Ok(SubmitOutcome::Inline("https://x/y.png".into())));
    let config = test_helpers::test_config();
    let envelope = handle(&config, Some(&mock), &image_request("a cat")).await;

    assert!(envelope.is_image);
    assert_eq!(envelope.content, "https://x/y.png");
    assert_eq!(envelope.error, None);
    assert_eq!(mock.poll_call_count(), 0);
}

#[tokio::test]
async fn image_prompt_is_the_last_turn() {
    let mock = MockUpstream::submitting(Ok(SubmitOutcome::Inline("https://x/y.png".into())));
    let config = test_helpers::test_config();
    let request = GatewayRequest {
        turns: vec![ChatTurn::new(Role::User, "earlier"), ChatTurn::new(Role::User, "a red fox at dusk")],
        image_mode: true,
    };
    handle(&config, Some(&mock), &request).await;

    assert_eq!(*mock.submitted_prompts.lock().unwrap(), vec!["a red fox at dusk"]);
}

#[tokio::test]
async fn not_found_submit_names_the_image_deployment() {
    let mock =
        MockUpstream::submitting(Err(UpstreamError::Status { status: 404, body: "Resource not found".into() }));
    let config = test_helpers::test_config();
    let envelope = handle(&config, Some(&mock), &image_request("a cat")).await;

    assert_eq!(envelope.error, Some(ErrorKind::NotFound));
    assert!(envelope.content.contains("dall-e"), "operator needs the deployment id: {}", envelope.content);
    assert_eq!(mock.poll_call_count(), 0);
}

#[tokio::test]
async fn malformed_submit_maps_to_malformed_result() {
    let mock = MockUpstream::submitting(Err(UpstreamError::Malformed("no locator, no result".into())));
    let config = test_helpers::test_config();
    let envelope = handle(&config, Some(&mock), &image_request("a cat")).await;

    assert_eq!(envelope.error, Some(ErrorKind::MalformedResult));
}

#[tokio::test(start_paused = true)]
async fn exhausted_polls_surface_a_timeout_envelope() {
    let mock = MockUpstream::submitting(Ok(SubmitOutcome::Deferred(JobHandle("https://example.test/op/1".into()))));
    let config = test_helpers::test_config();
    let envelope = handle(&config, Some(&mock), &image_request("a cat")).await;

    assert_eq!(envelope.error, Some(ErrorKind::Timeout));
    assert!(envelope.content.contains("took too long"));
    assert_eq!(mock.poll_call_count(), images::MAX_POLL_ATTEMPTS as usize);
}

#[tokio::test(start_paused = true)]
async fn failed_job_reason_appears_verbatim_in_content() {
    let mock = MockUpstream::submitting(Ok(SubmitOutcome::Deferred(JobHandle("https://example.test/op/1".into()))));
    mock.polls
        .lock()
        .unwrap()
        .push(Ok(PollOutcome::Failed("content policy violation".into())));
    let config = test_helpers::test_config();
    let envelope = handle(&config, Some(&mock), &image_request("a cat")).await;

    assert!(envelope.content.contains("content policy violation"));
    assert!(mock.poll_call_count() < images::MAX_POLL_ATTEMPTS as usize);
}

#[tokio::test]
async fn empty_prompt_gets_a_presentable_message() {
    let mock = MockUpstream::default();
    let config = test_helpers::test_config();
    let request = GatewayRequest { turns: vec![], image_mode: true };
    let envelope = handle(&config, Some(&mock), &request).await;

    assert!(!envelope.content.is_empty());
    assert_eq!(mock.submit_calls(), 0);
}
