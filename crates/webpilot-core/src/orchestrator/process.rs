//! Main execution loop
//!
//! Per iteration:
//! 1. once per run, hand a login form to the user and restart the iteration
//! 2. hand any captcha to the user
//! 3. ask the model, screen its text, append its message
//! 4. no tool calls: stop if the text claims completion
//! 5. tool calls: run them in order, stopping on repetition, a completion
//!    heuristic or `task_complete`

use super::core::Orchestrator;
use super::heuristics::{
    count_error_messages, domain_keywords, error_hint, mentions_completion, PageRepeatDetector,
    SuccessTracker,
};
use super::types::{
    AbortReason, ActionHistory, ActionRecord, Conversation, RunState, TaskOutcome, TaskStatus,
};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use webpilot_llm::{
    CompletionRequest, Message, ToolCall, ToolChoice, ToolCompletionRequest,
};
use webpilot_tools::tool::{self, ASK_USER, GET_PAGE_INFO, TASK_COMPLETE};

const LOGIN_SUCCEEDED: &str = "Login succeeded. Continue the task.";
const NO_ANSWER: &str = "No answer from the user.";
const REPEATED_ACTION: &str = "Aborted because the same action was repeated.";
const ITERATION_LIMIT: &str =
    "Reached the maximum number of iterations. The task may not be complete.";
const PAGE_CONTENT_FOUND: &str =
    "Task completed: the requested content is on the page and the page no longer changes.";

/// How many recent messages the error check looks at
const ERROR_WINDOW: usize = 5;
/// Errors within the window that abort the run
const ERROR_THRESHOLD: usize = 3;
/// The error check only runs after this many iterations
const ERROR_GRACE_ITERATIONS: usize = 5;

/// Mutable state of one run, owned by the loop
struct TaskRun {
    conversation: Conversation,
    history: ActionHistory,
    pages: PageRepeatDetector,
    successes: SuccessTracker,
    domain: Vec<String>,
    state: RunState,
    iteration: usize,
    login_checked: bool,
}

impl TaskRun {
    fn new(orchestrator: &Orchestrator, task: &str) -> Self {
        let domain = if orchestrator.config.domain_keywords.is_empty() {
            domain_keywords(task)
        } else {
            orchestrator
                .config
                .domain_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect()
        };
        debug!(?domain, "Domain keywords");

        Self {
            conversation: Conversation::new(&orchestrator.config.system_prompt, task),
            history: ActionHistory::default(),
            pages: PageRepeatDetector::default(),
            successes: SuccessTracker::default(),
            domain,
            state: RunState::Running,
            iteration: 0,
            login_checked: false,
        }
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            info!(from = %self.state, to = %next, iteration = self.iteration, "Run state changed");
            self.state = next;
        }
    }
}

impl Orchestrator {
    /// Run a task to completion, abort or refusal
    #[instrument(skip(self, task), fields(provider = %self.provider.name()))]
    pub async fn run(&self, task: &str) -> TaskOutcome {
        let screening = self.guardrails.check_input(task);
        if screening.is_blocked() {
            let reasons = screening.reasons().join("; ");
            warn!(reasons = %reasons, "Task refused by input screening");
            return TaskOutcome {
                status: TaskStatus::Blocked,
                result: format!("Request refused: {reasons}"),
                iterations: 0,
            };
        }
        for reason in screening.reasons() {
            warn!(reason = %reason, "Input screening finding");
        }

        info!(task_len = task.len(), "Starting task");
        let mut run = TaskRun::new(self, task);

        while run.iteration < self.config.max_iterations {
            run.iteration += 1;
            self.input.notify(&format!("[Iteration {}]", run.iteration));
            debug!(iteration = run.iteration, "Iteration started");

            if !run.login_checked {
                run.login_checked = true;
                if self.login_required().await {
                    let outcome = self.executor.watcher().wait_for_login().await;
                    if outcome.is_resolved() {
                        sleep(self.config.executor.login_settle).await;
                        run.conversation.push(Message::user(LOGIN_SUCCEEDED));
                    }
                    continue;
                }
            }

            self.clear_captcha().await;

            let response = match self.provider.complete_with_tools(self.request(&run)).await {
                Ok(response) => response,
                Err(e) => {
                    if e.is_fatal() {
                        let result = format!(
                            "Provider error: {e}. Switch to another LLM provider or top up the account balance."
                        );
                        return self.abort(&mut run, AbortReason::ProviderFatal, result);
                    }

                    let message = e.to_string();
                    warn!(iteration = run.iteration, error = %message, "Provider call failed");
                    run.conversation.push(Message::user(format!(
                        "An error occurred: {message}. {}",
                        error_hint(&message)
                    )));

                    if run.iteration > ERROR_GRACE_ITERATIONS
                        && count_error_messages(run.conversation.tail(ERROR_WINDOW))
                            >= ERROR_THRESHOLD
                    {
                        let result = format!(
                            "Too many errors in a row. The task may need more information or a different approach. Last error: {message}"
                        );
                        return self.abort(&mut run, AbortReason::TooManyErrors, result);
                    }
                    continue;
                }
            };

            let content = response.content.unwrap_or_default();
            if !content.is_empty() {
                let report = self.guardrails.check_output(&content);
                for reason in report.reasons() {
                    warn!(reason = %reason, "Model output finding");
                }
            }

            if response.tool_calls.is_empty() {
                run.conversation.push(Message::assistant(content.clone()));
                if !content.is_empty() && mentions_completion(&content) {
                    info!(iteration = run.iteration, "Model reported completion");
                    return self.complete(&mut run, content);
                }
                continue;
            }

            run.conversation.push(Message::assistant_with_tool_calls(
                content,
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                if let Some(outcome) = self.handle_call(&mut run, call).await {
                    return outcome;
                }
            }
        }

        self.abort(&mut run, AbortReason::IterationLimit, ITERATION_LIMIT.to_string())
    }

    async fn handle_call(&self, run: &mut TaskRun, call: &ToolCall) -> Option<TaskOutcome> {
        let arguments = call.arguments_value();
        info!(iteration = run.iteration, tool = %call.name, args = %arguments, "Tool call");

        if run.history.record(ActionRecord::new(&call.name, &arguments)) {
            warn!(tool = %call.name, "Same action repeated, aborting");
            return Some(self.abort(
                run,
                AbortReason::RepeatedAction,
                REPEATED_ACTION.to_string(),
            ));
        }

        let result = self.executor.execute(call).await;
        debug!(tool = %call.name, result_len = result.len(), "Tool finished");

        if call.name == GET_PAGE_INFO && run.pages.observe(&result, &run.domain) {
            info!("Page unchanged and shows the requested content");
            return Some(self.complete(run, PAGE_CONTENT_FOUND.to_string()));
        }
        if run.successes.observe(&call.name, &result) {
            info!(tool = %call.name, "Same successful result twice");
            return Some(self.complete(run, format!("Task completed: {result}")));
        }

        run.conversation
            .push(Message::tool_response(call.id.clone(), result.clone()));

        match call.name.as_str() {
            TASK_COMPLETE => Some(self.complete(run, result)),
            ASK_USER => {
                run.transition(RunState::AwaitingUserAnswer);
                let answer = self.input.read_line(&result).await;
                let answer = answer
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| NO_ANSWER.to_string());
                run.conversation.push(Message::user(answer));
                run.transition(RunState::Running);
                None
            }
            _ => None,
        }
    }

    fn request(&self, run: &TaskRun) -> ToolCompletionRequest {
        let model = self
            .config
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());
        let mut request =
            CompletionRequest::new(model).with_messages(run.conversation.messages().to_vec());
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        ToolCompletionRequest::new(request, tool::definitions()).with_tool_choice(ToolChoice::Auto)
    }

    async fn login_required(&self) -> bool {
        match self.browser.check_login_status().await {
            Ok(status) => status.needs_login(),
            Err(e) => {
                debug!(error = %e, "Login probe failed");
                false
            }
        }
    }

    async fn clear_captcha(&self) {
        match self.browser.check_captcha().await {
            Ok(info) if info.has_captcha => {
                let outcome = self.executor.watcher().wait_for_captcha(&info).await;
                debug!(?outcome, "Captcha wait finished");
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Captcha probe failed"),
        }
    }

    fn complete(&self, run: &mut TaskRun, result: String) -> TaskOutcome {
        let report = self.guardrails.check_output(&result);
        let result = if report.is_blocked() {
            warn!(reasons = ?report.reasons(), "Final result withheld");
            format!(
                "The result was withheld because it failed output screening: {}",
                report.reasons().join("; ")
            )
        } else {
            for reason in report.reasons() {
                warn!(reason = %reason, "Final result finding");
            }
            result
        };

        run.transition(RunState::Completed);
        TaskOutcome {
            status: TaskStatus::Completed,
            result,
            iterations: run.iteration,
        }
    }

    fn abort(&self, run: &mut TaskRun, reason: AbortReason, result: String) -> TaskOutcome {
        warn!(?reason, iteration = run.iteration, "Task aborted");
        run.transition(RunState::Aborted);
        TaskOutcome {
            status: TaskStatus::Aborted(reason),
            result,
            iterations: run.iteration,
        }
    }
}
