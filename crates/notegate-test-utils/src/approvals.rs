use async_trait::async_trait;
use notegate_core::ApprovalSurface;
use notegate_protocol::{ApprovalAction, ApprovalResponse};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Approval surface answering from a script and recording every prompt.
///
/// Scripted responses are used in order; once they run out the fallback
/// answers.
#[derive(Debug)]
pub struct ScriptedApprovalSurface {
    script: Mutex<VecDeque<ApprovalResponse>>,
    fallback: ApprovalResponse,
    presented: Mutex<Vec<ApprovalAction>>,
}

impl ScriptedApprovalSurface {
    /// Answer every prompt with `response`.
    pub fn always_answer(response: ApprovalResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: response,
            presented: Mutex::new(Vec::new()),
        }
    }

    /// Answer with `responses` in order, then deny.
    pub fn scripted(responses: impl IntoIterator<Item = ApprovalResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            fallback: ApprovalResponse::deny("script exhausted"),
            presented: Mutex::new(Vec::new()),
        }
    }

    /// Number of prompts shown so far.
    pub fn prompt_count(&self) -> usize {
        self.presented.lock().len()
    }

    /// Every action presented so far.
    pub fn presented(&self) -> Vec<ApprovalAction> {
        self.presented.lock().clone()
    }
}

#[async_trait]
impl ApprovalSurface for ScriptedApprovalSurface {
    async fn present(&self, action: ApprovalAction) -> ApprovalResponse {
        self.presented.lock().push(action);
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
