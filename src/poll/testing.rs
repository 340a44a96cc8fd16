//! Scripted collaborators for exercising the cycle without hardware

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokenrelay_shared::{api::TxStatusCode, AuthRequestRecord, RadioResponse, TxRequest16, TxStatus};

use crate::radio::{Radio, RadioError};
use crate::server::{FetchError, SubmitError, TokenServer};

/// Server that replays a fixed list of poll results
pub struct ScriptedServer {
    records: Mutex<VecDeque<Result<AuthRequestRecord, FetchError>>>,
    submitted: Mutex<Vec<String>>,
    reject_submissions: bool,
}

impl ScriptedServer {
    pub fn with_records(records: Vec<Result<AuthRequestRecord, FetchError>>) -> Self {
        Self {
            records: Mutex::new(records.into()),
            submitted: Mutex::new(Vec::new()),
            reject_submissions: false,
        }
    }

    pub fn rejecting_submissions(mut self) -> Self {
        self.reject_submissions = true;
        self
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenServer for ScriptedServer {
    async fn fetch_request(&self) -> Result<AuthRequestRecord, FetchError> {
        self.records
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(FetchError::Status(503)))
    }

    async fn submit_rx(&self, description: &str) -> Result<(), SubmitError> {
        if self.reject_submissions {
            return Err(SubmitError::Status(500));
        }
        self.submitted.lock().unwrap().push(description.to_string());
        Ok(())
    }
}

/// How the scripted radio answers the next send
pub enum Reply {
    /// TX status for the request's frame id with this status byte
    Status(u8),
    /// Successful TX status for some other frame id
    StaleAck,
    Timeout,
    Response(RadioResponse),
}

/// Radio that records what was sent and answers from a script
pub struct ScriptedRadio {
    pub sent: Vec<TxRequest16>,
    replies: VecDeque<Reply>,
    pub inbound: VecDeque<Result<RadioResponse, RadioError>>,
    last_frame_id: u8,
}

impl ScriptedRadio {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            sent: Vec::new(),
            replies: replies.into(),
            inbound: VecDeque::new(),
            last_frame_id: 0,
        }
    }
}

#[async_trait]
impl Radio for ScriptedRadio {
    fn next_frame_id(&mut self) -> u8 {
        self.last_frame_id = self.last_frame_id.wrapping_add(1).max(1);
        self.last_frame_id
    }

    async fn send_synchronous(
        &mut self,
        request: &TxRequest16,
        timeout: Duration,
    ) -> Result<RadioResponse, RadioError> {
        self.sent.push(request.clone());

        let status = |frame_id: u8, code: u8| {
            RadioResponse::TxStatus(TxStatus {
                frame_id,
                status: TxStatusCode::from(code),
            })
        };

        match self.replies.pop_front() {
            Some(Reply::Status(code)) => Ok(status(request.frame_id, code)),
            Some(Reply::StaleAck) => Ok(status(request.frame_id.wrapping_add(100), 0)),
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Timeout) | None => Err(RadioError::Timeout(timeout)),
        }
    }

    async fn next_response(&mut self, _wait: Duration) -> Result<Option<RadioResponse>, RadioError> {
        match self.inbound.pop_front() {
            Some(Ok(response)) => Ok(Some(response)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}
