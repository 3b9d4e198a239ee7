//! Interactive chat session.
//!
//! One session owns the transcript and the chat client and runs the
//! read-send-route loop until EOF or an `exit` line. Each turn blocks on its
//! request; there is never a request in flight while waiting for input.

use crate::knowledge::Knowledge;
use crate::llm::chat::{extract_reply, ChatClient};
use crate::router::{self, Outcome};
use crate::transcript::Transcript;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};

/// An interactive session against the chat completion endpoint.
pub struct ChatSession {
    transcript: Transcript,
    client: ChatClient,
    interactive: bool,
}

impl ChatSession {
    /// Create a session seeded with the knowledge files as the first
    /// user-role messages.
    pub fn new(client: ChatClient, knowledge: Knowledge) -> Self {
        let mut transcript = Transcript::new();
        transcript.push_user(knowledge.device_schema);
        transcript.push_user(knowledge.system_prompt);

        Self {
            transcript,
            client,
            interactive: atty::is(atty::Stream::Stdin),
        }
    }

    /// Run the session until EOF or a literal `exit` line.
    pub async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            self.prompt()?;
            let line = match lines.next_line().await? {
                Some(line) => line,
                None => break,
            };

            let input = line.trim();
            if input == "exit" {
                break;
            }
            if input.is_empty() {
                continue;
            }

            self.transcript.push_user(input);
            self.take_turn().await;
        }

        Ok(())
    }

    fn prompt(&self) -> Result<()> {
        if self.interactive {
            print!("You: ");
            std::io::stdout().flush()?;
        }
        Ok(())
    }

    /// One request-response turn. Transport failures and unreadable
    /// envelopes are reported and survived; the transcript gains an
    /// assistant message only when a reply was extracted.
    async fn take_turn(&mut self) {
        let body = match self.client.send(&self.transcript).await {
            Ok(body) => body,
            Err(err) => {
                error!(%err, "chat request failed");
                eprintln!("Error: {}", err);
                return;
            }
        };

        let reply = match extract_reply(&body) {
            Some(reply) => reply,
            None => {
                warn!("response envelope carried no reply");
                println!("no reply");
                return;
            }
        };

        let routed = router::route(&reply);
        render(&routed.outcome);
        self.transcript.push_assistant(routed.entry);
    }
}

/// Show a routed outcome to the user.
fn render(outcome: &Outcome) {
    match outcome {
        Outcome::EffectPerformed { operation, status } => {
            println!("{}", operation.report(status));
        }
        Outcome::DialogShown(message) => {
            println!("AI: {}", message);
        }
        Outcome::MalformedLogged { field } => {
            println!("Missing or malformed field: {}", field);
        }
        Outcome::UnknownTypeLogged(label) => {
            println!("Unknown type: {}", label);
        }
        Outcome::UnknownOperationLogged { operation } => {
            println!("Unknown operation: {}", operation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::llm;

    fn test_knowledge() -> Knowledge {
        Knowledge {
            device_schema: "{\"devices\":[]}".to_string(),
            system_prompt: "Reply with fenced JSON.".to_string(),
        }
    }

    fn refused_client() -> ChatClient {
        // Nothing listens on this port; the connection is refused before a
        // request body ever leaves the process.
        let api = ApiConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            ..ApiConfig::default()
        };
        ChatClient::new(llm::build_client(api.timeout_secs), &api, "test-key".to_string())
    }

    #[test]
    fn test_session_seeds_knowledge_as_user_messages() {
        let session = ChatSession::new(refused_client(), test_knowledge());
        assert_eq!(session.transcript.len(), 2);
        assert_eq!(session.transcript.messages()[0].content, "{\"devices\":[]}");
        assert_eq!(
            session.transcript.messages()[1].content,
            "Reply with fenced JSON."
        );
    }

    #[tokio::test]
    async fn test_transport_failure_appends_no_assistant_message() {
        let mut session = ChatSession::new(refused_client(), test_knowledge());
        session.transcript.push_user("turn on the light");
        let before = session.transcript.len();

        session.take_turn().await;

        assert_eq!(session.transcript.len(), before);
    }
}
