//! Interactive account registration.
//!
//! A registration runs as a small state machine per session:
//!
//! ```text
//! AwaitingEmail -> AwaitingUsername -> Creating -> Done
//!       |                 |                 \-> Failed
//!       \-----------------+-> TimedOut
//! ```
//!
//! Prompts are posted in a private channel created for the session and each
//! waits for one reply from the invoking user, bounded by the prompt timeout.

use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::private_channels::{registration_channel_name, RegistrationChannels};
use crate::error::{BotError, Result};
use crate::messages;
use crate::panel::{CreateUserRequest, SharedPanel, UserLookup};
use crate::state::ActiveSessions;

/// Timing knobs for a registration
#[derive(Debug, Clone, Copy)]
pub struct RegistrationSettings {
    pub prompt_timeout: Duration,
    pub cleanup_delay: Duration,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            prompt_timeout: Duration::from_secs(60),
            cleanup_delay: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingEmail,
    AwaitingUsername,
    Creating,
    Done,
    Failed,
    TimedOut,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Failed | SessionState::TimedOut
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Email,
    Username,
}

impl Prompt {
    pub fn text(self) -> &'static str {
        match self {
            Prompt::Email => messages::PROMPT_EMAIL,
            Prompt::Username => messages::PROMPT_USERNAME,
        }
    }
}

/// Credentials delivered to the user after the panel account exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDetails {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// First 8 characters of a random v4 UUID in its hyphen-free form
pub fn generate_password() -> String {
    let mut password = uuid::Uuid::new_v4().simple().to_string();
    password.truncate(8);
    password
}

/// State of one registration
#[derive(Debug, Clone)]
pub struct RegistrationSession {
    pub user_id: UserId,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub started_at: DateTime<Utc>,
    state: SessionState,
}

impl RegistrationSession {
    pub fn new(user_id: UserId, guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            user_id,
            guild_id,
            channel_id,
            email: None,
            username: None,
            password: None,
            started_at: Utc::now(),
            state: SessionState::AwaitingEmail,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The prompt the session is waiting on, if any
    pub fn pending_prompt(&self) -> Option<Prompt> {
        match self.state {
            SessionState::AwaitingEmail => Some(Prompt::Email),
            SessionState::AwaitingUsername => Some(Prompt::Username),
            _ => None,
        }
    }

    /// Record the answer to the pending prompt. Content is kept verbatim.
    pub fn accept_reply(&mut self, content: String) -> Result<()> {
        if content.trim().is_empty() {
            return Err(BotError::Validation {
                message: "Reply must not be empty.".to_string(),
            });
        }

        match self.state {
            SessionState::AwaitingEmail => {
                self.email = Some(content);
                self.state = SessionState::AwaitingUsername;
            }
            SessionState::AwaitingUsername => {
                self.username = Some(content);
                self.password = Some(generate_password());
                self.state = SessionState::Creating;
            }
            other => {
                return Err(BotError::Internal {
                    message: format!("reply received in state {:?}", other),
                })
            }
        }
        Ok(())
    }

    /// A prompt went unanswered
    pub fn time_out(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::TimedOut;
        }
    }

    /// Payload for the panel, available once both answers are in
    pub fn create_user_request(&self) -> Option<CreateUserRequest> {
        if self.state != SessionState::Creating {
            return None;
        }
        Some(CreateUserRequest {
            username: self.username.clone()?,
            email: self.email.clone()?,
            password: self.password.clone()?,
            user_id: self.user_id.to_string(),
        })
    }

    /// Move out of `Creating` depending on the panel's answer
    pub fn finish(&mut self, created: bool) {
        if self.state == SessionState::Creating {
            self.state = if created {
                SessionState::Done
            } else {
                SessionState::Failed
            };
        }
    }

    pub fn account_details(&self) -> Option<AccountDetails> {
        if self.state != SessionState::Done {
            return None;
        }
        Some(AccountDetails {
            username: self.username.clone()?,
            email: self.email.clone()?,
            password: self.password.clone()?,
        })
    }
}

/// Who asked to register, and with which email
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub user_id: UserId,
    pub guild_id: GuildId,
    pub display_name: String,
    pub email: String,
}

/// How a registration ended. Unexpected failures are returned as `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The user already has a registration running
    AlreadyInProgress,
    /// The panel already knows this email
    EmailTaken,
    /// The panel lookup failed or answered ambiguously
    LookupFailed,
    /// A prompt went unanswered; the channel is scheduled for removal
    TimedOut { channel_id: ChannelId },
    /// The panel refused the account; the channel stays open
    CreationFailed { channel_id: ChannelId },
    /// Account created and credentials sent by DM
    Completed { channel_id: ChannelId },
}

/// Drives registrations from command to cleanup
pub struct RegistrationManager {
    panel: SharedPanel,
    channels: Arc<dyn RegistrationChannels>,
    sessions: ActiveSessions,
    settings: RegistrationSettings,
}

impl RegistrationManager {
    pub fn new(
        panel: SharedPanel,
        channels: Arc<dyn RegistrationChannels>,
        sessions: ActiveSessions,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            panel,
            channels,
            sessions,
            settings,
        }
    }

    /// Run a registration to completion
    pub async fn register(&self, request: RegistrationRequest) -> Result<RegistrationOutcome> {
        let Some(guard) = self.sessions.try_begin(request.user_id) else {
            info!("User {} already has a registration running", request.user_id);
            return Ok(RegistrationOutcome::AlreadyInProgress);
        };

        match self.panel.get_user_by_email(&request.email).await {
            Ok(UserLookup::Found) => {
                info!("Registration by {} rejected: email already taken", request.user_id);
                return Ok(RegistrationOutcome::EmailTaken);
            }
            Ok(UserLookup::NotFound) => {}
            Err(e) => {
                error!("User lookup failed for {}: {}", request.user_id, e);
                return Ok(RegistrationOutcome::LookupFailed);
            }
        }

        let channel_name = registration_channel_name(&request.display_name);
        let channel_id = self
            .channels
            .create_private_channel(request.guild_id, request.user_id, &channel_name)
            .await?;
        guard.attach_channel(channel_id);

        let mut session = RegistrationSession::new(request.user_id, request.guild_id, channel_id);
        self.collect_answers(&mut session).await?;

        if session.state() == SessionState::TimedOut {
            info!(
                "Registration for {} in guild {} timed out after {}s",
                session.user_id,
                session.guild_id,
                (Utc::now() - session.started_at).num_seconds()
            );
            self.schedule_cleanup(channel_id);
            if let Err(e) = self
                .channels
                .say(channel_id, messages::REGISTRATION_TIMED_OUT)
                .await
            {
                warn!("Failed to post timeout notice in {}: {}", channel_id, e);
            }
            return Ok(RegistrationOutcome::TimedOut { channel_id });
        }

        let create_request = session.create_user_request().ok_or_else(|| BotError::Internal {
            message: format!("session ended in unexpected state {:?}", session.state()),
        })?;

        if let Err(e) = self.panel.create_user(&create_request).await {
            error!("Failed to create panel user for {}: {}", session.user_id, e);
            session.finish(false);
            self.channels
                .say(channel_id, messages::CREATE_USER_FAILED)
                .await?;
            return Ok(RegistrationOutcome::CreationFailed { channel_id });
        }

        session.finish(true);
        let account = session.account_details().ok_or_else(|| BotError::Internal {
            message: "account details missing after creation".to_string(),
        })?;

        self.channels
            .send_account_details(session.user_id, &account)
            .await?;
        self.channels
            .say(channel_id, messages::ACCOUNT_CREATED)
            .await?;
        self.schedule_cleanup(channel_id);

        info!(
            "Registered panel user '{}' for {} in guild {}",
            account.username, session.user_id, session.guild_id
        );
        Ok(RegistrationOutcome::Completed { channel_id })
    }

    /// Ask each prompt in turn until both are answered or one times out
    async fn collect_answers(&self, session: &mut RegistrationSession) -> Result<()> {
        while let Some(prompt) = session.pending_prompt() {
            self.channels.say(session.channel_id, prompt.text()).await?;

            let reply = tokio::time::timeout(
                self.settings.prompt_timeout,
                self.channels.next_reply(session.channel_id, session.user_id),
            )
            .await;

            match reply {
                Ok(Ok(Some(content))) => session.accept_reply(content)?,
                Ok(Ok(None)) | Err(_) => session.time_out(),
                Ok(Err(e)) => return Err(e),
            }
        }
        Ok(())
    }

    /// Delete the channel after the cleanup delay. Failures are only logged.
    fn schedule_cleanup(&self, channel_id: ChannelId) {
        let channels = Arc::clone(&self.channels);
        let delay = self.settings.cleanup_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = channels.delete_channel(channel_id).await {
                warn!("Failed to delete registration channel {}: {}", channel_id, e);
            }
        });
    }
}
