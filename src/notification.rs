//! # Notification data model.
//!
//! The types exchanged between producers, the broker, and subscribers:
//!
//! - [`NotifyRequest`]: what a producer wants to surface to the user
//! - [`NotifyResponse`]: the user's reaction, handed back to the producer
//! - [`SubscribeRequest`]: a subscriber's interest declaration
//! - [`Envelope`]: a broker-assigned request id paired with the request,
//!   as delivered to subscribers
//!
//! ## Blocking vs. non-blocking
//! A request is **blocking** iff it asks something of the user: it offers
//! action labels, or wants a resource opened, or a preview rendered. A
//! blocking request parks the producer until a response (or cancellation)
//! arrives; a non-blocking request is pure information delivery and is
//! acknowledged immediately.
//!
//! ## Example
//! ```rust
//! use notivisor::{Level, NotifyRequest, NotifyResponse};
//!
//! let req = NotifyRequest::new("rebuild the workspace image?")
//!     .with_level(Level::Warning)
//!     .with_actions(["rebuild", "skip"])
//!     .with_active(true);
//!
//! assert!(req.is_blocking());
//! assert!(NotifyResponse::Action("rebuild".into()).is_valid_for(&req));
//! assert!(!NotifyResponse::Action("maybe".into()).is_valid_for(&req));
//! // An empty response means the user dismissed the prompt; always allowed.
//! assert!(NotifyResponse::Dismissed.is_valid_for(&req));
//! ```

/// Severity of a notification, as rendered by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    /// Informational message.
    #[default]
    Info,
    /// Something the user should look at.
    Warning,
    /// Something went wrong.
    Error,
}

/// Resource the front-end should open on the producer's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    /// URL or workspace-relative path to open.
    pub url: String,
}

/// Resource the front-end should render as a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    /// URL to render.
    pub url: String,
}

/// A command the user chose to run in reaction to a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Executable or builtin name. Must be non-empty.
    pub cmd: String,
    /// Arguments, possibly empty.
    pub args: Vec<String>,
}

/// A notification submitted by a producer.
///
/// Built with [`NotifyRequest::new`] plus the `with_*` methods. The
/// `active` flag routes the request: it only reaches subscribers that
/// declared the same flag in their [`SubscribeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotifyRequest {
    /// Human-readable message to display.
    pub message: String,
    /// Severity tag.
    pub level: Level,
    /// Target only subscribers watching the focused surface.
    pub active: bool,
    /// Ordered action labels offered to the user. Non-empty makes the
    /// request blocking.
    pub actions: Vec<String>,
    /// Resource to open. Set makes the request blocking.
    pub open: Option<OpenRequest>,
    /// Resource to preview. Set makes the request blocking.
    pub preview: Option<PreviewRequest>,
}

impl NotifyRequest {
    /// Creates an informational, non-blocking request with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Sets the severity.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the interest class the request is routed to.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Sets the action labels offered to the user.
    pub fn with_actions<I, A>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    /// Asks the front-end to open a resource.
    pub fn with_open(mut self, url: impl Into<String>) -> Self {
        self.open = Some(OpenRequest { url: url.into() });
        self
    }

    /// Asks the front-end to render a preview.
    pub fn with_preview(mut self, url: impl Into<String>) -> Self {
        self.preview = Some(PreviewRequest { url: url.into() });
        self
    }

    /// True iff the request requires a user response.
    pub fn is_blocking(&self) -> bool {
        !self.actions.is_empty() || self.open.is_some() || self.preview.is_some()
    }
}

/// The user's reaction to a notification.
///
/// [`Dismissed`](NotifyResponse::Dismissed) doubles as the immediate
/// acknowledgement of non-blocking requests and as an explicit user
/// dismissal of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NotifyResponse {
    /// Empty response: non-blocking ack, or the user dismissed the prompt.
    #[default]
    Dismissed,
    /// One of the action labels offered by the request.
    Action(String),
    /// A command the user chose to run.
    Command(Command),
}

impl NotifyResponse {
    /// Validates this response against the request it answers.
    ///
    /// - A command must carry a non-empty `cmd`.
    /// - A dismissal is always allowed.
    /// - An action must appear in the request's action list.
    pub fn is_valid_for(&self, request: &NotifyRequest) -> bool {
        match self {
            NotifyResponse::Command(command) => !command.cmd.is_empty(),
            NotifyResponse::Dismissed => true,
            NotifyResponse::Action(action) => {
                request.actions.iter().any(|allowed| allowed == action)
            }
        }
    }
}

/// A subscriber's interest declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscribeRequest {
    /// Watch only notifications targeting the focused surface.
    pub active: bool,
}

/// A broker-assigned request id paired with the original request.
///
/// This is what subscribers receive, both on live fan-out and on
/// join-time replay. The id is what a responder passes back to
/// [`Broker::respond`](crate::Broker::respond).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Monotonic id assigned by the broker. Never reused within a broker
    /// lifetime.
    pub request_id: u64,
    /// The request as submitted by the producer.
    pub request: NotifyRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_is_not_blocking() {
        let req = NotifyRequest::new("build finished");
        assert!(!req.is_blocking());
    }

    #[test]
    fn actions_open_and_preview_each_make_a_request_blocking() {
        assert!(NotifyRequest::new("q").with_actions(["ok"]).is_blocking());
        assert!(NotifyRequest::new("q").with_open("http://localhost:3000").is_blocking());
        assert!(NotifyRequest::new("q").with_preview("doc.md").is_blocking());
    }

    #[test]
    fn action_must_be_offered_by_the_request() {
        let req = NotifyRequest::new("reload?").with_actions(["yes", "no"]);
        assert!(NotifyResponse::Action("yes".into()).is_valid_for(&req));
        assert!(NotifyResponse::Action("no".into()).is_valid_for(&req));
        assert!(!NotifyResponse::Action("maybe".into()).is_valid_for(&req));
    }

    #[test]
    fn dismissal_is_always_valid() {
        let req = NotifyRequest::new("reload?").with_actions(["yes"]);
        assert!(NotifyResponse::Dismissed.is_valid_for(&req));
        assert!(NotifyResponse::Dismissed.is_valid_for(&NotifyRequest::new("info")));
    }

    #[test]
    fn command_requires_a_non_empty_cmd() {
        let req = NotifyRequest::new("open it").with_open("file.txt");
        let empty = NotifyResponse::Command(Command {
            cmd: String::new(),
            args: vec![],
        });
        let ok = NotifyResponse::Command(Command {
            cmd: "code".into(),
            args: vec!["file.txt".into()],
        });
        assert!(!empty.is_valid_for(&req));
        assert!(ok.is_valid_for(&req));
    }
}
