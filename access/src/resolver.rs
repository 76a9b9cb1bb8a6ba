//! Who may act on an event.
//!
//! [`EventAccessResolver::resolve`] answers one question for owner-only and
//! scan-only operations: is this caller the event's owner, a scanner for
//! it, or nobody? `None` always means deny; a caller with no role is never
//! treated as a guest.

use crate::error::{AccessError, Result};
use crate::providers::EventDirectory;
use crate::scanner::ScannerSession;
use crate::utils::normalize_email;
use guestgate_core::{EventId, HostUserId};

/// Authenticated host-side user, as vouched for by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// User ID.
    pub id: HostUserId,
    /// Email, if the identity layer knows one.
    pub email: Option<String>,
}

/// Everything a request can prove about its sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    /// Logged-in host user.
    pub host_user: Option<AuthenticatedUser>,
    /// Valid, unexpired scanner session (for any event).
    pub scanner_session: Option<ScannerSession>,
}

/// How a scanner was authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerIdentity {
    /// Device session from the code-and-name flow.
    Session {
        /// Name the scanner gave.
        scanner_name: Option<String>,
    },
    /// Logged-in user holding a scanner role.
    StaffEmail {
        /// Normalized email.
        email: String,
    },
}

/// A caller's role at an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAccess {
    /// The event's creator.
    Owner {
        /// Event ID.
        event_id: EventId,
        /// Event name.
        event_name: String,
        /// The owner (the caller).
        owner_host_user_id: HostUserId,
    },
    /// Door staff.
    Scanner {
        /// Event ID.
        event_id: EventId,
        /// Event name.
        event_name: String,
        /// The event's owner.
        owner_host_user_id: HostUserId,
        /// How the scanner was authorized.
        identity: ScannerIdentity,
    },
}

impl EventAccess {
    /// Event ID.
    #[must_use]
    pub const fn event_id(&self) -> &EventId {
        match self {
            Self::Owner { event_id, .. } | Self::Scanner { event_id, .. } => event_id,
        }
    }

    /// Event name.
    #[must_use]
    pub fn event_name(&self) -> &str {
        match self {
            Self::Owner { event_name, .. } | Self::Scanner { event_name, .. } => event_name,
        }
    }

    /// The event owner's user ID.
    #[must_use]
    pub const fn owner_host_user_id(&self) -> &HostUserId {
        match self {
            Self::Owner {
                owner_host_user_id, ..
            }
            | Self::Scanner {
                owner_host_user_id, ..
            } => owner_host_user_id,
        }
    }

    /// Returns `true` for [`EventAccess::Owner`].
    #[must_use]
    pub const fn is_owner(&self) -> bool {
        matches!(self, Self::Owner { .. })
    }

    /// Who is acting, as recorded on check-ins and used in rate-limit keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use guestgate_access::resolver::{EventAccess, ScannerIdentity};
    ///
    /// let access = EventAccess::Scanner {
    ///     event_id: "evt1".into(),
    ///     event_name: "Launch".into(),
    ///     owner_host_user_id: "host1".into(),
    ///     identity: ScannerIdentity::StaffEmail { email: "door@example.com".into() },
    /// };
    /// assert_eq!(access.actor_label(), "staff:door@example.com");
    /// ```
    #[must_use]
    pub fn actor_label(&self) -> String {
        match self {
            Self::Owner {
                owner_host_user_id, ..
            } => format!("host:{owner_host_user_id}"),
            Self::Scanner {
                identity: ScannerIdentity::Session { scanner_name },
                ..
            } => format!("scanner:{}", scanner_name.as_deref().unwrap_or("unnamed")),
            Self::Scanner {
                identity: ScannerIdentity::StaffEmail { email },
                ..
            } => format!("staff:{email}"),
        }
    }
}

/// Decides whether a caller is an event's owner or scanner.
#[derive(Debug, Clone)]
pub struct EventAccessResolver<E> {
    events: E,
}

impl<E: EventDirectory> EventAccessResolver<E> {
    /// Create a resolver reading from `events`.
    pub const fn new(events: E) -> Self {
        Self { events }
    }

    /// Resolve the caller's role at `event_id`.
    ///
    /// Checked in order: owner by user ID, scanner by device session, then
    /// scanner by an active staff role for the caller's email. Unknown
    /// events resolve to `None`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory lookup fails.
    pub async fn resolve(&self, event_id: &EventId, caller: &Caller) -> Result<Option<EventAccess>> {
        let Some(event) = self.events.find_event(event_id).await? else {
            return Ok(None);
        };

        if let Some(user) = &caller.host_user {
            if user.id == event.host_user_id {
                return Ok(Some(EventAccess::Owner {
                    event_id: event.id,
                    event_name: event.name,
                    owner_host_user_id: event.host_user_id,
                }));
            }
        }

        if let Some(session) = &caller.scanner_session {
            if &session.event_id == event_id {
                return Ok(Some(EventAccess::Scanner {
                    event_id: event.id,
                    event_name: event.name,
                    owner_host_user_id: event.host_user_id,
                    identity: ScannerIdentity::Session {
                        scanner_name: session.scanner_name.clone(),
                    },
                }));
            }
        }

        let Some(email) = caller
            .host_user
            .as_ref()
            .and_then(|user| user.email.as_deref())
            .and_then(normalize_email)
        else {
            return Ok(None);
        };

        let role = self.events.find_active_scanner_role(event_id, &email).await?;
        Ok(role.filter(|role| role.is_active()).map(|_| EventAccess::Scanner {
            event_id: event.id,
            event_name: event.name,
            owner_host_user_id: event.host_user_id,
            identity: ScannerIdentity::StaffEmail { email },
        }))
    }

    /// Like [`resolve`](Self::resolve), but a missing role is an error.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthorized`] if the caller has no role, or
    /// the directory error if the lookup fails.
    pub async fn require(&self, event_id: &EventId, caller: &Caller) -> Result<EventAccess> {
        self.resolve(event_id, caller).await?.ok_or_else(|| {
            tracing::warn!(event_id = %event_id, "Event access denied");
            AccessError::Unauthorized
        })
    }
}
