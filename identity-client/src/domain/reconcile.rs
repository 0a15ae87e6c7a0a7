use shared::{AnonymousIdentityState, Result, SavedIdentity};

/// Outcome of asking the server for a topic's pseudonym.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLookup {
    Found(String),
    /// The server answered but holds no pseudonym.
    Empty,
    NotFound,
    Failed(String),
}

impl ServerLookup {
    pub fn from_result(result: Result<Option<String>>) -> Self {
        match result {
            Ok(Some(name)) if !name.trim().is_empty() => ServerLookup::Found(name),
            Ok(_) => ServerLookup::Empty,
            Err(e) if e.is_not_found() => ServerLookup::NotFound,
            Err(e) => ServerLookup::Failed(e.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ServerLookup::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Server,
    LastName,
    Hint,
    SavedFallback,
    LastNameFallback,
    HintFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub state: AnonymousIdentityState,
    pub source: ResolutionSource,
    /// Set when the server's name must be copied into the local cache.
    pub write_back: bool,
}

/// Decide what the dialog shows for a topic.
///
/// The server decides whether a pseudonym exists and what it is called. The
/// cache and the caller's hint only decide whether it is displayed, and
/// stand in for the server when it cannot be reached.
pub fn reconcile(
    lookup: &ServerLookup,
    saved: &SavedIdentity,
    last_name: Option<&str>,
    hint: &AnonymousIdentityState,
) -> Resolution {
    let last_name = last_name.map(str::trim).filter(|name| !name.is_empty());
    let wants_anonymous = saved.is_anonymous || hint.is_anonymous;

    match lookup {
        ServerLookup::Found(name) => Resolution {
            state: AnonymousIdentityState::new(wants_anonymous, Some(name.clone())),
            source: ResolutionSource::Server,
            write_back: true,
        },
        ServerLookup::Empty | ServerLookup::NotFound => match last_name {
            Some(name) => Resolution {
                state: AnonymousIdentityState::new(wants_anonymous, Some(name.to_string())),
                source: ResolutionSource::LastName,
                write_back: false,
            },
            None => Resolution {
                state: AnonymousIdentityState::new(wants_anonymous, hint.name.clone()),
                source: ResolutionSource::Hint,
                write_back: false,
            },
        },
        ServerLookup::Failed(_) => {
            if let Some(name) = saved.non_empty_name().filter(|_| saved.is_anonymous) {
                return Resolution {
                    state: AnonymousIdentityState::anonymous(name),
                    source: ResolutionSource::SavedFallback,
                    write_back: false,
                };
            }

            if let Some(name) = last_name {
                return Resolution {
                    state: AnonymousIdentityState::new(hint.is_anonymous, Some(name.to_string())),
                    source: ResolutionSource::LastNameFallback,
                    write_back: false,
                };
            }

            Resolution {
                state: AnonymousIdentityState::new(
                    hint.is_anonymous,
                    Some(hint.name.clone().unwrap_or_default()),
                ),
                source: ResolutionSource::HintFallback,
                write_back: false,
            }
        }
    }
}
