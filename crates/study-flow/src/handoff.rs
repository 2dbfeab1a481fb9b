//! Outbound redirect to the survey platform.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use log::info;
use study_core::{ErrorInfo, StudyError};
use url::Url;

/// Performs the final full-page navigation.
pub trait Navigator: Debug {
    /// Leaves the study for `url`.
    fn navigate(&mut self, url: &Url) -> Result<(), StudyError>;
}

/// Navigator that only records where it was sent. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    visits: Rc<RefCell<Vec<Url>>>,
}

impl RecordingNavigator {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every URL navigated to, oldest first.
    pub fn visits(&self) -> Vec<Url> {
        self.visits.borrow().clone()
    }

    /// Most recent navigation.
    pub fn last(&self) -> Option<Url> {
        self.visits.borrow().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, url: &Url) -> Result<(), StudyError> {
        self.visits.borrow_mut().push(url.clone());
        Ok(())
    }
}

/// Sets `params` on the query of `base`, in order.
///
/// Each key behaves like `URLSearchParams.set`: the first existing pair with
/// that key takes the new value in place, later duplicates are dropped, and a
/// missing key is appended. Pairs with other keys are left where they are.
pub fn build_redirect_url(base: &str, params: &[(&str, &str)]) -> Result<Url, StudyError> {
    let mut url = Url::parse(base).map_err(|err| {
        StudyError::Handoff(
            ErrorInfo::new("handoff-base-url", "return URL does not parse")
                .with_context("url", base)
                .with_hint(err.to_string()),
        )
    })?;
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    for (key, value) in params {
        set_pair(&mut pairs, key, value);
    }
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())));
    Ok(url)
}

fn set_pair(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    match pairs.iter().position(|(existing, _)| existing == key) {
        Some(first) => {
            pairs[first].1 = value.to_string();
            let mut position = 0;
            pairs.retain(|(existing, _)| {
                let keep = existing != key || position == first;
                position += 1;
                keep
            });
        }
        None => pairs.push((key.to_string(), value.to_string())),
    }
}

/// Everything needed to build the outbound URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffRequest {
    /// Configured return address; may carry its own query.
    pub base_url: String,
    /// Sent as `pid`, empty when absent.
    pub participant_id: Option<String>,
    /// Encoded payload, sent as `data`.
    pub data: String,
    /// Flat auxiliary parameters, set after `pid` and `data`.
    pub extra: Vec<(String, String)>,
}

impl HandoffRequest {
    /// Request without auxiliary fields.
    pub fn new(base_url: impl Into<String>, participant_id: Option<String>, data: String) -> Self {
        Self {
            base_url: base_url.into(),
            participant_id,
            data,
            extra: Vec::new(),
        }
    }

    /// Adds a flat auxiliary parameter; empty values are not sent.
    pub fn with_field(mut self, key: impl Into<String>, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            self.extra.push((key.into(), value.to_string()));
        }
        self
    }

    /// `pid` and `data` first, then the auxiliary fields.
    pub fn params(&self) -> Vec<(&str, &str)> {
        let mut params = vec![
            ("pid", self.participant_id.as_deref().unwrap_or("")),
            ("data", self.data.as_str()),
        ];
        params.extend(
            self.extra
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        params
    }

    /// Final outbound URL.
    pub fn to_url(&self) -> Result<Url, StudyError> {
        build_redirect_url(&self.base_url, &self.params())
    }
}

/// Hands control to the survey platform, at most once.
#[derive(Debug)]
pub struct HandoffDispatcher {
    navigator: Box<dyn Navigator>,
    dispatched: Option<Url>,
}

impl HandoffDispatcher {
    /// Dispatcher that has not navigated yet.
    pub fn new(navigator: Box<dyn Navigator>) -> Self {
        Self {
            navigator,
            dispatched: None,
        }
    }

    /// Builds the URL and navigates to it. Later calls return the first URL
    /// without navigating again.
    pub fn dispatch(&mut self, request: &HandoffRequest) -> Result<Url, StudyError> {
        if let Some(url) = &self.dispatched {
            return Ok(url.clone());
        }
        let url = request.to_url()?;
        info!(
            "handing off participant {:?} to {}",
            request.participant_id,
            url.host_str().unwrap_or("<no host>")
        );
        self.navigator.navigate(&url)?;
        self.dispatched = Some(url.clone());
        Ok(url)
    }

    /// URL of the successful dispatch, if any.
    pub fn dispatched(&self) -> Option<&Url> {
        self.dispatched.as_ref()
    }
}
