//! Inbound study-link parameters.

use study_core::{ErrorInfo, StudyError};
use url::{form_urlencoded, Url};

/// Query parameters the survey platform appends to the study link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundParams {
    /// `pid`.
    pub participant_id: Option<String>,
    /// `cond`.
    pub condition: Option<String>,
    /// Every pair, in query order.
    pub all: Vec<(String, String)>,
}

impl InboundParams {
    /// Parses a raw query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let all: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        let first = |name: &str| {
            all.iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };
        Self {
            participant_id: first("pid"),
            condition: first("cond"),
            all: all.clone(),
        }
    }

    /// Parses the query of a full study link.
    pub fn from_url(link: &str) -> Result<Self, StudyError> {
        let url = Url::parse(link).map_err(|err| {
            StudyError::Session(
                ErrorInfo::new("session-inbound-url", "study link does not parse")
                    .with_context("url", link)
                    .with_hint(err.to_string()),
            )
        })?;
        Ok(Self::from_query(url.query().unwrap_or("")))
    }

    /// First value of an arbitrary parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.all
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Deferred access to the inbound parameters.
///
/// The session reads its source at most once, and never when the participant
/// has already completed the study.
pub trait ParamSource {
    /// Reads the parameters.
    fn read(&self) -> InboundParams;
}

impl ParamSource for InboundParams {
    fn read(&self) -> InboundParams {
        self.clone()
    }
}

impl<F> ParamSource for F
where
    F: Fn() -> InboundParams,
{
    fn read(&self) -> InboundParams {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_pid_and_cond() {
        let params = InboundParams::from_query("?pid=P042&cond=0%2C3&extra=a+b");
        assert_eq!(params.participant_id.as_deref(), Some("P042"));
        assert_eq!(params.condition.as_deref(), Some("0,3"));
        assert_eq!(params.get("extra"), Some("a b"));
    }

    #[test]
    fn missing_params_are_none() {
        let params = InboundParams::from_url("https://study.example.org/").unwrap();
        assert_eq!(params, InboundParams::default());
    }
}
