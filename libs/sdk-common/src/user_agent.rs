//! User-Agent accumulation.

/// Default User-Agent appended after every prepended string.
pub const DEFAULT_USER_AGENT: &str = "golangsdk/2.0.0";

/// User-Agent header builder.
///
/// Strings prepended later appear earlier in the joined header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgent {
    prepend: Vec<String>,
}

impl UserAgent {
    /// Create a User-Agent with nothing prepended.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend one or more strings, keeping their relative order.
    pub fn prepend<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut front: Vec<String> = values.into_iter().map(Into::into).collect();
        front.append(&mut self.prepend);
        self.prepend = front;
    }

    /// The header value: prepended strings followed by [`DEFAULT_USER_AGENT`].
    #[must_use]
    pub fn join(&self) -> String {
        self.prepend
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(DEFAULT_USER_AGENT))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
