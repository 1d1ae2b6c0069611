use std::fmt;

/// Which credential store to open.
///
/// On Windows `User` is the CurrentUser store and `System` the LocalMachine
/// store. On macOS both open the keychain search list.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum StoreLocation {
    /// The current user's store.
    User,
    /// The system-wide store.
    #[default]
    System,
}

impl StoreLocation {
    /// Parses a configured location, ignoring case.
    ///
    /// `"user"` selects [`StoreLocation::User`]; `"system"` and `"machine"`
    /// select [`StoreLocation::System`]. Any other value, including the empty
    /// string, also selects [`StoreLocation::System`].
    pub fn parse(location: &str) -> Self {
        match location.to_ascii_lowercase().as_str() {
            "user" => StoreLocation::User,
            _ => StoreLocation::System,
        }
    }

    /// Returns the configuration name of the location.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreLocation::User => "user",
            StoreLocation::System => "system",
        }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
