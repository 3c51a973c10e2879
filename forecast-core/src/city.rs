use std::fmt;

/// Misspelling found in the historical export, mapped to its real name.
const KNOWN_TYPOS: &[(&str, &str)] = &[("Colonge", "Cologne")];

/// The fixed set of cities the model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum City {
    Berlin,
    Cologne,
    Frankfurt,
    Hamburg,
    Munich,
}

impl City {
    pub fn as_str(&self) -> &'static str {
        match self {
            City::Berlin => "Berlin",
            City::Cologne => "Cologne",
            City::Frankfurt => "Frankfurt",
            City::Hamburg => "Hamburg",
            City::Munich => "Munich",
        }
    }

    pub const fn all() -> &'static [City] {
        &[City::Berlin, City::Cologne, City::Frankfurt, City::Hamburg, City::Munich]
    }

    /// Name of the one-hot indicator column for this city, e.g. `name_Berlin`.
    pub fn indicator_column(&self) -> String {
        format!("name_{}", self.as_str())
    }

    /// Look up a known city by (canonicalized) name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<City> {
        let name = canonical_name(name);
        City::all().iter().copied().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for City {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        City::from_name(value).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown city '{value}'. \
                 Supported cities: Berlin, Cologne, Frankfurt, Hamburg, Munich."
            )
        })
    }
}

/// Trim and repair a raw city name from the data export.
pub fn canonical_name(raw: &str) -> String {
    let trimmed = raw.trim();
    KNOWN_TYPOS
        .iter()
        .find(|(typo, _)| *typo == trimmed)
        .map(|(_, fixed)| (*fixed).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
