//! Target sites and their cascade shapes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::dropdown::control::ControlKind;
use crate::error::AppError;

/// A scraping target. The site decides how deep the cascade goes and which
/// widget dialect drives it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Site {
    /// Diário Oficial da União: organization → sub-organization.
    Dou,
    /// e-agendas: organization → role → person.
    Eagendas,
}

impl Site {
    /// Number of cascade levels.
    pub fn levels(&self) -> usize {
        match self {
            Site::Dou => 2,
            Site::Eagendas => 3,
        }
    }

    /// Widget dialect spoken by the site's dropdowns.
    pub fn dialect(&self) -> ControlKind {
        match self {
            Site::Dou => ControlKind::NativeSelect,
            Site::Eagendas => ControlKind::TokenWidget,
        }
    }

    /// Pseudo-options excluded when reading the last cascade level.
    /// e-agendas offers an "all occupants of this role" entry that is not a
    /// real selectable person.
    pub fn leaf_excludes(&self) -> Vec<regex::Regex> {
        match self {
            Site::Dou => Vec::new(),
            Site::Eagendas => vec![
                regex::Regex::new(r"ocupantes do cargo").expect("static pattern"),
            ],
        }
    }

    /// Edition URL for a given date and section.
    pub fn edition_url(&self, config: &Config, date: &str, secao: &str) -> String {
        match self {
            Site::Dou => config
                .dou_url
                .replace("{date}", date)
                .replace("{secao}", secao),
            Site::Eagendas => config.eagendas_url.clone(),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Dou => write!(f, "dou"),
            Site::Eagendas => write!(f, "e-agendas"),
        }
    }
}

impl FromStr for Site {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dou" => Ok(Site::Dou),
            "e-agendas" | "eagendas" => Ok(Site::Eagendas),
            other => Err(AppError::Other(format!("unknown site: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dou_url_substitution() {
        let config = Config::default();
        let url = Site::Dou.edition_url(&config, "01-01-2025", "DO1");
        assert!(url.contains("data=01-01-2025"));
        assert!(url.contains("secao=DO1"));
    }

    #[test]
    fn parses_both_spellings() {
        assert_eq!(Site::from_str("eagendas").unwrap(), Site::Eagendas);
        assert_eq!(Site::from_str("DOU").unwrap(), Site::Dou);
    }
}
