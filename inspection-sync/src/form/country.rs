//! Province/state of residence option codes
//!
//! Options are encoded as `CC_PP`: an ISO country code and a province or
//! state code joined by an underscore, e.g. `CA_BC` or `US_WA`.

use nom::{
    bytes::complete::take_while_m_n,
    character::complete::char,
    combinator::all_consuming,
    sequence::separated_pair,
    IResult, Parser,
};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::models::DropdownOption;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryProvince {
    pub country: String,
    pub province: String,
}

impl CountryProvince {
    pub fn parse(code: &str) -> SyncResult<Self> {
        match option_code(code.trim()) {
            Ok((_, (country, province))) => Ok(Self {
                country: country.to_string(),
                province: province.to_string(),
            }),
            Err(e) => Err(SyncError::InvalidField(format!(
                "countryProvince: '{}' is not a CC_PP code ({})",
                code, e
            ))),
        }
    }

    pub fn code(&self) -> String {
        format!("{}_{}", self.country, self.province)
    }
}

fn region_code(input: &str) -> IResult<&str, &str> {
    take_while_m_n(2, 3, |c: char| c.is_ascii_uppercase()).parse(input)
}

fn option_code(input: &str) -> IResult<&str, (&str, &str)> {
    all_consuming(separated_pair(region_code, char('_'), region_code)).parse(input)
}

const CANADA: [(&str, &str); 13] = [
    ("AB", "Alberta"),
    ("BC", "British Columbia"),
    ("MB", "Manitoba"),
    ("NB", "New Brunswick"),
    ("NL", "Newfoundland and Labrador"),
    ("NS", "Nova Scotia"),
    ("NT", "Northwest Territories"),
    ("NU", "Nunavut"),
    ("ON", "Ontario"),
    ("PE", "Prince Edward Island"),
    ("QC", "Quebec"),
    ("SK", "Saskatchewan"),
    ("YT", "Yukon"),
];

const UNITED_STATES: [(&str, &str); 51] = [
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

/// Dropdown options for the residence field, Canada first.
pub fn country_province_options() -> Vec<DropdownOption> {
    let canada = CANADA
        .iter()
        .map(|(code, name)| DropdownOption {
            key: format!("CA_{}", code),
            display: format!("{}, Canada", name),
        });
    let us = UNITED_STATES
        .iter()
        .map(|(code, name)| DropdownOption {
            key: format!("US_{}", code),
            display: format!("{}, USA", name),
        });
    canada.chain(us).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option_code() {
        let parsed = CountryProvince::parse("CA_BC").unwrap();
        assert_eq!(parsed.country, "CA");
        assert_eq!(parsed.province, "BC");
        assert_eq!(parsed.code(), "CA_BC");

        let parsed = CountryProvince::parse(" US_WA ").unwrap();
        assert_eq!(parsed.province, "WA");
    }

    #[test]
    fn test_rejects_malformed_codes() {
        for code in ["", "CABC", "CA_", "_BC", "ca_bc", "CA_BC_X", "CA-BC", "CANADA_BC"] {
            assert!(
                matches!(CountryProvince::parse(code), Err(SyncError::InvalidField(_))),
                "accepted {:?}",
                code
            );
        }
    }

    #[test]
    fn test_every_option_parses() {
        let options = country_province_options();
        assert_eq!(options.len(), CANADA.len() + UNITED_STATES.len());
        for option in &options {
            assert!(CountryProvince::parse(&option.key).is_ok(), "{}", option.key);
        }
        assert_eq!(options[1].display, "British Columbia, Canada");
    }
}
