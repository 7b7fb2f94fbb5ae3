//! Resume dossier model: companies, positions held there, and work items.
//!
//! Resume data is authored as TOML (see `content/resume.toml`) and validated
//! into these types. Dates are calendar dates; a missing end date means the
//! position or work item is ongoing.

use std::cmp::Reverse;

use serde::Deserialize;
use time::{Date, Month};

use dossier_manifest_types::parse_publish_date;

use super::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    /// Inline markdown (bold, links, code).
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub id: String,
    pub title: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub work_items: Vec<WorkItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyExperience {
    pub id: String,
    pub company: String,
    pub logo_url: Option<String>,
    pub positions: Vec<Position>,
}

impl CompanyExperience {
    /// Most recent end date across positions, counting ongoing ones as `today`.
    pub fn latest_activity(&self, today: Date) -> Option<Date> {
        self.positions
            .iter()
            .map(|position| position.end_date.unwrap_or(today))
            .max()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resume {
    pub owner: String,
    pub tagline: String,
    pub experiences: Vec<CompanyExperience>,
}

impl Resume {
    /// Parse and validate a TOML resume document.
    pub fn from_toml_str(source: &str) -> Result<Self, DomainError> {
        let raw: RawResume = toml::from_str(source)
            .map_err(|err| DomainError::validation(format!("resume is not valid TOML: {err}")))?;
        raw.validate()
    }

    /// Companies ordered by most recent activity, newest first.
    pub fn experiences_by_recency(&self, today: Date) -> Vec<&CompanyExperience> {
        let mut ordered: Vec<&CompanyExperience> = self.experiences.iter().collect();
        ordered.sort_by_key(|experience| Reverse(experience.latest_activity(today)));
        ordered
    }
}

/// Format a date range as `JUN 2024 - PRESENT`.
pub fn format_date_range(start: Date, end: Option<Date>) -> String {
    let end = match end {
        Some(date) => format_month_year(date),
        None => "PRESENT".to_string(),
    };
    format!("{} - {end}", format_month_year(start))
}

fn format_month_year(date: Date) -> String {
    format!("{} {}", month_abbreviation(date.month()), date.year())
}

fn month_abbreviation(month: Month) -> &'static str {
    match month {
        Month::January => "JAN",
        Month::February => "FEB",
        Month::March => "MAR",
        Month::April => "APR",
        Month::May => "MAY",
        Month::June => "JUN",
        Month::July => "JUL",
        Month::August => "AUG",
        Month::September => "SEP",
        Month::October => "OCT",
        Month::November => "NOV",
        Month::December => "DEC",
    }
}

#[derive(Debug, Deserialize)]
struct RawResume {
    owner: String,
    #[serde(default)]
    tagline: String,
    #[serde(default, rename = "company")]
    companies: Vec<RawCompany>,
}

#[derive(Debug, Deserialize)]
struct RawCompany {
    id: String,
    name: String,
    #[serde(default)]
    logo_url: Option<String>,
    #[serde(default, rename = "position")]
    positions: Vec<RawPosition>,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    id: String,
    title: String,
    start: String,
    #[serde(default)]
    end: Option<String>,
    #[serde(default, rename = "item")]
    items: Vec<RawWorkItem>,
}

#[derive(Debug, Deserialize)]
struct RawWorkItem {
    id: String,
    start: String,
    #[serde(default)]
    end: Option<String>,
    description: String,
}

impl RawResume {
    fn validate(self) -> Result<Resume, DomainError> {
        if self.owner.trim().is_empty() {
            return Err(DomainError::validation("resume owner must not be empty"));
        }

        let experiences = self
            .companies
            .into_iter()
            .map(RawCompany::validate)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Resume {
            owner: self.owner.trim().to_string(),
            tagline: self.tagline.trim().to_string(),
            experiences,
        })
    }
}

impl RawCompany {
    fn validate(self) -> Result<CompanyExperience, DomainError> {
        let positions = self
            .positions
            .into_iter()
            .map(|position| position.validate(&self.id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompanyExperience {
            id: self.id,
            company: self.name,
            logo_url: self.logo_url.filter(|url| !url.trim().is_empty()),
            positions,
        })
    }
}

impl RawPosition {
    fn validate(self, company: &str) -> Result<Position, DomainError> {
        let context = format!("{company}/{}", self.id);
        let (start_date, end_date) = parse_span(&context, &self.start, self.end.as_deref())?;

        let work_items = self
            .items
            .into_iter()
            .map(|item| item.validate(&context))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Position {
            id: self.id,
            title: self.title,
            start_date,
            end_date,
            work_items,
        })
    }
}

impl RawWorkItem {
    fn validate(self, parent: &str) -> Result<WorkItem, DomainError> {
        let context = format!("{parent}/{}", self.id);
        let (start_date, end_date) = parse_span(&context, &self.start, self.end.as_deref())?;

        Ok(WorkItem {
            id: self.id,
            start_date,
            end_date,
            description: self.description.trim().to_string(),
        })
    }
}

fn parse_span(
    context: &str,
    start: &str,
    end: Option<&str>,
) -> Result<(Date, Option<Date>), DomainError> {
    let start_date = parse_publish_date(start).ok_or_else(|| {
        DomainError::validation(format!("`{context}` has invalid start date `{start}`"))
    })?;

    let end_date = match end {
        Some(raw) => Some(parse_publish_date(raw).ok_or_else(|| {
            DomainError::validation(format!("`{context}` has invalid end date `{raw}`"))
        })?),
        None => None,
    };

    if end_date.is_some_and(|end_date| end_date < start_date) {
        return Err(DomainError::validation(format!(
            "`{context}` ends before it starts"
        )));
    }

    Ok((start_date, end_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const RESUME: &str = r#"
owner = "Field Agent"
tagline = "See my work below."

[[company]]
id = "old-co"
name = "Old Co"

[[company.position]]
id = "junior"
title = "Junior Developer"
start = "2018-09-01"
end = "2020-02-28"

[[company.position.item]]
id = "sites"
start = "2018-09-01"
end = "2019-12-31"
description = "Built **15+ sites**."

[[company]]
id = "now-co"
name = "Now Co"
logo_url = "https://example.com/logo.png"

[[company.position]]
id = "senior"
title = "Senior Engineer"
start = "2022-06-01"
"#;

    #[test]
    fn parses_nested_tables() {
        let resume = Resume::from_toml_str(RESUME).expect("valid resume");
        assert_eq!(resume.owner, "Field Agent");
        assert_eq!(resume.experiences.len(), 2);

        let old = &resume.experiences[0];
        assert_eq!(old.positions[0].work_items[0].description, "Built **15+ sites**.");
        assert_eq!(old.positions[0].end_date, Some(date!(2020 - 02 - 28)));
        assert_eq!(old.logo_url, None);
    }

    #[test]
    fn orders_companies_by_latest_activity() {
        let resume = Resume::from_toml_str(RESUME).expect("valid resume");
        let ordered = resume.experiences_by_recency(date!(2025 - 01 - 01));
        let ids: Vec<&str> = ordered.iter().map(|exp| exp.id.as_str()).collect();
        assert_eq!(ids, vec!["now-co", "old-co"]);
    }

    #[test]
    fn formats_ranges() {
        assert_eq!(
            format_date_range(date!(2024 - 06 - 03), None),
            "JUN 2024 - PRESENT"
        );
        assert_eq!(
            format_date_range(date!(2020 - 03 - 01), Some(date!(2022 - 05 - 31))),
            "MAR 2020 - MAY 2022"
        );
    }

    #[test]
    fn rejects_inverted_ranges() {
        let source = r#"
owner = "A"
[[company]]
id = "c"
name = "C"
[[company.position]]
id = "p"
title = "T"
start = "2022-01-01"
end = "2021-01-01"
"#;
        let err = Resume::from_toml_str(source).expect_err("inverted range");
        assert!(err.to_string().contains("ends before it starts"));
    }

    #[test]
    fn rejects_malformed_dates() {
        let source = r#"
owner = "A"
[[company]]
id = "c"
name = "C"
[[company.position]]
id = "p"
title = "T"
start = "June 2022"
"#;
        let err = Resume::from_toml_str(source).expect_err("bad date");
        assert!(err.to_string().contains("invalid start date"));
    }

    #[test]
    fn bundled_resume_is_valid() {
        let resume = Resume::from_toml_str(include_str!("../../content/resume.toml"))
            .expect("bundled resume parses");
        assert!(!resume.experiences.is_empty());
    }
}
