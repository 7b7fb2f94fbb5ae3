//! Resume dossier shown on the landing page.

use std::{path::Path, sync::Arc};

use comrak::{Options, markdown_to_html};
use time::{Date, OffsetDateTime};
use tracing::info;

use crate::domain::{
    error::DomainError,
    resume::{CompanyExperience, Position, Resume, WorkItem, format_date_range},
};

const SOURCE: &str = "dossier::application::resume";

const BUNDLED_RESUME: &str = include_str!("../../content/resume.toml");

pub struct ResumeView {
    pub owner: String,
    pub tagline: String,
    pub files: Vec<PersonnelFileView>,
}

pub struct PersonnelFileView {
    pub file_no: String,
    pub company: String,
    pub company_upper: String,
    pub logo_url: Option<String>,
    pub assignments: Vec<AssignmentView>,
}

pub struct AssignmentView {
    pub title: String,
    pub duration: String,
    pub briefings: Vec<BriefingView>,
}

pub struct BriefingView {
    pub duration: String,
    /// Inline HTML rendered from the item's markdown. Raw HTML is omitted.
    pub description_html: String,
}

#[derive(Clone)]
pub struct ResumeService {
    resume: Arc<Resume>,
}

impl ResumeService {
    pub fn new(resume: Resume) -> Self {
        Self {
            resume: Arc::new(resume),
        }
    }

    /// The resume compiled into the binary.
    pub fn bundled() -> Result<Self, DomainError> {
        Resume::from_toml_str(BUNDLED_RESUME).map(Self::new)
    }

    /// Load a resume from `path`, or fall back to the bundled one.
    pub fn load(path: Option<&Path>) -> Result<Self, DomainError> {
        let Some(path) = path else {
            return Self::bundled();
        };

        let source = std::fs::read_to_string(path).map_err(|err| {
            DomainError::validation(format!("resume `{}` unreadable: {err}", path.display()))
        })?;
        let resume = Resume::from_toml_str(&source)?;
        info!(
            target: SOURCE,
            path = %path.display(),
            companies = resume.experiences.len(),
            "Resume loaded"
        );
        Ok(Self::new(resume))
    }

    pub fn resume(&self) -> &Resume {
        &self.resume
    }

    pub fn view(&self) -> ResumeView {
        self.view_at(OffsetDateTime::now_utc().date())
    }

    /// Build the dossier view, treating ongoing positions as ending `today`.
    pub fn view_at(&self, today: Date) -> ResumeView {
        let files = self
            .resume
            .experiences_by_recency(today)
            .into_iter()
            .map(personnel_file)
            .collect();

        ResumeView {
            owner: self.resume.owner.clone(),
            tagline: self.resume.tagline.clone(),
            files,
        }
    }
}

fn personnel_file(experience: &CompanyExperience) -> PersonnelFileView {
    PersonnelFileView {
        file_no: experience.id.clone(),
        company: experience.company.clone(),
        company_upper: experience.company.to_uppercase(),
        logo_url: experience.logo_url.clone(),
        assignments: experience.positions.iter().map(assignment).collect(),
    }
}

fn assignment(position: &Position) -> AssignmentView {
    AssignmentView {
        title: position.title.clone(),
        duration: format_date_range(position.start_date, position.end_date),
        briefings: position.work_items.iter().map(briefing).collect(),
    }
}

fn briefing(item: &WorkItem) -> BriefingView {
    BriefingView {
        duration: format_date_range(item.start_date, item.end_date),
        description_html: render_inline(&item.description),
    }
}

fn render_inline(markdown: &str) -> String {
    let html = markdown_to_html(markdown, &Options::default());
    let trimmed = html.trim();
    trimmed
        .strip_prefix("<p>")
        .and_then(|inner| inner.strip_suffix("</p>"))
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use time::macros::date;

    use super::*;

    #[test]
    fn bundled_view_orders_files_and_formats_ranges() {
        let service = ResumeService::bundled().expect("bundled resume");
        let view = service.view_at(date!(2025 - 01 - 01));

        assert_eq!(view.owner, "CagesThrottleUs");
        assert!(!view.files.is_empty());
        let first = &view.files[0];
        assert_eq!(first.company_upper, first.company.to_uppercase());
        assert!(first.assignments[0].duration.ends_with("PRESENT"));
    }

    #[test]
    fn inline_markdown_keeps_emphasis_and_drops_raw_html() {
        assert_eq!(
            render_inline("Built **15+ sites** with `rust`."),
            "Built <strong>15+ sites</strong> with <code>rust</code>."
        );
        assert!(!render_inline("<script>alert(1)</script> done").contains("<script>"));
    }

    #[test]
    fn load_reads_configured_path() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "owner = \"Agent\"\n[[company]]\nid = \"x\"\nname = \"X Corp\"\n"
        )
        .expect("write resume");

        let service = ResumeService::load(Some(file.path())).expect("resume loads");
        assert_eq!(service.resume().owner, "Agent");
        assert_eq!(service.view().files[0].file_no, "x");
    }

    #[test]
    fn load_reports_missing_files() {
        let err = ResumeService::load(Some(Path::new("/nonexistent/resume.toml")))
            .err()
            .expect("missing file");
        assert!(err.to_string().contains("unreadable"));
    }
}
