use crate::application::error::{ErrorReport, HttpError};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    render_error_page(
        chrome,
        ErrorPageView::not_found(),
        ErrorReport::from_message(
            "presentation::views::render_not_found_response",
            StatusCode::NOT_FOUND,
            "Resource not found",
        ),
    )
}

/// Render the error template with the status carried by `report`.
pub fn render_error_page(chrome: LayoutChrome, content: ErrorPageView, report: ErrorReport) -> Response {
    let chrome = chrome.with_title(content.title.clone());
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, report.status);
    report.attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationView {
    pub entries: Vec<NavigationLinkView>,
}

#[derive(Clone)]
pub struct FooterView {
    pub marking: String,
    pub prepared_by: String,
    pub authority: String,
    pub year: i32,
    pub warning: String,
}

impl FooterView {
    pub fn document_number(&self) -> String {
        format!("DOC-{}-PORTFOLIO-CLASSIFIED", self.year)
    }
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
    pub version: String,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn with_canonical(self, canonical: String) -> Self {
        Self {
            meta: self.meta.with_canonical(canonical),
            ..self
        }
    }

    /// Prefix the document title, keeping the site name as suffix.
    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            meta: self.meta.with_title(title.into()),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            footer: chrome.footer,
            meta: chrome.meta,
            content,
        }
    }
}

pub struct HomeView {
    pub intro_name: String,
    pub tagline: String,
    pub dossier: crate::application::resume::ResumeView,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub view: LayoutContext<HomeView>,
}

#[derive(Clone)]
pub struct BlogCardView {
    pub href: String,
    pub title: String,
    pub summary: String,
    pub classification: String,
    pub classification_class: String,
    pub publish_date: String,
    pub version: String,
    pub thumbnail_url: String,
}

pub struct FilterFormView {
    pub query: String,
    pub start: String,
    pub end: String,
}

pub struct PaginationView {
    pub current: usize,
    pub total: usize,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
}

pub struct BlogListView {
    pub archive_number: String,
    pub total_posts: usize,
    pub filter: FilterFormView,
    /// `SHOWING x OF y RESULTS`, present while a filter is active.
    pub results_banner: Option<String>,
    pub cards: Vec<BlogCardView>,
    pub pagination: Option<PaginationView>,
}

#[derive(Template)]
#[template(path = "blog_list.html")]
pub struct BlogListTemplate {
    pub view: LayoutContext<BlogListView>,
}

pub struct PostDetailView {
    pub document_number: String,
    pub title: String,
    pub classification: String,
    pub classification_class: String,
    pub publish_date: String,
    pub version: String,
    pub summary: String,
    pub body_html: String,
    pub contains_code: bool,
    pub contains_mermaid: bool,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub detail: Option<String>,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Error: 404".to_string(),
            message: "Page not found.".to_string(),
            detail: None,
            primary_action: Some(ErrorAction::home()),
        }
    }

    /// An archive-level failure such as an unreachable index.
    pub fn archive_unavailable(message: impl Into<String>) -> Self {
        Self {
            title: "Archive Unavailable".to_string(),
            message: message.into(),
            detail: None,
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub prompt: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            prompt: "Return to".to_string(),
            label: "home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub site_name: String,
    pub title: String,
    pub description: String,
    pub canonical: String,
}

impl PageMetaView {
    pub fn with_canonical(self, canonical: String) -> Self {
        Self { canonical, ..self }
    }

    pub fn with_title(self, page_title: String) -> Self {
        let title = format!("{page_title} | {}", self.site_name);
        Self { title, ..self }
    }
}

/// CSS modifier for a classification label: `TOP SECRET` becomes `top-secret`.
pub fn classification_class(label: &str) -> String {
    let mut class = String::with_capacity(label.len());
    for word in label.split(|ch: char| !ch.is_ascii_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        if !class.is_empty() {
            class.push('-');
        }
        class.push_str(&word.to_ascii_lowercase());
    }
    if class.is_empty() {
        "unclassified".to_string()
    } else {
        class
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome() -> LayoutChrome {
        LayoutChrome {
            brand: BrandView {
                title: "cagesthrottleus".to_string(),
                href: "/".to_string(),
                version: "0.3.0".to_string(),
            },
            navigation: NavigationView {
                entries: vec![NavigationLinkView {
                    label: "Blog".to_string(),
                    href: "/blog".to_string(),
                }],
            },
            footer: FooterView {
                marking: "TOP SECRET // NOFORN".to_string(),
                prepared_by: "CAGESTHROTTLEUS".to_string(),
                authority: "EXECUTIVE ORDER 12958".to_string(),
                year: 2025,
                warning: "UNAUTHORIZED DISCLOSURE SUBJECT TO CRIMINAL SANCTIONS".to_string(),
            },
            meta: PageMetaView {
                site_name: "cagesthrottleus".to_string(),
                title: "cagesthrottleus".to_string(),
                description: String::new(),
                canonical: "/".to_string(),
            },
        }
    }

    #[test]
    fn classification_classes_are_kebab_case() {
        assert_eq!(classification_class("TOP SECRET"), "top-secret");
        assert_eq!(classification_class("SECRET//NOFORN"), "secret-noforn");
        assert_eq!(classification_class("  "), "unclassified");
    }

    #[test]
    fn titles_keep_site_suffix() {
        let chrome = chrome().with_title("Archive");
        assert_eq!(chrome.meta.title, "Archive | cagesthrottleus");
    }

    #[test]
    fn footer_document_number_uses_year() {
        assert_eq!(
            chrome().footer.document_number(),
            "DOC-2025-PORTFOLIO-CLASSIFIED"
        );
    }

    #[test]
    fn not_found_page_renders_with_status_and_report() {
        let response = render_not_found_response(chrome());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }

    #[test]
    fn error_template_contains_return_link() {
        let view = LayoutContext::new(chrome(), ErrorPageView::not_found());
        let html = ErrorTemplate { view }.render().expect("render error page");
        assert!(html.contains("Error: 404"));
        assert!(html.contains("Page not found."));
        assert!(html.contains(r#"href="/""#));
        assert!(html.contains("DOC-2025-PORTFOLIO-CLASSIFIED"));
    }
}
