use time::OffsetDateTime;

use crate::presentation::views::{
    BrandView, FooterView, LayoutChrome, NavigationLinkView, NavigationView, PageMetaView,
};

const BRAND_TITLE: &str = "cagesthrottleus";
const SITE_DESCRIPTION: &str = "Classified personnel dossier and intelligence briefings.";

const NAVIGATION: [(&str, &str); 3] = [
    ("Resume", "/resume"),
    ("Projects", "/projects"),
    ("Blog", "/blog"),
];

/// Site header and footer shared by every page.
#[derive(Clone)]
pub struct ChromeService {
    version: String,
}

impl ChromeService {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn load(&self) -> LayoutChrome {
        self.load_for_year(OffsetDateTime::now_utc().year())
    }

    pub fn load_for_year(&self, year: i32) -> LayoutChrome {
        let entries = NAVIGATION
            .iter()
            .map(|(label, href)| NavigationLinkView {
                label: (*label).to_string(),
                href: (*href).to_string(),
            })
            .collect();

        LayoutChrome {
            brand: BrandView {
                title: BRAND_TITLE.to_string(),
                href: "/".to_string(),
                version: self.version.clone(),
            },
            navigation: NavigationView { entries },
            footer: FooterView {
                marking: "TOP SECRET // NOFORN".to_string(),
                prepared_by: BRAND_TITLE.to_uppercase(),
                authority: "EXECUTIVE ORDER 12958".to_string(),
                year,
                warning: "UNAUTHORIZED DISCLOSURE SUBJECT TO CRIMINAL SANCTIONS".to_string(),
            },
            meta: PageMetaView {
                site_name: BRAND_TITLE.to_string(),
                title: BRAND_TITLE.to_string(),
                description: SITE_DESCRIPTION.to_string(),
                canonical: "/".to_string(),
            },
        }
    }
}

impl Default for ChromeService {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_lists_site_sections_in_order() {
        let chrome = ChromeService::new("1.2.3").load_for_year(2025);
        let labels: Vec<&str> = chrome
            .navigation
            .entries
            .iter()
            .map(|entry| entry.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Resume", "Projects", "Blog"]);
        assert_eq!(chrome.brand.version, "1.2.3");
        assert_eq!(chrome.footer.prepared_by, "CAGESTHROTTLEUS");
    }

    #[test]
    fn default_uses_package_version() {
        let chrome = ChromeService::default().load();
        assert_eq!(chrome.brand.version, env!("CARGO_PKG_VERSION"));
    }
}
