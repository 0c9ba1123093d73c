//! Text rendering of profile cards for terminal front ends.
//!
//! Templates are compiled into the binary; the display fallbacks (unknown
//! age, default title, missing bio) live here rather than in the core.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::snapshot::FeedSnapshot;
use crate::core::types::{Decision, Profile};

pub const DEFAULT_TITLE: &str = "Software Developer";
pub const MISSING_BIO: &str = "No bio available";
pub const PLACEHOLDER_PHOTO: &str = "https://via.placeholder.com/400x500?text=No+Photo";
/// Skills shown on the compact card; the details view lists all of them.
pub const CARD_SKILLS: usize = 3;

const CARD_TEMPLATE: &str = "\
+------------------------------------------+
 {{ name }}, {{ age }}
 {{ title }}
{% if skills %} [{{ skills | join('] [') }}]
{% endif %}{% if preview %} next up: {{ preview }}
{% endif %}+------------------------------------------+
 [h] pass   [i] details   [l] interested";

const DETAILS_TEMPLATE: &str = "\
== {{ name }} ({{ age }}) ==
{{ title }}
photo: {{ photo }}

About
  {{ about }}

Skills
{% for skill in skills %}  - {{ skill }}
{% else %}  (none listed)
{% endfor %}{% if github %}
GitHub Profile
  {{ github }}
{% endif %}";

/// Display-ready view of a profile with fallbacks applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub name: String,
    pub age: String,
    pub title: String,
    pub about: String,
    pub photo: String,
    pub skills: Vec<String>,
    pub github: Option<String>,
}

impl ProfileView {
    pub fn from_profile(profile: &Profile) -> Self {
        let about = profile.about.trim();
        Self {
            name: profile.display_name(),
            age: profile
                .age
                .map(|age| age.to_string())
                .unwrap_or_else(|| "?".to_string()),
            title: profile
                .title
                .clone()
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            about: if about.is_empty() {
                MISSING_BIO.to_string()
            } else {
                about.to_string()
            },
            photo: profile
                .photo_url
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_PHOTO.to_string()),
            skills: profile.skills.clone(),
            github: profile.github_url.clone(),
        }
    }
}

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("card", CARD_TEMPLATE)
        .context("parse card template")?;
    env.add_template("details", DETAILS_TEMPLATE)
        .context("parse details template")?;
    Ok(env)
}

/// Compact card for the head profile, with the next profile as a teaser.
pub fn render_card(profile: &Profile, preview: Option<&Profile>) -> Result<String> {
    let view = ProfileView::from_profile(profile);
    let skills: Vec<&String> = view.skills.iter().take(CARD_SKILLS).collect();
    let env = environment()?;
    let rendered = env.get_template("card")?.render(context! {
        name => view.name,
        age => view.age,
        title => view.title,
        skills => skills,
        preview => preview.map(Profile::display_name),
    })?;
    Ok(rendered)
}

/// Full profile view (bio, every skill, GitHub link).
pub fn render_details(profile: &Profile) -> Result<String> {
    let view = ProfileView::from_profile(profile);
    let env = environment()?;
    let rendered = env.get_template("details")?.render(&view)?;
    Ok(rendered)
}

/// One-line confirmation shown after a decision goes through.
pub fn decision_toast(decision: Decision, profile: &Profile) -> String {
    match decision {
        Decision::Interested => format!("Liked {}", profile.first_name),
        Decision::Ignored => format!("Passed {}", profile.first_name),
    }
}

/// Status line for states without a head card.
pub fn render_status(snapshot: &FeedSnapshot) -> String {
    if snapshot.is_exhausted() {
        return "No More Developers. [r] refresh".to_string();
    }
    if let Some(error) = &snapshot.error {
        if snapshot.queue.is_empty() {
            return format!("Could not load developers: {}. [t] retry  [r] refresh", error);
        }
        return format!("warning: {}", error);
    }
    if snapshot.loading && snapshot.queue.is_empty() {
        return "Loading developers...".to_string();
    }
    format!("{} developers queued", snapshot.queue.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::profile;

    #[test]
    fn view_applies_fallbacks() {
        let mut bare = profile("x");
        bare.age = None;
        bare.about = "  ".to_string();
        bare.title = Some(String::new());

        let view = ProfileView::from_profile(&bare);
        assert_eq!(view.age, "?");
        assert_eq!(view.title, DEFAULT_TITLE);
        assert_eq!(view.about, MISSING_BIO);
        assert_eq!(view.photo, PLACEHOLDER_PHOTO);
    }

    #[test]
    fn card_truncates_skills_and_mentions_preview() {
        let mut head = profile("a");
        head.skills = ["rust", "go", "sql", "k8s"].map(String::from).to_vec();
        head.title = Some("Backend Engineer".to_string());
        let next = profile("b");

        let card = render_card(&head, Some(&next)).expect("render");
        assert!(card.contains("a first a last, 30"));
        assert!(card.contains("Backend Engineer"));
        assert!(card.contains("[rust] [go] [sql]"));
        assert!(!card.contains("k8s"));
        assert!(card.contains("next up: b first b last"));
    }

    #[test]
    fn details_lists_every_skill_and_github() {
        let mut p = profile("a");
        p.skills = ["rust", "go", "sql", "k8s"].map(String::from).to_vec();
        p.github_url = Some("https://github.com/a".to_string());

        let details = render_details(&p).expect("render");
        assert!(details.contains("  - k8s"));
        assert!(details.contains("GitHub Profile"));
        assert!(details.contains("https://github.com/a"));
        assert!(details.contains(DEFAULT_TITLE));
    }

    #[test]
    fn toast_names_the_decision() {
        let p = profile("a");
        assert_eq!(decision_toast(Decision::Interested, &p), "Liked a first");
        assert_eq!(decision_toast(Decision::Ignored, &p), "Passed a first");
    }

    #[test]
    fn status_covers_empty_states() {
        let exhausted = FeedSnapshot {
            has_more: false,
            page: 1,
            ..FeedSnapshot::default()
        };
        assert!(render_status(&exhausted).contains("No More Developers"));

        let failed = FeedSnapshot {
            has_more: true,
            error: Some("timeout".to_string()),
            page: 1,
            ..FeedSnapshot::default()
        };
        assert!(render_status(&failed).contains("[t] retry"));

        let loading = FeedSnapshot {
            has_more: true,
            loading: true,
            page: 1,
            ..FeedSnapshot::default()
        };
        assert_eq!(render_status(&loading), "Loading developers...");
    }
}
