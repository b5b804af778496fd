//! Selective commit: turn fetched GitHub profiles into unpublished people.
//!
//! # Module Structure
//!
//! - [`company`] - Company field parsing and fuzzy matching
//! - [`mention`] - `CompanyMentionExtractor` for employers named in a bio
//! - [`bio`] - Bio composition and website normalization

pub mod bio;
pub mod company;
pub mod mention;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::directory::{
    Company, CompanyDirectory, DirectoryError, ImageStore, NewPerson, PersonDirectory,
};
use crate::github::{FullUser, GitHubApi, short_error_message};
use crate::import::{ImportEvent, ImportProgress, ProgressCallback, emit};

pub use bio::{compose_bio, normalize_website};
pub use company::{CompanyHint, best_match, normalize, parse_company_field};
pub use mention::{CompanyMentionExtractor, PatternMentionExtractor};

/// Options for a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOptions {
    pub download_avatars: bool,
}

/// Outcome of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    /// Logins that became new people, in commit order.
    pub imported: Vec<String>,
    /// Profiles whose person already existed.
    pub skipped: usize,
    /// Per-handle problems, including avatar failures of people that were created.
    pub errors: Vec<String>,
}

/// The directory services a commit writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub people: Arc<dyn PersonDirectory>,
    pub companies: Arc<dyn CompanyDirectory>,
    pub images: Arc<dyn ImageStore>,
    pub mentions: Arc<dyn CompanyMentionExtractor>,
}

impl Collaborators {
    /// Collaborators with the regex mention extractor.
    pub fn new(
        people: Arc<dyn PersonDirectory>,
        companies: Arc<dyn CompanyDirectory>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            people,
            companies,
            images,
            mentions: Arc::new(PatternMentionExtractor::new()),
        }
    }

    #[must_use]
    pub fn with_mention_extractor(mut self, mentions: Arc<dyn CompanyMentionExtractor>) -> Self {
        self.mentions = mentions;
        self
    }
}

/// Find the company for a profile: its company field first, then its bio.
fn resolve_company<'a>(
    profile: &FullUser,
    hint: Option<&CompanyHint>,
    companies: &'a [Company],
    mentions: &dyn CompanyMentionExtractor,
) -> Option<&'a Company> {
    hint.and_then(|h| best_match(&h.name, companies))
        .or_else(|| {
            let bio = profile.bio.as_deref()?;
            let mention = mentions.extract_company_mention(bio)?;
            best_match(&mention, companies)
        })
}

/// Commit the selected handles from `progress`.
///
/// Each profile is handled independently: failures are collected in the
/// report and the rest of the selection still goes through. Only failing to
/// list companies aborts the commit.
pub async fn commit_selected<A>(
    api: &A,
    progress: &ImportProgress,
    handles: &[String],
    options: &CommitOptions,
    collaborators: &Collaborators,
    on_progress: Option<&ProgressCallback>,
) -> Result<CommitReport, DirectoryError>
where
    A: GitHubApi + ?Sized,
{
    let mut report = CommitReport::default();
    let mut companies = collaborators.companies.list_companies().await?;
    let mut seen = HashSet::new();

    for handle in handles {
        let handle = handle.trim().trim_start_matches('@');
        if handle.is_empty() || !seen.insert(handle.to_ascii_lowercase()) {
            continue;
        }

        let Some(profile) = progress.find_profile(handle) else {
            let message = format!("{handle}: not among the fetched profiles");
            emit(
                on_progress,
                ImportEvent::CommitError {
                    login: handle.to_string(),
                    message: message.clone(),
                },
            );
            report.errors.push(message);
            continue;
        };

        if let Err(e) = commit_profile(
            api,
            profile,
            options,
            collaborators,
            &mut companies,
            &mut report,
            on_progress,
        )
        .await
        {
            let message = format!("{}: {}", profile.login, short_error_message(&e));
            tracing::warn!(login = %profile.login, error = %e, "Commit failed");
            emit(
                on_progress,
                ImportEvent::CommitError {
                    login: profile.login.clone(),
                    message: message.clone(),
                },
            );
            report.errors.push(message);
        }
    }

    Ok(report)
}

async fn commit_profile<A>(
    api: &A,
    profile: &FullUser,
    options: &CommitOptions,
    collaborators: &Collaborators,
    companies: &mut [Company],
    report: &mut CommitReport,
    on_progress: Option<&ProgressCallback>,
) -> Result<(), DirectoryError>
where
    A: GitHubApi + ?Sized,
{
    let name = profile.display_name().to_string();

    if let Some(existing) = collaborators
        .people
        .find_person(&profile.html_url, &name)
        .await?
    {
        tracing::debug!(login = %profile.login, person = %existing.id, "Person already exists");
        report.skipped += 1;
        emit(
            on_progress,
            ImportEvent::CommitSkipped {
                login: profile.login.clone(),
                reason: format!("{} is already in the directory", existing.name),
            },
        );
        return Ok(());
    }

    let hint = profile.company.as_deref().and_then(parse_company_field);
    let matched = resolve_company(
        profile,
        hint.as_ref(),
        companies,
        collaborators.mentions.as_ref(),
    )
    .map(|c| c.id);

    // Backfill the org link learned from an `@org` company field.
    if let (Some(id), Some(url)) = (matched, hint.as_ref().and_then(CompanyHint::github_url))
        && let Some(company) = companies.iter_mut().find(|c| c.id == id)
        && company.github_url.is_none()
    {
        match collaborators.companies.set_github_url(id, &url).await {
            Ok(()) => company.github_url = Some(url),
            Err(e) => report
                .errors
                .push(format!("{}: could not link {}: {e}", profile.login, company.name)),
        }
    }

    let company = matched.and_then(|id| companies.iter().find(|c| c.id == id));
    let bio = compose_bio(
        profile.bio.as_deref(),
        &name,
        company.map(|c| c.name.as_str()),
        profile.location.as_deref(),
    );

    let avatar_path = if options.download_avatars && !profile.avatar_url.is_empty() {
        store_avatar(api, profile, collaborators, report, on_progress).await
    } else {
        None
    };

    let person = collaborators
        .people
        .create_person(NewPerson {
            name: name.clone(),
            bio,
            avatar_path,
            website: profile.blog.as_deref().and_then(normalize_website),
            github_url: Some(profile.html_url.clone()),
            location: profile.location.clone(),
            company_id: company.map(|c| c.id),
            is_published: false,
        })
        .await?;

    tracing::info!(login = %profile.login, person = %person.id, "Imported person");
    report.imported.push(profile.login.clone());
    emit(
        on_progress,
        ImportEvent::Committed {
            login: profile.login.clone(),
            name,
            company: company.map(|c| c.name.clone()),
        },
    );
    Ok(())
}

/// Download and store the avatar; failures are reported, never fatal.
async fn store_avatar<A>(
    api: &A,
    profile: &FullUser,
    collaborators: &Collaborators,
    report: &mut CommitReport,
    on_progress: Option<&ProgressCallback>,
) -> Option<String>
where
    A: GitHubApi + ?Sized,
{
    let result = match api.fetch_avatar_bytes(&profile.avatar_url).await {
        Some(bytes) => collaborators
            .images
            .store_avatar(&profile.login, &bytes)
            .await
            .map_err(|e| format!("avatar not stored: {}", short_error_message(&e))),
        None => Err("avatar download failed".to_string()),
    };

    match result {
        Ok(path) => Some(path),
        Err(reason) => {
            let message = format!("{}: {reason}", profile.login);
            tracing::warn!(login = %profile.login, "{}", reason);
            emit(
                on_progress,
                ImportEvent::CommitError {
                    login: profile.login.clone(),
                    message: message.clone(),
                },
            );
            report.errors.push(message);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::github::{ApiResponse, BasicUser, GitHubError, Relation};
    use crate::import::ImportMode;
    use async_trait::async_trait;
    use chrono::Utc;

    struct AvatarApi {
        avatar: Option<Vec<u8>>,
    }

    #[async_trait]
    impl GitHubApi for AvatarApi {
        async fn list_connections(
            &self,
            username: &str,
            _relation: Relation,
            _on_progress: Option<&ProgressCallback>,
        ) -> Result<ApiResponse<Vec<BasicUser>>, GitHubError> {
            Err(GitHubError::not_found(username))
        }

        async fn get_profile(&self, username: &str) -> Result<ApiResponse<FullUser>, GitHubError> {
            Err(GitHubError::not_found(username))
        }

        async fn fetch_avatar_bytes(&self, _url: &str) -> Option<Vec<u8>> {
            self.avatar.clone()
        }
    }

    fn profile(login: &str) -> FullUser {
        FullUser {
            login: login.into(),
            name: None,
            html_url: format!("https://github.com/{login}"),
            avatar_url: format!("https://avatars.test/{login}"),
            bio: None,
            company: None,
            blog: None,
            location: None,
            public_repos: 3,
            followers: 0,
            following: 0,
        }
    }

    fn progress_with(profiles: Vec<FullUser>) -> ImportProgress {
        let mut progress = ImportProgress::started("alice", ImportMode::Following, Utc::now());
        for p in profiles {
            progress.record_profile(p);
        }
        progress
    }

    fn collaborators(dir: &Arc<MemoryDirectory>) -> Collaborators {
        Collaborators::new(dir.clone(), dir.clone(), dir.clone())
    }

    fn handles(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn creates_unpublished_person_with_company_and_backfill() {
        let dir = Arc::new(MemoryDirectory::with_companies(&[("Acme Inc", None)]));
        let mut bob = profile("bob");
        bob.name = Some("Bob Builder".into());
        bob.company = Some("@acme".into());
        bob.bio = Some("Builds things.".into());
        bob.blog = Some("bob.dev".into());
        bob.location = Some("Berlin".into());

        let report = commit_selected(
            &AvatarApi { avatar: None },
            &progress_with(vec![bob]),
            &handles(&["bob"]),
            &CommitOptions::default(),
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.imported, vec!["bob".to_string()]);
        assert!(report.errors.is_empty());

        let people = dir.people();
        let person = &people[0];
        assert_eq!(person.name, "Bob Builder");
        assert!(!person.is_published);
        assert_eq!(person.website.as_deref(), Some("https://bob.dev"));
        assert_eq!(person.github_url.as_deref(), Some("https://github.com/bob"));
        assert_eq!(
            person.bio.as_deref(),
            Some("Builds things.\n\nWorks at [[Acme Inc]].")
        );

        let acme = dir.company("Acme Inc").unwrap();
        assert_eq!(person.company_id, Some(acme.id));
        assert_eq!(acme.github_url.as_deref(), Some("https://github.com/acme"));
    }

    #[tokio::test]
    async fn existing_link_is_not_overwritten() {
        let dir = Arc::new(MemoryDirectory::with_companies(&[(
            "Acme",
            Some("https://github.com/acme-corp"),
        )]));
        let mut bob = profile("bob");
        bob.company = Some("@acme".into());

        commit_selected(
            &AvatarApi { avatar: None },
            &progress_with(vec![bob]),
            &handles(&["bob"]),
            &CommitOptions::default(),
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();

        assert_eq!(
            dir.company("Acme").unwrap().github_url.as_deref(),
            Some("https://github.com/acme-corp")
        );
    }

    #[tokio::test]
    async fn bio_mention_is_used_when_company_field_is_empty() {
        let dir = Arc::new(MemoryDirectory::with_companies(&[("Initech", None)]));
        let mut carol = profile("carol");
        carol.bio = Some("Staff engineer at Initech".into());

        commit_selected(
            &AvatarApi { avatar: None },
            &progress_with(vec![carol]),
            &handles(&["carol"]),
            &CommitOptions::default(),
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();

        let person = &dir.people()[0];
        assert_eq!(person.company_id, Some(dir.company("Initech").unwrap().id));
        assert_eq!(person.name, "carol");
        // Plain company names never set an org link.
        assert_eq!(dir.company("Initech").unwrap().github_url, None);
    }

    /// Reads the employer from a `Company: <name>` line.
    struct LabelledCompany;

    impl CompanyMentionExtractor for LabelledCompany {
        fn extract_company_mention(&self, bio: &str) -> Option<String> {
            bio.lines()
                .find_map(|line| line.strip_prefix("Company: "))
                .map(|name| name.trim().to_string())
        }
    }

    #[tokio::test]
    async fn custom_mention_extractor_is_consulted() {
        let dir = Arc::new(MemoryDirectory::with_companies(&[
            ("Initech", None),
            ("Globex", None),
        ]));
        let mut erin = profile("erin");
        // The default patterns would pick Initech here.
        erin.bio = Some("Engineer at Initech\nCompany: Globex".into());

        let report = commit_selected(
            &AvatarApi { avatar: None },
            &progress_with(vec![erin]),
            &handles(&["erin"]),
            &CommitOptions::default(),
            &collaborators(&dir).with_mention_extractor(Arc::new(LabelledCompany)),
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.imported, vec!["erin".to_string()]);
        let person = &dir.people()[0];
        assert_eq!(person.company_id, Some(dir.company("Globex").unwrap().id));
    }

    #[tokio::test]
    async fn committing_twice_creates_one_person() {
        let dir = Arc::new(MemoryDirectory::default());
        let progress = progress_with(vec![profile("bob")]);
        let selection = handles(&["bob", "BOB"]);

        let first = commit_selected(
            &AvatarApi { avatar: None },
            &progress,
            &selection,
            &CommitOptions::default(),
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();
        let second = commit_selected(
            &AvatarApi { avatar: None },
            &progress,
            &selection,
            &CommitOptions::default(),
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();

        assert_eq!(first.imported, vec!["bob".to_string()]);
        assert!(second.imported.is_empty());
        assert_eq!(second.skipped, 1);
        assert_eq!(dir.people().len(), 1);
    }

    #[tokio::test]
    async fn same_display_name_counts_as_existing() {
        let dir = Arc::new(MemoryDirectory::default());
        let mut a = profile("bob1");
        a.name = Some("Bob".into());
        let mut b = profile("bob2");
        b.name = Some("Bob".into());

        let report = commit_selected(
            &AvatarApi { avatar: None },
            &progress_with(vec![a, b]),
            &handles(&["bob1", "bob2"]),
            &CommitOptions::default(),
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.imported, vec!["bob1".to_string()]);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn unknown_handles_are_reported() {
        let dir = Arc::new(MemoryDirectory::default());
        let report = commit_selected(
            &AvatarApi { avatar: None },
            &progress_with(vec![profile("bob")]),
            &handles(&["ghost", "bob"]),
            &CommitOptions::default(),
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.imported, vec!["bob".to_string()]);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("ghost"));
    }

    #[tokio::test]
    async fn avatar_failures_do_not_block_creation() {
        let dir = Arc::new(MemoryDirectory::default());
        let report = commit_selected(
            &AvatarApi { avatar: None },
            &progress_with(vec![profile("bob")]),
            &handles(&["bob"]),
            &CommitOptions {
                download_avatars: true,
            },
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.imported, vec!["bob".to_string()]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(dir.people()[0].avatar_path, None);
    }

    #[tokio::test]
    async fn avatar_is_stored_when_requested() {
        let dir = Arc::new(MemoryDirectory::default());
        let report = commit_selected(
            &AvatarApi {
                avatar: Some(vec![0x89, b'P', b'N', b'G']),
            },
            &progress_with(vec![profile("bob")]),
            &handles(&["bob"]),
            &CommitOptions {
                download_avatars: true,
            },
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();

        assert!(report.errors.is_empty());
        assert_eq!(dir.people()[0].avatar_path.as_deref(), Some("avatars/bob.png"));
        assert_eq!(dir.avatars.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn avatar_store_failure_is_reported() {
        let dir = Arc::new(MemoryDirectory {
            fail_avatar_store: true,
            ..MemoryDirectory::default()
        });
        let report = commit_selected(
            &AvatarApi {
                avatar: Some(vec![1]),
            },
            &progress_with(vec![profile("bob")]),
            &handles(&["bob"]),
            &CommitOptions {
                download_avatars: true,
            },
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.imported, vec!["bob".to_string()]);
        assert!(report.errors[0].contains("avatar not stored"));
    }

    #[tokio::test]
    async fn location_only_bio() {
        let dir = Arc::new(MemoryDirectory::default());
        let mut dave = profile("dave");
        dave.location = Some("Lisbon".into());
        dave.company = Some("Unknown Startup".into());

        commit_selected(
            &AvatarApi { avatar: None },
            &progress_with(vec![dave]),
            &handles(&["dave"]),
            &CommitOptions::default(),
            &collaborators(&dir),
            None,
        )
        .await
        .unwrap();

        let person = &dir.people()[0];
        assert_eq!(person.company_id, None);
        assert_eq!(person.bio.as_deref(), Some("dave is based in Lisbon."));
    }
}
